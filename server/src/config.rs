//! Runtime configuration.
//!
//! [`ServerConfig`] is parsed from the command line; [`MatchConfig`] is the
//! geometry and tuning subset handed to the simulation.

use crate::physics::Canvas;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    BALL_RADIUS, CANVAS_HEIGHT, CANVAS_WIDTH, MAX_BALL_SPEED, MIN_BALL_SPEED, PADDLE_HEIGHT,
    PADDLE_MARGIN, PADDLE_STEP, SERVE_MARGIN,
};
use std::time::Duration;

/// Path the WebSocket upgrade handler is mounted on.
pub const WS_PATH: &str = "/ws";

/// Authoritative pong server
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    pub host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    pub port: u16,
    /// Milliseconds between physics ticks
    #[clap(short, long, default_value = "15", value_parser = clap::value_parser!(u64).range(1..=1000))]
    pub tick_ms: u64,
    /// Pixels a paddle moves per input event
    #[clap(long, default_value = "20", value_parser = clap::value_parser!(i32).range(1..=500))]
    pub paddle_step: i32,
    /// Seed for ball placement; random when omitted
    #[clap(long)]
    pub seed: Option<u64>,
    /// Canvas width in pixels
    #[clap(long, default_value = "800", value_parser = clap::value_parser!(i32).range(200..=10000))]
    pub width: i32,
    /// Canvas height in pixels
    #[clap(long, default_value = "600", value_parser = clap::value_parser!(i32).range(200..=10000))]
    pub height: i32,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            canvas: Canvas {
                width: self.width,
                height: self.height,
            },
            paddle_step: self.paddle_step,
            ..MatchConfig::default()
        }
    }

    /// Seeded when `--seed` is given so runs can be replayed.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Geometry and tuning of a single match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    pub canvas: Canvas,
    pub paddle_height: i32,
    /// Distance of each paddle's contact line from its goal line.
    pub paddle_margin: i32,
    pub ball_radius: i32,
    /// Minimum distance from the top and bottom walls when re-serving.
    pub serve_margin: i32,
    pub paddle_step: i32,
    pub min_speed: i32,
    pub max_speed: i32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            canvas: Canvas {
                width: CANVAS_WIDTH,
                height: CANVAS_HEIGHT,
            },
            paddle_height: PADDLE_HEIGHT,
            paddle_margin: PADDLE_MARGIN,
            ball_radius: BALL_RADIUS,
            serve_margin: SERVE_MARGIN,
            paddle_step: PADDLE_STEP,
            min_speed: MIN_BALL_SPEED,
            max_speed: MAX_BALL_SPEED,
        }
    }
}

impl MatchConfig {
    pub fn max_paddle_y(&self) -> i32 {
        self.canvas.height - self.paddle_height
    }

    pub fn default_paddle_y(&self) -> i32 {
        self.max_paddle_y() / 2
    }

    pub fn clamp_paddle(&self, y: i32) -> i32 {
        y.clamp(0, self.max_paddle_y())
    }
}
