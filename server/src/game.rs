use crate::client_manager::{ConnectionHandle, SessionRegistry};
use crate::config::MatchConfig;
use crate::error::AdmissionError;
use crate::physics::{Ball, CollisionEvent, CollisionResolver, Paddles};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{Action, AudioCue, Snapshot};

/// Slot controlling the left paddle; the other slot controls the right one.
pub const LEFT_SLOT: u8 = 0;
pub const RIGHT_SLOT: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    WaitingForPlayers,
    Rallying,
    /// Set for the single tick in which a goal was scored.
    Scoring,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    pub player1: u32,
    pub player2: u32,
}

/// Authoritative match state: ball, score, audio cue and player slots.
///
/// Every mutation goes through this type so paddle clamping and the
/// velocity invariants are enforced in one place.
pub struct GameState {
    pub tick: u64,
    config: MatchConfig,
    resolver: CollisionResolver,
    ball: Ball,
    score: Score,
    audio: AudioCue,
    phase: MatchPhase,
    sessions: SessionRegistry,
    rng: StdRng,
}

impl GameState {
    pub fn new(config: MatchConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: MatchConfig, mut rng: StdRng) -> Self {
        let ball = Ball::serve(config.canvas, config.min_speed, config.max_speed, &mut rng);
        info!(
            "Match ready on {}x{} canvas, ball velocity ({}, {})",
            config.canvas.width, config.canvas.height, ball.vx, ball.vy
        );

        Self {
            tick: 0,
            config,
            resolver: CollisionResolver::new(&config),
            ball,
            score: Score::default(),
            audio: AudioCue::None,
            phase: MatchPhase::WaitingForPlayers,
            sessions: SessionRegistry::default(),
            rng,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn ball(&self) -> Ball {
        self.ball
    }

    /// Explicit reset hook: puts the ball at an arbitrary position and velocity.
    pub fn place_ball(&mut self, ball: Ball) {
        self.ball = ball;
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn audio_cue(&self) -> AudioCue {
        self.audio
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn player_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn paddle(&self, slot: u8) -> Option<i32> {
        self.sessions.paddle(slot)
    }

    pub fn holds_slot(&self, slot: u8, connection_id: u64) -> bool {
        self.sessions
            .get(slot)
            .is_some_and(|player| player.connection.id() == connection_id)
    }

    /// Seats a new connection. Seating the final player recentres both
    /// paddles and the ball; the score is kept.
    pub fn admit_player(&mut self, connection: ConnectionHandle) -> Result<u8, AdmissionError> {
        let slot = self
            .sessions
            .admit(connection, self.config.default_paddle_y())?;

        if self.sessions.is_full() {
            self.reset_positions();
        }
        Ok(slot)
    }

    /// Frees a slot. Ball and score are left alone; the ball stays frozen
    /// until the slot is filled again.
    pub fn remove_player(&mut self, slot: u8) -> bool {
        let removed = self.sessions.remove(slot).is_some();
        if removed {
            self.enter_phase(MatchPhase::WaitingForPlayers);
        }
        removed
    }

    /// Frees a slot only if `connection_id` still owns it.
    pub fn remove_connection(&mut self, slot: u8, connection_id: u64) -> bool {
        let removed = self.sessions.remove_connection(slot, connection_id).is_some();
        if removed {
            self.enter_phase(MatchPhase::WaitingForPlayers);
        }
        removed
    }

    /// Moves a paddle and returns its new position, or `None` for an empty slot.
    pub fn apply_input(&mut self, slot: u8, action: Action) -> Option<i32> {
        let step = match action {
            Action::MoveUp => -self.config.paddle_step,
            Action::MoveDown => self.config.paddle_step,
            Action::Unknown => 0,
        };

        let config = self.config;
        let player = self.sessions.get_mut(slot)?;
        player.paddle_y = config.clamp_paddle(player.paddle_y + step);
        debug!(
            "Player {} {} -> paddle at {}",
            slot + 1,
            action.as_str(),
            player.paddle_y
        );
        Some(player.paddle_y)
    }

    /// Runs one simulation step.
    ///
    /// With fewer than two players the ball is frozen and no collision is
    /// evaluated. Otherwise the resolver's events are applied to the score
    /// and audio cue.
    pub fn tick(&mut self) -> Vec<CollisionEvent> {
        self.tick += 1;

        if !self.sessions.is_full() {
            self.enter_phase(MatchPhase::WaitingForPlayers);
            return Vec::new();
        }

        let paddles = Paddles {
            left: self.sessions.paddle(LEFT_SLOT),
            right: self.sessions.paddle(RIGHT_SLOT),
        };
        let (ball, events) = self.resolver.resolve(self.ball, paddles, &mut self.rng);
        self.ball = ball;

        let mut scored = false;
        for event in &events {
            match event {
                CollisionEvent::ScoreLeft => {
                    self.score.player1 += 1;
                    scored = true;
                }
                CollisionEvent::ScoreRight => {
                    self.score.player2 += 1;
                    scored = true;
                }
                _ => {}
            }
            let cue = if event.is_goal() {
                AudioCue::Score
            } else {
                AudioCue::Bounce
            };
            self.audio = self.audio.max(cue);
        }

        if scored {
            info!(
                "Goal! Score {}:{}, ball re-served at ({}, {})",
                self.score.player1, self.score.player2, self.ball.x, self.ball.y
            );
            self.enter_phase(MatchPhase::Scoring);
        } else {
            self.enter_phase(MatchPhase::Rallying);
        }

        events
    }

    /// Builds the outgoing view and consumes the pending audio cue.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot {
            paddles: self.sessions.paddles(),
            ball_x: self.ball.x,
            ball_y: self.ball.y,
            score1: self.score.player1,
            score2: self.score.player2,
            audio: std::mem::take(&mut self.audio),
        }
    }

    fn reset_positions(&mut self) {
        self.sessions.reset_paddles(self.config.default_paddle_y());
        self.ball = Ball::centered(self.config.canvas, self.ball.vx, self.ball.vy);
        info!("Both players present, positions reset");
    }

    fn enter_phase(&mut self, phase: MatchPhase) {
        if self.phase == phase {
            return;
        }
        match phase {
            MatchPhase::WaitingForPlayers => info!("Waiting for players"),
            MatchPhase::Rallying if self.phase == MatchPhase::WaitingForPlayers => {
                info!("Rally started")
            }
            _ => {}
        }
        self.phase = phase;
    }
}
