use crate::config::MatchConfig;
use rand::Rng;

///Fixed playing field. Origin is the top-left corner, y grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: i32,
    pub height: i32,
}

impl Canvas {
    pub fn center(&self) -> (i32, i32) {
        (self.width / 2, self.height / 2)
    }
}

///Ball position and per-tick velocity.
/// The sign of each velocity component encodes direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ball {
    pub x: i32,
    pub y: i32,
    pub vx: i32,
    pub vy: i32,
}

impl Ball {
    ///Places a ball at the canvas centre with the given velocity.
    pub fn centered(canvas: Canvas, vx: i32, vy: i32) -> Ball {
        let (x, y) = canvas.center();
        Ball { x, y, vx, vy }
    }

    ///Places a ball at the canvas centre with a random magnitude in
    /// `[min_speed, max_speed]` and a random sign on each axis.
    pub fn serve<R: Rng + ?Sized>(
        canvas: Canvas,
        min_speed: i32,
        max_speed: i32,
        rng: &mut R,
    ) -> Ball {
        let vx = random_velocity(rng, min_speed, max_speed);
        let vy = random_velocity(rng, min_speed, max_speed);
        Ball::centered(canvas, vx, vy)
    }
}

///Returns a non-zero velocity component with random magnitude and direction.
pub fn random_velocity<R: Rng + ?Sized>(rng: &mut R, min_speed: i32, max_speed: i32) -> i32 {
    let speed = rng.gen_range(min_speed..=max_speed);
    if rng.gen_bool(0.5) {
        -speed
    } else {
        speed
    }
}

///Top edge of each paddle, `None` while the owning slot is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Paddles {
    pub left: Option<i32>,
    pub right: Option<i32>,
}

///Something the ball hit during a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionEvent {
    LeftBounce,
    RightBounce,
    WallBounce,
    /// The left player scored (ball crossed the right goal line).
    ScoreLeft,
    /// The right player scored (ball crossed the left goal line).
    ScoreRight,
}

impl CollisionEvent {
    pub fn is_bounce(self) -> bool {
        matches!(
            self,
            CollisionEvent::LeftBounce | CollisionEvent::RightBounce | CollisionEvent::WallBounce
        )
    }

    pub fn is_goal(self) -> bool {
        matches!(self, CollisionEvent::ScoreLeft | CollisionEvent::ScoreRight)
    }
}

///Advances the ball by one tick and resolves paddle, wall and goal contacts.
///
/// The resolver holds only geometry; it never touches shared state, so the
/// caller decides what each event means for the score.
#[derive(Debug, Clone, Copy)]
pub struct CollisionResolver {
    canvas: Canvas,
    paddle_height: i32,
    paddle_margin: i32,
    ball_radius: i32,
    serve_margin: i32,
}

impl CollisionResolver {
    pub fn new(config: &MatchConfig) -> Self {
        Self {
            canvas: config.canvas,
            paddle_height: config.paddle_height,
            paddle_margin: config.paddle_margin,
            ball_radius: config.ball_radius,
            serve_margin: config.serve_margin,
        }
    }

    ///Returns the next ball state and every event raised on the way.
    ///
    /// Steps run in a fixed order (advance, paddles, walls, goals) and none of
    /// them exits early, so one tick may raise several events. Both paddles are
    /// tested regardless of the direction the ball travels in.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        ball: Ball,
        paddles: Paddles,
        rng: &mut R,
    ) -> (Ball, Vec<CollisionEvent>) {
        let mut next = ball;
        let mut events = Vec::new();

        next.x += next.vx;
        next.y += next.vy;

        if let Some(paddle_y) = paddles.left {
            if next.x - self.ball_radius <= self.paddle_margin && self.spans(paddle_y, next.y) {
                next.vx = -next.vx;
                events.push(CollisionEvent::LeftBounce);
            }
        }

        if let Some(paddle_y) = paddles.right {
            if next.x + self.ball_radius >= self.canvas.width - self.paddle_margin
                && self.spans(paddle_y, next.y)
            {
                next.vx = -next.vx;
                events.push(CollisionEvent::RightBounce);
            }
        }

        if next.y - self.ball_radius <= 0 || next.y + self.ball_radius >= self.canvas.height {
            next.vy = -next.vy;
            events.push(CollisionEvent::WallBounce);
        }

        if next.x - self.ball_radius <= 0 {
            self.recenter(&mut next, rng);
            events.push(CollisionEvent::ScoreRight);
        }

        if next.x + self.ball_radius >= self.canvas.width {
            self.recenter(&mut next, rng);
            events.push(CollisionEvent::ScoreLeft);
        }

        (next, events)
    }

    fn spans(&self, paddle_y: i32, y: i32) -> bool {
        y >= paddle_y && y <= paddle_y + self.paddle_height
    }

    // Velocity is kept as-is after a goal.
    fn recenter<R: Rng + ?Sized>(&self, ball: &mut Ball, rng: &mut R) {
        ball.x = self.canvas.width / 2;
        ball.y = rng.gen_range(self.serve_margin..=self.canvas.height - self.serve_margin);
    }
}
