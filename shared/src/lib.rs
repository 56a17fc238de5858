use serde::Deserialize;
use std::collections::BTreeMap;

pub const CANVAS_WIDTH: i32 = 800;
pub const CANVAS_HEIGHT: i32 = 600;
pub const PADDLE_HEIGHT: i32 = 100;
pub const PADDLE_MARGIN: i32 = 35;
pub const BALL_RADIUS: i32 = 10;
pub const SERVE_MARGIN: i32 = 50;
pub const PADDLE_STEP: i32 = 20;
pub const MIN_BALL_SPEED: i32 = 3;
pub const MAX_BALL_SPEED: i32 = 4;
pub const MAX_PLAYERS: usize = 2;

/// One-shot sound effect hint carried by the next outgoing snapshot.
///
/// Ordered by priority, so a goal in the same tick as a bounce wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum AudioCue {
    #[default]
    None,
    Bounce,
    Score,
}

impl AudioCue {
    /// Wire encoding: `0=none, 1=bounce, 2=score`.
    pub fn code(self) -> i32 {
        match self {
            AudioCue::None => 0,
            AudioCue::Bounce => 1,
            AudioCue::Score => 2,
        }
    }
}

/// Paddle command sent by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveUp,
    MoveDown,
    /// Anything else the client sent; applied as a no-op.
    Unknown,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::MoveUp => "moveUp",
            Action::MoveDown => "moveDown",
            Action::Unknown => "unknown",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("malformed message: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

#[derive(Deserialize)]
struct ActionMessage {
    #[serde(default)]
    action: Option<String>,
}

/// Decodes an inbound `{"action": "..."}` message.
///
/// Missing or unrecognised actions decode to [`Action::Unknown`]; only
/// payloads that are not a JSON object of the expected shape are errors.
pub fn decode_action(payload: &str) -> Result<Action, DecodeError> {
    let message: ActionMessage = serde_json::from_str(payload)?;
    Ok(match message.action.as_deref() {
        Some("moveUp") => Action::MoveUp,
        Some("moveDown") => Action::MoveDown,
        _ => Action::Unknown,
    })
}

/// Encodes an outbound action message, used by clients and tests.
pub fn encode_action(action: Action) -> String {
    format!(r#"{{"action":"{}"}}"#, action.as_str())
}

/// Authoritative view of the match as broadcast to every client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    /// Paddle Y keyed by slot index (0 or 1). Only connected slots appear.
    pub paddles: BTreeMap<u8, i32>,
    pub ball_x: i32,
    pub ball_y: i32,
    pub score1: u32,
    pub score2: u32,
    pub audio: AudioCue,
}

impl Snapshot {
    /// Wire key of the paddle owned by `slot`: `player1Y` for slot 0.
    pub fn paddle_key(slot: u8) -> String {
        format!("player{}Y", u32::from(slot) + 1)
    }

    /// Flattens the snapshot into the named integer fields sent on the wire.
    pub fn to_fields(&self) -> BTreeMap<String, i64> {
        let mut fields: BTreeMap<String, i64> = self
            .paddles
            .iter()
            .map(|(slot, y)| (Self::paddle_key(*slot), i64::from(*y)))
            .collect();
        fields.insert("ballX".to_string(), i64::from(self.ball_x));
        fields.insert("ballY".to_string(), i64::from(self.ball_y));
        fields.insert("score1".to_string(), i64::from(self.score1));
        fields.insert("score2".to_string(), i64::from(self.score2));
        fields.insert("audio".to_string(), i64::from(self.audio.code()));
        fields
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_fields())
    }
}

/// Parses an outbound snapshot back into its generic field mapping.
pub fn decode_fields(payload: &str) -> Result<BTreeMap<String, i64>, DecodeError> {
    Ok(serde_json::from_str(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> Snapshot {
        let mut paddles = BTreeMap::new();
        paddles.insert(0, 250);
        paddles.insert(1, 120);
        Snapshot {
            paddles,
            ball_x: 400,
            ball_y: 311,
            score1: 3,
            score2: 7,
            audio: AudioCue::Bounce,
        }
    }

    #[test]
    fn test_decode_known_actions() {
        assert_eq!(decode_action(r#"{"action":"moveUp"}"#).unwrap(), Action::MoveUp);
        assert_eq!(
            decode_action(r#"{"action":"moveDown"}"#).unwrap(),
            Action::MoveDown
        );
    }

    #[test]
    fn test_decode_unknown_action_is_noop() {
        assert_eq!(decode_action(r#"{"action":"jump"}"#).unwrap(), Action::Unknown);
        assert_eq!(decode_action(r#"{}"#).unwrap(), Action::Unknown);
    }

    #[test]
    fn test_decode_ignores_extra_keys() {
        let action = decode_action(r#"{"action":"moveDown","extra":42}"#).unwrap();
        assert_eq!(action, Action::MoveDown);
    }

    #[test]
    fn test_decode_malformed_payload() {
        assert!(decode_action("not json").is_err());
        assert!(decode_action(r#"{"action":"moveUp""#).is_err());
        assert!(decode_action(r#""moveUp""#).is_err());
        assert!(decode_action(r#"{"action":5}"#).is_err());
    }

    #[test]
    fn test_encode_action_decodes_back() {
        for action in [Action::MoveUp, Action::MoveDown] {
            assert_eq!(decode_action(&encode_action(action)).unwrap(), action);
        }
    }

    #[test]
    fn test_audio_cue_codes_and_priority() {
        assert_eq!(AudioCue::None.code(), 0);
        assert_eq!(AudioCue::Bounce.code(), 1);
        assert_eq!(AudioCue::Score.code(), 2);
        assert_eq!(AudioCue::Bounce.max(AudioCue::Score), AudioCue::Score);
        assert_eq!(AudioCue::None.max(AudioCue::Bounce), AudioCue::Bounce);
    }

    #[test]
    fn test_paddle_key_uses_one_based_slot() {
        assert_eq!(Snapshot::paddle_key(0), "player1Y");
        assert_eq!(Snapshot::paddle_key(1), "player2Y");
    }

    #[test]
    fn test_snapshot_fields_match_source() {
        let snapshot = sample_snapshot();
        let encoded = snapshot.encode().unwrap();
        let fields = decode_fields(&encoded).unwrap();

        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["audio", "ballX", "ballY", "player1Y", "player2Y", "score1", "score2"]
        );
        assert_eq!(fields["player1Y"], 250);
        assert_eq!(fields["player2Y"], 120);
        assert_eq!(fields["ballX"], 400);
        assert_eq!(fields["ballY"], 311);
        assert_eq!(fields["score1"], 3);
        assert_eq!(fields["score2"], 7);
        assert_eq!(fields["audio"], 1);
    }

    #[test]
    fn test_snapshot_omits_absent_slots() {
        let mut snapshot = sample_snapshot();
        snapshot.paddles.remove(&0);

        let fields = decode_fields(&snapshot.encode().unwrap()).unwrap();
        assert!(!fields.contains_key("player1Y"));
        assert_eq!(fields["player2Y"], 120);
        assert_eq!(fields.len(), 6);
    }
}
