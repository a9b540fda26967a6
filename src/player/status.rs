use std::fmt;

use serde::Serialize;

/// A rung of the fallback ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Primary,
    Fallback,
    Beep,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Primary => "primary",
            Tier::Fallback => "fallback",
            Tier::Beep => "beep",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerStatus {
    Idle,
    Attempting(Tier),
    Playing(Tier),
    /// Every tier failed. `message` is meant for the user.
    Failed { message: String },
}

impl PlayerStatus {
    /// Wire label of the status stream.
    pub fn label(&self) -> &'static str {
        match self {
            PlayerStatus::Idle => "idle",
            PlayerStatus::Attempting(Tier::Primary) => "attempting-primary",
            PlayerStatus::Attempting(Tier::Fallback) => "attempting-fallback",
            PlayerStatus::Attempting(Tier::Beep) => "attempting-beep",
            PlayerStatus::Playing(_) => "playing",
            PlayerStatus::Failed { .. } => "failed",
        }
    }

    /// Terminal for the current chain: nothing further will be attempted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlayerStatus::Playing(_) | PlayerStatus::Failed { .. })
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerStatus::Playing(tier) => write!(f, "playing ({tier})"),
            PlayerStatus::Failed { message } => write!(f, "failed: {message}"),
            other => f.write_str(other.label()),
        }
    }
}

/// One entry of a player's status stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEvent {
    /// Chain number; increases with every `play` and `cancel`.
    pub chain: u64,
    pub pinpoint_id: Option<i64>,
    pub status: PlayerStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_match_stream_vocabulary() {
        let labels: Vec<_> = [
            PlayerStatus::Idle,
            PlayerStatus::Attempting(Tier::Primary),
            PlayerStatus::Attempting(Tier::Fallback),
            PlayerStatus::Attempting(Tier::Beep),
            PlayerStatus::Playing(Tier::Fallback),
            PlayerStatus::Failed {
                message: "x".to_string(),
            },
        ]
        .iter()
        .map(PlayerStatus::label)
        .collect();
        assert_eq!(
            labels,
            [
                "idle",
                "attempting-primary",
                "attempting-fallback",
                "attempting-beep",
                "playing",
                "failed"
            ]
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(PlayerStatus::Playing(Tier::Beep).is_terminal());
        assert!(!PlayerStatus::Attempting(Tier::Beep).is_terminal());
        assert!(!PlayerStatus::Idle.is_terminal());
    }
}
