//! Per-tick player snapshot.

use serde::{Deserialize, Serialize};

use super::{Position, Serial};

/// What the host reports about the player for a single tick.
///
/// The host adapter fills every field once per tick; attributes the client did not
/// report are left at zero, which every consumer treats as "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub hits: i32,
    pub hits_max: i32,
    /// Carried weight in stones.
    pub weight: u32,
    pub max_weight: u32,
    pub position: Position,
    pub backpack: Serial,
}

impl PlayerSnapshot {
    /// Hit points as a percentage of maximum, or `None` when the maximum is unknown.
    pub fn hp_percent(&self) -> Option<f64> {
        if self.hits_max <= 0 {
            return None;
        }
        Some(f64::from(self.hits.max(0)) / f64::from(self.hits_max) * 100.0)
    }

    /// Check if the player is still standing.
    pub fn is_alive(&self) -> bool {
        self.hits > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hp_percent() {
        let player = PlayerSnapshot {
            hits: 30,
            hits_max: 120,
            ..Default::default()
        };
        assert_eq!(player.hp_percent(), Some(25.0));
    }

    #[test]
    fn test_hp_percent_unknown_max() {
        let player = PlayerSnapshot::default();
        assert_eq!(player.hp_percent(), None);
        assert!(!player.is_alive());
    }
}
