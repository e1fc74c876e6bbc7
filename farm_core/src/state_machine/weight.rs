//! Weight manager - turns carried weight into the percent the triggers reason about.

use serde::{Deserialize, Serialize};

use farm_world::PlayerSnapshot;

/// Adapter from raw carried weight to load percentage and remaining capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeightManager {
    /// Stones always kept free, e.g. for a runebook or reagents picked up on the way.
    pub reserve: u32,
}

impl WeightManager {
    /// Create a manager that keeps `reserve` stones free.
    pub fn new(reserve: u32) -> Self {
        Self { reserve }
    }

    /// Carried weight as a percentage of max. Zero when max weight is unknown.
    pub fn weight_percent(&self, player: &PlayerSnapshot) -> f64 {
        if player.max_weight == 0 {
            return 0.0;
        }
        f64::from(player.weight) / f64::from(player.max_weight) * 100.0
    }

    /// Stones the player can still pick up, after the reserve.
    pub fn remaining_capacity(&self, player: &PlayerSnapshot) -> u32 {
        player
            .max_weight
            .saturating_sub(player.weight)
            .saturating_sub(self.reserve)
    }

    /// Check if the player cannot pick anything else up.
    pub fn is_full(&self, player: &PlayerSnapshot) -> bool {
        player.max_weight > 0 && self.remaining_capacity(player) == 0
    }
}
