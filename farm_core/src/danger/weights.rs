//! Factor weights for the danger score.

use serde::{Deserialize, Serialize};

/// The six inputs to the danger score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DangerFactor {
    PlayerHp,
    PetHp,
    EnemyCount,
    NearbyNpcs,
    DamageRate,
    PetDistance,
}

impl DangerFactor {
    /// Every factor, in scoring order.
    pub const ALL: [DangerFactor; 6] = [
        DangerFactor::PlayerHp,
        DangerFactor::PetHp,
        DangerFactor::EnemyCount,
        DangerFactor::NearbyNpcs,
        DangerFactor::DamageRate,
        DangerFactor::PetDistance,
    ];
}

/// Relative weight of each factor. Always sums to 1.0 once normalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DangerWeights {
    pub player_hp: f64,
    pub pet_hp: f64,
    pub enemy_count: f64,
    pub nearby_npcs: f64,
    pub damage_rate: f64,
    pub pet_distance: f64,
}

impl Default for DangerWeights {
    fn default() -> Self {
        Self {
            player_hp: 0.30,
            pet_hp: 0.25,
            enemy_count: 0.20,
            nearby_npcs: 0.10,
            damage_rate: 0.10,
            pet_distance: 0.05,
        }
    }
}

impl DangerWeights {
    /// Weight of a single factor.
    pub fn get(&self, factor: DangerFactor) -> f64 {
        match factor {
            DangerFactor::PlayerHp => self.player_hp,
            DangerFactor::PetHp => self.pet_hp,
            DangerFactor::EnemyCount => self.enemy_count,
            DangerFactor::NearbyNpcs => self.nearby_npcs,
            DangerFactor::DamageRate => self.damage_rate,
            DangerFactor::PetDistance => self.pet_distance,
        }
    }

    fn slot(&mut self, factor: DangerFactor) -> &mut f64 {
        match factor {
            DangerFactor::PlayerHp => &mut self.player_hp,
            DangerFactor::PetHp => &mut self.pet_hp,
            DangerFactor::EnemyCount => &mut self.enemy_count,
            DangerFactor::NearbyNpcs => &mut self.nearby_npcs,
            DangerFactor::DamageRate => &mut self.damage_rate,
            DangerFactor::PetDistance => &mut self.pet_distance,
        }
    }

    /// Set one factor, clamped to `[0, 1]`. Non-finite values count as zero.
    pub fn set(&mut self, factor: DangerFactor, weight: f64) {
        let weight = if weight.is_finite() { weight.clamp(0.0, 1.0) } else { 0.0 };
        *self.slot(factor) = weight;
    }

    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        DangerFactor::ALL.iter().map(|f| self.get(*f)).sum()
    }

    /// Scale the weights so they sum to 1.0.
    ///
    /// A zero total cannot be scaled and restores the defaults instead.
    pub fn normalize(&mut self) {
        let total = self.total();
        if !total.is_finite() || total <= f64::EPSILON {
            *self = Self::default();
            return;
        }
        for factor in DangerFactor::ALL {
            let slot = self.slot(factor);
            *slot /= total;
        }
    }

    /// Clamp every weight and normalize. Used on weights loaded from configuration.
    pub fn sanitized(mut self) -> Self {
        for factor in DangerFactor::ALL {
            let value = self.get(factor);
            self.set(factor, value);
        }
        self.normalize();
        self
    }
}
