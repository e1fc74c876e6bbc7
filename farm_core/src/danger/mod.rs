//! Danger assessment - fuses player, pet and enemy telemetry into a single 0-100 score.
//!
//! Six factors each produce a 0-100 sub-score:
//! 1. **Player HP**: missing health, amplified when the player is low
//! 2. **Pet HP**: worst-case weighted missing health across live pets
//! 3. **Enemy count**: engaged hostiles, saturating at five
//! 4. **Nearby NPCs**: NPCs inside the threat radius
//! 5. **Damage rate**: recent player HP loss per second
//! 6. **Pet distance**: how far and how scattered the pets are
//!
//! The score is the weighted sum, clamped to `[0, 100]`. A factor that cannot be computed
//! contributes its documented safe value instead, so a score is always produced.

mod weights;

pub use weights::*;

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

use farm_world::{MobileStatus, PetDescriptor, PlayerSnapshot, Position, WorldView};

/// Score at or above which the farmer flees by default.
pub const DEFAULT_FLEE_THRESHOLD: u8 = 70;

/// Default radius, in tiles, inside which NPCs count as a threat.
pub const DEFAULT_THREAT_RADIUS: f64 = 10.0;

/// Distance beyond which a pet stops following.
pub const MAX_FOLLOW_RANGE: f64 = 15.0;

const DAMAGE_WINDOW_SAMPLES: usize = 10;
const DAMAGE_WINDOW_SECS: f64 = 10.0;
/// Damage per second that maps to a full damage-rate score.
const DAMAGE_RATE_CEILING: f64 = 10.0;
const ENEMY_SATURATION: f64 = 5.0;

const PLAYER_HP_FALLBACK: f64 = 50.0;
const PET_HP_FALLBACK: f64 = 30.0;
const OVERALL_FALLBACK: u8 = 50;

/// Coarse classification of a danger score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DangerZone {
    /// `[0, 20)`.
    Safe,
    /// `[20, 40)`.
    Low,
    /// `[40, 60)`.
    Moderate,
    /// `[60, 80)`.
    High,
    /// `[80, 100]`.
    Critical,
}

impl DangerZone {
    /// Zone for a score. Scores above 100 are critical.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=19 => DangerZone::Safe,
            20..=39 => DangerZone::Low,
            40..=59 => DangerZone::Moderate,
            60..=79 => DangerZone::High,
            _ => DangerZone::Critical,
        }
    }

    /// Uppercase label for overlays.
    pub fn label(&self) -> &'static str {
        match self {
            DangerZone::Safe => "SAFE",
            DangerZone::Low => "LOW",
            DangerZone::Moderate => "MODERATE",
            DangerZone::High => "HIGH",
            DangerZone::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for DangerZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-factor sub-scores, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FactorScores {
    pub player_hp: f64,
    pub pet_hp: f64,
    pub enemy_count: f64,
    pub nearby_npcs: f64,
    pub damage_rate: f64,
    pub pet_distance: f64,
}

impl FactorScores {
    /// Sub-score of a single factor.
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
}

/// Full result of one assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DangerReport {
    pub factors: FactorScores,
    pub score: u8,
    pub zone: DangerZone,
}

/// Stateful danger scorer. The only state carried between ticks is the damage window.
#[derive(Debug, Clone)]
pub struct DangerAssessment {
    weights: DangerWeights,
    threat_radius: f64,
    max_follow_range: f64,
    /// `(timestamp, player hits)`, oldest first.
    damage_history: VecDeque<(f64, i32)>,
}

impl Default for DangerAssessment {
    fn default() -> Self {
        Self::new(DangerWeights::default())
    }
}

impl DangerAssessment {
    /// Create an assessor with the given weights (normalized on entry).
    pub fn new(weights: DangerWeights) -> Self {
        Self {
            weights: weights.sanitized(),
            threat_radius: DEFAULT_THREAT_RADIUS,
            max_follow_range: MAX_FOLLOW_RANGE,
            damage_history: VecDeque::with_capacity(DAMAGE_WINDOW_SAMPLES + 1),
        }
    }

    /// Set the radius inside which NPCs count.
    pub fn with_threat_radius(mut self, radius: f64) -> Self {
        self.threat_radius = radius.max(0.0);
        self
    }

    /// Set the pet follow range used by the distance factor.
    pub fn with_max_follow_range(mut self, range: f64) -> Self {
        self.max_follow_range = range.max(1.0);
        self
    }

    /// Current normalized weights.
    pub fn weights(&self) -> &DangerWeights {
        &self.weights
    }

    /// Radius inside which NPCs count as a threat.
    pub fn threat_radius(&self) -> f64 {
        self.threat_radius
    }

    /// Update any subset of the factor weights, clamping each to `[0, 1]`, then renormalize.
    pub fn configure_weights(&mut self, updates: impl IntoIterator<Item = (DangerFactor, f64)>) {
        for (factor, weight) in updates {
            self.weights.set(factor, weight);
        }
        self.weights.normalize();
        info!(weights = ?self.weights, "danger weights updated");
    }

    /// Forget recorded player HP samples, e.g. after recalling to safety.
    pub fn reset_damage_history(&mut self) {
        self.damage_history.clear();
    }

    /// Score the current situation.
    ///
    /// `player_pos` overrides the player's reported position when measuring NPC distance.
    pub fn calculate_danger<W: WorldView + ?Sized>(
        &mut self,
        world: &W,
        pets: &[PetDescriptor],
        engaged_enemies: u32,
        nearby_npcs: &[Position],
        player_pos: Option<Position>,
    ) -> u8 {
        self.assess(world, pets, engaged_enemies, nearby_npcs, player_pos).score
    }

    /// Score the current situation and keep the per-factor breakdown.
    pub fn assess<W: WorldView + ?Sized>(
        &mut self,
        world: &W,
        pets: &[PetDescriptor],
        engaged_enemies: u32,
        nearby_npcs: &[Position],
        player_pos: Option<Position>,
    ) -> DangerReport {
        let now = world.now();
        let player = match world.player() {
            Ok(player) => Some(player),
            Err(err) => {
                info!(%err, "player snapshot unavailable for danger assessment");
                None
            }
        };

        let live = live_pets(world, pets);

        let factors = FactorScores {
            player_hp: player.map_or(PLAYER_HP_FALLBACK, |p| player_hp_danger(&p)),
            pet_hp: match &live {
                Ok(live) => pet_hp_danger(live),
                Err(err) => {
                    info!(%err, "pet lookup failed");
                    PET_HP_FALLBACK
                }
            },
            enemy_count: enemy_count_danger(engaged_enemies),
            nearby_npcs: match player_pos.or(player.map(|p| p.position)) {
                Some(origin) => npc_danger(origin.count_within(nearby_npcs, self.threat_radius)),
                None => 0.0,
            },
            damage_rate: match player {
                Some(p) => self.damage_rate_danger(now, &p),
                None => 0.0,
            },
            pet_distance: match &live {
                Ok(live) => pet_distance_danger(live, self.max_follow_range),
                Err(_) => 0.0,
            },
        };

        let weighted: f64 = DangerFactor::ALL
            .iter()
            .map(|factor| self.weights.get(*factor) * factors.get(*factor))
            .sum();

        let score = if weighted.is_finite() {
            weighted.round().clamp(0.0, 100.0) as u8
        } else {
            OVERALL_FALLBACK
        };
        let zone = DangerZone::from_score(score);
        debug!(score, %zone, ?factors, "danger assessed");

        DangerReport {
            factors,
            score,
            zone,
        }
    }

    /// Zone for a score.
    pub fn get_danger_zone(score: u8) -> DangerZone {
        DangerZone::from_score(score)
    }

    /// Check if a score warrants fleeing.
    pub fn should_flee(score: u8, threshold: u8) -> bool {
        score >= threshold
    }

    /// Record the player's HP and turn the recent loss into a sub-score.
    fn damage_rate_danger(&mut self, now: f64, player: &PlayerSnapshot) -> f64 {
        if player.hits_max <= 0 {
            return 0.0;
        }

        // Clock went backwards; the window is meaningless now.
        if self.damage_history.back().is_some_and(|(t, _)| *t > now) {
            self.damage_history.clear();
        }
        self.damage_history.push_back((now, player.hits));
        while self.damage_history.len() > DAMAGE_WINDOW_SAMPLES {
            self.damage_history.pop_front();
        }
        while self
            .damage_history
            .front()
            .is_some_and(|(t, _)| now - *t > DAMAGE_WINDOW_SECS)
        {
            self.damage_history.pop_front();
        }

        if self.damage_history.len() < 2 {
            return 0.0;
        }
        let (Some(&(t0, hp0)), Some(&(t1, hp1))) =
            (self.damage_history.front(), self.damage_history.back())
        else {
            return 0.0;
        };
        let elapsed = t1 - t0;
        if elapsed < 1.0 {
            return 0.0;
        }

        let dps = f64::from(hp0 - hp1) / elapsed;
        (dps / DAMAGE_RATE_CEILING * 100.0).clamp(0.0, 100.0)
    }
}

/// Pets that are in range and alive, with their live status.
fn live_pets<'a, W: WorldView + ?Sized>(
    world: &W,
    pets: &'a [PetDescriptor],
) -> Result<Vec<(&'a PetDescriptor, MobileStatus)>, farm_world::HostError> {
    let mut live = Vec::with_capacity(pets.len());
    for pet in pets {
        if let Some(status) = world.find_mobile(pet.serial)? {
            if !status.is_dead {
                live.push((pet, status));
            }
        }
    }
    Ok(live)
}

fn player_hp_danger(player: &PlayerSnapshot) -> f64 {
    let Some(hp_percent) = player.hp_percent() else {
        return PLAYER_HP_FALLBACK;
    };
    let mut danger = 100.0 - hp_percent;
    if hp_percent <= 30.0 {
        danger *= 1.5;
    }
    danger.clamp(0.0, 100.0)
}

fn pet_hp_danger(live: &[(&PetDescriptor, MobileStatus)]) -> f64 {
    let dangers: Vec<f64> = live
        .iter()
        .filter_map(|(pet, status)| {
            let hp_percent = status.hp_percent()?;
            let mut danger = 100.0 - hp_percent;
            if hp_percent <= 20.0 {
                danger *= 1.3;
            }
            if pet.is_tank {
                danger *= 1.2;
            }
            Some(danger.clamp(0.0, 100.0))
        })
        .collect();

    if dangers.is_empty() {
        return 0.0;
    }
    let mean = dangers.iter().sum::<f64>() / dangers.len() as f64;
    let max = dangers.iter().copied().fold(0.0, f64::max);
    (0.6 * mean + 0.4 * max).clamp(0.0, 100.0)
}

fn enemy_count_danger(engaged: u32) -> f64 {
    (100.0 * f64::from(engaged) / ENEMY_SATURATION).min(100.0)
}

fn npc_danger(count: usize) -> f64 {
    match count {
        0 => 0.0,
        1 => 15.0,
        2 => 30.0,
        3 => 50.0,
        n => (50.0 + 15.0 * (n - 3) as f64).min(100.0),
    }
}

fn pet_distance_danger(live: &[(&PetDescriptor, MobileStatus)], max_follow_range: f64) -> f64 {
    if live.is_empty() {
        return 0.0;
    }
    let distances: Vec<f64> = live.iter().map(|(_, status)| status.distance.max(0.0)).collect();
    let n = distances.len() as f64;
    let mean = distances.iter().sum::<f64>() / n;
    let variance = distances.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
    let spread = variance.sqrt();
    let farthest = distances.iter().copied().fold(0.0, f64::max);

    let spread_danger = (spread / 10.0 * 100.0).min(100.0);
    let straggler_danger = (farthest / max_follow_range * 100.0).min(100.0);
    0.5 * spread_danger + 0.5 * straggler_danger
}

#[cfg(test)]
mod tests {
    use super::*;
    use farm_world::{Serial, SimHost};

    fn pet_status(serial: u32, hits: i32, distance: f64) -> MobileStatus {
        MobileStatus {
            serial: Serial(serial),
            hits,
            hits_max: 100,
            distance,
            is_dead: false,
        }
    }

    #[test]
    fn test_zone_boundaries() {
        assert_eq!(DangerZone::from_score(0), DangerZone::Safe);
        assert_eq!(DangerZone::from_score(19), DangerZone::Safe);
        assert_eq!(DangerZone::from_score(20), DangerZone::Low);
        assert_eq!(DangerZone::from_score(59), DangerZone::Moderate);
        assert_eq!(DangerZone::from_score(60), DangerZone::High);
        assert_eq!(DangerZone::from_score(80), DangerZone::Critical);
        assert_eq!(DangerZone::from_score(100), DangerZone::Critical);
        assert_eq!(DangerZone::from_score(255), DangerZone::Critical);
    }

    #[test]
    fn test_should_flee_threshold() {
        assert!(!DangerAssessment::should_flee(69, DEFAULT_FLEE_THRESHOLD));
        assert!(DangerAssessment::should_flee(70, DEFAULT_FLEE_THRESHOLD));
        assert!(DangerAssessment::should_flee(40, 40));
    }

    #[test]
    fn test_safe_idle_scores_zero() {
        let host = SimHost::new(1_000.0);
        let mut danger = DangerAssessment::default();
        assert_eq!(danger.calculate_danger(&host, &[], 0, &[], None), 0);
    }

    #[test]
    fn test_wounded_player_is_amplified() {
        let mut host = SimHost::new(1_000.0);
        host.set_hits(30, 100);
        let mut danger = DangerAssessment::default();

        let report = danger.assess(&host, &[], 0, &[], None);
        assert_eq!(report.factors.player_hp, 100.0);
        assert_eq!(report.score, 30);
        assert_eq!(report.zone, DangerZone::Low);
    }

    #[test]
    fn test_unknown_max_hp_is_moderate() {
        let mut host = SimHost::new(1_000.0);
        host.set_hits(0, 0);
        let mut danger = DangerAssessment::default();
        let report = danger.assess(&host, &[], 0, &[], None);
        assert_eq!(report.factors.player_hp, 50.0);
    }

    #[test]
    fn test_missing_player_uses_fallbacks() {
        let mut host = SimHost::new(1_000.0);
        host.player = None;
        let mut danger = DangerAssessment::default();

        let report = danger.assess(&host, &[], 2, &[Position::new(1, 1)], None);
        assert_eq!(report.factors.player_hp, 50.0);
        assert_eq!(report.factors.nearby_npcs, 0.0);
        assert_eq!(report.factors.damage_rate, 0.0);
        assert_eq!(report.factors.enemy_count, 40.0);
    }

    #[test]
    fn test_enemy_and_npc_curves() {
        assert_eq!(enemy_count_danger(0), 0.0);
        assert_eq!(enemy_count_danger(4), 80.0);
        assert_eq!(enemy_count_danger(9), 100.0);

        assert_eq!(npc_danger(1), 15.0);
        assert_eq!(npc_danger(3), 50.0);
        assert_eq!(npc_danger(5), 80.0);
        assert_eq!(npc_danger(12), 100.0);
    }

    #[test]
    fn test_npcs_outside_radius_ignored() {
        let host = SimHost::new(1_000.0);
        let mut danger = DangerAssessment::default().with_threat_radius(5.0);
        let npcs = [Position::new(3, 4), Position::new(6, 0), Position::new(0, 9)];

        let report = danger.assess(&host, &[], 0, &npcs, None);
        assert_eq!(report.factors.nearby_npcs, 15.0);

        let report = danger.assess(&host, &[], 0, &npcs, Some(Position::new(6, 1)));
        assert_eq!(report.factors.nearby_npcs, 30.0);
    }

    #[test]
    fn test_pet_hp_worst_case_weighting() {
        let mut host = SimHost::new(1_000.0);
        host.set_mobile(pet_status(1, 100, 1.0));
        host.set_mobile(pet_status(2, 50, 1.0));
        let pets = [
            PetDescriptor::new(Serial(1), "healthy"),
            PetDescriptor::new(Serial(2), "hurt"),
        ];
        let mut danger = DangerAssessment::default();

        let report = danger.assess(&host, &pets, 0, &[], None);
        // mean 25, max 50
        assert!((report.factors.pet_hp - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_low_tank_pet_saturates() {
        let mut host = SimHost::new(1_000.0);
        host.set_mobile(pet_status(7, 10, 2.0));
        let pets = [PetDescriptor::new(Serial(7), "tank").tank()];
        let mut danger = DangerAssessment::default();

        let report = danger.assess(&host, &pets, 0, &[], None);
        assert_eq!(report.factors.pet_hp, 100.0);
    }

    #[test]
    fn test_dead_and_missing_pets_are_skipped() {
        let mut host = SimHost::new(1_000.0);
        let mut dead = pet_status(3, 0, 1.0);
        dead.is_dead = true;
        host.set_mobile(dead);
        let pets = [
            PetDescriptor::new(Serial(3), "dead"),
            PetDescriptor::new(Serial(4), "stabled"),
        ];
        let mut danger = DangerAssessment::default();

        let report = danger.assess(&host, &pets, 0, &[], None);
        assert_eq!(report.factors.pet_hp, 0.0);
        assert_eq!(report.factors.pet_distance, 0.0);
    }

    #[test]
    fn test_pet_spread() {
        let mut host = SimHost::new(1_000.0);
        host.set_mobile(pet_status(1, 100, 0.0));
        host.set_mobile(pet_status(2, 100, 10.0));
        let pets = [
            PetDescriptor::new(Serial(1), "a"),
            PetDescriptor::new(Serial(2), "b"),
        ];
        let mut danger = DangerAssessment::default();

        let report = danger.assess(&host, &pets, 0, &[], None);
        // sigma 5 -> 50, max 10/15 -> 66.67
        let expected = 0.5 * 50.0 + 0.5 * (10.0 / 15.0 * 100.0);
        assert!((report.factors.pet_distance - expected).abs() < 1e-9);
    }

    #[test]
    fn test_damage_rate_window() {
        let mut host = SimHost::new(1_000.0);
        let mut danger = DangerAssessment::default();

        // A single sample cannot produce a rate.
        assert_eq!(danger.assess(&host, &[], 0, &[], None).factors.damage_rate, 0.0);

        host.advance(2.0);
        host.set_hits(90, 100);
        // 10 hp over 2s = 5 dps -> 50
        let report = danger.assess(&host, &[], 0, &[], None);
        assert!((report.factors.damage_rate - 50.0).abs() < 1e-9);

        // Samples older than the window are dropped.
        host.advance(30.0);
        let report = danger.assess(&host, &[], 0, &[], None);
        assert_eq!(report.factors.damage_rate, 0.0);
    }

    #[test]
    fn test_damage_rate_needs_one_second() {
        let mut host = SimHost::new(1_000.0);
        let mut danger = DangerAssessment::default();
        danger.assess(&host, &[], 0, &[], None);

        host.advance(0.5);
        host.set_hits(50, 100);
        assert_eq!(danger.assess(&host, &[], 0, &[], None).factors.damage_rate, 0.0);
    }

    #[test]
    fn test_healing_is_not_danger() {
        let mut host = SimHost::new(1_000.0);
        host.set_hits(50, 100);
        let mut danger = DangerAssessment::default();
        danger.assess(&host, &[], 0, &[], None);

        host.advance(3.0);
        host.set_hits(80, 100);
        assert_eq!(danger.assess(&host, &[], 0, &[], None).factors.damage_rate, 0.0);
    }

    #[test]
    fn test_configure_weights_normalizes() {
        let mut danger = DangerAssessment::default();
        danger.configure_weights([
            (DangerFactor::PlayerHp, 0.9),
            (DangerFactor::EnemyCount, 3.0),
            (DangerFactor::PetDistance, -1.0),
        ]);

        let weights = danger.weights();
        assert!((weights.total() - 1.0).abs() < 1e-9);
        assert_eq!(weights.pet_distance, 0.0);
        assert!(weights.enemy_count > weights.player_hp);
    }

    #[test]
    fn test_score_is_bounded() {
        let mut host = SimHost::new(1_000.0);
        host.set_hits(1, 100);
        let npcs: Vec<Position> = (0..10).map(|i| Position::new(i, 0)).collect();
        let mut danger = DangerAssessment::default();

        let score = danger.calculate_danger(&host, &[], 50, &npcs, None);
        assert!(score <= 100);
        assert_eq!(DangerAssessment::get_danger_zone(score), DangerZone::from_score(score));
    }
}
