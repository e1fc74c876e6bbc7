//! Banking triggers - decides when to interrupt farming to deposit.
//!
//! Conditions are checked cheapest first and the first hit wins:
//! weight, then elapsed time since the last bank, then gold carried, then bandage supply.
//! Evaluation is rate limited so the host is not hammered with item counts every tick.

mod config;

pub use config::*;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use farm_world::{
    Graphic, HostBridge, HostError, MessageHue, PersistentStore, Scope, SupplyKind, WorldView,
};

use crate::state_machine::WeightManager;

/// Minimum spacing between two evaluations of [`BankingTriggers::should_bank`].
pub const BANK_CHECK_INTERVAL_SECS: f64 = 10.0;

/// Why a bank trip was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankReason {
    Weight,
    Time,
    Gold,
    Supplies,
}

impl BankReason {
    /// Lowercase name used in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            BankReason::Weight => "weight",
            BankReason::Time => "time",
            BankReason::Gold => "gold",
            BankReason::Supplies => "supplies",
        }
    }
}

impl std::fmt::Display for BankReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Banking trigger evaluator with persisted configuration.
#[derive(Debug, Clone)]
pub struct BankingTriggers {
    key_prefix: String,
    scope: Scope,
    config: TriggerConfig,
    /// Seconds since the epoch; `0` means never banked.
    last_bank_time: f64,
    check_interval: f64,
    last_check: Option<f64>,
    bandage_graphic: Graphic,
    weights: WeightManager,
}

impl BankingTriggers {
    /// Create triggers with default thresholds, persisting under `key_prefix`.
    pub fn new(key_prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            scope: Scope::Character,
            config: TriggerConfig::default(),
            last_bank_time: 0.0,
            check_interval: BANK_CHECK_INTERVAL_SECS,
            last_check: None,
            bandage_graphic: SupplyKind::Bandages.default_graphic(),
            weights: WeightManager::default(),
        }
    }

    /// Start from `config` instead of the built-in defaults.
    pub fn with_config(mut self, config: TriggerConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the evaluation interval.
    pub fn with_check_interval(mut self, seconds: f64) -> Self {
        self.check_interval = seconds.max(0.0);
        self
    }

    /// Use a shard-specific bandage graphic for the supply trigger.
    pub fn with_bandage_graphic(mut self, graphic: Graphic) -> Self {
        self.bandage_graphic = graphic;
        self
    }

    /// Current trigger configuration.
    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// When the player last banked, `0` if never.
    pub fn last_bank_time(&self) -> f64 {
        self.last_bank_time
    }

    /// Persistence key of the trigger configuration.
    pub fn config_key(&self) -> String {
        format!("{}BankTriggers", self.key_prefix)
    }

    /// Persistence key of the last bank time.
    pub fn last_bank_key(&self) -> String {
        format!("{}LastBankTime", self.key_prefix)
    }

    /// Check whether to bank now.
    ///
    /// Returns `None` without touching the host if the previous evaluation was less than
    /// the check interval ago.
    pub fn should_bank<W: WorldView + ?Sized>(&mut self, world: &W) -> Option<BankReason> {
        let now = world.now();
        if self
            .last_check
            .is_some_and(|last| now - last < self.check_interval)
        {
            return None;
        }
        self.last_check = Some(now);
        self.evaluate(world, now)
    }

    /// Evaluate every enabled trigger in priority order, ignoring the rate limit.
    pub fn evaluate<W: WorldView + ?Sized>(&self, world: &W, now: f64) -> Option<BankReason> {
        let player = match world.player() {
            Ok(player) => Some(player),
            Err(err) => {
                info!(%err, "player unavailable, skipping carried-item triggers");
                None
            }
        };

        if let (true, Some(player)) = (self.config.weight.enabled, player) {
            let percent = self.weights.weight_percent(&player);
            if percent >= self.config.weight.threshold {
                return self.fire(BankReason::Weight, percent);
            }
        }

        if self.config.time.enabled && self.last_bank_time > 0.0 {
            let minutes = (now - self.last_bank_time) / 60.0;
            if minutes >= self.config.time.threshold {
                return self.fire(BankReason::Time, minutes);
            }
        }

        let Some(player) = player else {
            return None;
        };

        if self.config.gold.enabled {
            match world.count_items(Graphic::GOLD, player.backpack) {
                Ok(gold) if f64::from(gold) >= self.config.gold.threshold => {
                    return self.fire(BankReason::Gold, f64::from(gold));
                }
                Ok(_) => {}
                Err(err) => info!(%err, "gold count unavailable"),
            }
        }

        if self.config.supply.enabled {
            match world.count_items(self.bandage_graphic, player.backpack) {
                Ok(bandages) if f64::from(bandages) < self.config.supply.threshold => {
                    return self.fire(BankReason::Supplies, f64::from(bandages));
                }
                Ok(_) => {}
                Err(err) => info!(%err, "bandage count unavailable"),
            }
        }

        None
    }

    fn fire(&self, reason: BankReason, observed: f64) -> Option<BankReason> {
        info!(%reason, observed, "banking triggered");
        Some(reason)
    }

    /// Record that the player just banked, and persist it.
    pub fn track_last_bank<H: HostBridge + ?Sized>(
        &mut self,
        host: &mut H,
    ) -> Result<(), HostError> {
        self.last_bank_time = host.now();
        host.save_persistent(
            &self.last_bank_key(),
            &self.last_bank_time.to_string(),
            self.scope,
        )
    }

    /// Minutes until the time trigger fires.
    ///
    /// `None` when the time trigger is disabled or there is no previous bank to count from.
    pub fn get_time_until_next_bank(&self, now: f64) -> Option<f64> {
        if !self.config.time.enabled || self.last_bank_time <= 0.0 {
            return None;
        }
        let elapsed = (now - self.last_bank_time) / 60.0;
        Some((self.config.time.threshold - elapsed).max(0.0))
    }

    /// Apply a partial configuration update and persist the result.
    pub fn configure_triggers<S: PersistentStore + ?Sized>(
        &mut self,
        store: &mut S,
        update: TriggerUpdate,
    ) -> Result<(), HostError> {
        update.apply_to(&mut self.config);
        info!(config = %self.config, "banking triggers updated");
        self.save(store)
    }

    /// Persist the trigger configuration and last bank time.
    pub fn save<S: PersistentStore + ?Sized>(&self, store: &mut S) -> Result<(), HostError> {
        store.save_persistent(&self.config_key(), &self.config.to_string(), self.scope)?;
        store.save_persistent(
            &self.last_bank_key(),
            &self.last_bank_time.to_string(),
            self.scope,
        )
    }

    /// Load persisted state. Failures keep the current values and tell the user.
    pub fn load<H: HostBridge + ?Sized>(&mut self, host: &mut H) {
        let raw = host.get_persistent(&self.config_key(), "", self.scope);
        if !raw.trim().is_empty() {
            match raw.parse::<TriggerConfig>() {
                Ok(config) => {
                    debug!(%config, "banking triggers loaded");
                    self.config = config;
                }
                Err(err) => {
                    warn!(%err, raw = %raw, "corrupt banking triggers, keeping defaults");
                    host.sys_msg(
                        &format!("Banking triggers unreadable ({err}); using defaults"),
                        MessageHue::Warn,
                    );
                }
            }
        }

        let raw = host.get_persistent(&self.last_bank_key(), "0", self.scope);
        match raw.trim().parse::<f64>() {
            Ok(time) if time.is_finite() && time >= 0.0 => self.last_bank_time = time,
            _ => {
                warn!(raw = %raw, "corrupt last bank time, treating as never banked");
                host.sys_msg("Last bank time unreadable; reset", MessageHue::Warn);
                self.last_bank_time = 0.0;
            }
        }
    }
}
