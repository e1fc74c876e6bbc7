//! Farmer configuration, loadable from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! key_prefix = "Miner_"
//! flee_threshold = 65
//! area = "Minoc Mine"
//!
//! [danger_weights]
//! player_hp = 0.4
//!
//! [triggers.gold]
//! enabled = true
//! threshold = 25000
//!
//! [[pets]]
//! serial = 1234567
//! name = "Nightmare"
//! is_tank = true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use farm_world::{Graphic, PetDescriptor, SupplyKind};

use crate::banking::{TriggerConfig, BANK_CHECK_INTERVAL_SECS};
use crate::danger::{
    DangerFactor, DangerWeights, DEFAULT_FLEE_THRESHOLD, DEFAULT_THREAT_RADIUS, MAX_FOLLOW_RANGE,
};
use crate::supply::{DEFAULT_CRITICAL_HOURS, SUPPLY_CHECK_INTERVAL_SECS};

/// Errors loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Everything a farmer instance needs to start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmConfig {
    /// Prefix for every persisted key, so several scripts can share one store.
    pub key_prefix: String,
    pub log_dir: PathBuf,
    /// Cooperative pause between ticks.
    pub tick_pause_secs: f64,
    /// Upper bound on any single host action.
    pub host_timeout_secs: f64,
    pub flee_threshold: u8,
    pub threat_radius: f64,
    pub max_follow_range: f64,
    pub supply_check_interval_secs: f64,
    pub bank_check_interval_secs: f64,
    pub critical_supply_hours: f64,
    /// Stones kept free when deciding whether the pack is full.
    pub weight_reserve: u32,
    /// Name of the spot being farmed, credited with the session's gold and time.
    pub area: Option<String>,
    pub danger_weights: DangerWeights,
    pub triggers: TriggerConfig,
    pub pets: Vec<PetDescriptor>,
    pub supplies: Vec<SupplyKind>,
    /// Shard-specific artwork overrides.
    pub supply_graphics: BTreeMap<SupplyKind, Graphic>,
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            key_prefix: "Farm_".to_string(),
            log_dir: PathBuf::from("logs"),
            tick_pause_secs: 0.3,
            host_timeout_secs: 5.0,
            flee_threshold: DEFAULT_FLEE_THRESHOLD,
            threat_radius: DEFAULT_THREAT_RADIUS,
            max_follow_range: MAX_FOLLOW_RANGE,
            supply_check_interval_secs: SUPPLY_CHECK_INTERVAL_SECS,
            bank_check_interval_secs: BANK_CHECK_INTERVAL_SECS,
            critical_supply_hours: DEFAULT_CRITICAL_HOURS,
            weight_reserve: 0,
            area: None,
            danger_weights: DangerWeights::default(),
            triggers: TriggerConfig::default(),
            pets: Vec::new(),
            supplies: SupplyKind::ALL.to_vec(),
            supply_graphics: BTreeMap::new(),
        }
    }
}

impl FarmConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: FarmConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("tick_pause_secs", self.tick_pause_secs),
            ("host_timeout_secs", self.host_timeout_secs),
            ("threat_radius", self.threat_radius),
            ("max_follow_range", self.max_follow_range),
            ("supply_check_interval_secs", self.supply_check_interval_secs),
            ("bank_check_interval_secs", self.bank_check_interval_secs),
            ("critical_supply_hours", self.critical_supply_hours),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be a non-negative number (got {value})"
                )));
            }
        }

        if self.flee_threshold > 100 {
            return Err(ConfigError::Invalid(format!(
                "flee_threshold must be between 0 and 100 (got {})",
                self.flee_threshold
            )));
        }

        for factor in DangerFactor::ALL {
            let weight = self.danger_weights.get(factor);
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "danger weight {factor:?} must be non-negative (got {weight})"
                )));
            }
        }

        self.triggers
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if self.triggers.weight.threshold > 100.0 {
            return Err(ConfigError::Invalid(format!(
                "weight trigger must be a percentage (got {})",
                self.triggers.weight.threshold
            )));
        }
        Ok(())
    }

    /// Host action timeout as a [`Duration`].
    pub fn host_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.host_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farm_world::Serial;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(FarmConfig::from_toml_str("").unwrap(), FarmConfig::default());
    }

    #[test]
    fn test_parse_full_document() {
        let config = FarmConfig::from_toml_str(
            r#"
            key_prefix = "Miner_"
            flee_threshold = 65
            supplies = ["bandages", "potions"]
            area = "Shame 2"

            [danger_weights]
            player_hp = 0.5

            [triggers.gold]
            enabled = false
            threshold = 25000

            [supply_graphics]
            bandages = 3617

            [[pets]]
            serial = 1234567
            name = "Nightmare"
            is_tank = true
            "#,
        )
        .unwrap();

        assert_eq!(config.key_prefix, "Miner_");
        assert_eq!(config.flee_threshold, 65);
        assert_eq!(config.area.as_deref(), Some("Shame 2"));
        assert_eq!(config.danger_weights.player_hp, 0.5);
        assert_eq!(config.danger_weights.pet_hp, 0.25);
        assert!(!config.triggers.gold.enabled);
        assert_eq!(config.triggers.gold.threshold, 25_000.0);
        assert_eq!(config.triggers.weight.threshold, 80.0);
        assert_eq!(config.supplies, vec![SupplyKind::Bandages, SupplyKind::Potions]);
        assert_eq!(config.supply_graphics[&SupplyKind::Bandages], Graphic(3617));
        assert_eq!(config.pets[0].serial, Serial(1234567));
        assert!(config.pets[0].is_tank);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(matches!(
            FarmConfig::from_toml_str("flee_threshold = 150"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            FarmConfig::from_toml_str("tick_pause_secs = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            FarmConfig::from_toml_str("[danger_weights]\nnearby_npcs = -0.5"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            FarmConfig::from_toml_str("key_prefix = 12"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = FarmConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
