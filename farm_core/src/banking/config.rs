//! Banking trigger configuration and its persisted form.
//!
//! The host store only keeps strings, so the four triggers are packed into a single
//! pipe-delimited value: `W_en:W_pct|T_en:T_min|G_en:G_amt|S_en:S_ct`, with flags written
//! as `1`/`0`.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing a persisted trigger string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerConfigError {
    #[error("expected 4 trigger segments, found {0}")]
    SegmentCount(usize),
    #[error("trigger segment '{0}' is not of the form enabled:threshold")]
    Malformed(String),
    #[error("invalid trigger flag '{0}'")]
    Flag(String),
    #[error("invalid trigger threshold '{0}'")]
    Threshold(String),
}

/// One banking condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub enabled: bool,
    pub threshold: f64,
}

impl Trigger {
    /// An enabled trigger at `threshold`.
    pub fn on(threshold: f64) -> Self {
        Self {
            enabled: true,
            threshold,
        }
    }
}

/// All four banking conditions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Percent of max weight.
    pub weight: Trigger,
    /// Minutes since the last bank.
    pub time: Trigger,
    /// Gold coins carried.
    pub gold: Trigger,
    /// Bandages carried; banks when the count drops below this.
    pub supply: Trigger,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            weight: Trigger::on(80.0),
            time: Trigger::on(60.0),
            gold: Trigger::on(10_000.0),
            supply: Trigger::on(50.0),
        }
    }
}

impl TriggerConfig {
    /// Check that every threshold is usable.
    pub fn validate(&self) -> Result<(), TriggerConfigError> {
        for trigger in [self.weight, self.time, self.gold, self.supply] {
            if !trigger.threshold.is_finite() || trigger.threshold < 0.0 {
                return Err(TriggerConfigError::Threshold(trigger.threshold.to_string()));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for TriggerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let segments = [self.weight, self.time, self.gold, self.supply]
            .map(|t| format!("{}:{}", u8::from(t.enabled), t.threshold));
        f.write_str(&segments.join("|"))
    }
}

impl FromStr for TriggerConfig {
    type Err = TriggerConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.trim().split('|').collect();
        if segments.len() != 4 {
            return Err(TriggerConfigError::SegmentCount(segments.len()));
        }
        let parsed = segments
            .iter()
            .map(|segment| parse_trigger(segment))
            .collect::<Result<Vec<_>, _>>()?;

        let config = TriggerConfig {
            weight: parsed[0],
            time: parsed[1],
            gold: parsed[2],
            supply: parsed[3],
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_trigger(segment: &str) -> Result<Trigger, TriggerConfigError> {
    let (flag, threshold) = segment
        .split_once(':')
        .ok_or_else(|| TriggerConfigError::Malformed(segment.to_string()))?;

    let enabled = match flag.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => true,
        "0" | "false" => false,
        other => return Err(TriggerConfigError::Flag(other.to_string())),
    };
    let threshold = threshold
        .trim()
        .parse::<f64>()
        .map_err(|_| TriggerConfigError::Threshold(threshold.to_string()))?;

    Ok(Trigger { enabled, threshold })
}

/// A partial update to [`TriggerConfig`]; `None` leaves a setting untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TriggerUpdate {
    pub weight_enabled: Option<bool>,
    pub weight_threshold_pct: Option<f64>,
    pub time_enabled: Option<bool>,
    pub time_interval_minutes: Option<f64>,
    pub gold_enabled: Option<bool>,
    pub gold_amount: Option<f64>,
    pub supply_enabled: Option<bool>,
    pub supply_bandage_threshold: Option<f64>,
}

impl TriggerUpdate {
    /// Apply the update. Negative or non-finite thresholds are ignored.
    pub fn apply_to(&self, config: &mut TriggerConfig) {
        fn set_threshold(slot: &mut f64, value: Option<f64>) {
            if let Some(value) = value.filter(|v| v.is_finite() && *v >= 0.0) {
                *slot = value;
            }
        }

        if let Some(enabled) = self.weight_enabled {
            config.weight.enabled = enabled;
        }
        if let Some(enabled) = self.time_enabled {
            config.time.enabled = enabled;
        }
        if let Some(enabled) = self.gold_enabled {
            config.gold.enabled = enabled;
        }
        if let Some(enabled) = self.supply_enabled {
            config.supply.enabled = enabled;
        }
        set_threshold(&mut config.weight.threshold, self.weight_threshold_pct);
        set_threshold(&mut config.time.threshold, self.time_interval_minutes);
        set_threshold(&mut config.gold.threshold, self.gold_amount);
        set_threshold(&mut config.supply.threshold, self.supply_bandage_threshold);
    }
}
