//! Consumable supplies the farmer carries and tracks.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::entities::Graphic;

/// Consumables whose depletion the core forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyKind {
    Bandages,
    VetKits,
    Potions,
}

impl SupplyKind {
    /// Every known supply kind.
    pub const ALL: [SupplyKind; 3] = [
        SupplyKind::Bandages,
        SupplyKind::VetKits,
        SupplyKind::Potions,
    ];

    /// Default item artwork for this supply on a stock shard.
    pub fn default_graphic(&self) -> Graphic {
        match self {
            SupplyKind::Bandages => Graphic(0x0E21),
            SupplyKind::VetKits => Graphic(0x0E50),
            SupplyKind::Potions => Graphic(0x0F0C),
        }
    }

    /// Stable lowercase name, used in persistence keys and session records.
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplyKind::Bandages => "bandages",
            SupplyKind::VetKits => "vet_kits",
            SupplyKind::Potions => "potions",
        }
    }
}

impl std::fmt::Display for SupplyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a supply name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown supply kind '{0}'")]
pub struct UnknownSupplyKind(pub String);

impl FromStr for SupplyKind {
    type Err = UnknownSupplyKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SupplyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownSupplyKind(s.to_string()))
    }
}

/// One observation of a supply count at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub count: u32,
}

impl UsageSample {
    /// Create a new sample.
    pub fn new(timestamp: f64, count: u32) -> Self {
        Self { timestamp, count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supply_names_round_trip() {
        for kind in SupplyKind::ALL {
            assert_eq!(kind.as_str().parse::<SupplyKind>(), Ok(kind));
        }
        assert_eq!("VET_KITS".parse::<SupplyKind>(), Ok(SupplyKind::VetKits));
    }

    #[test]
    fn test_unknown_supply() {
        let err = "arrows".parse::<SupplyKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown supply kind 'arrows'");
    }
}
