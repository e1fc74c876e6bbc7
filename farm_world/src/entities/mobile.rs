//! Mobiles, pets, enemies and carried items.

use serde::{Deserialize, Serialize};

use super::{Graphic, Position, Serial};

/// Live status of a mobile as returned by a host lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MobileStatus {
    pub serial: Serial,
    pub hits: i32,
    pub hits_max: i32,
    /// Distance from the player in tiles, as the host measures it.
    pub distance: f64,
    pub is_dead: bool,
}

impl MobileStatus {
    /// Hit points as a percentage of maximum, or `None` when the maximum is unknown.
    pub fn hp_percent(&self) -> Option<f64> {
        if self.hits_max <= 0 {
            return None;
        }
        Some(f64::from(self.hits.max(0)) / f64::from(self.hits_max) * 100.0)
    }
}

/// A pet the script is responsible for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetDescriptor {
    pub serial: Serial,
    #[serde(default)]
    pub name: String,
    /// Tanks take the hits; losing one is worse than losing a support pet.
    #[serde(default)]
    pub is_tank: bool,
}

impl PetDescriptor {
    /// Create a new non-tank pet descriptor.
    pub fn new(serial: Serial, name: impl Into<String>) -> Self {
        Self {
            serial,
            name: name.into(),
            is_tank: false,
        }
    }

    /// Mark this pet as the tank.
    pub fn tank(mut self) -> Self {
        self.is_tank = true;
        self
    }
}

/// Hostile presence around the player for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnemyView {
    /// Hostiles currently fighting the player or the pets.
    pub engaged_count: u32,
    pub nearby_npc_positions: Vec<Position>,
}

/// An item stack found in a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub serial: Serial,
    pub graphic: Graphic,
    pub amount: u32,
    pub container: Serial,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pet_descriptor_builder() {
        let pet = PetDescriptor::new(Serial(42), "Nightmare").tank();
        assert!(pet.is_tank);
        assert_eq!(pet.name, "Nightmare");
    }

    #[test]
    fn test_mobile_hp_percent() {
        let mobile = MobileStatus {
            serial: Serial(1),
            hits: 10,
            hits_max: 0,
            distance: 1.0,
            is_dead: false,
        };
        assert_eq!(mobile.hp_percent(), None);
    }
}
