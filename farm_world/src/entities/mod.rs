//! Entity definitions for the host world.

mod mobile;
mod player;

pub use mobile::*;
pub use player::*;

use serde::{Deserialize, Serialize};

/// Host-assigned identifier for any mobile or item in the world. Defaults to nil.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Serial(pub u32);

impl Serial {
    /// The zero serial, used by the host for "no such object".
    pub fn nil() -> Self {
        Self(0)
    }

    /// Check if this serial refers to nothing.
    pub fn is_nil(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for Serial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Item artwork identifier understood by the host's item search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Graphic(pub u16);

impl Graphic {
    /// Gold coins.
    pub const GOLD: Graphic = Graphic(0x0EED);
}

impl std::fmt::Display for Graphic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// A tile coordinate on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Create a new position.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in tiles.
    pub fn distance_to(&self, other: Position) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }

    /// Number of `positions` within `radius` tiles of this one.
    pub fn count_within(&self, positions: &[Position], radius: f64) -> usize {
        positions
            .iter()
            .filter(|pos| self.distance_to(**pos) <= radius)
            .count()
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_distance() {
        let origin = Position::new(0, 0);
        assert_eq!(origin.distance_to(Position::new(3, 4)), 5.0);
        assert_eq!(origin.distance_to(origin), 0.0);
    }

    #[test]
    fn test_count_within_radius() {
        let npcs = [
            Position::new(3, 4),
            Position::new(6, 8),
            Position::new(20, 0),
        ];
        let origin = Position::new(0, 0);
        assert_eq!(origin.count_within(&npcs, 10.0), 2);
        assert_eq!(origin.count_within(&npcs, 4.0), 0);
        assert_eq!(origin.count_within(&[], 10.0), 0);
    }

    #[test]
    fn test_serial_display() {
        assert_eq!(Serial(0x1A2B).to_string(), "0x00001A2B");
        assert!(Serial::nil().is_nil());
        assert!(!Serial(7).is_nil());
    }

    #[test]
    fn test_default_snapshot_has_nil_backpack() {
        assert_eq!(Serial::default(), Serial::nil());
        assert!(PlayerSnapshot::default().backpack.is_nil());
    }
}
