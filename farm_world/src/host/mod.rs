//! The host bridge contract - everything the decision core reads from or asks of the game client.
//!
//! The core never talks to the client directly. It reads world state through [`WorldView`],
//! persists small string values through [`PersistentStore`], and yields, messages and acts
//! through [`HostBridge`]. Every call that waits on the server is bounded by an explicit
//! timeout, and a failure is a [`HostError`] the calling state retries on a later tick.

mod store;

pub use store::*;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::entities::{EnemyView, Graphic, Item, MobileStatus, PlayerSnapshot, Serial};

/// Recoverable failures reported by the host.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("{operation} timed out after {seconds:.1}s")]
    Timeout { operation: String, seconds: f64 },
    #[error("host state unavailable: {0}")]
    Unavailable(String),
    #[error("host rejected request: {0}")]
    Rejected(String),
}

/// Scope a persisted value is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Private to the logged-in character.
    #[default]
    Character,
    /// Shared by every character on the client.
    Global,
}

/// Hue conventions for user-visible message lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageHue {
    Error,
    Warn,
    Info,
    Success,
}

impl MessageHue {
    /// Client hue number for this message class.
    pub fn hue(&self) -> u16 {
        match self {
            MessageHue::Error => 32,
            MessageHue::Warn => 43,
            MessageHue::Info => 88,
            MessageHue::Success => 68,
        }
    }
}

/// The action the main loop asks the host to carry out for a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Do nothing this tick.
    Idle,
    /// Run the profession's harvest step.
    Harvest,
    /// Travel to storage and deposit loot.
    Bank,
    /// Escape to safety, typically a recall home.
    Flee,
}

impl Action {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Idle => "idle",
            Action::Harvest => "harvest",
            Action::Bank => "bank",
            Action::Flee => "flee",
        }
    }
}

/// Read-only queries against the live world.
pub trait WorldView {
    /// Snapshot of the player for this tick.
    fn player(&self) -> Result<PlayerSnapshot, HostError>;

    /// Look up a mobile by serial. `Ok(None)` means it is not in range.
    fn find_mobile(&self, serial: Serial) -> Result<Option<MobileStatus>, HostError>;

    /// All item stacks with `graphic` inside `container`.
    fn find_items(&self, graphic: Graphic, container: Serial) -> Result<Vec<Item>, HostError>;

    /// Hostiles engaged with the player or pets, and NPCs the client can see.
    fn enemy_view(&self) -> Result<EnemyView, HostError>;

    /// Seconds since the Unix epoch as seen by the host.
    fn now(&self) -> f64 {
        chrono::Utc::now().timestamp_millis() as f64 / 1000.0
    }

    /// Total amount of `graphic` inside `container`, summed across stacks.
    fn count_items(&self, graphic: Graphic, container: Serial) -> Result<u32, HostError> {
        Ok(self
            .find_items(graphic, container)?
            .iter()
            .map(|item| item.amount)
            .sum())
    }
}

/// Host key/value store. Values are always strings.
pub trait PersistentStore {
    /// Read `key`, returning `default` when it has never been written.
    fn get_persistent(&self, key: &str, default: &str, scope: Scope) -> String;

    /// Write `key`.
    fn save_persistent(&mut self, key: &str, value: &str, scope: Scope) -> Result<(), HostError>;
}

/// The full host façade driven by the main loop.
pub trait HostBridge: WorldView + PersistentStore {
    /// Print a user-visible line in the client.
    fn sys_msg(&mut self, text: &str, hue: MessageHue);

    /// Cooperative yield back to the host for `seconds`.
    fn pause(&mut self, seconds: f64);

    /// Set when the user asked the script to stop.
    fn stop_requested(&self) -> bool;

    /// Clear any outstanding target cursor.
    fn cancel_all_targets(&mut self) -> Result<(), HostError>;

    /// Close any gumps the script opened.
    fn close_gumps(&mut self) -> Result<(), HostError>;

    /// Carry out `action`, giving up after `timeout`.
    fn execute(&mut self, action: Action, timeout: Duration) -> Result<(), HostError>;
}
