//! A scripted in-process host for dry runs and tests.
//!
//! `SimHost` holds the whole world as plain fields. Pausing advances its clock, so a
//! main loop driven against it runs in simulated time.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tracing::debug;

use crate::entities::{EnemyView, Graphic, Item, MobileStatus, PlayerSnapshot, Position, Serial};
use crate::host::{
    Action, HostBridge, HostError, MemoryStore, MessageHue, PersistentStore, Scope, WorldView,
};

/// A fully scripted host.
#[derive(Debug, Clone, Default)]
pub struct SimHost {
    /// `None` makes every player read fail.
    pub player: Option<PlayerSnapshot>,
    pub mobiles: HashMap<Serial, MobileStatus>,
    pub items: Vec<Item>,
    pub enemies: EnemyView,
    /// Current time, seconds since the Unix epoch.
    pub clock: f64,
    pub store: MemoryStore,
    pub messages: Vec<(String, MessageHue)>,
    pub executed: Vec<Action>,
    /// Actions that time out instead of running.
    pub failing_actions: HashSet<Action>,
    pub stop: bool,
    /// Raise `stop` once the clock reaches this time.
    pub stop_at: Option<f64>,
    pub targets_cancelled: u32,
    pub gumps_closed: u32,
    next_serial: u32,
}

impl SimHost {
    /// Create a host with a healthy player at `clock`.
    pub fn new(clock: f64) -> Self {
        Self {
            player: Some(PlayerSnapshot {
                hits: 100,
                hits_max: 100,
                weight: 0,
                max_weight: 400,
                position: Position::new(0, 0),
                backpack: Serial(0x4000_0001),
            }),
            clock,
            next_serial: 0x4000_1000,
            ..Default::default()
        }
    }

    /// Mutable access to the player snapshot, creating a default one if missing.
    pub fn player_mut(&mut self) -> &mut PlayerSnapshot {
        self.player.get_or_insert_with(PlayerSnapshot::default)
    }

    /// Set the player's hit points.
    pub fn set_hits(&mut self, hits: i32, hits_max: i32) {
        let player = self.player_mut();
        player.hits = hits;
        player.hits_max = hits_max;
    }

    /// Set the player's carried weight.
    pub fn set_weight(&mut self, weight: u32, max_weight: u32) {
        let player = self.player_mut();
        player.weight = weight;
        player.max_weight = max_weight;
    }

    /// Backpack serial of the current player, or nil.
    pub fn backpack(&self) -> Serial {
        self.player.map(|p| p.backpack).unwrap_or_else(Serial::nil)
    }

    /// Replace every stack of `graphic` in the backpack with a single stack of `amount`.
    pub fn set_backpack_count(&mut self, graphic: Graphic, amount: u32) {
        let backpack = self.backpack();
        self.items
            .retain(|item| !(item.graphic == graphic && item.container == backpack));
        if amount > 0 {
            self.next_serial += 1;
            self.items.push(Item {
                serial: Serial(self.next_serial),
                graphic,
                amount,
                container: backpack,
            });
        }
    }

    /// Place or update a mobile.
    pub fn set_mobile(&mut self, status: MobileStatus) {
        self.mobiles.insert(status.serial, status);
    }

    /// Move the clock forward.
    pub fn advance(&mut self, seconds: f64) {
        self.clock += seconds;
    }

    /// Last user-visible line, if any.
    pub fn last_message(&self) -> Option<&(String, MessageHue)> {
        self.messages.last()
    }
}

impl WorldView for SimHost {
    fn player(&self) -> Result<PlayerSnapshot, HostError> {
        self.player
            .ok_or_else(|| HostError::Unavailable("player not logged in".into()))
    }

    fn find_mobile(&self, serial: Serial) -> Result<Option<MobileStatus>, HostError> {
        Ok(self.mobiles.get(&serial).copied())
    }

    fn find_items(&self, graphic: Graphic, container: Serial) -> Result<Vec<Item>, HostError> {
        Ok(self
            .items
            .iter()
            .filter(|item| item.graphic == graphic && item.container == container)
            .copied()
            .collect())
    }

    fn enemy_view(&self) -> Result<EnemyView, HostError> {
        Ok(self.enemies.clone())
    }

    fn now(&self) -> f64 {
        self.clock
    }
}

impl PersistentStore for SimHost {
    fn get_persistent(&self, key: &str, default: &str, scope: Scope) -> String {
        self.store.get_persistent(key, default, scope)
    }

    fn save_persistent(&mut self, key: &str, value: &str, scope: Scope) -> Result<(), HostError> {
        self.store.save_persistent(key, value, scope)
    }
}

impl HostBridge for SimHost {
    fn sys_msg(&mut self, text: &str, hue: MessageHue) {
        debug!(hue = hue.hue(), "{text}");
        self.messages.push((text.to_string(), hue));
    }

    fn pause(&mut self, seconds: f64) {
        self.clock += seconds.max(0.0);
    }

    fn stop_requested(&self) -> bool {
        self.stop || self.stop_at.is_some_and(|at| self.clock >= at)
    }

    fn cancel_all_targets(&mut self) -> Result<(), HostError> {
        self.targets_cancelled += 1;
        Ok(())
    }

    fn close_gumps(&mut self) -> Result<(), HostError> {
        self.gumps_closed += 1;
        Ok(())
    }

    fn execute(&mut self, action: Action, timeout: Duration) -> Result<(), HostError> {
        if self.failing_actions.contains(&action) {
            self.clock += timeout.as_secs_f64();
            return Err(HostError::Timeout {
                operation: action.label().to_string(),
                seconds: timeout.as_secs_f64(),
            });
        }
        self.executed.push(action);
        Ok(())
    }
}
