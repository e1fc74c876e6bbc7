//! Farming state machine - named states, an explicit transition registry, and the
//! dominant-goal arbiter that turns decision signals into the next state.
//!
//! Priority is fixed: **flee > bank > harvest > idle**. A requested transition that the
//! registry does not allow falls back to `Idle` for the tick, so e.g. the farmer always
//! passes through `Idle` between banking and harvesting again.

mod weight;

pub use weight::*;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

use farm_world::{Action, HostBridge};

use crate::banking::BankReason;

/// States of the farming loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FarmState {
    Idle,
    Harvesting,
    Banking,
    Fleeing,
}

impl FarmState {
    /// Every state.
    pub const ALL: [FarmState; 4] = [
        FarmState::Idle,
        FarmState::Harvesting,
        FarmState::Banking,
        FarmState::Fleeing,
    ];

    /// Host action performed while in this state.
    pub fn action(&self) -> Action {
        match self {
            FarmState::Idle => Action::Idle,
            FarmState::Harvesting => Action::Harvest,
            FarmState::Banking => Action::Bank,
            FarmState::Fleeing => Action::Flee,
        }
    }
}

/// A transition missing from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("transition {from:?} -> {to:?} is not allowed")]
pub struct TransitionError {
    pub from: FarmState,
    pub to: FarmState,
}

/// Decision outputs for one tick, already evaluated in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signals {
    /// Danger is at or above the flee threshold.
    pub flee: bool,
    /// A banking trigger fired.
    pub bank: Option<BankReason>,
    /// Nothing prevents harvesting (not paused, room in the pack).
    pub can_harvest: bool,
}

impl Signals {
    /// The state the highest-priority actionable signal asks for.
    pub fn dominant_state(&self) -> FarmState {
        if self.flee {
            FarmState::Fleeing
        } else if self.bank.is_some() {
            FarmState::Banking
        } else if self.can_harvest {
            FarmState::Harvesting
        } else {
            FarmState::Idle
        }
    }
}

/// Per-state enter/exit hooks.
pub trait StateHooks {
    /// Called after the machine enters `state`.
    fn on_enter(&mut self, _state: FarmState, _host: &mut dyn HostBridge) {}

    /// Called before the machine leaves `state`.
    fn on_exit(&mut self, _state: FarmState, _host: &mut dyn HostBridge) {}
}

/// The farming state machine.
pub struct StateMachine {
    current: FarmState,
    transitions: HashMap<FarmState, HashSet<FarmState>>,
    hooks: HashMap<FarmState, Box<dyn StateHooks>>,
    transition_count: u64,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current)
            .field("transitions", &self.transitions)
            .field("hooked_states", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StateMachine {
    /// Create a machine in `Idle` with the default transition graph.
    ///
    /// `Idle` reaches and is reachable from every state; `Harvesting` may go anywhere;
    /// `Banking` and `Fleeing` may escalate into each other but must settle in `Idle`
    /// before harvesting resumes.
    pub fn new() -> Self {
        let mut machine = Self::empty(FarmState::Idle);
        for state in FarmState::ALL {
            machine.allow(FarmState::Idle, state);
            machine.allow(state, FarmState::Idle);
        }
        machine.allow(FarmState::Harvesting, FarmState::Banking);
        machine.allow(FarmState::Harvesting, FarmState::Fleeing);
        machine.allow(FarmState::Banking, FarmState::Fleeing);
        machine.allow(FarmState::Fleeing, FarmState::Banking);
        machine
    }

    /// Create a machine in `initial` with no transitions registered.
    pub fn empty(initial: FarmState) -> Self {
        Self {
            current: initial,
            transitions: HashMap::new(),
            hooks: HashMap::new(),
            transition_count: 0,
        }
    }

    /// Register an allowed transition.
    pub fn allow(&mut self, from: FarmState, to: FarmState) {
        if from != to {
            self.transitions.entry(from).or_default().insert(to);
        }
    }

    /// Check if `from -> to` is registered.
    pub fn can_transition(&self, from: FarmState, to: FarmState) -> bool {
        from == to
            || self
                .transitions
                .get(&from)
                .is_some_and(|targets| targets.contains(&to))
    }

    /// Install hooks for `state`, replacing any previous ones.
    pub fn set_hooks(&mut self, state: FarmState, hooks: Box<dyn StateHooks>) {
        self.hooks.insert(state, hooks);
    }

    /// Current state.
    pub fn current(&self) -> FarmState {
        self.current
    }

    /// Number of state changes so far.
    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Move to `to`, running exit and enter hooks. Staying put is a no-op.
    pub fn transition_to(
        &mut self,
        to: FarmState,
        host: &mut dyn HostBridge,
    ) -> Result<(), TransitionError> {
        let from = self.current;
        if from == to {
            return Ok(());
        }
        if !self.can_transition(from, to) {
            return Err(TransitionError { from, to });
        }

        if let Some(hooks) = self.hooks.get_mut(&from) {
            hooks.on_exit(from, host);
        }
        self.current = to;
        self.transition_count += 1;
        if let Some(hooks) = self.hooks.get_mut(&to) {
            hooks.on_enter(to, host);
        }
        info!(?from, ?to, "state changed");
        Ok(())
    }

    /// Arbitrate `signals`, transition, and return the action for this tick.
    pub fn step(&mut self, signals: Signals, host: &mut dyn HostBridge) -> Action {
        let desired = signals.dominant_state();
        if let Err(err) = self.transition_to(desired, host) {
            debug!(%err, "settling in idle first");
            // Idle is reachable from everywhere in the default graph; custom graphs may
            // leave the machine where it is.
            let _ = self.transition_to(FarmState::Idle, host);
        }
        self.current.action()
    }
}
