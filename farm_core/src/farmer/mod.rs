//! The main loop: one decision per tick, carried out through the host.
//!
//! A [`Farmer`] owns every decision component. Each tick it reads the world, scores danger,
//! checks the banking triggers and supply forecasts, lets the [`StateMachine`] arbitrate,
//! and hands the resulting [`Action`] to the host. Host failures never end the loop; the
//! failing action is retried on a later tick.

mod counters;

pub use counters::*;

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use tracing::{debug, info, warn};

use farm_world::{
    Action, EnemyView, Graphic, HostBridge, MessageHue, PetDescriptor, PlayerSnapshot, Serial,
    SupplyKind, WorldView,
};

use crate::banking::{BankReason, BankingTriggers, TriggerUpdate};
use crate::config::FarmConfig;
use crate::danger::{DangerAssessment, DangerFactor, DangerReport};
use crate::session_log::{SessionLogger, SessionRecord, SuppliesUsed};
use crate::state_machine::{FarmState, Signals, StateHooks, StateMachine, WeightManager};
use crate::supply::SupplyTracker;

/// What happened in one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub state: FarmState,
    pub action: Action,
    pub danger: DangerReport,
    /// Set when a banking trigger or restock co-optimization fired this tick.
    pub bank_reason: Option<BankReason>,
}

/// Drops the current target and warns the user when the machine starts fleeing.
struct FleeHooks;

impl StateHooks for FleeHooks {
    fn on_enter(&mut self, _state: FarmState, host: &mut dyn HostBridge) {
        if let Err(err) = host.cancel_all_targets() {
            info!(%err, "could not clear targets before fleeing");
        }
        host.sys_msg("Danger too high, fleeing!", MessageHue::Warn);
    }
}

/// A configured farming session.
#[derive(Debug)]
pub struct Farmer {
    config: FarmConfig,
    danger: DangerAssessment,
    banking: BankingTriggers,
    supplies: SupplyTracker,
    weights: WeightManager,
    machine: StateMachine,
    logger: SessionLogger,
    counters: SessionCounters,
    paused: bool,
    last_report: Option<DangerReport>,
    /// Gold already accounted for in the backpack.
    gold_baseline: u32,
    /// Last observed life state of the player and each configured pet.
    player_alive: Option<bool>,
    pets_alive: HashMap<Serial, bool>,
}

impl Farmer {
    /// Build every component from `config`.
    pub fn new(config: FarmConfig) -> Self {
        let danger = DangerAssessment::new(config.danger_weights)
            .with_threat_radius(config.threat_radius)
            .with_max_follow_range(config.max_follow_range);

        let mut supplies = SupplyTracker::new(config.key_prefix.clone(), config.supplies.clone())
            .with_check_interval(config.supply_check_interval_secs)
            .with_critical_hours(config.critical_supply_hours);
        for (kind, graphic) in &config.supply_graphics {
            supplies = supplies.with_graphic(*kind, *graphic);
        }

        let bandage_graphic = config
            .supply_graphics
            .get(&SupplyKind::Bandages)
            .copied()
            .unwrap_or_else(|| SupplyKind::Bandages.default_graphic());
        let banking = BankingTriggers::new(config.key_prefix.clone())
            .with_config(config.triggers)
            .with_check_interval(config.bank_check_interval_secs)
            .with_bandage_graphic(bandage_graphic);

        let mut machine = StateMachine::new();
        machine.set_hooks(FarmState::Fleeing, Box::new(FleeHooks));

        Self {
            danger,
            banking,
            supplies,
            weights: WeightManager::new(config.weight_reserve),
            machine,
            logger: SessionLogger::new(config.log_dir.clone()),
            counters: SessionCounters::default(),
            paused: false,
            last_report: None,
            gold_baseline: 0,
            player_alive: None,
            pets_alive: HashMap::new(),
            config,
        }
    }

    /// Configuration the farmer was built from. Live trigger values are on [`Farmer::banking`].
    pub fn config(&self) -> &FarmConfig {
        &self.config
    }

    /// Current state of the state machine.
    pub fn state(&self) -> FarmState {
        self.machine.current()
    }

    /// The danger assessor, including its damage window.
    pub fn danger(&self) -> &DangerAssessment {
        &self.danger
    }

    /// Banking triggers with their live configuration.
    pub fn banking(&self) -> &BankingTriggers {
        &self.banking
    }

    /// Supply history and forecasts.
    pub fn supplies(&self) -> &SupplyTracker {
        &self.supplies
    }

    /// The session log written on shutdown.
    pub fn logger(&self) -> &SessionLogger {
        &self.logger
    }

    /// Counters for the running session.
    pub fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    /// Profession code reports kills, notes and area changes through this.
    pub fn counters_mut(&mut self) -> &mut SessionCounters {
        &mut self.counters
    }

    /// Danger breakdown from the most recent tick.
    pub fn last_report(&self) -> Option<&DangerReport> {
        self.last_report.as_ref()
    }

    /// Check if [`Farmer::pause`] is in effect.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stop acting until [`Farmer::resume`]. Ticks keep scoring danger.
    pub fn pause(&mut self) {
        info!("farming paused");
        self.paused = true;
    }

    /// Undo [`Farmer::pause`].
    pub fn resume(&mut self) {
        info!("farming resumed");
        self.paused = false;
    }

    /// Update danger weights. All-zero weights fall back to the defaults.
    pub fn configure_weights(&mut self, updates: impl IntoIterator<Item = (DangerFactor, f64)>) {
        self.danger.configure_weights(updates);
    }

    /// Update banking triggers and persist them.
    pub fn configure_triggers<H: HostBridge>(&mut self, host: &mut H, update: TriggerUpdate) {
        if let Err(err) = self.banking.configure_triggers(host, update) {
            warn!(%err, "could not persist banking triggers");
            host.sys_msg("Banking triggers not saved", MessageHue::Error);
        }
    }

    /// Load persisted state and start the session clock.
    pub fn start<H: HostBridge>(&mut self, host: &mut H) {
        self.banking.load(host);
        self.supplies.load_history(host);
        let now = host.now();
        self.counters = SessionCounters::new(now);
        if let Some(area) = &self.config.area {
            self.counters.enter_area(area.clone(), now);
        }
        self.gold_baseline = carried_gold(&*host).unwrap_or_default();
        self.player_alive = None;
        self.pets_alive.clear();
        info!(
            pets = self.config.pets.len(),
            supplies = self.config.supplies.len(),
            "farming session started"
        );
        host.sys_msg("Farming started", MessageHue::Success);
    }

    /// Make one decision.
    pub fn tick<H: HostBridge>(&mut self, host: &mut H) -> TickOutcome {
        let player = host.player().ok();
        self.observe_casualties(&*host, player);
        let enemies = host.enemy_view().unwrap_or_else(|err| {
            debug!(%err, "enemy view unavailable");
            EnemyView::default()
        });

        let pets: &[PetDescriptor] = &self.config.pets;
        let report = self.danger.assess(
            &*host,
            pets,
            enemies.engaged_count,
            &enemies.nearby_npc_positions,
            None,
        );
        let flee = DangerAssessment::should_flee(report.score, self.config.flee_threshold);

        let mut bank_reason = self.banking.should_bank(&*host);
        let polled = self.supplies.poll(&*host);
        if bank_reason.is_none() && !flee && polled {
            bank_reason = self.co_optimized_bank(host);
        }

        let can_harvest = player.is_some_and(|p| p.is_alive() && !self.weights.is_full(&p));
        let signals = if self.paused {
            Signals::default()
        } else {
            Signals {
                flee,
                bank: bank_reason,
                can_harvest,
            }
        };

        let before = self.machine.current();
        let action = self.machine.step(signals, host);
        let state = self.machine.current();
        if state != before {
            match state {
                FarmState::Fleeing => self.counters.record_flee(),
                FarmState::Banking => {
                    let reason = bank_reason.map_or("unknown", |r| r.as_str());
                    host.sys_msg(&format!("Banking ({reason})"), MessageHue::Info);
                }
                FarmState::Idle | FarmState::Harvesting => {}
            }
        }

        debug!(?state, action = action.label(), score = report.score, "tick");
        self.last_report = Some(report);
        TickOutcome {
            state,
            action,
            danger: report,
            bank_reason,
        }
    }

    /// Count deaths of the player and configured pets since the previous tick.
    fn observe_casualties<W: WorldView + ?Sized>(
        &mut self,
        world: &W,
        player: Option<PlayerSnapshot>,
    ) {
        if let Some(player) = player.filter(|p| p.hits_max > 0) {
            let alive = player.is_alive();
            if self.player_alive == Some(true) && !alive {
                info!("player died");
                self.counters.record_player_death();
            }
            self.player_alive = Some(alive);
        }

        for pet in &self.config.pets {
            let status = match world.find_mobile(pet.serial) {
                Ok(Some(status)) => status,
                // Out of range says nothing about whether it died.
                Ok(None) => continue,
                Err(err) => {
                    debug!(pet = %pet.name, %err, "pet lookup failed");
                    continue;
                }
            };
            let alive = !status.is_dead && !(status.hits_max > 0 && status.hits <= 0);
            let previous = self.pets_alive.insert(pet.serial, alive);
            if previous == Some(true) && !alive {
                info!(pet = %pet.name, "pet died");
                self.counters.record_pet_death();
            }
        }
    }

    /// Bank early when supplies are running short and a deposit is nearly due anyway.
    ///
    /// Uses the live gold trigger, so a disabled trigger leaves only the weight condition.
    fn co_optimized_bank<H: HostBridge>(&self, host: &H) -> Option<BankReason> {
        let player = host.player().ok()?;
        let gold = host
            .count_items(Graphic::GOLD, player.backpack)
            .unwrap_or_default();
        let trigger = self.banking.config().gold;
        let gold_threshold = if trigger.enabled {
            trigger.threshold.max(0.0) as u64
        } else {
            0
        };
        let weight_percent = self.weights.weight_percent(&player);

        self.supplies
            .optimize_bank_timing(u64::from(gold), gold_threshold, weight_percent, host.now())
            .then(|| {
                info!(gold, weight_percent, "banking early to restock");
                BankReason::Supplies
            })
    }

    /// Carry out `action`. Failures are logged and retried on a later tick.
    pub fn perform<H: HostBridge>(&mut self, host: &mut H, action: Action) {
        if action == Action::Idle {
            return;
        }

        let carried_before = match action {
            Action::Bank => carried_gold(&*host),
            _ => None,
        };

        match host.execute(action, self.config.host_timeout()) {
            Ok(()) => match action {
                Action::Bank => {
                    if let Some(carried) = carried_before {
                        info!(gold = carried, "gold banked");
                        self.counters.record_gold(u64::from(carried));
                    }
                    self.gold_baseline = carried_gold(&*host).unwrap_or_default();
                    if let Err(err) = self.banking.track_last_bank(host) {
                        warn!(%err, "could not persist last bank time");
                    }
                    let kinds: Vec<_> = self.supplies.tracked().collect();
                    for kind in kinds {
                        if let Err(err) = self.supplies.track_usage(&*host, kind) {
                            info!(%kind, %err, "supply recount after banking failed");
                        }
                    }
                }
                Action::Flee => self.danger.reset_damage_history(),
                Action::Harvest | Action::Idle => {}
            },
            Err(err) => {
                info!(action = action.label(), %err, "action failed, retrying next tick");
                if let Err(err) = host.cancel_all_targets() {
                    debug!(%err, "could not clear targets");
                }
            }
        }
    }

    /// Tick until the user asks to stop, then shut down.
    pub fn run<H: HostBridge>(&mut self, host: &mut H) -> Option<SessionRecord> {
        while !host.stop_requested() {
            let outcome = self.tick(host);
            if host.stop_requested() {
                break;
            }
            self.perform(host, outcome.action);
            if host.stop_requested() {
                break;
            }
            host.pause(self.config.tick_pause_secs);
        }
        self.shutdown(host)
    }

    /// Persist state, release the client and write the session record.
    ///
    /// Session gold is everything deposited on bank trips plus whatever was picked up
    /// since the last trip and is still in the backpack.
    pub fn shutdown<H: HostBridge>(&mut self, host: &mut H) -> Option<SessionRecord> {
        if let Err(err) = host.cancel_all_targets() {
            debug!(%err, "could not clear targets on shutdown");
        }
        if let Err(err) = self.banking.save(host) {
            warn!(%err, "could not persist banking state");
        }
        if let Err(err) = self.supplies.save_history(host) {
            warn!(%err, "could not persist supply history");
        }
        if let Err(err) = host.close_gumps() {
            debug!(%err, "could not close gumps");
        }

        if let Some(carried) = carried_gold(&*host) {
            let unbanked = carried.saturating_sub(self.gold_baseline);
            self.counters.record_gold(u64::from(unbanked));
            self.gold_baseline = carried;
        }

        let now = host.now();
        let started = self.counters.started_at();
        let supplies_used = SuppliesUsed {
            bandages: self.supplies.consumed_since(SupplyKind::Bandages, started),
            vet_kits: self.supplies.consumed_since(SupplyKind::VetKits, started),
            potions: self.supplies.consumed_since(SupplyKind::Potions, started),
        };
        let stats = self.counters.to_stats(now, supplies_used);
        let end_time = Utc
            .timestamp_millis_opt((now * 1000.0) as i64)
            .single()
            .unwrap_or_else(Utc::now);

        match self.logger.save_session_at(&stats, end_time) {
            Ok(record) => {
                host.sys_msg(
                    &format!(
                        "Session saved: {} gold ({:.0}/hr)",
                        record.total_gold, record.gold_per_hour
                    ),
                    MessageHue::Success,
                );
                Some(record)
            }
            Err(err) => {
                warn!(%err, "could not save session");
                host.sys_msg(&format!("Session not saved: {err}"), MessageHue::Error);
                None
            }
        }
    }
}

/// Gold in the player's backpack, if the host can say.
fn carried_gold<W: WorldView + ?Sized>(world: &W) -> Option<u32> {
    let player = world.player().ok()?;
    match world.count_items(Graphic::GOLD, player.backpack) {
        Ok(gold) => Some(gold),
        Err(err) => {
            debug!(%err, "gold count unavailable");
            None
        }
    }
}
