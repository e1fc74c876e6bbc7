//! Supply tracking - samples consumable counts over time and forecasts when they run out.
//!
//! Each tracked [`SupplyKind`] keeps its own bounded history of `(timestamp, count)`
//! samples. Usage rate is the drop in count across a recent window; depletion time is the
//! current count divided by that rate. A count that went *up* inside the window means the
//! player restocked, and the rate reads as zero.

mod history;

pub use history::*;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info, warn};

use farm_world::{
    Graphic, HostBridge, HostError, MessageHue, PersistentStore, Scope, SupplyKind, UsageSample,
    WorldView,
};

/// Minimum spacing between automatic resamples.
pub const SUPPLY_CHECK_INTERVAL_SECS: f64 = 30.0;

/// Samples older than this are pruned.
pub const HISTORY_RETENTION_SECS: f64 = 86_400.0;

/// Samples kept per supply.
pub const MAX_SAMPLES_PER_SUPPLY: usize = 100;

/// Window used for usage rate unless told otherwise.
pub const DEFAULT_RATE_WINDOW_HOURS: f64 = 1.0;

/// Hours remaining below which restocking takes priority.
pub const DEFAULT_CRITICAL_HOURS: f64 = 1.0;

const MIN_RATE_SPAN_SECS: f64 = 60.0;
const LOW_SUPPLY_HOURS: f64 = 2.0;
const GOLD_CLOSE_FRACTION: f64 = 0.8;
const HIGH_WEIGHT_PERCENT: f64 = 70.0;

/// Health of a single supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyHealth {
    Good,
    Low,
    Critical,
    Out,
    /// Not enough history to forecast.
    Unknown,
}

impl SupplyHealth {
    /// Classify a supply from its count and forecast.
    pub fn classify(count: Option<u32>, hours_remaining: Option<f64>) -> Self {
        if count == Some(0) {
            return SupplyHealth::Out;
        }
        match hours_remaining {
            None => SupplyHealth::Unknown,
            Some(h) if h < 0.0 => SupplyHealth::Unknown,
            Some(h) if h < DEFAULT_CRITICAL_HOURS => SupplyHealth::Critical,
            Some(h) if h < LOW_SUPPLY_HOURS => SupplyHealth::Low,
            Some(_) => SupplyHealth::Good,
        }
    }
}

/// Snapshot of one supply for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupplyStatus {
    pub count: Option<u32>,
    /// Units consumed per hour.
    pub rate: Option<f64>,
    pub hours_remaining: Option<f64>,
    pub status: SupplyHealth,
}

/// Tracks consumption of every configured supply kind.
#[derive(Debug, Clone)]
pub struct SupplyTracker {
    key_prefix: String,
    scope: Scope,
    graphics: BTreeMap<SupplyKind, Graphic>,
    history: BTreeMap<SupplyKind, VecDeque<UsageSample>>,
    check_interval: f64,
    critical_hours: f64,
    /// `0` until the first poll.
    last_check: f64,
}

impl SupplyTracker {
    /// Create a tracker for `kinds`, using each kind's default graphic.
    pub fn new(key_prefix: impl Into<String>, kinds: impl IntoIterator<Item = SupplyKind>) -> Self {
        let graphics: BTreeMap<_, _> = kinds
            .into_iter()
            .map(|kind| (kind, kind.default_graphic()))
            .collect();
        let history = graphics.keys().map(|kind| (*kind, VecDeque::new())).collect();
        Self {
            key_prefix: key_prefix.into(),
            scope: Scope::Character,
            graphics,
            history,
            check_interval: SUPPLY_CHECK_INTERVAL_SECS,
            critical_hours: DEFAULT_CRITICAL_HOURS,
            last_check: 0.0,
        }
    }

    /// Use a shard-specific graphic for `kind`, tracking it if it was not already.
    pub fn with_graphic(mut self, kind: SupplyKind, graphic: Graphic) -> Self {
        self.graphics.insert(kind, graphic);
        self.history.entry(kind).or_default();
        self
    }

    /// Override the automatic resample interval.
    pub fn with_check_interval(mut self, seconds: f64) -> Self {
        self.check_interval = seconds.max(0.0);
        self
    }

    /// Override the forecast horizon under which a supply needs restocking.
    pub fn with_critical_hours(mut self, hours: f64) -> Self {
        self.critical_hours = hours.max(0.0);
        self
    }

    /// Forecast horizon under which a supply needs restocking.
    pub fn critical_hours(&self) -> f64 {
        self.critical_hours
    }

    /// Tracked supply kinds.
    pub fn tracked(&self) -> impl Iterator<Item = SupplyKind> + '_ {
        self.graphics.keys().copied()
    }

    /// Persistence key holding the history of `kind`.
    pub fn history_key(&self, kind: SupplyKind) -> String {
        format!("{}Supply_{}_History", self.key_prefix, kind)
    }

    /// Recorded samples for `kind`, oldest first.
    pub fn samples(&self, kind: SupplyKind) -> impl Iterator<Item = &UsageSample> + '_ {
        self.history.get(&kind).into_iter().flatten()
    }

    /// Most recently observed count.
    pub fn current_count(&self, kind: SupplyKind) -> Option<u32> {
        self.history
            .get(&kind)
            .and_then(|samples| samples.back())
            .map(|sample| sample.count)
    }

    /// Sample the backpack count of `kind` right now. Not rate limited.
    pub fn track_usage<W: WorldView + ?Sized>(
        &mut self,
        world: &W,
        kind: SupplyKind,
    ) -> Result<u32, HostError> {
        let graphic = *self
            .graphics
            .get(&kind)
            .ok_or_else(|| HostError::Rejected(format!("{kind} is not tracked")))?;
        let backpack = world.player()?.backpack;
        let count = world.count_items(graphic, backpack)?;
        self.record_sample(kind, world.now(), count);
        Ok(count)
    }

    /// Append a sample, keeping timestamps monotonic and the history bounded.
    pub fn record_sample(&mut self, kind: SupplyKind, timestamp: f64, count: u32) {
        let samples = self.history.entry(kind).or_default();
        if samples.back().is_some_and(|last| last.timestamp > timestamp) {
            debug!(%kind, timestamp, "ignoring out-of-order supply sample");
            return;
        }
        samples.push_back(UsageSample::new(timestamp, count));
        prune(samples, timestamp);
    }

    /// Resample every tracked kind if the check interval has elapsed.
    ///
    /// Returns `true` when a resample happened.
    pub fn poll<W: WorldView + ?Sized>(&mut self, world: &W) -> bool {
        let now = world.now();
        if self.last_check > 0.0 && now - self.last_check < self.check_interval {
            return false;
        }
        self.last_check = now;

        let kinds: Vec<_> = self.tracked().collect();
        for kind in kinds {
            if let Err(err) = self.track_usage(world, kind) {
                info!(%kind, %err, "supply count unavailable, retrying next check");
            }
        }
        true
    }

    /// Units of `kind` consumed per hour over the last `hours`.
    ///
    /// `None` when there are fewer than two samples in the window or they span under a minute.
    pub fn usage_rate(&self, kind: SupplyKind, hours: f64, now: f64) -> Option<f64> {
        let cutoff = now - hours * 3600.0;
        let mut window = self.samples(kind).filter(|s| s.timestamp >= cutoff);
        let first = window.next()?;
        let last = window.last()?;

        let span = last.timestamp - first.timestamp;
        if span < MIN_RATE_SPAN_SECS {
            return None;
        }
        let used = f64::from(first.count) - f64::from(last.count);
        Some((used / (span / 3600.0)).max(0.0))
    }

    /// Hours until `kind` runs out at the current rate.
    ///
    /// `Some(0.0)` when already out, `None` when there is no usable rate.
    pub fn predict_depletion_time(&self, kind: SupplyKind, now: f64) -> Option<f64> {
        let count = self.current_count(kind)?;
        if count == 0 {
            return Some(0.0);
        }
        match self.usage_rate(kind, DEFAULT_RATE_WINDOW_HOURS, now) {
            Some(rate) if rate > 0.0 => Some(f64::from(count) / rate),
            _ => None,
        }
    }

    /// Status of every tracked supply.
    pub fn get_supply_status(&self, now: f64) -> BTreeMap<SupplyKind, SupplyStatus> {
        self.tracked()
            .map(|kind| {
                let count = self.current_count(kind);
                let hours_remaining = self.predict_depletion_time(kind, now);
                let status = SupplyStatus {
                    count,
                    rate: self.usage_rate(kind, DEFAULT_RATE_WINDOW_HOURS, now),
                    hours_remaining,
                    status: SupplyHealth::classify(count, hours_remaining),
                };
                (kind, status)
            })
            .collect()
    }

    /// Check if any supply is out or forecast to run out within `critical_hours`.
    pub fn should_prioritize_restock(&self, critical_hours: f64, now: f64) -> bool {
        self.tracked().any(|kind| {
            self.predict_depletion_time(kind, now)
                .is_some_and(|hours| hours < critical_hours)
        })
    }

    /// Decide whether to bank now so a restock and a deposit share one trip.
    ///
    /// True when supplies need restocking and either gold is within 80% of the gold
    /// threshold or the player is carrying more than 70% of max weight. A zero
    /// `gold_threshold` means there is no gold target, so only weight counts.
    pub fn optimize_bank_timing(
        &self,
        gold: u64,
        gold_threshold: u64,
        weight_percent: f64,
        now: f64,
    ) -> bool {
        if !self.should_prioritize_restock(self.critical_hours, now) {
            return false;
        }
        let gold_close =
            gold_threshold > 0 && gold as f64 >= GOLD_CLOSE_FRACTION * gold_threshold as f64;
        let weight_high = weight_percent > HIGH_WEIGHT_PERCENT;
        gold_close || weight_high
    }

    /// Units of `kind` consumed since `since`, ignoring restocks.
    pub fn consumed_since(&self, kind: SupplyKind, since: f64) -> u32 {
        let samples: Vec<_> = self.samples(kind).filter(|s| s.timestamp >= since).collect();
        samples
            .windows(2)
            .map(|pair| pair[0].count.saturating_sub(pair[1].count))
            .sum()
    }

    /// Persist every history under `<prefix>Supply_<kind>_History`.
    pub fn save_history<S: PersistentStore + ?Sized>(
        &self,
        store: &mut S,
    ) -> Result<(), HostError> {
        for (kind, samples) in &self.history {
            store.save_persistent(&self.history_key(*kind), &encode_history(samples), self.scope)?;
        }
        Ok(())
    }

    /// Load persisted histories, dropping anything older than a day.
    ///
    /// Malformed entries are skipped; the user is told once if any were found.
    pub fn load_history<H: HostBridge + ?Sized>(&mut self, host: &mut H) {
        let now = host.now();
        let mut skipped = 0;

        let kinds: Vec<_> = self.tracked().collect();
        for kind in kinds {
            let raw = host.get_persistent(&self.history_key(kind), "", self.scope);
            let (mut loaded, errors) = decode_history(&raw);
            for err in &errors {
                warn!(%kind, %err, "skipping corrupt supply history entry");
            }
            skipped += errors.len();

            loaded.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
            let mut samples: VecDeque<_> = loaded
                .into_iter()
                .filter(|s| s.timestamp <= now)
                .collect();
            prune(&mut samples, now);
            debug!(%kind, samples = samples.len(), "supply history loaded");
            self.history.insert(kind, samples);
        }

        if skipped > 0 {
            host.sys_msg(
                &format!("Supply history: skipped {skipped} corrupt entries"),
                MessageHue::Warn,
            );
        }
    }
}

/// Drop samples older than the retention window and cap the history length.
fn prune(samples: &mut VecDeque<UsageSample>, now: f64) {
    while samples
        .front()
        .is_some_and(|s| now - s.timestamp > HISTORY_RETENTION_SECS)
    {
        samples.pop_front();
    }
    while samples.len() > MAX_SAMPLES_PER_SUPPLY {
        samples.pop_front();
    }
}
