//! Session records - one completed start-to-stop farming run.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Consumables used during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SuppliesUsed {
    pub bandages: u32,
    pub vet_kits: u32,
    pub potions: u32,
}

/// Gold and time spent in one farming area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRecord {
    pub area: String,
    pub gold: u64,
    /// Seconds spent in the area.
    pub time: f64,
}

impl AreaRecord {
    /// Create a new area record.
    pub fn new(area: impl Into<String>, gold: u64, time: f64) -> Self {
        Self {
            area: area.into(),
            gold,
            time,
        }
    }
}

/// Raw counters collected by the farmer, turned into a [`SessionRecord`] on save.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionStats {
    /// Seconds the session ran.
    pub session_duration: f64,
    pub gold_collected: u64,
    pub kills: u32,
    pub player_deaths: u32,
    pub pet_deaths: u32,
    pub flee_events: u32,
    pub supplies_used: SuppliesUsed,
    pub areas_farmed: Vec<AreaRecord>,
    /// Enemy name -> kills.
    pub enemy_breakdown: BTreeMap<String, u32>,
    pub notes: String,
}

/// One entry of the session log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Start time formatted `YYYY-MM-DD_HH-MM-SS`.
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: f64,
    pub total_gold: u64,
    pub gold_per_hour: f64,
    pub kills: u32,
    /// Player and pet deaths combined.
    pub deaths: u32,
    pub flee_events: u32,
    #[serde(default)]
    pub supplies_used: SuppliesUsed,
    #[serde(default)]
    pub areas_farmed: Vec<AreaRecord>,
    #[serde(default)]
    pub enemy_breakdown: BTreeMap<String, u32>,
    #[serde(default)]
    pub notes: String,
}

impl SessionRecord {
    /// Derive a record from session counters, the session having ended at `end_time`.
    pub fn from_stats(stats: &SessionStats, end_time: DateTime<Utc>) -> Self {
        let duration = if stats.session_duration.is_finite() {
            stats.session_duration.max(0.0)
        } else {
            0.0
        };
        // Durations past chrono's range anchor the start at the end.
        let start_time = Duration::try_milliseconds((duration * 1000.0).round() as i64)
            .and_then(|elapsed| end_time.checked_sub_signed(elapsed))
            .unwrap_or(end_time);
        let hours = duration / 3600.0;
        let gold_per_hour = if hours > 0.0 {
            stats.gold_collected as f64 / hours
        } else {
            0.0
        };

        Self {
            session_id: start_time.format("%Y-%m-%d_%H-%M-%S").to_string(),
            start_time,
            end_time,
            duration_minutes: duration / 60.0,
            total_gold: stats.gold_collected,
            gold_per_hour,
            kills: stats.kills,
            deaths: stats.player_deaths.saturating_add(stats.pet_deaths),
            flee_events: stats.flee_events,
            supplies_used: stats.supplies_used,
            areas_farmed: stats.areas_farmed.clone(),
            enemy_breakdown: stats.enemy_breakdown.clone(),
            notes: stats.notes.clone(),
        }
    }

    /// Session length in hours.
    pub fn duration_hours(&self) -> f64 {
        self.duration_minutes / 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_derivation() {
        let end = Utc.with_ymd_and_hms(2026, 3, 14, 18, 30, 0).unwrap();
        let stats = SessionStats {
            session_duration: 5400.0,
            gold_collected: 12_000,
            kills: 40,
            player_deaths: 1,
            pet_deaths: 2,
            flee_events: 3,
            ..Default::default()
        };

        let record = SessionRecord::from_stats(&stats, end);
        assert_eq!(record.session_id, "2026-03-14_17-00-00");
        assert_eq!(record.end_time, end);
        assert_eq!(record.duration_minutes, 90.0);
        assert_eq!(record.gold_per_hour, 8_000.0);
        assert_eq!(record.deaths, 3);
        assert_eq!(record.duration_hours(), 1.5);
    }

    #[test]
    fn test_zero_duration_has_no_rate() {
        let end = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let stats = SessionStats {
            gold_collected: 500,
            ..Default::default()
        };
        let record = SessionRecord::from_stats(&stats, end);
        assert_eq!(record.gold_per_hour, 0.0);
        assert_eq!(record.start_time, end);
    }

    #[test]
    fn test_extreme_counters_do_not_panic() {
        let end = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let stats = SessionStats {
            session_duration: f64::MAX,
            player_deaths: u32::MAX,
            pet_deaths: 5,
            ..Default::default()
        };
        let record = SessionRecord::from_stats(&stats, end);
        assert_eq!(record.start_time, end);
        assert_eq!(record.deaths, u32::MAX);

        let stats = SessionStats {
            session_duration: 1e15,
            ..Default::default()
        };
        assert_eq!(SessionRecord::from_stats(&stats, end).start_time, end);
    }
}
