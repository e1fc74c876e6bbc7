//! Aggregations over recorded sessions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::SessionRecord;

/// A per-session value tracked over time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendMetric {
    GoldPerHour,
    DeathsPerHour,
    /// Session length in minutes.
    AvgSessionLength,
    /// Any numeric top-level field of the record, by name.
    Field(String),
}

impl FromStr for TrendMetric {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "gold_per_hour" => TrendMetric::GoldPerHour,
            "deaths_per_hour" => TrendMetric::DeathsPerHour,
            "avg_session_length" => TrendMetric::AvgSessionLength,
            other => TrendMetric::Field(other.to_string()),
        })
    }
}

impl TrendMetric {
    /// Value of this metric for one session. Missing or non-numeric fields read as zero.
    pub fn value(&self, record: &SessionRecord) -> f64 {
        match self {
            TrendMetric::GoldPerHour => record.gold_per_hour,
            TrendMetric::DeathsPerHour => {
                let hours = record.duration_hours();
                if hours > 0.0 {
                    f64::from(record.deaths) / hours
                } else {
                    0.0
                }
            }
            TrendMetric::AvgSessionLength => record.duration_minutes,
            TrendMetric::Field(name) => serde_json::to_value(record)
                .ok()
                .and_then(|value| value.get(name).and_then(|v| v.as_f64()))
                .unwrap_or(0.0),
        }
    }
}

/// Earnings of one area across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaPerformance {
    pub area: String,
    pub total_gold: u64,
    /// Seconds.
    pub total_time: f64,
    pub sessions: u32,
    pub avg_gold_per_hour: f64,
}

/// Flee frequency of one area across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaDanger {
    pub area: String,
    /// Flees attributed to the area, in proportion to time spent there.
    pub flee_events: f64,
    /// Seconds.
    pub total_time: f64,
    /// Flees per hour.
    pub flee_rate: f64,
}

/// Totals across a run of sessions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    pub sessions: usize,
    pub total_gold: u64,
    pub total_hours: f64,
    pub gold_per_hour: f64,
    pub kills: u32,
    pub deaths: u32,
    pub flee_events: u32,
}

fn per_hour(amount: f64, seconds: f64) -> f64 {
    if seconds > 0.0 {
        amount / (seconds / 3600.0)
    } else {
        0.0
    }
}

fn descending(a: f64, b: f64) -> std::cmp::Ordering {
    b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
}

/// Areas ranked by gold per hour, best first.
pub fn best_areas(sessions: &[SessionRecord]) -> Vec<AreaPerformance> {
    let mut totals: BTreeMap<&str, (u64, f64, u32)> = BTreeMap::new();
    for session in sessions {
        for area in &session.areas_farmed {
            let entry = totals.entry(area.area.as_str()).or_default();
            entry.0 = entry.0.saturating_add(area.gold);
            entry.1 += area.time.max(0.0);
            entry.2 += 1;
        }
    }

    let mut ranked: Vec<_> = totals
        .into_iter()
        .map(|(area, (gold, time, count))| AreaPerformance {
            area: area.to_string(),
            total_gold: gold,
            total_time: time,
            sessions: count,
            avg_gold_per_hour: per_hour(gold as f64, time),
        })
        .collect();
    ranked.sort_by(|a, b| descending(a.avg_gold_per_hour, b.avg_gold_per_hour));
    ranked
}

/// Areas ranked by flees per hour, most dangerous first.
///
/// Flees are recorded per session, not per area, so each session's flees are spread
/// across its areas in proportion to the time spent in each.
pub fn most_dangerous_areas(sessions: &[SessionRecord]) -> Vec<AreaDanger> {
    let mut totals: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for session in sessions {
        let session_time: f64 = session.areas_farmed.iter().map(|a| a.time.max(0.0)).sum();
        for area in &session.areas_farmed {
            let time = area.time.max(0.0);
            let share = if session_time > 0.0 {
                f64::from(session.flee_events) * time / session_time
            } else {
                0.0
            };
            let entry = totals.entry(area.area.as_str()).or_default();
            entry.0 += share;
            entry.1 += time;
        }
    }

    let mut ranked: Vec<_> = totals
        .into_iter()
        .map(|(area, (flees, time))| AreaDanger {
            area: area.to_string(),
            flee_events: flees,
            total_time: time,
            flee_rate: per_hour(flees, time),
        })
        .collect();
    ranked.sort_by(|a, b| descending(a.flee_rate, b.flee_rate));
    ranked
}

/// Totals across `sessions`.
pub fn summarize(sessions: &[SessionRecord]) -> SessionSummary {
    let mut summary = SessionSummary {
        sessions: sessions.len(),
        ..Default::default()
    };
    let mut seconds = 0.0;
    for session in sessions {
        summary.total_gold = summary.total_gold.saturating_add(session.total_gold);
        summary.kills = summary.kills.saturating_add(session.kills);
        summary.deaths = summary.deaths.saturating_add(session.deaths);
        summary.flee_events = summary.flee_events.saturating_add(session.flee_events);
        seconds += session.duration_minutes * 60.0;
    }
    summary.total_hours = seconds / 3600.0;
    summary.gold_per_hour = per_hour(summary.total_gold as f64, seconds);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_log::{AreaRecord, SessionStats};
    use chrono::{TimeZone, Utc};

    fn session(flees: u32, areas: Vec<AreaRecord>) -> SessionRecord {
        let stats = SessionStats {
            session_duration: areas.iter().map(|a| a.time).sum(),
            gold_collected: areas.iter().map(|a| a.gold).sum(),
            flee_events: flees,
            player_deaths: 1,
            areas_farmed: areas,
            ..Default::default()
        };
        SessionRecord::from_stats(&stats, Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_best_areas_ranked_by_rate() {
        let sessions = vec![
            session(0, vec![AreaRecord::new("Mine", 3000, 3600.0)]),
            session(
                0,
                vec![
                    AreaRecord::new("Mine", 1000, 1800.0),
                    AreaRecord::new("Forest", 6000, 3600.0),
                ],
            ),
        ];

        let ranked = best_areas(&sessions);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].area, "Forest");
        assert_eq!(ranked[0].avg_gold_per_hour, 6000.0);
        assert_eq!(ranked[1].area, "Mine");
        assert_eq!(ranked[1].total_gold, 4000);
        assert_eq!(ranked[1].sessions, 2);
        assert!((ranked[1].avg_gold_per_hour - 4000.0 / 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_flees_distributed_by_time() {
        let sessions = vec![session(
            4,
            vec![
                AreaRecord::new("Swamp", 0, 900.0),
                AreaRecord::new("Desert", 0, 2700.0),
            ],
        )];

        let ranked = most_dangerous_areas(&sessions);
        let swamp = ranked.iter().find(|a| a.area == "Swamp").unwrap();
        let desert = ranked.iter().find(|a| a.area == "Desert").unwrap();
        assert!((swamp.flee_events - 1.0).abs() < 1e-9);
        assert!((desert.flee_events - 3.0).abs() < 1e-9);
        // Both come out at 4 flees per hour; the split is proportional.
        assert!((swamp.flee_rate - desert.flee_rate).abs() < 1e-9);
    }

    #[test]
    fn test_zero_time_areas_are_safe() {
        let sessions = vec![session(2, vec![AreaRecord::new("Nowhere", 10, 0.0)])];
        let ranked = most_dangerous_areas(&sessions);
        assert_eq!(ranked[0].flee_rate, 0.0);
        assert_eq!(best_areas(&sessions)[0].avg_gold_per_hour, 0.0);
    }

    #[test]
    fn test_trend_metrics() {
        let record = session(0, vec![AreaRecord::new("Mine", 1000, 1800.0)]);
        assert_eq!(TrendMetric::GoldPerHour.value(&record), 2000.0);
        assert_eq!(TrendMetric::DeathsPerHour.value(&record), 2.0);
        assert_eq!(TrendMetric::AvgSessionLength.value(&record), 30.0);
        assert_eq!("total_gold".parse::<TrendMetric>().unwrap().value(&record), 1000.0);
        assert_eq!("notes".parse::<TrendMetric>().unwrap().value(&record), 0.0);
    }

    #[test]
    fn test_summary() {
        let sessions = vec![
            session(1, vec![AreaRecord::new("Mine", 3000, 3600.0)]),
            session(2, vec![AreaRecord::new("Mine", 1000, 3600.0)]),
        ];
        let summary = summarize(&sessions);
        assert_eq!(summary.sessions, 2);
        assert_eq!(summary.total_gold, 4000);
        assert_eq!(summary.total_hours, 2.0);
        assert_eq!(summary.gold_per_hour, 2000.0);
        assert_eq!(summary.flee_events, 3);
        assert_eq!(summary.deaths, 2);
    }

    #[test]
    fn test_summary_saturates() {
        let mut big = session(u32::MAX, vec![AreaRecord::new("Mine", u64::MAX, 3600.0)]);
        big.kills = u32::MAX;
        let sessions = vec![big.clone(), big];

        let summary = summarize(&sessions);
        assert_eq!(summary.total_gold, u64::MAX);
        assert_eq!(summary.kills, u32::MAX);
        assert_eq!(summary.flee_events, u32::MAX);
        assert_eq!(best_areas(&sessions)[0].total_gold, u64::MAX);
    }
}
