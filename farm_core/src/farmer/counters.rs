//! Running counters for the current session.

use std::collections::BTreeMap;

use crate::session_log::{AreaRecord, SessionStats, SuppliesUsed};

/// Everything counted between start and stop, turned into [`SessionStats`] at the end.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionCounters {
    started_at: f64,
    gold_collected: u64,
    kills: u32,
    player_deaths: u32,
    pet_deaths: u32,
    flee_events: u32,
    enemy_breakdown: BTreeMap<String, u32>,
    /// Areas in order of first visit.
    areas: Vec<AreaRecord>,
    /// Area currently being farmed and when the player got there.
    current_area: Option<(String, f64)>,
    notes: Vec<String>,
}

impl SessionCounters {
    /// Start counting at `now`.
    pub fn new(now: f64) -> Self {
        Self {
            started_at: now,
            ..Default::default()
        }
    }

    /// When the session started, seconds since the epoch.
    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    /// Seconds since the session started.
    pub fn elapsed(&self, now: f64) -> f64 {
        (now - self.started_at).max(0.0)
    }

    /// Flees so far.
    pub fn flee_events(&self) -> u32 {
        self.flee_events
    }

    /// Gold credited so far.
    pub fn gold_collected(&self) -> u64 {
        self.gold_collected
    }

    fn area_mut(&mut self, name: &str) -> &mut AreaRecord {
        let index = match self.areas.iter().position(|a| a.area == name) {
            Some(index) => index,
            None => {
                self.areas.push(AreaRecord::new(name, 0, 0.0));
                self.areas.len() - 1
            }
        };
        &mut self.areas[index]
    }

    /// Switch to farming `name`, closing the timer of the previous area.
    pub fn enter_area(&mut self, name: impl Into<String>, now: f64) {
        let name = name.into();
        if self.current_area.as_ref().is_some_and(|(current, _)| *current == name) {
            return;
        }
        self.leave_area(now);
        self.area_mut(&name);
        self.current_area = Some((name, now));
    }

    /// Stop the area timer, e.g. when recalling home.
    pub fn leave_area(&mut self, now: f64) {
        if let Some((name, since)) = self.current_area.take() {
            self.area_mut(&name).time += (now - since).max(0.0);
        }
    }

    /// Credit gold to the session and the current area.
    pub fn record_gold(&mut self, amount: u64) {
        self.gold_collected = self.gold_collected.saturating_add(amount);
        if let Some((name, _)) = self.current_area.clone() {
            let area = self.area_mut(&name);
            area.gold = area.gold.saturating_add(amount);
        }
    }

    /// Count a kill of `enemy`.
    pub fn record_kill(&mut self, enemy: impl Into<String>) {
        self.kills += 1;
        *self.enemy_breakdown.entry(enemy.into()).or_default() += 1;
    }

    /// Count a player death.
    pub fn record_player_death(&mut self) {
        self.player_deaths += 1;
    }

    /// Count a pet death.
    pub fn record_pet_death(&mut self) {
        self.pet_deaths += 1;
    }

    /// Count an entry into the fleeing state.
    pub fn record_flee(&mut self) {
        self.flee_events += 1;
    }

    /// Attach a free-form note to the session record.
    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Freeze the counters as of `now`. The open area timer is included but not closed.
    pub fn to_stats(&self, now: f64, supplies_used: SuppliesUsed) -> SessionStats {
        let mut areas = self.areas.clone();
        if let Some((name, since)) = &self.current_area {
            if let Some(area) = areas.iter_mut().find(|a| a.area == *name) {
                area.time += (now - since).max(0.0);
            }
        }

        SessionStats {
            session_duration: self.elapsed(now),
            gold_collected: self.gold_collected,
            kills: self.kills,
            player_deaths: self.player_deaths,
            pet_deaths: self.pet_deaths,
            flee_events: self.flee_events,
            supplies_used,
            areas_farmed: areas,
            enemy_breakdown: self.enemy_breakdown.clone(),
            notes: self.notes.join("; "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_time_and_gold() {
        let mut counters = SessionCounters::new(0.0);
        counters.enter_area("Minoc Mine", 0.0);
        counters.record_gold(300);
        counters.enter_area("Yew Woods", 600.0);
        counters.record_gold(100);
        counters.enter_area("Minoc Mine", 900.0);

        let stats = counters.to_stats(1200.0, SuppliesUsed::default());
        assert_eq!(stats.session_duration, 1200.0);
        assert_eq!(stats.gold_collected, 400);
        assert_eq!(
            stats.areas_farmed,
            vec![
                AreaRecord::new("Minoc Mine", 300, 900.0),
                AreaRecord::new("Yew Woods", 100, 300.0),
            ]
        );
    }

    #[test]
    fn test_reentering_same_area_keeps_timer() {
        let mut counters = SessionCounters::new(0.0);
        counters.enter_area("Mine", 0.0);
        counters.enter_area("Mine", 50.0);
        counters.leave_area(100.0);
        counters.leave_area(500.0);

        let stats = counters.to_stats(500.0, SuppliesUsed::default());
        assert_eq!(stats.areas_farmed[0].time, 100.0);
    }

    #[test]
    fn test_kills_deaths_and_notes() {
        let mut counters = SessionCounters::new(10.0);
        counters.record_kill("earth elemental");
        counters.record_kill("earth elemental");
        counters.record_kill("ettin");
        counters.record_player_death();
        counters.record_pet_death();
        counters.record_flee();
        counters.add_note("lag spike");
        counters.add_note("pk sighted");

        let stats = counters.to_stats(70.0, SuppliesUsed::default());
        assert_eq!(stats.kills, 3);
        assert_eq!(stats.enemy_breakdown["earth elemental"], 2);
        assert_eq!(stats.player_deaths + stats.pet_deaths, 2);
        assert_eq!(stats.flee_events, 1);
        assert_eq!(stats.notes, "lag spike; pk sighted");
        assert_eq!(stats.session_duration, 60.0);
    }
}
