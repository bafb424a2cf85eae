use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

/// Id carried by a log synthesized on the client before the server has one.
pub const OPTIMISTIC_LOG_ID: &str = "optimistic";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitCompletion {
    pub habit_id: String,
    pub completed: bool,
    #[serde(default, with = "timestamp::optional")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerEntry {
    pub tracker_id: String,
    pub value: f64,
    #[serde(default, with = "timestamp::optional")]
    pub logged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
}

/// One user's record for one goal on one calendar day.
///
/// Logs are created lazily by the server; a missing log means nothing was
/// logged that day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLog {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub goal_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub habit_completions: Vec<HabitCompletion>,
    #[serde(default)]
    pub tracker_entries: Vec<TrackerEntry>,
    #[serde(default, with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::optional")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DailyLog {
    /// A client-side stand-in for a log the server hasn't created yet.
    pub fn optimistic(goal_id: &str, date: NaiveDate, at: DateTime<Utc>) -> Self {
        Self {
            id: OPTIMISTIC_LOG_ID.to_string(),
            user_id: String::new(),
            goal_id: goal_id.to_string(),
            date,
            habit_completions: Vec::new(),
            tracker_entries: Vec::new(),
            created_at: Some(at),
            updated_at: Some(at),
        }
    }

    pub fn is_optimistic(&self) -> bool {
        self.id == OPTIMISTIC_LOG_ID
    }

    pub fn completion(&self, habit_id: &str) -> Option<&HabitCompletion> {
        self.habit_completions.iter().find(|c| c.habit_id == habit_id)
    }

    pub fn is_completed(&self, habit_id: &str) -> bool {
        self.completion(habit_id).map(|c| c.completed).unwrap_or(false)
    }

    pub fn entry(&self, tracker_id: &str) -> Option<&TrackerEntry> {
        self.tracker_entries.iter().find(|e| e.tracker_id == tracker_id)
    }

    /// Flip a habit's completion the way the server does: an existing entry
    /// is inverted, a missing one is appended as completed.
    pub fn toggle_habit(&mut self, habit_id: &str, at: DateTime<Utc>) {
        match self.habit_completions.iter_mut().find(|c| c.habit_id == habit_id) {
            Some(existing) => {
                existing.completed = !existing.completed;
                existing.completed_at = if existing.completed { Some(at) } else { None };
            }
            None => self.habit_completions.push(HabitCompletion {
                habit_id: habit_id.to_string(),
                completed: true,
                completed_at: Some(at),
                notes: String::new(),
            }),
        }
        self.updated_at = Some(at);
    }
}

/// Replace the log for `incoming.goal_id` in a day's list, or append it.
pub fn merge_log(mut logs: Vec<DailyLog>, incoming: DailyLog) -> Vec<DailyLog> {
    match logs.iter_mut().find(|log| log.goal_id == incoming.goal_id) {
        Some(slot) => *slot = incoming,
        None => logs.push(incoming),
    }
    logs
}

/// Carry `confirmed`'s tracker entries into the matching goal's log,
/// leaving its habit completions alone.
pub fn merge_tracker_entries(mut logs: Vec<DailyLog>, confirmed: &DailyLog) -> Vec<DailyLog> {
    match logs.iter_mut().find(|log| log.goal_id == confirmed.goal_id) {
        Some(log) => {
            for entry in &confirmed.tracker_entries {
                match log.tracker_entries.iter_mut().find(|e| e.tracker_id == entry.tracker_id) {
                    Some(existing) => *existing = entry.clone(),
                    None => log.tracker_entries.push(entry.clone()),
                }
            }
        }
        None => logs.push(confirmed.clone()),
    }
    logs
}
