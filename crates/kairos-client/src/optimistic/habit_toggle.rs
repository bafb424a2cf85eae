use chrono::{DateTime, NaiveDate, Utc};

use crate::cache_management::QueryKey;
use crate::error::{ClientError, Result};
use crate::models::{merge_log, DailyLog};
use crate::optimistic::controller::OptimisticUpdate;

/// Flip one habit's completion in a day's log list.
#[derive(Debug, Clone)]
pub struct ToggleHabit {
    pub date: NaiveDate,
    pub goal_id: String,
    pub habit_id: String,
    pub now: DateTime<Utc>,
}

impl ToggleHabit {
    pub fn new(date: NaiveDate, goal_id: impl Into<String>, habit_id: impl Into<String>) -> Self {
        Self {
            date,
            goal_id: goal_id.into(),
            habit_id: habit_id.into(),
            now: Utc::now(),
        }
    }

    /// Use a fixed clock for the speculative `completed_at`.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

impl OptimisticUpdate for ToggleHabit {
    type Data = Vec<DailyLog>;
    type Response = DailyLog;

    fn key(&self) -> QueryKey {
        QueryKey::daily(self.date)
    }

    fn check(&self) -> Result<()> {
        if self.goal_id.trim().is_empty() {
            return Err(ClientError::precondition("toggling a habit needs a goal"));
        }
        if self.habit_id.trim().is_empty() {
            return Err(ClientError::precondition("toggling a habit needs a habit id"));
        }
        Ok(())
    }

    fn speculate(&self, current: Option<Vec<DailyLog>>) -> Option<Vec<DailyLog>> {
        let mut logs = current.unwrap_or_default();
        match logs.iter_mut().find(|log| log.goal_id == self.goal_id) {
            Some(log) => log.toggle_habit(&self.habit_id, self.now),
            None => {
                let mut log = DailyLog::optimistic(&self.goal_id, self.date, self.now);
                log.toggle_habit(&self.habit_id, self.now);
                logs.push(log);
            }
        }
        Some(logs)
    }

    fn reconcile(&self, current: Option<Vec<DailyLog>>, response: &DailyLog) -> Vec<DailyLog> {
        merge_log(current.unwrap_or_default(), response.clone())
    }

    fn label(&self) -> &'static str {
        "toggle-habit"
    }
}
