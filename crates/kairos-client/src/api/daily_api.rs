use chrono::NaiveDate;
use serde::Serialize;

use super::client::{seg, ApiClient};
use crate::error::Result;
use crate::models::DailyLog;

#[derive(Debug, Serialize)]
struct TrackerLogRequest<'a> {
    value: f64,
    notes: &'a str,
}

fn day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl ApiClient {
    /// All of the user's logs for one day, one per goal. Days nobody logged
    /// come back as an empty list.
    pub async fn daily_logs(&self, date: NaiveDate) -> Result<Vec<DailyLog>> {
        let logs: Option<Vec<DailyLog>> = self.get_json(&format!("/daily/{}", day(date)), &[]).await?;
        Ok(logs.unwrap_or_default())
    }

    pub async fn toggle_habit(&self, date: NaiveDate, goal_id: &str, habit_id: &str) -> Result<DailyLog> {
        let path = format!(
            "/daily/{}/goals/{}/habits/{}/toggle",
            day(date),
            seg(goal_id),
            seg(habit_id)
        );
        self.post_json::<(), _>(&path, &[], None).await
    }

    pub async fn log_tracker(
        &self,
        date: NaiveDate,
        goal_id: &str,
        tracker_id: &str,
        value: f64,
        notes: &str,
    ) -> Result<DailyLog> {
        let path = format!(
            "/daily/{}/goals/{}/trackers/{}/log",
            day(date),
            seg(goal_id),
            seg(tracker_id)
        );
        self.post_json(&path, &[], Some(&TrackerLogRequest { value, notes })).await
    }
}
