use super::client::{seg, ApiClient};
use crate::error::Result;
use crate::models::{Habit, HabitStatus, HabitUpdate};

impl ApiClient {
    pub async fn list_habits(&self, goal_id: &str, status: Option<HabitStatus>) -> Result<Vec<Habit>> {
        let query: Vec<(&str, String)> = status
            .map(|s| vec![("status", s.as_str().to_string())])
            .unwrap_or_default();
        self.get_json(&format!("/goals/{}/habits", seg(goal_id)), &query).await
    }

    pub async fn update_habit(&self, habit_id: &str, data: &HabitUpdate) -> Result<Habit> {
        self.patch_json(&format!("/habits/{}", seg(habit_id)), data).await
    }
}
