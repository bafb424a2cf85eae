use tracing::info;

use super::client::{seg, ApiClient};
use crate::error::Result;
use crate::models::{Goal, GoalCreate, GoalUpdate};

impl ApiClient {
    /// The user's active goal, `None` when they haven't set one up.
    pub async fn active_goal(&self) -> Result<Option<Goal>> {
        self.get_json("/goals", &[]).await
    }

    pub async fn goal(&self, goal_id: &str) -> Result<Goal> {
        self.get_json(&format!("/goals/{}", seg(goal_id)), &[]).await
    }

    pub async fn create_goal(&self, data: &GoalCreate) -> Result<Goal> {
        let goal: Goal = self.post_json("/goals", &[], Some(data)).await?;
        info!("Created goal {} from template {}", goal.id, data.template_id);
        Ok(goal)
    }

    pub async fn update_goal(&self, goal_id: &str, data: &GoalUpdate) -> Result<Goal> {
        self.patch_json(&format!("/goals/{}", seg(goal_id)), data).await
    }

    pub async fn delete_goal(&self, goal_id: &str) -> Result<()> {
        self.delete_unit(&format!("/goals/{}", seg(goal_id))).await?;
        info!("Deleted goal {}", goal_id);
        Ok(())
    }
}
