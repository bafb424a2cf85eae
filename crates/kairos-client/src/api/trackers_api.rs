use super::client::{seg, ApiClient};
use crate::error::Result;
use crate::models::{Tracker, TrackerUpdate};

impl ApiClient {
    pub async fn list_trackers(&self, goal_id: &str) -> Result<Vec<Tracker>> {
        self.get_json(&format!("/goals/{}/trackers", seg(goal_id)), &[]).await
    }

    pub async fn update_tracker(&self, tracker_id: &str, data: &TrackerUpdate) -> Result<Tracker> {
        self.patch_json(&format!("/trackers/{}", seg(tracker_id)), data).await
    }
}
