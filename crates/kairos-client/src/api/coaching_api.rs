use serde::Serialize;
use tracing::debug;

use super::client::{seg, ApiClient};
use crate::error::Result;
use crate::models::CoachingSession;

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    message: &'a str,
}

impl ApiClient {
    pub async fn active_coaching(&self, goal_id: &str) -> Result<Option<CoachingSession>> {
        self.get_json(&format!("/goals/{}/coaching", seg(goal_id)), &[]).await
    }

    pub async fn start_coaching(&self, goal_id: &str, trigger: &str) -> Result<CoachingSession> {
        let path = format!("/goals/{}/coaching/start", seg(goal_id));
        self.post_json::<(), _>(&path, &[("trigger", trigger.to_string())], None).await
    }

    /// Send a chat message. The returned session includes the message and
    /// the coach's reply.
    pub async fn send_message(&self, session_id: &str, message: &str) -> Result<CoachingSession> {
        debug!("Sending {} chars to coaching session {}", message.len(), session_id);
        let path = format!("/coaching/{}/message", seg(session_id));
        self.post_json(&path, &[], Some(&MessageRequest { message })).await
    }

    pub async fn accept_change(&self, session_id: &str, index: usize) -> Result<CoachingSession> {
        let path = format!("/coaching/{}/accept-change/{}", seg(session_id), index);
        self.post_json::<(), _>(&path, &[], None).await
    }

    pub async fn reject_change(&self, session_id: &str, index: usize) -> Result<CoachingSession> {
        let path = format!("/coaching/{}/reject-change/{}", seg(session_id), index);
        self.post_json::<(), _>(&path, &[], None).await
    }

    pub async fn resolve_session(&self, session_id: &str) -> Result<CoachingSession> {
        let path = format!("/coaching/{}/resolve", seg(session_id));
        self.post_json::<(), _>(&path, &[], None).await
    }
}
