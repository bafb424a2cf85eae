use chrono::{DateTime, Utc};

use crate::cache_management::QueryKey;
use crate::error::{ClientError, Result};
use crate::models::{ChatMessage, CoachingSession};
use crate::optimistic::controller::OptimisticUpdate;

/// Append the user's message to the cached coaching session.
///
/// The coach's reply is never synthesized; it arrives with the server's
/// session, and until then `CoachingSession::awaiting_reply` holds.
#[derive(Debug, Clone)]
pub struct SendChatMessage {
    pub goal_id: String,
    pub session_id: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl SendChatMessage {
    pub fn new(goal_id: impl Into<String>, session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            goal_id: goal_id.into(),
            session_id: session_id.into(),
            content: content.into(),
            sent_at: Utc::now(),
        }
    }

    pub fn at(mut self, sent_at: DateTime<Utc>) -> Self {
        self.sent_at = sent_at;
        self
    }
}

impl OptimisticUpdate for SendChatMessage {
    type Data = Option<CoachingSession>;
    type Response = CoachingSession;

    fn key(&self) -> QueryKey {
        QueryKey::coaching(&self.goal_id)
    }

    fn check(&self) -> Result<()> {
        if self.session_id.trim().is_empty() {
            return Err(ClientError::precondition("no coaching session to send to"));
        }
        if self.content.trim().is_empty() {
            return Err(ClientError::precondition("message is empty"));
        }
        Ok(())
    }

    fn speculate(&self, current: Option<Option<CoachingSession>>) -> Option<Option<CoachingSession>> {
        match current {
            Some(Some(mut session)) if session.id == self.session_id => {
                session.messages.push(ChatMessage::user(self.content.clone(), self.sent_at));
                Some(Some(session))
            }
            _ => None,
        }
    }

    fn reconcile(&self, _current: Option<Option<CoachingSession>>, response: &CoachingSession) -> Option<CoachingSession> {
        Some(response.clone())
    }

    fn label(&self) -> &'static str {
        "send-message"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatRole;

    fn session(id: &str) -> CoachingSession {
        serde_json::from_value(serde_json::json!({"id": id, "goal_id": "g1"})).unwrap()
    }

    #[test]
    fn test_appends_user_message_only() {
        let update = SendChatMessage::new("g1", "s1", "I skipped my run");
        let next = update.speculate(Some(Some(session("s1")))).unwrap().unwrap();
        assert_eq!(next.messages.len(), 1);
        assert_eq!(next.messages[0].role, ChatRole::User);
        assert_eq!(next.messages[0].content, "I skipped my run");
        assert!(next.awaiting_reply());
    }

    #[test]
    fn test_no_cached_session_means_no_write() {
        let update = SendChatMessage::new("g1", "s1", "hello");
        assert!(update.speculate(None).is_none());
        assert!(update.speculate(Some(None)).is_none());
        assert!(update.speculate(Some(Some(session("s0")))).is_none());
    }

    #[test]
    fn test_blank_message_fails_check() {
        assert!(SendChatMessage::new("g1", "s1", "  ").check().is_err());
        assert!(SendChatMessage::new("g1", "", "hi").check().is_err());
        assert!(SendChatMessage::new("g1", "s1", "hi").check().is_ok());
    }
}
