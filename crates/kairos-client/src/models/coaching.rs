use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(with = "timestamp::required")]
    pub timestamp: DateTime<Utc>,
    /// Tool invocations the coach made while producing this reply
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<serde_json::Value>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            timestamp,
            tool_calls: Vec::new(),
        }
    }
}

/// Outcome of a proposed change. On the wire this is `null | true | false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeDecision {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl ChangeDecision {
    pub fn is_pending(&self) -> bool {
        matches!(self, ChangeDecision::Pending)
    }
}

impl From<Option<bool>> for ChangeDecision {
    fn from(raw: Option<bool>) -> Self {
        match raw {
            None => ChangeDecision::Pending,
            Some(true) => ChangeDecision::Accepted,
            Some(false) => ChangeDecision::Rejected,
        }
    }
}

impl From<ChangeDecision> for Option<bool> {
    fn from(decision: ChangeDecision) -> Self {
        match decision {
            ChangeDecision::Pending => None,
            ChangeDecision::Accepted => Some(true),
            ChangeDecision::Rejected => Some(false),
        }
    }
}

impl Serialize for ChangeDecision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Option::<bool>::from(*self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ChangeDecision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<bool>::deserialize(deserializer).map(ChangeDecision::from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedChange {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub accepted: ChangeDecision,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitPerformance {
    pub habit_id: String,
    pub title: String,
    pub completed_count: u32,
    pub total_days: u32,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerTrend {
    pub tracker_id: String,
    pub name: String,
    #[serde(default)]
    pub values: Vec<f64>,
    #[serde(default)]
    pub trend: String,
}

/// Server-computed performance figures the session was opened with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub period_start: String,
    pub period_end: String,
    #[serde(default)]
    pub habits: Vec<HabitPerformance>,
    #[serde(default)]
    pub tracker_trends: Vec<TrackerTrend>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub habits_added: Vec<String>,
    #[serde(default)]
    pub next_check_in: Option<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingSession {
    pub id: String,
    pub goal_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default = "default_trigger")]
    pub trigger: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub performance_snapshot: Option<PerformanceSnapshot>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub proposed_changes: Vec<ProposedChange>,
    #[serde(default)]
    pub summary: Option<SessionSummary>,
    #[serde(default, with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::optional")]
    pub resolved_at: Option<DateTime<Utc>>,
}

pub const DEFAULT_TRIGGER: &str = "scheduled_review";

fn default_trigger() -> String {
    DEFAULT_TRIGGER.to_string()
}

fn default_status() -> String {
    "active".to_string()
}

impl CoachingSession {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    /// True while the last message is the user's, i.e. the coach hasn't answered yet.
    pub fn awaiting_reply(&self) -> bool {
        matches!(self.messages.last(), Some(m) if m.role == ChatRole::User)
    }

    pub fn pending_changes(&self) -> impl Iterator<Item = (usize, &ProposedChange)> {
        self.proposed_changes
            .iter()
            .enumerate()
            .filter(|(_, change)| change.accepted.is_pending())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tri_state_decision() {
        let session: CoachingSession = serde_json::from_str(
            r#"{"id":"s1","goal_id":"g1","messages":[],
                "proposed_changes":[
                    {"type":"add_habit","description":"Stretch","details":{},"accepted":null},
                    {"type":"swap_habit","description":"Swap run","details":{},"accepted":true},
                    {"type":"remove_habit","description":"Drop","details":{},"accepted":false},
                    {"type":"add_tracker","description":"Sleep","details":{}}
                ]}"#,
        )
        .unwrap();
        let decisions: Vec<_> = session.proposed_changes.iter().map(|c| c.accepted).collect();
        assert_eq!(
            decisions,
            vec![
                ChangeDecision::Pending,
                ChangeDecision::Accepted,
                ChangeDecision::Rejected,
                ChangeDecision::Pending
            ]
        );
        let pending: Vec<usize> = session.pending_changes().map(|(i, _)| i).collect();
        assert_eq!(pending, vec![0, 3]);
        assert_eq!(serde_json::to_value(ChangeDecision::Pending).unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn test_awaiting_reply() {
        let mut session: CoachingSession =
            serde_json::from_str(r#"{"id":"s1","goal_id":"g1"}"#).unwrap();
        assert!(!session.awaiting_reply());
        session.messages.push(ChatMessage::user("hi", Utc::now()));
        assert!(session.awaiting_reply());
        assert_eq!(session.trigger, DEFAULT_TRIGGER);
    }
}
