use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use crate::models::HabitStatus;

/// Resource kind part of a query key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum QueryKind {
    ActiveGoal,
    Goal,
    Habits,
    Trackers,
    DailyLogs,
    ProgressLogs,
    Coaching,
    GoalTemplates,
    Models,
    SelectedModel,
    AiConfig,
    AdminSettings,
    AdminStats,
    AdminUsers,
}

/// One key per (resource kind, parameters) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum QueryKey {
    ActiveGoal,
    Goal { goal_id: String },
    Habits { goal_id: String, status: Option<HabitStatus> },
    Trackers { goal_id: String },
    DailyLogs { date: NaiveDate },
    /// Rolling window of a goal's logs, `days` long starting at `start`
    ProgressLogs { goal_id: String, start: NaiveDate, days: u32 },
    Coaching { goal_id: String },
    GoalTemplates,
    Models { search: Option<String> },
    SelectedModel,
    AiConfig,
    AdminSettings,
    AdminStats,
    AdminUsers { limit: u32, skip: u32 },
}

impl QueryKey {
    pub fn kind(&self) -> QueryKind {
        match self {
            QueryKey::ActiveGoal => QueryKind::ActiveGoal,
            QueryKey::Goal { .. } => QueryKind::Goal,
            QueryKey::Habits { .. } => QueryKind::Habits,
            QueryKey::Trackers { .. } => QueryKind::Trackers,
            QueryKey::DailyLogs { .. } => QueryKind::DailyLogs,
            QueryKey::ProgressLogs { .. } => QueryKind::ProgressLogs,
            QueryKey::Coaching { .. } => QueryKind::Coaching,
            QueryKey::GoalTemplates => QueryKind::GoalTemplates,
            QueryKey::Models { .. } => QueryKind::Models,
            QueryKey::SelectedModel => QueryKind::SelectedModel,
            QueryKey::AiConfig => QueryKind::AiConfig,
            QueryKey::AdminSettings => QueryKind::AdminSettings,
            QueryKey::AdminStats => QueryKind::AdminStats,
            QueryKey::AdminUsers { .. } => QueryKind::AdminUsers,
        }
    }

    /// Goal this key is scoped to, if any
    pub fn goal_id(&self) -> Option<&str> {
        match self {
            QueryKey::Goal { goal_id }
            | QueryKey::Habits { goal_id, .. }
            | QueryKey::Trackers { goal_id }
            | QueryKey::ProgressLogs { goal_id, .. }
            | QueryKey::Coaching { goal_id } => Some(goal_id),
            _ => None,
        }
    }

    pub fn habits(goal_id: &str, status: Option<HabitStatus>) -> Self {
        QueryKey::Habits { goal_id: goal_id.to_string(), status }
    }

    pub fn trackers(goal_id: &str) -> Self {
        QueryKey::Trackers { goal_id: goal_id.to_string() }
    }

    pub fn coaching(goal_id: &str) -> Self {
        QueryKey::Coaching { goal_id: goal_id.to_string() }
    }

    pub fn goal(goal_id: &str) -> Self {
        QueryKey::Goal { goal_id: goal_id.to_string() }
    }

    pub fn daily(date: NaiveDate) -> Self {
        QueryKey::DailyLogs { date }
    }

    /// Whether a progress window key covers `date`
    pub fn covers(&self, date: NaiveDate) -> bool {
        match self {
            QueryKey::DailyLogs { date: d } => *d == date,
            QueryKey::ProgressLogs { start, days, .. } => {
                let offset = (date - *start).num_days();
                offset >= 0 && offset < i64::from(*days)
            }
            _ => false,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::ActiveGoal => write!(f, "active-goal"),
            QueryKey::Goal { goal_id } => write!(f, "goal/{}", goal_id),
            QueryKey::Habits { goal_id, status } => match status {
                Some(status) => write!(f, "habits/{}/{}", goal_id, status.as_str()),
                None => write!(f, "habits/{}", goal_id),
            },
            QueryKey::Trackers { goal_id } => write!(f, "trackers/{}", goal_id),
            QueryKey::DailyLogs { date } => write!(f, "daily/{}", date),
            QueryKey::ProgressLogs { goal_id, start, days } => write!(f, "progress/{}/{}+{}", goal_id, start, days),
            QueryKey::Coaching { goal_id } => write!(f, "coaching/{}", goal_id),
            QueryKey::GoalTemplates => write!(f, "goal-templates"),
            QueryKey::Models { search } => write!(f, "models?{}", search.as_deref().unwrap_or("")),
            QueryKey::SelectedModel => write!(f, "models/selected"),
            QueryKey::AiConfig => write!(f, "ai-config"),
            QueryKey::AdminSettings => write!(f, "admin/settings"),
            QueryKey::AdminStats => write!(f, "admin/stats"),
            QueryKey::AdminUsers { limit, skip } => write!(f, "admin/users?limit={}&skip={}", limit, skip),
        }
    }
}
