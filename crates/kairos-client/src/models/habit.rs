use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitStatus {
    Active,
    Swapped,
    Paused,
    Completed,
    /// Any status string this client doesn't know yet
    #[serde(other)]
    Unknown,
}

impl HabitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HabitStatus::Active => "active",
            HabitStatus::Swapped => "swapped",
            HabitStatus::Paused => "paused",
            HabitStatus::Completed => "completed",
            HabitStatus::Unknown => "unknown",
        }
    }
}

impl Default for HabitStatus {
    fn default() -> Self {
        HabitStatus::Active
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub goal_id: String,
    #[serde(default)]
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_frequency")]
    pub frequency: String,
    #[serde(default)]
    pub time_of_day: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub status: HabitStatus,
    #[serde(default, with = "timestamp::optional")]
    pub activated_at: Option<DateTime<Utc>>,
    /// Navigational back-references; replacement is append-only.
    #[serde(default)]
    pub replaced_by: Option<String>,
    #[serde(default)]
    pub replaces: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub linked_tracker_id: Option<String>,
    #[serde(default)]
    pub tracker_threshold: Option<f64>,
    #[serde(default, with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::optional")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_frequency() -> String {
    "daily".to_string()
}

impl Habit {
    /// Local calendar day the habit starts counting from, in the same zone
    /// as the client's "today".
    pub fn activated_on(&self) -> Option<NaiveDate> {
        self.activated_on_in(&Local)
    }

    pub fn activated_on_in<Tz: TimeZone>(&self, zone: &Tz) -> Option<NaiveDate> {
        self.activated_at.map(|ts| ts.with_timezone(zone).date_naive())
    }

    pub fn is_active(&self) -> bool {
        self.status == HabitStatus::Active
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HabitUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<HabitStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaces: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_tracker_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_threshold: Option<f64>,
}
