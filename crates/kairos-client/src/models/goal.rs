use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::habit::Habit;
use super::timestamp;
use super::tracker::Tracker;

/// Coach-maintained summary of where the user is in their plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiContext {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub plan_philosophy: String,
    #[serde(default = "default_phase")]
    pub current_phase: String,
    #[serde(default)]
    pub next_review_date: Option<String>,
}

fn default_phase() -> String {
    "building_foundation".to_string()
}

impl Default for AiContext {
    fn default() -> Self {
        Self {
            summary: String::new(),
            plan_philosophy: String::new(),
            current_phase: default_phase(),
            next_review_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub template_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub primary_metric_name: String,
    #[serde(default)]
    pub primary_metric_unit: String,
    #[serde(default)]
    pub initial_value: Option<f64>,
    #[serde(default)]
    pub target_value: Option<f64>,
    #[serde(default)]
    pub target_date: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub ai_context: AiContext,
    /// Embedded lists, present on some goal responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub habits: Option<Vec<Habit>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trackers: Option<Vec<Tracker>>,
    #[serde(default, with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::optional")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_status() -> String {
    "active".to_string()
}

impl Goal {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalCreate {
    pub template_id: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
    /// question id -> selected answer value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questionnaire_responses: Option<HashMap<String, String>>,
}

/// Partial update; unset fields are left out of the request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_value: Option<f64>,
}
