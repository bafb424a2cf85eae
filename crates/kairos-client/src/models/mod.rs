//! Wire types for the Kairos REST API
//!
//! Every entity here is owned by the server; the client only ever holds
//! cached copies of them.

pub mod account;
pub mod catalog;
pub mod coaching;
pub mod daily_log;
pub mod goal;
pub mod habit;
pub mod timestamp;
pub mod tracker;

pub use account::{
    AiConfig, AiConfigTest, AiConfigUpdate, AiTestResult, LoginResponse, SystemSettings, SystemStats,
    UpdateSettingsRequest, User, UserPage,
};
pub use catalog::{AiModel, GoalTemplate, ModelPricing, Question, QuestionOption, SelectedModel};
pub use coaching::{
    ChangeDecision, ChatMessage, ChatRole, CoachingSession, HabitPerformance, PerformanceSnapshot,
    ProposedChange, SessionSummary, TrackerTrend, DEFAULT_TRIGGER,
};
pub use daily_log::{merge_log, merge_tracker_entries, DailyLog, HabitCompletion, TrackerEntry, OPTIMISTIC_LOG_ID};
pub use goal::{AiContext, Goal, GoalCreate, GoalUpdate};
pub use habit::{Habit, HabitStatus, HabitUpdate};
pub use tracker::{Direction, Tracker, TrackerUpdate};
