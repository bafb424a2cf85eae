// Kairos/crates/kairos-client/src/lib.rs

pub mod actions;
pub mod aggregation;
pub mod api;
pub mod cache_management;
pub mod config;
pub mod error;
pub mod models;
pub mod optimistic;
pub mod queries;
pub mod shared_state;
pub mod telemetry;

// Public API exports
pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use shared_state::{AtomicCounters, KairosState};

pub use aggregation::{DateWindow, DayProgress, HabitStats, LogIndex, TrackerStats, Trend};
pub use cache_management::{CachedValue, QueryCache, QueryData, QueryKey};
pub use optimistic::{Mutation, MutationController, MutationState, OptimisticUpdate, SendChatMessage, ToggleHabit};
