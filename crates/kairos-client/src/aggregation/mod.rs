// Kairos/crates/kairos-client/src/aggregation/mod.rs
//! Rolling-window statistics over daily logs
//!
//! Everything here is a pure function of its inputs. Missing or malformed
//! data degrades to "no data" (0 streak, 0% rate, stable trend) and never
//! produces an error.

pub mod habit_stats;
pub mod history;
pub mod tracker_stats;
pub mod window;

pub use habit_stats::{completion_rate, day_progress, habit_stats, streak, DayProgress, HabitStats};
pub use history::{habit_history, replacement_chain};
pub use tracker_stats::{average, tracker_stats, trend, values_in_window, TrackerStats, Trend};
pub use window::{DateWindow, LogIndex};
