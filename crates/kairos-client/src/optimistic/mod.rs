// Kairos/crates/kairos-client/src/optimistic/mod.rs
//! Optimistic mutations over the query cache

pub mod chat_message;
pub mod controller;
pub mod habit_toggle;

pub use chat_message::SendChatMessage;
pub use controller::{Mutation, MutationController, MutationState, OptimisticUpdate};
pub use habit_toggle::ToggleHabit;
