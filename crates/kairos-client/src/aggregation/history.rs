use std::cmp::Reverse;
use std::collections::HashMap;

use crate::models::Habit;

/// Every habit a goal has had, newest first. Undated habits sort last.
pub fn habit_history(habits: &[Habit]) -> Vec<&Habit> {
    let mut sorted: Vec<&Habit> = habits.iter().collect();
    sorted.sort_by_key(|habit| Reverse(habit.created_at));
    sorted
}

/// `habit_id` followed by the habits it replaced, back to the oldest one.
///
/// Stops at a missing link, and after `habits.len()` steps so a malformed
/// cycle still terminates.
pub fn replacement_chain<'a>(habits: &'a [Habit], habit_id: &str) -> Vec<&'a Habit> {
    let by_id: HashMap<&str, &Habit> = habits.iter().map(|h| (h.id.as_str(), h)).collect();
    let mut chain = Vec::new();
    let mut next = by_id.get(habit_id).copied();

    while let Some(habit) = next {
        if chain.len() >= habits.len() || chain.iter().any(|seen: &&Habit| seen.id == habit.id) {
            break;
        }
        chain.push(habit);
        next = habit.replaces.as_deref().and_then(|id| by_id.get(id).copied());
    }
    chain
}
