use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregation::window::{DateWindow, LogIndex};
use crate::models::Habit;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitStats {
    pub habit_id: String,
    pub streak: u32,
    /// Whole percent, 0..=100
    pub completion_rate: u32,
    pub completed_days: u32,
    pub effective_days: u32,
    pub activated_on: Option<NaiveDate>,
    pub starts_in_future: bool,
}

/// Consecutive completed days counting back from the newest date in `window`.
/// Zero as soon as the newest date is not completed.
pub fn streak(window: &DateWindow, index: &LogIndex<'_>, habit_id: &str) -> u32 {
    window
        .dates()
        .iter()
        .rev()
        .take_while(|date| index.is_completed(**date, habit_id))
        .count() as u32
}

pub fn completed_days(window: &DateWindow, index: &LogIndex<'_>, habit_id: &str) -> u32 {
    window
        .dates()
        .iter()
        .filter(|date| index.is_completed(**date, habit_id))
        .count() as u32
}

/// Completed share of `window`, rounded to a whole percent. An empty window is 0.
pub fn completion_rate(window: &DateWindow, index: &LogIndex<'_>, habit_id: &str) -> u32 {
    if window.is_empty() {
        return 0;
    }
    let completed = completed_days(window, index, habit_id) as f64;
    ((completed / window.len() as f64) * 100.0).round() as u32
}

pub fn habit_stats(habit: &Habit, window: &DateWindow, index: &LogIndex<'_>, today: NaiveDate) -> HabitStats {
    let activated_on = habit.activated_on();
    let effective = window.effective(activated_on);

    HabitStats {
        habit_id: habit.id.clone(),
        streak: streak(&effective, index, &habit.id),
        completion_rate: completion_rate(&effective, index, &habit.id),
        completed_days: completed_days(&effective, index, &habit.id),
        effective_days: effective.len() as u32,
        activated_on,
        starts_in_future: activated_on.map(|start| start > today).unwrap_or(false),
    }
}

/// Completed vs. total habits for one day's checklist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayProgress {
    pub completed: u32,
    pub total: u32,
}

impl DayProgress {
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u32
    }

    pub fn is_done(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

pub fn day_progress(habits: &[Habit], index: &LogIndex<'_>, date: NaiveDate) -> DayProgress {
    DayProgress {
        completed: habits.iter().filter(|h| index.is_completed(date, &h.id)).count() as u32,
        total: habits.len() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyLog, HabitCompletion};
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
    }

    fn habit(id: &str, activated_days_ago: Option<i64>) -> Habit {
        let mut value = serde_json::json!({"id": id, "goal_id": "g1", "title": "Morning walk"});
        if let Some(days) = activated_days_ago {
            let at = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap() - Duration::days(days);
            value["activated_at"] = serde_json::Value::String(at.to_rfc3339());
        }
        serde_json::from_value(value).unwrap()
    }

    fn log_on(date: NaiveDate, habit_id: &str, completed: bool) -> DailyLog {
        let mut log = DailyLog::optimistic("g1", date, Utc::now());
        log.id = format!("log-{}", date);
        log.habit_completions.push(HabitCompletion {
            habit_id: habit_id.to_string(),
            completed,
            completed_at: None,
            notes: String::new(),
        });
        log
    }

    #[test]
    fn test_recently_activated_habit_all_done() {
        // Activated 3 days ago counting today: 12th, 13th, 14th.
        let h = habit("h1", Some(2));
        let logs: Vec<DailyLog> = (0..3).map(|i| log_on(today() - Duration::days(i), "h1", true)).collect();
        let index = LogIndex::new(&logs);
        let window = DateWindow::ending_on(today(), 14);

        let stats = habit_stats(&h, &window, &index, today());
        assert_eq!(stats.streak, 3);
        assert_eq!(stats.completion_rate, 100);
        assert_eq!(stats.effective_days, 3);
        assert!(!stats.starts_in_future);
    }

    #[test]
    fn test_incomplete_today_breaks_streak() {
        let logs = vec![
            log_on(today() - Duration::days(2), "h1", true),
            log_on(today() - Duration::days(1), "h1", true),
            log_on(today(), "h1", false),
        ];
        let index = LogIndex::new(&logs);
        let window = DateWindow::ending_on(today(), 14);
        assert_eq!(streak(&window, &index, "h1"), 0);
        assert_eq!(completion_rate(&window, &index, "h1"), 14);
    }

    #[test]
    fn test_missing_day_stops_streak() {
        let logs = vec![
            log_on(today() - Duration::days(3), "h1", true),
            log_on(today() - Duration::days(1), "h1", true),
            log_on(today(), "h1", true),
        ];
        let index = LogIndex::new(&logs);
        assert_eq!(streak(&DateWindow::ending_on(today(), 14), &index, "h1"), 2);
    }

    #[test]
    fn test_future_habit_has_empty_window() {
        let h = habit("h1", Some(-3));
        let stats = habit_stats(&h, &DateWindow::ending_on(today(), 14), &LogIndex::default(), today());
        assert!(stats.starts_in_future);
        assert_eq!(stats.effective_days, 0);
        assert_eq!(stats.completion_rate, 0);
        assert_eq!(stats.streak, 0);
    }

    #[test]
    fn test_rate_rounds_to_nearest() {
        // 1 of 3 days -> 33%, 2 of 3 -> 67%
        let window = DateWindow::ending_on(today(), 3);
        let one = vec![log_on(today(), "h1", true)];
        let two = vec![log_on(today(), "h1", true), log_on(today() - Duration::days(1), "h1", true)];
        assert_eq!(completion_rate(&window, &LogIndex::new(&one), "h1"), 33);
        assert_eq!(completion_rate(&window, &LogIndex::new(&two), "h1"), 67);
    }

    #[test]
    fn test_day_progress() {
        let habits = vec![habit("h1", None), habit("h2", None)];
        let logs = vec![log_on(today(), "h1", true)];
        let progress = day_progress(&habits, &LogIndex::new(&logs), today());
        assert_eq!(progress, DayProgress { completed: 1, total: 2 });
        assert_eq!(progress.percent(), 50);
        assert_eq!(day_progress(&[], &LogIndex::default(), today()).percent(), 0);
    }

    fn logs_from(flags: &[Option<bool>]) -> Vec<DailyLog> {
        let start = today() - Duration::days(flags.len() as i64 - 1);
        flags
            .iter()
            .enumerate()
            .filter_map(|(i, flag)| flag.map(|done| log_on(start + Duration::days(i as i64), "h1", done)))
            .collect()
    }

    proptest! {
        #[test]
        fn prop_rate_and_streak_bounded(
            flags in proptest::collection::vec(any::<Option<bool>>(), 1..30),
            start_offset in 0i64..40,
        ) {
            let logs = logs_from(&flags);
            let index = LogIndex::new(&logs);
            let window = DateWindow::ending_on(today(), flags.len() as u32)
                .effective(Some(today() - Duration::days(start_offset)));

            let rate = completion_rate(&window, &index, "h1");
            let streak = streak(&window, &index, "h1");
            prop_assert!(rate <= 100);
            prop_assert!(streak as usize <= window.len());
            if window.is_empty() {
                prop_assert_eq!(rate, 0);
            }
            if let Some(newest) = window.last() {
                if !index.is_completed(newest, "h1") {
                    prop_assert_eq!(streak, 0);
                }
            }
        }

        #[test]
        fn prop_absent_day_same_as_empty_log(flags in proptest::collection::vec(any::<Option<bool>>(), 1..20)) {
            let sparse = logs_from(&flags);
            let mut padded = sparse.clone();
            let start = today() - Duration::days(flags.len() as i64 - 1);
            for (i, flag) in flags.iter().enumerate() {
                if flag.is_none() {
                    let mut empty = DailyLog::optimistic("g1", start + Duration::days(i as i64), Utc::now());
                    empty.id = format!("empty-{}", i);
                    padded.push(empty);
                }
            }
            let window = DateWindow::ending_on(today(), flags.len() as u32);
            let (a, b) = (LogIndex::new(&sparse), LogIndex::new(&padded));
            prop_assert_eq!(streak(&window, &a, "h1"), streak(&window, &b, "h1"));
            prop_assert_eq!(completion_rate(&window, &a, "h1"), completion_rate(&window, &b, "h1"));
        }
    }
}
