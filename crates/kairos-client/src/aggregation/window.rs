use chrono::{Duration, NaiveDate};
use std::collections::HashMap;

use crate::models::DailyLog;

/// Calendar dates under consideration, oldest first, no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateWindow {
    dates: Vec<NaiveDate>,
}

impl DateWindow {
    /// The `days` dates ending at (and including) `today`.
    pub fn ending_on(today: NaiveDate, days: u32) -> Self {
        let dates = (0..i64::from(days))
            .rev()
            .filter_map(|offset| today.checked_sub_signed(Duration::days(offset)))
            .collect();
        Self { dates }
    }

    pub fn from_dates<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Self {
        let mut dates: Vec<NaiveDate> = dates.into_iter().collect();
        dates.sort_unstable();
        dates.dedup();
        Self { dates }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.binary_search(&date).is_ok()
    }

    /// Dates on or after the activation day; the whole window when there is none.
    pub fn effective(&self, activated_on: Option<NaiveDate>) -> DateWindow {
        match activated_on {
            Some(start) => DateWindow {
                dates: self.dates.iter().copied().filter(|d| *d >= start).collect(),
            },
            None => self.clone(),
        }
    }
}

/// Daily logs grouped by calendar date.
///
/// A date without logs reads exactly like a date whose logs carry no entries.
#[derive(Debug, Default)]
pub struct LogIndex<'a> {
    by_date: HashMap<NaiveDate, Vec<&'a DailyLog>>,
}

impl<'a> LogIndex<'a> {
    pub fn new<I: IntoIterator<Item = &'a DailyLog>>(logs: I) -> Self {
        let mut by_date: HashMap<NaiveDate, Vec<&'a DailyLog>> = HashMap::new();
        for log in logs {
            by_date.entry(log.date).or_default().push(log);
        }
        Self { by_date }
    }

    /// Only the logs belonging to `goal_id`
    pub fn for_goal<I: IntoIterator<Item = &'a DailyLog>>(logs: I, goal_id: &str) -> Self {
        Self::new(logs.into_iter().filter(|log| log.goal_id == goal_id))
    }

    pub fn on(&self, date: NaiveDate) -> &[&'a DailyLog] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_completed(&self, date: NaiveDate, habit_id: &str) -> bool {
        self.on(date).iter().any(|log| log.is_completed(habit_id))
    }

    /// The tracker's value on `date`; non-finite values count as absent.
    pub fn value(&self, date: NaiveDate, tracker_id: &str) -> Option<f64> {
        self.on(date)
            .iter()
            .filter_map(|log| log.entry(tracker_id))
            .map(|entry| entry.value)
            .find(|value| value.is_finite())
    }

    pub fn len(&self) -> usize {
        self.by_date.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
    }

    #[test]
    fn test_ending_on_is_oldest_first_and_inclusive() {
        let window = DateWindow::ending_on(d(14), 14);
        assert_eq!(window.len(), 14);
        assert_eq!(window.first(), Some(d(1)));
        assert_eq!(window.last(), Some(d(14)));
        assert!(DateWindow::ending_on(d(14), 0).is_empty());
    }

    #[test]
    fn test_ending_on_crosses_month_boundary() {
        let window = DateWindow::ending_on(d(2), 3);
        assert_eq!(window.first(), NaiveDate::from_ymd_opt(2026, 9, 30));
    }

    #[test]
    fn test_from_dates_sorts_and_dedups() {
        let window = DateWindow::from_dates(vec![d(3), d(1), d(3), d(2)]);
        assert_eq!(window.dates(), &[d(1), d(2), d(3)]);
    }

    #[test]
    fn test_effective_window() {
        let window = DateWindow::ending_on(d(14), 14);
        assert_eq!(window.effective(Some(d(12))).dates(), &[d(12), d(13), d(14)]);
        assert!(window.effective(Some(d(20))).is_empty());
        assert_eq!(window.effective(None), window);
    }

    #[test]
    fn test_index_groups_by_date_and_goal() {
        let at = Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap();
        let mut a = DailyLog::optimistic("g1", d(1), at);
        a.toggle_habit("h1", at);
        let b = DailyLog::optimistic("g2", d(1), at);
        let logs = vec![a, b];

        let all = LogIndex::new(&logs);
        assert_eq!(all.on(d(1)).len(), 2);
        assert!(all.on(d(2)).is_empty());
        assert!(all.is_completed(d(1), "h1"));

        let only_g2 = LogIndex::for_goal(&logs, "g2");
        assert_eq!(only_g2.len(), 1);
        assert!(!only_g2.is_completed(d(1), "h1"));
    }
}
