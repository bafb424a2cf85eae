use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregation::window::{DateWindow, LogIndex};
use crate::models::{Direction, Tracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
        }
    }

    /// Whether this movement is good news for a tracker with `direction`.
    pub fn is_improvement(&self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (Trend::Up, Direction::HigherIsBetter) | (Trend::Down, Direction::LowerIsBetter)
        )
    }
}

/// Logged values in window order. Days without an entry are skipped.
pub fn values_in_window(window: &DateWindow, index: &LogIndex<'_>, tracker_id: &str) -> Vec<(NaiveDate, f64)> {
    window
        .dates()
        .iter()
        .filter_map(|date| index.value(*date, tracker_id).map(|value| (*date, value)))
        .collect()
}

/// First present value against the last one.
pub fn trend(values: &[f64]) -> Trend {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) if values.len() >= 2 => {
            if last > first {
                Trend::Up
            } else if last < first {
                Trend::Down
            } else {
                Trend::Stable
            }
        }
        _ => Trend::Stable,
    }
}

pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerStats {
    pub tracker_id: String,
    pub latest: Option<f64>,
    pub average: f64,
    pub trend: Trend,
    pub data_points: usize,
    /// Percent of the way from the window's first value to the target, 0..=100
    pub progress: Option<f64>,
    pub improving: bool,
}

pub fn tracker_stats(tracker: &Tracker, window: &DateWindow, index: &LogIndex<'_>) -> TrackerStats {
    let values: Vec<f64> = values_in_window(window, index, &tracker.id)
        .into_iter()
        .map(|(_, value)| value)
        .collect();
    let trend = trend(&values);

    TrackerStats {
        tracker_id: tracker.id.clone(),
        latest: values.last().copied(),
        average: average(&values),
        trend,
        data_points: values.len(),
        progress: progress_toward(tracker, &values),
        improving: trend.is_improvement(tracker.direction),
    }
}

fn progress_toward(tracker: &Tracker, values: &[f64]) -> Option<f64> {
    let target = tracker.target_value.filter(|t| t.is_finite())?;
    let (first, latest) = (*values.first()?, *values.last()?);

    let reached = match tracker.direction {
        Direction::HigherIsBetter => latest >= target,
        Direction::LowerIsBetter => latest <= target,
    };
    if reached {
        return Some(100.0);
    }
    let span = target - first;
    if span == 0.0 {
        return Some(0.0);
    }
    Some(((latest - first) / span * 100.0).clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyLog, TrackerEntry};
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
    }

    fn tracker(direction: &str, target: Option<f64>) -> Tracker {
        serde_json::from_value(serde_json::json!({
            "id": "t1", "goal_id": "g1", "name": "Weight", "unit": "kg",
            "direction": direction, "target_value": target
        }))
        .unwrap()
    }

    fn entry_on(date: NaiveDate, value: f64) -> DailyLog {
        let mut log = DailyLog::optimistic("g1", date, Utc::now());
        log.tracker_entries.push(TrackerEntry {
            tracker_id: "t1".into(),
            value,
            logged_at: None,
            notes: String::new(),
        });
        log
    }

    #[test]
    fn test_sparse_window_down_trend_and_average() {
        let window = DateWindow::ending_on(today(), 14);
        let logs = vec![entry_on(window.first().unwrap(), 80.0), entry_on(today(), 75.0)];
        let stats = tracker_stats(&tracker("decrease", Some(70.0)), &window, &LogIndex::new(&logs));

        assert_eq!(stats.trend, Trend::Down);
        assert_eq!(stats.average, 77.5);
        assert_eq!(stats.data_points, 2);
        assert_eq!(stats.latest, Some(75.0));
        assert_eq!(stats.progress, Some(50.0));
        assert!(stats.improving);
    }

    #[test]
    fn test_no_values_degrades_to_defaults() {
        let stats = tracker_stats(
            &tracker("increase", Some(10.0)),
            &DateWindow::ending_on(today(), 14),
            &LogIndex::default(),
        );
        assert_eq!(stats.trend, Trend::Stable);
        assert_eq!(stats.average, 0.0);
        assert!(stats.latest.is_none());
        assert!(stats.progress.is_none());
        assert!(!stats.improving);
    }

    #[test]
    fn test_non_finite_values_are_absent() {
        let window = DateWindow::ending_on(today(), 3);
        let logs = vec![
            entry_on(today() - Duration::days(2), 5.0),
            entry_on(today() - Duration::days(1), f64::NAN),
            entry_on(today(), 7.0),
        ];
        let values = values_in_window(&window, &LogIndex::new(&logs), "t1");
        assert_eq!(values.len(), 2);
        assert_eq!(values[1], (today(), 7.0));
    }

    #[test]
    fn test_progress_respects_direction() {
        let window = DateWindow::ending_on(today(), 2);
        let logs = vec![entry_on(today() - Duration::days(1), 10.0), entry_on(today(), 14.0)];
        let index = LogIndex::new(&logs);

        let up = tracker_stats(&tracker("increase", Some(20.0)), &window, &index);
        assert_eq!(up.progress, Some(40.0));
        assert!(up.improving);

        let wrong_way = tracker_stats(&tracker("decrease", Some(5.0)), &window, &index);
        assert_eq!(wrong_way.progress, Some(0.0));
        assert!(!wrong_way.improving);
    }

    proptest! {
        #[test]
        fn prop_fewer_than_two_values_is_stable(value in proptest::option::of(-1.0e9f64..1.0e9)) {
            let values: Vec<f64> = value.into_iter().collect();
            prop_assert_eq!(trend(&values), Trend::Stable);
        }

        #[test]
        fn prop_average_within_bounds(values in proptest::collection::vec(-1.0e6f64..1.0e6, 1..40)) {
            let avg = average(&values);
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(avg >= min - 1e-6 && avg <= max + 1e-6);
        }
    }
}
