//! Writes for views, with their cache effects
//!
//! A write either puts the server-confirmed value straight into its key or
//! invalidates the keys whose server value it may have changed.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::cache_management::{QueryKey, QueryKind};
use crate::error::{ClientError, Result};
use crate::models::{
    merge_log, merge_tracker_entries, AiConfigTest, AiConfigUpdate, AiTestResult, CoachingSession, DailyLog,
    Goal, GoalCreate, GoalUpdate, Habit, HabitUpdate, SystemSettings, Tracker, TrackerUpdate,
    UpdateSettingsRequest, DEFAULT_TRIGGER,
};
use crate::optimistic::{SendChatMessage, ToggleHabit};
use crate::shared_state::KairosState;

impl KairosState {
    pub async fn toggle_habit(&self, goal_id: &str, habit_id: &str) -> Result<DailyLog> {
        self.toggle_habit_on(self.today(), goal_id, habit_id).await
    }

    /// Optimistically flip a habit for `date`, then reconcile with the server's log.
    pub async fn toggle_habit_on(&self, date: NaiveDate, goal_id: &str, habit_id: &str) -> Result<DailyLog> {
        self.counters.inc_writes();
        let key = QueryKey::daily(date);
        let was_cached = self.cache.contains(&key);

        let update = ToggleHabit::new(date, goal_id, habit_id);
        let result = self
            .mutations
            .run(update, self.api.toggle_habit(date, goal_id, habit_id))
            .await;

        match &result {
            Ok(_) => {
                // Only this goal's log is known for a day that wasn't loaded yet.
                if !was_cached {
                    self.cache.invalidate(&key);
                }
                self.invalidate_progress(goal_id, date);
            }
            Err(_) => {
                self.counters.inc_failed_writes();
            }
        }
        result
    }

    pub async fn log_tracker(
        &self,
        goal_id: &str,
        tracker_id: &str,
        value: f64,
        notes: Option<&str>,
    ) -> Result<DailyLog> {
        self.log_tracker_on(self.today(), goal_id, tracker_id, value, notes).await
    }

    pub async fn log_tracker_on(
        &self,
        date: NaiveDate,
        goal_id: &str,
        tracker_id: &str,
        value: f64,
        notes: Option<&str>,
    ) -> Result<DailyLog> {
        if !value.is_finite() {
            return Err(ClientError::precondition(format!("tracker value {} is not a number", value)));
        }
        self.counters.inc_writes();
        let key = QueryKey::daily(date);
        self.cache.cancel(&key);

        let log = match self
            .api
            .log_tracker(date, goal_id, tracker_id, value, notes.unwrap_or(""))
            .await
        {
            Ok(log) => log,
            Err(e) => {
                self.counters.inc_failed_writes();
                return Err(e);
            }
        };

        // A pending toggle's response may predate this entry, so it is merged
        // in after the toggle settles and the day is left to refetch.
        let confirmed = log.clone();
        let day_key = key.clone();
        let deferred = self.mutations.defer_until_settled(&key, move |cache| {
            cache.update_existing(&day_key, |logs: Vec<DailyLog>| merge_tracker_entries(logs, &confirmed));
            cache.invalidate(&day_key);
        });
        if !deferred && !self.cache.update_existing(&key, |logs: Vec<DailyLog>| merge_log(logs, log.clone())) {
            debug!("No cached logs for {}; nothing to merge", date);
        }
        self.invalidate_progress(goal_id, date);
        Ok(log)
    }

    pub async fn start_coaching(&self, goal_id: &str, trigger: Option<&str>) -> Result<CoachingSession> {
        self.counters.inc_writes();
        let session = self
            .api
            .start_coaching(goal_id, trigger.unwrap_or(DEFAULT_TRIGGER))
            .await?;
        self.cache.set(QueryKey::coaching(goal_id), Some(session.clone()));
        info!("Coaching session {} started for goal {}", session.id, goal_id);
        Ok(session)
    }

    /// Optimistically append the message; the reply arrives with the server's session.
    pub async fn send_message(&self, goal_id: &str, session_id: &str, content: &str) -> Result<CoachingSession> {
        self.counters.inc_writes();
        let update = SendChatMessage::new(goal_id, session_id, content);
        let result = self
            .mutations
            .run(update, self.api.send_message(session_id, content))
            .await;
        if result.is_err() {
            self.counters.inc_failed_writes();
        }
        result
    }

    /// Whether the coach still owes a reply on the goal's session.
    pub fn is_coach_typing(&self, goal_id: &str) -> bool {
        self.mutations.is_pending(&QueryKey::coaching(goal_id))
    }

    /// Accepting can add, swap or remove habits and trackers.
    pub async fn accept_change(&self, goal_id: &str, session_id: &str, index: usize) -> Result<CoachingSession> {
        self.counters.inc_writes();
        let session = self.api.accept_change(session_id, index).await?;
        self.cache.set(QueryKey::coaching(goal_id), Some(session.clone()));

        self.cache.invalidate(&QueryKey::ActiveGoal);
        self.cache.invalidate_matching(|key| {
            matches!(key.kind(), QueryKind::Goal | QueryKind::Habits | QueryKind::Trackers)
                && key.goal_id() == Some(goal_id)
        });
        Ok(session)
    }

    pub async fn reject_change(&self, goal_id: &str, session_id: &str, index: usize) -> Result<CoachingSession> {
        self.counters.inc_writes();
        let session = self.api.reject_change(session_id, index).await?;
        self.cache.set(QueryKey::coaching(goal_id), Some(session.clone()));
        Ok(session)
    }

    pub async fn resolve_session(&self, goal_id: &str, session_id: &str) -> Result<CoachingSession> {
        self.counters.inc_writes();
        let session = self.api.resolve_session(session_id).await?;
        self.cache.set(QueryKey::coaching(goal_id), Some(session.clone()));
        info!("Coaching session {} resolved", session.id);
        Ok(session)
    }

    pub async fn create_goal(&self, data: &GoalCreate) -> Result<Goal> {
        self.counters.inc_writes();
        let goal = self.api.create_goal(data).await?;
        self.cache.set(QueryKey::goal(&goal.id), goal.clone());
        self.cache.invalidate(&QueryKey::ActiveGoal);
        Ok(goal)
    }

    pub async fn update_goal(&self, goal_id: &str, data: &GoalUpdate) -> Result<Goal> {
        self.counters.inc_writes();
        let goal = self.api.update_goal(goal_id, data).await?;
        self.cache.set(QueryKey::goal(goal_id), goal.clone());
        self.cache.invalidate(&QueryKey::ActiveGoal);
        Ok(goal)
    }

    pub async fn delete_goal(&self, goal_id: &str) -> Result<()> {
        self.counters.inc_writes();
        self.api.delete_goal(goal_id).await?;
        let removed = self.cache.remove_matching(|key| key.goal_id() == Some(goal_id));
        self.cache.invalidate(&QueryKey::ActiveGoal);
        debug!("Goal {} deleted; dropped {} cached keys", goal_id, removed);
        Ok(())
    }

    pub async fn update_habit(&self, habit_id: &str, data: &HabitUpdate) -> Result<Habit> {
        self.counters.inc_writes();
        let habit = self.api.update_habit(habit_id, data).await?;
        self.invalidate_goal_lists(QueryKind::Habits, &habit.goal_id);
        Ok(habit)
    }

    pub async fn update_tracker(&self, tracker_id: &str, data: &TrackerUpdate) -> Result<Tracker> {
        self.counters.inc_writes();
        let tracker = self.api.update_tracker(tracker_id, data).await?;
        self.invalidate_goal_lists(QueryKind::Trackers, &tracker.goal_id);
        Ok(tracker)
    }

    pub async fn select_model(&self, model_id: &str) -> Result<()> {
        self.counters.inc_writes();
        self.api.select_model(model_id).await?;
        self.cache.invalidate(&QueryKey::SelectedModel);
        Ok(())
    }

    pub async fn update_ai_config(&self, data: &AiConfigUpdate) -> Result<()> {
        self.counters.inc_writes();
        self.api.update_ai_config(data).await?;
        self.cache.invalidate(&QueryKey::AiConfig);
        Ok(())
    }

    pub async fn delete_ai_config(&self) -> Result<()> {
        self.counters.inc_writes();
        self.api.delete_ai_config().await?;
        self.cache.invalidate(&QueryKey::AiConfig);
        Ok(())
    }

    /// Check credentials against the provider; nothing is stored.
    pub async fn test_ai_config(&self, data: &AiConfigTest) -> Result<AiTestResult> {
        self.api.test_ai_config(data).await
    }

    pub async fn update_admin_settings(&self, data: &UpdateSettingsRequest) -> Result<SystemSettings> {
        self.counters.inc_writes();
        let settings = self.api.update_admin_settings(data).await?;
        self.cache.set(QueryKey::AdminSettings, settings.clone());
        Ok(settings)
    }

    fn invalidate_progress(&self, goal_id: &str, date: NaiveDate) {
        self.cache.invalidate_matching(|key| {
            matches!(key, QueryKey::ProgressLogs { goal_id: g, .. } if g == goal_id) && key.covers(date)
        });
    }

    fn invalidate_goal_lists(&self, kind: QueryKind, goal_id: &str) {
        self.cache
            .invalidate_matching(|key| key.kind() == kind && key.goal_id() == Some(goal_id));
    }
}
