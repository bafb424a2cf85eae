//! Cached reads for views
//!
//! Each read goes through `QueryCache::fetch`: a fresh cached value is
//! returned without a request, anything else is fetched with the uniform
//! read retry and committed unless something newer landed meanwhile.

use chrono::NaiveDate;
use futures::future::try_join_all;

use crate::aggregation::{
    day_progress, habit_stats, tracker_stats, DayProgress, HabitStats, LogIndex, TrackerStats,
};
use crate::cache_management::QueryKey;
use crate::error::{ClientError, Result};
use crate::models::{
    AiConfig, AiModel, CoachingSession, DailyLog, Goal, GoalTemplate, Habit, HabitStatus, SelectedModel,
    SystemSettings, SystemStats, Tracker, UserPage,
};
use crate::shared_state::KairosState;

impl KairosState {
    pub async fn active_goal(&self) -> Result<Option<Goal>> {
        self.counters.inc_reads();
        let api = self.api.as_ref();
        self.cache.fetch(QueryKey::ActiveGoal, move || api.active_goal()).await
    }

    pub async fn goal(&self, goal_id: &str) -> Result<Goal> {
        self.counters.inc_reads();
        let api = self.api.as_ref();
        self.cache.fetch(QueryKey::goal(goal_id), move || api.goal(goal_id)).await
    }

    pub async fn habits(&self, goal_id: &str, status: Option<HabitStatus>) -> Result<Vec<Habit>> {
        self.counters.inc_reads();
        let api = self.api.as_ref();
        self.cache
            .fetch(QueryKey::habits(goal_id, status), move || api.list_habits(goal_id, status))
            .await
    }

    pub async fn trackers(&self, goal_id: &str) -> Result<Vec<Tracker>> {
        self.counters.inc_reads();
        let api = self.api.as_ref();
        self.cache.fetch(QueryKey::trackers(goal_id), move || api.list_trackers(goal_id)).await
    }

    pub async fn daily_logs(&self, date: NaiveDate) -> Result<Vec<DailyLog>> {
        self.counters.inc_reads();
        let api = self.api.as_ref();
        self.cache.fetch(QueryKey::daily(date), move || api.daily_logs(date)).await
    }

    pub async fn today_logs(&self) -> Result<Vec<DailyLog>> {
        self.daily_logs(self.today()).await
    }

    /// The goal's logs across the progress window ending `today`.
    pub async fn progress_logs(&self, goal_id: &str, today: NaiveDate) -> Result<Vec<DailyLog>> {
        self.counters.inc_reads();
        let window = self.progress_window(today);
        let key = QueryKey::ProgressLogs {
            goal_id: goal_id.to_string(),
            start: window.first().unwrap_or(today),
            days: window.len() as u32,
        };
        let api = self.api.as_ref();
        let dates = window.dates();

        self.cache
            .fetch(key, move || async move {
                let days = try_join_all(dates.iter().map(|date| api.daily_logs(*date))).await?;
                let logs: Vec<DailyLog> = days
                    .into_iter()
                    .flatten()
                    .filter(|log| log.goal_id == goal_id)
                    .collect();
                Ok::<_, ClientError>(logs)
            })
            .await
    }

    pub async fn coaching_session(&self, goal_id: &str) -> Result<Option<CoachingSession>> {
        self.counters.inc_reads();
        let api = self.api.as_ref();
        self.cache.fetch(QueryKey::coaching(goal_id), move || api.active_coaching(goal_id)).await
    }

    pub async fn goal_templates(&self) -> Result<Vec<GoalTemplate>> {
        self.counters.inc_reads();
        let api = self.api.as_ref();
        self.cache.fetch(QueryKey::GoalTemplates, move || api.goal_templates()).await
    }

    pub async fn models(&self, search: Option<&str>) -> Result<Vec<AiModel>> {
        self.counters.inc_reads();
        let api = self.api.as_ref();
        let key = QueryKey::Models { search: search.map(str::to_string) };
        self.cache.fetch(key, move || api.list_models(search)).await
    }

    pub async fn selected_model(&self) -> Result<SelectedModel> {
        self.counters.inc_reads();
        let api = self.api.as_ref();
        self.cache.fetch(QueryKey::SelectedModel, move || api.selected_model()).await
    }

    pub async fn ai_config(&self) -> Result<AiConfig> {
        self.counters.inc_reads();
        let api = self.api.as_ref();
        self.cache.fetch(QueryKey::AiConfig, move || api.ai_config()).await
    }

    pub async fn admin_settings(&self) -> Result<SystemSettings> {
        self.counters.inc_reads();
        let api = self.api.as_ref();
        self.cache.fetch(QueryKey::AdminSettings, move || api.admin_settings()).await
    }

    pub async fn admin_stats(&self) -> Result<SystemStats> {
        self.counters.inc_reads();
        let api = self.api.as_ref();
        self.cache.fetch(QueryKey::AdminStats, move || api.admin_stats()).await
    }

    pub async fn admin_users(&self, limit: u32, skip: u32) -> Result<UserPage> {
        self.counters.inc_reads();
        let api = self.api.as_ref();
        self.cache
            .fetch(QueryKey::AdminUsers { limit, skip }, move || api.admin_users(limit, skip))
            .await
    }

    /// Streak and completion rate for each active habit of the goal.
    pub async fn habit_overview(&self, goal_id: &str, today: NaiveDate) -> Result<Vec<HabitStats>> {
        let habits = self.habits(goal_id, None).await?;
        let logs = self.progress_logs(goal_id, today).await?;
        let index = LogIndex::for_goal(&logs, goal_id);
        let window = self.progress_window(today);

        Ok(habits
            .iter()
            .filter(|habit| habit.is_active())
            .map(|habit| habit_stats(habit, &window, &index, today))
            .collect())
    }

    pub async fn tracker_overview(&self, goal_id: &str, today: NaiveDate) -> Result<Vec<TrackerStats>> {
        let trackers = self.trackers(goal_id).await?;
        let logs = self.progress_logs(goal_id, today).await?;
        let index = LogIndex::for_goal(&logs, goal_id);
        let window = self.progress_window(today);

        Ok(trackers
            .iter()
            .map(|tracker| tracker_stats(tracker, &window, &index))
            .collect())
    }

    /// Today's checklist ring: completed vs. active habits.
    pub async fn today_progress(&self, goal_id: &str) -> Result<DayProgress> {
        let today = self.today();
        let habits: Vec<Habit> = self
            .habits(goal_id, None)
            .await?
            .into_iter()
            .filter(Habit::is_active)
            .collect();
        let logs = self.daily_logs(today).await?;
        Ok(day_progress(&habits, &LogIndex::for_goal(&logs, goal_id), today))
    }
}
