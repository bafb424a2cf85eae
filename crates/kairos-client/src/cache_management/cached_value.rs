use crate::models::{
    AiConfig, AiModel, CoachingSession, DailyLog, Goal, GoalTemplate, Habit, SelectedModel, SystemSettings,
    SystemStats, Tracker, UserPage,
};

/// Last-known server value for one query key
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    ActiveGoal(Option<Goal>),
    Goal(Goal),
    Habits(Vec<Habit>),
    Trackers(Vec<Tracker>),
    DailyLogs(Vec<DailyLog>),
    Coaching(Option<CoachingSession>),
    GoalTemplates(Vec<GoalTemplate>),
    Models(Vec<AiModel>),
    SelectedModel(SelectedModel),
    AiConfig(AiConfig),
    AdminSettings(SystemSettings),
    AdminStats(SystemStats),
    AdminUsers(UserPage),
}

/// Payload types that can live in the query cache.
pub trait QueryData: Clone + Send + Sync + 'static {
    fn into_cached(self) -> CachedValue;
    fn from_cached(value: &CachedValue) -> Option<Self>;
}

macro_rules! query_data {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl QueryData for $ty {
                fn into_cached(self) -> CachedValue {
                    CachedValue::$variant(self)
                }

                fn from_cached(value: &CachedValue) -> Option<Self> {
                    match value {
                        CachedValue::$variant(inner) => Some(inner.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

query_data! {
    Option<Goal> => ActiveGoal,
    Goal => Goal,
    Vec<Habit> => Habits,
    Vec<Tracker> => Trackers,
    Vec<DailyLog> => DailyLogs,
    Option<CoachingSession> => Coaching,
    Vec<GoalTemplate> => GoalTemplates,
    Vec<AiModel> => Models,
    SelectedModel => SelectedModel,
    AiConfig => AiConfig,
    SystemSettings => AdminSettings,
    SystemStats => AdminStats,
    UserPage => AdminUsers,
}
