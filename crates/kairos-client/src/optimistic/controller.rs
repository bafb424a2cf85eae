// Kairos/crates/kairos-client/src/optimistic/controller.rs

use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache_management::{CachedValue, QueryCache, QueryData, QueryKey};
use crate::error::{ClientError, Result};

/// A cache edit applied before the server confirms it.
pub trait OptimisticUpdate: Send + Sync {
    type Data: QueryData;
    type Response: Clone + Send + Sync + 'static;

    /// The one key this update writes.
    fn key(&self) -> QueryKey;

    /// Local precondition. A failure here means nothing is written or sent.
    fn check(&self) -> Result<()> {
        Ok(())
    }

    /// Speculative value from the current one; `None` skips the write.
    fn speculate(&self, current: Option<Self::Data>) -> Option<Self::Data>;

    /// Authoritative value once the server has answered.
    fn reconcile(&self, current: Option<Self::Data>, response: &Self::Response) -> Self::Data;

    fn label(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// One invocation of an optimistic update.
pub struct Mutation<U: OptimisticUpdate> {
    update: U,
    state: MutationState,
    id: Option<u64>,
}

impl<U: OptimisticUpdate> Mutation<U> {
    pub fn new(update: U) -> Self {
        Self {
            update,
            state: MutationState::Idle,
            id: None,
        }
    }

    pub fn update(&self) -> &U {
        &self.update
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.state, MutationState::Succeeded | MutationState::Failed)
    }
}

struct PendingSlot {
    id: u64,
    /// Value to fall back to if this mutation fails
    snapshot: Option<CachedValue>,
}

type FollowUp = Box<dyn FnOnce(&QueryCache) + Send + Sync>;

#[derive(Default)]
struct KeyLedger {
    /// Pending mutations in issue order
    slots: Vec<PendingSlot>,
    last_reconciled: u64,
    /// Cache edits held back until the last slot settles
    follow_ups: Vec<FollowUp>,
}

/// Drives optimistic mutations against the shared query cache.
///
/// Mutations on one key chain: each snapshots whatever the cache holds when
/// it begins, including earlier mutations' speculative values. Settlement
/// is resolved against the key's ledger so that out-of-order responses
/// never leave an older state behind:
///
/// * the newest pending mutation reconciles into the cache on success and
///   restores its snapshot on failure;
/// * a superseded mutation leaves the cache alone. Its confirmed value (or,
///   on failure, its own snapshot) becomes the base the next mutation falls
///   back to;
/// * a response older than one already reconciled is ignored.
///
/// A `run` that is dropped before its request finishes settles as failed.
pub struct MutationController {
    cache: Arc<QueryCache>,
    ledgers: DashMap<QueryKey, KeyLedger>,
    next_id: AtomicU64,
}

impl MutationController {
    pub fn new(cache: Arc<QueryCache>) -> Self {
        Self {
            cache,
            ledgers: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn is_pending(&self, key: &QueryKey) -> bool {
        self.pending_count(key) > 0
    }

    pub fn pending_count(&self, key: &QueryKey) -> usize {
        self.ledgers.get(key).map(|ledger| ledger.slots.len()).unwrap_or(0)
    }

    /// Queue `follow_up` until every mutation pending on `key` has settled.
    ///
    /// Returns false, dropping `follow_up` unrun, when nothing is pending.
    pub fn defer_until_settled<F>(&self, key: &QueryKey, follow_up: F) -> bool
    where
        F: FnOnce(&QueryCache) + Send + Sync + 'static,
    {
        match self.ledgers.get_mut(key) {
            Some(mut ledger) if !ledger.slots.is_empty() => {
                ledger.follow_ups.push(Box::new(follow_up));
                debug!("Deferred cache edit on {} behind {} pending", key, ledger.slots.len());
                true
            }
            _ => false,
        }
    }

    /// Idle -> Pending: cancel in-flight reads, snapshot, write the speculative value.
    pub fn begin<U: OptimisticUpdate>(&self, mutation: &mut Mutation<U>) -> Result<()> {
        if mutation.state != MutationState::Idle {
            return Err(ClientError::precondition(format!(
                "{} already started ({:?})",
                mutation.update.label(),
                mutation.state
            )));
        }
        if let Err(e) = mutation.update.check() {
            mutation.state = MutationState::Failed;
            return Err(e);
        }

        let key = mutation.update.key();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;

        // Held until the slot is pushed so a concurrent begin on the same key
        // snapshots after this speculative write, never before it.
        let mut ledger = self.ledgers.entry(key.clone()).or_default();

        self.cache.cancel(&key);
        let snapshot = self.cache.get(&key);
        let current = snapshot.as_ref().and_then(U::Data::from_cached);
        if let Some(speculative) = mutation.update.speculate(current) {
            self.cache.set(key.clone(), speculative);
        }
        self.cache.pin(&key);
        ledger.slots.push(PendingSlot { id, snapshot });

        debug!(
            "{} #{} pending on {} ({} in flight)",
            mutation.update.label(),
            id,
            key,
            ledger.slots.len()
        );

        mutation.state = MutationState::Pending;
        mutation.id = Some(id);
        Ok(())
    }

    /// Pending -> Succeeded | Failed. The outcome is handed back unchanged.
    pub fn settle<U: OptimisticUpdate>(
        &self,
        mutation: &mut Mutation<U>,
        outcome: Result<U::Response>,
    ) -> Result<U::Response> {
        let id = match (mutation.state, mutation.id) {
            (MutationState::Pending, Some(id)) => id,
            (state, _) => {
                return Err(ClientError::precondition(format!(
                    "{} is not pending ({:?})",
                    mutation.update.label(),
                    state
                )))
            }
        };
        let key = mutation.update.key();
        let label = mutation.update.label();

        {
            let mut ledger = match self.ledgers.get_mut(&key) {
                Some(ledger) => ledger,
                None => {
                    return Err(ClientError::precondition(format!("{} #{} has no ledger", label, id)));
                }
            };
            let position = match ledger.slots.iter().position(|slot| slot.id == id) {
                Some(position) => position,
                None => {
                    return Err(ClientError::precondition(format!("{} #{} is not in flight", label, id)));
                }
            };
            let slot = ledger.slots.remove(position);
            let newest = position == ledger.slots.len();

            if id < ledger.last_reconciled {
                debug!("{} #{} settled after a newer response on {}; ignored", label, id, key);
            } else {
                match &outcome {
                    Ok(response) if newest => {
                        let current = self.cache.get_data::<U::Data>(&key);
                        self.cache.set(key.clone(), mutation.update.reconcile(current, response));
                        ledger.last_reconciled = id;
                        debug!("{} #{} reconciled {}", label, id, key);
                    }
                    Ok(response) => {
                        let next = &mut ledger.slots[position];
                        let base = next.snapshot.as_ref().and_then(U::Data::from_cached);
                        next.snapshot = Some(mutation.update.reconcile(base, response).into_cached());
                        ledger.last_reconciled = id;
                        debug!("{} #{} confirmed under a newer pending write on {}", label, id, key);
                    }
                    Err(e) if newest => {
                        self.cache.restore(&key, slot.snapshot);
                        warn!("{} #{} failed, rolled back {}: {}", label, id, key, e);
                    }
                    Err(e) => {
                        ledger.slots[position].snapshot = slot.snapshot;
                        self.cache.invalidate(&key);
                        warn!("{} #{} failed under a newer pending write on {}: {}", label, id, key, e);
                    }
                }
            }
            self.cache.unpin(&key);

            if ledger.slots.is_empty() {
                for follow_up in std::mem::take(&mut ledger.follow_ups) {
                    follow_up(self.cache.as_ref());
                }
            }
        }
        self.ledgers.remove_if(&key, |_, ledger| ledger.slots.is_empty());

        mutation.state = if outcome.is_ok() {
            MutationState::Succeeded
        } else {
            MutationState::Failed
        };
        outcome
    }

    /// Begin, await `request`, settle.
    pub async fn run<U, F>(&self, update: U, request: F) -> Result<U::Response>
    where
        U: OptimisticUpdate,
        F: Future<Output = Result<U::Response>>,
    {
        let mut guard = SettleOnDrop {
            controller: self,
            mutation: Mutation::new(update),
        };
        self.begin(&mut guard.mutation)?;
        let outcome = request.await;
        self.settle(&mut guard.mutation, outcome)
    }
}

/// Settles a still-pending mutation as failed when its `run` is dropped.
struct SettleOnDrop<'a, U: OptimisticUpdate> {
    controller: &'a MutationController,
    mutation: Mutation<U>,
}

impl<U: OptimisticUpdate> Drop for SettleOnDrop<'_, U> {
    fn drop(&mut self) {
        if self.mutation.state != MutationState::Pending {
            return;
        }
        let key = self.mutation.update.key();
        let label = self.mutation.update.label();
        warn!("{} on {} dropped before the server answered", label, key);

        let cancelled = Err(ClientError::Cancelled(label.to_string()));
        let _ = self.controller.settle(&mut self.mutation, cancelled);
        // The request may still have reached the server.
        self.controller.cache.invalidate(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_management::QueryCacheConfig;
    use crate::models::{ChatMessage, ChatRole, CoachingSession, DailyLog, HabitCompletion};
    use crate::optimistic::{SendChatMessage, ToggleHabit};
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 9, minute, 0).unwrap()
    }

    fn server_log(id: &str, completions: &[(&str, bool)]) -> DailyLog {
        let mut log = DailyLog::optimistic("g1", today(), at(0));
        log.id = id.to_string();
        log.habit_completions = completions
            .iter()
            .map(|(habit_id, completed)| HabitCompletion {
                habit_id: habit_id.to_string(),
                completed: *completed,
                completed_at: None,
                notes: String::new(),
            })
            .collect();
        log
    }

    fn toggle(habit_id: &str) -> ToggleHabit {
        ToggleHabit::new(today(), "g1", habit_id).at(at(1))
    }

    fn setup() -> (Arc<QueryCache>, MutationController) {
        let cache = Arc::new(QueryCache::new(QueryCacheConfig::default()));
        let controller = MutationController::new(cache.clone());
        (cache, controller)
    }

    fn cached_completed(cache: &QueryCache, habit_id: &str) -> Option<bool> {
        cache
            .get_data::<Vec<DailyLog>>(&QueryKey::daily(today()))
            .and_then(|logs| logs.into_iter().find(|l| l.goal_id == "g1"))
            .map(|log| log.is_completed(habit_id))
    }

    #[test]
    fn test_rollback_restores_completed_after_server_error() {
        let (cache, controller) = setup();
        cache.set(QueryKey::daily(today()), vec![server_log("l1", &[("h1", true)])]);

        let mut mutation = Mutation::new(toggle("h1"));
        controller.begin(&mut mutation).unwrap();
        assert_eq!(cached_completed(&cache, "h1"), Some(false));
        assert!(controller.is_pending(&QueryKey::daily(today())));

        let result = controller.settle(
            &mut mutation,
            Err(ClientError::Server { status: 500, detail: Some("boom".into()) }),
        );
        assert_eq!(result.unwrap_err().status(), Some(500));
        assert_eq!(cached_completed(&cache, "h1"), Some(true));
        assert_eq!(mutation.state(), MutationState::Failed);
        assert!(!controller.is_pending(&QueryKey::daily(today())));
    }

    #[test]
    fn test_rollback_of_uncached_key_removes_it() {
        let (cache, controller) = setup();
        let mut mutation = Mutation::new(toggle("h1"));
        controller.begin(&mut mutation).unwrap();
        assert_eq!(cached_completed(&cache, "h1"), Some(true));

        let _ = controller.settle(&mut mutation, Err(ClientError::Server { status: 502, detail: None }));
        assert!(cache.get(&QueryKey::daily(today())).is_none());
    }

    #[test]
    fn test_double_toggle_ends_in_server_state() {
        let (cache, controller) = setup();
        cache.set(QueryKey::daily(today()), vec![server_log("l1", &[])]);

        let mut first = Mutation::new(toggle("h1"));
        let mut second = Mutation::new(toggle("h1"));
        controller.begin(&mut first).unwrap();
        assert_eq!(cached_completed(&cache, "h1"), Some(true));
        controller.begin(&mut second).unwrap();
        assert_eq!(cached_completed(&cache, "h1"), Some(false));
        assert_eq!(controller.pending_count(&QueryKey::daily(today())), 2);

        controller.settle(&mut first, Ok(server_log("l1", &[("h1", true)]))).unwrap();
        assert_eq!(cached_completed(&cache, "h1"), Some(false));

        // The server's final answer wins even where it disagrees with the client's guess.
        controller.settle(&mut second, Ok(server_log("l1", &[("h1", true)]))).unwrap();
        assert_eq!(cached_completed(&cache, "h1"), Some(true));
        assert!(!controller.is_pending(&QueryKey::daily(today())));
    }

    #[test]
    fn test_out_of_order_success_keeps_newest_response() {
        let (cache, controller) = setup();
        cache.set(QueryKey::daily(today()), vec![server_log("l1", &[])]);

        let mut first = Mutation::new(toggle("h1"));
        let mut second = Mutation::new(toggle("h1"));
        controller.begin(&mut first).unwrap();
        controller.begin(&mut second).unwrap();

        controller.settle(&mut second, Ok(server_log("l1", &[("h1", false)]))).unwrap();
        controller.settle(&mut first, Ok(server_log("l1", &[("h1", true)]))).unwrap();

        assert_eq!(cached_completed(&cache, "h1"), Some(false));
        assert_eq!(first.state(), MutationState::Succeeded);
    }

    #[test]
    fn test_superseded_failure_hands_down_snapshot() {
        let (cache, controller) = setup();
        cache.set(QueryKey::daily(today()), vec![server_log("l1", &[("h1", false)])]);

        let mut first = Mutation::new(toggle("h1"));
        let mut second = Mutation::new(toggle("h2"));
        controller.begin(&mut first).unwrap();
        controller.begin(&mut second).unwrap();

        let _ = controller.settle(&mut first, Err(ClientError::Server { status: 500, detail: None }));
        assert!(!cache.is_fresh(&QueryKey::daily(today())));

        let _ = controller.settle(&mut second, Err(ClientError::Server { status: 500, detail: None }));
        assert_eq!(cached_completed(&cache, "h1"), Some(false));
        assert_eq!(cached_completed(&cache, "h2"), Some(false));
    }

    #[test]
    fn test_late_failure_after_newer_success_is_ignored() {
        let (cache, controller) = setup();
        cache.set(QueryKey::daily(today()), vec![server_log("l1", &[])]);

        let mut first = Mutation::new(toggle("h1"));
        let mut second = Mutation::new(toggle("h2"));
        controller.begin(&mut first).unwrap();
        controller.begin(&mut second).unwrap();

        controller.settle(&mut second, Ok(server_log("l1", &[("h2", true)]))).unwrap();
        let _ = controller.settle(&mut first, Err(ClientError::Server { status: 500, detail: None }));

        assert_eq!(cached_completed(&cache, "h2"), Some(true));
        assert_eq!(cached_completed(&cache, "h1"), Some(false));
    }

    #[test]
    fn test_precondition_failure_writes_nothing() {
        let (cache, controller) = setup();
        let mut mutation = Mutation::new(ToggleHabit::new(today(), "", "h1"));

        let err = controller.begin(&mut mutation).unwrap_err();
        assert!(matches!(err, ClientError::Precondition(_)));
        assert!(cache.get(&QueryKey::daily(today())).is_none());
        assert!(!controller.is_pending(&QueryKey::daily(today())));
        assert_eq!(mutation.state(), MutationState::Failed);
    }

    #[test]
    fn test_state_transitions_are_enforced() {
        let (_cache, controller) = setup();
        let mut mutation = Mutation::new(toggle("h1"));

        assert!(controller.settle(&mut mutation, Ok(server_log("l1", &[]))).is_err());
        controller.begin(&mut mutation).unwrap();
        assert!(controller.begin(&mut mutation).is_err());
        controller.settle(&mut mutation, Ok(server_log("l1", &[("h1", true)]))).unwrap();
        assert!(mutation.is_settled());
        assert!(controller.settle(&mut mutation, Ok(server_log("l1", &[]))).is_err());
    }

    #[test]
    fn test_pending_key_ignores_fetch_commits() {
        let (cache, controller) = setup();
        let ticket = cache.begin_fetch(&QueryKey::daily(today()));
        let mut mutation = Mutation::new(toggle("h1"));
        controller.begin(&mut mutation).unwrap();

        assert!(!cache.commit_fetch(&ticket, vec![server_log("l1", &[])]));
        let late = cache.begin_fetch(&QueryKey::daily(today()));
        assert!(!cache.commit_fetch(&late, vec![server_log("l1", &[])]));
        assert_eq!(cached_completed(&cache, "h1"), Some(true));
    }

    fn session(messages: Vec<ChatMessage>) -> CoachingSession {
        let mut session: CoachingSession =
            serde_json::from_value(serde_json::json!({"id": "s1", "goal_id": "g1"})).unwrap();
        session.messages = messages;
        session
    }

    #[test]
    fn test_two_pending_messages_show_in_send_order() {
        let (cache, controller) = setup();
        let key = QueryKey::coaching("g1");
        cache.set(key.clone(), Some(session(vec![])));

        let mut first = Mutation::new(SendChatMessage::new("g1", "s1", "How am I doing?").at(at(1)));
        let mut second = Mutation::new(SendChatMessage::new("g1", "s1", "Also, sleep?").at(at(2)));
        controller.begin(&mut first).unwrap();
        controller.begin(&mut second).unwrap();

        let shown = cache.get_data::<Option<CoachingSession>>(&key).flatten().unwrap();
        let contents: Vec<&str> = shown.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["How am I doing?", "Also, sleep?"]);
        assert!(shown.messages.iter().all(|m| m.role == ChatRole::User));
        assert!(shown.awaiting_reply());
        assert!(controller.is_pending(&key));
    }

    #[tokio::test]
    async fn test_run_reconciles_with_server_session() {
        let (cache, controller) = setup();
        let key = QueryKey::coaching("g1");
        cache.set(key.clone(), Some(session(vec![])));

        let reply = session(vec![
            ChatMessage::user("Hi coach", at(1)),
            ChatMessage {
                role: ChatRole::Assistant,
                content: "Hi! Let's review.".into(),
                timestamp: at(2),
                tool_calls: Vec::new(),
            },
        ]);
        let update = SendChatMessage::new("g1", "s1", "Hi coach").at(at(1));
        let confirmed = controller.run(update, async { Ok(reply.clone()) }).await.unwrap();

        assert_eq!(confirmed, reply);
        assert_eq!(cache.get_data::<Option<CoachingSession>>(&key), Some(Some(reply)));
        assert!(!controller.is_pending(&key));
    }

    #[tokio::test]
    async fn test_dropped_run_rolls_back_and_unpins() {
        let (cache, controller) = setup();
        let key = QueryKey::daily(today());
        cache.set(key.clone(), vec![server_log("l1", &[("h1", true)])]);

        let never = std::future::pending::<Result<DailyLog>>();
        let timed_out = tokio::time::timeout(Duration::from_millis(20), controller.run(toggle("h1"), never)).await;
        assert!(timed_out.is_err());

        assert!(!controller.is_pending(&key));
        assert!(!cache.is_pinned(&key));
        assert_eq!(cached_completed(&cache, "h1"), Some(true));
        assert!(!cache.is_fresh(&key));

        let ticket = cache.begin_fetch(&key);
        assert!(cache.commit_fetch(&ticket, vec![server_log("l1", &[("h1", false)])]));
        assert_eq!(cached_completed(&cache, "h1"), Some(false));
    }

    #[test]
    fn test_deferred_edit_runs_after_last_settle() {
        let (cache, controller) = setup();
        let key = QueryKey::daily(today());
        cache.set(key.clone(), vec![server_log("l1", &[])]);

        let counter = Arc::new(AtomicUsize::new(0));
        assert!(!controller.defer_until_settled(&key, |_| {}));

        let mut first = Mutation::new(toggle("h1"));
        let mut second = Mutation::new(toggle("h2"));
        controller.begin(&mut first).unwrap();
        controller.begin(&mut second).unwrap();

        let runs = counter.clone();
        let edit_key = key.clone();
        assert!(controller.defer_until_settled(&key, move |cache| {
            runs.fetch_add(1, Ordering::SeqCst);
            cache.invalidate(&edit_key);
        }));

        controller.settle(&mut first, Ok(server_log("l1", &[("h1", true)]))).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        controller.settle(&mut second, Ok(server_log("l1", &[("h1", true), ("h2", true)]))).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(cached_completed(&cache, "h2"), Some(true));
        assert!(!cache.is_fresh(&key));
    }

    #[test]
    fn test_deferred_edit_runs_after_rollback() {
        let (cache, controller) = setup();
        let key = QueryKey::daily(today());
        cache.set(key.clone(), vec![server_log("l1", &[])]);

        let mut mutation = Mutation::new(toggle("h1"));
        controller.begin(&mut mutation).unwrap();
        let edit_key = key.clone();
        controller.defer_until_settled(&key, move |cache| {
            cache.update_existing(&edit_key, |mut logs: Vec<DailyLog>| {
                logs[0].id = "l2".into();
                logs
            });
        });

        let _ = controller.settle(&mut mutation, Err(ClientError::Server { status: 500, detail: None }));
        let logs = cache.get_data::<Vec<DailyLog>>(&key).unwrap();
        assert_eq!(logs[0].id, "l2");
        assert!(!logs[0].is_completed("h1"));
    }
}
