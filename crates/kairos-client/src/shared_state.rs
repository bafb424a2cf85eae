//! Process-wide client state
//!
//! One `KairosState` is created at startup and handed to whatever renders
//! views. It owns the API client, the query cache and the mutation
//! controller; logging out resets it in place.

use chrono::{Local, NaiveDate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::aggregation::DateWindow;
use crate::api::ApiClient;
use crate::cache_management::{create_default_query_cache, QueryCache};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::models::User;
use crate::optimistic::MutationController;

/// Atomic counters for client activity
#[derive(Debug, Default)]
pub struct AtomicCounters {
    pub total_reads: AtomicUsize,
    pub total_writes: AtomicUsize,
    pub failed_writes: AtomicUsize,
    pub logins: AtomicUsize,
}

impl AtomicCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_reads(&self) -> usize {
        self.total_reads.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn inc_writes(&self) -> usize {
        self.total_writes.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn inc_failed_writes(&self) -> usize {
        self.failed_writes.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn inc_logins(&self) -> usize {
        self.logins.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Core client state container
pub struct KairosState {
    /// Configuration (read-only after initialization)
    pub config: Arc<ClientConfig>,

    pub api: Arc<ApiClient>,

    /// Last-known server values
    pub cache: Arc<QueryCache>,

    pub mutations: MutationController,

    pub counters: Arc<AtomicCounters>,
}

impl KairosState {
    pub fn new(config: ClientConfig) -> Result<Self> {
        info!("Initializing client state for {}", config.api_url);

        let api = Arc::new(ApiClient::new(&config)?);
        let cache = Arc::new(create_default_query_cache(&config));
        let mutations = MutationController::new(cache.clone());

        Ok(Self {
            config: Arc::new(config),
            api,
            cache,
            mutations,
            counters: Arc::new(AtomicCounters::new()),
        })
    }

    pub async fn login_with_google(&self, credential: &str) -> Result<User> {
        let login = self.api.login_with_google(credential).await?;
        // Anything cached belonged to whoever was logged in before.
        self.cache.clear();
        self.counters.inc_logins();
        Ok(login.user)
    }

    /// Forget the credential and every cached value.
    pub fn logout(&self) {
        self.api.set_token(None);
        self.cache.clear();
        info!("Logged out; query cache cleared");
    }

    pub fn is_logged_in(&self) -> bool {
        self.api.has_token()
    }

    /// The user's calendar day.
    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    pub fn progress_window(&self, today: NaiveDate) -> DateWindow {
        DateWindow::ending_on(today, self.config.progress_days)
    }
}
