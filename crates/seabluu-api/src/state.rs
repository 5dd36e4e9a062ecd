//! Shared application state for all handlers.

use std::{path::PathBuf, sync::Arc, time::Duration};

use seabluu_bot::{Dispatcher, Notifier};
use seabluu_core::{BotStore, Clock, RealClock};

use crate::{cache::TtlCache, config::Config, handlers::admin::SearchResponse};

/// Web admin settings taken from [`Config`].
#[derive(Debug, Clone)]
pub struct AdminSettings {
    /// Secret for password hashes and session signatures.
    pub secret: String,
    /// Session lifetime in seconds.
    pub session_ttl_seconds: u64,
    /// Where uploaded avatars are stored.
    pub media_dir: PathBuf,
}

/// State cloned into every request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence.
    pub store: Arc<dyn BotStore>,
    /// Telegram update router.
    pub dispatcher: Arc<Dispatcher>,
    /// Time source for health checks, sessions and the cache.
    pub clock: Arc<dyn Clock>,
    /// Web admin settings.
    pub admin: Arc<AdminSettings>,
    /// Admin search results keyed by normalized query.
    pub search_cache: Arc<TtlCache<SearchResponse>>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl AppState {
    /// Builds the state from configuration with the system clock.
    pub fn new(store: Arc<dyn BotStore>, dispatcher: Arc<Dispatcher>, config: &Config) -> Self {
        Self::with_clock(store, dispatcher, config, Arc::new(RealClock::new()))
    }

    /// Builds the state with an explicit clock.
    pub fn with_clock(
        store: Arc<dyn BotStore>,
        dispatcher: Arc<Dispatcher>,
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let admin = AdminSettings {
            secret: config.admin_secret.clone(),
            session_ttl_seconds: config.admin_session_ttl_seconds,
            media_dir: config.admin_media_dir.clone(),
        };
        let search_cache =
            TtlCache::new(Duration::from_secs(config.search_cache_ttl_seconds), clock.clone());
        Self {
            store,
            dispatcher,
            clock,
            admin: Arc::new(admin),
            search_cache: Arc::new(search_cache),
            request_timeout: Duration::from_secs(config.request_timeout),
        }
    }

    /// Notifier for status updates triggered from the web admin.
    pub fn notifier(&self) -> &Notifier {
        self.dispatcher.notifier()
    }
}
