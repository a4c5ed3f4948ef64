//! Application state management

use crate::auth::{AuthService, AuthorizationGate};
use chirpy_core::{AppConfig, Store};
use std::sync::atomic::{AtomicU64, Ordering};

/// Application state shared across handlers
///
/// Secrets are read from configuration once, at construction, and never
/// change afterwards.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Datastore handles
    pub store: Store,
    /// Registration, login and token lifecycle
    pub auth: AuthService,
    /// Access token check for protected routes
    pub gate: AuthorizationGate,
    /// Hits on the static file server
    file_server_hits: AtomicU64,
}

impl AppState {
    /// Create new application state over a storage backend
    pub fn new(config: AppConfig, store: Store) -> Self {
        let auth = AuthService::new(&store, &config.auth);
        let gate = AuthorizationGate::new(auth.jwt_config().clone());

        Self {
            config,
            store,
            auth,
            gate,
            file_server_hits: AtomicU64::new(0),
        }
    }

    /// Key expected from the payment provider's webhook
    pub fn polka_key(&self) -> &str {
        &self.config.auth.polka_key
    }

    /// Count one static file request
    pub fn record_hit(&self) -> u64 {
        self.file_server_hits.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Total static file requests since start or last reset
    pub fn hits(&self) -> u64 {
        self.file_server_hits.load(Ordering::SeqCst)
    }

    pub fn reset_hits(&self) {
        self.file_server_hits.store(0, Ordering::SeqCst);
    }
}
