//! Chirpy API - REST server
//!
//! Provides HTTP endpoints for user accounts, password login, access and
//! refresh tokens, chirps and the payment provider webhook.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use super::*;
    use axum::Router;
    use chirpy_core::{AppConfig, Store};
    use std::sync::Arc;

    pub const TEST_JWT_SECRET: &str = "test-signing-secret";
    pub const TEST_POLKA_KEY: &str = "f271c81ff7084ee5b99a5091b42d486e";

    /// Dev platform, fixed secrets and cheap password hashing
    pub fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.server.platform = "dev".to_string();
        config.auth.jwt_secret = TEST_JWT_SECRET.to_string();
        config.auth.polka_key = TEST_POLKA_KEY.to_string();
        config.auth.argon2_memory_kib = 1024;
        config.auth.argon2_iterations = 1;
        config.auth.argon2_parallelism = 1;
        config
    }

    /// State over a fresh in-memory store
    pub fn create_test_state(config: AppConfig) -> Arc<AppState> {
        Arc::new(AppState::new(config, Store::in_memory()))
    }

    pub fn create_router_with_config(config: AppConfig) -> Router {
        create_router(create_test_state(config))
    }
}

/// Router over in-memory storage, for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> axum::Router {
    test_utils::create_router_with_config(test_utils::test_config())
}
