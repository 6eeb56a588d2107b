// Copyright 2026 S4Core Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Axum HTTP server setup and routing.
//!
//! The IAM Query API is served at `/` (GET and POST) behind SigV4
//! authentication; `/metrics` is unauthenticated.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tgw_core::IdentityBackend;
use tgw_features::iam::{
    AccessKeyManager, AuthService, IamStorage, DEFAULT_MAX_ACCESS_KEYS_PER_USER,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::iam::handle_iam_request;
use crate::middleware::{iam_auth_middleware, metrics_middleware, MAX_IAM_BODY_SIZE};

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Identity Record Store.
    pub iam_storage: IamStorage,
    /// Access-key lifecycle manager.
    pub access_keys: AccessKeyManager,
    /// Access-key authentication.
    pub auth_service: AuthService,
    /// When set, requests skip SigV4 and act as this account. Development only.
    pub auth_bypass_account: Option<String>,
    /// Prometheus metrics handle for rendering `/metrics` endpoint.
    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Creates a new application state over an identity backend.
    pub fn new(backend: Arc<dyn IdentityBackend>) -> Self {
        Self::with_max_access_keys(backend, DEFAULT_MAX_ACCESS_KEYS_PER_USER)
    }

    /// Creates a new application state with a custom per-user key quota.
    pub fn with_max_access_keys(backend: Arc<dyn IdentityBackend>, max_keys: usize) -> Self {
        let iam_storage = IamStorage::new(backend);
        let access_keys =
            AccessKeyManager::new(iam_storage.clone()).with_max_keys_per_user(max_keys);
        let auth_service = AuthService::new(access_keys.clone());

        Self {
            iam_storage,
            access_keys,
            auth_service,
            auth_bypass_account: None,
            prometheus_handle: None,
        }
    }

    /// Sets the Prometheus handle for metrics rendering.
    pub fn with_prometheus_handle(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus_handle = Some(handle);
        self
    }

    /// Treats every IAM request as `account_id` without checking signatures.
    pub fn with_auth_bypass(mut self, account_id: impl Into<String>) -> Self {
        self.auth_bypass_account = Some(account_id.into());
        self
    }
}

/// Creates the axum router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    let iam_router = Router::new()
        .route("/", get(handle_iam_request).post(handle_iam_request))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            iam_auth_middleware,
        ));

    Router::new()
        .route("/metrics", get(handlers::prometheus_metrics))
        .merge(iam_router)
        // Add tracing layer for request logging
        .layer(TraceLayer::new_for_http())
        // Add metrics middleware to record request count and latency
        .layer(middleware::from_fn(metrics_middleware))
        .layer(DefaultBodyLimit::max(MAX_IAM_BODY_SIZE))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tgw_core::MemoryBackend;

    #[test]
    fn test_state_quota() {
        let state = AppState::with_max_access_keys(Arc::new(MemoryBackend::new()), 5);
        assert_eq!(state.access_keys.max_keys_per_user(), 5);
        assert!(state.auth_bypass_account.is_none());

        let state = AppState::new(Arc::new(MemoryBackend::new())).with_auth_bypass("123456789012");
        assert_eq!(state.auth_bypass_account.as_deref(), Some("123456789012"));
    }
}
