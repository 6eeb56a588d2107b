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

//! Application initialization and runtime.
//!
//! This module handles:
//! - Identity database initialization
//! - Bootstrap account provisioning
//! - HTTP server setup and graceful shutdown

use crate::config::Config;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tgw_api::{create_router, AppState};
use tgw_core::RedbBackend;
use tgw_features::iam::{AccessKey, Account, FsIdentity};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Main application.
pub struct App {
    config: Config,
    state: AppState,
}

impl App {
    /// Creates a new application instance.
    ///
    /// Opens the identity database and provisions the bootstrap account.
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing TGW application...");

        tokio::fs::create_dir_all(&config.storage.data_dir)
            .await
            .with_context(|| format!("Failed to create {:?}", config.storage.data_dir))?;

        let db_path = config.storage.identity_db_path();
        let backend = RedbBackend::open(&db_path)
            .with_context(|| format!("Failed to open identity database {:?}", db_path))?;
        info!("Identity database: {:?}", db_path);

        let state =
            AppState::with_max_access_keys(Arc::new(backend), config.account.max_access_keys);

        Ok(Self { config, state })
    }

    /// Runs the HTTP server until a shutdown signal arrives.
    pub async fn run(self) -> Result<()> {
        let Self { config, mut state } = self;

        let Bootstrap {
            account,
            root_key,
            generated,
        } = bootstrap_account(&config, &state).await?;

        // Use chars() to safely handle multi-byte UTF-8 characters
        let key_preview: String = root_key.access_key_id.chars().take(8).collect();
        info!("Account '{}' ({}) root key: {}...", account.name, account.account_id, key_preview);
        if generated {
            warn!(
                "Generated root credentials, shown only once: access key {} secret {}",
                root_key.access_key_id, root_key.secret_access_key
            );
        }

        let root = state.auth_service.authenticate(&root_key.access_key_id).await?;
        let ctx = state
            .auth_service
            .resolve_identity(&root, "", config.fs.warn_threshold())
            .await?;
        info!(
            "Filesystem identity: uid={} gid={} groups={:?}",
            ctx.uid, ctx.gid, ctx.supplemental_groups
        );

        if config.metrics.prometheus_enabled {
            use metrics_exporter_prometheus::PrometheusBuilder;
            match PrometheusBuilder::new().install_recorder() {
                Ok(handle) => {
                    info!("Prometheus metrics enabled (available at /metrics)");
                    state = state.with_prometheus_handle(handle);
                }
                Err(e) => {
                    warn!("Failed to install Prometheus recorder: {}. Metrics disabled.", e);
                }
            }
        } else {
            info!("Prometheus metrics disabled");
        }

        if config.server.disable_auth {
            warn!("Authentication disabled: every IAM request acts as account '{}'", account.name);
            state = state.with_auth_bypass(account.account_id.clone());
        }

        let addr: SocketAddr = config
            .server
            .bind
            .parse()
            .with_context(|| format!("Invalid bind address {}", config.server.bind))?;

        let router = create_router(state);
        let listener = TcpListener::bind(addr).await?;
        info!("Listening on http://{}", addr);

        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

        info!("Server shutdown complete");
        Ok(())
    }
}

/// Outcome of [`bootstrap_account`].
struct Bootstrap {
    account: Account,
    root_key: AccessKey,
    /// The root key was generated by this call
    generated: bool,
}

/// Provisions the configured account and its root access key.
///
/// Both steps are idempotent, so restarting with the same configuration
/// leaves the identity database unchanged.
async fn bootstrap_account(config: &Config, state: &AppState) -> Result<Bootstrap> {
    let fs_identity = FsIdentity {
        uid: config.account.uid,
        gid: config.account.gid,
        supplemental_groups: config.account.supplemental_groups.clone(),
    };

    let account = state
        .iam_storage
        .provision_account(&config.account.name, fs_identity.clone())
        .await
        .context("Failed to provision bootstrap account")?;
    if account.fs_identity != fs_identity {
        warn!(
            "Account '{}' already exists with a different filesystem identity; keeping {:?}",
            account.name, account.fs_identity
        );
    }

    let supplied = config.account.root_credentials();
    let (root_key, generated) = match account.root_access_keys.first() {
        Some(existing) if supplied.is_none() => {
            let key = state
                .access_keys
                .lookup(existing)
                .await?
                .context("Bootstrap account root key is missing")?;
            (key, false)
        }
        _ => {
            let key = state
                .access_keys
                .create_root_access_key(&account.account_id, supplied)
                .await
                .context("Failed to create root access key")?;
            (key, supplied.is_none())
        }
    };

    Ok(Bootstrap {
        account,
        root_key,
        generated,
    })
}

/// Handles graceful shutdown signals.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown...");
        }
    }
}
