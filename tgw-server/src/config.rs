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

//! Configuration management for the TGW server.
//!
//! Every setting has a default and can be overridden through a `TGW_*`
//! environment variable.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Identity database location
    pub storage: StorageConfig,
    /// Bootstrap account and IAM policy settings
    pub account: AccountConfig,
    /// Filesystem gateway settings
    pub fs: FsConfig,
    /// Metrics and monitoring configuration
    pub metrics: MetricsConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:7005").
    /// Can be set via TGW_BIND environment variable.
    pub bind: String,
    /// Skip SigV4 and run every IAM request as the bootstrap account.
    /// Can be set via TGW_DISABLE_AUTH environment variable. Development only.
    pub disable_auth: bool,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory.
    /// Can be set via TGW_DATA_DIR environment variable.
    pub data_dir: PathBuf,
}

impl StorageConfig {
    /// Path of the identity database.
    pub fn identity_db_path(&self) -> PathBuf {
        self.data_dir.join("identity.redb")
    }
}

/// Bootstrap account configuration.
///
/// The account is provisioned at startup if it does not exist yet. Its root
/// key is the credential used to call the IAM API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Account name (TGW_ACCOUNT_NAME).
    pub name: String,
    /// Root access key id (TGW_ACCESS_KEY_ID). Generated when unset.
    pub access_key_id: Option<String>,
    /// Root secret access key (TGW_SECRET_ACCESS_KEY). Generated when unset.
    pub secret_access_key: Option<String>,
    /// Filesystem uid (TGW_ACCOUNT_UID).
    pub uid: u32,
    /// Filesystem gid (TGW_ACCOUNT_GID).
    pub gid: u32,
    /// Supplemental gids (TGW_ACCOUNT_SUPPLEMENTAL_GROUPS, comma-separated).
    pub supplemental_groups: Vec<u32>,
    /// Access keys per IAM user (TGW_MAX_ACCESS_KEYS).
    pub max_access_keys: usize,
}

impl AccountConfig {
    /// Root credentials supplied through configuration, if both parts are set.
    pub fn root_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

/// Filesystem gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsConfig {
    /// Slow-call warning threshold in milliseconds (TGW_FS_WARN_THRESHOLD_MS).
    pub warn_threshold_ms: u64,
}

impl FsConfig {
    /// Threshold as a [`Duration`].
    pub fn warn_threshold(&self) -> Duration {
        Duration::from_millis(self.warn_threshold_ms)
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics (TGW_METRICS_ENABLED).
    pub prometheus_enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            prometheus_enabled: env_flag("TGW_METRICS_ENABLED").unwrap_or(true),
        }
    }
}

impl Config {
    /// Loads configuration from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let config = Self::default();
        if config.account.name.is_empty() {
            anyhow::bail!("TGW_ACCOUNT_NAME must not be empty");
        }
        if config.account.access_key_id.is_some() != config.account.secret_access_key.is_some() {
            anyhow::bail!("TGW_ACCESS_KEY_ID and TGW_SECRET_ACCESS_KEY must be set together");
        }
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = std::env::var("TGW_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("tgw-data"));

        Self {
            server: ServerConfig {
                bind: std::env::var("TGW_BIND").unwrap_or_else(|_| "127.0.0.1:7005".to_string()),
                disable_auth: env_flag("TGW_DISABLE_AUTH").unwrap_or(false),
            },
            storage: StorageConfig { data_dir },
            account: AccountConfig {
                name: std::env::var("TGW_ACCOUNT_NAME").unwrap_or_else(|_| "admin".to_string()),
                access_key_id: std::env::var("TGW_ACCESS_KEY_ID").ok(),
                secret_access_key: std::env::var("TGW_SECRET_ACCESS_KEY").ok(),
                uid: env_parse("TGW_ACCOUNT_UID").unwrap_or(0),
                gid: env_parse("TGW_ACCOUNT_GID").unwrap_or(0),
                supplemental_groups: std::env::var("TGW_ACCOUNT_SUPPLEMENTAL_GROUPS")
                    .map(|s| parse_gid_list(&s))
                    .unwrap_or_default(),
                max_access_keys: env_parse("TGW_MAX_ACCESS_KEYS")
                    .unwrap_or(tgw_features::iam::DEFAULT_MAX_ACCESS_KEYS_PER_USER),
            },
            fs: FsConfig {
                warn_threshold_ms: env_parse("TGW_FS_WARN_THRESHOLD_MS").unwrap_or(100),
            },
            metrics: MetricsConfig::default(),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|s| s.to_lowercase() == "true" || s == "1")
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// Parses a comma-separated gid list, skipping entries that are not numbers.
pub fn parse_gid_list(s: &str) -> Vec<u32> {
    s.split(',').filter_map(|part| part.trim().parse().ok()).collect()
}
