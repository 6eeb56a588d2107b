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


//! Access-key lifecycle management.
//!
//! Keys are stored under `access_key/{access_key_id}` and referenced from
//! their owner (the user's `access_keys` list, or the account's
//! `root_access_keys`). Both records are always written in one batch.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use tgw_core::storage::get_json;
use tgw_core::WriteBatch;

use super::error::IamError;
use super::locks::EntityLocks;
use super::models::{
    AccessKey, AccessKeyLastUsedInfo, AccessKeyMetadata, AccessKeyStatus, CreatedAccessKey,
    KeyOwner, LastUsed,
};
use super::secrets;
use super::storage::{access_key_key, account_key, user_key, IamStorage};

/// Maximum number of access keys an IAM user may hold (AWS default).
pub const DEFAULT_MAX_ACCESS_KEYS_PER_USER: usize = 2;

/// Creates, updates and deletes access keys bound to IAM users.
#[derive(Clone)]
pub struct AccessKeyManager {
    storage: IamStorage,
    max_keys_per_user: usize,
}

impl AccessKeyManager {
    /// Create a manager over the given identity store.
    pub fn new(storage: IamStorage) -> Self {
        Self {
            storage,
            max_keys_per_user: DEFAULT_MAX_ACCESS_KEYS_PER_USER,
        }
    }

    /// Override the per-user key quota.
    pub fn with_max_keys_per_user(mut self, max_keys_per_user: usize) -> Self {
        self.max_keys_per_user = max_keys_per_user;
        self
    }

    /// Per-user key quota in effect.
    pub fn max_keys_per_user(&self) -> usize {
        self.max_keys_per_user
    }

    /// Identity store backing this manager.
    pub fn storage(&self) -> &IamStorage {
        &self.storage
    }

    /// Load an access key record (secret included).
    pub async fn lookup(&self, access_key_id: &str) -> Result<Option<AccessKey>, IamError> {
        Ok(get_json(self.storage.backend(), &access_key_key(access_key_id)).await?)
    }

    /// Create a new access key for a user.
    ///
    /// The quota check and the write happen under the user's lock, so two
    /// concurrent calls cannot both pass the check.
    ///
    /// # Errors
    ///
    /// - `NoSuchEntity` if the user does not exist
    /// - `LimitExceeded` if the user already holds the maximum number of keys
    pub async fn create_access_key(
        &self,
        account_id: &str,
        username: &str,
    ) -> Result<CreatedAccessKey, IamError> {
        let locks = self.storage.locks();
        let _guard = locks.lock(&EntityLocks::user_key(account_id, username)).await;

        let mut user = self.storage.get_user(account_id, username).await?;
        if user.access_keys.len() >= self.max_keys_per_user {
            return Err(IamError::LimitExceeded(format!(
                "Cannot exceed quota for AccessKeysPerUser: {}",
                self.max_keys_per_user
            )));
        }

        let key = AccessKey {
            access_key_id: self.unused_access_key_id().await?,
            secret_access_key: secrets::generate_secret_access_key(),
            account_id: account_id.to_string(),
            owner: KeyOwner::User {
                user_id: user.user_id.clone(),
            },
            status: AccessKeyStatus::Active,
            create_date: Utc::now(),
            last_used: None,
        };
        user.access_keys.push(key.access_key_id.clone());

        let mut batch = WriteBatch::new();
        batch.put_json(access_key_key(&key.access_key_id), &key)?;
        batch.put_json(user_key(account_id, &user.user_id), &user)?;
        self.storage.backend().apply(batch).await?;

        info!(
            "Created access key {} for user '{}' in account {}",
            key.access_key_id, username, account_id
        );

        Ok(CreatedAccessKey {
            username: user.username,
            access_key_id: key.access_key_id,
            secret_access_key: key.secret_access_key,
            status: key.status,
            create_date: key.create_date,
        })
    }

    /// Create (or re-assert) an access key for the account root.
    ///
    /// With `supplied` credentials the call is idempotent: an existing root
    /// key with the same id is kept and its secret replaced if it changed.
    ///
    /// # Errors
    ///
    /// - `NoSuchEntity` if the account does not exist
    /// - `EntityAlreadyExists` if the supplied id belongs to another owner
    /// - `InvalidInput` if supplied credentials are empty
    pub async fn create_root_access_key(
        &self,
        account_id: &str,
        supplied: Option<(&str, &str)>,
    ) -> Result<AccessKey, IamError> {
        if let Some((id, secret)) = supplied {
            if id.is_empty() || secret.is_empty() {
                return Err(IamError::InvalidInput(
                    "access key id and secret must not be empty".to_string(),
                ));
            }
        }

        let account = self.storage.require_account(account_id).await?;
        let locks = self.storage.locks();
        let _account_guard = locks.lock(&EntityLocks::account_key(&account.name)).await;

        let access_key_id = match supplied {
            Some((id, _)) => id.to_string(),
            None => self.unused_access_key_id().await?,
        };
        let _key_guard = locks.lock(&EntityLocks::access_key_key(&access_key_id)).await;

        // Re-read under the lock
        let mut account = self.storage.require_account(account_id).await?;

        if let Some(mut existing) = self.lookup(&access_key_id).await? {
            if existing.account_id != account_id || existing.owner != KeyOwner::AccountRoot {
                return Err(IamError::EntityAlreadyExists(format!(
                    "Access key {} already exists.",
                    access_key_id
                )));
            }
            if let Some((_, secret)) = supplied {
                if existing.secret_access_key != secret {
                    existing.secret_access_key = secret.to_string();
                    let mut batch = WriteBatch::new();
                    batch.put_json(access_key_key(&access_key_id), &existing)?;
                    self.storage.backend().apply(batch).await?;
                    info!("Rotated secret of root access key {}", access_key_id);
                }
            }
            return Ok(existing);
        }

        let key = AccessKey {
            access_key_id: access_key_id.clone(),
            secret_access_key: match supplied {
                Some((_, secret)) => secret.to_string(),
                None => secrets::generate_secret_access_key(),
            },
            account_id: account_id.to_string(),
            owner: KeyOwner::AccountRoot,
            status: AccessKeyStatus::Active,
            create_date: Utc::now(),
            last_used: None,
        };
        account.root_access_keys.push(access_key_id.clone());

        let mut batch = WriteBatch::new();
        batch.put_json(access_key_key(&access_key_id), &key)?;
        batch.put_json(account_key(account_id), &account)?;
        self.storage.backend().apply(batch).await?;

        info!("Created root access key {} for account {}", access_key_id, account_id);
        Ok(key)
    }

    /// List a user's access keys in creation order, without secrets.
    ///
    /// # Errors
    ///
    /// - `NoSuchEntity` if the user does not exist
    pub async fn list_access_keys(
        &self,
        account_id: &str,
        username: &str,
    ) -> Result<Vec<AccessKeyMetadata>, IamError> {
        let user = self.storage.get_user(account_id, username).await?;

        let mut keys = Vec::with_capacity(user.access_keys.len());
        for access_key_id in &user.access_keys {
            match self.lookup(access_key_id).await? {
                Some(key) => keys.push(AccessKeyMetadata {
                    username: user.username.clone(),
                    access_key_id: key.access_key_id,
                    status: key.status,
                    create_date: key.create_date,
                }),
                None => warn!(
                    "User '{}' references missing access key {}",
                    user.username, access_key_id
                ),
            }
        }
        Ok(keys)
    }

    /// Report when and where an access key was last used.
    ///
    /// For a root key the account name is reported as the user name.
    ///
    /// # Errors
    ///
    /// - `NoSuchEntity` if the key is unknown in this account
    pub async fn get_access_key_last_used(
        &self,
        account_id: &str,
        access_key_id: &str,
    ) -> Result<AccessKeyLastUsedInfo, IamError> {
        let key = self
            .lookup(access_key_id)
            .await?
            .filter(|key| key.account_id == account_id)
            .ok_or_else(|| IamError::no_such_access_key(access_key_id))?;

        let username = match &key.owner {
            KeyOwner::AccountRoot => self.storage.require_account(account_id).await?.name,
            KeyOwner::User { user_id } => self
                .storage
                .get_user_by_id(account_id, user_id)
                .await?
                .map(|user| user.username)
                .ok_or_else(|| IamError::no_such_access_key(access_key_id))?,
        };

        Ok(AccessKeyLastUsedInfo {
            username,
            last_used: key.last_used,
        })
    }

    /// Change the status of a user's access key.
    ///
    /// # Errors
    ///
    /// - `NoSuchEntity` if the user is absent or does not own the key
    pub async fn update_access_key(
        &self,
        account_id: &str,
        username: &str,
        access_key_id: &str,
        status: AccessKeyStatus,
    ) -> Result<(), IamError> {
        let locks = self.storage.locks();
        let _user_guard = locks.lock(&EntityLocks::user_key(account_id, username)).await;
        let _key_guard = locks.lock(&EntityLocks::access_key_key(access_key_id)).await;

        let user = self.storage.get_user(account_id, username).await?;
        if !user.access_keys.iter().any(|id| id == access_key_id) {
            return Err(IamError::no_such_access_key(access_key_id));
        }
        let mut key = self
            .lookup(access_key_id)
            .await?
            .ok_or_else(|| IamError::no_such_access_key(access_key_id))?;

        if key.status == status {
            debug!("Access key {} already {}", access_key_id, status);
            return Ok(());
        }
        key.status = status;

        let mut batch = WriteBatch::new();
        batch.put_json(access_key_key(access_key_id), &key)?;
        self.storage.backend().apply(batch).await?;

        info!("Access key {} of user '{}' is now {}", access_key_id, username, status);
        Ok(())
    }

    /// Delete a user's access key.
    ///
    /// # Errors
    ///
    /// - `NoSuchEntity` if the user is absent or does not own the key
    pub async fn delete_access_key(
        &self,
        account_id: &str,
        username: &str,
        access_key_id: &str,
    ) -> Result<(), IamError> {
        let locks = self.storage.locks();
        let _user_guard = locks.lock(&EntityLocks::user_key(account_id, username)).await;
        let _key_guard = locks.lock(&EntityLocks::access_key_key(access_key_id)).await;

        let mut user = self.storage.get_user(account_id, username).await?;
        let before = user.access_keys.len();
        user.access_keys.retain(|id| id != access_key_id);
        if user.access_keys.len() == before {
            return Err(IamError::no_such_access_key(access_key_id));
        }

        let mut batch = WriteBatch::new();
        batch.delete(access_key_key(access_key_id));
        batch.put_json(user_key(account_id, &user.user_id), &user)?;
        self.storage.backend().apply(batch).await?;

        info!("Deleted access key {} of user '{}'", access_key_id, username);
        Ok(())
    }

    /// Record a successful authenticated request made with `access_key_id`.
    ///
    /// Latest use wins; no history is kept.
    pub async fn record_usage(
        &self,
        access_key_id: &str,
        service_name: &str,
        region: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), IamError> {
        let _guard = self
            .storage
            .locks()
            .lock(&EntityLocks::access_key_key(access_key_id))
            .await;

        let mut key = self
            .lookup(access_key_id)
            .await?
            .ok_or_else(|| IamError::no_such_access_key(access_key_id))?;
        key.last_used = Some(LastUsed {
            date: timestamp,
            service_name: service_name.to_string(),
            region: region.to_string(),
        });

        let mut batch = WriteBatch::new();
        batch.put_json(access_key_key(access_key_id), &key)?;
        self.storage.backend().apply(batch).await?;

        debug!("Recorded usage of {} ({}/{})", access_key_id, service_name, region);
        Ok(())
    }

    async fn unused_access_key_id(&self) -> Result<String, IamError> {
        loop {
            let candidate = secrets::generate_access_key_id();
            if self.lookup(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
    }
}
