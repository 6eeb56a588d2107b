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


//! Identity record store.
//!
//! Stores accounts and IAM users through an [`IdentityBackend`] with the
//! following keys:
//! - `account/{account_id}` - Account records (JSON)
//! - `account_name/{name}` - Account name → account ID index
//! - `user/{account_id}/{user_id}` - User records (JSON)
//! - `username/{account_id}/{username}` - Username → user ID index
//! - `access_key/{access_key_id}` - Access key records (JSON, see `access_keys`)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use tgw_core::storage::{get_json, list_json};
use tgw_core::{IdentityBackend, WriteBatch};

use super::error::IamError;
use super::locks::EntityLocks;
use super::models::{Account, FsIdentity, User};
use super::secrets;
use super::validation::{self, DEFAULT_PATH};

pub(crate) fn account_key(account_id: &str) -> String {
    format!("account/{}", account_id)
}

pub(crate) fn account_name_key(name: &str) -> String {
    format!("account_name/{}", name)
}

pub(crate) fn user_key(account_id: &str, user_id: &str) -> String {
    format!("user/{}/{}", account_id, user_id)
}

pub(crate) fn user_prefix(account_id: &str) -> String {
    format!("user/{}/", account_id)
}

pub(crate) fn username_key(account_id: &str, username: &str) -> String {
    format!("username/{}/{}", account_id, username)
}

pub(crate) fn access_key_key(access_key_id: &str) -> String {
    format!("access_key/{}", access_key_id)
}

/// Identity record store for accounts and IAM users.
///
/// Cloning is cheap; clones share the backend, the lock table and the
/// insertion clock.
#[derive(Clone)]
pub struct IamStorage {
    backend: Arc<dyn IdentityBackend>,
    locks: EntityLocks,
    clock: Arc<AtomicU64>,
}

impl IamStorage {
    /// Create new IAM storage.
    ///
    /// # Arguments
    ///
    /// * `backend` - Backend used to persist identity records
    pub fn new(backend: Arc<dyn IdentityBackend>) -> Self {
        Self {
            backend,
            locks: EntityLocks::new(),
            clock: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) fn backend(&self) -> &dyn IdentityBackend {
        self.backend.as_ref()
    }

    pub(crate) fn locks(&self) -> &EntityLocks {
        &self.locks
    }

    /// Next insertion sequence: wall-clock nanoseconds, forced strictly increasing.
    fn next_seq(&self) -> u64 {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or_default().max(0) as u64;
        let mut prev = self.clock.load(Ordering::SeqCst);
        loop {
            let next = now.max(prev + 1);
            match self.clock.compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Provision a parent account, or return the existing one with this name.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique account name
    /// * `fs_identity` - Filesystem identity inherited by the account's users
    pub async fn provision_account(
        &self,
        name: &str,
        fs_identity: FsIdentity,
    ) -> Result<Account, IamError> {
        if name.is_empty() {
            return Err(IamError::InvalidInput("account name is required".to_string()));
        }

        let _guard = self.locks.lock(&EntityLocks::account_key(name)).await;

        if let Some(existing) = self.get_account_by_name(name).await? {
            debug!("Account '{}' already provisioned ({})", name, existing.account_id);
            return Ok(existing);
        }

        let account = Account {
            account_id: secrets::generate_account_id(),
            name: name.to_string(),
            fs_identity,
            root_access_keys: Vec::new(),
            create_date: Utc::now(),
        };

        let mut batch = WriteBatch::new();
        batch.put_json(account_key(&account.account_id), &account)?;
        batch.put_raw(account_name_key(name), account.account_id.as_bytes().to_vec());
        self.backend.apply(batch).await?;

        info!("Provisioned account '{}' ({})", name, account.account_id);
        Ok(account)
    }

    /// Get account by ID.
    pub async fn get_account(&self, account_id: &str) -> Result<Option<Account>, IamError> {
        Ok(get_json(self.backend(), &account_key(account_id)).await?)
    }

    /// Get account by name.
    pub async fn get_account_by_name(&self, name: &str) -> Result<Option<Account>, IamError> {
        let account_id = match self.backend.get(&account_name_key(name)).await? {
            Some(bytes) => String::from_utf8(bytes)
                .map_err(|e| tgw_core::StorageError::InvalidData(e.to_string()))?,
            None => return Ok(None),
        };
        self.get_account(&account_id).await
    }

    /// Get account by ID, failing with `NoSuchEntity` if absent.
    pub async fn require_account(&self, account_id: &str) -> Result<Account, IamError> {
        self.get_account(account_id).await?.ok_or_else(|| {
            IamError::NoSuchEntity(format!("The account {} cannot be found.", account_id))
        })
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Create new user.
    ///
    /// # Arguments
    ///
    /// * `account_id` - Parent account
    /// * `username` - Username (1-64 chars of `[A-Za-z0-9_+=,.@-]`)
    /// * `path` - IAM path, `/` when `None`
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if username or path format is invalid
    /// - `EntityAlreadyExists` if username is already taken in the account
    /// - `NoSuchEntity` if the account does not exist
    pub async fn create_user(
        &self,
        account_id: &str,
        username: &str,
        path: Option<&str>,
    ) -> Result<User, IamError> {
        validation::validate_username("UserName", username)?;
        let path = path.unwrap_or(DEFAULT_PATH);
        validation::validate_path("Path", path)?;

        let _guard = self.locks.lock(&EntityLocks::user_key(account_id, username)).await;

        self.require_account(account_id).await?;
        if self.find_user_id(account_id, username).await?.is_some() {
            return Err(IamError::EntityAlreadyExists(format!(
                "User with name {} already exists.",
                username
            )));
        }

        let user = User {
            user_id: secrets::generate_user_id(),
            account_id: account_id.to_string(),
            username: username.to_string(),
            path: path.to_string(),
            arn: User::build_arn(account_id, path, username),
            create_date: Utc::now(),
            seq: self.next_seq(),
            access_keys: Vec::new(),
        };

        let mut batch = WriteBatch::new();
        batch.put_json(user_key(account_id, &user.user_id), &user)?;
        batch.put_raw(username_key(account_id, username), user.user_id.as_bytes().to_vec());
        self.backend.apply(batch).await?;

        info!("Created user '{}' ({}) in account {}", username, user.user_id, account_id);
        Ok(user)
    }

    async fn find_user_id(
        &self,
        account_id: &str,
        username: &str,
    ) -> Result<Option<String>, IamError> {
        match self.backend.get(&username_key(account_id, username)).await? {
            Some(bytes) => Ok(Some(
                String::from_utf8(bytes)
                    .map_err(|e| tgw_core::StorageError::InvalidData(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    /// Get user by username.
    ///
    /// # Errors
    ///
    /// - `NoSuchEntity` if no user has this name in the account
    pub async fn get_user(&self, account_id: &str, username: &str) -> Result<User, IamError> {
        let user_id = self
            .find_user_id(account_id, username)
            .await?
            .ok_or_else(|| IamError::no_such_user(username))?;
        self.get_user_by_id(account_id, &user_id)
            .await?
            .ok_or_else(|| IamError::no_such_user(username))
    }

    /// Get user by its immutable ID.
    pub async fn get_user_by_id(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> Result<Option<User>, IamError> {
        Ok(get_json(self.backend(), &user_key(account_id, user_id)).await?)
    }

    /// List users of an account in insertion order.
    ///
    /// # Arguments
    ///
    /// * `account_id` - Parent account
    /// * `path_prefix` - Only return users whose path starts with this prefix
    pub async fn list_users(
        &self,
        account_id: &str,
        path_prefix: Option<&str>,
    ) -> Result<Vec<User>, IamError> {
        let mut users: Vec<User> = list_json(self.backend(), &user_prefix(account_id)).await?;
        if let Some(prefix) = path_prefix {
            users.retain(|u| u.path.starts_with(prefix));
        }
        users.sort_by(|a, b| a.seq.cmp(&b.seq).then_with(|| a.user_id.cmp(&b.user_id)));
        Ok(users)
    }

    /// Rename user.
    ///
    /// Renaming a user to its current name is a no-op.
    ///
    /// # Errors
    ///
    /// - `NoSuchEntity` if `username` does not exist
    /// - `EntityAlreadyExists` if `new_username` belongs to another user
    /// - `InvalidInput` if `new_username` is malformed
    pub async fn rename_user(
        &self,
        account_id: &str,
        username: &str,
        new_username: &str,
    ) -> Result<User, IamError> {
        self.update_user(account_id, username, Some(new_username), None).await
    }

    /// Update user name and/or path.
    ///
    /// The whole change (record, username index, ARN) is written in one batch.
    pub async fn update_user(
        &self,
        account_id: &str,
        username: &str,
        new_username: Option<&str>,
        new_path: Option<&str>,
    ) -> Result<User, IamError> {
        if let Some(name) = new_username {
            validation::validate_username("NewUserName", name)?;
        }
        if let Some(path) = new_path {
            validation::validate_path("NewPath", path)?;
        }

        let mut lock_keys = vec![EntityLocks::user_key(account_id, username)];
        if let Some(name) = new_username {
            lock_keys.push(EntityLocks::user_key(account_id, name));
        }
        let _guards = self.locks.lock_all(&lock_keys).await;

        let mut user = self.get_user(account_id, username).await?;
        let mut batch = WriteBatch::new();

        if let Some(name) = new_username.filter(|name| *name != username) {
            if self.find_user_id(account_id, name).await?.is_some() {
                return Err(IamError::EntityAlreadyExists(format!(
                    "User with name {} already exists.",
                    name
                )));
            }
            batch.delete(username_key(account_id, username));
            batch.put_raw(username_key(account_id, name), user.user_id.as_bytes().to_vec());
            user.username = name.to_string();
        }
        if let Some(path) = new_path {
            user.path = path.to_string();
        }

        let arn = User::build_arn(account_id, &user.path, &user.username);
        if batch.is_empty() && arn == user.arn {
            debug!("Update of user '{}' changes nothing", username);
            return Ok(user);
        }
        user.arn = arn;
        batch.put_json(user_key(account_id, &user.user_id), &user)?;
        self.backend.apply(batch).await?;

        info!(
            "Updated user '{}' -> '{}' (path {}) in account {}",
            username, user.username, user.path, account_id
        );
        Ok(user)
    }

    /// Delete user.
    ///
    /// # Errors
    ///
    /// - `NoSuchEntity` if the user doesn't exist
    /// - `DeleteConflict` if the user still owns access keys
    pub async fn delete_user(&self, account_id: &str, username: &str) -> Result<(), IamError> {
        let _guard = self.locks.lock(&EntityLocks::user_key(account_id, username)).await;

        let user = self.get_user(account_id, username).await?;
        if !user.access_keys.is_empty() {
            return Err(IamError::DeleteConflict(format!(
                "Cannot delete entity, must delete access keys first. User {} owns {} access key(s).",
                username,
                user.access_keys.len()
            )));
        }

        let mut batch = WriteBatch::new();
        batch.delete(username_key(account_id, username));
        batch.delete(user_key(account_id, &user.user_id));
        self.backend.apply(batch).await?;

        info!("Deleted user '{}' ({}) from account {}", username, user.user_id, account_id);
        Ok(())
    }
}
