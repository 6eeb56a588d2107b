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


//! Access-key authentication and identity resolution.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::access_keys::AccessKeyManager;
use super::error::IamError;
use super::models::{AccessKeyStatus, KeyOwner};
use crate::fs_access::FsContext;

/// Who is making an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// The parent account itself
    AccountRoot,
    /// An IAM user of the account
    User {
        /// Immutable user id
        user_id: String,
        /// Username at authentication time
        username: String,
    },
}

/// Active access key resolved for signature verification.
#[derive(Debug, Clone)]
pub struct AuthenticatedKey {
    /// Public key id
    pub access_key_id: String,
    /// Secret used to verify the request signature
    pub secret_access_key: String,
    /// Account the key belongs to
    pub account_id: String,
    /// Key owner
    pub principal: Principal,
}

impl AuthenticatedKey {
    /// Returns true if the key belongs to the account root.
    pub fn is_account_root(&self) -> bool {
        self.principal == Principal::AccountRoot
    }
}

/// Authentication service backed by the access-key store.
#[derive(Clone)]
pub struct AuthService {
    access_keys: AccessKeyManager,
}

impl AuthService {
    /// Create new authentication service.
    ///
    /// # Arguments
    ///
    /// * `access_keys` - Access-key manager holding the credentials
    pub fn new(access_keys: AccessKeyManager) -> Self {
        Self { access_keys }
    }

    /// Resolve an access key id to its secret and owner.
    ///
    /// Status is read fresh on every call, so deactivating a key takes
    /// effect on the next request.
    ///
    /// # Errors
    ///
    /// - `InvalidClientTokenId` if the key is unknown, inactive or orphaned
    pub async fn authenticate(&self, access_key_id: &str) -> Result<AuthenticatedKey, IamError> {
        let key = match self.access_keys.lookup(access_key_id).await? {
            Some(key) => key,
            None => {
                warn!("Authentication with unknown access key {}", access_key_id);
                return Err(IamError::InvalidClientTokenId);
            }
        };

        if key.status != AccessKeyStatus::Active {
            warn!("Authentication with inactive access key {}", access_key_id);
            return Err(IamError::InvalidClientTokenId);
        }

        let principal = match &key.owner {
            KeyOwner::AccountRoot => Principal::AccountRoot,
            KeyOwner::User { user_id } => {
                let user = self
                    .access_keys
                    .storage()
                    .get_user_by_id(&key.account_id, user_id)
                    .await?
                    .ok_or_else(|| {
                        warn!("Access key {} has no owning user", access_key_id);
                        IamError::InvalidClientTokenId
                    })?;
                Principal::User {
                    user_id: user.user_id,
                    username: user.username,
                }
            }
        };

        debug!("Resolved access key {} ({:?})", access_key_id, principal);
        Ok(AuthenticatedKey {
            access_key_id: key.access_key_id,
            secret_access_key: key.secret_access_key,
            account_id: key.account_id,
            principal,
        })
    }

    /// Record a request whose signature has been verified.
    pub async fn record_usage(
        &self,
        access_key_id: &str,
        service_name: &str,
        region: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), IamError> {
        self.access_keys
            .record_usage(access_key_id, service_name, region, timestamp)
            .await
    }

    /// Build the filesystem identity context for an authenticated key.
    ///
    /// IAM users act with their parent account's uid, gid and
    /// supplemental groups.
    ///
    /// # Arguments
    ///
    /// * `key` - Key returned by [`AuthService::authenticate`]
    /// * `backend` - Filesystem backend selector
    /// * `warn_threshold` - Slow-call logging threshold
    pub async fn resolve_identity(
        &self,
        key: &AuthenticatedKey,
        backend: &str,
        warn_threshold: Duration,
    ) -> Result<FsContext, IamError> {
        let account = self.access_keys.storage().require_account(&key.account_id).await?;
        let identity = account.fs_identity;

        Ok(FsContext::new(identity.uid, identity.gid)
            .with_supplemental_groups(identity.supplemental_groups)
            .with_backend(backend)
            .with_warn_threshold(warn_threshold))
    }
}
