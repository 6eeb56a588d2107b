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


//! IAM (Identity and Access Management) module.
//!
//! Provides parent accounts, IAM users, access-key lifecycle and
//! access-key authentication.

pub mod access_keys;
pub mod auth;
pub mod error;
pub mod locks;
pub mod models;
pub mod secrets;
pub mod storage;
pub mod validation;

pub use access_keys::{AccessKeyManager, DEFAULT_MAX_ACCESS_KEYS_PER_USER};
pub use auth::{AuthService, AuthenticatedKey, Principal};
pub use error::IamError;
pub use locks::{EntityGuard, EntityLocks};
pub use models::{
    AccessKey, AccessKeyLastUsedInfo, AccessKeyMetadata, AccessKeyStatus, Account,
    CreatedAccessKey, FsIdentity, KeyOwner, LastUsed, User,
};
pub use storage::IamStorage;
pub use validation::{is_valid_iam_path, is_valid_username, validate_path, validate_username};
