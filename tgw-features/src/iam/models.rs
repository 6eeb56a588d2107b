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


//! IAM data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::IamError;

/// Filesystem identity of a parent account.
///
/// Every IAM user created under the account acts with this identity on the
/// filesystem gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsIdentity {
    /// POSIX user id
    pub uid: u32,
    /// Primary POSIX group id
    pub gid: u32,
    /// Additional group ids considered for group-class permissions
    #[serde(default)]
    pub supplemental_groups: Vec<u32>,
}

/// Parent storage account owning a set of IAM users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// 12-digit account id
    pub account_id: String,
    /// Unique account name
    pub name: String,
    /// Filesystem identity inherited by the account's users
    pub fs_identity: FsIdentity,
    /// Access keys of the account root
    #[serde(default)]
    pub root_access_keys: Vec<String>,
    /// Account creation timestamp
    pub create_date: DateTime<Utc>,
}

/// IAM user record.
///
/// Sibling users of the same account never share a `username`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier (`AIDA...`), unchanged by renames
    pub user_id: String,
    /// Owning account
    pub account_id: String,
    /// Username (unique within the account)
    pub username: String,
    /// IAM path, `/` by default
    pub path: String,
    /// `arn:aws:iam::<account>:user<path><username>`
    pub arn: String,
    /// User creation timestamp
    pub create_date: DateTime<Utc>,
    /// Insertion sequence used for listing order
    pub seq: u64,
    /// Ids of the access keys owned by this user
    #[serde(default)]
    pub access_keys: Vec<String>,
}

impl User {
    /// Builds the ARN for a user.
    pub fn build_arn(account_id: &str, path: &str, username: &str) -> String {
        format!("arn:aws:iam::{}:user{}{}", account_id, path, username)
    }
}

/// Access key status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccessKeyStatus {
    /// Key may authenticate requests
    Active,
    /// Key is rejected by authentication
    Inactive,
}

impl AccessKeyStatus {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessKeyStatus::Active => "Active",
            AccessKeyStatus::Inactive => "Inactive",
        }
    }
}

impl fmt::Display for AccessKeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessKeyStatus {
    type Err = IamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(AccessKeyStatus::Active),
            "Inactive" => Ok(AccessKeyStatus::Inactive),
            other => Err(IamError::ValidationError(format!(
                "1 validation error detected: Value '{}' at 'status' failed to satisfy constraint: \
                 Member must satisfy enum value set: [Active, Inactive]",
                other
            ))),
        }
    }
}

/// Who an access key belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyOwner {
    /// The parent account itself
    AccountRoot,
    /// An IAM user, referenced by immutable id
    User {
        /// Owning user id
        user_id: String,
    },
}

/// Most recent successful use of an access key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastUsed {
    /// When the key last authenticated a request
    pub date: DateTime<Utc>,
    /// Service the request targeted (e.g. `iam`, `s3`)
    pub service_name: String,
    /// Region from the request's credential scope
    pub region: String,
}

/// Stored access key record (includes the secret).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessKey {
    /// Public key id (`AKIA...`)
    pub access_key_id: String,
    /// Secret used for AWS Signature V4 (never listed)
    pub secret_access_key: String,
    /// Account the key lives in
    pub account_id: String,
    /// Owner of the key
    pub owner: KeyOwner,
    /// Current status
    pub status: AccessKeyStatus,
    /// Key creation timestamp
    pub create_date: DateTime<Utc>,
    /// Latest usage, absent until the key authenticates a request
    pub last_used: Option<LastUsed>,
}

/// Access key as returned by listings (secret filtered out).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AccessKeyMetadata {
    /// Owning username
    pub username: String,
    /// Public key id
    pub access_key_id: String,
    /// Current status
    pub status: AccessKeyStatus,
    /// Key creation timestamp
    pub create_date: DateTime<Utc>,
}

/// Freshly created access key; the only time the secret is returned.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedAccessKey {
    /// Owning username
    pub username: String,
    /// Public key id
    pub access_key_id: String,
    /// Secret access key - shown only once on creation
    pub secret_access_key: String,
    /// Always `Active` on creation
    pub status: AccessKeyStatus,
    /// Key creation timestamp
    pub create_date: DateTime<Utc>,
}

/// Result of `GetAccessKeyLastUsed`.
#[derive(Debug, Clone, Serialize)]
pub struct AccessKeyLastUsedInfo {
    /// Owning username (account name for root keys)
    pub username: String,
    /// Latest usage, if any
    pub last_used: Option<LastUsed>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("Active".parse::<AccessKeyStatus>().unwrap(), AccessKeyStatus::Active);
        assert_eq!("Inactive".parse::<AccessKeyStatus>().unwrap(), AccessKeyStatus::Inactive);

        let err = "active".parse::<AccessKeyStatus>().unwrap_err();
        assert_eq!(err.code(), "ValidationError");
        assert!("Disabled".parse::<AccessKeyStatus>().is_err());
    }

    #[test]
    fn test_build_arn() {
        assert_eq!(
            User::build_arn("123456789012", "/", "Asahi"),
            "arn:aws:iam::123456789012:user/Asahi"
        );
        assert_eq!(
            User::build_arn("123456789012", "/division/", "Asahi"),
            "arn:aws:iam::123456789012:user/division/Asahi"
        );
    }

    #[test]
    fn test_access_key_metadata_has_no_secret() {
        let metadata = AccessKeyMetadata {
            username: "Fuji".to_string(),
            access_key_id: "AKIAEXAMPLE".to_string(),
            status: AccessKeyStatus::Active,
            create_date: Utc::now(),
        };
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("AKIAEXAMPLE"));
        assert!(!json.contains("secret"));
    }
}
