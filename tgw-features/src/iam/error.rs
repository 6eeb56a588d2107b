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


//! IAM error types.
//!
//! Variants follow the AWS IAM error taxonomy; [`IamError::code`] returns the
//! wire error code.

use thiserror::Error;

/// IAM-related errors.
#[derive(Error, Debug)]
pub enum IamError {
    /// Malformed username/path or a missing required field
    #[error("{0}")]
    InvalidInput(String),

    /// A parameter failed enum or constraint validation
    #[error("{0}")]
    ValidationError(String),

    /// Unknown user, access key or account
    #[error("{0}")]
    NoSuchEntity(String),

    /// Username collision within the parent account
    #[error("{0}")]
    EntityAlreadyExists(String),

    /// Access-key quota reached
    #[error("{0}")]
    LimitExceeded(String),

    /// User still owns access keys
    #[error("{0}")]
    DeleteConflict(String),

    /// Access key is unknown or inactive
    #[error("The security token included in the request is invalid.")]
    InvalidClientTokenId,

    /// Underlying storage error
    #[error("Storage error: {0}")]
    Storage(#[from] tgw_core::StorageError),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IamError {
    /// Returns the AWS IAM error code.
    pub fn code(&self) -> &'static str {
        match self {
            IamError::InvalidInput(_) => "InvalidInput",
            IamError::ValidationError(_) => "ValidationError",
            IamError::NoSuchEntity(_) => "NoSuchEntity",
            IamError::EntityAlreadyExists(_) => "EntityAlreadyExists",
            IamError::LimitExceeded(_) => "LimitExceeded",
            IamError::DeleteConflict(_) => "DeleteConflict",
            IamError::InvalidClientTokenId => "InvalidClientTokenId",
            IamError::Storage(_) | IamError::Json(_) => "InternalFailure",
        }
    }

    pub(crate) fn no_such_user(username: &str) -> Self {
        IamError::NoSuchEntity(format!("The user with name {} cannot be found.", username))
    }

    pub(crate) fn no_such_access_key(access_key_id: &str) -> Self {
        IamError::NoSuchEntity(format!(
            "The Access Key with id {} cannot be found.",
            access_key_id
        ))
    }
}
