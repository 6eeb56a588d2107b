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

//! IAM API error types and responses.
//!
//! Every error renders as an AWS IAM `ErrorResponse` document with the
//! matching HTTP status code.

use axum::{
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use tgw_features::iam::IamError;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use super::xml;

/// Response header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-amzn-requestid";

/// IAM API errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IamApiError {
    /// A parameter is missing or malformed.
    #[error("{0}")]
    InvalidInput(String),

    /// A parameter failed enum or constraint validation.
    #[error("{0}")]
    ValidationError(String),

    /// The `Action` parameter names an unsupported operation.
    #[error("Could not find operation {0} for version 2010-05-08")]
    InvalidAction(String),

    /// The `Action` parameter is absent.
    #[error("Missing Action")]
    MissingAction,

    /// The user or access key does not exist.
    #[error("{0}")]
    NoSuchEntity(String),

    /// Username collision.
    #[error("{0}")]
    EntityAlreadyExists(String),

    /// The user still owns access keys.
    #[error("{0}")]
    DeleteConflict(String),

    /// Access-key quota reached.
    #[error("{0}")]
    LimitExceeded(String),

    /// The caller may not use the IAM API.
    #[error("{0}")]
    AccessDenied(String),

    /// Unknown or inactive access key.
    #[error("The security token included in the request is invalid.")]
    InvalidClientTokenId,

    /// Signature verification failed.
    #[error(
        "The request signature we calculated does not match the signature you provided. \
         Check your AWS Secret Access Key and signing method."
    )]
    SignatureDoesNotMatch,

    /// The Authorization header is malformed.
    #[error("{0}")]
    IncompleteSignature(String),

    /// No Authorization header.
    #[error("Request is missing Authentication Token")]
    MissingAuthenticationToken,

    /// Server-side failure.
    #[error("{0}")]
    InternalFailure(String),
}

impl IamApiError {
    /// Returns the AWS IAM error code.
    pub fn code(&self) -> &'static str {
        match self {
            IamApiError::InvalidInput(_) => "InvalidInput",
            IamApiError::ValidationError(_) => "ValidationError",
            IamApiError::InvalidAction(_) => "InvalidAction",
            IamApiError::MissingAction => "MissingAction",
            IamApiError::NoSuchEntity(_) => "NoSuchEntity",
            IamApiError::EntityAlreadyExists(_) => "EntityAlreadyExists",
            IamApiError::DeleteConflict(_) => "DeleteConflict",
            IamApiError::LimitExceeded(_) => "LimitExceeded",
            IamApiError::AccessDenied(_) => "AccessDenied",
            IamApiError::InvalidClientTokenId => "InvalidClientTokenId",
            IamApiError::SignatureDoesNotMatch => "SignatureDoesNotMatch",
            IamApiError::IncompleteSignature(_) => "IncompleteSignature",
            IamApiError::MissingAuthenticationToken => "MissingAuthenticationToken",
            IamApiError::InternalFailure(_) => "InternalFailure",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            IamApiError::InvalidInput(_)
            | IamApiError::ValidationError(_)
            | IamApiError::InvalidAction(_)
            | IamApiError::MissingAction
            | IamApiError::IncompleteSignature(_) => StatusCode::BAD_REQUEST,
            IamApiError::AccessDenied(_)
            | IamApiError::InvalidClientTokenId
            | IamApiError::SignatureDoesNotMatch
            | IamApiError::MissingAuthenticationToken => StatusCode::FORBIDDEN,
            IamApiError::NoSuchEntity(_) => StatusCode::NOT_FOUND,
            IamApiError::EntityAlreadyExists(_)
            | IamApiError::DeleteConflict(_)
            | IamApiError::LimitExceeded(_) => StatusCode::CONFLICT,
            IamApiError::InternalFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `Receiver` for server faults, `Sender` otherwise.
    pub fn error_type(&self) -> &'static str {
        match self {
            IamApiError::InternalFailure(_) => "Receiver",
            _ => "Sender",
        }
    }
}

impl From<IamError> for IamApiError {
    fn from(err: IamError) -> Self {
        match err {
            IamError::InvalidInput(msg) => IamApiError::InvalidInput(msg),
            IamError::ValidationError(msg) => IamApiError::ValidationError(msg),
            IamError::NoSuchEntity(msg) => IamApiError::NoSuchEntity(msg),
            IamError::EntityAlreadyExists(msg) => IamApiError::EntityAlreadyExists(msg),
            IamError::LimitExceeded(msg) => IamApiError::LimitExceeded(msg),
            IamError::DeleteConflict(msg) => IamApiError::DeleteConflict(msg),
            IamError::InvalidClientTokenId => IamApiError::InvalidClientTokenId,
            other => {
                error!("IAM backend failure: {}", other);
                IamApiError::InternalFailure(
                    "The request processing has failed because of an unknown error.".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for IamApiError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let xml_body =
            xml::error_response(self.error_type(), self.code(), &self.to_string(), &request_id);

        (
            self.status_code(),
            [
                (header::CONTENT_TYPE, "text/xml".to_string()),
                (HeaderName::from_static(REQUEST_ID_HEADER), request_id),
            ],
            xml_body,
        )
            .into_response()
    }
}
