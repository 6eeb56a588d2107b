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

//! IAM Query API handler.
//!
//! Parses the `Action` and its parameters into an [`IamRequest`], rejecting
//! malformed input before any store is touched, then runs it against the
//! caller's account.

use axum::{
    extract::{rejection::FormRejection, Extension, Form, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::time::Instant;
use tgw_features::iam::{validate_path, validate_username, AccessKeyStatus};
use tracing::{debug, error};
use uuid::Uuid;

use super::errors::{IamApiError, REQUEST_ID_HEADER};
use super::xml;
use crate::middleware::IamCaller;
use crate::server::AppState;

/// Actions served by this endpoint.
pub const SUPPORTED_ACTIONS: &[&str] = &[
    "CreateUser",
    "GetUser",
    "ListUsers",
    "UpdateUser",
    "DeleteUser",
    "CreateAccessKey",
    "ListAccessKeys",
    "GetAccessKeyLastUsed",
    "UpdateAccessKey",
    "DeleteAccessKey",
];

const MIN_ACCESS_KEY_ID_LEN: usize = 16;
const MAX_ACCESS_KEY_ID_LEN: usize = 128;

/// A validated IAM API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IamRequest {
    CreateUser {
        user_name: String,
        path: Option<String>,
    },
    GetUser {
        user_name: String,
    },
    ListUsers {
        path_prefix: Option<String>,
    },
    UpdateUser {
        user_name: String,
        new_user_name: Option<String>,
        new_path: Option<String>,
    },
    DeleteUser {
        user_name: String,
    },
    CreateAccessKey {
        user_name: String,
    },
    ListAccessKeys {
        user_name: String,
    },
    GetAccessKeyLastUsed {
        access_key_id: String,
    },
    UpdateAccessKey {
        user_name: String,
        access_key_id: String,
        status: AccessKeyStatus,
    },
    DeleteAccessKey {
        user_name: String,
        access_key_id: String,
    },
}

impl IamRequest {
    /// Parses and validates query parameters.
    ///
    /// # Errors
    ///
    /// - `MissingAction` / `InvalidAction` for an absent or unknown `Action`
    /// - `InvalidInput` for a missing or malformed required parameter
    /// - `ValidationError` for an out-of-set `Status` or malformed `AccessKeyId`
    pub fn parse(params: &HashMap<String, String>) -> Result<Self, IamApiError> {
        let action = params
            .get("Action")
            .filter(|a| !a.is_empty())
            .ok_or(IamApiError::MissingAction)?;

        let request = match action.as_str() {
            "CreateUser" => IamRequest::CreateUser {
                user_name: user_name(params, "UserName")?,
                path: path(params, "Path")?,
            },
            "GetUser" => IamRequest::GetUser {
                user_name: user_name(params, "UserName")?,
            },
            "ListUsers" => IamRequest::ListUsers {
                path_prefix: optional(params, "PathPrefix"),
            },
            "UpdateUser" => {
                let user_name = user_name(params, "UserName")?;
                let new_user_name = match optional(params, "NewUserName") {
                    Some(name) => {
                        validate_username("NewUserName", &name)?;
                        Some(name)
                    }
                    None => None,
                };
                let new_path = path(params, "NewPath")?;
                if new_user_name.is_none() && new_path.is_none() {
                    return Err(IamApiError::InvalidInput(
                        "UpdateUser requires NewUserName or NewPath".to_string(),
                    ));
                }
                IamRequest::UpdateUser {
                    user_name,
                    new_user_name,
                    new_path,
                }
            }
            "DeleteUser" => IamRequest::DeleteUser {
                user_name: user_name(params, "UserName")?,
            },
            "CreateAccessKey" => IamRequest::CreateAccessKey {
                user_name: user_name(params, "UserName")?,
            },
            "ListAccessKeys" => IamRequest::ListAccessKeys {
                user_name: user_name(params, "UserName")?,
            },
            "GetAccessKeyLastUsed" => IamRequest::GetAccessKeyLastUsed {
                access_key_id: access_key_id(params)?,
            },
            "UpdateAccessKey" => {
                let user_name = user_name(params, "UserName")?;
                let access_key_id = access_key_id(params)?;
                let status = required(params, "Status")?.parse::<AccessKeyStatus>()?;
                IamRequest::UpdateAccessKey {
                    user_name,
                    access_key_id,
                    status,
                }
            }
            "DeleteAccessKey" => IamRequest::DeleteAccessKey {
                user_name: user_name(params, "UserName")?,
                access_key_id: access_key_id(params)?,
            },
            other => return Err(IamApiError::InvalidAction(other.to_string())),
        };
        Ok(request)
    }

    /// The `Action` name of this request.
    pub fn action(&self) -> &'static str {
        match self {
            IamRequest::CreateUser { .. } => "CreateUser",
            IamRequest::GetUser { .. } => "GetUser",
            IamRequest::ListUsers { .. } => "ListUsers",
            IamRequest::UpdateUser { .. } => "UpdateUser",
            IamRequest::DeleteUser { .. } => "DeleteUser",
            IamRequest::CreateAccessKey { .. } => "CreateAccessKey",
            IamRequest::ListAccessKeys { .. } => "ListAccessKeys",
            IamRequest::GetAccessKeyLastUsed { .. } => "GetAccessKeyLastUsed",
            IamRequest::UpdateAccessKey { .. } => "UpdateAccessKey",
            IamRequest::DeleteAccessKey { .. } => "DeleteAccessKey",
        }
    }
}

fn optional(params: &HashMap<String, String>, name: &str) -> Option<String> {
    params.get(name).filter(|v| !v.is_empty()).cloned()
}

fn required(params: &HashMap<String, String>, name: &str) -> Result<String, IamApiError> {
    optional(params, name).ok_or_else(|| {
        IamApiError::InvalidInput(format!("The request must contain the parameter {}", name))
    })
}

fn user_name(params: &HashMap<String, String>, name: &str) -> Result<String, IamApiError> {
    let value = required(params, name)?;
    validate_username(name, &value)?;
    Ok(value)
}

fn path(params: &HashMap<String, String>, name: &str) -> Result<Option<String>, IamApiError> {
    match optional(params, name) {
        Some(value) => {
            validate_path(name, &value)?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

fn access_key_id(params: &HashMap<String, String>) -> Result<String, IamApiError> {
    let value = required(params, "AccessKeyId")?;
    let well_formed = (MIN_ACCESS_KEY_ID_LEN..=MAX_ACCESS_KEY_ID_LEN).contains(&value.len())
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !well_formed {
        return Err(IamApiError::ValidationError(format!(
            "1 validation error detected: Value '{}' at 'accessKeyId' failed to satisfy \
             constraint: Member must satisfy regular expression pattern: [\\w]+",
            value
        )));
    }
    Ok(value)
}

/// Metrics label for the raw `Action` parameter.
fn action_label(params: &HashMap<String, String>) -> &'static str {
    params
        .get("Action")
        .and_then(|a| SUPPORTED_ACTIONS.iter().find(|s| **s == a.as_str()))
        .copied()
        .unwrap_or("Unknown")
}

/// Handler for `GET /` and `POST /` IAM Query requests.
pub async fn handle_iam_request(
    State(state): State<AppState>,
    Extension(caller): Extension<IamCaller>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Response {
    let start = Instant::now();

    let params = match form {
        Ok(Form(params)) => params,
        Err(rejection) => {
            let err = IamApiError::InvalidInput(rejection.body_text());
            return finish("Unknown", start, Err(err));
        }
    };

    let request = match IamRequest::parse(&params) {
        Ok(request) => request,
        Err(err) => return finish(action_label(&params), start, Err(err)),
    };

    let action = request.action();
    debug!(
        "IAM {} for account {} with key {}",
        action,
        caller.account_id,
        caller.access_key_id.as_deref().unwrap_or("(auth disabled)")
    );
    let result = execute(&state, &caller.account_id, request).await;
    finish(action, start, result)
}

/// Runs a validated request; returns the `{Action}Result` body, if any.
async fn execute(
    state: &AppState,
    account_id: &str,
    request: IamRequest,
) -> Result<Option<String>, IamApiError> {
    let users = &state.iam_storage;
    let keys = &state.access_keys;

    let body = match request {
        IamRequest::CreateUser { user_name, path } => {
            let user = users.create_user(account_id, &user_name, path.as_deref()).await?;
            Some(xml::user_result(&user))
        }
        IamRequest::GetUser { user_name } => {
            let user = users.get_user(account_id, &user_name).await?;
            Some(xml::user_result(&user))
        }
        IamRequest::ListUsers { path_prefix } => {
            let list = users.list_users(account_id, path_prefix.as_deref()).await?;
            Some(xml::list_users_result(&list))
        }
        IamRequest::UpdateUser {
            user_name,
            new_user_name,
            new_path,
        } => {
            users
                .update_user(
                    account_id,
                    &user_name,
                    new_user_name.as_deref(),
                    new_path.as_deref(),
                )
                .await?;
            None
        }
        IamRequest::DeleteUser { user_name } => {
            users.delete_user(account_id, &user_name).await?;
            None
        }
        IamRequest::CreateAccessKey { user_name } => {
            let created = keys.create_access_key(account_id, &user_name).await?;
            Some(xml::create_access_key_result(&created))
        }
        IamRequest::ListAccessKeys { user_name } => {
            let list = keys.list_access_keys(account_id, &user_name).await?;
            Some(xml::list_access_keys_result(&user_name, &list))
        }
        IamRequest::GetAccessKeyLastUsed { access_key_id } => {
            let info = keys.get_access_key_last_used(account_id, &access_key_id).await?;
            Some(xml::access_key_last_used_result(&info))
        }
        IamRequest::UpdateAccessKey {
            user_name,
            access_key_id,
            status,
        } => {
            keys.update_access_key(account_id, &user_name, &access_key_id, status).await?;
            None
        }
        IamRequest::DeleteAccessKey {
            user_name,
            access_key_id,
        } => {
            keys.delete_access_key(account_id, &user_name, &access_key_id).await?;
            None
        }
    };
    Ok(body)
}

/// Renders the outcome and records request metrics.
fn finish(
    action: &'static str,
    start: Instant,
    result: Result<Option<String>, IamApiError>,
) -> Response {
    let response = match result {
        Ok(body) => {
            let request_id = Uuid::new_v4().to_string();
            let xml_body = xml::response(action, body.as_deref(), &request_id);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/xml".to_string()),
                    (HeaderName::from_static(REQUEST_ID_HEADER), request_id),
                ],
                xml_body,
            )
                .into_response()
        }
        Err(err) => {
            if let IamApiError::InternalFailure(_) = err {
                error!("IAM {} failed: {}", action, err);
            } else {
                debug!("IAM {} rejected: {} {}", action, err.code(), err);
            }
            err.into_response()
        }
    };

    let status = response.status().as_u16().to_string();
    metrics::counter!("iam_requests_total", "action" => action, "status" => status).increment(1);
    metrics::histogram!("iam_request_duration_seconds", "action" => action)
        .record(start.elapsed().as_secs_f64());

    response
}
