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

//! SigV4 authentication middleware for the IAM API.

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tgw_features::iam::Principal;
use tracing::{debug, warn};

use crate::auth::{
    parse_authorization_header, verify_signature_v4, SignatureRequestData, IAM_SERVICE,
};
use crate::iam::IamApiError;
use crate::server::AppState;

/// Largest accepted IAM request body.
pub const MAX_IAM_BODY_SIZE: usize = 64 * 1024;

/// Authenticated caller, stored in request extensions for the IAM handler.
#[derive(Debug, Clone)]
pub struct IamCaller {
    /// Account whose users and keys the request operates on
    pub account_id: String,
    /// Signing key, absent when authentication is disabled
    pub access_key_id: Option<String>,
}

/// IAM authentication middleware that verifies AWS Signature V4.
///
/// The body is buffered so the payload hash can be checked, then handed on
/// unchanged. Only account root keys may call the IAM API; a correctly
/// signed request from an IAM user's key is recorded as a use of that key
/// and then refused with `AccessDenied`.
///
/// When the state carries an auth-bypass account every request runs as that
/// account without a signature check.
pub async fn iam_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(account_id) = &state.auth_bypass_account {
        let mut request = request;
        request.extensions_mut().insert(IamCaller {
            account_id: account_id.clone(),
            access_key_id: None,
        });
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, MAX_IAM_BODY_SIZE).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to buffer IAM request body: {}", e);
            return IamApiError::InvalidInput(format!(
                "Request body must not exceed {} bytes",
                MAX_IAM_BODY_SIZE
            ))
            .into_response();
        }
    };

    match authenticate(&state, &parts, &body).await {
        Ok(caller) => {
            let mut request = Request::from_parts(parts, Body::from(body));
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(e) => {
            warn!("IAM authentication failed: {} ({})", e.code(), e);
            e.into_response()
        }
    }
}

async fn authenticate(
    state: &AppState,
    parts: &Parts,
    body: &Bytes,
) -> Result<IamCaller, IamApiError> {
    let req_data = SignatureRequestData::from_parts(parts, body)?;
    let auth = parse_authorization_header(&req_data.auth_header)?;

    if auth.credential.service != IAM_SERVICE {
        debug!("Credential scoped to service '{}'", auth.credential.service);
        return Err(IamApiError::SignatureDoesNotMatch);
    }

    let key = state.auth_service.authenticate(&auth.credential.access_key_id).await?;
    verify_signature_v4(&req_data, &auth, &key.secret_access_key, Utc::now())?;

    if let Err(e) = state
        .auth_service
        .record_usage(&key.access_key_id, IAM_SERVICE, &auth.credential.region, Utc::now())
        .await
    {
        warn!("Failed to record usage of access key {}: {}", key.access_key_id, e);
    }

    match &key.principal {
        Principal::AccountRoot => Ok(IamCaller {
            account_id: key.account_id,
            access_key_id: Some(key.access_key_id),
        }),
        Principal::User { username, .. } => Err(IamApiError::AccessDenied(format!(
            "User: {} is not authorized to perform IAM actions",
            username
        ))),
    }
}
