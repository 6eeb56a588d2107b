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

//! AWS Signature V4 authentication.
//!
//! Verifies signed IAM Query requests.
//! Based on: <https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html>

use axum::http::{request::Parts, HeaderMap};
use chrono::{DateTime, NaiveDateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::iam::errors::IamApiError;

type HmacSha256 = Hmac<Sha256>;

/// Signing algorithm accepted in the Authorization header.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Service name IAM requests must be scoped to.
pub const IAM_SERVICE: &str = "iam";

/// Largest accepted distance between the request timestamp and the server clock.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(15 * 60);

/// Parsed Authorization header components.
#[derive(Debug, Clone)]
pub struct AuthorizationHeader {
    /// Always `AWS4-HMAC-SHA256`
    pub algorithm: String,
    /// Credential scope
    pub credential: CredentialScope,
    /// Lowercase signed header names, in header order
    pub signed_headers: Vec<String>,
    /// Hex signature
    pub signature: String,
}

/// Credential scope from Authorization header.
#[derive(Debug, Clone)]
pub struct CredentialScope {
    /// Access key id
    pub access_key_id: String,
    /// YYYYMMDD
    pub date: String,
    /// Signing region
    pub region: String,
    /// Signing service
    pub service: String,
}

/// Extracted request data for signature verification.
/// This allows us to extract all data synchronously before async operations.
#[derive(Debug, Clone)]
pub struct SignatureRequestData {
    /// HTTP method
    pub method: String,
    /// URI path component
    pub path: String,
    /// URI query string (if any)
    pub query: Option<String>,
    /// All request headers
    pub headers: HeaderMap,
    /// Authorization header value
    pub auth_header: String,
    /// Hex SHA-256 of the request body
    pub payload_hash: String,
}

impl SignatureRequestData {
    /// Extract data from buffered request parts.
    ///
    /// The payload hash is always computed from the body. A client-supplied
    /// `x-amz-content-sha256` must match it.
    pub fn from_parts(parts: &Parts, body: &[u8]) -> Result<Self, IamApiError> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(IamApiError::MissingAuthenticationToken)?
            .to_string();

        let payload_hash = hex::encode(Sha256::digest(body));
        if let Some(declared) = parts.headers.get("x-amz-content-sha256") {
            if !declared.as_bytes().eq_ignore_ascii_case(payload_hash.as_bytes()) {
                tracing::debug!("x-amz-content-sha256 does not match the request body");
                return Err(IamApiError::SignatureDoesNotMatch);
            }
        }

        Ok(Self {
            method: parts.method.as_str().to_string(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(|s| s.to_string()),
            headers: parts.headers.clone(),
            auth_header,
            payload_hash,
        })
    }
}

/// Verifies the request signature against `secret_key`.
///
/// # Errors
///
/// - `IncompleteSignature` if no usable date header is present
/// - `SignatureDoesNotMatch` if the timestamp is outside [`MAX_CLOCK_SKEW`]
///   or the signature differs
pub fn verify_signature_v4(
    req_data: &SignatureRequestData,
    auth: &AuthorizationHeader,
    secret_key: &str,
    now: DateTime<Utc>,
) -> Result<(), IamApiError> {
    let timestamp = extract_timestamp(&req_data.headers)?;
    check_clock_skew(&timestamp, now)?;

    let canonical_request = create_canonical_request(req_data, &auth.signed_headers)?;

    let string_to_sign = create_string_to_sign(
        &auth.algorithm,
        &timestamp,
        &auth.credential.date,
        &auth.credential.region,
        &auth.credential.service,
        &canonical_request,
    );

    let signing_key = calculate_signing_key(
        secret_key,
        &auth.credential.date,
        &auth.credential.region,
        &auth.credential.service,
    )?;

    let calculated_signature = calculate_signature(&signing_key, &string_to_sign)?;

    let received_signature_bytes =
        hex::decode(&auth.signature).map_err(|_| IamApiError::SignatureDoesNotMatch)?;
    let calculated_signature_bytes =
        hex::decode(&calculated_signature).map_err(|_| IamApiError::SignatureDoesNotMatch)?;

    if constant_time_eq(&calculated_signature_bytes, &received_signature_bytes) {
        return Ok(());
    }

    tracing::debug!("Signature mismatch!");
    tracing::debug!("Received signature: {}", auth.signature);
    tracing::debug!("Calculated signature: {}", calculated_signature);
    tracing::debug!("Canonical request:\n{}", canonical_request);
    tracing::debug!("String to sign:\n{}", string_to_sign);
    tracing::debug!("Access key: {}", auth.credential.access_key_id);

    Err(IamApiError::SignatureDoesNotMatch)
}

/// Parses Authorization header.
///
/// Format: `AWS4-HMAC-SHA256 Credential=access_key/date/region/service/aws4_request, SignedHeaders=..., Signature=...`
pub fn parse_authorization_header(header: &str) -> Result<AuthorizationHeader, IamApiError> {
    let rest = header
        .strip_prefix(ALGORITHM)
        .and_then(|rest| rest.strip_prefix(' '))
        .ok_or_else(|| incomplete("Unsupported or missing signing algorithm"))?;

    let mut credential = None;
    let mut signed_headers = None;
    let mut signature = None;

    for part in rest.split(',') {
        let part = part.trim();
        if let Some(cred_str) = part.strip_prefix("Credential=") {
            credential = Some(parse_credential(cred_str)?);
        } else if let Some(headers_str) = part.strip_prefix("SignedHeaders=") {
            signed_headers = Some(headers_str.split(';').map(|s| s.to_lowercase()).collect());
        } else if let Some(sig_str) = part.strip_prefix("Signature=") {
            signature = Some(sig_str.to_string());
        }
    }

    Ok(AuthorizationHeader {
        algorithm: ALGORITHM.to_string(),
        credential: credential
            .ok_or_else(|| incomplete("Authorization header requires 'Credential' parameter"))?,
        signed_headers: signed_headers
            .ok_or_else(|| incomplete("Authorization header requires 'SignedHeaders' parameter"))?,
        signature: signature
            .ok_or_else(|| incomplete("Authorization header requires 'Signature' parameter"))?,
    })
}

/// Parses credential scope.
///
/// Format: `access_key/date/region/service/aws4_request`
fn parse_credential(cred_str: &str) -> Result<CredentialScope, IamApiError> {
    let parts: Vec<&str> = cred_str.split('/').collect();
    if parts.len() != 5 || parts[4] != "aws4_request" {
        return Err(incomplete("Credential should be scoped to a valid region and service"));
    }

    Ok(CredentialScope {
        access_key_id: parts[0].to_string(),
        date: parts[1].to_string(),
        region: parts[2].to_string(),
        service: parts[3].to_string(),
    })
}

fn incomplete(message: &str) -> IamApiError {
    IamApiError::IncompleteSignature(message.to_string())
}

/// Extracts the request timestamp (YYYYMMDDTHHMMSSZ).
///
/// Checks X-Amz-Date first, then falls back to the Date header.
fn extract_timestamp(headers: &HeaderMap) -> Result<String, IamApiError> {
    if let Some(date_str) = headers.get("x-amz-date").and_then(|h| h.to_str().ok()) {
        // X-Amz-Date format: YYYYMMDDTHHMMSSZ (16 characters)
        if date_str.len() == 16 && date_str.chars().nth(8) == Some('T') && date_str.ends_with('Z')
        {
            return Ok(date_str.to_string());
        }
    }

    if let Some(date_str) = headers.get("date").and_then(|h| h.to_str().ok()) {
        if let Ok(dt) = DateTime::parse_from_rfc2822(date_str) {
            return Ok(dt.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ").to_string());
        }
    }

    Err(incomplete(
        "Authorization header requires existence of either a 'X-Amz-Date' or a 'Date' header.",
    ))
}

fn check_clock_skew(timestamp: &str, now: DateTime<Utc>) -> Result<(), IamApiError> {
    let signed_at = NaiveDateTime::parse_from_str(timestamp, "%Y%m%dT%H%M%SZ")
        .map_err(|_| IamApiError::SignatureDoesNotMatch)?
        .and_utc();
    let skew = (now - signed_at).num_seconds().unsigned_abs();
    if skew > MAX_CLOCK_SKEW.as_secs() {
        tracing::debug!("Request timestamp {} outside allowed clock skew", timestamp);
        return Err(IamApiError::SignatureDoesNotMatch);
    }
    Ok(())
}

/// Creates canonical request string.
///
/// Format:
/// ```text
/// METHOD
/// CANONICAL_URI
/// CANONICAL_QUERY_STRING
/// CANONICAL_HEADERS
///
/// SIGNED_HEADERS
/// PAYLOAD_HASH
/// ```
fn create_canonical_request(
    req_data: &SignatureRequestData,
    signed_headers: &[String],
) -> Result<String, IamApiError> {
    let canonical_uri = canonicalize_uri(&req_data.path);
    let canonical_query = canonicalize_query_string(req_data.query.as_deref());
    let canonical_headers = create_canonical_headers(&req_data.headers, signed_headers)?;
    let signed_headers_str = signed_headers.join(";");

    Ok(format!(
        "{}\n{}\n{}\n{}\n\n{}\n{}",
        req_data.method,
        canonical_uri,
        canonical_query,
        canonical_headers,
        signed_headers_str,
        req_data.payload_hash
    ))
}

/// Canonicalizes URI path: each segment is decoded once and re-encoded.
fn canonicalize_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let encoded: Vec<String> = path
        .split('/')
        .map(|seg| {
            if seg.is_empty() {
                String::new()
            } else {
                percent_encode(&percent_decode(seg))
            }
        })
        .collect();

    let result = encoded.join("/");
    if result.starts_with('/') {
        result
    } else {
        format!("/{}", result)
    }
}

/// Canonicalizes query string.
///
/// According to AWS Signature V4:
/// 1. URL-decode parameter names and values
/// 2. Sort parameters by name, then by value
/// 3. Re-encode using percent-encoding
fn canonicalize_query_string(query: Option<&str>) -> String {
    let query = query.unwrap_or("");
    if query.is_empty() {
        return String::new();
    }

    let mut params: Vec<(String, String)> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = percent_decode(parts.next().unwrap_or(""));
            let value = percent_decode(parts.next().unwrap_or(""));
            (key, value)
        })
        .collect();

    params.sort();

    params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Creates canonical headers string.
fn create_canonical_headers(
    headers: &HeaderMap,
    signed_headers: &[String],
) -> Result<String, IamApiError> {
    let mut header_map: BTreeMap<&str, String> = BTreeMap::new();

    for header_name in signed_headers {
        if let Some(header_value) = headers.get(header_name.as_str()) {
            let value_str =
                header_value.to_str().map_err(|_| IamApiError::SignatureDoesNotMatch)?;
            // Trim whitespace and collapse multiple spaces
            let normalized = value_str.split_whitespace().collect::<Vec<&str>>().join(" ");
            header_map.insert(header_name, normalized);
        }
    }

    let header_lines: Vec<String> =
        header_map.iter().map(|(k, v)| format!("{}:{}", k, v)).collect();

    Ok(header_lines.join("\n"))
}

/// Creates string to sign.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256
/// TIMESTAMP
/// DATE/REGION/SERVICE/aws4_request
/// HASH(CANONICAL_REQUEST)
/// ```
fn create_string_to_sign(
    algorithm: &str,
    timestamp: &str,
    date: &str,
    region: &str,
    service: &str,
    canonical_request: &str,
) -> String {
    let credential_scope = format!("{}/{}/{}/aws4_request", date, region, service);
    let hashed_request = hex::encode(Sha256::digest(canonical_request.as_bytes()));

    format!("{}\n{}\n{}\n{}", algorithm, timestamp, credential_scope, hashed_request)
}

/// Calculates signing key using HMAC-SHA256 chain.
///
/// kSecret = secret access key
/// kDate = HMAC-SHA256(kSecret, date)
/// kRegion = HMAC-SHA256(kDate, region)
/// kService = HMAC-SHA256(kRegion, service)
/// kSigning = HMAC-SHA256(kService, "aws4_request")
fn calculate_signing_key(
    secret_key: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, IamApiError> {
    let k_secret = format!("AWS4{}", secret_key);
    let k_date = hmac_sha256(k_secret.as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, IamApiError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| IamApiError::InternalFailure(format!("HMAC key rejected: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn calculate_signature(signing_key: &[u8], string_to_sign: &str) -> Result<String, IamApiError> {
    Ok(hex::encode(hmac_sha256(signing_key, string_to_sign.as_bytes())?))
}

/// Percent-encodes a string (RFC 3986).
///
/// Only unreserved characters (A-Z, a-z, 0-9, -, _, ., ~) are NOT encoded.
fn percent_encode(s: &str) -> String {
    let mut encoded = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Decodes percent-encoded string (e.g. `%28` → `(`). Invalid escapes are kept as-is.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Some(byte) = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            {
                result.push(byte);
                i += 3;
                continue;
            }
        }
        result.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&result).into_owned()
}

/// Constant-time comparison of byte slices.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}
