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

//! TGW API Layer - AWS IAM Query API over HTTP
//!
//! This crate provides the HTTP surface of the tenant gateway's identity core:
//! - AWS IAM Query protocol (users and access keys)
//! - AWS Signature V4 authentication
//! - XML responses and error documents
//! - Middleware for auth and metrics

pub mod auth;
pub mod handlers;
pub mod iam;
pub mod middleware;
pub mod server;

pub use auth::signature_v4::verify_signature_v4;
pub use iam::{IamApiError, IamRequest};
pub use middleware::IamCaller;
pub use server::{create_router, AppState};
