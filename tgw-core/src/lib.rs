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


//! TGW Core - identity record persistence.
//!
//! This crate provides the storage layer underneath the IAM features:
//! - `IdentityBackend` trait with atomic write batches
//! - redb-backed durable backend
//! - in-memory backend for tests and ephemeral deployments

pub mod error;
pub mod storage;

pub use error::StorageError;
pub use storage::{IdentityBackend, MemoryBackend, Mutation, RedbBackend, WriteBatch};
