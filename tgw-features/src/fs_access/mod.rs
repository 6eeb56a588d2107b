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


//! Permission-checked filesystem access.
//!
//! Resolves an identity context against on-disk owner, group and mode
//! before any filesystem primitive runs.

pub mod backend;
pub mod context;
pub mod error;
pub mod gateway;
#[cfg(unix)]
pub mod local;
pub mod memory;
pub mod permission;

pub use backend::{DirEntry, FileKind, FileStat, FsBackend, Owner};
pub use context::{FsContext, DEFAULT_WARN_THRESHOLD};
pub use error::FsError;
pub use gateway::{normalize_path, FsGateway};
#[cfg(unix)]
pub use local::LocalFs;
pub use memory::MemoryFs;
pub use permission::{
    check_access, check_sticky, class_bits, is_permitted, resolve_class, AccessMask,
    PermissionClass,
};
