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


//! TGW Features
//!
//! This crate provides the identity and access-control core of the gateway:
//! - IAM users and access keys scoped to a parent account
//! - Access-key authentication and identity-context resolution
//! - POSIX permission evaluation in user space
//! - Permission-checked filesystem gateway

pub mod fs_access;
pub mod iam;

#[cfg(unix)]
pub use fs_access::LocalFs;
pub use fs_access::{
    check_access, check_sticky, class_bits, is_permitted, normalize_path, resolve_class,
    AccessMask, DirEntry, FileKind, FileStat, FsBackend, FsContext, FsError, FsGateway, MemoryFs,
    Owner, PermissionClass, DEFAULT_WARN_THRESHOLD,
};
pub use iam::{
    is_valid_iam_path, is_valid_username, validate_path, validate_username, AccessKey,
    AccessKeyLastUsedInfo, AccessKeyManager, AccessKeyMetadata, AccessKeyStatus, Account,
    AuthService, AuthenticatedKey, CreatedAccessKey, EntityGuard, EntityLocks, FsIdentity,
    IamError, IamStorage, KeyOwner, LastUsed, Principal, User, DEFAULT_MAX_ACCESS_KEYS_PER_USER,
};
