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


//! Filesystem backend abstraction.
//!
//! Backends are thin syscall equivalents: they perform the operation
//! they are asked to and never evaluate permissions. Symbolic links are
//! not followed.

use async_trait::async_trait;
use std::path::Path;

use super::error::FsError;

/// Type of a filesystem object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    File,
    Symlink,
    Other,
}

/// Attributes read from the filesystem for a permission decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub owner_uid: u32,
    pub owner_gid: u32,
    /// Permission bits including setuid/setgid/sticky (`0o7777` mask)
    pub mode: u32,
    pub kind: FileKind,
    pub size: u64,
}

impl FileStat {
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }

    /// Sticky bit (restricted deletion) set.
    pub fn is_sticky(&self) -> bool {
        self.mode & 0o1000 != 0
    }

    /// Setgid bit set; new entries inherit the directory's group.
    pub fn is_setgid(&self) -> bool {
        self.mode & 0o2000 != 0
    }
}

/// Ownership assigned to newly created objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

/// Directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileKind,
}

/// Filesystem primitives the gateway delegates to after a permission check.
#[async_trait]
pub trait FsBackend: Send + Sync {
    /// Reads owner, group, mode and type of `path` (lstat semantics).
    async fn stat(&self, path: &Path) -> Result<FileStat, FsError>;

    /// Lists directory entries sorted by name, excluding `.` and `..`.
    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError>;

    /// Creates a directory with exactly `mode` (no umask) owned by `owner`.
    async fn create_dir(&self, path: &Path, mode: u32, owner: Owner) -> Result<(), FsError>;

    /// Removes an empty directory.
    async fn remove_dir(&self, path: &Path) -> Result<(), FsError>;

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError>;

    /// Replaces the content of `path`, creating it if absent.
    ///
    /// `mode` and `owner` only apply when the file is created.
    async fn write_file(
        &self,
        path: &Path,
        data: &[u8],
        mode: u32,
        owner: Owner,
    ) -> Result<(), FsError>;

    async fn remove_file(&self, path: &Path) -> Result<(), FsError>;

    /// Moves `from` to `to`, replacing `to` if the types are compatible.
    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Changes ownership of `path`.
    async fn chown(&self, path: &Path, uid: u32, gid: u32) -> Result<(), FsError>;
}
