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


//! Filesystem gateway errors.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors returned by the permission-checked filesystem gateway.
///
/// Each variant maps to the POSIX errno a native caller would observe.
#[derive(Error, Debug)]
pub enum FsError {
    /// Permission bits of the resolved class do not grant the access
    #[error("Permission denied: {}", .0.display())]
    AccessDenied(PathBuf),

    #[error("No such file or directory: {}", .0.display())]
    NotFound(PathBuf),

    #[error("File exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Is a directory: {}", .0.display())]
    IsADirectory(PathBuf),

    #[error("Directory not empty: {}", .0.display())]
    NotEmpty(PathBuf),

    /// Target is a symbolic link; links are never followed
    #[error("Too many levels of symbolic links: {}", .0.display())]
    SymlinkLoop(PathBuf),

    /// Relative path, `..` component or other malformed input
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Context selects a backend that is not registered
    #[error("Unknown filesystem backend: {0}")]
    UnknownBackend(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FsError {
    /// POSIX errno name for this error.
    pub fn errno(&self) -> &'static str {
        match self {
            FsError::AccessDenied(_) => "EACCES",
            FsError::NotFound(_) => "ENOENT",
            FsError::AlreadyExists(_) => "EEXIST",
            FsError::NotADirectory(_) => "ENOTDIR",
            FsError::IsADirectory(_) => "EISDIR",
            FsError::NotEmpty(_) => "ENOTEMPTY",
            FsError::SymlinkLoop(_) => "ELOOP",
            FsError::InvalidPath(_) | FsError::UnknownBackend(_) => "EINVAL",
            FsError::Io(_) => "EIO",
        }
    }

    /// Classify an I/O error raised while operating on `path`.
    pub fn from_io(err: io::Error, path: &Path) -> Self {
        let path = path.to_path_buf();
        #[cfg(unix)]
        if err.raw_os_error() == Some(libc::ELOOP) {
            return FsError::SymlinkLoop(path);
        }
        match err.kind() {
            io::ErrorKind::NotFound => FsError::NotFound(path),
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists(path),
            io::ErrorKind::PermissionDenied => FsError::AccessDenied(path),
            io::ErrorKind::NotADirectory => FsError::NotADirectory(path),
            io::ErrorKind::IsADirectory => FsError::IsADirectory(path),
            io::ErrorKind::DirectoryNotEmpty => FsError::NotEmpty(path),
            _ => FsError::Io(err),
        }
    }
}
