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


//! Permission-checked filesystem gateway.
//!
//! Every primitive first walks the path from `/`, requiring search (`x`)
//! permission on each existing ancestor, then checks the bits the
//! operation needs on the target or its parent, and only then delegates
//! to the backend. Nothing is cached between calls.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use metrics::counter;
use tracing::{debug, warn};

use super::backend::{DirEntry, FileStat, FsBackend, Owner};
use super::context::FsContext;
use super::error::FsError;
use super::permission::{check_access, check_sticky, AccessMask};

/// Filesystem gateway enforcing POSIX access rules on behalf of a tenant.
#[derive(Clone)]
pub struct FsGateway {
    default_backend: Arc<dyn FsBackend>,
    backends: HashMap<String, Arc<dyn FsBackend>>,
}

/// Validates and normalizes a tenant-supplied path.
///
/// The path must be absolute; `.` components are dropped and `..` is
/// rejected.
pub fn normalize_path(path: &Path) -> Result<PathBuf, FsError> {
    if !path.is_absolute() {
        return Err(FsError::InvalidPath(format!(
            "{} is not absolute",
            path.display()
        )));
    }
    let mut normalized = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::Normal(part) => normalized.push(part),
            Component::ParentDir | Component::Prefix(_) => {
                return Err(FsError::InvalidPath(format!(
                    "{} contains a parent reference",
                    path.display()
                )))
            }
        }
    }
    Ok(normalized)
}

impl FsGateway {
    /// Create a gateway whose empty backend selector resolves to `default_backend`.
    pub fn new(default_backend: Arc<dyn FsBackend>) -> Self {
        Self {
            default_backend,
            backends: HashMap::new(),
        }
    }

    /// Register a backend under `name`.
    pub fn with_backend(mut self, name: impl Into<String>, backend: Arc<dyn FsBackend>) -> Self {
        self.backends.insert(name.into(), backend);
        self
    }

    fn backend(&self, name: &str) -> Result<&dyn FsBackend, FsError> {
        if name.is_empty() {
            return Ok(self.default_backend.as_ref());
        }
        self.backends
            .get(name)
            .map(|backend| backend.as_ref())
            .ok_or_else(|| FsError::UnknownBackend(name.to_string()))
    }

    /// Times one primitive, logging slow calls and counting denials.
    async fn observe<T, F>(
        &self,
        ctx: &FsContext,
        op: &'static str,
        path: &Path,
        fut: F,
    ) -> Result<T, FsError>
    where
        F: Future<Output = Result<T, FsError>>,
    {
        let started = Instant::now();
        let result = fut.await;
        let elapsed = started.elapsed();

        if elapsed > ctx.warn_threshold {
            warn!(
                "Slow filesystem call: {} {} took {:?} (uid {}, threshold {:?})",
                op,
                path.display(),
                elapsed,
                ctx.uid,
                ctx.warn_threshold
            );
            counter!("fs_slow_calls_total", "op" => op).increment(1);
        }
        if let Err(FsError::AccessDenied(denied)) = &result {
            debug!("{} {} denied for uid {} at {}", op, path.display(), ctx.uid, denied.display());
            counter!("fs_access_denied_total", "op" => op).increment(1);
        }
        result
    }

    /// Requires search permission on every ancestor of `path`.
    ///
    /// Returns the stat of the parent directory, or `None` for `/`.
    async fn traverse(
        &self,
        backend: &dyn FsBackend,
        ctx: &FsContext,
        path: &Path,
    ) -> Result<Option<FileStat>, FsError> {
        let mut ancestors: Vec<&Path> = path.ancestors().skip(1).collect();
        ancestors.reverse();

        let mut parent = None;
        for dir in ancestors {
            let stat = backend.stat(dir).await?;
            if !stat.is_dir() {
                return Err(FsError::NotADirectory(dir.to_path_buf()));
            }
            check_access(ctx, &stat, AccessMask::EXECUTE, dir)?;
            parent = Some(stat);
        }
        Ok(parent)
    }

    /// Like [`traverse`](Self::traverse) but fails on `/`, which has no parent.
    async fn traverse_to_parent(
        &self,
        backend: &dyn FsBackend,
        ctx: &FsContext,
        path: &Path,
    ) -> Result<FileStat, FsError> {
        self.traverse(backend, ctx, path)
            .await?
            .ok_or_else(|| FsError::InvalidPath("operation not permitted on /".to_string()))
    }

    /// Ownership for an object created by `ctx` in `parent`.
    fn new_owner(ctx: &FsContext, parent: &FileStat) -> Owner {
        Owner {
            uid: ctx.uid,
            gid: if parent.is_setgid() { parent.owner_gid } else { ctx.gid },
        }
    }

    /// Stat a path after checking traversal.
    pub async fn stat(&self, ctx: &FsContext, path: impl AsRef<Path>) -> Result<FileStat, FsError> {
        let path = normalize_path(path.as_ref())?;
        self.observe(ctx, "stat", &path, async {
            let backend = self.backend(&ctx.backend)?;
            self.traverse(backend, ctx, &path).await?;
            backend.stat(&path).await
        })
        .await
    }

    /// List a directory. Requires `r-x` on it; a symbolic link is refused.
    pub async fn readdir(
        &self,
        ctx: &FsContext,
        path: impl AsRef<Path>,
    ) -> Result<Vec<DirEntry>, FsError> {
        let path = normalize_path(path.as_ref())?;
        self.observe(ctx, "readdir", &path, async {
            let backend = self.backend(&ctx.backend)?;
            self.traverse(backend, ctx, &path).await?;
            let stat = backend.stat(&path).await?;
            reject_symlink(&stat, &path)?;
            if !stat.is_dir() {
                return Err(FsError::NotADirectory(path.clone()));
            }
            check_access(ctx, &stat, AccessMask::READ | AccessMask::EXECUTE, &path)?;
            backend.read_dir(&path).await
        })
        .await
    }

    /// Create a directory owned by the context. Requires `-wx` on the parent.
    ///
    /// An existing entry is reported as `EEXIST` before the parent's write
    /// bit is checked, as `mkdir(2)` does. `mode` is masked with `0o7777`;
    /// no umask is applied.
    pub async fn mkdir(
        &self,
        ctx: &FsContext,
        path: impl AsRef<Path>,
        mode: u32,
    ) -> Result<(), FsError> {
        let path = normalize_path(path.as_ref())?;
        self.observe(ctx, "mkdir", &path, async {
            let backend = self.backend(&ctx.backend)?;
            let parent = match self.traverse(backend, ctx, &path).await? {
                Some(parent) => parent,
                None => return Err(FsError::AlreadyExists(path.clone())),
            };
            match backend.stat(&path).await {
                Ok(_) => return Err(FsError::AlreadyExists(path.clone())),
                Err(FsError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
            check_parent_write(ctx, &parent, &path)?;
            backend
                .create_dir(&path, mode & 0o7777, Self::new_owner(ctx, &parent))
                .await
        })
        .await
    }

    /// Remove an empty directory. Requires `-wx` on the parent.
    pub async fn rmdir(&self, ctx: &FsContext, path: impl AsRef<Path>) -> Result<(), FsError> {
        let path = normalize_path(path.as_ref())?;
        self.observe(ctx, "rmdir", &path, async {
            let backend = self.backend(&ctx.backend)?;
            let parent = self.traverse_to_parent(backend, ctx, &path).await?;
            let target = backend.stat(&path).await?;
            if !target.is_dir() {
                return Err(FsError::NotADirectory(path.clone()));
            }
            check_parent_write(ctx, &parent, &path)?;
            check_sticky(ctx, &parent, &target, &path)?;
            backend.remove_dir(&path).await
        })
        .await
    }

    /// Read a whole file. Requires `r` on it; a symbolic link is refused.
    pub async fn read_file(
        &self,
        ctx: &FsContext,
        path: impl AsRef<Path>,
    ) -> Result<Vec<u8>, FsError> {
        let path = normalize_path(path.as_ref())?;
        self.observe(ctx, "read_file", &path, async {
            let backend = self.backend(&ctx.backend)?;
            self.traverse(backend, ctx, &path).await?;
            let stat = backend.stat(&path).await?;
            reject_symlink(&stat, &path)?;
            if stat.is_dir() {
                return Err(FsError::IsADirectory(path.clone()));
            }
            check_access(ctx, &stat, AccessMask::READ, &path)?;
            backend.read_file(&path).await
        })
        .await
    }

    /// Write a whole file.
    ///
    /// Overwriting requires `w` on the file; creating requires `-wx` on the
    /// parent and assigns `mode` and the context's ownership.
    pub async fn write_file(
        &self,
        ctx: &FsContext,
        path: impl AsRef<Path>,
        data: &[u8],
        mode: u32,
    ) -> Result<(), FsError> {
        let path = normalize_path(path.as_ref())?;
        self.observe(ctx, "write_file", &path, async {
            let backend = self.backend(&ctx.backend)?;
            let parent = self.traverse_to_parent(backend, ctx, &path).await?;
            match backend.stat(&path).await {
                Ok(stat) if stat.is_symlink() => Err(FsError::SymlinkLoop(path.clone())),
                Ok(stat) if stat.is_dir() => Err(FsError::IsADirectory(path.clone())),
                Ok(stat) => {
                    check_access(ctx, &stat, AccessMask::WRITE, &path)?;
                    let owner = Owner {
                        uid: stat.owner_uid,
                        gid: stat.owner_gid,
                    };
                    backend.write_file(&path, data, stat.mode, owner).await
                }
                Err(FsError::NotFound(_)) => {
                    check_parent_write(ctx, &parent, &path)?;
                    backend
                        .write_file(&path, data, mode & 0o7777, Self::new_owner(ctx, &parent))
                        .await
                }
                Err(e) => Err(e),
            }
        })
        .await
    }

    /// Remove a non-directory entry. Requires `-wx` on the parent.
    pub async fn unlink(&self, ctx: &FsContext, path: impl AsRef<Path>) -> Result<(), FsError> {
        let path = normalize_path(path.as_ref())?;
        self.observe(ctx, "unlink", &path, async {
            let backend = self.backend(&ctx.backend)?;
            let parent = self.traverse_to_parent(backend, ctx, &path).await?;
            let target = backend.stat(&path).await?;
            if target.is_dir() {
                return Err(FsError::IsADirectory(path.clone()));
            }
            check_parent_write(ctx, &parent, &path)?;
            check_sticky(ctx, &parent, &target, &path)?;
            backend.remove_file(&path).await
        })
        .await
    }

    /// Move an entry. Requires `-wx` on both parent directories.
    pub async fn rename(
        &self,
        ctx: &FsContext,
        from: impl AsRef<Path>,
        to: impl AsRef<Path>,
    ) -> Result<(), FsError> {
        let from = normalize_path(from.as_ref())?;
        let to = normalize_path(to.as_ref())?;
        self.observe(ctx, "rename", &from, async {
            let backend = self.backend(&ctx.backend)?;
            let from_parent = self.traverse_to_parent(backend, ctx, &from).await?;
            let to_parent = self.traverse_to_parent(backend, ctx, &to).await?;

            let source = backend.stat(&from).await?;
            check_parent_write(ctx, &from_parent, &from)?;
            check_parent_write(ctx, &to_parent, &to)?;
            check_sticky(ctx, &from_parent, &source, &from)?;
            match backend.stat(&to).await {
                Ok(existing) => check_sticky(ctx, &to_parent, &existing, &to)?,
                Err(FsError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
            backend.rename(&from, &to).await
        })
        .await
    }

    /// Change ownership without a permission check.
    ///
    /// Administrative primitive used when provisioning tenant directories;
    /// `backend` selects the backend the same way a context does.
    pub async fn chown(
        &self,
        backend: &str,
        path: impl AsRef<Path>,
        uid: u32,
        gid: u32,
    ) -> Result<(), FsError> {
        let path = normalize_path(path.as_ref())?;
        debug!("chown {} to {}:{}", path.display(), uid, gid);
        self.backend(backend)?.chown(&path, uid, gid).await
    }
}

/// Symbolic links are never read or written through.
fn reject_symlink(stat: &FileStat, path: &Path) -> Result<(), FsError> {
    if stat.is_symlink() {
        return Err(FsError::SymlinkLoop(path.to_path_buf()));
    }
    Ok(())
}

/// Creating or removing entries needs write and search on the directory.
fn check_parent_write(ctx: &FsContext, parent: &FileStat, path: &Path) -> Result<(), FsError> {
    let parent_path = path.parent().unwrap_or(Path::new("/"));
    check_access(ctx, parent, AccessMask::WRITE | AccessMask::EXECUTE, parent_path)
}
