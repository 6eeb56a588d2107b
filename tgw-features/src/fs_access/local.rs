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


//! Host filesystem backend.

use async_trait::async_trait;
use std::fs::Permissions;
use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use super::backend::{DirEntry, FileKind, FileStat, FsBackend, Owner};
use super::error::FsError;

/// Backend delegating to the host filesystem through `tokio::fs`.
///
/// Newly created objects are chowned to the requesting identity. Hosts
/// where the process cannot chown keep the process's ownership. Files are
/// opened with `O_NOFOLLOW`, so a link swapped in after the gateway's
/// check fails with `ELOOP`.
#[derive(Debug, Clone, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

fn kind_of(file_type: std::fs::FileType) -> FileKind {
    if file_type.is_dir() {
        FileKind::Directory
    } else if file_type.is_file() {
        FileKind::File
    } else if file_type.is_symlink() {
        FileKind::Symlink
    } else {
        FileKind::Other
    }
}

/// Open options refusing a symbolic link as the final component.
fn open_no_follow() -> fs::OpenOptions {
    let mut options = fs::OpenOptions::new();
    options.custom_flags(libc::O_NOFOLLOW);
    options
}

async fn chown_path(path: &Path, uid: u32, gid: u32) -> io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || std::os::unix::fs::chown(&path, Some(uid), Some(gid)))
        .await
        .map_err(io::Error::other)?
}

/// Assigns ownership and exact mode to a freshly created object.
async fn finish_create(path: &Path, mode: u32, owner: Owner) -> Result<(), FsError> {
    match chown_path(path, owner.uid, owner.gid).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            debug!(
                "Cannot chown {} to {}:{} ({}), keeping process ownership",
                path.display(),
                owner.uid,
                owner.gid,
                e
            );
        }
        Err(e) => return Err(FsError::from_io(e, path)),
    }
    // chown clears setuid/setgid, so the mode goes last
    fs::set_permissions(path, Permissions::from_mode(mode & 0o7777))
        .await
        .map_err(|e| FsError::from_io(e, path))
}

#[async_trait]
impl FsBackend for LocalFs {
    async fn stat(&self, path: &Path) -> Result<FileStat, FsError> {
        let metadata = fs::symlink_metadata(path)
            .await
            .map_err(|e| FsError::from_io(e, path))?;
        Ok(FileStat {
            owner_uid: metadata.uid(),
            owner_gid: metadata.gid(),
            mode: metadata.mode() & 0o7777,
            kind: kind_of(metadata.file_type()),
            size: metadata.size(),
        })
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError> {
        if self.stat(path).await?.is_symlink() {
            return Err(FsError::SymlinkLoop(path.to_path_buf()));
        }
        let mut dir = fs::read_dir(path)
            .await
            .map_err(|e| FsError::from_io(e, path))?;
        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| FsError::from_io(e, path))? {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| FsError::from_io(e, &entry.path()))?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind: kind_of(file_type),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn create_dir(&self, path: &Path, mode: u32, owner: Owner) -> Result<(), FsError> {
        fs::create_dir(path)
            .await
            .map_err(|e| FsError::from_io(e, path))?;
        finish_create(path, mode, owner).await
    }

    async fn remove_dir(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_dir(path)
            .await
            .map_err(|e| FsError::from_io(e, path))
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        let mut file = open_no_follow()
            .read(true)
            .open(path)
            .await
            .map_err(|e| FsError::from_io(e, path))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .await
            .map_err(|e| FsError::from_io(e, path))?;
        Ok(data)
    }

    async fn write_file(
        &self,
        path: &Path,
        data: &[u8],
        mode: u32,
        owner: Owner,
    ) -> Result<(), FsError> {
        let (mut file, created) = match open_no_follow()
            .write(true)
            .create_new(true)
            .open(path)
            .await
        {
            Ok(file) => (file, true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let file = open_no_follow()
                    .write(true)
                    .truncate(true)
                    .open(path)
                    .await
                    .map_err(|e| FsError::from_io(e, path))?;
                (file, false)
            }
            Err(e) => return Err(FsError::from_io(e, path)),
        };
        file.write_all(data)
            .await
            .map_err(|e| FsError::from_io(e, path))?;
        file.flush().await.map_err(|e| FsError::from_io(e, path))?;
        if created {
            finish_create(path, mode, owner).await?;
        }
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_file(path)
            .await
            .map_err(|e| FsError::from_io(e, path))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        fs::rename(from, to).await.map_err(|e| {
            let path: PathBuf = if e.kind() == io::ErrorKind::NotFound {
                from.to_path_buf()
            } else {
                to.to_path_buf()
            };
            FsError::from_io(e, &path)
        })
    }

    async fn chown(&self, path: &Path, uid: u32, gid: u32) -> Result<(), FsError> {
        chown_path(path, uid, gid)
            .await
            .map_err(|e| FsError::from_io(e, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn process_owner(dir: &Path) -> Owner {
        let metadata = std::fs::metadata(dir).unwrap();
        Owner {
            uid: metadata.uid(),
            gid: metadata.gid(),
        }
    }

    #[tokio::test]
    async fn test_create_dir_exact_mode() {
        let tmp = TempDir::new().unwrap();
        let owner = process_owner(tmp.path());
        let fs = LocalFs::new();

        let path = tmp.path().join("root_dir");
        fs.create_dir(&path, 0o770, owner).await.unwrap();

        let stat = fs.stat(&path).await.unwrap();
        assert!(stat.is_dir());
        assert_eq!(stat.mode, 0o770);
        assert_eq!(stat.owner_uid, owner.uid);
    }

    #[tokio::test]
    async fn test_write_read_remove() {
        let tmp = TempDir::new().unwrap();
        let owner = process_owner(tmp.path());
        let fs = LocalFs::new();
        let path = tmp.path().join("file.txt");

        fs.write_file(&path, b"hello", 0o640, owner).await.unwrap();
        fs.write_file(&path, b"bye", 0o600, owner).await.unwrap();

        assert_eq!(fs.read_file(&path).await.unwrap(), b"bye");
        assert_eq!(fs.stat(&path).await.unwrap().mode, 0o640);

        fs.remove_file(&path).await.unwrap();
        let err = fs.stat(&path).await.unwrap_err();
        assert_eq!(err.errno(), "ENOENT");
    }

    #[tokio::test]
    async fn test_symlink_is_not_followed() {
        let tmp = TempDir::new().unwrap();
        let owner = process_owner(tmp.path());
        let fs = LocalFs::new();
        let secret = tmp.path().join("secret");
        let link = tmp.path().join("link");
        fs.write_file(&secret, b"TOP-SECRET", 0o600, owner).await.unwrap();
        std::os::unix::fs::symlink(&secret, &link).unwrap();

        assert_eq!(fs.stat(&link).await.unwrap().kind, FileKind::Symlink);
        assert_eq!(fs.read_file(&link).await.unwrap_err().errno(), "ELOOP");
        let err = fs.write_file(&link, b"PWNED", 0o666, owner).await.unwrap_err();
        assert_eq!(err.errno(), "ELOOP");
        assert_eq!(std::fs::read(&secret).unwrap(), b"TOP-SECRET");

        let dir_link = tmp.path().join("dir_link");
        std::os::unix::fs::symlink(tmp.path(), &dir_link).unwrap();
        assert_eq!(fs.read_dir(&dir_link).await.unwrap_err().errno(), "ELOOP");
    }

    #[tokio::test]
    async fn test_read_dir_sorted() {
        let tmp = TempDir::new().unwrap();
        let owner = process_owner(tmp.path());
        let fs = LocalFs::new();
        fs.create_dir(&tmp.path().join("b"), 0o755, owner).await.unwrap();
        fs.write_file(&tmp.path().join("a"), b"", 0o644, owner).await.unwrap();

        let entries = fs.read_dir(tmp.path()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a");
        assert_eq!(entries[0].kind, FileKind::File);
        assert_eq!(entries[1].kind, FileKind::Directory);
    }
}
