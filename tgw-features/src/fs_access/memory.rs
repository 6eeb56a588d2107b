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


//! In-process filesystem backend.
//!
//! Keeps a flat map of absolute paths to nodes. Used by tests and dry runs.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::backend::{DirEntry, FileKind, FileStat, FsBackend, Owner};
use super::error::FsError;

#[derive(Debug, Clone)]
struct Node {
    stat: FileStat,
    data: Vec<u8>,
}

impl Node {
    fn directory(mode: u32, owner: Owner) -> Self {
        Node {
            stat: FileStat {
                owner_uid: owner.uid,
                owner_gid: owner.gid,
                mode: mode & 0o7777,
                kind: FileKind::Directory,
                size: 0,
            },
            data: Vec::new(),
        }
    }

    fn file(data: Vec<u8>, mode: u32, owner: Owner) -> Self {
        Node {
            stat: FileStat {
                owner_uid: owner.uid,
                owner_gid: owner.gid,
                mode: mode & 0o7777,
                kind: FileKind::File,
                size: data.len() as u64,
            },
            data,
        }
    }
}

/// In-memory filesystem with a `root:root 0755` root directory.
pub struct MemoryFs {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            PathBuf::from("/"),
            Node::directory(0o755, Owner { uid: 0, gid: 0 }),
        );
        Self {
            nodes: RwLock::new(nodes),
        }
    }

    /// Changes the mode of an existing node.
    pub async fn set_mode(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        let mut nodes = self.nodes.write().await;
        let node = nodes
            .get_mut(path)
            .ok_or_else(|| FsError::NotFound(path.to_path_buf()))?;
        node.stat.mode = mode & 0o7777;
        Ok(())
    }
}

fn children<'a>(
    nodes: &'a BTreeMap<PathBuf, Node>,
    dir: &'a Path,
) -> impl Iterator<Item = (&'a PathBuf, &'a Node)> + 'a {
    nodes
        .iter()
        .filter(move |(path, _)| path.parent() == Some(dir))
}

fn require_parent_dir(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> Result<(), FsError> {
    let parent = path
        .parent()
        .ok_or_else(|| FsError::InvalidPath(path.display().to_string()))?;
    match nodes.get(parent) {
        Some(node) if node.stat.is_dir() => Ok(()),
        Some(_) => Err(FsError::NotADirectory(parent.to_path_buf())),
        None => Err(FsError::NotFound(parent.to_path_buf())),
    }
}

#[async_trait]
impl FsBackend for MemoryFs {
    async fn stat(&self, path: &Path) -> Result<FileStat, FsError> {
        let nodes = self.nodes.read().await;
        nodes
            .get(path)
            .map(|node| node.stat.clone())
            .ok_or_else(|| FsError::NotFound(path.to_path_buf()))
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError> {
        let nodes = self.nodes.read().await;
        match nodes.get(path) {
            Some(node) if node.stat.is_dir() => {}
            Some(_) => return Err(FsError::NotADirectory(path.to_path_buf())),
            None => return Err(FsError::NotFound(path.to_path_buf())),
        }

        let mut entries: Vec<DirEntry> = children(&nodes, path)
            .filter_map(|(child, node)| {
                child.file_name().map(|name| DirEntry {
                    name: name.to_string_lossy().into_owned(),
                    kind: node.stat.kind,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn create_dir(&self, path: &Path, mode: u32, owner: Owner) -> Result<(), FsError> {
        let mut nodes = self.nodes.write().await;
        if nodes.contains_key(path) {
            return Err(FsError::AlreadyExists(path.to_path_buf()));
        }
        require_parent_dir(&nodes, path)?;
        nodes.insert(path.to_path_buf(), Node::directory(mode, owner));
        Ok(())
    }

    async fn remove_dir(&self, path: &Path) -> Result<(), FsError> {
        let mut nodes = self.nodes.write().await;
        match nodes.get(path) {
            Some(node) if node.stat.is_dir() => {}
            Some(_) => return Err(FsError::NotADirectory(path.to_path_buf())),
            None => return Err(FsError::NotFound(path.to_path_buf())),
        }
        if path.parent().is_none() || children(&nodes, path).next().is_some() {
            return Err(FsError::NotEmpty(path.to_path_buf()));
        }
        nodes.remove(path);
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        let nodes = self.nodes.read().await;
        match nodes.get(path) {
            Some(node) if node.stat.is_dir() => Err(FsError::IsADirectory(path.to_path_buf())),
            Some(node) => Ok(node.data.clone()),
            None => Err(FsError::NotFound(path.to_path_buf())),
        }
    }

    async fn write_file(
        &self,
        path: &Path,
        data: &[u8],
        mode: u32,
        owner: Owner,
    ) -> Result<(), FsError> {
        let mut nodes = self.nodes.write().await;
        if let Some(node) = nodes.get_mut(path) {
            if node.stat.is_dir() {
                return Err(FsError::IsADirectory(path.to_path_buf()));
            }
            node.data = data.to_vec();
            node.stat.size = data.len() as u64;
            return Ok(());
        }
        require_parent_dir(&nodes, path)?;
        nodes.insert(path.to_path_buf(), Node::file(data.to_vec(), mode, owner));
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        let mut nodes = self.nodes.write().await;
        match nodes.get(path) {
            Some(node) if node.stat.is_dir() => Err(FsError::IsADirectory(path.to_path_buf())),
            Some(_) => {
                nodes.remove(path);
                Ok(())
            }
            None => Err(FsError::NotFound(path.to_path_buf())),
        }
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let mut nodes = self.nodes.write().await;
        let source_is_dir = match nodes.get(from) {
            Some(node) => node.stat.is_dir(),
            None => return Err(FsError::NotFound(from.to_path_buf())),
        };
        if from == to {
            return Ok(());
        }
        if to.starts_with(from) {
            return Err(FsError::InvalidPath(format!(
                "cannot move {} into itself",
                from.display()
            )));
        }
        require_parent_dir(&nodes, to)?;

        if let Some(existing) = nodes.get(to) {
            match (source_is_dir, existing.stat.is_dir()) {
                (true, false) => return Err(FsError::NotADirectory(to.to_path_buf())),
                (false, true) => return Err(FsError::IsADirectory(to.to_path_buf())),
                (true, true) if children(&nodes, to).next().is_some() => {
                    return Err(FsError::NotEmpty(to.to_path_buf()))
                }
                _ => {}
            }
            nodes.remove(to);
        }

        let moved: Vec<PathBuf> = nodes
            .keys()
            .filter(|path| path.starts_with(from))
            .cloned()
            .collect();
        for old in moved {
            if let Some(node) = nodes.remove(&old) {
                let new = match old.strip_prefix(from) {
                    Ok(rest) if rest.as_os_str().is_empty() => to.to_path_buf(),
                    Ok(rest) => to.join(rest),
                    Err(_) => continue,
                };
                nodes.insert(new, node);
            }
        }
        Ok(())
    }

    async fn chown(&self, path: &Path, uid: u32, gid: u32) -> Result<(), FsError> {
        let mut nodes = self.nodes.write().await;
        let node = nodes
            .get_mut(path)
            .ok_or_else(|| FsError::NotFound(path.to_path_buf()))?;
        node.stat.owner_uid = uid;
        node.stat.owner_gid = gid;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: Owner = Owner { uid: 0, gid: 0 };

    #[tokio::test]
    async fn test_root_exists() {
        let fs = MemoryFs::new();
        let stat = fs.stat(Path::new("/")).await.unwrap();
        assert!(stat.is_dir());
        assert_eq!(stat.mode, 0o755);
        assert_eq!(stat.owner_uid, 0);
    }

    #[tokio::test]
    async fn test_create_dir_requires_parent() {
        let fs = MemoryFs::new();
        let err = fs.create_dir(Path::new("/a/b"), 0o755, ROOT).await.unwrap_err();
        assert_eq!(err.errno(), "ENOENT");

        fs.create_dir(Path::new("/a"), 0o755, ROOT).await.unwrap();
        fs.create_dir(Path::new("/a/b"), 0o755, ROOT).await.unwrap();
        let err = fs.create_dir(Path::new("/a/b"), 0o755, ROOT).await.unwrap_err();
        assert_eq!(err.errno(), "EEXIST");
    }

    #[tokio::test]
    async fn test_read_dir_lists_direct_children_only() {
        let fs = MemoryFs::new();
        fs.create_dir(Path::new("/a"), 0o755, ROOT).await.unwrap();
        fs.create_dir(Path::new("/a/z"), 0o755, ROOT).await.unwrap();
        fs.create_dir(Path::new("/a/z/deep"), 0o755, ROOT).await.unwrap();
        fs.write_file(Path::new("/a/b.txt"), b"hi", 0o644, ROOT).await.unwrap();

        let names: Vec<String> = fs
            .read_dir(Path::new("/a"))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["b.txt", "z"]);
    }

    #[tokio::test]
    async fn test_write_keeps_owner_of_existing_file() {
        let fs = MemoryFs::new();
        let owner = Owner { uid: 10, gid: 20 };
        fs.write_file(Path::new("/f"), b"one", 0o600, owner).await.unwrap();
        fs.write_file(Path::new("/f"), b"three", 0o777, ROOT).await.unwrap();

        let stat = fs.stat(Path::new("/f")).await.unwrap();
        assert_eq!((stat.owner_uid, stat.owner_gid, stat.mode), (10, 20, 0o600));
        assert_eq!(stat.size, 5);
        assert_eq!(fs.read_file(Path::new("/f")).await.unwrap(), b"three");
    }

    #[tokio::test]
    async fn test_remove_dir_not_empty() {
        let fs = MemoryFs::new();
        fs.create_dir(Path::new("/a"), 0o755, ROOT).await.unwrap();
        fs.write_file(Path::new("/a/f"), b"", 0o644, ROOT).await.unwrap();

        let err = fs.remove_dir(Path::new("/a")).await.unwrap_err();
        assert_eq!(err.errno(), "ENOTEMPTY");
        fs.remove_file(Path::new("/a/f")).await.unwrap();
        fs.remove_dir(Path::new("/a")).await.unwrap();
    }

    #[tokio::test]
    async fn test_rename_moves_subtree() {
        let fs = MemoryFs::new();
        fs.create_dir(Path::new("/a"), 0o755, ROOT).await.unwrap();
        fs.write_file(Path::new("/a/f"), b"x", 0o644, ROOT).await.unwrap();

        fs.rename(Path::new("/a"), Path::new("/b")).await.unwrap();
        assert!(fs.stat(Path::new("/a")).await.is_err());
        assert_eq!(fs.read_file(Path::new("/b/f")).await.unwrap(), b"x");

        let err = fs.rename(Path::new("/b"), Path::new("/b/inner")).await.unwrap_err();
        assert_eq!(err.errno(), "EINVAL");
    }

    #[tokio::test]
    async fn test_chown() {
        let fs = MemoryFs::new();
        fs.create_dir(Path::new("/a"), 0o770, ROOT).await.unwrap();
        fs.chown(Path::new("/a"), 1572, 1572).await.unwrap();
        let stat = fs.stat(Path::new("/a")).await.unwrap();
        assert_eq!((stat.owner_uid, stat.owner_gid), (1572, 1572));
    }
}
