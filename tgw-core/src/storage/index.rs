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


//! Durable identity backend on top of redb.

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use tokio::task;

use super::engine::{IdentityBackend, Mutation, WriteBatch};
use crate::error::StorageError;

const IDENTITY_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("identity");

fn db_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::Database(e.to_string())
}

/// redb-backed identity store.
///
/// Every [`WriteBatch`] runs inside a single redb write transaction, so a batch
/// is either fully committed or not visible at all.
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Creates or opens an identity database.
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the redb database file
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(db_path).map_err(db_err)?;

        // redb requires a write transaction to create tables
        let write_txn = db.begin_write().map_err(db_err)?;
        {
            let _table = write_txn.open_table(IDENTITY_TABLE).map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;

        tracing::debug!("Opened identity database at {:?}", db_path);

        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl IdentityBackend for RedbBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let db = self.db.clone();
        let key = key.to_string();

        task::spawn_blocking(move || {
            let read_txn = db.begin_read().map_err(db_err)?;
            let table = read_txn.open_table(IDENTITY_TABLE).map_err(db_err)?;

            // Copy the value out of the AccessGuard before the transaction ends
            let value = table.get(key.as_str()).map_err(db_err)?.map(|v| v.value().to_vec());
            Ok(value)
        })
        .await
        .map_err(db_err)?
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        let db = self.db.clone();
        let prefix = prefix.to_string();

        task::spawn_blocking(move || {
            let read_txn = db.begin_read().map_err(db_err)?;
            let table = read_txn.open_table(IDENTITY_TABLE).map_err(db_err)?;

            // Keys sharing a prefix are contiguous; stop at the first one past it
            let mut results = Vec::new();
            for item in table.range(prefix.as_str()..).map_err(db_err)? {
                let (key, value) = item.map_err(db_err)?;
                let key_str = key.value();
                if !key_str.starts_with(&prefix) {
                    break;
                }
                results.push((key_str.to_string(), value.value().to_vec()));
            }

            Ok(results)
        })
        .await
        .map_err(db_err)?
    }

    async fn apply(&self, batch: WriteBatch) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }

        let db = self.db.clone();
        let mutations = batch.into_mutations();

        task::spawn_blocking(move || {
            let write_txn = db.begin_write().map_err(db_err)?;
            {
                let mut table = write_txn.open_table(IDENTITY_TABLE).map_err(db_err)?;
                for mutation in &mutations {
                    match mutation {
                        Mutation::Put { key, value } => {
                            table.insert(key.as_str(), value.as_slice()).map_err(db_err)?;
                        }
                        Mutation::Delete { key } => {
                            table.remove(key.as_str()).map_err(db_err)?;
                        }
                    }
                }
            }
            // Dropping an uncommitted transaction aborts it, so an error above
            // leaves the database untouched.
            write_txn.commit().map_err(db_err)?;

            Ok::<(), StorageError>(())
        })
        .await
        .map_err(db_err)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_redb_put_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let backend = RedbBackend::open(&temp_dir.path().join("identity.redb")).unwrap();

        let mut batch = WriteBatch::new();
        batch.put_raw("user/1/a", b"alpha".to_vec());
        backend.apply(batch).await.unwrap();

        let value = backend.get("user/1/a").await.unwrap();
        assert_eq!(value.as_deref(), Some(&b"alpha"[..]));
        assert!(backend.get("user/1/missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redb_batch_delete_and_put() {
        let temp_dir = TempDir::new().unwrap();
        let backend = RedbBackend::open(&temp_dir.path().join("identity.redb")).unwrap();

        let mut batch = WriteBatch::new();
        batch.put_raw("name/old", b"id".to_vec());
        backend.apply(batch).await.unwrap();

        let mut rename = WriteBatch::new();
        rename.delete("name/old").put_raw("name/new", b"id".to_vec());
        backend.apply(rename).await.unwrap();

        assert!(backend.get("name/old").await.unwrap().is_none());
        assert!(backend.get("name/new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_redb_list_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let backend = RedbBackend::open(&temp_dir.path().join("identity.redb")).unwrap();

        let mut batch = WriteBatch::new();
        batch
            .put_raw("user/1/a", b"1".to_vec())
            .put_raw("user/1/b", b"2".to_vec())
            .put_raw("user/2/c", b"3".to_vec());
        backend.apply(batch).await.unwrap();

        let results = backend.list("user/1/").await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().any(|(k, _)| k == "user/1/a"));
        assert!(results.iter().any(|(k, _)| k == "user/1/b"));
    }

    #[tokio::test]
    async fn test_redb_list_prefix_neighbours() {
        let temp_dir = TempDir::new().unwrap();
        let backend = RedbBackend::open(&temp_dir.path().join("identity.redb")).unwrap();

        let mut batch = WriteBatch::new();
        batch
            .put_raw("user/0/z", b"0".to_vec())
            .put_raw("user/1", b"bare".to_vec())
            .put_raw("user/1/b", b"2".to_vec())
            .put_raw("user/1/a", b"1".to_vec())
            .put_raw("user/10/x", b"10".to_vec())
            .put_raw("user/2/c", b"3".to_vec());
        backend.apply(batch).await.unwrap();

        let keys: Vec<String> = backend
            .list("user/1/")
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["user/1/a", "user/1/b"]);

        assert_eq!(backend.list("").await.unwrap().len(), 6);
        assert!(backend.list("zzz/").await.unwrap().is_empty());
    }
}
