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


//! Identity backend trait and write batches.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

/// A single change inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Insert or overwrite `key`.
    Put {
        /// Record key.
        key: String,
        /// Serialized record.
        value: Vec<u8>,
    },
    /// Remove `key` if present.
    Delete {
        /// Record key.
        key: String,
    },
}

impl Mutation {
    /// Returns the key this mutation touches.
    pub fn key(&self) -> &str {
        match self {
            Mutation::Put { key, .. } | Mutation::Delete { key } => key,
        }
    }
}

/// Ordered set of mutations applied in one transaction.
///
/// Backends must make either every mutation visible or none of them.
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    mutations: Vec<Mutation>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes `record` as JSON and stages a put.
    pub fn put_json<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        record: &T,
    ) -> Result<&mut Self, StorageError> {
        let value = serde_json::to_vec(record)?;
        self.mutations.push(Mutation::Put {
            key: key.into(),
            value,
        });
        Ok(self)
    }

    /// Stages a raw put.
    pub fn put_raw(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.mutations.push(Mutation::Put {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Stages a delete.
    pub fn delete(&mut self, key: impl Into<String>) -> &mut Self {
        self.mutations.push(Mutation::Delete { key: key.into() });
        self
    }

    /// Returns true if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Returns the number of staged mutations.
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// Consumes the batch, returning its mutations in staging order.
    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }
}

/// Key-value persistence for identity records.
///
/// Keys are flat strings; callers encode hierarchy with `/`-separated prefixes.
/// Implementations must be safe to share across tasks.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Reads a single record.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Lists every record whose key starts with `prefix`, in key order.
    async fn list(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError>;

    /// Applies all mutations of `batch` atomically.
    async fn apply(&self, batch: WriteBatch) -> Result<(), StorageError>;
}

/// Reads a record and decodes it from JSON.
pub async fn get_json<T: DeserializeOwned>(
    backend: &dyn IdentityBackend,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match backend.get(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Lists records under `prefix` and decodes each from JSON.
pub async fn list_json<T: DeserializeOwned>(
    backend: &dyn IdentityBackend,
    prefix: &str,
) -> Result<Vec<T>, StorageError> {
    backend
        .list(prefix)
        .await?
        .into_iter()
        .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(StorageError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_batch_preserves_order() {
        let mut batch = WriteBatch::new();
        batch.put_raw("a", b"1".to_vec()).delete("b");
        batch.put_json("c", &vec![1, 2, 3]).unwrap();

        assert_eq!(batch.len(), 3);
        let keys: Vec<String> =
            batch.into_mutations().iter().map(|m| m.key().to_string()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_batch() {
        assert!(WriteBatch::new().is_empty());
    }
}
