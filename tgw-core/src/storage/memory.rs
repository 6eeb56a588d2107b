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


//! In-memory identity backend.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::engine::{IdentityBackend, Mutation, WriteBatch};
use crate::error::StorageError;

/// Identity backend kept entirely in memory.
///
/// Each instance is isolated, which makes it the natural choice for tests.
/// Batches are applied under a single write lock.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    records: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn apply(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        for mutation in batch.into_mutations() {
            match mutation {
                Mutation::Put { key, value } => {
                    records.insert(key, value);
                }
                Mutation::Delete { key } => {
                    records.remove(&key);
                }
            }
        }
        Ok(())
    }
}
