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


//! Per-entity mutual exclusion.
//!
//! Mutations of the same user or the same access key are serialized by
//! holding the entity's lock for the whole read-check-write sequence.
//! Distinct entities never contend.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<String, Arc<Mutex<()>>>;

/// Table of named async locks, created on demand and dropped when idle.
#[derive(Clone, Default)]
pub struct EntityLocks {
    table: Arc<LockTable>,
}

/// Held lock on one entity. Released on drop.
pub struct EntityGuard {
    key: String,
    table: Arc<LockTable>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl EntityLocks {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock key for a user, scoped to its account.
    pub fn user_key(account_id: &str, username: &str) -> String {
        format!("user:{}:{}", account_id, username)
    }

    /// Lock key for an access key.
    pub fn access_key_key(access_key_id: &str) -> String {
        format!("key:{}", access_key_id)
    }

    /// Lock key for an account name.
    pub fn account_key(name: &str) -> String {
        format!("account:{}", name)
    }

    /// Acquires the lock for `key`, waiting if another task holds it.
    pub async fn lock(&self, key: &str) -> EntityGuard {
        let mutex = self.table.entry(key.to_string()).or_default().value().clone();
        let guard = mutex.lock_owned().await;
        EntityGuard {
            key: key.to_string(),
            table: self.table.clone(),
            guard: Some(guard),
        }
    }

    /// Acquires several locks in sorted order so concurrent callers cannot deadlock.
    ///
    /// Duplicate keys are locked once.
    pub async fn lock_all(&self, keys: &[String]) -> Vec<EntityGuard> {
        let mut sorted: Vec<&String> = keys.iter().collect();
        sorted.sort();
        sorted.dedup();

        let mut guards = Vec::with_capacity(sorted.len());
        for key in sorted {
            guards.push(self.lock(key).await);
        }
        guards
    }

    /// Number of lock entries currently allocated.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true if no lock entry is allocated.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Drop for EntityGuard {
    fn drop(&mut self) {
        // Release first so the strong count reflects only waiters and the table.
        self.guard.take();
        self.table.remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = EntityLocks::new();
        let in_section = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let in_section = in_section.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("user:1:a").await;
                let now = in_section.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_section.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = EntityLocks::new();
        let _a = locks.lock("user:1:a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("user:1:b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_idle_entries_are_dropped() {
        let locks = EntityLocks::new();
        {
            let _guards =
                locks.lock_all(&["b".to_string(), "a".to_string(), "a".to_string()]).await;
            assert_eq!(locks.len(), 2);
        }
        assert!(locks.is_empty());
    }
}
