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


//! Request-scoped filesystem identity context.

use std::collections::BTreeSet;
use std::time::Duration;

/// Slow-call threshold used when none is configured.
pub const DEFAULT_WARN_THRESHOLD: Duration = Duration::from_millis(100);

/// Identity a filesystem operation is performed as.
///
/// Derived per request from the authenticated access key and never
/// persisted. `uid == 0` carries no special privilege.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsContext {
    pub uid: u32,
    pub gid: u32,
    pub supplemental_groups: BTreeSet<u32>,
    /// Backend selector, empty for the gateway's default backend
    pub backend: String,
    /// Calls slower than this are logged; no effect on the outcome
    pub warn_threshold: Duration,
}

impl FsContext {
    pub fn new(uid: u32, gid: u32) -> Self {
        Self {
            uid,
            gid,
            supplemental_groups: BTreeSet::new(),
            backend: String::new(),
            warn_threshold: DEFAULT_WARN_THRESHOLD,
        }
    }

    pub fn with_supplemental_groups(mut self, groups: impl IntoIterator<Item = u32>) -> Self {
        self.supplemental_groups = groups.into_iter().collect();
        self
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    pub fn with_warn_threshold(mut self, warn_threshold: Duration) -> Self {
        self.warn_threshold = warn_threshold;
        self
    }

    /// Returns true if `gid` is the primary group or a supplemental group.
    pub fn in_group(&self, gid: u32) -> bool {
        self.gid == gid || self.supplemental_groups.contains(&gid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_group() {
        let ctx = FsContext::new(1574, 1574).with_supplemental_groups([1572, 1577]);
        assert!(ctx.in_group(1574));
        assert!(ctx.in_group(1572));
        assert!(ctx.in_group(1577));
        assert!(!ctx.in_group(1573));
    }

    #[test]
    fn test_defaults() {
        let ctx = FsContext::new(0, 0);
        assert!(ctx.backend.is_empty());
        assert!(ctx.supplemental_groups.is_empty());
        assert_eq!(ctx.warn_threshold, DEFAULT_WARN_THRESHOLD);
    }
}
