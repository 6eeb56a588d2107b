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


//! POSIX permission evaluation in user space.
//!
//! The gateway may run privileged, so the kernel's checks cannot be relied
//! on. Every decision here is made from the object's current owner, group
//! and mode; nothing is cached and uid 0 is an ordinary uid.

use std::fmt;
use std::ops::BitOr;
use std::path::Path;

use super::backend::FileStat;
use super::context::FsContext;
use super::error::FsError;

/// Requested access, as `rwx` bits of a single permission class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessMask(u32);

impl AccessMask {
    pub const READ: AccessMask = AccessMask(0o4);
    pub const WRITE: AccessMask = AccessMask(0o2);
    pub const EXECUTE: AccessMask = AccessMask(0o1);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn from_bits(bits: u32) -> Self {
        AccessMask(bits & 0o7)
    }
}

impl BitOr for AccessMask {
    type Output = AccessMask;

    fn bitor(self, rhs: AccessMask) -> AccessMask {
        AccessMask(self.0 | rhs.0)
    }
}

impl fmt::Display for AccessMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |bit: u32, c: char| if self.0 & bit != 0 { c } else { '-' };
        write!(f, "{}{}{}", flag(0o4, 'r'), flag(0o2, 'w'), flag(0o1, 'x'))
    }
}

/// Which triplet of the mode applies to a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionClass {
    Owner,
    Group,
    Other,
}

/// Resolves the permission class: owner if the uid matches, else group if
/// the primary or a supplemental gid matches, else other.
pub fn resolve_class(ctx: &FsContext, owner_uid: u32, owner_gid: u32) -> PermissionClass {
    if ctx.uid == owner_uid {
        PermissionClass::Owner
    } else if ctx.in_group(owner_gid) {
        PermissionClass::Group
    } else {
        PermissionClass::Other
    }
}

/// Extracts the `rwx` triplet of `class` from `mode`.
pub fn class_bits(mode: u32, class: PermissionClass) -> u32 {
    match class {
        PermissionClass::Owner => (mode >> 6) & 0o7,
        PermissionClass::Group => (mode >> 3) & 0o7,
        PermissionClass::Other => mode & 0o7,
    }
}

/// Returns true if every bit of `mask` is granted to the context's class.
pub fn is_permitted(ctx: &FsContext, stat: &FileStat, mask: AccessMask) -> bool {
    let class = resolve_class(ctx, stat.owner_uid, stat.owner_gid);
    class_bits(stat.mode, class) & mask.bits() == mask.bits()
}

/// Fails with `AccessDenied` unless `mask` is granted on `path`.
pub fn check_access(
    ctx: &FsContext,
    stat: &FileStat,
    mask: AccessMask,
    path: &Path,
) -> Result<(), FsError> {
    if is_permitted(ctx, stat, mask) {
        Ok(())
    } else {
        tracing::debug!(
            "uid {} denied {} on {} (owner {}:{}, mode {:o})",
            ctx.uid,
            mask,
            path.display(),
            stat.owner_uid,
            stat.owner_gid,
            stat.mode
        );
        Err(FsError::AccessDenied(path.to_path_buf()))
    }
}

/// Restricted deletion: in a sticky directory only the directory owner or
/// the entry owner may remove or rename the entry.
pub fn check_sticky(
    ctx: &FsContext,
    parent: &FileStat,
    target: &FileStat,
    path: &Path,
) -> Result<(), FsError> {
    if parent.is_sticky() && ctx.uid != parent.owner_uid && ctx.uid != target.owner_uid {
        return Err(FsError::AccessDenied(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_access::backend::FileKind;

    fn dir(owner_uid: u32, owner_gid: u32, mode: u32) -> FileStat {
        FileStat {
            owner_uid,
            owner_gid,
            mode,
            kind: FileKind::Directory,
            size: 0,
        }
    }

    #[test]
    fn test_resolve_class() {
        let ctx = FsContext::new(1574, 1574).with_supplemental_groups([1572]);
        assert_eq!(resolve_class(&ctx, 1574, 1), PermissionClass::Owner);
        assert_eq!(resolve_class(&ctx, 1572, 1574), PermissionClass::Group);
        assert_eq!(resolve_class(&ctx, 1572, 1572), PermissionClass::Group);
        assert_eq!(resolve_class(&ctx, 1572, 1573), PermissionClass::Other);
    }

    #[test]
    fn test_owner_class_is_exclusive() {
        // owner bits apply even when group/other would grant more
        let ctx = FsContext::new(1000, 1000);
        let stat = dir(1000, 1000, 0o077);
        assert!(!is_permitted(&ctx, &stat, AccessMask::READ));
    }

    #[test]
    fn test_group_class_is_exclusive() {
        let ctx = FsContext::new(2000, 1000);
        let stat = dir(1000, 1000, 0o707);
        assert!(!is_permitted(&ctx, &stat, AccessMask::READ));
    }

    #[test]
    fn test_root_uid_not_special() {
        let root = FsContext::new(0, 0);
        let stat = dir(1572, 1572, 0o770);
        assert!(!is_permitted(&root, &stat, AccessMask::READ));
        assert!(!is_permitted(&root, &stat, AccessMask::EXECUTE));

        let owned_by_root = dir(0, 0, 0o700);
        assert!(is_permitted(&root, &owned_by_root, AccessMask::READ | AccessMask::EXECUTE));
    }

    #[test]
    fn test_combined_mask_requires_every_bit() {
        let ctx = FsContext::new(1, 1);
        let stat = dir(1, 1, 0o500);
        assert!(is_permitted(&ctx, &stat, AccessMask::READ | AccessMask::EXECUTE));
        assert!(!is_permitted(&ctx, &stat, AccessMask::WRITE | AccessMask::EXECUTE));
    }

    #[test]
    fn test_check_access_error() {
        let ctx = FsContext::new(1573, 1573);
        let stat = dir(1572, 1572, 0o770);
        let err = check_access(&ctx, &stat, AccessMask::READ, Path::new("/tmp/dir")).unwrap_err();
        assert_eq!(err.errno(), "EACCES");
    }

    #[test]
    fn test_sticky() {
        let parent = dir(0, 0, 0o1777);
        let entry = dir(1572, 1572, 0o700);
        let path = Path::new("/tmp/x");

        assert!(check_sticky(&FsContext::new(1572, 1572), &parent, &entry, path).is_ok());
        assert!(check_sticky(&FsContext::new(0, 0), &parent, &entry, path).is_ok());
        assert!(check_sticky(&FsContext::new(1573, 1573), &parent, &entry, path).is_err());

        let plain = dir(0, 0, 0o777);
        assert!(check_sticky(&FsContext::new(1573, 1573), &plain, &entry, path).is_ok());
    }

    #[test]
    fn test_mask_display() {
        assert_eq!((AccessMask::READ | AccessMask::EXECUTE).to_string(), "r-x");
        assert_eq!(AccessMask::from_bits(0o7).to_string(), "rwx");
    }
}
