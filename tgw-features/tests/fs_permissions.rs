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


//! Permission-checked filesystem access as seen by different tenants.

use std::path::Path;
use std::sync::Arc;

use proptest::prelude::*;
use tgw_features::{
    is_permitted, AccessMask, FileKind, FileStat, FsBackend, FsContext, FsGateway, MemoryFs, Owner,
};

const OWNER_UID: u32 = 1572;

/// `/tmp/dir` world-searchable, `root_dir` created by uid 1572 with 0770.
async fn shared_tree() -> (FsGateway, Arc<MemoryFs>) {
    let fs = Arc::new(MemoryFs::new());
    let root = Owner { uid: 0, gid: 0 };
    fs.create_dir(Path::new("/tmp"), 0o1777, root).await.unwrap();
    fs.create_dir(Path::new("/tmp/dir"), 0o777, root).await.unwrap();

    let gateway = FsGateway::new(fs.clone());
    let owner = FsContext::new(OWNER_UID, OWNER_UID);
    gateway
        .mkdir(&owner, "/tmp/dir/root_dir", 0o770)
        .await
        .unwrap();
    (gateway, fs)
}

#[tokio::test]
async fn test_unrelated_uid_cannot_list() {
    let (gateway, _) = shared_tree().await;
    let ctx = FsContext::new(1573, 1573);

    let err = gateway.readdir(&ctx, "/tmp/dir/root_dir").await.unwrap_err();
    assert_eq!(err.errno(), "EACCES");
}

#[tokio::test]
async fn test_supplemental_group_grants_group_bits() {
    let (gateway, _) = shared_tree().await;
    let ctx = FsContext::new(1574, 1574).with_supplemental_groups([1572, 1577]);

    let entries = gateway.readdir(&ctx, "/tmp/dir/root_dir").await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_group_outside_supplemental_set_is_denied() {
    let (gateway, _) = shared_tree().await;
    gateway
        .chown("", "/tmp/dir/root_dir", OWNER_UID, 1573)
        .await
        .unwrap();
    let ctx = FsContext::new(1574, 1574).with_supplemental_groups([1572, 1577]);

    let err = gateway.readdir(&ctx, "/tmp/dir/root_dir").await.unwrap_err();
    assert_eq!(err.errno(), "EACCES");
}

#[tokio::test]
async fn test_root_context_gets_no_bypass() {
    let (gateway, _) = shared_tree().await;
    let root = FsContext::new(0, 0);

    let err = gateway.readdir(&root, "/tmp/dir/root_dir").await.unwrap_err();
    assert_eq!(err.errno(), "EACCES");
    let err = gateway
        .mkdir(&root, "/tmp/dir/root_dir/sub", 0o755)
        .await
        .unwrap_err();
    assert_eq!(err.errno(), "EACCES");
}

#[tokio::test]
async fn test_missing_target_is_enoent() {
    let (gateway, _) = shared_tree().await;
    let ctx = FsContext::new(OWNER_UID, OWNER_UID);

    let err = gateway
        .readdir(&ctx, "/tmp/dir/root_dir/missing")
        .await
        .unwrap_err();
    assert_eq!(err.errno(), "ENOENT");
    let err = gateway
        .mkdir(&ctx, "/tmp/dir/root_dir/a/b", 0o755)
        .await
        .unwrap_err();
    assert_eq!(err.errno(), "ENOENT");
}

#[tokio::test]
async fn test_mode_change_takes_effect_on_next_call() {
    let (gateway, fs) = shared_tree().await;
    let other = FsContext::new(1573, 1573);
    assert!(gateway.readdir(&other, "/tmp/dir/root_dir").await.is_err());

    fs.set_mode(Path::new("/tmp/dir/root_dir"), 0o775)
        .await
        .unwrap();
    assert!(gateway.readdir(&other, "/tmp/dir/root_dir").await.is_ok());

    fs.set_mode(Path::new("/tmp/dir/root_dir"), 0o770)
        .await
        .unwrap();
    assert!(gateway.readdir(&other, "/tmp/dir/root_dir").await.is_err());
}

#[tokio::test]
async fn test_group_member_creates_inside() {
    let (gateway, _) = shared_tree().await;
    let member = FsContext::new(1574, 1574).with_supplemental_groups([1572]);

    gateway
        .write_file(&member, "/tmp/dir/root_dir/report.txt", b"ok", 0o640)
        .await
        .unwrap();
    let stat = gateway
        .stat(&member, "/tmp/dir/root_dir/report.txt")
        .await
        .unwrap();
    assert_eq!((stat.owner_uid, stat.owner_gid, stat.mode), (1574, 1574, 0o640));

    // the directory owner may read it through the group class
    let owner = FsContext::new(OWNER_UID, OWNER_UID).with_supplemental_groups([1574]);
    assert_eq!(
        gateway
            .read_file(&owner, "/tmp/dir/root_dir/report.txt")
            .await
            .unwrap(),
        b"ok"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_local_backend_owner_round_trip() {
    use std::os::unix::fs::MetadataExt;
    use tgw_features::LocalFs;

    let tmp = tempfile::TempDir::new().unwrap();
    let metadata = std::fs::metadata(tmp.path()).unwrap();
    let ctx = FsContext::new(metadata.uid(), metadata.gid());
    let gateway = FsGateway::new(Arc::new(LocalFs::new()));

    let dir = tmp.path().join("root_dir");
    gateway.mkdir(&ctx, &dir, 0o770).await.unwrap();
    gateway
        .write_file(&ctx, dir.join("a.txt"), b"data", 0o600)
        .await
        .unwrap();

    let entries = gateway.readdir(&ctx, &dir).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, FileKind::File);
    assert_eq!(gateway.stat(&ctx, &dir).await.unwrap().mode, 0o770);
}

#[cfg(unix)]
#[tokio::test]
async fn test_local_backend_refuses_symlinked_targets() {
    use std::os::unix::fs::{symlink, MetadataExt, PermissionsExt};
    use tgw_features::LocalFs;

    let tmp = tempfile::TempDir::new().unwrap();
    std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o777)).unwrap();
    let metadata = std::fs::metadata(tmp.path()).unwrap();
    let owner = FsContext::new(metadata.uid(), metadata.gid());
    let stranger = FsContext::new(metadata.uid() + 4242, metadata.gid() + 4242);
    let gateway = FsGateway::new(Arc::new(LocalFs::new()));

    let secret = tmp.path().join("secret");
    let link = tmp.path().join("link");
    gateway
        .write_file(&owner, &secret, b"TOP-SECRET", 0o600)
        .await
        .unwrap();
    symlink(&secret, &link).unwrap();

    assert!(gateway.read_file(&stranger, &secret).await.is_err());
    assert!(gateway.read_file(&stranger, &link).await.is_err());
    assert!(gateway
        .write_file(&stranger, &link, b"PWNED", 0o666)
        .await
        .is_err());

    // Not even the target's owner goes through the link.
    let err = gateway.read_file(&owner, &link).await.unwrap_err();
    assert_eq!(err.errno(), "ELOOP");
    let err = gateway
        .write_file(&owner, &link, b"PWNED", 0o666)
        .await
        .unwrap_err();
    assert_eq!(err.errno(), "ELOOP");

    let dir_link = tmp.path().join("dir_link");
    symlink(tmp.path(), &dir_link).unwrap();
    let err = gateway.readdir(&owner, &dir_link).await.unwrap_err();
    assert_eq!(err.errno(), "ELOOP");

    assert_eq!(std::fs::read(&secret).unwrap(), b"TOP-SECRET");
}

/// Independent statement of the POSIX rule.
fn expected(ctx: &FsContext, stat: &FileStat, mask: u32) -> bool {
    let shift = if ctx.uid == stat.owner_uid {
        6
    } else if ctx.gid == stat.owner_gid || ctx.supplemental_groups.contains(&stat.owner_gid) {
        3
    } else {
        0
    };
    (stat.mode >> shift) & mask == mask
}

fn id() -> impl Strategy<Value = u32> {
    // small domain so owner/group collisions are frequent
    prop_oneof![Just(0u32), 1570u32..1580]
}

proptest! {
    #[test]
    fn permission_matches_resolved_class(
        uid in id(),
        gid in id(),
        groups in prop::collection::btree_set(id(), 0..4),
        owner_uid in id(),
        owner_gid in id(),
        mode in 0u32..0o1000,
        mask in 1u32..8,
    ) {
        let ctx = FsContext::new(uid, gid).with_supplemental_groups(groups);
        let stat = FileStat {
            owner_uid,
            owner_gid,
            mode,
            kind: FileKind::Directory,
            size: 0,
        };
        prop_assert_eq!(
            is_permitted(&ctx, &stat, AccessMask::from_bits(mask)),
            expected(&ctx, &stat, mask)
        );
    }

    #[test]
    fn readdir_agrees_with_rule(
        uid in id(),
        gid in id(),
        groups in prop::collection::btree_set(id(), 0..4),
        owner_uid in id(),
        owner_gid in id(),
        mode in 0u32..0o1000,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let ctx = FsContext::new(uid, gid).with_supplemental_groups(groups);
        let outcome = runtime.block_on(async {
            let fs = Arc::new(MemoryFs::new());
            fs.set_mode(Path::new("/"), 0o711).await.unwrap();
            fs.create_dir(Path::new("/target"), mode, Owner { uid: owner_uid, gid: owner_gid })
                .await
                .unwrap();
            let stat = fs.stat(Path::new("/target")).await.unwrap();
            let result = FsGateway::new(fs).readdir(&ctx, "/target").await;
            (stat, result)
        });
        let (stat, result) = outcome;
        let root = FileStat { owner_uid: 0, owner_gid: 0, mode: 0o711, kind: FileKind::Directory, size: 0 };
        let allowed = expected(&ctx, &root, 0o1) && expected(&ctx, &stat, 0o5);
        match result {
            Ok(_) => prop_assert!(allowed),
            Err(e) => {
                prop_assert!(!allowed);
                prop_assert_eq!(e.errno(), "EACCES");
            }
        }
    }
}
