//! Permission resolution integration tests

mod helpers;

use chrono::{Duration, Utc};
use helpers::{ALICE, BOB, CAROL, TestApp};
use treevault_core::error::ErrorKind;
use treevault_entity::share::{SharePermission, ShareTarget};
use treevault_service::ShareRequest;

#[tokio::test]
async fn test_folder_share_covers_subtree_only() {
    let app = TestApp::new().await;
    let home = app.mkdir(ALICE, "Home", None).await;
    let shared = app.mkdir(ALICE, "Shared", Some(home.id)).await;
    let inner = app.mkdir(ALICE, "Inner", Some(shared.id)).await;
    let sibling = app.mkdir(ALICE, "Private", Some(home.id)).await;
    let deep_file = app.upload(ALICE, Some(inner.id), "plan.txt", 10).await;
    let home_file = app.upload(ALICE, Some(home.id), "diary.txt", 10).await;

    app.share_folder(ALICE, shared.id, BOB, SharePermission::View)
        .await;
    let ctx = app.ctx(BOB).await;

    assert!(app.services.folders.get_folder(&ctx, shared.id).await.is_ok());
    assert!(app.services.folders.get_folder(&ctx, inner.id).await.is_ok());
    assert!(app.services.files.get_file(&ctx, deep_file.id).await.is_ok());

    for hidden in [home.id, sibling.id] {
        let err = app
            .services
            .folders
            .get_folder(&ctx, hidden)
            .await
            .expect_err("outside share");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
    let err = app
        .services
        .files
        .get_file(&ctx, home_file.id)
        .await
        .expect_err("outside share");
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = app
        .services
        .files
        .rename_file(&ctx, deep_file.id, "mine.txt")
        .await
        .expect_err("view only");
    assert_eq!(err.kind, ErrorKind::Authorization);
}

#[tokio::test]
async fn test_edit_share_allows_changes_inside() {
    let app = TestApp::new().await;
    let shared = app.mkdir(ALICE, "Team", None).await;
    let file = app.upload(ALICE, Some(shared.id), "notes.txt", 10).await;
    app.share_folder(ALICE, shared.id, BOB, SharePermission::Edit)
        .await;
    let ctx = app.ctx(BOB).await;

    let renamed = app
        .services
        .files
        .rename_file(&ctx, file.id, "minutes.txt")
        .await
        .expect("rename");
    assert_eq!(renamed.version, file.version + 1);

    let created = app
        .services
        .folders
        .create_folder(&ctx, "Drafts", Some(shared.id))
        .await
        .expect("create");
    assert_eq!(created.owner_id, ALICE);
}

#[tokio::test]
async fn test_revoked_editor_loses_uploaded_file() {
    let app = TestApp::new().await;
    let top = app.mkdir(ALICE, "1", None).await;
    let nested = app.mkdir(ALICE, "2", Some(top.id)).await;
    let share = app
        .share_folder(ALICE, top.id, BOB, SharePermission::Edit)
        .await;

    let uploaded = app.upload(BOB, Some(nested.id), "f.bin", 64).await;
    assert_eq!(uploaded.owner_id, ALICE);
    assert_eq!(app.usage(ALICE).await, 64);
    assert_eq!(app.usage(BOB).await, 0);

    let stale = app.ctx(BOB).await;
    let alice = app.ctx(ALICE).await;
    app.services
        .shares
        .revoke(&alice, share.id)
        .await
        .expect("revoke");

    let ctx = app.ctx(BOB).await;
    let err = app
        .services
        .files
        .get_file(&ctx, uploaded.id)
        .await
        .expect_err("revoked");
    assert_eq!(err.kind, ErrorKind::NotFound);
    let err = app
        .services
        .files
        .rename_file(&ctx, uploaded.id, "g.bin")
        .await
        .expect_err("revoked");
    assert_eq!(err.kind, ErrorKind::NotFound);

    // A context loaded before the revoke keeps its snapshot.
    assert!(app.services.files.get_file(&stale, uploaded.id).await.is_ok());

    let alice = app.ctx(ALICE).await;
    assert!(app.services.files.get_file(&alice, uploaded.id).await.is_ok());
    assert!(
        app.services
            .files
            .rename_file(&alice, uploaded.id, "g.bin")
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_expired_share_grants_nothing() {
    let app = TestApp::new().await;
    let folder = app.mkdir(ALICE, "Temp", None).await;
    let alice = app.ctx(ALICE).await;
    let now = Utc::now();
    app.services
        .shares
        .share(
            &alice,
            ShareRequest {
                target: ShareTarget::Folder(folder.id),
                recipient_id: BOB,
                permission: SharePermission::View,
                expires_at: Some(now + Duration::hours(1)),
                notes: None,
            },
        )
        .await
        .expect("share");

    let before = app.ctx_at(BOB, now).await;
    assert!(app.services.folders.get_folder(&before, folder.id).await.is_ok());

    let after = app.ctx_at(BOB, now + Duration::hours(2)).await;
    let err = app
        .services
        .folders
        .get_folder(&after, folder.id)
        .await
        .expect_err("expired");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_trashed_shared_folder_grants_nothing() {
    let app = TestApp::new().await;
    let folder = app.mkdir(ALICE, "Old", None).await;
    let child = app.mkdir(ALICE, "Child", Some(folder.id)).await;
    app.share_folder(ALICE, folder.id, BOB, SharePermission::Edit)
        .await;

    let alice = app.ctx(ALICE).await;
    app.services
        .trash
        .soft_delete_folder(&alice, folder.id)
        .await
        .expect("trash");

    let ctx = app.ctx(BOB).await;
    assert!(ctx.permissions.folder_shares().is_empty());
    let err = app
        .services
        .folders
        .get_folder(&ctx, child.id)
        .await
        .expect_err("trashed share");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_system_permissions() {
    let app = TestApp::new().await;
    let folder = app.mkdir(ALICE, "Audit", None).await;
    let file = app.upload(ALICE, Some(folder.id), "ledger.csv", 10).await;

    app.grant(CAROL, "view-any").await;
    let ctx = app.ctx(CAROL).await;
    assert!(app.services.files.get_file(&ctx, file.id).await.is_ok());
    let err = app
        .services
        .files
        .rename_file(&ctx, file.id, "x.csv")
        .await
        .expect_err("view-any is read only");
    assert_eq!(err.kind, ErrorKind::Authorization);

    app.grant(CAROL, "edit-any").await;
    let ctx = app.ctx(CAROL).await;
    assert!(
        app.services
            .files
            .rename_file(&ctx, file.id, "x.csv")
            .await
            .is_ok()
    );

    let err = app
        .services
        .trash
        .restore_file(&ctx, file.id)
        .await
        .expect_err("edit-any cannot restore");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_direct_file_share() {
    let app = TestApp::new().await;
    let folder = app.mkdir(ALICE, "Mixed", None).await;
    let shared = app.upload(ALICE, Some(folder.id), "shared.txt", 10).await;
    let other = app.upload(ALICE, Some(folder.id), "other.txt", 10).await;
    app.share_file(ALICE, shared.id, BOB, SharePermission::Edit)
        .await;

    let ctx = app.ctx(BOB).await;
    assert!(app.services.files.get_file(&ctx, shared.id).await.is_ok());
    assert!(
        app.services
            .files
            .rename_file(&ctx, shared.id, "renamed.txt")
            .await
            .is_ok()
    );
    assert_eq!(
        app.services
            .files
            .get_file(&ctx, other.id)
            .await
            .expect_err("not shared")
            .kind,
        ErrorKind::NotFound
    );
    assert_eq!(
        app.services
            .folders
            .get_folder(&ctx, folder.id)
            .await
            .expect_err("file share does not expose the folder")
            .kind,
        ErrorKind::NotFound
    );
}
