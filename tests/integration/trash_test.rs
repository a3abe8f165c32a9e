//! Trash lifecycle integration tests

mod helpers;

use chrono::{Duration, Utc};
use helpers::{ALICE, BOB, TestApp};
use treevault_core::config::TrashConfig;
use treevault_core::error::ErrorKind;
use treevault_database::store::TreeStore;
use treevault_entity::event::SyncAction;
use treevault_entity::lifecycle::ResourceState;
use treevault_entity::permission::ResourceType;
use treevault_entity::share::SharePermission;
use treevault_service::{PurgeReport, TrashItem};

#[tokio::test]
async fn test_folder_cascade_shares_one_marker() {
    let app = TestApp::new().await;
    let project = app.mkdir(ALICE, "Project", None).await;
    let assets = app.mkdir(ALICE, "Assets", Some(project.id)).await;
    let readme = app.upload(ALICE, Some(project.id), "README", 100).await;
    let logo = app.upload(ALICE, Some(assets.id), "logo.png", 400).await;
    let now = Utc::now();
    let ctx = app.ctx_at(ALICE, now).await;

    let marker = app
        .services
        .trash
        .soft_delete_folder(&ctx, project.id)
        .await
        .expect("trash");
    assert_eq!(marker.since, now);
    assert_eq!(marker.purge_at, now + Duration::days(30));

    for id in [project.id, assets.id] {
        let folder = app.folder(id).await.expect("folder");
        assert_eq!(folder.state.trash_marker(), Some(&marker));
    }
    for id in [readme.id, logo.id] {
        let file = app.file(id).await.expect("file");
        assert_eq!(file.state.trash_marker(), Some(&marker));
    }

    // Soft-deleted bytes still count.
    assert_eq!(app.usage(ALICE).await, 500);

    let events = app
        .store
        .find_events(ResourceType::File, &logo.id.to_string())
        .await
        .expect("events");
    let last = events.last().expect("event");
    assert_eq!(last.action, SyncAction::Delete);
    assert_eq!(last.metadata["cascade_root"], serde_json::json!(project.id));
}

#[tokio::test]
async fn test_trashing_twice_is_rejected() {
    let app = TestApp::new().await;
    let file = app.upload(ALICE, None, "once.txt", 1).await;
    let ctx = app.ctx(ALICE).await;
    app.services
        .trash
        .soft_delete_file(&ctx, file.id)
        .await
        .expect("trash");

    let err = app
        .services
        .trash
        .soft_delete_file(&ctx, file.id)
        .await
        .expect_err("already trashed");
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_force_delete_releases_quota_once() {
    let app = TestApp::new().await;
    let file = app.upload(ALICE, None, "video.mp4", 1_000).await;
    let ctx = app.ctx(ALICE).await;

    let err = app
        .services
        .trash
        .force_delete_file(&ctx, file.id)
        .await
        .expect_err("must be trashed first");
    assert_eq!(err.kind, ErrorKind::Validation);

    app.services
        .trash
        .soft_delete_file(&ctx, file.id)
        .await
        .expect("trash");
    assert_eq!(app.usage(ALICE).await, 1_000);

    let state = app
        .services
        .trash
        .force_delete_file(&ctx, file.id)
        .await
        .expect("force delete");
    assert_eq!(state, ResourceState::Purged);
    assert!(app.file(file.id).await.is_none());
    assert_eq!(app.usage(ALICE).await, 0);

    app.janitor.flush().await;
    assert!(!app.objects.contains(&file.checksum).await);
    assert_eq!(app.objects.deleted_keys().await, vec![file.checksum.clone()]);

    let err = app
        .services
        .trash
        .force_delete_file(&ctx, file.id)
        .await
        .expect_err("gone");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_force_delete_folder_removes_subtree() {
    let app = TestApp::new().await;
    let top = app.mkdir(ALICE, "Top", None).await;
    let mid = app.mkdir(ALICE, "Mid", Some(top.id)).await;
    app.mkdir(ALICE, "Leaf", Some(mid.id)).await;
    app.upload(ALICE, Some(top.id), "a.bin", 10).await;
    app.upload(ALICE, Some(mid.id), "b.bin", 20).await;
    let ctx = app.ctx(ALICE).await;

    app.services
        .trash
        .soft_delete_folder(&ctx, top.id)
        .await
        .expect("trash");
    app.services
        .trash
        .force_delete_folder(&ctx, top.id)
        .await
        .expect("force delete");

    assert_eq!(app.store.row_counts().await, (0, 0));
    assert_eq!(app.usage(ALICE).await, 0);
    app.janitor.flush().await;
    assert_eq!(app.objects.deleted_keys().await.len(), 2);
}

#[tokio::test]
async fn test_shared_object_survives_until_last_reference() {
    let app = TestApp::new().await;
    let first = app
        .upload_object(ALICE, None, "copy-1.iso", 50, "blob-42")
        .await;
    let second = app
        .upload_object(ALICE, None, "copy-2.iso", 50, "blob-42")
        .await;
    let ctx = app.ctx(ALICE).await;

    for file in [&first, &second] {
        app.services
            .trash
            .soft_delete_file(&ctx, file.id)
            .await
            .expect("trash");
    }

    app.services
        .trash
        .force_delete_file(&ctx, first.id)
        .await
        .expect("force delete");
    app.janitor.flush().await;
    assert!(app.objects.contains("blob-42").await);
    assert_eq!(app.usage(ALICE).await, 50);

    app.services
        .trash
        .force_delete_file(&ctx, second.id)
        .await
        .expect("force delete");
    app.janitor.flush().await;
    assert!(!app.objects.contains("blob-42").await);
    assert_eq!(app.usage(ALICE).await, 0);
}

#[tokio::test]
async fn test_purge_removes_expired_only() {
    let app = TestApp::new().await;
    let old_dir = app.mkdir(ALICE, "Old", None).await;
    let old_child = app.mkdir(ALICE, "OldChild", Some(old_dir.id)).await;
    let old_file = app.upload(ALICE, Some(old_child.id), "old.log", 300).await;
    let stale = app.upload(BOB, None, "stale.tmp", 70).await;
    let fresh = app.upload(ALICE, None, "fresh.tmp", 5).await;

    let now = Utc::now();
    let long_ago = now - Duration::days(31);
    let alice_then = app.ctx_at(ALICE, long_ago).await;
    let bob_then = app.ctx_at(BOB, long_ago).await;
    app.services
        .trash
        .soft_delete_folder(&alice_then, old_dir.id)
        .await
        .expect("trash folder");
    app.services
        .trash
        .soft_delete_file(&bob_then, stale.id)
        .await
        .expect("trash file");
    let alice_now = app.ctx_at(ALICE, now).await;
    app.services
        .trash
        .soft_delete_file(&alice_now, fresh.id)
        .await
        .expect("trash fresh");

    let report = app.services.trash.purge_expired(now).await.expect("purge");
    assert_eq!(report, PurgeReport { files: 2, folders: 2 });

    assert!(app.folder(old_dir.id).await.is_none());
    assert!(app.folder(old_child.id).await.is_none());
    assert!(app.file(old_file.id).await.is_none());
    assert!(app.file(stale.id).await.is_none());
    assert!(app.file(fresh.id).await.expect("fresh").is_trashed());

    assert_eq!(app.usage(ALICE).await, 5);
    assert_eq!(app.usage(BOB).await, 0);

    let events = app
        .store
        .find_events(ResourceType::File, &stale.id.to_string())
        .await
        .expect("events");
    let last = events.last().expect("event");
    assert_eq!(last.action, SyncAction::Purge);
    assert_eq!(last.user_id, BOB);

    let again = app.services.trash.purge_expired(now).await.expect("purge");
    assert_eq!(again, PurgeReport::default());
    assert_eq!(app.usage(ALICE).await, 5);

    app.janitor.flush().await;
    assert!(!app.objects.contains(&old_file.checksum).await);
    assert!(!app.objects.contains(&stale.checksum).await);
    assert!(app.objects.contains(&fresh.checksum).await);
}

#[tokio::test]
async fn test_restore_is_top_down() {
    let app = TestApp::new().await;
    let parent = app.mkdir(ALICE, "Parent", None).await;
    let child = app.mkdir(ALICE, "Child", Some(parent.id)).await;
    let kept = app.upload(ALICE, Some(parent.id), "kept.txt", 1).await;
    let nested = app.upload(ALICE, Some(child.id), "nested.txt", 1).await;

    let now = Utc::now();
    let earlier = app.ctx_at(ALICE, now - Duration::hours(2)).await;
    app.services
        .trash
        .soft_delete_folder(&earlier, child.id)
        .await
        .expect("trash child");
    let later = app.ctx_at(ALICE, now - Duration::hours(1)).await;
    app.services
        .trash
        .soft_delete_folder(&later, parent.id)
        .await
        .expect("trash parent");

    let ctx = app.ctx_at(ALICE, now).await;
    let err = app
        .services
        .trash
        .restore_folder(&ctx, child.id)
        .await
        .expect_err("parent still trashed");
    assert_eq!(err.kind, ErrorKind::Conflict);
    let err = app
        .services
        .trash
        .restore_file(&ctx, kept.id)
        .await
        .expect_err("parent still trashed");
    assert_eq!(err.kind, ErrorKind::Conflict);

    let restored = app
        .services
        .trash
        .restore_folder(&ctx, parent.id)
        .await
        .expect("restore parent");
    assert!(restored.state.is_active());
    assert!(app.file(kept.id).await.expect("kept").state.is_active());

    // Trashed on its own earlier, so it stays in the trash.
    assert!(app.folder(child.id).await.expect("child").is_trashed());
    assert!(app.file(nested.id).await.expect("nested").is_trashed());

    app.services
        .trash
        .restore_folder(&ctx, child.id)
        .await
        .expect("restore child");
    assert!(app.file(nested.id).await.expect("nested").state.is_active());

    let err = app
        .services
        .trash
        .restore_folder(&ctx, child.id)
        .await
        .expect_err("not trashed");
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_trashed_name_stays_reserved() {
    let app = TestApp::new().await;
    let folder = app.mkdir(ALICE, "Docs", None).await;
    let a = app.upload(ALICE, Some(folder.id), "a.txt", 1).await;
    let b = app.upload(ALICE, Some(folder.id), "b.txt", 1).await;
    let ctx = app.ctx(ALICE).await;
    app.services
        .trash
        .soft_delete_file(&ctx, b.id)
        .await
        .expect("trash");

    let err = app
        .services
        .files
        .rename_file(&ctx, a.id, "b.txt")
        .await
        .expect_err("trashed sibling");
    assert_eq!(err.field.as_deref(), Some("name"));

    app.services
        .trash
        .restore_file(&ctx, b.id)
        .await
        .expect("restore");
    assert_eq!(app.file(b.id).await.expect("b").name, "b.txt");
}

#[tokio::test]
async fn test_editor_can_trash_but_not_restore() {
    let app = TestApp::new().await;
    let team = app.mkdir(ALICE, "Team", None).await;
    let file = app.upload(ALICE, Some(team.id), "draft.md", 1).await;
    app.share_folder(ALICE, team.id, BOB, SharePermission::Edit)
        .await;
    let bob = app.ctx(BOB).await;

    let marker = app
        .services
        .trash
        .soft_delete_file(&bob, file.id)
        .await
        .expect("editor trashes");
    assert_eq!(marker.by, BOB);

    let bob = app.ctx(BOB).await;
    let err = app
        .services
        .trash
        .restore_file(&bob, file.id)
        .await
        .expect_err("only the owner restores");
    assert_eq!(err.kind, ErrorKind::NotFound);
    let err = app
        .services
        .trash
        .force_delete_file(&bob, file.id)
        .await
        .expect_err("only the owner force deletes");
    assert_eq!(err.kind, ErrorKind::NotFound);

    let alice = app.ctx(ALICE).await;
    let restored = app
        .services
        .trash
        .restore_file(&alice, file.id)
        .await
        .expect("owner restores");
    assert!(restored.state.is_active());
}

#[tokio::test]
async fn test_retention_is_clamped() {
    let app = TestApp::with_trash(TrashConfig {
        retention_days: 365,
        ..TrashConfig::default()
    })
    .await;
    assert_eq!(app.services.trash.retention_days(), 90);

    let file = app.upload(ALICE, None, "long.txt", 1).await;
    let now = Utc::now();
    let ctx = app.ctx_at(ALICE, now).await;
    let marker = app
        .services
        .trash
        .soft_delete_file(&ctx, file.id)
        .await
        .expect("trash");
    assert_eq!(marker.purge_at, now + Duration::days(90));

    let short = TestApp::with_trash(TrashConfig {
        retention_days: 0,
        ..TrashConfig::default()
    })
    .await;
    assert_eq!(short.services.trash.retention_days(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_force_deletes_release_quota_once() {
    let app = TestApp::new().await;
    app.upload(ALICE, None, "keep.bin", 10).await;
    let doomed = app.upload(ALICE, None, "doomed.bin", 100).await;
    let ctx = app.ctx(ALICE).await;
    app.services
        .trash
        .soft_delete_file(&ctx, doomed.id)
        .await
        .expect("trash");

    let (first, second) = tokio::join!(
        app.services.trash.force_delete_file(&ctx, doomed.id),
        app.services.trash.force_delete_file(&ctx, doomed.id),
    );
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = outcomes
        .iter()
        .find_map(|r| r.as_ref().err())
        .expect("one request loses");
    assert_eq!(loser.kind, ErrorKind::NotFound);

    assert_eq!(app.usage(ALICE).await, 10);
    app.janitor.flush().await;
    assert_eq!(app.objects.deleted_keys().await, vec![doomed.checksum.clone()]);
}

#[tokio::test]
async fn test_bulk_trash_is_all_or_nothing() {
    let app = TestApp::new().await;
    let team = app.mkdir(ALICE, "Team", None).await;
    let theirs = app.upload(ALICE, Some(team.id), "plan.txt", 5).await;
    app.share_folder(ALICE, team.id, BOB, SharePermission::View)
        .await;
    let own_dir = app.mkdir(BOB, "Own", None).await;
    let own_file = app.upload(BOB, None, "mine.txt", 7).await;
    let bob = app.ctx(BOB).await;

    let err = app
        .services
        .trash
        .soft_delete_many(
            &bob,
            &[
                TrashItem::File(own_file.id),
                TrashItem::Folder(own_dir.id),
                TrashItem::File(theirs.id),
            ],
        )
        .await
        .expect_err("viewer cannot trash");
    assert_eq!(err.kind, ErrorKind::Authorization);
    assert!(app.file(own_file.id).await.expect("file").state.is_active());
    assert!(app.folder(own_dir.id).await.expect("folder").state.is_active());
    assert!(app.file(theirs.id).await.expect("file").state.is_active());
    assert_eq!(app.usage(BOB).await, 7);

    let a = app.upload(ALICE, None, "a.txt", 1).await;
    let b = app.upload(ALICE, None, "b.txt", 1).await;
    let alice = app.ctx(ALICE).await;
    app.services
        .trash
        .soft_delete_file(&alice, b.id)
        .await
        .expect("trash b");
    let events_before = app.store.events().await.len();

    let err = app
        .services
        .trash
        .soft_delete_many(&alice, &[TrashItem::File(a.id), TrashItem::File(b.id)])
        .await
        .expect_err("b already trashed");
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(app.file(a.id).await.expect("a").state.is_active());
    assert_eq!(app.store.events().await.len(), events_before);

    let err = app
        .services
        .trash
        .soft_delete_many(&alice, &[TrashItem::File(a.id), TrashItem::File(a.id)])
        .await
        .expect_err("duplicate item");
    assert_eq!(err.field.as_deref(), Some("items"));
}

#[tokio::test]
async fn test_bulk_trash_covers_nested_items_once() {
    let app = TestApp::new().await;
    let parent = app.mkdir(ALICE, "Parent", None).await;
    let child = app.mkdir(ALICE, "Child", Some(parent.id)).await;
    let nested = app.upload(ALICE, Some(child.id), "nested.txt", 3).await;
    let loose = app.upload(ALICE, None, "loose.txt", 4).await;
    let ctx = app.ctx(ALICE).await;

    let marker = app
        .services
        .trash
        .soft_delete_many(
            &ctx,
            &[
                TrashItem::Folder(child.id),
                TrashItem::File(nested.id),
                TrashItem::Folder(parent.id),
                TrashItem::File(loose.id),
            ],
        )
        .await
        .expect("bulk trash");

    for id in [parent.id, child.id] {
        let folder = app.folder(id).await.expect("folder");
        assert_eq!(folder.state.trash_marker(), Some(&marker));
    }
    for id in [nested.id, loose.id] {
        let file = app.file(id).await.expect("file");
        assert_eq!(file.state.trash_marker(), Some(&marker));
    }
    assert_eq!(app.usage(ALICE).await, 7);

    let events = app
        .store
        .find_events(ResourceType::File, &nested.id.to_string())
        .await
        .expect("events");
    let deletes: Vec<_> = events
        .iter()
        .filter(|e| e.action == SyncAction::Delete)
        .collect();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].metadata["cascade_root"], serde_json::json!(parent.id));

    app.services
        .trash
        .restore_folder(&ctx, parent.id)
        .await
        .expect("restore");
    assert!(app.folder(child.id).await.expect("child").state.is_active());
    assert!(app.file(nested.id).await.expect("nested").state.is_active());
    assert!(app.file(loose.id).await.expect("loose").is_trashed());
}

#[tokio::test]
async fn test_separate_trashes_in_one_request_restore_separately() {
    let app = TestApp::new().await;
    let parent = app.mkdir(ALICE, "Parent", None).await;
    let child = app.mkdir(ALICE, "Child", Some(parent.id)).await;
    let sibling = app.upload(ALICE, Some(parent.id), "sibling.txt", 1).await;
    let ctx = app.ctx(ALICE).await;

    let first = app
        .services
        .trash
        .soft_delete_folder(&ctx, child.id)
        .await
        .expect("trash child");
    let second = app
        .services
        .trash
        .soft_delete_folder(&ctx, parent.id)
        .await
        .expect("trash parent");
    assert_eq!(first.since, second.since);

    app.services
        .trash
        .restore_folder(&ctx, parent.id)
        .await
        .expect("restore parent");
    assert!(app.file(sibling.id).await.expect("sibling").state.is_active());
    assert!(app.folder(child.id).await.expect("child").is_trashed());
}
