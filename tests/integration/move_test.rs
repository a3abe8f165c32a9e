//! Move engine integration tests

mod helpers;

use helpers::{ALICE, BOB, TestApp};
use treevault_core::error::ErrorKind;
use treevault_database::store::TreeStore;
use treevault_entity::event::SyncAction;
use treevault_entity::permission::ResourceType;
use treevault_entity::share::SharePermission;
use treevault_service::{MoveItem, MoveReport};

#[tokio::test]
async fn test_move_file_bumps_version_and_records_event() {
    let app = TestApp::new().await;
    let src = app.mkdir(ALICE, "Inbox", None).await;
    let dest = app.mkdir(ALICE, "Archive", None).await;
    let file = app.upload(ALICE, Some(src.id), "invoice.pdf", 100).await;
    let ctx = app.ctx(ALICE).await;

    let moved = app
        .services
        .mover
        .move_file(&ctx, file.id, Some(dest.id))
        .await
        .expect("move");
    assert_eq!(moved.folder_id, Some(dest.id));
    assert_eq!(moved.version, file.version + 1);

    let events = app
        .store
        .find_events(ResourceType::File, &file.id.to_string())
        .await
        .expect("events");
    let last = events.last().expect("event");
    assert_eq!(last.action, SyncAction::Move);
    assert_eq!(last.user_id, ALICE);
    assert_eq!(last.metadata["to"], serde_json::json!(dest.id));
    assert_eq!(last.metadata["from"], serde_json::json!(src.id));
}

#[tokio::test]
async fn test_move_into_current_folder_is_noop() {
    let app = TestApp::new().await;
    let folder = app.mkdir(ALICE, "Here", None).await;
    let file = app.upload(ALICE, Some(folder.id), "stay.txt", 1).await;
    let ctx = app.ctx(ALICE).await;
    let events_before = app.store.events().await.len();

    let report = app
        .services
        .mover
        .move_many(&ctx, &[MoveItem::File(file.id)], Some(folder.id))
        .await
        .expect("move");
    assert_eq!(
        report,
        MoveReport {
            moved: vec![],
            unchanged: vec![MoveItem::File(file.id)],
        }
    );
    assert_eq!(app.file(file.id).await.expect("file").version, file.version);
    assert_eq!(app.store.events().await.len(), events_before);
}

#[tokio::test]
async fn test_bulk_move_is_all_or_nothing() {
    let app = TestApp::new().await;
    let src = app.mkdir(ALICE, "Src", None).await;
    let dest = app.mkdir(ALICE, "Dest", None).await;
    let movable = app.upload(ALICE, Some(src.id), "a.txt", 1).await;
    let clashing = app.upload(ALICE, Some(src.id), "b.txt", 1).await;
    let sub = app.mkdir(ALICE, "Sub", Some(src.id)).await;
    app.upload(ALICE, Some(dest.id), "b.txt", 1).await;
    let ctx = app.ctx(ALICE).await;

    let err = app
        .services
        .mover
        .move_many(
            &ctx,
            &[
                MoveItem::File(movable.id),
                MoveItem::Folder(sub.id),
                MoveItem::File(clashing.id),
            ],
            Some(dest.id),
        )
        .await
        .expect_err("collision");
    assert_eq!(err.field.as_deref(), Some("name"));

    assert_eq!(app.file(movable.id).await.expect("file").folder_id, Some(src.id));
    let sub = app.folder(sub.id).await.expect("sub");
    assert_eq!(sub.parent_id, Some(src.id));
    assert!(sub.path.is_strict_descendant_of(&src.path));
}

#[tokio::test]
async fn test_collision_within_batch() {
    let app = TestApp::new().await;
    let left = app.mkdir(ALICE, "Left", None).await;
    let right = app.mkdir(ALICE, "Right", None).await;
    let dest = app.mkdir(ALICE, "Dest", None).await;
    let one = app.upload(ALICE, Some(left.id), "same.txt", 1).await;
    let two = app.upload(ALICE, Some(right.id), "same.txt", 1).await;
    let ctx = app.ctx(ALICE).await;

    let err = app
        .services
        .mover
        .move_many(
            &ctx,
            &[MoveItem::File(one.id), MoveItem::File(two.id)],
            Some(dest.id),
        )
        .await
        .expect_err("batch collision");
    assert_eq!(err.field.as_deref(), Some("name"));
    assert_eq!(app.file(one.id).await.expect("file").folder_id, Some(left.id));

    let err = app
        .services
        .mover
        .move_many(
            &ctx,
            &[MoveItem::File(one.id), MoveItem::File(one.id)],
            Some(dest.id),
        )
        .await
        .expect_err("duplicate item");
    assert_eq!(err.field.as_deref(), Some("items"));
}

#[tokio::test]
async fn test_trashed_sibling_blocks_name() {
    let app = TestApp::new().await;
    let src = app.mkdir(ALICE, "Src", None).await;
    let dest = app.mkdir(ALICE, "Dest", None).await;
    let file = app.upload(ALICE, Some(src.id), "report.doc", 1).await;
    let ghost = app.upload(ALICE, Some(dest.id), "report.doc", 1).await;
    let ctx = app.ctx(ALICE).await;
    app.services
        .trash
        .soft_delete_file(&ctx, ghost.id)
        .await
        .expect("trash");

    let err = app
        .services
        .mover
        .move_file(&ctx, file.id, Some(dest.id))
        .await
        .expect_err("trashed sibling keeps its name");
    assert_eq!(err.field.as_deref(), Some("name"));
}

#[tokio::test]
async fn test_trashed_target_is_rejected() {
    let app = TestApp::new().await;
    let bin = app.mkdir(ALICE, "Bin", None).await;
    let file = app.upload(ALICE, None, "loose.txt", 1).await;
    let ctx = app.ctx(ALICE).await;
    app.services
        .trash
        .soft_delete_folder(&ctx, bin.id)
        .await
        .expect("trash");

    let err = app
        .services
        .mover
        .move_file(&ctx, file.id, Some(bin.id))
        .await
        .expect_err("trashed target");
    assert_eq!(err.field.as_deref(), Some("target"));
}

#[tokio::test]
async fn test_editor_stays_inside_shared_subtree() {
    let app = TestApp::new().await;
    let project = app.mkdir(ALICE, "Project", None).await;
    let drafts = app.mkdir(ALICE, "Drafts", Some(project.id)).await;
    let final_dir = app.mkdir(ALICE, "Final", Some(project.id)).await;
    let elsewhere = app.mkdir(ALICE, "Elsewhere", None).await;
    let file = app.upload(ALICE, Some(drafts.id), "essay.md", 5).await;
    let bob_home = app.mkdir(BOB, "Mine", None).await;

    app.share_folder(ALICE, project.id, BOB, SharePermission::Edit)
        .await;
    app.share_folder(ALICE, elsewhere.id, BOB, SharePermission::Edit)
        .await;
    let ctx = app.ctx(BOB).await;

    let moved = app
        .services
        .mover
        .move_file(&ctx, file.id, Some(final_dir.id))
        .await
        .expect("move inside share");
    assert_eq!(moved.folder_id, Some(final_dir.id));

    for target in [Some(elsewhere.id), Some(bob_home.id), None] {
        let err = app
            .services
            .mover
            .move_file(&ctx, file.id, target)
            .await
            .expect_err("outside share");
        assert_eq!(err.kind, ErrorKind::Authorization, "target {target:?}");
    }

    let err = app
        .services
        .mover
        .move_folder(&ctx, drafts.id, Some(elsewhere.id))
        .await
        .expect_err("folder outside share");
    assert_eq!(err.kind, ErrorKind::Authorization);
    assert_eq!(app.file(file.id).await.expect("file").folder_id, Some(final_dir.id));
}

#[tokio::test]
async fn test_file_share_editor_cannot_move() {
    let app = TestApp::new().await;
    let folder = app.mkdir(ALICE, "Private", None).await;
    let file = app.upload(ALICE, Some(folder.id), "shared.txt", 5).await;
    let bob_home = app.mkdir(BOB, "Mine", None).await;
    app.share_file(ALICE, file.id, BOB, SharePermission::Edit)
        .await;
    let ctx = app.ctx(BOB).await;

    let err = app
        .services
        .mover
        .move_file(&ctx, file.id, Some(bob_home.id))
        .await
        .expect_err("no shared subtree");
    assert_eq!(err.kind, ErrorKind::Authorization);
    assert_eq!(app.file(file.id).await.expect("file").folder_id, Some(folder.id));
}

#[tokio::test]
async fn test_stranger_sees_not_found() {
    let app = TestApp::new().await;
    let folder = app.mkdir(ALICE, "Secret", None).await;
    let file = app.upload(ALICE, Some(folder.id), "key.pem", 5).await;
    let bob_home = app.mkdir(BOB, "Mine", None).await;
    let ctx = app.ctx(BOB).await;

    let err = app
        .services
        .mover
        .move_file(&ctx, file.id, Some(bob_home.id))
        .await
        .expect_err("hidden");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_bulk_move_of_folder_and_its_descendant() {
    let app = TestApp::new().await;
    let a = app.mkdir(ALICE, "A", None).await;
    let b = app.mkdir(ALICE, "B", Some(a.id)).await;
    let c = app.mkdir(ALICE, "C", Some(b.id)).await;
    let target = app.mkdir(ALICE, "T", None).await;
    let ctx = app.ctx(ALICE).await;

    let report = app
        .services
        .mover
        .move_many(&ctx, &[MoveItem::Folder(a.id), MoveItem::Folder(b.id)], Some(target.id))
        .await
        .expect("move");
    assert_eq!(report.moved, vec![MoveItem::Folder(a.id), MoveItem::Folder(b.id)]);

    let a = app.folder(a.id).await.expect("a");
    let b = app.folder(b.id).await.expect("b");
    let c = app.folder(c.id).await.expect("c");
    assert_eq!(a.path.as_str(), format!("/{}/{}/", target.id, a.id));
    assert_eq!(b.parent_id, Some(target.id));
    assert_eq!(b.path.as_str(), format!("/{}/{}/", target.id, b.id));
    assert_eq!(c.path.as_str(), format!("/{}/{}/{}/", target.id, b.id, c.id));

    for id in [a.id, b.id] {
        let events = app
            .store
            .find_events(ResourceType::Folder, &id.to_string())
            .await
            .expect("events");
        let moves = events.iter().filter(|e| e.action == SyncAction::Move).count();
        assert_eq!(moves, 1, "folder {id}");
    }
}
