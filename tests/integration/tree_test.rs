//! Folder tree integration tests

mod helpers;

use helpers::{ALICE, TestApp};
use treevault_core::error::ErrorKind;
use treevault_service::PathTree;

#[tokio::test]
async fn test_paths_follow_parents() {
    let app = TestApp::new().await;
    let docs = app.mkdir(ALICE, "Docs", None).await;
    let reports = app.mkdir(ALICE, "Reports", Some(docs.id)).await;
    let q1 = app.mkdir(ALICE, "Q1", Some(reports.id)).await;

    assert_eq!(docs.path.as_str(), format!("/{}/", docs.id));
    assert_eq!(reports.path, docs.path.child(reports.id));
    assert_eq!(q1.path, reports.path.child(q1.id));
    assert_eq!(q1.path.depth(), 3);
}

#[tokio::test]
async fn test_descendants_match_path_prefix() {
    let app = TestApp::new().await;
    let root = app.mkdir(ALICE, "Root", None).await;
    let a = app.mkdir(ALICE, "A", Some(root.id)).await;
    let b = app.mkdir(ALICE, "B", Some(root.id)).await;
    let a1 = app.mkdir(ALICE, "A1", Some(a.id)).await;
    let other = app.mkdir(ALICE, "Other", None).await;

    let mut descendants = app
        .services
        .tree
        .collect_descendant_ids(root.id)
        .await
        .expect("descendants");
    descendants.sort();
    let mut expected = vec![a.id, b.id, a1.id];
    expected.sort();
    assert_eq!(descendants, expected);

    for id in &descendants {
        let folder = app.folder(*id).await.expect("folder");
        assert!(folder.path.is_strict_descendant_of(&root.path));
    }
    assert!(!other.path.is_descendant_or_self(&root.path));
}

#[tokio::test]
async fn test_ancestors_agree_with_path() {
    let app = TestApp::new().await;
    let mut parent = None;
    let mut chain = Vec::new();
    for name in ["L1", "L2", "L3", "L4", "L5"] {
        let folder = app.mkdir(ALICE, name, parent).await;
        parent = Some(folder.id);
        chain.push(folder);
    }
    let leaf = chain.last().expect("leaf");

    let walked = app
        .services
        .tree
        .collect_ancestor_ids(leaf.id)
        .await
        .expect("ancestors");
    assert_eq!(walked, PathTree::ancestor_ids_from_path(&leaf.path));
    assert_eq!(walked.first(), Some(&chain[3].id));
    assert_eq!(walked.last(), Some(&chain[0].id));
}

#[tokio::test]
async fn test_move_rewrites_subtree_paths() {
    let app = TestApp::new().await;
    let src = app.mkdir(ALICE, "Src", None).await;
    let moving = app.mkdir(ALICE, "Moving", Some(src.id)).await;
    let child = app.mkdir(ALICE, "Child", Some(moving.id)).await;
    let grandchild = app.mkdir(ALICE, "Grandchild", Some(child.id)).await;
    let dest = app.mkdir(ALICE, "Dest", None).await;

    let ctx = app.ctx(ALICE).await;
    let moved = app
        .services
        .mover
        .move_folder(&ctx, moving.id, Some(dest.id))
        .await
        .expect("move");
    assert_eq!(moved.parent_id, Some(dest.id));
    assert_eq!(moved.path, dest.path.child(moving.id));

    let child = app.folder(child.id).await.expect("child");
    let grandchild = app.folder(grandchild.id).await.expect("grandchild");
    assert_eq!(child.path, moved.path.child(child.id));
    assert_eq!(grandchild.path, child.path.child(grandchild.id));
    assert!(!grandchild.path.is_descendant_or_self(&src.path));

    let descendants = app
        .services
        .tree
        .collect_descendant_ids(src.id)
        .await
        .expect("descendants");
    assert!(descendants.is_empty());
}

#[tokio::test]
async fn test_move_into_self_or_descendant_is_rejected() {
    let app = TestApp::new().await;
    let top = app.mkdir(ALICE, "Top", None).await;
    let mid = app.mkdir(ALICE, "Mid", Some(top.id)).await;
    let deep = app.mkdir(ALICE, "Deep", Some(mid.id)).await;
    let ctx = app.ctx(ALICE).await;

    for target in [top.id, mid.id, deep.id] {
        let err = app
            .services
            .mover
            .move_folder(&ctx, top.id, Some(target))
            .await
            .expect_err("cycle");
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.field.as_deref(), Some("target"));
    }

    let top = app.folder(top.id).await.expect("top");
    assert_eq!(top.parent_id, None);
    assert_eq!(top.path.depth(), 1);
}

#[tokio::test]
async fn test_create_folder_validation() {
    let app = TestApp::new().await;
    let docs = app.mkdir(ALICE, "Docs", None).await;
    let ctx = app.ctx(ALICE).await;
    let folders = &app.services.folders;

    for bad in ["", "   ", "a/b", ".", ".."] {
        let err = folders
            .create_folder(&ctx, bad, None)
            .await
            .expect_err("invalid name");
        assert_eq!(err.field.as_deref(), Some("name"), "name {bad:?}");
    }

    let err = folders
        .create_folder(&ctx, "Docs", None)
        .await
        .expect_err("duplicate");
    assert_eq!(err.kind, ErrorKind::Validation);

    // Same name under a different parent is fine.
    let nested = folders
        .create_folder(&ctx, "Docs", Some(docs.id))
        .await
        .expect("nested");
    assert_eq!(nested.parent_id, Some(docs.id));

    app.services
        .trash
        .soft_delete_folder(&ctx, docs.id)
        .await
        .expect("trash");
    let ctx = app.ctx(ALICE).await;
    let err = folders
        .create_folder(&ctx, "Late", Some(docs.id))
        .await
        .expect_err("trashed parent");
    assert_eq!(err.field.as_deref(), Some("parent_id"));
}

#[tokio::test]
async fn test_rename_folder_keeps_path() {
    let app = TestApp::new().await;
    let docs = app.mkdir(ALICE, "Docs", None).await;
    app.mkdir(ALICE, "Taken", None).await;
    let ctx = app.ctx(ALICE).await;

    let renamed = app
        .services
        .folders
        .rename_folder(&ctx, docs.id, "Documents")
        .await
        .expect("rename");
    assert_eq!(renamed.name, "Documents");
    assert_eq!(renamed.path, docs.path);

    let err = app
        .services
        .folders
        .rename_folder(&ctx, docs.id, "Taken")
        .await
        .expect_err("collision");
    assert_eq!(err.field.as_deref(), Some("name"));
}
