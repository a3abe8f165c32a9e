//! Share and guest link integration tests

mod helpers;

use chrono::{Duration, Utc};
use helpers::{ALICE, BOB, CAROL, STRANGER, TestApp};
use treevault_core::error::ErrorKind;
use treevault_core::types::UserId;
use treevault_entity::share::{SharePermission, ShareTarget};
use treevault_service::{ShareRequest, UpdateShareRequest};

fn request(target: ShareTarget, recipient: UserId) -> ShareRequest {
    ShareRequest {
        target,
        recipient_id: recipient,
        permission: SharePermission::View,
        expires_at: None,
        notes: None,
    }
}

#[tokio::test]
async fn test_share_is_upserted_per_recipient() {
    let app = TestApp::new().await;
    let folder = app.mkdir(ALICE, "Photos", None).await;
    let first = app
        .share_folder(ALICE, folder.id, BOB, SharePermission::View)
        .await;
    let second = app
        .share_folder(ALICE, folder.id, BOB, SharePermission::Edit)
        .await;

    assert_eq!(first.id, second.id);
    assert_eq!(second.permission, SharePermission::Edit);
    assert_eq!(second.shared_by, ALICE);

    let ctx = app.ctx(ALICE).await;
    let shares = app
        .services
        .shares
        .list_shares(&ctx, ShareTarget::Folder(folder.id))
        .await
        .expect("list");
    assert_eq!(shares.len(), 1);
}

#[tokio::test]
async fn test_share_validation() {
    let app = TestApp::new().await;
    let folder = app.mkdir(ALICE, "Docs", None).await;
    let target = ShareTarget::Folder(folder.id);
    let ctx = app.ctx(ALICE).await;

    let err = app
        .services
        .shares
        .share(&ctx, request(target, ALICE))
        .await
        .expect_err("share with self");
    assert_eq!(err.field.as_deref(), Some("recipient_id"));

    let err = app
        .services
        .shares
        .share(
            &ctx,
            ShareRequest {
                expires_at: Some(ctx.request_time - Duration::minutes(1)),
                ..request(target, BOB)
            },
        )
        .await
        .expect_err("expired");
    assert_eq!(err.field.as_deref(), Some("expires_at"));

    app.services
        .trash
        .soft_delete_folder(&ctx, folder.id)
        .await
        .expect("trash");
    let ctx = app.ctx(ALICE).await;
    let err = app
        .services
        .shares
        .share(&ctx, request(target, BOB))
        .await
        .expect_err("trashed");
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_only_owner_or_share_any_may_share() {
    let app = TestApp::new().await;
    let folder = app.mkdir(ALICE, "Team", None).await;
    let target = ShareTarget::Folder(folder.id);
    app.share_folder(ALICE, folder.id, BOB, SharePermission::Edit)
        .await;

    let bob = app.ctx(BOB).await;
    let err = app
        .services
        .shares
        .share(&bob, request(target, CAROL))
        .await
        .expect_err("editor cannot reshare");
    assert_eq!(err.kind, ErrorKind::Authorization);

    let carol = app.ctx(CAROL).await;
    let err = app
        .services
        .shares
        .share(&carol, request(target, BOB))
        .await
        .expect_err("stranger");
    assert_eq!(err.kind, ErrorKind::NotFound);

    app.grant(CAROL, "share-any").await;
    let carol = app.ctx(CAROL).await;
    let share = app
        .services
        .shares
        .share(&carol, request(target, BOB))
        .await
        .expect("share-any");
    assert_eq!(share.shared_by, CAROL);
}

#[tokio::test]
async fn test_update_and_revoke() {
    let app = TestApp::new().await;
    let folder = app.mkdir(ALICE, "Plans", None).await;
    let share = app
        .share_folder(ALICE, folder.id, BOB, SharePermission::View)
        .await;

    let bob = app.ctx(BOB).await;
    let err = app
        .services
        .shares
        .update_share(
            &bob,
            share.id,
            UpdateShareRequest {
                permission: SharePermission::Edit,
                expires_at: None,
                notes: None,
            },
        )
        .await
        .expect_err("recipient cannot upgrade");
    assert_eq!(err.kind, ErrorKind::NotFound);

    let alice = app.ctx(ALICE).await;
    let updated = app
        .services
        .shares
        .update_share(
            &alice,
            share.id,
            UpdateShareRequest {
                permission: SharePermission::Edit,
                expires_at: None,
                notes: Some("for review".into()),
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.permission, SharePermission::Edit);
    assert_eq!(updated.notes.as_deref(), Some("for review"));

    let bob = app.ctx(BOB).await;
    assert!(bob.permissions.can_edit_folder(&folder));

    app.services
        .shares
        .revoke(&alice, share.id)
        .await
        .expect("revoke");
    let err = app
        .services
        .shares
        .revoke(&alice, share.id)
        .await
        .expect_err("already revoked");
    assert_eq!(err.kind, ErrorKind::NotFound);

    let bob = app.ctx(BOB).await;
    assert!(!bob.permissions.can_view_folder(&folder));
}

#[tokio::test]
async fn test_list_shares_visibility() {
    let app = TestApp::new().await;
    let folder = app.mkdir(ALICE, "Board", None).await;
    let target = ShareTarget::Folder(folder.id);
    app.share_folder(ALICE, folder.id, BOB, SharePermission::View)
        .await;
    app.share_folder(ALICE, folder.id, CAROL, SharePermission::Edit)
        .await;

    let alice = app.ctx(ALICE).await;
    let all = app
        .services
        .shares
        .list_shares(&alice, target)
        .await
        .expect("owner list");
    assert_eq!(all.len(), 2);

    let bob = app.ctx(BOB).await;
    let own = app
        .services
        .shares
        .list_shares(&bob, target)
        .await
        .expect("recipient list");
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].recipient_id, Some(BOB));

    let stranger = app.ctx(STRANGER).await;
    let err = app
        .services
        .shares
        .list_shares(&stranger, target)
        .await
        .expect_err("hidden");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_guest_link_lifecycle() {
    let app = TestApp::new().await;
    let file = app.upload(ALICE, None, "brochure.pdf", 10).await;
    let target = ShareTarget::File(file.id);
    let alice = app.ctx(ALICE).await;

    let link = app
        .services
        .shares
        .create_guest_link(&alice, target, SharePermission::View, None)
        .await
        .expect("link");
    assert_eq!(link.token.len(), 64);
    assert!(link.share.is_guest_link());
    assert_ne!(link.share.token_hash.as_deref(), Some(link.token.as_str()));

    let now = Utc::now();
    let resolved = app
        .services
        .shares
        .resolve_guest_link(&link.token, now)
        .await
        .expect("resolve");
    assert_eq!(resolved.id, link.share.id);
    assert_eq!(resolved.target, target);

    let err = app
        .services
        .shares
        .resolve_guest_link("not-a-token", now)
        .await
        .expect_err("unknown");
    assert_eq!(err.kind, ErrorKind::NotFound);

    // Creating the link again rotates the token on the same share.
    let rotated = app
        .services
        .shares
        .create_guest_link(&alice, target, SharePermission::View, None)
        .await
        .expect("rotate");
    assert_eq!(rotated.share.id, link.share.id);
    assert_ne!(rotated.token, link.token);
    assert!(
        app.services
            .shares
            .resolve_guest_link(&link.token, now)
            .await
            .is_err()
    );
    assert!(
        app.services
            .shares
            .resolve_guest_link(&rotated.token, now)
            .await
            .is_ok()
    );

    app.services
        .trash
        .soft_delete_file(&alice, file.id)
        .await
        .expect("trash");
    let err = app
        .services
        .shares
        .resolve_guest_link(&rotated.token, now)
        .await
        .expect_err("trashed target");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_guest_link_expires() {
    let app = TestApp::new().await;
    let folder = app.mkdir(ALICE, "Press", None).await;
    let alice = app.ctx(ALICE).await;
    let expires_at = alice.request_time + Duration::hours(1);

    let link = app
        .services
        .shares
        .create_guest_link(
            &alice,
            ShareTarget::Folder(folder.id),
            SharePermission::View,
            Some(expires_at),
        )
        .await
        .expect("link");

    assert!(
        app.services
            .shares
            .resolve_guest_link(&link.token, expires_at - Duration::minutes(1))
            .await
            .is_ok()
    );
    let err = app
        .services
        .shares
        .resolve_guest_link(&link.token, expires_at)
        .await
        .expect_err("expired");
    assert_eq!(err.kind, ErrorKind::NotFound);
}
