mod helpers;

use helpers::TestApp;
use lockbox_core::error::ErrorKind;
use lockbox_entity::folder::{PERSONAL_ROOT_ID, ROOT_FOLDER_ID};
use lockbox_entity::group::EVERYONE_GROUP_ID;
use lockbox_entity::kms::KmsType;
use lockbox_entity::permission::Permissions;
use lockbox_service::folder::{CreateFolderRequest, UpdateFolderRequest};
use lockbox_service::group::CreateGroupRequest;

const READ: Permissions = Permissions {
    read: true,
    write: false,
};

async fn group_with(app: &TestApp, name: &str, user_id: &str) -> String {
    let group = app
        .lockbox
        .groups
        .create_group(
            &app.admin,
            CreateGroupRequest {
                description: name.into(),
                parent: None,
            },
        )
        .await
        .unwrap();
    app.lockbox
        .groups
        .add_member(&app.admin, &group.id, user_id)
        .await
        .unwrap();
    group.id
}

#[tokio::test]
async fn test_grant_reaches_children_and_revoke_removes_access() {
    let app = TestApp::new().await;
    let (alice, ctx) = app.user("alice").await;
    let team = group_with(&app, "team", &alice.id).await;

    let shared = app.folder(ROOT_FOLDER_ID, "shared").await;
    let nested = app.folder(&shared, "nested").await;

    // Warm the caches before the grant.
    assert!(!app
        .lockbox
        .folder_hierarchy
        .readable_ids(&ctx)
        .await
        .unwrap()
        .contains(&nested));

    app.lockbox
        .permissions
        .set_permission(&app.admin, &shared, &team, READ)
        .await
        .unwrap();

    let perms = app.lockbox.folders.permissions(&ctx, &nested).await.unwrap();
    assert!(perms.read);
    assert!(!perms.write);

    let readable = app.lockbox.folder_hierarchy.readable_ids(&ctx).await.unwrap();
    assert!(readable.contains(&shared));
    assert!(readable.contains(&nested));
    assert!(!readable.contains(&ROOT_FOLDER_ID.to_string()));

    let tree = app.lockbox.folders.tree(&ctx).await.unwrap();
    let root = tree.find(ROOT_FOLDER_ID).unwrap();
    assert!(!root.readable);
    assert!(tree.find(&nested).unwrap().readable);

    app.lockbox
        .permissions
        .set_permission(&app.admin, &shared, &team, Permissions::NONE)
        .await
        .unwrap();

    let err = app.lockbox.folders.get_folder(&ctx, &nested).await.unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));
    let readable = app.lockbox.folder_hierarchy.readable_ids(&ctx).await.unwrap();
    assert!(!readable.contains(&shared));
    assert!(app.lockbox.folders.tree(&ctx).await.unwrap().find(&nested).is_none());
}

#[tokio::test]
async fn test_write_without_read_is_rejected() {
    let app = TestApp::new().await;
    let (alice, _) = app.user("alice").await;
    let team = group_with(&app, "team", &alice.id).await;
    let shared = app.folder(ROOT_FOLDER_ID, "shared").await;

    let err = app
        .lockbox
        .permissions
        .set_permission(
            &app.admin,
            &shared,
            &team,
            Permissions {
                read: false,
                write: true,
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Unprocessable));
    assert!(app
        .lockbox
        .permissions
        .list_permissions(&app.admin, &shared)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_non_admin_cannot_set_permissions() {
    let app = TestApp::new().await;
    let (alice, ctx) = app.user("alice").await;
    let team = group_with(&app, "team", &alice.id).await;
    let shared = app.folder(ROOT_FOLDER_ID, "shared").await;

    let err = app
        .lockbox
        .permissions
        .set_permission(&ctx, &shared, &team, READ)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));
}

#[tokio::test]
async fn test_delete_folder_with_item_is_rejected() {
    let app = TestApp::new().await;
    app.active_kms(KmsType::LocalFile, "local").await;
    let shared = app.folder(ROOT_FOLDER_ID, "shared").await;
    let item = app.item(&app.admin, &shared, "s3cret").await;

    let err = app
        .lockbox
        .folders
        .delete_folder(&app.admin, &shared)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Unprocessable));
    assert!(app.lockbox.folders.get_folder(&app.admin, &shared).await.is_ok());

    app.lockbox.items.delete_item(&app.admin, &item.id).await.unwrap();
    app.lockbox
        .folders
        .delete_folder(&app.admin, &shared)
        .await
        .unwrap();
    let err = app
        .lockbox
        .folders
        .get_folder(&app.admin, &shared)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_delete_folder_with_children_is_rejected() {
    let app = TestApp::new().await;
    let shared = app.folder(ROOT_FOLDER_ID, "shared").await;
    app.folder(&shared, "nested").await;

    let err = app
        .lockbox
        .folders
        .delete_folder(&app.admin, &shared)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Unprocessable));
}

#[tokio::test]
async fn test_fixed_folders_are_protected() {
    let app = TestApp::new().await;

    for id in [ROOT_FOLDER_ID, PERSONAL_ROOT_ID] {
        let err = app
            .lockbox
            .folders
            .delete_folder(&app.admin, id)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Unprocessable), "{id}");
    }

    let err = app
        .lockbox
        .folders
        .create_folder(
            &app.admin,
            CreateFolderRequest {
                parent: PERSONAL_ROOT_ID.into(),
                description: "sneaky".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Unprocessable));
}

#[tokio::test]
async fn test_move_into_own_subtree_is_rejected() {
    let app = TestApp::new().await;
    let top = app.folder(ROOT_FOLDER_ID, "top").await;
    let middle = app.folder(&top, "middle").await;
    let bottom = app.folder(&middle, "bottom").await;

    for dest in [&top, &bottom] {
        let err = app
            .lockbox
            .folders
            .update_folder(
                &app.admin,
                &top,
                UpdateFolderRequest {
                    description: None,
                    parent: Some(dest.clone()),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Unprocessable));
    }

    let moved = app
        .lockbox
        .folders
        .update_folder(
            &app.admin,
            &bottom,
            UpdateFolderRequest {
                description: Some("renamed".into()),
                parent: Some(top.clone()),
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.parent.as_deref(), Some(top.as_str()));
    assert_eq!(moved.description, "renamed");
}

#[tokio::test]
async fn test_move_needs_write_on_destination() {
    let app = TestApp::new().await;
    let (alice, ctx) = app.user("alice").await;
    let team = group_with(&app, "team", &alice.id).await;

    let writable = app.folder(ROOT_FOLDER_ID, "writable").await;
    let readonly = app.folder(ROOT_FOLDER_ID, "readonly").await;
    let child = app.folder(&writable, "child").await;
    app.lockbox
        .permissions
        .set_permission(&app.admin, &writable, &team, Permissions::FULL)
        .await
        .unwrap();
    app.lockbox
        .permissions
        .set_permission(&app.admin, &readonly, &team, READ)
        .await
        .unwrap();

    let err = app
        .lockbox
        .folders
        .update_folder(
            &ctx,
            &child,
            UpdateFolderRequest {
                description: None,
                parent: Some(readonly),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));
}

#[tokio::test]
async fn test_personal_folders_are_private() {
    let app = TestApp::new().await;
    let (alice, alice_ctx) = app.user("alice").await;
    let (_, bob_ctx) = app.user("bob").await;

    let alice_root = app
        .lockbox
        .folders
        .tree(&alice_ctx)
        .await
        .unwrap()
        .find(PERSONAL_ROOT_ID)
        .unwrap()
        .children[0]
        .id
        .clone();

    let private = app
        .lockbox
        .folders
        .create_folder(
            &alice_ctx,
            CreateFolderRequest {
                parent: alice_root.clone(),
                description: "diary".into(),
            },
        )
        .await
        .unwrap();
    assert!(private.personal);
    assert_eq!(private.user_id.as_deref(), Some(alice.id.as_str()));

    let err = app
        .lockbox
        .folders
        .get_folder(&bob_ctx, &private.id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));
    let bob_tree = app.lockbox.folders.tree(&bob_ctx).await.unwrap();
    assert!(bob_tree.find(&alice_root).is_none());
    assert!(bob_tree.find(&private.id).is_none());

    // Group grants never reach personal folders.
    let err = app
        .lockbox
        .permissions
        .set_permission(&app.admin, &private.id, EVERYONE_GROUP_ID, READ)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Unprocessable));

    // The owner needs an unlocked session.
    let locked = lockbox_service::RequestContext::new(alice.id.clone(), false, false);
    let err = app
        .lockbox
        .folders
        .get_folder(&locked, &private.id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));

    // Personal subtrees cannot move into the shared area.
    let err = app
        .lockbox
        .folders
        .update_folder(
            &app.admin,
            &private.id,
            UpdateFolderRequest {
                description: None,
                parent: Some(ROOT_FOLDER_ID.into()),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Unprocessable));
}

#[tokio::test]
async fn test_everyone_grant_and_revoke() {
    let app = TestApp::new().await;
    let (_, ctx) = app.user("alice").await;
    let a = app.folder(ROOT_FOLDER_ID, "A").await;

    assert_eq!(
        app.lockbox.folders.permissions(&ctx, &a).await.unwrap(),
        Permissions::NONE
    );

    app.lockbox
        .permissions
        .set_permission(&app.admin, &a, EVERYONE_GROUP_ID, Permissions::FULL)
        .await
        .unwrap();
    let child = app.folder(&a, "child").await;
    assert_eq!(
        app.lockbox.folders.permissions(&ctx, &a).await.unwrap(),
        Permissions::FULL
    );
    assert_eq!(
        app.lockbox.folders.permissions(&ctx, &child).await.unwrap(),
        Permissions::FULL
    );
    assert!(app.lockbox.folders.tree(&ctx).await.unwrap().find(&a).unwrap().readable);

    app.lockbox
        .permissions
        .set_permission(&app.admin, &a, EVERYONE_GROUP_ID, Permissions::NONE)
        .await
        .unwrap();
    assert_eq!(
        app.lockbox.folders.permissions(&ctx, &a).await.unwrap(),
        Permissions::NONE
    );
    assert_eq!(
        app.lockbox.folders.permissions(&ctx, &child).await.unwrap(),
        Permissions::NONE
    );
    assert!(app.lockbox.folders.tree(&ctx).await.unwrap().find(&a).is_none());
    assert!(!app
        .lockbox
        .folder_hierarchy
        .readable_ids(&ctx)
        .await
        .unwrap()
        .contains(&a));
}

#[tokio::test]
async fn test_blanket_grant_on_personal_root_does_not_expose_personal_folders() {
    let app = TestApp::new().await;
    let (alice, alice_ctx) = app.user("alice").await;
    let (_, bob_ctx) = app.user("bob").await;
    app.lockbox
        .permissions
        .set_permission(&app.admin, PERSONAL_ROOT_ID, EVERYONE_GROUP_ID, Permissions::FULL)
        .await
        .unwrap();

    let home = app
        .lockbox
        .folders
        .tree(&alice_ctx)
        .await
        .unwrap()
        .find(PERSONAL_ROOT_ID)
        .unwrap()
        .children
        .iter()
        .find(|n| n.description == alice.login)
        .unwrap()
        .id
        .clone();

    assert_eq!(
        app.lockbox.folders.permissions(&bob_ctx, &home).await.unwrap(),
        Permissions::NONE
    );
    assert_eq!(
        app.lockbox.folders.permissions(&alice_ctx, &home).await.unwrap(),
        Permissions::FULL
    );
    assert!(app.lockbox.folders.tree(&bob_ctx).await.unwrap().find(&home).is_none());
}

#[tokio::test]
async fn test_tree_follows_create_move_and_delete() {
    let app = TestApp::new().await;
    let (_, ctx) = app.user("alice").await;
    let a = app.folder(ROOT_FOLDER_ID, "a").await;
    let b = app.folder(ROOT_FOLDER_ID, "b").await;
    let c = app.folder(&b, "c").await;
    app.lockbox
        .permissions
        .set_permission(&app.admin, &a, EVERYONE_GROUP_ID, Permissions::FULL)
        .await
        .unwrap();

    // Warm the per-user caches.
    let tree = app.lockbox.folders.tree(&ctx).await.unwrap();
    assert!(tree.find(&a).unwrap().readable);
    assert!(tree.find(&c).is_none());

    let d = app.folder(&a, "d").await;
    assert!(app.lockbox.folders.tree(&ctx).await.unwrap().find(&d).unwrap().readable);

    app.lockbox
        .folders
        .update_folder(
            &app.admin,
            &c,
            UpdateFolderRequest {
                description: None,
                parent: Some(a.clone()),
            },
        )
        .await
        .unwrap();
    let tree = app.lockbox.folders.tree(&ctx).await.unwrap();
    assert!(tree.find(&c).unwrap().readable);
    assert!(tree.find(&b).is_none());
    assert!(app
        .lockbox
        .folder_hierarchy
        .readable_ids(&ctx)
        .await
        .unwrap()
        .contains(&c));

    app.lockbox.folders.delete_folder(&app.admin, &c).await.unwrap();
    assert!(app.lockbox.folders.tree(&ctx).await.unwrap().find(&c).is_none());
    assert!(!app
        .lockbox
        .folder_hierarchy
        .readable_ids(&ctx)
        .await
        .unwrap()
        .contains(&c));
}

#[tokio::test]
async fn test_admin_tree_omits_other_users_personal_folders() {
    let app = TestApp::new().await;
    let (alice, alice_ctx) = app.user("alice").await;
    let home = app
        .lockbox
        .folders
        .tree(&alice_ctx)
        .await
        .unwrap()
        .find(PERSONAL_ROOT_ID)
        .unwrap()
        .children
        .iter()
        .find(|n| n.description == alice.login)
        .unwrap()
        .id
        .clone();

    assert_eq!(
        app.lockbox.folders.permissions(&app.admin, &home).await.unwrap(),
        Permissions::FULL
    );
    assert!(app.lockbox.folders.get_folder(&app.admin, &home).await.is_ok());

    let tree = app.lockbox.folders.tree(&app.admin).await.unwrap();
    assert!(tree.find(PERSONAL_ROOT_ID).is_some());
    assert!(tree.find(&home).is_none());
}
