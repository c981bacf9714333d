mod helpers;

use helpers::TestApp;
use lockbox_core::error::ErrorKind;
use lockbox_entity::folder::ROOT_FOLDER_ID;
use lockbox_entity::group::{ADMINS_GROUP_ID, EVERYONE_GROUP_ID, ROOT_GROUP_ID};
use lockbox_entity::permission::Permissions;
use lockbox_service::group::{CreateGroupRequest, UpdateGroupRequest};

async fn create(app: &TestApp, name: &str, parent: Option<&str>) -> String {
    app.lockbox
        .groups
        .create_group(
            &app.admin,
            CreateGroupRequest {
                description: name.into(),
                parent: parent.map(str::to_string),
            },
        )
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_group_tree_lists_fixed_and_new_groups() {
    let app = TestApp::new().await;
    let dev = create(&app, "dev", None).await;
    let backend = create(&app, "backend", Some(&dev)).await;

    let tree = app.lockbox.groups.tree(&app.admin).await.unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].id, ROOT_GROUP_ID);
    let top: Vec<&str> = tree[0].children.iter().map(|g| g.id.as_str()).collect();
    assert!(top.contains(&ADMINS_GROUP_ID));
    assert!(top.contains(&EVERYONE_GROUP_ID));
    let dev_node = tree[0].children.iter().find(|g| g.id == dev).unwrap();
    assert_eq!(dev_node.children[0].id, backend);
}

#[tokio::test]
async fn test_group_cannot_move_under_itself() {
    let app = TestApp::new().await;
    let dev = create(&app, "dev", None).await;
    let backend = create(&app, "backend", Some(&dev)).await;

    let err = app
        .lockbox
        .groups
        .update_group(
            &app.admin,
            &dev,
            UpdateGroupRequest {
                description: None,
                parent: Some(backend),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Unprocessable));

    let err = app
        .lockbox
        .groups
        .update_group(
            &app.admin,
            ADMINS_GROUP_ID,
            UpdateGroupRequest {
                description: Some("root users".into()),
                parent: None,
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Unprocessable));
}

#[tokio::test]
async fn test_delete_rules() {
    let app = TestApp::new().await;
    let (alice, _) = app.user("alice").await;
    let dev = create(&app, "dev", None).await;
    let backend = create(&app, "backend", Some(&dev)).await;

    let err = app
        .lockbox
        .groups
        .delete_group(&app.admin, &dev)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Unprocessable), "has children");

    app.lockbox
        .groups
        .add_member(&app.admin, &backend, &alice.id)
        .await
        .unwrap();
    let err = app
        .lockbox
        .groups
        .delete_group(&app.admin, &backend)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Unprocessable), "has members");

    app.lockbox
        .groups
        .remove_member(&app.admin, &backend, &alice.id)
        .await
        .unwrap();
    app.lockbox
        .groups
        .delete_group(&app.admin, &backend)
        .await
        .unwrap();
    app.lockbox.groups.delete_group(&app.admin, &dev).await.unwrap();

    for fixed in [ROOT_GROUP_ID, ADMINS_GROUP_ID, EVERYONE_GROUP_ID] {
        let err = app
            .lockbox
            .groups
            .delete_group(&app.admin, fixed)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Unprocessable), "{fixed}");
    }
}

#[tokio::test]
async fn test_membership_rules() {
    let app = TestApp::new().await;
    let (alice, ctx) = app.user("alice").await;
    let dev = create(&app, "dev", None).await;

    app.lockbox
        .groups
        .add_member(&app.admin, &dev, &alice.id)
        .await
        .unwrap();
    let err = app
        .lockbox
        .groups
        .add_member(&app.admin, &dev, &alice.id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Conflict));

    let err = app
        .lockbox
        .groups
        .add_member(&app.admin, &dev, "ghost")
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));

    let err = app
        .lockbox
        .groups
        .remove_member(&app.admin, EVERYONE_GROUP_ID, &alice.id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Unprocessable));

    let err = app
        .lockbox
        .groups
        .remove_member(&app.admin, ADMINS_GROUP_ID, &app.admin.user_id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Unprocessable));

    let err = app
        .lockbox
        .groups
        .add_member(&ctx, &dev, &alice.id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));

    let members = app.lockbox.groups.list_members(&app.admin, &dev).await.unwrap();
    assert_eq!(members, vec![alice.id.clone()]);
}

#[tokio::test]
async fn test_membership_change_updates_folder_access() {
    let app = TestApp::new().await;
    let (alice, ctx) = app.user("alice").await;
    let dev = create(&app, "dev", None).await;
    let folder = app.folder(ROOT_FOLDER_ID, "dev-secrets").await;
    app.lockbox
        .permissions
        .set_permission(&app.admin, &folder, &dev, Permissions::FULL)
        .await
        .unwrap();

    assert!(!app
        .lockbox
        .folder_hierarchy
        .readable_ids(&ctx)
        .await
        .unwrap()
        .contains(&folder));

    app.lockbox
        .groups
        .add_member(&app.admin, &dev, &alice.id)
        .await
        .unwrap();
    assert!(app
        .lockbox
        .folder_hierarchy
        .readable_ids(&ctx)
        .await
        .unwrap()
        .contains(&folder));
    assert!(app.lockbox.folders.permissions(&ctx, &folder).await.unwrap().write);

    app.lockbox
        .groups
        .remove_member(&app.admin, &dev, &alice.id)
        .await
        .unwrap();
    assert!(!app
        .lockbox
        .folder_hierarchy
        .readable_ids(&ctx)
        .await
        .unwrap()
        .contains(&folder));
    let err = app.lockbox.folders.get_folder(&ctx, &folder).await.unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));
}
