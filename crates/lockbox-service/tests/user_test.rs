mod helpers;

use helpers::TestApp;
use lockbox_core::error::ErrorKind;
use lockbox_database::{FolderStore, MembershipStore};
use lockbox_entity::folder::PERSONAL_ROOT_ID;
use lockbox_entity::group::{ADMINS_GROUP_ID, EVERYONE_GROUP_ID};
use lockbox_entity::kms::KmsType;
use lockbox_service::folder::CreateFolderRequest;
use lockbox_service::user::CreateUserRequest;

fn request(login: &str, password: &str) -> CreateUserRequest {
    CreateUserRequest {
        login: login.into(),
        email: format!("{login}@example.com"),
        password: password.into(),
        admin: false,
    }
}

#[tokio::test]
async fn test_new_user_gets_personal_folder_and_everyone() {
    let app = TestApp::new().await;
    let (alice, _) = app.user("alice").await;

    let folders = app.store.list_folders().await.unwrap();
    let personal: Vec<_> = folders.iter().filter(|f| f.is_owned_by(&alice.id)).collect();
    assert_eq!(personal.len(), 1);
    assert_eq!(personal[0].description, "alice");
    assert_eq!(personal[0].parent.as_deref(), Some(PERSONAL_ROOT_ID));
    assert!(personal[0].personal);

    let groups = app.store.list_user_groups(&alice.id).await.unwrap();
    assert_eq!(groups, vec![EVERYONE_GROUP_ID.to_string()]);
    assert!(app
        .store
        .is_member(ADMINS_GROUP_ID, &app.admin.user_id)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_create_user_validation() {
    let app = TestApp::new().await;
    app.user("alice").await;

    let err = app
        .lockbox
        .users
        .create_user(&app.admin, request("alice", "another-pass-1"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Conflict));

    let err = app
        .lockbox
        .users
        .create_user(&app.admin, request("bob", "short"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));

    let mut bad_email = request("carol", "carol-pass-1");
    bad_email.email = "not-an-address".into();
    let err = app
        .lockbox
        .users
        .create_user(&app.admin, bad_email)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));

    let (_, ctx) = app.user("dave").await;
    let err = app
        .lockbox
        .users
        .create_user(&ctx, request("erin", "erin-pass-1"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));
}

#[tokio::test]
async fn test_delete_user_rules() {
    let app = TestApp::new().await;

    let err = app
        .lockbox
        .users
        .delete_user(&app.admin, &app.admin.user_id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Unprocessable));

    let err = app
        .lockbox
        .users
        .delete_user(&app.admin, "ghost")
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));

    let (_, ctx) = app.user("alice").await;
    let err = app
        .lockbox
        .users
        .delete_user(&ctx, &app.admin.user_id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));
}

#[tokio::test]
async fn test_delete_user_removes_personal_data() {
    let app = TestApp::new().await;
    app.active_kms(KmsType::LocalFile, "local").await;
    let (alice, ctx) = app.user("alice").await;

    let home = app
        .store
        .list_folders()
        .await
        .unwrap()
        .into_iter()
        .find(|f| f.is_owned_by(&alice.id))
        .unwrap();
    let diary = app
        .lockbox
        .folders
        .create_folder(
            &ctx,
            CreateFolderRequest {
                parent: home.id.clone(),
                description: "diary".into(),
            },
        )
        .await
        .unwrap();
    let item = app.item(&ctx, &diary.id, "dear diary").await;

    // Warm alice's cached tree.
    assert!(app.lockbox.folders.tree(&ctx).await.unwrap().find(&diary.id).is_some());

    app.lockbox.users.delete_user(&app.admin, &alice.id).await.unwrap();

    assert!(app.store.find_folder(&home.id).await.unwrap().is_none());
    assert!(app.store.find_folder(&diary.id).await.unwrap().is_none());
    let err = app.lockbox.items.get_item(&app.admin, &item.id).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
    assert!(app.store.list_user_groups(&alice.id).await.unwrap().is_empty());
    assert!(app.lockbox.folders.tree(&ctx).await.unwrap().find(&diary.id).is_none());
}

#[tokio::test]
async fn test_authenticate() {
    let app = TestApp::new().await;
    let (alice, _) = app.user("alice").await;

    let identity = app
        .lockbox
        .users
        .authenticate("alice", "alice-pass-1")
        .await
        .unwrap();
    assert_eq!(identity.user_id, alice.id);
    assert!(!identity.is_admin);
    assert!(!identity.personal_unlocked);

    let admin = app
        .lockbox
        .users
        .authenticate("admin", "admin-pass-1")
        .await
        .unwrap();
    assert!(admin.is_admin);

    for (login, password) in [("alice", "wrong-pass-1"), ("nobody", "alice-pass-1")] {
        let err = app
            .lockbox
            .users
            .authenticate(login, password)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Authentication));
    }
}

#[tokio::test]
async fn test_users_see_only_themselves() {
    let app = TestApp::new().await;
    let (alice, ctx) = app.user("alice").await;

    assert_eq!(
        app.lockbox.users.get_user(&ctx, &alice.id).await.unwrap().login,
        "alice"
    );
    let err = app
        .lockbox
        .users
        .get_user(&ctx, &app.admin.user_id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));
    assert_eq!(app.lockbox.users.list_users(&app.admin).await.unwrap().len(), 2);
}
