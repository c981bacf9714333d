mod helpers;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use helpers::TestApp;
use lockbox_core::error::ErrorKind;
use lockbox_database::ApiKeyStore;
use lockbox_entity::kms::KmsType;
use lockbox_service::apikey::CreateApiKeyRequest;

fn expiry() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 12, 31).unwrap()
}

/// Monday 2030-01-07 at the given time, UTC.
fn monday(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 7, hour, minute, 0).unwrap()
}

fn request(ip_whitelist: &str, time_whitelist: &str) -> CreateApiKeyRequest {
    CreateApiKeyRequest {
        description: "ci".into(),
        expires_at: expiry(),
        ip_whitelist: ip_whitelist.into(),
        time_whitelist: time_whitelist.into(),
    }
}

#[tokio::test]
async fn test_authorize_checks_whitelists_and_secret() {
    let app = TestApp::new().await;
    app.active_kms(KmsType::LocalFile, "local").await;
    let (alice, ctx) = app.user("alice").await;

    let created = app
        .lockbox
        .api_keys
        .create_api_key(&ctx, request("10.0.0.0/8, 192.168.1.5", "MON:0900-1700"))
        .await
        .unwrap();
    let keys = &app.lockbox.api_keys;
    let id = created.key.id.as_str();
    let secret = created.secret.as_str();

    let identity = keys
        .authorize(id, secret, "10.1.2.3", monday(10, 0))
        .await
        .unwrap();
    assert_eq!(identity.user_id, alice.id);
    assert!(!identity.is_admin);
    assert!(!identity.personal_unlocked);
    assert!(keys.authorize(id, secret, "192.168.1.5", monday(17, 0)).await.is_ok());

    let tuesday = monday(10, 0) + chrono::Duration::days(1);
    let rejected = [
        keys.authorize(id, secret, "192.168.1.6", monday(10, 0)).await,
        keys.authorize(id, secret, "not-an-ip", monday(10, 0)).await,
        keys.authorize(id, secret, "10.1.2.3", monday(8, 59)).await,
        keys.authorize(id, secret, "10.1.2.3", tuesday).await,
        keys.authorize(id, "wrong", "10.1.2.3", monday(10, 0)).await,
        keys.authorize("missing", secret, "10.1.2.3", monday(10, 0)).await,
    ];
    for result in rejected {
        let err = result.unwrap_err();
        assert!(err.is(ErrorKind::Authentication));
        assert_eq!(err.message, "Invalid API key");
    }

    let used = app.store.find_api_key(id).await.unwrap().unwrap();
    assert!(used.last_used_at.is_some());
}

#[tokio::test]
async fn test_empty_whitelists_allow_everything() {
    let app = TestApp::new().await;
    app.active_kms(KmsType::LocalFile, "local").await;

    let created = app
        .lockbox
        .api_keys
        .create_api_key(&app.admin, request("", ""))
        .await
        .unwrap();
    let identity = app
        .lockbox
        .api_keys
        .authorize(&created.key.id, &created.secret, "203.0.113.9", monday(3, 0))
        .await
        .unwrap();
    assert!(identity.is_admin);
}

#[tokio::test]
async fn test_expired_key_is_rejected() {
    let app = TestApp::new().await;
    app.active_kms(KmsType::LocalFile, "local").await;
    let created = app
        .lockbox
        .api_keys
        .create_api_key(&app.admin, request("", ""))
        .await
        .unwrap();

    let after = Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap();
    let err = app
        .lockbox
        .api_keys
        .authorize(&created.key.id, &created.secret, "10.0.0.1", after)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Authentication));

    // The expiry date itself is still valid.
    let last_day = Utc.with_ymd_and_hms(2030, 12, 31, 23, 59, 0).unwrap();
    assert!(app
        .lockbox
        .api_keys
        .authorize(&created.key.id, &created.secret, "10.0.0.1", last_day)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_invalid_whitelists_are_rejected() {
    let app = TestApp::new().await;
    app.active_kms(KmsType::LocalFile, "local").await;

    for (ip, time) in [
        ("10.0.0.0/33", ""),
        ("10.0.0.0/8,banana", ""),
        ("", "FUNDAY:0900-1700"),
        ("", "MON:900-1700"),
    ] {
        let err = app
            .lockbox
            .api_keys
            .create_api_key(&app.admin, request(ip, time))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Unprocessable), "{ip:?} {time:?}");
    }
    assert!(app.lockbox.api_keys.list_api_keys(&app.admin).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_past_expiry_is_rejected() {
    let app = TestApp::new().await;
    app.active_kms(KmsType::LocalFile, "local").await;

    let mut req = request("", "");
    req.expires_at = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
    let err = app
        .lockbox
        .api_keys
        .create_api_key(&app.admin, req)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));
}

#[tokio::test]
async fn test_reveal_and_delete_respect_ownership() {
    let app = TestApp::new().await;
    app.active_kms(KmsType::LocalFile, "local").await;
    let (_, alice) = app.user("alice").await;
    let (_, bob) = app.user("bob").await;

    let created = app
        .lockbox
        .api_keys
        .create_api_key(&alice, request("", ""))
        .await
        .unwrap();
    let id = created.key.id.as_str();

    let revealed = app.lockbox.api_keys.reveal_secret(&alice, id).await.unwrap();
    assert_eq!(revealed, created.secret);
    assert_ne!(created.key.secret_hash, created.secret);

    let err = app.lockbox.api_keys.reveal_secret(&bob, id).await.unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));
    let err = app.lockbox.api_keys.delete_api_key(&bob, id).await.unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));

    assert!(app.lockbox.api_keys.list_api_keys(&bob).await.unwrap().is_empty());
    assert_eq!(app.lockbox.api_keys.list_api_keys(&alice).await.unwrap().len(), 1);
    assert_eq!(app.lockbox.api_keys.list_api_keys(&app.admin).await.unwrap().len(), 1);

    app.lockbox.api_keys.delete_api_key(&app.admin, id).await.unwrap();
    let err = app.lockbox.api_keys.reveal_secret(&alice, id).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_key_stops_working_when_owner_is_deleted() {
    let app = TestApp::new().await;
    app.active_kms(KmsType::LocalFile, "local").await;
    let (alice, ctx) = app.user("alice").await;
    let created = app
        .lockbox
        .api_keys
        .create_api_key(&ctx, request("", ""))
        .await
        .unwrap();

    app.lockbox.users.delete_user(&app.admin, &alice.id).await.unwrap();

    let err = app
        .lockbox
        .api_keys
        .authorize(&created.key.id, &created.secret, "10.0.0.1", monday(10, 0))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Authentication));
}
