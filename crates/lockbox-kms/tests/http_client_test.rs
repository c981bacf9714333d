use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lockbox_core::error::ErrorKind;
use lockbox_kms::client::HttpKeyWrapClient;
use lockbox_kms::{CloudKmsConfig, KeyWrapClient};

const KEY: &str = "projects/p/locations/global/keyRings/lockbox/cryptoKeys/items";

fn config(server: &MockServer) -> CloudKmsConfig {
    CloudKmsConfig {
        endpoint: format!("{}/v1/", server.uri()),
        key_name: KEY.to_string(),
        token_env: "LOCKBOX_TEST_UNUSED".to_string(),
        token: Some("test-token".to_string()),
        timeout_seconds: 5,
    }
}

#[tokio::test]
async fn wrap_posts_base64_and_reads_version() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/{KEY}:encrypt")))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({ "plaintext": STANDARD.encode([7u8; 32]) })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": format!("{KEY}/cryptoKeyVersions/3"),
            "ciphertext": STANDARD.encode(b"wrapped"),
        })))
        .mount(&server)
        .await;

    let client = HttpKeyWrapClient::new(&config(&server)).unwrap();
    let wrapped = client.wrap(&[7u8; 32]).await.unwrap();
    assert_eq!(wrapped.ciphertext, b"wrapped");
    assert_eq!(
        wrapped.key_version,
        Some(format!("{KEY}/cryptoKeyVersions/3"))
    );
}

#[tokio::test]
async fn unwrap_decodes_plaintext() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/{KEY}:decrypt")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "plaintext": STANDARD.encode([9u8; 32]) })),
        )
        .mount(&server)
        .await;

    let client = HttpKeyWrapClient::new(&config(&server)).unwrap();
    let dek = client.unwrap(b"wrapped").await.unwrap();
    assert_eq!(dek.as_slice(), &[9u8; 32]);
}

#[tokio::test]
async fn service_errors_surface_as_external() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
        .mount(&server)
        .await;

    let client = HttpKeyWrapClient::new(&config(&server)).unwrap();
    let err = client.wrap(&[1u8; 32]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ExternalService);
    assert!(err.message.contains("403"));
}

#[test]
fn missing_token_is_a_kms_error() {
    let cfg = CloudKmsConfig {
        endpoint: "http://127.0.0.1:1".to_string(),
        key_name: KEY.to_string(),
        token_env: "LOCKBOX_TEST_TOKEN_THAT_IS_NEVER_SET".to_string(),
        token: None,
        timeout_seconds: 1,
    };
    let err = HttpKeyWrapClient::new(&cfg).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Kms);
}
