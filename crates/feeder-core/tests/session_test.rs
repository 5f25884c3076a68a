#![allow(clippy::unwrap_used)]
// Login and device resolution against a mocked backend.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feeder_api::FeederClient;
use feeder_core::{CoreError, Session};

async fn setup() -> (MockServer, FeederClient) {
    let server = MockServer::start().await;
    let client = FeederClient::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap());

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "abc",
            "token_type": "bearer"
        })))
        .mount(&server)
        .await;

    (server, client)
}

fn password() -> SecretString {
    SecretString::from("hunter2".to_owned())
}

#[tokio::test]
async fn test_session_uses_first_device() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/users/ana"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "username": "ana",
            "devices": [
                { "id": 1, "device_name": "feeder-1", "user_id": 7 },
                { "id": 2, "device_name": "feeder-2", "user_id": 7 }
            ]
        })))
        .mount(&server)
        .await;

    let session = Session::login(&client, "ana", &password()).await.unwrap();
    assert_eq!(session.username(), "ana");
    assert_eq!(session.device_id(), "feeder-1");
    assert_eq!(session.device().id, 1);
}

#[tokio::test]
async fn test_user_without_devices_is_an_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/users/ana"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "username": "ana",
            "devices": []
        })))
        .mount(&server)
        .await;

    let err = Session::login(&client, "ana", &password()).await.unwrap_err();
    assert!(
        matches!(err, CoreError::NoDevices { ref username } if username == "ana"),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn test_bad_credentials_map_to_auth_failure() {
    let server = MockServer::start().await;
    let client = FeederClient::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap());

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = Session::login(&client, "ana", &password()).await.unwrap_err();
    match err {
        CoreError::AuthenticationFailed { message } => {
            assert_eq!(message, "Invalid username or password");
        }
        other => panic!("expected AuthenticationFailed, got: {other:?}"),
    }
}
