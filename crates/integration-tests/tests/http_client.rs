//! Integration tests for the Signifyd HTTP client.
//!
//! Each test starts a local mock API on a random port, so no network access
//! or Signifyd credentials are needed.

use std::time::Duration;

use secrecy::SecretString;
use signifyd_connect::client::ApiError;
use signifyd_connect::config::ApiConfig;
use signifyd_connect::{CaseApi, CaseContext, HttpCaseClient};
use signifyd_connect_integration_tests::{MockApi, braintree_order, builder, host_with_history};
use url::Url;

const API_KEY: &str = "Zq8xW3nR7tLm2Kp9Vb4Hc6Jd1Fg5";

fn client(mock: &MockApi) -> HttpCaseClient {
    let config = ApiConfig {
        base_url: Url::parse(&mock.base_url).expect("mock url"),
        api_key: SecretString::from(API_KEY),
        timeout: Duration::from_secs(5),
    };
    HttpCaseClient::new(&config).expect("client")
}

#[tokio::test]
async fn test_create_case_posts_case_json() {
    let mock = MockApi::start(201, r#"{"investigationId": 90210}"#).await;
    let case = builder()
        .build(&braintree_order(), CaseContext::new(), &host_with_history())
        .await
        .expect("build");

    let id = client(&mock).create_case(&case).await.expect("create");
    assert_eq!(id.as_deref(), Some("90210"));

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/v2/cases");

    // Basic auth with the API key as user name and no password.
    assert_eq!(
        request.authorization.as_deref(),
        Some("Basic WnE4eFczblI3dExtMktwOVZiNEhjNkpkMUZnNTo=")
    );

    let body: serde_json::Value = serde_json::from_str(&request.body).expect("json body");
    assert_eq!(body["purchase"]["orderId"], "000000123");
}

#[tokio::test]
async fn test_create_case_without_id() {
    let mock = MockApi::start(200, "{}").await;
    let case = builder()
        .build(&braintree_order(), CaseContext::new(), &host_with_history())
        .await
        .expect("build");

    let id = client(&mock).create_case(&case).await.expect("create");
    assert!(id.is_none());
}

#[tokio::test]
async fn test_cancel_guarantee_puts_disposition() {
    let mock = MockApi::start(200, r#"{"disposition": "CANCELED"}"#).await;

    let disposition = client(&mock)
        .cancel_guarantee("90210")
        .await
        .expect("cancel");
    assert_eq!(disposition, "CANCELED");

    let requests = mock.requests();
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(requests[0].path, "/v2/cases/90210/guarantee");
    let body: serde_json::Value = serde_json::from_str(&requests[0].body).expect("json body");
    assert_eq!(body, serde_json::json!({ "guaranteeDisposition": "CANCELED" }));
}

#[tokio::test]
async fn test_unauthorized_response() {
    let mock = MockApi::start(401, r#"{"message": "bad key"}"#).await;

    let err = client(&mock).cancel_guarantee("1").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
}

#[tokio::test]
async fn test_server_error_keeps_message() {
    let mock = MockApi::start(500, r#"{"message": "boom"}"#).await;

    let err = client(&mock).cancel_guarantee("1").await.unwrap_err();
    match err {
        ApiError::Api { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("boom"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
