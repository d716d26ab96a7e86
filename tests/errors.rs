//! Error taxonomy as seen through the HTTP transport.

mod common;

use common::{MockServerFixture, API_KEY};
use std::time::Duration;
use subconscious::transport::TransportError;
use subconscious::{engines, Error, ErrorCode, RunInput, RunOptions, Subconscious};

#[tokio::test]
async fn unauthorized_is_authentication_error_and_not_retried() {
    let mut fx = MockServerFixture::new().await;
    let mock = fx
        .mock_json(
            "POST",
            "/runs",
            401,
            r#"{"error":{"code":"authentication_failed","message":"Invalid API key"}}"#,
            1,
        )
        .await;

    let err = fx
        .client()
        .run(engines::TIM_GPT, &RunInput::new("hi"), RunOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_auth_error());
    assert!(!err.is_retryable());
    assert_eq!(err.code(), Some(ErrorCode::AuthenticationFailed));
    mock.assert_async().await;
}

#[tokio::test]
async fn rate_limit_exposes_retry_after() {
    let mut fx = MockServerFixture::new().await;
    let mock = fx
        .server
        .mock("GET", "/runs/busy")
        .with_status(429)
        .with_header("retry-after", "7")
        .with_body(r#"{"error":{"code":"rate_limited","message":"Slow down"}}"#)
        .expect(1)
        .create_async()
        .await;

    let err = fx.client().get("busy").await.unwrap_err();
    match &err {
        Error::RateLimit {
            message,
            retry_after,
        } => {
            assert_eq!(message, "Slow down");
            assert_eq!(*retry_after, Some(Duration::from_secs(7)));
        }
        other => panic!("expected RateLimit, got {:?}", other),
    }
    assert!(err.is_retryable());
    mock.assert_async().await;
}

#[tokio::test]
async fn server_errors_carry_code_and_details() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx
        .mock_json(
            "GET",
            "/runs/r1",
            500,
            r#"{"error":{"code":"internal_error","message":"Something broke","details":{"requestId":"req_1"}}}"#,
            1,
        )
        .await;

    match fx.client().get("r1").await.unwrap_err() {
        Error::Api {
            status,
            code,
            message,
            details,
        } => {
            assert_eq!(status, 500);
            assert_eq!(code, "internal_error");
            assert_eq!(message, "Something broke");
            assert_eq!(details.unwrap()["requestId"], "req_1");
        }
        other => panic!("expected Api, got {:?}", other),
    }
}

#[tokio::test]
async fn non_json_error_body() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx
        .server
        .mock("GET", "/runs/r2")
        .with_status(503)
        .with_body("upstream unavailable")
        .create_async()
        .await;

    let err = fx.client().get("r2").await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::ServiceUnavailable));
    assert_eq!(err.status(), Some(503));
    assert!(err.to_string().contains("upstream unavailable"));
}

#[tokio::test]
async fn refused_connection_is_connection_error() {
    let client = Subconscious::builder()
        .api_key(API_KEY)
        .base_url("http://127.0.0.1:1")
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let err = client.get("r").await.unwrap_err();
    assert!(matches!(err, Error::Connection(_)), "got {:?}", err);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn request_timeout_is_distinct_from_wait_timeout() {
    // Accept the connection but never answer.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((socket, _)) = listener.accept().await {
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        }
    });

    let client = Subconscious::builder()
        .api_key(API_KEY)
        .base_url(format!("http://{}", addr))
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    match client.get("r").await.unwrap_err() {
        Error::Connection(transport) => {
            assert!(transport.is_timeout(), "got {:?}", transport);
            assert!(matches!(transport, TransportError::Timeout(_)));
        }
        other => panic!("expected Connection timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn validation_errors_are_raised_before_any_request() {
    let mut fx = MockServerFixture::new().await;
    let create = fx.mock_unreachable("POST", "/runs").await;

    let err = fx
        .client()
        .run("   ", &RunInput::new("hi"), RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(
        err.context().and_then(|c| c.field_path.as_deref()),
        Some("engine")
    );
    create.assert_async().await;
}

#[test]
fn missing_api_key_is_configuration_error() {
    let err = Subconscious::builder()
        .api_key("")
        .base_url("http://localhost:1")
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
}
