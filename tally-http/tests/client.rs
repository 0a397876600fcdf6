use std::borrow::Cow;
use std::time::Duration;

use serde::Deserialize;
use tally_http::{HttpClient, HttpError, RequestOpts};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize)]
struct Item {
    name: String,
}

#[tokio::test]
async fn get_json_decodes_typed_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/item"))
        .and(query_param("id", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "widget"
        })))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let item: Item = client
        .get_json(
            "v1/item",
            RequestOpts {
                query: Some(vec![("id", Cow::Borrowed("7"))]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(item.name, "widget");
}

#[tokio::test]
async fn get_text_returns_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>hello</html>"))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let body = client.get_text("page", RequestOpts::default()).await.unwrap();
    assert_eq!(body, "<html>hello</html>");
}

#[tokio::test]
async fn server_errors_are_retried_up_to_budget() {
    let server = MockServer::start().await;
    // First attempt fails, retry succeeds.
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let body = client
        .get_text(
            "flaky",
            RequestOpts {
                retries: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn zero_retries_surfaces_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(serde_json::json!({"error": "maintenance"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = client
        .get_text("down", RequestOpts::default())
        .await
        .unwrap_err();
    match err {
        HttpError::Api { status, message } => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn timeouts_surface_as_transport_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = client
        .get_text(
            "slow",
            RequestOpts {
                timeout: Some(Duration::from_millis(100)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_transport(), "timeout should read as transport failure: {err:?}");
}
