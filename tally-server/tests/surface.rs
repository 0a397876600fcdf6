//! Exercises the HTTP/WS surface end to end: stubbed upstreams behind the
//! lookup service, a scripted live source behind the relay, real sockets in
//! front.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tally_actors::actor::spawn_actor;
use tally_actors::{OverlayHub, RelayActor};
use tally_common::{Creator, FollowNotice};
use tally_live::{LiveError, LiveSession, LiveSource};
use tally_server::{router, AppState};
use tally_social::tiktok::{AggregatorClient, ProfileScraper};
use tally_social::FollowerLookup;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Live source that refuses every connect but remembers being asked.
struct CountingSource {
    connects: AtomicUsize,
}

#[async_trait]
impl LiveSource for CountingSource {
    async fn connect(&self, creator: &Creator) -> Result<LiveSession, LiveError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Err(LiveError::Connect {
            creator: creator.clone(),
            reason: "offline".into(),
        })
    }
}

struct Harness {
    addr: SocketAddr,
    hub: OverlayHub,
    source: Arc<CountingSource>,
    _api: MockServer,
    _pages: MockServer,
}

async fn start(api: MockServer, pages: MockServer) -> Harness {
    let lookup = FollowerLookup::new(
        AggregatorClient::new(&api.uri(), Duration::from_secs(2)).unwrap(),
        ProfileScraper::new(&pages.uri(), Duration::from_secs(2), "en-US,en;q=0.9").unwrap(),
        Duration::from_secs(10),
    );
    let hub = OverlayHub::new();
    let source = Arc::new(CountingSource {
        connects: AtomicUsize::new(0),
    });
    let relay = spawn_actor(RelayActor::new(source.clone(), hub.clone()), 16);
    let state = Arc::new(AppState::new(lookup, hub.clone(), relay.addr));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    Harness {
        addr,
        hub,
        source,
        _api: api,
        _pages: pages,
    }
}

#[tokio::test]
async fn followers_endpoint_returns_count_then_cache_flag() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("username", "alice"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"followerCount": 4821})),
        )
        .expect(1)
        .mount(&api)
        .await;
    let harness = start(api, MockServer::start().await).await;

    let url = format!("http://{}/api/followers/alice", harness.addr);
    let first: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(first, serde_json::json!({"followers": 4821}));

    let second: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(second, serde_json::json!({"followers": 4821, "cached": true}));
}

#[tokio::test]
async fn unmatched_profile_yields_404_with_error_body() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&api)
        .await;
    let pages = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/@ghost"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nothing here</html>"))
        .mount(&pages)
        .await;
    let harness = start(api, pages).await;

    let resp = reqwest::get(format!("http://{}/api/followers/ghost", harness.addr))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn dead_fallback_yields_500_with_error_body() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&api)
        .await;
    let pages = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&pages)
        .await;
    let harness = start(api, pages).await;

    let resp = reqwest::get(format!("http://{}/api/followers/walled", harness.addr))
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("unavailable"));
}

#[tokio::test]
async fn root_serves_the_widget_document() {
    let harness = start(MockServer::start().await, MockServer::start().await).await;

    let resp = reqwest::get(format!("http://{}/", harness.addr)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    assert!(resp.text().await.unwrap().contains("tally overlay"));
}

#[tokio::test]
async fn channel_subscribes_and_broadcasts_to_all_clients() {
    let harness = start(MockServer::start().await, MockServer::start().await).await;
    let ws_url = format!("ws://{}/ws", harness.addr);

    let (mut client_a, _) = tokio_tungstenite::connect_async(&ws_url).await.unwrap();
    let (mut client_b, _) = tokio_tungstenite::connect_async(&ws_url).await.unwrap();

    // Both connection loops must be registered before anything is published.
    tokio::time::timeout(Duration::from_secs(2), async {
        while harness.hub.client_count() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("clients never registered");

    client_a
        .send(Message::Text(
            r#"{"type":"setCreator","creator":"alice"}"#.to_string(),
        ))
        .await
        .unwrap();

    // The relay asked the live source exactly once for the creator.
    tokio::time::timeout(Duration::from_secs(2), async {
        while harness.source.connects.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("subscribe never reached the live source");

    // A follow notice fans out to every connected client, not just the
    // subscriber.
    harness.hub.publish(&FollowNotice {
        nickname: "Ada".into(),
        avatar: "https://img/a.png".into(),
    });

    for client in [&mut client_a, &mut client_b] {
        let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("no frame in time")
            .unwrap()
            .unwrap();
        let body: serde_json::Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "type": "newSubscriber",
                "nickname": "Ada",
                "avatar": "https://img/a.png"
            })
        );
    }
}

#[tokio::test]
async fn garbage_channel_messages_are_ignored() {
    let harness = start(MockServer::start().await, MockServer::start().await).await;
    let ws_url = format!("ws://{}/ws", harness.addr);

    let (mut client, _) = tokio_tungstenite::connect_async(&ws_url).await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), async {
        while harness.hub.client_count() < 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("client never registered");

    client
        .send(Message::Text("definitely not json".to_string()))
        .await
        .unwrap();

    // The connection stays up and still receives broadcasts.
    tokio::time::sleep(Duration::from_millis(50)).await;
    harness.hub.publish(&FollowNotice {
        nickname: "Bo".into(),
        avatar: String::new(),
    });
    let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
        .await
        .expect("no frame in time")
        .unwrap()
        .unwrap();
    assert!(frame.to_text().unwrap().contains("newSubscriber"));
}
