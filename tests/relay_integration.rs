//! Integration tests for the relay.
//!
//! A local WebSocket server stands in for the feed; real WebSocket clients
//! connect to the relay. Tests cover fan-out order, path rejection, feed
//! reconnection, client churn, slow clients and the health endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ais_relay::client::{FeedConfig, FeedConnector};
use ais_relay::registry::BroadcastRegistry;
use ais_relay::server::{RelayServer, ServerConfig};
use ais_relay::stats::RelayStats;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, connect_async, MaybeTlsStream, WebSocketStream};

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for anything the tests wait on
const WAIT: Duration = Duration::from_secs(5);

/// Interval between registry polls
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Reconnect delay used by the connector under test
const RECONNECT_DELAY: Duration = Duration::from_millis(100);

/// Frame size used to fill a stalled client's socket buffers
const FLOOD_FRAME: usize = 64 * 1024;

/// Upper bound for a flood to reach its goal
const FLOOD_WAIT: Duration = Duration::from_secs(30);

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// Fake feed
// ============================================================================

/// One upstream connection accepted by the fake feed
struct FeedSession {
    /// First frame the relay sent
    subscription: String,
    /// Frames to push to the relay; dropping it kills the connection
    tx: mpsc::UnboundedSender<Message>,
}

impl FeedSession {
    fn emit(&self, message: Message) {
        self.tx.send(message).expect("feed connection alive");
    }

    fn emit_text(&self, text: &str) {
        self.emit(Message::text(text.to_string()));
    }
}

struct FakeFeed {
    addr: SocketAddr,
    sessions: mpsc::UnboundedReceiver<FeedSession>,
}

impl FakeFeed {
    async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (session_tx, sessions) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let session_tx = session_tx.clone();
                tokio::spawn(async move {
                    let Ok(mut ws) = accept_async(socket).await else {
                        return;
                    };
                    let subscription = match ws.next().await {
                        Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                        _ => return,
                    };

                    let (tx, mut rx) = mpsc::unbounded_channel();
                    if session_tx.send(FeedSession { subscription, tx }).is_err() {
                        return;
                    }
                    while let Some(message) = rx.recv().await {
                        if ws.send(message).await.is_err() {
                            return;
                        }
                    }
                    // Session dropped by the test: the socket goes away
                    // without a close handshake.
                });
            }
        });

        Self { addr, sessions }
    }

    async fn next_session(&mut self) -> FeedSession {
        tokio::time::timeout(WAIT, self.sessions.recv())
            .await
            .expect("relay did not connect to the feed in time")
            .expect("fake feed stopped")
    }
}

// ============================================================================
// Relay under test
// ============================================================================

struct TestRelay {
    addr: SocketAddr,
    registry: Arc<BroadcastRegistry>,
    stats: Arc<RelayStats>,
    tasks: Vec<JoinHandle<()>>,
}

impl TestRelay {
    async fn start(feed_addr: SocketAddr) -> Self {
        Self::start_with(feed_addr, ServerConfig::default()).await
    }

    async fn start_with(feed_addr: SocketAddr, config: ServerConfig) -> Self {
        let registry = Arc::new(BroadcastRegistry::new());
        let stats = Arc::new(RelayStats::new());

        let config = config.bind("127.0.0.1:0".parse().unwrap());
        let server = RelayServer::bind(config, Arc::clone(&registry), Arc::clone(&stats))
            .await
            .unwrap();
        let addr = server.local_addr();

        let feed_config = FeedConfig::new("test-key")
            .unwrap()
            .url(format!("ws://{}", feed_addr))
            .reconnect_delay(RECONNECT_DELAY);
        let connector = FeedConnector::new(feed_config, Arc::clone(&registry), Arc::clone(&stats));

        let server = tokio::spawn(async move {
            let _ = server.run().await;
        });
        let tasks = vec![server, connector.spawn()];

        Self {
            addr,
            registry,
            stats,
            tasks,
        }
    }

    async fn connect(&self, path: &str) -> Client {
        let (client, _) = connect_async(format!("ws://{}{}", self.addr, path))
            .await
            .unwrap();
        client
    }

    async fn wait_for_clients(&self, count: usize) {
        tokio::time::timeout(WAIT, async {
            while self.registry.len() != count {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
        .await
        .unwrap_or_else(|_| {
            panic!(
                "expected {} clients, registry has {}",
                count,
                self.registry.len()
            )
        });
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn next_message(client: &mut Client) -> Message {
    tokio::time::timeout(WAIT, client.next())
        .await
        .expect("no message in time")
        .expect("stream ended")
        .expect("websocket error")
}

async fn next_text(client: &mut Client) -> String {
    match next_message(client).await {
        Message::Text(text) => text.as_str().to_owned(),
        other => panic!("expected text frame, got {:?}", other),
    }
}

async fn expect_wrong_path_close(client: &mut Client) {
    match next_message(client).await {
        Message::Close(Some(frame)) => {
            assert_eq!(frame.code, CloseCode::from(4004));
            assert_eq!(frame.reason.as_str(), "Use path /ais");
        }
        other => panic!("expected close frame, got {:?}", other),
    }
}

/// Emit numbered 64 KiB binary frames until `done` holds.
///
/// Each frame must reach `reader` before the next is emitted, so `reader`'s
/// queue never holds more than one payload. Returns the number of frames.
async fn flood_until(
    session: &FeedSession,
    reader: &mut Client,
    pace: Duration,
    done: impl Fn() -> bool,
) -> u64 {
    let mut sent = 0u64;
    tokio::time::timeout(FLOOD_WAIT, async {
        while !done() {
            let mut frame = vec![0u8; FLOOD_FRAME];
            frame[..8].copy_from_slice(&sent.to_be_bytes());
            let frame = Bytes::from(frame);

            session.emit(Message::Binary(frame.clone()));
            assert_eq!(next_message(reader).await, Message::Binary(frame));
            sent += 1;

            if !pace.is_zero() {
                tokio::time::sleep(pace).await;
            }
        }
    })
    .await
    .expect("flood did not reach its goal in time");
    sent
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_subscription_is_first_frame() {
    let mut feed = FakeFeed::spawn().await;
    let _relay = TestRelay::start(feed.addr).await;

    let session = feed.next_session().await;
    let request: serde_json::Value = serde_json::from_str(&session.subscription).unwrap();

    assert_eq!(request["APIKey"], "test-key");
    assert_eq!(
        request["BoundingBoxes"],
        serde_json::json!([[[-90.0, -180.0], [90.0, 180.0]]])
    );
    assert_eq!(
        request["FilterMessageTypes"],
        serde_json::json!([
            "PositionReport",
            "ShipStaticData",
            "StaticDataReport",
            "ExtendedClassBPositionReport",
            "StandardClassBPositionReport"
        ])
    );
}

#[tokio::test]
async fn test_fan_out_preserves_payload_and_order() {
    let mut feed = FakeFeed::spawn().await;
    let relay = TestRelay::start(feed.addr).await;
    let session = feed.next_session().await;

    let mut clients = Vec::new();
    for _ in 0..3 {
        clients.push(relay.connect("/ais").await);
    }
    relay.wait_for_clients(3).await;

    let messages: Vec<String> = (0..25)
        .map(|i| format!(r#"{{"MessageType":"PositionReport","Seq":{}}}"#, i))
        .collect();
    for msg in &messages {
        session.emit_text(msg);
    }
    let binary = Bytes::from_static(b"{\"MessageType\":\"ShipStaticData\"}");
    session.emit(Message::Binary(binary.clone()));

    for client in clients.iter_mut() {
        for msg in &messages {
            assert_eq!(&next_text(client).await, msg);
        }
        assert_eq!(next_message(client).await, Message::Binary(binary.clone()));
    }

    assert_eq!(relay.stats.snapshot().messages_relayed, 26);
}

#[tokio::test]
async fn test_wrong_path_is_closed_with_4004() {
    let mut feed = FakeFeed::spawn().await;
    let relay = TestRelay::start(feed.addr).await;
    let session = feed.next_session().await;

    let mut rejected = relay.connect("/stream").await;
    expect_wrong_path_close(&mut rejected).await;

    session.emit_text(r#"{"MessageType":"PositionReport"}"#);

    // Nothing but the end of the stream may follow the close frame.
    let after = tokio::time::timeout(WAIT, rejected.next())
        .await
        .expect("stream did not end");
    assert!(!matches!(after, Some(Ok(Message::Text(_)))));

    assert!(relay.registry.is_empty());
    assert_eq!(relay.stats.snapshot().clients_rejected, 1);
    assert_eq!(relay.stats.snapshot().clients_accepted, 0);
}

#[tokio::test]
async fn test_feed_reconnects_without_client_reconnect() {
    let mut feed = FakeFeed::spawn().await;
    let relay = TestRelay::start(feed.addr).await;
    let first = feed.next_session().await;

    let mut client = relay.connect("/ais").await;
    relay.wait_for_clients(1).await;

    first.emit_text("P1");
    assert_eq!(next_text(&mut client).await, "P1");

    drop(first);

    let second = feed.next_session().await;
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&second.subscription).unwrap()["APIKey"],
        "test-key"
    );

    second.emit_text("P2");
    assert_eq!(next_text(&mut client).await, "P2");

    let snapshot = relay.stats.snapshot();
    assert_eq!(snapshot.upstream_connects, 2);
    assert!(snapshot.upstream_failures >= 1);
    assert_eq!(relay.registry.len(), 1);
}

#[tokio::test]
async fn test_client_disconnect_is_removed_from_registry() {
    let mut feed = FakeFeed::spawn().await;
    let relay = TestRelay::start(feed.addr).await;
    let session = feed.next_session().await;

    let mut resident = relay.connect("/ais").await;
    relay.wait_for_clients(1).await;
    let baseline = relay.registry.len();

    let mut visitor = relay.connect("/ais").await;
    relay.wait_for_clients(baseline + 1).await;

    session.emit_text("P1");
    assert_eq!(next_text(&mut visitor).await, "P1");
    assert_eq!(next_text(&mut resident).await, "P1");

    visitor.close(None).await.unwrap();
    relay.wait_for_clients(baseline).await;

    session.emit_text("P2");
    assert_eq!(next_text(&mut resident).await, "P2");

    assert_eq!(relay.registry.len(), baseline);
    assert_eq!(relay.stats.snapshot().clients_evicted, 0);
}

#[tokio::test]
async fn test_client_frames_are_ignored() {
    let mut feed = FakeFeed::spawn().await;
    let relay = TestRelay::start(feed.addr).await;
    let session = feed.next_session().await;

    let mut client = relay.connect("/ais").await;
    relay.wait_for_clients(1).await;

    client.send(Message::text("subscribe me to everything")).await.unwrap();
    client
        .send(Message::Binary(Bytes::from_static(b"\x00\x01")))
        .await
        .unwrap();

    session.emit_text("after-noise");
    assert_eq!(next_text(&mut client).await, "after-noise");
    assert_eq!(relay.registry.len(), 1);
}

#[tokio::test]
async fn test_health_endpoint() {
    let mut feed = FakeFeed::spawn().await;
    let relay = TestRelay::start(feed.addr).await;
    let _session = feed.next_session().await;

    let _client = relay.connect("/ais").await;
    relay.wait_for_clients(1).await;

    let resp = reqwest::get(format!("http://{}/health", relay.addr))
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["port"], relay.addr.port());
    assert_eq!(json["clients"], 1);
    assert_eq!(json["upstream_connects"], 1);

    // The health check is not a subscriber.
    assert_eq!(relay.registry.len(), 1);
}

#[tokio::test]
async fn test_health_request_split_across_segments() {
    let mut feed = FakeFeed::spawn().await;
    let relay = TestRelay::start(feed.addr).await;
    let _session = feed.next_session().await;

    let mut socket = TcpStream::connect(relay.addr).await.unwrap();
    socket.set_nodelay(true).unwrap();
    socket.write_all(b"GET /hea").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    socket
        .write_all(b"lth HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    tokio::time::timeout(WAIT, socket.read_to_string(&mut response))
        .await
        .unwrap()
        .unwrap();

    assert!(response.starts_with("HTTP/1.1 200 OK"), "got {:?}", response);
    assert!(response.contains(r#""status":"ok""#));
}

#[tokio::test]
async fn test_upgrade_to_health_is_closed_with_4004() {
    let mut feed = FakeFeed::spawn().await;
    let relay = TestRelay::start(feed.addr).await;
    let _session = feed.next_session().await;

    let mut client = relay.connect("/health").await;
    expect_wrong_path_close(&mut client).await;

    assert!(relay.registry.is_empty());
    assert_eq!(relay.stats.snapshot().clients_rejected, 1);
    assert_eq!(relay.stats.snapshot().clients_accepted, 0);
}

#[tokio::test]
async fn test_slow_client_is_evicted_without_stalling_others() {
    let mut feed = FakeFeed::spawn().await;
    let relay = TestRelay::start_with(feed.addr, ServerConfig::default().client_queue_capacity(1)).await;
    let session = feed.next_session().await;

    let mut healthy = relay.connect("/ais").await;
    // Never read: its socket buffers fill, then its queue, then it is evicted.
    let _stalled = relay.connect("/ais").await;
    relay.wait_for_clients(2).await;

    let stats = Arc::clone(&relay.stats);
    let sent = flood_until(&session, &mut healthy, Duration::ZERO, || {
        stats.snapshot().clients_evicted > 0
    })
    .await;

    assert!(sent > 1);
    assert_eq!(relay.registry.len(), 1);
    assert_eq!(relay.stats.snapshot().clients_evicted, 1);

    // The survivor keeps receiving after the eviction.
    session.emit_text("after-eviction");
    assert_eq!(next_text(&mut healthy).await, "after-eviction");
}

#[tokio::test]
async fn test_stalled_write_drops_client_after_send_timeout() {
    let mut feed = FakeFeed::spawn().await;
    let config = ServerConfig::default().send_timeout(Duration::from_millis(200));
    let relay = TestRelay::start_with(feed.addr, config).await;
    let session = feed.next_session().await;

    let mut healthy = relay.connect("/ais").await;
    let _stalled = relay.connect("/ais").await;
    relay.wait_for_clients(2).await;

    // Paced so the stalled client's queue stays far below capacity and the
    // write timeout, not eviction, removes it.
    let registry = Arc::clone(&relay.registry);
    flood_until(&session, &mut healthy, Duration::from_millis(1), || {
        registry.len() < 2
    })
    .await;

    assert_eq!(relay.registry.len(), 1);
    assert_eq!(relay.stats.snapshot().clients_evicted, 0);

    session.emit_text("after-timeout");
    assert_eq!(next_text(&mut healthy).await, "after-timeout");
}
