use actix_web::{web, App, HttpServer};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use signaling_relay::{AppState, Settings};
use std::net::TcpListener;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const WAIT: Duration = Duration::from_secs(5);

async fn spawn_relay() -> (String, AppState) {
    let state = AppState::new(Settings::new_for_test().expect("Failed to load test config"));
    let data = web::Data::new(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(signaling_relay::configure)
    })
    .listen(listener)
    .unwrap()
    .workers(1)
    .run();
    actix_rt::spawn(server);

    (format!("ws://{}", addr), state)
}

async fn connect(base: &str, username: &str) -> Client {
    let url = Url::parse(&format!("{}/ws/{}", base, username)).unwrap();
    let (ws_stream, _) = connect_async(url).await.expect("Failed to connect");
    ws_stream
}

async fn wait_for_peers(state: &AppState, expected: usize) {
    timeout(WAIT, async {
        while state.registry().count() != expected {
            sleep(POLL_INTERVAL).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("registry never reached {} peers", expected));
}

async fn next_text(client: &mut Client) -> String {
    timeout(WAIT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => return text,
                Some(Ok(_)) => continue,
                other => panic!("connection ended while waiting for a frame: {:?}", other),
            }
        }
    })
    .await
    .expect("Timed out waiting for a frame")
}

fn offer(from: &str, to: &str) -> Value {
    json!({
        "type": "signaling-protocol",
        "from": from,
        "to": to,
        "payload": { "type": "offer", "sdp": "v=0" }
    })
}

fn is_denial_for(frame: &str, to: &str) -> bool {
    let value: Value = serde_json::from_str(frame).unwrap();
    value["from"] == "signaling-server" && value["to"] == to && value["payload"]["type"] == "denied"
}

#[actix_web::test]
async fn test_offer_answer_exchange() {
    let (base, state) = spawn_relay().await;
    let mut alice = connect(&base, "alice").await;
    let mut bob = connect(&base, "bob").await;
    wait_for_peers(&state, 2).await;

    // Unaddressed offer: bob is the only eligible receiver.
    alice.send(Message::Text(offer("alice", "").to_string())).await.unwrap();
    let received: Value = serde_json::from_str(&next_text(&mut bob).await).unwrap();
    assert_eq!(received["from"], "alice");
    assert_eq!(received["to"], "bob");
    assert_eq!(received["payload"], json!({ "type": "offer", "sdp": "v=0" }));

    let answer = r#"{"type":"signaling-protocol","from":"bob","to":"alice","payload":{"type":"answer","sdp":"v=0"},"trace":1}"#;
    bob.send(Message::Text(answer.to_string())).await.unwrap();
    assert_eq!(next_text(&mut alice).await, answer);
}

#[actix_web::test]
async fn test_lone_offer_is_denied() {
    let (base, state) = spawn_relay().await;
    let mut alice = connect(&base, "alice").await;
    wait_for_peers(&state, 1).await;

    alice.send(Message::Text(offer("alice", "").to_string())).await.unwrap();
    assert!(is_denial_for(&next_text(&mut alice).await, "alice"));
}

#[actix_web::test]
async fn test_invalid_frames_do_not_end_session() {
    let (base, state) = spawn_relay().await;
    let mut alice = connect(&base, "alice").await;
    let mut bob = connect(&base, "bob").await;
    wait_for_peers(&state, 2).await;

    alice.send(Message::Text("not json".to_string())).await.unwrap();
    alice.send(Message::Text(json!({ "type": "chat", "from": "alice" }).to_string())).await.unwrap();
    alice.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
    alice.send(Message::Text(offer("alice", "bob").to_string())).await.unwrap();

    let received: Value = serde_json::from_str(&next_text(&mut bob).await).unwrap();
    assert_eq!(received, offer("alice", "bob"));
    assert_eq!(state.registry().count(), 2);
}

#[actix_web::test]
async fn test_disconnect_unregisters_peer() {
    let (base, state) = spawn_relay().await;
    let mut alice = connect(&base, "alice").await;
    let mut bob = connect(&base, "bob").await;
    let _carol = connect(&base, "carol").await;
    wait_for_peers(&state, 3).await;

    bob.close(None).await.unwrap();
    wait_for_peers(&state, 2).await;
    assert!(state.registry().lookup("bob").is_none());

    alice.send(Message::Text(offer("alice", "bob").to_string())).await.unwrap();
    assert!(is_denial_for(&next_text(&mut alice).await, "alice"));
}

#[actix_web::test]
async fn test_displaced_connection_keeps_successor_registered() {
    let (base, state) = spawn_relay().await;
    let mut first = connect(&base, "alice").await;
    wait_for_peers(&state, 1).await;
    let original = state.registry().lookup("alice").unwrap();

    let mut second = connect(&base, "alice").await;
    timeout(WAIT, async {
        while state.registry().lookup("alice").map_or(true, |tx| tx.same_channel(&original)) {
            sleep(POLL_INTERVAL).await;
        }
    })
    .await
    .expect("second connection never registered");
    drop(original);

    first.close(None).await.unwrap();
    sleep(POLL_INTERVAL * 10).await;
    assert_eq!(state.registry().count(), 1);

    let mut bob = connect(&base, "bob").await;
    wait_for_peers(&state, 2).await;
    bob.send(Message::Text(offer("bob", "alice").to_string())).await.unwrap();
    let received: Value = serde_json::from_str(&next_text(&mut second).await).unwrap();
    assert_eq!(received["from"], "bob");
}
