#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use callrelay::signaling::errors::ServerError;
use callrelay::signaling::protocol::{
    CallDecision, CallPhase, IceCandidate, MAX_FRAME_LEN, MAX_WIRE_MESSAGE_LEN, SignalingMsg,
};
use callrelay::signaling::{RelayConfig, SignalingServer};
use callrelay::signaling_client::{SignalingClient, SignalingEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const QUIET_PERIOD: Duration = Duration::from_millis(300);

const SDP_OFFER: &str = "v=0\r\no=alice 1 1 IN IP4 10.0.0.1\r\ns=-\r\nm=audio 9 UDP/TLS/RTP/SAVPF 111\r\n";
const SDP_ANSWER: &str = "v=0\r\no=bob 2 2 IN IP4 10.0.0.2\r\ns=-\r\nm=audio 9 UDP/TLS/RTP/SAVPF 111\r\n";

struct TestRelay {
    url: String,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), ServerError>>,
}

impl TestRelay {
    async fn start() -> Self {
        let settings = RelayConfig::default().with_bind_addr("127.0.0.1:0");
        let server = SignalingServer::bind_no_log(settings)
            .await
            .expect("bind relay");
        let addr = server.local_addr().expect("local addr");

        let (stop, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async {
            let _ = stop_rx.await;
        }));

        Self {
            url: format!("ws://{addr}"),
            stop: Some(stop),
            task,
        }
    }

    async fn client(&self, id: &str) -> SignalingClient {
        SignalingClient::connect(&self.url, id)
            .await
            .expect("connect client")
    }

    async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        timeout(Duration::from_secs(10), self.task)
            .await
            .expect("relay should stop")
            .expect("relay task should not panic")
            .expect("relay should stop cleanly");
    }
}

async fn next_any(client: &mut SignalingClient) -> SignalingMsg {
    timeout(RECV_TIMEOUT, client.next_msg())
        .await
        .expect("timed out waiting for a message")
        .expect("connection closed")
}

/// Next message that is not a presence snapshot.
async fn next_signal(client: &mut SignalingClient) -> SignalingMsg {
    loop {
        let msg = timeout(RECV_TIMEOUT, client.next_msg())
            .await
            .expect("timed out waiting for a message")
            .expect("connection closed");
        if !matches!(msg, SignalingMsg::OnlineUsers { .. }) {
            return msg;
        }
    }
}

/// Reads until the presence snapshot equals `expected`.
async fn wait_for_presence(client: &mut SignalingClient, expected: &[&str]) {
    let expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    loop {
        let msg = timeout(RECV_TIMEOUT, client.next_msg())
            .await
            .expect("timed out waiting for presence")
            .expect("connection closed");
        if let SignalingMsg::OnlineUsers { users } = msg {
            if users == expected {
                return;
            }
        }
    }
}

/// Every non-presence message that arrives until the line goes quiet.
async fn collect_signals(client: &mut SignalingClient) -> Vec<SignalingMsg> {
    let mut out = Vec::new();
    while let Ok(Some(msg)) = timeout(QUIET_PERIOD, client.next_msg()).await {
        if !matches!(msg, SignalingMsg::OnlineUsers { .. }) {
            out.push(msg);
        }
    }
    out
}

async fn wait_for_close(client: &mut SignalingClient) -> (Option<u16>, String) {
    loop {
        let event = timeout(RECV_TIMEOUT, client.recv())
            .await
            .expect("timed out waiting for close")
            .expect("event stream ended without Closed");
        if let SignalingEvent::Closed { code, reason } = event {
            return (code, reason);
        }
    }
}

async fn connected_pair(relay: &TestRelay) -> (SignalingClient, SignalingClient) {
    let mut alice = relay.client("alice").await;
    wait_for_presence(&mut alice, &[]).await;
    let mut bob = relay.client("bob").await;
    wait_for_presence(&mut alice, &["bob"]).await;
    wait_for_presence(&mut bob, &["alice"]).await;
    (alice, bob)
}

fn candidate(addr: &str) -> IceCandidate {
    IceCandidate::new(
        "0",
        0,
        &format!("candidate:1 1 udp 2122260223 {addr} 54321 typ host"),
    )
}

type RawSocket = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn raw_client(relay: &TestRelay, id: &str) -> RawSocket {
    let (ws, _) = tokio_tungstenite::connect_async(format!("{}/{id}", relay.url))
        .await
        .expect("connect raw socket");
    ws
}

/// Reads raw frames until the presence snapshot equals `expected`.
async fn wait_for_raw_presence(ws: &mut RawSocket, expected: &str) {
    loop {
        let frame = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for presence")
            .expect("stream ended")
            .expect("read error");
        if matches!(&frame, Message::Text(text) if text.as_str() == expected) {
            return;
        }
    }
}

/// Next text frame that is not a presence snapshot.
async fn next_text(ws: &mut RawSocket) -> String {
    loop {
        let frame = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out")
            .expect("stream ended")
            .expect("read error");
        if let Message::Text(text) = frame {
            if !text.as_str().starts_with("ONLINE_USERS") {
                return text.as_str().to_owned();
            }
        }
    }
}

#[tokio::test]
async fn alice_and_bob_complete_a_call() {
    let relay = TestRelay::start().await;
    let (mut alice, mut bob) = connected_pair(&relay).await;
    assert_eq!(alice.client_id(), "alice");
    assert_eq!(bob.client_id(), "bob");

    alice
        .send(SignalingMsg::CallRequest {
            target: "bob".into(),
        })
        .await
        .unwrap();
    assert_eq!(
        next_signal(&mut bob).await,
        SignalingMsg::IncomingCall {
            caller: "alice".into()
        }
    );

    bob.send(SignalingMsg::CallResponse {
        decision: CallDecision::Accept,
        peer: "alice".into(),
    })
    .await
    .unwrap();
    assert_eq!(
        next_signal(&mut alice).await,
        SignalingMsg::CallAccepted { peer: "bob".into() }
    );

    alice
        .send(SignalingMsg::Offer {
            sdp: SDP_OFFER.into(),
        })
        .await
        .unwrap();
    assert_eq!(
        next_signal(&mut bob).await,
        SignalingMsg::Offer {
            sdp: SDP_OFFER.into()
        }
    );

    bob.send(SignalingMsg::IceCandidate(candidate("10.0.0.2")))
        .await
        .unwrap();
    bob.send(SignalingMsg::Answer {
        sdp: SDP_ANSWER.into(),
    })
    .await
    .unwrap();
    assert_eq!(
        next_signal(&mut alice).await,
        SignalingMsg::IceCandidate(candidate("10.0.0.2"))
    );
    assert_eq!(
        next_signal(&mut alice).await,
        SignalingMsg::Answer {
            sdp: SDP_ANSWER.into()
        }
    );

    alice.send(SignalingMsg::State { phase: None }).await.unwrap();
    assert_eq!(
        next_signal(&mut alice).await,
        SignalingMsg::State {
            phase: Some(CallPhase::Active)
        }
    );

    alice
        .send(SignalingMsg::EndCall {
            peer: Some("bob".into()),
        })
        .await
        .unwrap();
    assert_eq!(
        next_signal(&mut bob).await,
        SignalingMsg::EndCall {
            peer: Some("alice".into())
        }
    );
    assert_eq!(
        next_signal(&mut alice).await,
        SignalingMsg::EndCall {
            peer: Some("bob".into())
        }
    );

    // A second END_CALL finds no session and produces nothing.
    bob.send(SignalingMsg::EndCall { peer: None }).await.unwrap();
    assert!(collect_signals(&mut alice).await.is_empty());
    assert!(collect_signals(&mut bob).await.is_empty());

    alice.close().await;
    bob.close().await;
    relay.shutdown().await;
}

#[tokio::test]
async fn call_request_to_offline_user_gets_one_error() {
    let relay = TestRelay::start().await;
    let (mut alice, mut bob) = connected_pair(&relay).await;

    alice
        .send(SignalingMsg::CallRequest {
            target: "carol".into(),
        })
        .await
        .unwrap();

    assert_eq!(
        collect_signals(&mut alice).await,
        vec![SignalingMsg::error("user carol is not online")]
    );
    assert!(collect_signals(&mut bob).await.is_empty());

    relay.shutdown().await;
}

#[tokio::test]
async fn duplicate_identifier_is_closed_with_policy_code() {
    let relay = TestRelay::start().await;
    let mut alice = relay.client("alice").await;
    wait_for_presence(&mut alice, &[]).await;

    let mut impostor = relay.client("alice").await;
    let (code, reason) = wait_for_close(&mut impostor).await;
    assert_eq!(code, Some(1008));
    assert_eq!(reason, "duplicate identifier");

    // The first connection is untouched.
    alice.send(SignalingMsg::State { phase: None }).await.unwrap();
    assert_eq!(
        next_signal(&mut alice).await,
        SignalingMsg::State {
            phase: Some(CallPhase::Idle)
        }
    );

    relay.shutdown().await;
}

#[tokio::test]
async fn missing_or_invalid_identifier_is_closed_with_policy_code() {
    let relay = TestRelay::start().await;

    let mut nobody = relay.client("").await;
    assert_eq!(
        wait_for_close(&mut nobody).await,
        (Some(1008), "missing identifier".to_owned())
    );

    let mut bad = relay.client("a,b").await;
    assert_eq!(
        wait_for_close(&mut bad).await,
        (Some(1008), "invalid identifier".to_owned())
    );

    relay.shutdown().await;
}

#[tokio::test]
async fn disconnect_during_active_call_notifies_the_survivor_once() {
    let relay = TestRelay::start().await;
    let (mut alice, mut bob) = connected_pair(&relay).await;

    alice
        .send(SignalingMsg::CallRequest {
            target: "bob".into(),
        })
        .await
        .unwrap();
    next_signal(&mut bob).await;
    bob.send(SignalingMsg::CallResponse {
        decision: CallDecision::Accept,
        peer: "alice".into(),
    })
    .await
    .unwrap();
    next_signal(&mut alice).await;
    alice
        .send(SignalingMsg::Offer {
            sdp: SDP_OFFER.into(),
        })
        .await
        .unwrap();
    next_signal(&mut bob).await;
    bob.send(SignalingMsg::Answer {
        sdp: SDP_ANSWER.into(),
    })
    .await
    .unwrap();
    next_signal(&mut alice).await;

    alice.close().await;

    // End-of-call notice first, then presence without alice, then nothing.
    assert_eq!(
        next_any(&mut bob).await,
        SignalingMsg::EndCall {
            peer: Some("alice".into())
        }
    );
    assert_eq!(
        next_any(&mut bob).await,
        SignalingMsg::OnlineUsers { users: vec![] }
    );
    assert!(collect_signals(&mut bob).await.is_empty());
    bob.send(SignalingMsg::State { phase: None }).await.unwrap();
    assert_eq!(
        next_signal(&mut bob).await,
        SignalingMsg::State {
            phase: Some(CallPhase::Idle)
        }
    );

    relay.shutdown().await;
}

#[tokio::test]
async fn crossed_call_requests_leave_exactly_one_session() {
    let relay = TestRelay::start().await;
    let (mut alice, mut bob) = connected_pair(&relay).await;

    let (a, b) = tokio::join!(
        alice.send(SignalingMsg::CallRequest {
            target: "bob".into()
        }),
        bob.send(SignalingMsg::CallRequest {
            target: "alice".into()
        }),
    );
    a.unwrap();
    b.unwrap();

    let to_alice = collect_signals(&mut alice).await;
    let to_bob = collect_signals(&mut bob).await;

    let (winner_peer, loser_msgs, winner_msgs) = if to_bob.iter().any(|m| {
        matches!(m, SignalingMsg::IncomingCall { caller } if caller == "alice")
    }) {
        ("alice", to_bob, to_alice)
    } else {
        ("bob", to_alice, to_bob)
    };

    // The side whose request lost was rung by the winner and refused once.
    assert_eq!(
        loser_msgs,
        vec![
            SignalingMsg::IncomingCall {
                caller: winner_peer.into()
            },
            SignalingMsg::error("session already exists"),
        ]
    );
    assert!(winner_msgs.is_empty());

    relay.shutdown().await;
}

#[tokio::test]
async fn malformed_frames_get_an_error_and_keep_the_connection() {
    let relay = TestRelay::start().await;
    let mut ws = raw_client(&relay, "raw").await;

    ws.send(Message::text("WAVE hello")).await.unwrap();
    assert_eq!(next_text(&mut ws).await, "ERROR unknown command 'WAVE'");

    ws.send(Message::binary(vec![0u8, 1, 2])).await.unwrap();
    assert_eq!(
        next_text(&mut ws).await,
        "ERROR binary frames are not supported"
    );

    ws.send(Message::text("state")).await.unwrap();
    assert_eq!(next_text(&mut ws).await, "STATE IDLE");

    let _ = ws.close(None).await;
    relay.shutdown().await;
}

#[tokio::test]
async fn candidate_arrives_exactly_as_sent() {
    let relay = TestRelay::start().await;
    let mut alice = raw_client(&relay, "alice").await;
    let mut bob = raw_client(&relay, "bob").await;
    wait_for_raw_presence(&mut alice, "ONLINE_USERS bob").await;

    alice.send(Message::text("CALL_REQUEST bob")).await.unwrap();
    assert_eq!(next_text(&mut bob).await, "INCOMING_CALL alice");
    bob.send(Message::text("CALL_RESPONSE accept alice")).await.unwrap();
    assert_eq!(next_text(&mut alice).await, "CALL_ACCEPTED bob");
    alice.send(Message::text("OFFER v=0")).await.unwrap();
    assert_eq!(next_text(&mut bob).await, "OFFER v=0");

    let frame = "ICE audio|01|candidate:1 1 udp 1 10.0.0.1 9 typ host";
    alice.send(Message::text(frame)).await.unwrap();
    assert_eq!(next_text(&mut bob).await, frame);

    let _ = alice.close(None).await;
    let _ = bob.close(None).await;
    relay.shutdown().await;
}

#[tokio::test]
async fn oversized_frames_are_refused_without_buffering_them() {
    let relay = TestRelay::start().await;
    let mut ws = raw_client(&relay, "big").await;

    // Above the message limit but within the read cap: ERROR, still connected.
    let large = format!("OFFER {}", "a".repeat(MAX_FRAME_LEN));
    ws.send(Message::text(large)).await.unwrap();
    assert!(next_text(&mut ws).await.starts_with("ERROR frame of"));
    ws.send(Message::text("STATE")).await.unwrap();
    assert_eq!(next_text(&mut ws).await, "STATE IDLE");

    // Above the read cap: the relay drops the connection.
    let huge = format!("OFFER {}", "a".repeat(MAX_WIRE_MESSAGE_LEN));
    let _ = ws.send(Message::text(huge)).await;
    let closed = timeout(RECV_TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "relay should close the connection");

    // The identifier is free again.
    let mut again = relay.client("big").await;
    wait_for_presence(&mut again, &[]).await;

    relay.shutdown().await;
}
