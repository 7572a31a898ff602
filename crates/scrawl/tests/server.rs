//! Integration tests for the Scrawl server over real WebSocket connections.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use scrawl::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port with a short settle delay and
/// returns the address.
async fn start_server() -> String {
    let config = GatewayConfig {
        advance_delay: Duration::from_millis(50),
        ..GatewayConfig::default()
    };
    let server = ScrawlServerBuilder::new()
        .bind("127.0.0.1:0")
        .gateway_config(config)
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send_event(ws: &mut ClientWs, event: &ClientEvent) {
    let bytes = serde_json::to_vec(event).expect("encode");
    ws.send(Message::Binary(bytes.into())).await.expect("send");
}

async fn recv_event(ws: &mut ClientWs) -> ServerEvent {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for event")
        .expect("stream ended")
        .expect("recv");
    serde_json::from_slice(&msg.into_data()).expect("decode")
}

/// Joins a room and returns the snapshot.
async fn join(ws: &mut ClientWs, room: &str, name: &str) -> ServerEvent {
    send_event(
        ws,
        &ClientEvent::Join {
            room: RoomId::from(room),
            name: name.into(),
        },
    )
    .await;
    recv_event(ws).await
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_first_join_starts_the_first_round() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    match join(&mut ws, "r1", "ada").await {
        ServerEvent::Snapshot {
            room,
            players,
            secret_set,
            presenter,
            ..
        } => {
            assert_eq!(room, RoomId::from("r1"));
            assert_eq!(players.len(), 1);
            assert_eq!(players[0].name, "ada");
            assert_eq!(players[0].score, 0);
            // The join itself started the round: the snapshot already
            // reports the joiner as presenter with a secret set.
            assert!(secret_set);
            assert_eq!(presenter, Some(players[0].conn));
        }
        other => panic!("expected Snapshot, got {other:?}"),
    }

    match recv_event(&mut ws).await {
        ServerEvent::PresenterAssigned { name, .. } => {
            assert_eq!(name, "ada");
        }
        other => panic!("expected PresenterAssigned, got {other:?}"),
    }

    match recv_event(&mut ws).await {
        ServerEvent::RoundStarted { secret } => {
            assert!(!secret.is_empty());
        }
        other => panic!("expected RoundStarted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_two_player_round_trip() {
    let addr = start_server().await;

    // A joins and becomes presenter.
    let mut ws_a = connect(&addr).await;
    join(&mut ws_a, "r1", "ada").await;
    let a = match recv_event(&mut ws_a).await {
        ServerEvent::PresenterAssigned { conn, .. } => conn,
        other => panic!("expected PresenterAssigned, got {other:?}"),
    };
    let secret = match recv_event(&mut ws_a).await {
        ServerEvent::RoundStarted { secret } => secret,
        other => panic!("expected RoundStarted, got {other:?}"),
    };

    // B joins; A is notified, B's snapshot shows the running round.
    let mut ws_b = connect(&addr).await;
    match join(&mut ws_b, "r1", "bob").await {
        ServerEvent::Snapshot {
            players,
            secret_set,
            presenter,
            ..
        } => {
            assert_eq!(players.len(), 2);
            assert!(secret_set);
            assert_eq!(presenter, Some(a));
        }
        other => panic!("expected Snapshot, got {other:?}"),
    }
    let b = match recv_event(&mut ws_a).await {
        ServerEvent::PlayerJoined { conn, name } => {
            assert_eq!(name, "bob");
            conn
        }
        other => panic!("expected PlayerJoined, got {other:?}"),
    };

    // A draws; only B receives the relay.
    send_event(
        &mut ws_a,
        &ClientEvent::Draw {
            room: RoomId::from("r1"),
            stroke: serde_json::json!({"points": [[0, 0], [5, 5]]}),
        },
    )
    .await;
    match recv_event(&mut ws_b).await {
        ServerEvent::Draw { from, stroke } => {
            assert_eq!(from, a);
            assert!(stroke["points"].is_array());
        }
        other => panic!("expected Draw, got {other:?}"),
    }

    // B guesses wrong, then right.
    send_event(
        &mut ws_b,
        &ClientEvent::Guess {
            room: RoomId::from("r1"),
            text: format!("not {secret}"),
        },
    )
    .await;
    for ws in [&mut ws_a, &mut ws_b] {
        match recv_event(ws).await {
            ServerEvent::GuessResult { correct, score, .. } => {
                assert!(!correct);
                assert!(score.is_none());
            }
            other => panic!("expected GuessResult, got {other:?}"),
        }
    }

    send_event(
        &mut ws_b,
        &ClientEvent::Guess {
            room: RoomId::from("r1"),
            text: secret.clone(),
        },
    )
    .await;
    for ws in [&mut ws_a, &mut ws_b] {
        match recv_event(ws).await {
            ServerEvent::GuessResult {
                conn,
                correct,
                score,
                ..
            } => {
                assert_eq!(conn, b);
                assert!(correct);
                assert_eq!(score, Some(10));
            }
            other => panic!("expected GuessResult, got {other:?}"),
        }
        match recv_event(ws).await {
            ServerEvent::RoundEnded {
                winner, score, ..
            } => {
                assert_eq!(winner, b);
                assert_eq!(score, 10);
            }
            other => panic!("expected RoundEnded, got {other:?}"),
        }
    }

    // After the settle window the pen moves to B.
    for ws in [&mut ws_a, &mut ws_b] {
        assert!(matches!(recv_event(ws).await, ServerEvent::NewRound));
        match recv_event(ws).await {
            ServerEvent::PresenterAssigned { conn, name } => {
                assert_eq!(conn, b);
                assert_eq!(name, "bob");
            }
            other => panic!("expected PresenterAssigned, got {other:?}"),
        }
    }
    assert!(matches!(
        recv_event(&mut ws_b).await,
        ServerEvent::RoundStarted { .. }
    ));
}

#[tokio::test]
async fn test_snapshot_replays_strokes_to_late_joiner() {
    let addr = start_server().await;

    let mut ws_a = connect(&addr).await;
    join(&mut ws_a, "r1", "ada").await;
    recv_event(&mut ws_a).await; // PresenterAssigned
    recv_event(&mut ws_a).await; // RoundStarted

    for x in 0..3 {
        send_event(
            &mut ws_a,
            &ClientEvent::Draw {
                room: RoomId::from("r1"),
                stroke: serde_json::json!({"x": x}),
            },
        )
        .await;
    }
    // Give the reader task a moment to forward the strokes before the
    // late joiner's snapshot is taken.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut ws_b = connect(&addr).await;
    match join(&mut ws_b, "r1", "bob").await {
        ServerEvent::Snapshot { strokes, .. } => {
            assert_eq!(strokes.len(), 3);
            assert_eq!(strokes[2]["x"], 2);
        }
        other => panic!("expected Snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_join_is_rejected() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send_event(
        &mut ws,
        &ClientEvent::Join {
            room: RoomId::from("r1"),
            name: "x".repeat(31),
        },
    )
    .await;
    assert!(matches!(
        recv_event(&mut ws).await,
        ServerEvent::Rejected { .. }
    ));
}

#[tokio::test]
async fn test_garbage_frame_is_rejected_and_connection_survives() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::Binary(b"not json".to_vec().into()))
        .await
        .expect("send");
    assert!(matches!(
        recv_event(&mut ws).await,
        ServerEvent::Rejected { .. }
    ));

    // The connection still works afterwards.
    assert!(matches!(
        join(&mut ws, "r1", "ada").await,
        ServerEvent::Snapshot { .. }
    ));
}

#[tokio::test]
async fn test_leave_notifies_remaining_members() {
    let addr = start_server().await;

    let mut ws_a = connect(&addr).await;
    join(&mut ws_a, "r1", "ada").await;
    recv_event(&mut ws_a).await;
    recv_event(&mut ws_a).await;

    let mut ws_b = connect(&addr).await;
    join(&mut ws_b, "r1", "bob").await;
    let b = match recv_event(&mut ws_a).await {
        ServerEvent::PlayerJoined { conn, .. } => conn,
        other => panic!("expected PlayerJoined, got {other:?}"),
    };

    send_event(
        &mut ws_b,
        &ClientEvent::Leave {
            room: RoomId::from("r1"),
        },
    )
    .await;
    match recv_event(&mut ws_a).await {
        ServerEvent::PlayerLeft { conn, name } => {
            assert_eq!(conn, b);
            assert_eq!(name, "bob");
        }
        other => panic!("expected PlayerLeft, got {other:?}"),
    }
}

#[tokio::test]
async fn test_disconnect_sweeps_membership_silently() {
    let addr = start_server().await;

    let mut ws_a = connect(&addr).await;
    join(&mut ws_a, "r1", "ada").await;
    recv_event(&mut ws_a).await;
    recv_event(&mut ws_a).await;

    let mut ws_b = connect(&addr).await;
    join(&mut ws_b, "r1", "bob").await;
    recv_event(&mut ws_a).await; // PlayerJoined

    // A disconnect, unlike an explicit leave, broadcasts nothing.
    drop(ws_b);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // But the membership is gone: a late joiner's snapshot shows only
    // ada and themselves.
    let mut ws_c = connect(&addr).await;
    match join(&mut ws_c, "r1", "cee").await {
        ServerEvent::Snapshot { players, .. } => {
            let names: Vec<&str> =
                players.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["ada", "cee"]);
        }
        other => panic!("expected Snapshot, got {other:?}"),
    }

    // A's only event is cee's join, proving bob's drop emitted nothing.
    match recv_event(&mut ws_a).await {
        ServerEvent::PlayerJoined { name, .. } => assert_eq!(name, "cee"),
        other => panic!("expected PlayerJoined, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rooms_are_isolated() {
    let addr = start_server().await;

    let mut ws_a = connect(&addr).await;
    join(&mut ws_a, "alpha", "ada").await;
    recv_event(&mut ws_a).await;
    recv_event(&mut ws_a).await;

    let mut ws_b = connect(&addr).await;
    match join(&mut ws_b, "beta", "bob").await {
        ServerEvent::Snapshot { players, .. } => {
            // A fresh room: B alone, not grouped with A.
            assert_eq!(players.len(), 1);
        }
        other => panic!("expected Snapshot, got {other:?}"),
    }

    // A's draw must not leak into beta.
    send_event(
        &mut ws_a,
        &ClientEvent::Draw {
            room: RoomId::from("alpha"),
            stroke: serde_json::json!({"x": 1}),
        },
    )
    .await;
    // B's next events are only its own round start.
    assert!(matches!(
        recv_event(&mut ws_b).await,
        ServerEvent::PresenterAssigned { .. }
    ));
    assert!(matches!(
        recv_event(&mut ws_b).await,
        ServerEvent::RoundStarted { .. }
    ));
}
