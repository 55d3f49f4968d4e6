#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Session-level tests for the bingo live client.
//!
//! Uses the scripted `MockConnector` from `tests/common` to play the server
//! side and checks connection lifecycle, room declaration, keepalive,
//! snapshot reconciliation and the action gateway end to end.

mod common;

use std::time::Duration;

use bingo_live_client::client::{ClientConfig, GameConnection, GameSession};
use bingo_live_client::countdown::epoch_millis;
use bingo_live_client::{
    BingoEvent, ClientMessage, CloseCode, ConnectionStatus, Phase, RetryPolicy, RoundSnapshot,
};

use common::{
    bingo_accepted_json, envelope, game_started_json, next_event, number_called_json,
    registration_open_json, registration_update_json, selection_confirmed_json,
    selection_rejected_json, snapshot_json, wait_for_event, wait_snapshot, MockConnector,
};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

fn config() -> ClientConfig {
    ClientConfig::new("ws://bingo.test/ws")
}

fn is_reconnect(event: &BingoEvent) -> bool {
    matches!(event, BingoEvent::ReconnectScheduled { .. })
}

fn is_disconnect(event: &BingoEvent) -> bool {
    matches!(event, BingoEvent::Disconnected { .. })
}

// ════════════════════════════════════════════════════════════════════
// Room declaration
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn join_room_is_first_message() {
    let connector = MockConnector::new();
    let mut server = connector.accept();
    let (mut session, mut events) =
        GameSession::start(connector.clone(), config(), 10, "tok").unwrap();

    assert_eq!(
        next_event(&mut events).await,
        BingoEvent::Connected { stake: 10 }
    );
    assert_eq!(server.next_sent().await, ClientMessage::JoinRoom { stake: 10 });
    assert!(session.is_connected());
    assert!(server.try_next_sent().is_none());

    let attempts = connector.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].url.query(), Some("token=tok&stake=10"));

    session.close().await;
}

// ════════════════════════════════════════════════════════════════════
// Full round
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn full_round_updates_snapshot() {
    let connector = MockConnector::new();
    let mut server = connector.accept();
    let (mut session, mut events) =
        GameSession::start(connector.clone(), config(), 10, "tok").unwrap();
    let mut snapshots = session.subscribe_snapshot();
    assert_eq!(server.next_sent().await, ClientMessage::JoinRoom { stake: 10 });

    server.push(registration_open_json("G1", epoch_millis() + 60_000));
    let s = wait_snapshot(&mut snapshots, |s| s.phase == Phase::Registration).await;
    assert_eq!(s.round_id.as_deref(), Some("G1"));
    assert!((59..=60).contains(&s.countdown_seconds));
    assert!(s.is_watch_mode());

    server.push(registration_update_json(&[7], 20));
    let s = wait_snapshot(&mut snapshots, |s| s.is_card_taken(7)).await;
    assert_eq!(s.prize_pool_amount, 20);

    assert!(session.select_card(7));
    assert_eq!(
        server.next_sent().await,
        ClientMessage::SelectCard { card_number: 7 }
    );

    server.push(selection_confirmed_json(7, 1));
    let s = wait_snapshot(&mut snapshots, |s| s.your_selection == Some(7)).await;
    assert_eq!(s.players_count, 1);
    assert!(!s.is_watch_mode());

    server.push(game_started_json("G1", Some(7)));
    let s = wait_snapshot(&mut snapshots, |s| s.phase == Phase::Running).await;
    assert_eq!(s.your_card.as_ref().map(|c| c.number), Some(7));
    assert!(s.called_numbers.is_empty());

    server.push(number_called_json(12, &[12]));
    let s = wait_snapshot(&mut snapshots, |s| s.current_number == Some(12)).await;
    assert_eq!(s.called_numbers, vec![12]);

    server.push(bingo_accepted_json(7, 18));
    let s = wait_snapshot(&mut snapshots, |s| s.phase == Phase::Announce).await;
    assert_eq!(s.winners.len(), 1);
    assert_eq!(s.winners[0].prize_amount, 18);
    assert_eq!(s.current_number, None);

    let mut phases = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let BingoEvent::PhaseChanged { from, to } = event {
            phases.push((from, to));
        }
    }
    assert_eq!(
        phases,
        vec![
            (Phase::Waiting, Phase::Registration),
            (Phase::Registration, Phase::Running),
            (Phase::Running, Phase::Announce),
        ]
    );

    session.close().await;
}

// ════════════════════════════════════════════════════════════════════
// Action gateway
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn actions_refused_while_connecting() {
    // Empty script: the connection attempt never completes.
    let connector = MockConnector::new();
    let (mut session, _events) = GameSession::start(connector, config(), 10, "tok").unwrap();

    let mut status = session.subscribe_status();
    status
        .wait_for(|s| *s == ConnectionStatus::Connecting)
        .await
        .unwrap();
    assert!(!session.select_card(3));
    assert!(!session.claim_bingo());

    session.close().await;
}

#[tokio::test]
async fn actions_gated_by_phase() {
    let connector = MockConnector::new();
    let mut server = connector.accept();
    let (mut session, _events) =
        GameSession::start(connector.clone(), config(), 10, "tok").unwrap();
    let mut snapshots = session.subscribe_snapshot();
    assert_eq!(server.next_sent().await, ClientMessage::JoinRoom { stake: 10 });

    // waiting
    assert!(!session.select_card(3));
    assert!(!session.claim_bingo());

    server.push(registration_open_json("G1", epoch_millis() + 60_000));
    wait_snapshot(&mut snapshots, |s| s.phase == Phase::Registration).await;
    assert!(!session.claim_bingo());
    assert!(session.select_card(3));
    assert_eq!(
        server.next_sent().await,
        ClientMessage::SelectCard { card_number: 3 }
    );

    server.push(game_started_json("G1", Some(3)));
    wait_snapshot(&mut snapshots, |s| s.phase == Phase::Running).await;
    assert!(!session.select_card(4));
    assert!(session.claim_bingo());
    assert_eq!(server.next_sent().await, ClientMessage::BingoClaim {});

    server.push(bingo_accepted_json(3, 18));
    wait_snapshot(&mut snapshots, |s| s.phase == Phase::Announce).await;
    assert!(!session.claim_bingo());
    assert!(server.try_next_sent().is_none());

    session.close().await;
}

#[tokio::test]
async fn claim_allowed_in_watch_mode() {
    // Watch-mode claims are the server's to reject.
    let connector = MockConnector::new();
    let mut server = connector.accept();
    let (mut session, _events) =
        GameSession::start(connector.clone(), config(), 10, "tok").unwrap();
    let mut snapshots = session.subscribe_snapshot();
    server.next_sent().await;

    server.push(game_started_json("G1", None));
    let s = wait_snapshot(&mut snapshots, |s| s.phase == Phase::Running).await;
    assert!(s.is_watch_mode());
    assert!(session.claim_bingo());
    assert_eq!(server.next_sent().await, ClientMessage::BingoClaim {});

    session.close().await;
}

// ════════════════════════════════════════════════════════════════════
// Server notices and protocol faults
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn rejection_and_server_errors_become_events() {
    let connector = MockConnector::new();
    let mut server = connector.accept();
    let (mut session, mut events) =
        GameSession::start(connector.clone(), config(), 10, "tok").unwrap();
    server.next_sent().await;

    server.push(selection_rejected_json("card already taken"));
    assert_eq!(
        wait_for_event(&mut events, |e| matches!(e, BingoEvent::SelectionRejected { .. })).await,
        BingoEvent::SelectionRejected {
            reason: "card already taken".into()
        }
    );

    server.push(envelope("error", serde_json::json!({ "message": "maintenance" })));
    assert_eq!(
        next_event(&mut events).await,
        BingoEvent::ServerNotice {
            message: "maintenance".into()
        }
    );
    assert_eq!(session.snapshot(), RoundSnapshot::default());

    session.close().await;
}

#[tokio::test]
async fn malformed_and_unknown_messages_are_skipped() {
    let connector = MockConnector::new();
    let mut server = connector.accept();
    let (mut session, mut events) =
        GameSession::start(connector.clone(), config(), 10, "tok").unwrap();
    assert_eq!(
        next_event(&mut events).await,
        BingoEvent::Connected { stake: 10 }
    );
    server.next_sent().await;

    server.push("not json at all");
    server.push(r#"{"payload":{}}"#);
    server.push(envelope("tournament_update", serde_json::json!({ "level": 3 })));
    server.push(envelope("number_called", serde_json::json!({ "number": "twelve" })));
    server.push(envelope("pong", serde_json::Value::Null));
    server.push(registration_open_json("G1", epoch_millis() + 60_000));

    assert_eq!(
        next_event(&mut events).await,
        BingoEvent::PhaseChanged {
            from: Phase::Waiting,
            to: Phase::Registration
        }
    );
    assert_eq!(session.status(), ConnectionStatus::Open);
    assert!(session.snapshot().called_numbers.is_empty());

    session.close().await;
}

// ════════════════════════════════════════════════════════════════════
// Reconnect and backoff
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn reconnect_backs_off_and_rejoins_once() {
    let connector = MockConnector::new();
    let mut first = connector.accept();
    connector.refuse();
    connector.refuse();
    let mut second = connector.accept();

    let (mut session, mut events) =
        GameSession::start(connector.clone(), config(), 10, "tok").unwrap();
    assert_eq!(first.next_sent().await, ClientMessage::JoinRoom { stake: 10 });

    first.close_with(1006);
    assert_eq!(
        wait_for_event(&mut events, is_disconnect).await,
        BingoEvent::Disconnected {
            code: Some(CloseCode::Abnormal),
            reason: "connection closed by server".into()
        }
    );

    let mut scheduled = Vec::new();
    for _ in 0..3 {
        scheduled.push(wait_for_event(&mut events, is_reconnect).await);
    }
    assert_eq!(
        scheduled,
        vec![
            BingoEvent::ReconnectScheduled {
                attempt: 1,
                delay: Duration::from_secs(1)
            },
            BingoEvent::ReconnectScheduled {
                attempt: 2,
                delay: Duration::from_secs(2)
            },
            BingoEvent::ReconnectScheduled {
                attempt: 3,
                delay: Duration::from_secs(4)
            },
        ]
    );

    wait_for_event(&mut events, |e| matches!(e, BingoEvent::Connected { .. })).await;
    assert_eq!(second.next_sent().await, ClientMessage::JoinRoom { stake: 10 });
    assert!(second.try_next_sent().is_none());

    let attempts = connector.attempts();
    assert_eq!(attempts.len(), 4);
    let gaps: Vec<Duration> = attempts.windows(2).map(|w| w[1].at - w[0].at).collect();
    assert_eq!(
        gaps,
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]
    );

    // The retry counter starts over after a successful open.
    second.close_with(1012);
    assert_eq!(
        wait_for_event(&mut events, is_reconnect).await,
        BingoEvent::ReconnectScheduled {
            attempt: 1,
            delay: Duration::from_secs(1)
        }
    );

    session.close().await;
}

#[tokio::test(start_paused = true)]
async fn failed_join_is_retried_on_next_connection() {
    let connector = MockConnector::new();
    let mut first = connector.accept();
    first.fail_next_send();
    let mut second = connector.accept();

    let (mut session, mut events) =
        GameSession::start(connector.clone(), config(), 10, "tok").unwrap();

    assert_eq!(next_event(&mut events).await, BingoEvent::Connected { stake: 10 });
    assert_eq!(
        next_event(&mut events).await,
        BingoEvent::Disconnected {
            code: None,
            reason: "transport send error: broken pipe".into()
        }
    );
    assert_eq!(
        next_event(&mut events).await,
        BingoEvent::ReconnectScheduled {
            attempt: 1,
            delay: Duration::from_secs(1)
        }
    );
    assert_eq!(next_event(&mut events).await, BingoEvent::Connected { stake: 10 });

    assert_eq!(second.next_sent().await, ClientMessage::JoinRoom { stake: 10 });
    assert!(first.try_next_sent().is_none());
    assert_eq!(connector.attempts().len(), 2);

    // Declared on the new connection, so actions flow normally.
    second.push(registration_open_json("G1", epoch_millis() + 30_000));
    wait_snapshot(&mut session.subscribe_snapshot(), |s| {
        s.phase == Phase::Registration
    })
    .await;
    assert!(session.select_card(7));
    assert_eq!(
        second.next_sent().await,
        ClientMessage::SelectCard { card_number: 7 }
    );

    session.close().await;
}

#[tokio::test(start_paused = true)]
async fn reconnect_resyncs_from_snapshot() {
    let connector = MockConnector::new();
    let mut first = connector.accept();
    let mut second = connector.accept();
    let (mut session, mut events) =
        GameSession::start(connector.clone(), config(), 10, "tok").unwrap();
    let mut snapshots = session.subscribe_snapshot();
    first.next_sent().await;

    first.push(game_started_json("G1", Some(7)));
    first.push(number_called_json(3, &[3]));
    first.push(number_called_json(4, &[3, 4]));
    wait_snapshot(&mut snapshots, |s| s.called_numbers == [3, 4]).await;

    first.close_with(1001);
    wait_for_event(&mut events, |e| matches!(e, BingoEvent::Connected { .. })).await;
    assert_eq!(second.next_sent().await, ClientMessage::JoinRoom { stake: 10 });
    // Nothing is discarded across a transport drop.
    assert_eq!(session.snapshot().called_numbers, vec![3, 4]);

    second.push(snapshot_json("G2", "registration", &[]));
    let s = wait_snapshot(&mut snapshots, |s| s.round_id.as_deref() == Some("G2")).await;
    assert_eq!(s.phase, Phase::Registration);
    assert!(s.called_numbers.is_empty());
    assert!(s.your_card.is_none());
    assert_eq!(s.players_count, 3);
    assert!(s.is_watch_mode());

    session.close().await;
}

#[tokio::test(start_paused = true)]
async fn receive_error_is_a_transport_fault() {
    let connector = MockConnector::new();
    let mut server = connector.accept();
    let (mut session, mut events) =
        GameSession::start(connector.clone(), config(), 10, "tok").unwrap();
    server.next_sent().await;

    server.fail("connection reset by peer");
    assert_eq!(
        wait_for_event(&mut events, is_disconnect).await,
        BingoEvent::Disconnected {
            code: None,
            reason: "transport receive error: connection reset by peer".into()
        }
    );
    assert!(is_reconnect(&next_event(&mut events).await));

    session.close().await;
}

#[tokio::test(start_paused = true)]
async fn bounded_policy_gives_up() {
    let connector = MockConnector::new();
    for _ in 0..4 {
        connector.refuse();
    }
    let config = config().with_retry_policy(RetryPolicy::card_selection());
    let (mut session, mut events) = GameSession::start(connector.clone(), config, 10, "tok").unwrap();

    let mut seen = Vec::new();
    loop {
        let event = next_event(&mut events).await;
        let done = event.is_terminal();
        seen.push(event);
        if done {
            break;
        }
    }
    assert_eq!(
        seen,
        vec![
            BingoEvent::ReconnectScheduled {
                attempt: 1,
                delay: Duration::from_secs(1)
            },
            BingoEvent::ReconnectScheduled {
                attempt: 2,
                delay: Duration::from_secs(2)
            },
            BingoEvent::ReconnectScheduled {
                attempt: 3,
                delay: Duration::from_secs(4)
            },
            BingoEvent::RetriesExhausted { attempts: 3 },
        ]
    );
    assert_eq!(connector.attempts().len(), 4);
    assert_eq!(session.status(), ConnectionStatus::Exhausted);

    session.close().await;
    assert_eq!(session.status(), ConnectionStatus::Exhausted);
}

#[tokio::test(start_paused = true)]
async fn slow_connect_times_out_and_retries() {
    // Empty script: every attempt hangs until the connect timeout.
    let connector = MockConnector::new();
    let config = config().with_connect_timeout(Duration::from_secs(3));
    let (mut session, mut events) = GameSession::start(connector.clone(), config, 10, "tok").unwrap();

    assert_eq!(
        next_event(&mut events).await,
        BingoEvent::ReconnectScheduled {
            attempt: 1,
            delay: Duration::from_secs(1)
        }
    );
    assert_eq!(connector.attempts().len(), 1);

    session.close().await;
}

// ════════════════════════════════════════════════════════════════════
// Authentication failure
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn policy_violation_close_is_fatal() {
    let connector = MockConnector::new();
    let mut server = connector.accept();
    connector.accept();
    let (mut session, mut events) =
        GameSession::start(connector.clone(), config(), 10, "tok").unwrap();
    server.next_sent().await;

    server.close_with(1008);
    assert_eq!(
        wait_for_event(&mut events, is_disconnect).await,
        BingoEvent::Disconnected {
            code: Some(CloseCode::PolicyViolation),
            reason: "connection closed by server".into()
        }
    );
    assert_eq!(next_event(&mut events).await, BingoEvent::SessionInvalid);
    assert_eq!(session.status(), ConnectionStatus::Fatal);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.attempts().len(), 1);
    assert_eq!(session.status(), ConnectionStatus::Fatal);
    assert!(!session.select_card(1));

    session.close().await;
    assert_eq!(session.status(), ConnectionStatus::Fatal);
}

#[tokio::test(start_paused = true)]
async fn rejected_token_at_connect_is_fatal() {
    let connector = MockConnector::new();
    connector.reject_token();
    connector.accept();
    let (mut session, mut events) =
        GameSession::start(connector.clone(), config(), 10, "expired").unwrap();

    assert_eq!(next_event(&mut events).await, BingoEvent::SessionInvalid);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.attempts().len(), 1);
    assert_eq!(session.status(), ConnectionStatus::Fatal);

    session.close().await;
}

// ════════════════════════════════════════════════════════════════════
// Keepalive
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn keepalive_pings_while_open_only() {
    let connector = MockConnector::new();
    let mut server = connector.accept();
    let (mut session, mut events) =
        GameSession::start(connector.clone(), config(), 10, "tok").unwrap();
    assert_eq!(server.next_sent().await, ClientMessage::JoinRoom { stake: 10 });

    tokio::time::sleep(Duration::from_secs(19)).await;
    assert!(server.try_next_sent().is_none());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(matches!(
        server.next_sent().await,
        ClientMessage::Ping { ts: Some(_) }
    ));
    assert!(server.try_next_sent().is_none());

    // The server's reply is a no-op.
    server.push(envelope("pong", serde_json::json!({})));
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(matches!(
        server.next_sent().await,
        ClientMessage::Ping { .. }
    ));

    server.close_with(1006);
    wait_for_event(&mut events, is_disconnect).await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(server.try_next_sent().is_none());
    assert_eq!(session.snapshot(), RoundSnapshot::default());

    session.close().await;
}

// ════════════════════════════════════════════════════════════════════
// Countdown
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn countdown_reaching_zero_predicts_starting() {
    let connector = MockConnector::new();
    let mut server = connector.accept();
    let (mut session, mut events) =
        GameSession::start(connector.clone(), config(), 10, "tok").unwrap();
    server.next_sent().await;

    server.push(registration_open_json("G1", epoch_millis() - 1));
    assert_eq!(
        wait_for_event(&mut events, |e| matches!(
            e,
            BingoEvent::PhaseChanged {
                to: Phase::Starting,
                ..
            }
        ))
        .await,
        BingoEvent::PhaseChanged {
            from: Phase::Registration,
            to: Phase::Starting
        }
    );
    let s = session.snapshot();
    assert_eq!(s.countdown_seconds, 0);

    // The authoritative close lands on the same state.
    server.push(envelope("registration_closed", serde_json::json!({})));
    server.push(envelope("pong", serde_json::json!({})));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.snapshot().phase, Phase::Starting);

    session.close().await;
}

// ════════════════════════════════════════════════════════════════════
// Teardown
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn close_tears_down_in_order() {
    let connector = MockConnector::new();
    let mut server = connector.accept();
    let (mut session, mut events) =
        GameSession::start(connector.clone(), config(), 10, "tok").unwrap();
    let mut snapshots = session.subscribe_snapshot();
    server.next_sent().await;

    server.push(registration_open_json("G1", epoch_millis() + 60_000));
    wait_snapshot(&mut snapshots, |s| s.phase == Phase::Registration).await;

    session.close().await;
    assert_eq!(session.status(), ConnectionStatus::Closed);
    assert_eq!(session.snapshot(), RoundSnapshot::default());
    assert!(server.is_closed());
    assert!(!session.select_card(1));

    assert_eq!(
        wait_for_event(&mut events, is_disconnect).await,
        BingoEvent::Disconnected {
            code: None,
            reason: "client closed".into()
        }
    );
    assert!(events.recv().await.is_none());

    // Idempotent.
    session.close().await;
    assert_eq!(session.status(), ConnectionStatus::Closed);
    assert_eq!(connector.attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn close_during_backoff_stops_retries() {
    let connector = MockConnector::new();
    connector.refuse();
    let (mut session, mut events) =
        GameSession::start(connector.clone(), config(), 10, "tok").unwrap();
    wait_for_event(&mut events, is_reconnect).await;
    assert_eq!(session.status(), ConnectionStatus::Backoff);

    session.close().await;
    assert_eq!(session.status(), ConnectionStatus::Closed);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(connector.attempts().len(), 1);
}

// ════════════════════════════════════════════════════════════════════
// Stake switching
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn open_is_idempotent_and_switches_stake() {
    let connector = MockConnector::new();
    let mut first = connector.accept();
    let mut second = connector.accept();
    let (mut conn, mut events) = GameConnection::new(connector.clone(), config());
    assert_eq!(conn.status(), ConnectionStatus::Idle);
    assert!(!conn.select_card(1));

    conn.open(10, "tok").await.unwrap();
    assert_eq!(
        next_event(&mut events).await,
        BingoEvent::Connected { stake: 10 }
    );
    assert_eq!(first.next_sent().await, ClientMessage::JoinRoom { stake: 10 });

    conn.open(10, "tok").await.unwrap();
    assert_eq!(connector.attempts().len(), 1);

    first.push(registration_open_json("G1", epoch_millis() + 60_000));
    let mut snapshots = conn.session().unwrap().subscribe_snapshot();
    wait_snapshot(&mut snapshots, |s| s.phase == Phase::Registration).await;

    conn.open(20, "tok").await.unwrap();
    assert!(first.is_closed());
    assert_eq!(
        wait_for_event(&mut events, is_disconnect).await,
        BingoEvent::Disconnected {
            code: None,
            reason: "client closed".into()
        }
    );
    assert_eq!(
        next_event(&mut events).await,
        BingoEvent::Connected { stake: 20 }
    );
    assert_eq!(second.next_sent().await, ClientMessage::JoinRoom { stake: 20 });
    assert_eq!(conn.snapshot().phase, Phase::Waiting);

    let attempts = connector.attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[1].url.query(), Some("token=tok&stake=20"));

    conn.close().await;
    conn.close().await;
    assert_eq!(conn.status(), ConnectionStatus::Closed);
    assert!(second.is_closed());
}

#[tokio::test(start_paused = true)]
async fn open_after_session_invalid_starts_fresh() {
    let connector = MockConnector::new();
    connector.reject_token();
    let mut server = connector.accept();
    let (mut conn, mut events) = GameConnection::new(connector.clone(), config());

    conn.open(10, "expired").await.unwrap();
    assert_eq!(next_event(&mut events).await, BingoEvent::SessionInvalid);
    assert_eq!(conn.status(), ConnectionStatus::Fatal);

    conn.open(10, "fresh").await.unwrap();
    assert_eq!(
        next_event(&mut events).await,
        BingoEvent::Connected { stake: 10 }
    );
    assert_eq!(server.next_sent().await, ClientMessage::JoinRoom { stake: 10 });
    assert_eq!(
        connector.attempts()[1].url.query(),
        Some("token=fresh&stake=10")
    );

    conn.close().await;
}

#[tokio::test]
async fn invalid_endpoint_is_reported() {
    let (mut conn, _events) =
        GameConnection::new(MockConnector::new(), ClientConfig::new("no scheme here"));
    assert!(conn.open(10, "tok").await.is_err());
    assert_eq!(conn.status(), ConnectionStatus::Idle);
}
