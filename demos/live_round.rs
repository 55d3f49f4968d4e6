//! # Live Round Example
//!
//! Follows one stake's room on a real game server:
//!
//! 1. Connect with an identity token and declare the room
//! 2. Print phase changes, called numbers and winners
//! 3. Pick a card during registration, if `BINGO_CARD` is set
//! 4. Shut down on Ctrl+C or when the session becomes invalid
//!
//! ## Running
//!
//! ```sh
//! BINGO_TOKEN=... cargo run --example live_round
//!
//! # Override the server and stake:
//! BINGO_WS_URL=wss://bingo.example/ws BINGO_STAKE=20 BINGO_CARD=7 \
//!     cargo run --example live_round
//! ```

use bingo_live_client::{
    BingoEvent, ClientConfig, GameConnection, Phase, RoundSnapshot, WebSocketConnector,
};

const DEFAULT_STAKE: u64 = 10;

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn describe(snapshot: &RoundSnapshot) {
    match snapshot.phase {
        Phase::Registration => tracing::info!(
            "registration: {}s left, {} player(s), {} card(s) taken",
            snapshot.countdown_seconds,
            snapshot.players_count,
            snapshot.taken_card_numbers.len()
        ),
        Phase::Running => tracing::info!(
            "running: {} called, last {:?}, watching={}",
            snapshot.called_numbers.len(),
            snapshot.current_number,
            snapshot.is_watch_mode()
        ),
        Phase::Announce | Phase::Ended => {
            for winner in &snapshot.winners {
                tracing::info!(
                    "winner: card {} ({}) wins {}",
                    winner.card_number,
                    winner.display_name.as_deref().unwrap_or("anonymous"),
                    winner.prize_amount
                );
            }
        }
        _ => {}
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let token = std::env::var("BINGO_TOKEN").unwrap_or_default();
    let stake = env_number("BINGO_STAKE").unwrap_or(DEFAULT_STAKE);
    let card: Option<u32> = env_number("BINGO_CARD");

    let config = ClientConfig::from_env();
    tracing::info!("Connecting to {} for stake {stake}", config.endpoint);

    let (mut conn, mut events) = GameConnection::new(WebSocketConnector::new(), config);
    conn.open(stake, token).await?;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    tracing::info!("Event channel closed, exiting");
                    break;
                };

                match event {
                    BingoEvent::Connected { stake } => {
                        tracing::info!("Connected, joined room for stake {stake}");
                    }
                    BingoEvent::Disconnected { code, reason } => {
                        tracing::warn!("Disconnected ({code:?}): {reason}");
                    }
                    BingoEvent::ReconnectScheduled { attempt, delay } => {
                        tracing::info!("Reconnect attempt {attempt} in {delay:?}");
                    }
                    BingoEvent::PhaseChanged { from, to } => {
                        tracing::info!("Phase {from} -> {to}");
                        if to == Phase::Registration {
                            if let Some(number) = card {
                                let sent = conn.select_card(number);
                                tracing::info!("Selecting card {number}: sent={sent}");
                            }
                        }
                        describe(&conn.snapshot());
                    }
                    BingoEvent::SelectionRejected { reason } => {
                        tracing::warn!("Card rejected: {reason}");
                    }
                    BingoEvent::ServerNotice { message } => {
                        tracing::warn!("Server: {message}");
                    }
                    BingoEvent::SessionInvalid => {
                        tracing::error!("Token rejected, sign in again");
                        break;
                    }
                    BingoEvent::RetriesExhausted { attempts } => {
                        tracing::error!("Gave up after {attempts} attempt(s)");
                        break;
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, closing");
                break;
            }
        }
    }

    conn.close().await;
    Ok(())
}
