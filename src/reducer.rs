//! Game State Reducer.
//!
//! [`reduce`] folds one decoded [`ServerMessage`] into the previous
//! [`RoundSnapshot`] and returns the next one. It never mutates its input and
//! never fails: missing payload fields fall back to the previous value, and
//! numbers outside `1..=75` are dropped with a warning.
//!
//! Every handler is idempotent under replay. Within one round `called_numbers`
//! only grows and `phase` only moves forward; both reset only on a round
//! boundary (`registration_open`, `game_started` for a new round,
//! `game_cancelled`, or a `snapshot` for a different round).

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::countdown::remaining_seconds;
use crate::protocol::{
    GameStartedPayload, NumberCalledPayload, PlayersUpdatePayload, RegistrationOpenPayload,
    RegistrationUpdatePayload, SelectionConfirmedPayload, ServerMessage, SnapshotPayload,
    WinnersPayload,
};
use crate::round::{is_valid_number, BingoCard, CardGrid, Phase, RoundSnapshot};

/// A transient signal for the UI that does not change the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The server refused this client's card pick.
    SelectionRejected { reason: String },
    /// The server sent an `error` envelope.
    ServerError { message: String },
}

/// Output of [`reduce`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    pub snapshot: RoundSnapshot,
    pub notice: Option<Notice>,
}

impl Reduction {
    fn state(snapshot: RoundSnapshot) -> Self {
        Self {
            snapshot,
            notice: None,
        }
    }
}

/// Produce the next snapshot from `prev` and one server message.
///
/// `now_ms` is the current epoch time in milliseconds; it is only used to
/// derive `countdown_seconds` from a registration deadline.
pub fn reduce(prev: &RoundSnapshot, msg: &ServerMessage, now_ms: i64) -> Reduction {
    debug!(kind = msg.kind(), phase = %prev.phase, "reducing server message");
    match msg {
        ServerMessage::Snapshot(p) => Reduction::state(apply_snapshot(prev, p, now_ms)),
        ServerMessage::RegistrationOpen(p) => {
            Reduction::state(apply_registration_open(prev, p, now_ms))
        }
        ServerMessage::RegistrationClosed => {
            let mut next = prev.clone();
            next.phase = prev.phase.later_of(Phase::Starting);
            next.registration_end_time = None;
            next.countdown_seconds = 0;
            Reduction::state(next)
        }
        ServerMessage::RegistrationUpdate(p) => Reduction::state(apply_registration_update(prev, p)),
        ServerMessage::GameStarted(p) => Reduction::state(apply_game_started(prev, p)),
        ServerMessage::NumberCalled(p) => Reduction::state(apply_number_called(prev, p)),
        ServerMessage::PlayersUpdate(p) => Reduction::state(apply_players_update(prev, p)),
        ServerMessage::SelectionConfirmed(p) => {
            Reduction::state(apply_selection_confirmed(prev, p))
        }
        ServerMessage::SelectionRejected(p) => Reduction {
            snapshot: prev.clone(),
            notice: Some(Notice::SelectionRejected {
                reason: p
                    .reason
                    .clone()
                    .unwrap_or_else(|| "card selection rejected".to_owned()),
            }),
        },
        ServerMessage::BingoAccepted(p) => {
            let phase = if prev.phase == Phase::Ended {
                Phase::Ended
            } else {
                Phase::Announce
            };
            Reduction::state(apply_winners(prev, p, phase))
        }
        ServerMessage::GameFinished(p) | ServerMessage::GameEnded(p) => {
            Reduction::state(apply_winners(prev, p, Phase::Ended))
        }
        ServerMessage::GameCancelled => Reduction::state(RoundSnapshot {
            phase: Phase::Registration,
            round_id: None,
            players_count: 0,
            your_selection: None,
            your_card: None,
            called_numbers: Vec::new(),
            current_number: None,
            winners: Vec::new(),
            registration_end_time: None,
            countdown_seconds: 0,
            ..prev.clone()
        }),
        ServerMessage::Error(p) => Reduction {
            snapshot: prev.clone(),
            notice: Some(Notice::ServerError {
                message: p
                    .message
                    .clone()
                    .unwrap_or_else(|| "server error".to_owned()),
            }),
        },
        ServerMessage::Pong => Reduction::state(prev.clone()),
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Appends every valid number of `incoming` that is not yet in `called`.
fn merge_called(called: &mut Vec<u8>, incoming: &[u8]) {
    for &number in incoming {
        if !is_valid_number(number) {
            warn!(number, "dropping called number outside 1..=75");
            continue;
        }
        if !called.contains(&number) {
            called.push(number);
        }
    }
}

fn sanitized_called(incoming: &[u8]) -> Vec<u8> {
    let mut called = Vec::with_capacity(incoming.len());
    merge_called(&mut called, incoming);
    called
}

/// Applies the card/selection invariant: a card forces the selection to its
/// number, and a conflicting server selection discards the card.
fn reconcile_card(
    card: Option<BingoCard>,
    selection: Option<u32>,
    server_selection: Option<u32>,
) -> (Option<BingoCard>, Option<u32>) {
    match card {
        Some(card) => match server_selection {
            Some(number) if number != card.number => {
                warn!(
                    card = card.number,
                    selection = number,
                    "server selection disagrees with local card; dropping card"
                );
                (None, Some(number))
            }
            _ => {
                let number = card.number;
                (Some(card), Some(number))
            }
        },
        None => (None, selection),
    }
}

fn payload_card(grid: Option<CardGrid>, number: Option<u32>) -> Option<BingoCard> {
    match (grid, number) {
        (Some(grid), Some(number)) => Some(BingoCard::new(number, grid)),
        (Some(_), None) => {
            warn!("card grid received without a card number; ignoring");
            None
        }
        _ => None,
    }
}

// ── Handlers ────────────────────────────────────────────────────────

fn apply_snapshot(prev: &RoundSnapshot, p: &SnapshotPayload, now_ms: i64) -> RoundSnapshot {
    let same_round = prev.round_id.is_some() && prev.round_id == p.game_id;
    let incoming_card = payload_card(p.card, p.card_number.or(p.your_selection));
    let incoming_called = sanitized_called(&p.called_numbers);

    let mut next = if same_round {
        let phase = prev.phase.later_of(p.phase.unwrap_or(prev.phase));
        if phase != p.phase.unwrap_or(phase) {
            debug!(local = %phase, snapshot = ?p.phase, "keeping later local phase for same round");
        }
        let (called_numbers, current_number) = if incoming_called.len() >= prev.called_numbers.len()
        {
            let current = incoming_called.last().copied();
            (incoming_called, current)
        } else {
            (prev.called_numbers.clone(), prev.current_number)
        };
        let (your_card, your_selection) = reconcile_card(
            incoming_card.or_else(|| prev.your_card.clone()),
            p.your_selection.or(prev.your_selection),
            p.your_selection,
        );
        RoundSnapshot {
            phase,
            round_id: prev.round_id.clone(),
            players_count: p.players_count,
            prize_pool_amount: p.prize_pool,
            called_numbers,
            current_number,
            taken_card_numbers: p.taken_cards.iter().copied().collect(),
            your_selection,
            your_card,
            registration_end_time: p.next_start_at.or(prev.registration_end_time),
            countdown_seconds: 0,
            winners: prev.winners.clone(),
        }
    } else {
        let current_number = incoming_called.last().copied();
        let (your_card, your_selection) =
            reconcile_card(incoming_card, p.your_selection, p.your_selection);
        RoundSnapshot {
            phase: p.phase.unwrap_or(prev.phase),
            round_id: p.game_id.clone(),
            players_count: p.players_count,
            prize_pool_amount: p.prize_pool,
            called_numbers: incoming_called,
            current_number,
            taken_card_numbers: p.taken_cards.iter().copied().collect(),
            your_selection,
            your_card,
            registration_end_time: p.next_start_at,
            countdown_seconds: 0,
            winners: Vec::new(),
        }
    };

    if next.phase == Phase::Registration {
        next.countdown_seconds = match next.registration_end_time {
            Some(deadline) => remaining_seconds(deadline, now_ms),
            None => p.countdown.unwrap_or(0),
        };
    } else {
        next.registration_end_time = None;
    }
    next
}

fn apply_registration_open(
    prev: &RoundSnapshot,
    p: &RegistrationOpenPayload,
    now_ms: i64,
) -> RoundSnapshot {
    let replay =
        prev.phase == Phase::Registration && p.game_id.is_some() && p.game_id == prev.round_id;

    let mut taken: BTreeSet<u32> = p.taken_cards.iter().copied().collect();
    if replay {
        taken.extend(prev.taken_card_numbers.iter().copied());
    }

    RoundSnapshot {
        phase: Phase::Registration,
        round_id: p.game_id.clone(),
        players_count: p
            .players_count
            .unwrap_or(if replay { prev.players_count } else { 0 }),
        prize_pool_amount: p
            .prize_pool
            .unwrap_or(if replay { prev.prize_pool_amount } else { 0 }),
        called_numbers: Vec::new(),
        current_number: None,
        taken_card_numbers: taken,
        your_selection: if replay { prev.your_selection } else { None },
        your_card: None,
        registration_end_time: p.ends_at,
        countdown_seconds: p
            .ends_at
            .map_or(0, |deadline| remaining_seconds(deadline, now_ms)),
        winners: Vec::new(),
    }
}

fn apply_registration_update(prev: &RoundSnapshot, p: &RegistrationUpdatePayload) -> RoundSnapshot {
    let mut next = prev.clone();
    if let Some(taken) = &p.taken_cards {
        next.taken_card_numbers = taken.iter().copied().collect();
    }
    if let Some(prize_pool) = p.prize_pool {
        next.prize_pool_amount = prize_pool;
    }
    next
}

fn apply_game_started(prev: &RoundSnapshot, p: &GameStartedPayload) -> RoundSnapshot {
    let same_round = p.game_id.is_none() || p.game_id == prev.round_id;
    let card = payload_card(p.card, p.card_number.or(prev.your_selection));

    if same_round && prev.phase.rank() >= Phase::Running.rank() {
        // Replayed start for a round already running or finished: only fill gaps.
        let mut next = prev.clone();
        if next.your_card.is_none() {
            if let Some(card) = card {
                next.your_selection = Some(card.number);
                next.your_card = Some(card);
            }
        }
        if let Some(players) = p.players_count {
            next.players_count = players;
        }
        if let Some(prize_pool) = p.prize_pool {
            next.prize_pool_amount = prize_pool;
        }
        return next;
    }

    let selection = if same_round { prev.your_selection } else { None };
    let (your_card, your_selection) = match card {
        Some(card) => {
            let number = card.number;
            (Some(card), Some(number))
        }
        None => (None, selection),
    };

    RoundSnapshot {
        phase: Phase::Running,
        round_id: p.game_id.clone().or_else(|| prev.round_id.clone()),
        players_count: p.players_count.unwrap_or(prev.players_count),
        prize_pool_amount: p.prize_pool.unwrap_or(prev.prize_pool_amount),
        called_numbers: p
            .called_numbers
            .as_deref()
            .map(sanitized_called)
            .unwrap_or_default(),
        current_number: None,
        taken_card_numbers: prev.taken_card_numbers.clone(),
        your_selection,
        your_card,
        registration_end_time: None,
        countdown_seconds: 0,
        winners: Vec::new(),
    }
}

fn apply_number_called(prev: &RoundSnapshot, p: &NumberCalledPayload) -> RoundSnapshot {
    let mut next = prev.clone();
    if let Some(list) = &p.called_numbers {
        merge_called(&mut next.called_numbers, list);
    }
    match p.number {
        Some(number) if is_valid_number(number) => {
            if !next.called_numbers.contains(&number) {
                next.called_numbers.push(number);
            }
            next.current_number = Some(number);
        }
        Some(number) => {
            warn!(number, "dropping called number outside 1..=75");
        }
        None => {
            if p.called_numbers.is_some() {
                next.current_number = next.called_numbers.last().copied();
            }
        }
    }
    next
}

fn apply_players_update(prev: &RoundSnapshot, p: &PlayersUpdatePayload) -> RoundSnapshot {
    let mut next = prev.clone();
    if let Some(players) = p.players_count {
        next.players_count = players;
    }
    if let Some(prize_pool) = p.prize_pool {
        next.prize_pool_amount = prize_pool;
    }
    next
}

fn apply_selection_confirmed(prev: &RoundSnapshot, p: &SelectionConfirmedPayload) -> RoundSnapshot {
    let mut next = apply_players_update(
        prev,
        &PlayersUpdatePayload {
            players_count: p.players_count,
            prize_pool: p.prize_pool,
        },
    );
    if let Some(number) = p.card_number {
        next.taken_card_numbers.insert(number);
        match &next.your_card {
            Some(card) if card.number != number => {
                warn!(
                    card = card.number,
                    confirmed = number,
                    "selection confirmed for a different card than the assigned one"
                );
            }
            _ => next.your_selection = Some(number),
        }
    }
    next
}

fn apply_winners(prev: &RoundSnapshot, p: &WinnersPayload, phase: Phase) -> RoundSnapshot {
    let mut next = prev.clone();
    next.phase = phase;
    next.current_number = None;
    next.registration_end_time = None;
    next.countdown_seconds = 0;
    if !p.winners.is_empty() {
        next.winners = p.winners.clone();
    }
    if let Some(list) = &p.called_numbers {
        let incoming = sanitized_called(list);
        if incoming.len() > next.called_numbers.len() {
            next.called_numbers = incoming;
        }
    }
    next
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::{ErrorPayload, SelectionRejectedPayload};
    use crate::round::{WinnerRecord, FREE_CELL};

    const NOW: i64 = 1_700_000_000_000;

    fn grid() -> CardGrid {
        [
            [1, 16, 31, 46, 61],
            [2, 17, 32, 47, 62],
            [3, 18, FREE_CELL, 48, 63],
            [4, 19, 33, 49, 64],
            [5, 20, 34, 50, 65],
        ]
    }

    fn step(prev: &RoundSnapshot, msg: ServerMessage) -> RoundSnapshot {
        reduce(prev, &msg, NOW).snapshot
    }

    fn called(prev: &RoundSnapshot, number: u8) -> RoundSnapshot {
        step(
            prev,
            ServerMessage::NumberCalled(NumberCalledPayload {
                number: Some(number),
                called_numbers: None,
            }),
        )
    }

    fn open(game_id: &str) -> ServerMessage {
        ServerMessage::RegistrationOpen(RegistrationOpenPayload {
            ends_at: Some(NOW + 60_000),
            game_id: Some(game_id.to_owned()),
            players_count: Some(0),
            ..Default::default()
        })
    }

    fn running_round() -> RoundSnapshot {
        let s = step(&RoundSnapshot::default(), open("G1"));
        step(
            &s,
            ServerMessage::GameStarted(GameStartedPayload {
                game_id: Some("G1".into()),
                card: Some(grid()),
                card_number: Some(7),
                ..Default::default()
            }),
        )
    }

    #[test]
    fn full_round_scenario() {
        let s = step(&RoundSnapshot::default(), open("G1"));
        assert_eq!(s.phase, Phase::Registration);
        assert_eq!(s.round_id.as_deref(), Some("G1"));
        assert_eq!(s.countdown_seconds, 60);

        let s = step(
            &s,
            ServerMessage::RegistrationUpdate(RegistrationUpdatePayload {
                taken_cards: Some(vec![7]),
                prize_pool: Some(20),
            }),
        );
        assert_eq!(s.taken_card_numbers, BTreeSet::from([7]));
        assert_eq!(s.prize_pool_amount, 20);

        let s = step(
            &s,
            ServerMessage::SelectionConfirmed(SelectionConfirmedPayload {
                card_number: Some(7),
                players_count: Some(1),
                prize_pool: None,
            }),
        );
        assert_eq!(s.your_selection, Some(7));
        assert_eq!(s.players_count, 1);
        assert!(!s.is_watch_mode());

        let s = step(
            &s,
            ServerMessage::GameStarted(GameStartedPayload {
                game_id: Some("G1".into()),
                card: Some(grid()),
                card_number: Some(7),
                ..Default::default()
            }),
        );
        assert_eq!(s.phase, Phase::Running);
        assert_eq!(s.your_card, Some(BingoCard::new(7, grid())));
        assert!(s.called_numbers.is_empty());

        let s = step(
            &s,
            ServerMessage::NumberCalled(NumberCalledPayload {
                number: Some(12),
                called_numbers: Some(vec![12]),
            }),
        );
        assert_eq!(s.current_number, Some(12));
        assert_eq!(s.called_numbers, vec![12]);

        let s = step(
            &s,
            ServerMessage::BingoAccepted(WinnersPayload {
                winners: vec![WinnerRecord {
                    card_number: 7,
                    prize_amount: 18,
                    ..Default::default()
                }],
                called_numbers: None,
            }),
        );
        assert_eq!(s.phase, Phase::Announce);
        assert_eq!(s.winners.len(), 1);
        assert_eq!(s.current_number, None);
    }

    #[test]
    fn number_called_is_idempotent() {
        let mut s = running_round();
        for n in [12, 40, 12, 7, 40] {
            s = called(&s, n);
        }
        assert_eq!(s.called_numbers, vec![12, 40, 7]);
        assert_eq!(s.current_number, Some(40));
    }

    #[test]
    fn number_called_merges_server_list() {
        let s = called(&running_round(), 5);
        let s = step(
            &s,
            ServerMessage::NumberCalled(NumberCalledPayload {
                number: Some(9),
                called_numbers: Some(vec![5, 8, 9]),
            }),
        );
        assert_eq!(s.called_numbers, vec![5, 8, 9]);
        assert_eq!(s.current_number, Some(9));
    }

    #[test]
    fn out_of_range_numbers_are_dropped() {
        let s = called(&running_round(), 0);
        let s = called(&s, 76);
        assert!(s.called_numbers.is_empty());
        assert_eq!(s.current_number, None);
    }

    #[test]
    fn registration_open_resets_previous_round() {
        let mut s = running_round();
        s = called(&s, 3);
        s = step(
            &s,
            ServerMessage::GameEnded(WinnersPayload {
                winners: vec![WinnerRecord::default()],
                called_numbers: None,
            }),
        );
        assert_eq!(s.phase, Phase::Ended);

        let s = step(&s, open("G2"));
        assert_eq!(s.phase, Phase::Registration);
        assert!(s.called_numbers.is_empty());
        assert!(s.winners.is_empty());
        assert!(s.your_card.is_none());
        assert!(s.your_selection.is_none());
        assert!(s.is_watch_mode());
    }

    #[test]
    fn replayed_registration_open_keeps_selection() {
        let s = step(&RoundSnapshot::default(), open("G1"));
        let s = step(
            &s,
            ServerMessage::SelectionConfirmed(SelectionConfirmedPayload {
                card_number: Some(9),
                ..Default::default()
            }),
        );
        let s = step(&s, open("G1"));
        assert_eq!(s.your_selection, Some(9));
        assert!(s.is_card_taken(9));
    }

    #[test]
    fn snapshot_for_new_round_replaces_listed_fields() {
        let mut s = running_round();
        s = called(&s, 3);
        s = called(&s, 4);

        let s = step(
            &s,
            ServerMessage::Snapshot(SnapshotPayload {
                phase: Some(Phase::Registration),
                game_id: Some("G2".into()),
                players_count: 4,
                prize_pool: 40,
                taken_cards: vec![1, 2],
                next_start_at: Some(NOW + 30_500),
                ..Default::default()
            }),
        );
        assert_eq!(s.phase, Phase::Registration);
        assert_eq!(s.round_id.as_deref(), Some("G2"));
        assert_eq!(s.players_count, 4);
        assert_eq!(s.prize_pool_amount, 40);
        assert!(s.called_numbers.is_empty());
        assert_eq!(s.current_number, None);
        assert!(s.your_card.is_none());
        assert!(s.your_selection.is_none());
        assert_eq!(s.countdown_seconds, 31);
    }

    #[test]
    fn stale_snapshot_for_same_round_does_not_downgrade() {
        let s = called(&running_round(), 3);
        let s = called(&s, 4);

        let s = step(
            &s,
            ServerMessage::Snapshot(SnapshotPayload {
                phase: Some(Phase::Registration),
                game_id: Some("G1".into()),
                players_count: 9,
                prize_pool: 90,
                called_numbers: vec![3],
                taken_cards: vec![7, 8],
                ..Default::default()
            }),
        );
        assert_eq!(s.phase, Phase::Running);
        assert_eq!(s.called_numbers, vec![3, 4]);
        assert_eq!(s.players_count, 9);
        assert_eq!(s.prize_pool_amount, 90);
        assert_eq!(s.taken_card_numbers, BTreeSet::from([7, 8]));
        assert_eq!(s.your_card.as_ref().map(|c| c.number), Some(7));
        assert_eq!(s.registration_end_time, None);
        assert_eq!(s.countdown_seconds, 0);
    }

    #[test]
    fn same_round_snapshot_may_advance_phase() {
        let s = running_round();
        let s = step(
            &s,
            ServerMessage::Snapshot(SnapshotPayload {
                phase: Some(Phase::Ended),
                game_id: Some("G1".into()),
                called_numbers: vec![1, 2, 3],
                ..Default::default()
            }),
        );
        assert_eq!(s.phase, Phase::Ended);
        assert_eq!(s.called_numbers, vec![1, 2, 3]);
    }

    #[test]
    fn snapshot_restores_card_after_reconnect() {
        let s = step(
            &RoundSnapshot::default(),
            ServerMessage::Snapshot(SnapshotPayload {
                phase: Some(Phase::Running),
                game_id: Some("G1".into()),
                called_numbers: vec![5, 6],
                card: Some(grid()),
                card_number: Some(7),
                ..Default::default()
            }),
        );
        assert_eq!(s.your_selection, Some(7));
        assert_eq!(s.your_card.as_ref().map(|c| c.number), Some(7));
        assert_eq!(s.current_number, Some(6));
    }

    #[test]
    fn snapshot_with_unknown_phase_keeps_previous_phase() {
        let s = step(&RoundSnapshot::default(), open("G1"));
        let s = step(
            &s,
            ServerMessage::Snapshot(SnapshotPayload {
                phase: None,
                game_id: Some("G1".into()),
                ..Default::default()
            }),
        );
        assert_eq!(s.phase, Phase::Registration);
    }

    #[test]
    fn snapshot_countdown_used_without_deadline() {
        let s = step(
            &RoundSnapshot::default(),
            ServerMessage::Snapshot(SnapshotPayload {
                phase: Some(Phase::Registration),
                game_id: Some("G1".into()),
                countdown: Some(12),
                ..Default::default()
            }),
        );
        assert_eq!(s.countdown_seconds, 12);
        assert_eq!(s.registration_end_time, None);
    }

    #[test]
    fn game_started_without_card_is_watch_mode() {
        let s = step(&RoundSnapshot::default(), open("G1"));
        let s = step(
            &s,
            ServerMessage::GameStarted(GameStartedPayload {
                game_id: Some("G1".into()),
                ..Default::default()
            }),
        );
        assert_eq!(s.phase, Phase::Running);
        assert!(s.is_watch_mode());
    }

    #[test]
    fn replayed_game_started_keeps_called_numbers() {
        let s = called(&running_round(), 22);
        let s = step(
            &s,
            ServerMessage::GameStarted(GameStartedPayload {
                game_id: Some("G1".into()),
                ..Default::default()
            }),
        );
        assert_eq!(s.called_numbers, vec![22]);
        assert_eq!(s.current_number, Some(22));
    }

    #[test]
    fn replayed_game_started_after_announce_keeps_round() {
        let s = called(&running_round(), 3);
        let s = step(
            &s,
            ServerMessage::BingoAccepted(WinnersPayload {
                winners: vec![WinnerRecord {
                    card_number: 7,
                    prize_amount: 18,
                    ..Default::default()
                }],
                called_numbers: None,
            }),
        );
        assert_eq!(s.phase, Phase::Announce);

        let replayed = step(
            &s,
            ServerMessage::GameStarted(GameStartedPayload {
                game_id: Some("G1".into()),
                ..Default::default()
            }),
        );
        assert_eq!(replayed, s);

        let ended = step(
            &s,
            ServerMessage::GameEnded(WinnersPayload::default()),
        );
        let replayed = step(
            &ended,
            ServerMessage::GameStarted(GameStartedPayload {
                game_id: Some("G1".into()),
                ..Default::default()
            }),
        );
        assert_eq!(replayed.phase, Phase::Ended);
        assert_eq!(replayed.called_numbers, vec![3]);
        assert_eq!(replayed.winners.len(), 1);
    }

    #[test]
    fn game_started_for_next_round_after_announce_resets() {
        let s = called(&running_round(), 3);
        let s = step(
            &s,
            ServerMessage::BingoAccepted(WinnersPayload::default()),
        );
        let s = step(
            &s,
            ServerMessage::GameStarted(GameStartedPayload {
                game_id: Some("G2".into()),
                ..Default::default()
            }),
        );
        assert_eq!(s.phase, Phase::Running);
        assert_eq!(s.round_id.as_deref(), Some("G2"));
        assert!(s.called_numbers.is_empty());
        assert!(s.your_card.is_none());
    }

    #[test]
    fn card_always_matches_selection() {
        let s = running_round();
        let s = step(
            &s,
            ServerMessage::SelectionConfirmed(SelectionConfirmedPayload {
                card_number: Some(9),
                ..Default::default()
            }),
        );
        assert_eq!(s.your_selection, Some(7));
        assert_eq!(s.your_card.as_ref().map(|c| c.number), Some(7));
    }

    #[test]
    fn registration_closed_is_idempotent_with_running() {
        let s = step(&RoundSnapshot::default(), open("G1"));
        let s = step(&s, ServerMessage::RegistrationClosed);
        assert_eq!(s.phase, Phase::Starting);
        assert_eq!(s.countdown_seconds, 0);

        let s = running_round();
        let s = step(&s, ServerMessage::RegistrationClosed);
        assert_eq!(s.phase, Phase::Running);
    }

    #[test]
    fn cancel_resets_round() {
        let s = called(&running_round(), 10);
        let s = step(&s, ServerMessage::GameCancelled);
        assert_eq!(s.phase, Phase::Registration);
        assert_eq!(s.round_id, None);
        assert_eq!(s.players_count, 0);
        assert!(s.called_numbers.is_empty());
        assert_eq!(s.current_number, None);
        assert!(s.is_watch_mode());
    }

    #[test]
    fn rejection_and_errors_only_produce_notices() {
        let prev = running_round();
        let out = reduce(
            &prev,
            &ServerMessage::SelectionRejected(SelectionRejectedPayload {
                reason: Some("card already taken".into()),
                card_number: Some(7),
            }),
            NOW,
        );
        assert_eq!(out.snapshot, prev);
        assert_eq!(
            out.notice,
            Some(Notice::SelectionRejected {
                reason: "card already taken".into()
            })
        );

        let out = reduce(
            &prev,
            &ServerMessage::Error(ErrorPayload { message: None }),
            NOW,
        );
        assert_eq!(out.snapshot, prev);
        assert!(matches!(out.notice, Some(Notice::ServerError { .. })));

        let out = reduce(&prev, &ServerMessage::Pong, NOW);
        assert_eq!(out, Reduction::state(prev));
    }

    #[test]
    fn finished_round_adopts_longer_called_list() {
        let s = called(&running_round(), 3);
        let s = step(
            &s,
            ServerMessage::GameFinished(WinnersPayload {
                winners: Vec::new(),
                called_numbers: Some(vec![3, 9, 11]),
            }),
        );
        assert_eq!(s.phase, Phase::Ended);
        assert_eq!(s.called_numbers, vec![3, 9, 11]);
        assert!(s.winners.is_empty());
    }
}
