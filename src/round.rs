//! Data model for one bingo round as seen by this client.
//!
//! [`RoundSnapshot`] is the reconciled view of the round. It is produced by
//! [`reduce`](crate::reducer::reduce) and [`tick`](crate::countdown::tick),
//! never mutated in place by anything else.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::protocol::null_as_default;

/// Lowest ball number that can be called.
pub const MIN_NUMBER: u8 = 1;

/// Highest ball number that can be called.
pub const MAX_NUMBER: u8 = 75;

/// Cell value used for the free centre square.
pub const FREE_CELL: u8 = 0;

/// Returns `true` if `number` is a ball that can legally be called.
pub fn is_valid_number(number: u8) -> bool {
    (MIN_NUMBER..=MAX_NUMBER).contains(&number)
}

/// A 5×5 card grid, row-major. The centre cell holds [`FREE_CELL`].
pub type CardGrid = [[u8; 5]; 5];

/// Builds a grid from 25 row-major cells.
fn grid_from_cells(cells: &[u8]) -> Option<CardGrid> {
    if cells.len() != 25 {
        return None;
    }
    let mut grid = [[FREE_CELL; 5]; 5];
    for (row, chunk) in grid.iter_mut().zip(cells.chunks_exact(5)) {
        row.copy_from_slice(chunk);
    }
    Some(grid)
}

/// Accepts a 5×5 grid or a flat list of 25 cells. Any other shape decodes as
/// `None` so a bad grid never drops the message carrying it.
pub(crate) fn lenient_grid<'de, D>(deserializer: D) -> Result<Option<CardGrid>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Rows(CardGrid),
        Flat(Vec<u8>),
    }

    let Some(value) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let grid = match serde_json::from_value(value) {
        Ok(Shape::Rows(grid)) => Some(grid),
        Ok(Shape::Flat(cells)) => grid_from_cells(&cells),
        Err(_) => None,
    };
    if grid.is_none() {
        warn!("ignoring card grid with unexpected shape");
    }
    Ok(grid)
}

// ── Phase ───────────────────────────────────────────────────────────

/// Phase of the current round.
///
/// Rounds move `waiting → registration → starting → running → announce/ended`
/// and then cycle back to `registration` for the next round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Connected, no round information yet.
    #[default]
    Waiting,
    /// Players may pick a card until the registration deadline.
    Registration,
    /// Registration closed, round about to start.
    Starting,
    /// Numbers are being called.
    Running,
    /// A bingo was accepted and winners are being shown.
    Announce,
    /// The round finished.
    Ended,
}

impl Phase {
    /// Wire name of the phase.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Registration => "registration",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Announce => "announce",
            Self::Ended => "ended",
        }
    }

    /// Parses a wire phase name. Unknown names yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "waiting" => Some(Self::Waiting),
            "registration" => Some(Self::Registration),
            "starting" => Some(Self::Starting),
            "running" => Some(Self::Running),
            "announce" => Some(Self::Announce),
            "ended" => Some(Self::Ended),
            _ => None,
        }
    }

    /// Position of the phase within a round. `announce` and `ended` share a rank.
    pub fn rank(self) -> u8 {
        match self {
            Self::Waiting => 0,
            Self::Registration => 1,
            Self::Starting => 2,
            Self::Running => 3,
            Self::Announce | Self::Ended => 4,
        }
    }

    /// Returns the later of two phases of the same round.
    ///
    /// On a tie `self` is kept.
    #[must_use]
    pub fn later_of(self, other: Self) -> Self {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    /// Returns `true` for `announce` and `ended`.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Announce | Self::Ended)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Cards ───────────────────────────────────────────────────────────

/// A line on a card that completes a bingo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinLine {
    /// A full row, `0..5` from the top.
    Row(usize),
    /// A full column, `0..5` from the left.
    Column(usize),
    /// Top-left to bottom-right.
    Diagonal,
    /// Top-right to bottom-left.
    AntiDiagonal,
}

impl WinLine {
    /// All twelve lines, rows first, then columns, then both diagonals.
    pub fn all() -> impl Iterator<Item = WinLine> {
        (0..5)
            .map(WinLine::Row)
            .chain((0..5).map(WinLine::Column))
            .chain([WinLine::Diagonal, WinLine::AntiDiagonal])
    }

    /// `(row, column)` coordinates of the five cells on this line.
    pub fn cells(self) -> [(usize, usize); 5] {
        let mut cells = [(0, 0); 5];
        for (i, cell) in cells.iter_mut().enumerate() {
            *cell = match self {
                Self::Row(row) => (row, i),
                Self::Column(column) => (i, column),
                Self::Diagonal => (i, i),
                Self::AntiDiagonal => (i, 4 - i),
            };
        }
        cells
    }
}

fn cell_at(grid: &CardGrid, (row, column): (usize, usize)) -> Option<u8> {
    grid.get(row).and_then(|r| r.get(column)).copied()
}

/// Finds the first completed line on `grid` given the numbers called so far.
///
/// The free centre counts as marked. This is a display aid for highlighting a
/// winning card; the server alone decides who won.
pub fn winning_line(grid: &CardGrid, called: &[u8]) -> Option<WinLine> {
    WinLine::all().find(|line| {
        line.cells().iter().all(|&pos| match cell_at(grid, pos) {
            Some(FREE_CELL) => true,
            Some(number) => called.contains(&number),
            None => false,
        })
    })
}

/// The card assigned to this client for a running round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BingoCard {
    /// Card (cartella) number the client registered.
    pub number: u32,
    /// The numbers printed on the card.
    pub grid: CardGrid,
}

impl BingoCard {
    /// Create a card from its number and grid.
    pub fn new(number: u32, grid: CardGrid) -> Self {
        Self { number, grid }
    }

    /// Returns `true` if `number` is printed on this card.
    pub fn contains(&self, number: u8) -> bool {
        number != FREE_CELL && self.grid.iter().flatten().any(|&cell| cell == number)
    }

    /// Returns `true` if the cell holding `number` should be shown as marked.
    pub fn is_marked(&self, number: u8, called: &[u8]) -> bool {
        number == FREE_CELL || (self.contains(number) && called.contains(&number))
    }

    /// See [`winning_line`].
    pub fn winning_line(&self, called: &[u8]) -> Option<WinLine> {
        winning_line(&self.grid, called)
    }
}

// ── Winners ─────────────────────────────────────────────────────────

/// A winner announced by the server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WinnerRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub card_number: u32,
    #[serde(alias = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(alias = "prize", deserialize_with = "null_as_default")]
    pub prize_amount: u64,
    #[serde(
        alias = "cardNumbers",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_grid"
    )]
    pub card_grid: Option<CardGrid>,
    /// Numbers that had been called when the win was accepted.
    #[serde(alias = "called", deserialize_with = "null_as_default")]
    pub called_at_win: Vec<u8>,
}

impl WinnerRecord {
    /// Winning line on the winner's card, for highlighting.
    pub fn winning_line(&self) -> Option<WinLine> {
        self.card_grid
            .as_ref()
            .and_then(|grid| winning_line(grid, &self.called_at_win))
    }
}

// ── Snapshot ────────────────────────────────────────────────────────

/// Reconciled view of the current round.
///
/// A fresh snapshot is [`Default`]: phase `waiting`, nothing called, no card.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoundSnapshot {
    pub phase: Phase,
    /// Server-assigned round identifier, `None` until known.
    pub round_id: Option<String>,
    pub players_count: u32,
    pub prize_pool_amount: u64,
    /// Called numbers in call order; unique, each in `1..=75`.
    pub called_numbers: Vec<u8>,
    pub current_number: Option<u8>,
    /// Cards already taken by players during registration.
    pub taken_card_numbers: BTreeSet<u32>,
    /// Card number this client registered.
    pub your_selection: Option<u32>,
    /// Card assigned to this client once the round runs.
    pub your_card: Option<BingoCard>,
    /// Registration deadline in epoch milliseconds.
    pub registration_end_time: Option<i64>,
    /// Whole seconds left until the registration deadline.
    pub countdown_seconds: u32,
    pub winners: Vec<WinnerRecord>,
}

impl RoundSnapshot {
    /// `true` when this client has neither a card nor a registered selection.
    pub fn is_watch_mode(&self) -> bool {
        self.your_card.is_none() && self.your_selection.is_none()
    }

    /// Returns `true` if `number` has been called in this round.
    pub fn is_called(&self, number: u8) -> bool {
        self.called_numbers.contains(&number)
    }

    /// Returns `true` if `card_number` is already taken by a player.
    pub fn is_card_taken(&self, card_number: u32) -> bool {
        self.taken_card_numbers.contains(&card_number)
    }
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

    fn sample_grid() -> CardGrid {
        [
            [1, 16, 31, 46, 61],
            [2, 17, 32, 47, 62],
            [3, 18, FREE_CELL, 48, 63],
            [4, 19, 33, 49, 64],
            [5, 20, 34, 50, 65],
        ]
    }

    #[test]
    fn phase_round_trips_through_wire_names() {
        for phase in [
            Phase::Waiting,
            Phase::Registration,
            Phase::Starting,
            Phase::Running,
            Phase::Announce,
            Phase::Ended,
        ] {
            assert_eq!(Phase::parse(phase.as_str()), Some(phase));
        }
        assert_eq!(Phase::parse("intermission"), None);
    }

    #[test]
    fn later_of_never_goes_backwards() {
        assert_eq!(Phase::Running.later_of(Phase::Registration), Phase::Running);
        assert_eq!(Phase::Starting.later_of(Phase::Running), Phase::Running);
        assert_eq!(Phase::Announce.later_of(Phase::Ended), Phase::Announce);
    }

    #[test]
    fn watch_mode_follows_card_and_selection() {
        let mut snapshot = RoundSnapshot::default();
        assert!(snapshot.is_watch_mode());

        snapshot.your_selection = Some(7);
        assert!(!snapshot.is_watch_mode());

        snapshot.your_card = Some(BingoCard::new(7, sample_grid()));
        assert!(!snapshot.is_watch_mode());
    }

    #[test]
    fn column_with_free_centre_wins() {
        let called = [31, 32, 33, 34];
        assert_eq!(winning_line(&sample_grid(), &called), Some(WinLine::Column(2)));
    }

    #[test]
    fn row_wins() {
        let called = [4, 19, 33, 49, 64];
        assert_eq!(winning_line(&sample_grid(), &called), Some(WinLine::Row(3)));
    }

    #[test]
    fn diagonals_win() {
        let called = [1, 17, 49, 65];
        assert_eq!(winning_line(&sample_grid(), &called), Some(WinLine::Diagonal));

        let called = [61, 47, 19, 5];
        assert_eq!(
            winning_line(&sample_grid(), &called),
            Some(WinLine::AntiDiagonal)
        );
    }

    #[test]
    fn incomplete_card_has_no_line() {
        let called = [1, 2, 3, 4, 16, 17, 31];
        assert_eq!(winning_line(&sample_grid(), &called), None);
    }

    #[test]
    fn card_marks_only_its_own_called_numbers() {
        let card = BingoCard::new(7, sample_grid());
        assert!(card.is_marked(FREE_CELL, &[]));
        assert!(card.is_marked(16, &[16]));
        assert!(!card.is_marked(16, &[]));
        assert!(!card.is_marked(70, &[70]));
    }

    #[test]
    fn winner_record_accepts_short_field_names() {
        let json = r#"{"cardNumber":7,"name":"Abebe","prize":18,"called":[1,2]}"#;
        let winner: WinnerRecord = serde_json::from_str(json).unwrap();
        assert_eq!(winner.card_number, 7);
        assert_eq!(winner.display_name.as_deref(), Some("Abebe"));
        assert_eq!(winner.prize_amount, 18);
        assert_eq!(winner.called_at_win, vec![1, 2]);
        assert!(winner.winning_line().is_none());
    }

    #[test]
    fn winner_card_accepts_flat_or_nested_grid() {
        let flat: Vec<u8> = sample_grid().iter().flatten().copied().collect();
        let json = serde_json::json!({ "cardNumber": 7, "cardNumbers": flat });
        let winner: WinnerRecord = serde_json::from_value(json).unwrap();
        assert_eq!(winner.card_grid, Some(sample_grid()));

        let json = serde_json::json!({ "cardNumber": 7, "cardGrid": sample_grid() });
        let winner: WinnerRecord = serde_json::from_value(json).unwrap();
        assert_eq!(winner.card_grid, Some(sample_grid()));
    }

    #[test]
    fn unreadable_winner_card_is_dropped_not_fatal() {
        for grid in [
            serde_json::json!([1, 2, 3]),
            serde_json::json!("B1 I16"),
            serde_json::json!([[1, 2], [3, 4]]),
            serde_json::Value::Null,
        ] {
            let json = serde_json::json!({ "cardNumber": 7, "prize": 18, "cardNumbers": grid });
            let winner: WinnerRecord = serde_json::from_value(json).unwrap();
            assert_eq!(winner.card_number, 7);
            assert_eq!(winner.prize_amount, 18);
            assert!(winner.card_grid.is_none(), "grid {grid} should be dropped");
        }
    }

    #[test]
    fn winner_record_null_fields_use_defaults() {
        let json = r#"{"cardNumber":null,"prize":null,"called":null}"#;
        let winner: WinnerRecord = serde_json::from_str(json).unwrap();
        assert_eq!(winner, WinnerRecord::default());
    }

    #[test]
    fn grid_needs_exactly_25_cells() {
        assert_eq!(grid_from_cells(&[0; 24]), None);
        assert_eq!(grid_from_cells(&[0; 26]), None);
        assert_eq!(grid_from_cells(&[9; 25]), Some([[9; 5]; 5]));
    }

    #[test]
    fn number_range() {
        assert!(!is_valid_number(0));
        assert!(is_valid_number(1));
        assert!(is_valid_number(75));
        assert!(!is_valid_number(76));
    }
}
