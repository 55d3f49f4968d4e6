//! Local Countdown Ticker.
//!
//! Recomputes `countdown_seconds` from the absolute registration deadline on
//! every tick so the displayed value stays smooth between server messages.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::round::{Phase, RoundSnapshot};

/// Whole seconds from `now_ms` until `deadline_ms`, rounded up, never negative.
pub fn remaining_seconds(deadline_ms: i64, now_ms: i64) -> u32 {
    let left = deadline_ms.saturating_sub(now_ms);
    if left <= 0 {
        return 0;
    }
    let seconds = left.saturating_add(999) / 1000;
    u32::try_from(seconds).unwrap_or(u32::MAX)
}

/// The ticker runs only during registration with a known deadline.
pub fn is_active(snapshot: &RoundSnapshot) -> bool {
    snapshot.phase == Phase::Registration && snapshot.registration_end_time.is_some()
}

/// Advance the countdown to `now_ms`.
///
/// Returns the next snapshot, or `None` when nothing changed. When the
/// deadline has passed the phase moves to `starting` as a local prediction;
/// the server's `registration_closed` lands on the same state.
pub fn tick(snapshot: &RoundSnapshot, now_ms: i64) -> Option<RoundSnapshot> {
    if !is_active(snapshot) {
        return None;
    }
    let deadline = snapshot.registration_end_time?;
    let remaining = remaining_seconds(deadline, now_ms);

    if remaining == 0 {
        return Some(RoundSnapshot {
            phase: Phase::Starting,
            countdown_seconds: 0,
            ..snapshot.clone()
        });
    }
    if remaining == snapshot.countdown_seconds {
        return None;
    }
    Some(RoundSnapshot {
        countdown_seconds: remaining,
        ..snapshot.clone()
    })
}

/// Current wall-clock time in epoch milliseconds.
pub fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
