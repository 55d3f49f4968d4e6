#![no_main]

use bingo_live_client::protocol::{decode_server_message, Inbound};
use bingo_live_client::reducer::reduce;
use bingo_live_client::round::{is_valid_number, RoundSnapshot};
use libfuzzer_sys::fuzz_target;

// Feed newline-separated frames through the reducer and check that the
// snapshot never holds an out-of-range or duplicated called number.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let mut snapshot = RoundSnapshot::default();
    for (i, line) in text.lines().enumerate() {
        let Ok(Inbound::Message(msg)) = decode_server_message(line) else {
            continue;
        };
        let now = 1_700_000_000_000 + i64::try_from(i).unwrap_or(0) * 1_000;
        snapshot = reduce(&snapshot, &msg, now).snapshot;

        let mut seen = [false; 76];
        for &n in &snapshot.called_numbers {
            assert!(is_valid_number(n));
            assert!(!seen[usize::from(n)], "duplicate called number {n}");
            seen[usize::from(n)] = true;
        }
    }
});
