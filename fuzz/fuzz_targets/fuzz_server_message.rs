#![no_main]

use bingo_live_client::protocol::{decode_server_message, ServerMessage};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        let _ = serde_json::from_slice::<ServerMessage>(data);
        return;
    };
    let _ = decode_server_message(text);
    let _ = serde_json::from_str::<ServerMessage>(text);
});
