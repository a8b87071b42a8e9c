#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 32 * 1024 {
        return;
    }
    let text = String::from_utf8_lossy(data);
    if let Ok(message) = beyond::ClientMessage::parse(&text) {
        let _ = message.kind();
    }
});
