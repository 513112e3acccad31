#![no_main]

use libfuzzer_sys::fuzz_target;
use modkit_request::Charset;

const CHARSETS: [Charset; 6] = [
    Charset::UsAscii,
    Charset::Windows1252,
    Charset::Utf7,
    Charset::Utf8,
    Charset::Utf16,
    Charset::Utf32,
];

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 {
        return;
    }
    for charset in CHARSETS {
        // Malformed input is replaced, never rejected
        let text = charset.decode(data);
        let _ = charset.encode(&text);
    }
});
