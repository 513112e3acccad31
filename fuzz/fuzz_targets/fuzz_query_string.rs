#![no_main]

use libfuzzer_sys::fuzz_target;
use modkit_request::QueryString;

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }
    if let Ok(s) = std::str::from_utf8(data) {
        // A parsed query must serialize and append without panicking
        if let Ok(query) = QueryString::parse(s) {
            let _ = query.append_to("http://fuzz.local/path?x=1");
        }
    }
});
