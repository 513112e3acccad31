#![no_main]

use libfuzzer_sys::fuzz_target;
use modkit_request::try_parse_xml_element;

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = try_parse_xml_element(s);
    }
});
