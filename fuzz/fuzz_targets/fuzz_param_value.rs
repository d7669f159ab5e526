#![no_main]

use libfuzzer_sys::fuzz_target;
use macroeco_sad::workflow::ParamValue;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(value) = ParamValue::parse(text) {
            // Display output must parse back to the same value
            let reparsed = ParamValue::parse(&value.to_string());
            assert!(reparsed.is_ok(), "cannot reparse {value}");
        }
    }
});
