#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let once = dv_parser::sanitize(input);
        assert_eq!(dv_parser::sanitize(&once), once, "sanitize must be idempotent");
    }
});
