#![no_main]

use dv_core::Browser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let parsed = dv_parser::parse_groups(&dv_parser::sanitize(input));
        let other_count = parsed.groups.groups().iter().filter(|group| group.is_other()).count();
        assert!(other_count <= 1);

        // Walking the whole tree must never panic.
        let mut browser = Browser::new(parsed.groups);
        for _ in 0..browser.rows().len() {
            browser.select_next();
            let _ = browser.detail().lines();
            let _ = browser.link_action();
        }
        browser.set_filter(input.chars().take(8).collect::<String>());
        let _ = browser.rows();
    }
});
