//! Fuzz target for parse_hex128
//!
//! # Invariants
//!
//! - Never panics on arbitrary text
//! - Accepted input contains no whitespace
//! - Accepted input round-trips through the canonical form
//! - Canonical form is always `0x` + 32 lowercase digits

#![no_main]

use farewell_crypto::{format_hex128, parse_hex128};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(value) = parse_hex128(text) {
        assert!(!text.contains(char::is_whitespace), "accepted {text:?}");
        let canonical = format_hex128(value);
        assert_eq!(canonical.len(), 34);
        assert!(canonical[2..].bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
        assert_eq!(parse_hex128(&canonical), Ok(value));
    }
});
