//! Fuzz target for WASM URL relocation
//!
//! # Invariants
//!
//! - Never panics on arbitrary base paths and URLs, including non-ASCII and
//!   characters a URL escapes
//! - A relocated URL keeps origin, query and fragment
//! - A relocated URL lies under the base path
//! - Relocation is idempotent

#![no_main]

use arbitrary::Arbitrary;
use farewell_core::{BasePath, relocate::relocate_wasm_url};
use libfuzzer_sys::fuzz_target;
use url::Url;

#[derive(Debug, Arbitrary)]
struct Input {
    base: String,
    url: String,
}

fn is_dot_segment(segment: &str) -> bool {
    matches!(segment.to_ascii_lowercase().replace("%2e", ".").as_str(), "." | "..")
}

fuzz_target!(|input: Input| {
    let base = BasePath::new(&input.base);
    // Dot segments and backslashes are rewritten by the URL parser itself
    if base.as_str().contains('\\') || base.as_str().split('/').any(is_dot_segment) {
        return;
    }
    let Ok(page) = Url::parse("https://example.org/") else {
        return;
    };
    let Ok(url) = page.join(&input.url) else {
        return;
    };

    let Some(relocated) = relocate_wasm_url(&url, &page, &base) else {
        return;
    };

    assert_eq!(relocated.origin(), url.origin());
    assert_eq!(relocated.query(), url.query());
    assert_eq!(relocated.fragment(), url.fragment());
    assert!(base.contains_path(relocated.path()), "{relocated} not under {base}");
    assert_eq!(relocate_wasm_url(&relocated, &page, &base), None);
});
