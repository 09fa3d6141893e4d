//! Property-style tests: totality and idempotence should hold for any
//! input, not just the hand-picked scenarios in `scenarios.rs`.

use html_sanitizer::sanitize;
use quickcheck_macros::quickcheck;

#[quickcheck]
fn sanitize_never_panics(input: String) -> bool {
    let _ = sanitize(&input, None, None);
    true
}

#[quickcheck]
fn sanitize_is_idempotent(input: String) -> bool {
    let once = sanitize(&input, None, None);
    let twice = sanitize(&once, None, None);
    once == twice
}

#[quickcheck]
fn output_never_contains_a_script_tag(input: String) -> bool {
    let out = sanitize(&input, None, None);
    !out.to_ascii_lowercase().contains("<script")
}
