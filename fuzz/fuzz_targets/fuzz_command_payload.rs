//! Fuzz target: `Validator::evaluate`
//!
//! Feeds arbitrary topic payloads to the validator with a fresh debounce
//! state and asserts that it never panics and only ever accepts a
//! non-empty username.
//!
//! cargo fuzz run fuzz_command_payload

#![no_main]

use std::time::{Duration, Instant};

use doorman::app::validator::{DebounceState, Validator};
use doorman::error::Rejection;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let validator = Validator::new(Duration::from_secs(5));
    let fresh = DebounceState::new();

    match validator.evaluate(data, Instant::now(), &fresh) {
        Ok(request) => assert!(!request.username.is_empty()),
        Err(Rejection::TooSoon { .. }) => panic!("fresh state can never be too soon"),
        Err(_) => {}
    }
});
