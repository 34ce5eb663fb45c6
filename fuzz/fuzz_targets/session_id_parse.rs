//! Fuzz target for raw session key parsing
//!
//! # Strategy
//!
//! - Raw: arbitrary strings, heavy on delimiters and escapes
//! - Fields: arbitrary triples rendered through `raw_value`
//!
//! # Invariants
//!
//! - Parsing NEVER panics
//! - A key that parses renders back to itself
//! - Every rendered triple parses back to the same identifier

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tandem_core::ProteusSessionId;

#[derive(Debug, Arbitrary)]
enum Input {
    Raw(String),
    Fields { domain: String, user_id: String, client_id: String },
}

fuzz_target!(|input: Input| {
    match input {
        Input::Raw(raw) => {
            if let Ok(id) = raw.parse::<ProteusSessionId>() {
                assert_eq!(id.raw_value(), raw);
            }
        }

        Input::Fields { domain, user_id, client_id } => {
            let id = ProteusSessionId::new(domain, user_id, client_id);
            let parsed = id.raw_value().parse::<ProteusSessionId>();
            assert_eq!(parsed.as_ref(), Ok(&id));
        }
    }
});
