//! Fuzz target for Proteus envelope decoding
//!
//! Envelopes arrive from the network before any session is consulted.
//!
//! # Strategy
//!
//! - Typed: a valid type byte followed by arbitrary message bytes
//! - Random bytes: completely arbitrary input, including empty
//!
//! # Invariants
//!
//! - Decoding NEVER panics
//! - A decoded envelope re-encodes to something that decodes again

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tandem_engine::proteus::envelope;

#[derive(Debug, Arbitrary)]
enum Input {
    Typed { prekey: bool, body: Vec<u8> },
    RandomBytes(Vec<u8>),
}

fuzz_target!(|input: Input| {
    let bytes = match input {
        Input::Typed { prekey, body } => {
            let tag = if prekey { envelope::PREKEY_MESSAGE } else { envelope::NORMAL_MESSAGE };
            let mut bytes = vec![tag];
            bytes.extend(body);
            bytes
        }
        Input::RandomBytes(bytes) => bytes,
    };

    if let Ok(message) = envelope::decode(&bytes) {
        let encoded = envelope::encode(&message);
        assert!(envelope::decode(&encoded).is_ok());
    }
});
