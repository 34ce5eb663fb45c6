//! Fuzz target for CBOR prekey bundle decoding
//!
//! # Strategy
//!
//! - Deeply nested: arrays nested to arbitrary depth
//! - Huge lengths: byte strings claiming far more data than present
//! - Random bytes: completely arbitrary CBOR
//!
//! # Invariants
//!
//! - Decoding completes quickly and NEVER panics
//! - Huge claimed lengths are rejected, not allocated
//! - A decoded bundle re-encodes to an equal bundle

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tandem_engine::PrekeyBundle;

#[derive(Debug, Arbitrary)]
enum Input {
    DeeplyNested { depth: u8 },
    HugeLength { claimed_len_exponent: u8 },
    RandomBytes(Vec<u8>),
}

fuzz_target!(|input: Input| {
    let bytes = match input {
        Input::DeeplyNested { depth } => {
            let mut bytes = vec![0x81; (depth % 50) as usize];
            bytes.push(0x01);
            bytes
        }

        Input::HugeLength { claimed_len_exponent } => {
            let exponent = u32::from(claimed_len_exponent % 32);
            let mut bytes = vec![0xA1, 0x62, b'i', b'd', 0x5A];
            bytes.extend_from_slice(&(1u32 << exponent).to_be_bytes());
            bytes.extend_from_slice(&[0xAA; 10]);
            bytes
        }

        Input::RandomBytes(bytes) => bytes,
    };

    if let Ok(bundle) = PrekeyBundle::decode(&bytes) {
        let encoded = bundle.encode().unwrap();
        assert_eq!(PrekeyBundle::decode(&encoded).unwrap(), bundle);
    }
});
