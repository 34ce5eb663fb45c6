//! Property-based tests for the Proteus wire codecs
//!
//! 1. **Totality**: decoding untrusted bytes returns a result, never panics
//! 2. **Stability**: a decoded envelope re-encodes to bytes that decode to the
//!    same encoding
//! 3. **Round-trip**: every prekey bundle survives encode then decode

use proptest::prelude::*;
use tandem_engine::{
    PrekeyBundle,
    proteus::envelope::{self, EnvelopeError, NORMAL_MESSAGE, PREKEY_MESSAGE},
};
use vodozemac::Curve25519PublicKey;

// Envelopes biased towards the two known type tags
fn envelope_bytes() -> impl Strategy<Value = Vec<u8>> {
    let tag = prop_oneof![Just(PREKEY_MESSAGE), Just(NORMAL_MESSAGE), any::<u8>()];
    (tag, prop::collection::vec(any::<u8>(), 0..256)).prop_map(|(tag, mut body)| {
        body.insert(0, tag);
        body
    })
}

fn bundle() -> impl Strategy<Value = PrekeyBundle> {
    (any::<u16>(), any::<[u8; 32]>(), any::<[u8; 32]>()).prop_map(|(id, identity, prekey)| {
        PrekeyBundle {
            id,
            identity_key: Curve25519PublicKey::from_bytes(identity),
            prekey: Curve25519PublicKey::from_bytes(prekey),
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// INVARIANT: envelope::decode is total over arbitrary bytes.
    #[test]
    fn envelope_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = envelope::decode(&bytes);
    }

    /// INVARIANT: Whatever decodes re-encodes to a stable envelope.
    #[test]
    fn decoded_envelope_reencodes_stably(bytes in envelope_bytes()) {
        if let Ok(message) = envelope::decode(&bytes) {
            let encoded = envelope::encode(&message);
            let again = envelope::decode(&encoded).unwrap();
            prop_assert_eq!(envelope::encode(&again), encoded);
        }
    }

    /// INVARIANT: Tags other than pre-key and normal are rejected by tag alone.
    #[test]
    fn unknown_tag_is_rejected(tag in 2u8.., body in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut bytes = vec![tag];
        bytes.extend_from_slice(&body);

        prop_assert_eq!(envelope::decode(&bytes).unwrap_err(), EnvelopeError::UnknownType(tag));
    }

    /// INVARIANT: PrekeyBundle::decode is total over arbitrary bytes.
    #[test]
    fn bundle_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = PrekeyBundle::decode(&bytes);
    }

    /// INVARIANT: decode(encode(bundle)) == bundle.
    #[test]
    fn bundle_round_trips(bundle in bundle()) {
        let encoded = bundle.encode().unwrap();

        prop_assert_eq!(PrekeyBundle::decode(&encoded).unwrap(), bundle);
    }
}
