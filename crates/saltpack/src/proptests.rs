//! Property-based tests for format invariants.
//!
//! These verify the round-trip laws hold for arbitrary plaintexts, block
//! sizes, and receiver counts:
//!
//! - open(seal(P)) == P across both wire versions
//! - verify(sign(M)) == M across both wire versions and chunkings

use proptest::prelude::*;

use rand::rngs::OsRng;

use saltpack_crypto::{BoxKeyPair, BoxPublicKey, BoxSecretKey, KeyringStore, SigningKeyPair};

use crate::decrypt::open;
use crate::encrypt::{seal_with, SealOptions};
use crate::sign::sign_with_block_size;
use crate::verify::verify;
use crate::version::{SingleVersionValidator, Version};

fn any_version() -> impl Strategy<Value = Version> {
    prop_oneof![Just(Version::V1), Just(Version::V2)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_seal_open_round_trip(
        version in any_version(),
        plaintext in proptest::collection::vec(any::<u8>(), 0..2048),
        block_size in 1usize..128,
        receiver_count in 1usize..4,
    ) {
        let sender = BoxKeyPair::generate(&mut OsRng).unwrap();
        let receivers: Vec<BoxKeyPair> = (0..receiver_count)
            .map(|_| BoxKeyPair::generate(&mut OsRng).unwrap())
            .collect();
        let mut ring = KeyringStore::new();
        ring.insert_box_key(&receivers[receiver_count - 1]);

        let publics: Vec<Box<dyn BoxPublicKey>> =
            receivers.iter().map(|r| r.public_key()).collect();
        let refs: Vec<&dyn BoxPublicKey> = publics.iter().map(|p| p.as_ref()).collect();

        let opts = SealOptions { block_size, shuffle: true };
        let wire = seal_with(version, &plaintext, Some(&sender), &refs, opts).unwrap();
        let (_, opened) =
            open(&SingleVersionValidator::new(version), &wire, &ring).unwrap();
        prop_assert_eq!(opened, plaintext);
    }

    #[test]
    fn prop_sign_verify_round_trip(
        version in any_version(),
        message in proptest::collection::vec(any::<u8>(), 0..2048),
        block_size in 1usize..128,
    ) {
        let key = SigningKeyPair::generate(&mut OsRng).unwrap();
        let mut ring = KeyringStore::new();
        ring.insert_signing_key(&key);

        let wire = sign_with_block_size(version, &message, &key, block_size).unwrap();
        let (_, verified) =
            verify(&SingleVersionValidator::new(version), &wire, &ring).unwrap();
        prop_assert_eq!(verified, message);
    }
}
