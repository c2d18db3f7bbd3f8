//! End-to-end exercises of the public API, including messages that span
//! multiple production-size blocks.

use std::io::{Read, Write};

use rand::RngCore;

use saltpack::{
    open, seal, sign, sign_detached, verify, verify_detached, DecryptStream, EncryptStream,
    KnownVersionValidator, SignStream, SingleVersionValidator, Version, VerifyStream,
    ENCRYPTION_BLOCK_SIZE,
};
use saltpack_crypto::{
    box_public_keys_equal, signing_public_keys_equal, BoxKeyPair, BoxSecretKey, KeyringStore,
    SigningKeyPair, SigningSecretKey,
};

fn versions() -> [Version; 2] {
    [Version::V1, Version::V2]
}

fn random_msg(len: usize) -> Vec<u8> {
    let mut msg = vec![0u8; len];
    rand::rngs::OsRng.fill_bytes(&mut msg);
    msg
}

#[test]
fn seal_and_open_spanning_multiple_blocks() {
    let msg = random_msg(3 * ENCRYPTION_BLOCK_SIZE + 12345);
    for version in versions() {
        let sender = BoxKeyPair::generate(&mut rand::rngs::OsRng).unwrap();
        let receiver = BoxKeyPair::generate(&mut rand::rngs::OsRng).unwrap();
        let mut ring = KeyringStore::new();
        ring.insert_box_key(&receiver);
        let public = receiver.public_key();

        let wire = seal(version, &msg, Some(&sender), &[public.as_ref()]).unwrap();
        let (info, plaintext) =
            open(&SingleVersionValidator::new(version), &wire, &ring).unwrap();

        assert_eq!(plaintext, msg);
        assert!(!info.sender_is_anon);
        assert!(box_public_keys_equal(
            info.sender_key.as_deref().unwrap(),
            sender.public_key().as_ref()
        ));
    }
}

#[test]
fn streaming_writer_then_streaming_reader() {
    for version in versions() {
        let sender = BoxKeyPair::generate(&mut rand::rngs::OsRng).unwrap();
        let receiver = BoxKeyPair::generate(&mut rand::rngs::OsRng).unwrap();
        let mut ring = KeyringStore::new();
        ring.insert_box_key(&receiver);
        let public = receiver.public_key();
        let msg = random_msg(100 * 1024);

        let mut wire = Vec::new();
        let mut stream =
            EncryptStream::new(version, &mut wire, Some(&sender), &[public.as_ref()]).unwrap();
        for piece in msg.chunks(7919) {
            stream.write_all(piece).unwrap();
        }
        stream.close().unwrap();

        let (_, mut reader) = DecryptStream::new(
            &SingleVersionValidator::new(version),
            wire.as_slice(),
            &ring,
        )
        .unwrap();
        let mut plaintext = Vec::new();
        reader.read_to_end(&mut plaintext).unwrap();
        assert_eq!(plaintext, msg);
    }
}

#[test]
fn every_named_receiver_can_open() {
    for version in versions() {
        let sender = BoxKeyPair::generate(&mut rand::rngs::OsRng).unwrap();
        let receivers: Vec<BoxKeyPair> = (0..3)
            .map(|_| BoxKeyPair::generate(&mut rand::rngs::OsRng).unwrap())
            .collect();
        let publics: Vec<_> = receivers.iter().map(|r| r.public_key()).collect();
        let refs: Vec<_> = publics.iter().map(|p| p.as_ref()).collect();
        let msg = random_msg(10 * 1024);
        let wire = seal(version, &msg, Some(&sender), &refs).unwrap();

        for receiver in &receivers {
            let mut ring = KeyringStore::new();
            ring.insert_box_key(receiver);
            let (info, plaintext) =
                open(&SingleVersionValidator::new(version), &wire, &ring).unwrap();
            assert_eq!(plaintext, msg);
            assert_eq!(info.named_receivers.len(), 3);
            assert_eq!(info.num_anon_receivers, 0);
        }
    }
}

#[test]
fn known_version_validator_accepts_both_majors() {
    let sender = BoxKeyPair::generate(&mut rand::rngs::OsRng).unwrap();
    let receiver = BoxKeyPair::generate(&mut rand::rngs::OsRng).unwrap();
    let mut ring = KeyringStore::new();
    ring.insert_box_key(&receiver);
    let public = receiver.public_key();

    for version in versions() {
        let wire = seal(version, b"either major", Some(&sender), &[public.as_ref()]).unwrap();
        let (_, plaintext) = open(&KnownVersionValidator, &wire, &ring).unwrap();
        assert_eq!(plaintext, b"either major");
    }
}

#[test]
fn sign_and_verify_spanning_multiple_blocks() {
    let msg = random_msg(2 * ENCRYPTION_BLOCK_SIZE + 999);
    for version in versions() {
        let key = SigningKeyPair::generate(&mut rand::rngs::OsRng).unwrap();
        let mut ring = KeyringStore::new();
        ring.insert_signing_key(&key);

        let wire = sign(version, &msg, &key).unwrap();
        let (signer, verified) =
            verify(&SingleVersionValidator::new(version), &wire, &ring).unwrap();
        assert_eq!(verified, msg);
        assert!(signing_public_keys_equal(
            signer.as_ref(),
            key.public_key().as_ref()
        ));
    }
}

#[test]
fn signed_stream_via_incremental_writes() {
    for version in versions() {
        let key = SigningKeyPair::generate(&mut rand::rngs::OsRng).unwrap();
        let mut ring = KeyringStore::new();
        ring.insert_signing_key(&key);
        let msg = random_msg(64 * 1024);

        let mut wire = Vec::new();
        let mut stream = SignStream::new(version, &mut wire, &key).unwrap();
        for piece in msg.chunks(1013) {
            stream.write_all(piece).unwrap();
        }
        stream.close().unwrap();

        let (_, mut reader) = VerifyStream::new(
            &SingleVersionValidator::new(version),
            wire.as_slice(),
            &ring,
        )
        .unwrap();
        let mut verified = Vec::new();
        reader.read_to_end(&mut verified).unwrap();
        assert_eq!(verified, msg);
    }
}

#[test]
fn detached_signature_round_trip() {
    for version in versions() {
        let key = SigningKeyPair::generate(&mut rand::rngs::OsRng).unwrap();
        let mut ring = KeyringStore::new();
        ring.insert_signing_key(&key);
        let msg = random_msg(32 * 1024);

        let sig = sign_detached(version, &msg, &key).unwrap();
        let signer =
            verify_detached(&SingleVersionValidator::new(version), &msg, &sig, &ring).unwrap();
        assert!(signing_public_keys_equal(
            signer.as_ref(),
            key.public_key().as_ref()
        ));
    }
}

#[test]
fn sign_then_seal_then_open_then_verify() {
    // The two modes compose: a signed stream travels inside an encrypted
    // one.
    let signing_key = SigningKeyPair::generate(&mut rand::rngs::OsRng).unwrap();
    let sender = BoxKeyPair::generate(&mut rand::rngs::OsRng).unwrap();
    let receiver = BoxKeyPair::generate(&mut rand::rngs::OsRng).unwrap();
    let mut ring = KeyringStore::new();
    ring.insert_box_key(&receiver);
    ring.insert_signing_key(&signing_key);
    let public = receiver.public_key();

    let msg = b"signed and sealed".to_vec();
    let signed = sign(Version::V2, &msg, &signing_key).unwrap();
    let sealed = seal(Version::V2, &signed, Some(&sender), &[public.as_ref()]).unwrap();

    let validator = SingleVersionValidator::new(Version::V2);
    let (_, opened) = open(&validator, &sealed, &ring).unwrap();
    let (_, verified) = verify(&validator, &opened, &ring).unwrap();
    assert_eq!(verified, msg);
}
