//! The deterministic nonce schedule.
//!
//! All nonces are 24 bytes. Static nonces are 24-byte ASCII labels; indexed
//! nonces are a 16-byte ASCII label followed by a big-endian 64-bit index;
//! MAC-key nonces reuse a prefix of the header hash so that MAC keys bind to
//! the exact header bytes.

use saltpack_crypto::Nonce;

use crate::hashes::HeaderHash;
use crate::version::Version;

const SENDER_KEY_SECRETBOX: &[u8; 24] = b"saltpack_sender_key_sbox";
const PAYLOAD_KEY_BOX_V1: &[u8; 24] = b"saltpack_payload_key_box";
const PAYLOAD_KEY_BOX_V2: &[u8; 16] = b"saltpack_recipsb";
const PAYLOAD_SECRETBOX: &[u8; 16] = b"saltpack_ploadsb";
const SIGNCRYPTION_CHUNK: &[u8; 16] = b"saltpack_ploadsc";

fn labeled(label: &[u8; 16], index: u64) -> Nonce {
    let mut n = [0u8; 24];
    n[..16].copy_from_slice(label);
    n[16..].copy_from_slice(&index.to_be_bytes());
    Nonce(n)
}

/// Nonce for the sender secretbox. Static across versions.
pub(crate) fn sender_key_secretbox() -> Nonce {
    Nonce(*SENDER_KEY_SECRETBOX)
}

/// Nonce for recipient `index`'s payload-key box.
///
/// v1 uses one static label for every recipient; v2 mixes the recipient
/// index in.
pub(crate) fn payload_key_box(version: Version, index: u64) -> Nonce {
    if version.major < 2 {
        Nonce(*PAYLOAD_KEY_BOX_V1)
    } else {
        labeled(PAYLOAD_KEY_BOX_V2, index)
    }
}

/// Nonce for the MAC-key box of recipient `index`.
///
/// v1 takes the first 24 bytes of the header hash; v2 takes the first 16
/// and mixes the recipient index in.
pub(crate) fn mac_key_box(version: Version, header_hash: &HeaderHash, index: u64) -> Nonce {
    let mut n = [0u8; 24];
    if version.major < 2 {
        n.copy_from_slice(&header_hash.0[..24]);
    } else {
        n[..16].copy_from_slice(&header_hash.0[..16]);
        n[16..].copy_from_slice(&index.to_be_bytes());
    }
    Nonce(n)
}

/// Nonce for payload block `index`'s secretbox.
pub(crate) fn payload_secretbox(index: u64) -> Nonce {
    labeled(PAYLOAD_SECRETBOX, index)
}

/// Nonce for signcryption payload chunk `index`.
///
/// One letter apart from [`payload_secretbox`]; the label is reserved by
/// the format even though this implementation does not produce
/// signcryption payloads.
#[allow(dead_code)]
pub(crate) fn signcryption_chunk(index: u64) -> Nonce {
    labeled(SIGNCRYPTION_CHUNK, index)
}
