//! The digests that bind blocks to their header: header hashes, payload
//! hashes, and signing inputs.

use sha2::{Digest, Sha512};

use saltpack_crypto::Nonce;

/// Signature-input prefix for attached signatures.
pub(crate) const SIGNATURE_ATTACHED_STRING: &[u8] = b"saltpack attached signature\0";

/// Signature-input prefix for detached signatures.
pub(crate) const SIGNATURE_DETACHED_STRING: &[u8] = b"saltpack detached signature\0";

/// SHA-512 of the exact header bytes as they appear on the wire.
///
/// Every downstream derivation (MAC keys, payload hashes, signing inputs)
/// folds this in, so any header mutation after hashing invalidates the
/// whole stream.
#[derive(Clone, Copy)]
pub(crate) struct HeaderHash(pub(crate) [u8; 64]);

impl std::fmt::Debug for HeaderHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HeaderHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// SHA-512 over one payload block's authenticated input.
#[derive(Clone, Copy)]
pub(crate) struct PayloadHash(pub(crate) [u8; 64]);

/// Hash the msgpack-encoded header bytes.
pub(crate) fn hash_header(header_bytes: &[u8]) -> HeaderHash {
    HeaderHash(Sha512::digest(header_bytes).into())
}

/// Compute the hash a payload block's authenticators commit to.
///
/// `final_flag` is `None` for v1 and `Some(is_final)` for v2, where the
/// flag byte joins the hashed input so finality cannot be stripped.
pub(crate) fn compute_payload_hash(
    header_hash: &HeaderHash,
    nonce: &Nonce,
    final_flag: Option<bool>,
    ciphertext: &[u8],
) -> PayloadHash {
    let mut digest = Sha512::new();
    digest.update(header_hash.0);
    digest.update(nonce.as_array());
    if let Some(is_final) = final_flag {
        digest.update([u8::from(is_final)]);
    }
    digest.update(ciphertext);
    PayloadHash(digest.finalize().into())
}

/// Build the byte string an attached-signature block signs.
///
/// Binds the chunk to the header hash and its sequence number; the first
/// payload block signs seqno 0.
pub(crate) fn attached_signature_input(
    header_hash: &HeaderHash,
    seqno: u64,
    chunk: &[u8],
) -> Vec<u8> {
    let mut digest = Sha512::new();
    digest.update(header_hash.0);
    digest.update(seqno.to_be_bytes());
    digest.update(chunk);

    let mut input = Vec::with_capacity(SIGNATURE_ATTACHED_STRING.len() + 64);
    input.extend_from_slice(SIGNATURE_ATTACHED_STRING);
    input.extend_from_slice(&digest.finalize());
    input
}

/// Build the byte string a detached signature signs.
pub(crate) fn detached_signature_input(header_hash: &HeaderHash, plaintext: &[u8]) -> Vec<u8> {
    let mut digest = Sha512::new();
    digest.update(header_hash.0);
    digest.update(plaintext);
    detached_signature_input_from_hash(&digest.finalize().into())
}

/// As [`detached_signature_input`], from an already-computed digest.
///
/// Streaming signers fold the header hash and plaintext into a running
/// digest instead of buffering the message.
pub(crate) fn detached_signature_input_from_hash(digest: &[u8; 64]) -> Vec<u8> {
    let mut input = Vec::with_capacity(SIGNATURE_DETACHED_STRING.len() + 64);
    input.extend_from_slice(SIGNATURE_DETACHED_STRING);
    input.extend_from_slice(digest);
    input
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_hash_depends_on_every_input() {
        let h = HeaderHash([1u8; 64]);
        let n = Nonce([2u8; 24]);
        let base = compute_payload_hash(&h, &n, None, b"ct");

        assert_ne!(
            base.0,
            compute_payload_hash(&HeaderHash([3u8; 64]), &n, None, b"ct").0
        );
        assert_ne!(
            base.0,
            compute_payload_hash(&h, &Nonce([4u8; 24]), None, b"ct").0
        );
        assert_ne!(base.0, compute_payload_hash(&h, &n, None, b"CT").0);
    }

    #[test]
    fn test_final_flag_byte_changes_hash() {
        let h = HeaderHash([1u8; 64]);
        let n = Nonce([2u8; 24]);
        let plain = compute_payload_hash(&h, &n, None, b"ct");
        let non_final = compute_payload_hash(&h, &n, Some(false), b"ct");
        let final_ = compute_payload_hash(&h, &n, Some(true), b"ct");
        assert_ne!(plain.0, non_final.0);
        assert_ne!(non_final.0, final_.0);
    }

    #[test]
    fn test_attached_input_shape() {
        let h = HeaderHash([0u8; 64]);
        let input = attached_signature_input(&h, 3, b"chunk");
        assert!(input.starts_with(SIGNATURE_ATTACHED_STRING));
        assert_eq!(input.len(), SIGNATURE_ATTACHED_STRING.len() + 64);
        assert_ne!(input, attached_signature_input(&h, 4, b"chunk"));
    }

    #[test]
    fn test_detached_input_matches_streaming_form() {
        let h = HeaderHash([9u8; 64]);
        let one_shot = detached_signature_input(&h, b"hello world");

        let mut digest = Sha512::new();
        digest.update(h.0);
        digest.update(b"hello ");
        digest.update(b"world");
        let streamed = detached_signature_input_from_hash(&digest.finalize().into());

        assert_eq!(one_shot, streamed);
    }
}
