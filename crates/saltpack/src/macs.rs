//! Per-recipient MAC keys and payload-block authenticators.
//!
//! A MAC key binds a recipient to one exact header: it is derived by boxing
//! 32 zero bytes under a nonce built from the header hash (§ the nonce
//! schedule) and keeping the encrypted-zeros segment. v2 strengthens the
//! binding by folding in a second box under the ephemeral key and the
//! recipient index.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use saltpack_crypto::{BoxPublicKey, BoxSecretKey, Nonce, BOX_OVERHEAD};

use crate::error::Result;
use crate::hashes::{HeaderHash, PayloadHash};
use crate::nonce;
use crate::version::Version;

/// Size of a MAC key in bytes.
pub(crate) const MAC_KEY_SIZE: usize = 32;

/// Size of a truncated HMAC-SHA-512 authenticator in bytes.
pub(crate) const AUTHENTICATOR_SIZE: usize = 32;

/// A per-recipient, per-message HMAC key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct MacKey([u8; MAC_KEY_SIZE]);

/// A truncated HMAC-SHA-512 tag over a payload hash.
#[derive(Clone, Copy)]
pub(crate) struct Authenticator(pub(crate) [u8; AUTHENTICATOR_SIZE]);

impl Authenticator {
    /// Constant-time comparison against wire bytes of any length.
    pub(crate) fn ct_eq_bytes(&self, wire: &[u8]) -> bool {
        wire.len() == AUTHENTICATOR_SIZE && bool::from(self.0.ct_eq(wire))
    }
}

/// Box 32 zero bytes and keep the encrypted-zeros segment as key material.
fn mac_key_single(
    secret: &dyn BoxSecretKey,
    public: &dyn BoxPublicKey,
    nonce: &Nonce,
) -> Result<MacKey> {
    let boxed = secret.seal_box(public, nonce, &[0u8; MAC_KEY_SIZE])?;
    debug_assert_eq!(boxed.len(), MAC_KEY_SIZE + BOX_OVERHEAD);
    let mut key = [0u8; MAC_KEY_SIZE];
    key.copy_from_slice(&boxed[..MAC_KEY_SIZE]);
    Ok(MacKey(key))
}

/// Truncate SHA-512 to 32 bytes.
///
/// Deliberately not SHA-512/256, which has different IVs; the truncation
/// choice is a compatibility invariant shared with the authenticator
/// computation.
fn sum512_truncate256(m1: &MacKey, m2: &MacKey) -> MacKey {
    let mut digest = Sha512::new();
    digest.update(m1.0);
    digest.update(m2.0);
    let full: [u8; 64] = digest.finalize().into();
    let mut out = [0u8; MAC_KEY_SIZE];
    out.copy_from_slice(&full[..MAC_KEY_SIZE]);
    MacKey(out)
}

/// Derive recipient `index`'s MAC key, sender side.
pub(crate) fn mac_key_sender(
    version: Version,
    index: u64,
    secret: &dyn BoxSecretKey,
    ephemeral_secret: &dyn BoxSecretKey,
    recipient: &dyn BoxPublicKey,
    header_hash: &HeaderHash,
) -> Result<MacKey> {
    let nonce = nonce::mac_key_box(version, header_hash, index);
    if version.major < 2 {
        return mac_key_single(secret, recipient, &nonce);
    }
    let m1 = mac_key_single(secret, recipient, &nonce)?;
    let m2 = mac_key_single(ephemeral_secret, recipient, &nonce)?;
    Ok(sum512_truncate256(&m1, &m2))
}

/// Derive this recipient's MAC key, receiver side.
pub(crate) fn mac_key_receiver(
    version: Version,
    index: u64,
    secret: &dyn BoxSecretKey,
    sender: &dyn BoxPublicKey,
    ephemeral: &dyn BoxPublicKey,
    header_hash: &HeaderHash,
) -> Result<MacKey> {
    let nonce = nonce::mac_key_box(version, header_hash, index);
    if version.major < 2 {
        return mac_key_single(secret, sender, &nonce);
    }
    let m1 = mac_key_single(secret, sender, &nonce)?;
    let m2 = mac_key_single(secret, ephemeral, &nonce)?;
    Ok(sum512_truncate256(&m1, &m2))
}

/// Derive every recipient's MAC key at seal time.
pub(crate) fn mac_keys_sender(
    version: Version,
    sender: &dyn BoxSecretKey,
    ephemeral_secret: &dyn BoxSecretKey,
    recipients: &[Box<dyn BoxPublicKey>],
    header_hash: &HeaderHash,
) -> Result<Vec<MacKey>> {
    recipients
        .iter()
        .enumerate()
        .map(|(i, recipient)| {
            mac_key_sender(
                version,
                i as u64,
                sender,
                ephemeral_secret,
                recipient.as_ref(),
                header_hash,
            )
        })
        .collect()
}

/// HMAC-SHA-512 over the payload hash, truncated to 32 bytes.
pub(crate) fn compute_authenticator(mac_key: &MacKey, payload_hash: &PayloadHash) -> Authenticator {
    let mut mac =
        Hmac::<Sha512>::new_from_slice(&mac_key.0).expect("hmac accepts any key length");
    mac.update(&payload_hash.0);
    let full = mac.finalize().into_bytes();
    let mut out = [0u8; AUTHENTICATOR_SIZE];
    out.copy_from_slice(&full[..AUTHENTICATOR_SIZE]);
    Authenticator(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use saltpack_crypto::BoxKeyPair;

    fn pair() -> BoxKeyPair {
        BoxKeyPair::generate(&mut rand::rngs::OsRng).unwrap()
    }

    fn both_sides(version: Version, index: u64) -> (MacKey, MacKey) {
        let sender = pair();
        let ephemeral = pair();
        let recipient = pair();
        let header_hash = HeaderHash([0x5a; 64]);

        let sent = mac_key_sender(
            version,
            index,
            &sender,
            &ephemeral,
            recipient.public_key().as_ref(),
            &header_hash,
        )
        .unwrap();
        let received = mac_key_receiver(
            version,
            index,
            &recipient,
            sender.public_key().as_ref(),
            ephemeral.public_key().as_ref(),
            &header_hash,
        )
        .unwrap();
        (sent, received)
    }

    #[test]
    fn test_sender_and_receiver_agree_v1() {
        let (sent, received) = both_sides(Version::V1, 0);
        assert_eq!(sent.0, received.0);
    }

    #[test]
    fn test_sender_and_receiver_agree_v2() {
        let (sent, received) = both_sides(Version::V2, 4);
        assert_eq!(sent.0, received.0);
    }

    #[test]
    fn test_v2_key_depends_on_recipient_index() {
        let sender = pair();
        let ephemeral = pair();
        let recipient = pair();
        let header_hash = HeaderHash([0x5a; 64]);

        let at = |i| {
            mac_key_sender(
                Version::V2,
                i,
                &sender,
                &ephemeral,
                recipient.public_key().as_ref(),
                &header_hash,
            )
            .unwrap()
        };
        assert_ne!(at(0).0, at(1).0);
    }

    #[test]
    fn test_key_depends_on_header_hash() {
        let sender = pair();
        let ephemeral = pair();
        let recipient = pair();

        let at = |h: HeaderHash| {
            mac_key_sender(
                Version::V1,
                0,
                &sender,
                &ephemeral,
                recipient.public_key().as_ref(),
                &h,
            )
            .unwrap()
        };
        assert_ne!(at(HeaderHash([1; 64])).0, at(HeaderHash([2; 64])).0);
    }

    #[test]
    fn test_authenticator_truncates_and_compares() {
        let key = MacKey([7u8; 32]);
        let hash = PayloadHash([9u8; 64]);
        let auth = compute_authenticator(&key, &hash);

        assert!(auth.ct_eq_bytes(&auth.0));
        assert!(!auth.ct_eq_bytes(&auth.0[..31]));
        let mut flipped = auth.0;
        flipped[2] ^= 1;
        assert!(!auth.ct_eq_bytes(&flipped));
    }

    #[test]
    fn test_authenticator_differs_per_key() {
        let hash = PayloadHash([9u8; 64]);
        let a = compute_authenticator(&MacKey([1u8; 32]), &hash);
        let b = compute_authenticator(&MacKey([2u8; 32]), &hash);
        assert!(!a.ct_eq_bytes(&b.0));
    }
}
