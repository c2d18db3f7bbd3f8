//! XSalsa20-Poly1305 secretbox over a caller-held 32-byte key.
//!
//! Ciphertext layout matches the box layer: encrypted plaintext followed by
//! the 16-byte Poly1305 tag. Empty plaintext therefore seals to exactly
//! [`SECRETBOX_OVERHEAD`] bytes, never zero.

use crypto_secretbox::aead::generic_array::GenericArray;
use crypto_secretbox::aead::{AeadInPlace, KeyInit};
use crypto_secretbox::XSalsa20Poly1305;

use crate::nonce::Nonce;
use crate::{CryptoError, Result};

/// Size of a secretbox key in bytes.
pub const SECRETBOX_KEY_SIZE: usize = 32;

/// Bytes a secretbox adds on top of the plaintext (the Poly1305 tag).
pub const SECRETBOX_OVERHEAD: usize = 16;

/// Seal `plaintext` under `key` and `nonce`.
pub fn secretbox_seal(
    key: &[u8; SECRETBOX_KEY_SIZE],
    nonce: &Nonce,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XSalsa20Poly1305::new(GenericArray::from_slice(key));
    let mut buf = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(nonce.as_array()), &[], &mut buf)
        .map_err(|_| CryptoError::EncryptionFailed)?;
    buf.extend_from_slice(tag.as_slice());
    Ok(buf)
}

/// Open a secretbox sealed with [`secretbox_seal`].
///
/// # Errors
///
/// Returns [`CryptoError::DecryptionFailed`] if the ciphertext is shorter
/// than the overhead or fails authentication.
pub fn secretbox_open(
    key: &[u8; SECRETBOX_KEY_SIZE],
    nonce: &Nonce,
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    if ciphertext.len() < SECRETBOX_OVERHEAD {
        return Err(CryptoError::DecryptionFailed);
    }
    let cipher = XSalsa20Poly1305::new(GenericArray::from_slice(key));
    let (body, tag) = ciphertext.split_at(ciphertext.len() - SECRETBOX_OVERHEAD);
    let mut buf = body.to_vec();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce.as_array()),
            &[],
            &mut buf,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| CryptoError::DecryptionFailed)?;
    Ok(buf)
}
