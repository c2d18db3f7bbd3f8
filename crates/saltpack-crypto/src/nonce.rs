//! Fixed-size nonce types.

use rand_core::CryptoRngCore;

use crate::csprng;
use crate::{CryptoError, Result};

/// Size of a NaCl-style nonce in bytes.
pub const NONCE_SIZE: usize = 24;

/// Size of a signature-header nonce in bytes.
pub const SIG_NONCE_SIZE: usize = 16;

/// A 24-byte NaCl-style nonce.
///
/// Some bytes may be counter values and some may be label or hash material;
/// the schedule that fills them in belongs to the format layer. Nonces are
/// public values and need no special hygiene.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Create a nonce from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 24 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != NONCE_SIZE {
            return Err(CryptoError::InvalidLength {
                expected: NONCE_SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; NONCE_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Get the nonce bytes.
    pub fn as_array(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Nonce({})", hex::encode(self.0))
    }
}

/// A 16-byte random nonce carried in signature headers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SigNonce(pub [u8; SIG_NONCE_SIZE]);

impl SigNonce {
    /// Generate a fresh random signature nonce.
    pub fn generate<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Result<Self> {
        let mut arr = [0u8; SIG_NONCE_SIZE];
        csprng::random_fill(rng, &mut arr)?;
        Ok(Self(arr))
    }

    /// Get the nonce bytes.
    pub fn as_array(&self) -> &[u8; SIG_NONCE_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SigNonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigNonce({})", hex::encode(self.0))
    }
}
