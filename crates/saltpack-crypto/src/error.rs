//! Error types for primitive operations.

use thiserror::Error;

/// Errors that can occur inside the primitive layer.
///
/// These are deliberately coarse: a failed box or secretbox open carries no
/// detail beyond the fact that authentication failed, so that callers cannot
/// accidentally build a decryption oracle out of error messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Public-key decryption failed (wrong key or tampered ciphertext).
    #[error("public key decryption failed")]
    DecryptionFailed,

    /// Encryption failed. Only reachable with degenerate inputs (e.g. a
    /// plaintext too large for the cipher's counter).
    #[error("encryption failed")]
    EncryptionFailed,

    /// Signature verification failed.
    #[error("bad signature")]
    BadSignature,

    /// Key bytes were the right length but do not form a valid key.
    #[error("malformed key")]
    MalformedKey,

    /// Key or nonce material had the wrong length.
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// The CSPRNG returned fewer bytes than requested.
    #[error("insufficient randomness")]
    InsufficientRandomness,
}

/// Result type for primitive operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
