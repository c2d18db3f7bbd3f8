//! # saltpack-crypto
//!
//! NaCl-class primitive abstractions for the saltpack message format:
//!
//! - **Box keys**: Curve25519 key agreement + XSalsa20-Poly1305, as
//!   capability traits with a `crypto_box`-backed implementation
//! - **Secretbox**: XSalsa20-Poly1305 under a caller-held symmetric key
//! - **Signing keys**: Ed25519 via `ed25519-dalek`
//! - **Keyrings**: lookup capabilities plus an in-memory store
//! - **CSPRNG helpers**: checked fills, bias-free uniform sampling, and the
//!   byte-exact Fisher–Yates shuffle the format's test vectors replay
//!
//! The format layer (`saltpack`) consumes keys exclusively through the
//! traits in this crate, so alternative key backends (hardware, agents) can
//! slot in without touching the wire code.
//!
//! ## Security
//!
//! Secret key material zeroizes on drop. Key-id comparison helpers are
//! constant time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod box_key;
pub mod csprng;
pub mod error;
pub mod keyring;
pub mod nonce;
pub mod secretbox;
pub mod signing;

pub use box_key::{
    box_public_keys_equal, BoxKeyPair, BoxPrecomputedSharedKey, BoxPublic, BoxPublicKey,
    BoxSecretKey, RawBoxKey, BOX_KEY_SIZE, BOX_OVERHEAD,
};
pub use error::{CryptoError, Result};
pub use keyring::{KeyringStore, Keyring, SigKeyring};
pub use nonce::{Nonce, SigNonce, NONCE_SIZE, SIG_NONCE_SIZE};
pub use secretbox::{secretbox_open, secretbox_seal, SECRETBOX_KEY_SIZE, SECRETBOX_OVERHEAD};
pub use signing::{
    signing_public_keys_equal, SigningKeyPair, SigningPublic, SigningPublicKey, SigningSecretKey,
    SIGNATURE_SIZE, SIGNING_KEY_SIZE,
};
