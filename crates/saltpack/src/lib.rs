//! # saltpack
//!
//! A streaming implementation of the saltpack message format: multi-receiver
//! authenticated encryption and message signing over NaCl-class primitives,
//! framed as MessagePack records.
//!
//! Two wire majors coexist. Version 1 marks end-of-stream with an empty
//! terminal block; version 2 carries an explicit final flag on every block
//! and mixes recipient indices into its key derivations. Both are produced
//! and consumed here; a [`VersionValidator`] decides what a decoder accepts.
//!
//! ## Modes
//!
//! - **Encryption**: [`seal`] / [`open`], streaming via [`EncryptStream`]
//!   and [`DecryptStream`]. Each payload block is secretbox-encrypted under
//!   a random payload key and carries one truncated-HMAC authenticator per
//!   receiver, bound to the header hash and block index.
//! - **Attached signing**: [`sign`] / [`verify`], streaming via
//!   [`SignStream`] and [`VerifyStream`]. Chunks travel with Ed25519
//!   signatures bound to the header hash and sequence number.
//! - **Detached signing**: [`sign_detached`] / [`verify_detached`]: one
//!   signature over a digest of the whole message.
//!
//! Key material arrives through the capability traits of
//! [`saltpack_crypto`]; no key management happens here.
//!
//! ## Example
//!
//! ```
//! use saltpack::{open, seal, SingleVersionValidator, Version};
//! use saltpack_crypto::{BoxKeyPair, BoxSecretKey, KeyringStore};
//!
//! let mut rng = rand::rngs::OsRng;
//! let sender = BoxKeyPair::generate(&mut rng)?;
//! let receiver = BoxKeyPair::generate(&mut rng)?;
//! let mut ring = KeyringStore::new();
//! ring.insert_box_key(&receiver);
//!
//! let receiver_public = receiver.public_key();
//! let wire = seal(
//!     Version::V2,
//!     b"attack at dawn",
//!     Some(&sender),
//!     &[receiver_public.as_ref()],
//! )?;
//!
//! let (info, plaintext) = open(&SingleVersionValidator::new(Version::V2), &wire, &ring)?;
//! assert_eq!(plaintext, b"attack at dawn");
//! assert!(!info.sender_is_anon);
//! # Ok::<(), saltpack::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod block;
mod chunk_reader;
mod decrypt;
mod encrypt;
mod error;
mod framing;
mod hashes;
mod header;
mod macs;
mod nonce;
mod sign;
mod verify;
mod version;

#[cfg(test)]
mod proptests;
#[cfg(test)]
mod tamper;

pub use decrypt::{open, DecryptStream, MessageKeyInfo};
pub use encrypt::{seal, EncryptStream, ENCRYPTION_BLOCK_SIZE};
pub use error::{Error, Result};
pub use header::FORMAT_NAME;
pub use sign::{
    sign, sign_detached, DetachedSignStream, SignStream, SIGNATURE_BLOCK_SIZE,
};
pub use verify::{verify, verify_detached, VerifyStream};
pub use version::{
    KnownVersionValidator, MessageType, SingleVersionValidator, Version, VersionValidator,
};

// The primitive layer is part of the public contract: callers hand us its
// keys and rings.
pub use saltpack_crypto;
