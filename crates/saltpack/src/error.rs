//! The failure taxonomy for sealing, opening, signing, and verifying.

use std::sync::Arc;

use thiserror::Error;

use saltpack_crypto::CryptoError;

use crate::version::{MessageType, Version};

/// Errors produced by the format layer.
///
/// Block-indexed variants carry the wire record number of the offending
/// packet: the header is record 0, the first payload block record 1.
///
/// The type is `Clone` because a terminated stream stores its status and
/// surfaces it on every subsequent read; I/O causes are shared behind an
/// [`Arc`] to keep that possible.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The header version was not accepted by the validator.
    #[error("bad version {observed}")]
    BadVersion {
        /// The version observed on the wire.
        observed: Version,
    },

    /// The header type tag did not match the expected mode.
    #[error("wrong message type: wanted {wanted}, received {received}")]
    WrongMessageType {
        /// The type the decoder was opened for.
        wanted: MessageType,
        /// The raw tag found in the header.
        received: i64,
    },

    /// The top-level header record was not a byte string, or its contents
    /// did not decode to a header.
    #[error("failed to read header bytes")]
    FailedToReadHeaderBytes,

    /// The ephemeral public key had the wrong length.
    #[error("bad ephemeral key")]
    BadEphemeralKey,

    /// No recipient entry could be resolved against the keyring.
    #[error("no decryption key found for message")]
    NoDecryptionKey,

    /// The sender's key is not recognized by the keyring.
    #[error("no sender key found for message")]
    NoSenderKey,

    /// The decrypted payload key was not 32 bytes.
    #[error("bad symmetric key")]
    BadSymmetricKey,

    /// The decrypted sender key was not 32 bytes.
    #[error("bad box key")]
    BadBoxKey,

    /// The sender secretbox failed authentication.
    #[error("bad sender key secretbox")]
    BadSenderKeySecretbox,

    /// The per-recipient authenticator on a payload block did not match.
    #[error("bad authentication tag in packet {0}")]
    BadTag(u64),

    /// A payload secretbox failed to open.
    #[error("bad ciphertext in packet {0}")]
    BadCiphertext(u64),

    /// A block signature failed to verify.
    #[error("bad signature")]
    BadSignature,

    /// Records continued past the terminal block.
    #[error("trailing garbage after end of message")]
    TrailingGarbage,

    /// The receiver list contained the same key twice.
    #[error("repeated receiver key")]
    RepeatedKey,

    /// The receiver list was unusable (e.g. empty).
    #[error("no receiver keys provided")]
    BadReceivers,

    /// The keyring returned an index outside the receiver list.
    #[error("keyring returned a bad key index")]
    BadLookup,

    /// The block counter saturated.
    #[error("packet number overflow")]
    PacketOverflow,

    /// The stream ended inside a message.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// A caller-supplied parameter was unusable.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A record was malformed at the msgpack layer.
    #[error("framing error: {0}")]
    Framing(String),

    /// An I/O error from the underlying reader or writer.
    #[error("{0}")]
    Io(Arc<std::io::Error>),

    /// A primitive-layer failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Result type for format operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::UnexpectedEof => std::io::ErrorKind::UnexpectedEof,
            Error::Io(inner) => inner.kind(),
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

impl Error {
    /// Recover a format error that round-tripped through [`std::io::Error`].
    ///
    /// Streams implement [`std::io::Read`]/[`std::io::Write`], which forces
    /// errors through the io type; the one-shot entry points unwrap them
    /// back here.
    pub(crate) fn from_io(err: std::io::Error) -> Error {
        if err.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            match err.into_inner() {
                Some(inner) => match inner.downcast::<Error>() {
                    Ok(e) => *e,
                    Err(_) => unreachable!("checked downcast"),
                },
                None => unreachable!("checked get_ref"),
            }
        } else {
            Error::Io(Arc::new(err))
        }
    }
}
