//! Header structures for encryption and signature streams.
//!
//! Headers are doubly framed: the wire carries a msgpack byte string whose
//! payload is the msgpack-encoded header array. The hash of those exact
//! inner bytes anchors every downstream derivation, so headers are encoded
//! once and the bytes reused for hashing and writing.

use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::error::{Error, Result};
use crate::framing::encode_to_bytes;
use crate::hashes::{hash_header, HeaderHash};
use crate::version::{MessageType, Version, VersionValidator};

/// The literal format name carried in every header.
pub const FORMAT_NAME: &str = "saltpack";

/// One recipient entry: an optional key id and the recipient's copy of the
/// payload key.
#[derive(Clone, Serialize, Deserialize)]
pub(crate) struct ReceiverKeys {
    /// The recipient's key id; empty for anonymous recipients.
    pub(crate) receiver_kid: ByteBuf,
    /// The payload key boxed from the ephemeral key to this recipient.
    pub(crate) payload_key_box: ByteBuf,
}

/// The encryption-mode header array.
#[derive(Clone, Serialize, Deserialize)]
pub(crate) struct EncryptionHeader {
    pub(crate) format_name: String,
    pub(crate) version: Version,
    pub(crate) typ: i64,
    pub(crate) ephemeral: ByteBuf,
    pub(crate) sender_secretbox: ByteBuf,
    pub(crate) receivers: Vec<ReceiverKeys>,
}

impl EncryptionHeader {
    pub(crate) fn new(
        version: Version,
        ephemeral: Vec<u8>,
        sender_secretbox: Vec<u8>,
        receivers: Vec<ReceiverKeys>,
    ) -> Self {
        Self {
            format_name: FORMAT_NAME.to_string(),
            version,
            typ: MessageType::Encryption.code(),
            ephemeral: ByteBuf::from(ephemeral),
            sender_secretbox: ByteBuf::from(sender_secretbox),
            receivers,
        }
    }

    pub(crate) fn validate(
        &self,
        validator: &dyn VersionValidator,
        wanted: MessageType,
    ) -> Result<()> {
        validate_common(&self.format_name, self.version, self.typ, validator, wanted)
    }
}

/// The signature-mode header array, shared by attached and detached modes.
#[derive(Clone, Serialize, Deserialize)]
pub(crate) struct SignatureHeader {
    pub(crate) format_name: String,
    pub(crate) version: Version,
    pub(crate) typ: i64,
    pub(crate) sender_public: ByteBuf,
    pub(crate) nonce: ByteBuf,
}

impl SignatureHeader {
    pub(crate) fn new(
        version: Version,
        typ: MessageType,
        sender_public: Vec<u8>,
        nonce: [u8; 16],
    ) -> Self {
        Self {
            format_name: FORMAT_NAME.to_string(),
            version,
            typ: typ.code(),
            sender_public: ByteBuf::from(sender_public),
            nonce: ByteBuf::from(nonce.to_vec()),
        }
    }

    pub(crate) fn validate(
        &self,
        validator: &dyn VersionValidator,
        wanted: MessageType,
    ) -> Result<()> {
        validate_common(&self.format_name, self.version, self.typ, validator, wanted)
    }
}

fn validate_common(
    format_name: &str,
    version: Version,
    typ: i64,
    validator: &dyn VersionValidator,
    wanted: MessageType,
) -> Result<()> {
    if format_name != FORMAT_NAME {
        return Err(Error::Framing(format!(
            "unexpected format name {format_name:?}"
        )));
    }
    validator.validate(version)?;
    if typ != wanted.code() {
        return Err(Error::WrongMessageType {
            wanted,
            received: typ,
        });
    }
    Ok(())
}

/// Encode a header to its exact wire bytes and hash them.
pub(crate) fn encode_and_hash<T: Serialize>(header: &T) -> Result<(Vec<u8>, HeaderHash)> {
    let bytes = encode_to_bytes(header)?;
    let hash = hash_header(&bytes);
    Ok((bytes, hash))
}
