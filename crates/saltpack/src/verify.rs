//! Attached and detached signature verification.

use std::io;

use serde_bytes::ByteBuf;

use saltpack_crypto::{CryptoError, SigKeyring, SigningPublicKey};

use crate::block::SignatureBlock;
use crate::chunk_reader::{BlockSource, ChunkReader, SourceStatus};
use crate::error::{Error, Result};
use crate::framing::FramedReader;
use crate::hashes::{
    attached_signature_input, detached_signature_input, hash_header, HeaderHash,
};
use crate::header::SignatureHeader;
use crate::version::{MessageType, Version, VersionValidator};

/// A streaming attached-signature verifier.
///
/// The header is processed at construction; reading yields verified
/// plaintext chunk by chunk. A signature failure on any block is fatal and
/// the stream discards the offending chunk.
pub struct VerifyStream<R: io::Read> {
    inner: ChunkReader<SignedBlockSource<R>>,
}

impl<R: io::Read> VerifyStream<R> {
    /// Read and validate the header, returning the signer's key and the
    /// plaintext stream.
    pub fn new(
        validator: &dyn VersionValidator,
        reader: R,
        keyring: &dyn SigKeyring,
    ) -> Result<(Box<dyn SigningPublicKey>, Self)> {
        let mut framed = FramedReader::new(reader);
        let (header, header_hash) =
            read_signature_header(&mut framed, validator, MessageType::AttachedSignature)?;

        let public_key = keyring
            .lookup_signing_public(&header.sender_public)
            .ok_or(Error::NoSenderKey)?;

        let source = SignedBlockSource {
            framed,
            version: header.version,
            header_hash,
            public_key: public_key.clone_boxed(),
            seqno: 0,
        };
        Ok((
            public_key,
            Self {
                inner: ChunkReader::new(source),
            },
        ))
    }
}

impl<R: io::Read> io::Read for VerifyStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Verify an attached signed message in one call.
pub fn verify(
    validator: &dyn VersionValidator,
    signed_message: &[u8],
    keyring: &dyn SigKeyring,
) -> Result<(Box<dyn SigningPublicKey>, Vec<u8>)> {
    let (public_key, mut stream) = VerifyStream::new(validator, signed_message, keyring)?;
    let mut message = Vec::new();
    io::Read::read_to_end(&mut stream, &mut message).map_err(Error::from_io)?;
    Ok((public_key, message))
}

/// Verify a detached signature over `message` in one call.
///
/// `signature` is the detached stream produced by
/// [`sign_detached`](crate::sign_detached): a signature header followed by
/// one signature record.
pub fn verify_detached(
    validator: &dyn VersionValidator,
    message: &[u8],
    signature: &[u8],
    keyring: &dyn SigKeyring,
) -> Result<Box<dyn SigningPublicKey>> {
    let mut framed = FramedReader::new(signature);
    let (header, header_hash) =
        read_signature_header(&mut framed, validator, MessageType::DetachedSignature)?;

    let public_key = keyring
        .lookup_signing_public(&header.sender_public)
        .ok_or(Error::NoSenderKey)?;

    let (signature_bytes, _) = framed.read::<ByteBuf>()?;
    framed.assert_end()?;

    let input = detached_signature_input(&header_hash, message);
    public_key
        .verify(&input, &signature_bytes)
        .map_err(map_signature_err)?;
    Ok(public_key)
}

fn read_signature_header<R: io::Read>(
    framed: &mut FramedReader<R>,
    validator: &dyn VersionValidator,
    wanted: MessageType,
) -> Result<(SignatureHeader, HeaderHash)> {
    let (header_bytes, _) = match framed.read::<ByteBuf>() {
        Err(Error::Framing(_)) => return Err(Error::FailedToReadHeaderBytes),
        other => other?,
    };
    let header_hash = hash_header(&header_bytes);
    let header: SignatureHeader =
        rmp_serde::from_slice(&header_bytes).map_err(|_| Error::FailedToReadHeaderBytes)?;
    header.validate(validator, wanted)?;
    Ok((header, header_hash))
}

fn map_signature_err(err: CryptoError) -> Error {
    match err {
        CryptoError::BadSignature => Error::BadSignature,
        other => Error::Crypto(other),
    }
}

/// Reads and verifies signature blocks for the chunk reader.
struct SignedBlockSource<R: io::Read> {
    framed: FramedReader<R>,
    version: Version,
    header_hash: HeaderHash,
    public_key: Box<dyn SigningPublicKey>,
    seqno: u64,
}

impl<R: io::Read> SignedBlockSource<R> {
    fn read_block(&mut self) -> Result<(Vec<u8>, bool)> {
        if self.seqno == u64::MAX {
            return Err(Error::PacketOverflow);
        }
        let (block, _) = SignatureBlock::read_from(&mut self.framed, self.version)?;
        // Signing seqnos come from block order, not the wire.
        let seqno = self.seqno;
        self.seqno += 1;

        let input = attached_signature_input(&self.header_hash, seqno, &block.payload_chunk);
        self.public_key
            .verify(&input, &block.signature)
            .map_err(map_signature_err)?;

        let is_final = if self.version.major < 2 {
            block.payload_chunk.is_empty()
        } else {
            block.is_final
        };
        if block.payload_chunk.is_empty() && !is_final {
            return Err(Error::Framing(
                "empty payload chunk without final flag".to_string(),
            ));
        }
        Ok((block.payload_chunk, is_final))
    }
}

impl<R: io::Read> BlockSource for SignedBlockSource<R> {
    fn next_block(&mut self) -> (Vec<u8>, Option<SourceStatus>) {
        match self.read_block() {
            Ok((chunk, false)) => (chunk, None),
            Ok((chunk, true)) => {
                let status = match self.framed.assert_end() {
                    Ok(()) => SourceStatus::Eof,
                    Err(err) => SourceStatus::Failed(err),
                };
                (chunk, Some(status))
            }
            Err(err) => (Vec::new(), Some(SourceStatus::Failed(err))),
        }
    }
}
