//! Attached and detached signing streams.

use std::io;

use rand::rngs::OsRng;
use serde_bytes::ByteBuf;
use sha2::{Digest, Sha512};

use saltpack_crypto::{SigNonce, SigningSecretKey};

use crate::block::SignatureBlock;
use crate::error::{Error, Result};
use crate::framing::FramedWriter;
use crate::hashes::{
    attached_signature_input, detached_signature_input_from_hash, HeaderHash,
};
use crate::header::{encode_and_hash, SignatureHeader};
use crate::version::{MessageType, Version};

/// Default signature chunk size: 1 MiB.
pub const SIGNATURE_BLOCK_SIZE: usize = 1 << 20;

/// A streaming attached signer: plaintext in, interleaved
/// chunk-and-signature records out.
///
/// Each chunk is signed over an input that binds it to the header hash and
/// its sequence number, so blocks cannot be dropped, duplicated, or
/// reordered without breaking verification.
pub struct SignStream<'a, W: io::Write> {
    framed: FramedWriter<W>,
    version: Version,
    block_size: usize,
    header_hash: HeaderHash,
    signer: &'a dyn SigningSecretKey,
    buffer: Vec<u8>,
    seqno: u64,
}

impl<'a, W: io::Write> SignStream<'a, W> {
    /// Start an attached-signature stream.
    pub fn new(version: Version, writer: W, signer: &'a dyn SigningSecretKey) -> Result<Self> {
        Self::with_block_size(version, writer, signer, SIGNATURE_BLOCK_SIZE)
    }

    pub(crate) fn with_block_size(
        version: Version,
        writer: W,
        signer: &'a dyn SigningSecretKey,
        block_size: usize,
    ) -> Result<Self> {
        if !version.is_known_major() {
            return Err(Error::BadVersion { observed: version });
        }
        if block_size == 0 {
            return Err(Error::InvalidParameter(
                "block size must be positive".to_string(),
            ));
        }

        let (header_bytes, header_hash) =
            signature_header(version, signer, MessageType::AttachedSignature)?;
        let mut framed = FramedWriter::new(writer);
        framed.write_record(&ByteBuf::from(header_bytes))?;

        Ok(Self {
            framed,
            version,
            block_size,
            header_hash,
            signer,
            buffer: Vec::new(),
            seqno: 0,
        })
    }

    pub(crate) fn feed(&mut self, data: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(data);
        while self.buffer.len() >= self.block_size {
            let chunk: Vec<u8> = self.buffer.drain(..self.block_size).collect();
            self.sign_block(&chunk, false)?;
        }
        Ok(())
    }

    /// Emit the terminal block and flush.
    ///
    /// v1 terminates with an empty chunk; v2 flags the last block.
    pub fn close(mut self) -> Result<()> {
        if self.version.major < 2 {
            if !self.buffer.is_empty() {
                let chunk = std::mem::take(&mut self.buffer);
                self.sign_block(&chunk, false)?;
            }
            self.sign_block(&[], false)?;
        } else {
            let chunk = std::mem::take(&mut self.buffer);
            self.sign_block(&chunk, true)?;
        }
        self.framed.flush()
    }

    fn sign_block(&mut self, chunk: &[u8], is_final: bool) -> Result<()> {
        if self.seqno == u64::MAX {
            return Err(Error::PacketOverflow);
        }
        let input = attached_signature_input(&self.header_hash, self.seqno, chunk);
        let signature = self.signer.sign(&input)?;

        SignatureBlock {
            payload_chunk: chunk.to_vec(),
            signature: signature.to_vec(),
            is_final,
        }
        .write_to(&mut self.framed, self.version)?;
        self.seqno += 1;
        Ok(())
    }
}

impl<W: io::Write> io::Write for SignStream<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.feed(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.framed.flush()?;
        Ok(())
    }
}

/// A streaming detached signer: the message is digested on the fly and one
/// signature record follows the header.
pub struct DetachedSignStream<'a, W: io::Write> {
    framed: FramedWriter<W>,
    signer: &'a dyn SigningSecretKey,
    hasher: Sha512,
}

impl<'a, W: io::Write> DetachedSignStream<'a, W> {
    /// Start a detached-signature stream.
    pub fn new(version: Version, writer: W, signer: &'a dyn SigningSecretKey) -> Result<Self> {
        if !version.is_known_major() {
            return Err(Error::BadVersion { observed: version });
        }
        let (header_bytes, header_hash) =
            signature_header(version, signer, MessageType::DetachedSignature)?;
        let mut framed = FramedWriter::new(writer);
        framed.write_record(&ByteBuf::from(header_bytes))?;

        // The digest starts with the header hash; writes push message
        // bytes after it.
        let mut hasher = Sha512::new();
        hasher.update(header_hash.0);

        Ok(Self {
            framed,
            signer,
            hasher,
        })
    }

    pub(crate) fn feed(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Sign the digest and emit the signature record.
    pub fn close(mut self) -> Result<()> {
        let digest: [u8; 64] = self.hasher.finalize().into();
        let input = detached_signature_input_from_hash(&digest);
        let signature = self.signer.sign(&input)?;
        self.framed.write_record(&ByteBuf::from(signature.to_vec()))?;
        self.framed.flush()
    }
}

impl<W: io::Write> io::Write for DetachedSignStream<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.feed(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.framed.flush()?;
        Ok(())
    }
}

fn signature_header(
    version: Version,
    signer: &dyn SigningSecretKey,
    typ: MessageType,
) -> Result<(Vec<u8>, HeaderHash)> {
    let nonce = SigNonce::generate(&mut OsRng)?;
    let header = SignatureHeader::new(
        version,
        typ,
        signer.public_key().to_kid(),
        *nonce.as_array(),
    );
    encode_and_hash(&header)
}

/// Sign `message` into an attached stream in one call.
pub fn sign(version: Version, message: &[u8], signer: &dyn SigningSecretKey) -> Result<Vec<u8>> {
    sign_with_block_size(version, message, signer, SIGNATURE_BLOCK_SIZE)
}

pub(crate) fn sign_with_block_size(
    version: Version,
    message: &[u8],
    signer: &dyn SigningSecretKey,
    block_size: usize,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut stream = SignStream::with_block_size(version, &mut out, signer, block_size)?;
    stream.feed(message)?;
    stream.close()?;
    Ok(out)
}

/// Produce a detached signature over `message` in one call.
pub fn sign_detached(
    version: Version,
    message: &[u8],
    signer: &dyn SigningSecretKey,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut stream = DetachedSignStream::new(version, &mut out, signer)?;
    stream.feed(message);
    stream.close()?;
    Ok(out)
}
