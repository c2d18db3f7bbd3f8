//! The encryption encoder: seal a plaintext stream for a set of receivers.

use std::collections::HashSet;
use std::io;

use rand::rngs::OsRng;
use serde_bytes::ByteBuf;
use zeroize::Zeroizing;

use saltpack_crypto::{csprng, secretbox_seal, BoxKeyPair, BoxPublicKey, BoxSecretKey};

use crate::block::EncryptionBlock;
use crate::error::{Error, Result};
use crate::framing::FramedWriter;
use crate::hashes::{compute_payload_hash, HeaderHash};
use crate::header::{encode_and_hash, EncryptionHeader, ReceiverKeys};
use crate::macs::{self, MacKey};
use crate::nonce;
use crate::version::Version;

/// Default plaintext block size: 1 MiB.
pub const ENCRYPTION_BLOCK_SIZE: usize = 1 << 20;

/// Seal-time knobs. Public sealing always uses the defaults; tests shrink
/// the block size and pin the receiver order.
pub(crate) struct SealOptions {
    pub(crate) block_size: usize,
    pub(crate) shuffle: bool,
}

impl Default for SealOptions {
    fn default() -> Self {
        Self {
            block_size: ENCRYPTION_BLOCK_SIZE,
            shuffle: true,
        }
    }
}

/// A streaming saltpack encryptor.
///
/// Created with the full receiver set, writes the header eagerly, buffers
/// plaintext into fixed-size blocks, and emits the terminal block on
/// [`close`](Self::close). Dropping the stream without closing it leaves
/// the message unterminated; receivers will report it truncated.
pub struct EncryptStream<W: io::Write> {
    framed: FramedWriter<W>,
    version: Version,
    block_size: usize,
    payload_key: Zeroizing<[u8; 32]>,
    mac_keys: Vec<MacKey>,
    header_hash: HeaderHash,
    buffer: Vec<u8>,
    next_block: u64,
}

impl<W: io::Write> EncryptStream<W> {
    /// Start a stream sealed to `receivers`.
    ///
    /// `sender` is the long-term sender key; `None` sends anonymously (the
    /// ephemeral key stands in as the sender). The receiver list is
    /// shuffled before it is written, so header order reveals nothing.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::BadReceivers`] on an empty receiver list and
    /// [`Error::RepeatedKey`] on duplicates.
    pub fn new(
        version: Version,
        writer: W,
        sender: Option<&dyn BoxSecretKey>,
        receivers: &[&dyn BoxPublicKey],
    ) -> Result<Self> {
        Self::with_options(version, writer, sender, receivers, SealOptions::default())
    }

    pub(crate) fn with_options(
        version: Version,
        writer: W,
        sender: Option<&dyn BoxSecretKey>,
        receivers: &[&dyn BoxPublicKey],
        opts: SealOptions,
    ) -> Result<Self> {
        if !version.is_known_major() {
            return Err(Error::BadVersion { observed: version });
        }
        if opts.block_size == 0 {
            return Err(Error::InvalidParameter(
                "block size must be positive".to_string(),
            ));
        }
        check_receivers(receivers)?;

        let mut rng = OsRng;
        let ephemeral = BoxKeyPair::generate(&mut rng)?;
        let mut payload_key = Zeroizing::new([0u8; 32]);
        csprng::random_fill(&mut rng, payload_key.as_mut())?;

        let mut recipients: Vec<Box<dyn BoxPublicKey>> =
            receivers.iter().map(|r| r.clone_boxed()).collect();
        if opts.shuffle {
            csprng::shuffle(&mut rng, &mut recipients)?;
        }

        // Anonymous senders use the ephemeral key as their long-term key.
        let sender_key: &dyn BoxSecretKey = sender.unwrap_or(&ephemeral);

        let mut entries = Vec::with_capacity(recipients.len());
        for (i, recipient) in recipients.iter().enumerate() {
            let n = nonce::payload_key_box(version, i as u64);
            let boxed = ephemeral.seal_box(recipient.as_ref(), &n, &*payload_key)?;
            let kid = if recipient.hide_identity() {
                Vec::new()
            } else {
                recipient.to_kid()
            };
            entries.push(ReceiverKeys {
                receiver_kid: ByteBuf::from(kid),
                payload_key_box: ByteBuf::from(boxed),
            });
        }

        let sender_public = sender_key.public_key();
        let sender_secretbox = secretbox_seal(
            &payload_key,
            &nonce::sender_key_secretbox(),
            &sender_public.raw().0,
        )?;

        let header = EncryptionHeader::new(
            version,
            ephemeral.public_key().to_kid(),
            sender_secretbox,
            entries,
        );
        let (header_bytes, header_hash) = encode_and_hash(&header)?;
        let mac_keys =
            macs::mac_keys_sender(version, sender_key, &ephemeral, &recipients, &header_hash)?;

        let mut framed = FramedWriter::new(writer);
        framed.write_record(&ByteBuf::from(header_bytes))?;

        Ok(Self {
            framed,
            version,
            block_size: opts.block_size,
            payload_key,
            mac_keys,
            header_hash,
            buffer: Vec::new(),
            next_block: 0,
        })
    }

    /// Buffer plaintext, emitting every completed block.
    pub(crate) fn feed(&mut self, data: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(data);
        while self.buffer.len() >= self.block_size {
            let chunk: Vec<u8> = self.buffer.drain(..self.block_size).collect();
            self.emit_block(&chunk, false)?;
        }
        Ok(())
    }

    /// Emit the terminal block and flush the underlying writer.
    ///
    /// v1 appends an empty block; v2 flags the last block, empty when the
    /// plaintext ended exactly on a block boundary. An empty message is one
    /// terminal block either way.
    pub fn close(mut self) -> Result<()> {
        if self.version.major < 2 {
            if !self.buffer.is_empty() {
                let chunk = std::mem::take(&mut self.buffer);
                self.emit_block(&chunk, false)?;
            }
            self.emit_block(&[], false)?;
        } else {
            let chunk = std::mem::take(&mut self.buffer);
            self.emit_block(&chunk, true)?;
        }
        self.framed.flush()
    }

    fn emit_block(&mut self, plaintext: &[u8], is_final: bool) -> Result<()> {
        if self.next_block == u64::MAX {
            return Err(Error::PacketOverflow);
        }
        let n = nonce::payload_secretbox(self.next_block);
        let ciphertext = secretbox_seal(&self.payload_key, &n, plaintext)?;

        let final_flag = (self.version.major >= 2).then_some(is_final);
        let payload_hash = compute_payload_hash(&self.header_hash, &n, final_flag, &ciphertext);
        let authenticators = self
            .mac_keys
            .iter()
            .map(|key| macs::compute_authenticator(key, &payload_hash).0.to_vec())
            .collect();

        EncryptionBlock {
            authenticators,
            payload_ciphertext: ciphertext,
            is_final,
        }
        .write_to(&mut self.framed, self.version)?;
        self.next_block += 1;
        Ok(())
    }
}

impl<W: io::Write> io::Write for EncryptStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.feed(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.framed.flush()?;
        Ok(())
    }
}

fn check_receivers(receivers: &[&dyn BoxPublicKey]) -> Result<()> {
    if receivers.is_empty() {
        return Err(Error::BadReceivers);
    }
    let mut seen = HashSet::with_capacity(receivers.len());
    for receiver in receivers {
        if !seen.insert(receiver.to_kid()) {
            return Err(Error::RepeatedKey);
        }
    }
    Ok(())
}

/// Seal `plaintext` in one call.
pub fn seal(
    version: Version,
    plaintext: &[u8],
    sender: Option<&dyn BoxSecretKey>,
    receivers: &[&dyn BoxPublicKey],
) -> Result<Vec<u8>> {
    seal_with(version, plaintext, sender, receivers, SealOptions::default())
}

pub(crate) fn seal_with(
    version: Version,
    plaintext: &[u8],
    sender: Option<&dyn BoxSecretKey>,
    receivers: &[&dyn BoxPublicKey],
    opts: SealOptions,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut stream = EncryptStream::with_options(version, &mut out, sender, receivers, opts)?;
    stream.feed(plaintext)?;
    stream.close()?;
    Ok(out)
}
