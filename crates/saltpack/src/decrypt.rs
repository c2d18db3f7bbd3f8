//! The decryption decoder: resolve a recipient, then open the block stream.

use std::io;

use serde_bytes::ByteBuf;
use zeroize::{Zeroize, Zeroizing};

use saltpack_crypto::{
    secretbox_open, BoxPublicKey, BoxSecretKey, Keyring, RawBoxKey, SECRETBOX_OVERHEAD,
};

use crate::block::EncryptionBlock;
use crate::chunk_reader::{BlockSource, ChunkReader, SourceStatus};
use crate::error::{Error, Result};
use crate::framing::FramedReader;
use crate::hashes::{compute_payload_hash, hash_header, HeaderHash};
use crate::header::EncryptionHeader;
use crate::macs::{self, MacKey};
use crate::nonce;
use crate::version::{MessageType, Version, VersionValidator};

/// What the header revealed about keys while opening a message.
pub struct MessageKeyInfo {
    /// The sender's long-term public key; for anonymous senders, the
    /// ephemeral key standing in for it.
    pub sender_key: Option<Box<dyn BoxPublicKey>>,
    /// Whether the sender chose to be anonymous.
    pub sender_is_anon: bool,
    /// The receiver secret that opened the message.
    pub receiver_key: Option<Box<dyn BoxSecretKey>>,
    /// Whether we matched an anonymous receiver entry.
    pub receiver_is_anon: bool,
    /// Key ids of all named receiver entries, in header order.
    pub named_receivers: Vec<Vec<u8>>,
    /// How many receiver entries were anonymous.
    pub num_anon_receivers: usize,
}

impl std::fmt::Debug for MessageKeyInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageKeyInfo")
            .field("sender_is_anon", &self.sender_is_anon)
            .field("receiver_is_anon", &self.receiver_is_anon)
            .field("named_receivers", &self.named_receivers.len())
            .field("num_anon_receivers", &self.num_anon_receivers)
            .finish()
    }
}

/// A streaming saltpack decryptor.
///
/// The header is processed at construction; reading yields authenticated
/// plaintext block by block. Every cryptographic failure is fatal and
/// sticky. Plaintext delivered before a post-terminal failure is still
/// delivered: the bytes were authenticated.
pub struct DecryptStream<R: io::Read> {
    inner: ChunkReader<EncryptedBlockSource<R>>,
}

impl<R: io::Read> DecryptStream<R> {
    /// Read and process the header, returning key info and the plaintext
    /// stream.
    pub fn new(
        validator: &dyn VersionValidator,
        reader: R,
        keyring: &dyn Keyring,
    ) -> Result<(MessageKeyInfo, Self)> {
        let mut framed = FramedReader::new(reader);

        let (header_bytes, _) = match framed.read::<ByteBuf>() {
            Err(Error::Framing(_)) => return Err(Error::FailedToReadHeaderBytes),
            other => other?,
        };
        let header_hash = hash_header(&header_bytes);
        let header: EncryptionHeader =
            rmp_serde::from_slice(&header_bytes).map_err(|_| Error::FailedToReadHeaderBytes)?;
        header.validate(validator, MessageType::Encryption)?;
        let version = header.version;

        let ephemeral = keyring
            .import_box_ephemeral(&header.ephemeral)
            .ok_or(Error::BadEphemeralKey)?;

        let (index, secret, receiver_is_anon) =
            resolve_receiver(&header, version, keyring, ephemeral.as_ref())?;

        let payload_key = open_payload_key(&header, version, index, secret.as_ref(), ephemeral.as_ref())?;

        let (sender_public, sender_is_anon) =
            resolve_sender(&header, &payload_key, keyring, ephemeral.as_ref())?;

        let mac_key = macs::mac_key_receiver(
            version,
            index as u64,
            secret.as_ref(),
            sender_public.as_ref(),
            ephemeral.as_ref(),
            &header_hash,
        )?;

        let named_receivers: Vec<Vec<u8>> = header
            .receivers
            .iter()
            .filter(|r| !r.receiver_kid.is_empty())
            .map(|r| r.receiver_kid.to_vec())
            .collect();
        let num_anon_receivers = header.receivers.len() - named_receivers.len();

        let mki = MessageKeyInfo {
            sender_key: Some(sender_public),
            sender_is_anon,
            receiver_key: Some(secret),
            receiver_is_anon,
            named_receivers,
            num_anon_receivers,
        };

        let source = EncryptedBlockSource {
            framed,
            version,
            payload_key,
            mac_key,
            recipient_index: index,
            header_hash,
            next_block: 0,
        };
        Ok((
            mki,
            Self {
                inner: ChunkReader::new(source),
            },
        ))
    }
}

impl<R: io::Read> io::Read for DecryptStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Open `ciphertext` in one call.
pub fn open(
    validator: &dyn VersionValidator,
    ciphertext: &[u8],
    keyring: &dyn Keyring,
) -> Result<(MessageKeyInfo, Vec<u8>)> {
    let (mki, mut stream) = DecryptStream::new(validator, ciphertext, keyring)?;
    let mut plaintext = Vec::new();
    io::Read::read_to_end(&mut stream, &mut plaintext).map_err(Error::from_io)?;
    Ok((mki, plaintext))
}

/// Find the receiver entry we hold a secret for.
///
/// Named entries resolve through the ring's kid lookup; the ring's answer
/// is range-checked before use. If nothing matches and the ring is
/// iterable, every owned secret is tried against every anonymous entry;
/// a failed trial is not an error.
fn resolve_receiver(
    header: &EncryptionHeader,
    version: Version,
    keyring: &dyn Keyring,
    ephemeral: &dyn BoxPublicKey,
) -> Result<(usize, Box<dyn BoxSecretKey>, bool)> {
    let kids: Vec<&[u8]> = header
        .receivers
        .iter()
        .map(|r| r.receiver_kid.as_slice())
        .collect();

    if let Some((index, secret)) = keyring.lookup_box_secret(&kids) {
        if index >= header.receivers.len() {
            return Err(Error::BadLookup);
        }
        return Ok((index, secret, false));
    }

    for secret in keyring.all_box_secrets() {
        let shared = secret.precompute(ephemeral);
        for (i, entry) in header.receivers.iter().enumerate() {
            if !entry.receiver_kid.is_empty() {
                continue;
            }
            let n = nonce::payload_key_box(version, i as u64);
            if shared.open(&n, &entry.payload_key_box).is_ok() {
                return Ok((i, secret, true));
            }
        }
    }

    Err(Error::NoDecryptionKey)
}

fn open_payload_key(
    header: &EncryptionHeader,
    version: Version,
    index: usize,
    secret: &dyn BoxSecretKey,
    ephemeral: &dyn BoxPublicKey,
) -> Result<Zeroizing<[u8; 32]>> {
    let n = nonce::payload_key_box(version, index as u64);
    let mut key_bytes = secret.open_box(ephemeral, &n, &header.receivers[index].payload_key_box)?;
    if key_bytes.len() != 32 {
        key_bytes.zeroize();
        return Err(Error::BadSymmetricKey);
    }
    let mut payload_key = Zeroizing::new([0u8; 32]);
    payload_key.copy_from_slice(&key_bytes);
    key_bytes.zeroize();
    Ok(payload_key)
}

/// Open the sender secretbox and decide anonymity.
///
/// The sender is anonymous exactly when the boxed sender key equals the
/// ephemeral key. Named senders must be recognized by the ring.
fn resolve_sender(
    header: &EncryptionHeader,
    payload_key: &[u8; 32],
    keyring: &dyn Keyring,
    ephemeral: &dyn BoxPublicKey,
) -> Result<(Box<dyn BoxPublicKey>, bool)> {
    let mut sender_bytes = secretbox_open(
        payload_key,
        &nonce::sender_key_secretbox(),
        &header.sender_secretbox,
    )
    .map_err(|_| Error::BadSenderKeySecretbox)?;
    if sender_bytes.len() != 32 {
        sender_bytes.zeroize();
        return Err(Error::BadBoxKey);
    }
    let sender_raw = RawBoxKey::from_slice(&sender_bytes)?;

    if sender_raw.ct_eq(ephemeral.raw()) {
        return Ok((ephemeral.clone_boxed(), true));
    }
    let sender_public = keyring
        .lookup_box_public(&sender_bytes)
        .ok_or(Error::NoSenderKey)?;
    Ok((sender_public, false))
}

/// Reads, authenticates, and decrypts payload blocks for the chunk reader.
struct EncryptedBlockSource<R: io::Read> {
    framed: FramedReader<R>,
    version: Version,
    payload_key: Zeroizing<[u8; 32]>,
    mac_key: MacKey,
    recipient_index: usize,
    header_hash: HeaderHash,
    next_block: u64,
}

impl<R: io::Read> EncryptedBlockSource<R> {
    fn read_block(&mut self) -> Result<(Vec<u8>, bool)> {
        if self.next_block == u64::MAX {
            return Err(Error::PacketOverflow);
        }
        let (block, seqno) = EncryptionBlock::read_from(&mut self.framed, self.version)?;
        let block_number = self.next_block;
        self.next_block += 1;

        if block.payload_ciphertext.len() < SECRETBOX_OVERHEAD {
            return Err(Error::BadCiphertext(seqno));
        }

        let n = nonce::payload_secretbox(block_number);
        let final_flag = (self.version.major >= 2).then_some(block.is_final);
        let payload_hash =
            compute_payload_hash(&self.header_hash, &n, final_flag, &block.payload_ciphertext);
        let ours = macs::compute_authenticator(&self.mac_key, &payload_hash);
        let theirs = block
            .authenticators
            .get(self.recipient_index)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        if !ours.ct_eq_bytes(theirs) {
            return Err(Error::BadTag(seqno));
        }

        let plaintext = secretbox_open(&self.payload_key, &n, &block.payload_ciphertext)
            .map_err(|_| Error::BadCiphertext(seqno))?;

        let is_final = if self.version.major < 2 {
            plaintext.is_empty()
        } else {
            block.is_final
        };
        // Empty plaintext is the one shape reserved for stream termination.
        if plaintext.is_empty() && !is_final {
            return Err(Error::BadCiphertext(seqno));
        }
        Ok((plaintext, is_final))
    }
}

impl<R: io::Read> BlockSource for EncryptedBlockSource<R> {
    fn next_block(&mut self) -> (Vec<u8>, Option<SourceStatus>) {
        match self.read_block() {
            Ok((plaintext, false)) => (plaintext, None),
            Ok((plaintext, true)) => {
                let status = match self.framed.assert_end() {
                    Ok(()) => SourceStatus::Eof,
                    Err(err) => SourceStatus::Failed(err),
                };
                (plaintext, Some(status))
            }
            Err(err) => (Vec::new(), Some(SourceStatus::Failed(err))),
        }
    }
}
