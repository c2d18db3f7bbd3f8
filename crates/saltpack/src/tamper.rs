//! Test-only sealing with corruption hooks.
//!
//! Re-runs the seal pipeline with injection points before hashing and
//! framing, so tests can produce streams that are internally consistent up
//! to exactly one deliberate defect. Receiver order is never shuffled here;
//! tests pin indices.

use rand::rngs::OsRng;
use serde_bytes::ByteBuf;

use saltpack_crypto::{csprng, secretbox_seal, BoxKeyPair, BoxPublicKey, BoxSecretKey, Nonce};

use crate::block::EncryptionBlock;
use crate::encrypt::ENCRYPTION_BLOCK_SIZE;
use crate::error::Result;
use crate::framing::FramedWriter;
use crate::hashes::compute_payload_hash;
use crate::header::{encode_and_hash, EncryptionHeader, ReceiverKeys};
use crate::macs;
use crate::nonce;
use crate::version::Version;

type BlockNumber = u64;

#[derive(Default)]
pub(crate) struct TamperOptions {
    /// Plaintext block size; 0 means the production default.
    pub(crate) block_size: usize,
    /// Mutate the header structure before it is encoded and hashed.
    pub(crate) corrupt_header: Option<Box<dyn Fn(&mut EncryptionHeader)>>,
    /// Mutate the payload key boxed for recipient `i`.
    pub(crate) corrupt_payload_key: Option<Box<dyn Fn(&mut Vec<u8>, usize)>>,
    /// Mutate the sender key bytes before they are secretboxed.
    pub(crate) corrupt_sender_key_plaintext: Option<Box<dyn Fn(&mut Vec<u8>)>>,
    /// Mutate the sender secretbox ciphertext.
    pub(crate) corrupt_sender_key_ciphertext: Option<Box<dyn Fn(&mut Vec<u8>)>>,
    /// Replace the nonce used for payload block `j`.
    pub(crate) payload_nonce: Option<Box<dyn Fn(Nonce, BlockNumber) -> Nonce>>,
    /// Mutate block `j`'s ciphertext before it is hashed and authenticated.
    pub(crate) corrupt_ciphertext_before_hash: Option<Box<dyn Fn(&mut Vec<u8>, BlockNumber)>>,
    /// Mutate the assembled block record (after authenticators).
    pub(crate) corrupt_block: Option<Box<dyn Fn(&mut EncryptionBlock, BlockNumber)>>,
    /// Leave the stream unterminated.
    pub(crate) skip_terminal: bool,
    /// Replace the computed chunking wholesale: `(plaintext, is_final)` per
    /// block, authenticated consistently.
    pub(crate) chunk_plan: Option<Vec<(Vec<u8>, bool)>>,
}

pub(crate) fn tamper_seal(
    version: Version,
    plaintext: &[u8],
    sender: Option<&dyn BoxSecretKey>,
    receivers: &[&dyn BoxPublicKey],
    opts: TamperOptions,
) -> Result<Vec<u8>> {
    let block_size = if opts.block_size == 0 {
        ENCRYPTION_BLOCK_SIZE
    } else {
        opts.block_size
    };

    let mut rng = OsRng;
    let ephemeral = BoxKeyPair::generate(&mut rng)?;
    let mut payload_key = [0u8; 32];
    csprng::random_fill(&mut rng, &mut payload_key)?;
    let sender_key: &dyn BoxSecretKey = sender.unwrap_or(&ephemeral);

    let mut entries = Vec::with_capacity(receivers.len());
    for (i, recipient) in receivers.iter().enumerate() {
        let mut key_plaintext = payload_key.to_vec();
        if let Some(hook) = &opts.corrupt_payload_key {
            hook(&mut key_plaintext, i);
        }
        let n = nonce::payload_key_box(version, i as u64);
        let boxed = ephemeral.seal_box(*recipient, &n, &key_plaintext)?;
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

    let mut sender_key_bytes = sender_key.public_key().raw().0.to_vec();
    if let Some(hook) = &opts.corrupt_sender_key_plaintext {
        hook(&mut sender_key_bytes);
    }
    let mut sender_secretbox = secretbox_seal(
        &payload_key,
        &nonce::sender_key_secretbox(),
        &sender_key_bytes,
    )?;
    if let Some(hook) = &opts.corrupt_sender_key_ciphertext {
        hook(&mut sender_secretbox);
    }

    let mut header = EncryptionHeader::new(
        version,
        ephemeral.public_key().to_kid(),
        sender_secretbox,
        entries,
    );
    if let Some(hook) = &opts.corrupt_header {
        hook(&mut header);
    }
    let (header_bytes, header_hash) = encode_and_hash(&header)?;

    let recipients: Vec<Box<dyn BoxPublicKey>> = receivers.iter().map(|r| r.clone_boxed()).collect();
    let mac_keys =
        macs::mac_keys_sender(version, sender_key, &ephemeral, &recipients, &header_hash)?;

    let mut out = Vec::new();
    let mut framed = FramedWriter::new(&mut out);
    framed.write_record(&ByteBuf::from(header_bytes))?;

    // Chunk exactly like the production encoder: v1 appends an empty
    // terminal block, v2 flags the last block (an empty one when the
    // plaintext ends on a block boundary).
    let chunks: Vec<(Vec<u8>, bool)> = match opts.chunk_plan {
        Some(plan) => plan,
        None => {
            let mut chunks: Vec<(Vec<u8>, bool)> = plaintext
                .chunks(block_size)
                .map(|c| (c.to_vec(), false))
                .collect();
            if version.major < 2 {
                if !opts.skip_terminal {
                    chunks.push((Vec::new(), false));
                }
            } else if opts.skip_terminal {
                // Leave every block unflagged.
            } else if plaintext.len() % block_size == 0 {
                chunks.push((Vec::new(), true));
            } else if let Some(last) = chunks.last_mut() {
                last.1 = true;
            }
            chunks
        }
    };

    for (j, (chunk, is_final)) in chunks.into_iter().enumerate() {
        let j = j as u64;
        let mut n = nonce::payload_secretbox(j);
        if let Some(hook) = &opts.payload_nonce {
            n = hook(n, j);
        }
        let mut ciphertext = secretbox_seal(&payload_key, &n, &chunk)?;
        if let Some(hook) = &opts.corrupt_ciphertext_before_hash {
            hook(&mut ciphertext, j);
        }

        let final_flag = (version.major >= 2).then_some(is_final);
        let payload_hash = compute_payload_hash(&header_hash, &n, final_flag, &ciphertext);
        let authenticators = mac_keys
            .iter()
            .map(|key| macs::compute_authenticator(key, &payload_hash).0.to_vec())
            .collect();

        let mut block = EncryptionBlock {
            authenticators,
            payload_ciphertext: ciphertext,
            is_final,
        };
        if let Some(hook) = &opts.corrupt_block {
            hook(&mut block, j);
        }
        block.write_to(&mut framed, version)?;
    }

    Ok(out)
}
