//! Payload and signature block records, in both wire framings.
//!
//! The two majors differ only in finality encoding: v1 blocks have no flag
//! (an empty terminal block closes the stream), v2 blocks prepend an
//! explicit final flag. Everything version-dependent about block framing is
//! confined to this module; the encoder and decoder pick a shape once, at
//! construction or header parse.

use std::io;

use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::error::Result;
use crate::framing::{FramedReader, FramedWriter};
use crate::version::Version;

#[derive(Serialize, Deserialize)]
struct EncryptionBlockV1 {
    authenticators: Vec<ByteBuf>,
    payload_ciphertext: ByteBuf,
}

#[derive(Serialize, Deserialize)]
struct EncryptionBlockV2 {
    is_final: bool,
    authenticators: Vec<ByteBuf>,
    payload_ciphertext: ByteBuf,
}

/// A decoded (or to-be-encoded) encryption payload block.
pub(crate) struct EncryptionBlock {
    /// One truncated HMAC per recipient, in header order.
    pub(crate) authenticators: Vec<Vec<u8>>,
    /// Secretbox ciphertext of the block's plaintext.
    pub(crate) payload_ciphertext: Vec<u8>,
    /// v2 finality flag; always false when read from a v1 stream.
    pub(crate) is_final: bool,
}

impl EncryptionBlock {
    pub(crate) fn write_to<W: io::Write>(
        &self,
        writer: &mut FramedWriter<W>,
        version: Version,
    ) -> Result<()> {
        let authenticators = || {
            self.authenticators
                .iter()
                .map(|a| ByteBuf::from(a.clone()))
                .collect()
        };
        if version.major < 2 {
            writer.write_record(&EncryptionBlockV1 {
                authenticators: authenticators(),
                payload_ciphertext: ByteBuf::from(self.payload_ciphertext.clone()),
            })
        } else {
            writer.write_record(&EncryptionBlockV2 {
                is_final: self.is_final,
                authenticators: authenticators(),
                payload_ciphertext: ByteBuf::from(self.payload_ciphertext.clone()),
            })
        }
    }

    /// Read one block record, returning it with its wire record number.
    pub(crate) fn read_from<R: io::Read>(
        reader: &mut FramedReader<R>,
        version: Version,
    ) -> Result<(Self, u64)> {
        if version.major < 2 {
            let (block, seqno) = reader.read::<EncryptionBlockV1>()?;
            Ok((
                Self {
                    authenticators: unwrap_bufs(block.authenticators),
                    payload_ciphertext: block.payload_ciphertext.into_vec(),
                    is_final: false,
                },
                seqno,
            ))
        } else {
            let (block, seqno) = reader.read::<EncryptionBlockV2>()?;
            Ok((
                Self {
                    authenticators: unwrap_bufs(block.authenticators),
                    payload_ciphertext: block.payload_ciphertext.into_vec(),
                    is_final: block.is_final,
                },
                seqno,
            ))
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SignatureBlockV1 {
    payload_chunk: ByteBuf,
    signature: ByteBuf,
}

#[derive(Serialize, Deserialize)]
struct SignatureBlockV2 {
    is_final: bool,
    payload_chunk: ByteBuf,
    signature: ByteBuf,
}

/// A decoded (or to-be-encoded) attached-signature block.
pub(crate) struct SignatureBlock {
    /// The plaintext chunk this block carries.
    pub(crate) payload_chunk: Vec<u8>,
    /// Ed25519 signature over the attached signing input.
    pub(crate) signature: Vec<u8>,
    /// v2 finality flag; always false when read from a v1 stream.
    pub(crate) is_final: bool,
}

impl SignatureBlock {
    pub(crate) fn write_to<W: io::Write>(
        &self,
        writer: &mut FramedWriter<W>,
        version: Version,
    ) -> Result<()> {
        if version.major < 2 {
            writer.write_record(&SignatureBlockV1 {
                payload_chunk: ByteBuf::from(self.payload_chunk.clone()),
                signature: ByteBuf::from(self.signature.clone()),
            })
        } else {
            writer.write_record(&SignatureBlockV2 {
                is_final: self.is_final,
                payload_chunk: ByteBuf::from(self.payload_chunk.clone()),
                signature: ByteBuf::from(self.signature.clone()),
            })
        }
    }

    /// Read one block record, returning it with its wire record number.
    pub(crate) fn read_from<R: io::Read>(
        reader: &mut FramedReader<R>,
        version: Version,
    ) -> Result<(Self, u64)> {
        if version.major < 2 {
            let (block, seqno) = reader.read::<SignatureBlockV1>()?;
            Ok((
                Self {
                    payload_chunk: block.payload_chunk.into_vec(),
                    signature: block.signature.into_vec(),
                    is_final: false,
                },
                seqno,
            ))
        } else {
            let (block, seqno) = reader.read::<SignatureBlockV2>()?;
            Ok((
                Self {
                    payload_chunk: block.payload_chunk.into_vec(),
                    signature: block.signature.into_vec(),
                    is_final: block.is_final,
                },
                seqno,
            ))
        }
    }
}

fn unwrap_bufs(bufs: Vec<ByteBuf>) -> Vec<Vec<u8>> {
    bufs.into_iter().map(ByteBuf::into_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encryption_block_round_trip_v1() {
        let mut wire = Vec::new();
        {
            let mut w = FramedWriter::new(&mut wire);
            EncryptionBlock {
                authenticators: vec![vec![1u8; 32], vec![2u8; 32]],
                payload_ciphertext: vec![9u8; 20],
                is_final: true, // not representable in v1 framing
            }
            .write_to(&mut w, Version::V1)
            .unwrap();
        }

        let mut r = FramedReader::new(wire.as_slice());
        let (block, seqno) = EncryptionBlock::read_from(&mut r, Version::V1).unwrap();
        assert_eq!(seqno, 0);
        assert_eq!(block.authenticators.len(), 2);
        assert_eq!(block.payload_ciphertext, vec![9u8; 20]);
        assert!(!block.is_final);
    }

    #[test]
    fn test_encryption_block_round_trip_v2() {
        let mut wire = Vec::new();
        {
            let mut w = FramedWriter::new(&mut wire);
            EncryptionBlock {
                authenticators: vec![vec![1u8; 32]],
                payload_ciphertext: vec![7u8; 16],
                is_final: true,
            }
            .write_to(&mut w, Version::V2)
            .unwrap();
        }

        // Three-element array starting with the flag.
        assert_eq!(wire[0], 0x93);
        assert_eq!(wire[1], 0xc3);

        let mut r = FramedReader::new(wire.as_slice());
        let (block, _) = EncryptionBlock::read_from(&mut r, Version::V2).unwrap();
        assert!(block.is_final);
    }

    #[test]
    fn test_signature_block_round_trip_both_versions() {
        for version in [Version::V1, Version::V2] {
            let mut wire = Vec::new();
            {
                let mut w = FramedWriter::new(&mut wire);
                SignatureBlock {
                    payload_chunk: b"chunk".to_vec(),
                    signature: vec![3u8; 64],
                    is_final: version.major >= 2,
                }
                .write_to(&mut w, version)
                .unwrap();
            }

            let mut r = FramedReader::new(wire.as_slice());
            let (block, _) = SignatureBlock::read_from(&mut r, version).unwrap();
            assert_eq!(block.payload_chunk, b"chunk");
            assert_eq!(block.signature, vec![3u8; 64]);
            assert_eq!(block.is_final, version.major >= 2);
        }
    }

    #[test]
    fn test_v1_reader_rejects_v2_framing() {
        let mut wire = Vec::new();
        {
            let mut w = FramedWriter::new(&mut wire);
            EncryptionBlock {
                authenticators: vec![vec![1u8; 32]],
                payload_ciphertext: vec![7u8; 16],
                is_final: false,
            }
            .write_to(&mut w, Version::V2)
            .unwrap();
        }
        let mut r = FramedReader::new(wire.as_slice());
        assert!(EncryptionBlock::read_from(&mut r, Version::V1).is_err());
    }
}
