//! MessagePack record framing.
//!
//! Every logical unit on the wire (the doubly framed header, each payload
//! block, a detached signature) is exactly one self-delimiting msgpack
//! record. The reader hands back one record per call together with its
//! record number, which the failure taxonomy reports (header = 0, first
//! payload block = 1).

use std::io;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Reads one msgpack record per call from an underlying byte stream.
pub(crate) struct FramedReader<R: io::Read> {
    de: rmp_serde::Deserializer<rmp_serde::decode::ReadReader<R>>,
    seqno: u64,
}

impl<R: io::Read> FramedReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            de: rmp_serde::Deserializer::new(reader),
            seqno: 0,
        }
    }

    /// Read the next record, returning it with its record number.
    ///
    /// End-of-stream at a record boundary is reported as
    /// [`Error::UnexpectedEof`]: callers only invoke `read` when the format
    /// says another record must exist.
    pub(crate) fn read<T: DeserializeOwned>(&mut self) -> Result<(T, u64)> {
        let value = T::deserialize(&mut self.de).map_err(map_decode_err)?;
        let seqno = self.seqno;
        self.seqno += 1;
        Ok((value, seqno))
    }

    /// Require that no further record exists.
    ///
    /// A readable record of any shape is [`Error::TrailingGarbage`]; a clean
    /// end-of-stream succeeds; any other failure, including an I/O error
    /// the underlying reader delivers at EOF, propagates verbatim.
    pub(crate) fn assert_end(&mut self) -> Result<()> {
        match serde::de::IgnoredAny::deserialize(&mut self.de) {
            Ok(_) => Err(Error::TrailingGarbage),
            Err(rmp_serde::decode::Error::InvalidMarkerRead(e))
                if e.kind() == io::ErrorKind::UnexpectedEof =>
            {
                Ok(())
            }
            Err(rmp_serde::decode::Error::InvalidMarkerRead(e))
            | Err(rmp_serde::decode::Error::InvalidDataRead(e)) => Err(Error::Io(Arc::new(e))),
            Err(other) => Err(Error::Framing(other.to_string())),
        }
    }
}

fn map_decode_err(err: rmp_serde::decode::Error) -> Error {
    match err {
        rmp_serde::decode::Error::InvalidMarkerRead(e)
        | rmp_serde::decode::Error::InvalidDataRead(e) => {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::UnexpectedEof
            } else {
                Error::Io(Arc::new(e))
            }
        }
        other => Error::Framing(other.to_string()),
    }
}

/// Writes one msgpack record per call, structs encoded as arrays.
pub(crate) struct FramedWriter<W: io::Write> {
    writer: W,
}

impl<W: io::Write> FramedWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self { writer }
    }

    pub(crate) fn write_record<T: Serialize>(&mut self, value: &T) -> Result<()> {
        rmp_serde::encode::write(&mut self.writer, value).map_err(map_encode_err)
    }

    pub(crate) fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::from)
    }
}

fn map_encode_err(err: rmp_serde::encode::Error) -> Error {
    match err {
        rmp_serde::encode::Error::InvalidValueWrite(rmp::encode::ValueWriteError::InvalidMarkerWrite(e))
        | rmp_serde::encode::Error::InvalidValueWrite(rmp::encode::ValueWriteError::InvalidDataWrite(e)) => {
            Error::Io(Arc::new(e))
        }
        other => Error::Framing(other.to_string()),
    }
}

/// Encode a single value to standalone msgpack bytes (structs as arrays).
pub(crate) fn encode_to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    rmp_serde::to_vec(value).map_err(map_encode_err)
}
