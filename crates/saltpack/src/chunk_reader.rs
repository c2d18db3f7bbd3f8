//! Adapts a block-at-a-time producer into a byte-granular reader.
//!
//! Decoders naturally produce whole plaintext blocks; callers read arbitrary
//! amounts. This adapter buffers exactly one block and owns the terminal
//! state: once the source reports a status, it is stored, surfaced only
//! after every buffered byte has been delivered, and the source is never
//! polled again.

use std::io;

use crate::error::Error;

/// Terminal outcome of a block source.
#[derive(Debug, Clone)]
pub(crate) enum SourceStatus {
    /// The stream ended cleanly after its terminal block.
    Eof,
    /// The stream failed; the error is sticky.
    Failed(Error),
}

/// A finite producer of plaintext blocks.
///
/// Returns the next block, optionally accompanied by a terminal status. A
/// non-terminal result must carry a non-empty block; the adapter treats
/// `(empty, none)` as a contract violation because it relies on that pair
/// being impossible to terminate its drain loop. Bytes accompanying a
/// terminal status are still delivered, before the status. After a terminal
/// status the source will not be polled again.
pub(crate) trait BlockSource {
    fn next_block(&mut self) -> (Vec<u8>, Option<SourceStatus>);
}

/// The byte-granular adapter over a [`BlockSource`].
pub(crate) struct ChunkReader<S: BlockSource> {
    source: S,
    buffered: Vec<u8>,
    pos: usize,
    status: Option<SourceStatus>,
}

impl<S: BlockSource> ChunkReader<S> {
    pub(crate) fn new(source: S) -> Self {
        Self {
            source,
            buffered: Vec::new(),
            pos: 0,
            status: None,
        }
    }
}

impl<S: BlockSource> io::Read for ChunkReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = 0;
        loop {
            if self.pos < self.buffered.len() {
                let copied = (buf.len() - n).min(self.buffered.len() - self.pos);
                buf[n..n + copied].copy_from_slice(&self.buffered[self.pos..self.pos + copied]);
                n += copied;
                self.pos += copied;
                if self.pos < self.buffered.len() {
                    // Caller's buffer is full.
                    return Ok(n);
                }
            }

            if let Some(status) = &self.status {
                // Buffered data fully drained; surface the stored status.
                // Bytes and an error never travel together through
                // std::io::Read, so a failure waits for the next call when
                // this one already produced data.
                return match status {
                    _ if n > 0 => Ok(n),
                    SourceStatus::Eof => Ok(0),
                    SourceStatus::Failed(err) => Err(err.clone().into()),
                };
            }

            let (block, status) = self.source.next_block();
            assert!(
                !(block.is_empty() && status.is_none()),
                "block source produced an empty block without a status"
            );
            self.buffered = block;
            self.pos = 0;
            self.status = status;
        }
    }
}
