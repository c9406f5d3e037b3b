// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Newline-delimited JSON reassembly for streaming generate replies.
//!
//! The backend writes one JSON object per line, but the transport delivers
//! arbitrary byte chunks: a chunk may hold several lines, part of a line, or
//! split a multi-byte character. [`NdjsonDecoder`] buffers bytes until a
//! line terminator arrives, consumes complete lines strictly front to back,
//! and turns each into at most one [`GenerationEvent`].
//!
//! Malformed lines are dropped and counted; they never end the stream.

use bytes::{Buf, Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use genrelay_core::{EventStream, GenerationEvent, RelayError};
use tracing::{debug, warn};

use crate::types::GenerateChunk;

/// Incremental decoder from raw NDJSON bytes to generation events.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buf: BytesMut,
    /// Bytes at the front of `buf` already known to contain no `\n`.
    scanned: usize,
    finished: bool,
    discarded: u64,
}

impl NdjsonDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk of received bytes. Ignored once the decoder is finished.
    pub fn push(&mut self, chunk: &[u8]) {
        if !self.finished {
            self.buf.extend_from_slice(chunk);
        }
    }

    /// Returns the next event decodable from complete buffered lines.
    ///
    /// `None` means more bytes are needed (or the decoder is finished).
    /// An `Err` item is a backend-reported failure and finishes the decoder.
    pub fn next_event(&mut self) -> Option<Result<GenerationEvent, RelayError>> {
        while !self.finished {
            let newline = match self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
                Some(pos) => self.scanned + pos,
                None => {
                    self.scanned = self.buf.len();
                    return None;
                }
            };

            let line = self.buf.split_to(newline);
            self.buf.advance(1);
            self.scanned = 0;

            if let Some(item) = self.decode_line(&line) {
                return Some(item);
            }
        }
        None
    }

    /// Decodes whatever unterminated line remains once the transport has ended.
    pub fn finish(&mut self) -> Option<Result<GenerationEvent, RelayError>> {
        if self.finished || self.buf.is_empty() {
            self.buf.clear();
            return None;
        }
        let rest = self.buf.split();
        self.scanned = 0;
        let item = self.decode_line(&rest);
        self.finished = true;
        item
    }

    /// True after a final event or a backend error has been decoded.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of lines dropped because they failed to decode.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Number of bytes waiting for a line terminator.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<Result<GenerationEvent, RelayError>> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return None;
        }

        let chunk = match serde_json::from_slice::<GenerateChunk>(line) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.discarded += 1;
                warn!(
                    error = %e,
                    len = line.len(),
                    discarded = self.discarded,
                    "discarding malformed upstream line"
                );
                return None;
            }
        };

        if let Some(message) = chunk.error {
            self.finish_early();
            return Some(Err(RelayError::upstream(message)));
        }

        let text = chunk.response.unwrap_or_default();
        if chunk.done.unwrap_or(false) {
            self.finish_early();
            return Some(Ok(GenerationEvent::last(text)));
        }
        if text.is_empty() {
            return None;
        }
        Some(Ok(GenerationEvent::fragment(text)))
    }

    fn finish_early(&mut self) {
        self.finished = true;
        if !self.buf.is_empty() {
            debug!(bytes = self.buf.len(), "dropping bytes after end of generation");
        }
        self.buf.clear();
        self.scanned = 0;
    }
}

/// Decodes a byte stream into a stream of generation events.
///
/// The returned stream ends after the final event, after the first error
/// (transport or backend-reported), or when `bytes` ends. Dropping it drops
/// `bytes`, which aborts the underlying transfer.
pub fn decode_stream<S>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<Bytes, RelayError>> + Send + Unpin + 'static,
{
    struct State<S> {
        bytes: S,
        decoder: NdjsonDecoder,
        ended: bool,
    }

    let state = State {
        bytes,
        decoder: NdjsonDecoder::new(),
        ended: false,
    };

    let events = stream::unfold(state, |mut st| async move {
        loop {
            if st.ended {
                return None;
            }

            if let Some(item) = st.decoder.next_event() {
                st.ended = st.decoder.is_finished();
                return Some((item, st));
            }

            match st.bytes.next().await {
                Some(Ok(chunk)) => st.decoder.push(&chunk),
                Some(Err(e)) => {
                    st.ended = true;
                    return Some((Err(e), st));
                }
                None => {
                    st.ended = true;
                    debug!(
                        discarded = st.decoder.discarded(),
                        trailing = st.decoder.buffered(),
                        "upstream body ended"
                    );
                    return st.decoder.finish().map(|item| (item, st));
                }
            }
        }
    });

    Box::pin(events)
}
