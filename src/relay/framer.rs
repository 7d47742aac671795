use crate::error::AppError;
use async_stream::stream;
use bytes::Bytes;
use futures_core::Stream;
use std::pin::Pin;
use tokio_stream::StreamExt;

/// Terminator record sent by the upstream after the last event.
pub const DONE_LINE: &str = "data: [DONE]";

/// Lazily produced lines of one upstream response.
pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, AppError>> + Send>>;

/// Splits arbitrarily sized byte fragments into trimmed, newline-delimited
/// records. Blank lines and the `[DONE]` terminator are dropped; a trailing
/// partial line stays buffered until more bytes arrive or [`finish`] is called.
///
/// Buffering happens on bytes, so a UTF-8 sequence split across two
/// fragments is decoded only once its line is complete.
///
/// [`finish`]: LineFramer::finish
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(line) = accept(&raw) {
                lines.push(line);
            }
        }
        lines
    }

    /// Flush whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        accept(&rest)
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn accept(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim();
    if line.is_empty() || line == DONE_LINE {
        None
    } else {
        Some(line.to_string())
    }
}

/// Frame a byte stream into lines. A transport error is yielded once and ends the stream.
pub fn sse_lines<S, E>(bytes: S) -> LineStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<AppError> + Send + 'static,
{
    Box::pin(stream! {
        let mut framer = LineFramer::new();
        let mut bytes = Box::pin(bytes);

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    log::debug!("Received chunk of {} bytes ({} buffered)", chunk.len(), framer.pending());
                    for line in framer.push(&chunk) {
                        yield Ok(line);
                    }
                }
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            }
        }

        if let Some(line) = framer.finish() {
            log::debug!("Flushing final partial line: {}", line);
            yield Ok(line);
        }
    })
}
