//! Line buffering with threshold-based chunk emission.

use super::eol::{EolType, line_break_type};

/// Buffered character length at which a chunk is emitted (32 KiB).
pub const DEFAULT_CHUNK_THRESHOLD: usize = 32 * 1024;

/// Pending lines awaiting encoding plus their character length,
/// terminators included.
#[derive(Debug, Default)]
pub struct LineBuffer {
    lines: Vec<String>,
    len: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line; `eol_len` is the terminator's character length.
    pub fn push(&mut self, line: String, eol_len: usize) {
        self.len += line.chars().count() + eol_len;
        self.lines.push(line);
    }

    /// Accumulated character length.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Encode every pending line followed by `eol` as UTF-8 and reset.
    fn drain_encoded(&mut self, eol: &str) -> Vec<u8> {
        let bytes: usize = self.lines.iter().map(|l| l.len() + eol.len()).sum();
        let mut out = String::with_capacity(bytes);
        for line in self.lines.drain(..) {
            out.push_str(&line);
            out.push_str(eol);
        }
        self.len = 0;
        out.into_bytes()
    }
}

/// Turns a stream of lines into UTF-8 chunks no smaller than the threshold
/// (except the last one).
#[derive(Debug)]
pub struct ChunkedEncoder {
    buffer: LineBuffer,
    threshold: usize,
    eol: EolType,
}

impl ChunkedEncoder {
    /// Encoder using the process-wide line break.
    pub fn new(threshold: usize) -> Self {
        Self::with_eol(threshold, line_break_type())
    }

    pub fn with_eol(threshold: usize, eol: EolType) -> Self {
        ChunkedEncoder {
            buffer: LineBuffer::new(),
            threshold,
            eol,
        }
    }

    /// Buffer `line`. Returns an encoded chunk once the buffered length
    /// reaches the threshold; the buffer is empty afterwards.
    pub fn push(&mut self, line: impl Into<String>) -> Option<Vec<u8>> {
        self.buffer.push(line.into(), self.eol.char_len());
        if self.buffer.len() >= self.threshold {
            Some(self.buffer.drain_encoded(self.eol.as_str()))
        } else {
            None
        }
    }

    /// Emit whatever is still buffered.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.drain_encoded(self.eol.as_str()))
        }
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffered_lines(&self) -> usize {
        self.buffer.line_count()
    }
}
