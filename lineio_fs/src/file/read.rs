//! Streaming line reads that yield to the scheduler between lines.

use std::path::Path;

use super::scan::scan_lines;
use crate::primitive::FilePrimitive;
use crate::span::{Span, SpanExt};
use crate::{FsError, FsResult, IoOp};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Receives lines from a [`StreamingFileReader`].
///
/// `Some(line)` is a line; `None` is delivered exactly once, after the last
/// line, when the whole file has been read.
pub trait LineConsumer {
    fn process(&mut self, line: Option<&str>);
}

impl<F> LineConsumer for F
where
    F: FnMut(Option<&str>),
{
    fn process(&mut self, line: Option<&str>) {
        self(line)
    }
}

/// Reads a text file and hands its non-empty lines to a consumer one at a
/// time.
#[derive(Debug)]
pub struct StreamingFileReader<'a, P> {
    fs: &'a P,
}

impl<'a, P: FilePrimitive> StreamingFileReader<'a, P> {
    pub fn new(fs: &'a P) -> Self {
        StreamingFileReader { fs }
    }

    /// Deliver every line of `path` to `consumer`, then the `None` sentinel.
    ///
    /// The file is read and decoded in one step; if that fails the consumer
    /// is never called. Between lines the task yields so other work on the
    /// same thread can run. Returns the number of lines delivered.
    pub async fn read_from_file<C>(
        &self,
        path: &Path,
        consumer: &mut C,
        span: Option<Span<'_>>,
    ) -> FsResult<usize>
    where
        C: LineConsumer + ?Sized,
    {
        span.start();
        let result = self.deliver(path, consumer, span).await;
        span.done();

        match &result {
            Ok(lines) => tracing::debug!(path = %path.display(), lines, "read complete"),
            Err(error) => tracing::debug!(path = %path.display(), %error, "read failed"),
        }
        result
    }

    async fn deliver<C>(
        &self,
        path: &Path,
        consumer: &mut C,
        span: Option<Span<'_>>,
    ) -> FsResult<usize>
    where
        C: LineConsumer + ?Sized,
    {
        let bytes = self
            .fs
            .read(path)
            .await
            .map_err(|e| FsError::from_io(IoOp::Read, path, e))?;
        let text = decode_utf8(bytes).ok_or_else(|| FsError::Decode {
            path: path.to_path_buf(),
        })?;
        span.end();

        let mut delivered = 0;
        for line in scan_lines(&text) {
            consumer.process(Some(line));
            delivered += 1;
            tokio::task::yield_now().await;
        }
        consumer.process(None);

        Ok(delivered)
    }
}

/// UTF-8 decode, dropping a leading byte order mark.
fn decode_utf8(mut bytes: Vec<u8>) -> Option<String> {
    if bytes.starts_with(UTF8_BOM) {
        bytes.drain(..UTF8_BOM.len());
    }
    String::from_utf8(bytes).ok()
}
