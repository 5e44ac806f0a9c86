//! Atomic line writes: temp file, chunked writes, then rename over the target.

use std::path::{Path, PathBuf};

use super::encoder::{ChunkedEncoder, DEFAULT_CHUNK_THRESHOLD};
use crate::primitive::{FilePrimitive, MoveMode, WriteHandle};
use crate::span::{Span, SpanExt};
use crate::{FsError, FsResult, IoOp};

/// Configuration for atomic writes
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Buffered character length that triggers a chunk write
    pub chunk_threshold: usize,
    /// Suffix appended to the target file name for the temp file
    pub temp_suffix: String,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
            temp_suffix: ".tmp".to_string(),
        }
    }
}

/// Result of a completed atomic write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    /// Final path of the written file
    pub path: PathBuf,
    /// Number of bytes written
    pub bytes_written: u64,
    /// Number of write calls issued
    pub chunks_written: usize,
}

/// Writes lines to a temp file beside the target and renames it into place.
///
/// A second write to the same target must not start before the first one
/// resolves; both would share the temp file.
#[derive(Debug)]
pub struct AtomicFileWriter<'a, P> {
    fs: &'a P,
    config: WriterConfig,
}

impl<'a, P: FilePrimitive> AtomicFileWriter<'a, P> {
    pub fn new(fs: &'a P) -> Self {
        Self::with_config(fs, WriterConfig::default())
    }

    pub fn with_config(fs: &'a P, config: WriterConfig) -> Self {
        AtomicFileWriter { fs, config }
    }

    /// Write every line, each followed by the platform line break, to `path`.
    ///
    /// The target is replaced in one rename after all data has been written,
    /// flushed and closed. On error the target is untouched and the temp
    /// file may be left behind.
    pub async fn write_to_file<I>(
        &self,
        path: &Path,
        lines: I,
        span: Option<Span<'_>>,
    ) -> FsResult<WriteReport>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        span.start();
        let result = self.write_atomic(path, lines.into_iter(), span).await;
        span.done();

        match &result {
            Ok(report) => tracing::debug!(
                path = %path.display(),
                bytes = report.bytes_written,
                chunks = report.chunks_written,
                "write complete"
            ),
            Err(error) => tracing::warn!(
                path = %path.display(),
                %error,
                "write aborted, target left unchanged"
            ),
        }
        result
    }

    async fn write_atomic<I>(
        &self,
        path: &Path,
        lines: I,
        span: Option<Span<'_>>,
    ) -> FsResult<WriteReport>
    where
        I: Iterator,
        I::Item: Into<String>,
    {
        let temp_path = temp_path(path, &self.config.temp_suffix)?;
        let mut handle = self
            .fs
            .open_write(&temp_path)
            .await
            .map_err(|e| FsError::from_io(IoOp::Open, &temp_path, e))?;

        let mut report = WriteReport {
            path: path.to_path_buf(),
            bytes_written: 0,
            chunks_written: 0,
        };
        let mut encoder = ChunkedEncoder::new(self.config.chunk_threshold);
        for line in lines {
            if let Some(chunk) = encoder.push(line) {
                write_chunk(&mut handle, &temp_path, &chunk, &mut report).await?;
            }
        }
        if let Some(chunk) = encoder.finish() {
            write_chunk(&mut handle, &temp_path, &chunk, &mut report).await?;
        }

        handle
            .flush()
            .await
            .map_err(|e| FsError::from_io(IoOp::Flush, &temp_path, e))?;
        handle
            .close()
            .await
            .map_err(|e| FsError::from_io(IoOp::Close, &temp_path, e))?;
        self.fs
            .rename(&temp_path, path, MoveMode::Replace)
            .await
            .map_err(|e| FsError::from_io(IoOp::Move, &temp_path, e))?;
        span.end();

        Ok(report)
    }
}

async fn write_chunk<H: WriteHandle>(
    handle: &mut H,
    temp_path: &Path,
    chunk: &[u8],
    report: &mut WriteReport,
) -> FsResult<()> {
    handle
        .write(chunk)
        .await
        .map_err(|e| FsError::from_io(IoOp::Write, temp_path, e))?;
    report.bytes_written += chunk.len() as u64;
    report.chunks_written += 1;
    tracing::trace!(
        path = %temp_path.display(),
        bytes = chunk.len(),
        "chunk written"
    );
    Ok(())
}

/// Generate the temp file path for `original`.
pub fn temp_path(original: &Path, suffix: &str) -> FsResult<PathBuf> {
    let name = original
        .file_name()
        .ok_or_else(|| FsError::Setup(format!("{} has no file name", original.display())))?;

    let mut temp_name = name.to_os_string();
    temp_name.push(suffix);
    Ok(original.with_file_name(temp_name))
}
