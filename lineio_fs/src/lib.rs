//! # lineio_fs - Streaming file access for lineio
//!
//! Line-oriented reads, crash-safe chunked writes, and basic file management
//! over a pluggable storage primitive.
//!
//! Modules:
//! - `file` for line scanning, chunk encoding, streaming reads and atomic writes
//! - `primitive` for the storage seam and its tokio / in-memory backends
//! - `ops` for the [`FileOps`] facade every operation goes through
//! - `resolve` for mapping path strings onto concrete paths
//! - `span` for optional operation timing hooks

mod file;
mod ops;
mod primitive;
mod resolve;
mod span;

pub use file::{
    AtomicFileWriter, ChunkedEncoder, DEFAULT_CHUNK_THRESHOLD, EolType, LineBuffer,
    LineConsumer, Lines, StreamingFileReader, WriteReport, WriterConfig, line_break,
    line_break_type, scan_lines, temp_path,
};
pub use ops::{FileOps, Stat};
pub use primitive::{
    FilePrimitive, MemoryFile, MemoryFs, Metadata, MoveMode, TokioFile, TokioFs, WriteHandle,
};
pub use resolve::PathResolver;
pub use span::{Span, SpanHooks, TracingSpans};

pub use async_trait::async_trait;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// The primitive call an I/O error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    Read,
    Open,
    Write,
    Flush,
    Close,
    Move,
    Copy,
    Remove,
    Stat,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IoOp::Read => "read",
            IoOp::Open => "open",
            IoOp::Write => "write",
            IoOp::Flush => "flush",
            IoOp::Close => "close",
            IoOp::Move => "move",
            IoOp::Copy => "copy",
            IoOp::Remove => "remove",
            IoOp::Stat => "stat",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during file operations
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The path an operation needed does not exist
    #[error("file not found: {}", .path.display())]
    NotFound { path: PathBuf },
    /// The storage primitive failed
    #[error("{op} failed for {}: {source}", .path.display())]
    Io {
        op: IoOp,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// File content is not valid UTF-8
    #[error("{} is not valid UTF-8 text", .path.display())]
    Decode { path: PathBuf },
    /// The request was rejected before any I/O was issued
    #[error("invalid request: {0}")]
    Setup(String),
}

impl FsError {
    /// Classify an error returned by a primitive.
    pub(crate) fn from_io(op: IoOp, path: &Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            FsError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            FsError::Io {
                op,
                path: path.to_path_buf(),
                source: err,
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound { .. })
    }
}

/// Result type for file operations
pub type FsResult<T> = Result<T, FsError>;
