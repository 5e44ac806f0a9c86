//! Line-oriented file reading and writing.
//!
//! This module provides:
//! - Platform end-of-line resolution
//! - Lazy line scanning of in-memory text
//! - Threshold-based chunk encoding of outgoing lines
//! - Streaming reads that yield between lines
//! - Atomic writes through a temp file and rename

pub mod encoder;
pub mod eol;
pub mod read;
pub mod scan;
pub mod write;

pub use encoder::{ChunkedEncoder, DEFAULT_CHUNK_THRESHOLD, LineBuffer};
pub use eol::{EolType, line_break, line_break_type};
pub use read::{LineConsumer, StreamingFileReader};
pub use scan::{Lines, scan_lines};
pub use write::{AtomicFileWriter, WriteReport, WriterConfig, temp_path};
