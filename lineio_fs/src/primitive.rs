//! Storage primitives the engine runs on.
//!
//! [`FilePrimitive`] is the only seam between the engine and real storage.
//! Two backends ship with the crate:
//! - [`TokioFs`] drives the local disk through `tokio::fs`
//! - [`MemoryFs`] keeps files in a shared map, for hosts without a disk
//!   and for exercising failure paths

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;

/// How a move treats an existing destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMode {
    /// Atomically replace the destination if present.
    Replace,
    /// Fail with `AlreadyExists` if the destination is present.
    NoReplace,
}

/// Metadata reported by a primitive's `stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub is_dir: bool,
    pub modified: SystemTime,
}

/// An open, write-only, truncated file.
#[async_trait]
pub trait WriteHandle: Send {
    async fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Push buffered data down to storage. Backends without such a notion
    /// keep the default.
    async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()>;
}

/// Path-level file operations.
///
/// A missing path must be reported as `io::ErrorKind::NotFound`.
#[async_trait]
pub trait FilePrimitive: Send + Sync {
    type Handle: WriteHandle;

    /// Read the whole file.
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Open for writing, creating or truncating.
    async fn open_write(&self, path: &Path) -> io::Result<Self::Handle>;

    async fn rename(&self, from: &Path, to: &Path, mode: MoveMode) -> io::Result<()>;

    /// Copy content, overwriting `to`.
    async fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    async fn remove(&self, path: &Path) -> io::Result<()>;

    async fn stat(&self, path: &Path) -> io::Result<Metadata>;
}

/// Local disk backend.
#[derive(Debug, Clone)]
pub struct TokioFs {
    sync_on_flush: bool,
}

impl TokioFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`WriteHandle::flush`] also waits for the data to reach the
    /// device (`fsync`).
    pub fn with_sync_on_flush(mut self, sync: bool) -> Self {
        self.sync_on_flush = sync;
        self
    }
}

impl Default for TokioFs {
    fn default() -> Self {
        TokioFs {
            sync_on_flush: true,
        }
    }
}

/// Write handle over a `tokio::fs::File`.
#[derive(Debug)]
pub struct TokioFile {
    file: Option<tokio::fs::File>,
    sync_on_flush: bool,
}

impl TokioFile {
    fn file(&mut self) -> io::Result<&mut tokio::fs::File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("write handle already closed"))
    }
}

#[async_trait]
impl WriteHandle for TokioFile {
    async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file()?.write_all(bytes).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        let sync = self.sync_on_flush;
        let file = self.file()?;
        file.flush().await?;
        if sync {
            file.sync_all().await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        // tokio completes in-flight writes in the background on drop;
        // flushing first surfaces their errors here instead.
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl FilePrimitive for TokioFs {
    type Handle = TokioFile;

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn open_write(&self, path: &Path) -> io::Result<Self::Handle> {
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await?;
        Ok(TokioFile {
            file: Some(file),
            sync_on_flush: self.sync_on_flush,
        })
    }

    async fn rename(&self, from: &Path, to: &Path, mode: MoveMode) -> io::Result<()> {
        match mode {
            MoveMode::Replace => tokio::fs::rename(from, to).await,
            // link(2) fails with EEXIST atomically, unlike a check before rename
            MoveMode::NoReplace => {
                tokio::fs::hard_link(from, to).await?;
                tokio::fs::remove_file(from).await
            }
        }
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        tokio::fs::copy(from, to).await.map(|_| ())
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    async fn stat(&self, path: &Path) -> io::Result<Metadata> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(Metadata {
            is_dir: metadata.is_dir(),
            modified: metadata.modified().unwrap_or(UNIX_EPOCH),
        })
    }
}

#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, modified: SystemTime },
    Dir { modified: SystemTime },
}

#[derive(Debug, Default)]
struct MemoryState {
    nodes: HashMap<PathBuf, Node>,
    write_calls: usize,
    fail_writes_after: Option<usize>,
}

/// In-memory backend. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a file with `data`.
    pub fn insert_file(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        self.state.lock().nodes.insert(
            path.into(),
            Node::File {
                data: data.into(),
                modified: SystemTime::now(),
            },
        );
    }

    pub fn create_dir(&self, path: impl Into<PathBuf>) {
        self.state.lock().nodes.insert(
            path.into(),
            Node::Dir {
                modified: SystemTime::now(),
            },
        );
    }

    /// File content, or `None` for missing paths and directories.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.state.lock().nodes.get(path.as_ref()) {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.state.lock().nodes.contains_key(path.as_ref())
    }

    /// Number of successful `write` calls across all handles.
    pub fn write_calls(&self) -> usize {
        self.state.lock().write_calls
    }

    /// Make every `write` fail once `n` writes have succeeded.
    pub fn fail_writes_after(&self, n: usize) {
        self.state.lock().fail_writes_after = Some(n);
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )
    }

    fn is_a_directory(path: &Path) -> io::Error {
        io::Error::other(format!("{} is a directory", path.display()))
    }
}

/// Write handle into a [`MemoryFs`] file. Each write lands in the shared map
/// immediately.
#[derive(Debug)]
pub struct MemoryFile {
    fs: MemoryFs,
    path: PathBuf,
    closed: bool,
}

#[async_trait]
impl WriteHandle for MemoryFile {
    async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::other("write handle already closed"));
        }

        let mut state = self.fs.state.lock();
        if state
            .fail_writes_after
            .is_some_and(|limit| state.write_calls >= limit)
        {
            return Err(io::Error::other("injected write failure"));
        }

        match state.nodes.get_mut(&self.path) {
            Some(Node::File { data, modified }) => {
                data.extend_from_slice(bytes);
                *modified = SystemTime::now();
            }
            Some(Node::Dir { .. }) => return Err(MemoryFs::is_a_directory(&self.path)),
            None => return Err(MemoryFs::not_found(&self.path)),
        }
        state.write_calls += 1;
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[async_trait]
impl FilePrimitive for MemoryFs {
    type Handle = MemoryFile;

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.state.lock().nodes.get(path) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(Node::Dir { .. }) => Err(Self::is_a_directory(path)),
            None => Err(Self::not_found(path)),
        }
    }

    async fn open_write(&self, path: &Path) -> io::Result<Self::Handle> {
        let mut state = self.state.lock();
        if let Some(Node::Dir { .. }) = state.nodes.get(path) {
            return Err(Self::is_a_directory(path));
        }
        state.nodes.insert(
            path.to_path_buf(),
            Node::File {
                data: Vec::new(),
                modified: SystemTime::now(),
            },
        );
        Ok(MemoryFile {
            fs: self.clone(),
            path: path.to_path_buf(),
            closed: false,
        })
    }

    async fn rename(&self, from: &Path, to: &Path, mode: MoveMode) -> io::Result<()> {
        let mut state = self.state.lock();
        if !state.nodes.contains_key(from) {
            return Err(Self::not_found(from));
        }
        if mode == MoveMode::NoReplace && state.nodes.contains_key(to) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", to.display()),
            ));
        }
        if let Some(Node::Dir { .. }) = state.nodes.get(to) {
            return Err(Self::is_a_directory(to));
        }

        if let Some(node) = state.nodes.remove(from) {
            state.nodes.insert(to.to_path_buf(), node);
        }
        Ok(())
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.state.lock();
        let data = match state.nodes.get(from) {
            Some(Node::File { data, .. }) => data.clone(),
            Some(Node::Dir { .. }) => return Err(Self::is_a_directory(from)),
            None => return Err(Self::not_found(from)),
        };
        if let Some(Node::Dir { .. }) = state.nodes.get(to) {
            return Err(Self::is_a_directory(to));
        }
        state.nodes.insert(
            to.to_path_buf(),
            Node::File {
                data,
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.lock();
        match state.nodes.get(path) {
            Some(Node::File { .. }) => {
                state.nodes.remove(path);
                Ok(())
            }
            Some(Node::Dir { .. }) => Err(Self::is_a_directory(path)),
            None => Err(Self::not_found(path)),
        }
    }

    async fn stat(&self, path: &Path) -> io::Result<Metadata> {
        match self.state.lock().nodes.get(path) {
            Some(Node::File { modified, .. }) => Ok(Metadata {
                is_dir: false,
                modified: *modified,
            }),
            Some(Node::Dir { modified }) => Ok(Metadata {
                is_dir: true,
                modified: *modified,
            }),
            None => Err(Self::not_found(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tokio_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let fs = TokioFs::new();

        let mut handle = fs.open_write(&path).await.unwrap();
        handle.write(b"hello ").await.unwrap();
        handle.write(b"world").await.unwrap();
        handle.flush().await.unwrap();
        handle.close().await.unwrap();

        assert_eq!(fs.read(&path).await.unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_tokio_open_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, b"previous content").unwrap();
        let fs = TokioFs::new().with_sync_on_flush(false);

        let mut handle = fs.open_write(&path).await.unwrap();
        handle.write(b"new").await.unwrap();
        handle.close().await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_tokio_write_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFs::new();
        let mut handle = fs.open_write(&dir.path().join("f")).await.unwrap();
        handle.close().await.unwrap();
        assert!(handle.write(b"late").await.is_err());
    }

    #[tokio::test]
    async fn test_tokio_rename_no_replace() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a");
        let to = dir.path().join("b");
        std::fs::write(&from, b"a").unwrap();
        std::fs::write(&to, b"b").unwrap();
        let fs = TokioFs::new();

        let err = fs.rename(&from, &to, MoveMode::NoReplace).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);

        fs.rename(&from, &to, MoveMode::Replace).await.unwrap();
        assert_eq!(std::fs::read(&to).unwrap(), b"a");
        assert!(!from.exists());
    }

    #[tokio::test]
    async fn test_tokio_no_replace_missing_source_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("missing");
        let to = dir.path().join("b");
        std::fs::write(&to, b"b").unwrap();
        let fs = TokioFs::new();

        let err = fs.rename(&from, &to, MoveMode::NoReplace).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(std::fs::read(&to).unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_tokio_no_replace_moves_content() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a");
        let to = dir.path().join("b");
        std::fs::write(&from, b"a").unwrap();

        TokioFs::new()
            .rename(&from, &to, MoveMode::NoReplace)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&to).unwrap(), b"a");
        assert!(!from.exists());
    }

    #[tokio::test]
    async fn test_tokio_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let fs = TokioFs::new();

        assert_eq!(fs.read(&missing).await.unwrap_err().kind(), io::ErrorKind::NotFound);
        assert_eq!(fs.stat(&missing).await.unwrap_err().kind(), io::ErrorKind::NotFound);
        assert_eq!(fs.remove(&missing).await.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_memory_write_is_visible_before_close() {
        let fs = MemoryFs::new();
        let path = Path::new("/mem/file.tmp");

        let mut handle = fs.open_write(path).await.unwrap();
        handle.write(b"part").await.unwrap();
        assert_eq!(fs.contents(path), Some(b"part".to_vec()));
        handle.close().await.unwrap();
        assert!(handle.write(b"more").await.is_err());
        assert_eq!(fs.write_calls(), 1);
    }

    #[tokio::test]
    async fn test_memory_injected_failure() {
        let fs = MemoryFs::new();
        fs.fail_writes_after(2);
        let mut handle = fs.open_write(Path::new("f")).await.unwrap();

        handle.write(b"1").await.unwrap();
        handle.write(b"2").await.unwrap();
        assert!(handle.write(b"3").await.is_err());
        assert_eq!(fs.contents("f"), Some(b"12".to_vec()));
    }

    #[tokio::test]
    async fn test_memory_rename_and_copy() {
        let fs = MemoryFs::new();
        fs.insert_file("a", "alpha");
        fs.insert_file("b", "beta");

        let err = fs
            .rename(Path::new("a"), Path::new("b"), MoveMode::NoReplace)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);

        fs.copy(Path::new("a"), Path::new("c")).await.unwrap();
        fs.rename(Path::new("a"), Path::new("b"), MoveMode::Replace)
            .await
            .unwrap();
        assert!(!fs.exists("a"));
        assert_eq!(fs.contents("b"), Some(b"alpha".to_vec()));
        assert_eq!(fs.contents("c"), Some(b"alpha".to_vec()));
    }

    #[tokio::test]
    async fn test_memory_directories() {
        let fs = MemoryFs::new();
        fs.create_dir("/d");

        assert!(fs.stat(Path::new("/d")).await.unwrap().is_dir);
        assert!(fs.read(Path::new("/d")).await.is_err());
        assert!(fs.remove(Path::new("/d")).await.is_err());
        assert!(fs.open_write(Path::new("/d")).await.is_err());
    }
}
