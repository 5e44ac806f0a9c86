//! The file operations facade.
//!
//! [`FileOps`] is the entry point for every operation: streaming reads,
//! atomic writes, and the copy/rename/remove/stat helpers. Each operation
//! resolves exactly once with either success or a single [`FsError`].

use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::file::read::{LineConsumer, StreamingFileReader};
use crate::file::write::{AtomicFileWriter, WriteReport, WriterConfig};
use crate::primitive::{FilePrimitive, Metadata, MoveMode, TokioFs};
use crate::resolve::PathResolver;
use crate::span::Span;
use crate::{FsError, FsResult, IoOp};

/// File status as seen by [`FileOps::stat_file`].
///
/// A missing file is a successful stat with `exists == false`; every other
/// field is then false or `UNIX_EPOCH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub exists: bool,
    pub is_directory: bool,
    pub is_file: bool,
    pub last_modified: SystemTime,
}

impl Stat {
    pub fn missing() -> Self {
        Stat {
            exists: false,
            is_directory: false,
            is_file: false,
            last_modified: UNIX_EPOCH,
        }
    }

    fn from_metadata(metadata: Metadata) -> Self {
        Stat {
            exists: true,
            is_directory: metadata.is_dir,
            is_file: !metadata.is_dir,
            last_modified: metadata.modified,
        }
    }
}

/// Uniform async file operations over a [`FilePrimitive`].
#[derive(Debug)]
pub struct FileOps<P = TokioFs> {
    fs: P,
    writer: WriterConfig,
    resolver: PathResolver,
}

impl FileOps<TokioFs> {
    /// Operations on the local disk, resolving relative paths under the
    /// home directory.
    pub fn new() -> Self {
        Self::with_primitive(TokioFs::default())
    }
}

impl Default for FileOps<TokioFs> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: FilePrimitive> FileOps<P> {
    pub fn with_primitive(fs: P) -> Self {
        FileOps {
            fs,
            writer: WriterConfig::default(),
            resolver: PathResolver::from_home(),
        }
    }

    pub fn with_writer_config(mut self, config: WriterConfig) -> Self {
        self.writer = config;
        self
    }

    pub fn with_resolver(mut self, resolver: PathResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn primitive(&self) -> &P {
        &self.fs
    }

    pub fn writer_config(&self) -> &WriterConfig {
        &self.writer
    }

    /// Map a user-supplied path string to a concrete path.
    pub fn resolve(&self, input: &str) -> Option<PathBuf> {
        self.resolver.resolve(input)
    }

    /// Stream the non-empty lines of `path` into `consumer`, followed by the
    /// `None` sentinel. See [`StreamingFileReader::read_from_file`].
    pub async fn read_from_file<C>(
        &self,
        path: &Path,
        consumer: &mut C,
        span: Option<Span<'_>>,
    ) -> FsResult<usize>
    where
        C: LineConsumer + ?Sized,
    {
        StreamingFileReader::new(&self.fs)
            .read_from_file(path, consumer, span)
            .await
    }

    /// Atomically replace `path` with `lines`. See
    /// [`AtomicFileWriter::write_to_file`].
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
        AtomicFileWriter::with_config(&self.fs, self.writer.clone())
            .write_to_file(path, lines, span)
            .await
    }

    /// Copy `from` to `to`, overwriting `to`.
    pub async fn copy_file(&self, from: &Path, to: &Path) -> FsResult<()> {
        require_path(from)?;
        require_path(to)?;
        self.fs
            .copy(from, to)
            .await
            .map_err(|e| FsError::from_io(IoOp::Copy, from, e))?;
        tracing::debug!(from = %from.display(), to = %to.display(), "copied");
        Ok(())
    }

    /// Rename `from` to `new_name` within the same directory. Fails if the
    /// destination already exists. Returns the new path.
    pub async fn rename_file(&self, from: &Path, new_name: &str) -> FsResult<PathBuf> {
        require_path(from)?;
        if from.file_name().is_none() {
            return Err(FsError::Setup(format!(
                "{} has no file name",
                from.display()
            )));
        }
        require_leaf(new_name)?;

        let to = from.with_file_name(new_name);
        self.fs
            .rename(from, &to, MoveMode::NoReplace)
            .await
            .map_err(|e| FsError::from_io(IoOp::Move, from, e))?;
        tracing::debug!(from = %from.display(), to = %to.display(), "renamed");
        Ok(to)
    }

    /// Remove a file. A missing file is an error.
    pub async fn remove_file(&self, path: &Path) -> FsResult<()> {
        require_path(path)?;
        self.fs
            .remove(path)
            .await
            .map_err(|e| FsError::from_io(IoOp::Remove, path, e))?;
        tracing::debug!(path = %path.display(), "removed");
        Ok(())
    }

    /// Stat a path. A missing path is not an error.
    pub async fn stat_file(&self, path: &Path) -> FsResult<Stat> {
        require_path(path)?;
        match self.fs.stat(path).await {
            Ok(metadata) => Ok(Stat::from_metadata(metadata)),
            Err(e) => match FsError::from_io(IoOp::Stat, path, e) {
                FsError::NotFound { .. } => Ok(Stat::missing()),
                other => Err(other),
            },
        }
    }
}

fn require_path(path: &Path) -> FsResult<()> {
    if path.as_os_str().is_empty() {
        return Err(FsError::Setup("empty path".to_string()));
    }
    Ok(())
}

/// `name` must be exactly one normal path component.
fn require_leaf(name: &str) -> FsResult<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(leaf)), None) if leaf == name => Ok(()),
        _ => Err(FsError::Setup(format!("invalid file name {name:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::eol::line_break;
    use crate::primitive::MemoryFs;

    fn disk_ops(dir: &Path) -> FileOps {
        FileOps::new().with_resolver(PathResolver::new(dir))
    }

    async fn read_all<P: FilePrimitive>(ops: &FileOps<P>, path: &Path) -> Vec<String> {
        let mut lines = Vec::new();
        let mut ended = false;
        let mut consumer = |line: Option<&str>| match line {
            Some(line) => lines.push(line.to_string()),
            None => ended = true,
        };
        ops.read_from_file(path, &mut consumer, None).await.unwrap();
        assert!(ended);
        lines
    }

    #[tokio::test]
    async fn test_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let ops = disk_ops(dir.path());
        let path = ops.resolve("round_trip.txt").unwrap();

        let cases: Vec<Vec<String>> = vec![
            Vec::new(),
            vec!["only line".to_string()],
            (0..200).map(|i| format!("line {i} {}", "é".repeat(300))).collect(),
        ];
        for lines in cases {
            ops.write_to_file(&path, lines.clone(), None).await.unwrap();
            assert_eq!(read_all(&ops, &path).await, lines);
            assert!(!dir.path().join("round_trip.txt.tmp").exists());
        }
    }

    #[tokio::test]
    async fn test_disk_target_content() {
        let dir = tempfile::tempdir().unwrap();
        let ops = disk_ops(dir.path());
        let path = dir.path().join("abc.txt");

        let report = ops.write_to_file(&path, ["a", "b", "c"], None).await.unwrap();

        let lb = line_break();
        assert_eq!(report.chunks_written, 1);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("a{lb}b{lb}c{lb}")
        );
    }

    #[tokio::test]
    async fn test_write_replaces_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("existing.txt");
        std::fs::write(&path, "old\ncontent\n").unwrap();
        let ops = disk_ops(dir.path());

        ops.write_to_file(&path, ["new"], None).await.unwrap();
        assert_eq!(read_all(&ops, &path).await, vec!["new"]);
    }

    #[tokio::test]
    async fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ops = disk_ops(dir.path());
        let path = dir.path().join("no_such_dir").join("f.txt");

        let err = ops.write_to_file(&path, ["a"], None).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_stat_missing_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let ops = disk_ops(dir.path());
        let missing = dir.path().join("nope");

        assert_eq!(ops.stat_file(&missing).await.unwrap(), Stat::missing());
        assert_eq!(ops.stat_file(&missing).await.unwrap(), Stat::missing());
    }

    #[tokio::test]
    async fn test_stat_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ops = disk_ops(dir.path());
        let file = dir.path().join("f.txt");
        std::fs::write(&file, "x").unwrap();

        let stat = ops.stat_file(&file).await.unwrap();
        assert!(stat.exists && stat.is_file && !stat.is_directory);
        assert!(stat.last_modified > UNIX_EPOCH);

        let stat = ops.stat_file(dir.path()).await.unwrap();
        assert!(stat.exists && stat.is_directory && !stat.is_file);
    }

    #[tokio::test]
    async fn test_remove_missing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ops = disk_ops(dir.path());

        let err = ops.remove_file(&dir.path().join("gone")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_remove_existing() {
        let dir = tempfile::tempdir().unwrap();
        let ops = disk_ops(dir.path());
        let path = dir.path().join("f");
        std::fs::write(&path, "x").unwrap();

        ops.remove_file(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_copy_overwrites_destination() {
        let dir = tempfile::tempdir().unwrap();
        let ops = disk_ops(dir.path());
        let from = dir.path().join("from");
        let to = dir.path().join("to");
        std::fs::write(&from, "source").unwrap();
        std::fs::write(&to, "stale").unwrap();

        ops.copy_file(&from, &to).await.unwrap();
        assert_eq!(std::fs::read_to_string(&to).unwrap(), "source");
        assert!(from.exists());

        let err = ops
            .copy_file(&dir.path().join("missing"), &to)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rename_within_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ops = disk_ops(dir.path());
        let from = dir.path().join("before.txt");
        std::fs::write(&from, "x").unwrap();

        let to = ops.rename_file(&from, "after.txt").await.unwrap();
        assert_eq!(to, dir.path().join("after.txt"));
        assert!(!from.exists());
        assert_eq!(std::fs::read_to_string(&to).unwrap(), "x");
    }

    #[tokio::test]
    async fn test_rename_refuses_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let ops = disk_ops(dir.path());
        let from = dir.path().join("a");
        let to = dir.path().join("b");
        std::fs::write(&from, "a").unwrap();
        std::fs::write(&to, "b").unwrap();

        let err = ops.rename_file(&from, "b").await.unwrap_err();
        assert!(matches!(err, FsError::Io { op: IoOp::Move, .. }));
        assert_eq!(std::fs::read_to_string(&to).unwrap(), "b");

        let err = ops
            .rename_file(&dir.path().join("missing"), "c")
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        // a missing source wins over an existing destination
        let err = ops
            .rename_file(&dir.path().join("missing"), "b")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_setup_failures() {
        let ops = FileOps::with_primitive(MemoryFs::new());
        ops.primitive().insert_file("/a", "a");

        for name in ["", "..", ".", "x/y", "/abs"] {
            let err = ops.rename_file(Path::new("/a"), name).await.unwrap_err();
            assert!(matches!(err, FsError::Setup(_)), "accepted {name:?}");
        }
        assert!(matches!(
            ops.remove_file(Path::new("")).await,
            Err(FsError::Setup(_))
        ));
        assert!(matches!(
            ops.stat_file(Path::new("")).await,
            Err(FsError::Setup(_))
        ));
        assert!(matches!(
            ops.write_to_file(Path::new("/"), ["a"], None).await,
            Err(FsError::Setup(_))
        ));
        assert!(ops.primitive().exists("/a"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stat_other_errors_surface() {
        let dir = tempfile::tempdir().unwrap();
        let ops = disk_ops(dir.path());
        let file = dir.path().join("plain");
        std::fs::write(&file, "x").unwrap();

        // ENOTDIR, not ENOENT
        let err = ops.stat_file(&file.join("child")).await.unwrap_err();
        assert!(matches!(err, FsError::Io { op: IoOp::Stat, .. }));
    }

    #[tokio::test]
    async fn test_directory_read_is_io_error() {
        let ops = FileOps::with_primitive(MemoryFs::new());
        ops.primitive().create_dir("/d");

        // MemoryFs reports reads of directories as plain I/O errors
        let mut consumer = |_: Option<&str>| {};
        let err = ops
            .read_from_file(Path::new("/d"), &mut consumer, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::Io { op: IoOp::Read, .. }));

        let stat = ops.stat_file(Path::new("/d")).await.unwrap();
        assert!(stat.is_directory);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_prior_target() {
        let fs = MemoryFs::new();
        fs.insert_file("/t", "keep\n");
        fs.fail_writes_after(1);
        let ops = FileOps::with_primitive(fs.clone()).with_writer_config(WriterConfig {
            chunk_threshold: 8,
            temp_suffix: ".tmp".to_string(),
        });

        let lines: Vec<String> = (0..10).map(|i| format!("line-{i}")).collect();
        assert!(ops.write_to_file(Path::new("/t"), lines, None).await.is_err());
        assert_eq!(fs.contents("/t"), Some(b"keep\n".to_vec()));
        assert_eq!(fs.write_calls(), 1);
    }
}
