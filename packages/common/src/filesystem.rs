use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::error::{CommonError, CommonResult};

/// Whole-file backing store for persisted documents.
///
/// Implementations are driven from a single-threaded event loop, so the
/// returned futures are not required to be `Send`.
pub trait FileSystem {
    /// Read the full contents of a file
    fn read<'a>(&'a self, path: &'a Path) -> LocalBoxFuture<'a, CommonResult<Vec<u8>>>;

    /// Replace the full contents of a file
    fn write<'a>(&'a self, path: &'a Path, contents: &'a [u8])
        -> LocalBoxFuture<'a, CommonResult<()>>;

    /// Delete a file
    fn remove<'a>(&'a self, path: &'a Path) -> LocalBoxFuture<'a, CommonResult<()>>;

    /// Check if a file exists
    fn exists(&self, path: &Path) -> bool;

    /// Read a file and decode it as UTF-8
    fn read_to_string<'a>(&'a self, path: &'a Path) -> LocalBoxFuture<'a, CommonResult<String>> {
        self.read(path)
            .map(|bytes| {
                let bytes = bytes?;
                String::from_utf8(bytes).map_err(|err| CommonError::Generic(err.to_string()))
            })
            .boxed_local()
    }
}

/// Real file system implementation backed by `tokio::fs`
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read<'a>(&'a self, path: &'a Path) -> LocalBoxFuture<'a, CommonResult<Vec<u8>>> {
        async move {
            match tokio::fs::read(path).await {
                Ok(bytes) => Ok(bytes),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    Err(CommonError::NotFound(path.to_path_buf()))
                }
                Err(err) => Err(err.into()),
            }
        }
        .boxed_local()
    }

    fn write<'a>(
        &'a self,
        path: &'a Path,
        contents: &'a [u8],
    ) -> LocalBoxFuture<'a, CommonResult<()>> {
        async move {
            tokio::fs::write(path, contents).await?;
            Ok(())
        }
        .boxed_local()
    }

    fn remove<'a>(&'a self, path: &'a Path) -> LocalBoxFuture<'a, CommonResult<()>> {
        async move {
            match tokio::fs::remove_file(path).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    Err(CommonError::NotFound(path.to_path_buf()))
                }
                Err(err) => Err(err.into()),
            }
        }
        .boxed_local()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// In-memory file system for tests and headless sessions
#[derive(Debug, Default)]
pub struct MockFileSystem {
    files: RefCell<HashMap<PathBuf, Vec<u8>>>,
    fail_writes: Cell<bool>,
    writes: Cell<usize>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`MockFileSystem::add_file`]
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.add_file(path, contents);
        self
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files.borrow_mut().insert(path.into(), contents.into());
    }

    /// Current contents of a file as UTF-8, if present
    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files
            .borrow()
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Make every subsequent write fail until reset
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl FileSystem for MockFileSystem {
    fn read<'a>(&'a self, path: &'a Path) -> LocalBoxFuture<'a, CommonResult<Vec<u8>>> {
        let result = self
            .files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| CommonError::NotFound(path.to_path_buf()));
        future::ready(result).boxed_local()
    }

    fn write<'a>(
        &'a self,
        path: &'a Path,
        contents: &'a [u8],
    ) -> LocalBoxFuture<'a, CommonResult<()>> {
        let result = if self.fail_writes.get() {
            Err(CommonError::WriteRejected(path.to_path_buf()))
        } else {
            self.files
                .borrow_mut()
                .insert(path.to_path_buf(), contents.to_vec());
            self.writes.set(self.writes.get() + 1);
            Ok(())
        };
        future::ready(result).boxed_local()
    }

    fn remove<'a>(&'a self, path: &'a Path) -> LocalBoxFuture<'a, CommonResult<()>> {
        let result = match self.files.borrow_mut().remove(path) {
            Some(_) => Ok(()),
            None => Err(CommonError::NotFound(path.to_path_buf())),
        };
        future::ready(result).boxed_local()
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_round_trip() {
        let fs = MockFileSystem::new().with_file("/a.json", "{}");
        assert!(fs.exists(Path::new("/a.json")));

        fs.write(Path::new("/a.json"), b"{ \"x\": 1 }").await.unwrap();
        let text = fs.read_to_string(Path::new("/a.json")).await.unwrap();
        assert_eq!(text, "{ \"x\": 1 }");
        assert_eq!(fs.write_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_write_failure() {
        let fs = MockFileSystem::new().with_file("/a.json", "{}");
        fs.set_fail_writes(true);

        let err = fs.write(Path::new("/a.json"), b"[]").await.unwrap_err();
        assert!(matches!(err, CommonError::WriteRejected(_)));
        assert_eq!(fs.contents(Path::new("/a.json")).as_deref(), Some("{}"));
        assert_eq!(fs.write_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_missing_file() {
        let fs = MockFileSystem::new();
        let err = fs.read(Path::new("/missing.json")).await.unwrap_err();
        assert!(matches!(err, CommonError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_real_file_system() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");

        let fs = RealFileSystem;
        assert!(!fs.exists(&path));
        fs.write(&path, b"{}").await.unwrap();
        assert!(fs.exists(&path));
        assert_eq!(fs.read_to_string(&path).await.unwrap(), "{}");

        fs.remove(&path).await.unwrap();
        assert!(!fs.exists(&path));
        assert!(matches!(fs.remove(&path).await, Err(CommonError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mock_remove() {
        let fs = MockFileSystem::new().with_file("/a.json", "{}");
        fs.remove(Path::new("/a.json")).await.unwrap();
        assert!(!fs.exists(Path::new("/a.json")));
        assert!(fs.remove(Path::new("/a.json")).await.is_err());
    }
}
