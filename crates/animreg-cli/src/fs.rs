//! File system port
//!
//! The registry never touches the disk directly. [`TokioFs`] is the real
//! implementation; [`MemoryFs`] keeps files in a map so tests can run whole
//! registry workflows, including injected write failures.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Contents of `path`, or `None` when it does not exist
    async fn read_to_string(&self, path: &Path) -> io::Result<Option<String>>;

    /// Replace `path` so that readers see either the old or the new contents
    async fn write_atomic(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Delete `path`; `false` when it was already gone
    async fn remove_file(&self, path: &Path) -> io::Result<bool>;

    /// Regular files directly inside `dir`; empty when `dir` does not exist
    async fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    async fn exists(&self, path: &Path) -> io::Result<bool>;
}

/// Temporary sibling used for atomic replacement
pub fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", file_name))
}

/// Disk-backed file system on tokio's blocking pool
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

#[async_trait]
impl FileSystem for TokioFs {
    async fn read_to_string(&self, path: &Path) -> io::Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn write_atomic(&self, path: &Path, contents: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Atomic write: write to temp file then rename
        let temp_path = temp_path_for(path);
        if let Err(err) = tokio::fs::write(&temp_path, contents).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(err);
        }
        tokio::fs::rename(&temp_path, path).await
    }

    async fn remove_file(&self, path: &Path) -> io::Result<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    async fn exists(&self, path: &Path) -> io::Result<bool> {
        tokio::fs::try_exists(path).await
    }
}

/// In-memory file system
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: Mutex<BTreeMap<PathBuf, String>>,
    fail_writes: AtomicBool,
    fail_path: Mutex<Option<PathBuf>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files.lock().insert(path.into(), contents.into());
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().get(path.as_ref()).cloned()
    }

    pub fn remove(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().remove(path.as_ref())
    }

    /// Make every subsequent write fail until turned off again
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make writes to one path fail, leaving every other path writable
    pub fn set_fail_path(&self, path: Option<PathBuf>) {
        *self.fail_path.lock() = path;
    }

    fn write_rejected(&self, path: &Path) -> bool {
        self.fail_writes.load(Ordering::SeqCst) || self.fail_path.lock().as_deref() == Some(path)
    }
}

#[async_trait]
impl FileSystem for MemoryFs {
    async fn read_to_string(&self, path: &Path) -> io::Result<Option<String>> {
        Ok(self.get(path))
    }

    async fn write_atomic(&self, path: &Path, contents: &str) -> io::Result<()> {
        if self.write_rejected(path) {
            return Err(io::Error::other(format!(
                "write to {} rejected",
                path.display()
            )));
        }
        self.insert(path, contents);
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> io::Result<bool> {
        Ok(self.remove(path).is_some())
    }

    async fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .files
            .lock()
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .cloned()
            .collect())
    }

    async fn exists(&self, path: &Path) -> io::Result<bool> {
        Ok(self.files.lock().contains_key(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        assert_eq!(
            temp_path_for(Path::new("src/Root.tsx")),
            PathBuf::from("src/.Root.tsx.tmp")
        );
    }

    #[tokio::test]
    async fn test_tokio_fs_atomic_write_and_listing() {
        let Ok(dir) = tempfile::tempdir() else {
            return;
        };
        let fs = TokioFs;
        let modules = dir.path().join("animations");
        let file = modules.join("Orbs.tsx");

        assert!(fs.write_atomic(&file, "first").await.is_ok());
        assert!(fs.write_atomic(&file, "second").await.is_ok());
        assert_eq!(fs.read_to_string(&file).await.ok().flatten().as_deref(), Some("second"));
        assert!(!temp_path_for(&file).exists());

        let listed = fs.list_files(&modules).await.unwrap_or_default();
        assert_eq!(listed, vec![file.clone()]);

        assert!(fs.remove_file(&file).await.is_ok_and(|removed| removed));
        assert!(fs.remove_file(&file).await.is_ok_and(|removed| !removed));
        assert_eq!(fs.read_to_string(&file).await.ok().flatten(), None);
    }

    #[tokio::test]
    async fn test_tokio_fs_missing_dir_lists_nothing() {
        let Ok(dir) = tempfile::tempdir() else {
            return;
        };
        let listed = TokioFs.list_files(&dir.path().join("missing")).await;
        assert!(listed.is_ok_and(|files| files.is_empty()));
    }

    #[tokio::test]
    async fn test_memory_fs_lists_direct_children_only() {
        let fs = MemoryFs::new();
        fs.insert("src/animations/A.tsx", "a");
        fs.insert("src/animations/nested/B.tsx", "b");
        fs.insert("src/Root.tsx", "root");

        let listed = fs.list_files(Path::new("src/animations")).await.unwrap_or_default();
        assert_eq!(listed, vec![PathBuf::from("src/animations/A.tsx")]);
    }

    #[tokio::test]
    async fn test_memory_fs_write_failure_keeps_contents() {
        let fs = MemoryFs::new();
        fs.insert("src/Root.tsx", "old");
        fs.set_fail_writes(true);

        assert!(fs.write_atomic(Path::new("src/Root.tsx"), "new").await.is_err());
        assert_eq!(fs.get("src/Root.tsx").as_deref(), Some("old"));
    }
}
