//! File System Abstraction
//!
//! Platform cache directories and async file I/O used by the persistent
//! model cache.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::{Platform, PlatformError, PlatformResult};

/// Async file handle for non-blocking operations
#[derive(Debug, Clone)]
pub struct AsyncFileHandle {
    path: PathBuf,
}

impl AsyncFileHandle {
    /// Create a handle for the given path (the file is not opened yet)
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the entire file asynchronously
    pub async fn read_all(&self) -> PlatformResult<Vec<u8>> {
        let mut file = tokio::fs::File::open(&self.path).await?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer).await?;
        Ok(buffer)
    }

    /// Read the entire file, returning `None` if it does not exist
    pub async fn read_if_exists(&self) -> PlatformResult<Option<Vec<u8>>> {
        match self.read_all().await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(PlatformError::FileIO(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write data to the file asynchronously
    pub async fn write_all(&self, data: &[u8]) -> PlatformResult<()> {
        let mut file = tokio::fs::File::create(&self.path).await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    /// Write data through a sibling temporary file and rename it into place.
    ///
    /// Readers observe either the previous contents or the new contents,
    /// never a truncated file.
    pub async fn write_atomic(&self, data: &[u8]) -> PlatformResult<()> {
        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        AsyncFileHandle::new(&tmp_path).write_all(data).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Remove the file. Returns false if it did not exist.
    pub async fn remove(&self) -> PlatformResult<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// File system abstraction
#[derive(Debug, Clone)]
pub struct FileSystem {
    /// Base cache directory
    cache_dir: PathBuf,
}

impl FileSystem {
    /// Create a new file system with the platform-appropriate cache directory
    pub fn new() -> Self {
        Self {
            cache_dir: Self::default_cache_dir(),
        }
    }

    /// Create a file system rooted at a custom cache directory
    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn default_cache_dir() -> PathBuf {
        match Platform::current() {
            Platform::Android => PathBuf::from("/data/data/com.tessera.app/cache"),
            Platform::Ios => PathBuf::from("./Caches"),
            Platform::Windows | Platform::Linux | Platform::MacOs => {
                let mut dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                dir.push("cache");
                dir
            }
            Platform::Unknown => PathBuf::from("./cache"),
        }
    }

    /// Get the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Resolve a path relative to the cache directory
    pub fn cache_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.cache_dir.join(path)
    }

    /// Create a directory and all parents, failing if the path is not a directory
    pub async fn ensure_dir(&self, path: impl AsRef<Path>) -> PlatformResult<()> {
        let path = path.as_ref();
        tokio::fs::create_dir_all(path).await?;
        let meta = tokio::fs::metadata(path).await?;
        if !meta.is_dir() {
            return Err(PlatformError::NotADirectory(path.display().to_string()));
        }
        Ok(())
    }

    /// List regular files in a directory carrying the given extension
    pub async fn list_files(
        &self,
        dir: impl AsRef<Path>,
        extension: &str,
    ) -> PlatformResult<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let matches = path
                .extension()
                .map(|ext| ext == extension)
                .unwrap_or(false);
            if matches && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Create an async file handle
    pub fn async_handle(&self, path: impl AsRef<Path>) -> AsyncFileHandle {
        AsyncFileHandle::new(path)
    }
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_system_creation() {
        let fs = FileSystem::new();
        assert!(!fs.cache_dir().as_os_str().is_empty());
    }

    #[test]
    fn test_path_resolution() {
        let fs = FileSystem::with_cache_dir(PathBuf::from("/tmp/tessera"));
        let path = fs.cache_path("models/a.json");
        assert!(path.ends_with("models/a.json"));
    }

    #[tokio::test]
    async fn test_atomic_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let handle = AsyncFileHandle::new(dir.path().join("record.json"));

        handle.write_atomic(b"{\"a\":1}").await.unwrap();
        handle.write_atomic(b"{\"a\":2}").await.unwrap();

        let content = handle.read_all().await.unwrap();
        assert_eq!(content, b"{\"a\":2}");
        assert!(!dir.path().join("record.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_remove_and_read_missing() {
        let dir = tempfile::tempdir().unwrap();
        let handle = AsyncFileHandle::new(dir.path().join("gone.json"));

        assert!(!handle.remove().await.unwrap());
        assert!(handle.read_if_exists().await.unwrap().is_none());

        handle.write_all(b"x").await.unwrap();
        assert!(handle.remove().await.unwrap());
        assert!(!dir.path().join("gone.json").exists());
    }

    #[tokio::test]
    async fn test_list_files_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let fs = FileSystem::with_cache_dir(dir.path().to_path_buf());

        std::fs::write(dir.path().join("b.json"), b"{}").unwrap();
        std::fs::write(dir.path().join("a.json"), b"{}").unwrap();
        std::fs::write(dir.path().join("c.json.tmp"), b"{}").unwrap();
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();

        let files = fs.list_files(dir.path(), "json").await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[tokio::test]
    async fn test_ensure_dir_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("occupied");
        std::fs::write(&file_path, b"not a dir").unwrap();

        let fs = FileSystem::with_cache_dir(dir.path().to_path_buf());
        assert!(fs.ensure_dir(&file_path).await.is_err());
        assert!(fs.ensure_dir(dir.path().join("fresh/nested")).await.is_ok());
    }
}
