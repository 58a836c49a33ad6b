//! Filesystem object store.
//!
//! Treats a local directory as the artifact store: every regular file below
//! the root is an entry whose path is its `/`-joined relative path.
//!
//! ```text
//! <root>/
//! ├── worksheet-1/
//! │   ├── original-text.txt
//! │   ├── simplified-text.txt
//! │   ├── translated-text.json
//! │   ├── audio.mp3
//! │   └── image-1.png
//! └── worksheet-2/
//!     └── original-text.txt
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{ObjectStore, StoreEntry, StoreError};
use crate::domain::channel::SEPARATOR;

/// Object store rooted at a local directory
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a store path onto the filesystem, rejecting escapes from the root
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let mut resolved = self.root.clone();
        for segment in path.split(SEPARATOR) {
            if segment.is_empty() || segment == "." || segment == ".." {
                return None;
            }
            resolved.push(segment);
        }
        Some(resolved)
    }

    /// Recursively collect file paths relative to the root
    async fn walk(&self) -> std::io::Result<Vec<String>> {
        let mut paths = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, relative)) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;

            while let Some(entry) = entries.next_entry().await? {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                let path = if relative.is_empty() {
                    name
                } else {
                    format!("{}{}{}", relative, SEPARATOR, name)
                };

                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push((entry.path(), path));
                } else if file_type.is_file() {
                    paths.push(path);
                }
            }
        }

        // read_dir order is platform-defined; sort for a stable listing
        paths.sort();
        Ok(paths)
    }
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<StoreEntry>, StoreError> {
        if !self.root.is_dir() {
            return Err(StoreError::list(
                prefix,
                format!("store root is not a directory: {}", self.root.display()),
            ));
        }

        let paths = self.walk().await.map_err(|e| StoreError::list(prefix, e))?;
        let prefix = prefix.unwrap_or_default();

        Ok(paths
            .into_iter()
            .filter(|p| p.starts_with(prefix))
            .map(StoreEntry::new)
            .collect())
    }

    async fn fetch_text(&self, path: &str) -> Result<String, StoreError> {
        let file = self
            .resolve(path)
            .ok_or_else(|| StoreError::fetch(path, "invalid path"))?;

        fs::read_to_string(&file)
            .await
            .map_err(|e| StoreError::fetch(path, e))
    }

    fn fetch_ref(&self, path: &str) -> String {
        match self.resolve(path) {
            Some(file) => format!("file://{}", file.display()),
            None => format!("file://{}", self.root.display()),
        }
    }
}
