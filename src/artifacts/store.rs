//! Flat directory-tree key-value store for artifacts.

use std::io;
use std::path::PathBuf;
use tokio::fs;

use super::ArtifactKey;

/// Bytes plus the content type they were uploaded with. The flat store
/// persists bytes only; reads come back as `application/octet-stream`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Stores each artifact at `root/group/name/version/file_name`. Key
/// segments are validated at construction, so the store can never write
/// outside its root.
pub struct FlatFileStore {
    root: PathBuf,
}

impl FlatFileStore {
    pub fn new(root: PathBuf) -> Self {
        FlatFileStore { root }
    }

    fn directory_for(&self, key: &ArtifactKey) -> PathBuf {
        self.root
            .join(&key.group)
            .join(&key.name)
            .join(&key.version)
    }

    pub async fn put(&self, key: &ArtifactKey, content: &FileContent) -> io::Result<()> {
        let directory = self.directory_for(key);
        fs::create_dir_all(&directory).await?;
        fs::write(directory.join(&key.file_name), &content.bytes).await
    }

    pub async fn get(&self, key: &ArtifactKey) -> io::Result<FileContent> {
        let bytes = fs::read(self.directory_for(key).join(&key.file_name)).await?;
        Ok(FileContent {
            bytes,
            content_type: "application/octet-stream".to_string(),
        })
    }
}
