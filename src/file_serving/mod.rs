pub mod cache;
pub mod handlers;
pub mod listing;
pub mod path_utils;
pub mod streamer;

use std::io;
use std::path::Path;
use std::time::SystemTime;

use thiserror::Error;

/// File served when a request resolves to a directory that contains one.
pub const DEFAULT_FILE: &str = "index.html";

/// Failure kinds for a single request. None of these outlive the request
/// that produced them.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Decode failure or a path escaping the serve root. Reported to the
    /// client exactly like a missing file.
    #[error("path rejected")]
    PathRejected,

    #[error("not found")]
    NotFound,

    /// The listing template could not be loaded. Only the triggering
    /// request fails; later requests retry the load.
    #[error("listing template unavailable: {0}")]
    Template(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ServeError>;

/// Stat snapshot taken once at dispatch time. Deliberately not re-checked
/// while streaming: a file mutated mid-transfer hashes as whatever bytes
/// were actually read.
#[derive(Debug, Clone, Copy)]
pub struct FileSnapshot {
    pub is_dir: bool,
    pub is_file: bool,
    pub len: u64,
    pub modified: SystemTime,
}

impl FileSnapshot {
    pub fn of(metadata: &std::fs::Metadata) -> io::Result<Self> {
        Ok(FileSnapshot {
            is_dir: metadata.is_dir(),
            is_file: metadata.is_file(),
            len: metadata.len(),
            modified: metadata.modified()?,
        })
    }
}

/// Extension-to-MIME lookup. Requests for unmapped extensions go out
/// without a `Content-Type` header.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    mime_guess::from_path(path).first_raw()
}
