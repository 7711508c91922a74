//! Engine tuning knobs.

use filedock_transfer::{DEFAULT_CHUNK_SIZE, DEFAULT_HASH_WINDOW, HashAlgorithm};
use serde::{Deserialize, Serialize};

use crate::error::UploadError;

/// Files strictly larger than this use the chunked path: 150 MiB.
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 150 * 1024 * 1024;

/// Chunk uploads in flight per file.
pub const DEFAULT_CHUNK_CONCURRENCY: usize = 5;

/// Files in flight per batch.
pub const DEFAULT_FILE_CONCURRENCY: usize = 5;

/// Upload engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadConfig {
    pub chunk_size: u64,
    pub large_file_threshold: u64,
    pub chunk_concurrency: usize,
    pub file_concurrency: usize,
    pub hash_window: usize,
    pub hash_algorithm: HashAlgorithm,
    /// Ask the server before each batch file whether its name is taken in
    /// the target directory, and fail the file if it is.
    pub check_duplicate_names: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            chunk_concurrency: DEFAULT_CHUNK_CONCURRENCY,
            file_concurrency: DEFAULT_FILE_CONCURRENCY,
            hash_window: DEFAULT_HASH_WINDOW,
            hash_algorithm: HashAlgorithm::default(),
            check_duplicate_names: false,
        }
    }
}

impl UploadConfig {
    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.chunk_size == 0 {
            return Err(UploadError::Planning("chunkSize must be > 0".into()));
        }
        if self.chunk_concurrency == 0 {
            return Err(UploadError::Planning("chunkConcurrency must be >= 1".into()));
        }
        if self.file_concurrency == 0 {
            return Err(UploadError::Planning("fileConcurrency must be >= 1".into()));
        }
        if self.hash_window == 0 {
            return Err(UploadError::Planning("hashWindow must be > 0".into()));
        }
        Ok(())
    }

    /// Returns `true` if a file of `size` bytes goes through the chunked path.
    pub fn is_large(&self, size: u64) -> bool {
        size > self.large_file_threshold
    }
}
