//! Data types for the upload flow.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use filedock_transfer::{ByteSource, FileSource, MemorySource};

use crate::error::UploadError;

/// Which route a successful upload took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPath {
    /// Small file sent in a single request.
    Simple,
    /// Existence check matched the digest; nothing was sent.
    Existing,
    /// Server recognised the file part-way through the chunk uploads.
    Deduplicated,
    /// All chunks uploaded and merged.
    Chunked,
}

/// Timing of one accepted chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkTiming {
    pub index: u64,
    pub size: u64,
    pub elapsed: Duration,
}

/// Per-file statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadStats {
    pub file_name: String,
    pub file_size: u64,
    pub total_time: Duration,
    /// Planned chunk count for a large file (including chunks the server
    /// made unnecessary), 1 for a whole-file upload.
    pub total_chunks: u64,
    pub avg_chunk_time: Option<Duration>,
    /// Accepted chunks in completion order.
    pub chunk_times: Vec<ChunkTiming>,
}

/// Result of a successful file upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub path: UploadPath,
    /// Server payload of the final response (stored-object metadata).
    pub data: serde_json::Value,
    /// Server message of the final response.
    pub message: String,
    pub stats: UploadStats,
}

/// One file of a batch: where its bytes come from and where it sits
/// relative to the batch root (`/`-separated).
#[derive(Clone)]
pub struct BatchFile {
    pub relative_path: String,
    pub source: Arc<dyn ByteSource>,
}

impl BatchFile {
    pub fn new(relative_path: impl Into<String>, source: Arc<dyn ByteSource>) -> Self {
        Self {
            relative_path: relative_path.into(),
            source,
        }
    }

    /// Opens a file on disk.
    pub async fn from_path(
        relative_path: impl Into<String>,
        path: &Path,
    ) -> Result<Self, UploadError> {
        let source = FileSource::open(path).await?;
        Ok(Self::new(relative_path, Arc::new(source)))
    }

    /// Wraps an in-memory buffer.
    pub fn in_memory(relative_path: impl Into<String>, data: Vec<u8>) -> Self {
        Self::new(relative_path, Arc::new(MemorySource::new(data)))
    }

    /// Last path segment.
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.relative_path)
    }

    /// Directory part of the relative path (`""` for a root-level file).
    pub fn directory(&self) -> &str {
        self.relative_path
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or_default()
    }

    pub fn size(&self) -> u64 {
        self.source.len()
    }
}

impl fmt::Debug for BatchFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchFile")
            .field("relative_path", &self.relative_path)
            .field("size", &self.size())
            .finish()
    }
}

/// Outcome of one file within a batch.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub relative_path: String,
    pub size: u64,
    pub result: Result<UploadStats, String>,
}

impl FileReport {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Batch totals, produced once every file has finished.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Bytes of successfully uploaded files.
    pub total_bytes: u64,
    pub elapsed: Duration,
    /// Mean upload time over successful files.
    pub avg_file_time: Option<Duration>,
    /// Reports in completion order.
    pub files: Vec<FileReport>,
}

pub type FileCallback = Arc<dyn Fn(&BatchFile) + Send + Sync>;
pub type FileProgressCallback = Arc<dyn Fn(&BatchFile, u8) + Send + Sync>;
pub type FileCompleteCallback = Arc<dyn Fn(&BatchFile, &UploadOutcome) + Send + Sync>;
pub type FileErrorCallback = Arc<dyn Fn(&BatchFile, &UploadError) + Send + Sync>;
pub type BatchProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Observers of a batch run. Every callback defaults to a no-op.
#[derive(Clone)]
pub struct BatchCallbacks {
    /// `(completed_files, total_files)` after each file finishes.
    pub on_progress: BatchProgressCallback,
    pub on_file_start: FileCallback,
    /// Per-file percentage, monotonic, 100 only on confirmed success.
    pub on_file_progress: FileProgressCallback,
    pub on_file_complete: FileCompleteCallback,
    pub on_file_error: FileErrorCallback,
}

impl Default for BatchCallbacks {
    fn default() -> Self {
        Self {
            on_progress: Arc::new(|_, _| {}),
            on_file_start: Arc::new(|_| {}),
            on_file_progress: Arc::new(|_, _| {}),
            on_file_complete: Arc::new(|_, _| {}),
            on_file_error: Arc::new(|_, _| {}),
        }
    }
}

impl BatchCallbacks {
    pub fn on_progress(mut self, f: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.on_progress = Arc::new(f);
        self
    }

    pub fn on_file_start(mut self, f: impl Fn(&BatchFile) + Send + Sync + 'static) -> Self {
        self.on_file_start = Arc::new(f);
        self
    }

    pub fn on_file_progress(mut self, f: impl Fn(&BatchFile, u8) + Send + Sync + 'static) -> Self {
        self.on_file_progress = Arc::new(f);
        self
    }

    pub fn on_file_complete(
        mut self,
        f: impl Fn(&BatchFile, &UploadOutcome) + Send + Sync + 'static,
    ) -> Self {
        self.on_file_complete = Arc::new(f);
        self
    }

    pub fn on_file_error(
        mut self,
        f: impl Fn(&BatchFile, &UploadError) + Send + Sync + 'static,
    ) -> Self {
        self.on_file_error = Arc::new(f);
        self
    }
}
