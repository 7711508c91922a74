//! One file transfer and its state machine.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use filedock_protocol::MenuId;
use filedock_transfer::{ByteSource, Chunk, ChunkStatus};
use tracing::{debug, warn};

/// Lifecycle of a [`TransferJob`].
///
/// `Pending → Planned → Hashed → {ExistsShortCircuit | Uploading} →
/// Merging → Completed`; `Failed` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Planned,
    Hashed,
    ExistsShortCircuit,
    Uploading,
    Merging,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Planned => "planned",
            JobState::Hashed => "hashed",
            JobState::ExistsShortCircuit => "exists",
            JobState::Uploading => "uploading",
            JobState::Merging => "merging",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A single file transfer, owned by the orchestrator run handling it.
pub struct TransferJob {
    source: Arc<dyn ByteSource>,
    file_name: String,
    extension: String,
    menu_id: Option<MenuId>,
    digest: Option<String>,
    state: JobState,
    chunks: Mutex<Vec<Chunk>>,
    total_chunks: u64,
    uploaded_chunks: AtomicU64,
    merge_triggered: AtomicBool,
}

impl TransferJob {
    pub fn new(
        source: Arc<dyn ByteSource>,
        file_name: impl Into<String>,
        menu_id: Option<MenuId>,
    ) -> Self {
        let file_name = file_name.into();
        let extension = file_extension(&file_name).to_string();
        Self {
            source,
            file_name,
            extension,
            menu_id,
            digest: None,
            state: JobState::Pending,
            chunks: Mutex::new(Vec::new()),
            total_chunks: 0,
            uploaded_chunks: AtomicU64::new(0),
            merge_triggered: AtomicBool::new(false),
        }
    }

    pub fn source(&self) -> &dyn ByteSource {
        self.source.as_ref()
    }

    pub fn size(&self) -> u64 {
        self.source.len()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn menu_id(&self) -> Option<MenuId> {
        self.menu_id
    }

    /// Whole-file digest, available from `Hashed` on.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Planned chunk count; 0 for an empty file.
    pub fn total_chunks(&self) -> u64 {
        self.total_chunks
    }

    /// Chunks the server has accepted.
    pub fn uploaded_chunks(&self) -> u64 {
        self.uploaded_chunks.load(Ordering::Acquire)
    }

    /// Returns `true` once every planned chunk has been accepted.
    pub fn all_chunks_uploaded(&self) -> bool {
        self.uploaded_chunks() >= self.total_chunks
    }

    /// Snapshot of the planned chunks with their current status and digest.
    pub fn chunks(&self) -> Vec<Chunk> {
        self.lock_chunks().clone()
    }

    /// Status of chunk `index`, if it was planned.
    pub fn chunk_status(&self, index: u64) -> Option<ChunkStatus> {
        self.lock_chunks()
            .get(index as usize)
            .map(|c| c.status)
    }

    pub fn merge_triggered(&self) -> bool {
        self.merge_triggered.load(Ordering::Acquire)
    }

    pub(crate) fn set_planned(&mut self, chunks: Vec<Chunk>) {
        self.total_chunks = chunks.len() as u64;
        *self.lock_chunks() = chunks;
        self.transition(JobState::Planned);
    }

    pub(crate) fn set_chunk_status(&self, index: u64, status: ChunkStatus) {
        if let Some(chunk) = self.lock_chunks().get_mut(index as usize) {
            chunk.status = status;
        }
    }

    /// Stores `chunk` (status and digest) back into the plan.
    pub(crate) fn update_chunk(&self, chunk: &Chunk) {
        if let Some(slot) = self.lock_chunks().get_mut(chunk.index as usize) {
            *slot = chunk.clone();
        }
    }

    /// Counts one accepted chunk and returns the new total.
    pub(crate) fn chunk_accepted(&self) -> u64 {
        self.uploaded_chunks.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn lock_chunks(&self) -> MutexGuard<'_, Vec<Chunk>> {
        self.chunks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn set_hashed(&mut self, digest: String) {
        self.digest = Some(digest);
        self.transition(JobState::Hashed);
    }

    /// Claims the single merge call of this job. Returns `false` if it was
    /// already claimed.
    pub(crate) fn begin_merge(&self) -> bool {
        !self.merge_triggered.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn transition(&mut self, next: JobState) {
        if self.state.is_terminal() {
            warn!(file = %self.file_name, from = %self.state, to = %next, "ignoring transition out of terminal state");
            return;
        }
        debug!(file = %self.file_name, from = %self.state, to = %next, "job state");
        self.state = next;
    }
}

impl fmt::Debug for TransferJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferJob")
            .field("file_name", &self.file_name)
            .field("size", &self.size())
            .field("menu_id", &self.menu_id)
            .field("digest", &self.digest)
            .field("state", &self.state)
            .field("total_chunks", &self.total_chunks)
            .field("uploaded_chunks", &self.uploaded_chunks())
            .finish()
    }
}

/// Text after the last `.` of a file name, or `""` if there is none.
pub fn file_extension(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or_default()
}
