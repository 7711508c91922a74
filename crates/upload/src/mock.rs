//! In-memory `StorageServer` for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use filedock_protocol::{
    ApiResponse, CODE_FAST_UPLOAD, ChunkUploadFields, ExistenceCheckRequest, MergeRequest,
    NameCheckQuery, SimpleUploadFields,
};
use filedock_transfer::ProgressSink;
use serde_json::json;

use crate::error::UploadError;
use crate::server::{ServerFuture, StorageServer};

/// A recorded server call.
#[derive(Debug, Clone)]
pub(crate) enum Call {
    CheckExists(ExistenceCheckRequest),
    UploadFile(SimpleUploadFields, usize),
    UploadChunk(ChunkUploadFields, usize),
    Merge(MergeRequest),
    CheckName(NameCheckQuery),
}

/// Behaves like the storage server: chunks are counted per identifier and
/// the response to the last missing chunk carries `data: true`.
#[derive(Default)]
pub(crate) struct MockServer {
    calls: Mutex<Vec<Call>>,
    received: Mutex<HashMap<String, HashSet<u64>>>,
    existing: bool,
    always_complete: bool,
    never_complete: bool,
    chunk_codes: HashMap<u64, i32>,
    failing_files: HashSet<String>,
    merge_code: Option<i32>,
    delay: Option<Duration>,
    reversed_delay: Option<Duration>,
    taken_names: HashSet<String>,
    chunks_in_flight: AtomicUsize,
    peak_chunks: AtomicUsize,
    files_in_flight: AtomicUsize,
    peak_files: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::AcqRel) + 1;
        peak.fetch_max(now, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl MockServer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Existence checks report the file as already stored.
    pub(crate) fn with_existing(mut self) -> Self {
        self.existing = true;
        self
    }

    /// Every accepted chunk reports `data: true`.
    pub(crate) fn with_always_complete(mut self) -> Self {
        self.always_complete = true;
        self
    }

    /// Accepted chunks never report `data: true`, even the last one.
    pub(crate) fn with_no_completion_flag(mut self) -> Self {
        self.never_complete = true;
        self
    }

    /// The upload of chunk `index` answers with `code`.
    pub(crate) fn with_chunk_code(mut self, index: u64, code: i32) -> Self {
        self.chunk_codes.insert(index, code);
        self
    }

    /// Every upload of `file_name` is rejected with code 500.
    pub(crate) fn with_failing_file(mut self, file_name: &str) -> Self {
        self.failing_files.insert(file_name.to_string());
        self
    }

    pub(crate) fn with_merge_code(mut self, code: i32) -> Self {
        self.merge_code = Some(code);
        self
    }

    /// Upload calls take `delay` before answering.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Chunk `n` of `total` waits `step * (total - n)`, so later chunks
    /// answer first.
    pub(crate) fn with_reversed_delay(mut self, step: Duration) -> Self {
        self.reversed_delay = Some(step);
        self
    }

    /// Name checks report `file_name` as taken in every directory.
    pub(crate) fn with_taken_name(mut self, file_name: &str) -> Self {
        self.taken_names.insert(file_name.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn existence_checks(&self) -> Vec<ExistenceCheckRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CheckExists(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn file_uploads(&self) -> Vec<(SimpleUploadFields, usize)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::UploadFile(fields, len) => Some((fields, len)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn name_checks(&self) -> Vec<NameCheckQuery> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CheckName(query) => Some(query),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn chunk_uploads(&self) -> Vec<(ChunkUploadFields, usize)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::UploadChunk(fields, len) => Some((fields, len)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn merges(&self) -> Vec<MergeRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Merge(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn peak_chunks(&self) -> usize {
        self.peak_chunks.load(Ordering::Acquire)
    }

    pub(crate) fn peak_files(&self) -> usize {
        self.peak_files.load(Ordering::Acquire)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn stored(name: &str) -> serde_json::Value {
        json!({ "name": name, "url": format!("https://files.example/{name}") })
    }
}

impl StorageServer for MockServer {
    fn check_exists(&self, request: &ExistenceCheckRequest) -> ServerFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            self.record(Call::CheckExists(request.clone()));
            if self.existing {
                Ok(ApiResponse::ok(&Self::stored(&request.file_name))?)
            } else {
                Ok(ApiResponse::error(404, "file not found"))
            }
        })
    }

    fn upload_file(&self, fields: &SimpleUploadFields, data: Vec<u8>) -> ServerFuture<'_> {
        let fields = fields.clone();
        Box::pin(async move {
            let _guard = InFlight::enter(&self.files_in_flight, &self.peak_files);
            self.record(Call::UploadFile(fields.clone(), data.len()));
            self.pause().await;
            if self.failing_files.contains(&fields.file_name) {
                return Ok(ApiResponse::error(500, "disk full"));
            }
            Ok(ApiResponse::ok(&Self::stored(&fields.file_name))?)
        })
    }

    fn upload_chunk(
        &self,
        fields: &ChunkUploadFields,
        data: Vec<u8>,
        progress: Option<ProgressSink>,
    ) -> ServerFuture<'_> {
        let fields = fields.clone();
        Box::pin(async move {
            let _guard = InFlight::enter(&self.chunks_in_flight, &self.peak_chunks);
            self.record(Call::UploadChunk(fields.clone(), data.len()));
            if let Some(sink) = &progress {
                sink(50);
            }
            self.pause().await;
            if let Some(step) = self.reversed_delay {
                let remaining = fields.total_chunks.saturating_sub(fields.chunk_number);
                tokio::time::sleep(step * remaining as u32).await;
            }
            if let Some(sink) = &progress {
                sink(100);
            }

            if self.failing_files.contains(&fields.file_name) {
                return Ok(ApiResponse::error(500, "disk full"));
            }
            match self.chunk_codes.get(&fields.chunk_number) {
                Some(&CODE_FAST_UPLOAD) => {
                    return Ok(ApiResponse::new(
                        CODE_FAST_UPLOAD,
                        "fast upload",
                        Some(&Self::stored(&fields.file_name)),
                    )?);
                }
                Some(&code) => return Ok(ApiResponse::error(code, "chunk rejected")),
                None => {}
            }

            let complete = {
                let mut received = self.received.lock().unwrap();
                let seen = received.entry(fields.identifier.clone()).or_default();
                seen.insert(fields.chunk_number);
                seen.len() as u64 == fields.total_chunks
            };
            let flag = (complete || self.always_complete) && !self.never_complete;
            Ok(ApiResponse::ok(&flag)?)
        })
    }

    fn merge(&self, request: &MergeRequest) -> ServerFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            self.record(Call::Merge(request.clone()));
            match self.merge_code {
                Some(code) => Ok(ApiResponse::error(code, "merge failed")),
                None => Ok(ApiResponse::ok(&Self::stored(&request.file_name))?),
            }
        })
    }

    fn check_name_duplicate(&self, query: &NameCheckQuery) -> ServerFuture<'_> {
        let query = query.clone();
        Box::pin(async move {
            self.record(Call::CheckName(query.clone()));
            Ok(ApiResponse::ok(&self.taken_names.contains(&query.file_name))?)
        })
    }
}

/// A server whose chunk endpoint is unreachable.
pub(crate) struct OfflineServer;

impl StorageServer for OfflineServer {
    fn check_exists(&self, _request: &ExistenceCheckRequest) -> ServerFuture<'_> {
        Box::pin(async { Ok(ApiResponse::error(404, "file not found")) })
    }

    fn upload_file(&self, _fields: &SimpleUploadFields, _data: Vec<u8>) -> ServerFuture<'_> {
        Box::pin(async { Err(UploadError::Transport("connection refused".into())) })
    }

    fn upload_chunk(
        &self,
        _fields: &ChunkUploadFields,
        _data: Vec<u8>,
        _progress: Option<ProgressSink>,
    ) -> ServerFuture<'_> {
        Box::pin(async { Err(UploadError::Transport("connection refused".into())) })
    }

    fn merge(&self, _request: &MergeRequest) -> ServerFuture<'_> {
        Box::pin(async { Err(UploadError::Transport("connection refused".into())) })
    }

    fn check_name_duplicate(&self, _query: &NameCheckQuery) -> ServerFuture<'_> {
        Box::pin(async { Err(UploadError::Transport("connection refused".into())) })
    }
}
