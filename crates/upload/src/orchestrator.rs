//! Per-file transfer pipeline.
//!
//! Drives one [`TransferJob`] through plan, hash, the whole-file or
//! existence-check path, bounded chunk uploads and the final merge.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use filedock_protocol::{
    ApiResponse, ChunkUploadFields, ExistenceCheckRequest, MergeRequest, SimpleUploadFields,
};
use filedock_transfer::{
    Chunk, ChunkStatus, ProgressAggregator, ProgressSink, WorkerPool, hash_source, plan_chunks,
};
use tracing::{debug, info, warn};

use crate::config::UploadConfig;
use crate::error::UploadError;
use crate::job::{JobState, TransferJob};
use crate::server::StorageServer;
use crate::types::{ChunkTiming, UploadOutcome, UploadPath, UploadStats};

/// Uploads single files against a [`StorageServer`].
pub struct TransferOrchestrator<'a> {
    server: &'a dyn StorageServer,
    config: &'a UploadConfig,
}

/// State shared by the chunk uploads of one job.
struct ChunkRun {
    progress: Arc<ProgressAggregator>,
    server_complete: AtomicBool,
    deduplicated: Mutex<Option<ApiResponse>>,
    timings: Mutex<Vec<ChunkTiming>>,
}

impl<'a> TransferOrchestrator<'a> {
    pub fn new(server: &'a dyn StorageServer, config: &'a UploadConfig) -> Self {
        Self { server, config }
    }

    /// Uploads `job` to completion.
    ///
    /// `progress` receives a monotonic percentage; 100 is only reported
    /// once the server has confirmed the stored object. On error the job
    /// ends in [`JobState::Failed`].
    pub async fn upload(
        &self,
        job: &mut TransferJob,
        progress: Option<ProgressSink>,
    ) -> Result<UploadOutcome, UploadError> {
        let started = Instant::now();
        match self.run(job, progress, started).await {
            Ok(outcome) => {
                job.transition(JobState::Completed);
                info!(
                    file = %job.file_name(),
                    size = job.size(),
                    path = ?outcome.path,
                    chunks = outcome.stats.total_chunks,
                    elapsed_ms = outcome.stats.total_time.as_millis() as u64,
                    "upload completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(file = %job.file_name(), state = %job.state(), error = %e, "upload failed");
                job.transition(JobState::Failed);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        job: &mut TransferJob,
        progress: Option<ProgressSink>,
        started: Instant,
    ) -> Result<UploadOutcome, UploadError> {
        self.config.validate()?;
        if job.state() != JobState::Pending {
            return Err(UploadError::InvalidState(format!(
                "{} is {}, expected pending",
                job.file_name(),
                job.state()
            )));
        }

        let size = job.size();
        let large = self.config.is_large(size);
        job.set_planned(plan_chunks(size, self.config.chunk_size)?);

        let digest = hash_source(
            job.source(),
            self.config.hash_algorithm,
            self.config.hash_window,
        )
        .await?;
        job.set_hashed(digest);

        if !large {
            return self.upload_whole(job, progress, started).await;
        }

        if let Some(outcome) = self.check_existing(job, &progress, started).await? {
            return Ok(outcome);
        }

        job.transition(JobState::Uploading);
        let total = job.total_chunks();
        let run = ChunkRun {
            progress: Arc::new(ProgressAggregator::new(total, progress)),
            server_complete: AtomicBool::new(false),
            deduplicated: Mutex::new(None),
            timings: Mutex::new(Vec::with_capacity(total as usize)),
        };

        let pool = WorkerPool::new(self.config.chunk_concurrency)?;
        let shared: &TransferJob = job;
        let summary = pool
            .run(shared.chunks(), |chunk| self.upload_chunk(shared, &run, chunk))
            .await?;
        debug!(
            file = %job.file_name(),
            started = summary.started,
            completed = summary.completed,
            peak_in_flight = summary.peak_in_flight,
            stopped_early = summary.stopped_early,
            "chunk phase finished"
        );

        let timings = take(&run.timings);

        if let Some(response) = take(&run.deduplicated) {
            info!(file = %job.file_name(), "server deduplicated file during chunk upload");
            run.progress.finish();
            return Ok(UploadOutcome {
                path: UploadPath::Deduplicated,
                data: response.data_value(),
                message: response.message,
                stats: self.stats(job, started, total, timings),
            });
        }

        // The server flag wins; the local count covers a server that never sets it.
        let server_complete = run.server_complete.load(Ordering::Acquire);
        if !server_complete && !job.all_chunks_uploaded() {
            return Err(UploadError::Incomplete {
                uploaded: job.uploaded_chunks(),
                total,
            });
        }
        if !job.begin_merge() {
            return Err(UploadError::InvalidState(format!(
                "merge of {} already issued",
                job.file_name()
            )));
        }

        job.transition(JobState::Merging);
        let request = MergeRequest {
            file_name: job.file_name().to_string(),
            identifier: job_digest(job),
            total_size: size,
            menu_id: job.menu_id(),
        };
        let response = self.server.merge(&request).await?;
        if !response.is_ok() {
            return Err(UploadError::Protocol {
                operation: "mergeChunk",
                code: response.code,
                message: response.message,
            });
        }

        run.progress.finish();
        Ok(UploadOutcome {
            path: UploadPath::Chunked,
            data: response.data_value(),
            message: response.message,
            stats: self.stats(job, started, total, timings),
        })
    }

    /// Sends a file at or under the threshold in one request.
    async fn upload_whole(
        &self,
        job: &mut TransferJob,
        progress: Option<ProgressSink>,
        started: Instant,
    ) -> Result<UploadOutcome, UploadError> {
        job.transition(JobState::Uploading);
        let size = job.size();
        let data = read(job, 0, size).await?;
        let fields = SimpleUploadFields {
            file_name: job.file_name().to_string(),
            file_type: job.extension().to_string(),
            menu_id: job.menu_id(),
            identifier: job_digest(job),
        };

        let call_started = Instant::now();
        let response = self.server.upload_file(&fields, data).await?;
        let elapsed = call_started.elapsed();
        if !response.is_ok() {
            return Err(UploadError::Protocol {
                operation: "upload",
                code: response.code,
                message: response.message,
            });
        }

        ProgressAggregator::new(1, progress).finish();
        let timing = ChunkTiming {
            index: 0,
            size,
            elapsed,
        };
        Ok(UploadOutcome {
            path: UploadPath::Simple,
            data: response.data_value(),
            message: response.message,
            stats: self.stats(job, started, 1, vec![timing]),
        })
    }

    /// Asks whether the digest is already stored. `Some` short-circuits
    /// the job.
    async fn check_existing(
        &self,
        job: &mut TransferJob,
        progress: &Option<ProgressSink>,
        started: Instant,
    ) -> Result<Option<UploadOutcome>, UploadError> {
        let request = ExistenceCheckRequest::new(
            job_digest(job),
            job.file_name(),
            job.extension(),
            job.size(),
            job.menu_id(),
        );
        let response = self.server.check_exists(&request).await?;
        if !response.is_ok() {
            debug!(file = %job.file_name(), code = response.code, "file not stored yet");
            return Ok(None);
        }

        info!(file = %job.file_name(), "file already stored, skipping upload");
        job.transition(JobState::ExistsShortCircuit);
        ProgressAggregator::new(1, progress.clone()).finish();
        Ok(Some(UploadOutcome {
            path: UploadPath::Existing,
            data: response.data_value(),
            message: response.message,
            stats: self.stats(job, started, job.total_chunks(), Vec::new()),
        }))
    }

    /// Uploads one chunk. Never merges; a completion signal from the
    /// server only stops further chunks from starting.
    async fn upload_chunk(
        &self,
        job: &TransferJob,
        run: &ChunkRun,
        mut chunk: Chunk,
    ) -> Result<ControlFlow<()>, UploadError> {
        job.set_chunk_status(chunk.index, ChunkStatus::InFlight);
        let data = match read(job, chunk.offset, chunk.len).await {
            Ok(data) => data,
            Err(e) => {
                job.set_chunk_status(chunk.index, ChunkStatus::Failed);
                return Err(e);
            }
        };
        let digest = job_digest(job);
        let fields = ChunkUploadFields {
            chunk_identifier: ChunkUploadFields::chunk_identifier_for(&digest, chunk.index),
            identifier: digest,
            chunk_name: chunk
                .digest_with(self.config.hash_algorithm, &data)
                .to_string(),
            file_name: job.file_name().to_string(),
            file_type: job.extension().to_string(),
            chunk_number: chunk.index,
            current_chunk_size: chunk.len,
            total_chunks: job.total_chunks(),
            total_size: job.size(),
            menu_id: job.menu_id(),
        };

        let aggregator = Arc::clone(&run.progress);
        let sink: ProgressSink = Arc::new(move |p| aggregator.chunk_progress(p));

        let call_started = Instant::now();
        let response = self.server.upload_chunk(&fields, data, Some(sink)).await;
        let elapsed = call_started.elapsed();
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                chunk.status = ChunkStatus::Failed;
                job.update_chunk(&chunk);
                return Err(e);
            }
        };

        if response.is_fast_upload() {
            chunk.status = ChunkStatus::Done;
            job.update_chunk(&chunk);
            debug!(file = %job.file_name(), chunk = chunk.index, "fast upload signalled");
            *lock(&run.deduplicated) = Some(response);
            return Ok(ControlFlow::Break(()));
        }
        if !response.is_ok() {
            chunk.status = ChunkStatus::Failed;
            job.update_chunk(&chunk);
            return Err(UploadError::Protocol {
                operation: "uploadChunk",
                code: response.code,
                message: response.message,
            });
        }

        chunk.status = ChunkStatus::Done;
        job.update_chunk(&chunk);
        let uploaded = job.chunk_accepted();
        run.progress.chunk_done();
        lock(&run.timings).push(ChunkTiming {
            index: chunk.index,
            size: chunk.len,
            elapsed,
        });
        debug!(
            file = %job.file_name(),
            chunk = chunk.index,
            uploaded,
            total = job.total_chunks(),
            elapsed_ms = elapsed.as_millis() as u64,
            "chunk accepted"
        );

        if response.all_chunks_received() {
            run.server_complete.store(true, Ordering::Release);
            return Ok(ControlFlow::Break(()));
        }
        Ok(ControlFlow::Continue(()))
    }

    fn stats(
        &self,
        job: &TransferJob,
        started: Instant,
        total_chunks: u64,
        chunk_times: Vec<ChunkTiming>,
    ) -> UploadStats {
        let avg_chunk_time = average(chunk_times.iter().map(|t| t.elapsed));
        UploadStats {
            file_name: job.file_name().to_string(),
            file_size: job.size(),
            total_time: started.elapsed(),
            total_chunks,
            avg_chunk_time,
            chunk_times,
        }
    }
}

/// Mean of `durations`, `None` when empty.
pub(crate) fn average(durations: impl Iterator<Item = Duration>) -> Option<Duration> {
    let (sum, n) = durations.fold((Duration::ZERO, 0u32), |(sum, n), d| (sum + d, n + 1));
    (n > 0).then(|| sum / n)
}

async fn read(job: &TransferJob, offset: u64, len: u64) -> Result<Vec<u8>, UploadError> {
    let len = usize::try_from(len)
        .map_err(|_| UploadError::Planning(format!("range of {len} bytes too large")))?;
    job.source()
        .read_range(offset, len)
        .await
        .map_err(UploadError::Hash)
}

fn job_digest(job: &TransferJob) -> String {
    job.digest().unwrap_or_default().to_string()
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn take<T: Default>(m: &Mutex<T>) -> T {
    std::mem::take(&mut *lock(m))
}
