//! Batch coordinator: many files, one concurrency cap.
//!
//! Each file runs through its own [`TransferOrchestrator`], so the chunk
//! cap applies per file on top of the batch cap. A failing file is
//! reported and the rest of the batch carries on.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use filedock_protocol::{MenuId, NameCheckQuery};
use filedock_transfer::{ProgressSink, WorkerPool};
use tracing::{debug, error, info};

use crate::config::UploadConfig;
use crate::error::UploadError;
use crate::job::TransferJob;
use crate::orchestrator::{TransferOrchestrator, average};
use crate::resolver::DirectoryResolver;
use crate::scanner::{validate_file_name, validate_relative_path};
use crate::server::StorageServer;
use crate::types::{BatchCallbacks, BatchFile, BatchSummary, FileReport, UploadOutcome};

/// Uploads a set of files under a shared concurrency cap.
pub struct BatchCoordinator<'a> {
    server: &'a dyn StorageServer,
    config: UploadConfig,
    resolver: DirectoryResolver,
    callbacks: BatchCallbacks,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(server: &'a dyn StorageServer, config: UploadConfig) -> Self {
        Self {
            server,
            config,
            resolver: DirectoryResolver::new().with_default(None),
            callbacks: BatchCallbacks::default(),
        }
    }

    /// Sets the directory mapping. Without one every file goes to the
    /// storage root.
    pub fn with_resolver(mut self, resolver: DirectoryResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_callbacks(mut self, callbacks: BatchCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Uploads every file and returns once all of them have finished.
    ///
    /// Only an unusable configuration fails the whole call; per-file
    /// failures end up in the summary.
    pub async fn run(&self, files: Vec<BatchFile>) -> Result<BatchSummary, UploadError> {
        self.config.validate()?;

        let started = Instant::now();
        let total = files.len();
        let completed = AtomicUsize::new(0);
        let reports = Mutex::new(Vec::with_capacity(total));
        info!(files = total, concurrency = self.config.file_concurrency, "batch started");

        let pool = WorkerPool::new(self.config.file_concurrency)?;
        pool.run(files, |file| {
            let completed = &completed;
            let reports = &reports;
            async move {
                let report = self.process_file(file).await;
                let done = completed.fetch_add(1, Ordering::AcqRel) + 1;
                reports
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .push(report);
                (self.callbacks.on_progress)(done, total);
                Ok::<_, UploadError>(ControlFlow::Continue(()))
            }
        })
        .await?;

        let files = reports
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let summary = summarize(files, started);
        info!(
            files = summary.total_files,
            succeeded = summary.succeeded,
            failed = summary.failed,
            total_bytes = summary.total_bytes,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            avg_file_ms = summary.avg_file_time.map(|d| d.as_millis() as u64),
            "batch finished"
        );
        for report in &summary.files {
            if let Ok(stats) = &report.result
                && stats.chunk_times.len() > 1
            {
                debug!(
                    file = %report.relative_path,
                    size = stats.file_size,
                    chunks = stats.total_chunks,
                    elapsed_ms = stats.total_time.as_millis() as u64,
                    avg_chunk_ms = stats.avg_chunk_time.map(|d| d.as_millis() as u64),
                    "chunked upload details"
                );
            }
        }
        Ok(summary)
    }

    async fn process_file(&self, file: BatchFile) -> FileReport {
        (self.callbacks.on_file_start)(&file);

        let result = self.upload_file(&file).await;
        let size = file.size();
        match result {
            Ok(outcome) => {
                (self.callbacks.on_file_complete)(&file, &outcome);
                FileReport {
                    relative_path: file.relative_path,
                    size,
                    result: Ok(outcome.stats),
                }
            }
            Err(e) => {
                error!(file = %file.relative_path, error = %e, "file upload failed");
                (self.callbacks.on_file_error)(&file, &e);
                FileReport {
                    relative_path: file.relative_path,
                    size,
                    result: Err(e.to_string()),
                }
            }
        }
    }

    async fn upload_file(&self, file: &BatchFile) -> Result<UploadOutcome, UploadError> {
        validate_relative_path(&file.relative_path)?;
        validate_file_name(file.file_name())?;
        let menu_id = self.resolver.resolve(file.directory())?;
        debug!(file = %file.relative_path, ?menu_id, "resolved target directory");
        if self.config.check_duplicate_names {
            self.ensure_name_free(menu_id, file.file_name()).await?;
        }

        let mut job = TransferJob::new(Arc::clone(&file.source), file.file_name(), menu_id);
        let on_progress = Arc::clone(&self.callbacks.on_file_progress);
        let sink_file = file.clone();
        let sink: ProgressSink = Arc::new(move |p| on_progress(&sink_file, p));

        TransferOrchestrator::new(self.server, &self.config)
            .upload(&mut job, Some(sink))
            .await
    }

    async fn ensure_name_free(
        &self,
        menu_id: Option<MenuId>,
        file_name: &str,
    ) -> Result<(), UploadError> {
        let query = NameCheckQuery::new(menu_id, file_name);
        let response = self.server.check_name_duplicate(&query).await?;
        if !response.is_ok() {
            return Err(UploadError::Protocol {
                operation: "checkNameDuplicate",
                code: response.code,
                message: response.message,
            });
        }
        if response.name_taken() {
            return Err(UploadError::NameTaken(file_name.to_string()));
        }
        Ok(())
    }
}

fn summarize(files: Vec<FileReport>, started: Instant) -> BatchSummary {
    let succeeded: Vec<_> = files.iter().filter_map(|r| r.result.as_ref().ok()).collect();
    BatchSummary {
        total_files: files.len(),
        succeeded: succeeded.len(),
        failed: files.len() - succeeded.len(),
        total_bytes: succeeded.iter().map(|s| s.file_size).sum(),
        elapsed: started.elapsed(),
        avg_file_time: average(succeeded.iter().map(|s| s.total_time)),
        files,
    }
}
