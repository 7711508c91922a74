//! Upload orchestration for the filedock storage server.
//!
//! This crate implements the **business logic** of getting local files
//! into remote storage. It has no transport dependency: callers provide a
//! [`StorageServer`] implementation (see `filedock-http`) and the crate
//! drives it.
//!
//! # Pipeline (per file)
//!
//! 1. **Plan**: split the file into chunk ranges
//! 2. **Hash**: compute the whole-file digest
//! 3. **Small file**: one whole-file upload, done
//! 4. **Check**: ask whether the digest is already stored
//! 5. **Upload**: send chunks under a concurrency cap
//! 6. **Merge**: ask the server to assemble the chunks
//!
//! [`BatchCoordinator`] runs that pipeline over many files at once.

pub mod batch;
pub mod config;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod resolver;
pub mod scanner;
pub mod server;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

// Re-export primary types for convenience.
pub use batch::BatchCoordinator;
pub use config::UploadConfig;
pub use error::UploadError;
pub use job::{JobState, TransferJob};
pub use orchestrator::TransferOrchestrator;
pub use resolver::DirectoryResolver;
pub use scanner::{scan_directory, validate_relative_path};
pub use server::StorageServer;
pub use types::{
    BatchCallbacks, BatchFile, BatchSummary, ChunkTiming, FileReport, UploadOutcome, UploadPath,
    UploadStats,
};
