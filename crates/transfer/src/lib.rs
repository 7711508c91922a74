//! Building blocks of the chunked transfer engine.
//!
//! Everything in here is transport-agnostic: splitting a payload into byte
//! ranges, fingerprinting bytes, running many operations under a
//! concurrency cap, and turning chunk counts into a percentage.

mod hash;
mod plan;
mod progress;
mod scheduler;
mod source;
mod types;

pub use hash::{ContentHasher, HashAlgorithm, digest_bytes, hash_source};
pub use plan::{chunk_count, plan_chunks};
pub use progress::{ProgressAggregator, ProgressSink, chunk_percent};
pub use scheduler::{RunSummary, WorkerPool};
pub use source::{ByteSource, FileSource, MemorySource};
pub use types::{Chunk, ChunkStatus};

/// Default chunk size: 20 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 20 * 1024 * 1024;

/// Default read window used while hashing a whole file: 2 MiB.
///
/// Independent of the chunk size; it only bounds memory held per read.
pub const DEFAULT_HASH_WINDOW: usize = 2 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("planning error: {0}")]
    Planning(String),

    #[error("read error: {0}")]
    Hash(#[from] std::io::Error),
}
