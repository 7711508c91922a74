use crate::hash::{HashAlgorithm, digest_bytes};

/// Upload status of a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkStatus {
    #[default]
    Pending,
    InFlight,
    Done,
    Failed,
}

/// A contiguous byte range of a file, the unit of independent upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 0-based position within the file.
    pub index: u64,
    /// Byte offset within the file.
    pub offset: u64,
    /// Length of this range in bytes.
    pub len: u64,
    /// Upload status, advanced by whoever owns the chunk.
    pub status: ChunkStatus,
    digest: Option<String>,
}

impl Chunk {
    pub fn new(index: u64, offset: u64, len: u64) -> Self {
        Self {
            index,
            offset,
            len,
            status: ChunkStatus::Pending,
            digest: None,
        }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }

    /// The chunk digest, if it has been computed.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Computes the digest of `data` (this chunk's bytes) on first call.
    ///
    /// Later calls return the stored value unchanged.
    pub fn digest_with(&mut self, algorithm: HashAlgorithm, data: &[u8]) -> &str {
        self.digest
            .get_or_insert_with(|| digest_bytes(algorithm, data))
            .as_str()
    }
}
