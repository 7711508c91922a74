use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::TransferError;
use crate::source::ByteSource;

/// Digest used to fingerprint file and chunk contents.
///
/// The storage server keys deduplication on MD5; SHA-256 is available for
/// servers that accept it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl HashAlgorithm {
    /// Length of the hex-encoded digest.
    pub fn hex_len(self) -> usize {
        match self {
            HashAlgorithm::Md5 => 32,
            HashAlgorithm::Sha256 => 64,
        }
    }
}

/// Incremental digest accumulator.
///
/// Feeding the same bytes in any split produces the same digest.
pub struct ContentHasher {
    inner: HasherInner,
}

enum HasherInner {
    Md5(Md5),
    Sha256(Sha256),
}

impl ContentHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let inner = match algorithm {
            HashAlgorithm::Md5 => HasherInner::Md5(Md5::new()),
            HashAlgorithm::Sha256 => HasherInner::Sha256(Sha256::new()),
        };
        Self { inner }
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.inner {
            HasherInner::Md5(h) => h.update(data),
            HasherInner::Sha256(h) => h.update(data),
        }
    }

    /// Consumes the accumulator and returns the lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        match self.inner {
            HasherInner::Md5(h) => hex::encode(h.finalize()),
            HasherInner::Sha256(h) => hex::encode(h.finalize()),
        }
    }
}

/// Computes the digest of `data` and returns it hex-encoded.
pub fn digest_bytes(algorithm: HashAlgorithm, data: &[u8]) -> String {
    let mut hasher = ContentHasher::new(algorithm);
    hasher.update(data);
    hasher.finalize_hex()
}

/// Streams `source` through the digest in reads of at most `window` bytes.
///
/// A read failure surfaces as [`TransferError::Hash`]; nothing is retried.
pub async fn hash_source(
    source: &dyn ByteSource,
    algorithm: HashAlgorithm,
    window: usize,
) -> Result<String, TransferError> {
    if window == 0 {
        return Err(TransferError::Planning("hash window must be > 0".into()));
    }

    let total = source.len();
    let mut hasher = ContentHasher::new(algorithm);
    let mut offset = 0u64;
    while offset < total {
        let n = (total - offset).min(window as u64) as usize;
        let buf = source.read_range(offset, n).await?;
        hasher.update(&buf);
        offset += n as u64;
    }

    let digest = hasher.finalize_hex();
    tracing::trace!(bytes = total, %digest, "content hashed");
    Ok(digest)
}
