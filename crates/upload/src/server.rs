//! Storage server seam.
//!
//! `StorageServer` is implemented by the HTTP client in `filedock-http`.
//! Using a trait keeps the upload logic decoupled from transport and
//! testable with mocks.

use std::future::Future;
use std::pin::Pin;

use filedock_protocol::{
    ApiResponse, ChunkUploadFields, ExistenceCheckRequest, MergeRequest, NameCheckQuery,
    SimpleUploadFields,
};
use filedock_transfer::ProgressSink;

use crate::error::UploadError;

/// Boxed future returned by every server call.
pub type ServerFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiResponse, UploadError>> + Send + 'a>>;

/// Abstract connection to the storage server.
///
/// Implementations inject authentication themselves. Transport and auth
/// failures are reported as [`UploadError::Transport`]; a response that
/// arrived is returned as-is, whatever its code, so the caller can
/// interpret it.
pub trait StorageServer: Send + Sync {
    /// Asks whether a large file with this digest is already stored.
    fn check_exists(&self, request: &ExistenceCheckRequest) -> ServerFuture<'_>;

    /// Uploads a small file in one request.
    fn upload_file(&self, fields: &SimpleUploadFields, data: Vec<u8>) -> ServerFuture<'_>;

    /// Uploads one chunk. `progress` receives the chunk's own transfer
    /// percentage while the body is being sent.
    fn upload_chunk(
        &self,
        fields: &ChunkUploadFields,
        data: Vec<u8>,
        progress: Option<ProgressSink>,
    ) -> ServerFuture<'_>;

    /// Asks the server to assemble the uploaded chunks.
    fn merge(&self, request: &MergeRequest) -> ServerFuture<'_>;

    /// Asks whether the target directory already holds a file of that name.
    fn check_name_duplicate(&self, query: &NameCheckQuery) -> ServerFuture<'_>;
}
