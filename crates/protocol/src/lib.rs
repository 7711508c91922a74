pub mod constants;
pub mod envelope;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use constants::{CODE_FAST_UPLOAD, CODE_OK, Endpoint};
pub use envelope::ApiResponse;
pub use messages::{
    ChunkUploadFields, ExistenceCheckRequest, MergeRequest, NameCheckQuery, SimpleUploadFields,
};
pub use types::MenuId;
