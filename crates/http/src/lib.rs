//! HTTP transport for the filedock storage server.
//!
//! Implements [`filedock_upload::StorageServer`] over `reqwest`: JSON
//! bodies for the existence check and merge, multipart forms for file and
//! chunk uploads, and the raw token in the `Authorization` header.

pub mod client;

pub use client::{HttpError, HttpStorageServer};
