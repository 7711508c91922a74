use serde::{Deserialize, Serialize};

use crate::types::{MenuId, menu_id_field, optional_menu_id};

// ---------------------------------------------------------------------------
// JSON request bodies
// ---------------------------------------------------------------------------

/// Asks whether a large file with the given digest is already stored.
///
/// Shares its shape with a chunk upload; the chunk fields are zeroed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistenceCheckRequest {
    pub identifier: String,
    pub chunk_identifier: String,
    pub chunk_name: String,
    pub file_name: String,
    pub file_type: String,
    pub chunk_number: u64,
    pub current_chunk_size: u64,
    pub total_chunks: u64,
    pub total_size: u64,
    #[serde(with = "optional_menu_id")]
    pub menu_id: Option<MenuId>,
}

impl ExistenceCheckRequest {
    pub fn new(
        identifier: impl Into<String>,
        file_name: impl Into<String>,
        file_type: impl Into<String>,
        total_size: u64,
        menu_id: Option<MenuId>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            chunk_identifier: String::new(),
            chunk_name: String::new(),
            file_name: file_name.into(),
            file_type: file_type.into(),
            chunk_number: 0,
            current_chunk_size: 0,
            total_chunks: 0,
            total_size,
            menu_id,
        }
    }
}

/// Assembles the uploaded chunks of `identifier` into one stored object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub file_name: String,
    pub identifier: String,
    pub total_size: u64,
    #[serde(with = "optional_menu_id")]
    pub menu_id: Option<MenuId>,
}

// ---------------------------------------------------------------------------
// Query strings
// ---------------------------------------------------------------------------

/// Asks whether directory `menu_id` already holds a file called `file_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCheckQuery {
    pub menu_id: Option<MenuId>,
    pub file_name: String,
}

impl NameCheckQuery {
    pub fn new(menu_id: Option<MenuId>, file_name: impl Into<String>) -> Self {
        Self {
            menu_id,
            file_name: file_name.into(),
        }
    }

    /// Returns the unencoded query pairs. The root directory is sent as `0`.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let menu_id = self.menu_id.map_or(0, |m| m.0);
        vec![
            ("menuId", menu_id.to_string()),
            ("fileName", self.file_name.clone()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Multipart form fields
// ---------------------------------------------------------------------------

/// Text fields of a whole-file upload. The bytes travel in the
/// `multipartFile` part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleUploadFields {
    pub file_name: String,
    pub file_type: String,
    #[serde(with = "optional_menu_id")]
    pub menu_id: Option<MenuId>,
    pub identifier: String,
}

impl SimpleUploadFields {
    /// Returns the fields as `(name, value)` pairs in wire order.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("fileName", self.file_name.clone()),
            ("fileType", self.file_type.clone()),
            ("menuId", menu_id_field(self.menu_id)),
            ("identifier", self.identifier.clone()),
        ]
    }
}

/// Text fields of one chunk upload. The chunk bytes travel in the
/// `multipartFile` part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkUploadFields {
    /// Whole-file digest.
    pub identifier: String,
    /// `<digest>_<index>`.
    pub chunk_identifier: String,
    /// Digest of this chunk's bytes.
    pub chunk_name: String,
    pub file_name: String,
    pub file_type: String,
    pub chunk_number: u64,
    pub current_chunk_size: u64,
    pub total_chunks: u64,
    pub total_size: u64,
    #[serde(with = "optional_menu_id")]
    pub menu_id: Option<MenuId>,
}

impl ChunkUploadFields {
    /// Builds the per-chunk identifier the server correlates chunks by.
    pub fn chunk_identifier_for(digest: &str, index: u64) -> String {
        format!("{digest}_{index}")
    }

    /// Returns the fields as `(name, value)` pairs in wire order.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("identifier", self.identifier.clone()),
            ("chunkIdentifier", self.chunk_identifier.clone()),
            ("chunkName", self.chunk_name.clone()),
            ("fileName", self.file_name.clone()),
            ("fileType", self.file_type.clone()),
            ("chunkNumber", self.chunk_number.to_string()),
            ("currentChunkSize", self.current_chunk_size.to_string()),
            ("totalChunks", self.total_chunks.to_string()),
            ("totalSize", self.total_size.to_string()),
            ("menuId", menu_id_field(self.menu_id)),
        ]
    }
}
