/// Response code for a successful call.
pub const CODE_OK: i32 = 200;

/// Response code on a chunk upload meaning the server already holds the
/// whole file and the remaining chunks can be skipped.
pub const CODE_FAST_UPLOAD: i32 = 10000;

/// Multipart field that carries the raw bytes of a file or chunk.
pub const MULTIPART_FILE_FIELD: &str = "multipartFile";

/// Storage server endpoint used by the upload engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Content-addressed existence check for large files.
    CheckLargeFileExists,
    /// Single-request upload for small files.
    Upload,
    /// One chunk of a large file.
    UploadChunk,
    /// Assembles previously uploaded chunks into one object.
    MergeChunk,
    /// Asks whether a directory already holds a file with a given name.
    CheckNameDuplicate,
}

impl Endpoint {
    /// Path relative to the server base URL.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::CheckLargeFileExists => "/file/checkLargeFileExists",
            Endpoint::Upload => "/file/upload",
            Endpoint::UploadChunk => "/file/uploadChunk",
            Endpoint::MergeChunk => "/file/mergeChunk",
            Endpoint::CheckNameDuplicate => "/file/checkNameDuplicate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_paths() {
        assert_eq!(
            Endpoint::CheckLargeFileExists.path(),
            "/file/checkLargeFileExists"
        );
        assert_eq!(Endpoint::Upload.path(), "/file/upload");
        assert_eq!(Endpoint::UploadChunk.path(), "/file/uploadChunk");
        assert_eq!(Endpoint::MergeChunk.path(), "/file/mergeChunk");
        assert_eq!(
            Endpoint::CheckNameDuplicate.path(),
            "/file/checkNameDuplicate"
        );
    }
}
