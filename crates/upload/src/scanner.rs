//! Directory scanning for batch upload.
//!
//! Recursively walks a directory and produces batch files whose relative
//! paths start with the root folder name and use forward slashes.

use std::path::{Component, Path, PathBuf};

use crate::error::UploadError;
use crate::types::BatchFile;

/// Scans `root` recursively and opens every regular file in it.
///
/// Paths look like `root_name/sub/file.ext` (`/` even on Windows) and
/// are returned sorted.
pub async fn scan_directory(root: &Path) -> Result<Vec<BatchFile>, UploadError> {
    let root_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| UploadError::InvalidPath(root.display().to_string()))?;

    let mut found = Vec::new();
    walk_dir(root, root, &mut found)?;
    found.sort();

    let mut files = Vec::with_capacity(found.len());
    for (rel, path) in found {
        let relative_path = format!("{root_name}/{rel}");
        validate_relative_path(&relative_path)?;
        files.push(BatchFile::from_path(relative_path, &path).await?);
    }
    Ok(files)
}

fn walk_dir(
    root: &Path,
    current: &Path,
    found: &mut Vec<(String, PathBuf)>,
) -> Result<(), UploadError> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;

        if metadata.is_dir() {
            walk_dir(root, &path, found)?;
        } else if metadata.is_file() {
            let rel_path = path.strip_prefix(root).map_err(std::io::Error::other)?;
            let rel_str = rel_path.to_string_lossy().replace('\\', "/");
            found.push((rel_str, path));
        }
    }
    Ok(())
}

/// Rejects relative paths that are empty, absolute, or climb out of the
/// batch root.
pub fn validate_relative_path(path: &str) -> Result<(), UploadError> {
    let invalid = |reason: &str| UploadError::InvalidPath(format!("{path:?}: {reason}"));

    if path.is_empty() {
        return Err(invalid("empty"));
    }
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(invalid("absolute"));
    }
    for segment in path.split('/') {
        if segment.is_empty() {
            return Err(invalid("empty segment"));
        }
        match Path::new(segment).components().next() {
            Some(Component::Normal(_)) => {}
            Some(Component::ParentDir) => return Err(invalid("parent reference")),
            Some(Component::CurDir) => return Err(invalid("current-dir reference")),
            _ => return Err(invalid("absolute")),
        }
    }
    Ok(())
}

/// Characters the storage server does not accept in a file name.
const FORBIDDEN_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Rejects file names that are blank or contain a reserved character.
pub fn validate_file_name(name: &str) -> Result<(), UploadError> {
    if name.trim().is_empty() {
        return Err(UploadError::InvalidName(format!("{name:?}: empty")));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_NAME_CHARS.contains(c)) {
        return Err(UploadError::InvalidName(format!("{name:?}: contains {c:?}")));
    }
    Ok(())
}
