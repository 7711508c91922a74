//! Maps a file's relative directory to a target directory id.

use std::collections::HashMap;

use filedock_protocol::MenuId;

use crate::error::UploadError;

/// Resolves relative directories by longest-prefix match.
///
/// Prefixes match on whole `/`-separated segments: `photos` covers
/// `photos/2024` but not `photos2`. An empty key covers every directory.
#[derive(Debug, Clone, Default)]
pub struct DirectoryResolver {
    entries: HashMap<String, MenuId>,
    /// `Some(None)` sends unmatched files to the storage root; `None`
    /// makes them fail.
    fallback: Option<Option<MenuId>>,
}

impl DirectoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a resolver from `(directory, id)` pairs.
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, MenuId)>,
        K: AsRef<str>,
    {
        let mut resolver = Self::new();
        for (dir, id) in entries {
            resolver.insert(dir.as_ref(), id);
        }
        resolver
    }

    /// Maps `directory` (and everything below it) to `id`.
    pub fn insert(&mut self, directory: &str, id: MenuId) {
        self.entries.insert(normalize(directory).to_string(), id);
    }

    /// Target used when no entry matches. `None` means the storage root.
    pub fn with_default(mut self, id: Option<MenuId>) -> Self {
        self.fallback = Some(id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves the target of a file in `directory`.
    ///
    /// Returns [`UploadError::Resolution`] when nothing matches and no
    /// default was set.
    pub fn resolve(&self, directory: &str) -> Result<Option<MenuId>, UploadError> {
        let mut dir = normalize(directory);
        loop {
            if let Some(id) = self.entries.get(dir) {
                return Ok(Some(*id));
            }
            if dir.is_empty() {
                break;
            }
            dir = dir.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("");
        }
        self.fallback
            .ok_or_else(|| UploadError::Resolution(format!("/{}", normalize(directory))))
    }
}

fn normalize(dir: &str) -> &str {
    dir.trim_matches('/')
}
