//! Resolving requested report files inside the downloads directory.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Failed to resolve '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Collapses `.` and `..` without touching the filesystem. Returns `None`
/// when `..` would climb above the start of the path.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

/// Resolves `name` to a file under `root`.
///
/// Anything resolving outside `root` (through `..`, an absolute name or a
/// symlink) is `AccessDenied`, checked before existence so probing outside
/// the root never reports not-found.
pub fn resolve_download(root: &Path, name: &str) -> Result<PathBuf, DownloadError> {
    let root = normalize(root).unwrap_or_else(|| root.to_path_buf());
    let denied = || DownloadError::AccessDenied(name.to_string());

    let candidate = normalize(&root.join(name)).ok_or_else(denied)?;
    if name.is_empty() || candidate == root || !candidate.starts_with(&root) {
        return Err(denied());
    }

    if !candidate.is_file() {
        return Err(DownloadError::NotFound(name.to_string()));
    }

    let io_error = |source| DownloadError::Io {
        name: name.to_string(),
        source,
    };
    let canonical_root = root.canonicalize().map_err(io_error)?;
    let canonical = candidate.canonicalize().map_err(io_error)?;
    if !canonical.starts_with(&canonical_root) {
        return Err(denied());
    }

    Ok(canonical)
}
