//! Discovery of converter output inside a staging directory.
//!
//! # Design
//! - Only direct children of the staging directory are considered; symlinks never match.
//! - Directory entries are sorted by file name, so ties resolve to the
//!   lexicographically first name regardless of the filesystem's listing order.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::error::{SandboxError, SandboxResult};

/// Find the file in `directory` whose name contains `marker`.
///
/// `exclude` names a file that must never match, normally the staged input.
///
/// # Errors
///
/// Returns [`SandboxError::InvalidInput`] for an empty marker,
/// [`SandboxError::Walkdir`] when the directory cannot be listed, and
/// [`SandboxError::OutputNotFound`] when nothing matches.
pub fn locate_output(
    directory: &Path,
    marker: &str,
    exclude: Option<&str>,
) -> SandboxResult<PathBuf> {
    if marker.is_empty() {
        return Err(SandboxError::invalid("marker", "empty", marker));
    }

    let mut matches = Vec::new();
    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry =
            entry.map_err(|source| SandboxError::walkdir("locate.read_dir", directory, source))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if exclude == Some(name) || !name.contains(marker) {
            continue;
        }
        matches.push(entry.into_path());
    }

    if matches.len() > 1 {
        warn!(
            directory = %directory.display(),
            marker,
            matches = matches.len(),
            "multiple converter outputs matched; using the first by name"
        );
    }
    matches
        .into_iter()
        .next()
        .ok_or_else(|| SandboxError::OutputNotFound {
            marker: marker.to_string(),
            directory: directory.to_path_buf(),
        })
}

/// Map an output path reported by the converter onto `directory`.
///
/// Only the final component of `reported` is used, so a converter cannot point
/// the caller at a file outside the staging directory.
///
/// # Errors
///
/// Returns [`SandboxError::OutputNotFound`] when the reported name is empty or
/// does not name a regular file inside `directory`.
pub fn resolve_reported_output(directory: &Path, reported: &Path) -> SandboxResult<PathBuf> {
    let not_found = || SandboxError::OutputNotFound {
        marker: reported.display().to_string(),
        directory: directory.to_path_buf(),
    };
    let name = reported.file_name().ok_or_else(not_found)?;
    let candidate = directory.join(name);
    match fs::symlink_metadata(&candidate) {
        Ok(metadata) if metadata.is_file() => Ok(candidate),
        _ => Err(not_found()),
    }
}
