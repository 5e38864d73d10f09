//! Per-request staging directories.
//!
//! # Design
//! - Each request gets a freshly created, uniquely named directory under the staging root.
//! - Upload names are validated as bare file names before anything touches disk.
//! - Cleanup is tied to ownership: `release` deletes explicitly, `Drop` covers every other exit.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{SandboxError, SandboxResult};

/// Prefix of every staging directory created under the staging root.
pub const STAGING_DIR_PREFIX: &str = "job-";

/// Longest upload name accepted, in bytes. Matches `NAME_MAX` on common
/// Unix filesystems.
pub const MAX_FILE_NAME_BYTES: usize = 255;

/// Validate that `name` is a bare file name that cannot escape a directory.
///
/// # Errors
///
/// Returns [`SandboxError::InvalidInput`] when the name is empty, a relative
/// directory reference, longer than [`MAX_FILE_NAME_BYTES`], or contains a
/// path separator or NUL byte.
pub fn validate_file_name(name: &str) -> SandboxResult<&str> {
    if name.is_empty() {
        return Err(SandboxError::invalid("file_name", "empty", name));
    }
    if name == "." || name == ".." {
        return Err(SandboxError::invalid(
            "file_name",
            "relative_directory_reference",
            name,
        ));
    }
    if name.contains(['/', '\\']) {
        return Err(SandboxError::invalid(
            "file_name",
            "contains_path_separator",
            name,
        ));
    }
    if name.contains('\0') {
        return Err(SandboxError::invalid("file_name", "contains_nul", name));
    }
    if name.len() > MAX_FILE_NAME_BYTES {
        return Err(SandboxError::invalid("file_name", "too_long", name));
    }
    Ok(name)
}

/// Handle to a staging directory holding one uploaded file.
///
/// The directory and everything under it is removed exactly once: either by
/// [`StagingArea::release`] or, if that never ran, when the handle is dropped.
#[derive(Debug)]
pub struct StagingArea {
    job_id: Uuid,
    directory: PathBuf,
    file_name: String,
    released: bool,
}

impl StagingArea {
    /// Create a unique staging directory under `root` and write `payload` into it.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::InvalidInput`] for unsafe file names and
    /// [`SandboxError::StagingIo`] when the directory or file cannot be created.
    pub fn acquire(root: &Path, file_name: &str, payload: &[u8]) -> SandboxResult<Self> {
        Self::acquire_for(root, Uuid::new_v4(), file_name, payload)
    }

    /// Like [`StagingArea::acquire`], naming the directory after an existing job id.
    ///
    /// # Errors
    ///
    /// Same as [`StagingArea::acquire`]; a directory that already exists for
    /// `job_id` is reported as [`SandboxError::StagingIo`] rather than reused.
    pub fn acquire_for(
        root: &Path,
        job_id: Uuid,
        file_name: &str,
        payload: &[u8],
    ) -> SandboxResult<Self> {
        let file_name = validate_file_name(file_name)?.to_string();
        fs::create_dir_all(root)
            .map_err(|source| SandboxError::io("staging.create_root", root, source))?;

        let directory = root.join(format!("{STAGING_DIR_PREFIX}{job_id}"));
        fs::create_dir(&directory)
            .map_err(|source| SandboxError::io("staging.create_dir", &directory, source))?;

        // From here on the handle owns the directory, so an early return still cleans up.
        let area = Self {
            job_id,
            directory,
            file_name,
            released: false,
        };
        let staged = area.staged_file();
        fs::write(&staged, payload)
            .map_err(|source| SandboxError::io("staging.write_upload", &staged, source))?;
        debug!(
            job_id = %area.job_id,
            path = %staged.display(),
            bytes = payload.len(),
            "staged upload"
        );
        Ok(area)
    }

    /// Identifier embedded in the staging directory name.
    #[must_use]
    pub const fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Absolute path of the staging directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Validated bare name of the staged upload.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Absolute path of the staged upload.
    #[must_use]
    pub fn staged_file(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    /// Read a file located directly inside this staging directory.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::InvalidInput`] when `path` is not a direct child
    /// of the staging directory and [`SandboxError::StagingIo`] when reading fails.
    pub fn read_output(&self, path: &Path) -> SandboxResult<Vec<u8>> {
        if path.parent() != Some(self.directory.as_path()) {
            return Err(SandboxError::invalid(
                "output_path",
                "outside_staging_directory",
                &path.display().to_string(),
            ));
        }
        fs::read(path).map_err(|source| SandboxError::io("staging.read_output", path, source))
    }

    /// Recursively delete the staging directory.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::StagingIo`] when the directory exists but cannot be removed.
    /// The removal is not retried on drop.
    pub fn release(mut self) -> SandboxResult<()> {
        self.released = true;
        remove_directory(&self.directory)
            .map_err(|source| SandboxError::io("staging.release", &self.directory, source))
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = remove_directory(&self.directory) {
            warn!(
                job_id = %self.job_id,
                error = %err,
                path = %self.directory.display(),
                "failed to remove staging directory on drop"
            );
        }
    }
}

fn remove_directory(directory: &Path) -> io::Result<()> {
    match fs::remove_dir_all(directory) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    fn entries(root: &Path) -> Result<usize> {
        Ok(fs::read_dir(root)?.count())
    }

    #[test]
    fn validate_file_name_rejects_unsafe_names() {
        for name in ["", ".", "..", "../evil.txt", "a/b", "a\\b", "nul\0byte", "/etc/passwd"] {
            assert!(
                matches!(
                    validate_file_name(name),
                    Err(SandboxError::InvalidInput {
                        field: "file_name",
                        ..
                    })
                ),
                "expected {name:?} to be rejected"
            );
        }
        for name in ["photo.png", "..hidden", "report (1).pdf", "ünïcode.txt", "-draft.png"] {
            assert!(validate_file_name(name).is_ok(), "expected {name:?} to pass");
        }
    }

    #[test]
    fn over_long_names_are_invalid_input_not_io() -> Result<()> {
        let longest = format!("{}.png", "a".repeat(MAX_FILE_NAME_BYTES - 4));
        assert!(validate_file_name(&longest).is_ok());

        let too_long = format!("{}.png", "a".repeat(MAX_FILE_NAME_BYTES));
        assert!(matches!(
            validate_file_name(&too_long),
            Err(SandboxError::InvalidInput {
                reason: "too_long",
                ..
            })
        ));

        let temp = TempDir::new()?;
        let root = temp.path().join("staging");
        assert!(matches!(
            StagingArea::acquire(&root, &too_long, b"x"),
            Err(SandboxError::InvalidInput { .. })
        ));
        assert!(!root.exists());
        Ok(())
    }

    #[test]
    fn acquire_writes_payload_verbatim_into_unique_directory() -> Result<()> {
        let root = TempDir::new()?;
        let first = StagingArea::acquire(root.path(), "photo.png", b"\x89PNG\r\n")?;
        let second = StagingArea::acquire(root.path(), "photo.png", b"other")?;

        assert_ne!(first.directory(), second.directory());
        assert!(first.directory().starts_with(root.path()));
        assert!(
            first
                .directory()
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(STAGING_DIR_PREFIX))
        );
        assert_eq!(fs::read(first.staged_file())?, b"\x89PNG\r\n");
        assert_eq!(fs::read(second.staged_file())?, b"other");
        assert_eq!(first.file_name(), "photo.png");
        Ok(())
    }

    #[test]
    fn existing_job_directory_is_not_reused() -> Result<()> {
        let root = TempDir::new()?;
        let job_id = Uuid::new_v4();
        let first = StagingArea::acquire_for(root.path(), job_id, "a.txt", b"first")?;
        let second = StagingArea::acquire_for(root.path(), job_id, "b.txt", b"second");
        assert!(matches!(
            second,
            Err(SandboxError::StagingIo {
                operation: "staging.create_dir",
                ..
            })
        ));
        assert_eq!(first.job_id(), job_id);
        assert_eq!(fs::read(first.staged_file())?, b"first");
        assert!(!first.directory().join("b.txt").exists());
        Ok(())
    }

    #[test]
    fn acquire_creates_missing_root() -> Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path().join("nested").join("staging");
        let area = StagingArea::acquire(&root, "data.bin", &[])?;
        assert!(area.staged_file().is_file());
        Ok(())
    }

    #[test]
    fn traversal_name_is_rejected_before_touching_disk() -> Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path().join("staging");
        let result = StagingArea::acquire(&root, "../evil.txt", b"payload");
        assert!(matches!(result, Err(SandboxError::InvalidInput { .. })));
        assert!(!root.exists());
        assert!(!temp.path().join("evil.txt").exists());
        Ok(())
    }

    #[test]
    fn release_removes_directory_and_contents() -> Result<()> {
        let root = TempDir::new()?;
        let area = StagingArea::acquire(root.path(), "input.txt", b"hello")?;
        let directory = area.directory().to_path_buf();
        fs::write(directory.join("input-recovered.txt"), b"hello")?;
        fs::create_dir(directory.join("scratch"))?;

        area.release()?;
        assert!(!directory.exists());
        assert_eq!(entries(root.path())?, 0);
        Ok(())
    }

    #[test]
    fn drop_cleans_up_unreleased_area() -> Result<()> {
        let root = TempDir::new()?;
        let directory = {
            let area = StagingArea::acquire(root.path(), "input.txt", b"hello")?;
            area.directory().to_path_buf()
        };
        assert!(!directory.exists());
        Ok(())
    }

    #[test]
    fn release_tolerates_externally_removed_directory() -> Result<()> {
        let root = TempDir::new()?;
        let area = StagingArea::acquire(root.path(), "input.txt", b"hello")?;
        fs::remove_dir_all(area.directory())?;
        area.release()?;
        Ok(())
    }

    #[test]
    fn read_output_only_reads_direct_children() -> Result<()> {
        let root = TempDir::new()?;
        let area = StagingArea::acquire(root.path(), "input.txt", b"hello")?;
        assert_eq!(area.read_output(&area.staged_file())?, b"hello");

        let outside = root.path().join("outside.txt");
        fs::write(&outside, b"secret")?;
        assert!(matches!(
            area.read_output(&outside),
            Err(SandboxError::InvalidInput {
                field: "output_path",
                ..
            })
        ));

        let missing = area.directory().join("missing.gif");
        assert!(matches!(
            area.read_output(&missing),
            Err(SandboxError::StagingIo {
                operation: "staging.read_output",
                ..
            })
        ));
        Ok(())
    }
}
