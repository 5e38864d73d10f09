//! Scratch directories for staging roots.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Temporary staging root removed when dropped.
#[derive(Debug)]
pub struct StagingFixture {
    dir: TempDir,
}

impl StagingFixture {
    /// Create an empty staging root.
    ///
    /// # Errors
    ///
    /// Returns an error when the temporary directory cannot be created.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    /// Path of the staging root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Entries still present under the staging root, sorted by path.
    ///
    /// # Errors
    ///
    /// Returns an error when the root cannot be listed.
    pub fn leftovers(&self) -> io::Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(self.root())?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leftovers_lists_remaining_entries() -> io::Result<()> {
        let fixture = StagingFixture::new()?;
        assert!(fixture.leftovers()?.is_empty());

        fs::create_dir(fixture.root().join("job-b"))?;
        fs::create_dir(fixture.root().join("job-a"))?;
        assert_eq!(
            fixture.leftovers()?,
            vec![fixture.root().join("job-a"), fixture.root().join("job-b")]
        );
        Ok(())
    }
}
