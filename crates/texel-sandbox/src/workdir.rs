//! Process-wide working-directory critical section.
//!
//! # Design
//! - The process working directory is shared mutable state; every redirect goes through
//!   one lock so at most one job occupies it at a time.
//! - Waiting is async and bounded; the redirect/action/restore sequence runs on the
//!   blocking pool and always completes, even if the awaiting future is dropped.
//! - A failed restore poisons the section for the rest of the process.

use std::env;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::error::{SandboxError, SandboxResult};

static PROCESS_SECTION: Lazy<WorkingDirectory> = Lazy::new(|| WorkingDirectory {
    inner: Arc::new(SectionInner {
        lock: Arc::new(Mutex::new(())),
        poisoned: AtomicBool::new(false),
        entries: AtomicU64::new(0),
        occupancy: AtomicUsize::new(0),
        peak_occupancy: AtomicUsize::new(0),
    }),
});

/// Handle to the process-wide working-directory critical section.
///
/// Every handle refers to the same lock; there is no way to build a second one.
#[derive(Clone)]
pub struct WorkingDirectory {
    inner: Arc<SectionInner>,
}

struct SectionInner {
    lock: Arc<Mutex<()>>,
    poisoned: AtomicBool,
    entries: AtomicU64,
    occupancy: AtomicUsize,
    peak_occupancy: AtomicUsize,
}

/// Value produced inside the critical section plus the time spent waiting to enter.
#[derive(Debug)]
pub struct SectionOutcome<T> {
    /// Result of the action.
    pub value: T,
    /// Time spent waiting for the lock.
    pub waited: Duration,
}

/// Counters describing critical-section usage since process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionStats {
    /// Completed redirects into a job directory.
    pub entries: u64,
    /// Jobs currently inside the section.
    pub occupancy: usize,
    /// Highest simultaneous occupancy ever observed.
    pub peak_occupancy: usize,
}

impl WorkingDirectory {
    /// Handle to the single section guarding this process's working directory.
    #[must_use]
    pub fn process() -> Self {
        PROCESS_SECTION.clone()
    }

    /// `false` once a restore failure has poisoned the section.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        !self.inner.poisoned.load(Ordering::SeqCst)
    }

    /// Usage counters for diagnostics.
    #[must_use]
    pub fn stats(&self) -> SectionStats {
        SectionStats {
            entries: self.inner.entries.load(Ordering::SeqCst),
            occupancy: self.inner.occupancy.load(Ordering::SeqCst),
            peak_occupancy: self.inner.peak_occupancy.load(Ordering::SeqCst),
        }
    }

    /// Run `action` with the process working directory set to `directory`.
    ///
    /// The prior working directory is restored on every exit path before the
    /// lock is released, including when `action` panics.
    ///
    /// # Errors
    ///
    /// - [`SandboxError::SectionPoisoned`] if an earlier restore failed.
    /// - [`SandboxError::SectionTimeout`] if the lock is not acquired within `wait_limit`.
    /// - [`SandboxError::StagingIo`] if `directory` cannot be entered (the action does not run).
    /// - [`SandboxError::EnvironmentCorruption`] if the working directory cannot be read or restored.
    /// - [`SandboxError::ActionPanicked`] if `action` panicked.
    pub async fn run_exclusively<T, F>(
        &self,
        directory: &Path,
        wait_limit: Duration,
        action: F,
    ) -> SandboxResult<SectionOutcome<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if !self.is_healthy() {
            return Err(SandboxError::SectionPoisoned);
        }

        let started = Instant::now();
        let guard = tokio::time::timeout(wait_limit, Arc::clone(&self.inner.lock).lock_owned())
            .await
            .map_err(|_| SandboxError::SectionTimeout { waited: wait_limit })?;
        let waited = started.elapsed();

        if !self.is_healthy() {
            return Err(SandboxError::SectionPoisoned);
        }

        let inner = Arc::clone(&self.inner);
        let directory = directory.to_path_buf();
        let task = tokio::task::spawn_blocking(move || {
            let result = inner.run_locked(&directory, action);
            drop(guard);
            result
        });
        let value = task
            .await
            .map_err(|source| SandboxError::TaskJoin { source })??;
        Ok(SectionOutcome { value, waited })
    }
}

impl SectionInner {
    fn run_locked<T>(&self, directory: &Path, action: impl FnOnce() -> T) -> SandboxResult<T> {
        let prior = env::current_dir().map_err(|source| {
            self.poison();
            error!(error = %source, "process working directory is unreadable");
            SandboxError::EnvironmentCorruption {
                operation: "workdir.current_dir",
                path: None,
                source,
            }
        })?;

        env::set_current_dir(directory)
            .map_err(|source| SandboxError::io("workdir.enter", directory, source))?;
        self.enter();
        debug!(path = %directory.display(), "entered working-directory critical section");

        let outcome = panic::catch_unwind(AssertUnwindSafe(action));

        self.exit();
        self.restore(prior)?;
        debug!(path = %directory.display(), "left working-directory critical section");
        outcome.map_err(|_| SandboxError::ActionPanicked)
    }

    fn restore(&self, prior: PathBuf) -> SandboxResult<()> {
        env::set_current_dir(&prior).map_err(|source| {
            self.poison();
            error!(
                error = %source,
                path = %prior.display(),
                "failed to restore working directory; critical section poisoned"
            );
            SandboxError::EnvironmentCorruption {
                operation: "workdir.restore",
                path: Some(prior),
                source,
            }
        })
    }

    fn enter(&self) {
        self.entries.fetch_add(1, Ordering::SeqCst);
        let occupancy = self.occupancy.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_occupancy.fetch_max(occupancy, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.occupancy.fetch_sub(1, Ordering::SeqCst);
    }

    fn poison(&self) {
        self.poisoned.store(true, Ordering::SeqCst);
    }
}
