//! Poisons the process-wide critical section, so it must stay in its own test binary.

use std::env;
use std::fs;
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;
use texel_sandbox::{SandboxError, WorkingDirectory};

const WAIT: Duration = Duration::from_secs(30);

#[tokio::test]
async fn failed_restore_poisons_section_for_later_jobs() -> Result<()> {
    let original = env::current_dir()?;
    let prior = TempDir::new()?;
    let prior_path = prior.path().to_path_buf();
    let job = TempDir::new()?;
    env::set_current_dir(&prior_path)?;

    let section = WorkingDirectory::process();
    let doomed = prior_path.clone();
    let result = section
        .run_exclusively(job.path(), WAIT, move || fs::remove_dir_all(&doomed))
        .await;

    match result {
        Err(SandboxError::EnvironmentCorruption {
            operation, path, ..
        }) => {
            assert_eq!(operation, "workdir.restore");
            assert_eq!(path.as_deref(), Some(prior_path.as_path()));
        }
        other => panic!("expected environment corruption, got {other:?}"),
    }
    assert!(!section.is_healthy());

    let ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = std::sync::Arc::clone(&ran);
    let rejected = WorkingDirectory::process()
        .run_exclusively(job.path(), WAIT, move || {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
        })
        .await;
    assert!(matches!(rejected, Err(SandboxError::SectionPoisoned)));
    assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));

    env::set_current_dir(original)?;
    Ok(())
}
