//! Runs alone in its own test binary so the process working directory can be
//! compared outside the critical section without racing other tests.

use std::env;
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;
use texel_sandbox::{SandboxError, WorkingDirectory};

const WAIT: Duration = Duration::from_secs(30);

#[tokio::test]
async fn prior_directory_is_restored_on_every_exit_path() -> Result<()> {
    let section = WorkingDirectory::process();
    let before = env::current_dir()?;
    let job = TempDir::new()?;

    let outcome = section
        .run_exclusively(job.path(), WAIT, env::current_dir)
        .await?;
    assert_ne!(outcome.value?, before);
    assert_eq!(env::current_dir()?, before);

    let converter_failure = section
        .run_exclusively(job.path(), WAIT, || -> Result<(), String> {
            Err("unsupported input".to_string())
        })
        .await?;
    assert!(converter_failure.value.is_err());
    assert_eq!(env::current_dir()?, before);

    let panicked = section
        .run_exclusively(job.path(), WAIT, || -> u8 { panic!("converter crashed") })
        .await;
    assert!(matches!(panicked, Err(SandboxError::ActionPanicked)));
    assert_eq!(env::current_dir()?, before);

    let missing = section
        .run_exclusively(&job.path().join("missing"), WAIT, || ())
        .await;
    assert!(matches!(missing, Err(SandboxError::StagingIo { .. })));
    assert_eq!(env::current_dir()?, before);

    let stats = section.stats();
    assert_eq!(stats.entries, 3);
    assert_eq!(stats.occupancy, 0);
    assert_eq!(stats.peak_occupancy, 1);
    assert!(section.is_healthy());
    Ok(())
}
