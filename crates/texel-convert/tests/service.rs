use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use texel_convert::{
    ConversionService, ConversionSettings, ConvertError, Converter, FailureClass, Operation,
    RequestJob,
};
use texel_telemetry::Metrics;
use texel_test_support::{
    FailingConverter, MirrorConverter, OverlapTracker, SilentConverter, StagingFixture,
};

const MARKER: &str = "-recovered";

fn service_with(converter: Arc<dyn Converter>, fixture: &StagingFixture) -> Result<ConversionService> {
    Ok(ConversionService::new(
        converter,
        ConversionSettings {
            staging_root: fixture.root().to_path_buf(),
            recovery_marker: MARKER.to_string(),
            section_timeout: Duration::from_secs(30),
        },
        Metrics::new()?,
    ))
}

async fn expect_failure(service: &ConversionService, job: RequestJob) -> Result<ConvertError> {
    service
        .run(job)
        .await
        .err()
        .ok_or_else(|| anyhow!("expected the job to fail"))
}

#[tokio::test]
async fn photo_round_trips_through_encode_and_decode() -> Result<()> {
    let fixture = StagingFixture::new()?;
    let service = service_with(Arc::new(MirrorConverter::default()), &fixture)?;
    let original: Vec<u8> = (0..10 * 1024).map(|i| (i % 251) as u8).collect();

    let encoded = service
        .run(RequestJob::new(Operation::Encode, "photo.png", original.clone()))
        .await?;
    assert_eq!(encoded.file_name, "photo.gif");
    assert_eq!(encoded.content_type, "image/gif");

    let decoded = service
        .run(RequestJob::new(Operation::Decode, encoded.file_name, encoded.contents))
        .await?;
    assert!(decoded.file_name.contains(MARKER), "{}", decoded.file_name);
    assert_eq!(decoded.file_name, "photo-recovered.png");
    assert_eq!(decoded.content_type, "application/octet-stream");
    assert_eq!(decoded.contents, original);

    assert!(fixture.leftovers()?.is_empty());
    Ok(())
}

#[tokio::test]
async fn undecodable_artifact_is_a_conversion_failure() -> Result<()> {
    let fixture = StagingFixture::new()?;
    let service = service_with(Arc::new(MirrorConverter::default()), &fixture)?;

    let err = expect_failure(
        &service,
        RequestJob::new(Operation::Decode, "random.gif", b"definitely not an artifact".to_vec()),
    )
    .await?;
    assert_eq!(err.class(), FailureClass::Conversion);
    assert_eq!(err.reason(), "not a texel artifact");
    assert!(fixture.leftovers()?.is_empty());
    assert_eq!(service.metrics().conversions("decode", "conversion"), 1);
    Ok(())
}

#[tokio::test]
async fn converter_failures_are_surfaced_and_cleaned_up() -> Result<()> {
    let fixture = StagingFixture::new()?;
    let service = service_with(Arc::new(FailingConverter::new("converter crashed")), &fixture)?;

    for operation in [Operation::Encode, Operation::Decode] {
        match expect_failure(&service, RequestJob::new(operation, "input.bin", vec![1, 2, 3])).await? {
            ConvertError::Conversion {
                operation: failed,
                message,
            } => {
                assert_eq!(failed, operation);
                assert_eq!(message, "converter crashed");
            }
            other => return Err(anyhow!("unexpected error {other:?}")),
        }
    }
    assert!(fixture.leftovers()?.is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_output_is_reported_not_streamed() -> Result<()> {
    let fixture = StagingFixture::new()?;
    let service = service_with(Arc::new(SilentConverter), &fixture)?;

    for operation in [Operation::Encode, Operation::Decode] {
        let err = expect_failure(&service, RequestJob::new(operation, "photo.gif", vec![7; 64])).await?;
        assert_eq!(err.class(), FailureClass::OutputNotFound, "{operation}");
    }
    assert!(fixture.leftovers()?.is_empty());
    assert_eq!(service.metrics().conversions("decode", "output_not_found"), 1);
    Ok(())
}

#[tokio::test]
async fn staged_input_carrying_the_marker_is_not_mistaken_for_output() -> Result<()> {
    let fixture = StagingFixture::new()?;
    let service = service_with(Arc::new(SilentConverter), &fixture)?;

    let err = expect_failure(
        &service,
        RequestJob::new(Operation::Decode, "old-recovered.gif", b"stale".to_vec()),
    )
    .await?;
    assert_eq!(err.class(), FailureClass::OutputNotFound);
    Ok(())
}

#[tokio::test]
async fn traversal_names_are_rejected() -> Result<()> {
    let fixture = StagingFixture::new()?;
    let service = service_with(Arc::new(MirrorConverter::default()), &fixture)?;

    for name in ["../evil.txt", "nested/evil.txt", "", ".."] {
        let err = expect_failure(&service, RequestJob::new(Operation::Encode, name, b"x".to_vec())).await?;
        assert_eq!(err.class(), FailureClass::InvalidInput, "{name:?}");
    }
    assert!(fixture.leftovers()?.is_empty());
    let parent = fixture
        .root()
        .parent()
        .ok_or_else(|| anyhow!("staging root has no parent"))?;
    assert!(!parent.join("evil.txt").exists());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_jobs_never_overlap_inside_the_converter() -> Result<()> {
    let fixture = StagingFixture::new()?;
    let tracker = Arc::new(OverlapTracker::new(
        MirrorConverter::default(),
        Duration::from_millis(20),
    ));
    let service = service_with(tracker.clone(), &fixture)?;

    let mut handles = Vec::new();
    for index in 0..8u8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let payload = vec![index; 512];
            let encoded = service
                .run(RequestJob::new(
                    Operation::Encode,
                    format!("file-{index}.dat"),
                    payload.clone(),
                ))
                .await?;
            let decoded = service
                .run(RequestJob::new(Operation::Decode, encoded.file_name, encoded.contents))
                .await?;
            anyhow::ensure!(decoded.contents == payload, "job {index} got foreign bytes");
            anyhow::ensure!(decoded.file_name == format!("file-{index}-recovered.dat"));
            Ok::<_, anyhow::Error>(())
        }));
    }
    for handle in handles {
        handle.await??;
    }

    assert_eq!(tracker.calls(), 16);
    assert_eq!(tracker.peak(), 1);
    assert_eq!(tracker.overlapping_pairs(), 0);
    assert!(fixture.leftovers()?.is_empty());
    Ok(())
}

#[tokio::test]
async fn dropped_caller_does_not_interrupt_the_job() -> Result<()> {
    let fixture = StagingFixture::new()?;
    let tracker = Arc::new(OverlapTracker::new(
        MirrorConverter::default(),
        Duration::from_millis(200),
    ));
    let service = service_with(tracker.clone(), &fixture)?;

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        service.run(RequestJob::new(Operation::Encode, "photo.png", b"pixels".to_vec())),
    )
    .await;
    assert!(abandoned.is_err(), "job finished before the caller gave up");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while service.metrics().conversions("encode", "success") == 0 {
        anyhow::ensure!(tokio::time::Instant::now() < deadline, "job never finished");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(tracker.calls(), 1);
    assert!(fixture.leftovers()?.is_empty());
    Ok(())
}
