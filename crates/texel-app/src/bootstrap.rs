use std::fs;
use std::future::Future;
use std::sync::Arc;

use texel_api::ApiServer;
use texel_config::ServerConfig;
use texel_convert::{CommandConverter, ConversionService, ConversionSettings};
use texel_telemetry::{LogFormat, LoggingConfig, Metrics, app_span};
use tracing::{Instrument, info, warn};

use crate::error::{AppError, AppResult};

/// Dependencies required to bootstrap the Texel server.
pub(crate) struct BootstrapDependencies {
    config: ServerConfig,
    telemetry: Metrics,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let config =
            ServerConfig::from_env().map_err(|err| AppError::config("config.from_env", err))?;
        Self::from_config(config)
    }

    pub(crate) fn from_config(config: ServerConfig) -> AppResult<Self> {
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self { config, telemetry })
    }
}

/// Entry point for the Texel server boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, logging, or the API listener fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    let logging = LoggingConfig::with_format(LogFormat::parse_or_infer(
        dependencies.config.log_format.as_deref(),
    ));
    texel_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    serve(dependencies, shutdown_signal())
        .instrument(app_span("texel"))
        .await
}

/// Serve until `shutdown` resolves. Logging must already be installed.
pub(crate) async fn serve<F>(dependencies: BootstrapDependencies, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let BootstrapDependencies { config, telemetry } = dependencies;
    info!(
        addr = %config.socket_addr(),
        converter = %config.converter.program.display(),
        staging_root = %config.staging_root.display(),
        recovery_marker = %config.recovery_marker,
        section_timeout_secs = config.section_timeout.as_secs(),
        max_upload_bytes = config.max_upload_bytes,
        "Texel server bootstrap starting"
    );

    fs::create_dir_all(&config.staging_root).map_err(|source| AppError::StagingRoot {
        path: config.staging_root.clone(),
        source,
    })?;

    let addr = config.socket_addr();
    build_server(&config, telemetry)
        .serve_with_shutdown(addr, shutdown)
        .await
        .map_err(|err| AppError::api_server("api.serve", err))?;

    info!("Texel server stopped");
    Ok(())
}

pub(crate) fn build_server(config: &ServerConfig, telemetry: Metrics) -> ApiServer {
    let converter = CommandConverter::new(
        config.converter.program.clone(),
        config.converter.args.clone(),
    );
    let service = ConversionService::new(
        Arc::new(converter),
        ConversionSettings {
            staging_root: config.staging_root.clone(),
            recovery_marker: config.recovery_marker.clone(),
            section_timeout: config.section_timeout,
        },
        telemetry,
    );
    ApiServer::new(service, config.max_upload_bytes)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c; shutting down");
        return;
    }
    info!("shutdown signal received");
}
