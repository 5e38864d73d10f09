use anyhow::anyhow;
use reqwest::StatusCode;
use texel_api::models::HealthResponse;

use crate::client::{AppContext, CliError, CliResult, problem_error};

/// Print the server's health. A degraded server (503 with a health body)
/// is reported and exits as unavailable.
pub(crate) async fn handle_health(ctx: &AppContext) -> CliResult<()> {
    let url = ctx.endpoint("/health")?;
    let response = ctx
        .client
        .get(url)
        .send()
        .await
        .map_err(|err| CliError::failure(anyhow!("request to /health failed: {err}")))?;

    let status = response.status();
    if !status.is_success() && status != StatusCode::SERVICE_UNAVAILABLE {
        return Err(problem_error(response).await);
    }

    let health = response
        .json::<HealthResponse>()
        .await
        .map_err(|err| CliError::failure(anyhow!("unexpected /health body: {err}")))?;
    println!(
        "status: {} (critical section: {}, build: {})",
        health.status, health.critical_section, health.build
    );
    if status.is_success() {
        Ok(())
    } else {
        Err(CliError::Unavailable(format!(
            "server is {}; the critical section is {}",
            health.status, health.critical_section
        )))
    }
}
