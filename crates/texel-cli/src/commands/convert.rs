use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::cli::TransferArgs;
use crate::client::{AppContext, CliError, CliResult, problem_error};

const UPLOAD_FIELD: &str = "file";

pub(crate) async fn handle_encode(ctx: &AppContext, args: TransferArgs) -> CliResult<()> {
    let saved = transfer(ctx, "/encode/", "encoded.gif", &args).await?;
    println!("Encoded artifact saved to {}", saved.display());
    Ok(())
}

pub(crate) async fn handle_decode(ctx: &AppContext, args: TransferArgs) -> CliResult<()> {
    let saved = transfer(ctx, "/decode/", "decoded.bin", &args).await?;
    println!("Recovered file saved to {}", saved.display());
    Ok(())
}

async fn transfer(
    ctx: &AppContext,
    path: &str,
    fallback_name: &str,
    args: &TransferArgs,
) -> CliResult<PathBuf> {
    let file_name = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            CliError::rejected(format!("{} does not name a file", args.file.display()))
        })?
        .to_string();

    let payload = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))
        .map_err(CliError::failure)?;

    let form = Form::new().part(UPLOAD_FIELD, Part::bytes(payload).file_name(file_name));
    let url = ctx.endpoint(path)?;
    debug!(%url, file = %args.file.display(), "uploading file");

    let response = ctx
        .client
        .post(url)
        .multipart(form)
        .send()
        .await
        .map_err(|err| CliError::failure(anyhow!("request to {path} failed: {err}")))?;

    if !response.status().is_success() {
        return Err(problem_error(response).await);
    }

    let name = response
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(attachment_file_name)
        .unwrap_or_else(|| fallback_name.to_string());

    let contents = response
        .bytes()
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to read response body: {err}")))?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let destination = output_dir.join(&name);
    tokio::fs::write(&destination, &contents)
        .await
        .with_context(|| format!("failed to write {}", destination.display()))
        .map_err(CliError::failure)?;
    debug!(path = %destination.display(), bytes = contents.len(), "saved response");
    Ok(destination)
}

/// Extract the `filename` parameter from a `Content-Disposition` value and
/// reduce it to a bare file name.
fn attachment_file_name(header: &str) -> Option<String> {
    let (_, rest) = header.split_once("filename=")?;
    let raw = if let Some(quoted) = rest.strip_prefix('"') {
        let mut value = String::new();
        let mut chars = quoted.chars();
        loop {
            match chars.next()? {
                '\\' => value.push(chars.next()?),
                '"' => break,
                ch => value.push(ch),
            }
        }
        value
    } else {
        rest.split(';').next().unwrap_or_default().trim().to_string()
    };

    let name = Path::new(&raw).file_name()?.to_str()?.to_string();
    if name.is_empty() { None } else { Some(name) }
}
