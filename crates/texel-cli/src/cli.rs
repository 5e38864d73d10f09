//! Argument parsing and command dispatch.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use url::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliResult, parse_url};
use crate::commands::convert::{handle_decode, handle_encode};
use crate::commands::health::handle_health;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Parser)]
#[command(name = "texel", about = "Encode and decode files through a Texel server")]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "TEXEL_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) api_url: Url,
    #[arg(
        long,
        global = true,
        env = "TEXEL_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        help = "Request timeout in seconds"
    )]
    pub(crate) timeout: u64,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Convert a file into an artifact.
    Encode(TransferArgs),
    /// Recover the original file from an artifact.
    Decode(TransferArgs),
    /// Report server health.
    Health,
}

#[derive(Args)]
pub(crate) struct TransferArgs {
    #[arg(help = "File to upload")]
    pub(crate) file: PathBuf,
    #[arg(long, help = "Directory for the downloaded result (defaults to the current directory)")]
    pub(crate) output_dir: Option<PathBuf>,
}

/// Parses CLI arguments, executes the requested command, and returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let trace_id = Uuid::new_v4().to_string();
    match dispatch(cli, &trace_id).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli, trace_id: &str) -> CliResult<()> {
    let ctx = AppContext::connect(cli.api_url, Duration::from_secs(cli.timeout), trace_id)?;
    match cli.command {
        Command::Encode(args) => handle_encode(&ctx, args).await,
        Command::Decode(args) => handle_decode(&ctx, args).await,
        Command::Health => handle_health(&ctx).await,
    }
}
