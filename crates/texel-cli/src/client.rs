//! HTTP plumbing shared by the commands: the request context, error
//! classification and exit codes.

use std::fmt;
use std::time::Duration;

use anyhow::anyhow;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use texel_api::models::ProblemDetails;
use url::Url;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Why a command failed, which decides the process exit code.
#[derive(Debug)]
pub(crate) enum CliError {
    /// The server refused the upload (4xx) or the arguments were unusable.
    Rejected(String),
    /// The server is busy or degraded (503); retrying later may succeed.
    Unavailable(String),
    /// Anything else: transport errors, 5xx responses, local IO.
    Failure(anyhow::Error),
}

pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Rejected(_) => 2,
            Self::Failure(_) => 3,
            Self::Unavailable(_) => 4,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Rejected(message) | Self::Unavailable(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_message())
    }
}

impl std::error::Error for CliError {}

/// Client and server address handed to every command.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
}

impl AppContext {
    /// Client that gives up after `timeout` and tags requests with `trace_id`.
    pub(crate) fn connect(base_url: Url, timeout: Duration, trace_id: &str) -> CliResult<Self> {
        let trace = HeaderValue::from_str(trace_id)
            .map_err(|err| CliError::failure(anyhow!("unusable trace id {trace_id:?}: {err}")))?;
        let headers = HeaderMap::from_iter([(HeaderName::from_static(REQUEST_ID_HEADER), trace)]);
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| CliError::failure(anyhow!("cannot build http client: {err}")))?;
        Ok(Self { client, base_url })
    }

    /// `path` resolved against the server address.
    pub(crate) fn endpoint(&self, path: &str) -> CliResult<Url> {
        self.base_url.join(path).map_err(|err| {
            CliError::failure(anyhow!(
                "cannot resolve {path} against {}: {err}",
                self.base_url
            ))
        })
    }
}

/// clap value parser for `--api-url`.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    Url::parse(input).map_err(|err| format!("{input:?} is not a valid URL: {err}"))
}

/// Turn a non-success response into an error, preferring the problem `detail`.
pub(crate) async fn problem_error(response: Response) -> CliError {
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<ProblemDetails>(&body)
        .ok()
        .map(|problem| problem.detail.unwrap_or(problem.title))
        .or_else(|| {
            let text = String::from_utf8_lossy(&body).trim().to_string();
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    match status {
        StatusCode::SERVICE_UNAVAILABLE => CliError::Unavailable(message),
        status if status.is_client_error() => CliError::Rejected(message),
        status => CliError::failure(anyhow!("{message} (HTTP {})", status.as_u16())),
    }
}
