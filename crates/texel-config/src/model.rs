//! Typed configuration consumed by the application bootstrap.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Executable and leading arguments used to invoke the converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterCommand {
    /// Program name or path.
    pub program: PathBuf,
    /// Arguments placed before the `encode`/`decode` verb.
    pub args: Vec<String>,
}

/// Fully validated server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface the HTTP listener binds to.
    pub bind_addr: IpAddr,
    /// Port the HTTP listener binds to; never zero.
    pub http_port: u16,
    /// Converter invocation.
    pub converter: ConverterCommand,
    /// Parent directory for per-request staging areas.
    pub staging_root: PathBuf,
    /// Substring identifying the converter's decode output.
    pub recovery_marker: String,
    /// Upper bound on waiting for the working-directory critical section.
    pub section_timeout: Duration,
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: usize,
    /// Requested log format name (`json` or `pretty`), when set.
    pub log_format: Option<String>,
}

impl ServerConfig {
    /// Socket address for the HTTP listener.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.http_port)
    }
}
