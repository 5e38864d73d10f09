//! Default values applied when an environment variable is absent.

/// Default bind address for the HTTP listener.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
/// Default HTTP port.
pub const DEFAULT_HTTP_PORT: u16 = 8000;
/// Default converter executable, resolved through `PATH`.
pub const DEFAULT_CONVERTER_BIN: &str = "texeldb";
/// Directory name created under the system temp dir for staging areas.
pub const DEFAULT_STAGING_DIR_NAME: &str = "texel-staging";
/// Marker the converter embeds in the name of a recovered file.
pub const DEFAULT_RECOVERY_MARKER: &str = "-recovered";
/// Upper bound on waiting for the working-directory critical section.
pub const DEFAULT_SECTION_TIMEOUT_SECS: u64 = 120;
/// Largest accepted request body.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;
