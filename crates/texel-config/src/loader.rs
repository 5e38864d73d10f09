//! Environment parsing for [`ServerConfig`].
//!
//! # Design
//! - Every variable is optional; absent values fall back to `defaults.rs`.
//! - Parsing goes through a lookup function so tests never mutate the process environment.

use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::defaults::{
    DEFAULT_BIND_ADDR, DEFAULT_CONVERTER_BIN, DEFAULT_HTTP_PORT, DEFAULT_MAX_UPLOAD_BYTES,
    DEFAULT_RECOVERY_MARKER, DEFAULT_SECTION_TIMEOUT_SECS, DEFAULT_STAGING_DIR_NAME,
};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{ConverterCommand, ServerConfig};

const ENV_BIND_ADDR: &str = "TEXEL_BIND_ADDR";
const ENV_HTTP_PORT: &str = "TEXEL_HTTP_PORT";
const ENV_CONVERTER_BIN: &str = "TEXEL_CONVERTER_BIN";
const ENV_CONVERTER_ARGS: &str = "TEXEL_CONVERTER_ARGS";
const ENV_STAGING_ROOT: &str = "TEXEL_STAGING_ROOT";
const ENV_RECOVERY_MARKER: &str = "TEXEL_RECOVERY_MARKER";
const ENV_SECTION_TIMEOUT_SECS: &str = "TEXEL_SECTION_TIMEOUT_SECS";
const ENV_MAX_UPLOAD_BYTES: &str = "TEXEL_MAX_UPLOAD_BYTES";
const ENV_LOG_FORMAT: &str = "TEXEL_LOG_FORMAT";

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when a variable is set to an unusable value.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when a variable is set to an unusable value.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = match get(ENV_BIND_ADDR) {
            Some(raw) => IpAddr::from_str(&raw)
                .map_err(|_| ConfigError::invalid(ENV_BIND_ADDR, "not_an_ip_address", &raw))?,
            None => IpAddr::from_str(DEFAULT_BIND_ADDR).map_err(|_| {
                ConfigError::invalid(ENV_BIND_ADDR, "invalid_default", DEFAULT_BIND_ADDR)
            })?,
        };

        let http_port = match get(ENV_HTTP_PORT) {
            Some(raw) => parse_non_zero::<u16>(ENV_HTTP_PORT, &raw)?,
            None => DEFAULT_HTTP_PORT,
        };

        let converter = ConverterCommand {
            program: PathBuf::from(
                get(ENV_CONVERTER_BIN).unwrap_or_else(|| DEFAULT_CONVERTER_BIN.to_string()),
            ),
            args: get(ENV_CONVERTER_ARGS)
                .map(|raw| raw.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        };

        let staging_root = get(ENV_STAGING_ROOT).map_or_else(
            || std::env::temp_dir().join(DEFAULT_STAGING_DIR_NAME),
            PathBuf::from,
        );
        if staging_root.is_relative() {
            // Relative roots would resolve against the converter's working directory.
            return Err(ConfigError::invalid(
                ENV_STAGING_ROOT,
                "must_be_absolute",
                &staging_root.display().to_string(),
            ));
        }

        let recovery_marker = get(ENV_RECOVERY_MARKER)
            .unwrap_or_else(|| DEFAULT_RECOVERY_MARKER.to_string());
        if recovery_marker.contains(['/', '\\']) {
            return Err(ConfigError::invalid(
                ENV_RECOVERY_MARKER,
                "contains_path_separator",
                &recovery_marker,
            ));
        }

        let section_timeout = match get(ENV_SECTION_TIMEOUT_SECS) {
            Some(raw) => Duration::from_secs(parse_non_zero::<u64>(ENV_SECTION_TIMEOUT_SECS, &raw)?),
            None => Duration::from_secs(DEFAULT_SECTION_TIMEOUT_SECS),
        };

        let max_upload_bytes = match get(ENV_MAX_UPLOAD_BYTES) {
            Some(raw) => parse_non_zero::<usize>(ENV_MAX_UPLOAD_BYTES, &raw)?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let config = Self {
            bind_addr,
            http_port,
            converter,
            staging_root,
            recovery_marker,
            section_timeout,
            max_upload_bytes,
            log_format: get(ENV_LOG_FORMAT),
        };
        debug!(
            addr = %config.socket_addr(),
            staging_root = %config.staging_root.display(),
            converter = %config.converter.program.display(),
            "server configuration loaded"
        );
        Ok(config)
    }
}

fn parse_non_zero<T>(field: &'static str, raw: &str) -> ConfigResult<T>
where
    T: FromStr + PartialEq + Default,
{
    let value = raw
        .parse::<T>()
        .map_err(|_| ConfigError::invalid(field, "not_a_number", raw))?;
    if value == T::default() {
        return Err(ConfigError::invalid(field, "zero", raw));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> ConfigResult<ServerConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() -> ConfigResult<()> {
        let config = load(&[])?;
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8000");
        assert_eq!(config.converter.program, PathBuf::from("texeldb"));
        assert!(config.converter.args.is_empty());
        assert!(config.staging_root.ends_with(DEFAULT_STAGING_DIR_NAME));
        assert_eq!(config.recovery_marker, "-recovered");
        assert_eq!(config.section_timeout, Duration::from_secs(120));
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(config.log_format.is_none());
        Ok(())
    }

    #[test]
    fn explicit_values_override_defaults() -> ConfigResult<()> {
        let config = load(&[
            ("TEXEL_BIND_ADDR", "127.0.0.1"),
            ("TEXEL_HTTP_PORT", "9100"),
            ("TEXEL_CONVERTER_BIN", "/opt/texel/bin/python3"),
            ("TEXEL_CONVERTER_ARGS", "-m  texeldb"),
            ("TEXEL_STAGING_ROOT", "/srv/texel/staging"),
            ("TEXEL_RECOVERY_MARKER", ".restored"),
            ("TEXEL_SECTION_TIMEOUT_SECS", "5"),
            ("TEXEL_MAX_UPLOAD_BYTES", "1024"),
            ("TEXEL_LOG_FORMAT", "json"),
        ])?;
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:9100");
        assert_eq!(config.converter.args, vec!["-m", "texeldb"]);
        assert_eq!(config.staging_root, PathBuf::from("/srv/texel/staging"));
        assert_eq!(config.recovery_marker, ".restored");
        assert_eq!(config.section_timeout, Duration::from_secs(5));
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(config.log_format.as_deref(), Some("json"));
        Ok(())
    }

    #[test]
    fn blank_values_fall_back_to_defaults() -> ConfigResult<()> {
        let config = load(&[("TEXEL_HTTP_PORT", "  "), ("TEXEL_RECOVERY_MARKER", "")])?;
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(config.recovery_marker, DEFAULT_RECOVERY_MARKER);
        Ok(())
    }

    #[test]
    fn invalid_values_are_rejected_with_field_context() {
        let cases = [
            ("TEXEL_BIND_ADDR", "localhost", "not_an_ip_address"),
            ("TEXEL_HTTP_PORT", "0", "zero"),
            ("TEXEL_HTTP_PORT", "70000", "not_a_number"),
            ("TEXEL_STAGING_ROOT", "relative/dir", "must_be_absolute"),
            ("TEXEL_RECOVERY_MARKER", "a/b", "contains_path_separator"),
            ("TEXEL_SECTION_TIMEOUT_SECS", "0", "zero"),
            ("TEXEL_MAX_UPLOAD_BYTES", "lots", "not_a_number"),
        ];
        for (key, value, expected_reason) in cases {
            match load(&[(key, value)]) {
                Err(ConfigError::InvalidField { field, reason, .. }) => {
                    assert_eq!(field, key);
                    assert_eq!(reason, expected_reason, "{key}={value}");
                }
                Ok(_) => panic!("expected {key}={value} to be rejected"),
            }
        }
    }
}
