//! Operations and the converter capability.

use std::fmt;
use std::path::{Path, PathBuf};

/// Direction of a conversion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// File to artifact.
    Encode,
    /// Artifact back to the original file.
    Decode,
}

impl Operation {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Encode => "encode",
            Self::Decode => "decode",
        }
    }

    /// Content type of the file produced by this operation.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Encode => "image/gif",
            Self::Decode => "application/octet-stream",
        }
    }

    /// Noun used in caller-facing failure details ("Encoding failed: ...").
    #[must_use]
    pub const fn gerund(self) -> &'static str {
        match self {
            Self::Encode => "Encoding",
            Self::Decode => "Decoding",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External converter bound to the process working directory.
///
/// Both calls receive a path relative to the current working directory and
/// write their output into that same directory. Implementations are invoked
/// from the blocking thread pool and may block.
pub trait Converter: Send + Sync + 'static {
    /// Convert `input` into an artifact and return the artifact's path.
    ///
    /// # Errors
    ///
    /// Returns an error when the converter rejects or fails on the input.
    fn convert_forward(&self, input: &Path) -> anyhow::Result<PathBuf>;

    /// Recover the original file from the artifact at `input`.
    ///
    /// The output is not returned; it carries the recovery marker in its name.
    ///
    /// # Errors
    ///
    /// Returns an error when the converter rejects or fails on the input.
    fn convert_backward(&self, input: &Path) -> anyhow::Result<()>;
}
