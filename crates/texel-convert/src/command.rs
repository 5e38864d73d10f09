//! Converter backed by an external command-line program.
//!
//! The program is invoked as `<program> <args..> encode <file>` or
//! `<program> <args..> decode <file>` and inherits the process working
//! directory. On encode it must print the artifact's file name as the last
//! non-empty line of stdout.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, bail};
use tracing::debug;

use crate::converter::{Converter, Operation};

/// Runs an external converter binary once per call.
///
/// A relative `program` path containing a separator resolves against the
/// working directory at call time, which is the staging directory; use a
/// bare name found on `PATH` or an absolute path.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandConverter {
    /// Build a converter that runs `program` with `args` before the operation verb.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Program that will be executed.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, operation: Operation, input: &Path) -> anyhow::Result<String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(operation.as_str())
            .arg(operand(input).as_ref())
            .output()
            .with_context(|| format!("failed to start converter {}", self.program.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.is_empty() {
                bail!("converter exited with {}", output.status);
            }
            bail!("converter exited with {}: {stderr}", output.status);
        }
        debug!(
            program = %self.program.display(),
            operation = operation.as_str(),
            "converter finished"
        );
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// `input` as a command-line operand: a relative name starting with `-` is
/// prefixed with `./` so the converter cannot read it as an option.
fn operand(input: &Path) -> Cow<'_, Path> {
    if input.is_relative() && input.as_os_str().as_encoded_bytes().starts_with(b"-") {
        Cow::Owned(Path::new(".").join(input))
    } else {
        Cow::Borrowed(input)
    }
}

impl Converter for CommandConverter {
    fn convert_forward(&self, input: &Path) -> anyhow::Result<PathBuf> {
        let stdout = self.run(Operation::Encode, input)?;
        let reported = stdout
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .context("converter did not report an output file")?;
        Ok(PathBuf::from(reported))
    }

    fn convert_backward(&self, input: &Path) -> anyhow::Result<()> {
        self.run(Operation::Decode, input).map(|_| ())
    }
}
