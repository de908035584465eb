// Copyright (C) 2020-2025  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Module defining the interface to the external certificate toolchain.

use std::{future::Future, path::PathBuf, process::Stdio};

use bherror::traits::{ErrorContext as _, ForeignError as _};
use tokio::process::Command;

use crate::{Error, Invocation, Result};

/// What a finished toolchain process reported back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Whether the process exited with status `0`.
    pub success: bool,
    /// The exit code, if the process was not terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard error.
    pub stderr: String,
}

impl ToolOutput {
    /// Output of a process that exited with status `0`.
    pub fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
            stderr: String::new(),
        }
    }
}

impl From<std::process::Output> for ToolOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            success: output.status.success(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        }
    }
}

/// Trait that defines the interface for executing toolchain operations.
///
/// Implementations only run the process; interpreting the exit status is
/// left to the caller.
pub trait Toolchain {
    /// Executes `invocation` and waits for it to finish.
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<ToolOutput>> + Send;
}

/// [`Toolchain`] backed by the `openssl` command line tool.
#[derive(Debug, Clone)]
pub struct OpensslToolchain {
    program: PathBuf,
}

impl Default for OpensslToolchain {
    fn default() -> Self {
        Self::new("openssl")
    }
}

impl OpensslToolchain {
    /// Uses `program` as the `openssl` executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Checks that the executable can be run, returning its version string.
    pub async fn probe(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("version")
            .stdin(Stdio::null())
            .output()
            .await
            .foreign_err(|| self.unavailable())
            .ctx(|| "cannot run `openssl version`")?;

        if !output.status.success() {
            return Err(bherror::Error::root(self.unavailable()))
                .ctx(|| String::from_utf8_lossy(&output.stderr).trim().to_owned());
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    }

    fn unavailable(&self) -> Error {
        Error::ToolchainUnavailable(self.program.display().to_string())
    }
}

impl Toolchain for OpensslToolchain {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        tracing::trace!(
            program = %self.program.display(),
            args = ?invocation.args,
            "running {}",
            invocation.operation
        );

        let output = Command::new(&self.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .output()
            .await
            .foreign_err(|| self.unavailable())
            .ctx(|| format!("cannot start `{}`", invocation.operation))?;

        Ok(output.into())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn missing_executable_is_reported() {
        let toolchain = OpensslToolchain::new("/nonexistent/bin/openssl");

        let err = toolchain.probe().await.unwrap_err();
        assert_matches!(err.error, Error::ToolchainUnavailable(ref program) if program == "/nonexistent/bin/openssl");

        let invocation = crate::command::generate_key(std::path::Path::new("/tmp/k"), 1024).unwrap();
        let err = toolchain.run(&invocation).await.unwrap_err();
        assert_matches!(err.error, Error::ToolchainUnavailable(_));
    }

    #[cfg(unix)]
    #[test]
    fn output_conversion_keeps_stderr() {
        use std::os::unix::process::ExitStatusExt as _;

        let output = std::process::Output {
            status: std::process::ExitStatus::from_raw(1 << 8),
            stdout: Vec::new(),
            stderr: b"unable to load key\n".to_vec(),
        };

        let output = ToolOutput::from(output);

        assert!(!output.success);
        assert_eq!(output.code, Some(1));
        assert_eq!(output.stderr, "unable to load key");
    }
}
