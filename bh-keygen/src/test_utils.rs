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

//! Helpers for testing code built on top of [`KeyGen`][crate::KeyGen].
//!
//! Do NOT use these in production code.

use std::sync::Mutex;

use crate::{Invocation, Operation, Result, ToolOutput, Toolchain};

/// [`Toolchain`] that records every invocation and writes a placeholder file
/// to the `-out` path instead of running `openssl`.
#[derive(Debug, Default)]
pub struct StubToolchain {
    invocations: Mutex<Vec<Invocation>>,
    failure: Option<(Operation, String)>,
}

impl StubToolchain {
    /// Stub where every operation succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `operation` exit with status `1` and the given stderr.
    pub fn failing(operation: Operation, stderr: &str) -> Self {
        Self {
            invocations: Mutex::default(),
            failure: Some((operation, stderr.to_owned())),
        }
    }

    /// Every invocation so far, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Operations invoked so far, in order.
    pub fn operations(&self) -> Vec<Operation> {
        self.invocations()
            .iter()
            .map(|invocation| invocation.operation)
            .collect()
    }

    /// Forgets the recorded invocations.
    pub fn clear(&self) {
        self.invocations.lock().unwrap().clear();
    }
}

impl Toolchain for StubToolchain {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        self.invocations.lock().unwrap().push(invocation.clone());

        if let Some((operation, stderr)) = &self.failure {
            if *operation == invocation.operation {
                return Ok(ToolOutput {
                    success: false,
                    code: Some(1),
                    stderr: stderr.clone(),
                });
            }
        }

        if let Some(out) = invocation.arg_after("-out") {
            tokio::fs::write(out, invocation.operation.to_string())
                .await
                .unwrap();
        }

        Ok(ToolOutput::ok())
    }
}
