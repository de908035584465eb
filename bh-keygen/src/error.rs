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

use crate::Operation;

/// Error returned by the crate API.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum Error {
    /// The artifact name cannot be used to form a path.
    #[strum(to_string = "Invalid artifact name `{0}`")]
    InvalidName(String),

    /// A file a step depends on (key, CSR or authority material) is missing.
    #[strum(to_string = "Missing prerequisite {0}")]
    MissingPrerequisite(String),

    /// The toolchain ran but exited unsuccessfully; carries its stderr.
    #[strum(to_string = "Toolchain operation `{0}` failed: {1}")]
    ToolchainFailed(Operation, String),

    /// The toolchain executable could not be spawned or is not usable.
    #[strum(to_string = "Toolchain executable `{0}` is not available")]
    ToolchainUnavailable(String),

    /// Filesystem access failed for a reason other than the path being absent.
    #[strum(to_string = "Filesystem error at {0}")]
    Filesystem(String),

    /// A command template references a parameter that was not supplied.
    #[strum(to_string = "Variable {0} not defined")]
    MissingParameter(String),

    /// The configuration could not be resolved into absolute paths.
    #[strum(to_string = "Invalid configuration")]
    InvalidConfig,
}

impl bherror::BhError for Error {}

/// The [`bherror::Result`] type with the error type of
/// [`bh_keygen::Error`](Error), used throughout this crate.
pub type Result<T> = bherror::Result<T, Error>;
