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

use std::{io, path::Path};

use bherror::traits::{ErrorContext as _, ForeignError as _};

use crate::{Error, Result};

/// Whether `path` exists.
///
/// Only [`io::ErrorKind::NotFound`] counts as absent; every other failure is
/// reported as [`Error::Filesystem`].
pub async fn exists(path: &Path) -> Result<bool> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err)
            .foreign_err(|| Error::Filesystem(path.display().to_string()))
            .ctx(|| "cannot check whether the artifact exists"),
    }
}

/// Whether the artifact at `path` has to be (re)built.
///
/// The path is always inspected, so filesystem failures surface even when
/// `force` is set.
pub async fn needs_creation(path: &Path, force: bool) -> Result<bool> {
    let exists = exists(path).await?;
    Ok(force || !exists)
}
