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

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use bherror::traits::{ErrorContext as _, ForeignError as _};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, Role};

/// Kind of filesystem entry a [`FileDescriptor`] points at.
#[derive(strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link (not followed).
    Symlink,
    /// Anything else, e.g. a socket.
    Other,
}

/// Description of one file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// File name including the extension, e.g. `alice.key`.
    pub name: String,
    /// File name without the extension, e.g. `alice`.
    pub base_name: String,
    /// Extension without the dot, e.g. `key`.
    pub extension: String,
    /// Kind of the entry.
    #[serde(rename = "type")]
    pub file_type: FileType,
    /// Absolute path.
    pub path: PathBuf,
}

/// Maps `path` to a [`FileDescriptor`].
///
/// The entry must exist.  Whether it was just created is not this function's concern.
pub async fn map_file(path: &Path) -> Result<FileDescriptor> {
    let metadata = tokio::fs::symlink_metadata(path)
        .await
        .foreign_err(|| Error::Filesystem(path.display().to_string()))
        .ctx(|| "cannot describe the artifact")?;

    let file_type = if metadata.is_symlink() {
        FileType::Symlink
    } else if metadata.is_dir() {
        FileType::Directory
    } else if metadata.is_file() {
        FileType::File
    } else {
        FileType::Other
    };

    let lossy = |part: Option<&std::ffi::OsStr>| {
        part.map(|part| part.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    Ok(FileDescriptor {
        name: lossy(path.file_name()),
        base_name: lossy(path.file_stem()),
        extension: lossy(path.extension()),
        file_type,
        path: path.to_path_buf(),
    })
}

/// A file produced or reused by an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// What the file is.
    #[serde(flatten)]
    pub descriptor: FileDescriptor,
    /// `true` if this very operation produced the file, `false` if it was already there.
    pub created: bool,
}

impl Artifact {
    /// Absolute path of the file.
    pub fn path(&self) -> &Path {
        &self.descriptor.path
    }

    /// Whether the operation that returned this artifact produced it.
    pub fn created(&self) -> bool {
        self.created
    }
}

/// A private key together with the certificate issued for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertifiedKey {
    /// The private key.
    pub key: Artifact,
    /// The certificate.
    pub crt: Artifact,
}

impl CertifiedKey {
    /// The pair as a role-keyed mapping.
    pub fn into_map(self) -> BTreeMap<Role, Artifact> {
        BTreeMap::from([(Role::Key, self.key), (Role::Crt, self.crt)])
    }
}

/// Describes the file at `path`, attaching the `created` flag.
pub async fn describe_file(path: &Path, created: bool) -> Result<Artifact> {
    let descriptor = map_file(path).await?;
    Ok(Artifact {
        descriptor,
        created,
    })
}

/// Describes every file of `paths`, applying the same `created` flag to all of them.
pub async fn describe_files(
    paths: &BTreeMap<Role, PathBuf>,
    created: bool,
) -> Result<BTreeMap<Role, Artifact>> {
    let mut artifacts = BTreeMap::new();
    for (role, path) in paths {
        artifacts.insert(*role, describe_file(path, created).await?);
    }
    Ok(artifacts)
}
