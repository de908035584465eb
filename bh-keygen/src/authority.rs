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

use std::{collections::BTreeMap, path::Path};

use bherror::traits::{ErrorContext as _, ForeignError as _};
use serde::Serialize;

use crate::{describe_files, gate, Artifact, CertifiedKey, Error, Result, Role};

/// A certificate authority: a private key and the certificate used to sign other certificates.
///
/// Only obtainable from [`KeyGen::create_ca`][crate::KeyGen::create_ca] or from files that
/// are known to exist via [`Authority::from_existing`].  It is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Authority(CertifiedKey);

impl Authority {
    pub(crate) fn new(pair: CertifiedKey) -> Self {
        Self(pair)
    }

    /// Loads an authority from an existing key and certificate.
    ///
    /// Both files must exist; they are reported with `created = false`.
    pub async fn from_existing(key: impl AsRef<Path>, crt: impl AsRef<Path>) -> Result<Self> {
        let mut paths = BTreeMap::new();
        for (role, path) in [(Role::Key, key.as_ref()), (Role::Crt, crt.as_ref())] {
            if !gate::exists(path).await? {
                return Err(bherror::Error::root(Error::MissingPrerequisite(
                    path.display().to_string(),
                )))
                .ctx(|| format!("authority {role} does not exist"));
            }

            let path = tokio::fs::canonicalize(path)
                .await
                .foreign_err(|| Error::Filesystem(path.display().to_string()))?;
            paths.insert(role, path);
        }

        let mut artifacts = describe_files(&paths, false).await?;
        let mut take = |role: Role| {
            artifacts.remove(&role).ok_or_else(|| {
                bherror::Error::root(Error::MissingPrerequisite(role.to_string()))
            })
        };

        Ok(Self(CertifiedKey {
            key: take(Role::Key)?,
            crt: take(Role::Crt)?,
        }))
    }

    /// The authority's private key.
    pub fn key(&self) -> &Artifact {
        &self.0.key
    }

    /// The authority's certificate.
    pub fn crt(&self) -> &Artifact {
        &self.0.crt
    }

    /// Unwraps the key and certificate.
    pub fn into_pair(self) -> CertifiedKey {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn from_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("root.key");
        let crt = dir.path().join("root.crt");
        std::fs::write(&key, "key").unwrap();
        std::fs::write(&crt, "crt").unwrap();

        let authority = Authority::from_existing(&key, &crt).await.unwrap();

        assert!(authority.key().path().ends_with("root.key"));
        assert!(authority.crt().path().ends_with("root.crt"));
        assert!(authority.key().path().is_absolute());
        assert!(!authority.key().created());
        assert!(!authority.crt().created());
    }

    #[tokio::test]
    async fn from_existing_requires_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("root.key");
        std::fs::write(&key, "key").unwrap();

        let err = Authority::from_existing(&key, dir.path().join("root.crt"))
            .await
            .unwrap_err();

        assert_matches!(err.error, Error::MissingPrerequisite(ref path) if path.ends_with("root.crt"));
    }
}
