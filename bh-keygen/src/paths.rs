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

//! Derivation of artifact paths and of the `-subj` argument.

use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, Subject};

/// The role a file plays for a named artifact.
#[derive(
    strum_macros::Display,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    /// RSA private key.
    Key,
    /// Certificate.
    Crt,
    /// Certificate signing request.
    Csr,
}

impl Role {
    /// File extension used for this role.
    pub fn extension(self) -> &'static str {
        match self {
            Role::Key => "key",
            Role::Crt => "crt",
            Role::Csr => "csr",
        }
    }
}

/// Absolute paths of the files belonging to one named artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// `<dir>/<name>.key`
    pub key: PathBuf,
    /// `<dir>/<name>.crt`
    pub crt: PathBuf,
    /// `<dir>/<name>.csr`, only when requested.
    pub csr: Option<PathBuf>,
}

impl ArtifactPaths {
    /// Path of the file playing `role`, if it was resolved.
    pub fn get(&self, role: Role) -> Option<&Path> {
        match role {
            Role::Key => Some(&self.key),
            Role::Crt => Some(&self.crt),
            Role::Csr => self.csr.as_deref(),
        }
    }
}

/// Resolves the paths for `name` inside the artifact directory `dir`.
///
/// This is a pure function of its arguments; the name is not validated here.
pub fn resolve_artifact_paths(dir: &Path, name: &str, include_csr: bool) -> ArtifactPaths {
    let file = |role: Role| dir.join(format!("{name}.{}", role.extension()));

    ArtifactPaths {
        key: file(Role::Key),
        crt: file(Role::Crt),
        csr: include_csr.then(|| file(Role::Csr)),
    }
}

/// Checks that `name` can be used as a relative file name under the artifact directory.
///
/// `/` is allowed to nest artifacts, but every segment must be a plain file name.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let invalid = || Err(bherror::Error::root(Error::InvalidName(name.to_owned())));

    if name.is_empty() || name.chars().any(char::is_control) {
        return invalid();
    }

    if name
        .split(['/', '\\'])
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return invalid();
    }

    Ok(())
}

/// Builds the `-subj` argument for `name`, e.g. `/C=EE/ST=Harjumaa/CN=alice-1700000000000`.
///
/// The common name is the name with path separators replaced by `_`,
/// suffixed with the current time in milliseconds.
pub fn build_subject_string(name: &str, subject: &Subject) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();

    subject_string_at(name, subject, millis)
}

fn subject_string_at(name: &str, subject: &Subject, millis: u128) -> String {
    let mut subj: String = subject
        .iter()
        .map(|(field, value)| format!("/{field}={value}"))
        .collect();

    let common_name = name.replace(['/', '\\'], "_");
    subj.push_str(&format!("/CN={common_name}-{millis}"));
    subj
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn paths_without_csr() {
        let paths = resolve_artifact_paths(Path::new("/tmp/x/certs"), "test", false);

        assert_eq!(paths.key, Path::new("/tmp/x/certs/test.key"));
        assert_eq!(paths.crt, Path::new("/tmp/x/certs/test.crt"));
        assert_eq!(paths.csr, None);
        assert_eq!(paths.get(Role::Csr), None);
    }

    #[test]
    fn paths_with_csr() {
        let paths = resolve_artifact_paths(Path::new("/tmp/x/certs"), "test", true);

        assert_eq!(paths.get(Role::Csr), Some(Path::new("/tmp/x/certs/test.csr")));
        assert!(paths.csr.unwrap().ends_with("test.csr"));
    }

    #[test]
    fn nested_names_stay_under_the_folder() {
        let paths = resolve_artifact_paths(Path::new("/srv/certs"), "web/api", false);

        assert_eq!(paths.key, Path::new("/srv/certs/web/api.key"));
    }

    #[test]
    fn subject_string_lists_fields_then_cn() {
        let subject = Subject::empty().with("C", "HR").with("O", "TBTL");

        assert_eq!(
            subject_string_at("web/api", &subject, 42),
            "/C=HR/O=TBTL/CN=web_api-42"
        );
    }

    #[test]
    fn default_subject_string() {
        let subj = build_subject_string("alice", &Subject::default());

        assert!(subj.starts_with(
            "/C=EE/ST=Harjumaa/L=Tallinn/O=Example/OU=Unit/emailAddress=admin@email.address/CN=alice-"
        ));
    }

    #[test]
    fn name_validation() {
        assert!(validate_name("alice").is_ok());
        assert!(validate_name("web/api.example.com").is_ok());

        for name in ["", "/etc/passwd", "../escape", "a/./b", "a//b", "trailing/", "nul\0"] {
            let err = validate_name(name).unwrap_err();
            assert_matches!(err.error, Error::InvalidName(ref n) if n == name);
        }
    }
}
