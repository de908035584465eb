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

use std::{fmt, path::PathBuf};

use bherror::traits::{ErrorContext as _, ForeignError as _};
use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::Error;

/// Default RSA modulus size in bits.
pub const DEFAULT_KEY_SIZE: u32 = 4096;

/// Default directory, relative to the root, where artifacts are stored.
pub const DEFAULT_FOLDER: &str = "certs";

/// Distinguished name fields used for every generated CSR and certificate.
///
/// The fields are kept in insertion order, which is also the order they
/// appear in the `-subj` argument.  Setting a field that is already present
/// replaces its value in place; new fields are appended.
///
/// Deserializing a [`Subject`] overlays the given fields on top of
/// [`Subject::default`], so a configuration only needs to name the fields
/// it wants to change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject(Vec<(String, String)>);

impl Subject {
    /// A subject without any fields.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Sets `field` to `value`, keeping the position of an existing field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let field = field.into();
        let value = value.into();
        match self.0.iter_mut().find(|(code, _)| *code == field) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((field, value)),
        }
        self
    }

    /// Builder flavour of [`Subject::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Value of `field`, if present.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(code, _)| code == field)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over `(field, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(field, value)| (field.as_str(), value.as_str()))
    }
}

impl Default for Subject {
    fn default() -> Self {
        Self::empty()
            .with("C", "EE")
            .with("ST", "Harjumaa")
            .with("L", "Tallinn")
            .with("O", "Example")
            .with("OU", "Unit")
            .with("emailAddress", "admin@email.address")
    }
}

impl Serialize for Subject {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, value) in &self.0 {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Subject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SubjectVisitor;

        impl<'de> Visitor<'de> for SubjectVisitor {
            type Value = Subject;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of subject field codes to values")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Subject, A::Error> {
                let mut subject = Subject::default();
                while let Some((field, value)) = access.next_entry::<String, String>()? {
                    subject.set(field, value);
                }
                Ok(subject)
            }
        }

        deserializer.deserialize_map(SubjectVisitor)
    }
}

/// Construction-time configuration of a [`KeyGen`][crate::KeyGen].
///
/// Every field has a default, so partial configurations deserialize fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Subject fields embedded in CSRs and certificates.
    #[serde(alias = "subj")]
    pub subject: Subject,
    /// RSA key size in bits.
    pub size: u32,
    /// Root directory; the current working directory when absent.
    pub root: Option<PathBuf>,
    /// Directory under `root` holding every artifact.
    pub folder: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            subject: Subject::default(),
            size: DEFAULT_KEY_SIZE,
            root: None,
            folder: PathBuf::from(DEFAULT_FOLDER),
        }
    }
}

impl Config {
    /// Replaces the subject fields.
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = subject;
        self
    }

    /// Sets the RSA key size in bits.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Sets the root directory.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Sets the artifact directory, relative to the root.
    pub fn with_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.folder = folder.into();
        self
    }

    /// Absolute directory where artifacts live, i.e. `root/folder`.
    ///
    /// Relative roots are resolved against the current working directory.
    pub(crate) fn artifact_dir(&self) -> crate::Result<PathBuf> {
        let root = match &self.root {
            Some(root) if root.is_absolute() => root.clone(),
            other => {
                let cwd = std::env::current_dir()
                    .foreign_err(|| Error::InvalidConfig)
                    .ctx(|| "cannot determine the current working directory")?;
                match other {
                    Some(relative) => cwd.join(relative),
                    None => cwd,
                }
            }
        };
        Ok(root.join(&self.folder))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn default_subject_keeps_field_order() {
        let fields: Vec<_> = Subject::default().iter().map(|(f, _)| f.to_owned()).collect();

        assert_eq!(fields, ["C", "ST", "L", "O", "OU", "emailAddress"]);
    }

    #[test]
    fn overriding_a_field_keeps_its_position() {
        let subject = Subject::default().with("O", "TBTL").with("CN", "ignored");

        let pairs: Vec<_> = subject.iter().collect();
        assert_eq!(pairs[3], ("O", "TBTL"));
        assert_eq!(pairs.last(), Some(&("CN", "ignored")));
        assert_eq!(subject.get("C"), Some("EE"));
    }

    #[test]
    fn deserialized_config_overlays_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "subj": { "O": "TBTL", "unit": "Team Bee" },
                "size": 2048,
                "root": "/tmp/x/"
            }"#,
        )
        .unwrap();

        assert_eq!(config.size, 2048);
        assert_eq!(config.folder, Path::new("certs"));
        assert_eq!(config.subject.get("O"), Some("TBTL"));
        assert_eq!(config.subject.get("L"), Some("Tallinn"));
        assert_eq!(config.subject.iter().last(), Some(("unit", "Team Bee")));
        assert_eq!(
            config.artifact_dir().unwrap(),
            Path::new("/tmp/x/certs").to_path_buf()
        );
    }

    #[test]
    fn relative_root_resolves_against_cwd() {
        let config = Config::default().with_root("sub").with_folder("keys");

        let dir = config.artifact_dir().unwrap();

        assert!(dir.is_absolute());
        assert!(dir.ends_with("sub/keys"));
    }

    #[test]
    fn subject_serializes_in_insertion_order() {
        let subject = Subject::empty().with("ST", "Zagreb").with("C", "HR");

        assert_eq!(
            serde_json::to_string(&subject).unwrap(),
            r#"{"ST":"Zagreb","C":"HR"}"#
        );
    }
}
