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

//! Argument vectors for the four toolchain operations.
//!
//! Each operation has a fixed template of OpenSSL arguments in which whole
//! tokens of the form `{param}` are substituted.  Rendering fails with
//! [`Error::MissingParameter`] before anything is executed if a parameter
//! has not been supplied.

use std::{
    collections::BTreeMap,
    ffi::{OsStr, OsString},
    path::Path,
};

use crate::{Error, Result};

/// Validity period burnt into every issued certificate.
pub const CERTIFICATE_VALIDITY_DAYS: u32 = 365;

/// The toolchain operations the orchestrator relies on.
#[derive(strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Generate an RSA private key.
    #[strum(to_string = "genkey")]
    GenerateKey,
    /// Generate a CSR from an existing key.
    #[strum(to_string = "gencsr")]
    GenerateCsr,
    /// Self-sign a CA-capable certificate with an existing key.
    #[strum(to_string = "selfsign")]
    SelfSign,
    /// Sign a CSR with an authority's key and certificate.
    #[strum(to_string = "signcsr")]
    SignRequest,
}

impl Operation {
    fn template(self) -> &'static [&'static str] {
        match self {
            Operation::GenerateKey => &["genrsa", "-out", "{key}", "{size}"],
            Operation::GenerateCsr => &[
                "req", "-new", "-subj", "{subj}", "-key", "{key}", "-out", "{csr}",
            ],
            Operation::SelfSign => &[
                "req",
                "-new",
                "-subj",
                "{subj}",
                "-x509",
                "-days",
                "{days}",
                "-key",
                "{key}",
                "-out",
                "{crt}",
                "-addext",
                "basicConstraints=critical,CA:TRUE",
            ],
            Operation::SignRequest => &[
                "x509",
                "-req",
                "-days",
                "{days}",
                "-in",
                "{csr}",
                "-CA",
                "{caCert}",
                "-CAkey",
                "{caKey}",
                "-set_serial",
                "{serial}",
                "-out",
                "{crt}",
            ],
        }
    }

    /// Renders the template of this operation with `params`.
    pub fn compose(self, params: &Params) -> Result<Invocation> {
        let args = self
            .template()
            .iter()
            .map(|token| match placeholder(token) {
                Some(name) => params.get(name).map(ToOwned::to_owned).ok_or_else(|| {
                    bherror::Error::root(Error::MissingParameter(name.to_owned()))
                        .ctx(format!("composing `{self}`"))
                }),
                None => Ok(OsString::from(token)),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Invocation {
            operation: self,
            args,
        })
    }
}

fn placeholder(token: &str) -> Option<&str> {
    token.strip_prefix('{')?.strip_suffix('}')
}

/// Named values substituted into a template.
#[derive(Debug, Default, Clone)]
pub struct Params(BTreeMap<&'static str, OsString>);

impl Params {
    /// Empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a parameter.
    pub fn with(mut self, name: &'static str, value: impl AsRef<OsStr>) -> Self {
        self.0.insert(name, value.as_ref().to_owned());
        self
    }

    fn get(&self, name: &str) -> Option<&OsStr> {
        self.0.get(name).map(OsString::as_os_str)
    }
}

/// A fully rendered toolchain invocation, ready to be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Which operation this is.
    pub operation: Operation,
    /// Arguments passed to the toolchain executable, without the program itself.
    pub args: Vec<OsString>,
}

impl Invocation {
    /// The argument following `flag`, e.g. the path after `-out`.
    pub fn arg_after(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|index| self.args.get(index + 1))
            .map(OsString::as_os_str)
    }
}

/// `genkey <path> <bits>`
pub fn generate_key(key: &Path, size: u32) -> Result<Invocation> {
    Operation::GenerateKey.compose(
        &Params::new()
            .with("key", key)
            .with("size", size.to_string()),
    )
}

/// `gencsr -subj <subject> -key <keypath> -out <csrpath>`
pub fn generate_csr(subject: &str, key: &Path, csr: &Path) -> Result<Invocation> {
    Operation::GenerateCsr.compose(
        &Params::new()
            .with("subj", subject)
            .with("key", key)
            .with("csr", csr),
    )
}

/// `selfsign -subj <subject> -days 365 -key <keypath> -out <crtpath>`
pub fn self_sign(subject: &str, key: &Path, crt: &Path) -> Result<Invocation> {
    Operation::SelfSign.compose(
        &Params::new()
            .with("subj", subject)
            .with("days", CERTIFICATE_VALIDITY_DAYS.to_string())
            .with("key", key)
            .with("crt", crt),
    )
}

/// `signcsr -days 365 -in <csrpath> -CA <caCrtPath> -CAkey <caKeyPath> -set_serial <serial> -out <crtpath>`
pub fn sign_request(
    csr: &Path,
    ca_crt: &Path,
    ca_key: &Path,
    serial: &str,
    crt: &Path,
) -> Result<Invocation> {
    Operation::SignRequest.compose(
        &Params::new()
            .with("days", CERTIFICATE_VALIDITY_DAYS.to_string())
            .with("csr", csr)
            .with("caCert", ca_crt)
            .with("caKey", ca_key)
            .with("serial", serial)
            .with("crt", crt),
    )
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn args(invocation: &Invocation) -> Vec<&str> {
        invocation
            .args
            .iter()
            .map(|arg| arg.to_str().unwrap())
            .collect()
    }

    #[test]
    fn generate_key_arguments() {
        let invocation = generate_key(Path::new("/tmp/x/certs/alice.key"), 2048).unwrap();

        assert_eq!(invocation.operation, Operation::GenerateKey);
        assert_eq!(
            args(&invocation),
            ["genrsa", "-out", "/tmp/x/certs/alice.key", "2048"]
        );
    }

    #[test]
    fn subject_with_spaces_stays_one_argument() {
        let invocation = generate_csr(
            "/O=Grad Zagreb/CN=bob-1",
            Path::new("/c/bob.key"),
            Path::new("/c/bob.csr"),
        )
        .unwrap();

        assert_eq!(
            args(&invocation),
            ["req", "-new", "-subj", "/O=Grad Zagreb/CN=bob-1", "-key", "/c/bob.key", "-out", "/c/bob.csr"]
        );
    }

    #[test]
    fn self_signed_certificate_is_ca_capable() {
        let invocation =
            self_sign("/CN=ca-1", Path::new("/c/ca.key"), Path::new("/c/ca.crt")).unwrap();

        assert_eq!(invocation.arg_after("-days").unwrap(), "365");
        assert_eq!(invocation.arg_after("-out").unwrap(), "/c/ca.crt");
        assert_eq!(
            invocation.arg_after("-addext").unwrap(),
            "basicConstraints=critical,CA:TRUE"
        );
    }

    #[test]
    fn sign_request_arguments() {
        let invocation = sign_request(
            Path::new("/c/bob.csr"),
            Path::new("/c/ca.crt"),
            Path::new("/c/ca.key"),
            "042",
            Path::new("/c/bob.crt"),
        )
        .unwrap();

        assert_eq!(
            args(&invocation),
            [
                "x509", "-req", "-days", "365", "-in", "/c/bob.csr", "-CA", "/c/ca.crt",
                "-CAkey", "/c/ca.key", "-set_serial", "042", "-out", "/c/bob.crt"
            ]
        );
    }

    #[test]
    fn missing_parameter_fails_before_execution() {
        let err = Operation::SignRequest
            .compose(&Params::new().with("csr", "/c/bob.csr").with("days", "365"))
            .unwrap_err();

        assert_matches!(err.error, Error::MissingParameter(ref name) if name == "caCert");
    }

    #[test]
    fn arg_after_unknown_flag() {
        let invocation = generate_key(Path::new("/k"), 1024).unwrap();

        assert_eq!(invocation.arg_after("-in"), None);
    }
}
