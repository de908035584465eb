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

use std::path::{Path, PathBuf};

use bherror::traits::{ErrorContext as _, ForeignError as _};

use crate::{
    build_subject_string, command, describe_file, gate, paths::validate_name,
    resolve_artifact_paths, Artifact, ArtifactPaths, Authority, CertifiedKey, Config, Error,
    Invocation, OpensslToolchain, Result, Role, SerialCounter, Toolchain,
};

/// Options of [`KeyGen::create_cert`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CertOptions<'a> {
    /// Re-issue the certificate even if it exists.
    pub force: bool,
    /// Sign with this authority instead of self-signing.
    pub authority: Option<&'a Authority>,
}

impl<'a> CertOptions<'a> {
    /// Sets [`CertOptions::force`].
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Sets [`CertOptions::authority`].
    pub fn authority(mut self, authority: &'a Authority) -> Self {
        self.authority = Some(authority);
        self
    }
}

/// Stages of [`KeyGen::create_cert`].
#[derive(Debug)]
enum CertStage {
    Check,
    EnsureRequest,
    Sign,
    Done(Artifact),
}

/// Idempotent generator of keys, CSRs and certificates under one directory.
///
/// Every operation skips work when its artifact already exists, unless forced.
/// Composite operations force a dependent step exactly when the step before
/// it actually produced a file, so a regenerated key always gets a fresh
/// certificate.
///
/// Operations on *different* artifact names may run concurrently.  Nothing
/// serializes concurrent operations on the *same* name; callers that need
/// that must coordinate themselves.
#[derive(Debug)]
pub struct KeyGen<T = OpensslToolchain> {
    config: Config,
    dir: PathBuf,
    toolchain: T,
    serial: SerialCounter,
}

impl KeyGen<OpensslToolchain> {
    /// Generator using the `openssl` executable found on `PATH`.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_toolchain(config, OpensslToolchain::default())
    }
}

impl<T: Toolchain> KeyGen<T> {
    /// Generator using a custom [`Toolchain`].
    pub fn with_toolchain(config: Config, toolchain: T) -> Result<Self> {
        let dir = config.artifact_dir()?;
        Ok(Self {
            config,
            dir,
            toolchain,
            serial: SerialCounter::seeded(),
        })
    }

    /// Replaces the serial number allocator.
    pub fn with_serial_counter(mut self, serial: SerialCounter) -> Self {
        self.serial = serial;
        self
    }

    /// The configuration this generator was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Absolute directory holding the artifacts.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The toolchain operations are delegated to.
    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    /// Paths of the files belonging to `name`.
    pub fn artifact_paths(&self, name: &str, include_csr: bool) -> Result<ArtifactPaths> {
        validate_name(name)?;
        Ok(resolve_artifact_paths(&self.dir, name, include_csr))
    }

    /// Creates the RSA private key `name.key`.
    pub async fn create_key(&self, name: &str, force: bool) -> Result<Artifact> {
        tracing::debug!(
            "{} new key named - {name}",
            if force { "Force creating" } else { "Creating" }
        );
        let paths = self.artifact_paths(name, false)?;

        if !gate::needs_creation(&paths.key, force).await? {
            tracing::debug!(path = %paths.key.display(), "key already exists");
            return describe_file(&paths.key, false).await;
        }

        create_parent(&paths.key).await?;
        self.execute(&command::generate_key(&paths.key, self.config.size)?)
            .await
            .ctx(|| format!("creating key {name}"))?;

        describe_file(&paths.key, true).await
    }

    /// Creates the signing request `name.csr`, creating the key first if it is missing.
    ///
    /// The request is always regenerated.
    pub async fn create_sign_request(&self, name: &str) -> Result<()> {
        tracing::debug!("Create sign request for - {name}");
        let paths = self.artifact_paths(name, true)?;

        self.create_key(name, false).await?;

        let subject = build_subject_string(name, &self.config.subject);
        let invocation = command::generate_csr(&subject, &paths.key, required(&paths, Role::Csr)?)?;
        self.execute(&invocation)
            .await
            .ctx(|| format!("creating sign request {name}"))
    }

    /// Self-signs the CA-capable certificate `name.crt` with the existing key `name.key`.
    pub async fn sign_ca(&self, name: &str, force: bool) -> Result<Artifact> {
        tracing::debug!(
            "{} CA cert named - {name}",
            if force { "Force signing" } else { "Sign" }
        );
        let paths = self.artifact_paths(name, false)?;

        if !gate::needs_creation(&paths.crt, force).await? {
            tracing::debug!(path = %paths.crt.display(), "certificate already exists");
            return describe_file(&paths.crt, false).await;
        }

        require_existing(&paths.key).await?;

        let subject = build_subject_string(name, &self.config.subject);
        self.execute(&command::self_sign(&subject, &paths.key, &paths.crt)?)
            .await
            .ctx(|| format!("self-signing {name}"))?;

        describe_file(&paths.crt, true).await
    }

    /// Signs the existing request `name.csr` with `authority`, producing `name.crt`.
    pub async fn sign_request(
        &self,
        name: &str,
        authority: &Authority,
        force: bool,
    ) -> Result<Artifact> {
        tracing::debug!(
            "{} request named - {name}",
            if force { "Force signing" } else { "Sign" }
        );
        let paths = self.artifact_paths(name, true)?;

        if !gate::needs_creation(&paths.crt, force).await? {
            tracing::debug!(path = %paths.crt.display(), "certificate already exists");
            return describe_file(&paths.crt, false).await;
        }

        let csr = required(&paths, Role::Csr)?;
        require_existing(csr).await?;
        require_existing(authority.key().path()).await?;
        require_existing(authority.crt().path()).await?;

        let serial = self.serial.next_serial();
        let invocation = command::sign_request(
            csr,
            authority.crt().path(),
            authority.key().path(),
            &serial,
            &paths.crt,
        )?;
        self.execute(&invocation)
            .await
            .ctx(|| format!("signing request {name} with serial {serial}"))?;

        describe_file(&paths.crt, true).await
    }

    /// Creates the certificate `name.crt`.
    ///
    /// With an authority, a signing request is generated (creating the key if needed) and
    /// signed by it.  Without one, the certificate is self-signed with the existing key.
    pub async fn create_cert(&self, name: &str, options: CertOptions<'_>) -> Result<Artifact> {
        let CertOptions { force, authority } = options;
        tracing::debug!(
            "{} new cert named - {name}{}",
            if force { "Force creating" } else { "Creating" },
            if authority.is_some() { " using CA" } else { "" }
        );
        let paths = self.artifact_paths(name, false)?;

        let mut stage = CertStage::Check;
        loop {
            tracing::trace!(?stage, "create_cert {name}");
            stage = match stage {
                CertStage::Check => {
                    if !gate::needs_creation(&paths.crt, force).await? {
                        CertStage::Done(describe_file(&paths.crt, false).await?)
                    } else if authority.is_some() {
                        CertStage::EnsureRequest
                    } else {
                        CertStage::Sign
                    }
                }
                CertStage::EnsureRequest => {
                    self.create_sign_request(name).await?;
                    CertStage::Sign
                }
                CertStage::Sign => CertStage::Done(match authority {
                    Some(authority) => self.sign_request(name, authority, force).await?,
                    None => self.sign_ca(name, force).await?,
                }),
                CertStage::Done(crt) => return Ok(crt),
            };
        }
    }

    /// Creates a self-signed certificate authority `name`.
    ///
    /// The certificate is re-issued whenever the key was (re)created.
    pub async fn create_ca(&self, name: &str, force: bool) -> Result<Authority> {
        tracing::debug!("createCA - {name}");

        let key = self.create_key(name, force).await?;
        let crt = self.sign_ca(name, key.created).await?;

        Ok(Authority::new(CertifiedKey { key, crt }))
    }

    /// Creates the key `name.key` and a certificate `name.crt` signed by `authority`.
    ///
    /// The key is regenerated when the authority's key was just created, and the
    /// certificate is re-issued when the key was.
    pub async fn create_self_signed(
        &self,
        name: &str,
        authority: &Authority,
    ) -> Result<CertifiedKey> {
        tracing::debug!("createSelfSigned - {name}");

        let key = self.create_key(name, authority.key().created).await?;
        let crt = self
            .create_cert(
                name,
                CertOptions::default()
                    .force(key.created)
                    .authority(authority),
            )
            .await?;

        Ok(CertifiedKey { key, crt })
    }

    async fn execute(&self, invocation: &Invocation) -> Result<()> {
        tracing::debug!(operation = %invocation.operation, "invoking toolchain");
        let output = self.toolchain.run(invocation).await?;

        if !output.success {
            tracing::warn!(
                operation = %invocation.operation,
                code = ?output.code,
                "toolchain failed"
            );
            let code = output.code;
            return Err(bherror::Error::root(Error::ToolchainFailed(
                invocation.operation,
                output.stderr,
            )))
            .ctx(|| format!("exit code {code:?}"));
        }

        Ok(())
    }
}

fn required(paths: &ArtifactPaths, role: Role) -> Result<&Path> {
    paths
        .get(role)
        .ok_or_else(|| bherror::Error::root(Error::MissingParameter(role.to_string())))
}

async fn require_existing(path: &Path) -> Result<()> {
    if gate::exists(path).await? {
        Ok(())
    } else {
        Err(bherror::Error::root(Error::MissingPrerequisite(
            path.display().to_string(),
        )))
    }
}

async fn create_parent(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };

    tokio::fs::create_dir_all(parent)
        .await
        .foreign_err(|| Error::Filesystem(parent.display().to_string()))
        .ctx(|| "cannot create the artifact directory")
}
