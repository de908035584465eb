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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate manages RSA keys, certificate signing requests and X.509 certificates on the
//! local filesystem, for provisioning tools that need a local certificate authority and leaf
//! certificates.
//!
//! The cryptography itself is delegated to an external toolchain (the `openssl` executable by
//! default, see [`OpensslToolchain`]); this crate decides *what* has to be generated and in
//! which order.
//!
//! # Details
//!
//! The primary API this crate offers is the [`KeyGen`] struct.  Every artifact is identified by
//! a name and lives at `<root>/<folder>/<name>.{key,csr,crt}`.
//!
//! All operations are idempotent: an artifact that already exists is reused and reported with
//! [`Artifact::created()`] set to `false`, unless the operation is forced.  Composite operations
//! force a step exactly when the step before it actually produced a file, so a regenerated key
//! always ends up with a freshly issued certificate.
//!
//! # Examples
//!
//! ```no_run
//! # async fn provision() -> bh_keygen::Result<()> {
//! use bh_keygen::{CertOptions, Config, KeyGen, Subject};
//!
//! let config = Config::default()
//!     .with_root("/srv/provisioning")
//!     .with_size(2048)
//!     .with_subject(Subject::default().with("O", "TBTL"));
//! let keygen = KeyGen::new(config)?;
//!
//! // Root CA: `root.key` + self-signed `root.crt`.
//! let ca = keygen.create_ca("root", false).await?;
//!
//! // Leaf key + certificate signed by the CA.
//! let leaf = keygen.create_self_signed("api", &ca).await?;
//! println!("{} (created: {})", leaf.crt.path().display(), leaf.crt.created);
//!
//! // Re-issue a single certificate.
//! keygen
//!     .create_cert("api", CertOptions::default().authority(&ca).force(true))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod authority;
pub mod command;
mod config;
mod error;
mod gate;
mod keygen;
mod paths;
mod report;
mod serial;
mod toolchain;

#[cfg(any(feature = "test-utils", test))]
pub mod test_utils;

pub use authority::*;
pub use command::{Invocation, Operation, Params, CERTIFICATE_VALIDITY_DAYS};
pub use config::*;
pub use error::*;
pub use gate::*;
pub use keygen::*;
pub use paths::{build_subject_string, resolve_artifact_paths, ArtifactPaths, Role};
pub use report::*;
pub use serial::*;
pub use toolchain::*;
