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

//! Provisions a local CA and a leaf certificate signed by it.
//!
//! Usage: `cargo run --example provision -- [ROOT] [LEAF_NAME]`

use bh_keygen::{Config, KeyGen, OpensslToolchain, Subject};

/// Key size used for the demo; smaller than the default to keep it quick.
const KEY_SIZE: u32 = 2048;

#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1);
    let root = args.next().unwrap_or_else(|| "provisioning".to_owned());
    let leaf_name = args.next().unwrap_or_else(|| "localhost".to_owned());

    let toolchain = OpensslToolchain::default();
    let version = toolchain.probe().await.expect("openssl is required");
    println!("using {version}");

    let config = Config::default()
        .with_root(root)
        .with_size(KEY_SIZE)
        .with_subject(Subject::default().with("O", "TBTL").with("OU", "Team Bee"));
    let keygen = KeyGen::with_toolchain(config, toolchain).expect("valid configuration");

    let ca = keygen.create_ca("ca", false).await.expect("create CA");
    let leaf = keygen
        .create_self_signed(&leaf_name, &ca)
        .await
        .expect("create leaf certificate");

    for artifact in [ca.key(), ca.crt(), &leaf.key, &leaf.crt] {
        println!(
            "{:<8} {} ({})",
            artifact.descriptor.extension,
            artifact.path().display(),
            if artifact.created { "created" } else { "reused" }
        );
    }
}
