// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # certgen-enroll
//!
//! A client for obtaining short-lived SSH and X.509 user certificates from a
//! set of certgen issuers.
//!
//! One enrollment generates a fresh RSA key pair, logs in to the first
//! reachable issuer with HTTP Basic credentials, uploads the public key and
//! stores the returned certificate next to the key.
//!
//! ## Features
//!
//! - **Failover** across an ordered list of issuers, first success wins
//! - **Atomic key storage** with owner-only private key permissions
//! - **Zeroized credentials** that never reach logs or error messages
//! - **TLS 1.2+** with the bundled roots or a caller-supplied CA bundle
//!
//! ## Quick Start
//!
//! ```no_run
//! use certgen_enroll::{Credentials, EnrollConfig, FailoverController, keygen, persist};
//! use certgen_enroll::persist::KeyPaths;
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let paths = KeyPaths::in_dir("/home/alice/.ssh", "id_certgen");
//!     let (key_pair, _) = keygen::generate(paths.private_key())?;
//!
//!     let controller = FailoverController::new(&EnrollConfig::builder().build()?)?;
//!     let candidates = [Url::parse("https://certgen.example.com")?];
//!     let credentials = Credentials::new("alice", "correct horse");
//!
//!     let bundle = controller.enroll(&key_pair, &credentials, &candidates).await?;
//!     if let Some(ssh) = bundle.ssh() {
//!         persist::write_certificate(paths.certificate(), ssh)?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Cargo Features
//!
//! - `cli` (default): Builds the `getcreds` command-line tool

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod failover;
pub mod keygen;
pub mod persist;
pub mod settings;
pub mod tls;
pub mod types;

// Re-export main types at crate root for convenience
pub use client::IssuerClient;
pub use config::{Credentials, EnrollConfig, EnrollConfigBuilder, Password, TrustAnchors};
pub use error::{EnrollError, Result};
pub use failover::FailoverController;
pub use keygen::KeyPair;
pub use persist::KeyPaths;
pub use types::{CandidateFailure, CertType, CertificateBundle, FailureStage, Session};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent string for HTTP requests.
pub const USER_AGENT: &str = concat!("certgen-enroll/", env!("CARGO_PKG_VERSION"));
