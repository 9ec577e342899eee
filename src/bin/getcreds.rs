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

//! Certgen Credential Command-Line Tool
//!
//! Generates a fresh key pair, enrolls it with the first configured certgen
//! issuer that accepts the user's password, and stores the issued SSH
//! certificate next to the key.
//!
//! # Usage
//!
//! ```text
//! getcreds [OPTIONS]
//!
//! Options:
//!   -c, --config <PATH>        Path to configuration file
//!   -u, --user <NAME>          Identity to enroll (default: current user)
//!       --key-dir <DIR>        Key directory (default: ~/.ssh)
//!       --key-prefix <NAME>    Key file name prefix [default: id_certgen]
//!       --ca-bundle <PATH>     PEM bundle of trusted issuer CAs
//!       --timeout <SECONDS>    Per-request timeout [default: 5]
//!       --x509-out <PATH>      Also write the X.509 certificate here
//!   -v, --verbose              Enable verbose output
//!   -q, --quiet                Suppress non-error output
//!       --debug                Log the key material sent to issuers
//!   -h, --help                 Print help
//!   -V, --version              Print version
//! ```
//!
//! # Files
//!
//! With the defaults, an enrollment for `alice` produces:
//!
//! ```text
//! ~/.ssh/id_certgen            private key (0600)
//! ~/.ssh/id_certgen.pub        public key (0644)
//! ~/.ssh/id_certgen-cert.pub   SSH certificate (0644)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use certgen_enroll::persist::{self, KeyPaths};
use certgen_enroll::settings::ConfigLoader;
use certgen_enroll::{
    Credentials, EnrollConfig, EnrollError, FailoverController, IssuerClient, Password, keygen,
};
use clap::Parser;

/// Default key file name prefix.
const DEFAULT_KEY_PREFIX: &str = "id_certgen";

/// Certgen Credential Command-Line Tool
#[derive(Parser)]
#[command(name = "getcreds")]
#[command(author = "U.S. Federal Government")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Obtain short-lived SSH and X.509 certificates from certgen issuers", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Identity to enroll (default: current user)
    #[arg(short, long, value_name = "NAME")]
    user: Option<String>,

    /// Directory the key pair and certificate are written to (default: ~/.ssh)
    #[arg(long, value_name = "DIR")]
    key_dir: Option<PathBuf>,

    /// File name prefix for the key pair and certificate
    #[arg(long, value_name = "NAME", default_value = DEFAULT_KEY_PREFIX)]
    key_prefix: String,

    /// PEM bundle of trusted issuer CAs (overrides the config file)
    #[arg(long, value_name = "PATH")]
    ca_bundle: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value = "5")]
    timeout: u64,

    /// Also write the X.509 certificate to this path
    #[arg(long, value_name = "PATH")]
    x509_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short, long)]
    quiet: bool,

    /// Log the key material sent to issuers
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        tracing::Level::ERROR
    } else if cli.verbose || cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // One request is in flight at a time; a single thread is enough.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(&cli));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(failures) = e.failures() {
                for failure in failures {
                    eprintln!("  - {}", failure);
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), EnrollError> {
    // Load configuration before anything touches the network or the disk
    let mut loader = ConfigLoader::new();
    if let Some(ref path) = cli.config {
        loader = loader.with_path(path);
    }
    let config = loader.load()?;
    let candidates = config.candidates()?;

    let identity = resolve_identity(cli.user.as_deref())?;

    let ca_bundle = match cli.ca_bundle {
        Some(ref path) => Some(std::fs::read(path).map_err(|e| {
            EnrollError::config(format!("Cannot read CA bundle {}: {}", path.display(), e))
        })?),
        None => config.load_ca_bundle()?,
    };

    let enroll_config = EnrollConfig::builder()
        .trust_bundle(ca_bundle)
        .timeout(Duration::from_secs(cli.timeout))
        .build()?;
    let client = IssuerClient::new(&enroll_config)?.with_debug_payloads(cli.debug);
    let controller = FailoverController::with_client(client);

    let key_dir = resolve_key_dir(cli.key_dir.as_ref())?;
    let paths = KeyPaths::in_dir(&key_dir, &cli.key_prefix);

    let password = prompt_password(&identity)?;
    let credentials = Credentials::new(identity, password);

    let (key_pair, public_key_path) = keygen::generate(paths.private_key())?;
    tracing::info!(
        "generated {} ({})",
        public_key_path.display(),
        key_pair.fingerprint()?
    );

    let bundle = controller
        .enroll(&key_pair, &credentials, &candidates)
        .await?;
    drop(credentials);

    let ssh = bundle
        .ssh()
        .ok_or_else(|| EnrollError::persistence("issuer returned no SSH certificate"))?;
    let cert_path = persist::write_certificate(paths.certificate(), ssh)?;

    if let Some(ref x509_out) = cli.x509_out {
        match bundle.x509() {
            Some(x509) => {
                let path = persist::write_certificate(x509_out, x509)?;
                tracing::info!("wrote X.509 certificate to {}", path.display());
            }
            None => tracing::warn!("issuer returned no X.509 certificate"),
        }
    }

    if !cli.quiet {
        println!("Success");
        println!("  Issuer: {}", bundle.issuer);
        println!("  Certificate: {}", cert_path.display());
    }

    Ok(())
}

/// The explicit identity, or the current OS user.
fn resolve_identity(explicit: Option<&str>) -> Result<String, EnrollError> {
    let identity = match explicit {
        Some(name) => Some(name.to_string()),
        None => std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .ok(),
    };

    identity
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| EnrollError::config("cannot determine current user; use --user"))
}

fn resolve_key_dir(explicit: Option<&PathBuf>) -> Result<PathBuf, EnrollError> {
    let dir = match explicit {
        Some(dir) => dir.clone(),
        None => dirs::home_dir()
            .ok_or_else(|| EnrollError::config("cannot determine home directory; use --key-dir"))?
            .join(".ssh"),
    };

    persist::ensure_key_dir(&dir).map_err(|e| {
        EnrollError::key_generation(format!("Cannot create key directory {}: {}", dir.display(), e))
    })?;

    Ok(dir)
}

fn prompt_password(identity: &str) -> Result<Password, EnrollError> {
    let password = rpassword::prompt_password(format!("Password for {}: ", identity))
        .map(Password::from)
        .map_err(|e| EnrollError::config(format!("Cannot read password: {}", e)))?;

    if password.is_empty() {
        return Err(EnrollError::config("empty password"));
    }

    Ok(password)
}
