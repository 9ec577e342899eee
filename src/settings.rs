// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)

//! Configuration file discovery, loading and validation.
//!
//! The configuration file is YAML and names the candidate issuers as a
//! single comma-separated string:
//!
//! ```yaml
//! base:
//!   gen_cert_urls: "https://certgen-a.example.com,https://certgen-b.example.com"
//!   # Optional PEM bundle; the bundled platform roots are used otherwise.
//!   ca_bundle: /etc/pki/certgen-roots.pem
//! ```
//!
//! A configuration is only returned once it names at least one issuer and
//! every issuer is an `https://` URL, so no network activity ever happens
//! on the strength of a bad file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::error::{EnrollError, Result};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Environment variable overriding the configuration path.
pub const CONFIG_ENV_VAR: &str = "GETCREDS_CONFIG";

/// Complete configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Issuer settings.
    pub base: BaseConfig,
}

/// The `base` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BaseConfig {
    /// Comma-separated, ordered list of issuer base URLs.
    #[serde(default, alias = "Gen_Cert_URLS")]
    pub gen_cert_urls: String,

    /// PEM bundle of CA certificates trusted for issuer connections.
    #[serde(default)]
    pub ca_bundle: Option<PathBuf>,
}

impl AppConfig {
    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or the `base` section is missing.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| EnrollError::config(format!("Cannot parse config file: {e}")))
    }

    /// The candidate issuers, in configured order.
    pub fn candidates(&self) -> Result<Vec<Url>> {
        parse_candidate_list(&self.base.gen_cert_urls)
    }

    /// Validate the configuration for completeness.
    pub fn validate(&self) -> Result<()> {
        self.candidates().map(|_| ())
    }

    /// Read the configured CA bundle, if any.
    pub fn load_ca_bundle(&self) -> Result<Option<Vec<u8>>> {
        match self.base.ca_bundle {
            Some(ref path) => std::fs::read(path).map(Some).map_err(|e| {
                EnrollError::config(format!("Cannot read CA bundle {}: {e}", path.display()))
            }),
            None => Ok(None),
        }
    }
}

/// Parse a comma-separated issuer list.
///
/// Entries are trimmed and blank entries skipped. Order is preserved and
/// duplicates are kept as written.
///
/// # Errors
///
/// Returns a configuration error if no entries remain, or if any entry is
/// not an absolute `https://` URL.
pub fn parse_candidate_list(list: &str) -> Result<Vec<Url>> {
    let mut errors = Vec::new();
    let mut candidates = Vec::new();

    for entry in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match Url::parse(entry) {
            Ok(url) if url.scheme() != "https" => {
                errors.push(format!("{entry}: issuer URLs must use https"));
            }
            Ok(url) if url.cannot_be_a_base() || url.host().is_none() => {
                errors.push(format!("{entry}: not a usable base URL"));
            }
            Ok(url) => candidates.push(url),
            Err(e) => errors.push(format!("{entry}: {e}")),
        }
    }

    if !errors.is_empty() {
        return Err(EnrollError::config(format!(
            "Invalid issuer URL(s):\n  - {}",
            errors.join("\n  - ")
        )));
    }

    if candidates.is_empty() {
        return Err(EnrollError::config(
            "Invalid config file: no issuer URLs in base.gen_cert_urls",
        ));
    }

    Ok(candidates)
}

/// Configuration file loader with discovery and precedence rules.
///
/// # Search Order
///
/// Configuration files are searched in the following order (first found wins):
///
/// 1. Explicit path (if set via `with_path()`)
/// 2. Environment variable `GETCREDS_CONFIG`
/// 3. Current directory: `./config.yml`
/// 4. User config: `~/.config/getcreds/config.yml`
/// 5. Unix: `/etc/getcreds/config.yml`
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Explicit configuration file path.
    explicit_path: Option<PathBuf>,

    /// Environment variable name for config path override.
    env_var_name: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader with default settings.
    pub fn new() -> Self {
        Self {
            explicit_path: None,
            env_var_name: CONFIG_ENV_VAR.to_string(),
        }
    }

    /// Set an explicit configuration file path.
    ///
    /// When set, only this path will be checked (no discovery).
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.explicit_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the environment variable name for path override.
    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var_name = name.into();
        self
    }

    /// Load and validate the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No configuration file is found
    /// - The file cannot be read
    /// - The YAML is invalid
    /// - Validation fails
    pub fn load(&self) -> Result<AppConfig> {
        let config_path = self.find_config_file()?;
        tracing::debug!("loading configuration from {}", config_path.display());

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            EnrollError::config(format!("Cannot read config file {}: {e}", config_path.display()))
        })?;

        self.load_from_str(&content)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_from_str(&self, yaml: &str) -> Result<AppConfig> {
        let config = AppConfig::from_yaml(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Find the configuration file using the search order.
    pub fn find_config_file(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.explicit_path {
            if path.is_file() {
                return Ok(path.clone());
            }
            return Err(EnrollError::config(format!(
                "Missing config file: {}",
                path.display()
            )));
        }

        if let Some(path) = std::env::var_os(&self.env_var_name).map(PathBuf::from) {
            if path.is_file() {
                return Ok(path);
            }
            return Err(EnrollError::config(format!(
                "Missing config file: {} (from {})",
                path.display(),
                self.env_var_name
            )));
        }

        for path in self.get_search_paths() {
            if path.is_file() {
                return Ok(path);
            }
        }

        Err(EnrollError::config(format!(
            "Missing config file. Searched:\n  - {}",
            self.get_search_paths()
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join("\n  - ")
        )))
    }

    /// Get the list of paths to search for configuration files.
    pub fn get_search_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(DEFAULT_CONFIG_FILE)];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("getcreds").join(DEFAULT_CONFIG_FILE));
        }

        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/getcreds").join(DEFAULT_CONFIG_FILE));

        paths
    }
}
