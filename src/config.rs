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

//! Configuration types for the enrollment client.
//!
//! This module provides the transport configuration shared by every request
//! made to a certgen issuer (trust anchors, timeout, extra headers) and the
//! credential types handed in by the caller.

use std::time::Duration;

use zeroize::Zeroizing;

use crate::error::{EnrollError, Result};

/// Default per-request timeout.
///
/// Kept short so that a hung issuer cannot stall the failover sequence.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport configuration for talking to certgen issuers.
#[derive(Clone)]
pub struct EnrollConfig {
    /// Trust anchor configuration for server certificate verification.
    pub trust_anchors: TrustAnchors,

    /// Per-request timeout duration.
    pub timeout: Duration,

    /// Permit `http://` issuer URLs.
    ///
    /// Only meant for loopback test issuers. Certificate validation for
    /// `https://` issuers is unaffected.
    pub allow_plaintext_http: bool,

    /// Additional HTTP headers to include in requests.
    pub additional_headers: Vec<(String, String)>,
}

impl std::fmt::Debug for EnrollConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrollConfig")
            .field("trust_anchors", &self.trust_anchors)
            .field("timeout", &self.timeout)
            .field("allow_plaintext_http", &self.allow_plaintext_http)
            .field("additional_headers", &self.additional_headers.len())
            .finish()
    }
}

impl Default for EnrollConfig {
    fn default() -> Self {
        Self {
            trust_anchors: TrustAnchors::Platform,
            timeout: DEFAULT_TIMEOUT,
            allow_plaintext_http: false,
            additional_headers: Vec::new(),
        }
    }
}

impl EnrollConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EnrollConfigBuilder {
        EnrollConfigBuilder::new()
    }
}

/// Builder for [`EnrollConfig`].
#[derive(Default)]
pub struct EnrollConfigBuilder {
    trust_anchors: Option<TrustAnchors>,
    timeout: Option<Duration>,
    allow_plaintext_http: bool,
    additional_headers: Vec<(String, String)>,
}

impl EnrollConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the bundled platform root CA store for server verification.
    pub fn trust_platform_roots(mut self) -> Self {
        self.trust_anchors = Some(TrustAnchors::Platform);
        self
    }

    /// Use explicit PEM-encoded CA certificates for server verification.
    pub fn trust_explicit(mut self, ca_certs: Vec<Vec<u8>>) -> Self {
        self.trust_anchors = Some(TrustAnchors::Explicit(ca_certs));
        self
    }

    /// Use the CA certificates in a PEM bundle if one is given, the platform
    /// roots otherwise.
    pub fn trust_bundle(self, ca_bundle: Option<Vec<u8>>) -> Self {
        match ca_bundle {
            Some(pem) => self.trust_explicit(vec![pem]),
            None => self.trust_platform_roots(),
        }
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Permit plain `http://` issuers (loopback testing only).
    pub fn allow_plaintext_http(mut self) -> Self {
        self.allow_plaintext_http = true;
        self
    }

    /// Add an additional HTTP header to all requests.
    pub fn add_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_headers.push((name.into(), value.into()));
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if explicit trust anchors were requested but none
    /// were supplied, or if the timeout is zero.
    pub fn build(self) -> Result<EnrollConfig> {
        let trust_anchors = self.trust_anchors.unwrap_or(TrustAnchors::Platform);
        if let TrustAnchors::Explicit(ref certs) = trust_anchors
            && certs.iter().all(|pem| pem.is_empty())
        {
            return Err(EnrollError::config("explicit trust anchors are empty"));
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(EnrollError::config("timeout must be greater than zero"));
        }

        Ok(EnrollConfig {
            trust_anchors,
            timeout,
            allow_plaintext_http: self.allow_plaintext_http,
            additional_headers: self.additional_headers,
        })
    }
}

/// Trust anchor configuration for server certificate verification.
///
/// There is no variant that skips verification.
#[derive(Clone)]
pub enum TrustAnchors {
    /// Use the root CA store bundled with the TLS stack (webpki roots).
    Platform,

    /// Use only these CA certificates (PEM-encoded).
    Explicit(Vec<Vec<u8>>),
}

impl std::fmt::Debug for TrustAnchors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Platform => write!(f, "Platform"),
            Self::Explicit(certs) => write!(f, "Explicit({} bundles)", certs.len()),
        }
    }
}

/// A password held in memory that is wiped when dropped.
///
/// The bytes are never printed; `Debug` shows a placeholder.
pub struct Password(Zeroizing<Vec<u8>>);

impl Password {
    /// Wrap raw password bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    /// Borrow the password bytes.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Returns true if the password is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(****)")
    }
}

/// Identity and secret used to log in to an issuer.
#[derive(Debug)]
pub struct Credentials {
    /// User name the certificate is issued for.
    pub identity: String,

    /// Login password.
    pub password: Password,
}

impl Credentials {
    /// Create new credentials.
    pub fn new(identity: impl Into<String>, password: impl Into<Password>) -> Self {
        Self {
            identity: identity.into(),
            password: password.into(),
        }
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}
