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

//! Request and response types exchanged with certgen issuers.

use std::fmt;

use url::Url;

/// Kind of certificate requested from `/certgen/{identity}?type=...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertType {
    /// OpenSSH user certificate, requested with an authorized-key line.
    Ssh,

    /// X.509 certificate, requested with a PEM `PUBLIC KEY` block.
    X509,
}

impl CertType {
    /// Value of the `type` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ssh => "ssh",
            Self::X509 => "x509",
        }
    }
}

impl fmt::Display for CertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session cookies obtained from one issuer's login endpoint.
///
/// A session is bound to the issuer that created it and is never sent
/// anywhere else. It lives only for the duration of one candidate attempt.
#[derive(Clone)]
pub struct Session {
    issuer: Url,
    cookies: Vec<(String, String)>,
}

impl Session {
    /// Create a session for `issuer` from `(name, value)` cookie pairs.
    ///
    /// Later cookies with the same name replace earlier ones, keeping the
    /// position of the first occurrence.
    pub fn new(issuer: Url, cookies: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut ordered: Vec<(String, String)> = Vec::new();
        for (name, value) in cookies {
            match ordered.iter_mut().find(|(n, _)| *n == name) {
                Some(existing) => existing.1 = value,
                None => ordered.push((name, value)),
            }
        }
        Self {
            issuer,
            cookies: ordered,
        }
    }

    /// Issuer base URL this session belongs to.
    pub fn issuer(&self) -> &Url {
        &self.issuer
    }

    /// Number of session cookies.
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Returns true if the session holds no cookies.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// A session needs at least one cookie to authenticate anything.
    pub fn is_usable(&self) -> bool {
        !self.is_empty()
    }

    /// Cookie names, in the order the issuer set them.
    pub fn cookie_names(&self) -> impl Iterator<Item = &str> {
        self.cookies.iter().map(|(name, _)| name.as_str())
    }

    /// Render the `Cookie` request header value.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// Cookie values are bearer tokens.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("issuer", &self.issuer.as_str())
            .field("cookies", &self.cookie_names().collect::<Vec<_>>())
            .finish()
    }
}

/// Certificates obtained from a single successful issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateBundle {
    /// Issuer base URL that produced the bundle.
    pub issuer: String,

    /// SSH certificate bytes, exactly as returned.
    pub ssh_certificate: Option<Vec<u8>>,

    /// X.509 certificate bytes, exactly as returned.
    pub x509_certificate: Option<Vec<u8>>,
}

impl CertificateBundle {
    /// Create an empty bundle for `issuer`.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            ssh_certificate: None,
            x509_certificate: None,
        }
    }

    /// Returns the SSH certificate, if any.
    pub fn ssh(&self) -> Option<&[u8]> {
        self.ssh_certificate.as_deref()
    }

    /// Returns the X.509 certificate, if any.
    pub fn x509(&self) -> Option<&[u8]> {
        self.x509_certificate.as_deref()
    }
}

/// Step of a candidate attempt that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Login failed or produced no session.
    Login,

    /// The required SSH certificate request failed.
    SshCertificate,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Login => "login",
            Self::SshCertificate => "ssh certificate",
        };
        f.write_str(s)
    }
}

/// Summary of why one candidate issuer did not produce a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    /// Candidate base URL as configured.
    pub candidate: String,

    /// Step that failed.
    pub stage: FailureStage,

    /// Human-readable reason. Never contains credentials.
    pub reason: String,
}

impl CandidateFailure {
    /// Create a new failure summary.
    pub fn new(candidate: impl Into<String>, stage: FailureStage, reason: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            stage,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} failed: {}", self.candidate, self.stage, self.reason)
    }
}
