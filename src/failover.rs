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

//! Failover across an ordered list of candidate issuers.
//!
//! Candidates are tried strictly in the order given, one at a time. For
//! each candidate the controller logs in, requests the SSH certificate
//! (required) and then the X.509 certificate (best effort). The first
//! candidate that yields an SSH certificate wins and no later candidate is
//! contacted. Per-candidate failures are logged and collected; only when
//! every candidate has failed does enrollment fail.
//!
//! # Example
//!
//! ```no_run
//! use certgen_enroll::{Credentials, EnrollConfig, FailoverController};
//! use certgen_enroll::keygen::{KeyPair, RSA_KEY_BITS};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let controller = FailoverController::new(&EnrollConfig::builder().build()?)?;
//! let key_pair = KeyPair::generate(RSA_KEY_BITS)?;
//! let credentials = Credentials::new("alice", "correct horse");
//! let candidates = vec![
//!     Url::parse("https://certgen-a.example.com")?,
//!     Url::parse("https://certgen-b.example.com")?,
//! ];
//!
//! let bundle = controller.enroll(&key_pair, &credentials, &candidates).await?;
//! println!("issued by {}", bundle.issuer);
//! # Ok(())
//! # }
//! ```

use url::Url;

use crate::client::IssuerClient;
use crate::config::{Credentials, EnrollConfig};
use crate::error::{EnrollError, Result};
use crate::keygen::KeyPair;
use crate::types::{CandidateFailure, CertType, CertificateBundle, FailureStage};

/// Drives login and certificate requests across candidate issuers.
#[derive(Debug, Clone)]
pub struct FailoverController {
    client: IssuerClient,
}

impl FailoverController {
    /// Create a controller using a client built from `config`.
    pub fn new(config: &EnrollConfig) -> Result<Self> {
        Ok(Self::with_client(IssuerClient::new(config)?))
    }

    /// Create a controller around an existing client.
    pub fn with_client(client: IssuerClient) -> Self {
        Self { client }
    }

    /// Obtain certificates for `key_pair` from the first candidate that
    /// issues an SSH certificate.
    ///
    /// # Errors
    ///
    /// - [`EnrollError::Config`] if `candidates` is empty (no request is made)
    /// - [`EnrollError::KeyGeneration`] if the key cannot be encoded
    /// - [`EnrollError::Exhausted`] with one entry per candidate if all fail
    pub async fn enroll(
        &self,
        key_pair: &KeyPair,
        credentials: &Credentials,
        candidates: &[Url],
    ) -> Result<CertificateBundle> {
        if candidates.is_empty() {
            return Err(EnrollError::config("no candidate issuers configured"));
        }

        let ssh_key = key_pair.key_material(CertType::Ssh)?;
        let x509_key = key_pair.key_material(CertType::X509)?;

        let mut failures = Vec::with_capacity(candidates.len());

        for (index, candidate) in candidates.iter().enumerate() {
            tracing::info!(
                attempt = index + 1,
                of = candidates.len(),
                "attempting issuer {}",
                candidate
            );

            match self
                .try_candidate(candidate, credentials, &ssh_key, &x509_key)
                .await
            {
                Ok(bundle) => {
                    tracing::info!("obtained certificate from {}", candidate);
                    return Ok(bundle);
                }
                Err(failure) => {
                    tracing::warn!("{}", failure);
                    failures.push(failure);
                }
            }
        }

        tracing::error!("failed to get certificate from any issuer");
        Err(EnrollError::Exhausted { failures })
    }

    /// One candidate attempt. The session does not outlive this call.
    async fn try_candidate(
        &self,
        candidate: &Url,
        credentials: &Credentials,
        ssh_key: &str,
        x509_key: &str,
    ) -> std::result::Result<CertificateBundle, CandidateFailure> {
        let fail = |stage, err: EnrollError| {
            CandidateFailure::new(candidate.as_str(), stage, err.to_string())
        };

        let session = self
            .client
            .login(candidate, credentials)
            .await
            .map_err(|e| fail(FailureStage::Login, e))?;

        let identity = credentials.identity.as_str();

        let ssh = self
            .client
            .request_certificate(&session, identity, CertType::Ssh, ssh_key)
            .await
            .map_err(|e| fail(FailureStage::SshCertificate, e))?;

        let mut bundle = CertificateBundle::new(candidate.as_str());
        bundle.ssh_certificate = Some(ssh);

        match self
            .client
            .request_certificate(&session, identity, CertType::X509, x509_key)
            .await
        {
            Ok(x509) => bundle.x509_certificate = Some(x509),
            Err(e) => tracing::warn!("x509 certificate from {} unavailable: {}", candidate, e),
        }

        Ok(bundle)
    }
}
