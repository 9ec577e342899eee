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

//! Key pair generation and storage.
//!
//! A fresh RSA key pair is generated for every enrollment. RSA is used
//! because the public half must be expressible both as an OpenSSH
//! authorized-key line (for the SSH certificate) and as a PKIX
//! `SubjectPublicKeyInfo` (for the X.509 certificate).
//!
//! # Example
//!
//! ```no_run
//! use certgen_enroll::keygen;
//! use certgen_enroll::persist::KeyPaths;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let paths = KeyPaths::in_dir("/home/alice/.ssh", "id_certgen");
//! let (key_pair, public_key_path) = keygen::generate(paths.private_key())?;
//!
//! println!("{} written to {}", key_pair.fingerprint()?, public_key_path.display());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use rand::rngs::OsRng;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use ssh_key::HashAlg;
use zeroize::Zeroizing;

use crate::error::{EnrollError, Result};
use crate::persist::{KeyPaths, PRIVATE_MODE, PUBLIC_MODE, StagedFile};
use crate::types::CertType;

/// RSA modulus size used for generated keys.
pub const RSA_KEY_BITS: usize = 2048;

/// A freshly generated RSA signing key pair.
///
/// The public half is derived from the private half at generation time, so
/// the two can never disagree.
#[derive(Clone)]
pub struct KeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl KeyPair {
    /// Generate a new key pair with `bits` modulus size.
    ///
    /// # Errors
    ///
    /// Returns [`EnrollError::KeyGeneration`] if `bits` is below
    /// [`RSA_KEY_BITS`] or the random source fails.
    pub fn generate(bits: usize) -> Result<Self> {
        if bits < RSA_KEY_BITS {
            return Err(EnrollError::key_generation(format!(
                "RSA key size {} is below the {}-bit minimum",
                bits, RSA_KEY_BITS
            )));
        }

        let private = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| EnrollError::key_generation(format!("Failed to generate RSA key: {}", e)))?;
        let public = RsaPublicKey::from(&private);

        Ok(Self { private, public })
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.public.size() * 8
    }

    /// The RSA public key.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// PKCS#1 PEM (`RSA PRIVATE KEY`) encoding of the private key.
    pub fn private_key_pem(&self) -> Result<Zeroizing<String>> {
        self.private
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| EnrollError::key_generation(format!("Failed to encode private key: {}", e)))
    }

    /// PKIX PEM (`PUBLIC KEY`) encoding of the public key.
    pub fn public_key_pem(&self) -> Result<String> {
        self.public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| EnrollError::key_generation(format!("Failed to encode public key: {}", e)))
    }

    /// The public key as an OpenSSH key.
    pub fn ssh_public_key(&self) -> Result<ssh_key::PublicKey> {
        let rsa = ssh_key::public::RsaPublicKey::try_from(&self.public)
            .map_err(|e| EnrollError::key_generation(format!("Failed to convert public key: {}", e)))?;
        Ok(ssh_key::PublicKey::from(ssh_key::public::KeyData::from(rsa)))
    }

    /// OpenSSH authorized-key line (`ssh-rsa AAAA...`), newline terminated.
    pub fn ssh_authorized_key(&self) -> Result<String> {
        let mut line = self
            .ssh_public_key()?
            .to_openssh()
            .map_err(|e| EnrollError::key_generation(format!("Failed to encode SSH key: {}", e)))?;
        line.push('\n');
        Ok(line)
    }

    /// SHA-256 fingerprint in OpenSSH notation (`SHA256:...`).
    pub fn fingerprint(&self) -> Result<String> {
        Ok(self.ssh_public_key()?.fingerprint(HashAlg::Sha256).to_string())
    }

    /// Public key material uploaded for a certificate of `cert_type`.
    pub fn key_material(&self, cert_type: CertType) -> Result<String> {
        match cert_type {
            CertType::Ssh => self.ssh_authorized_key(),
            CertType::X509 => self.public_key_pem(),
        }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &"rsa")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

/// Generate a key pair and store it at `private_key_path`.
///
/// The private key is written to `private_key_path` with mode `0600` and
/// the authorized-key line to `<private_key_path>.pub` with mode `0644`.
/// Both files replace any earlier key pair; the old keys are no longer
/// usable afterwards. If the private key cannot be put in place, the public
/// key file is removed rather than left pointing at a different pair.
///
/// Returns the key pair and the path of the public key file.
pub fn generate(private_key_path: impl AsRef<Path>) -> Result<(KeyPair, PathBuf)> {
    let paths = KeyPaths::new(private_key_path.as_ref());
    let key_pair = KeyPair::generate(RSA_KEY_BITS)?;
    let public_key_path = store(&key_pair, &paths)?;
    Ok((key_pair, public_key_path))
}

/// Store `key_pair` at `paths`, returning the public key path.
pub fn store(key_pair: &KeyPair, paths: &KeyPaths) -> Result<PathBuf> {
    let private_pem = key_pair.private_key_pem()?;
    let authorized_key = key_pair.ssh_authorized_key()?;

    let io_err = |path: &Path, e: std::io::Error| {
        EnrollError::key_generation(format!("Failed to write {}: {}", path.display(), e))
    };

    // Stage both halves before either becomes visible so a failure leaves
    // the previous pair intact.
    let private = StagedFile::new(paths.private_key(), private_pem.as_bytes(), PRIVATE_MODE)
        .map_err(|e| io_err(paths.private_key(), e))?;
    let public_path = paths.public_key();
    let public = StagedFile::new(&public_path, authorized_key.as_bytes(), PUBLIC_MODE)
        .map_err(|e| io_err(&public_path, e))?;

    // The public half goes first. If the private rename then fails, the new
    // public key is removed so the two files never belong to different pairs.
    let public_path = public.commit().map_err(|e| io_err(&public_path, e))?;
    if let Err(e) = private.commit() {
        if let Err(remove_err) = std::fs::remove_file(&public_path) {
            tracing::warn!(
                "cannot remove {} after failed key store: {}",
                public_path.display(),
                remove_err
            );
        }
        return Err(io_err(paths.private_key(), e));
    }

    tracing::debug!(
        private_key = %paths.private_key().display(),
        public_key = %public_path.display(),
        "stored key pair"
    );

    Ok(public_path)
}
