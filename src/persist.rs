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

//! Atomic file replacement for keys and certificates.
//!
//! Every file is staged in a temporary file in the destination directory,
//! given its final permissions, flushed, and then renamed over the target.
//! An observer of the final path sees either the previous file or the
//! complete new one, never a partial or wrongly-permissioned file.
//!
//! # File Layout
//!
//! For a private key path `<prefix>`:
//!
//! | Path             | Contents                       | Mode   |
//! |------------------|--------------------------------|--------|
//! | `<prefix>`       | PKCS#1 PEM RSA private key     | `0600` |
//! | `<prefix>.pub`   | OpenSSH authorized-key line    | `0644` |
//! | `<prefix>-cert.pub` | SSH certificate from issuer | `0644` |

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{EnrollError, Result};

/// Mode for private key files.
pub const PRIVATE_MODE: u32 = 0o600;

/// Mode for public keys and certificates.
pub const PUBLIC_MODE: u32 = 0o644;

/// Mode for a key directory created on demand.
pub const DIR_MODE: u32 = 0o700;

/// Paths derived from a private key location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPaths {
    private_key: PathBuf,
}

impl KeyPaths {
    /// Derive paths from the private key path.
    pub fn new(private_key: impl Into<PathBuf>) -> Self {
        Self {
            private_key: private_key.into(),
        }
    }

    /// Derive paths from a directory and file prefix.
    pub fn in_dir(dir: impl AsRef<Path>, prefix: &str) -> Self {
        Self::new(dir.as_ref().join(prefix))
    }

    /// `<prefix>`
    pub fn private_key(&self) -> &Path {
        &self.private_key
    }

    /// `<prefix>.pub`
    pub fn public_key(&self) -> PathBuf {
        with_suffix(&self.private_key, ".pub")
    }

    /// `<prefix>-cert.pub`
    pub fn certificate(&self) -> PathBuf {
        with_suffix(&self.private_key, "-cert.pub")
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

/// A file staged next to its destination, not yet visible at the final path.
pub struct StagedFile {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedFile {
    /// Stage `contents` for `target` with permission bits `mode`.
    ///
    /// Permissions are applied before any byte is written.
    pub fn new(target: impl Into<PathBuf>, contents: &[u8], mode: u32) -> std::io::Result<Self> {
        let target = target.into();
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut temp = NamedTempFile::new_in(&dir)?;
        set_mode(temp.as_file(), mode)?;
        temp.write_all(contents)?;
        temp.as_file().sync_all()?;

        Ok(Self { temp, target })
    }

    /// Final destination path.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Atomically rename the staged file over the destination.
    pub fn commit(self) -> std::io::Result<PathBuf> {
        let target = self.target;
        self.temp.persist(&target).map_err(|e| e.error)?;
        Ok(target)
    }
}

/// Atomically replace `path` with `contents`, using permission bits `mode`.
pub fn write_atomic(path: impl Into<PathBuf>, contents: &[u8], mode: u32) -> std::io::Result<PathBuf> {
    StagedFile::new(path, contents, mode)?.commit()
}

/// Write the issued certificate, replacing any earlier one.
pub fn write_certificate(path: impl AsRef<Path>, certificate: &[u8]) -> Result<PathBuf> {
    let path = path.as_ref();
    write_atomic(path, certificate, PUBLIC_MODE).map_err(|e| {
        EnrollError::persistence(format!("Failed to write {}: {}", path.display(), e))
    })
}

/// Create the key directory with owner-only access if it does not exist.
pub fn ensure_key_dir(dir: impl AsRef<Path>) -> std::io::Result<()> {
    let dir = dir.as_ref();
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(DIR_MODE))?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(file: &fs::File, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &fs::File, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
