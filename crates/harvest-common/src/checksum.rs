//! Checksum utilities for content verification

use crate::error::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::io::Read;
use std::path::Path;

/// Checksum algorithm type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl std::fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumAlgorithm::Sha256 => write!(f, "sha256"),
            ChecksumAlgorithm::Sha512 => write!(f, "sha512"),
        }
    }
}

/// A computed content checksum, carried around as a hex digest plus the
/// algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    pub algorithm: ChecksumAlgorithm,
    pub digest: String,
}

impl Checksum {
    /// Compute the checksum of in-memory content with the default algorithm.
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self {
            algorithm: ChecksumAlgorithm::Sha256,
            digest: hex::encode(hasher.finalize()),
        }
    }

    /// Compute a file checksum with the default algorithm.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = std::fs::File::open(path)?;
        Self::from_reader(&mut file, ChecksumAlgorithm::default())
    }

    /// Compute a checksum for any readable source.
    pub fn from_reader<R: Read>(reader: &mut R, algorithm: ChecksumAlgorithm) -> Result<Self> {
        let digest = match algorithm {
            ChecksumAlgorithm::Sha256 => digest_reader(reader, Sha256::new())?,
            ChecksumAlgorithm::Sha512 => digest_reader(reader, Sha512::new())?,
        };
        Ok(Self { algorithm, digest })
    }

    /// Verify this checksum against an expected hex digest.
    pub fn verify(&self, expected: &str) -> Result<()> {
        if self.digest.eq_ignore_ascii_case(expected) {
            Ok(())
        } else {
            Err(HarvestError::ChecksumMismatch {
                expected: expected.to_string(),
                actual: self.digest.clone(),
            })
        }
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.digest)
    }
}

fn digest_reader<R: Read, D: Digest>(reader: &mut R, mut hasher: D) -> Result<String> {
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
