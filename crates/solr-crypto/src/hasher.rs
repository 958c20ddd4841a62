use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use solr_types::{ContentHash, FileProof};

/// Digest algorithm used for content addressing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256. Receipts written by every existing client use this.
    #[default]
    Sha256,
    Blake3,
}

/// Content hasher for uploaded proof documents.
///
/// The digest is a pure function of the raw bytes: no domain tag, file name,
/// MIME type, or upload order enters the computation, so an independent
/// verifier can recompute it with a stock SHA-256 tool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
}

impl ContentHasher {
    /// SHA-256 hasher (the default).
    pub const SHA256: Self = Self {
        algorithm: HashAlgorithm::Sha256,
    };
    /// BLAKE3 hasher.
    pub const BLAKE3: Self = Self {
        algorithm: HashAlgorithm::Blake3,
    };

    pub const fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Digest raw bytes.
    pub fn hash(&self, data: &[u8]) -> ContentHash {
        match self.algorithm {
            HashAlgorithm::Sha256 => ContentHash::from_bytes(Sha256::digest(data).into()),
            HashAlgorithm::Blake3 => ContentHash::from_bytes(*blake3::hash(data).as_bytes()),
        }
    }

    /// Digest a named file's bytes into a [`FileProof`].
    pub fn prove(&self, name: impl Into<String>, data: &[u8]) -> FileProof {
        FileProof::new(name, self.hash(data))
    }

    /// Check that data hashes to the expected digest.
    pub fn verify(&self, data: &[u8], expected: &ContentHash) -> bool {
        self.hash(data) == *expected
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error)]
pub enum HasherError {
    #[error("failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("hashing task for {name} did not complete: {reason}")]
    Task { name: String, reason: String },
}
