use std::path::Path;

use serde::{Deserialize, Serialize};
use solr_types::Address;

/// Ed25519 keypair. Its public key is the ledger [`Address`].
pub struct Keypair(ed25519_dalek::SigningKey);

/// Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "signature_serde")] [u8; 64]);

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from a raw 32-byte secret.
    pub fn from_secret(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// Create from the 64-byte `secret || public` form used by keypair files.
    /// The public half must match the secret.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| SignatureError::InvalidKeypairLength(bytes.len()))?;
        let key = ed25519_dalek::SigningKey::from_keypair_bytes(&arr)
            .map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self(key))
    }

    /// Read a JSON keypair file (an array of 64 integers).
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, SignatureError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SignatureError::KeypairFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let bytes: Vec<u8> =
            serde_json::from_str(&text).map_err(|e| SignatureError::KeypairFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Self::from_keypair_bytes(&bytes)
    }

    /// JSON keypair file contents for this key.
    pub fn to_json(&self) -> String {
        let bytes = self.0.to_keypair_bytes().to_vec();
        serde_json::Value::from(bytes).to_string()
    }

    /// The public address.
    pub fn address(&self) -> Address {
        Address::new(self.0.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer;
        Signature(self.0.sign(message).to_bytes())
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(self.0.as_bytes()))
    }
}

impl Signature {
    pub const LEN: usize = 64;

    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Verify this signature over `message` by the key behind `signer`.
    pub fn verify(&self, signer: &Address, message: &[u8]) -> Result<(), SignatureError> {
        use ed25519_dalek::Verifier;
        let key = ed25519_dalek::VerifyingKey::from_bytes(signer.as_bytes())
            .map_err(|_| SignatureError::InvalidKey)?;
        let sig = ed25519_dalek::Signature::from_bytes(&self.0);
        key.verify(message, &sig)
            .map_err(|_| SignatureError::InvalidSignature)
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Keypair({}, <redacted>)", self.address())
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}...)", hex::encode(&self.0[..8]))
    }
}

/// Errors from signing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid key")]
    InvalidKey,
    #[error("keypair must be 64 bytes, got {0}")]
    InvalidKeypairLength(usize),
    #[error("cannot load keypair file {path}: {reason}")]
    KeypairFile { path: String, reason: String },
}

mod signature_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(sig: &[u8; 64], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(sig)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 64], D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes: Vec<u8> = Vec::deserialize(deserializer)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 64-byte signature"))
    }
}
