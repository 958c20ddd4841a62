use serde::Serialize;
use solr_crypto::{ContentHasher, UploadSource};
use solr_types::{ContentHash, FileProof, ReceiptRecord};

use crate::error::ReceiptResult;

/// Outcome of checking a document against a stored receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Verification {
    /// The document hashes to the stored value.
    Verified(FileProof),
    /// A file of that name is recorded, with a different hash.
    Mismatch {
        expected: FileProof,
        actual: ContentHash,
    },
    /// The receipt records no file of that name.
    NotInRecord { name: String, actual: ContentHash },
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }
}

/// Re-hash `data` and compare it with the proof stored under `name`.
pub fn verify_bytes(
    hasher: &ContentHasher,
    record: &ReceiptRecord,
    name: &str,
    data: &[u8],
) -> Verification {
    let actual = hasher.hash(data);
    match record.file(name) {
        Some(proof) if proof.content_hash == actual => Verification::Verified(proof.clone()),
        Some(proof) => Verification::Mismatch {
            expected: proof.clone(),
            actual,
        },
        None => Verification::NotInRecord {
            name: name.to_string(),
            actual,
        },
    }
}

/// Load an upload and verify it against `record` by its proof name.
pub async fn verify_upload(
    hasher: &ContentHasher,
    record: &ReceiptRecord,
    source: UploadSource,
) -> ReceiptResult<Verification> {
    let (name, data) = source.load().await?;
    Ok(verify_bytes(hasher, record, &name, &data))
}
