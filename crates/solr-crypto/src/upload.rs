use std::path::PathBuf;

use solr_types::{BatchOutcome, FileProof};
use tracing::debug;

use crate::hasher::{ContentHasher, HasherError};

/// A supporting document supplied for hashing.
#[derive(Clone, Debug)]
pub enum UploadSource {
    /// Bytes already held in memory.
    Memory { name: String, data: Vec<u8> },
    /// A file on disk, read when the batch runs. The proof is named after
    /// the final path component.
    Path(PathBuf),
}

impl UploadSource {
    pub fn memory(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::Memory {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Name recorded in the resulting [`FileProof`].
    pub fn name(&self) -> String {
        match self {
            Self::Memory { name, .. } => name.clone(),
            Self::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }

    /// Read the upload's bytes, returning them with the proof name.
    pub async fn load(self) -> Result<(String, Vec<u8>), HasherError> {
        let name = self.name();
        match self {
            Self::Memory { data, .. } => Ok((name, data)),
            Self::Path(path) => match tokio::fs::read(&path).await {
                Ok(data) => Ok((name, data)),
                Err(source) => Err(HasherError::Read { name, source }),
            },
        }
    }
}

impl ContentHasher {
    /// Hash a batch of uploads concurrently.
    ///
    /// Each upload is read in its own task and hashed on the blocking pool,
    /// so large files do not stall the runtime's workers. An upload that cannot
    /// be read is excluded from `succeeded` and listed in `failed`; the rest
    /// of the batch is unaffected and keeps its input order.
    pub async fn hash_all(&self, sources: Vec<UploadSource>) -> BatchOutcome<FileProof> {
        let hasher = *self;
        let handles: Vec<_> = sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| {
                let name = source.name();
                let handle = tokio::spawn(async move {
                    let (name, data) = source.load().await?;
                    let label = name.clone();
                    tokio::task::spawn_blocking(move || hasher.prove(name, &data))
                        .await
                        .map_err(|e| HasherError::Task {
                            name: label,
                            reason: e.to_string(),
                        })
                });
                (index, name, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (index, name, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(HasherError::Task {
                    name: name.clone(),
                    reason: e.to_string(),
                }),
            };
            if let Err(e) = &result {
                debug!(file = %name, error = %e, "excluding upload from hash batch");
            }
            results.push((index, name, result));
        }

        BatchOutcome::from_results(results)
    }
}
