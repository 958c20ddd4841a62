use serde::{Deserialize, Serialize};

/// One excluded item of a fan-out operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Position of the item in the original input.
    pub index: usize,
    /// Caller-meaningful identity of the item (file name, transaction id).
    pub label: String,
    pub reason: String,
}

/// Results of a concurrent fan-out where each item succeeds or fails on its
/// own.
///
/// Failed items are excluded from `succeeded` but recorded in `failed`, so a
/// shrunken result set is always inspectable. `succeeded` keeps the relative
/// input order of the items that made it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<BatchFailure>,
}

impl<T> BatchOutcome<T> {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Collect indexed per-item results, keeping input order.
    pub fn from_results<E: std::fmt::Display>(
        results: impl IntoIterator<Item = (usize, String, Result<T, E>)>,
    ) -> Self {
        let mut items: Vec<(usize, String, Result<T, E>)> = results.into_iter().collect();
        items.sort_by_key(|(index, _, _)| *index);

        let mut outcome = Self::new();
        for (index, label, result) in items {
            match result {
                Ok(value) => outcome.succeeded.push(value),
                Err(e) => outcome.failed.push(BatchFailure {
                    index,
                    label,
                    reason: e.to_string(),
                }),
            }
        }
        outcome
    }

    /// Number of items that were submitted to the batch.
    pub fn requested(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Returns `true` if no item was excluded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> BatchOutcome<U> {
        BatchOutcome {
            succeeded: self.succeeded.into_iter().map(f).collect(),
            failed: self.failed,
        }
    }

    pub fn into_succeeded(self) -> Vec<T> {
        self.succeeded
    }
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self::new()
    }
}
