use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::{Determined, Lamports};
use crate::temporal::Timestamp;

/// Canonical payment facts derived from a ledger transaction.
///
/// Produced transiently when a transaction is resolved and folded into a
/// receipt at creation time; never persisted on its own. `destination` and
/// `amount` are both `Unknown` when the first instruction is not a parseable
/// value transfer. `payer` is always present for a found transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFact {
    pub payer: Address,
    pub destination: Determined<Address>,
    pub amount: Determined<Lamports>,
    pub occurred_at: Determined<Timestamp>,
}

impl PaymentFact {
    /// Facts for a transaction whose first instruction could not be parsed
    /// as a transfer.
    pub fn unparsed(payer: Address, occurred_at: Determined<Timestamp>) -> Self {
        Self {
            payer,
            destination: Determined::Unknown,
            amount: Determined::Unknown,
            occurred_at,
        }
    }

    /// Returns `true` if both transfer fields were determined.
    pub fn is_transfer(&self) -> bool {
        self.destination.is_known() && self.amount.is_known()
    }
}

/// Execution status of a transaction as reported by ledger metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxStatus {
    /// No execution metadata is available yet.
    Pending,
    Success,
    Failed,
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Success => write!(f, "Success"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Classification of a transaction by its first instruction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxKind {
    /// The instruction targets the receipt program itself.
    ReceiptCreation,
    /// A parsed value transfer.
    Transfer,
    /// Some other parsed instruction type, e.g. `"createAccount"`.
    Other(String),
    /// The instruction could not be parsed by the ledger.
    Unrecognized,
}

impl TxKind {
    pub fn is_receipt_creation(&self) -> bool {
        matches!(self, Self::ReceiptCreation)
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReceiptCreation => write!(f, "ReceiptCreation"),
            Self::Transfer => write!(f, "Transfer"),
            Self::Other(kind) => write!(f, "Other({kind})"),
            Self::Unrecognized => write!(f, "Unrecognized"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsed_has_unknown_transfer_fields() {
        let fact = PaymentFact::unparsed(Address::new([1; 32]), Determined::Unknown);
        assert!(fact.destination.is_unknown());
        assert!(fact.amount.is_unknown());
        assert!(!fact.is_transfer());
    }

    #[test]
    fn zero_amount_transfer_is_a_transfer() {
        let fact = PaymentFact {
            payer: Address::new([1; 32]),
            destination: Determined::Known(Address::new([2; 32])),
            amount: Determined::Known(Lamports(0)),
            occurred_at: Determined::Known(Timestamp::from_unix(10)),
        };
        assert!(fact.is_transfer());
    }

    #[test]
    fn kind_display() {
        assert_eq!(TxKind::Other("burn".into()).to_string(), "Other(burn)");
        assert_eq!(TxStatus::Failed.to_string(), "Failed");
        assert!(TxKind::ReceiptCreation.is_receipt_creation());
    }
}
