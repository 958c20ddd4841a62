use std::fmt;

use solr_crypto::{HasherError, SignatureError};
use solr_ledger::{CodecError, LedgerError};
use solr_types::{Address, Network, TxId};

/// Caller-facing failure classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The transaction or account does not exist on the queried network.
    NotFound,
    /// Bytes were present but did not match the expected schema.
    DecodeFailure,
    /// The operation was invoked before its inputs were ready.
    PreconditionFailure,
    /// The ledger could not be reached or answered unintelligibly.
    TransportFailure,
    /// The ledger refused a receipt write.
    SubmissionFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not found",
            Self::DecodeFailure => "decode failure",
            Self::PreconditionFailure => "precondition failure",
            Self::TransportFailure => "transport failure",
            Self::SubmissionFailure => "submission failure",
        };
        f.write_str(s)
    }
}

/// Errors produced by the receipt client.
#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    #[error("transaction {id} not found on {network}; it may exist on another network")]
    TransactionNotFound { id: TxId, network: Network },

    #[error("account {address} not found on {network}; it may exist on another network")]
    AccountNotFound { address: Address, network: Network },

    #[error("account {address} does not hold a receipt: {source}")]
    Decode {
        address: Address,
        #[source]
        source: CodecError,
    },

    #[error("account {address} is owned by {owner}, not the receipt program")]
    ForeignAccount { address: Address, owner: Address },

    #[error("account {address} is malformed: {reason}")]
    MalformedAccount { address: Address, reason: String },

    #[error("transaction {id} is malformed: {reason}")]
    MalformedTransaction { id: TxId, reason: String },

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport failure: {0}")]
    Transport(LedgerError),

    /// The transaction was sent but neither its confirmation nor the
    /// receipt account could be observed. The outcome is unknown: the
    /// receipt at `receipt` may still appear, so check it before retrying.
    #[error("transaction {id} not confirmed after {attempts} status checks; receipt {receipt} may still appear")]
    Unconfirmed {
        id: TxId,
        receipt: Address,
        attempts: u32,
    },

    #[error("submission failed: {0}")]
    Submission(String),

    #[error(transparent)]
    Hasher(#[from] HasherError),

    #[error(transparent)]
    Signer(#[from] SignatureError),
}

impl ReceiptError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TransactionNotFound { .. } | Self::AccountNotFound { .. } => ErrorKind::NotFound,
            Self::Decode { .. }
            | Self::ForeignAccount { .. }
            | Self::MalformedAccount { .. }
            | Self::MalformedTransaction { .. } => ErrorKind::DecodeFailure,
            Self::Precondition(_) | Self::Config(_) | Self::Hasher(_) | Self::Signer(_) => {
                ErrorKind::PreconditionFailure
            }
            Self::Transport(_) | Self::Unconfirmed { .. } => ErrorKind::TransportFailure,
            Self::Submission(_) => ErrorKind::SubmissionFailure,
        }
    }

    /// The network a not-found result is scoped to.
    pub fn network(&self) -> Option<&Network> {
        match self {
            Self::TransactionNotFound { network, .. } | Self::AccountNotFound { network, .. } => {
                Some(network)
            }
            _ => None,
        }
    }

    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::Precondition(reason.into())
    }
}

impl From<LedgerError> for ReceiptError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Rejected(reason) => Self::Submission(reason),
            LedgerError::MissingSigner(address) => {
                Self::Precondition(format!("no keypair for required signer {address}"))
            }
            other => Self::Transport(other),
        }
    }
}

pub type ReceiptResult<T> = Result<T, ReceiptError>;
