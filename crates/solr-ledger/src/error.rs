use solr_types::Address;

/// Errors from decoding ledger bytes.
///
/// Any of these aborts the whole decode; no partially decoded value is ever
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("truncated data: needed {needed} bytes at offset {offset}, {remaining} remaining")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("discriminator mismatch: expected {expected}, found {found}")]
    DiscriminatorMismatch { expected: String, found: String },

    #[error("field {field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    #[error("field {field} is {len} long, limit is {max}")]
    LengthExceeded {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Errors produced by ledger access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The endpoint could not be reached or the request did not complete.
    #[error("transport failure on {network}: {reason}")]
    Transport { network: String, reason: String },

    /// The endpoint answered with a JSON-RPC error object.
    #[error("rpc error {code} on {network}: {message}")]
    Rpc {
        network: String,
        code: i64,
        message: String,
    },

    /// The endpoint answered, but not in the expected shape.
    #[error("malformed response from {network}: {reason}")]
    MalformedResponse { network: String, reason: String },

    /// The ledger refused a submitted transaction.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("no keypair supplied for required signer {0}")]
    MissingSigner(Address),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns `true` for failures of the transport itself rather than of the
    /// request's content.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Rpc { .. } | Self::MalformedResponse { .. }
        )
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
