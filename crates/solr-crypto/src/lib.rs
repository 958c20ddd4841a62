//! Cryptographic primitives for SolReceipts.
//!
//! Provides content hashing of proof documents (single and concurrent batch)
//! and Ed25519 keypairs for signing ledger transactions.
//!
//! All crypto operations wrap established libraries.

pub mod hasher;
pub mod signer;
pub mod upload;

pub use hasher::{ContentHasher, HashAlgorithm, HasherError};
pub use signer::{Keypair, Signature, SignatureError};
pub use upload::UploadSource;
