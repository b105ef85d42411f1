//! Zarcanum transaction construction.
//!
//! Turns a decoded [`FinalizeTxParam`] into a fully signed confidential
//! transaction: outputs are derived into a [`GenerationContext`], every
//! confidential input gets a CLSAG-GGX signature, and the transaction-wide
//! asset surjection, range and balance proofs are appended. Low-level proofs
//! live in zarcanum-crypto.

pub mod account;
pub mod config;
pub mod context;
pub mod derivation;
pub mod proofs;
pub mod serialize;
pub mod sign;
pub mod types;
pub mod zc_sig;

#[cfg(test)]
mod test_support;

pub use account::AccountKeys;
pub use config::SignerConfig;
pub use context::GenerationContext;
pub use sign::{sign_transaction, Signer};
pub use types::{FinalizeTxParam, FinalizedTx, Transaction, TxDest, TxSource, TxSourceOutputEntry};

use thiserror::Error;
use zarcanum_crypto::CryptoError;
use zarcanum_types::TypesError;

/// Machine-testable classification of a [`TxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    KeyMismatch,
    UnsupportedVersion,
    InvariantViolation,
    AssetNotFound,
    RingSize,
    InsufficientFunds,
    InvalidParameters,
}

#[derive(Debug, Error)]
pub enum TxError {
    #[error("key mismatch: {0}")]
    KeyMismatch(String),

    #[error("unsupported tx version = {0}")]
    UnsupportedVersion(u64),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("asset of output {output} is not provided by any input")]
    AssetNotFound { output: usize },

    #[error("ring size error: {0}")]
    RingSize(String),

    #[error("insufficient funds: inputs {inputs}, outputs {outputs}")]
    InsufficientFunds { inputs: u64, outputs: u64 },

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Types(#[from] TypesError),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<TxError>,
    },
}

impl TxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TxError::KeyMismatch(_) => ErrorKind::KeyMismatch,
            TxError::UnsupportedVersion(_) => ErrorKind::UnsupportedVersion,
            TxError::InvariantViolation(_) => ErrorKind::InvariantViolation,
            TxError::AssetNotFound { .. } => ErrorKind::AssetNotFound,
            TxError::RingSize(_) => ErrorKind::RingSize,
            TxError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            TxError::InvalidParameters(_) | TxError::Types(_) => ErrorKind::InvalidParameters,
            TxError::Crypto(e) => match e {
                CryptoError::EmptyRing
                | CryptoError::IndexOutOfRange { .. }
                | CryptoError::RingTooLarge { .. } => ErrorKind::RingSize,
                CryptoError::InvariantViolation(_) => ErrorKind::InvariantViolation,
                CryptoError::InvalidPoint(_)
                | CryptoError::Empty(_)
                | CryptoError::LengthMismatch { .. }
                | CryptoError::TooManyValues { .. } => ErrorKind::InvalidParameters,
            },
            TxError::Context { source, .. } => source.kind(),
        }
    }
}

/// Attach a human-readable step description to an error.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T, TxError>;
}

impl<T, E: Into<TxError>> ResultExt<T> for Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T, TxError> {
        self.map_err(|e| TxError::Context {
            context: context.into(),
            source: Box::new(e.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_kind() {
        let r: Result<(), CryptoError> = Err(CryptoError::EmptyRing);
        let err = r.context("while signing input 0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RingSize);
        assert_eq!(err.to_string(), "while signing input 0: ring is empty");

        let nested: Result<(), TxError> = Err(err);
        let err = nested.context("outer").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RingSize);
    }

    #[test]
    fn test_crypto_invariant_maps_to_invariant_kind() {
        let err = TxError::from(CryptoError::InvariantViolation("x"));
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
        let err = TxError::from(CryptoError::InvalidPoint("bad"));
        assert_eq!(err.kind(), ErrorKind::InvalidParameters);
    }
}
