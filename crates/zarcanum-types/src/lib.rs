//! Core types and constants for Zarcanum confidential transactions.
//!
//! This crate provides the foundational pieces shared by the crypto and
//! transaction crates: variant tags, hash domain labels, destination and
//! address flags, the CryptoNote varint codec, hex (de)serialization of
//! 32-byte keys, and the public account address.

pub mod address;
pub mod constants;
pub mod hex32;
pub mod varint;

pub use address::AccountPublicAddress;
pub use constants::VariantTag;
pub use hex32::Hash32;

/// Errors raised while decoding the basic wire and text encodings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    #[error("varint incomplete or too long")]
    Varint,

    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("expected {expected} bytes, got {got}")]
    Length { expected: usize, got: usize },

    #[error("unknown variant tag {0}")]
    UnknownTag(u8),
}
