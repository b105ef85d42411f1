//! Zarcanum proof primitives.
//!
//! Modules:
//! - `hash`: Keccak-256, Hs / Hp and the Fiat-Shamir transcript
//! - `generators`: fixed points G, H, U, X and the BGE / BP+ vector families
//! - `keys`: key derivations, key images, derivation hints
//! - `clsag_ggx`: three-layer linkable ring signature (CLSAG-GGX)
//! - `bge`: one-out-of-many asset surjection proof
//! - `bulletproofs_plus`: aggregated range proof over (U, G)
//! - `aggregation`: vector UG aggregation proof for range proof commitments
//! - `schnorr`: generic double Schnorr signature
//!
//! Points embedded in proofs follow the cofactor convention: they are stored
//! multiplied by 1/8 and multiplied by 8 again before use.

use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use rand_core::{CryptoRng, RngCore};

mod elligator2;

pub mod aggregation;
pub mod bge;
pub mod bulletproofs_plus;
pub mod clsag_ggx;
pub mod generators;
pub mod hash;
pub mod keys;
pub mod schnorr;

pub use generators::Generators;
pub use hash::{hash_to_point, hash_to_scalar, keccak256, Transcript};

/// Errors raised by the provers and the primitive helpers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid point encoding: {0}")]
    InvalidPoint(&'static str),

    #[error("ring is empty")]
    EmptyRing,

    #[error("{0} is empty")]
    Empty(&'static str),

    #[error("secret index {index} out of range for ring of {size}")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("ring of {size} exceeds the maximum of {max}")]
    RingTooLarge { size: usize, max: usize },

    #[error("{what}: expected {expected} elements, got {got}")]
    LengthMismatch { what: &'static str, expected: usize, got: usize },

    #[error("{got} values exceed the aggregation limit of {max}")]
    TooManyValues { got: usize, max: usize },

    #[error("invariant violated: {0}")]
    InvariantViolation(&'static str),
}

// ─── Helpers ────────────────────────────────────────────────────────────────

pub fn decompress(bytes: &[u8; 32]) -> Result<EdwardsPoint, CryptoError> {
    CompressedEdwardsY(*bytes)
        .decompress()
        .ok_or(CryptoError::InvalidPoint("not on curve"))
}

pub fn compress(p: &EdwardsPoint) -> [u8; 32] {
    p.compress().to_bytes()
}

/// INV_EIGHT: 8^(-1) mod l
pub fn inv_eight() -> Scalar {
    Scalar::from(8u64).invert()
}

/// Scale a point by 1/8 for storage.
pub fn div8(p: &EdwardsPoint) -> EdwardsPoint {
    inv_eight() * p
}

/// Restore a stored point to full order.
pub fn mul8(p: &EdwardsPoint) -> EdwardsPoint {
    p.mul_by_cofactor()
}

/// Uniform scalar from 64 bytes of the supplied generator.
pub fn random_scalar<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Scalar {
    let mut bytes = [0u8; 64];
    rng.fill_bytes(&mut bytes);
    Scalar::from_bytes_mod_order_wide(&bytes)
}

#[cfg(test)]
pub(crate) fn test_rng(seed: u64) -> rand_chacha::ChaCha20Rng {
    use rand_core::SeedableRng;
    rand_chacha::ChaCha20Rng::seed_from_u64(seed)
}
