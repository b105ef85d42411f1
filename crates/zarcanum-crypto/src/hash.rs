//! Keccak-based hashing: Hs, Hp and the Fiat-Shamir transcript helper.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use tiny_keccak::{Hasher, Keccak};

use crate::{elligator2, CryptoError};

/// Keccak-256 (CryptoNote variant with 0x01 padding, NOT SHA3).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    let mut output = [0u8; 32];
    keccak.update(data);
    keccak.finalize(&mut output);
    output
}

/// Keccak-256 over several slices without concatenating them first.
pub fn keccak256_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    for part in parts {
        keccak.update(part);
    }
    let mut output = [0u8; 32];
    keccak.finalize(&mut output);
    output
}

/// Hs: keccak256(concat(data...)) reduced mod l.
pub fn hash_to_scalar(data: &[&[u8]]) -> Scalar {
    Scalar::from_bytes_mod_order(keccak256_parts(data))
}

/// Hp: keccak256 -> elligator2 -> cofactor multiply.
pub fn hash_to_point(data: &[u8]) -> Result<EdwardsPoint, CryptoError> {
    let hash = keccak256(data);
    let p = elligator2::ge_fromfe_frombytes_vartime(&hash)?;
    Ok(p.mul_by_cofactor())
}

/// Running Fiat-Shamir transcript.
///
/// Items are appended in their 32-byte encodings; `challenge` hashes the
/// buffer and clears it, `challenge_keep` hashes without clearing so later
/// items extend the same transcript.
#[derive(Default, Clone)]
pub struct Transcript {
    buf: Vec<u8>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(items: usize) -> Self {
        Self { buf: Vec::with_capacity(items * 32) }
    }

    pub fn add_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn add_scalar(&mut self, s: &Scalar) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self
    }

    pub fn add_point(&mut self, p: &EdwardsPoint) -> &mut Self {
        self.buf.extend_from_slice(p.compress().as_bytes());
        self
    }

    pub fn add_points(&mut self, ps: &[EdwardsPoint]) -> &mut Self {
        for p in ps {
            self.add_point(p);
        }
        self
    }

    pub fn challenge(&mut self) -> Scalar {
        let s = Scalar::from_bytes_mod_order(keccak256(&self.buf));
        self.buf.clear();
        s
    }

    pub fn challenge_keep(&self) -> Scalar {
        Scalar::from_bytes_mod_order(keccak256(&self.buf))
    }

    /// Unreduced keccak of the buffer; clears it.
    pub fn raw_hash(&mut self) -> [u8; 32] {
        let h = keccak256(&self.buf);
        self.buf.clear();
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_hash_to_point_of_basepoint_is_native_asset_point() {
        let h = hash_to_point(ED25519_BASEPOINT_POINT.compress().as_bytes()).unwrap();
        assert_eq!(
            hex::encode(h.compress().as_bytes()),
            "d6329b5b1f7c0805b5c345f4957554002a2f557845f64d7645dae0e051a6498a"
        );
    }

    #[test]
    fn test_transcript_keep_then_extend() {
        let mut t = Transcript::new();
        t.add_bytes(b"abc");
        let kept = t.challenge_keep();
        assert_eq!(kept, hash_to_scalar(&[b"abc"]));
        t.add_bytes(b"def");
        assert_eq!(t.challenge(), hash_to_scalar(&[b"abc", b"def"]));
        // cleared
        assert_eq!(t.challenge(), hash_to_scalar(&[]));
    }
}
