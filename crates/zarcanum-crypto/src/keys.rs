//! One-time key derivation, key images and derivation hints.

use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use zarcanum_types::varint::write_varint;

use crate::hash::{hash_to_point, hash_to_scalar};
use crate::CryptoError;

pub fn secret_to_public(secret: &Scalar) -> EdwardsPoint {
    secret * ED25519_BASEPOINT_TABLE
}

/// Shared secret 8·s·P (sender: tx secret with the view key; receiver:
/// view secret with the tx public key).
pub fn generate_key_derivation(public: &EdwardsPoint, secret: &Scalar) -> EdwardsPoint {
    (secret * public).mul_by_cofactor()
}

/// Hs(derivation || varint(output_index))
pub fn derivation_to_scalar(derivation: &EdwardsPoint, output_index: u64) -> Scalar {
    let mut buf = Vec::with_capacity(42);
    buf.extend_from_slice(derivation.compress().as_bytes());
    write_varint(&mut buf, output_index);
    hash_to_scalar(&[&buf])
}

/// One-time stealth address Hs(d, i)·G + S.
pub fn derive_public_key(
    derivation: &EdwardsPoint,
    output_index: u64,
    spend_public: &EdwardsPoint,
) -> EdwardsPoint {
    secret_to_public(&derivation_to_scalar(derivation, output_index)) + spend_public
}

/// One-time secret Hs(d, i) + s.
pub fn derive_secret_key(derivation: &EdwardsPoint, output_index: u64, spend_secret: &Scalar) -> Scalar {
    derivation_to_scalar(derivation, output_index) + spend_secret
}

/// Key image x·Hp(P) for the one-time key pair (x, P).
pub fn key_image(secret: &Scalar, public: &EdwardsPoint) -> Result<EdwardsPoint, CryptoError> {
    Ok(secret * hash_to_point(public.compress().as_bytes())?)
}

/// 16-bit derivation hint: blake2b-256 of the derivation folded by XOR over
/// its sixteen little-endian words.
pub fn derivation_hint(derivation: &EdwardsPoint) -> u16 {
    let hash = blake2b_simd::Params::new()
        .hash_length(32)
        .hash(derivation.compress().as_bytes());
    hash.as_bytes()
        .chunks_exact(2)
        .fold(0u16, |acc, w| acc ^ u16::from_le_bytes([w[0], w[1]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hs(label: &[u8]) -> Scalar {
        hash_to_scalar(&[label])
    }

    fn hex_of(p: &EdwardsPoint) -> String {
        hex::encode(p.compress().as_bytes())
    }

    #[test]
    fn test_key_image_vector() {
        let sec = hs(b"zarcanum key image test");
        assert_eq!(
            hex::encode(sec.as_bytes()),
            "582bbe8d8ce28cb8a5851166b1bf18d3930d54e69cc8fdfc2c3da082bfe99e09"
        );
        let public = secret_to_public(&sec);
        assert_eq!(hex_of(&public), "d44bfb3d46572f7e8195abc778968120b182e96963fb5d735e442bd4ed636808");
        let ki = key_image(&sec, &public).unwrap();
        assert_eq!(hex_of(&ki), "20a27efd75ac69d65b71b173d1a785b4e1233c6e0f72d87b5d456b5d2c4337b0");
    }

    #[test]
    fn test_derivation_symmetry_and_vectors() {
        let r = hs(b"tx secret");
        let v = hs(b"view secret");
        let s = hs(b"spend secret");
        let (tx_pub, view_pub, spend_pub) = (secret_to_public(&r), secret_to_public(&v), secret_to_public(&s));

        let sender = generate_key_derivation(&view_pub, &r);
        let receiver = generate_key_derivation(&tx_pub, &v);
        assert_eq!(sender, receiver);
        assert_eq!(hex_of(&sender), "09db24a58ef3716e4249ad37861daaf63340fa82402fc28752514c781b5cdf34");

        let stealth = derive_public_key(&sender, 1, &spend_pub);
        assert_eq!(hex_of(&stealth), "80d5080701102358cb5ff845e06604cd4ab1eae7521cb1258126b4eac2f75c02");
        let one_time = derive_secret_key(&receiver, 1, &s);
        assert_eq!(secret_to_public(&one_time), stealth);

        assert_eq!(derivation_hint(&sender), 0x6a6b);
    }

    #[test]
    fn test_key_image_is_deterministic_and_key_specific() {
        let a = hs(b"a");
        let b = hs(b"b");
        let ki_a = key_image(&a, &secret_to_public(&a)).unwrap();
        assert_eq!(ki_a, key_image(&a, &secret_to_public(&a)).unwrap());
        assert_ne!(ki_a, key_image(&b, &secret_to_public(&b)).unwrap());
    }
}
