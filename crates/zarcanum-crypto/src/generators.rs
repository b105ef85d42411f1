//! Fixed group generators used by the Zarcanum proofs.
//!
//! All of them are built once into an immutable [`Generators`] value that is
//! passed by reference into every prover and verifier.

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use zarcanum_types::constants::{BGE_GENERATOR_SEED, BPP_GENERATOR_SEED};

use crate::hash::{hash_to_point, hash_to_scalar};
use crate::CryptoError;

/// Native coin asset id point, equal to Hp(G).
pub const H_BYTES: [u8; 32] = hex32("d6329b5b1f7c0805b5c345f4957554002a2f557845f64d7645dae0e051a6498a");
/// Value generator of the Bulletproof+ commitments.
pub const U_BYTES: [u8; 32] = hex32("d0268e419f56175b91c243df3bf25ad42f43a7f018f580e31cc60b7d904ac9a1");
/// Asset blinding generator.
pub const X_BYTES: [u8; 32] = hex32("3a25bcdb43f5d2c9dd063dc39a9e0987bafc6fcf2df1bc76322d75884a4a3820");

/// Number of BGE generators (2 per matrix cell, n = 4, up to m = 4).
pub const BGE_GENERATORS: usize = 32;
/// Bits per Bulletproof+ value.
pub const BPP_N: usize = 64;
/// Maximum values per Bulletproof+ proof.
pub const BPP_VALUES_MAX: usize = 32;

const fn hex32(s: &str) -> [u8; 32] {
    const fn nibble(c: u8) -> u8 {
        match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            _ => panic!("bad hex digit"),
        }
    }
    let b = s.as_bytes();
    assert!(b.len() == 64);
    let mut out = [0u8; 32];
    let mut i = 0;
    while i < 32 {
        out[i] = (nibble(b[2 * i]) << 4) | nibble(b[2 * i + 1]);
        i += 1;
    }
    out
}

fn decompress_const(bytes: &[u8; 32], what: &'static str) -> Result<EdwardsPoint, CryptoError> {
    CompressedEdwardsY(*bytes)
        .decompress()
        .ok_or(CryptoError::InvalidPoint(what))
}

/// Generator `index` of a seeded family: Hp(Hs(seed) || LE-u64(index) || 0^24).
fn seeded_generator(seed_hash: &[u8; 32], index: u64) -> Result<EdwardsPoint, CryptoError> {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(seed_hash);
    buf[32..40].copy_from_slice(&index.to_le_bytes());
    hash_to_point(&buf)
}

#[derive(Clone, Debug)]
pub struct Generators {
    pub g: EdwardsPoint,
    pub h: EdwardsPoint,
    pub u: EdwardsPoint,
    pub x: EdwardsPoint,
    /// BGE matrix generators, two per cell.
    pub bge: Vec<EdwardsPoint>,
    /// Bulletproof+ vector generators G_i.
    pub bpp_g: Vec<EdwardsPoint>,
    /// Bulletproof+ vector generators H_i.
    pub bpp_h: Vec<EdwardsPoint>,
}

impl Generators {
    pub fn new() -> Result<Self, CryptoError> {
        let bge_seed = hash_to_scalar(&[BGE_GENERATOR_SEED]).to_bytes();
        let bge = (0..BGE_GENERATORS as u64)
            .map(|k| seeded_generator(&bge_seed, k))
            .collect::<Result<Vec<_>, _>>()?;

        let bpp_seed = hash_to_scalar(&[BPP_GENERATOR_SEED]).to_bytes();
        let count = BPP_N * BPP_VALUES_MAX;
        let mut bpp_g = Vec::with_capacity(count);
        let mut bpp_h = Vec::with_capacity(count);
        for i in 0..count as u64 {
            bpp_g.push(seeded_generator(&bpp_seed, 2 * i)?);
            bpp_h.push(seeded_generator(&bpp_seed, 2 * i + 1)?);
        }

        log::debug!("generators ready: {} bge, {} bp+ pairs", bge.len(), count);
        Ok(Self {
            g: ED25519_BASEPOINT_POINT,
            h: decompress_const(&H_BYTES, "H")?,
            u: decompress_const(&U_BYTES, "U")?,
            x: decompress_const(&X_BYTES, "X")?,
            bge,
            bpp_g,
            bpp_h,
        })
    }
}

/// Shared instance for unit tests; building the BP+ tables is not free.
#[cfg(test)]
pub(crate) fn test_generators() -> &'static Generators {
    use std::sync::OnceLock;
    static GENS: OnceLock<Generators> = OnceLock::new();
    GENS.get_or_init(|| Generators::new().unwrap())
}
