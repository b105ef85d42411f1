//! Generic double Schnorr signature.
//!
//! Proves knowledge of `a` and `b` with `A = a·B0` and `B = b·B1` for two
//! caller-chosen bases, bound to a message hash.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::VartimeMultiscalarMul;
use rand_core::{CryptoRng, RngCore};

use crate::hash::Transcript;
use crate::random_scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoubleSchnorrSignature {
    pub c: Scalar,
    pub y0: Scalar,
    pub y1: Scalar,
}

fn challenge(m: &[u8; 32], a: &EdwardsPoint, b: &EdwardsPoint, r0: &EdwardsPoint, r1: &EdwardsPoint) -> Scalar {
    let mut t = Transcript::with_capacity(5);
    t.add_bytes(m).add_point(a).add_point(b).add_point(r0).add_point(r1);
    t.challenge()
}

#[allow(clippy::too_many_arguments)]
pub fn generate<R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
    gen0: &EdwardsPoint,
    gen1: &EdwardsPoint,
    m: &[u8; 32],
    a: &EdwardsPoint,
    secret_a: &Scalar,
    b: &EdwardsPoint,
    secret_b: &Scalar,
) -> DoubleSchnorrSignature {
    let r0 = random_scalar(rng);
    let r1 = random_scalar(rng);
    let c = challenge(m, a, b, &(r0 * gen0), &(r1 * gen1));
    DoubleSchnorrSignature { c, y0: r0 - c * secret_a, y1: r1 - c * secret_b }
}

pub fn verify(
    gen0: &EdwardsPoint,
    gen1: &EdwardsPoint,
    m: &[u8; 32],
    a: &EdwardsPoint,
    b: &EdwardsPoint,
    sig: &DoubleSchnorrSignature,
) -> bool {
    let r0 = EdwardsPoint::vartime_multiscalar_mul([sig.y0, sig.c], [*gen0, *a]);
    let r1 = EdwardsPoint::vartime_multiscalar_mul([sig.y1, sig.c], [*gen1, *b]);
    challenge(m, a, b, &r0, &r1) == sig.c
}
