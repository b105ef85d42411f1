//! Vector UG aggregation proof.
//!
//! Links each output's amount commitment `E_j = e_j·T_j + y_j·G` to a second
//! commitment `E'_j = e_j·U + y'_j·G` over the range proof generators, so a
//! single Bulletproof+ over the `E'_j` covers outputs of any asset. With the
//! public weight `w` the prover shows knowledge of `e_j` and `y_j + w·y'_j` in
//!
//! `E_j + w·E'_j = e_j·(T_j + w·U) + (y_j + w·y'_j)·G`

use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::VartimeMultiscalarMul;
use rand_core::{CryptoRng, RngCore};

use crate::hash::Transcript;
use crate::{div8, mul8, random_scalar, CryptoError, Generators};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UgAggregationProof {
    /// E'_j premultiplied by 1/8
    pub amount_commitments_for_rp_aggregation: Vec<EdwardsPoint>,
    pub y0s: Vec<Scalar>,
    pub y1s: Vec<Scalar>,
    pub c: Scalar,
}

/// Secrets and full-order points of one output.
pub struct UgAggregationInput<'a> {
    pub amounts: &'a [Scalar],
    pub amount_blinding_masks: &'a [Scalar],
    pub rp_blinding_masks: &'a [Scalar],
    pub amount_commitments: &'a [EdwardsPoint],
    pub amount_commitments_for_rp_aggregation: &'a [EdwardsPoint],
    pub blinded_asset_ids: &'a [EdwardsPoint],
}

pub fn generate<R: RngCore + CryptoRng + ?Sized>(
    gens: &Generators,
    rng: &mut R,
    context_hash: &[u8; 32],
    input: &UgAggregationInput<'_>,
) -> Result<UgAggregationProof, CryptoError> {
    let n = input.amounts.len();
    if n == 0 {
        return Err(CryptoError::Empty("aggregation secrets"));
    }
    for (what, len) in [
        ("amount blinding masks", input.amount_blinding_masks.len()),
        ("range proof blinding masks", input.rp_blinding_masks.len()),
        ("amount commitments", input.amount_commitments.len()),
        ("range proof commitments", input.amount_commitments_for_rp_aggregation.len()),
        ("blinded asset ids", input.blinded_asset_ids.len()),
    ] {
        if len != n {
            return Err(CryptoError::LengthMismatch { what, expected: n, got: len });
        }
    }

    let mut t = Transcript::with_capacity(1 + 3 * n);
    t.add_bytes(context_hash)
        .add_points(input.amount_commitments)
        .add_points(input.amount_commitments_for_rp_aggregation);
    let w = t.challenge_keep();

    let mut r0 = Vec::with_capacity(n);
    let mut r1 = Vec::with_capacity(n);
    for j in 0..n {
        let (a, b) = (random_scalar(rng), random_scalar(rng));
        let base = input.blinded_asset_ids[j] + w * gens.u;
        t.add_point(&(a * base + &b * ED25519_BASEPOINT_TABLE));
        r0.push(a);
        r1.push(b);
    }
    let c = t.challenge();

    let y0s = (0..n).map(|j| r0[j] - c * input.amounts[j]).collect();
    let y1s = (0..n)
        .map(|j| r1[j] - c * (input.amount_blinding_masks[j] + w * input.rp_blinding_masks[j]))
        .collect();

    Ok(UgAggregationProof {
        amount_commitments_for_rp_aggregation: input
            .amount_commitments_for_rp_aggregation
            .iter()
            .map(div8)
            .collect(),
        y0s,
        y1s,
        c,
    })
}

/// Verify against the outputs' 1/8-scaled amount commitments and blinded
/// asset ids.
pub fn verify(
    gens: &Generators,
    context_hash: &[u8; 32],
    amount_commitments_1div8: &[EdwardsPoint],
    blinded_asset_ids_1div8: &[EdwardsPoint],
    proof: &UgAggregationProof,
) -> bool {
    let n = amount_commitments_1div8.len();
    if n == 0
        || blinded_asset_ids_1div8.len() != n
        || proof.amount_commitments_for_rp_aggregation.len() != n
        || proof.y0s.len() != n
        || proof.y1s.len() != n
    {
        return false;
    }

    let e: Vec<EdwardsPoint> = amount_commitments_1div8.iter().map(mul8).collect();
    let e_rp: Vec<EdwardsPoint> = proof.amount_commitments_for_rp_aggregation.iter().map(mul8).collect();

    let mut t = Transcript::with_capacity(1 + 3 * n);
    t.add_bytes(context_hash).add_points(&e).add_points(&e_rp);
    let w = t.challenge_keep();

    for j in 0..n {
        let base = mul8(&blinded_asset_ids_1div8[j]) + w * gens.u;
        let r = EdwardsPoint::vartime_multiscalar_mul(
            [proof.y0s[j], proof.y1s[j], proof.c, proof.c * w],
            [base, gens.g, e[j], e_rp[j]],
        );
        t.add_point(&r);
    }
    t.challenge() == proof.c
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::test_generators;
    use crate::test_rng;

    struct Outputs {
        amounts: Vec<Scalar>,
        y: Vec<Scalar>,
        y_rp: Vec<Scalar>,
        e: Vec<EdwardsPoint>,
        e_rp: Vec<EdwardsPoint>,
        t: Vec<EdwardsPoint>,
    }

    fn outputs(amounts: &[u64], seed: u64) -> Outputs {
        let gens = test_generators();
        let mut rng = test_rng(seed);
        let mut o = Outputs { amounts: vec![], y: vec![], y_rp: vec![], e: vec![], e_rp: vec![], t: vec![] };
        for a in amounts {
            let amount = Scalar::from(*a);
            let t = gens.h + random_scalar(&mut rng) * gens.x;
            let y = random_scalar(&mut rng);
            let y_rp = random_scalar(&mut rng);
            o.e.push(amount * t + &y * ED25519_BASEPOINT_TABLE);
            o.e_rp.push(amount * gens.u + &y_rp * ED25519_BASEPOINT_TABLE);
            o.t.push(t);
            o.amounts.push(amount);
            o.y.push(y);
            o.y_rp.push(y_rp);
        }
        o
    }

    fn prove(o: &Outputs, ctx: &[u8; 32]) -> UgAggregationProof {
        let input = UgAggregationInput {
            amounts: &o.amounts,
            amount_blinding_masks: &o.y,
            rp_blinding_masks: &o.y_rp,
            amount_commitments: &o.e,
            amount_commitments_for_rp_aggregation: &o.e_rp,
            blinded_asset_ids: &o.t,
        };
        generate(test_generators(), &mut test_rng(77), ctx, &input).unwrap()
    }

    #[test]
    fn test_ug_aggregation_prove_verify() {
        let o = outputs(&[1000, 500, 0], 1);
        let proof = prove(&o, &[5u8; 32]);
        let e8: Vec<_> = o.e.iter().map(div8).collect();
        let t8: Vec<_> = o.t.iter().map(div8).collect();
        assert!(verify(test_generators(), &[5u8; 32], &e8, &t8, &proof));
        assert!(!verify(test_generators(), &[6u8; 32], &e8, &t8, &proof));
    }

    #[test]
    fn test_ug_aggregation_amount_mismatch_fails() {
        let mut o = outputs(&[1000, 500], 2);
        // E' commits to a different amount than E
        o.e_rp[1] = Scalar::from(501u64) * test_generators().u + &o.y_rp[1] * ED25519_BASEPOINT_TABLE;
        let proof = prove(&o, &[5u8; 32]);
        let e8: Vec<_> = o.e.iter().map(div8).collect();
        let t8: Vec<_> = o.t.iter().map(div8).collect();
        assert!(!verify(test_generators(), &[5u8; 32], &e8, &t8, &proof));
    }

    #[test]
    fn test_ug_aggregation_length_checks() {
        let o = outputs(&[1, 2], 3);
        let input = UgAggregationInput {
            amounts: &o.amounts,
            amount_blinding_masks: &o.y[..1],
            rp_blinding_masks: &o.y_rp,
            amount_commitments: &o.e,
            amount_commitments_for_rp_aggregation: &o.e_rp,
            blinded_asset_ids: &o.t,
        };
        assert_eq!(
            generate(test_generators(), &mut test_rng(1), &[0u8; 32], &input).unwrap_err(),
            CryptoError::LengthMismatch { what: "amount blinding masks", expected: 2, got: 1 }
        );
    }
}
