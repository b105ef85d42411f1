//! BGE one-out-of-many proof (Bootle, Groth, Esgin et al.).
//!
//! Proves knowledge of `secret` and index `l` such that `ring[l] = secret·X`
//! without revealing `l`. Used per output as the asset surjection proof.
//! The ring is padded to n^m elements by repeating its last element.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::{IsIdentity, VartimeMultiscalarMul};
use rand_core::{CryptoRng, RngCore};

use crate::generators::BGE_GENERATORS;
use crate::hash::Transcript;
use crate::{div8, mul8, random_scalar, CryptoError, Generators};

/// Radix of the index decomposition.
pub const BGE_N: usize = 4;

/// Largest supported ring: 2·m·n generators are needed.
pub const BGE_MAX_RING: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgeProof {
    /// premultiplied by 1/8
    pub a: EdwardsPoint,
    /// premultiplied by 1/8
    pub b: EdwardsPoint,
    /// premultiplied by 1/8, m elements
    pub pk: Vec<EdwardsPoint>,
    /// m·(n−1) elements; column 0 is implied
    pub f: Vec<Scalar>,
    pub y: Scalar,
    pub z: Scalar,
}

/// Smallest m with n^m >= size.
fn ceil_log_n(size: usize, n: usize) -> usize {
    let mut m = 0;
    let mut cap = 1usize;
    while cap < size {
        cap *= n;
        m += 1;
    }
    m
}

/// Matrix dimensions (m, N) for a ring.
fn dimensions(ring_size: usize) -> Result<(usize, usize), CryptoError> {
    if ring_size == 0 {
        return Err(CryptoError::EmptyRing);
    }
    if ring_size > BGE_MAX_RING {
        return Err(CryptoError::RingTooLarge { size: ring_size, max: BGE_MAX_RING });
    }
    let m = ceil_log_n(ring_size, BGE_N).max(1);
    debug_assert!(2 * m * BGE_N <= BGE_GENERATORS);
    Ok((m, BGE_N.pow(m as u32)))
}

/// Base-n digits of `value`, least significant first.
fn digits(mut value: usize, m: usize) -> Vec<usize> {
    (0..m)
        .map(|_| {
            let d = value % BGE_N;
            value /= BGE_N;
            d
        })
        .collect()
}

fn challenge(
    context_hash: &[u8; 32],
    ring: &[EdwardsPoint],
    a: &EdwardsPoint,
    b: &EdwardsPoint,
    pk: &[EdwardsPoint],
) -> Scalar {
    let mut t = Transcript::with_capacity(1 + ring.len() + 2 + pk.len());
    t.add_bytes(context_hash);
    for p in ring {
        t.add_point(&div8(p));
    }
    t.add_point(a).add_point(b).add_points(pk);
    t.challenge()
}

// ─── Prove ──────────────────────────────────────────────────────────────────

pub fn generate<R: RngCore + CryptoRng + ?Sized>(
    gens: &Generators,
    rng: &mut R,
    context_hash: &[u8; 32],
    ring: &[EdwardsPoint],
    secret: &Scalar,
    secret_index: usize,
) -> Result<BgeProof, CryptoError> {
    let ring_size = ring.len();
    let (m, big_n) = dimensions(ring_size)?;
    if secret_index >= ring_size {
        return Err(CryptoError::IndexOutOfRange { index: secret_index, size: ring_size });
    }
    if secret * gens.x != ring[secret_index] {
        return Err(CryptoError::InvariantViolation("ring element does not match the secret"));
    }
    let n = BGE_N;
    let idx = |j: usize, i: usize| j * n + i;

    // Rows sum to zero through column 0.
    let mut a_mat = vec![Scalar::ZERO; m * n];
    for j in 0..m {
        let mut col0 = Scalar::ZERO;
        for i in (1..n).rev() {
            let r = random_scalar(rng);
            a_mat[idx(j, i)] = r;
            col0 -= r;
        }
        a_mat[idx(j, 0)] = col0;
    }
    let l_digits = digits(secret_index, m);

    // coeffs[k·N + i]: coefficient of x^k in prod_j (a(j, i_j) + x·[i_j == l_j]),
    // without the leading x^m term of i == l.
    let mut coeffs = vec![Scalar::ZERO; m * big_n];
    for i in 0..big_n {
        coeffs[i] = Scalar::ONE;
        let mut degree = 1;
        for (j, i_j) in digits(i, m).into_iter().enumerate() {
            let a = a_mat[idx(j, i_j)];
            if i_j == l_digits[j] {
                let mut carry = Scalar::ZERO;
                for k in 0..degree {
                    let old = coeffs[k * big_n + i];
                    coeffs[k * big_n + i] = old * a + carry;
                    carry = old;
                }
                if degree < m {
                    coeffs[degree * big_n + i] += carry;
                }
                degree += 1;
            } else {
                for k in 0..degree {
                    coeffs[k * big_n + i] *= a;
                }
            }
        }
    }

    let r_a = random_scalar(rng);
    let r_b = random_scalar(rng);
    let ro: Vec<Scalar> = (0..m).map(|_| random_scalar(rng)).collect();

    let mut a_sc = Vec::with_capacity(2 * m * n + 1);
    let mut b_sc = Vec::with_capacity(2 * m * n + 1);
    let mut pts = Vec::with_capacity(2 * m * n + 1);
    for j in 0..m {
        for i in 0..n {
            let a = a_mat[idx(j, i)];
            let g1 = gens.bge[2 * idx(j, i)];
            let g2 = gens.bge[2 * idx(j, i) + 1];
            a_sc.push(a);
            a_sc.push(-(a * a));
            if l_digits[j] == i {
                b_sc.push(Scalar::ONE);
                b_sc.push(-a);
            } else {
                b_sc.push(Scalar::ZERO);
                b_sc.push(a);
            }
            pts.push(g1);
            pts.push(g2);
        }
    }
    a_sc.push(r_a);
    b_sc.push(r_b);
    pts.push(gens.x);
    let a_full = EdwardsPoint::vartime_multiscalar_mul(&a_sc, &pts);
    let b_full = EdwardsPoint::vartime_multiscalar_mul(&b_sc, &pts);

    let padded = |i: usize| ring[i.min(ring_size - 1)];
    let pk: Vec<EdwardsPoint> = (0..m)
        .map(|j| {
            let sc = coeffs[j * big_n..(j + 1) * big_n].iter().copied().chain([ro[j]]);
            let pts = (0..big_n).map(padded).chain([gens.x]);
            div8(&EdwardsPoint::vartime_multiscalar_mul(sc, pts))
        })
        .collect();

    let a = div8(&a_full);
    let b = div8(&b_full);
    let x = challenge(context_hash, ring, &a, &b, &pk);

    let mut f = Vec::with_capacity(m * (n - 1));
    for j in 0..m {
        for i in 1..n {
            let mut v = a_mat[idx(j, i)];
            if l_digits[j] == i {
                v += x;
            }
            f.push(v);
        }
    }

    let y = r_a + x * r_b;
    let mut z = Scalar::ZERO;
    let mut x_power = Scalar::ONE;
    for r in &ro {
        z -= x_power * r;
        x_power *= x;
    }
    z += secret * x_power;

    log::trace!("bge proof: ring {} padded to {} (m = {})", ring_size, big_n, m);
    Ok(BgeProof { a, b, pk, f, y, z })
}

// ─── Verify ─────────────────────────────────────────────────────────────────

pub fn verify(gens: &Generators, context_hash: &[u8; 32], ring: &[EdwardsPoint], proof: &BgeProof) -> bool {
    let ring_size = ring.len();
    let (m, big_n) = match dimensions(ring_size) {
        Ok(d) => d,
        Err(_) => return false,
    };
    let n = BGE_N;
    if proof.pk.len() != m || proof.f.len() != m * (n - 1) {
        return false;
    }

    let x = challenge(context_hash, ring, &proof.a, &proof.b, &proof.pk);

    let mut f_full = vec![Scalar::ZERO; m * n];
    for j in 0..m {
        let mut col0 = x;
        for i in 1..n {
            let v = proof.f[j * (n - 1) + i - 1];
            f_full[j * n + i] = v;
            col0 -= v;
        }
        f_full[j * n] = col0;
    }

    // 8A + x·8B == sum f·g1 + f(x − f)·g2 + y·X
    let mut sc = Vec::with_capacity(2 * m * n + 3);
    let mut pts = Vec::with_capacity(2 * m * n + 3);
    for (cell, f) in f_full.iter().enumerate() {
        sc.push(*f);
        pts.push(gens.bge[2 * cell]);
        sc.push(f * (x - f));
        pts.push(gens.bge[2 * cell + 1]);
    }
    sc.push(proof.y);
    pts.push(gens.x);
    sc.push(-Scalar::ONE);
    pts.push(mul8(&proof.a));
    sc.push(-x);
    pts.push(mul8(&proof.b));
    if !EdwardsPoint::vartime_multiscalar_mul(&sc, &pts).is_identity() {
        return false;
    }

    // sum_i (prod_j f(j, i_j))·ring_i − sum_k x^k·8Pk_k == z·X
    let mut sc = Vec::with_capacity(big_n + m + 1);
    let mut pts = Vec::with_capacity(big_n + m + 1);
    for i in 0..big_n {
        let p = digits(i, m)
            .into_iter()
            .enumerate()
            .fold(Scalar::ONE, |acc, (j, i_j)| acc * f_full[j * n + i_j]);
        sc.push(p);
        pts.push(ring[i.min(ring_size - 1)]);
    }
    let mut x_power = Scalar::ONE;
    for pk in &proof.pk {
        sc.push(-x_power);
        pts.push(mul8(pk));
        x_power *= x;
    }
    sc.push(-proof.z);
    pts.push(gens.x);
    EdwardsPoint::vartime_multiscalar_mul(&sc, &pts).is_identity()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::test_generators;
    use crate::test_rng;
    use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;

    fn ring_with_secret(size: usize, l: usize, seed: u64) -> (Vec<EdwardsPoint>, Scalar) {
        let gens = test_generators();
        let mut rng = test_rng(seed);
        let mut ring: Vec<EdwardsPoint> =
            (0..size).map(|_| &random_scalar(&mut rng) * ED25519_BASEPOINT_TABLE).collect();
        let secret = random_scalar(&mut rng);
        ring[l] = secret * gens.x;
        (ring, secret)
    }

    #[test]
    fn test_ceil_log_n() {
        assert_eq!(ceil_log_n(1, 4), 0);
        assert_eq!(ceil_log_n(4, 4), 1);
        assert_eq!(ceil_log_n(5, 4), 2);
        assert_eq!(ceil_log_n(16, 4), 2);
        assert_eq!(ceil_log_n(17, 4), 3);
    }

    #[test]
    fn test_bge_prove_verify_sizes() {
        let gens = test_generators();
        for (size, l) in [(1, 0), (2, 1), (4, 3), (5, 4), (7, 2), (16, 9), (20, 0)] {
            let (ring, secret) = ring_with_secret(size, l, size as u64);
            let mut rng = test_rng(100 + size as u64);
            let proof = generate(gens, &mut rng, &[9u8; 32], &ring, &secret, l).unwrap();
            let m = ceil_log_n(size, BGE_N).max(1);
            assert_eq!(proof.pk.len(), m);
            assert_eq!(proof.f.len(), m * (BGE_N - 1));
            assert!(verify(gens, &[9u8; 32], &ring, &proof), "size {} index {}", size, l);
        }
    }

    #[test]
    fn test_bge_wrong_context_fails() {
        let gens = test_generators();
        let (ring, secret) = ring_with_secret(3, 1, 1);
        let proof = generate(gens, &mut test_rng(2), &[1u8; 32], &ring, &secret, 1).unwrap();
        assert!(!verify(gens, &[2u8; 32], &ring, &proof));
    }

    #[test]
    fn test_bge_tampered_z_fails() {
        let gens = test_generators();
        let (ring, secret) = ring_with_secret(6, 5, 3);
        let mut proof = generate(gens, &mut test_rng(4), &[1u8; 32], &ring, &secret, 5).unwrap();
        proof.z += Scalar::ONE;
        assert!(!verify(gens, &[1u8; 32], &ring, &proof));
    }

    #[test]
    fn test_bge_bad_inputs() {
        let gens = test_generators();
        let (ring, secret) = ring_with_secret(3, 0, 5);
        let mut rng = test_rng(6);
        assert_eq!(
            generate(gens, &mut rng, &[0u8; 32], &[], &secret, 0).unwrap_err(),
            CryptoError::EmptyRing
        );
        assert_eq!(
            generate(gens, &mut rng, &[0u8; 32], &ring, &secret, 3).unwrap_err(),
            CryptoError::IndexOutOfRange { index: 3, size: 3 }
        );
        assert!(matches!(
            generate(gens, &mut rng, &[0u8; 32], &ring, &secret, 1),
            Err(CryptoError::InvariantViolation(_))
        ));
    }
}
