//! Bulletproofs+ aggregated range proofs over the (U, G) generator pair.
//!
//! Commitments have the form `v·U + γ·G`, with `v < 2^64`. Up to
//! `BPP_VALUES_MAX` values are aggregated into one logarithmic proof; the
//! value count is padded to a power of two.
//!
//! Reference: https://eprint.iacr.org/2020/735.pdf

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::{IsIdentity, VartimeMultiscalarMul};
use rand_core::{CryptoRng, RngCore};
use zarcanum_types::constants::BPP_TRANSCRIPT_SEED;

use crate::generators::{BPP_N as N, BPP_VALUES_MAX};
use crate::hash::{hash_to_scalar, Transcript};
use crate::{div8, mul8, random_scalar, CryptoError, Generators};

// ─── Proof structure ────────────────────────────────────────────────────────

/// All points premultiplied by 1/8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BppSignature {
    pub lv: Vec<EdwardsPoint>,
    pub rv: Vec<EdwardsPoint>,
    pub a0: EdwardsPoint,
    pub a: EdwardsPoint,
    pub b: EdwardsPoint,
    pub r: Scalar,
    pub s: Scalar,
    pub delta: Scalar,
}

fn ceil_log2(x: usize) -> usize {
    let mut log = 0;
    while (1usize << log) < x {
        log += 1;
    }
    log
}

fn initial_transcript() -> Scalar {
    hash_to_scalar(&[BPP_TRANSCRIPT_SEED])
}

/// d[i·N + j] = z^(2(i+1)) · 2^j
fn d_vector(z: &Scalar, m: usize) -> Vec<Scalar> {
    let z_sq = z * z;
    let mut d = vec![Scalar::ZERO; m * N];
    let mut row = z_sq;
    for i in 0..m {
        d[i * N] = row;
        for j in 1..N {
            d[i * N + j] = d[i * N + j - 1] + d[i * N + j - 1];
        }
        row *= z_sq;
    }
    d
}

fn powers(base: &Scalar, count: usize) -> Vec<Scalar> {
    let mut out = Vec::with_capacity(count);
    let mut acc = Scalar::ONE;
    for _ in 0..count {
        out.push(acc);
        acc *= base;
    }
    out
}

// ─── Prove ──────────────────────────────────────────────────────────────────

/// Prove that every `values[i]` lies in [0, 2^64) for the commitments
/// `commitments_1div8[i] = (values[i]·U + masks[i]·G) / 8`, which the caller
/// has already computed.
pub fn prove<R: RngCore + CryptoRng + ?Sized>(
    gens: &Generators,
    rng: &mut R,
    values: &[u64],
    masks: &[Scalar],
    commitments_1div8: &[EdwardsPoint],
) -> Result<BppSignature, CryptoError> {
    if values.is_empty() {
        return Err(CryptoError::Empty("bp+ values"));
    }
    if values.len() > BPP_VALUES_MAX {
        return Err(CryptoError::TooManyValues { got: values.len(), max: BPP_VALUES_MAX });
    }
    for (what, len) in [("bp+ masks", masks.len()), ("bp+ commitments", commitments_1div8.len())] {
        if len != values.len() {
            return Err(CryptoError::LengthMismatch { what, expected: values.len(), got: len });
        }
    }

    let m = 1usize << ceil_log2(values.len());
    let mn = m * N;

    // aL: bits of each value; aR = aL − 1. Padding rows are all zero bits.
    let mut a_l = vec![Scalar::ZERO; mn];
    let mut a_r = vec![-Scalar::ONE; mn];
    for (i, v) in values.iter().enumerate() {
        for j in 0..N {
            if (v >> j) & 1 == 1 {
                a_l[i * N + j] = Scalar::ONE;
                a_r[i * N + j] = Scalar::ZERO;
            }
        }
    }

    let mut t = Transcript::with_capacity(1 + values.len());
    let mut e = t
        .add_scalar(&initial_transcript())
        .add_points(commitments_1div8)
        .challenge();

    let alpha = random_scalar(rng);
    let a0 = div8(&EdwardsPoint::vartime_multiscalar_mul(
        std::iter::once(&alpha).chain(&a_l).chain(&a_r),
        std::iter::once(&gens.g).chain(&gens.bpp_g[..mn]).chain(&gens.bpp_h[..mn]),
    ));

    let y = t.add_scalar(&e).add_point(&a0).challenge();
    let z = hash_to_scalar(&[y.as_bytes()]);
    e = z;

    let d = d_vector(&z, m);
    let y_pow = powers(&y, mn + 2);
    let y_mn_p1 = y_pow[mn + 1];

    let mut a: Vec<Scalar> = a_l.iter().map(|x| x - z).collect();
    let mut b: Vec<Scalar> = a_r
        .iter()
        .enumerate()
        .map(|(i, x)| x + z + d[i] * y_pow[mn - i])
        .collect();

    let mask_sum = masks
        .iter()
        .enumerate()
        .fold(Scalar::ZERO, |acc, (i, g)| acc + d[i * N] * g);
    let mut alpha_hat = alpha + y_mn_p1 * mask_sum;

    let y_inv = y.invert();
    let y_inv_pow = powers(&y_inv, mn / 2 + 1);

    let mut g: Vec<EdwardsPoint> = gens.bpp_g[..mn].to_vec();
    let mut h: Vec<EdwardsPoint> = gens.bpp_h[..mn].to_vec();

    let mut lv = Vec::new();
    let mut rv = Vec::new();

    // zk-WIP reduction rounds
    let mut n = mn / 2;
    while n >= 1 {
        let d_l = random_scalar(rng);
        let d_r = random_scalar(rng);

        let c_l = (0..n).fold(Scalar::ZERO, |acc, i| acc + a[i] * y_pow[i + 1] * b[n + i]);
        let c_r = (0..n).fold(Scalar::ZERO, |acc, i| acc + a[n + i] * y_pow[i + 1] * b[i]) * y_pow[n];

        // L = cL·U + dL·G + b2·h1 + y^-n·a1·g2
        let l_sc = [c_l, d_l]
            .into_iter()
            .chain(b[n..2 * n].iter().copied())
            .chain(a[..n].iter().map(|x| x * y_inv_pow[n]));
        let l_pts = [gens.u, gens.g]
            .into_iter()
            .chain(h[..n].iter().copied())
            .chain(g[n..2 * n].iter().copied());
        let l_pt = div8(&EdwardsPoint::vartime_multiscalar_mul(l_sc, l_pts));

        // R = cR·U + dR·G + b1·h2 + y^n·a2·g1
        let r_sc = [c_r, d_r]
            .into_iter()
            .chain(b[..n].iter().copied())
            .chain(a[n..2 * n].iter().map(|x| x * y_pow[n]));
        let r_pts = [gens.u, gens.g]
            .into_iter()
            .chain(h[n..2 * n].iter().copied())
            .chain(g[..n].iter().copied());
        let r_pt = div8(&EdwardsPoint::vartime_multiscalar_mul(r_sc, r_pts));

        e = t.add_scalar(&e).add_point(&l_pt).add_point(&r_pt).challenge();
        lv.push(l_pt);
        rv.push(r_pt);

        let e_inv = e.invert();
        let e_y_inv_n = e * y_inv_pow[n];
        let e_inv_y_n = e_inv * y_pow[n];
        for i in 0..n {
            g[i] = EdwardsPoint::vartime_multiscalar_mul([e_inv, e_y_inv_n], [g[i], g[n + i]]);
            h[i] = EdwardsPoint::vartime_multiscalar_mul([e, e_inv], [h[i], h[n + i]]);
            a[i] = e * a[i] + e_inv_y_n * a[n + i];
            b[i] = e_inv * b[i] + e * b[n + i];
        }
        g.truncate(n);
        h.truncate(n);
        a.truncate(n);
        b.truncate(n);

        alpha_hat += e * e * d_l + e_inv * e_inv * d_r;
        n /= 2;
    }

    // last round
    let r = random_scalar(rng);
    let s = random_scalar(rng);
    let delta = random_scalar(rng);
    let eta = random_scalar(rng);

    let a_pt = div8(&EdwardsPoint::vartime_multiscalar_mul(
        [y * (r * b[0] + s * a[0]), delta, r, s],
        [gens.u, gens.g, g[0], h[0]],
    ));
    let b_pt = div8(&EdwardsPoint::vartime_multiscalar_mul([r * y * s, eta], [gens.u, gens.g]));

    e = t.add_scalar(&e).add_point(&a_pt).add_point(&b_pt).challenge();

    log::trace!("bp+ proof over {} values, {} rounds", values.len(), lv.len());
    Ok(BppSignature {
        lv,
        rv,
        a0,
        a: a_pt,
        b: b_pt,
        r: r + e * a[0],
        s: s + e * b[0],
        delta: eta + e * delta + e * e * alpha_hat,
    })
}

// ─── Verify ─────────────────────────────────────────────────────────────────

/// Verify one proof against its 1/8-scaled commitments.
pub fn verify(gens: &Generators, commitments_1div8: &[EdwardsPoint], proof: &BppSignature) -> bool {
    let mut batch = Batch::default();
    batch.push(gens, Scalar::ONE, commitments_1div8, proof) && batch.check(gens)
}

/// Verify several proofs in one multiscalar multiplication, each weighted by
/// a random scalar.
pub fn verify_batch<R: RngCore + CryptoRng + ?Sized>(
    gens: &Generators,
    rng: &mut R,
    proofs: &[(&[EdwardsPoint], &BppSignature)],
) -> bool {
    let mut batch = Batch::default();
    for (commitments, proof) in proofs {
        let w = random_scalar(rng);
        if !batch.push(gens, w, commitments, proof) {
            return false;
        }
    }
    batch.check(gens)
}

#[derive(Default)]
struct Batch {
    scalars: Vec<Scalar>,
    points: Vec<EdwardsPoint>,
    g_scalar: Scalar,
    u_scalar: Scalar,
}

impl Batch {
    fn push(&mut self, gens: &Generators, w: Scalar, v: &[EdwardsPoint], proof: &BppSignature) -> bool {
        let count = v.len();
        if count == 0 || count > BPP_VALUES_MAX {
            return false;
        }
        let log_m = ceil_log2(count);
        let m = 1usize << log_m;
        let mn = m * N;
        let rounds = proof.lv.len();
        if rounds != ceil_log2(N) + log_m || proof.rv.len() != rounds {
            return false;
        }

        // Reconstruct the transcript.
        let mut t = Transcript::new();
        let mut e = t.add_scalar(&initial_transcript()).add_points(v).challenge();
        let y = t.add_scalar(&e).add_point(&proof.a0).challenge();
        let z = hash_to_scalar(&[y.as_bytes()]);
        e = z;
        let mut challenges = Vec::with_capacity(rounds);
        for (l, r) in proof.lv.iter().zip(&proof.rv) {
            e = t.add_scalar(&e).add_point(l).add_point(r).challenge();
            challenges.push(e);
        }
        let e = t.add_scalar(&e).add_point(&proof.a).add_point(&proof.b).challenge();

        let mut to_invert = challenges.clone();
        to_invert.push(y);
        let inverses = batch_invert(&to_invert);
        let challenge_inverses = &inverses[..rounds];
        let y_inv = inverses[rounds];

        let e2 = e * e;
        let y_mn = scalar_pow(&y, mn);
        let y_mn_p1 = y_mn * y;

        let z2 = z * z;
        let z_powers: Vec<Scalar> = powers(&z2, m + 1).into_iter().skip(1).collect();

        // sum(d) = (2^64 − 1) · sum(z^(2j))
        let sum_z = z_powers.iter().fold(Scalar::ZERO, |acc, zp| acc + zp);
        let sum_d = Scalar::from(u64::MAX) * sum_z;

        // y + y^2 + ... + y^mn
        let mut sum_y = Scalar::ZERO;
        let mut yp = y;
        for _ in 0..mn {
            sum_y += yp;
            yp *= y;
        }

        for (j, vj) in v.iter().enumerate() {
            self.scalars.push(-(w * e2 * z_powers[j] * y_mn_p1));
            self.points.push(mul8(vj));
        }

        self.scalars.push(-(w * e2));
        self.points.push(mul8(&proof.a0));
        self.scalars.push(-(w * e));
        self.points.push(mul8(&proof.a));
        self.scalars.push(-w);
        self.points.push(mul8(&proof.b));

        self.g_scalar += w * proof.delta;
        self.u_scalar += w * (proof.r * y * proof.s + e2 * (y_mn_p1 * z * sum_d + (z2 - z) * sum_y));

        let cache = build_challenge_cache(&challenges, challenge_inverses, mn);

        let mut e_r_w = e * proof.r * w;
        let e_s_w = e * proof.s * w;
        let e2_z_w = e2 * z * w;
        let mut minus_e2_w_y = -(e2 * w * y_mn);
        for i in 0..mn {
            let d_i = z_powers[i / N] * Scalar::from(1u64 << (i % N));

            self.scalars.push(e_r_w * cache[i] + e2_z_w);
            self.points.push(gens.bpp_g[i]);

            let inv_index = (!i) & (mn - 1);
            self.scalars.push(e_s_w * cache[inv_index] - e2_z_w + minus_e2_w_y * d_i);
            self.points.push(gens.bpp_h[i]);

            e_r_w *= y_inv;
            minus_e2_w_y *= y_inv;
        }

        for j in 0..rounds {
            let x2 = challenges[j] * challenges[j];
            let x_inv2 = challenge_inverses[j] * challenge_inverses[j];
            self.scalars.push(-(w * e2 * x2));
            self.points.push(mul8(&proof.lv[j]));
            self.scalars.push(-(w * e2 * x_inv2));
            self.points.push(mul8(&proof.rv[j]));
        }
        true
    }

    fn check(mut self, gens: &Generators) -> bool {
        self.scalars.push(self.g_scalar);
        self.points.push(gens.g);
        self.scalars.push(self.u_scalar);
        self.points.push(gens.u);
        EdwardsPoint::vartime_multiscalar_mul(&self.scalars, &self.points).is_identity()
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn scalar_pow(base: &Scalar, exp: usize) -> Scalar {
    let mut result = Scalar::ONE;
    let mut b = *base;
    let mut e = exp;
    while e > 0 {
        if e & 1 == 1 {
            result *= b;
        }
        b *= b;
        e >>= 1;
    }
    result
}

/// Montgomery's trick. Inputs must be non-zero.
fn batch_invert(scalars: &[Scalar]) -> Vec<Scalar> {
    if scalars.is_empty() {
        return vec![];
    }
    let n = scalars.len();
    let mut products = Vec::with_capacity(n);
    let mut acc = scalars[0];
    products.push(acc);
    for s in &scalars[1..] {
        acc *= s;
        products.push(acc);
    }

    let mut inv = acc.invert();
    let mut result = vec![Scalar::ZERO; n];
    for i in (1..n).rev() {
        result[i] = products[i - 1] * inv;
        inv *= scalars[i];
    }
    result[0] = inv;
    result
}

/// cache[i] = product over rounds of e_j or e_j^-1 according to the bits of i.
fn build_challenge_cache(challenges: &[Scalar], challenge_inverses: &[Scalar], mn: usize) -> Vec<Scalar> {
    let rounds = challenges.len();
    let mut cache = vec![Scalar::ZERO; mn];
    cache[0] = challenge_inverses[0];
    cache[1] = challenges[0];
    for j in 1..rounds {
        let slots = 1usize << (j + 1);
        for s in (0..slots).rev() {
            cache[s] = if s % 2 == 1 {
                cache[s / 2] * challenges[j]
            } else {
                cache[s / 2] * challenge_inverses[j]
            };
        }
    }
    cache
}

// ─── Tests ──────────────────────────────────────────────────────────────────
