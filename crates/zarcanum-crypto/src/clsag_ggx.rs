//! CLSAG-GGX: three-layer linkable ring signature.
//!
//! Layer 0 proves knowledge of the one-time secret behind a stealth address
//! (base G), layer 1 that the pseudo-out amount commitment opens to the same
//! amount as the ring member's (base G), layer 2 that the pseudo-out blinded
//! asset id hides the same asset (base X). Layers 0 and 1 share a response
//! vector `r_g`; layer 2 uses `r_x`.

use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::VartimeMultiscalarMul;
use rand_core::{CryptoRng, RngCore};
use zarcanum_types::constants::{
    HDS_CLSAG_GGX_CHALLENGE, HDS_CLSAG_GGX_LAYER_0, HDS_CLSAG_GGX_LAYER_1, HDS_CLSAG_GGX_LAYER_2,
};

use crate::hash::{hash_to_point, Transcript};
use crate::{div8, inv_eight, mul8, random_scalar, CryptoError, Generators};

/// Ring member as published on chain: the stealth address as-is, the two
/// commitments premultiplied by 1/8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GgxInputRef {
    pub stealth_address: EdwardsPoint,
    pub amount_commitment: EdwardsPoint,
    pub blinded_asset_id: EdwardsPoint,
}

/// Secrets of the real ring member.
#[derive(Clone)]
pub struct GgxSecrets {
    /// one-time secret key x, with x·G = stealth address
    pub stealth: Scalar,
    /// f with f·G = 8·A_l − A_p
    pub amount_blinding: Scalar,
    /// t with t·X = 8·T_l − T_p
    pub asset_blinding: Scalar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClsagGgxSignature {
    pub c: Scalar,
    pub r_g: Vec<Scalar>,
    pub r_x: Vec<Scalar>,
    /// (1/8)·f·Hp(P_l)
    pub k1: EdwardsPoint,
    /// (1/8)·t·Hp(P_l)
    pub k2: EdwardsPoint,
}

/// Aggregated public data shared by the prover and the verifier.
struct Aggregate {
    input_hash: [u8; 32],
    hp: Vec<EdwardsPoint>,
    w_g: Vec<EdwardsPoint>,
    w_x: Vec<EdwardsPoint>,
    w_ki_g: EdwardsPoint,
    w_ki_x: EdwardsPoint,
    coeffs: [Scalar; 3],
}

#[allow(clippy::too_many_arguments)]
fn aggregate(
    message: &[u8; 32],
    ring: &[GgxInputRef],
    pseudo_out_amount_commitment: &EdwardsPoint,
    pseudo_out_blinded_asset_id: &EdwardsPoint,
    key_image: &EdwardsPoint,
    k1_div8: &EdwardsPoint,
    k2_div8: &EdwardsPoint,
) -> Result<Aggregate, CryptoError> {
    let mut t = Transcript::with_capacity(6 + 3 * ring.len());
    t.add_scalar(&Scalar::from_bytes_mod_order(*message));
    for member in ring {
        t.add_point(&member.stealth_address)
            .add_point(&member.amount_commitment)
            .add_point(&member.blinded_asset_id);
    }
    t.add_point(&div8(pseudo_out_amount_commitment))
        .add_point(&div8(pseudo_out_blinded_asset_id))
        .add_point(key_image)
        .add_point(k1_div8)
        .add_point(k2_div8);
    let input_hash = t.raw_hash();

    let mut coeffs = [Scalar::ZERO; 3];
    for (coeff, label) in coeffs
        .iter_mut()
        .zip([HDS_CLSAG_GGX_LAYER_0, HDS_CLSAG_GGX_LAYER_1, HDS_CLSAG_GGX_LAYER_2])
    {
        *coeff = t.add_bytes(label).add_bytes(&input_hash).challenge();
    }
    let [a0, a1, a2] = coeffs;

    let hp = ring
        .iter()
        .map(|m| hash_to_point(m.stealth_address.compress().as_bytes()))
        .collect::<Result<Vec<_>, _>>()?;

    let w_g = ring
        .iter()
        .map(|m| {
            EdwardsPoint::vartime_multiscalar_mul(
                [a0, a1],
                [m.stealth_address, mul8(&m.amount_commitment) - pseudo_out_amount_commitment],
            )
        })
        .collect();
    let w_x = ring
        .iter()
        .map(|m| a2 * (mul8(&m.blinded_asset_id) - pseudo_out_blinded_asset_id))
        .collect();

    let w_ki_g = EdwardsPoint::vartime_multiscalar_mul([a0, a1], [*key_image, mul8(k1_div8)]);
    let w_ki_x = a2 * mul8(k2_div8);

    Ok(Aggregate { input_hash, hp, w_g, w_x, w_ki_g, w_ki_x, coeffs })
}

fn challenge_step(
    input_hash: &[u8; 32],
    gens: &Generators,
    hp: &EdwardsPoint,
    c: Scalar,
    r_g: Scalar,
    r_x: Scalar,
    w_g: &EdwardsPoint,
    w_x: &EdwardsPoint,
    w_ki_g: &EdwardsPoint,
    w_ki_x: &EdwardsPoint,
) -> Scalar {
    let mut t = Transcript::with_capacity(6);
    t.add_bytes(HDS_CLSAG_GGX_CHALLENGE)
        .add_bytes(input_hash)
        .add_point(&EdwardsPoint::vartime_multiscalar_mul([r_g, c], [gens.g, *w_g]))
        .add_point(&EdwardsPoint::vartime_multiscalar_mul([r_g, c], [*hp, *w_ki_g]))
        .add_point(&EdwardsPoint::vartime_multiscalar_mul([r_x, c], [gens.x, *w_x]))
        .add_point(&EdwardsPoint::vartime_multiscalar_mul([r_x, c], [*hp, *w_ki_x]));
    t.challenge()
}

// ─── Sign ───────────────────────────────────────────────────────────────────

/// Produce a CLSAG-GGX signature over `message`.
///
/// `pseudo_out_*` are full points (not 1/8-scaled); the ring carries the
/// on-chain 1/8-scaled commitments.
#[allow(clippy::too_many_arguments)]
pub fn generate<R: RngCore + CryptoRng + ?Sized>(
    gens: &Generators,
    rng: &mut R,
    message: &[u8; 32],
    ring: &[GgxInputRef],
    pseudo_out_amount_commitment: &EdwardsPoint,
    pseudo_out_blinded_asset_id: &EdwardsPoint,
    key_image: &EdwardsPoint,
    secrets: &GgxSecrets,
    secret_index: usize,
) -> Result<ClsagGgxSignature, CryptoError> {
    let n = ring.len();
    if n == 0 {
        return Err(CryptoError::EmptyRing);
    }
    if secret_index >= n {
        return Err(CryptoError::IndexOutOfRange { index: secret_index, size: n });
    }

    let real = &ring[secret_index];
    let ki_base = hash_to_point(real.stealth_address.compress().as_bytes())?;

    if secrets.stealth * ki_base != *key_image {
        return Err(CryptoError::InvariantViolation("key image does not match the secret"));
    }
    if &secrets.stealth * ED25519_BASEPOINT_TABLE != real.stealth_address {
        return Err(CryptoError::InvariantViolation("secret does not open the stealth address"));
    }
    if &secrets.amount_blinding * ED25519_BASEPOINT_TABLE
        != mul8(&real.amount_commitment) - pseudo_out_amount_commitment
    {
        return Err(CryptoError::InvariantViolation("amount commitment difference mismatch"));
    }
    if secrets.asset_blinding * gens.x != mul8(&real.blinded_asset_id) - pseudo_out_blinded_asset_id {
        return Err(CryptoError::InvariantViolation("blinded asset id difference mismatch"));
    }

    let k1 = (inv_eight() * secrets.amount_blinding) * ki_base;
    let k2 = (inv_eight() * secrets.asset_blinding) * ki_base;

    let agg = aggregate(
        message,
        ring,
        pseudo_out_amount_commitment,
        pseudo_out_blinded_asset_id,
        key_image,
        &k1,
        &k2,
    )?;
    let [a0, a1, a2] = agg.coeffs;

    let w_sec_g = a0 * secrets.stealth + a1 * secrets.amount_blinding;
    let w_sec_x = a2 * secrets.asset_blinding;
    if &w_sec_g * ED25519_BASEPOINT_TABLE != agg.w_g[secret_index] {
        return Err(CryptoError::InvariantViolation("aggregated G-layer key mismatch"));
    }
    if w_sec_x * gens.x != agg.w_x[secret_index] {
        return Err(CryptoError::InvariantViolation("aggregated X-layer key mismatch"));
    }

    let alpha_g = random_scalar(rng);
    let alpha_x = random_scalar(rng);

    let mut t = Transcript::with_capacity(6);
    t.add_bytes(HDS_CLSAG_GGX_CHALLENGE)
        .add_bytes(&agg.input_hash)
        .add_point(&(&alpha_g * ED25519_BASEPOINT_TABLE))
        .add_point(&(alpha_g * ki_base))
        .add_point(&(alpha_x * gens.x))
        .add_point(&(alpha_x * ki_base));
    let mut c_prev = t.challenge();

    let mut r_g = vec![Scalar::ZERO; n];
    let mut r_x = vec![Scalar::ZERO; n];
    let mut c0 = Scalar::ZERO;

    let mut i = (secret_index + 1) % n;
    for _ in 0..n - 1 {
        if i == 0 {
            c0 = c_prev;
        }
        r_g[i] = random_scalar(rng);
        r_x[i] = random_scalar(rng);
        c_prev = challenge_step(
            &agg.input_hash,
            gens,
            &agg.hp[i],
            c_prev,
            r_g[i],
            r_x[i],
            &agg.w_g[i],
            &agg.w_x[i],
            &agg.w_ki_g,
            &agg.w_ki_x,
        );
        i = (i + 1) % n;
    }
    if secret_index == 0 {
        c0 = c_prev;
    }

    r_g[secret_index] = alpha_g - c_prev * w_sec_g;
    r_x[secret_index] = alpha_x - c_prev * w_sec_x;

    log::trace!("clsag-ggx signed, ring size {}", n);
    Ok(ClsagGgxSignature { c: c0, r_g, r_x, k1, k2 })
}

// ─── Verify ─────────────────────────────────────────────────────────────────

/// Check a CLSAG-GGX signature. Malformed input yields `false`.
pub fn verify(
    gens: &Generators,
    message: &[u8; 32],
    ring: &[GgxInputRef],
    pseudo_out_amount_commitment: &EdwardsPoint,
    pseudo_out_blinded_asset_id: &EdwardsPoint,
    key_image: &EdwardsPoint,
    sig: &ClsagGgxSignature,
) -> bool {
    let n = ring.len();
    if n == 0 || sig.r_g.len() != n || sig.r_x.len() != n {
        return false;
    }
    if !key_image.is_torsion_free() {
        return false;
    }

    let agg = match aggregate(
        message,
        ring,
        pseudo_out_amount_commitment,
        pseudo_out_blinded_asset_id,
        key_image,
        &sig.k1,
        &sig.k2,
    ) {
        Ok(a) => a,
        Err(_) => return false,
    };

    let mut c = sig.c;
    for i in 0..n {
        c = challenge_step(
            &agg.input_hash,
            gens,
            &agg.hp[i],
            c,
            sig.r_g[i],
            sig.r_x[i],
            &agg.w_g[i],
            &agg.w_x[i],
            &agg.w_ki_g,
            &agg.w_ki_x,
        );
    }
    c == sig.c
}
