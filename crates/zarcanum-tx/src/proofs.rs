//! Transaction-wide proofs: asset surjection, outputs range and balance.
//!
//! Provers read the finished [`GenerationContext`]; verifiers work from the
//! transaction alone, restoring ×1/8 points with `mul8`.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use rand_core::{CryptoRng, RngCore};
use zarcanum_crypto::aggregation::{self, UgAggregationInput};
use zarcanum_crypto::clsag_ggx::GgxInputRef;
use zarcanum_crypto::{bge, bulletproofs_plus, mul8, random_scalar, schnorr, Generators};

use crate::context::GenerationContext;
use crate::types::{
    Proof, Signature, Transaction, TxIn, TxOut, ZcAssetSurjectionProof, ZcBalanceProof, ZcOutsRangeProof,
};
use crate::zc_sig::verify_zc_sig;
use crate::{ResultExt, TxError};

// ─── Asset surjection ────────────────────────────────────────────────────────

/// One BGE proof per output that its blinded asset id hides the same asset
/// as one of the pseudo-outs.
pub fn generate_asset_surjection_proof<R: RngCore + CryptoRng + ?Sized>(
    gens: &Generators,
    rng: &mut R,
    context_hash: &[u8; 32],
    ctx: &GenerationContext,
) -> Result<ZcAssetSurjectionProof, TxError> {
    let outs = ctx.output_count();
    if outs == 0 {
        return Err(TxError::InvalidParameters("no outputs to prove".into()));
    }

    let mut bge_proofs = Vec::with_capacity(outs);
    for j in 0..outs {
        let t = ctx.blinded_asset_ids[j];
        let ring: Vec<EdwardsPoint> = ctx.pseudo_outs_blinded_asset_ids.iter().map(|tp| tp - t).collect();

        let index = ctx
            .real_zc_ins_asset_ids
            .iter()
            .position(|id| *id == ctx.asset_ids[j])
            .ok_or(TxError::AssetNotFound { output: j })?;
        let secret = ctx.pseudo_outs_plus_real_out_blinding_masks[index] - ctx.asset_id_blinding_masks[j];

        let proof = bge::generate(gens, rng, context_hash, &ring, &secret, index)
            .context(format!("surjection proof for output {j}"))?;
        bge_proofs.push(proof);
    }
    Ok(ZcAssetSurjectionProof { bge_proofs })
}

pub fn verify_asset_surjection_proof(
    gens: &Generators,
    context_hash: &[u8; 32],
    pseudo_out_blinded_asset_ids_1div8: &[EdwardsPoint],
    outputs_blinded_asset_ids_1div8: &[EdwardsPoint],
    proof: &ZcAssetSurjectionProof,
) -> bool {
    if proof.bge_proofs.len() != outputs_blinded_asset_ids_1div8.len() {
        return false;
    }
    let pseudo: Vec<EdwardsPoint> = pseudo_out_blinded_asset_ids_1div8.iter().map(mul8).collect();
    outputs_blinded_asset_ids_1div8
        .iter()
        .zip(&proof.bge_proofs)
        .all(|(t, p)| {
            let t = mul8(t);
            let ring: Vec<EdwardsPoint> = pseudo.iter().map(|tp| tp - t).collect();
            bge::verify(gens, context_hash, &ring, p)
        })
}

// ─── Outputs range proof ─────────────────────────────────────────────────────

/// Fresh `E'_j = amount_j·U + y'_j·G`, the UG aggregation proof tying each
/// `E'_j` to `E_j`, and one Bulletproof+ over all `E'_j`.
pub fn generate_outs_range_proof<R: RngCore + CryptoRng + ?Sized>(
    gens: &Generators,
    rng: &mut R,
    context_hash: &[u8; 32],
    ctx: &GenerationContext,
    amounts: &[u64],
) -> Result<ZcOutsRangeProof, TxError> {
    let outs = ctx.output_count();
    if amounts.len() != outs {
        return Err(TxError::InvariantViolation(format!(
            "{} amounts for {outs} outputs",
            amounts.len()
        )));
    }
    if amounts.iter().zip(&ctx.amounts).any(|(a, s)| Scalar::from(*a) != *s) {
        return Err(TxError::InvariantViolation("amounts disagree with the generation context".into()));
    }

    let rp_blinding_masks: Vec<Scalar> = (0..outs).map(|_| random_scalar(rng)).collect();
    let rp_commitments: Vec<EdwardsPoint> = ctx
        .amounts
        .iter()
        .zip(&rp_blinding_masks)
        .map(|(a, y)| EdwardsPoint::vartime_double_scalar_mul_basepoint(a, &gens.u, y))
        .collect();

    let input = UgAggregationInput {
        amounts: &ctx.amounts,
        amount_blinding_masks: &ctx.amount_blinding_masks,
        rp_blinding_masks: &rp_blinding_masks,
        amount_commitments: &ctx.amount_commitments,
        amount_commitments_for_rp_aggregation: &rp_commitments,
        blinded_asset_ids: &ctx.blinded_asset_ids,
    };
    let aggregation_proof =
        aggregation::generate(gens, rng, context_hash, &input).context("vector UG aggregation proof")?;

    let bpp = bulletproofs_plus::prove(
        gens,
        rng,
        amounts,
        &rp_blinding_masks,
        &aggregation_proof.amount_commitments_for_rp_aggregation,
    )
    .context("bulletproof+")?;

    log::trace!("range proof: {} values, {} rounds", outs, bpp.lv.len());
    Ok(ZcOutsRangeProof { bpp, aggregation_proof })
}

pub fn verify_outs_range_proof(
    gens: &Generators,
    context_hash: &[u8; 32],
    amount_commitments_1div8: &[EdwardsPoint],
    blinded_asset_ids_1div8: &[EdwardsPoint],
    proof: &ZcOutsRangeProof,
) -> bool {
    aggregation::verify(
        gens,
        context_hash,
        amount_commitments_1div8,
        blinded_asset_ids_1div8,
        &proof.aggregation_proof,
    ) && bulletproofs_plus::verify(gens, &proof.aggregation_proof.amount_commitments_for_rp_aggregation, &proof.bpp)
}

// ─── Balance ─────────────────────────────────────────────────────────────────

/// Double Schnorr proof that inputs minus outputs minus fee commit to zero,
/// bound to the transaction public key.
///
/// Without confidential inputs only the G component must cancel, over
/// (G, G). With them the last pseudo-out mask has already cancelled G and the
/// X component is proven over (X, G).
///
/// [`Signer::sign`](crate::Signer::sign) only spends confidential inputs and
/// so always takes the X branch; the G branch serves callers assembling a
/// context from explicit outputs alone.
pub fn generate_balance_proof<R: RngCore + CryptoRng + ?Sized>(
    gens: &Generators,
    rng: &mut R,
    context_hash: &[u8; 32],
    ctx: &GenerationContext,
    fee: u64,
    bare_inputs_sum: u64,
) -> Result<ZcBalanceProof, TxError> {
    let explicit = (Scalar::from(bare_inputs_sum) - Scalar::from(fee)) * gens.h;

    let dss = if ctx.zc_input_count() == 0 {
        let commitment_to_zero = explicit - ctx.amount_commitments_sum;
        let secret = -ctx.amount_blinding_masks_sum;
        if commitment_to_zero != secret * gens.g {
            return Err(TxError::InvariantViolation("commitment to zero is malformed (G)".into()));
        }
        schnorr::generate(
            rng,
            &gens.g,
            &gens.g,
            context_hash,
            &commitment_to_zero,
            &secret,
            &ctx.tx_pub_key_p,
            &ctx.tx_key.secret,
        )
    } else {
        let ao = if ctx.ao_commitment_in_outputs {
            -ctx.ao_amount_commitment
        } else {
            ctx.ao_amount_commitment
        };
        let commitment_to_zero = explicit + ctx.pseudo_out_amount_commitments_sum + ao - ctx.amount_commitments_sum;
        let secret = ctx.real_in_asset_id_blinding_mask_x_amount_sum - ctx.asset_id_blinding_mask_x_amount_sum;
        if commitment_to_zero != secret * gens.x {
            return Err(TxError::InvariantViolation("commitment to zero is malformed (X)".into()));
        }
        schnorr::generate(
            rng,
            &gens.x,
            &gens.g,
            context_hash,
            &commitment_to_zero,
            &secret,
            &ctx.tx_pub_key_p,
            &ctx.tx_key.secret,
        )
    };
    Ok(ZcBalanceProof { dss })
}

/// Recompute the commitment to zero from the transaction and check the
/// balance proof. Plain transfers only: no bare inputs, no asset operation.
pub fn verify_balance_proof(gens: &Generators, context_hash: &[u8; 32], tx: &Transaction, proof: &ZcBalanceProof) -> bool {
    let Some(tx_pub) = tx.tx_pub_key() else {
        return false;
    };
    let outputs_sum = zarcanum_outputs(tx).fold(EdwardsPoint::identity(), |acc, o| acc + mul8(&o.amount_commitment));
    let pseudo_outs: Vec<EdwardsPoint> = zc_sigs(tx).map(|s| mul8(&s.pseudo_out_amount_commitment)).collect();
    let explicit = -Scalar::from(tx.fee()) * gens.h;

    if pseudo_outs.is_empty() {
        let commitment_to_zero = explicit - outputs_sum;
        schnorr::verify(&gens.g, &gens.g, context_hash, &commitment_to_zero, tx_pub, &proof.dss)
    } else {
        let commitment_to_zero = explicit + pseudo_outs.iter().sum::<EdwardsPoint>() - outputs_sum;
        schnorr::verify(&gens.x, &gens.g, context_hash, &commitment_to_zero, tx_pub, &proof.dss)
    }
}

// ─── Whole transaction ───────────────────────────────────────────────────────

fn zarcanum_outputs(tx: &Transaction) -> impl Iterator<Item = &crate::types::TxOutZarcanum> {
    tx.vout.iter().map(|o| match o {
        TxOut::Zarcanum(z) => z,
    })
}

fn zc_sigs(tx: &Transaction) -> impl Iterator<Item = &crate::types::ZcSig> {
    tx.signatures.iter().map(|s| match s {
        Signature::Zc(z) => z,
    })
}

/// Check every signature and proof of a signed transaction.
///
/// `rings[i]` is the ring of the i-th signed (confidential) input, in the
/// order the signatures appear.
pub fn verify_transaction(gens: &Generators, tx: &Transaction, rings: &[Vec<GgxInputRef>]) -> bool {
    let tx_id = crate::serialize::prefix_hash(tx);
    let key_images: Vec<EdwardsPoint> = tx
        .vin
        .iter()
        .map(|i| match i {
            TxIn::ZcInput(zc) => zc.key_image,
        })
        .collect();
    let sigs: Vec<_> = zc_sigs(tx).collect();
    if sigs.len() != rings.len() || sigs.len() > key_images.len() {
        return false;
    }
    for ((sig, ring), ki) in sigs.iter().zip(rings).zip(&key_images) {
        if !verify_zc_sig(gens, &tx_id, ring, ki, sig) {
            log::debug!("zc signature failed");
            return false;
        }
    }

    let pseudo_t: Vec<EdwardsPoint> = sigs.iter().map(|s| s.pseudo_out_blinded_asset_id).collect();
    let out_t: Vec<EdwardsPoint> = zarcanum_outputs(tx).map(|o| o.blinded_asset_id).collect();
    let out_e: Vec<EdwardsPoint> = zarcanum_outputs(tx).map(|o| o.amount_commitment).collect();

    let (mut surjection, mut range, mut balance) = (false, false, false);
    for proof in &tx.proofs {
        let ok = match proof {
            Proof::AssetSurjection(p) => {
                surjection = true;
                verify_asset_surjection_proof(gens, &tx_id, &pseudo_t, &out_t, p)
            }
            Proof::OutsRange(p) => {
                range = true;
                verify_outs_range_proof(gens, &tx_id, &out_e, &out_t, p)
            }
            Proof::Balance(p) => {
                balance = true;
                verify_balance_proof(gens, &tx_id, tx, p)
            }
        };
        if !ok {
            log::debug!("proof tag {} failed", proof.tag().as_u8());
            return false;
        }
    }
    surjection && range && balance
}
