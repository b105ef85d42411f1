//! Per-input ZC signature: pseudo-out commitments plus CLSAG-GGX.

use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use rand_core::{CryptoRng, RngCore};
use zarcanum_crypto::clsag_ggx::{self, GgxInputRef, GgxSecrets};
use zarcanum_crypto::{div8, mul8, random_scalar, Generators};

use crate::context::GenerationContext;
use crate::derivation::{decode_point, decode_scalar, InputEphemeral};
use crate::types::{TxSource, ZcSig};
use crate::TxError;

/// Ring of `src` as CLSAG-GGX references (commitments stay ×1/8).
pub fn ring_from_source(src: &TxSource) -> Result<Vec<GgxInputRef>, TxError> {
    src.outputs
        .iter()
        .map(|o| {
            Ok(GgxInputRef {
                stealth_address: decode_point(&o.stealth_address, "ring stealth address")?,
                amount_commitment: decode_point(&o.amount_commitment, "ring amount commitment")?,
                blinded_asset_id: decode_point(&o.blinded_asset_id, "ring blinded asset id")?,
            })
        })
        .collect()
}

/// Sign one confidential input.
///
/// Draws the pseudo-out asset blinding `r'` and amount blinding `f'`; the
/// last confidential input takes whatever amount blinding remains so that
/// pseudo-out masks add up to the output masks. Appends the input's entries
/// to `ctx`.
#[allow(clippy::too_many_arguments)]
pub fn generate_zc_sig<R: RngCore + CryptoRng + ?Sized>(
    gens: &Generators,
    rng: &mut R,
    ctx: &mut GenerationContext,
    message: &[u8; 32],
    src: &TxSource,
    ephemeral: &InputEphemeral,
    last_zc_input: bool,
) -> Result<ZcSig, TxError> {
    let ring = ring_from_source(src)?;
    let real = usize::try_from(src.real_output)
        .ok()
        .filter(|&i| i < ring.len())
        .ok_or_else(|| TxError::RingSize(format!("real output {} outside ring of {}", src.real_output, ring.len())))?;

    let real_asset_mask = decode_scalar(&src.real_out_asset_id_blinding_mask, "real_out_asset_id_blinding_mask")?;
    let real_amount_mask = decode_scalar(&src.real_out_amount_blinding_mask, "real_out_amount_blinding_mask")?;
    let amount = Scalar::from(src.amount);

    let source_blinded_asset_id = mul8(&ring[real].blinded_asset_id);
    let asset_blinding = random_scalar(rng);
    let pseudo_out_blinded_asset_id = source_blinded_asset_id + asset_blinding * gens.x;

    let amount_blinding = if last_zc_input {
        ctx.remaining_pseudo_out_amount_mask()
    } else {
        random_scalar(rng)
    };
    let pseudo_out_amount_commitment =
        amount * source_blinded_asset_id + &amount_blinding * ED25519_BASEPOINT_TABLE;

    let secrets = GgxSecrets {
        stealth: ephemeral.secret,
        amount_blinding: real_amount_mask - amount_blinding,
        asset_blinding: -asset_blinding,
    };
    let clsag_ggx = clsag_ggx::generate(
        gens,
        rng,
        message,
        &ring,
        &pseudo_out_amount_commitment,
        &pseudo_out_blinded_asset_id,
        &ephemeral.key_image,
        &secrets,
        real,
    )?;

    // ctx only changes once the signature exists
    ctx.pseudo_outs_blinded_asset_ids.push(pseudo_out_blinded_asset_id);
    ctx.pseudo_outs_plus_real_out_blinding_masks.push(asset_blinding + real_asset_mask);
    ctx.real_zc_ins_asset_ids.push(source_blinded_asset_id - real_asset_mask * gens.x);
    ctx.zc_input_amounts.push(src.amount);
    ctx.pseudo_out_amount_blinding_masks_sum += amount_blinding;
    ctx.pseudo_out_amount_commitments_sum += pseudo_out_amount_commitment;
    ctx.real_in_asset_id_blinding_mask_x_amount_sum += real_asset_mask * amount;

    log::trace!("zc sig over ring of {} (last: {last_zc_input})", ring.len());
    Ok(ZcSig {
        pseudo_out_amount_commitment: div8(&pseudo_out_amount_commitment),
        pseudo_out_blinded_asset_id: div8(&pseudo_out_blinded_asset_id),
        clsag_ggx,
    })
}

/// Check a ZC signature against its ring and key image.
pub fn verify_zc_sig(
    gens: &Generators,
    message: &[u8; 32],
    ring: &[GgxInputRef],
    key_image: &EdwardsPoint,
    sig: &ZcSig,
) -> bool {
    clsag_ggx::verify(
        gens,
        message,
        ring,
        &mul8(&sig.pseudo_out_amount_commitment),
        &mul8(&sig.pseudo_out_blinded_asset_id),
        key_image,
        &sig.clsag_ggx,
    )
}
