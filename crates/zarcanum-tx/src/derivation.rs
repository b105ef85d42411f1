//! Output and input key derivation.
//!
//! Outputs: from the transaction secret and the recipient address derive the
//! stealth address, concealing point, blinded asset id, amount commitment and
//! encrypted amount, recording every secret in the generation context.
//! Inputs: recover the one-time secret of the real ring member and its key
//! image, and relative-encode the ring references.

use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use zarcanum_crypto::keys::{derivation_hint, derivation_to_scalar, generate_key_derivation, key_image};
use zarcanum_crypto::{decompress, div8, hash_to_scalar, Generators};
use zarcanum_types::constants::{
    dest_flags, mix_attr, HDS_OUT_AMOUNT_BLINDING_MASK, HDS_OUT_AMOUNT_MASK, HDS_OUT_ASSET_BLINDING_MASK,
    HDS_OUT_CONCEALING_POINT,
};
use zarcanum_types::Hash32;

use crate::account::AccountKeys;
use crate::context::GenerationContext;
use crate::types::{OutReference, TxDest, TxOutZarcanum, TxSource};
use crate::TxError;

// ─── Decoding helpers ────────────────────────────────────────────────────────

pub(crate) fn decode_point(bytes: &Hash32, what: &str) -> Result<EdwardsPoint, TxError> {
    decompress(bytes.as_bytes()).map_err(|_| TxError::InvalidParameters(format!("{what} is not a valid point")))
}

pub(crate) fn decode_scalar(bytes: &Hash32, what: &str) -> Result<Scalar, TxError> {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(bytes.0))
        .ok_or_else(|| TxError::InvalidParameters(format!("{what} is not a canonical scalar")))
}

// ─── Amounts ─────────────────────────────────────────────────────────────────

/// XOR the amount with the first 8 bytes of the amount mask (LE). The same
/// call decrypts.
pub fn encrypt_amount(amount: u64, amount_mask: &Scalar) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&amount_mask.as_bytes()[..8]);
    amount ^ u64::from_le_bytes(word)
}

fn labelled(label: &[u8; 32], h: &Scalar) -> Scalar {
    hash_to_scalar(&[label, h.as_bytes()])
}

// ─── Outputs ─────────────────────────────────────────────────────────────────

/// Result of deriving one output.
#[derive(Debug, Clone)]
pub struct DerivedOutput {
    pub out: TxOutZarcanum,
    /// 8·r·V
    pub derivation: EdwardsPoint,
    pub hint: u16,
    /// Hs(derivation || varint(index)); the receiver's one-time key offset.
    pub(crate) derivation_scalar: Scalar,
}

/// Derive output `output_index` for `dest` and record it in `ctx`.
pub fn derive_output(
    gens: &Generators,
    ctx: &mut GenerationContext,
    tx_secret: &Scalar,
    dest: &TxDest,
    output_index: usize,
) -> Result<DerivedOutput, TxError> {
    let addr = match dest.addr.as_slice() {
        [addr] => addr,
        [] => return Err(TxError::InvalidParameters(format!("destination {output_index} has no address"))),
        _ => {
            return Err(TxError::InvalidParameters(format!(
                "destination {output_index} has {} addresses; multisig outputs are not supported",
                dest.addr.len()
            )))
        }
    };
    if output_index >= ctx.output_count() {
        return Err(TxError::InvalidParameters(format!(
            "output index {output_index} beyond context of {}",
            ctx.output_count()
        )));
    }

    let view = decode_point(&addr.view_public_key, "destination view key")?;
    let spend = decode_point(&addr.spend_public_key, "destination spend key")?;
    let asset_id = decode_point(&dest.asset_id, "destination asset id")?;

    let derivation = generate_key_derivation(&view, tx_secret);
    let h = derivation_to_scalar(&derivation, output_index as u64);

    let amount_mask = labelled(HDS_OUT_AMOUNT_MASK, &h);
    let amount_blinding_mask = if dest.flags & dest_flags::ZERO_AMOUNT_BLINDING_MASK != 0 {
        Scalar::ZERO
    } else {
        labelled(HDS_OUT_AMOUNT_BLINDING_MASK, &h)
    };
    let asset_blinding_mask = if dest.flags & dest_flags::EXPLICIT_NATIVE_ASSET_ID != 0 {
        Scalar::ZERO
    } else {
        labelled(HDS_OUT_ASSET_BLINDING_MASK, &h)
    };

    let stealth_address = &h * ED25519_BASEPOINT_TABLE + spend;
    let concealing_point = labelled(HDS_OUT_CONCEALING_POINT, &h) * view;
    let blinded_asset_id = asset_id + asset_blinding_mask * gens.x;
    let amount = Scalar::from(dest.amount);
    let amount_commitment = amount * blinded_asset_id + &amount_blinding_mask * ED25519_BASEPOINT_TABLE;

    ctx.asset_ids[output_index] = asset_id;
    ctx.blinded_asset_ids[output_index] = blinded_asset_id;
    ctx.amount_commitments[output_index] = amount_commitment;
    ctx.asset_id_blinding_masks[output_index] = asset_blinding_mask;
    ctx.amounts[output_index] = amount;
    ctx.amount_blinding_masks[output_index] = amount_blinding_mask;
    ctx.amount_commitments_sum += amount_commitment;
    ctx.amount_blinding_masks_sum += amount_blinding_mask;
    ctx.asset_id_blinding_mask_x_amount_sum += asset_blinding_mask * amount;

    let out = TxOutZarcanum {
        stealth_address,
        concealing_point,
        amount_commitment: div8(&amount_commitment),
        blinded_asset_id: div8(&blinded_asset_id),
        encrypted_amount: encrypt_amount(dest.amount, &amount_mask),
        mix_attr: if addr.is_auditable() { mix_attr::NO_MIX } else { mix_attr::RELAXED },
    };

    Ok(DerivedOutput { out, hint: derivation_hint(&derivation), derivation, derivation_scalar: h })
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// One-time key pair of the real ring member and its key image.
#[derive(Clone)]
pub struct InputEphemeral {
    pub secret: Scalar,
    pub public: EdwardsPoint,
    pub key_image: EdwardsPoint,
}

impl std::fmt::Debug for InputEphemeral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputEphemeral")
            .field("public", &hex::encode(self.public.compress().as_bytes()))
            .field("key_image", &hex::encode(self.key_image.compress().as_bytes()))
            .finish_non_exhaustive()
    }
}

/// Recover the one-time secret of `src`'s real output and check it against
/// the ring.
pub fn derive_input_ephemeral(keys: &AccountKeys, src: &TxSource) -> Result<InputEphemeral, TxError> {
    let real = usize::try_from(src.real_output)
        .ok()
        .and_then(|i| src.outputs.get(i))
        .ok_or_else(|| {
            TxError::RingSize(format!(
                "real output {} outside ring of {}",
                src.real_output,
                src.outputs.len()
            ))
        })?;

    let real_out_tx_key = decode_point(&src.real_out_tx_key, "real_out_tx_key")?;
    let derivation = generate_key_derivation(&real_out_tx_key, &keys.view_secret);
    let h = derivation_to_scalar(&derivation, src.real_out_in_tx_index);
    let secret = h + keys.spend_secret;
    let public = &secret * ED25519_BASEPOINT_TABLE;

    if public.compress().as_bytes() != real.stealth_address.as_bytes() {
        return Err(TxError::KeyMismatch(
            "derived public key does not match the real output's stealth address".into(),
        ));
    }
    let key_image = key_image(&secret, &public)?;
    Ok(InputEphemeral { secret, public, key_image })
}

/// Global indices become deltas from the previous global index; `ref_by_id`
/// entries are kept as-is.
pub fn relative_key_offsets(refs: &[OutReference]) -> Result<Vec<OutReference>, TxError> {
    let mut prev = 0u64;
    refs.iter()
        .map(|r| match *r {
            OutReference::GlobalIndex(abs) => {
                let delta = abs.checked_sub(prev).ok_or_else(|| {
                    TxError::InvalidParameters(format!("ring references not ascending: {abs} after {prev}"))
                })?;
                prev = abs;
                Ok(OutReference::GlobalIndex(delta))
            }
            by_id => Ok(by_id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TxKeyPair;
    use zarcanum_crypto::keys::secret_to_public;
    use zarcanum_crypto::mul8;
    use zarcanum_types::AccountPublicAddress;

    fn hs(label: &[u8]) -> Scalar {
        hash_to_scalar(&[label])
    }

    fn gens() -> &'static Generators {
        use std::sync::OnceLock;
        static GENS: OnceLock<Generators> = OnceLock::new();
        GENS.get_or_init(|| Generators::new().unwrap())
    }

    fn recipient() -> AccountKeys {
        AccountKeys::new(hs(b"spend secret"), hs(b"view secret"), 0)
    }

    fn dest(amount: u64, flags: u64) -> TxDest {
        TxDest {
            amount,
            addr: vec![recipient().public_address()],
            asset_id: Hash32(gens().h.compress().to_bytes()),
            unlock_time: 0,
            flags,
        }
    }

    fn context(outputs: usize) -> GenerationContext {
        let mut ctx = GenerationContext::new(TxKeyPair::from_secret(hs(b"tx secret")));
        ctx.resize(0, outputs);
        ctx
    }

    #[test]
    fn test_encrypted_amount_vector() {
        let mut ctx = context(2);
        let r = hs(b"tx secret");
        let derived = derive_output(gens(), &mut ctx, &r, &dest(1000, 0), 1).unwrap();
        assert_eq!(derived.out.encrypted_amount, 4670785834675906153);
        assert_eq!(derived.hint, 0x6a6b);
        assert_eq!(
            hex::encode(derived.out.stealth_address.compress().as_bytes()),
            "80d5080701102358cb5ff845e06604cd4ab1eae7521cb1258126b4eac2f75c02"
        );

        let h = derived.derivation_scalar;
        let mask = hash_to_scalar(&[HDS_OUT_AMOUNT_MASK, h.as_bytes()]);
        assert_eq!(encrypt_amount(derived.out.encrypted_amount, &mask), 1000);
    }

    #[test]
    fn test_output_context_and_cofactor_convention() {
        let mut ctx = context(2);
        let r = hs(b"tx secret");
        let a = derive_output(gens(), &mut ctx, &r, &dest(1000, 0), 0).unwrap();
        let b = derive_output(gens(), &mut ctx, &r, &dest(500, 0), 1).unwrap();

        assert_eq!(mul8(&a.out.amount_commitment), ctx.amount_commitments[0]);
        assert_eq!(mul8(&b.out.blinded_asset_id), ctx.blinded_asset_ids[1]);
        assert_eq!(ctx.amount_commitments_sum, ctx.amount_commitments[0] + ctx.amount_commitments[1]);
        assert_eq!(ctx.amounts[1], Scalar::from(500u64));
        assert_eq!(
            ctx.asset_id_blinding_mask_x_amount_sum,
            ctx.asset_id_blinding_masks[0] * Scalar::from(1000u64) + ctx.asset_id_blinding_masks[1] * Scalar::from(500u64)
        );
        // E = amount * T + y * G
        let e = Scalar::from(1000u64) * ctx.blinded_asset_ids[0] + secret_to_public(&ctx.amount_blinding_masks[0]);
        assert_eq!(e, ctx.amount_commitments[0]);
        // concealing point is Hs(label, h) * V
        let q = hash_to_scalar(&[HDS_OUT_CONCEALING_POINT, a.derivation_scalar.as_bytes()]);
        assert_eq!(a.out.concealing_point, q * recipient().view_public);
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let r = hs(b"tx secret");
        let mut c1 = context(1);
        let mut c2 = context(1);
        let a = derive_output(gens(), &mut c1, &r, &dest(7, 0), 0).unwrap();
        let b = derive_output(gens(), &mut c2, &r, &dest(7, 0), 0).unwrap();
        assert_eq!(a.out, b.out);
        assert_eq!(c1.amount_blinding_masks, c2.amount_blinding_masks);
    }

    #[test]
    fn test_destination_flags() {
        let r = hs(b"tx secret");
        let mut ctx = context(1);
        let flags = dest_flags::EXPLICIT_NATIVE_ASSET_ID | dest_flags::ZERO_AMOUNT_BLINDING_MASK;
        let out = derive_output(gens(), &mut ctx, &r, &dest(3, flags), 0).unwrap().out;
        assert_eq!(mul8(&out.blinded_asset_id), gens().h);
        assert_eq!(mul8(&out.amount_commitment), Scalar::from(3u64) * gens().h);
        assert_eq!(ctx.amount_blinding_masks_sum, Scalar::ZERO);
    }

    #[test]
    fn test_auditable_address_forces_no_mix() {
        let r = hs(b"tx secret");
        let mut ctx = context(1);
        let mut d = dest(3, 0);
        d.addr[0].flags = 1;
        let out = derive_output(gens(), &mut ctx, &r, &d, 0).unwrap().out;
        assert_eq!(out.mix_attr, mix_attr::NO_MIX);
    }

    #[test]
    fn test_multisig_destination_rejected() {
        let r = hs(b"tx secret");
        let mut ctx = context(1);
        let mut d = dest(3, 0);
        d.addr.push(AccountPublicAddress::new(Hash32::ZERO, Hash32::ZERO));
        let err = derive_output(gens(), &mut ctx, &r, &d, 0).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidParameters);
    }

    fn source_for(keys: &AccountKeys, tx_secret: &Scalar, index: u64) -> TxSource {
        let d = generate_key_derivation(&keys.view_public, tx_secret);
        let stealth = &(derivation_to_scalar(&d, index) + keys.spend_secret) * ED25519_BASEPOINT_TABLE;
        let entry = crate::types::TxSourceOutputEntry {
            out_reference: OutReference::GlobalIndex(10),
            stealth_address: Hash32(stealth.compress().to_bytes()),
            concealing_point: Hash32::ZERO,
            amount_commitment: Hash32::ZERO,
            blinded_asset_id: Hash32::ZERO,
        };
        TxSource {
            outputs: vec![entry],
            real_output: 0,
            real_out_tx_key: Hash32(secret_to_public(tx_secret).compress().to_bytes()),
            real_out_amount_blinding_mask: Hash32::ZERO,
            real_out_asset_id_blinding_mask: Hash32::ZERO,
            real_out_in_tx_index: index,
            amount: 1,
        }
    }

    #[test]
    fn test_input_ephemeral_and_key_image() {
        let keys = recipient();
        let src = source_for(&keys, &hs(b"prev tx"), 3);
        let eph = derive_input_ephemeral(&keys, &src).unwrap();
        assert_eq!(eph.public.compress().as_bytes(), src.outputs[0].stealth_address.as_bytes());
        assert_eq!(eph.key_image, key_image(&eph.secret, &eph.public).unwrap());
    }

    #[test]
    fn test_input_ephemeral_debug_hides_secret() {
        let keys = recipient();
        let src = source_for(&keys, &hs(b"prev tx"), 3);
        let eph = derive_input_ephemeral(&keys, &src).unwrap();
        let shown = format!("{eph:?}");
        assert!(!shown.contains(&hex::encode(eph.secret.as_bytes())));
        assert!(shown.contains(&hex::encode(eph.key_image.compress().as_bytes())));
    }

    #[test]
    fn test_input_key_mismatch() {
        let keys = recipient();
        let mut src = source_for(&keys, &hs(b"prev tx"), 3);
        src.real_out_in_tx_index = 4;
        let err = derive_input_ephemeral(&keys, &src).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::KeyMismatch);

        src.real_output = 5;
        let err = derive_input_ephemeral(&keys, &src).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::RingSize);
    }

    #[test]
    fn test_relative_offsets() {
        let tx_id = Hash32([1; 32]);
        let refs = [
            OutReference::GlobalIndex(100),
            OutReference::RefById { tx_id, n: 2 },
            OutReference::GlobalIndex(150),
            OutReference::GlobalIndex(151),
        ];
        let rel = relative_key_offsets(&refs).unwrap();
        assert_eq!(
            rel,
            vec![
                OutReference::GlobalIndex(100),
                OutReference::RefById { tx_id, n: 2 },
                OutReference::GlobalIndex(50),
                OutReference::GlobalIndex(1),
            ]
        );
        let err = relative_key_offsets(&[OutReference::GlobalIndex(5), OutReference::GlobalIndex(4)]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidParameters);
    }
}
