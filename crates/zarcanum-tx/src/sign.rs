//! Transaction signing pipeline.
//!
//! Takes decoded [`FinalizeTxParam`] and the wallet keys and produces a
//! [`FinalizedTx`] by:
//!   1. Checking the spend key and transaction version
//!   2. Building inputs (key images, relative ring offsets)
//!   3. Deriving every output into the generation context
//!   4. Declaring the fee and hashing the prefix
//!   5. Signing each confidential input with CLSAG-GGX
//!   6. Appending the surjection, range and balance proofs
//!
//! Outputs are always fully derived before the first input is signed.

use std::collections::BTreeSet;

use curve25519_dalek::scalar::Scalar;
use rand::seq::SliceRandom;
use rand_core::{CryptoRng, RngCore};
use zarcanum_crypto::keys::key_image;
use zarcanum_crypto::{random_scalar, Generators};
use zarcanum_types::constants::ETC_TX_FLAGS16_DEFAULT;
use zarcanum_types::Hash32;

use crate::account::AccountKeys;
use crate::config::SignerConfig;
use crate::context::{GenerationContext, TxKeyPair};
use crate::derivation::{derive_input_ephemeral, derive_output, relative_key_offsets};
use crate::proofs::{generate_asset_surjection_proof, generate_balance_proof, generate_outs_range_proof};
use crate::serialize::prefix_hash;
use crate::types::*;
use crate::zc_sig::generate_zc_sig;
use crate::{ResultExt, TxError};

/// Reusable signer: the generator tables are built once.
pub struct Signer {
    gens: Generators,
    config: SignerConfig,
}

impl Signer {
    pub fn new() -> Result<Self, TxError> {
        Self::with_config(SignerConfig::default())
    }

    pub fn with_config(config: SignerConfig) -> Result<Self, TxError> {
        Ok(Self { gens: Generators::new()?, config })
    }

    pub fn generators(&self) -> &Generators {
        &self.gens
    }

    pub fn config(&self) -> &SignerConfig {
        &self.config
    }

    fn validate(&self, keys: &AccountKeys, ftp: &FinalizeTxParam) -> Result<(), TxError> {
        if keys.spend_public.compress().as_bytes() != ftp.spend_pub_key.as_bytes() {
            return Err(TxError::KeyMismatch("spend key does not match".into()));
        }
        if ftp.tx_version != self.config.tx_version {
            return Err(TxError::UnsupportedVersion(ftp.tx_version));
        }
        if ftp.sources.is_empty() {
            return Err(TxError::InvalidParameters("no sources".into()));
        }
        let outs = ftp.prepared_destinations.len();
        if outs == 0 {
            return Err(TxError::InvalidParameters("no destinations".into()));
        }
        if outs > self.config.max_outputs {
            return Err(TxError::InvalidParameters(format!(
                "{outs} destinations exceed the limit of {}",
                self.config.max_outputs
            )));
        }
        for (i, src) in ftp.sources.iter().enumerate() {
            if !src.is_zc() {
                return Err(TxError::InvalidParameters(format!(
                    "source {i} is not confidential; bare inputs cannot be spent"
                )));
            }
            let ring = src.outputs.len();
            if ring == 0 || ring > self.config.max_ring_size {
                return Err(TxError::RingSize(format!(
                    "source {i}: ring of {ring} outside 1..={}",
                    self.config.max_ring_size
                )));
            }
        }
        Ok(())
    }

    /// Build and sign the transaction described by `ftp`.
    ///
    /// `one_time_key` fixes the transaction secret; a fresh one is drawn from
    /// `rng` otherwise.
    pub fn sign<R: RngCore + CryptoRng + ?Sized>(
        &self,
        rng: &mut R,
        keys: &AccountKeys,
        ftp: &FinalizeTxParam,
        one_time_key: Option<Scalar>,
    ) -> Result<FinalizedTx, TxError> {
        // 1. Validate.
        self.validate(keys, ftp)?;
        if ftp.unlock_time != 0 {
            log::warn!("unlock_time {} is not encoded by this signer", ftp.unlock_time);
        }

        let tx_key = TxKeyPair::from_secret(one_time_key.unwrap_or_else(|| random_scalar(rng)));
        let mut tx = Transaction::new(ftp.tx_version);
        tx.extra.push(ExtraEntry::PubKey(tx_key.public));
        tx.extra.push(ExtraEntry::EtcTxFlags16(ETC_TX_FLAGS16_DEFAULT));

        // 2. Inputs.
        let mut ephemerals = Vec::with_capacity(ftp.sources.len());
        for (i, src) in ftp.sources.iter().enumerate() {
            let eph = derive_input_ephemeral(keys, src).context(format!("source {i}"))?;
            let refs: Vec<OutReference> = src.outputs.iter().map(|o| o.out_reference).collect();
            tx.vin.push(TxIn::ZcInput(TxInZcInput {
                key_offsets: relative_key_offsets(&refs).context(format!("source {i}"))?,
                key_image: eph.key_image,
            }));
            ephemerals.push(eph);
        }

        let mut ctx = GenerationContext::new(tx_key.clone());
        ctx.resize(ftp.sources.len(), ftp.prepared_destinations.len());

        // 3. Outputs.
        let mut order: Vec<usize> = (0..ftp.prepared_destinations.len()).collect();
        if ftp.shuffle && self.config.allow_shuffle {
            order.shuffle(rng);
        }

        let own_spend_key = Hash32(keys.spend_public.compress().to_bytes());
        let mut amounts = Vec::with_capacity(order.len());
        let mut hints = Vec::with_capacity(order.len());
        let mut outs_key_images = Vec::new();
        let mut last_derivation = None;
        for (output_index, &dest_index) in order.iter().enumerate() {
            let dest = &ftp.prepared_destinations[dest_index];
            let derived = derive_output(&self.gens, &mut ctx, &tx_key.secret, dest, output_index)
                .context(format!("destination {dest_index}"))?;

            if dest.addr.first().is_some_and(|a| a.spend_public_key == own_spend_key) {
                let secret = derived.derivation_scalar + keys.spend_secret;
                let image = key_image(&secret, &derived.out.stealth_address)?;
                outs_key_images.push(KeyImageIndex {
                    out_index: output_index as u64,
                    image: Hash32(image.compress().to_bytes()),
                });
            }

            hints.push(derived.hint);
            amounts.push(dest.amount);
            last_derivation = Some(derived.derivation);
            tx.vout.push(TxOut::Zarcanum(derived.out));
        }

        if self.config.dedupe_hints {
            let unique: BTreeSet<u16> = hints.into_iter().collect();
            hints = unique.into_iter().collect();
        } else {
            hints.sort_unstable();
        }
        tx.extra.extend(hints.into_iter().map(ExtraEntry::DerivationHint));

        // 4. Fee and prefix hash.
        let total_in = sum_amounts(ftp.sources.iter().map(|s| s.amount))?;
        let total_out = sum_amounts(amounts.iter().copied())?;
        if total_in < total_out {
            return Err(TxError::InsufficientFunds { inputs: total_in, outputs: total_out });
        }
        let fee = total_in - total_out;
        if fee > 0 {
            tx.extra.push(ExtraEntry::ZarcanumTxDataV1 { fee });
        }

        let tx_id = prefix_hash(&tx);
        log::debug!(
            "tx prefix {}: {} inputs, {} outputs, fee {fee}",
            hex::encode(tx_id),
            tx.vin.len(),
            tx.vout.len()
        );

        // 5. Input signatures.
        let last = ftp.sources.len().saturating_sub(1);
        for (i, (src, eph)) in ftp.sources.iter().zip(&ephemerals).enumerate() {
            let sig = generate_zc_sig(&self.gens, rng, &mut ctx, &tx_id, src, eph, i == last)
                .context(format!("ZC signature for input {i}"))?;
            tx.signatures.push(Signature::Zc(sig));
        }

        // 6. Transaction-wide proofs.
        let surjection = generate_asset_surjection_proof(&self.gens, rng, &tx_id, &ctx)?;
        tx.proofs.push(Proof::AssetSurjection(surjection));

        let range = generate_outs_range_proof(&self.gens, rng, &tx_id, &ctx, &amounts)?;
        tx.proofs.push(Proof::OutsRange(range));

        let balance = generate_balance_proof(&self.gens, rng, &tx_id, &ctx, fee, 0)
            .context("balance proof")?;
        tx.proofs.push(Proof::Balance(balance));

        let derivation = last_derivation
            .ok_or_else(|| TxError::InvariantViolation("no output derived".into()))?;
        log::debug!("signed tx {} ({} change outputs)", hex::encode(tx_id), outs_key_images.len());

        Ok(FinalizedTx {
            tx,
            tx_id: Hash32(tx_id),
            one_time_key: Hash32(tx_key.secret.to_bytes()),
            outs_key_images,
            derivation: Hash32(derivation.compress().to_bytes()),
            ftp: ftp.clone(),
        })
    }
}

fn sum_amounts(mut amounts: impl Iterator<Item = u64>) -> Result<u64, TxError> {
    amounts
        .try_fold(0u64, |acc, a| acc.checked_add(a))
        .ok_or_else(|| TxError::InvalidParameters("amount sum overflows u64".into()))
}

/// Sign with a one-shot [`Signer`] using default limits and the operating
/// system's randomness.
pub fn sign_transaction(
    keys: &AccountKeys,
    ftp: &FinalizeTxParam,
    one_time_key: Option<Scalar>,
) -> Result<FinalizedTx, TxError> {
    Signer::new()?.sign(&mut rand::rngs::OsRng, keys, ftp, one_time_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proofs::verify_transaction;
    use crate::test_support::*;
    use crate::zc_sig::ring_from_source;
    use crate::ErrorKind;

    fn signer() -> Signer {
        Signer { gens: gens().clone(), config: SignerConfig::default() }
    }

    fn rings(ftp: &FinalizeTxParam) -> Vec<Vec<zarcanum_crypto::clsag_ggx::GgxInputRef>> {
        ftp.sources.iter().filter(|s| s.is_zc()).map(|s| ring_from_source(s).unwrap()).collect()
    }

    #[test]
    fn test_two_inputs_conserve_masks_and_verify() {
        let mut rng = rng(11);
        let keys = wallet();
        let sources = vec![zc_source(&mut rng, &keys, 600, 3, 0), zc_source(&mut rng, &keys, 400, 5, 4)];
        let dests = vec![native_dest(other_address(&mut rng), 900), native_dest(keys.public_address(), 95)];
        let ftp = params(&keys, sources, dests);

        let signer = signer();
        let ftx = signer.sign(&mut rng, &keys, &ftp, None).unwrap();
        assert_eq!(ftx.tx.fee(), 5);
        assert_eq!(ftx.tx.signatures.len(), 2);
        assert!(verify_transaction(signer.generators(), &ftx.tx, &rings(&ftp)));

        let ki: Vec<_> = ftx.tx.vin.iter().map(|TxIn::ZcInput(zc)| zc.key_image).collect();
        assert_ne!(ki[0], ki[1]);
    }

    #[test]
    fn test_change_output_key_image() {
        let mut rng = rng(12);
        let keys = wallet();
        let ftp = params(
            &keys,
            vec![zc_source(&mut rng, &keys, 100, 2, 1)],
            vec![native_dest(other_address(&mut rng), 60), native_dest(keys.public_address(), 40)],
        );
        let ftx = signer().sign(&mut rng, &keys, &ftp, None).unwrap();
        assert_eq!(ftx.outs_key_images.len(), 1);
        let entry = ftx.outs_key_images[0];
        assert_eq!(entry.out_index, 1);

        // the wallet can rebuild the same image from the received output
        let tx_pub = *ftx.tx.tx_pub_key().unwrap();
        let d = zarcanum_crypto::keys::generate_key_derivation(&tx_pub, &keys.view_secret);
        let secret = zarcanum_crypto::keys::derive_secret_key(&d, 1, &keys.spend_secret);
        let TxOut::Zarcanum(out) = &ftx.tx.vout[1];
        let image = key_image(&secret, &out.stealth_address).unwrap();
        assert_eq!(entry.image, hash32(&image));
        assert_eq!(ftx.derivation, hash32(&d));
    }

    #[test]
    fn test_fixed_one_time_key() {
        let mut rng = rng(13);
        let keys = wallet();
        let ftp = params(
            &keys,
            vec![zc_source(&mut rng, &keys, 10, 1, 0)],
            vec![native_dest(other_address(&mut rng), 10)],
        );
        let r = hash_to_scalar_bytes(b"one time");
        let ftx = signer().sign(&mut rng, &keys, &ftp, Some(r)).unwrap();
        assert_eq!(ftx.one_time_key, Hash32(r.to_bytes()));
        assert_eq!(ftx.tx.extra[0], ExtraEntry::PubKey(zarcanum_crypto::keys::secret_to_public(&r)));
        assert_eq!(ftx.tx.extra[1], ExtraEntry::EtcTxFlags16(0));
        // in == out: no fee entry
        assert_eq!(ftx.tx.fee(), 0);
        assert!(!ftx.tx.extra.iter().any(|e| matches!(e, ExtraEntry::ZarcanumTxDataV1 { .. })));
    }

    fn hash_to_scalar_bytes(label: &[u8]) -> Scalar {
        zarcanum_crypto::hash_to_scalar(&[label])
    }

    #[test]
    fn test_rejections() {
        let mut rng = rng(14);
        let keys = wallet();
        let base = params(
            &keys,
            vec![zc_source(&mut rng, &keys, 10, 2, 0)],
            vec![native_dest(other_address(&mut rng), 10)],
        );
        let signer = signer();

        let mut ftp = base.clone();
        ftp.spend_pub_key = Hash32([9; 32]);
        assert_eq!(signer.sign(&mut rng, &keys, &ftp, None).unwrap_err().kind(), ErrorKind::KeyMismatch);

        let mut ftp = base.clone();
        ftp.tx_version = 3;
        assert_eq!(signer.sign(&mut rng, &keys, &ftp, None).unwrap_err().kind(), ErrorKind::UnsupportedVersion);

        let mut ftp = base.clone();
        ftp.prepared_destinations[0].amount = 11;
        assert_eq!(signer.sign(&mut rng, &keys, &ftp, None).unwrap_err().kind(), ErrorKind::InsufficientFunds);

        let mut ftp = base.clone();
        ftp.sources[0].outputs.clear();
        assert_eq!(signer.sign(&mut rng, &keys, &ftp, None).unwrap_err().kind(), ErrorKind::RingSize);

        let mut ftp = base.clone();
        ftp.prepared_destinations.clear();
        assert_eq!(signer.sign(&mut rng, &keys, &ftp, None).unwrap_err().kind(), ErrorKind::InvalidParameters);

        let mut ftp = base.clone();
        ftp.sources[0].real_out_in_tx_index += 1;
        assert_eq!(signer.sign(&mut rng, &keys, &ftp, None).unwrap_err().kind(), ErrorKind::KeyMismatch);

        let mut ftp = base.clone();
        ftp.sources.clear();
        assert_eq!(signer.sign(&mut rng, &keys, &ftp, None).unwrap_err().kind(), ErrorKind::InvalidParameters);
    }

    #[test]
    fn test_bare_source_is_rejected_up_front() {
        let mut rng = rng(17);
        let keys = wallet();
        let mut bare = zc_source(&mut rng, &keys, 4, 2, 1);
        bare.real_out_asset_id_blinding_mask = Hash32::default();
        assert!(!bare.is_zc());
        let ftp = params(
            &keys,
            vec![zc_source(&mut rng, &keys, 10, 2, 0), bare],
            vec![native_dest(other_address(&mut rng), 12)],
        );

        let err = signer().sign(&mut rng, &keys, &ftp, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameters);
        assert!(err.to_string().contains("source 1"));
    }

    #[test]
    fn test_unknown_asset_is_rejected() {
        let mut rng = rng(15);
        let keys = wallet();
        let mut dest = native_dest(other_address(&mut rng), 10);
        dest.asset_id = hash32(&zarcanum_crypto::keys::secret_to_public(&random_scalar(&mut rng)));
        let ftp = params(&keys, vec![zc_source(&mut rng, &keys, 10, 2, 0)], vec![dest]);
        let err = signer().sign(&mut rng, &keys, &ftp, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AssetNotFound);
    }

    #[test]
    fn test_shuffle_follows_rng_and_still_verifies() {
        let mut rng = rng(16);
        let keys = wallet();
        let dests: Vec<TxDest> = (1..=6).map(|a| native_dest(other_address(&mut rng), a)).collect();
        let mut ftp = params(&keys, vec![zc_source(&mut rng, &keys, 21, 4, 2)], dests);
        ftp.shuffle = true;

        let signer = signer();
        let ftx = signer.sign(&mut rng, &keys, &ftp, None).unwrap();
        assert_eq!(ftx.tx.vout.len(), 6);
        assert!(verify_transaction(signer.generators(), &ftx.tx, &rings(&ftp)));
    }

    #[test]
    fn test_hints_deduplicated_and_sorted() {
        let mut rng = rng(17);
        let keys = wallet();
        let a = other_address(&mut rng);
        let b = other_address(&mut rng);
        let ftp = params(
            &keys,
            vec![zc_source(&mut rng, &keys, 30, 2, 0)],
            vec![native_dest(a, 10), native_dest(b, 10), native_dest(a, 10)],
        );
        let ftx = signer().sign(&mut rng, &keys, &ftp, None).unwrap();
        let hints = ftx.tx.derivation_hints();
        assert_eq!(hints.len(), 2);
        assert!(hints[0] < hints[1]);

        let config = SignerConfig { dedupe_hints: false, ..Default::default() };
        let signer = Signer { gens: gens().clone(), config };
        let ftx = signer.sign(&mut rng, &keys, &ftp, None).unwrap();
        assert_eq!(ftx.tx.derivation_hints().len(), 3);
    }
}
