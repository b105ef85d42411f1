//! Fixtures shared by the unit tests: a wallet, confidential sources it can
//! spend, and destination builders.

use std::sync::OnceLock;

use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::scalar::Scalar;
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use zarcanum_crypto::keys::{derivation_to_scalar, generate_key_derivation, secret_to_public};
use zarcanum_crypto::{div8, hash_to_scalar, random_scalar, Generators};
use zarcanum_types::{AccountPublicAddress, Hash32};

use crate::account::AccountKeys;
use crate::types::{FinalizeTxParam, OutReference, TxDest, TxSource, TxSourceOutputEntry};

pub fn gens() -> &'static Generators {
    static GENS: OnceLock<Generators> = OnceLock::new();
    GENS.get_or_init(|| Generators::new().unwrap())
}

pub fn rng(seed: u64) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(seed)
}

pub fn hash32(p: &curve25519_dalek::edwards::EdwardsPoint) -> Hash32 {
    Hash32(p.compress().to_bytes())
}

pub fn wallet() -> AccountKeys {
    AccountKeys::new(hash_to_scalar(&[b"spend secret"]), hash_to_scalar(&[b"view secret"]), 0)
}

pub fn other_address(rng: &mut ChaCha20Rng) -> AccountPublicAddress {
    AccountPublicAddress::new(
        hash32(&secret_to_public(&random_scalar(rng))),
        hash32(&secret_to_public(&random_scalar(rng))),
    )
}

/// A ring of `ring_size` whose member `real` is a native-coin output of
/// `amount` sent to `keys`; the rest are random decoys.
pub fn zc_source(rng: &mut ChaCha20Rng, keys: &AccountKeys, amount: u64, ring_size: usize, real: usize) -> TxSource {
    let prev_tx_secret = random_scalar(rng);
    let out_index = 1u64;
    let d = generate_key_derivation(&keys.view_public, &prev_tx_secret);
    let stealth = &(derivation_to_scalar(&d, out_index) + keys.spend_secret) * ED25519_BASEPOINT_TABLE;

    let asset_mask = random_scalar(rng);
    let amount_mask = random_scalar(rng);
    let t = gens().h + asset_mask * gens().x;
    let e = Scalar::from(amount) * t + &amount_mask * ED25519_BASEPOINT_TABLE;

    let outputs = (0..ring_size)
        .map(|i| {
            let (stealth, e, t) = if i == real {
                (stealth, e, t)
            } else {
                (
                    secret_to_public(&random_scalar(rng)),
                    secret_to_public(&random_scalar(rng)),
                    gens().h + random_scalar(rng) * gens().x,
                )
            };
            TxSourceOutputEntry {
                out_reference: OutReference::GlobalIndex(1000 + 7 * i as u64),
                stealth_address: hash32(&stealth),
                concealing_point: hash32(&secret_to_public(&random_scalar(rng))),
                amount_commitment: hash32(&div8(&e)),
                blinded_asset_id: hash32(&div8(&t)),
            }
        })
        .collect();

    TxSource {
        outputs,
        real_output: real as u64,
        real_out_tx_key: hash32(&secret_to_public(&prev_tx_secret)),
        real_out_amount_blinding_mask: Hash32(amount_mask.to_bytes()),
        real_out_asset_id_blinding_mask: Hash32(asset_mask.to_bytes()),
        real_out_in_tx_index: out_index,
        amount,
    }
}

pub fn native_dest(addr: AccountPublicAddress, amount: u64) -> TxDest {
    TxDest {
        amount,
        addr: vec![addr],
        asset_id: hash32(&gens().h),
        unlock_time: 0,
        flags: 0,
    }
}

pub fn params(keys: &AccountKeys, sources: Vec<TxSource>, dests: Vec<TxDest>) -> FinalizeTxParam {
    FinalizeTxParam {
        unlock_time: 0,
        sources,
        prepared_destinations: dests,
        spend_pub_key: hash32(&keys.spend_public),
        tx_version: 2,
        shuffle: false,
    }
}
