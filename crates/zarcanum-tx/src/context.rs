//! Per-transaction accumulator shared by the provers.
//!
//! Outputs fill their slots first; confidential inputs then append their
//! pseudo-out data in input order. All points are full order, never ×1/8.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use zarcanum_crypto::keys::secret_to_public;

#[derive(Clone)]
pub struct TxKeyPair {
    pub public: EdwardsPoint,
    pub secret: Scalar,
}

impl TxKeyPair {
    pub fn from_secret(secret: Scalar) -> Self {
        Self { public: secret_to_public(&secret), secret }
    }
}

impl std::fmt::Debug for TxKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxKeyPair")
            .field("public", &hex::encode(self.public.compress().as_bytes()))
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct GenerationContext {
    // per output
    pub asset_ids: Vec<EdwardsPoint>,
    pub blinded_asset_ids: Vec<EdwardsPoint>,
    pub amount_commitments: Vec<EdwardsPoint>,
    pub asset_id_blinding_masks: Vec<Scalar>,
    pub amounts: Vec<Scalar>,
    pub amount_blinding_masks: Vec<Scalar>,

    // per confidential input
    pub pseudo_outs_blinded_asset_ids: Vec<EdwardsPoint>,
    pub pseudo_outs_plus_real_out_blinding_masks: Vec<Scalar>,
    pub real_zc_ins_asset_ids: Vec<EdwardsPoint>,
    pub zc_input_amounts: Vec<u64>,

    pub pseudo_out_amount_commitments_sum: EdwardsPoint,
    pub pseudo_out_amount_blinding_masks_sum: Scalar,
    pub real_in_asset_id_blinding_mask_x_amount_sum: Scalar,
    pub amount_commitments_sum: EdwardsPoint,
    pub amount_blinding_masks_sum: Scalar,
    pub asset_id_blinding_mask_x_amount_sum: Scalar,

    // asset operation; stays neutral for plain transfers
    pub ao_asset_id: EdwardsPoint,
    pub ao_asset_id_pt: EdwardsPoint,
    pub ao_amount_commitment: EdwardsPoint,
    pub ao_amount_blinding_mask: Scalar,
    pub ao_commitment_in_outputs: bool,

    pub tx_key: TxKeyPair,
    pub tx_pub_key_p: EdwardsPoint,
}

impl GenerationContext {
    pub fn new(tx_key: TxKeyPair) -> Self {
        let tx_pub_key_p = tx_key.public;
        Self {
            asset_ids: Vec::new(),
            blinded_asset_ids: Vec::new(),
            amount_commitments: Vec::new(),
            asset_id_blinding_masks: Vec::new(),
            amounts: Vec::new(),
            amount_blinding_masks: Vec::new(),
            pseudo_outs_blinded_asset_ids: Vec::new(),
            pseudo_outs_plus_real_out_blinding_masks: Vec::new(),
            real_zc_ins_asset_ids: Vec::new(),
            zc_input_amounts: Vec::new(),
            pseudo_out_amount_commitments_sum: EdwardsPoint::identity(),
            pseudo_out_amount_blinding_masks_sum: Scalar::ZERO,
            real_in_asset_id_blinding_mask_x_amount_sum: Scalar::ZERO,
            amount_commitments_sum: EdwardsPoint::identity(),
            amount_blinding_masks_sum: Scalar::ZERO,
            asset_id_blinding_mask_x_amount_sum: Scalar::ZERO,
            ao_asset_id: EdwardsPoint::identity(),
            ao_asset_id_pt: EdwardsPoint::identity(),
            ao_amount_commitment: EdwardsPoint::identity(),
            ao_amount_blinding_mask: Scalar::ZERO,
            ao_commitment_in_outputs: false,
            tx_key,
            tx_pub_key_p,
        }
    }

    /// Size the per-output slots and reserve room for `inputs` confidential
    /// inputs.
    pub fn resize(&mut self, inputs: usize, outputs: usize) {
        let id = EdwardsPoint::identity();
        self.asset_ids.resize(outputs, id);
        self.blinded_asset_ids.resize(outputs, id);
        self.amount_commitments.resize(outputs, id);
        self.asset_id_blinding_masks.resize(outputs, Scalar::ZERO);
        self.amounts.resize(outputs, Scalar::ZERO);
        self.amount_blinding_masks.resize(outputs, Scalar::ZERO);

        self.pseudo_outs_blinded_asset_ids.reserve(inputs);
        self.pseudo_outs_plus_real_out_blinding_masks.reserve(inputs);
        self.real_zc_ins_asset_ids.reserve(inputs);
        self.zc_input_amounts.reserve(inputs);
    }

    pub fn output_count(&self) -> usize {
        self.amount_commitments.len()
    }

    pub fn zc_input_count(&self) -> usize {
        self.pseudo_outs_blinded_asset_ids.len()
    }

    /// Blinding budget left for the last pseudo-out amount commitment, so
    /// that pseudo-out masks sum to the output masks.
    pub fn remaining_pseudo_out_amount_mask(&self) -> Scalar {
        let mut f = self.amount_blinding_masks_sum - self.pseudo_out_amount_blinding_masks_sum;
        if self.ao_commitment_in_outputs {
            f += self.ao_amount_blinding_mask;
        } else {
            f -= self.ao_amount_blinding_mask;
        }
        f
    }
}
