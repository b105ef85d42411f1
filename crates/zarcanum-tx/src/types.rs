//! Typed transaction structures and signer parameters.
//!
//! Every variant container of the wire format (inputs, extra, outputs,
//! signatures, proofs, ring references) is a closed enum here; the wire tag
//! of each arm is given by `tag()`. Caller-facing parameters and results are
//! serde types with hex-encoded 32-byte fields.

use curve25519_dalek::edwards::EdwardsPoint;
use serde::{Deserialize, Serialize, Serializer};
use zarcanum_crypto::aggregation::UgAggregationProof;
use zarcanum_crypto::bge::BgeProof;
use zarcanum_crypto::bulletproofs_plus::BppSignature;
use zarcanum_crypto::clsag_ggx::ClsagGgxSignature;
use zarcanum_crypto::schnorr::DoubleSchnorrSignature;
use zarcanum_types::{AccountPublicAddress, Hash32, VariantTag};

// ─── Transaction ────────────────────────────────────────────────────────────

/// Post-Zarcanum transaction. Built append-only by the signer.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    pub version: u64,
    pub vin: Vec<TxIn>,
    pub extra: Vec<ExtraEntry>,
    pub vout: Vec<TxOut>,
    pub attachment: Vec<Attachment>,
    pub signatures: Vec<Signature>,
    pub proofs: Vec<Proof>,
}

impl Transaction {
    pub fn new(version: u64) -> Self {
        Self { version, ..Default::default() }
    }

    /// Fee declared in extra, zero when absent.
    pub fn fee(&self) -> u64 {
        self.extra
            .iter()
            .find_map(|e| match e {
                ExtraEntry::ZarcanumTxDataV1 { fee } => Some(*fee),
                _ => None,
            })
            .unwrap_or(0)
    }

    pub fn tx_pub_key(&self) -> Option<&EdwardsPoint> {
        self.extra.iter().find_map(|e| match e {
            ExtraEntry::PubKey(p) => Some(p),
            _ => None,
        })
    }

    pub fn derivation_hints(&self) -> Vec<u16> {
        self.extra
            .iter()
            .filter_map(|e| match e {
                ExtraEntry::DerivationHint(h) => Some(*h),
                _ => None,
            })
            .collect()
    }
}

/// Reference to a ring member: a global output index or a (tx, output) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutReference {
    #[serde(rename = "uint64")]
    GlobalIndex(u64),
    RefById { tx_id: Hash32, n: u32 },
}

impl OutReference {
    pub fn tag(&self) -> VariantTag {
        match self {
            OutReference::GlobalIndex(_) => VariantTag::Uint64,
            OutReference::RefById { .. } => VariantTag::RefById,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TxIn {
    ZcInput(TxInZcInput),
}

impl TxIn {
    pub fn tag(&self) -> VariantTag {
        match self {
            TxIn::ZcInput(_) => VariantTag::TxInZcInput,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TxInZcInput {
    /// Global indices relative to the previous one; `RefById` entries verbatim.
    pub key_offsets: Vec<OutReference>,
    pub key_image: EdwardsPoint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraEntry {
    PubKey(EdwardsPoint),
    EtcTxFlags16(u16),
    DerivationHint(u16),
    ZarcanumTxDataV1 { fee: u64 },
}

impl ExtraEntry {
    pub fn tag(&self) -> VariantTag {
        match self {
            ExtraEntry::PubKey(_) => VariantTag::PubKey,
            ExtraEntry::EtcTxFlags16(_) => VariantTag::EtcTxFlags16,
            ExtraEntry::DerivationHint(_) => VariantTag::DerivationHint,
            ExtraEntry::ZarcanumTxDataV1 { .. } => VariantTag::ZarcanumTxDataV1,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TxOut {
    Zarcanum(TxOutZarcanum),
}

impl TxOut {
    pub fn tag(&self) -> VariantTag {
        match self {
            TxOut::Zarcanum(_) => VariantTag::TxOutZarcanum,
        }
    }
}

/// Confidential output. Commitment and blinded asset id are stored ×1/8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutZarcanum {
    pub stealth_address: EdwardsPoint,
    pub concealing_point: EdwardsPoint,
    pub amount_commitment: EdwardsPoint,
    pub blinded_asset_id: EdwardsPoint,
    pub encrypted_amount: u64,
    pub mix_attr: u8,
}

/// No attachment kinds are produced by this signer.
#[derive(Debug, Clone)]
pub enum Attachment {}

#[derive(Debug, Clone)]
pub enum Signature {
    Zc(ZcSig),
}

impl Signature {
    pub fn tag(&self) -> VariantTag {
        match self {
            Signature::Zc(_) => VariantTag::ZcSig,
        }
    }
}

/// Per-input signature. Both pseudo-out points are stored ×1/8.
#[derive(Debug, Clone)]
pub struct ZcSig {
    pub pseudo_out_amount_commitment: EdwardsPoint,
    pub pseudo_out_blinded_asset_id: EdwardsPoint,
    pub clsag_ggx: ClsagGgxSignature,
}

#[derive(Debug, Clone)]
pub enum Proof {
    AssetSurjection(ZcAssetSurjectionProof),
    OutsRange(ZcOutsRangeProof),
    Balance(ZcBalanceProof),
}

impl Proof {
    pub fn tag(&self) -> VariantTag {
        match self {
            Proof::AssetSurjection(_) => VariantTag::ZcAssetSurjectionProof,
            Proof::OutsRange(_) => VariantTag::ZcOutsRangeProof,
            Proof::Balance(_) => VariantTag::ZcBalanceProof,
        }
    }
}

/// One BGE proof per output.
#[derive(Debug, Clone)]
pub struct ZcAssetSurjectionProof {
    pub bge_proofs: Vec<BgeProof>,
}

#[derive(Debug, Clone)]
pub struct ZcOutsRangeProof {
    pub bpp: BppSignature,
    pub aggregation_proof: UgAggregationProof,
}

#[derive(Debug, Clone, Copy)]
pub struct ZcBalanceProof {
    pub dss: DoubleSchnorrSignature,
}

// ─── Signer parameters ──────────────────────────────────────────────────────

/// One ring member of a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSourceOutputEntry {
    pub out_reference: OutReference,
    pub stealth_address: Hash32,
    pub concealing_point: Hash32,
    /// ×1/8, as found on chain.
    pub amount_commitment: Hash32,
    /// ×1/8, as found on chain.
    pub blinded_asset_id: Hash32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSource {
    pub outputs: Vec<TxSourceOutputEntry>,
    pub real_output: u64,
    pub real_out_tx_key: Hash32,
    pub real_out_amount_blinding_mask: Hash32,
    pub real_out_asset_id_blinding_mask: Hash32,
    pub real_out_in_tx_index: u64,
    pub amount: u64,
}

impl TxSource {
    /// Confidential sources carry a non-zero asset id blinding mask.
    pub fn is_zc(&self) -> bool {
        !self.real_out_asset_id_blinding_mask.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxDest {
    pub amount: u64,
    /// Exactly one address; several would make a multisig output.
    pub addr: Vec<AccountPublicAddress>,
    /// Unblinded asset id point.
    pub asset_id: Hash32,
    #[serde(default)]
    pub unlock_time: u64,
    /// See `zarcanum_types::constants::dest_flags`.
    #[serde(default)]
    pub flags: u64,
}

/// Decoded finalize-transaction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeTxParam {
    #[serde(default)]
    pub unlock_time: u64,
    pub sources: Vec<TxSource>,
    pub prepared_destinations: Vec<TxDest>,
    /// Must match the signing wallet.
    pub spend_pub_key: Hash32,
    pub tx_version: u64,
    #[serde(default)]
    pub shuffle: bool,
}

impl FinalizeTxParam {
    pub fn from_json(json: &str) -> Result<Self, crate::TxError> {
        serde_json::from_str(json).map_err(|e| crate::TxError::InvalidParameters(format!("finalize params: {e}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyImageIndex {
    pub out_index: u64,
    pub image: Hash32,
}

/// Signed transaction plus the data a wallet keeps about it.
#[derive(Debug, Clone, Serialize)]
pub struct FinalizedTx {
    #[serde(rename = "tx_blob", serialize_with = "serialize_tx_hex")]
    pub tx: Transaction,
    pub tx_id: Hash32,
    /// Transaction secret key.
    pub one_time_key: Hash32,
    /// Key images of change outputs, so the wallet can recognise their spends.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outs_key_images: Vec<KeyImageIndex>,
    /// Derivation of the last constructed output.
    pub derivation: Hash32,
    pub ftp: FinalizeTxParam,
}

fn serialize_tx_hex<S: Serializer>(tx: &Transaction, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(crate::serialize::transaction_blob(tx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;

    #[test]
    fn test_fee_and_pub_key_lookup() {
        let mut tx = Transaction::new(2);
        assert_eq!(tx.fee(), 0);
        assert!(tx.tx_pub_key().is_none());
        tx.extra.push(ExtraEntry::PubKey(ED25519_BASEPOINT_POINT));
        tx.extra.push(ExtraEntry::DerivationHint(7));
        tx.extra.push(ExtraEntry::ZarcanumTxDataV1 { fee: 10 });
        assert_eq!(tx.fee(), 10);
        assert_eq!(tx.tx_pub_key(), Some(&ED25519_BASEPOINT_POINT));
        assert_eq!(tx.derivation_hints(), vec![7]);
    }

    #[test]
    fn test_source_is_zc() {
        let mut src = TxSource {
            outputs: vec![],
            real_output: 0,
            real_out_tx_key: Hash32::ZERO,
            real_out_amount_blinding_mask: Hash32::ZERO,
            real_out_asset_id_blinding_mask: Hash32::ZERO,
            real_out_in_tx_index: 0,
            amount: 1,
        };
        assert!(!src.is_zc());
        src.real_out_asset_id_blinding_mask.0[0] = 1;
        assert!(src.is_zc());
    }

    #[test]
    fn test_out_reference_json() {
        let r: OutReference = serde_json::from_str(r#"{"uint64": 42}"#).unwrap();
        assert_eq!(r, OutReference::GlobalIndex(42));
        assert_eq!(r.tag(), VariantTag::Uint64);

        let json = format!(r#"{{"ref_by_id": {{"tx_id": "{}", "n": 3}}}}"#, "11".repeat(32));
        let r: OutReference = serde_json::from_str(&json).unwrap();
        assert_eq!(r, OutReference::RefById { tx_id: Hash32([0x11; 32]), n: 3 });
    }

    #[test]
    fn test_dest_defaults() {
        let json = format!(
            r#"{{"amount": 5, "addr": [{{"spend_public_key": "{z}", "view_public_key": "{z}"}}], "asset_id": "{z}"}}"#,
            z = "00".repeat(32)
        );
        let dest: TxDest = serde_json::from_str(&json).unwrap();
        assert_eq!(dest.flags, 0);
        assert_eq!(dest.unlock_time, 0);
        assert_eq!(dest.addr.len(), 1);
    }
}
