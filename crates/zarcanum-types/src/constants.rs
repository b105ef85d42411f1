//! Protocol constants for Zarcanum transactions.
//!
//! Reference: currency_basic.h, crypto-sugar.h, zarcanum.cpp

use serde::{Deserialize, Serialize};

use crate::TypesError;

// =============================================================================
// Transaction Versions
// =============================================================================

/// Only post-Zarcanum transactions carry confidential proofs.
pub const TRANSACTION_VERSION_POST_HF4: u64 = 2;

/// Bulletproof+ aggregation limit, which bounds the outputs of one transaction.
pub const BPP_MAX_OUTPUTS: usize = 32;

// =============================================================================
// Variant Tags
// =============================================================================

/// Wire tag preceding every variant element of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum VariantTag {
    TxInGen = 0,
    DerivationHint = 11,
    PubKey = 22,
    EtcTxFlags16 = 23,
    DeriveXor = 24,
    RefById = 25,
    Uint64 = 26,
    Uint32 = 28,
    TxInZcInput = 37,
    TxOutZarcanum = 38,
    ZarcanumTxDataV1 = 39,
    ZcSig = 43,
    ZcAssetSurjectionProof = 46,
    ZcOutsRangeProof = 47,
    ZcBalanceProof = 48,
}

impl VariantTag {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for VariantTag {
    type Error = TypesError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Ok(match v {
            0 => Self::TxInGen,
            11 => Self::DerivationHint,
            22 => Self::PubKey,
            23 => Self::EtcTxFlags16,
            24 => Self::DeriveXor,
            25 => Self::RefById,
            26 => Self::Uint64,
            28 => Self::Uint32,
            37 => Self::TxInZcInput,
            38 => Self::TxOutZarcanum,
            39 => Self::ZarcanumTxDataV1,
            43 => Self::ZcSig,
            46 => Self::ZcAssetSurjectionProof,
            47 => Self::ZcOutsRangeProof,
            48 => Self::ZcBalanceProof,
            other => return Err(TypesError::UnknownTag(other)),
        })
    }
}

// =============================================================================
// Hash Domain Separators
// =============================================================================

// 31 printable characters plus a terminating NUL, exactly one 32-byte block.
pub const HDS_OUT_AMOUNT_MASK: &[u8; 32] = b"ZANO_HDS_OUT_AMOUNT_MASK_______\0";
pub const HDS_OUT_AMOUNT_BLINDING_MASK: &[u8; 32] = b"ZANO_HDS_OUT_AMOUNT_BLIND_MASK_\0";
pub const HDS_OUT_CONCEALING_POINT: &[u8; 32] = b"ZANO_HDS_OUT_CONCEALING_POINT__\0";
pub const HDS_OUT_ASSET_BLINDING_MASK: &[u8; 32] = b"ZANO_HDS_OUT_ASSET_BLIND_MASK__\0";
pub const HDS_CLSAG_GGX_LAYER_0: &[u8; 32] = b"ZANO_HDS_CLSAG_GGX_LAYER_ZERO__\0";
pub const HDS_CLSAG_GGX_LAYER_1: &[u8; 32] = b"ZANO_HDS_CLSAG_GGX_LAYER_ONE___\0";
pub const HDS_CLSAG_GGX_LAYER_2: &[u8; 32] = b"ZANO_HDS_CLSAG_GGX_LAYER_TWO___\0";
pub const HDS_CLSAG_GGX_CHALLENGE: &[u8; 32] = b"ZANO_HDS_CLSAG_GGX_CHALLENGE___\0";

/// Seed for the BGE one-out-of-many generator family.
pub const BGE_GENERATOR_SEED: &[u8] = b"Zano BGE generator";
/// Seed for the Bulletproof+ vector generators.
pub const BPP_GENERATOR_SEED: &[u8] = b"Zano BP+ generator";
/// Seed for the Bulletproof+ Fiat-Shamir transcript.
pub const BPP_TRANSCRIPT_SEED: &[u8] = b"Zano BP+ initial transcript";

// =============================================================================
// Flags
// =============================================================================

/// Destination flags (tx_destination_entry_flags).
pub mod dest_flags {
    /// The output reveals the native asset id: no asset blinding.
    pub const EXPLICIT_NATIVE_ASSET_ID: u64 = 0x0001;
    /// Reserved for asset emission outputs; carried but not interpreted here.
    pub const ASSET_OPERATION_OUTPUT: u64 = 0x0002;
    /// The amount commitment uses a zero blinding mask.
    pub const ZERO_AMOUNT_BLINDING_MASK: u64 = 0x0004;
}

/// Public address flags.
pub mod address_flags {
    /// Auditable wallets force their outputs out of mixing.
    pub const AUDITABLE: u8 = 0x01;
}

/// Output mix attribute values.
pub mod mix_attr {
    pub const RELAXED: u8 = 0;
    pub const NO_MIX: u8 = 1;
}

/// Value written into the etc_tx_flags16 extra entry.
pub const ETC_TX_FLAGS16_DEFAULT: u16 = 0;
