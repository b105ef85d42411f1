//! Signer configuration.

use serde::{Deserialize, Serialize};
use zarcanum_crypto::bge::BGE_MAX_RING;
use zarcanum_types::constants::{BPP_MAX_OUTPUTS, TRANSACTION_VERSION_POST_HF4};

use crate::TxError;

/// Limits and switches applied by [`crate::Signer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    /// The only transaction version the signer produces.
    pub tx_version: u64,
    /// Upper bound on outputs; one range proof aggregates all of them.
    pub max_outputs: usize,
    /// Upper bound on ring members per input.
    pub max_ring_size: usize,
    /// Emit each derivation hint once.
    pub dedupe_hints: bool,
    /// Honour the `shuffle` flag of the parameters.
    pub allow_shuffle: bool,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            tx_version: TRANSACTION_VERSION_POST_HF4,
            max_outputs: BPP_MAX_OUTPUTS,
            max_ring_size: BGE_MAX_RING,
            dedupe_hints: true,
            allow_shuffle: true,
        }
    }
}

impl SignerConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, TxError> {
        serde_json::from_str(json).map_err(|e| TxError::InvalidParameters(format!("signer config: {e}")))
    }
}
