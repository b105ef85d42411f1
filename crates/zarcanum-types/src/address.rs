//! Public account address (spend key, view key, flags).

use serde::{Deserialize, Serialize};

use crate::constants::address_flags;
use crate::Hash32;

/// Public part of an account, as carried inside a prepared destination.
///
/// Text encoding (base58 with prefix and checksum) is handled by the wallet
/// layer; here the address is already decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPublicAddress {
    pub spend_public_key: Hash32,
    pub view_public_key: Hash32,
    #[serde(default)]
    pub flags: u8,
}

impl AccountPublicAddress {
    pub fn new(spend_public_key: Hash32, view_public_key: Hash32) -> Self {
        Self { spend_public_key, view_public_key, flags: 0 }
    }

    pub fn is_auditable(&self) -> bool {
        self.flags & address_flags::AUDITABLE != 0
    }
}
