//! Wallet key material used by the signer.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use zarcanum_crypto::keccak256;
use zarcanum_crypto::keys::secret_to_public;
use zarcanum_types::constants::address_flags;
use zarcanum_types::{AccountPublicAddress, Hash32};

use crate::TxError;

/// Spend and view key pairs of the signing wallet.
#[derive(Clone)]
pub struct AccountKeys {
    pub spend_secret: Scalar,
    pub spend_public: EdwardsPoint,
    pub view_secret: Scalar,
    pub view_public: EdwardsPoint,
    pub flags: u8,
}

impl AccountKeys {
    pub fn new(spend_secret: Scalar, view_secret: Scalar, flags: u8) -> Self {
        Self {
            spend_public: secret_to_public(&spend_secret),
            view_public: secret_to_public(&view_secret),
            spend_secret,
            view_secret,
            flags,
        }
    }

    /// Load a canonical spend secret and derive the view secret from it as
    /// keccak256(spend) reduced mod l. View keys are not clamped.
    pub fn from_spend_secret(spend: &[u8; 32], flags: u8) -> Result<Self, TxError> {
        let spend_secret = Option::<Scalar>::from(Scalar::from_canonical_bytes(*spend))
            .ok_or_else(|| TxError::InvalidParameters("spend secret is not canonical".into()))?;
        let view_secret = Scalar::from_bytes_mod_order(keccak256(spend));
        Ok(Self::new(spend_secret, view_secret, flags))
    }

    pub fn is_auditable(&self) -> bool {
        self.flags & address_flags::AUDITABLE != 0
    }

    pub fn public_address(&self) -> AccountPublicAddress {
        AccountPublicAddress {
            spend_public_key: Hash32(self.spend_public.compress().to_bytes()),
            view_public_key: Hash32(self.view_public.compress().to_bytes()),
            flags: self.flags,
        }
    }
}

// Secrets stay out of debug output.
impl std::fmt::Debug for AccountKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountKeys")
            .field("spend_public", &hex::encode(self.spend_public.compress().as_bytes()))
            .field("view_public", &hex::encode(self.view_public.compress().as_bytes()))
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zarcanum_crypto::hash_to_scalar;

    #[test]
    fn test_view_key_from_spend() {
        let spend = hash_to_scalar(&[b"spend secret"]);
        let keys = AccountKeys::from_spend_secret(spend.as_bytes(), 0).unwrap();
        assert_eq!(keys.spend_secret, spend);
        assert_eq!(keys.view_secret, hash_to_scalar(&[spend.as_bytes()]));
        assert_eq!(keys.view_public, secret_to_public(&keys.view_secret));
        assert!(!keys.is_auditable());
    }

    #[test]
    fn test_non_canonical_spend_rejected() {
        let err = AccountKeys::from_spend_secret(&[0xff; 32], 0).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidParameters);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let keys = AccountKeys::new(hash_to_scalar(&[b"s"]), hash_to_scalar(&[b"v"]), 1);
        let dbg = format!("{keys:?}");
        assert!(!dbg.contains(&hex::encode(keys.spend_secret.as_bytes())));
        assert!(keys.public_address().is_auditable());
    }
}
