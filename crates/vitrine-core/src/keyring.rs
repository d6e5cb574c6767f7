//! The three secrets used by the session components.
//!
//! A [`KeyRing`] is built once at startup and handed to the encryption codec,
//! the session issuer and the session refresher. Tests substitute their own
//! ring instead of touching process configuration.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::KeyRingError;

/// Length of the AES-256 encryption key.
pub const ENCRYPTION_KEY_LENGTH: usize = 32;

/// Minimum length of an HMAC signing key.
pub const MIN_SIGNING_KEY_LENGTH: usize = 32;

/// Access-signing, refresh-signing and symmetric encryption keys.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyRing {
    access_signing: Vec<u8>,
    refresh_signing: Vec<u8>,
    encryption: [u8; ENCRYPTION_KEY_LENGTH],
}

impl KeyRing {
    /// Build a key ring from raw key bytes.
    ///
    /// Signing keys must be at least [`MIN_SIGNING_KEY_LENGTH`] bytes and
    /// distinct from each other; the encryption key must be exactly
    /// [`ENCRYPTION_KEY_LENGTH`] bytes.
    pub fn new(
        access_signing: &[u8],
        refresh_signing: &[u8],
        encryption: &[u8],
    ) -> Result<Self, KeyRingError> {
        check_signing_key("access-signing", access_signing)?;
        check_signing_key("refresh-signing", refresh_signing)?;
        if access_signing == refresh_signing {
            return Err(KeyRingError::IdenticalSigningKeys);
        }
        let encryption: [u8; ENCRYPTION_KEY_LENGTH] =
            encryption
                .try_into()
                .map_err(|_| KeyRingError::InvalidKey {
                    which: "encryption",
                    reason: format!(
                        "expected {ENCRYPTION_KEY_LENGTH} bytes, got {}",
                        encryption.len()
                    ),
                })?;

        Ok(Self {
            access_signing: access_signing.to_vec(),
            refresh_signing: refresh_signing.to_vec(),
            encryption,
        })
    }

    /// Build a key ring from base64 (standard alphabet) encoded keys.
    pub fn from_base64(
        access_signing: &str,
        refresh_signing: &str,
        encryption: &str,
    ) -> Result<Self, KeyRingError> {
        let mut access = decode_key("access-signing", access_signing)?;
        let mut refresh = decode_key("refresh-signing", refresh_signing)?;
        let mut enc = decode_key("encryption", encryption)?;
        let ring = Self::new(&access, &refresh, &enc);
        access.zeroize();
        refresh.zeroize();
        enc.zeroize();
        ring
    }

    /// Generate a fresh random key ring. Sessions signed with it do not
    /// survive a restart.
    pub fn generate() -> Result<Self, KeyRingError> {
        let mut access = [0u8; MIN_SIGNING_KEY_LENGTH * 2];
        let mut refresh = [0u8; MIN_SIGNING_KEY_LENGTH * 2];
        let mut enc = [0u8; ENCRYPTION_KEY_LENGTH];
        for buf in [&mut access[..], &mut refresh[..], &mut enc[..]] {
            getrandom::getrandom(buf).map_err(|e| KeyRingError::Rng(e.to_string()))?;
        }
        let ring = Self::new(&access, &refresh, &enc);
        access.zeroize();
        refresh.zeroize();
        enc.zeroize();
        ring
    }

    /// Key used to sign access tokens.
    pub fn access_signing_key(&self) -> &[u8] {
        &self.access_signing
    }

    /// Key used to sign refresh tokens.
    pub fn refresh_signing_key(&self) -> &[u8] {
        &self.refresh_signing
    }

    /// AES-256 key used by the encryption codec.
    pub fn encryption_key(&self) -> &[u8; ENCRYPTION_KEY_LENGTH] {
        &self.encryption
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRing").finish_non_exhaustive()
    }
}

fn check_signing_key(which: &'static str, key: &[u8]) -> Result<(), KeyRingError> {
    if key.len() < MIN_SIGNING_KEY_LENGTH {
        return Err(KeyRingError::InvalidKey {
            which,
            reason: format!(
                "expected at least {MIN_SIGNING_KEY_LENGTH} bytes, got {}",
                key.len()
            ),
        });
    }
    Ok(())
}

fn decode_key(which: &'static str, encoded: &str) -> Result<Vec<u8>, KeyRingError> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| KeyRingError::InvalidKey {
            which,
            reason: e.to_string(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_valid_keys() {
        let ring = KeyRing::new(&[1; 32], &[2; 32], &[3; 32]).unwrap();
        assert_eq!(ring.access_signing_key(), &[1; 32]);
        assert_eq!(ring.refresh_signing_key(), &[2; 32]);
        assert_eq!(ring.encryption_key(), &[3; 32]);
    }

    #[test]
    fn test_short_signing_key_rejected() {
        let err = KeyRing::new(&[1; 8], &[2; 32], &[3; 32]).unwrap_err();
        assert!(matches!(
            err,
            KeyRingError::InvalidKey {
                which: "access-signing",
                ..
            }
        ));
    }

    #[test]
    fn test_identical_signing_keys_rejected() {
        let err = KeyRing::new(&[1; 32], &[1; 32], &[3; 32]).unwrap_err();
        assert_eq!(err, KeyRingError::IdenticalSigningKeys);
    }

    #[test]
    fn test_wrong_encryption_key_length_rejected() {
        let err = KeyRing::new(&[1; 32], &[2; 32], &[3; 16]).unwrap_err();
        assert!(matches!(
            err,
            KeyRingError::InvalidKey {
                which: "encryption",
                ..
            }
        ));
    }

    #[test]
    fn test_from_base64() {
        let access = STANDARD.encode([7u8; 48]);
        let refresh = STANDARD.encode([8u8; 48]);
        let enc = STANDARD.encode([9u8; 32]);
        let ring = KeyRing::from_base64(&access, &refresh, &enc).unwrap();
        assert_eq!(ring.encryption_key(), &[9; 32]);
    }

    #[test]
    fn test_from_base64_rejects_garbage() {
        let err = KeyRing::from_base64("!!", "!!", "!!").unwrap_err();
        assert!(matches!(err, KeyRingError::InvalidKey { .. }));
    }

    #[test]
    fn test_generate_produces_distinct_keys() {
        let a = KeyRing::generate().unwrap();
        let b = KeyRing::generate().unwrap();
        assert_ne!(a.access_signing_key(), a.refresh_signing_key());
        assert_ne!(a.encryption_key(), b.encryption_key());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let ring = KeyRing::new(&[1; 32], &[2; 32], &[3; 32]).unwrap();
        assert_eq!(format!("{ring:?}"), "KeyRing { .. }");
    }
}
