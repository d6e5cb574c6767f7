//! Symmetric encryption codec.
//!
//! Wire format (version 1):
//! `[1 byte: version=1][12 bytes: IV][N bytes: ciphertext + 16-byte tag]`
//!
//! A fresh random IV is drawn for every call, so encrypting the same
//! plaintext twice yields different ciphertexts. Text transport (cookies,
//! keyed-store rows) uses unpadded base64url over the same bytes.

#![forbid(unsafe_code)]

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use vitrine_core::{EncryptionError, KeyRing};

/// Current wire format version.
pub const CURRENT_VERSION: u8 = 1;

/// AES-GCM IV length in bytes.
pub const IV_LENGTH: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LENGTH: usize = 16;

/// Encrypts and decrypts opaque byte strings with the key ring's
/// encryption key.
#[derive(Clone)]
pub struct EncryptionCodec {
    cipher: Aes256Gcm,
}

impl EncryptionCodec {
    /// Build a codec from the key ring's encryption key.
    pub fn new(keys: &KeyRing) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(keys.encryption_key())),
        }
    }

    /// Encrypt `plaintext`, returning `version || iv || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let iv = generate_iv()?;
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&iv), plaintext)
            .map_err(|e| EncryptionError::Encrypt(e.to_string()))?;

        let mut framed = Vec::with_capacity(1 + IV_LENGTH + ciphertext.len());
        framed.push(CURRENT_VERSION);
        framed.extend_from_slice(&iv);
        framed.extend_from_slice(&ciphertext);
        Ok(framed)
    }

    /// Split the framing and decrypt.
    ///
    /// Any framing or authentication failure is reported as
    /// [`EncryptionError::Malformed`] without saying which check failed.
    pub fn decrypt(&self, framed: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        if framed.len() < 1 + IV_LENGTH + TAG_LENGTH || framed[0] != CURRENT_VERSION {
            return Err(EncryptionError::Malformed);
        }
        let (iv, ciphertext) = framed[1..].split_at(IV_LENGTH);
        self.cipher
            .decrypt(Nonce::from_slice(iv), ciphertext)
            .map_err(|_| EncryptionError::Malformed)
    }

    /// Encrypt text and encode the result as unpadded base64url.
    pub fn encrypt_to_string(&self, plaintext: &str) -> Result<String, EncryptionError> {
        Ok(URL_SAFE_NO_PAD.encode(self.encrypt(plaintext.as_bytes())?))
    }

    /// Reverse [`encrypt_to_string`](Self::encrypt_to_string).
    pub fn decrypt_from_str(&self, encoded: &str) -> Result<String, EncryptionError> {
        let framed = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|_| EncryptionError::Malformed)?;
        let plaintext = self.decrypt(&framed)?;
        String::from_utf8(plaintext).map_err(|_| EncryptionError::Malformed)
    }
}

impl std::fmt::Debug for EncryptionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionCodec").finish_non_exhaustive()
    }
}

/// Draw a random IV from the operating system RNG.
fn generate_iv() -> Result<[u8; IV_LENGTH], EncryptionError> {
    let mut iv = [0u8; IV_LENGTH];
    getrandom::getrandom(&mut iv).map_err(|e| EncryptionError::Rng(e.to_string()))?;
    Ok(iv)
}
