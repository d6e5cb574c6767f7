//! HS256 token signing and verification.
//!
//! Expiry is checked against the injected [`Clock`] instead of by
//! `jsonwebtoken`, which reads the system time. A token is valid strictly
//! before its `exp`.

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use vitrine_core::{Clock, KeyRing, Principal, PrincipalId, RoleSet, TokenError};
use vitrine_crypto::EncryptionCodec;

use crate::claims::{AccessClaims, Expiring, RefreshClaims};
use crate::error::Result;
use crate::settings::SessionSettings;

struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenSigner {
    fn new(secret: &[u8], issuer: Option<&str>, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            clock,
        }
    }

    fn now(&self) -> i64 {
        self.clock.now()
    }

    fn sign<C: Serialize>(&self, claims: &C) -> std::result::Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn verify<C: DeserializeOwned + Expiring>(&self, token: &str) -> std::result::Result<C, TokenError> {
        let data = decode::<C>(token, &self.decoding, &self.validation).map_err(classify)?;
        if data.claims.expires_at() <= self.now() {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

fn classify(error: jsonwebtoken::errors::Error) -> TokenError {
    match error.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::SignatureInvalid,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed(error.to_string()),
    }
}

fn lifetime_secs(ttl: std::time::Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}

/// Mints and verifies access tokens with the access-signing key.
pub struct AccessTokenCodec {
    signer: TokenSigner,
    issuer: String,
    ttl: i64,
}

impl AccessTokenCodec {
    /// Build a codec from the key ring's access-signing key.
    pub fn new(keys: &KeyRing, settings: &SessionSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            signer: TokenSigner::new(keys.access_signing_key(), Some(settings.issuer()), clock),
            issuer: settings.issuer().to_string(),
            ttl: lifetime_secs(settings.access_ttl()),
        }
    }

    /// Mint a token for `subject` with a fresh expiry and token id.
    pub fn mint(
        &self,
        subject: &PrincipalId,
        roles: &RoleSet,
    ) -> std::result::Result<(String, AccessClaims), TokenError> {
        let now = self.signer.now();
        let claims = AccessClaims {
            sub: subject.clone(),
            iss: self.issuer.clone(),
            roles: roles.clone(),
            iat: now,
            exp: now.saturating_add(self.ttl),
            jti: Some(Uuid::new_v4().to_string()),
        };
        let token = self.signer.sign(&claims)?;
        Ok((token, claims))
    }

    /// Verify signature, issuer and expiry, returning the decoded claims.
    pub fn verify(&self, token: &str) -> std::result::Result<AccessClaims, TokenError> {
        self.signer.verify(token)
    }
}

/// Mints and opens refresh tokens: signed with the refresh-signing key,
/// then encrypted.
pub struct RefreshTokenCodec {
    signer: TokenSigner,
    cipher: EncryptionCodec,
    ttl: i64,
}

impl RefreshTokenCodec {
    /// Build a codec from the key ring's refresh-signing and encryption keys.
    pub fn new(keys: &KeyRing, settings: &SessionSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            signer: TokenSigner::new(keys.refresh_signing_key(), None, clock),
            cipher: EncryptionCodec::new(keys),
            ttl: lifetime_secs(settings.refresh_ttl()),
        }
    }

    /// Mint, sign and encrypt a refresh token for `principal`.
    pub fn seal(&self, principal: &Principal) -> Result<String> {
        let now = self.signer.now();
        let claims = RefreshClaims {
            sub: principal.id.clone(),
            name: principal.display_name.clone(),
            roles: principal.roles.clone(),
            iat: now,
            exp: now.saturating_add(self.ttl),
        };
        let signed = self.signer.sign(&claims)?;
        Ok(self.cipher.encrypt_to_string(&signed)?)
    }

    /// Decrypt and verify a sealed refresh token.
    pub fn open(&self, sealed: &str) -> Result<RefreshClaims> {
        let signed = self.cipher.decrypt_from_str(sealed)?;
        Ok(self.signer.verify(&signed)?)
    }
}
