//! Token Issuer
//!
//! Signs and verifies access and refresh JWTs. The two token kinds use
//! independent secrets and lifetimes, so neither can stand in for the other.

use crate::config::AccountsConfig;
use crate::error::AccountError;
use crate::models::{Account, AccessTokenClaims, RefreshTokenClaims};

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Token verification failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("JWT validation failed: {:?}", err);
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::InvalidSignature,
        }
    }
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_secs: i64,
}

impl SigningKeys {
    fn new(secret: &str, lifetime_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime_secs,
        }
    }

    /// Expiry timestamp for a token issued at `iat`
    fn expires_at(&self, iat: i64) -> Result<i64, AccountError> {
        iat.checked_add(self.lifetime_secs)
            .ok_or_else(|| AccountError::Internal("Token lifetime out of range".to_string()))
    }
}

/// Issues and verifies signed, time-bound session tokens
pub struct TokenIssuer {
    access: SigningKeys,
    refresh: SigningKeys,
    validation: Validation,
}

impl TokenIssuer {
    /// Create an issuer from the service configuration
    pub fn new(config: &AccountsConfig) -> Self {
        Self::from_secrets(
            &config.access_token_secret,
            config.access_token_expiry,
            &config.refresh_token_secret,
            config.refresh_token_expiry,
        )
    }

    pub fn from_secrets(
        access_secret: &str,
        access_expiry_secs: i64,
        refresh_secret: &str,
        refresh_expiry_secs: i64,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            access: SigningKeys::new(access_secret, access_expiry_secs),
            refresh: SigningKeys::new(refresh_secret, refresh_expiry_secs),
            validation,
        }
    }

    /// Access token lifetime in seconds
    pub fn access_lifetime_secs(&self) -> i64 {
        self.access.lifetime_secs
    }

    /// Refresh token lifetime in seconds
    pub fn refresh_lifetime_secs(&self) -> i64 {
        self.refresh.lifetime_secs
    }

    /// Generate an access token carrying the account's identity
    pub fn issue_access(&self, account: &Account) -> Result<String, AccountError> {
        let iat = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            sub: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            full_name: account.full_name.clone(),
            iat,
            exp: self.access.expires_at(iat)?,
            jti: Uuid::new_v4(),
        };

        Ok(encode(&Header::default(), &claims, &self.access.encoding)?)
    }

    /// Generate a refresh token carrying only the account id
    pub fn issue_refresh(&self, account_id: Uuid) -> Result<String, AccountError> {
        let iat = Utc::now().timestamp();
        let claims = RefreshTokenClaims {
            sub: account_id,
            iat,
            exp: self.refresh.expires_at(iat)?,
            jti: Uuid::new_v4(),
        };

        Ok(encode(&Header::default(), &claims, &self.refresh.encoding)?)
    }

    /// Validate an access token
    pub fn verify_access(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        self.verify(token, &self.access.decoding)
    }

    /// Validate a refresh token
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshTokenClaims, TokenError> {
        self.verify(token, &self.refresh.decoding)
    }

    fn verify<C: DeserializeOwned>(&self, token: &str, key: &DecodingKey) -> Result<C, TokenError> {
        Ok(decode::<C>(token, key, &self.validation)?.claims)
    }
}
