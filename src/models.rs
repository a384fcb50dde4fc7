//! Account Models
//!
//! Data structures for account records, requests, responses and JWT claims.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// ============================================
// Database Entities
// ============================================

/// Account record as persisted by the credential store
///
/// Deliberately not `Serialize`: clients only ever see [`AccountProjection`].
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub password_hash: String,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Whether the account currently has a live session
    pub fn has_session(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Whether `presented` is exactly the stored refresh token
    pub fn holds_refresh_token(&self, presented: &str) -> bool {
        self.has_session() && self.refresh_token.as_deref() == Some(presented)
    }
}

/// Fields for a new account; the password is plaintext and hashed by the store
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub password: String,
}

/// Partial update of an account
///
/// `password` is plaintext. The store rehashes only when it is set.
/// `refresh_token` uses `Some(None)` to clear the session.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub full_name: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub password: Option<String>,
    pub refresh_token: Option<Option<String>>,
}

impl AccountPatch {
    pub fn password(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            ..Default::default()
        }
    }

    pub fn refresh_token(token: impl Into<String>) -> Self {
        Self {
            refresh_token: Some(Some(token.into())),
            ..Default::default()
        }
    }

    pub fn clear_session() -> Self {
        Self {
            refresh_token: Some(None),
            ..Default::default()
        }
    }
}

/// Patch after password hashing, as applied by store backends
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub full_name: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub password_hash: Option<String>,
    pub refresh_token: Option<Option<String>>,
}

impl AccountChanges {
    /// Apply the changes onto an in-memory record
    pub fn apply(self, account: &mut Account) {
        if let Some(full_name) = self.full_name {
            account.full_name = full_name;
        }
        if let Some(avatar) = self.avatar {
            account.avatar = avatar;
        }
        if let Some(cover_image) = self.cover_image {
            account.cover_image = cover_image;
        }
        if let Some(password_hash) = self.password_hash {
            account.password_hash = password_hash;
        }
        if let Some(refresh_token) = self.refresh_token {
            account.refresh_token = refresh_token;
        }
        account.updated_at = Utc::now();
    }
}

/// Lookup key matching an account by username or email
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identifier {
    pub username: Option<String>,
    pub email: Option<String>,
}

impl Identifier {
    /// Match either field; blank values are ignored
    pub fn new(username: Option<&str>, email: Option<&str>) -> Self {
        Self {
            username: username.map(normalize).filter(|v| !v.is_empty()),
            email: email.map(normalize).filter(|v| !v.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none()
    }

    /// Whether the account matches any provided field
    pub fn matches(&self, account: &Account) -> bool {
        self.username.as_deref() == Some(account.username.as_str())
            || self.email.as_deref() == Some(account.email.as_str())
    }
}

/// Case-normalize an identity field
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

// ============================================
// Request DTOs
// ============================================

/// Login request; either `username` or `email` identifies the account
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl LoginRequest {
    pub fn identifier(&self) -> Identifier {
        Identifier::new(self.username.as_deref(), self.email.as_deref())
    }
}

/// Refresh request body; the cookie takes precedence when present
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Change password request (for authenticated users)
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Old password is required"))]
    pub old_password: String,

    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

// ============================================
// Response DTOs
// ============================================

/// Public account data without password hash or refresh token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProjection {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountProjection {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            full_name: account.full_name,
            avatar: account.avatar,
            cover_image: account.cover_image,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

impl From<&Account> for AccountProjection {
    fn from(account: &Account) -> Self {
        Self::from(account.clone())
    }
}

/// Freshly issued access/refresh pair
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Successful login
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: AccountProjection,
    pub access_token: String,
    pub refresh_token: String,
}

/// Standard response envelope
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: Option<T>,
    pub message: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl<T> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data: Some(data),
            message: message.into(),
            success: status.as_u16() < 400,
            errors: Vec::new(),
        }
    }

    pub fn failure(status: StatusCode, message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data: None,
            message: message.into(),
            success: false,
            errors,
        }
    }
}

// ============================================
// JWT Claims
// ============================================

/// JWT claims for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (account ID)
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// JWT ID (unique identifier)
    pub jti: Uuid,
}

/// JWT claims for refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// Subject (account ID)
    pub sub: Uuid,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// JWT ID; keeps same-second rotations distinct
    pub jti: Uuid,
}
