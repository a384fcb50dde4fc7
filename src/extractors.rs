//! Authentication Extractors

use crate::error::AccountError;
use crate::models::AccountProjection;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Account resolved by the authorization guard
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub AccountProjection);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentAccount
where
    S: Send + Sync,
{
    type Rejection = AccountError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentAccount>()
            .cloned()
            .ok_or(AccountError::Unauthorized)
    }
}
