//! Authorization Guard
//!
//! Validates the access token on protected routes and attaches the resolved
//! account to the request for the [`CurrentAccount`](crate::extractors::CurrentAccount)
//! extractor.

use crate::error::AccountError;
use crate::extractors::CurrentAccount;
use crate::handlers::{AccountsState, ACCESS_COOKIE};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

/// Take the access token from the cookie, falling back to the Authorization header
pub fn access_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|h| h.trim_start_matches("Bearer ").trim())
        .filter(|t| !t.is_empty())
        .map(String::from)
}

/// Require authenticated account
pub async fn require_auth(
    State(accounts): State<AccountsState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AccountError> {
    let token = access_token(&jar, req.headers()).ok_or(AccountError::Unauthorized)?;

    let account = accounts.authorize(&token).await?;

    req.extensions_mut().insert(CurrentAccount(account));

    Ok(next.run(req).await)
}
