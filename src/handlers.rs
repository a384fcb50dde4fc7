//! Account HTTP Handlers
//!
//! REST API endpoints for registration and session management.

use crate::error::AccountError;
use crate::extractors::CurrentAccount;
use crate::media;
use crate::middleware;
use crate::models::*;
use crate::registration::Registration;
use crate::service::AccountService;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::{
    cookie::{Cookie, CookieJar, SameSite},
    WithRejection,
};
use std::path::PathBuf;
use std::sync::Arc;
use validator::Validate;

/// Shared account service state
pub type AccountsState = Arc<AccountService>;

/// Cookie carrying the access token
pub const ACCESS_COOKIE: &str = "accessToken";
/// Cookie carrying the refresh token
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Max multipart body for registration: 10MB
const MAX_REGISTER_BODY: usize = 10 * 1024 * 1024;

// ============================================
// Route Builder
// ============================================

/// Create account routes under `/api/v1/users`
pub fn create_routes(accounts: AccountsState) -> Router {
    // Public routes (no authentication required)
    let public = Router::new()
        .route(
            "/register",
            post(register).layer(DefaultBodyLimit::max(MAX_REGISTER_BODY)),
        )
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_access_token));

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/current-user", get(current_user))
        .route_layer(axum_middleware::from_fn_with_state(
            accounts.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .nest("/api/v1/users", public.merge(protected))
        .with_state(accounts)
}

// ============================================
// Cookies
// ============================================

fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

fn set_session_cookies(jar: CookieJar, access_token: &str, refresh_token: &str) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, access_token.to_string()))
        .add(session_cookie(REFRESH_COOKIE, refresh_token.to_string()))
}

fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"))
}

// ============================================
// Registration
// ============================================

/// POST /api/v1/users/register
///
/// Multipart form with `username`, `email`, `fullName`, `password`, an
/// `avatar` file and an optional `coverImage` file.
pub async fn register(
    State(accounts): State<AccountsState>,
    WithRejection(multipart, _): WithRejection<Multipart, AccountError>,
) -> Result<impl IntoResponse, AccountError> {
    let mut staged = Vec::new();
    let result = read_registration(&accounts, multipart, &mut staged).await;

    let result = match result {
        Ok(registration) => accounts.registrar().register(registration).await,
        Err(e) => Err(e),
    };

    // The uploader removes files it was given; this catches the rest
    for path in &staged {
        media::discard(path).await;
    }

    let account = result?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            StatusCode::CREATED,
            account,
            "User registered successfully",
        )),
    ))
}

async fn read_registration(
    accounts: &AccountService,
    mut multipart: Multipart,
    staged: &mut Vec<PathBuf>,
) -> Result<Registration, AccountError> {
    let mut registration = Registration::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AccountError::validation(e.body_text(), Vec::new()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(String::from);

        match name.as_str() {
            "avatar" | "coverImage" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AccountError::validation(e.body_text(), vec![name.clone()]))?;

                let slot = if name == "avatar" {
                    &mut registration.avatar
                } else {
                    &mut registration.cover_image
                };

                // Only the first file per field counts; empty parts mean "not sent"
                if slot.is_some() || data.is_empty() {
                    continue;
                }

                let path =
                    media::stage(accounts.upload_temp_dir(), file_name.as_deref(), &data).await?;
                staged.push(path.clone());
                *slot = Some(path);
            }
            "username" | "email" | "fullName" | "password" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AccountError::validation(e.body_text(), vec![name.clone()]))?;

                match name.as_str() {
                    "username" => registration.username = value,
                    "email" => registration.email = value,
                    "fullName" => registration.full_name = value,
                    _ => registration.password = value,
                }
            }
            _ => {}
        }
    }

    Ok(registration)
}

// ============================================
// Login / Logout
// ============================================

/// POST /api/v1/users/login
///
/// Authenticate with username or email and set both session cookies
pub async fn login(
    State(accounts): State<AccountsState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, AccountError>,
) -> Result<impl IntoResponse, AccountError> {
    req.validate()
        .map_err(|e| AccountError::validation(e.to_string(), vec!["password".to_string()]))?;

    let response = accounts
        .sessions()
        .login(&req.identifier(), &req.password)
        .await?;

    let jar = set_session_cookies(jar, &response.access_token, &response.refresh_token);

    Ok((
        jar,
        Json(ApiResponse::new(
            StatusCode::OK,
            response,
            "User logged in successfully",
        )),
    ))
}

/// POST /api/v1/users/logout
///
/// Clear the stored refresh token and both cookies
pub async fn logout(
    State(accounts): State<AccountsState>,
    CurrentAccount(account): CurrentAccount,
    jar: CookieJar,
) -> Result<impl IntoResponse, AccountError> {
    accounts.sessions().logout(account.id).await?;

    Ok((
        clear_session_cookies(jar),
        Json(ApiResponse::new(
            StatusCode::OK,
            serde_json::json!({}),
            "User logged out",
        )),
    ))
}

// ============================================
// Token Refresh
// ============================================

/// POST /api/v1/users/refresh-token
///
/// Rotate the session. The refresh token comes from the cookie, or the
/// `refreshToken` body field when no cookie is sent.
pub async fn refresh_access_token(
    State(accounts): State<AccountsState>,
    jar: CookieJar,
    body: Option<Json<RefreshTokenRequest>>,
) -> Result<Response, AccountError> {
    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| body.and_then(|Json(req)| req.refresh_token));

    match accounts.sessions().refresh(presented.as_deref()).await {
        Ok(pair) => {
            let jar = set_session_cookies(jar, &pair.access_token, &pair.refresh_token);
            Ok((
                jar,
                Json(ApiResponse::new(StatusCode::OK, pair, "Access token refreshed")),
            )
                .into_response())
        }
        Err(err @ AccountError::SessionExpired) => {
            Ok((clear_session_cookies(jar), err).into_response())
        }
        Err(err) => Err(err),
    }
}

// ============================================
// Password Management
// ============================================

/// POST /api/v1/users/change-password
///
/// Change password for the authenticated account
pub async fn change_password(
    State(accounts): State<AccountsState>,
    CurrentAccount(account): CurrentAccount,
    WithRejection(Json(req), _): WithRejection<Json<ChangePasswordRequest>, AccountError>,
) -> Result<impl IntoResponse, AccountError> {
    req.validate().map_err(|e| {
        let fields = e.field_errors().keys().map(|k| k.to_string()).collect();
        AccountError::validation(e.to_string(), fields)
    })?;

    accounts
        .sessions()
        .change_password(account.id, &req.old_password, &req.new_password)
        .await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK,
        serde_json::json!({}),
        "Password changed successfully",
    )))
}

// ============================================
// Current Account
// ============================================

/// GET /api/v1/users/current-user
pub async fn current_user(
    CurrentAccount(account): CurrentAccount,
) -> Result<impl IntoResponse, AccountError> {
    Ok(Json(ApiResponse::new(
        StatusCode::OK,
        account,
        "Current user fetched successfully",
    )))
}
