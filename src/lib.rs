//! RustPress Accounts
//!
//! User account service for RustPress providing:
//! - Registration with avatar and cover image upload
//! - Argon2id password hashing
//! - JWT access and refresh tokens with independent secrets
//! - Single-session refresh token rotation
//! - Cookie or bearer header request authorization
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `ACCESS_TOKEN_SECRET` - Secret for signing access tokens (required, min 32 chars)
//! - `ACCESS_TOKEN_EXPIRY` - Access token lifetime, e.g. `900` or `15m` (default: 15m)
//! - `REFRESH_TOKEN_SECRET` - Secret for signing refresh tokens (required, min 32 chars)
//! - `REFRESH_TOKEN_EXPIRY` - Refresh token lifetime (default: 10d)
//! - `DATABASE_URL` - PostgreSQL connection string
//! - `MEDIA_ROOT` / `MEDIA_BASE_URL` - Where uploaded media is stored and served
//! - `UPLOAD_TEMP_DIR` - Staging directory for multipart uploads
//!
//! # Usage
//!
//! ```rust,ignore
//! use rustpress_accounts::{create_routes, AccountService, AccountsConfig};
//!
//! let config = AccountsConfig::from_env()?;
//! config.validate()?;
//!
//! let store = Arc::new(PgCredentialStore::new(pool));
//! let uploader = Arc::new(DiskMediaUploader::new(&config.media_root, &config.media_base_url));
//! let accounts = Arc::new(AccountService::new(&config, store, uploader));
//!
//! let app = create_routes(accounts);
//! ```

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod media;
pub mod middleware;
pub mod models;
pub mod password;
pub mod registration;
pub mod service;
pub mod session;
pub mod store;
pub mod tokens;

// Re-export commonly used types
pub use config::AccountsConfig;
pub use error::AccountError;
pub use extractors::CurrentAccount;
pub use handlers::{create_routes, AccountsState};
pub use media::{DiskMediaUploader, MediaUploader, UploadedMedia};
pub use models::*;
pub use password::PasswordHasher;
pub use registration::{Registrar, Registration};
pub use service::AccountService;
pub use session::SessionManager;
pub use store::{CredentialStore, MemoryCredentialStore, PgCredentialStore};
pub use tokens::{TokenError, TokenIssuer};
