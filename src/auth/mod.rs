//! Authentication and Authorization
//!
//! This module provides the authentication core of the PICCE API: credential
//! verification, session token issuance and the role-based authorization table.
//!
//! # Module Structure
//!
//! - [`auth::jwt`](crate::auth::jwt) - Password hashing and session token encoding/decoding
//! - [`auth::policy`](crate::auth::policy) - `(actor, action, owner) -> Allow | Deny` decisions
//! - [`auth::middleware`](crate::auth::middleware) - Axum layers and extractors resolving the acting user
//!
//! # Security Features
//!
//! - **Password Hashing**: Uses Argon2id (memory-hard) with a per-hash random salt
//! - **Session Tokens**: HS256 signed, stateless, expiring after `auth.token_expiry` seconds
//! - **No revocation store**: logout is a client-side discard; a token stays valid until `exp`
//!
//! # Usage
//!
//! ## Token Issuance
//!
//! ```ignore
//! use picce::auth::jwt::AuthService;
//!
//! let auth = AuthService::new(config.jwt_secret()?);
//! let token = auth.issue(user.id, &user.username, config.auth.token_expiry)?;
//! let identity = auth.decode(&token)?;
//! ```
//!
//! ## Authorization
//!
//! ```ignore
//! use picce::auth::policy::{require, Action};
//!
//! async fn delete_address(AuthUser(actor): AuthUser, ...) -> Result<...> {
//!     require(Some(&actor), Action::DeleteAddress, None)?;
//!     // the persistence call only runs after the check
//! }
//! ```
//!
//! # Configuration
//!
//! Configure via `picce.toml`:
//! ```toml
//! [auth]
//! jwt_secret_env = "JWT_SECRET"  # env var holding the signing secret (>= 32 bytes)
//! token_expiry = 3600            # token validity in seconds
//! allow_sign_up = true
//! ```

/// Password hashing and session token services.
pub mod jwt;
/// Authentication middleware and extractors for protected routes.
pub mod middleware;
/// Role-based authorization table.
pub mod policy;
