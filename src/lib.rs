//! # PICCE API - Authentication and Resource Management Server
//!
//! The authentication core and CRUD surface of the PICCE backend: sign-up and
//! sign-in with salted password hashes, stateless session tokens, guest
//! (passwordless) sessions, terms-of-use acceptance and role-gated CRUD for
//! users, addresses, institutions and classrooms.
//!
//! ## Overview
//!
//! The PICCE API can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `picce-server` binary
//! 2. **As a library** - Mount [`api::routes::create_router`] in your own Axum app
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use picce::{api::routes::create_router, auth::jwt::AuthService, AppState, PicceConfigManager, TursoClient};
//! use std::sync::Arc;
//!
//! let config_manager = Arc::new(PicceConfigManager::new("picce.toml")?);
//! let config = config_manager.config();
//!
//! let state = AppState {
//!     turso: Arc::new(TursoClient::new_local(&config.database.url).await?),
//!     auth_service: Arc::new(AuthService::new(config.jwt_secret()?)),
//!     config_manager,
//! };
//!
//! let app = create_router(state.clone()).with_state(state);
//! ```
//!
//! ## Request Pipeline
//!
//! Every handler runs the same fixed sequence:
//!
//! 1. Body decoded and checked against its field table ([`api::extract`]),
//!    reporting every violation at once
//! 2. Acting user resolved from the bearer token ([`auth::middleware`])
//! 3. Authorization decision ([`auth::policy`]) before any side effect
//! 4. One persistence operation ([`db::turso`])
//! 5. `{message, data}` envelope, or `{error}` on failure
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `local-db` | Local SQLite database (default) |
//! | `turso` | Remote Turso database |
//! | `swagger-ui` | Interactive OpenAPI documentation |
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`auth`] - Credential verifier, token issuer, authorization policy
//! - [`cli`] - Command-line interface
//! - [`db`] - Relational persistence (SQLite, Turso)
//! - [`types`] - Common types and error handling
//! - [`utils`] - TOML configuration with hot reload

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
#[allow(missing_docs)]
pub mod api;
/// Credential verification, session tokens and authorization.
#[allow(missing_docs)]
pub mod auth;
/// Command-line interface.
pub mod cli;
/// Database client (Turso/SQLite).
pub mod db;
/// Core types (requests, responses, errors).
#[allow(missing_docs)]
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use db::TursoClient;
pub use types::{AppError, Result};
pub use utils::toml_config::{PicceConfig, PicceConfigManager};

use crate::auth::jwt::AuthService;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML-based configuration with hot-reload support
    pub config_manager: Arc<PicceConfigManager>,
    /// Database client
    pub turso: Arc<TursoClient>,
    /// Credential verifier and token issuer
    pub auth_service: Arc<AuthService>,
}
