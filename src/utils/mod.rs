//! Configuration utilities.
//!
//! - [`toml_config`] - `picce.toml` loading, validation and hot reload

/// TOML-based server configuration with hot reload.
pub mod toml_config;
