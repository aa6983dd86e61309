//! TOML-based configuration for the PICCE API
//!
//! This module provides declarative configuration for the HTTP server,
//! session tokens and persistence via a TOML file (`picce.toml`).
//! Secrets are never stored in the file; it names the environment variables
//! that hold them.
//!
//! # Hot Reloading
//!
//! Configuration changes are automatically detected and applied at runtime.
//! Use `PicceConfigManager` for thread-safe access to the current configuration.

use arc_swap::ArcSwap;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Minimum accepted length, in bytes, of the token signing secret.
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted session token lifetime: 365 days, in seconds.
pub const MAX_TOKEN_EXPIRY: i64 = 365 * 24 * 60 * 60;

/// Root configuration structure loaded from picce.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PicceConfig {
    /// HTTP listener and logging
    #[serde(default)]
    pub server: ServerConfig,

    /// Session tokens and sign-up
    #[serde(default)]
    pub auth: AuthConfig,

    /// Persistence backend
    #[serde(default)]
    pub database: DatabaseConfig,
}

// ============= Server Configuration =============

/// `[server]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Default tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text
    #[serde(default)]
    pub log_json: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

// ============= Authentication Configuration =============

/// `[auth]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable name containing the token signing secret
    #[serde(default = "default_jwt_secret_env")]
    pub jwt_secret_env: String,

    /// Session token lifetime in seconds
    #[serde(default = "default_token_expiry")]
    pub token_expiry: i64,

    /// Whether `POST /auth/signUp` accepts new accounts
    #[serde(default = "default_true")]
    pub allow_sign_up: bool,
}

fn default_jwt_secret_env() -> String {
    "JWT_SECRET".to_string()
}

fn default_token_expiry() -> i64 {
    3600
}

fn default_true() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret_env: default_jwt_secret_env(),
            token_expiry: default_token_expiry(),
            allow_sign_up: true,
        }
    }
}

// ============= Database Configuration =============

/// `[database]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Local database path, or `:memory:` for an ephemeral database
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Environment variable for Turso URL (optional cloud config)
    pub turso_url_env: Option<String>,

    /// Environment variable for Turso auth token
    pub turso_token_env: Option<String>,
}

fn default_database_url() -> String {
    "./data/picce.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            turso_url_env: None,
            turso_token_env: None,
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file does not exist
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The config file exists but could not be read
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The config file is not valid TOML for [`PicceConfig`]
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A referenced secret is not present in the environment
    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    /// The file watcher could not be started
    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),
}

impl PicceConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: PicceConfig = toml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration, including the secrets it references
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.token_expiry <= 0 || self.auth.token_expiry > MAX_TOKEN_EXPIRY {
            return Err(ConfigError::ValidationError(format!(
                "auth.token_expiry must be between 1 and {} seconds, got {}",
                MAX_TOKEN_EXPIRY, self.auth.token_expiry
            )));
        }

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be non-zero".to_string(),
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "database.url must not be empty".to_string(),
            ));
        }

        let secret = self.jwt_secret()?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::ValidationError(format!(
                "{} must be at least {} bytes long",
                self.auth.jwt_secret_env, MIN_SECRET_LEN
            )));
        }

        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok()
    }

    /// Get the token signing secret from the environment
    pub fn jwt_secret(&self) -> Result<String, ConfigError> {
        self.resolve_env(&self.auth.jwt_secret_env)
            .ok_or_else(|| ConfigError::MissingEnvVar(self.auth.jwt_secret_env.clone()))
    }

    /// Remote database credentials, when both env vars are configured and set
    pub fn turso_credentials(&self) -> Option<(String, String)> {
        let url = self.resolve_env(self.database.turso_url_env.as_deref()?)?;
        let token = self.resolve_env(self.database.turso_token_env.as_deref()?)?;
        Some((url, token))
    }
}

// ============= Hot Reloading Configuration Manager =============

/// Thread-safe configuration manager with hot reloading support
pub struct PicceConfigManager {
    config: Arc<ArcSwap<PicceConfig>>,
    config_path: PathBuf,
    watcher: RwLock<Option<RecommendedWatcher>>,
    reload_tx: Option<mpsc::UnboundedSender<()>>,
}

impl PicceConfigManager {
    /// Create a new configuration manager and load the initial config
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        // Convert to absolute path for reliable file watching
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(ConfigError::ReadError)?
                .join(path)
        };

        let config = PicceConfig::load(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: path,
            watcher: RwLock::new(None),
            reload_tx: None,
        })
    }

    /// Create a config manager directly from a config (useful for testing)
    /// This won't have file watching capabilities.
    pub fn from_config(config: PicceConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: PathBuf::from("test-config.toml"),
            watcher: RwLock::new(None),
            reload_tx: None,
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<PicceConfig> {
        self.config.load_full()
    }

    /// Absolute path of the watched config file
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Manually reload the configuration from disk
    pub fn reload(&self) -> Result<(), ConfigError> {
        info!("Reloading configuration from {:?}", self.config_path);

        let new_config = PicceConfig::load(&self.config_path)?;
        self.config.store(Arc::new(new_config));

        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Start watching for configuration file changes
    ///
    /// The signing secret is read once at startup; a reload changes token
    /// lifetime and the sign-up toggle but not the key already in use.
    pub fn start_watching(&mut self) -> Result<(), ConfigError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        self.reload_tx = Some(tx.clone());

        let config_path = self.config_path.clone();
        let config_arc = Arc::clone(&self.config);
        let file_name = self.config_path.file_name().map(|n| n.to_os_string());

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let touches_config = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);

                    if touches_config && (event.kind.is_modify() || event.kind.is_create()) {
                        // Debounced in the receiver
                        let _ = tx.send(());
                    }
                }
                Err(e) => {
                    error!("Config watcher error: {:?}", e);
                }
            }
        })?;

        // Watch the config file's parent directory
        if let Some(parent) = self.config_path.parent() {
            watcher.watch(parent, RecursiveMode::NonRecursive)?;
        }

        *self.watcher.write() = Some(watcher);

        tokio::spawn(async move {
            let mut last_reload = std::time::Instant::now();
            let debounce_duration = Duration::from_millis(500);

            while rx.recv().await.is_some() {
                if last_reload.elapsed() < debounce_duration {
                    continue;
                }

                // Wait a bit for file write to complete
                tokio::time::sleep(Duration::from_millis(100)).await;

                match PicceConfig::load(&config_path) {
                    Ok(new_config) => {
                        config_arc.store(Arc::new(new_config));
                        info!("Configuration hot-reloaded successfully");
                        last_reload = std::time::Instant::now();
                    }
                    Err(e) => {
                        warn!(
                            "Failed to hot-reload config: {}. Keeping previous config.",
                            e
                        );
                    }
                }
            }
        });

        info!("Configuration hot-reload watcher started");
        Ok(())
    }

    /// Stop watching for configuration changes
    pub fn stop_watching(&self) {
        *self.watcher.write() = None;
        info!("Configuration hot-reload watcher stopped");
    }
}

impl Clone for PicceConfigManager {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            config_path: self.config_path.clone(),
            watcher: RwLock::new(None), // Watcher is not cloned
            reload_tx: self.reload_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SECRET: &str = "a-test-signing-secret-of-at-least-32-bytes";

    fn config_with_secret_env(env: &str) -> PicceConfig {
        let mut config = PicceConfig::default();
        config.auth.jwt_secret_env = env.to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config: PicceConfig = toml::from_str("").unwrap();

        // Server defaults
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.log_level, "info");
        assert!(!config.server.log_json);

        // Auth defaults
        assert_eq!(config.auth.jwt_secret_env, "JWT_SECRET");
        assert_eq!(config.auth.token_expiry, 3600);
        assert!(config.auth.allow_sign_up);

        // Database defaults
        assert_eq!(config.database.url, "./data/picce.db");
        assert!(config.database.turso_url_env.is_none());
    }

    #[test]
    fn test_parse_config() {
        let content = r#"
[server]
host = "0.0.0.0"
port = 8080
log_json = true

[auth]
jwt_secret_env = "PICCE_SECRET"
token_expiry = 900
allow_sign_up = false

[database]
url = ":memory:"
"#;

        let config: PicceConfig = toml::from_str(content).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert!(config.server.log_json);
        assert_eq!(config.auth.jwt_secret_env, "PICCE_SECRET");
        assert_eq!(config.auth.token_expiry, 900);
        assert!(!config.auth.allow_sign_up);
        assert_eq!(config.database.url, ":memory:");
    }

    #[test]
    fn test_validation_missing_secret() {
        let config = config_with_secret_env("PICCE_TEST_SECRET_UNSET");
        std::env::remove_var("PICCE_TEST_SECRET_UNSET");

        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(name)) if name == "PICCE_TEST_SECRET_UNSET"));
    }

    #[test]
    fn test_validation_short_secret() {
        std::env::set_var("PICCE_TEST_SECRET_SHORT", "too-short");
        let config = config_with_secret_env("PICCE_TEST_SECRET_SHORT");

        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validation_non_positive_expiry() {
        std::env::set_var("PICCE_TEST_SECRET_EXPIRY", SECRET);
        let mut config = config_with_secret_env("PICCE_TEST_SECRET_EXPIRY");
        config.auth.token_expiry = 0;

        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::ValidationError(msg)) if msg.contains("token_expiry")));
    }

    #[test]
    fn test_validation_oversized_expiry() {
        std::env::set_var("PICCE_TEST_SECRET_HUGE_EXPIRY", SECRET);
        let mut config = config_with_secret_env("PICCE_TEST_SECRET_HUGE_EXPIRY");

        config.auth.token_expiry = MAX_TOKEN_EXPIRY;
        assert!(config.validate().is_ok());

        config.auth.token_expiry = i64::MAX / 100;
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::ValidationError(msg)) if msg.contains("token_expiry")));
    }

    #[test]
    fn test_validation_ok() {
        std::env::set_var("PICCE_TEST_SECRET_OK", SECRET);
        let config = config_with_secret_env("PICCE_TEST_SECRET_OK");

        assert!(config.validate().is_ok());
        assert_eq!(config.jwt_secret().unwrap(), SECRET);
    }

    #[test]
    fn test_load_missing_file() {
        let result = PicceConfig::load("/nonexistent/picce.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_and_reload_from_file() {
        std::env::set_var("PICCE_TEST_SECRET_FILE", SECRET);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("picce.toml");
        fs::write(
            &path,
            "[auth]\njwt_secret_env = \"PICCE_TEST_SECRET_FILE\"\ntoken_expiry = 60\n",
        )
        .unwrap();

        let manager = PicceConfigManager::new(&path).unwrap();
        assert_eq!(manager.config().auth.token_expiry, 60);

        let mut file = fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .unwrap();
        writeln!(
            file,
            "[auth]\njwt_secret_env = \"PICCE_TEST_SECRET_FILE\"\ntoken_expiry = 120"
        )
        .unwrap();
        drop(file);

        manager.reload().unwrap();
        assert_eq!(manager.config().auth.token_expiry, 120);
    }

    #[test]
    fn test_reload_keeps_previous_config_on_error() {
        std::env::set_var("PICCE_TEST_SECRET_BAD_RELOAD", SECRET);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("picce.toml");
        fs::write(
            &path,
            "[auth]\njwt_secret_env = \"PICCE_TEST_SECRET_BAD_RELOAD\"\n",
        )
        .unwrap();

        let manager = PicceConfigManager::new(&path).unwrap();
        fs::write(&path, "[auth\nbroken").unwrap();

        assert!(matches!(manager.reload(), Err(ConfigError::ParseError(_))));
        assert_eq!(manager.config().auth.token_expiry, 3600);
    }

    #[test]
    fn test_config_manager_from_config() {
        let mut config = PicceConfig::default();
        config.server.port = 4000;

        let manager = PicceConfigManager::from_config(config.clone());
        let loaded = manager.config();

        assert_eq!(loaded.server.host, config.server.host);
        assert_eq!(loaded.server.port, 4000);
    }

    #[test]
    fn test_turso_credentials_require_both_vars() {
        let mut config = PicceConfig::default();
        assert!(config.turso_credentials().is_none());

        std::env::set_var("PICCE_TEST_TURSO_URL", "libsql://example.turso.io");
        config.database.turso_url_env = Some("PICCE_TEST_TURSO_URL".to_string());
        assert!(config.turso_credentials().is_none());

        std::env::set_var("PICCE_TEST_TURSO_TOKEN", "token");
        config.database.turso_token_env = Some("PICCE_TEST_TURSO_TOKEN".to_string());
        assert_eq!(
            config.turso_credentials(),
            Some((
                "libsql://example.turso.io".to_string(),
                "token".to_string()
            ))
        );
    }
}
