//! Init command implementation
//!
//! Scaffolds a new PICCE API deployment: `picce.toml`, `.env.example`,
//! `.gitignore` and the `data/` directory holding the SQLite database.

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// Project already exists (picce.toml found)
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// Host address for the server
    pub host: String,
    /// Port for the server
    pub port: u16,
    /// Whether self-service sign-up is enabled
    pub allow_sign_up: bool,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing PICCE API Project");

    let base_path = &config.path;

    let config_path = base_path.join("picce.toml");
    if config_path.exists() && !config.force {
        output.warning("picce.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    let data_dir = base_path.join("data");
    if data_dir.exists() {
        output.skipped("data", "already exists");
    } else {
        if let Err(e) = fs::create_dir_all(&data_dir) {
            output.error(&format!("Failed to create data: {}", e));
            return InitResult::Error(e.to_string());
        }
        output.created("directory", "data");
    }

    let toml_content = generate_picce_toml(&config);
    if let Err(e) = write_file(&config_path, &toml_content, config.force) {
        output.error(&format!("Failed to create picce.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "picce.toml");

    let env_example_path = base_path.join(".env.example");
    if let Err(e) = write_file(&env_example_path, ENV_EXAMPLE, config.force) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("env", ".env.example");

    // Create .gitignore if it doesn't exist
    let gitignore_path = base_path.join(".gitignore");
    if !gitignore_path.exists() {
        if let Err(e) = write_file(&gitignore_path, GITIGNORE, false) {
            output.warning(&format!("Failed to create .gitignore: {}", e));
        } else {
            output.created("file", ".gitignore");
        }
    }

    output.complete("PICCE API project initialized successfully!");

    output.header("Next Steps");
    output.newline();
    output.info("1. Set up environment variables:");
    output.command("cp .env.example .env");
    output.command("# Edit .env and set JWT_SECRET (min 32 bytes)");
    output.newline();
    output.info("2. Start the server:");
    output.command("picce-server");

    output.hint(&format!(
        "Server will be available at http://{}:{}",
        config.host, config.port
    ));
    output.hint("API docs available at /swagger-ui/ (requires 'swagger-ui' feature)");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(()); // Skip existing files unless force is true
    }
    fs::write(path, content)
}

fn generate_picce_toml(config: &InitConfig) -> String {
    format!(
        r#"# PICCE API configuration
# Secrets are read from the environment variables named here, never from this file.

[server]
host = "{host}"
port = {port}
log_level = "info"
log_json = false

[auth]
jwt_secret_env = "JWT_SECRET"
# Session token lifetime in seconds
token_expiry = 3600
allow_sign_up = {allow_sign_up}

[database]
url = "./data/picce.db"
# Remote Turso database (requires the 'turso' feature)
# turso_url_env = "TURSO_URL"
# turso_token_env = "TURSO_AUTH_TOKEN"
"#,
        host = config.host,
        port = config.port,
        allow_sign_up = config.allow_sign_up,
    )
}

const ENV_EXAMPLE: &str = r#"# PICCE API Environment Variables
# Copy this file to .env and fill in the values.

# REQUIRED: token signing secret (minimum 32 bytes)
# Generate with: openssl rand -base64 32
JWT_SECRET=change-me-in-production-use-at-least-32-characters

# Optional: overrides server.log_level (trace, debug, info, warn, error)
RUST_LOG=info,picce=debug

# Optional: Turso cloud database (if using remote database)
# TURSO_URL=libsql://your-db.turso.io
# TURSO_AUTH_TOKEN=your-token
"#;

const GITIGNORE: &str = r#"# PICCE API Generated Files
/data/
*.db
*.db-journal

# Environment
.env
.env.local

# Rust
/target/

# OS
.DS_Store
"#;
