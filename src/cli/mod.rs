//! CLI module for the PICCE API
//!
//! Provides command-line interface parsing and handling for the picce-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PICCE API - authentication and resource management server
#[derive(Parser, Debug)]
#[command(
    name = "picce-server",
    version,
    about = "PICCE API - authentication and resource management server",
    long_about = "Sign-up, sign-in and guest sessions with stateless tokens, plus role-gated\n\
                  CRUD for users, addresses, institutions and classrooms.\n\n\
                  Run without arguments to start the server, or use 'init' to scaffold a new project.",
    after_help = "EXAMPLES:\n    \
                  picce-server init                # Scaffold picce.toml and .env.example\n    \
                  picce-server                     # Start the server (requires picce.toml)\n    \
                  picce-server --config my.toml    # Use a custom config file\n    \
                  picce-server config --validate   # Check the configuration and secrets"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "picce.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new PICCE API project with configuration files
    ///
    /// Creates picce.toml, .env.example and the data/ directory.
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files without prompting
        #[arg(short, long)]
        force: bool,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "3000")]
        port: u16,

        /// Write a config with self-service sign-up turned off
        #[arg(long)]
        no_sign_up: bool,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file and the secrets it references
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
