//! Command-line interface for Facegate.

use clap::{Parser, Subcommand};

/// Facegate - Face-verification authentication service
/// Password login plus biometric second factor with optional PIN escalation
#[derive(Parser)]
#[command(name = "facegate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    #[command(alias = "-s", alias = "--serve")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    InitConfig,

    /// Hash a password with the configured Argon2 parameters
    HashPassword {
        /// Password to hash
        password: String,
    },
}
