//! CLI module for Session Auth
//!
//! - `serve`: run the HTTP server
//! - `check-config`: load and validate configuration, then exit

pub mod check;
pub mod serve;

use clap::{Parser, Subcommand};

/// Session Auth - signed access/refresh tokens for user accounts
#[derive(Parser)]
#[command(name = "session-auth")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve,

    /// Validate configuration without starting the server
    CheckConfig,
}
