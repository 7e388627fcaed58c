//! Command-line interface argument parsing
//!
//! Defines all CLI commands and their arguments using Clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Customer lookup client and contract tooling
#[derive(Parser, Debug)]
#[command(name = "customer-contract")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Look up customers and check the customer-service contract")]
#[command(long_about = concat!(
    "customer-contract (v", env!("CARGO_PKG_VERSION"), ")\n",
    "Looks customers up by id, writes the consumer pact, serves it from a mock server,\n",
    "and verifies a running customer service against it."
))]
pub struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (defaults to ~/.config/customer-contract/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Look up a customer by id
    ///
    /// Prints the customer, or reports that it does not exist.
    ///
    /// Examples:
    ///   customer-contract find 1234
    ///   customer-contract find 1234 --host 172.17.0.1 --port 49153
    #[command(visible_alias = "get")]
    #[command(display_order = 1)]
    Find {
        /// Customer id
        #[arg(allow_hyphen_values = true)]
        id: i64,

        /// Customer service host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Customer service port (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Give up after this many seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout_secs: Option<u64>,
    },

    /// Write the customer-service pact document
    ///
    /// Example:
    ///   customer-contract pact --dir build/pacts
    #[command(display_order = 2)]
    Pact {
        /// Directory to write `AndroidClient-CustomerService.json` into
        #[arg(long, default_value = "build/pacts")]
        dir: PathBuf,
    },

    /// Serve a pact from a mock server until interrupted
    ///
    /// Examples:
    ///   customer-contract stub --pact build/pacts/AndroidClient-CustomerService.json
    ///   customer-contract stub --pact pact.json --port 8080 --state "an existing customer with a valid id"
    #[command(display_order = 3)]
    Stub {
        /// Pact document to serve
        #[arg(long)]
        pact: PathBuf,

        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,

        /// Only serve interactions requiring this provider state
        #[arg(long)]
        state: Option<String>,
    },

    /// Run the reference customer service until interrupted
    ///
    /// Example:
    ///   customer-contract serve --port 8080 --seed
    #[command(display_order = 4)]
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,

        /// Store customer 1234 "Test First" before serving
        #[arg(long)]
        seed: bool,
    },

    /// Verify a running provider against a pact
    ///
    /// Example:
    ///   customer-contract verify --pact pact.json --base-url http://localhost:8080
    #[command(display_order = 5)]
    Verify {
        /// Pact document to replay
        #[arg(long)]
        pact: PathBuf,

        /// Provider base URL
        #[arg(long)]
        base_url: String,
    },

    /// Check CLI version
    #[command(display_order = 6)]
    Version,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }
}
