//! # Command Line Interface
//!
//! The `vault-env` binary: browse the secrets a token can read, show and edit
//! documents, export them into a command's environment, and manage named
//! server profiles.

pub mod config;
pub mod output;
pub mod secrets;
pub mod server;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::DiscoveryConfig;
use crate::observability::init_logging;
use crate::secrets::VaultClient;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "vault-env")]
#[command(about = "Browse and load Vault KV v2 secrets")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Server profile to use instead of the selected one
    #[arg(short, long, global = true)]
    pub server: Option<String>,

    /// Vault server address
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Vault token
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Path to file containing the Vault token
    #[arg(long, global = true)]
    pub token_file: Option<std::path::PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List readable secrets with their capabilities
    #[command(
        after_help = "EXAMPLES:\n    # List everything readable in the profile's mount\n    vault-env list\n\n    # List one folder as JSON\n    vault-env list kv/app --output json"
    )]
    List {
        /// Mount or folder to list (defaults to the profile's mount)
        root: Option<String>,

        /// Deepest folder level to descend
        #[arg(long)]
        max_depth: Option<usize>,

        /// Output format (json, yaml, or table)
        #[arg(short, long, default_value = "table", value_parser = ["json", "yaml", "table"])]
        output: String,
    },

    /// Show a secret
    #[command(
        after_help = "EXAMPLES:\n    # Show a secret as JSON\n    vault-env read kv/data/app/db\n\n    # Print shell assignments\n    vault-env read kv/data/app/db --output env"
    )]
    Read {
        /// Secret path, e.g. kv/data/app/db
        path: String,

        /// Output format (json, yaml, table, or env)
        #[arg(short, long, default_value = "json", value_parser = ["json", "yaml", "table", "env"])]
        output: String,
    },

    /// Write a secret from KEY=VALUE pairs
    Write {
        /// Secret path, e.g. kv/data/app/db
        path: String,

        /// KEY=VALUE pairs
        #[arg(required = true, value_name = "KEY=VALUE")]
        pairs: Vec<String>,

        /// Keep existing keys instead of replacing the whole document
        #[arg(long)]
        merge: bool,
    },

    /// Permanently delete a secret and all its versions
    Delete {
        /// Secret path, e.g. kv/data/app/db
        path: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the token's capabilities on paths
    Access {
        /// Secret paths
        #[arg(required = true)]
        paths: Vec<String>,

        /// Output format (json, yaml, or table)
        #[arg(short, long, default_value = "table", value_parser = ["json", "yaml", "table"])]
        output: String,
    },

    /// Run a command with a secret's keys as environment variables
    #[command(
        after_help = "EXAMPLES:\n    vault-env exec kv/data/app/db -- psql -h localhost"
    )]
    Exec {
        /// Secret path, e.g. kv/data/app/db
        path: String,

        /// Command and arguments
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Server profile commands
    Server {
        #[command(subcommand)]
        command: server::ServerCommands,
    },
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    let overrides = config::EndpointOverrides {
        server: cli.server,
        url: cli.url,
        token: cli.token,
        token_file: cli.token_file,
        insecure: cli.insecure,
        timeout: cli.timeout,
    };

    match cli.command {
        Commands::Server { command } => server::handle_server_command(command).await?,

        Commands::List { root, max_depth, output } => {
            let format = OutputFormat::parse(&output)?;
            let mut discovery = DiscoveryConfig::from_env()?;
            if let Some(depth) = max_depth {
                discovery.max_depth = depth;
                discovery.validate()?;
            }
            let (client, mount) = create_client(&overrides, discovery)?;
            let root = root.unwrap_or(mount);
            secrets::list_secrets(&client, &root, format).await?
        }

        Commands::Read { path, output } => {
            let format = OutputFormat::parse(&output)?;
            let (client, _) = create_client(&overrides, DiscoveryConfig::default())?;
            secrets::read_secret(&client, &path, format).await?
        }

        Commands::Write { path, pairs, merge } => {
            let (client, _) = create_client(&overrides, DiscoveryConfig::default())?;
            secrets::write_secret(&client, &path, &pairs, merge).await?
        }

        Commands::Delete { path, yes } => {
            let (client, _) = create_client(&overrides, DiscoveryConfig::default())?;
            secrets::delete_secret(&client, &path, yes).await?
        }

        Commands::Access { paths, output } => {
            let format = OutputFormat::parse(&output)?;
            let (client, _) = create_client(&overrides, DiscoveryConfig::default())?;
            secrets::show_access(&client, &paths, format).await?
        }

        Commands::Exec { path, command } => {
            let (client, _) = create_client(&overrides, DiscoveryConfig::default())?;
            let code = secrets::exec_with_secret(&client, &path, &command).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}

/// Create the Vault client with the resolved endpoint, plus the default mount
fn create_client(
    overrides: &config::EndpointOverrides,
    discovery: DiscoveryConfig,
) -> anyhow::Result<(VaultClient, String)> {
    let cli_config = config::CliConfig::load()?;
    let resolved = config::resolve_endpoint(overrides, &cli_config)?;

    tracing::debug!(
        url = %resolved.endpoint.base_url,
        server = ?resolved.profile,
        tls_verify = resolved.endpoint.tls.verify,
        "resolved Vault endpoint"
    );

    let client = VaultClient::with_discovery(resolved.endpoint, discovery)
        .context("Failed to create Vault client")?;
    Ok((client, resolved.mount))
}
