//! Server profile CLI commands
//!
//! Provides commands for managing the servers in ~/.vault-env/config.toml

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;

use super::config::{CliConfig, ServerProfile, DEFAULT_MOUNT};
use super::output::{self, OutputFormat};
use crate::config::tls::parse_flag;

#[derive(Subcommand)]
pub enum ServerCommands {
    /// Add a server, or replace one with the same name
    #[command(
        after_help = "EXAMPLES:\n    # Add a server and make it the default\n    vault-env server add prod https://vault.example.com:8200 --mount kv --use\n\n    # Add a lab server with a self-signed certificate\n    vault-env server add lab https://10.0.0.5:8200 --ignore-ssl"
    )]
    Add {
        /// Profile name
        name: String,

        /// Vault server address
        url: String,

        /// KV v2 mount listed by default
        #[arg(long, default_value = DEFAULT_MOUNT)]
        mount: String,

        /// Skip TLS certificate verification for this server
        #[arg(long)]
        ignore_ssl: bool,

        /// Token stored with the profile
        #[arg(long)]
        token: Option<String>,

        /// Vault Enterprise namespace
        #[arg(long)]
        namespace: Option<String>,

        /// Select the server after adding it
        #[arg(long = "use")]
        select: bool,
    },

    /// Remove a server
    Remove {
        /// Profile name
        name: String,
    },

    /// List configured servers
    List {
        /// Output format (json, yaml, or table)
        #[arg(short, long, default_value = "table", value_parser = ["json", "yaml", "table"])]
        output: String,
    },

    /// Select the server used when --server is not given
    Use {
        /// Profile name
        name: String,
    },

    /// Set one field of a server (url, mount, ignore_ssl, token, or namespace)
    Set {
        /// Profile name
        name: String,

        /// Field to change
        key: String,

        /// New value; an empty value clears token and namespace
        value: String,
    },
}

/// Handle server commands against the default configuration file
pub async fn handle_server_command(command: ServerCommands) -> Result<()> {
    let mut config = CliConfig::load()?;
    let changed = apply_server_command(&mut config, command)?;
    if changed {
        config.save()?;
        let path = CliConfig::config_path()?;
        println!("Configuration saved to: {}", path.display());
    }
    Ok(())
}

/// Apply a command to `config`, returning true when it must be saved
fn apply_server_command(config: &mut CliConfig, command: ServerCommands) -> Result<bool> {
    match command {
        ServerCommands::Add { name, url, mount, ignore_ssl, token, namespace, select } => {
            let profile = ServerProfile { name: name.clone(), url, mount, ignore_ssl, token, namespace };
            if config.upsert(profile) {
                println!("✅ Server '{}' replaced", name);
            } else {
                println!("✅ Server '{}' added", name);
            }
            if select || config.servers.len() == 1 {
                config.selected = Some(name.clone());
                println!("Server '{}' selected", name);
            }
            Ok(true)
        }

        ServerCommands::Remove { name } => {
            if !config.remove(&name) {
                anyhow::bail!("Unknown server '{}'", name);
            }
            println!("✅ Server '{}' removed", name);
            Ok(true)
        }

        ServerCommands::List { output } => {
            let format = OutputFormat::parse(&output)?;
            list_servers(config, format)?;
            Ok(false)
        }

        ServerCommands::Use { name } => {
            if config.find(&name).is_none() {
                anyhow::bail!("Unknown server '{}'", name);
            }
            config.selected = Some(name.clone());
            println!("✅ Server '{}' selected", name);
            Ok(true)
        }

        ServerCommands::Set { name, key, value } => {
            let profile = config.find_mut(&name).with_context(|| format!("Unknown server '{}'", name))?;
            set_field(profile, &key, &value)?;
            println!("✅ Server '{}': {} updated", name, key);
            Ok(true)
        }
    }
}

fn set_field(profile: &mut ServerProfile, key: &str, value: &str) -> Result<()> {
    let optional = |value: &str| Some(value.to_string()).filter(|v| !v.is_empty());

    match key {
        "url" => profile.url = value.to_string(),
        "mount" => profile.mount = value.trim_matches('/').to_string(),
        "ignore_ssl" => profile.ignore_ssl = parse_flag(value),
        "token" => profile.token = optional(value),
        "namespace" => profile.namespace = optional(value),
        _ => anyhow::bail!(
            "Unknown server field: '{}'. Valid fields: url, mount, ignore_ssl, token, namespace",
            key
        ),
    }
    Ok(())
}

#[derive(Serialize)]
struct ServerRow<'a> {
    name: &'a str,
    url: &'a str,
    mount: &'a str,
    ignore_ssl: bool,
    has_token: bool,
    selected: bool,
}

fn list_servers(config: &CliConfig, format: OutputFormat) -> Result<()> {
    let rows: Vec<ServerRow<'_>> = config
        .servers
        .iter()
        .map(|server| ServerRow {
            name: &server.name,
            url: &server.url,
            mount: &server.mount,
            ignore_ssl: server.ignore_ssl,
            has_token: server.token.is_some(),
            selected: config.selected.as_deref() == Some(server.name.as_str()),
        })
        .collect();

    if format != OutputFormat::Table {
        return output::print_output(&rows, format);
    }

    if rows.is_empty() {
        println!("No servers configured");
        println!("\nRun 'vault-env server add <name> <url>' to add one");
        return Ok(());
    }

    output::print_table_header(&[("", 2), ("Name", 15), ("URL", 40), ("Mount", 12), ("TLS", 8)]);
    for row in &rows {
        println!(
            "{:<2} {:<15} {:<40} {:<12} {}",
            if row.selected { "*" } else { "" },
            output::truncate(row.name, 15),
            output::truncate(row.url, 40),
            output::truncate(row.mount, 12),
            if row.ignore_ssl { "insecure" } else { "verify" }
        );
    }
    println!();
    Ok(())
}
