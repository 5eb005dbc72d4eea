//! Secret CLI commands
//!
//! Listing, reading, writing and deleting secrets, capability reports, and
//! running a command with a secret exported into its environment.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::io::{BufRead, Write};
use tracing::info;

use super::output::{self, OutputFormat};
use crate::secrets::{DiscoveryResult, SecretDocument, VaultClient};

/// List the secrets below `root` that the token can read
pub async fn list_secrets(client: &VaultClient, root: &str, format: OutputFormat) -> Result<()> {
    let result = client
        .discover_readable(root)
        .await
        .with_context(|| format!("Failed to list secrets under '{}'", root))?;

    match format {
        OutputFormat::Table => print_listing_table(&result),
        OutputFormat::Env => anyhow::bail!("The env format is only available for 'read'"),
        other => output::print_output(&result, other)?,
    }

    print_listing_notes(&result);
    Ok(())
}

fn print_listing_table(result: &DiscoveryResult) {
    if result.paths.is_empty() {
        println!("No readable secrets found");
        return;
    }

    output::print_table_header(&[("Path", 60), ("Access", 30)]);
    for secret in &result.paths {
        println!("{:<60} {}", output::truncate(&secret.path, 60), secret.access.tags());
    }
    println!();
}

fn print_listing_notes(result: &DiscoveryResult) {
    for warning in &result.warnings {
        eprintln!("⚠️  {}", warning.message);
    }
    for failure in &result.failed_branches {
        eprintln!("⚠️  Could not list {}: {}", failure.path, failure.reason);
    }
    if result.truncated {
        eprintln!("⚠️  Listing is incomplete: depth limit or deadline reached");
    }
}

/// Show the document stored at `path`
pub async fn read_secret(client: &VaultClient, path: &str, format: OutputFormat) -> Result<()> {
    let document = client
        .read_secret(path)
        .await
        .with_context(|| format!("Failed to read secret '{}'", path))?;

    match format {
        OutputFormat::Env => output::print_env(&document),
        OutputFormat::Table => print_document_table(&document),
        other => output::print_output(&document, other)?,
    }

    Ok(())
}

fn print_document_table(document: &SecretDocument) {
    if document.is_empty() {
        println!("Secret is empty");
        return;
    }

    output::print_table_header(&[("Key", 30), ("Value", 60)]);
    for (key, value) in output::env_pairs(document) {
        println!("{:<30} {}", output::truncate(&key, 30), output::truncate(&value, 60));
    }
    println!();
}

/// Write `KEY=VALUE` pairs to `path`, replacing or merging into the document
pub async fn write_secret(client: &VaultClient, path: &str, pairs: &[String], merge: bool) -> Result<()> {
    let document = document_from_pairs(pairs)?;

    if merge {
        let merged = client
            .merge_secret(path, &document)
            .await
            .with_context(|| format!("Failed to update secret '{}'", path))?;
        println!("✅ Secret '{}' updated ({} keys)", path, merged.len());
    } else {
        client
            .write_secret(path, &document)
            .await
            .with_context(|| format!("Failed to write secret '{}'", path))?;
        println!("✅ Secret '{}' written ({} keys)", path, document.len());
    }

    Ok(())
}

/// Turn `KEY=VALUE` arguments into a document of string values
///
/// The value may itself contain `=`. `KEY=` stores an empty string.
pub fn document_from_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<SecretDocument> {
    pairs
        .iter()
        .map(|pair| {
            let pair = pair.as_ref();
            match pair.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    Ok((key.trim().to_string(), Value::String(value.to_string())))
                }
                _ => anyhow::bail!("Invalid pair '{}': expected KEY=VALUE", pair),
            }
        })
        .collect()
}

/// Permanently delete the secret at `path`, asking first unless `yes`
pub async fn delete_secret(client: &VaultClient, path: &str, yes: bool) -> Result<()> {
    if !yes && !confirm(&format!("Permanently delete '{}' and all its versions?", path))? {
        println!("Aborted");
        return Ok(());
    }

    client
        .delete_secret(path)
        .await
        .with_context(|| format!("Failed to delete secret '{}'", path))?;

    println!("✅ Secret '{}' deleted", path);
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer).context("Failed to read confirmation")?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[derive(Debug, Serialize)]
struct AccessRow {
    path: String,
    capabilities: Vec<String>,
    readable: bool,
}

/// Show the token's capabilities on each of `paths`
pub async fn show_access(client: &VaultClient, paths: &[String], format: OutputFormat) -> Result<()> {
    let grant = client.check_access(paths).await.context("Failed to check capabilities")?;

    let rows: Vec<AccessRow> = paths
        .iter()
        .map(|path| {
            let access = grant.get(path).cloned().unwrap_or_default();
            AccessRow {
                path: path.clone(),
                capabilities: access.iter().map(|c| c.to_string()).collect(),
                readable: access.can_read(),
            }
        })
        .collect();

    match format {
        OutputFormat::Table => {
            output::print_table_header(&[("Path", 60), ("Capabilities", 30)]);
            for row in &rows {
                let tags = if row.capabilities.is_empty() {
                    "<none>".to_string()
                } else {
                    row.capabilities.join(" ")
                };
                println!("{:<60} {}", output::truncate(&row.path, 60), tags);
            }
            println!();
        }
        OutputFormat::Env => anyhow::bail!("The env format is only available for 'read'"),
        other => output::print_output(&rows, other)?,
    }

    Ok(())
}

/// Run `command` with the document at `path` exported into its environment
///
/// Returns the child's exit code.
pub async fn exec_with_secret(client: &VaultClient, path: &str, command: &[String]) -> Result<i32> {
    let (program, args) = command.split_first().context("No command given to exec")?;

    let document = client
        .read_secret(path)
        .await
        .with_context(|| format!("Failed to read secret '{}'", path))?;
    let vars = output::env_pairs(&document);
    info!(path = %path, variables = vars.len(), program = %program, "running command with secret environment");

    let status = tokio::process::Command::new(program)
        .args(args)
        .envs(vars)
        .status()
        .await
        .with_context(|| format!("Failed to run '{}'", program))?;

    Ok(status.code().unwrap_or(1))
}
