//! Shared output formatting utilities for CLI commands
//!
//! Provides consistent output formatting across all CLI commands with support
//! for JSON, YAML, table and environment (`KEY=value`) formats.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::secrets::SecretDocument;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Table,
    Env,
}

impl OutputFormat {
    /// Parse output format from string
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            "table" => Ok(OutputFormat::Table),
            "env" => Ok(OutputFormat::Env),
            _ => anyhow::bail!(
                "Unsupported output format: '{}'. Use 'json', 'yaml', 'table', or 'env'.",
                s
            ),
        }
    }
}

/// Print data as JSON or YAML
pub fn print_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(data),
        OutputFormat::Yaml => print_yaml(data),
        OutputFormat::Table | OutputFormat::Env => {
            anyhow::bail!("{:?} format requires custom implementation per data type", format)
        }
    }
}

/// Print data as JSON
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

/// Print data as YAML
pub fn print_yaml<T: Serialize>(data: &T) -> Result<()> {
    let yaml = serde_yaml::to_string(data).context("Failed to serialize to YAML")?;
    println!("{}", yaml);
    Ok(())
}

/// Print a document as shell-quoted `KEY=value` lines
pub fn print_env(document: &SecretDocument) {
    for (key, value) in env_pairs(document) {
        println!("{}={}", key, shell_quote(&value));
    }
}

/// Environment variable pairs for a document.
///
/// String values are used as is; other JSON values are rendered as compact
/// JSON. Keys that are not valid variable names are skipped with a warning.
pub fn env_pairs(document: &SecretDocument) -> Vec<(String, String)> {
    document
        .iter()
        .filter_map(|(key, value)| {
            if !is_env_name(key) {
                warn!(key = %key, "Skipping key that is not a valid environment variable name");
                return None;
            }
            Some((key.clone(), env_value(value)))
        })
        .collect()
}

fn env_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_env_name(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Quote a value for POSIX shells when it needs it
pub fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value.chars().all(|c| c.is_ascii_alphanumeric() || "_-./:@%+,=".contains(c));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// Truncate string to maximum length with ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a horizontal separator line
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Print a table header
pub fn print_table_header(columns: &[(&str, usize)]) {
    println!();
    let mut header = String::new();
    for (name, width) in columns {
        header.push_str(&format!("{:<width$} ", name, width = width));
    }
    println!("{}", header.trim());

    let total_width: usize = columns.iter().map(|(_, w)| w + 1).sum();
    print_separator(total_width.saturating_sub(1));
}
