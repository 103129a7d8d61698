// src/cli/handlers/commons.rs

// Shared helpers for the diagnostic commands.

use crate::models::AliasRecord;
use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use serde_yaml::Value;

/// How a command prints its result.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable, colored when the terminal allows it.
    #[default]
    Text,
    /// Pretty-printed JSON on stdout.
    Json,
}

/// Prints any serializable value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output as JSON")?;
    println!("{}", json);
    Ok(())
}

/// Renders a config or alias value on one line: scalars as-is, anything
/// nested as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "~".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| format!("{:?}", other)),
    }
}

/// Prints one alias record as an indented key list under `name`.
pub fn print_record(name: &str, record: &AliasRecord) {
    println!("{}", name.yellow().bold());
    if record.is_empty() {
        println!("  {}", "(empty)".dimmed());
        return;
    }
    for (key, value) in record.iter() {
        println!("  {:<12} {}", key.blue(), render_value(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_value_scalars_and_nested() {
        assert_eq!(render_value(&Value::String("x".into())), "x");
        assert_eq!(render_value(&Value::Bool(true)), "true");
        assert_eq!(render_value(&Value::Null), "~");

        let nested: Value = serde_yaml::from_str("a: [1, 2]").unwrap();
        assert_eq!(render_value(&nested), r#"{"a":[1,2]}"#);
    }
}
