//! Output formatters for CLI commands.
//!
//! Every command builds a serializable result and hands it to
//! [`format_output`], so the three output modes stay consistent.

use anyhow::Result;
use colored::Colorize;
use nucleus_core::cli::OutputFormat;
use serde::Serialize;
use serde_json::Value;

/// Formats `data` according to `format`.
///
/// # Errors
///
/// Returns an error if `data` cannot be serialized.
///
/// # Examples
///
/// ```
/// use nucleus_core::cli::OutputFormat;
/// use nucleus_explorer_cli::formatters::format_output;
/// use serde_json::json;
///
/// let data = json!({"server": {"name": "echo", "tools": 2}});
/// let output = format_output(&data, OutputFormat::Text)?;
/// assert_eq!(output, "server.name=echo\nserver.tools=2");
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn format_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::format(data),
        OutputFormat::Text => text::format(data),
        OutputFormat::Pretty => pretty::format(data),
    }
}

/// JSON output formatting.
pub mod json {
    use super::{Result, Serialize};

    /// Formats data as indented JSON.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }
}

/// Line-oriented output for scripts.
pub mod text {
    use super::{Result, Serialize, Value};

    /// Formats data as `path=value` lines, one per scalar.
    ///
    /// Object keys and array indices are joined with dots; strings are
    /// written without quotes.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        let value = serde_json::to_value(data)?;
        let mut lines = Vec::new();
        flatten(&value, String::new(), &mut lines);
        Ok(lines.join("\n"))
    }

    fn flatten(value: &Value, path: String, lines: &mut Vec<String>) {
        let join = |segment: &str| {
            if path.is_empty() {
                segment.to_string()
            } else {
                format!("{path}.{segment}")
            }
        };
        match value {
            Value::Object(map) if !map.is_empty() => {
                for (key, child) in map {
                    flatten(child, join(key), lines);
                }
            }
            Value::Array(items) if !items.is_empty() => {
                for (index, child) in items.iter().enumerate() {
                    flatten(child, join(&index.to_string()), lines);
                }
            }
            Value::String(text) if path.is_empty() => lines.push(text.clone()),
            Value::String(text) => lines.push(format!("{path}={text}")),
            scalar if path.is_empty() => lines.push(scalar.to_string()),
            scalar => lines.push(format!("{path}={scalar}")),
        }
    }
}

/// Colorized output for terminals.
pub mod pretty {
    use super::{Colorize, Result, Serialize, Value};

    /// Formats data as an indented, colorized tree.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        let value = serde_json::to_value(data)?;
        let mut out = String::new();
        match &value {
            Value::Object(_) | Value::Array(_) => write_tree(&value, 0, &mut out),
            scalar => out.push_str(&scalar_text(scalar)),
        }
        Ok(out.trim_end().to_string())
    }

    fn write_tree(value: &Value, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    out.push_str(&indent);
                    out.push_str(&key.blue().bold().to_string());
                    out.push(':');
                    write_child(child, depth, out);
                }
            }
            Value::Array(items) => {
                for item in items {
                    out.push_str(&indent);
                    out.push('-');
                    write_child(item, depth, out);
                }
            }
            scalar => {
                out.push_str(&indent);
                out.push_str(&scalar_text(scalar));
                out.push('\n');
            }
        }
    }

    fn write_child(child: &Value, depth: usize, out: &mut String) {
        match child {
            Value::Object(map) if !map.is_empty() => {
                out.push('\n');
                write_tree(child, depth + 1, out);
            }
            Value::Array(items) if !items.is_empty() => {
                out.push('\n');
                write_tree(child, depth + 1, out);
            }
            other => {
                out.push(' ');
                out.push_str(&scalar_text(other));
                out.push('\n');
            }
        }
    }

    fn scalar_text(value: &Value) -> String {
        match value {
            Value::Null => "null".dimmed().to_string(),
            Value::Bool(flag) => flag.to_string().yellow().to_string(),
            Value::Number(number) => number.to_string().cyan().to_string(),
            Value::String(text) if text.contains('\n') => text.clone(),
            Value::String(text) => text.green().to_string(),
            Value::Array(_) => "[]".to_string(),
            Value::Object(_) => "{}".to_string(),
        }
    }
}
