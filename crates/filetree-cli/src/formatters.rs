//! Output formatters for CLI commands.
//!
//! Provides consistent formatting across all CLI commands for JSON, text, and pretty output modes.

use crate::commands::common::TreeRow;
use crate::output::OutputFormat;
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

/// Format data according to the specified output format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Examples
///
/// ```
/// use filetree_cli::formatters::format_output;
/// use filetree_cli::output::OutputFormat;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Located {
///     path: String,
///     found: bool,
/// }
///
/// let located = Located {
///     path: "/w/src/lib.rs".to_string(),
///     found: true,
/// };
///
/// let output = format_output(&located, OutputFormat::Json)?;
/// assert!(output.contains("\"found\": true"));
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn format_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::format(data),
        OutputFormat::Text => text::format(data),
        OutputFormat::Pretty => pretty::format(data),
    }
}

/// Format visible tree rows.
///
/// JSON prints the rows as an array; text and pretty print an indented
/// outline, the latter with colors.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_rows(rows: &[TreeRow], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::format(&rows),
        OutputFormat::Text => Ok(outline::render(rows, false)),
        OutputFormat::Pretty => Ok(outline::render(rows, true)),
    }
}

/// JSON output formatting.
pub mod json {
    use super::{Result, Serialize};

    /// Format data as JSON.
    ///
    /// Uses pretty-printing with 2-space indentation.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        let json = serde_json::to_string_pretty(data)?;
        Ok(json)
    }

    /// Format data as compact JSON (no formatting).
    pub fn format_compact<T: Serialize>(data: &T) -> Result<String> {
        let json = serde_json::to_string(data)?;
        Ok(json)
    }
}

/// Plain text output formatting.
pub mod text {
    use super::{Result, Serialize, json};

    /// Format data as plain text.
    ///
    /// Uses the compact JSON representation, suitable for piping.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        json::format_compact(data)
    }
}

/// Pretty (human-readable) output formatting.
pub mod pretty {
    use super::{Colorize, Result, Serialize};
    use std::fmt::Write;

    /// Format data as colorized, human-readable output.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        let value = serde_json::to_value(data)?;
        Ok(format_value(&value, 0))
    }

    fn format_value(value: &serde_json::Value, indent: usize) -> String {
        use serde_json::Value;

        let indent_str = "  ".repeat(indent);
        let next_indent_str = "  ".repeat(indent + 1);

        match value {
            Value::Null => "null".dimmed().to_string(),
            Value::Bool(b) => b.to_string().yellow().to_string(),
            Value::Number(n) => n.to_string().cyan().to_string(),
            Value::String(s) => format!("\"{}\"", s.green()),
            Value::Array(arr) => {
                if arr.is_empty() {
                    return "[]".to_string();
                }
                let items: Vec<String> = arr
                    .iter()
                    .map(|item| format!("{next_indent_str}{}", format_value(item, indent + 1)))
                    .collect();
                format!("[\n{}\n{indent_str}]", items.join(",\n"))
            }
            Value::Object(obj) => {
                if obj.is_empty() {
                    return "{}".to_string();
                }
                let mut result = "{\n".to_string();
                let last = obj.len() - 1;
                for (i, (key, val)) in obj.iter().enumerate() {
                    let _ = write!(
                        result,
                        "{next_indent_str}\"{}\": {}",
                        key.blue().bold(),
                        format_value(val, indent + 1)
                    );
                    if i < last {
                        result.push(',');
                    }
                    result.push('\n');
                }
                result.push_str(&indent_str);
                result.push('}');
                result
            }
        }
    }
}

/// Indented outline of tree rows.
pub mod outline {
    use super::{Colorize, TreeRow};

    const SELECTED: &str = "selected";

    /// Renders one line per row, two spaces per level.
    ///
    /// Directories end with `/` and carry a `▾` (expanded) or `▸` marker.
    #[must_use]
    pub fn render(rows: &[TreeRow], colored: bool) -> String {
        rows.iter()
            .map(|row| line(row, colored))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn line(row: &TreeRow, colored: bool) -> String {
        let indent = "  ".repeat(row.depth.saturating_sub(1));
        let selected = row.classes.iter().any(|class| class == SELECTED);

        let label = if row.directory {
            let marker = if row.expanded { '▾' } else { '▸' };
            let name = format!("{}/", row.name);
            if colored {
                format!("{marker} {}", name.blue().bold())
            } else {
                format!("{marker} {name}")
            }
        } else {
            format!("  {}", row.name)
        };

        match (selected, colored) {
            (true, true) => format!("{indent}{}", label.reversed()),
            (true, false) => format!("{indent}{label} *"),
            _ => format!("{indent}{label}"),
        }
    }
}
