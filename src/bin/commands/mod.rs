pub mod config;
pub mod database;
pub mod query;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty table with borders (default)
    #[default]
    Table,
    /// Markdown table format
    Markdown,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON with indentation
    JsonPretty,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
            Self::JsonPretty => write!(f, "json-pretty"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "pretty" => Ok(Self::Table),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "json-pretty" | "jsonpretty" => Ok(Self::JsonPretty),
            _ => Err(format!(
                "Unknown output format '{}'. Valid formats: table, markdown, json, json-pretty",
                s
            )),
        }
    }
}

/// Print a serializable value in one of the JSON formats
pub(crate) fn print_json<T: Serialize>(value: &T, output_format: OutputFormat) -> anyhow::Result<()> {
    let json = match output_format {
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
        _ => serde_json::to_string(value)?,
    };
    println!("{}", json);
    Ok(())
}

/// Apply the table style matching the output format
pub(crate) fn styled(mut table: tabled::Table, output_format: OutputFormat) -> String {
    match output_format {
        OutputFormat::Markdown => table.with(tabled::settings::Style::markdown()),
        _ => table.with(tabled::settings::Style::rounded()),
    };
    table.to_string()
}
