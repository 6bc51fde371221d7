//! Rendering of command results.
//!
//! Each printable result implements [`Render`]. The structured formats
//! come from its serde impl; the trait supplies the human view and the
//! identifiers printed by `--output plain`.

use std::io::{self, Write};

use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{GlobalOpts, OutputFormat};

pub trait Render: Serialize {
    /// View for `--output table`: a table for collections, a key/value
    /// block for single records.
    fn human(&self) -> String;

    /// One identifier per line for scripting.
    fn ids(&self) -> Vec<String>;
}

pub fn render<T: Render + ?Sized>(format: &OutputFormat, value: &T) -> String {
    let structured = match format {
        OutputFormat::Table => return value.human(),
        OutputFormat::Plain => return value.ids().join("\n"),
        OutputFormat::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
        OutputFormat::JsonCompact => serde_json::to_string(value).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
    };
    structured.unwrap_or_else(|e| format!("error: cannot serialize output: {e}"))
}

/// Render `value` in the selected format and print it to stdout.
pub fn emit<T: Render + ?Sized>(global: &GlobalOpts, value: &T) {
    line(global, &render(&global.output, value));
}

/// Rounded table of `rows`.
pub fn table<R: Tabled>(rows: impl IntoIterator<Item = R>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print one result to stdout unless quiet or empty.
pub fn line(global: &GlobalOpts, text: &str) {
    if global.quiet || text.is_empty() {
        return;
    }
    let _ = writeln!(io::stdout().lock(), "{text}");
}

/// Progress and confirmation messages go to stderr.
pub fn status(global: &GlobalOpts, message: &str) {
    if !global.quiet {
        eprintln!("{message}");
    }
}
