use std::io::{self, Write};

use colored::Colorize;
use serde_json::Value;

use crate::client::{QueryResult, ResultShape};

const RULE_WIDTH: usize = 80;

/// Writes query results and command output, optionally with ANSI colours.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn render(
        &self,
        result: &QueryResult,
        show_full: bool,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        if show_full {
            self.render_full(result, out)
        } else {
            self.render_columns(result, out)
        }
    }

    pub fn render_full(&self, result: &QueryResult, out: &mut dyn Write) -> io::Result<()> {
        let pretty = serde_json::to_string_pretty(result.raw())?;
        writeln!(out, "{}", pretty)
    }

    pub fn render_columns(&self, result: &QueryResult, out: &mut dyn Write) -> io::Result<()> {
        let rule = "-".repeat(RULE_WIDTH);

        writeln!(out, "{}", self.heading("Results:"))?;
        writeln!(out, "{}", rule)?;
        if let ResultShape::Columnar(columns) = result.shape() {
            for column in columns {
                writeln!(out)?;
                writeln!(out, "{}", self.heading(&format!("{}:", column.name)))?;
                for value in &column.values {
                    writeln!(out, "  {}", display_value(value))?;
                }
            }
        }
        writeln!(out, "{}", rule)
    }

    pub fn banner(&self, title: &str, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}\n", self.heading(&format!("=== {} ===", title)))
    }

    pub fn error(&self, message: &str, out: &mut dyn Write) -> io::Result<()> {
        let label = if self.color {
            "Error:".red().bold().to_string()
        } else {
            "Error:".to_string()
        };
        writeln!(out, "{} {}", label, message)
    }

    fn heading(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Strings print bare; everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
