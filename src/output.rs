//! Rendering an [`AnswerResult`] for the terminal

use comfy_table::{ContentArrangement, Table};
use std::io::Write;

use crate::error::{RagError, RagResult};
use crate::graph::Record;
use crate::rag::AnswerResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Answer, `CYPHER :` line, `CONTEXT:` line
    #[default]
    Text,
    Json,
    /// Like text, with the records laid out as a table
    Table,
}

pub fn render(result: &AnswerResult, format: OutputFormat, out: &mut dyn Write) -> RagResult<()> {
    let io_err = |e: std::io::Error| RagError::Output(e.to_string());

    let (query, items) = match &result.context {
        Some(ctx) => (ctx.generated_query.as_str(), ctx.raw_items.as_slice()),
        None => ("", &[][..]),
    };

    match format {
        OutputFormat::Text => {
            writeln!(out, "{}", result.answer).map_err(io_err)?;
            writeln!(out, "CYPHER : {}", query).map_err(io_err)?;
            writeln!(out, "CONTEXT: {}", context_line(items)).map_err(io_err)?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(result)
                .map_err(|e| RagError::Output(e.to_string()))?;
            writeln!(out, "{}", json).map_err(io_err)?;
        }
        OutputFormat::Table => {
            writeln!(out, "{}", result.answer).map_err(io_err)?;
            writeln!(out, "CYPHER : {}", query).map_err(io_err)?;
            writeln!(out, "{}", records_table(items)).map_err(io_err)?;
        }
    }
    Ok(())
}

/// Records as a single-line JSON array
pub fn context_line(items: &[Record]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

fn records_table(items: &[Record]) -> String {
    let Some(first) = items.first() else {
        return "(no results)".to_string();
    };

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    let columns: Vec<&String> = first.keys().collect();
    table.set_header(&columns);

    for record in items {
        let cells: Vec<String> = columns
            .iter()
            .map(|col| record.get(*col).map(format_cell).unwrap_or_default())
            .collect();
        table.add_row(cells);
    }

    format!("{}\n{} row(s)", table, items.len())
}

fn format_cell(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
