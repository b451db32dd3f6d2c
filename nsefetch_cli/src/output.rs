use anyhow::Result;
use nsefetch_lib::table::{AnnouncementTable, INDEX_COLUMN};
use nsefetch_lib::types::SearchResponse;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            "md" | "markdown" => OutputFormat::Markdown,
            _ => OutputFormat::Table,
        }
    }
}

/// Columns shown in the terminal preview, after the timestamp.
pub const PREVIEW_COLUMNS: &[&str] = &["symbol", "sm_name", "desc", "attchmntText"];

/// Widest cell in the terminal preview.
pub const PREVIEW_WIDTH: usize = 60;

#[derive(Tabled, Serialize)]
struct SymbolRow {
    #[tabled(rename = "Symbol")]
    #[serde(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Issuer")]
    #[serde(rename = "Issuer")]
    issuer: String,
    #[tabled(rename = "Type")]
    #[serde(rename = "Type")]
    kind: String,
}

// -- Row builders --

fn build_symbol_rows(resp: &SearchResponse) -> Vec<SymbolRow> {
    resp.symbols
        .iter()
        .map(|m| SymbolRow {
            symbol: m.symbol.clone(),
            issuer: m.symbol_info.clone().unwrap_or_default(),
            kind: m.result_sub_type.clone().unwrap_or_default(),
        })
        .collect()
}

/// The most recent `limit` announcements, newest last, with the preview
/// columns the payload actually has.
fn build_preview(table: &AnnouncementTable, limit: usize) -> Table {
    let columns: Vec<&str> = PREVIEW_COLUMNS
        .iter()
        .copied()
        .filter(|c| table.columns().iter().any(|have| have.as_str() == *c))
        .collect();

    let mut builder = Builder::default();
    let mut header = vec![INDEX_COLUMN.to_string()];
    header.extend(columns.iter().map(|c| c.to_string()));
    builder.push_record(header);

    let skip = table.len().saturating_sub(limit);
    for row in table.rows().iter().skip(skip) {
        let mut record = vec![row.text(INDEX_COLUMN)];
        record.extend(columns.iter().map(|c| shorten(&row.text(c), PREVIEW_WIDTH)));
        builder.push_record(record);
    }
    builder.build()
}

pub fn print_announcements(
    table: &AnnouncementTable,
    format: &OutputFormat,
    limit: usize,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", build_preview(table, limit));
            println!("[{} rows x {} columns]", table.len(), table.columns().len() + 1);
        }
        OutputFormat::Markdown => {
            let mut preview = build_preview(table, limit);
            preview.with(Style::markdown());
            println!("{}", preview);
        }
        OutputFormat::Csv => table.write_csv(std::io::stdout())?,
        OutputFormat::Json => print_json(&table.rows()),
    }
    Ok(())
}

pub fn print_symbols(resp: &SearchResponse, format: &OutputFormat) -> Result<()> {
    let rows = build_symbol_rows(resp);
    match format {
        OutputFormat::Table => println!("{}", Table::new(rows)),
        OutputFormat::Markdown => {
            let mut table = Table::new(rows);
            table.with(Style::markdown());
            println!("{}", table);
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        OutputFormat::Json => print_json(&resp.symbols),
    }
    Ok(())
}

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

/// Cuts `text` to `max` characters on one line, marking the cut with `...`.
fn shorten(text: &str, max: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max.saturating_sub(3)) {
        Some((cut, _)) if flat.chars().count() > max => format!("{}...", &flat[..cut]),
        _ => flat,
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
