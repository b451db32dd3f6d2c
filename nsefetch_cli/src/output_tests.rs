use super::*;

fn load_announcements_fixture() -> AnnouncementTable {
    let json_str = include_str!("../../nsefetch_lib/tests/fixtures/announcements.json");
    let payload: serde_json::Value = serde_json::from_str(json_str).unwrap();
    AnnouncementTable::from_value(payload).unwrap()
}

fn load_search_fixture() -> SearchResponse {
    let json_str = include_str!("../../nsefetch_lib/tests/fixtures/search.json");
    serde_json::from_str(json_str).unwrap()
}

// -- format parsing --

#[test]
fn test_output_format_parse() {
    assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
    assert_eq!(OutputFormat::parse("CSV"), OutputFormat::Csv);
    assert_eq!(OutputFormat::parse("md"), OutputFormat::Markdown);
    assert_eq!(OutputFormat::parse("whatever"), OutputFormat::Table);
}

// -- shorten --

#[test]
fn test_shorten_keeps_short_text() {
    assert_eq!(shorten("Infosys Limited", 60), "Infosys Limited");
}

#[test]
fn test_shorten_flattens_whitespace() {
    assert_eq!(shorten("a\n  b\tc", 60), "a b c");
}

#[test]
fn test_shorten_marks_cut() {
    assert_eq!(shorten("abcdefghij", 8), "abcde...");
    assert_eq!(shorten("abcdefgh", 8), "abcdefgh");
}

// -- announcement preview --

#[test]
fn test_preview_header_has_index_first() {
    let table = load_announcements_fixture();
    let rendered = build_preview(&table, 10).to_string();
    let header = rendered.lines().nth(1).unwrap();
    let an_dt = header.find("an_dt").unwrap();
    let symbol = header.find("symbol").unwrap();
    assert!(an_dt < symbol);
    assert!(header.contains("sm_name"));
    assert!(!header.contains("sm_isin"));
}

#[test]
fn test_preview_rows_are_oldest_first() {
    let table = load_announcements_fixture();
    let rendered = build_preview(&table, 10).to_string();
    let first = rendered.find("2024-03-01 09:15:01").unwrap();
    let second = rendered.find("2024-03-02 18:30:12").unwrap();
    assert!(first < second);
}

#[test]
fn test_preview_limit_keeps_latest() {
    let table = load_announcements_fixture();
    let rendered = build_preview(&table, 1).to_string();
    assert!(rendered.contains("2024-03-02 18:30:12"));
    assert!(!rendered.contains("2024-03-01 09:15:01"));
}

#[test]
fn test_preview_markdown_style() {
    let table = load_announcements_fixture();
    let mut preview = build_preview(&table, 10);
    preview.with(Style::markdown());
    let rendered = preview.to_string();
    assert!(rendered.starts_with("| an_dt"));
    assert!(rendered.lines().nth(1).unwrap().starts_with("|-"));
}

// -- symbol rows --

#[test]
fn test_build_symbol_rows() {
    let rows = build_symbol_rows(&load_search_fixture());
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].symbol, "INFY");
    assert_eq!(rows[0].issuer, "Infosys Limited");
    assert_eq!(rows[1].kind, "etf");
}

#[test]
fn test_symbol_table_headers() {
    let rendered = Table::new(build_symbol_rows(&load_search_fixture())).to_string();
    assert!(rendered.contains("Symbol"));
    assert!(rendered.contains("Issuer"));
    assert!(rendered.contains("Nippon India ETF Infosys"));
}
