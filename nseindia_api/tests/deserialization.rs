use nseindia_api::types::SearchResponse;

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

#[test]
fn deserialize_search_full() {
    let json = load_fixture("search.json");
    let resp: SearchResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(resp.symbols.len(), 2);

    let infy = &resp.symbols[0];
    assert_eq!(infy.symbol, "INFY");
    assert_eq!(infy.symbol_info.as_deref(), Some("Infosys Limited"));
    assert_eq!(infy.result_sub_type.as_deref(), Some("equity"));
    assert!(infy.extra.contains_key("activeSeries"));
}

#[test]
fn issuer_lookup_requires_exact_symbol() {
    let json = load_fixture("search.json");
    let resp: SearchResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(resp.issuer_for("INFY"), Some("Infosys Limited"));
    assert_eq!(resp.issuer_for("INFYBEES"), Some("Nippon India ETF Infosys"));
    assert_eq!(resp.issuer_for("INF"), None);
    assert_eq!(resp.issuer_for("infy"), None);
}

#[test]
fn deserialize_search_without_symbols() {
    let resp: SearchResponse = serde_json::from_str(r#"{"mfsymbols": []}"#).unwrap();
    assert!(resp.symbols.is_empty());
    assert_eq!(resp.issuer_for("INFY"), None);
}

#[test]
fn announcements_fixture_is_a_list_of_objects() {
    let json = load_fixture("announcements.json");
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let rows = value.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.get("an_dt").is_some()));
}
