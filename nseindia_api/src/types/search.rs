//! Response shapes of the symbol autocomplete route.

use serde::{Deserialize, Serialize};

/// Body returned by `/api/search/autocomplete`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Matching instruments. Missing when nothing matched.
    #[serde(default)]
    pub symbols: Vec<SymbolMatch>,
}

/// One autocomplete hit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SymbolMatch {
    /// Trading symbol, e.g. `INFY`.
    pub symbol: String,

    /// Issuer name the announcements route filters on, e.g. `Infosys Limited`.
    #[serde(default)]
    pub symbol_info: Option<String>,

    #[serde(default)]
    pub result_type: Option<String>,

    #[serde(default)]
    pub result_sub_type: Option<String>,

    /// Fields this crate does not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SearchResponse {
    /// Issuer name of the first hit whose symbol equals `symbol` exactly.
    pub fn issuer_for(&self, symbol: &str) -> Option<&str> {
        self.symbols
            .iter()
            .filter(|m| m.symbol == symbol)
            .find_map(|m| m.symbol_info.as_deref())
    }
}
