mod search;
pub use self::search::{SearchResponse, SymbolMatch};
