use std::fmt;
use std::str::FromStr;

use crate::date_range::Bounds;
use crate::Error;

use super::Query;

/// Market segment the announcements route is filtered by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Index {
    #[default]
    Equities,
    Sme,
    Sse,
    Debt,
    MunicipalBond,
    InvitsReits,
    Mf,
}

impl Index {
    pub const ALL: [Index; 7] = [
        Index::Equities,
        Index::Sme,
        Index::Sse,
        Index::Debt,
        Index::MunicipalBond,
        Index::InvitsReits,
        Index::Mf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Index::Equities => "equities",
            Index::Sme => "sme",
            Index::Sse => "sse",
            Index::Debt => "debt",
            Index::MunicipalBond => "municipalBond",
            Index::InvitsReits => "invitsreits",
            Index::Mf => "mf",
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Index {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Index::ALL
            .iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| Error::UnknownIndex(s.to_string()))
    }
}

/// Parameters for the corporate announcements route.
///
/// `symbol` and `issuer` travel together; the host ignores a symbol
/// without its issuer name.
#[derive(Clone, Debug, Default)]
pub struct AnnouncementQuery {
    pub index: Index,
    pub symbol: Option<String>,
    pub issuer: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

impl AnnouncementQuery {
    pub fn new(index: Index) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    pub fn with_issuer(mut self, symbol: &str, issuer: &str) -> Self {
        self.symbol = Some(symbol.to_string());
        self.issuer = Some(issuer.to_string());
        self
    }

    pub fn with_bounds(mut self, bounds: Option<Bounds>) -> Self {
        if let Some((from, to)) = bounds {
            self.from_date = Some(from);
            self.to_date = Some(to);
        }
        self
    }
}

impl Query for AnnouncementQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("index", self.index.to_string())];
        if let Some(symbol) = &self.symbol {
            pairs.push(("symbol", symbol.clone()));
        }
        if let Some(issuer) = &self.issuer {
            pairs.push(("issuer", issuer.clone()));
        }
        if let (Some(from), Some(to)) = (&self.from_date, &self.to_date) {
            pairs.push(("from_date", from.clone()));
            pairs.push(("to_date", to.clone()));
        }
        pairs
    }
}
