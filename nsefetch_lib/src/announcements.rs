//! Corporate announcement fetching: optional symbol lookup, date range, and
//! reshaping of the payload into an [`AnnouncementTable`].

use nseindia_api::types::SearchResponse;
use nseindia_api::{
    resolve, AnnouncementQuery, DateBound, Index, Period, RequestOptions, Route, SearchQuery,
};
use serde_json::Value;

use crate::background::GracefulExit;
use crate::error::NseFetchError;
use crate::executor::Executor;
use crate::table::AnnouncementTable;

/// Returned instead of a table when the host sent nothing usable.
pub const NO_DATA_MESSAGE: &str = "It's likely that no events are there for the selected periods\n\
     or nseindia.com has not returned back event calendar data!";

/// What to fetch. Defaults to every forthcoming equities announcement.
#[derive(Clone, Debug, Default)]
pub struct AnnouncementRequest {
    pub index: Index,
    pub period: Period,
    pub symbol: Option<String>,
    pub from_date: Option<DateBound>,
    pub to_date: Option<DateBound>,
}

impl AnnouncementRequest {
    pub fn new(index: Index, period: Period) -> Self {
        Self {
            index,
            period,
            ..Default::default()
        }
    }

    pub fn with_symbol(mut self, symbol: &str) -> Self {
        self.symbol = Some(symbol.to_string());
        self
    }

    /// Explicit bounds; only valid together with [`Period::Custom`].
    pub fn with_range(mut self, from: impl Into<DateBound>, to: impl Into<DateBound>) -> Self {
        self.from_date = Some(from.into());
        self.to_date = Some(to.into());
        self
    }

    /// Query for the announcements route with the date range resolved.
    /// Fails with a configuration error before any I/O happens.
    pub fn to_query(&self) -> Result<AnnouncementQuery, NseFetchError> {
        let bounds = resolve(self.period, self.from_date.clone(), self.to_date.clone())?;
        Ok(AnnouncementQuery::new(self.index).with_bounds(bounds))
    }
}

/// Outcome of a fetch that reached the host.
#[derive(Clone, Debug, PartialEq)]
pub enum Announcements {
    Table(AnnouncementTable),
    /// No usable rows; carries a message for the caller to show.
    NoData(String),
}

impl Announcements {
    pub fn table(&self) -> Option<&AnnouncementTable> {
        match self {
            Announcements::Table(table) => Some(table),
            Announcements::NoData(_) => None,
        }
    }

    pub fn into_table(self) -> Option<AnnouncementTable> {
        match self {
            Announcements::Table(table) => Some(table),
            Announcements::NoData(_) => None,
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Announcements::Table(_))
    }
}

/// Reshapes a raw payload: a non-empty list of objects with readable
/// `an_dt` values becomes a table, anything else the no-data message.
pub fn reshape(payload: Value) -> Announcements {
    match AnnouncementTable::from_value(payload) {
        Ok(table) => Announcements::Table(table),
        Err(reason) => {
            tracing::error!("{} ({})", NO_DATA_MESSAGE, reason);
            Announcements::NoData(NO_DATA_MESSAGE.to_string())
        }
    }
}

/// Issuer name the host files announcements of `symbol` under, if the
/// autocomplete route knows the symbol.
pub async fn get_issuer(
    executor: &Executor,
    exit: &dyn GracefulExit,
    symbol: &str,
) -> Result<Option<String>, NseFetchError> {
    let options = RequestOptions::from_query(&SearchQuery::new(symbol));
    let data = executor.get(Route::Search.name(), &options, exit).await?;
    match serde_json::from_value::<SearchResponse>(data) {
        Ok(resp) => Ok(resp.issuer_for(symbol).map(str::to_string)),
        Err(e) => {
            tracing::warn!("Unexpected search response for {}: {}", symbol, e);
            Ok(None)
        }
    }
}

/// Fetches announcements for an already-resolved `query`. With a `symbol`
/// the issuer is looked up first; an unknown symbol yields `Ok(None)`.
pub async fn fetch_corporate_announcement(
    executor: &Executor,
    exit: &dyn GracefulExit,
    query: AnnouncementQuery,
    symbol: Option<&str>,
) -> Result<Option<Announcements>, NseFetchError> {
    let query = match symbol {
        Some(symbol) => match get_issuer(executor, exit, symbol).await? {
            Some(issuer) => query.with_issuer(symbol, &issuer),
            None => {
                tracing::error!("Issuer details for symbol: {} not found", symbol);
                return Ok(None);
            }
        },
        None => query,
    };

    let options = RequestOptions::from_query(&query);
    let data = executor
        .get(Route::CorporateAnnouncements.name(), &options, exit)
        .await?;
    Ok(Some(reshape(data)))
}
