//! Library layer for nsefetch: a blocking NSE India client with a private
//! event loop, self-restarting sessions and announcement reshaping.
//!
//! Wraps the `nseindia_api` crate with a retrying executor, a session
//! manager that re-warms the cookie jar on failure, and a tabular view of
//! the corporate announcements payload.

pub mod announcements;
pub mod background;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod session;
pub mod signals;
pub mod table;

pub use nseindia_api;
pub use nseindia_api::types;
pub use nseindia_api::{
    AnnouncementQuery, DateBound, HttpVersion, Index, Method, Period, RequestOptions, Route,
    SearchQuery,
};

pub use announcements::{AnnouncementRequest, Announcements, NO_DATA_MESSAGE};
pub use background::{BackgroundLoop, GracefulExit};
pub use client::NseFetch;
pub use config::{ClientConfig, Verbosity};
pub use error::NseFetchError;
pub use signals::{Disposition, SignalDispatcher, StopSignal};
pub use table::{AnnouncementRow, AnnouncementTable, TableError};
