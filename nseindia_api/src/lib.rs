//! Wire-level building blocks for the NSE India public JSON API: routes,
//! period resolution, query parameters, browser identity and HTTP sessions.

pub mod date_range;
mod errors;
mod query;
pub mod routes;
pub mod session;
pub mod types;
pub mod user_agent;

pub use self::date_range::{resolve, resolve_at, Bounds, DateBound, Period};
pub use self::errors::Error;
pub use self::query::{AnnouncementQuery, Index, Query, SearchQuery};
pub use self::routes::{Route, API_BASE, ROOT};
pub use self::session::{HttpVersion, Reply, RequestOptions, Session};
pub use reqwest::Method;
