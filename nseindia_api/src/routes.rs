//! Route table for the two NSE API endpoints this crate talks to.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::Error;

/// Production host. Every route hangs off this root.
pub const ROOT: &str = "https://www.nseindia.com";

/// Path prefix shared by all API routes.
pub const API_BASE: &str = "/api";

/// Named API routes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// `/api/corporate-announcements`
    CorporateAnnouncements,
    /// `/api/search/autocomplete`
    Search,
}

impl Route {
    /// Short name used by callers (`"ca"`, `"search"`).
    pub fn name(&self) -> &'static str {
        match self {
            Route::CorporateAnnouncements => "ca",
            Route::Search => "search",
        }
    }

    /// Path below [`API_BASE`].
    pub fn suffix(&self) -> &'static str {
        match self {
            Route::CorporateAnnouncements => "/corporate-announcements",
            Route::Search => "/search/autocomplete",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Route {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ca" => Ok(Route::CorporateAnnouncements),
            "search" => Ok(Route::Search),
            _ => Err(()),
        }
    }
}

/// Resolves a short route name or a raw path into an absolute URL string.
///
/// Known names map to their suffix; anything else is appended verbatim
/// after [`API_BASE`].
pub fn route_path(base: &str, route: &str) -> String {
    let base = base.trim_end_matches('/');
    match route.parse::<Route>() {
        Ok(known) => format!("{}{}{}", base, API_BASE, known.suffix()),
        Err(()) => format!("{}{}{}", base, API_BASE, route),
    }
}

/// Same as [`route_path`], parsed into a [`Url`].
pub fn route_url(base: &str, route: &str) -> Result<Url, Error> {
    let url = Url::parse(&route_path(base, route)).map_err(|e| {
        tracing::error!("Invalid URL constructed for route {}: {}", route, e);
        e
    })?;
    Ok(url)
}

/// URL of the host root, used for the session warm-up visit.
pub fn root_url(base: &str) -> Result<Url, Error> {
    Ok(Url::parse(&format!("{}/", base.trim_end_matches('/')))?)
}
