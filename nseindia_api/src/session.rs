//! One HTTP session against the NSE host: a cookie-carrying connection pool
//! dressed up as a desktop browser.

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::Method;
use url::Url;

use crate::{
    query::Query,
    routes::root_url,
    user_agent::{browser_headers, get_identity, Identity},
    Error,
};

/// Connect and read timeout for every request on a session.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Protocol negotiation mode for new sessions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HttpVersion {
    /// HTTP/1.1 only.
    Http1Only,
    /// HTTP/2 when the server offers it through ALPN, HTTP/1.1 otherwise.
    #[default]
    Http2,
    /// HTTP/2 without negotiation.
    Http2PriorKnowledge,
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                HttpVersion::Http1Only => "http1",
                HttpVersion::Http2 => "http2",
                HttpVersion::Http2PriorKnowledge => "http2-prior-knowledge",
            }
        )
    }
}

impl FromStr for HttpVersion {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "1.1" | "http1" | "http1.1" => Ok(HttpVersion::Http1Only),
            "2" | "http2" => Ok(HttpVersion::Http2),
            "2-prior-knowledge" | "http2-prior-knowledge" => Ok(HttpVersion::Http2PriorKnowledge),
            _ => Err(()),
        }
    }
}

/// Per-request payload: query params, an urlencoded form, a JSON body and
/// extra headers on top of the session defaults.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    pub params: Vec<(String, String)>,
    pub form: Option<Vec<(String, String)>>,
    pub json: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options carrying the parameters of `query`.
    pub fn from_query(query: &impl Query) -> Self {
        Self {
            params: query
                .pairs()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_form(mut self, form: Vec<(String, String)>) -> Self {
        self.form = Some(form);
        self
    }

    pub fn with_json(mut self, json: serde_json::Value) -> Self {
        self.json = Some(json);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Names of the payload pieces that were actually supplied.
    pub fn present_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if !self.params.is_empty() {
            keys.push("params");
        }
        if self.form.is_some() {
            keys.push("data");
        }
        if self.json.is_some() {
            keys.push("json");
        }
        if !self.headers.is_empty() {
            keys.push("headers");
        }
        keys
    }
}

/// A completed 2xx exchange.
#[derive(Clone, Debug)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn json(&self) -> Result<serde_json::Value, Error> {
        serde_json::from_str(&self.body).map_err(|e| {
            tracing::error!(
                "Failed to parse response: {} | body: {}",
                e,
                truncate_body(&self.body, BODY_SNIPPET)
            );
            Error::Json(e)
        })
    }
}

/// Longest body excerpt kept in errors.
pub const BODY_SNIPPET: usize = 2000;

/// An open connection pool with the browser identity and cookie jar of one
/// visit to the host. Closing it drops the pool; requests already in flight
/// finish on their own handle.
pub struct Session {
    id: u64,
    base: String,
    identity: Identity,
    http: Mutex<Option<reqwest::Client>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("base", &self.base)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Session {
    /// Builds a new session against `base` (the host root, e.g. [`crate::routes::ROOT`]).
    pub fn open(id: u64, base: &str, http_version: HttpVersion) -> Result<Self, Error> {
        let identity = get_identity();
        let builder = reqwest::Client::builder()
            .user_agent(identity.user_agent)
            .default_headers(browser_headers(&identity, base))
            .cookie_store(true)
            .gzip(true)
            .danger_accept_invalid_certs(false)
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(REQUEST_TIMEOUT);
        let builder = match http_version {
            HttpVersion::Http1Only => builder.http1_only(),
            HttpVersion::Http2 => builder,
            HttpVersion::Http2PriorKnowledge => builder.http2_prior_knowledge(),
        };
        let http = builder.build().map_err(|e| {
            tracing::error!("Failed to build HTTP client: {}", e);
            Error::Transport(e)
        })?;
        Ok(Self {
            id,
            base: base.trim_end_matches('/').to_string(),
            identity,
            http: Mutex::new(Some(http)),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn user_agent(&self) -> &'static str {
        self.identity.user_agent
    }

    pub fn is_closed(&self) -> bool {
        self.http
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// Releases the connection pool. Safe to call more than once.
    pub fn close(&self) {
        let released = self.http.lock().unwrap_or_else(|e| e.into_inner()).take();
        if released.is_some() {
            tracing::debug!("Session {} closed", self.id);
        }
    }

    fn client(&self) -> Result<reqwest::Client, Error> {
        self.http
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(Error::SessionClosed(self.id))
    }

    /// Visits the host root so the server hands out its session cookies.
    pub async fn warm_up(&self) -> Result<Reply, Error> {
        let url = root_url(&self.base)?;
        self.send(Method::GET, url, &RequestOptions::default()).await
    }

    /// Sends one request. Non-2xx statuses come back as [`Error::HttpStatus`]
    /// with a truncated body.
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        options: &RequestOptions,
    ) -> Result<Reply, Error> {
        let client = self.client()?;
        let mut request = client.request(method, url);
        if !options.params.is_empty() {
            request = request.query(&options.params);
        }
        if let Some(form) = &options.form {
            request = request.form(form);
        }
        if let Some(json) = &options.json {
            request = request.json(json);
        }
        for (name, value) in options.headers.iter() {
            request = request.header(name.as_str(), value.as_str());
        }

        let resp = request.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: truncate_body(&body, BODY_SNIPPET),
            });
        }

        Ok(Reply {
            status: status.as_u16(),
            body,
        })
    }
}

/// Cuts `body` to at most `max` characters, marking the cut.
pub fn truncate_body(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        None => body.to_string(),
        Some((cut, _)) => format!("{}...[truncated]", &body[..cut]),
    }
}
