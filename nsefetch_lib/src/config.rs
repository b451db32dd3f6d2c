//! Client configuration, fixed at construction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use nseindia_api::{HttpVersion, ROOT};

use crate::error::NseFetchError;

/// How much the client logs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// No subscriber is installed by the client.
    Quiet,
    #[default]
    Info,
    Debug,
}

impl Verbosity {
    /// Filter directive used when `RUST_LOG` is not set.
    pub fn directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
        })
    }
}

impl FromStr for Verbosity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "warn" | "off" | "0" => Ok(Verbosity::Quiet),
            "info" | "1" => Ok(Verbosity::Info),
            "debug" | "verbose" | "2" => Ok(Verbosity::Debug),
            _ => Err(()),
        }
    }
}

/// Settings for one [`crate::NseFetch`] instance.
///
/// Built with [`ClientConfig::default`] or [`ClientConfig::from_env`] and
/// the `with_*` methods; read-only once handed to the client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    max_retries: usize,
    verbosity: Verbosity,
    http_version: HttpVersion,
    base_url: String,
    backoff_unit: Duration,
    restart_grace: Duration,
    init_timeout: Duration,
    log_dir: PathBuf,
    handle_signals: bool,
    exit_on_signal: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            verbosity: Verbosity::Info,
            http_version: HttpVersion::default(),
            base_url: ROOT.to_string(),
            backoff_unit: Duration::from_secs(1),
            restart_grace: Duration::from_millis(250),
            init_timeout: Duration::from_secs(30),
            log_dir: PathBuf::from("logs"),
            handle_signals: true,
            exit_on_signal: true,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `NSEFETCH_*` environment variables. Unset or
    /// unparsable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: env_parse("NSEFETCH_MAX_RETRIES", defaults.max_retries),
            verbosity: env_parse("NSEFETCH_VERBOSE", defaults.verbosity),
            http_version: env_parse("NSEFETCH_HTTP_VERSION", defaults.http_version),
            base_url: std::env::var("NSEFETCH_BASE_URL").unwrap_or(defaults.base_url),
            backoff_unit: Duration::from_millis(env_parse(
                "NSEFETCH_BACKOFF_MS",
                defaults.backoff_unit.as_millis() as u64,
            )),
            log_dir: std::env::var("NSEFETCH_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            ..defaults
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_http_version(mut self, http_version: HttpVersion) -> Self {
        self.http_version = http_version;
        self
    }

    /// Points the client at another host. Used for testing with wiremock.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Unit of the incremental backoff: attempt `n` sleeps `n` units.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Pause between closing a session and opening its replacement.
    pub fn with_restart_grace(mut self, grace: Duration) -> Self {
        self.restart_grace = grace;
        self
    }

    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Whether the client listens for termination signals at all.
    pub fn with_signal_handling(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    /// Whether a termination signal ends the process after the client shut down.
    pub fn with_exit_on_signal(mut self, exit: bool) -> Self {
        self.exit_on_signal = exit;
        self
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn http_version(&self) -> HttpVersion {
        self.http_version
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn backoff_unit(&self) -> Duration {
        self.backoff_unit
    }

    pub fn restart_grace(&self) -> Duration {
        self.restart_grace
    }

    pub fn init_timeout(&self) -> Duration {
        self.init_timeout
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn handle_signals(&self) -> bool {
        self.handle_signals
    }

    pub fn exit_on_signal(&self) -> bool {
        self.exit_on_signal
    }

    /// Sleep before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: usize) -> Duration {
        self.backoff_unit
            .saturating_mul(u32::try_from(attempt).unwrap_or(u32::MAX))
    }

    /// How long a blocking call waits for one fetch: a full request timeout
    /// for every attempt plus one spare.
    pub fn request_timeout(&self) -> Duration {
        let slots = u32::try_from(self.max_retries.saturating_add(1)).unwrap_or(u32::MAX);
        nseindia_api::session::REQUEST_TIMEOUT.saturating_mul(slots)
    }

    pub fn validate(&self) -> Result<(), NseFetchError> {
        if self.max_retries == 0 {
            return Err(NseFetchError::InvalidInput(
                "max_retries must be at least 1".into(),
            ));
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(NseFetchError::InvalidInput(format!(
                "base_url is not a valid URL: {}",
                self.base_url
            )));
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<T>().ok())
        .unwrap_or(default)
}
