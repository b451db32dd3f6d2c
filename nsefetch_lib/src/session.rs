//! Keeps exactly one live [`Session`] per client and replaces it on demand.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nseindia_api::session::truncate_body;
use nseindia_api::{HttpVersion, Session};

use crate::background::GracefulExit;
use crate::config::ClientConfig;
use crate::error::NseFetchError;

/// Warm-up attempts before the client is declared unusable.
pub const WARMUP_ATTEMPTS: usize = 4;

/// Characters of the warm-up page kept in the log.
const WARMUP_LOG_CHARS: usize = 500;

/// Owner of the client's single HTTP session.
pub struct SessionManager {
    base_url: String,
    http_version: HttpVersion,
    backoff_unit: Duration,
    restart_grace: Duration,
    current: Mutex<Option<Arc<Session>>>,
    next_id: AtomicU64,
    restarts: AtomicUsize,
    ready: AtomicBool,
}

impl SessionManager {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            http_version: config.http_version(),
            backoff_unit: config.backoff_unit(),
            restart_grace: config.restart_grace(),
            current: Mutex::new(None),
            next_id: AtomicU64::new(0),
            restarts: AtomicUsize::new(0),
            ready: AtomicBool::new(false),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The live session, if any.
    pub fn current(&self) -> Option<Arc<Session>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of times a live session was replaced with `restart = true`.
    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }

    /// True once the current session passed its warm-up visit.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn take_current(&self) -> Option<Arc<Session>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// Opens a fresh session and warms it up against the host root.
    ///
    /// With `restart`, the previous session is closed first and the new one
    /// opened after the restart grace period. When the warm-up keeps failing
    /// the whole client is shut down through `exit`.
    pub async fn initialize(
        &self,
        restart: bool,
        exit: &dyn GracefulExit,
    ) -> Result<Arc<Session>, NseFetchError> {
        self.ready.store(false, Ordering::SeqCst);
        if let Some(previous) = self.take_current() {
            tracing::info!("Closing previous session {}", previous.id());
            previous.close();
            if restart {
                self.restarts.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(self.restart_grace).await;
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!("Initializing new session {}", id);
        let session = Arc::new(Session::open(id, &self.base_url, self.http_version)?);
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());

        let mut attempt = 0usize;
        loop {
            match session.warm_up().await {
                Ok(reply) => {
                    tracing::info!(
                        "NSE homepage request succeeded with status code: {}, response text: {}",
                        reply.status,
                        truncate_body(&reply.body, WARMUP_LOG_CHARS)
                    );
                    self.ready.store(true, Ordering::SeqCst);
                    return Ok(session);
                }
                Err(err) if !err.is_retryable() => {
                    tracing::error!("Session {} warm-up failed: {}", id, err);
                    return Err(err.into());
                }
                Err(err) => {
                    tracing::error!(
                        "NSE homepage request failed with status code: {:?}, response text: {}",
                        err.status(),
                        error_body(&err)
                    );
                    tracing::error!("While fetching NSE homepage, an error occurred: {}", err);
                    attempt += 1;
                    if attempt >= WARMUP_ATTEMPTS {
                        tracing::error!(
                            critical = true,
                            attempts = attempt,
                            "Retry limit exhausted, retried {} times but failed",
                            attempt
                        );
                        tracing::info!("Shutting the client down");
                        exit.graceful_exit();
                        return Err(NseFetchError::SessionUnavailable { attempts: attempt });
                    }
                    let delay = self.backoff_unit.saturating_mul(attempt as u32);
                    tracing::info!(
                        "Going to retry after {:.2} seconds, retry no. {}",
                        delay.as_secs_f64(),
                        attempt
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Closes the live session, if any. No new session is opened.
    pub fn close(&self) {
        self.ready.store(false, Ordering::SeqCst);
        if let Some(session) = self.take_current() {
            session.close();
        }
    }
}

/// Body snippet carried by an API error, or an empty string.
pub(crate) fn error_body(err: &nseindia_api::Error) -> &str {
    match err {
        nseindia_api::Error::HttpStatus { body, .. } => body.as_str(),
        _ => "",
    }
}
