//! Retrying request executor: every failed attempt is followed by a fresh
//! session, since the host ties its header checks to the live session.

use std::sync::Arc;

use nseindia_api::routes::route_url;
use nseindia_api::session::{truncate_body, BODY_SNIPPET};
use nseindia_api::{Method, RequestOptions, Session};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::background::GracefulExit;
use crate::config::ClientConfig;
use crate::error::NseFetchError;
use crate::session::{error_body, SessionManager};

/// Issues requests on the managed session, one at a time.
pub struct Executor {
    config: ClientConfig,
    sessions: SessionManager,
    gate: Mutex<()>,
}

impl Executor {
    pub fn new(config: ClientConfig) -> Self {
        let sessions = SessionManager::new(&config);
        Self {
            config,
            sessions,
            gate: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub async fn get(
        &self,
        route: &str,
        options: &RequestOptions,
        exit: &dyn GracefulExit,
    ) -> Result<Value, NseFetchError> {
        self.request(Method::GET, route, options, exit).await
    }

    pub async fn post(
        &self,
        route: &str,
        options: &RequestOptions,
        exit: &dyn GracefulExit,
    ) -> Result<Value, NseFetchError> {
        self.request(Method::POST, route, options, exit).await
    }

    pub async fn put(
        &self,
        route: &str,
        options: &RequestOptions,
        exit: &dyn GracefulExit,
    ) -> Result<Value, NseFetchError> {
        self.request(Method::PUT, route, options, exit).await
    }

    pub async fn delete(
        &self,
        route: &str,
        options: &RequestOptions,
        exit: &dyn GracefulExit,
    ) -> Result<Value, NseFetchError> {
        self.request(Method::DELETE, route, options, exit).await
    }

    /// Sends `method` to `route` (a short route name or a raw path under
    /// `/api`) and returns the decoded JSON body.
    ///
    /// Transport failures and non-2xx statuses are retried up to
    /// `max_retries` attempts in total, sleeping `attempt` backoff units and
    /// restarting the session between attempts. When the last attempt fails
    /// the client is shut down through `exit`.
    pub async fn request(
        &self,
        method: Method,
        route: &str,
        options: &RequestOptions,
        exit: &dyn GracefulExit,
    ) -> Result<Value, NseFetchError> {
        let url = route_url(self.sessions.base_url(), route)?;
        let _turn = self.gate.lock().await;

        let max_retries = self.config.max_retries();
        let mut attempt = 0usize;
        loop {
            let session = self.live_session()?;
            tracing::info!("Initializing request for endpoint: {}, method: {}", url, method);
            log_options(options);

            match session.send(method.clone(), url.clone(), options).await {
                Ok(reply) => {
                    tracing::info!(
                        "Method: {}, request for endpoint: {} succeeded with status code: {}, response text: {}",
                        method,
                        url,
                        reply.status,
                        truncate_body(&reply.body, BODY_SNIPPET)
                    );
                    return Ok(reply.json()?);
                }
                Err(err) if !err.is_retryable() => {
                    tracing::error!("Method: {}, request for endpoint: {} failed: {}", method, url, err);
                    return Err(err.into());
                }
                Err(err) => {
                    tracing::error!(
                        "Method: {}, request for endpoint: {} failed with status code: {:?}, response text: {}",
                        method,
                        url,
                        err.status(),
                        error_body(&err)
                    );
                    tracing::error!("While requesting {}, an error occurred: {}", url, err);
                    attempt += 1;
                    if attempt >= max_retries {
                        tracing::error!(
                            critical = true,
                            attempts = attempt,
                            "Retry limit exhausted, retried {} times but failed",
                            attempt
                        );
                        tracing::info!("Shutting the client down");
                        exit.graceful_exit();
                        return Err(NseFetchError::RetriesExhausted {
                            attempts: attempt,
                            last: err,
                        });
                    }
                    let delay = self.config.backoff(attempt);
                    tracing::info!(
                        "Going to retry after {:.2} seconds, retry no. {}",
                        delay.as_secs_f64(),
                        attempt
                    );
                    tokio::time::sleep(delay).await;
                    self.sessions.initialize(true, exit).await?;
                }
            }
        }
    }

    fn live_session(&self) -> Result<Arc<Session>, NseFetchError> {
        match self.sessions.current() {
            Some(session) if !session.is_closed() => Ok(session),
            _ => Err(NseFetchError::LoopClosed),
        }
    }
}

fn log_options(options: &RequestOptions) {
    for key in options.present_keys() {
        match key {
            "params" => tracing::info!("Request params: {:?}", options.params),
            "data" => tracing::info!("Request data: {:?}", options.form),
            "json" => tracing::info!("Request json: {:?}", options.json),
            "headers" => tracing::debug!("Request headers: {:?}", options.headers),
            _ => {}
        }
    }
}
