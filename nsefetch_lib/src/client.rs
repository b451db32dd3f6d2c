//! Synchronous client facade: owns the background loop and the executor and
//! bridges every call onto the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use nseindia_api::{Method, RequestOptions, Route, SearchQuery};
use serde_json::Value;
use tracing_appender::non_blocking::WorkerGuard;

use crate::announcements::{
    fetch_corporate_announcement, get_issuer, AnnouncementRequest, Announcements,
};
use crate::background::{BackgroundLoop, GracefulExit};
use crate::config::ClientConfig;
use crate::error::NseFetchError;
use crate::executor::Executor;
use crate::logging;
use crate::signals;

/// Name of the event loop thread.
pub const LOOP_NAME: &str = "NseFetch_event_thread";

/// State shared between the caller-facing handle and work running on the loop.
struct Shared {
    executor: Executor,
    background: BackgroundLoop,
    closed: AtomicBool,
    signal_route: Mutex<Option<u64>>,
}

impl GracefulExit for Shared {
    fn graceful_exit(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Closing NseFetch client");
        let route = self
            .signal_route
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(id) = route {
            signals::deregister(id);
        }
        self.executor.sessions().close();
        self.background.close();
    }
}

/// Blocking client for NSE India corporate announcements.
///
/// Construction opens and warms up a session; every later call is scheduled
/// on a private event loop thread and waited on. Once closed (explicitly, on
/// a termination signal or after the retry budget ran out) every call fails
/// with [`NseFetchError::LoopClosed`].
pub struct NseFetch {
    shared: Arc<Shared>,
    _log_guard: Option<WorkerGuard>,
}

impl NseFetch {
    pub fn new(config: ClientConfig) -> Result<Self, NseFetchError> {
        config.validate()?;
        let log_guard = logging::init(config.verbosity(), config.log_dir())?;

        let background = BackgroundLoop::start(LOOP_NAME)?;
        let shared = Arc::new(Shared {
            executor: Executor::new(config),
            background,
            closed: AtomicBool::new(false),
            signal_route: Mutex::new(None),
        });

        if shared.executor.config().handle_signals() {
            install_signal_routing(&shared);
        }

        let init_timeout = shared.executor.config().init_timeout();
        let task = shared.clone();
        let init = shared.background.run_blocking(
            async move {
                task.executor
                    .sessions()
                    .initialize(false, &*task)
                    .await
                    .map(|_| ())
            },
            init_timeout,
        );
        if let Err(e) = init {
            tracing::error!("Failed to initialize the client: {}", e);
            shared.graceful_exit();
            return Err(e);
        }

        Ok(Self {
            shared,
            _log_guard: log_guard,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        self.shared.executor.config()
    }

    /// Corporate announcements for `request`.
    ///
    /// The date range is resolved before anything is scheduled, so a bad
    /// period/bounds combination fails without touching the network.
    /// `Ok(None)` means the symbol is unknown to the host.
    pub fn get_corporate_announcement(
        &self,
        request: &AnnouncementRequest,
    ) -> Result<Option<Announcements>, NseFetchError> {
        let query = request.to_query()?;
        let symbol = request.symbol.clone();
        self.run(move |shared| async move {
            fetch_corporate_announcement(&shared.executor, &*shared, query, symbol.as_deref())
                .await
        })
    }

    /// Raw response of the autocomplete route for `q`.
    pub fn search(&self, q: &str) -> Result<Value, NseFetchError> {
        let options = RequestOptions::from_query(&SearchQuery::new(q));
        self.request(Method::GET, Route::Search.name(), options)
    }

    /// Issuer name the host files `symbol` under.
    pub fn issuer_for(&self, symbol: &str) -> Result<Option<String>, NseFetchError> {
        let symbol = symbol.to_string();
        self.run(move |shared| async move {
            get_issuer(&shared.executor, &*shared, &symbol).await
        })
    }

    /// Sends an arbitrary request through the retrying executor. `route` is
    /// a short route name or a path under the API base.
    pub fn request(
        &self,
        method: Method,
        route: &str,
        options: RequestOptions,
    ) -> Result<Value, NseFetchError> {
        let route = route.to_string();
        self.run(move |shared| async move {
            shared
                .executor
                .request(method, &route, &options, &*shared)
                .await
        })
    }

    /// Times the session has been replaced after a failed request.
    pub fn session_restarts(&self) -> usize {
        self.shared.executor.sessions().restarts()
    }

    /// Id of the live session, if one is open.
    pub fn session_id(&self) -> Option<u64> {
        self.shared
            .executor
            .sessions()
            .current()
            .filter(|s| !s.is_closed())
            .map(|s| s.id())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst) || self.shared.background.is_closed()
    }

    /// Closes the session and stops the event loop. Idempotent.
    pub fn close(&self) {
        self.shared.graceful_exit();
    }

    fn run<F, Fut, T>(&self, work: F) -> Result<T, NseFetchError>
    where
        F: FnOnce(Arc<Shared>) -> Fut,
        Fut: std::future::Future<Output = Result<T, NseFetchError>> + Send + 'static,
        T: Send + 'static,
    {
        if self.is_closed() {
            return Err(NseFetchError::LoopClosed);
        }
        let timeout = self.config().request_timeout();
        self.shared
            .background
            .run_blocking(work(self.shared.clone()), timeout)
    }
}

impl Drop for NseFetch {
    fn drop(&mut self) {
        self.close();
    }
}

/// Routes termination signals to this client through the process-wide
/// dispatcher. The route holds only a `Weak`, and `graceful_exit` removes it.
fn install_signal_routing(shared: &Arc<Shared>) {
    let weak: Weak<Shared> = Arc::downgrade(shared);
    let exit_process = shared.executor.config().exit_on_signal();
    let id = signals::register(exit_process, move |signal| match weak.upgrade() {
        Some(shared) if !shared.closed.load(Ordering::SeqCst) => {
            tracing::info!("Received {}, shutting down", signal);
            shared.graceful_exit();
            true
        }
        _ => false,
    });
    *shared
        .signal_route
        .lock()
        .unwrap_or_else(|e| e.into_inner()) = Some(id);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::Verbosity;

    fn start_mock() -> (tokio::runtime::Runtime, MockServer) {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let server = rt.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
                .mount(&server)
                .await;
            server
        });
        (rt, server)
    }

    fn config(server: &MockServer) -> ClientConfig {
        ClientConfig::default()
            .with_base_url(&server.uri())
            .with_verbosity(Verbosity::Quiet)
            .with_backoff_unit(Duration::from_millis(1))
            .with_restart_grace(Duration::from_millis(1))
            .with_signal_handling(false)
            .with_http_version(nseindia_api::HttpVersion::Http1Only)
    }

    #[test]
    fn invalid_config_never_starts() {
        let err = NseFetch::new(ClientConfig::default().with_max_retries(0)).err();
        assert!(matches!(err, Some(NseFetchError::InvalidInput(_))));
    }

    #[test]
    fn close_is_idempotent_and_refuses_work() {
        let (_rt, server) = start_mock();
        let client = NseFetch::new(config(&server)).unwrap();
        assert_eq!(client.session_id(), Some(1));

        client.close();
        client.close();
        assert!(client.is_closed());
        assert_eq!(client.session_id(), None);
        assert!(matches!(client.search("INFY"), Err(NseFetchError::LoopClosed)));
    }

    #[test]
    fn closing_gives_the_signal_route_back() {
        let (_rt, server) = start_mock();
        let client = NseFetch::new(
            config(&server)
                .with_signal_handling(true)
                .with_exit_on_signal(false),
        )
        .unwrap();
        let id = client.shared.signal_route.lock().unwrap().expect("route");

        client.close();
        assert!(client.shared.signal_route.lock().unwrap().is_none());
        assert!(!signals::deregister(id));
    }

    #[test]
    fn bad_custom_range_fails_before_io() {
        let (rt, server) = start_mock();
        let client = NseFetch::new(config(&server)).unwrap();
        let request = AnnouncementRequest::new(
            nseindia_api::Index::Equities,
            nseindia_api::Period::Custom,
        );
        let err = client.get_corporate_announcement(&request).unwrap_err();
        assert!(matches!(
            err,
            NseFetchError::Api(nseindia_api::Error::InvalidDateRange(_))
        ));

        let received = rt.block_on(server.received_requests()).unwrap();
        assert_eq!(received.len(), 1, "only the warm-up visit");
    }
}
