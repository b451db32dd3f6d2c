//! Process-wide routing of termination signals to live clients.
//!
//! One listener thread owns the OS handlers for the life of the process.
//! Clients register a route on construction and drop it when they close.
//! A signal that arrives while nothing is registered ends the process with
//! the status the default disposition would have produced.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use tokio::runtime::Builder;

/// Name of the thread that owns the signal handlers.
pub const SIGNAL_THREAD: &str = "NseFetch_signal_thread";

const READY_TIMEOUT: Duration = Duration::from_secs(5);

static DISPATCHER: OnceLock<SignalDispatcher> = OnceLock::new();
static LISTENING: OnceLock<bool> = OnceLock::new();

/// Signals that shut the clients down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    Hangup,
    Interrupt,
    Quit,
    Terminate,
}

impl StopSignal {
    pub fn name(self) -> &'static str {
        match self {
            StopSignal::Hangup => "SIGHUP",
            StopSignal::Interrupt => "SIGINT",
            StopSignal::Quit => "SIGQUIT",
            StopSignal::Terminate => "SIGTERM",
        }
    }

    pub fn number(self) -> i32 {
        match self {
            StopSignal::Hangup => 1,
            StopSignal::Interrupt => 2,
            StopSignal::Quit => 3,
            StopSignal::Terminate => 15,
        }
    }
}

/// What the listener does once a signal has been routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// At least one client took the signal and the process keeps running.
    Handled,
    /// End the process with this status.
    Exit(i32),
}

type Callback = Box<dyn Fn(&'static str) -> bool + Send + Sync>;

struct Route {
    exit_process: bool,
    on_signal: Callback,
}

/// Registry of live routes. Every signal drains it: each route fires once.
#[derive(Default)]
pub struct SignalDispatcher {
    routes: Mutex<HashMap<u64, Route>>,
    next_id: AtomicU64,
}

impl SignalDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route and returns its id. `on_signal` reports whether it shut
    /// anything down; a route whose client is already gone returns false.
    pub fn register<F>(&self, exit_process: bool, on_signal: F) -> u64
    where
        F: Fn(&'static str) -> bool + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.lock().insert(
            id,
            Route {
                exit_process,
                on_signal: Box::new(on_signal),
            },
        );
        id
    }

    /// Removes a route. False when it was never registered or already fired.
    pub fn deregister(&self, id: u64) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fires every registered route. Callbacks run without the registry lock
    /// held, so they may deregister themselves.
    pub fn dispatch(&self, signal: StopSignal) -> Disposition {
        let routes: Vec<Route> = self.lock().drain().map(|(_, route)| route).collect();

        let mut handled = false;
        let mut exit_process = false;
        for route in routes {
            if (route.on_signal)(signal.name()) {
                handled = true;
                exit_process |= route.exit_process;
            }
        }

        match (handled, exit_process) {
            (false, _) => Disposition::Exit(128 + signal.number()),
            (true, true) => Disposition::Exit(0),
            (true, false) => Disposition::Handled,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Route>> {
        self.routes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// The process-wide dispatcher.
pub fn dispatcher() -> &'static SignalDispatcher {
    DISPATCHER.get_or_init(SignalDispatcher::new)
}

/// Registers a route with the process-wide dispatcher, starting the listener
/// on first use. Returns once the OS handlers are installed.
pub fn register<F>(exit_process: bool, on_signal: F) -> u64
where
    F: Fn(&'static str) -> bool + Send + Sync + 'static,
{
    let dispatcher = dispatcher();
    LISTENING.get_or_init(|| start_listener(dispatcher));
    dispatcher.register(exit_process, on_signal)
}

pub fn deregister(id: u64) -> bool {
    dispatcher().deregister(id)
}

/// Routes registered with the process-wide dispatcher.
pub fn registered() -> usize {
    dispatcher().len()
}

fn start_listener(dispatcher: &'static SignalDispatcher) -> bool {
    let (ready_tx, ready_rx) = mpsc::sync_channel::<std::io::Result<()>>(1);
    let spawned = thread::Builder::new()
        .name(SIGNAL_THREAD.to_string())
        .spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            runtime.block_on(listen(dispatcher, ready_tx));
        });
    if let Err(e) = spawned {
        tracing::error!("Failed to start {}: {}", SIGNAL_THREAD, e);
        return false;
    }

    match ready_rx.recv_timeout(READY_TIMEOUT) {
        Ok(Ok(())) => {
            tracing::debug!("{} is listening", SIGNAL_THREAD);
            true
        }
        Ok(Err(e)) => {
            tracing::error!("Failed to install signal handlers: {}", e);
            false
        }
        Err(_) => {
            tracing::error!("{} did not report ready", SIGNAL_THREAD);
            false
        }
    }
}

fn route(dispatcher: &SignalDispatcher, signal: StopSignal) {
    tracing::warn!("Received {}", signal.name());
    match dispatcher.dispatch(signal) {
        Disposition::Handled => {}
        Disposition::Exit(code) => {
            tracing::info!("Exiting with status {}", code);
            std::process::exit(code);
        }
    }
}

#[cfg(unix)]
async fn listen(dispatcher: &'static SignalDispatcher, ready: SyncSender<std::io::Result<()>>) {
    use tokio::signal::unix::{signal, SignalKind};

    let installed = (|| {
        Ok::<_, std::io::Error>((
            signal(SignalKind::hangup())?,
            signal(SignalKind::interrupt())?,
            signal(SignalKind::quit())?,
            signal(SignalKind::terminate())?,
        ))
    })();
    let (mut hangup, mut interrupt, mut quit, mut terminate) = match installed {
        Ok(streams) => {
            let _ = ready.send(Ok(()));
            streams
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    loop {
        let signal = tokio::select! {
            _ = hangup.recv() => StopSignal::Hangup,
            _ = interrupt.recv() => StopSignal::Interrupt,
            _ = quit.recv() => StopSignal::Quit,
            _ = terminate.recv() => StopSignal::Terminate,
        };
        route(dispatcher, signal);
    }
}

#[cfg(not(unix))]
async fn listen(dispatcher: &'static SignalDispatcher, ready: SyncSender<std::io::Result<()>>) {
    let _ = ready.send(Ok(()));
    loop {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        route(dispatcher, StopSignal::Interrupt);
    }
}
