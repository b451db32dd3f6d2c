//! The background event loop: one single-threaded Tokio runtime driven by one
//! dedicated OS thread, with a blocking bridge for synchronous callers.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Mutex;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;

use crate::error::NseFetchError;

/// Time outstanding tasks get to unwind once the loop is told to stop.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

/// Something that can tear the whole client down. Called from the loop
/// itself on retry exhaustion, from the signal thread and from callers.
pub trait GracefulExit: Send + Sync {
    fn graceful_exit(&self);
}

/// Owns the event loop thread. Callers schedule work through
/// [`run_blocking`] and wait on it.
///
/// [`run_blocking`]: BackgroundLoop::run_blocking
pub struct BackgroundLoop {
    name: String,
    handle: Handle,
    stop: Mutex<Option<oneshot::Sender<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
    closed: AtomicBool,
}

impl BackgroundLoop {
    /// Builds the runtime and starts the thread that drives it.
    pub fn start(name: &str) -> Result<Self, NseFetchError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let handle = runtime.handle().clone();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let thread_name = name.to_string();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                runtime.block_on(async {
                    let _ = stop_rx.await;
                });
                runtime.shutdown_timeout(SHUTDOWN_GRACE);
                tracing::debug!("{} stopped", thread_name);
            })?;
        let thread_id = thread.thread().id();

        tracing::info!("{} event loop has been initialized", name);
        Ok(Self {
            name: name.to_string(),
            handle,
            stop: Mutex::new(Some(stop_tx)),
            thread: Mutex::new(Some(thread)),
            thread_id,
            closed: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// True when called from the loop thread itself.
    pub fn is_loop_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Schedules `future` on the loop and blocks the calling thread until it
    /// finishes or `timeout` elapses. On timeout the task is aborted.
    pub fn run_blocking<F, T>(&self, future: F, timeout: Duration) -> Result<T, NseFetchError>
    where
        F: Future<Output = Result<T, NseFetchError>> + Send + 'static,
        T: Send + 'static,
    {
        if self.is_closed() {
            return Err(NseFetchError::LoopClosed);
        }
        if self.is_loop_thread() {
            return Err(NseFetchError::InvalidInput(
                "run_blocking called from the event loop thread".into(),
            ));
        }

        let (tx, rx) = mpsc::sync_channel(1);
        let task = self.handle.spawn(async move {
            let _ = tx.send(future.await);
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                tracing::error!(
                    "Work on {} took longer than {:.2} seconds, cancelling the task",
                    self.name,
                    timeout.as_secs_f64()
                );
                task.abort();
                Err(NseFetchError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                if self.is_closed() {
                    Err(NseFetchError::LoopClosed)
                } else {
                    tracing::error!("Task on {} ended without a result", self.name);
                    Err(NseFetchError::TaskFailed(
                        "task panicked or was cancelled".into(),
                    ))
                }
            }
        }
    }

    /// Stops the loop and lets the runtime cancel whatever is still pending.
    /// Idempotent. Joins the thread unless called from the loop itself.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(stop) = self.stop.lock().unwrap_or_else(|e| e.into_inner()).take() {
            let _ = stop.send(());
        }
        if !self.is_loop_thread() {
            let thread = self.thread.lock().unwrap_or_else(|e| e.into_inner()).take();
            if let Some(thread) = thread {
                if thread.join().is_err() {
                    tracing::error!("{} thread panicked during shutdown", self.name);
                }
            }
        }
        tracing::info!("{} event loop closed", self.name);
    }
}

impl Drop for BackgroundLoop {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    #[test]
    fn runs_work_and_returns_result() {
        let bg = BackgroundLoop::start("test_loop").unwrap();
        let out = bg
            .run_blocking(async { Ok::<_, NseFetchError>(21 * 2) }, Duration::from_secs(5))
            .unwrap();
        assert_eq!(out, 42);
    }

    #[test]
    fn work_runs_on_the_loop_thread() {
        let bg = BackgroundLoop::start("named_loop").unwrap();
        let name = bg
            .run_blocking(
                async { Ok(thread::current().name().map(str::to_string)) },
                Duration::from_secs(5),
            )
            .unwrap();
        assert_eq!(name.as_deref(), Some("named_loop"));
        assert!(!bg.is_loop_thread());
    }

    #[test]
    fn spawned_tasks_share_the_loop_thread() {
        let bg = BackgroundLoop::start("spawning_loop").unwrap();
        let name = bg
            .run_blocking(
                async {
                    tokio::spawn(async { thread::current().name().map(str::to_string) })
                        .await
                        .map_err(|e| NseFetchError::TaskFailed(e.to_string()))
                },
                Duration::from_secs(5),
            )
            .unwrap();
        assert_eq!(name.as_deref(), Some("spawning_loop"));
    }

    #[test]
    fn errors_reach_the_caller() {
        let bg = BackgroundLoop::start("err_loop").unwrap();
        let err = bg
            .run_blocking(
                async { Err::<(), _>(NseFetchError::InvalidInput("boom".into())) },
                Duration::from_secs(5),
            )
            .unwrap_err();
        assert!(matches!(err, NseFetchError::InvalidInput(msg) if msg == "boom"));
    }

    #[test]
    fn timeout_cancels_the_task() {
        let bg = BackgroundLoop::start("slow_loop").unwrap();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let err = bg
            .run_blocking(
                async move {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    flag.store(true, Ordering::SeqCst);
                    Ok(())
                },
                Duration::from_millis(50),
            )
            .unwrap_err();
        assert!(matches!(err, NseFetchError::Timeout(_)));

        thread::sleep(Duration::from_millis(500));
        assert!(!finished.load(Ordering::SeqCst));

        // the loop is still usable after a timeout
        let out = bg
            .run_blocking(async { Ok(1) }, Duration::from_secs(5))
            .unwrap();
        assert_eq!(out, 1);
    }

    #[test]
    fn panic_is_reported_as_task_failure() {
        let bg = BackgroundLoop::start("panic_loop").unwrap();
        let err = bg
            .run_blocking(
                async {
                    if true {
                        panic!("task blew up");
                    }
                    Ok(())
                },
                Duration::from_secs(5),
            )
            .unwrap_err();
        assert!(matches!(err, NseFetchError::TaskFailed(_)));
    }

    #[test]
    fn close_is_idempotent() {
        let bg = BackgroundLoop::start("close_loop").unwrap();
        bg.close();
        bg.close();
        assert!(bg.is_closed());
        let err = bg
            .run_blocking(async { Ok(()) }, Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, NseFetchError::LoopClosed));
    }

    #[test]
    fn close_from_the_loop_thread_does_not_deadlock() {
        let bg = Arc::new(BackgroundLoop::start("self_close_loop").unwrap());
        let inner = bg.clone();
        let out = bg.run_blocking(
            async move {
                inner.close();
                Ok(inner.is_closed())
            },
            Duration::from_secs(5),
        );
        assert!(matches!(out, Ok(true)));
        assert!(bg.is_closed());
    }

    #[test]
    fn run_blocking_from_loop_thread_is_rejected() {
        let bg = Arc::new(BackgroundLoop::start("reentrant_loop").unwrap());
        let inner = bg.clone();
        let out = bg
            .run_blocking(
                async move {
                    let nested = inner.run_blocking(async { Ok(()) }, Duration::from_secs(1));
                    Ok(matches!(nested, Err(NseFetchError::InvalidInput(_))))
                },
                Duration::from_secs(5),
            )
            .unwrap();
        assert!(out);
    }
}
