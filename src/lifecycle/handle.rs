//! Server handle: start, shutdown and the lifecycle flag.
//!
//! # Responsibilities
//! - Run the listener on its own thread with a current-thread runtime
//! - Make `start` synchronous: wait for "bound" or "bind failed"
//! - Stop exactly once, whichever caller gets there first
//!
//! # Design Decisions
//! - The rendezvous is a `std::sync::mpsc::sync_channel(1)`; the listener
//!   never blocks on it and the caller never needs a runtime
//! - Blocking mode runs the same listener code on the caller's thread and
//!   installs a SIGINT/SIGTERM trigger

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info, warn};

use super::signals;
use super::Shutdown;
use crate::config::{validate_http, HttpConfig};
use crate::error::GatewayError;
use crate::http::{self, AppState};
use crate::net::listener;
use crate::store::DocumentStore;

/// How long shutdown waits for WebSocket sessions to send their close frame.
const SESSION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

type ReadySender = SyncSender<Result<SocketAddr, GatewayError>>;
type ReadyReceiver = Receiver<Result<SocketAddr, GatewayError>>;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl LifecycleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => LifecycleState::Starting,
            2 => LifecycleState::Running,
            3 => LifecycleState::Stopping,
            _ => LifecycleState::Stopped,
        }
    }
}

#[derive(Debug)]
struct LifecycleFlag(AtomicU8);

impl LifecycleFlag {
    fn new() -> Self {
        Self(AtomicU8::new(LifecycleState::Stopped as u8))
    }

    fn load(&self) -> LifecycleState {
        LifecycleState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A running gateway instance. Dropping the handle shuts it down.
#[derive(Debug)]
pub struct ServerHandle {
    flag: Arc<LifecycleFlag>,
    last_error: Arc<Mutex<Option<String>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    shutdown: Shutdown,
    local_addr: SocketAddr,
}

impl ServerHandle {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> LifecycleState {
        self.flag.load()
    }

    /// Last listener failure recorded after a successful start.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.last_error).clone()
    }

    /// Stop accepting, close connections and join the listener thread.
    ///
    /// Idempotent: only the first caller performs the stop sequence.
    pub fn shutdown(&self) {
        if !self.flag.transition(LifecycleState::Running, LifecycleState::Stopping) {
            // A listener that stopped on its own still needs joining.
            self.join_worker();
            return;
        }
        info!(address = %self.local_addr, "Shutting down gateway");
        self.shutdown.trigger();
        self.join_worker();
        self.flag.transition(LifecycleState::Stopping, LifecycleState::Stopped);
        info!("Gateway stopped");
    }

    fn join_worker(&self) {
        let worker = lock(&self.worker).take();
        let Some(worker) = worker else {
            return;
        };
        if worker.thread().id() == thread::current().id() {
            warn!("shutdown called from the listener thread, not joining");
        } else if worker.join().is_err() {
            let message = "listener thread panicked".to_string();
            error!(error = %message, "Listener thread did not exit cleanly");
            *lock(&self.last_error) = Some(message);
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start the gateway with its own shutdown coordinator.
///
/// Returns `Ok(None)` when `config.enabled` is false and
/// [`GatewayError::InvalidConfig`] when it fails validation. In blocking mode the
/// call returns only after the listener stopped (SIGINT/SIGTERM), and must
/// not be made from inside an async runtime.
pub fn start<S: DocumentStore>(
    store: Arc<S>,
    config: HttpConfig,
) -> Result<Option<ServerHandle>, GatewayError> {
    start_with_shutdown(store, config, Shutdown::new())
}

/// Start the gateway, stopping when `shutdown` is triggered.
pub fn start_with_shutdown<S: DocumentStore>(
    store: Arc<S>,
    config: HttpConfig,
    shutdown: Shutdown,
) -> Result<Option<ServerHandle>, GatewayError> {
    if !config.enabled {
        info!("HTTP surface disabled, not starting listener");
        return Ok(None);
    }
    if let Err(errors) = validate_http(&config) {
        let err = GatewayError::invalid_config(&errors);
        error!(code = err.code(), error = %err, "Refusing to start HTTP listener");
        return Err(err);
    }

    let blocking = config.blocking;
    let config = Arc::new(config);
    let flag = Arc::new(LifecycleFlag::new());
    flag.transition(LifecycleState::Stopped, LifecycleState::Starting);
    let last_error = Arc::new(Mutex::new(None));
    let state = AppState::new(store, config, shutdown.clone());
    let (ready_tx, ready_rx) = mpsc::sync_channel(1);

    let worker = if blocking {
        run_listener(state, ready_tx, Arc::clone(&flag), Arc::clone(&last_error), true);
        None
    } else {
        let thread_flag = Arc::clone(&flag);
        let thread_error = Arc::clone(&last_error);
        let handle = thread::Builder::new()
            .name("docgate-listener".into())
            .spawn(move || run_listener(state, ready_tx, thread_flag, thread_error, false))
            .map_err(GatewayError::Listener)?;
        Some(handle)
    };

    let local_addr = match wait_ready(&ready_rx) {
        Ok(addr) => addr,
        Err(e) => {
            if let Some(worker) = worker {
                let _ = worker.join();
            }
            return Err(e);
        }
    };

    let handle = ServerHandle {
        flag,
        last_error,
        worker: Mutex::new(worker),
        shutdown,
        local_addr,
    };
    if blocking {
        // The listener already ran to completion on this thread.
        handle.shutdown();
    }
    Ok(Some(handle))
}

fn wait_ready(ready: &ReadyReceiver) -> Result<SocketAddr, GatewayError> {
    match ready.recv() {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Listener(std::io::Error::other(
            "listener thread exited before reporting readiness",
        ))),
    }
}

fn run_listener<S: DocumentStore>(
    state: AppState<S>,
    ready: ReadySender,
    flag: Arc<LifecycleFlag>,
    last_error: Arc<Mutex<Option<String>>>,
    watch_signals: bool,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let _ = ready.send(Err(GatewayError::Listener(e)));
            return;
        }
    };
    runtime.block_on(serve(state, ready, flag, last_error, watch_signals));
}

async fn serve<S: DocumentStore>(
    state: AppState<S>,
    ready: ReadySender,
    flag: Arc<LifecycleFlag>,
    last_error: Arc<Mutex<Option<String>>>,
    watch_signals: bool,
) {
    let tcp = match listener::bind(&state.config).await {
        Ok(tcp) => tcp,
        Err(e) => {
            error!(code = e.code(), error = %e, "Failed to start HTTP listener");
            let _ = ready.send(Err(e));
            return;
        }
    };
    let local_addr = match tcp.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            let _ = ready.send(Err(GatewayError::Listener(e)));
            return;
        }
    };

    let shutdown = state.shutdown.clone();
    let sessions = state.sessions.clone();
    let mut stop = shutdown.subscribe();
    if watch_signals {
        tokio::spawn(signals::trigger_on_signal(shutdown.clone()));
    }
    let app = http::router(state);

    flag.transition(LifecycleState::Starting, LifecycleState::Running);
    let _ = ready.send(Ok(local_addr));
    info!(address = %local_addr, "Gateway serving");

    let result = axum::serve(tcp, app)
        .with_graceful_shutdown(async move { stop.recv().await })
        .await;
    if let Err(e) = result {
        let err = GatewayError::Listener(e);
        error!(code = err.code(), error = %err, "HTTP listener failed");
        *lock(&last_error) = Some(err.to_string());
    }
    // False when `ServerHandle::shutdown` got here first; it finishes the
    // transition itself after joining this thread.
    let stopped_on_its_own = flag.transition(LifecycleState::Running, LifecycleState::Stopping);

    if !sessions.wait_idle(SESSION_DRAIN_TIMEOUT).await {
        warn!(
            open_sessions = sessions.active_count(),
            "WebSocket sessions still open after drain timeout"
        );
    }
    if stopped_on_its_own {
        flag.transition(LifecycleState::Stopping, LifecycleState::Stopped);
        info!(address = %local_addr, "Gateway stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn local_config() -> HttpConfig {
        HttpConfig {
            bind: "127.0.0.1".into(),
            port: 0,
            ..HttpConfig::default()
        }
    }

    #[test]
    fn flag_transitions_are_compare_and_swap() {
        let flag = LifecycleFlag::new();
        assert!(!flag.transition(LifecycleState::Running, LifecycleState::Stopping));
        assert!(flag.transition(LifecycleState::Stopped, LifecycleState::Starting));
        assert!(flag.transition(LifecycleState::Starting, LifecycleState::Running));
        assert!(flag.transition(LifecycleState::Running, LifecycleState::Stopping));
        assert!(!flag.transition(LifecycleState::Running, LifecycleState::Stopping));
        assert_eq!(flag.load(), LifecycleState::Stopping);
    }

    #[test]
    fn disabled_config_starts_nothing() {
        let config = HttpConfig { enabled: false, ..local_config() };
        let handle = start(Arc::new(MemoryStore::new()), config).unwrap();
        assert!(handle.is_none());
    }

    #[test]
    fn start_then_shutdown_twice() {
        let handle = start(Arc::new(MemoryStore::new()), local_config())
            .unwrap()
            .unwrap();
        assert_eq!(handle.state(), LifecycleState::Running);
        assert_ne!(handle.local_addr().port(), 0);

        handle.shutdown();
        assert_eq!(handle.state(), LifecycleState::Stopped);
        handle.shutdown();
        assert_eq!(handle.state(), LifecycleState::Stopped);
        assert!(handle.last_error().is_none());
    }

    #[test]
    fn bind_failure_is_reported_by_start() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = HttpConfig {
            port: taken.local_addr().unwrap().port(),
            ..local_config()
        };
        let err = start(Arc::new(MemoryStore::new()), config).unwrap_err();
        assert_eq!(err.code(), crate::error::ERROR_HTTP_LISTEN);
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = HttpConfig {
            access_token: Some(String::new()),
            ..local_config()
        };
        let err = start(Arc::new(MemoryStore::new()), config).unwrap_err();
        assert_eq!(err.code(), crate::error::ERROR_INVALID_CONFIG);
        assert!(err.to_string().contains("access_token"), "{err}");
    }

    #[test]
    fn listener_stopped_by_shared_trigger_reports_stopped() {
        let shutdown = Shutdown::new();
        let handle = start_with_shutdown(Arc::new(MemoryStore::new()), local_config(), shutdown.clone())
            .unwrap()
            .unwrap();
        assert_eq!(handle.state(), LifecycleState::Running);

        shutdown.trigger();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while handle.state() != LifecycleState::Stopped && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(handle.state(), LifecycleState::Stopped);
        handle.shutdown();
        assert_eq!(handle.state(), LifecycleState::Stopped);
    }

    #[test]
    fn blocking_mode_returns_after_shared_shutdown() {
        let shutdown = Shutdown::new();
        let trigger = shutdown.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            trigger.trigger();
        });
        let config = HttpConfig { blocking: true, ..local_config() };
        let handle = start_with_shutdown(Arc::new(MemoryStore::new()), config, shutdown)
            .unwrap()
            .unwrap();
        assert_eq!(handle.state(), LifecycleState::Stopped);
        stopper.join().unwrap();
    }
}
