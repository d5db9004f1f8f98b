//! Start/shutdown behavior of the server handle.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use docgate::error::{registry, ERROR_HTTP_LISTEN};
use docgate::{HttpConfig, LifecycleState, MemoryStore, Shutdown};

mod common;

#[test]
fn concurrent_shutdown_runs_once() {
    let handle = Arc::new(common::start(Arc::new(MemoryStore::new()), common::http_config()));
    let workers: Vec<_> = (0..8)
        .map(|_| {
            let handle = Arc::clone(&handle);
            thread::spawn(move || handle.shutdown())
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(handle.state(), LifecycleState::Stopped);
    assert!(handle.last_error().is_none());
}

#[test]
fn listener_stops_accepting_after_shutdown() {
    let handle = common::start(Arc::new(MemoryStore::new()), common::http_config());
    let addr = handle.local_addr();
    assert!(std::net::TcpStream::connect(addr).is_ok());

    handle.shutdown();
    assert!(std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(500)).is_err());
}

#[test]
fn bind_failure_has_registered_description() {
    docgate::init();
    let first = common::start(Arc::new(MemoryStore::new()), common::http_config());
    let config = HttpConfig {
        port: first.local_addr().port(),
        ..common::http_config()
    };

    let err = docgate::start(Arc::new(MemoryStore::new()), config).unwrap_err();
    assert_eq!(err.code(), ERROR_HTTP_LISTEN);
    assert!(registry::explain(err.code()).unwrap().contains("HTTP network listener"));
}

#[test]
fn shared_shutdown_stops_non_blocking_listener() {
    let shutdown = Shutdown::new();
    let handle = docgate::start_with_shutdown(
        Arc::new(MemoryStore::new()),
        common::http_config(),
        shutdown.clone(),
    )
    .unwrap()
    .unwrap();
    assert_eq!(handle.state(), LifecycleState::Running);

    shutdown.trigger();
    handle.shutdown();
    assert_eq!(handle.state(), LifecycleState::Stopped);
}

#[test]
fn dropping_the_handle_stops_the_listener() {
    let handle = common::start(Arc::new(MemoryStore::new()), common::http_config());
    let addr = handle.local_addr();
    drop(handle);
    assert!(std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(500)).is_err());
}
