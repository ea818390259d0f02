//! Foreign runtime host
//!
//! The client library is async; native callers are not. This module
//! owns the process-global tokio runtime the client lives on:
//! synchronous entry points block on it, callback forwarders run on
//! its workers. Created on first use, never torn down — it dies with
//! the process, like the handles it serves.

use std::future::Future;
use std::sync::OnceLock;
use tokio::runtime::Runtime;

/// Global tokio runtime hosting the client library
static TOKIO_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Get a reference to the global tokio runtime
///
/// Initializes the runtime if it hasn't been initialized yet.
///
/// # Panics
/// Panics if the runtime fails to initialize. Entry points contain
/// the panic and report `SIMWIRE_ERR_EXCEPTION`.
pub fn runtime() -> &'static Runtime {
    TOKIO_RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("simwire-worker")
            .enable_all()
            .build()
            .expect("Failed to initialize tokio runtime")
    })
}

/// Drive a future to completion from a native caller thread.
///
/// Must not be called from a runtime worker thread (that is, from
/// inside a native callback); tokio panics on nested blocking and the
/// entry point reports it as an exception.
pub fn block_on<F: Future>(future: F) -> F::Output {
    runtime().block_on(future)
}
