//! SimWire Client - simulator data link client
//!
//! This library provides the client side of the SimWire data link:
//! - Connection lifecycle with state-change notifications
//! - Named, dynamically-typed data references with change streams
//! - An in-process hub standing in for a running simulator
//! - Configuration from file and environment

/// SimWire client version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Public API modules
pub mod config;
pub mod connection;
pub mod dataref;
pub mod error;
pub mod hub;
pub mod value;

// Re-export commonly used types
pub use config::{ClientConfig, ConfigError, ConfigResult};
pub use connection::{Connection, ConnectionEvent};
pub use dataref::DataRef;
pub use error::{ClientError, ClientResult};
pub use hub::Hub;
pub use value::{Reposition, Value, ValueKind};
