//! Named simulator variable handles
//!
//! A [`DataRef`] binds one hub slot for reading, writing and change
//! subscription. It pins the hub it was created against, so reads keep
//! working on last-known data even after the owning connection drops;
//! writes require the connection to still be up.

use crate::connection::Connection;
use crate::error::{ClientError, ClientResult};
use crate::hub::Hub;
use crate::value::Value;
use log::debug;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug)]
pub struct DataRef {
    connection: Connection,
    hub: Arc<Hub>,
    name: String,
    interval_ms: u32,
    auto_registered: bool,
}

impl DataRef {
    /// Bind `name` on the connection's hub. The connection must be up
    /// and the slot defined. `interval_ms` is the requested update
    /// interval; the hub pushes on write, so it is recorded only.
    /// `register_now` is likewise recorded: the slot subscription is
    /// established here regardless, and [`DataRef::register`] has
    /// nothing left to do.
    pub fn new(
        connection: &Connection,
        name: &str,
        interval_ms: u32,
        register_now: bool,
    ) -> ClientResult<Self> {
        let hub = connection.hub()?;
        if !hub.contains(name) {
            return Err(ClientError::NotFound(name.to_string()));
        }
        if !register_now {
            debug!("'{name}': deferred registration requested; slot bound immediately anyway");
        }
        Ok(DataRef {
            connection: connection.clone(),
            hub,
            name: name.to_string(),
            interval_ms,
            auto_registered: register_now,
        })
    }

    /// Explicit registration step. Binding happens in [`DataRef::new`],
    /// so this only confirms the handle is usable.
    pub fn register(&self) -> ClientResult<()> {
        debug!("'{}': register is a no-op, bound at construction", self.name);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Whether the caller asked for registration at construction.
    pub fn auto_registered(&self) -> bool {
        self.auto_registered
    }

    /// Latest value of the bound slot. A slot that has never been
    /// written reads as [`Value::NotReady`].
    pub fn value(&self) -> ClientResult<Value> {
        Ok(self.hub.read(&self.name)?.unwrap_or(Value::NotReady))
    }

    /// Write through to the bound slot. Requires a live connection;
    /// the hub validates kind and range.
    pub fn set_value(&self, value: Value) -> ClientResult<()> {
        if !self.connection.is_connected() {
            return Err(ClientError::NotConnected);
        }
        self.hub.write(&self.name, value)
    }

    /// Subscribe to changes of the bound slot.
    pub fn subscribe(&self) -> ClientResult<broadcast::Receiver<Value>> {
        self.hub.subscribe(&self.name)
    }
}
