//! Connection handle
//!
//! The opaque object behind `SimWireConnection*`: one client
//! [`Connection`], its callback slots, and the forwarder task feeding
//! them. Entry points in [`crate::api`] validate pointers and
//! translate failures; the methods here carry the behavior.

use crate::bridge::{self, ConnectionSlots};
use crate::error::{BridgeError, BridgeResult};
use crate::registry;
use crate::runtime;
use log::{debug, warn};
use simwire_client::{Connection, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct SimWireConnection {
    client: Connection,
    slots: Arc<ConnectionSlots>,
    forwarder: JoinHandle<()>,
}

impl SimWireConnection {
    /// Build the client connection, wire its event stream to a fresh
    /// forwarder, and publish the handle.
    pub(crate) fn create() -> BridgeResult<*mut SimWireConnection> {
        let client = Connection::new()?;
        let slots = Arc::new(ConnectionSlots::new());
        let forwarder =
            bridge::spawn_connection_forwarder(client.subscribe_events(), Arc::downgrade(&slots));
        let handle = Box::into_raw(Box::new(SimWireConnection {
            client,
            slots,
            forwarder,
        }));
        registry::CONNECTIONS.insert(handle);
        debug!("connection handle {handle:p} created");
        Ok(handle)
    }

    /// Borrow a live handle.
    ///
    /// # Safety
    /// `handle` must either be invalid (NULL, stale, foreign — all
    /// rejected via the registry) or point to a handle this module
    /// published and has not yet destroyed.
    pub(crate) unsafe fn get<'a>(handle: *const SimWireConnection) -> BridgeResult<&'a Self> {
        if registry::CONNECTIONS.contains(handle) {
            Ok(&*handle)
        } else {
            Err(BridgeError::NullHandle)
        }
    }

    /// Retire and free a handle. Idempotent: only the call that wins
    /// the registry removal releases the memory. The forwarder is
    /// stopped and joined before the client object drops, so no
    /// callback can fire into freed state.
    ///
    /// # Safety
    /// As for [`SimWireConnection::get`].
    pub(crate) unsafe fn destroy(handle: *mut SimWireConnection) {
        if !registry::CONNECTIONS.remove(handle) {
            return;
        }
        let SimWireConnection {
            client,
            slots,
            forwarder,
        } = *Box::from_raw(handle);
        forwarder.abort();
        let _ = runtime::block_on(forwarder);
        drop(slots);
        client.disconnect();
        debug!("connection handle {handle:p} destroyed");
    }

    pub(crate) fn client(&self) -> &Connection {
        &self.client
    }

    pub(crate) fn slots(&self) -> &ConnectionSlots {
        &self.slots
    }

    /// Attach to a hub. Synchronous mode blocks the caller until the
    /// attempt resolves; asynchronous mode hands the attempt to the
    /// runtime and reports through the connect callback.
    pub(crate) fn connect(&self, host: Option<&str>, synchronous: bool) -> BridgeResult<()> {
        if synchronous {
            runtime::block_on(self.client.connect(host))?;
            return Ok(());
        }
        let client = self.client.clone();
        let host = host.map(String::from);
        runtime::runtime().spawn(async move {
            if let Err(err) = client.connect(host.as_deref()).await {
                warn!("background connect failed: {err}");
            }
        });
        Ok(())
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    pub(crate) fn set_priority_mode(&self, enabled: bool) {
        self.client.set_priority_mode(enabled);
    }

    /// By-name read, narrowed to double. Errors zero the destination
    /// at the entry point.
    pub(crate) fn read_value(&self, name: &str) -> BridgeResult<f64> {
        let value = self.client.read_value(name)?;
        crate::marshal::to_f64(name, &value)
    }

    /// By-name double write; the hub coerces to the slot kind.
    pub(crate) fn write_value(&self, name: &str, value: f64) -> BridgeResult<()> {
        self.client.write_value(name, Value::Float(value))?;
        Ok(())
    }
}
