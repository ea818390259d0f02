//! DataRef handle
//!
//! The opaque object behind `SimWireDataRef*`: one client [`DataRef`],
//! a natively-owned copy of its name, the change-callback slot, and
//! the forwarder feeding it. The name copy is what `DataRef_GetName`
//! serves; it stays valid and unchanged for the handle's lifetime.

use crate::bridge::{self, CallbackSlot, ChangeFn, DataRefAddr};
use crate::connection::SimWireConnection;
use crate::error::{BridgeError, BridgeResult};
use crate::marshal;
use crate::registry;
use crate::runtime;
use crate::types::{SimWireDateTime, SimWireReposition};
use log::debug;
use simwire_client::{DataRef, Value};
use std::ffi::CString;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct SimWireDataRef {
    client: DataRef,
    name: CString,
    slot: Arc<CallbackSlot<ChangeFn>>,
    // None only during assembly in create()
    forwarder: Option<JoinHandle<()>>,
}

impl SimWireDataRef {
    pub(crate) fn create(
        conn: &SimWireConnection,
        name: &str,
        interval_ms: u32,
        register_now: bool,
    ) -> BridgeResult<*mut SimWireDataRef> {
        let client = DataRef::new(conn.client(), name, interval_ms, register_now)?;
        let changes = client.subscribe()?;
        let native_name = CString::new(name)
            .map_err(|_| BridgeError::InvalidArgument("name contains an interior NUL".into()))?;
        let slot = Arc::new(CallbackSlot::new());

        let handle = Box::into_raw(Box::new(SimWireDataRef {
            client,
            name: native_name,
            slot: Arc::clone(&slot),
            forwarder: None,
        }));
        // The forwarder needs the final address; the handle is not
        // visible to anyone else until the registry insert below.
        let task = bridge::spawn_change_forwarder(changes, Arc::downgrade(&slot), DataRefAddr(handle));
        unsafe {
            (*handle).forwarder = Some(task);
        }
        registry::DATAREFS.insert(handle);
        debug!("dataref handle {handle:p} created for '{name}'");
        Ok(handle)
    }

    /// Borrow a live handle.
    ///
    /// # Safety
    /// `handle` must either be invalid (NULL, stale, foreign — all
    /// rejected via the registry) or point to a handle this module
    /// published and has not yet destroyed.
    pub(crate) unsafe fn get<'a>(handle: *const SimWireDataRef) -> BridgeResult<&'a Self> {
        if registry::DATAREFS.contains(handle) {
            Ok(&*handle)
        } else {
            Err(BridgeError::NullHandle)
        }
    }

    /// Retire and free a handle; idempotent. Forwarder teardown
    /// precedes the drop of the client object and the name, so a
    /// callback in flight finishes before anything it can see is
    /// released.
    ///
    /// # Safety
    /// As for [`SimWireDataRef::get`].
    pub(crate) unsafe fn destroy(handle: *mut SimWireDataRef) {
        if !registry::DATAREFS.remove(handle) {
            return;
        }
        let SimWireDataRef {
            client,
            name,
            slot,
            forwarder,
        } = *Box::from_raw(handle);
        if let Some(task) = forwarder {
            task.abort();
            let _ = runtime::block_on(task);
        }
        drop(slot);
        drop(client);
        debug!("dataref handle {handle:p} destroyed ('{}')", name.to_string_lossy());
    }

    pub(crate) fn register(&self) -> BridgeResult<()> {
        self.client.register()?;
        Ok(())
    }

    pub(crate) fn name(&self) -> &CString {
        &self.name
    }

    pub(crate) fn slot(&self) -> &CallbackSlot<ChangeFn> {
        &self.slot
    }

    fn value(&self) -> BridgeResult<Value> {
        Ok(self.client.value()?)
    }

    pub(crate) fn get_i32(&self) -> BridgeResult<i32> {
        marshal::to_i32(self.client.name(), &self.value()?)
    }

    pub(crate) fn get_f64(&self) -> BridgeResult<f64> {
        marshal::to_f64(self.client.name(), &self.value()?)
    }

    pub(crate) fn get_bool(&self) -> BridgeResult<bool> {
        marshal::to_bool(self.client.name(), &self.value()?)
    }

    pub(crate) fn get_text(&self) -> BridgeResult<String> {
        marshal::to_text(self.client.name(), &self.value()?)
    }

    pub(crate) fn get_datetime(&self) -> BridgeResult<SimWireDateTime> {
        marshal::to_datetime(self.client.name(), &self.value()?)
    }

    pub(crate) fn set_i32(&self, value: i32) -> BridgeResult<()> {
        Ok(self.client.set_value(Value::Integer(i64::from(value)))?)
    }

    pub(crate) fn set_f64(&self, value: f64) -> BridgeResult<()> {
        Ok(self.client.set_value(Value::Float(value))?)
    }

    pub(crate) fn set_bool(&self, value: bool) -> BridgeResult<()> {
        Ok(self.client.set_value(Value::Bool(value))?)
    }

    pub(crate) fn set_text(&self, value: &str) -> BridgeResult<()> {
        Ok(self.client.set_value(Value::text(value))?)
    }

    pub(crate) fn set_datetime(&self, record: &SimWireDateTime) -> BridgeResult<()> {
        let value = marshal::from_datetime(self.client.name(), record)?;
        Ok(self.client.set_value(value)?)
    }

    pub(crate) fn set_reposition(&self, record: &SimWireReposition) -> BridgeResult<()> {
        Ok(self.client.set_value(marshal::from_reposition(record))?)
    }
}
