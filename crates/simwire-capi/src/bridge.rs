//! Callback bridge
//!
//! Adapts the client's broadcast streams to native function-pointer
//! callbacks. Each owning handle runs one forwarder task on the global
//! runtime; the task copies the registered `(callback, user data)`
//! pair out of its slot, releases the lock, then invokes the pointer
//! on the delivering worker thread. The forwarder holds its slot only
//! weakly, so dropping the handle side stops delivery.

use crate::dataref::SimWireDataRef;
use crate::runtime;
use log::{trace, warn};
use simwire_client::{ConnectionEvent, Value};
use std::ffi::c_void;
use std::sync::{Mutex, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Bare function pointer behind `SimWireConnectionCallback`.
pub type ConnectionFn = extern "C" fn(user_data: *mut c_void);
/// Bare function pointer behind `SimWireDataRefChangeCallback`.
pub type ChangeFn = extern "C" fn(dataref: *mut SimWireDataRef, user_data: *mut c_void);

/// Opaque context pointer registered alongside a callback. The caller
/// guarantees it is usable from any thread for as long as the
/// registration stands; the bridge never dereferences it.
#[derive(Clone, Copy)]
pub struct UserData(pub *mut c_void);

unsafe impl Send for UserData {}

/// DataRef handle address carried into the change forwarder. Passed
/// back to the callback verbatim, never dereferenced by the task.
#[derive(Clone, Copy)]
pub struct DataRefAddr(pub *mut SimWireDataRef);

unsafe impl Send for DataRefAddr {}

/// One registered callback. Assignment semantics: last write wins,
/// `None` clears, the previous registration is replaced without being
/// invoked.
pub struct CallbackSlot<F: Copy> {
    registered: Mutex<Option<(F, UserData)>>,
}

impl<F: Copy> CallbackSlot<F> {
    pub fn new() -> Self {
        CallbackSlot {
            registered: Mutex::new(None),
        }
    }

    pub fn replace(&self, callback: Option<F>, user_data: *mut c_void) {
        *self.registered.lock().expect("callback slot poisoned") =
            callback.map(|f| (f, UserData(user_data)));
    }

    /// Copy the registration out; the lock is never held across the
    /// native call.
    pub fn current(&self) -> Option<(F, UserData)> {
        *self.registered.lock().expect("callback slot poisoned")
    }
}

impl<F: Copy> Default for CallbackSlot<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback pair of a connection handle.
#[derive(Default)]
pub struct ConnectionSlots {
    pub on_connect: CallbackSlot<ConnectionFn>,
    pub on_disconnect: CallbackSlot<ConnectionFn>,
}

impl ConnectionSlots {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Forward connection-state edges into the registered callbacks.
pub fn spawn_connection_forwarder(
    mut events: broadcast::Receiver<ConnectionEvent>,
    slots: Weak<ConnectionSlots>,
) -> JoinHandle<()> {
    runtime::runtime().spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("connection event stream lagged, {missed} edges dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let Some(slots) = slots.upgrade() else { break };
            let registered = match event {
                ConnectionEvent::Connected => slots.on_connect.current(),
                ConnectionEvent::Disconnected => slots.on_disconnect.current(),
            };
            drop(slots);
            if let Some((callback, user_data)) = registered {
                trace!("forwarding {event:?}");
                callback(user_data.0);
            }
        }
    })
}

/// Forward value changes of one data reference into its registered
/// callback, passing the originating handle through.
pub fn spawn_change_forwarder(
    mut changes: broadcast::Receiver<Value>,
    slot: Weak<CallbackSlot<ChangeFn>>,
    handle: DataRefAddr,
) -> JoinHandle<()> {
    runtime::runtime().spawn(async move {
        // Rebind so the block captures the whole `Send` wrapper rather
        // than the raw-pointer field (edition-2021 precise capture).
        let handle = handle;
        loop {
            match changes.recv().await {
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("change stream lagged, {missed} updates dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
            let Some(slot) = slot.upgrade() else { break };
            let registered = slot.current();
            drop(slot);
            if let Some((callback, user_data)) = registered {
                callback(handle.0, user_data.0);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    extern "C" fn bump(user_data: *mut c_void) {
        let hits = unsafe { &*(user_data as *const AtomicUsize) };
        hits.fetch_add(1, Ordering::SeqCst);
    }

    extern "C" fn record_handle(dataref: *mut SimWireDataRef, user_data: *mut c_void) {
        let seen = unsafe { &*(user_data as *const AtomicUsize) };
        seen.store(dataref as usize, Ordering::SeqCst);
    }

    fn wait_for(what: &str, predicate: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !predicate() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_forwarder_invokes_matching_slot_only() {
        let (tx, rx) = broadcast::channel(8);
        let slots = Arc::new(ConnectionSlots::new());
        let hits = Arc::new(AtomicUsize::new(0));
        slots
            .on_connect
            .replace(Some(bump as ConnectionFn), Arc::as_ptr(&hits) as *mut c_void);
        let task = spawn_connection_forwarder(rx, Arc::downgrade(&slots));

        tx.send(ConnectionEvent::Connected).unwrap();
        tx.send(ConnectionEvent::Disconnected).unwrap();
        tx.send(ConnectionEvent::Connected).unwrap();

        wait_for("two connect callbacks", || hits.load(Ordering::SeqCst) == 2);
        task.abort();
    }

    #[test]
    fn test_registration_is_last_write_wins() {
        let (tx, rx) = broadcast::channel(8);
        let slots = Arc::new(ConnectionSlots::new());
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let task = spawn_connection_forwarder(rx, Arc::downgrade(&slots));

        slots
            .on_connect
            .replace(Some(bump as ConnectionFn), Arc::as_ptr(&first) as *mut c_void);
        slots
            .on_connect
            .replace(Some(bump as ConnectionFn), Arc::as_ptr(&second) as *mut c_void);
        tx.send(ConnectionEvent::Connected).unwrap();

        wait_for("replacement callback", || second.load(Ordering::SeqCst) == 1);
        assert_eq!(first.load(Ordering::SeqCst), 0);

        // clearing stops delivery without replacing the task
        slots.on_connect.replace(None, std::ptr::null_mut());
        tx.send(ConnectionEvent::Connected).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(second.load(Ordering::SeqCst), 1);
        task.abort();
    }

    #[test]
    fn test_forwarder_exits_when_slots_drop() {
        let (tx, rx) = broadcast::channel(8);
        let slots = Arc::new(ConnectionSlots::new());
        let task = spawn_connection_forwarder(rx, Arc::downgrade(&slots));

        drop(slots);
        tx.send(ConnectionEvent::Connected).unwrap();
        wait_for("forwarder exit", || task.is_finished());
    }

    #[test]
    fn test_change_forwarder_passes_handle_through() {
        let (tx, rx) = broadcast::channel(8);
        let slot = Arc::new(CallbackSlot::new());
        let seen = Arc::new(AtomicUsize::new(0));
        slot.replace(
            Some(record_handle as ChangeFn),
            Arc::as_ptr(&seen) as *mut c_void,
        );
        let fake = 0x1000 as *mut SimWireDataRef;
        let task = spawn_change_forwarder(rx, Arc::downgrade(&slot), DataRefAddr(fake));

        tx.send(Value::Integer(1)).unwrap();
        wait_for("change callback", || seen.load(Ordering::SeqCst) == 0x1000);
        task.abort();
    }
}
