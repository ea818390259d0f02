//! In-process data hub
//!
//! The hub plays the simulator side of the data link inside the
//! process: named, kind-typed value slots that connections read, write
//! and subscribe to. Hubs register process-wide under a host name so a
//! [`Connection`](crate::Connection) resolves them the way it would
//! resolve a network peer. The wire transport itself is out of scope;
//! everything above it (slot typing, write validation, change fan-out,
//! forced disconnect on shutdown) behaves like the real thing.

use crate::error::{ClientError, ClientResult};
use crate::value::{Reposition, Value, ValueKind};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::{broadcast, watch};

/// Default capacity of per-slot change streams
pub const DEFAULT_CHANGE_CAPACITY: usize = 64;

static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<Hub>>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<String, Arc<Hub>>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// One named value slot: declared kind, optional numeric bounds, the
/// latest accepted value, and its change stream.
#[derive(Debug)]
struct Slot {
    kind: ValueKind,
    min: Option<f64>,
    max: Option<f64>,
    value: Option<Value>,
    changes: broadcast::Sender<Value>,
}

impl Slot {
    /// Coerce and validate an incoming write. Returns the value as it
    /// will be stored, or the rejection reason wrapped as InvalidData.
    fn accept(&self, name: &str, value: &Value) -> ClientResult<Value> {
        let coerced = value
            .coerce_to(self.kind)
            .map_err(|reason| ClientError::invalid_data(name, reason))?;
        match &coerced {
            Value::Integer(i) => self.check_range(name, *i as f64)?,
            Value::Float(f) => {
                if !f.is_finite() {
                    return Err(ClientError::invalid_data(
                        name,
                        format!("{f} is not a finite number"),
                    ));
                }
                self.check_range(name, *f)?;
            }
            Value::Reposition(r) => check_reposition(name, r)?,
            _ => {}
        }
        Ok(coerced)
    }

    fn check_range(&self, name: &str, v: f64) -> ClientResult<()> {
        if let Some(min) = self.min {
            if v < min {
                return Err(ClientError::invalid_data(
                    name,
                    format!("{v} is below the minimum {min}"),
                ));
            }
        }
        if let Some(max) = self.max {
            if v > max {
                return Err(ClientError::invalid_data(
                    name,
                    format!("{v} is above the maximum {max}"),
                ));
            }
        }
        Ok(())
    }
}

fn check_reposition(name: &str, r: &Reposition) -> ClientResult<()> {
    let fields = [
        ("latitude", r.latitude),
        ("longitude", r.longitude),
        ("altitude", r.altitude),
        ("heading_magnetic", r.heading_magnetic),
        ("pitch", r.pitch),
        ("bank", r.bank),
        ("ias", r.ias),
    ];
    for (field, v) in fields {
        if !v.is_finite() {
            return Err(ClientError::invalid_data(
                name,
                format!("{field} is not a finite number"),
            ));
        }
    }
    if r.latitude.abs() > 90.0 {
        return Err(ClientError::invalid_data(
            name,
            format!("latitude {} is outside -90..=90", r.latitude),
        ));
    }
    if r.longitude.abs() > 180.0 {
        return Err(ClientError::invalid_data(
            name,
            format!("longitude {} is outside -180..=180", r.longitude),
        ));
    }
    Ok(())
}

/// A named in-process hub holding typed value slots.
#[derive(Debug)]
pub struct Hub {
    host: String,
    capacity: usize,
    open: watch::Sender<bool>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl Hub {
    /// Open (or join) the hub registered under `host`.
    pub fn open(host: &str) -> Arc<Hub> {
        Self::open_with_capacity(host, DEFAULT_CHANGE_CAPACITY)
    }

    /// Open a hub with an explicit change stream capacity. Joining an
    /// already-open hub keeps its original capacity.
    pub fn open_with_capacity(host: &str, capacity: usize) -> Arc<Hub> {
        let mut hubs = registry().lock().expect("hub registry poisoned");
        if let Some(hub) = hubs.get(host) {
            return Arc::clone(hub);
        }
        let (open, _) = watch::channel(true);
        let hub = Arc::new(Hub {
            host: host.to_string(),
            capacity: capacity.max(1),
            open,
            slots: Mutex::new(HashMap::new()),
        });
        hubs.insert(host.to_string(), Arc::clone(&hub));
        info!("hub '{host}' opened");
        hub
    }

    /// Find an open hub by host name.
    pub fn lookup(host: &str) -> Option<Arc<Hub>> {
        registry()
            .lock()
            .expect("hub registry poisoned")
            .get(host)
            .cloned()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_open(&self) -> bool {
        *self.open.borrow()
    }

    /// Close the hub: deregister the host name and force every
    /// attached connection to drop. Closing twice is harmless.
    pub fn close(&self) {
        let mut hubs = registry().lock().expect("hub registry poisoned");
        if let Some(current) = hubs.get(&self.host) {
            if std::ptr::eq(Arc::as_ptr(current), self) {
                hubs.remove(&self.host);
            }
        }
        drop(hubs);
        self.open.send_replace(false);
        info!("hub '{}' closed", self.host);
    }

    pub(crate) fn watch_open(&self) -> watch::Receiver<bool> {
        self.open.subscribe()
    }

    /// Define a slot holding values of `kind`.
    pub fn define(&self, name: &str, kind: ValueKind) {
        self.insert_slot(name, kind, None, None);
    }

    /// Define a numeric slot with an inclusive accepted range. Writes
    /// outside the range are rejected as invalid data.
    pub fn define_bounded(&self, name: &str, kind: ValueKind, min: f64, max: f64) {
        self.insert_slot(name, kind, Some(min), Some(max));
    }

    fn insert_slot(&self, name: &str, kind: ValueKind, min: Option<f64>, max: Option<f64>) {
        debug_assert!(kind != ValueKind::NotReady, "slots carry data kinds");
        let (changes, _) = broadcast::channel(self.capacity);
        let slot = Slot {
            kind,
            min,
            max,
            value: None,
            changes,
        };
        self.slots
            .lock()
            .expect("hub slot table poisoned")
            .insert(name.to_string(), slot);
        debug!("hub '{}': defined '{}' as {}", self.host, name, kind.name());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots
            .lock()
            .expect("hub slot table poisoned")
            .contains_key(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<ValueKind> {
        self.slots
            .lock()
            .expect("hub slot table poisoned")
            .get(name)
            .map(|s| s.kind)
    }

    /// Validate and store a value, then fan the change out to
    /// subscribers. Values coerce to the slot kind where the table in
    /// [`Value::coerce_to`] allows it.
    pub fn write(&self, name: &str, value: Value) -> ClientResult<()> {
        let mut slots = self.slots.lock().expect("hub slot table poisoned");
        let slot = slots
            .get_mut(name)
            .ok_or_else(|| ClientError::NotFound(name.to_string()))?;
        let accepted = slot.accept(name, &value)?;
        slot.value = Some(accepted.clone());
        let _ = slot.changes.send(accepted);
        debug!("hub '{}': '{}' updated", self.host, name);
        Ok(())
    }

    /// Latest stored value; `None` when nothing has been written since
    /// the slot was defined.
    pub fn read(&self, name: &str) -> ClientResult<Option<Value>> {
        let slots = self.slots.lock().expect("hub slot table poisoned");
        let slot = slots
            .get(name)
            .ok_or_else(|| ClientError::NotFound(name.to_string()))?;
        Ok(slot.value.clone())
    }

    /// Subscribe to the named slot's change stream.
    pub fn subscribe(&self, name: &str) -> ClientResult<broadcast::Receiver<Value>> {
        let slots = self.slots.lock().expect("hub slot table poisoned");
        let slot = slots
            .get(name)
            .ok_or_else(|| ClientError::NotFound(name.to_string()))?;
        Ok(slot.changes.subscribe())
    }
}
