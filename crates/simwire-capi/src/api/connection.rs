//! Connection entry points (`SimWire_*`)

#![allow(non_snake_case)]

use super::{guarded_call, guarded_factory, guarded_void, optional_str, required_out, required_str};
use crate::connection::SimWireConnection;
use crate::error;
use crate::types::{SimWireConnectionCallback, SimWireResult, SIMWIRE_OK};
use std::ffi::{c_char, c_void, CStr};

/// Construct a connection handle, initializing diagnostics and the
/// runtime on first use. Returns NULL with the Error Channel set on
/// failure.
#[no_mangle]
pub extern "C" fn SimWire_Create() -> *mut SimWireConnection {
    let _ = env_logger::try_init();
    guarded_factory(SimWireConnection::create)
}

/// Destroy a connection handle. Idempotent; NULL, stale and foreign
/// pointers are ignored.
///
/// # Safety
/// `conn` must be NULL or a pointer previously returned by
/// `SimWire_Create`. Must not be called from inside one of the
/// handle's own callbacks.
#[no_mangle]
pub unsafe extern "C" fn SimWire_Destroy(conn: *mut SimWireConnection) {
    guarded_void(|| SimWireConnection::destroy(conn));
}

/// Attach to a data hub. A NULL `host` selects the configured default.
/// With `synchronous` set the call blocks until the attempt resolves;
/// otherwise it returns immediately and completion is observable via
/// the connect callback or `SimWire_IsConnected`.
///
/// # Safety
/// `conn` as for `SimWire_Destroy`; `host` NULL or a NUL-terminated
/// string.
#[no_mangle]
pub unsafe extern "C" fn SimWire_Connect(
    conn: *mut SimWireConnection,
    host: *const c_char,
    synchronous: bool,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireConnection::get(conn)?;
        let host = optional_str(host, "host")?;
        handle.connect(host, synchronous)?;
        Ok(SIMWIRE_OK)
    })
}

/// Kept for ABI parity: the link closes when the handle is destroyed.
/// Touches nothing, safe on any pointer.
#[no_mangle]
pub extern "C" fn SimWire_Disconnect(_conn: *mut SimWireConnection) {}

/// Report whether the connection is currently attached. Internal
/// faults never escape; they read as not connected.
///
/// # Safety
/// `conn` as for `SimWire_Destroy`; `out_connected` must be writable.
#[no_mangle]
pub unsafe extern "C" fn SimWire_IsConnected(
    conn: *mut SimWireConnection,
    out_connected: *mut bool,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireConnection::get(conn)?;
        let out = required_out(out_connected, "out_connected")?;
        *out = handle.is_connected();
        Ok(SIMWIRE_OK)
    })
}

/// Toggle priority mode. Best-effort: once the handle checks out the
/// call reports OK.
///
/// # Safety
/// `conn` as for `SimWire_Destroy`.
#[no_mangle]
pub unsafe extern "C" fn SimWire_SetPriorityMode(
    conn: *mut SimWireConnection,
    enabled: bool,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireConnection::get(conn)?;
        handle.set_priority_mode(enabled);
        Ok(SIMWIRE_OK)
    })
}

/// Register the connect callback. Last write wins, NULL clears. The
/// callback fires on a runtime worker thread; `user_data` must be
/// usable from any thread.
///
/// # Safety
/// `conn` as for `SimWire_Destroy`. The callback pointer pair is not
/// validated.
#[no_mangle]
pub unsafe extern "C" fn SimWire_SetOnConnect(
    conn: *mut SimWireConnection,
    callback: SimWireConnectionCallback,
    user_data: *mut c_void,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireConnection::get(conn)?;
        handle.slots().on_connect.replace(callback, user_data);
        Ok(SIMWIRE_OK)
    })
}

/// Register the disconnect callback. Semantics as `SimWire_SetOnConnect`.
///
/// # Safety
/// As for `SimWire_SetOnConnect`.
#[no_mangle]
pub unsafe extern "C" fn SimWire_SetOnDisconnect(
    conn: *mut SimWireConnection,
    callback: SimWireConnectionCallback,
    user_data: *mut c_void,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireConnection::get(conn)?;
        handle.slots().on_disconnect.replace(callback, user_data);
        Ok(SIMWIRE_OK)
    })
}

/// By-name read of a value, narrowed to double. `*out_value` is zeroed
/// on every failure path that can reach it.
///
/// # Safety
/// `conn` as for `SimWire_Destroy`; `name` NUL-terminated;
/// `out_value` writable.
#[no_mangle]
pub unsafe extern "C" fn SimWire_ReadValue(
    conn: *mut SimWireConnection,
    name: *const c_char,
    out_value: *mut f64,
) -> SimWireResult {
    guarded_call(|| {
        let out = required_out(out_value, "out_value")?;
        *out = 0.0;
        let handle = SimWireConnection::get(conn)?;
        let name = required_str(name, "name")?;
        *out = handle.read_value(name)?;
        Ok(SIMWIRE_OK)
    })
}

/// By-name double write; the remote end coerces to the slot's kind.
///
/// # Safety
/// `conn` as for `SimWire_Destroy`; `name` NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn SimWire_WriteValue(
    conn: *mut SimWireConnection,
    name: *const c_char,
    value: f64,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireConnection::get(conn)?;
        let name = required_str(name, "name")?;
        handle.write_value(name, value)?;
        Ok(SIMWIRE_OK)
    })
}

/// Text of the most recent failure on the calling thread. Never NULL;
/// empty when the last call succeeded. The pointer stays valid for the
/// thread's lifetime, the text until the next entry point runs on it.
#[no_mangle]
pub extern "C" fn SimWire_GetLastError() -> *const c_char {
    error::last_error_ptr()
}

/// Overwrite the calling thread's error text; NULL clears it.
/// Diagnostic surface for embedders.
///
/// # Safety
/// `message` must be NULL or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn SimWire_SetLastError(message: *const c_char) {
    guarded_void(|| {
        if message.is_null() {
            error::clear_last_error();
        } else {
            error::set_last_error(&CStr::from_ptr(message).to_string_lossy());
        }
    });
}
