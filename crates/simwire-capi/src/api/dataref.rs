//! Data reference entry points (`DataRef_*`)

#![allow(non_snake_case)]

use super::{guarded_call, guarded_factory, guarded_void, required_in, required_out, required_str};
use crate::connection::SimWireConnection;
use crate::dataref::SimWireDataRef;
use crate::error::BridgeError;
use crate::marshal;
use crate::types::{
    SimWireDataRefChangeCallback, SimWireDateTime, SimWireReposition, SimWireResult, SIMWIRE_OK,
};
use std::ffi::{c_char, c_void};

/// Bind a named data reference on a live connection. `interval_ms` is
/// the requested update interval. `register_now` is recorded; the
/// reference is live either way (see `DataRef_Register`). Returns NULL
/// with the Error Channel set on failure (unknown name, no
/// connection).
///
/// # Safety
/// `name` must be NUL-terminated; `conn` NULL or a pointer previously
/// returned by `SimWire_Create`.
#[no_mangle]
pub unsafe extern "C" fn DataRef_Create(
    name: *const c_char,
    interval_ms: i32,
    conn: *mut SimWireConnection,
    register_now: bool,
) -> *mut SimWireDataRef {
    guarded_factory(|| {
        let conn = SimWireConnection::get(conn)?;
        let name = required_str(name, "name")?;
        let interval = u32::try_from(interval_ms).map_err(|_| {
            BridgeError::InvalidArgument("interval_ms must not be negative".to_string())
        })?;
        SimWireDataRef::create(conn, name, interval, register_now)
    })
}

/// Destroy a data reference handle. Idempotent; NULL, stale and
/// foreign pointers are ignored.
///
/// # Safety
/// `handle` must be NULL or a pointer previously returned by
/// `DataRef_Create`. Must not be called from inside the handle's own
/// change callback.
#[no_mangle]
pub unsafe extern "C" fn DataRef_Destroy(handle: *mut SimWireDataRef) {
    guarded_void(|| SimWireDataRef::destroy(handle));
}

/// Explicit registration step. Binding happens at creation, so this
/// validates the handle and reports OK.
///
/// # Safety
/// `handle` as for `DataRef_Destroy`.
#[no_mangle]
pub unsafe extern "C" fn DataRef_Register(handle: *mut SimWireDataRef) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireDataRef::get(handle)?;
        handle.register()?;
        Ok(SIMWIRE_OK)
    })
}

/// Copy the reference's name into `buffer`. Returns OK once the name
/// and terminator fit; otherwise the positive required size, with the
/// buffer untouched. The name is the handle's own stable copy.
///
/// # Safety
/// `handle` as for `DataRef_Destroy`; `buffer` must point to
/// `buffer_len` writable bytes when non-null.
#[no_mangle]
pub unsafe extern "C" fn DataRef_GetName(
    handle: *mut SimWireDataRef,
    buffer: *mut c_char,
    buffer_len: i32,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireDataRef::get(handle)?;
        marshal::copy_text_out(&handle.name().to_string_lossy(), buffer, buffer_len)
    })
}

/// Read the value as a 32-bit integer (see the coercion table in the
/// header). `out_value` is written only on success.
///
/// # Safety
/// `handle` as for `DataRef_Destroy`; `out_value` writable.
#[no_mangle]
pub unsafe extern "C" fn DataRef_GetInt(
    handle: *mut SimWireDataRef,
    out_value: *mut i32,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireDataRef::get(handle)?;
        let out = required_out(out_value, "out_value")?;
        *out = handle.get_i32()?;
        Ok(SIMWIRE_OK)
    })
}

/// Read the value as a double.
///
/// # Safety
/// As for `DataRef_GetInt`.
#[no_mangle]
pub unsafe extern "C" fn DataRef_GetDouble(
    handle: *mut SimWireDataRef,
    out_value: *mut f64,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireDataRef::get(handle)?;
        let out = required_out(out_value, "out_value")?;
        *out = handle.get_f64()?;
        Ok(SIMWIRE_OK)
    })
}

/// Read the value as a boolean.
///
/// # Safety
/// As for `DataRef_GetInt`.
#[no_mangle]
pub unsafe extern "C" fn DataRef_GetBool(
    handle: *mut SimWireDataRef,
    out_value: *mut bool,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireDataRef::get(handle)?;
        let out = required_out(out_value, "out_value")?;
        *out = handle.get_bool()?;
        Ok(SIMWIRE_OK)
    })
}

/// Render the value as text and copy it out under the same buffer
/// negotiation as `DataRef_GetName`.
///
/// # Safety
/// As for `DataRef_GetName`.
#[no_mangle]
pub unsafe extern "C" fn DataRef_GetString(
    handle: *mut SimWireDataRef,
    buffer: *mut c_char,
    buffer_len: i32,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireDataRef::get(handle)?;
        let text = handle.get_text()?;
        marshal::copy_text_out(&text, buffer, buffer_len)
    })
}

/// Read the value as a civil timestamp.
///
/// # Safety
/// As for `DataRef_GetInt`.
#[no_mangle]
pub unsafe extern "C" fn DataRef_GetDateTime(
    handle: *mut SimWireDataRef,
    out_value: *mut SimWireDateTime,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireDataRef::get(handle)?;
        let out = required_out(out_value, "out_value")?;
        *out = handle.get_datetime()?;
        Ok(SIMWIRE_OK)
    })
}

/// Write a 32-bit integer through the reference.
///
/// # Safety
/// `handle` as for `DataRef_Destroy`.
#[no_mangle]
pub unsafe extern "C" fn DataRef_SetInt(
    handle: *mut SimWireDataRef,
    value: i32,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireDataRef::get(handle)?;
        handle.set_i32(value)?;
        Ok(SIMWIRE_OK)
    })
}

/// Write a double through the reference.
///
/// # Safety
/// `handle` as for `DataRef_Destroy`.
#[no_mangle]
pub unsafe extern "C" fn DataRef_SetDouble(
    handle: *mut SimWireDataRef,
    value: f64,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireDataRef::get(handle)?;
        handle.set_f64(value)?;
        Ok(SIMWIRE_OK)
    })
}

/// Write a boolean through the reference.
///
/// # Safety
/// `handle` as for `DataRef_Destroy`.
#[no_mangle]
pub unsafe extern "C" fn DataRef_SetBool(
    handle: *mut SimWireDataRef,
    value: bool,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireDataRef::get(handle)?;
        handle.set_bool(value)?;
        Ok(SIMWIRE_OK)
    })
}

/// Write text through the reference.
///
/// # Safety
/// `handle` as for `DataRef_Destroy`; `value` NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn DataRef_SetString(
    handle: *mut SimWireDataRef,
    value: *const c_char,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireDataRef::get(handle)?;
        let value = required_str(value, "value")?;
        handle.set_text(value)?;
        Ok(SIMWIRE_OK)
    })
}

/// Write a civil timestamp through the reference. Component
/// combinations that name no real instant are invalid data.
///
/// # Safety
/// `handle` as for `DataRef_Destroy`; `value` must be readable.
#[no_mangle]
pub unsafe extern "C" fn DataRef_SetDateTime(
    handle: *mut SimWireDataRef,
    value: *const SimWireDateTime,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireDataRef::get(handle)?;
        let record = required_in(value, "value")?;
        handle.set_datetime(record)?;
        Ok(SIMWIRE_OK)
    })
}

/// Write a reposition command through the reference as one composite.
///
/// # Safety
/// `handle` as for `DataRef_Destroy`; `value` must be readable.
#[no_mangle]
pub unsafe extern "C" fn DataRef_SetReposition(
    handle: *mut SimWireDataRef,
    value: *const SimWireReposition,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireDataRef::get(handle)?;
        let record = required_in(value, "value")?;
        handle.set_reposition(record)?;
        Ok(SIMWIRE_OK)
    })
}

/// Register the change callback. Last write wins, NULL clears. The
/// callback receives the mutated reference's handle and fires on a
/// runtime worker thread.
///
/// # Safety
/// `handle` as for `DataRef_Destroy`. The callback pointer pair is not
/// validated.
#[no_mangle]
pub unsafe extern "C" fn DataRef_SetOnDataChange(
    handle: *mut SimWireDataRef,
    callback: SimWireDataRefChangeCallback,
    user_data: *mut c_void,
) -> SimWireResult {
    guarded_call(|| {
        let handle = SimWireDataRef::get(handle)?;
        handle.slot().replace(callback, user_data);
        Ok(SIMWIRE_OK)
    })
}
