//! ABI-fixed types shared with native callers
//!
//! Everything here mirrors `include/simwire.h` field for field. Layout
//! changes are ABI breaks.

use crate::dataref::SimWireDataRef;
use std::ffi::c_void;

/// Result of every fallible entry point. Zero is success, negative
/// values are the error codes below. `DataRef_GetName` and
/// `DataRef_GetString` additionally return a positive value: the
/// buffer size the call needs, terminator included.
pub type SimWireResult = i32;

pub const SIMWIRE_OK: SimWireResult = 0;
pub const SIMWIRE_ERR_NULL_HANDLE: SimWireResult = -1;
pub const SIMWIRE_ERR_NOT_CONNECTED: SimWireResult = -2;
pub const SIMWIRE_ERR_CONNECTION_FAILED: SimWireResult = -3;
pub const SIMWIRE_ERR_INVALID_ARGUMENT: SimWireResult = -4;
pub const SIMWIRE_ERR_DATAREF_NOT_FOUND: SimWireResult = -5;
pub const SIMWIRE_ERR_DATAREF_NOT_READY: SimWireResult = -6;
pub const SIMWIRE_ERR_INVALID_DATA: SimWireResult = -7;
pub const SIMWIRE_ERR_EXCEPTION: SimWireResult = -99;

/// Civil timestamp, field for field. No time zone; what the simulator
/// displays is what travels.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimWireDateTime {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
    pub millisecond: i32,
}

/// Aircraft reposition command. Write-only composite; degrees for the
/// angular fields, feet for altitude, knots for ias.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimWireReposition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub heading_magnetic: f64,
    pub pitch: f64,
    pub bank: f64,
    pub ias: f64,
    pub on_ground: bool,
}

/// Connection-state callback. Receives only the `user_data` pointer
/// registered with it; fires on a runtime worker thread.
pub type SimWireConnectionCallback = Option<extern "C" fn(user_data: *mut c_void)>;

/// Value-change callback. Receives the handle of the data reference
/// that changed plus the registered `user_data`; fires on a runtime
/// worker thread.
pub type SimWireDataRefChangeCallback =
    Option<extern "C" fn(dataref: *mut SimWireDataRef, user_data: *mut c_void)>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn test_datetime_layout_is_seven_packed_ints() {
        assert_eq!(size_of::<SimWireDateTime>(), 28);
        assert_eq!(align_of::<SimWireDateTime>(), 4);
    }

    #[test]
    fn test_reposition_layout_is_seven_doubles_plus_flag() {
        // bool pads the record out to the next 8-byte boundary
        assert_eq!(size_of::<SimWireReposition>(), 64);
        assert_eq!(align_of::<SimWireReposition>(), 8);
    }

    #[test]
    fn test_nullable_callbacks_are_pointer_sized() {
        assert_eq!(
            size_of::<SimWireConnectionCallback>(),
            size_of::<*const ()>()
        );
        assert_eq!(
            size_of::<SimWireDataRefChangeCallback>(),
            size_of::<*const ()>()
        );
    }
}
