//! C ABI entry points
//!
//! Every extern function follows the same discipline: validate
//! arguments, borrow the handle through the live registry, run the
//! body with panic containment, and translate the outcome into a
//! result code plus the calling thread's Error Channel. No unwind
//! crosses the ABI.

pub mod connection;
pub mod dataref;

use crate::error::{self, BridgeError, BridgeResult};
use crate::types::{SimWireResult, SIMWIRE_OK};
use std::any::Any;
use std::ffi::{c_char, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};

fn panic_text(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "panic of unknown type".to_string()
    }
}

fn contained(payload: Box<dyn Any + Send>) -> BridgeError {
    BridgeError::Fault {
        message: format!("Contained panic: {}", panic_text(payload)),
        source: None,
    }
}

/// Run a fallible entry-point body. `SIMWIRE_OK` clears the channel;
/// positive returns (buffer negotiation) leave it untouched; failures
/// and contained panics are recorded and mapped to their code.
pub(crate) fn guarded_call<F>(body: F) -> SimWireResult
where
    F: FnOnce() -> BridgeResult<SimWireResult>,
{
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(code)) => {
            if code == SIMWIRE_OK {
                error::clear_last_error();
            }
            code
        }
        Ok(Err(err)) => error::record_failure(&err),
        Err(payload) => error::record_failure(&contained(payload)),
    }
}

/// Run a handle-factory body: NULL plus a recorded failure, or the
/// handle plus a cleared channel.
pub(crate) fn guarded_factory<T, F>(body: F) -> *mut T
where
    F: FnOnce() -> BridgeResult<*mut T>,
{
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(handle)) => {
            error::clear_last_error();
            handle
        }
        Ok(Err(err)) => {
            error::record_failure(&err);
            std::ptr::null_mut()
        }
        Err(payload) => {
            error::record_failure(&contained(payload));
            std::ptr::null_mut()
        }
    }
}

/// Run a void entry-point body. Panics are contained and logged; the
/// Error Channel is left alone — these paths never fail visibly.
pub(crate) fn guarded_void<F: FnOnce()>(body: F) {
    if catch_unwind(AssertUnwindSafe(body)).is_err() {
        log::debug!("panic contained in a void entry point");
    }
}

/// Borrow a required C-string argument.
pub(crate) unsafe fn required_str<'a>(ptr: *const c_char, what: &str) -> BridgeResult<&'a str> {
    if ptr.is_null() {
        return Err(BridgeError::InvalidArgument(format!("{what} is NULL")));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| BridgeError::InvalidArgument(format!("{what} is not valid UTF-8")))
}

/// Borrow an optional C-string argument; NULL is allowed and distinct.
pub(crate) unsafe fn optional_str<'a>(
    ptr: *const c_char,
    what: &str,
) -> BridgeResult<Option<&'a str>> {
    if ptr.is_null() {
        Ok(None)
    } else {
        required_str(ptr, what).map(Some)
    }
}

/// Borrow a required out-parameter.
pub(crate) unsafe fn required_out<'a, T>(ptr: *mut T, what: &str) -> BridgeResult<&'a mut T> {
    if ptr.is_null() {
        return Err(BridgeError::InvalidArgument(format!("{what} is NULL")));
    }
    Ok(&mut *ptr)
}

/// Borrow a required input record.
pub(crate) unsafe fn required_in<'a, T>(ptr: *const T, what: &str) -> BridgeResult<&'a T> {
    if ptr.is_null() {
        return Err(BridgeError::InvalidArgument(format!("{what} is NULL")));
    }
    Ok(&*ptr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::last_error_ptr;
    use pretty_assertions::assert_eq;
    use std::ffi::CString;

    fn last_error_text() -> String {
        unsafe { CStr::from_ptr(last_error_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn test_guarded_call_clears_channel_on_ok_only() {
        error::set_last_error("stale");
        assert_eq!(guarded_call(|| Ok(SIMWIRE_OK)), SIMWIRE_OK);
        assert_eq!(last_error_text(), "");

        // positive (negotiation) returns keep whatever was there
        error::set_last_error("stale");
        assert_eq!(guarded_call(|| Ok(12)), 12);
        assert_eq!(last_error_text(), "stale");
    }

    #[test]
    fn test_guarded_call_contains_panics() {
        let code = guarded_call(|| panic!("boom at the boundary"));
        assert_eq!(code, crate::types::SIMWIRE_ERR_EXCEPTION);
        assert!(last_error_text().contains("boom at the boundary"));
    }

    #[test]
    fn test_guarded_factory_reports_null_on_failure() {
        let out: *mut u8 = guarded_factory(|| Err(BridgeError::NullHandle));
        assert!(out.is_null());
        assert!(last_error_text().starts_with("NullHandle"));
    }

    #[test]
    fn test_string_argument_validation() {
        assert!(matches!(
            unsafe { required_str(std::ptr::null(), "name") },
            Err(BridgeError::InvalidArgument(msg)) if msg == "name is NULL"
        ));
        let owned = CString::new("fuel").unwrap();
        assert_eq!(
            unsafe { required_str(owned.as_ptr(), "name") }.unwrap(),
            "fuel"
        );
        assert_eq!(unsafe { optional_str(std::ptr::null(), "host") }.unwrap(), None);
    }
}
