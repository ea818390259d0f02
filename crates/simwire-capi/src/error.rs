//! Failure classification and the last-error channel
//!
//! Every fallible entry point funnels through [`BridgeError`]: client
//! failures are classified into the native result codes, the rendered
//! error chain lands in a thread-local text buffer that
//! `SimWire_GetLastError` exposes. The buffer is overwritten by every
//! call on the owning thread, cleared on success, and its address
//! never changes, so native callers may hold the pointer.

use crate::types::*;
use log::debug;
use simwire_client::ClientError;
use std::cell::RefCell;
use std::error::Error as StdError;
use std::ffi::c_char;
use thiserror::Error;

/// Capacity of the per-thread error text, terminator included. Longer
/// renderings are truncated.
pub const LAST_ERROR_CAP: usize = 1024;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Handle is NULL or already destroyed")]
    NullHandle,
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    NotConnected(ClientError),
    #[error(transparent)]
    ConnectionFailed(ClientError),
    #[error(transparent)]
    NotFound(ClientError),
    #[error(transparent)]
    NotReady(ClientError),
    #[error(transparent)]
    InvalidData(ClientError),
    #[error("{message}")]
    Fault {
        message: String,
        #[source]
        source: Option<ClientError>,
    },
}

pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    pub fn code(&self) -> SimWireResult {
        match self {
            BridgeError::NullHandle => SIMWIRE_ERR_NULL_HANDLE,
            BridgeError::InvalidArgument(_) => SIMWIRE_ERR_INVALID_ARGUMENT,
            BridgeError::NotConnected(_) => SIMWIRE_ERR_NOT_CONNECTED,
            BridgeError::ConnectionFailed(_) => SIMWIRE_ERR_CONNECTION_FAILED,
            BridgeError::NotFound(_) => SIMWIRE_ERR_DATAREF_NOT_FOUND,
            BridgeError::NotReady(_) => SIMWIRE_ERR_DATAREF_NOT_READY,
            BridgeError::InvalidData(_) => SIMWIRE_ERR_INVALID_DATA,
            BridgeError::Fault { .. } => SIMWIRE_ERR_EXCEPTION,
        }
    }

    /// Short taxonomy label prefixing the rendered error text.
    pub fn kind_label(&self) -> &'static str {
        match self {
            BridgeError::NullHandle => "NullHandle",
            BridgeError::InvalidArgument(_) => "InvalidArgument",
            BridgeError::NotConnected(_) => "NotConnected",
            BridgeError::ConnectionFailed(_) => "ConnectionFailed",
            BridgeError::NotFound(_) => "NotFound",
            BridgeError::NotReady(_) => "NotReady",
            BridgeError::InvalidData(_) => "InvalidData",
            BridgeError::Fault { .. } => "Exception",
        }
    }
}

impl From<ClientError> for BridgeError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotConnected => BridgeError::NotConnected(err),
            ClientError::ConnectionFailed { .. } => BridgeError::ConnectionFailed(err),
            ClientError::NotFound(_) => BridgeError::NotFound(err),
            ClientError::NotReady { .. } => BridgeError::NotReady(err),
            ClientError::InvalidData { .. } => BridgeError::InvalidData(err),
            ClientError::ChannelClosed | ClientError::Config(_) => BridgeError::Fault {
                message: "Unexpected client failure".to_string(),
                source: Some(err),
            },
        }
    }
}

/// Render an error as `"<Kind>: <message>"` plus one `-->` line per
/// link of the source chain.
pub fn render_error(err: &BridgeError) -> String {
    let mut text = format!("{}: {}", err.kind_label(), err);
    let mut cause = err.source();
    while let Some(link) = cause {
        text.push_str("\n  --> ");
        text.push_str(&link.to_string());
        cause = link.source();
    }
    text
}

thread_local! {
    // Boxed so the address survives everything except thread exit.
    static LAST_ERROR: RefCell<Box<[u8; LAST_ERROR_CAP]>> =
        RefCell::new(Box::new([0u8; LAST_ERROR_CAP]));
}

/// Overwrite the calling thread's error text, truncating at the cap.
/// Interior NULs truncate the visible text, as C strings do.
pub fn set_last_error(text: &str) {
    LAST_ERROR.with(|buffer| {
        let mut buffer = buffer.borrow_mut();
        let bytes = text.as_bytes();
        let len = bytes.len().min(LAST_ERROR_CAP - 1);
        buffer[..len].copy_from_slice(&bytes[..len]);
        buffer[len] = 0;
    });
}

pub fn clear_last_error() {
    LAST_ERROR.with(|buffer| buffer.borrow_mut()[0] = 0);
}

/// Address of the calling thread's error buffer. Stable for the
/// thread's lifetime; the text it holds is valid until the next entry
/// point runs on this thread.
pub fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|buffer| buffer.borrow().as_ptr() as *const c_char)
}

/// Record a failure on the calling thread and hand back its code.
pub fn record_failure(err: &BridgeError) -> SimWireResult {
    let rendered = render_error(err);
    debug!("entry point failed: {rendered}");
    set_last_error(&rendered);
    err.code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::ffi::CStr;

    fn last_error_text() -> String {
        unsafe { CStr::from_ptr(last_error_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    #[rstest]
    #[case(BridgeError::NullHandle, SIMWIRE_ERR_NULL_HANDLE)]
    #[case(BridgeError::InvalidArgument("x".into()), SIMWIRE_ERR_INVALID_ARGUMENT)]
    #[case(ClientError::NotConnected.into(), SIMWIRE_ERR_NOT_CONNECTED)]
    #[case(
        ClientError::ConnectionFailed { host: "h".into(), reason: "r".into() }.into(),
        SIMWIRE_ERR_CONNECTION_FAILED
    )]
    #[case(ClientError::NotFound("x".into()).into(), SIMWIRE_ERR_DATAREF_NOT_FOUND)]
    #[case(ClientError::not_ready("x").into(), SIMWIRE_ERR_DATAREF_NOT_READY)]
    #[case(ClientError::invalid_data("x", "bad").into(), SIMWIRE_ERR_INVALID_DATA)]
    #[case(ClientError::ChannelClosed.into(), SIMWIRE_ERR_EXCEPTION)]
    fn test_code_classification(#[case] err: BridgeError, #[case] expected: SimWireResult) {
        assert_eq!(err.code(), expected);
    }

    #[test]
    fn test_render_carries_kind_and_message() {
        let err: BridgeError = ClientError::not_ready("fuel.total").into();
        assert_eq!(
            render_error(&err),
            "NotReady: 'fuel.total' has not received a value yet"
        );
    }

    #[test]
    fn test_render_walks_the_source_chain() {
        let err: BridgeError = ClientError::ChannelClosed.into();
        let rendered = render_error(&err);
        assert!(rendered.starts_with("Exception: Unexpected client failure"));
        assert!(rendered.contains("--> Change stream closed"));
    }

    #[test]
    fn test_channel_set_read_clear() {
        set_last_error("something broke");
        assert_eq!(last_error_text(), "something broke");
        clear_last_error();
        assert_eq!(last_error_text(), "");
    }

    #[test]
    fn test_channel_truncates_at_cap() {
        let long = "x".repeat(4 * LAST_ERROR_CAP);
        set_last_error(&long);
        assert_eq!(last_error_text().len(), LAST_ERROR_CAP - 1);
    }

    #[test]
    fn test_channel_pointer_is_stable() {
        set_last_error("first");
        let before = last_error_ptr();
        set_last_error("second, much longer than the first one");
        assert_eq!(before, last_error_ptr());
    }

    #[test]
    fn test_interior_nul_truncates_visible_text() {
        set_last_error("head\0tail");
        assert_eq!(last_error_text(), "head");
    }
}
