//! Dynamic value marshaling
//!
//! Converts the client's runtime-tagged [`Value`] into the fixed
//! native encodings and back, per call, nothing cached. Scalar
//! coercion rides on [`Value::coerce_to`]; this layer adds the 32-bit
//! narrowing, the record conversions and the buffer-negotiation copy
//! for outbound text. Every function takes the slot name purely for
//! error context.

use crate::error::{BridgeError, BridgeResult};
use crate::types::{SimWireDateTime, SimWireReposition, SimWireResult, SIMWIRE_OK};
use chrono::{Datelike, Timelike};
use simwire_client::value::timestamp_millis;
use simwire_client::{ClientError, Reposition, Value, ValueKind};
use std::ffi::c_char;

fn invalid(name: &str, reason: impl Into<String>) -> BridgeError {
    ClientError::invalid_data(name, reason).into()
}

fn not_ready(name: &str) -> BridgeError {
    ClientError::not_ready(name).into()
}

fn coerce(name: &str, value: &Value, target: ValueKind) -> BridgeResult<Value> {
    if value.is_not_ready() {
        return Err(not_ready(name));
    }
    value.coerce_to(target).map_err(|reason| invalid(name, reason))
}

pub fn to_i32(name: &str, value: &Value) -> BridgeResult<i32> {
    match coerce(name, value, ValueKind::Integer)? {
        Value::Integer(wide) => i32::try_from(wide)
            .map_err(|_| invalid(name, format!("{wide} is out of the 32-bit range"))),
        other => Err(invalid(name, format!("unexpected {} value", other.kind_name()))),
    }
}

pub fn to_f64(name: &str, value: &Value) -> BridgeResult<f64> {
    match coerce(name, value, ValueKind::Float)? {
        Value::Float(v) => Ok(v),
        other => Err(invalid(name, format!("unexpected {} value", other.kind_name()))),
    }
}

pub fn to_bool(name: &str, value: &Value) -> BridgeResult<bool> {
    match coerce(name, value, ValueKind::Bool)? {
        Value::Bool(v) => Ok(v),
        other => Err(invalid(name, format!("unexpected {} value", other.kind_name()))),
    }
}

pub fn to_text(name: &str, value: &Value) -> BridgeResult<String> {
    match coerce(name, value, ValueKind::Text)? {
        Value::Text(v) => Ok(v.as_ref().clone()),
        other => Err(invalid(name, format!("unexpected {} value", other.kind_name()))),
    }
}

pub fn to_datetime(name: &str, value: &Value) -> BridgeResult<SimWireDateTime> {
    match coerce(name, value, ValueKind::Timestamp)? {
        Value::Timestamp(dt) => Ok(SimWireDateTime {
            year: dt.year(),
            month: dt.month() as i32,
            day: dt.day() as i32,
            hour: dt.hour() as i32,
            minute: dt.minute() as i32,
            second: dt.second() as i32,
            millisecond: timestamp_millis(&dt) as i32,
        }),
        other => Err(invalid(name, format!("unexpected {} value", other.kind_name()))),
    }
}

pub fn from_datetime(name: &str, record: &SimWireDateTime) -> BridgeResult<Value> {
    let part = |label: &str, field: i32| -> BridgeResult<u32> {
        u32::try_from(field).map_err(|_| invalid(name, format!("{label} {field} is negative")))
    };
    let month = part("month", record.month)?;
    let day = part("day", record.day)?;
    let hour = part("hour", record.hour)?;
    let minute = part("minute", record.minute)?;
    let second = part("second", record.second)?;
    let millisecond = part("millisecond", record.millisecond)?;
    Value::timestamp_from_parts(record.year, month, day, hour, minute, second, millisecond)
        .ok_or_else(|| {
            invalid(
                name,
                format!(
                    "{}-{:02}-{:02} {:02}:{:02}:{:02}.{:03} is not a valid civil time",
                    record.year, month, day, hour, minute, second, millisecond
                ),
            )
        })
}

pub fn from_reposition(record: &SimWireReposition) -> Value {
    Value::Reposition(Reposition {
        latitude: record.latitude,
        longitude: record.longitude,
        altitude: record.altitude,
        heading_magnetic: record.heading_magnetic,
        pitch: record.pitch,
        bank: record.bank,
        ias: record.ias,
        on_ground: record.on_ground,
    })
}

/// Copy `text` into a caller-provided buffer under the
/// size-negotiation contract: `Ok(SIMWIRE_OK)` once the text and its
/// terminator fit, otherwise `Ok(required_size)` with the buffer left
/// untouched. Text is truncated at the first interior NUL.
///
/// # Safety
/// `buffer` must point to at least `buffer_len` writable bytes when it
/// is non-null (null and non-positive lengths are rejected as invalid
/// arguments, not dereferenced).
pub unsafe fn copy_text_out(
    text: &str,
    buffer: *mut c_char,
    buffer_len: i32,
) -> BridgeResult<SimWireResult> {
    if buffer.is_null() {
        return Err(BridgeError::InvalidArgument("buffer is NULL".to_string()));
    }
    if buffer_len <= 0 {
        return Err(BridgeError::InvalidArgument(
            "buffer length must be positive".to_string(),
        ));
    }
    let text = match text.find('\0') {
        Some(cut) => &text[..cut],
        None => text,
    };
    let required = i32::try_from(text.len() + 1).map_err(|_| {
        BridgeError::InvalidArgument("text exceeds the addressable buffer size".to_string())
    })?;
    if buffer_len < required {
        return Ok(required);
    }
    std::ptr::copy_nonoverlapping(text.as_ptr(), buffer as *mut u8, text.len());
    *buffer.add(text.len()) = 0;
    Ok(SIMWIRE_OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(Value::Integer(5_000), 5_000)]
    #[case(Value::Float(99.5), 100)]
    #[case(Value::Float(-2.5), -3)]
    #[case(Value::Bool(true), 1)]
    #[case(Value::text(" 42 "), 42)]
    fn test_to_i32_coercions(#[case] value: Value, #[case] expected: i32) {
        assert_eq!(to_i32("x", &value).unwrap(), expected);
    }

    #[rstest]
    #[case(Value::Integer(i64::from(i32::MAX) + 1))]
    #[case(Value::Float(3.0e9))]
    #[case(Value::text("many"))]
    #[case(Value::timestamp_from_parts(2025, 1, 1, 0, 0, 0, 0).unwrap())]
    fn test_to_i32_rejects_unrepresentable(#[case] value: Value) {
        assert!(matches!(
            to_i32("x", &value),
            Err(BridgeError::InvalidData(_))
        ));
    }

    #[rstest]
    #[case(Value::Integer(5_000), 5_000.0)]
    #[case(Value::Float(2.5), 2.5)]
    #[case(Value::Bool(false), 0.0)]
    #[case(Value::text("-12.25"), -12.25)]
    fn test_to_f64_coercions(#[case] value: Value, #[case] expected: f64) {
        assert_eq!(to_f64("x", &value).unwrap(), expected);
    }

    #[rstest]
    #[case(Value::Integer(0), false)]
    #[case(Value::Integer(-3), true)]
    #[case(Value::Float(0.1), true)]
    #[case(Value::text("TRUE"), true)]
    #[case(Value::text("0"), false)]
    fn test_to_bool_coercions(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(to_bool("x", &value).unwrap(), expected);
    }

    #[rstest]
    #[case(Value::Integer(5_000), "5000")]
    #[case(Value::Float(5_000.0), "5000")]
    #[case(Value::Bool(true), "true")]
    #[case(Value::text("QNH 1013"), "QNH 1013")]
    fn test_to_text_renders_everything_ready(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(to_text("x", &value).unwrap(), expected);
    }

    #[test]
    fn test_not_ready_is_distinct_for_every_target() {
        assert!(matches!(to_i32("x", &Value::NotReady), Err(BridgeError::NotReady(_))));
        assert!(matches!(to_f64("x", &Value::NotReady), Err(BridgeError::NotReady(_))));
        assert!(matches!(to_bool("x", &Value::NotReady), Err(BridgeError::NotReady(_))));
        assert!(matches!(to_text("x", &Value::NotReady), Err(BridgeError::NotReady(_))));
        assert!(matches!(
            to_datetime("x", &Value::NotReady),
            Err(BridgeError::NotReady(_))
        ));
    }

    #[test]
    fn test_datetime_round_trip() {
        let record = SimWireDateTime {
            year: 2025,
            month: 12,
            day: 25,
            hour: 14,
            minute: 30,
            second: 0,
            millisecond: 0,
        };
        let value = from_datetime("x", &record).unwrap();
        assert_eq!(to_datetime("x", &value).unwrap(), record);
    }

    #[rstest]
    #[case(13, 1, 0)] // month out of range
    #[case(2, 30, 0)] // February 30th
    #[case(1, 1, -5)] // negative component
    fn test_from_datetime_rejects_impossible_dates(
        #[case] month: i32,
        #[case] day: i32,
        #[case] millisecond: i32,
    ) {
        let record = SimWireDateTime {
            year: 2025,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
            millisecond,
        };
        assert!(matches!(
            from_datetime("x", &record),
            Err(BridgeError::InvalidData(_))
        ));
    }

    #[test]
    fn test_from_reposition_copies_all_fields() {
        let record = SimWireReposition {
            latitude: 51.4775,
            longitude: -0.4614,
            altitude: 83.0,
            heading_magnetic: 271.4,
            pitch: -0.5,
            bank: 0.0,
            ias: 0.0,
            on_ground: true,
        };
        let Value::Reposition(r) = from_reposition(&record) else {
            panic!("expected a reposition value");
        };
        assert_eq!(r.latitude, record.latitude);
        assert_eq!(r.longitude, record.longitude);
        assert_eq!(r.heading_magnetic, record.heading_magnetic);
        assert!(r.on_ground);
    }

    #[test]
    fn test_copy_text_out_success_and_negotiation() {
        let mut buf = [0x7f_u8; 8];
        // "hello" needs 6 bytes; a 5-byte window negotiates up
        let required =
            unsafe { copy_text_out("hello", buf.as_mut_ptr() as *mut c_char, 5) }.unwrap();
        assert_eq!(required, 6);
        assert!(buf.iter().all(|&b| b == 0x7f), "short buffer was written");

        let code = unsafe { copy_text_out("hello", buf.as_mut_ptr() as *mut c_char, 6) }.unwrap();
        assert_eq!(code, SIMWIRE_OK);
        assert_eq!(&buf[..6], b"hello\0");
        assert_eq!(buf[6], 0x7f);
    }

    #[test]
    fn test_copy_text_out_truncates_at_interior_nul() {
        let mut buf = [0x7f_u8; 8];
        let code =
            unsafe { copy_text_out("ab\0cd", buf.as_mut_ptr() as *mut c_char, 8) }.unwrap();
        assert_eq!(code, SIMWIRE_OK);
        assert_eq!(&buf[..3], b"ab\0");
    }

    #[test]
    fn test_copy_text_out_validates_arguments() {
        let mut buf = [0u8; 4];
        assert!(matches!(
            unsafe { copy_text_out("x", std::ptr::null_mut(), 4) },
            Err(BridgeError::InvalidArgument(_))
        ));
        assert!(matches!(
            unsafe { copy_text_out("x", buf.as_mut_ptr() as *mut c_char, 0) },
            Err(BridgeError::InvalidArgument(_))
        ));
        assert!(matches!(
            unsafe { copy_text_out("x", buf.as_mut_ptr() as *mut c_char, -3) },
            Err(BridgeError::InvalidArgument(_))
        ));
    }
}
