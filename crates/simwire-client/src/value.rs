//! Runtime value representation
//!
//! Shared value representation for hub slots and DataRef reads.
//! - Integers, floats, bools: immediate values
//! - Text: heap-allocated, reference-counted (Arc<String>), immutable
//! - Timestamp: civil date and time (no timezone), millisecond precision
//! - Reposition: composite spatial command, written as one unit
//! - NotReady: a slot that has been defined but never populated

use chrono::{NaiveDateTime, Timelike};
use std::fmt;
use std::sync::Arc;

/// Kind tag for [`Value`]. Hub slots declare one of the data kinds;
/// `NotReady` only ever describes a value, never a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    NotReady,
    Integer,
    Float,
    Bool,
    Text,
    Timestamp,
    Reposition,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::NotReady => "not ready",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Bool => "bool",
            ValueKind::Text => "text",
            ValueKind::Timestamp => "timestamp",
            ValueKind::Reposition => "reposition",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Composite spatial command: place the aircraft somewhere, all fields
/// applied together. Write-only on the wire; reads of a reposition
/// slot only render as text.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Reposition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub heading_magnetic: f64,
    pub pitch: f64,
    pub bank: f64,
    pub ias: f64,
    pub on_ground: bool,
}

impl fmt::Display for Reposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reposition({:.6}, {:.6}, alt {:.1}, hdg {:.1}, pitch {:.1}, bank {:.1}, ias {:.1}, {})",
            self.latitude,
            self.longitude,
            self.altitude,
            self.heading_magnetic,
            self.pitch,
            self.bank,
            self.ias,
            if self.on_ground { "on ground" } else { "airborne" }
        )
    }
}

/// Runtime value type
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// No value has been received yet (distinct transient state, not an error)
    NotReady,
    /// Signed integer value
    Integer(i64),
    /// IEEE 754 double-precision value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Text value (reference-counted, immutable)
    Text(Arc<String>),
    /// Civil date and time, millisecond precision
    Timestamp(NaiveDateTime),
    /// Composite spatial command
    Reposition(Reposition),
}

/// Render format for timestamps, also accepted when parsing text.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const TIMESTAMP_FORMAT_SHORT: &str = "%Y-%m-%d %H:%M:%S";

impl Value {
    /// Create a new text value
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(Arc::new(s.into()))
    }

    /// Build a timestamp from civil components. `None` when the
    /// components do not name a real instant (month 13, Feb 30, ...).
    pub fn timestamp_from_parts(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        millisecond: u32,
    ) -> Option<Self> {
        chrono::NaiveDate::from_ymd_opt(year, month, day)?
            .and_hms_milli_opt(hour, minute, second, millisecond)
            .map(Value::Timestamp)
    }

    /// Get the kind tag of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::NotReady => ValueKind::NotReady,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Bool,
            Value::Text(_) => ValueKind::Text,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::Reposition(_) => ValueKind::Reposition,
        }
    }

    /// Get the kind name of this value
    pub fn kind_name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, Value::NotReady)
    }

    /// Convert this value to the target kind, cloning when the kinds
    /// already match. The coercion table is deliberately small:
    ///
    /// - integer <-> float (floats round to nearest), either <-> bool
    ///   (nonzero is true, true is 1)
    /// - text parses to integer, float, bool, or timestamp
    /// - every ready value renders to text
    /// - composites (timestamp, reposition) never coerce to scalars
    ///
    /// Failures return the human-readable reason; callers wrap it into
    /// their own error type.
    pub fn coerce_to(&self, target: ValueKind) -> Result<Value, String> {
        if self.kind() == target {
            return Ok(self.clone());
        }
        match (self, target) {
            (Value::NotReady, _) => Err("no value has been received yet".to_string()),
            (v, ValueKind::Text) => Ok(Value::text(v.to_string())),
            (Value::Float(f), ValueKind::Integer) => {
                if !f.is_finite() {
                    return Err(format!("{f} is not a finite number"));
                }
                let rounded = f.round();
                if rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
                    Err(format!("{f} is out of integer range"))
                } else {
                    Ok(Value::Integer(rounded as i64))
                }
            }
            (Value::Bool(b), ValueKind::Integer) => Ok(Value::Integer(i64::from(*b))),
            (Value::Text(s), ValueKind::Integer) => s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| format!("'{s}' is not an integer")),
            (Value::Integer(i), ValueKind::Float) => Ok(Value::Float(*i as f64)),
            (Value::Bool(b), ValueKind::Float) => {
                Ok(Value::Float(if *b { 1.0 } else { 0.0 }))
            }
            (Value::Text(s), ValueKind::Float) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Value::Float(f)),
                _ => Err(format!("'{s}' is not a number")),
            },
            (Value::Integer(i), ValueKind::Bool) => Ok(Value::Bool(*i != 0)),
            (Value::Float(f), ValueKind::Bool) => Ok(Value::Bool(*f != 0.0)),
            (Value::Text(s), ValueKind::Bool) => {
                match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Ok(Value::Bool(true)),
                    "false" | "0" => Ok(Value::Bool(false)),
                    _ => Err(format!("'{s}' is not a boolean")),
                }
            }
            (Value::Text(s), ValueKind::Timestamp) => parse_timestamp(s)
                .map(Value::Timestamp)
                .ok_or_else(|| format!("'{s}' is not a timestamp")),
            (v, t) => Err(format!("cannot convert {} to {}", v.kind_name(), t.name())),
        }
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT_SHORT))
        .ok()
}

/// Milliseconds within the second, saturated for leap seconds.
pub fn timestamp_millis(dt: &NaiveDateTime) -> u32 {
    (dt.time().nanosecond() / 1_000_000).min(999)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NotReady => write!(f, "<not ready>"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Timestamp(dt) => write!(f, "{}", dt.format(TIMESTAMP_FORMAT)),
            Value::Reposition(r) => write!(f, "{r}"),
        }
    }
}
