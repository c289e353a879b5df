//! Inbound measurement submissions and the results computed from them.
//!
//! Clients send loosely-typed JSON (numbers or numeric strings), so
//! [`Measurement::from_json`] coerces each field instead of relying on a
//! strict `Deserialize` derive.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::types::RecordId;

// ---------------------------------------------------------------------------
// Measurement
// ---------------------------------------------------------------------------

/// A single blood-pressure submission for an upstream record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub id: RecordId,
    /// Systolic pressure, absent when missing or not numeric.
    pub sys: Option<f64>,
    /// Diastolic pressure, absent when missing or not numeric.
    pub dia: Option<f64>,
}

impl Measurement {
    /// Build a measurement from a decoded request body.
    ///
    /// `id` is required and must be integer-coercible. `sys` and `dia` are
    /// optional: anything that cannot be read as a finite number becomes
    /// `None` rather than an error.
    pub fn from_json(payload: &Value) -> Result<Self, CoreError> {
        let raw_id = payload
            .as_object()
            .and_then(|fields| fields.get("id"))
            .ok_or(CoreError::MissingField("id"))?;

        let id = coerce_record_id(raw_id).ok_or(CoreError::InvalidField("id"))?;

        Ok(Self {
            id,
            sys: payload.get("sys").and_then(coerce_pressure),
            dia: payload.get("dia").and_then(coerce_pressure),
        })
    }
}

/// Integers pass through, floats truncate toward zero, strings must hold an
/// integer literal.
fn coerce_record_id(value: &Value) -> Option<RecordId> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < RecordId::MAX as f64)
                .map(|f| f.trunc() as RecordId)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_pressure(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

// ---------------------------------------------------------------------------
// TaskResult
// ---------------------------------------------------------------------------

/// Output of a staging computation, pushed back to the upstream record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub id: RecordId,
    pub result_map: Option<f64>,
    pub result_stage: String,
}

impl TaskResult {
    /// Whether this result carries enough to be written upstream.
    ///
    /// A zero id or an empty stage label is never delivered.
    pub fn is_deliverable(&self) -> bool {
        self.id != 0 && !self.result_stage.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
