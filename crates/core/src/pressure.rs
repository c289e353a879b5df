//! Mean arterial pressure and the stage buckets derived from it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::measurement::{Measurement, TaskResult};

/// MAP at or above this value is stage 2.
pub const STAGE_2_MAP_THRESHOLD: f64 = 100.0;

/// MAP at or above this value is stage 3.
pub const STAGE_3_MAP_THRESHOLD: f64 = 120.0;

/// Severity bucket for a measurement.
///
/// Serialized with the labels the upstream service stores on its records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    #[default]
    #[serde(rename = "Стадия 1")]
    One,
    #[serde(rename = "Стадия 2")]
    Two,
    #[serde(rename = "Стадия 3")]
    Three,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::One => "Стадия 1",
            Stage::Two => "Стадия 2",
            Stage::Three => "Стадия 3",
        }
    }

    /// Bucket a mean arterial pressure value.
    pub fn from_map(map: f64) -> Self {
        if map < STAGE_2_MAP_THRESHOLD {
            Stage::One
        } else if map < STAGE_3_MAP_THRESHOLD {
            Stage::Two
        } else {
            Stage::Three
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mean arterial pressure, `(sys + 2 * dia) / 3`.
pub fn compute_map(sys: Option<f64>, dia: Option<f64>) -> Option<f64> {
    Some((sys? + 2.0 * dia?) / 3.0)
}

/// Stage for the given pressures.
///
/// Missing input still yields a deterministic value: the default stage.
pub fn compute_stage(sys: Option<f64>, dia: Option<f64>) -> Stage {
    compute_map(sys, dia).map(Stage::from_map).unwrap_or_default()
}

/// Run the full computation for a submission.
pub fn evaluate(measurement: &Measurement) -> TaskResult {
    TaskResult {
        id: measurement.id,
        result_map: compute_map(measurement.sys, measurement.dia),
        result_stage: compute_stage(measurement.sys, measurement.dia)
            .label()
            .to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn map_formula() {
        assert_close(compute_map(Some(120.0), Some(80.0)).unwrap(), 280.0 / 3.0);
        assert_close(compute_map(Some(90.0), Some(60.0)).unwrap(), 70.0);
        assert_close(compute_map(Some(0.0), Some(0.0)).unwrap(), 0.0);
        assert_close(compute_map(Some(-3.0), Some(3.0)).unwrap(), 1.0);
    }

    #[test]
    fn map_absent_when_any_input_absent() {
        assert_eq!(compute_map(None, Some(80.0)), None);
        assert_eq!(compute_map(Some(120.0), None), None);
        assert_eq!(compute_map(None, None), None);
    }

    #[test]
    fn stage_thresholds() {
        assert_eq!(Stage::from_map(99.0), Stage::One);
        assert_eq!(Stage::from_map(100.0), Stage::Two);
        assert_eq!(Stage::from_map(119.9), Stage::Two);
        assert_eq!(Stage::from_map(120.0), Stage::Three);
    }

    #[test]
    fn stage_defaults_when_pressure_missing() {
        assert_eq!(compute_stage(None, None), Stage::One);
        assert_eq!(compute_stage(Some(200.0), None), Stage::One);
    }

    #[test]
    fn stage_from_pressures() {
        // MAP 120 exactly.
        assert_eq!(compute_stage(Some(150.0), Some(105.0)), Stage::Three);
        // MAP 110.
        assert_eq!(compute_stage(Some(130.0), Some(100.0)), Stage::Two);
    }

    #[test]
    fn stage_labels_serialize_verbatim() {
        assert_eq!(Stage::Two.to_string(), "Стадия 2");
        assert_eq!(
            serde_json::to_value(Stage::Three).unwrap(),
            serde_json::json!("Стадия 3")
        );
    }

    #[test]
    fn evaluate_builds_result() {
        let result = evaluate(&Measurement {
            id: 42,
            sys: Some(120.0),
            dia: Some(80.0),
        });
        assert_eq!(result.id, 42);
        assert_close(result.result_map.unwrap(), 93.333_333_333_333_33);
        assert_eq!(result.result_stage, "Стадия 1");

        let bare = evaluate(&Measurement {
            id: 5,
            sys: None,
            dia: None,
        });
        assert_eq!(bare.result_map, None);
        assert_eq!(bare.result_stage, "Стадия 1");
    }
}
