//! Correction engine
//!
//! Pure arithmetic turning a row of raw readings into the values that decide
//! pass/fail:
//!
//! ```text
//! readings → mean → interpolated correction → corrected mean → deviation %
//! ```
//!
//! Every function here is referentially transparent so rows can be
//! recomputed optimistically on each keystroke.

use crate::models::ReferenceTable;
use serde::{Deserialize, Serialize};

/// Default pass/fail limit on |deviation %|
pub const DEFAULT_TOLERANCE_PERCENT: f64 = 4.0;

/// Derived values for one measurement row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectionResult {
    pub mean: f64,
    /// Interpolated reference correction, never negative
    pub correction: f64,
    pub corrected_mean: f64,
    pub deviation_percent: f64,
}

impl CorrectionResult {
    pub fn passes(&self, tolerance_percent: f64) -> bool {
        within_tolerance(self.deviation_percent, tolerance_percent)
    }
}

/// Parse one reading slot
///
/// Blank, non-numeric and non-finite input all count as "not entered".
pub fn parse_reading(slot: &str) -> Option<f64> {
    let trimmed = slot.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse every slot, or nothing
///
/// Returns `None` unless exactly `expected` slots are present and all of them
/// are numeric.
pub fn parse_readings(slots: &[String], expected: usize) -> Option<Vec<f64>> {
    if slots.len() != expected {
        return None;
    }
    slots.iter().map(|s| parse_reading(s)).collect()
}

/// Arithmetic mean; `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Linear interpolation of the correction at `value`
///
/// Outside the table the nearest point's error is used; an empty table
/// yields 0. The result is the absolute value of the interpolated error.
pub fn interpolate_correction(table: &ReferenceTable, value: f64) -> f64 {
    let correction = match table.bracket(value) {
        (None, None) => 0.0,
        (Some(point), None) | (None, Some(point)) => point.error_value,
        (Some(lower), Some(upper)) => {
            let span = upper.indicated_value - lower.indicated_value;
            if span == 0.0 {
                lower.error_value
            } else {
                lower.error_value
                    + (value - lower.indicated_value) * (upper.error_value - lower.error_value)
                        / span
            }
        }
    };
    correction.abs()
}

/// Relative deviation of `corrected_mean` from `target_value`, in percent
///
/// A zero target yields 0 rather than a division by zero.
pub fn deviation_percent(corrected_mean: f64, target_value: f64) -> f64 {
    if target_value == 0.0 {
        return 0.0;
    }
    (corrected_mean - target_value) * 100.0 / target_value
}

pub fn within_tolerance(deviation_percent: f64, tolerance_percent: f64) -> bool {
    deviation_percent.abs() <= tolerance_percent
}

/// Full correction for a set of numeric readings
pub fn correct(readings: &[f64], table: &ReferenceTable, target_value: f64) -> Option<CorrectionResult> {
    let mean = mean(readings)?;
    let correction = interpolate_correction(table, mean);
    let corrected_mean = mean - correction;

    Some(CorrectionResult {
        mean,
        correction,
        corrected_mean,
        deviation_percent: deviation_percent(corrected_mean, target_value),
    })
}

/// Correction straight from reading slots
///
/// All-or-nothing: any missing or non-numeric slot yields `None`.
pub fn correct_slots(
    slots: &[String],
    expected: usize,
    table: &ReferenceTable,
    target_value: f64,
) -> Option<CorrectionResult> {
    let readings = parse_readings(slots, expected)?;
    correct(&readings, table, target_value)
}
