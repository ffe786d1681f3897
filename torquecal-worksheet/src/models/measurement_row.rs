//! Measurement row model
//!
//! One row per measurement step. Raw readings are kept as entered (strings);
//! derived statistics are recomputed from them on every edit and have no
//! setters of their own.

use crate::models::ReferenceTable;
use crate::services::correction::{self, CorrectionResult};
use crate::{WorksheetError, WorksheetResult};
use serde::{Deserialize, Serialize};

/// Measurement step with raw readings and derived values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRow {
    /// Percentage of max torque (stage A) or sequence ordinal (fixed stages)
    pub step_key: u32,
    /// Nominal torque this row is compared against
    pub target_value: f64,
    readings: Vec<String>,
    mean: Option<f64>,
    corrected_reference: Option<f64>,
    corrected_mean: Option<f64>,
    deviation_percent: Option<f64>,
    pub unit: String,
}

impl MeasurementRow {
    /// Create an empty row with `slots` blank readings
    pub fn new(step_key: u32, target_value: f64, slots: usize, unit: impl Into<String>) -> Self {
        Self {
            step_key,
            target_value,
            readings: vec![String::new(); slots],
            mean: None,
            corrected_reference: None,
            corrected_mean: None,
            deviation_percent: None,
            unit: unit.into(),
        }
    }

    /// Install previously persisted readings
    ///
    /// The row keeps its slot count: extra readings are dropped, missing ones
    /// stay blank.
    pub fn load_readings(&mut self, readings: &[String], table: &ReferenceTable) {
        let slots = self.readings.len();
        for (slot, value) in self.readings.iter_mut().zip(readings.iter()) {
            *slot = value.clone();
        }
        if !readings.is_empty() && readings.len() != slots {
            tracing::warn!(
                step_key = self.step_key,
                expected = slots,
                got = readings.len(),
                "Persisted reading count does not match row layout"
            );
        }
        self.recompute(table);
    }

    /// Update one reading slot and recompute
    pub fn set_reading(
        &mut self,
        slot: usize,
        value: impl Into<String>,
        table: &ReferenceTable,
    ) -> WorksheetResult<()> {
        let slots = self.readings.len();
        let target = self
            .readings
            .get_mut(slot)
            .ok_or(WorksheetError::SlotOutOfRange { slot, slots })?;
        *target = value.into();
        self.recompute(table);
        Ok(())
    }

    /// Blank every reading
    pub fn clear(&mut self, table: &ReferenceTable) {
        self.readings.iter_mut().for_each(String::clear);
        self.recompute(table);
    }

    /// Recompute derived values from readings, target and table
    pub fn recompute(&mut self, table: &ReferenceTable) {
        let result = correction::correct_slots(
            &self.readings,
            self.readings.len(),
            table,
            self.target_value,
        );
        self.mean = result.map(|r| r.mean);
        self.corrected_reference = result.map(|r| r.correction);
        self.corrected_mean = result.map(|r| r.corrected_mean);
        self.deviation_percent = result.map(|r| r.deviation_percent);
    }

    pub fn readings(&self) -> &[String] {
        &self.readings
    }

    pub fn slot_count(&self) -> usize {
        self.readings.len()
    }

    pub fn mean(&self) -> Option<f64> {
        self.mean
    }

    pub fn corrected_reference(&self) -> Option<f64> {
        self.corrected_reference
    }

    pub fn corrected_mean(&self) -> Option<f64> {
        self.corrected_mean
    }

    pub fn deviation_percent(&self) -> Option<f64> {
        self.deviation_percent
    }

    /// Derived values as one struct, if complete
    pub fn result(&self) -> Option<CorrectionResult> {
        Some(CorrectionResult {
            mean: self.mean?,
            correction: self.corrected_reference?,
            corrected_mean: self.corrected_mean?,
            deviation_percent: self.deviation_percent?,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.deviation_percent.is_some()
    }

    /// Pass/fail; `None` while readings are incomplete
    pub fn passes(&self, tolerance_percent: f64) -> Option<bool> {
        self.deviation_percent
            .map(|d| correction::within_tolerance(d, tolerance_percent))
    }
}
