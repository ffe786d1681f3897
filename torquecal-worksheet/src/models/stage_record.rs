//! Stage records and their layouts
//!
//! Each measurement stage (A–E) owns an ordered set of rows. Stage A is
//! dynamic (rows appear and disappear with the selected percentage steps);
//! B–E have a fixed number of sequences created up front.

use crate::models::{Equipment, MeasurementRow, ReferenceTable};
use crate::{WorksheetError, WorksheetResult};
use serde::{Deserialize, Serialize};
use torquecal_common::events::StageId;

/// Stage-level figure derived from the rows' corrected means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageMetric {
    /// Largest |deviation %| over all rows
    WorstDeviation,
    /// max − min corrected mean
    Spread,
    /// |first − second| corrected mean
    AbsoluteDifference,
}

/// Where a stage's rows come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSet {
    /// Rows keyed by percentage of max torque, added and removed by the user
    Dynamic,
    /// Rows keyed 1..=count, created at initialisation
    Fixed { count: u32 },
}

/// Static description of a measurement stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageLayout {
    pub stage: StageId,
    pub rows: RowSet,
    pub readings_per_row: usize,
    pub metric: StageMetric,
}

impl StageLayout {
    /// Layout for a measurement stage; `None` for PRE/POST
    pub fn for_stage(stage: StageId) -> Option<StageLayout> {
        let (rows, readings_per_row, metric) = match stage {
            StageId::Repeatability => (RowSet::Dynamic, 5, StageMetric::WorstDeviation),
            StageId::Reproducibility => (RowSet::Fixed { count: 4 }, 5, StageMetric::Spread),
            StageId::OutputDrive => (RowSet::Fixed { count: 4 }, 10, StageMetric::Spread),
            StageId::DriveInterface => (RowSet::Fixed { count: 4 }, 10, StageMetric::Spread),
            StageId::LoadingPoint => {
                (RowSet::Fixed { count: 2 }, 10, StageMetric::AbsoluteDifference)
            }
            StageId::PreCheck | StageId::PostCheck => return None,
        };
        Some(StageLayout {
            stage,
            rows,
            readings_per_row,
            metric,
        })
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.rows, RowSet::Dynamic)
    }

    /// Nominal torque for a row of this stage
    ///
    /// Stage A rows target `max_torque × pct / 100`; fixed stages all test at
    /// the lowest specified value.
    pub fn target_for(&self, step_key: u32, equipment: &Equipment) -> f64 {
        match self.rows {
            RowSet::Dynamic => equipment.max_torque * f64::from(step_key) / 100.0,
            RowSet::Fixed { .. } => equipment.min_torque,
        }
    }
}

/// Rows of one measurement stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: StageId,
    rows: Vec<MeasurementRow>,
    metric: StageMetric,
    metric_value: Option<f64>,
}

impl StageRecord {
    /// Initialise a stage from its layout
    ///
    /// Fixed stages get all their rows (blank); dynamic stages start empty.
    pub fn initialise(layout: &StageLayout, equipment: &Equipment) -> Self {
        let rows = match layout.rows {
            RowSet::Dynamic => Vec::new(),
            RowSet::Fixed { count } => (1..=count)
                .map(|key| {
                    MeasurementRow::new(
                        key,
                        layout.target_for(key, equipment),
                        layout.readings_per_row,
                        equipment.unit.clone(),
                    )
                })
                .collect(),
        };

        Self {
            stage: layout.stage,
            rows,
            metric: layout.metric,
            metric_value: None,
        }
    }

    pub fn rows(&self) -> &[MeasurementRow] {
        &self.rows
    }

    pub fn row(&self, step_key: u32) -> Option<&MeasurementRow> {
        self.rows.iter().find(|r| r.step_key == step_key)
    }

    pub fn step_keys(&self) -> Vec<u32> {
        self.rows.iter().map(|r| r.step_key).collect()
    }

    pub fn metric(&self) -> StageMetric {
        self.metric
    }

    /// Stage-level figure; `None` until every row is complete
    pub fn metric_value(&self) -> Option<f64> {
        self.metric_value
    }

    /// Mutate one row, then refresh the stage metric
    pub fn with_row<T>(
        &mut self,
        step_key: u32,
        f: impl FnOnce(&mut MeasurementRow) -> WorksheetResult<T>,
    ) -> WorksheetResult<T> {
        let stage = self.stage;
        let row = self
            .rows
            .iter_mut()
            .find(|r| r.step_key == step_key)
            .ok_or(WorksheetError::StepNotFound { stage, step_key })?;
        let out = f(row)?;
        self.refresh_metric();
        Ok(out)
    }

    /// Add a dynamic row, keeping rows ordered by key
    pub fn insert_row(&mut self, row: MeasurementRow) -> WorksheetResult<()> {
        if self.row(row.step_key).is_some() {
            return Err(WorksheetError::DuplicateStep {
                stage: self.stage,
                step_key: row.step_key,
            });
        }
        let at = self.rows.partition_point(|r| r.step_key < row.step_key);
        self.rows.insert(at, row);
        self.refresh_metric();
        Ok(())
    }

    /// Remove a dynamic row
    pub fn remove_row(&mut self, step_key: u32) -> WorksheetResult<MeasurementRow> {
        let idx = self
            .rows
            .iter()
            .position(|r| r.step_key == step_key)
            .ok_or(WorksheetError::StepNotFound {
                stage: self.stage,
                step_key,
            })?;
        let row = self.rows.remove(idx);
        self.refresh_metric();
        Ok(row)
    }

    /// Recompute every row against a (possibly new) reference table
    pub fn recompute_all(&mut self, table: &ReferenceTable) {
        self.rows.iter_mut().for_each(|r| r.recompute(table));
        self.refresh_metric();
    }

    /// Complete rows, all passing, at least one row
    pub fn is_valid(&self, tolerance_percent: f64) -> bool {
        !self.rows.is_empty()
            && self
                .rows
                .iter()
                .all(|r| r.passes(tolerance_percent) == Some(true))
    }

    fn refresh_metric(&mut self) {
        self.metric_value = compute_metric(self.metric, &self.rows);
    }
}

fn compute_metric(metric: StageMetric, rows: &[MeasurementRow]) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }

    match metric {
        StageMetric::WorstDeviation => rows
            .iter()
            .map(|r| r.deviation_percent().map(f64::abs))
            .collect::<Option<Vec<f64>>>()
            .map(|devs| devs.into_iter().fold(0.0, f64::max)),
        StageMetric::Spread => {
            let means = rows
                .iter()
                .map(|r| r.corrected_mean())
                .collect::<Option<Vec<f64>>>()?;
            let max = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min = means.iter().copied().fold(f64::INFINITY, f64::min);
            Some(max - min)
        }
        StageMetric::AbsoluteDifference => match rows {
            [first, second, ..] => Some((first.corrected_mean()? - second.corrected_mean()?).abs()),
            _ => None,
        },
    }
}
