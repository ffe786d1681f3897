//! Reference table of correction control points
//!
//! Backend-supplied lookup of (indicated value → error value) pairs for the
//! torque transducer in use. Immutable once built; kept sorted ascending by
//! indicated value.

use serde::{Deserialize, Serialize};

/// One control point of the reference table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    /// Value shown by the reference transducer
    pub indicated_value: f64,
    /// Error of the transducer at that value
    pub error_value: f64,
}

impl ReferencePoint {
    pub fn new(indicated_value: f64, error_value: f64) -> Self {
        Self {
            indicated_value,
            error_value,
        }
    }
}

/// Sorted, immutable reference table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTable {
    points: Vec<ReferencePoint>,
}

impl ReferenceTable {
    /// Build a table from backend points
    ///
    /// Non-finite points are dropped. The sort is stable, so duplicate keys
    /// keep backend order and lookups resolve to the first of them.
    pub fn new(points: Vec<ReferencePoint>) -> Self {
        let total = points.len();
        let mut points: Vec<ReferencePoint> = points
            .into_iter()
            .filter(|p| p.indicated_value.is_finite() && p.error_value.is_finite())
            .collect();

        if points.len() != total {
            tracing::warn!(
                dropped = total - points.len(),
                "Dropped non-finite reference points"
            );
        }

        points.sort_by(|a, b| a.indicated_value.total_cmp(&b.indicated_value));
        Self { points }
    }

    pub fn points(&self) -> &[ReferencePoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Nearest control points around `value`
    ///
    /// Returns `(lower, upper)` where `lower` is the nearest point with
    /// `indicated_value <= value` and `upper` the nearest with
    /// `indicated_value >= value`. Both are the same point on an exact hit.
    pub fn bracket(&self, value: f64) -> (Option<&ReferencePoint>, Option<&ReferencePoint>) {
        // First index with indicated >= value
        let upper_idx = self.points.partition_point(|p| p.indicated_value < value);
        let upper = self.points.get(upper_idx);

        // Last key <= value, resolved to the first point carrying that key
        let past_lower = self.points.partition_point(|p| p.indicated_value <= value);
        let lower = past_lower.checked_sub(1).map(|i| {
            let key = self.points[i].indicated_value;
            let first = self.points.partition_point(|p| p.indicated_value < key);
            &self.points[first]
        });

        (lower, upper)
    }
}

impl From<Vec<ReferencePoint>> for ReferenceTable {
    fn from(points: Vec<ReferencePoint>) -> Self {
        Self::new(points)
    }
}
