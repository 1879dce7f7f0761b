//! Normal operating range calculation
//!
//! The normal range of a feature is the band between two percentiles of its
//! values over cycles labelled with the nominal condition.

use super::BaselineError;
use crate::types::{ConditionCode, FeatureTable, NormalRange, RangeTable};

/// Percentile band and reference class used to derive normal ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeCalculator {
    nominal: ConditionCode,
    lower_pct: f64,
    upper_pct: f64,
}

impl Default for RangeCalculator {
    fn default() -> Self {
        Self {
            nominal: ConditionCode::OPTIMAL,
            lower_pct: 5.0,
            upper_pct: 95.0,
        }
    }
}

impl RangeCalculator {
    /// Percentiles are given on a 0–100 scale.
    pub fn new(nominal: ConditionCode, lower_pct: f64, upper_pct: f64) -> Result<Self, BaselineError> {
        let valid = |p: f64| p.is_finite() && (0.0..=100.0).contains(&p);
        if !valid(lower_pct) || !valid(upper_pct) || lower_pct > upper_pct {
            return Err(BaselineError::InvalidPercentiles(lower_pct, upper_pct));
        }
        Ok(Self {
            nominal,
            lower_pct,
            upper_pct,
        })
    }

    pub const fn nominal(&self) -> ConditionCode {
        self.nominal
    }

    /// Compute the normal range of every feature column.
    ///
    /// Only rows whose label equals the nominal code contribute. Features with
    /// no finite nominal values get no entry, so an empty nominal subset yields
    /// an empty table.
    pub fn compute(
        &self,
        features: &FeatureTable,
        labels: &[ConditionCode],
    ) -> Result<RangeTable, BaselineError> {
        if labels.len() != features.n_rows() {
            return Err(BaselineError::LabelCountMismatch {
                rows: features.n_rows(),
                labels: labels.len(),
            });
        }

        let nominal_rows: Vec<&Vec<f64>> = features
            .rows()
            .iter()
            .zip(labels)
            .filter(|(_, &label)| label == self.nominal)
            .map(|(row, _)| row)
            .collect();

        if nominal_rows.is_empty() {
            tracing::warn!(
                nominal = %self.nominal,
                "No cycles labelled with the nominal condition; normal ranges unavailable"
            );
            return Ok(RangeTable::new());
        }

        let mut table = RangeTable::new();
        for (col, name) in features.names().iter().enumerate() {
            let mut values: Vec<f64> = nominal_rows
                .iter()
                .map(|row| row[col])
                .filter(|v| v.is_finite())
                .collect();
            if values.is_empty() {
                continue;
            }
            values.sort_by(f64::total_cmp);

            let lower = percentile_sorted(&values, self.lower_pct);
            let upper = percentile_sorted(&values, self.upper_pct);
            table.insert(name.clone(), NormalRange::new(lower, upper));
        }

        tracing::info!(
            nominal = %self.nominal,
            cycles = nominal_rows.len(),
            features = table.len(),
            "Normal operating ranges calculated"
        );
        Ok(table)
    }
}

/// Percentile of already-sorted values by linear interpolation between the
/// closest order statistics (rank `h = (n - 1) * p / 100`).
///
/// Returns NaN for an empty slice.
pub fn percentile_sorted(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            #[allow(clippy::cast_precision_loss)]
            let h = (n - 1) as f64 * (pct / 100.0).clamp(0.0, 1.0);
            let lo = h.floor();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let i = lo as usize;
            let frac = h - lo;
            if i + 1 >= n {
                sorted[n - 1]
            } else {
                sorted[i] + frac * (sorted[i + 1] - sorted[i])
            }
        }
    }
}
