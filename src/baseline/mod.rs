//! Baseline Module - Normal Operating Ranges
//!
//! Learns what "normal" looks like for each derived feature from cycles
//! recorded while the valve was in its nominal condition. The resulting
//! [`RangeTable`](crate::types::RangeTable) qualifies every explanation as
//! low, high, or within range.
//!
//! ## Usage
//!
//! ```ignore
//! let calc = RangeCalculator::new(ConditionCode::OPTIMAL, 5.0, 95.0)?;
//! let ranges = calc.compute(&features, &labels)?;
//! if let Some(r) = ranges.get("PS1_mean") {
//!     println!("normal PS1 mean: {:.2} - {:.2}", r.lower, r.upper);
//! }
//! ```

mod normal_ranges;

pub use normal_ranges::{percentile_sorted, RangeCalculator};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("Feature table has {rows} rows but {labels} labels were supplied")]
    LabelCountMismatch { rows: usize, labels: usize },

    #[error("Invalid percentile band: lower={0}, upper={1} (need 0 <= lower <= upper <= 100)")]
    InvalidPercentiles(f64, f64),
}
