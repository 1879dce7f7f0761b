//! Per-cycle statistical feature extraction
//!
//! Each sensor channel is reduced to four columns (mean, sample standard
//! deviation, min, max), computed row-wise. Channels are then concatenated
//! column-wise, keeping cycles aligned across sensors.

use statrs::statistics::Statistics;
use std::collections::HashSet;

use super::ProcessingError;
use crate::acquisition::SensorChannel;
use crate::types::FeatureTable;

/// Statistic computed over the readings of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatistic {
    Mean,
    StdDev,
    Min,
    Max,
}

impl CycleStatistic {
    /// Extraction order; also the column order within each sensor's block.
    pub const ALL: [Self; 4] = [Self::Mean, Self::StdDev, Self::Min, Self::Max];

    /// Suffix appended to the sensor id to form the feature name.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::StdDev => "std",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    fn compute(self, readings: &[f64]) -> f64 {
        match self {
            Self::Mean => readings.mean(),
            // Sample standard deviation (n - 1)
            Self::StdDev => readings.std_dev(),
            Self::Min => Statistics::min(readings),
            Self::Max => Statistics::max(readings),
        }
    }
}

/// Feature name for a sensor/statistic pair, e.g. `PS1_mean`.
pub fn feature_name(sensor: &str, stat: CycleStatistic) -> String {
    format!("{sensor}_{}", stat.suffix())
}

/// Compute the four per-cycle statistics for one sensor channel.
pub fn extract_channel(channel: &SensorChannel) -> Result<FeatureTable, ProcessingError> {
    let names = CycleStatistic::ALL
        .iter()
        .map(|&s| feature_name(channel.id(), s))
        .collect();

    let rows = channel
        .cycles()
        .iter()
        .enumerate()
        .map(|(cycle, readings)| {
            if readings.len() < 2 {
                return Err(ProcessingError::InsufficientData {
                    sensor: channel.id().to_string(),
                    cycle,
                    needed: 2,
                    available: readings.len(),
                });
            }
            Ok(CycleStatistic::ALL
                .iter()
                .map(|s| s.compute(readings))
                .collect())
        })
        .collect::<Result<Vec<Vec<f64>>, _>>()?;

    Ok(FeatureTable::from_parts(names, rows)?)
}

/// Extract features from every channel and join them column-wise.
///
/// Channel ids must be unique, since they prefix the feature names. All
/// channels must cover the same number of cycles; a mismatch is reported
/// naming the first channel that disagrees with the first one.
pub fn extract_features(channels: &[SensorChannel]) -> Result<FeatureTable, ProcessingError> {
    let first = channels.first().ok_or(ProcessingError::NoChannels)?;
    let expected = first.n_cycles();

    let mut seen = HashSet::new();
    if let Some(dup) = channels.iter().find(|c| !seen.insert(c.id())) {
        return Err(ProcessingError::DuplicateChannel(dup.id().to_string()));
    }

    if let Some(bad) = channels.iter().find(|c| c.n_cycles() != expected) {
        return Err(ProcessingError::CycleCountMismatch {
            reference: first.id().to_string(),
            expected,
            sensor: bad.id().to_string(),
            found: bad.n_cycles(),
        });
    }

    let mut table = FeatureTable::default();
    for channel in channels {
        table.hconcat(extract_channel(channel)?);
    }

    tracing::debug!(
        channels = channels.len(),
        cycles = table.n_rows(),
        features = table.n_cols(),
        "Feature extraction complete"
    );
    Ok(table)
}
