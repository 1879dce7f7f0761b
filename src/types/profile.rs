//! Per-cycle component condition profile (`profile.txt`)

use serde::{Deserialize, Serialize};

use super::ConditionCode;

/// One row of the profile file. Column order matches the file layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Cooler condition (% of full efficiency)
    pub cooler_condition: i64,
    /// Valve condition (% of optimal switching behaviour); the training label
    pub valve_condition: ConditionCode,
    /// Internal pump leakage grade
    pub pump_leakage: i64,
    /// Hydraulic accumulator pressure (bar)
    pub accumulator_pressure: i64,
    /// 0 when conditions were stable for the cycle
    pub stable_flag: i64,
}

impl ProfileRecord {
    /// Number of columns in the profile file.
    pub const COLUMNS: usize = 5;

    pub fn from_columns(cols: [i64; Self::COLUMNS]) -> Self {
        Self {
            cooler_condition: cols[0],
            valve_condition: ConditionCode(cols[1]),
            pump_leakage: cols[2],
            accumulator_pressure: cols[3],
            stable_flag: cols[4],
        }
    }

    pub const fn is_stable(&self) -> bool {
        self.stable_flag == 0
    }
}

/// Extract the valve-condition label column from a profile.
pub fn valve_labels(profile: &[ProfileRecord]) -> Vec<ConditionCode> {
    profile.iter().map(|r| r.valve_condition).collect()
}
