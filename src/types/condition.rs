//! Valve condition codes and their maintenance descriptors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Valve condition code as recorded in the profile file (percent of optimal
/// switching behaviour).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionCode(pub i64);

impl ConditionCode {
    /// Valve switching behaviour is optimal.
    pub const OPTIMAL: Self = Self(100);
    /// Small lag.
    pub const SMALL_LAG: Self = Self(90);
    /// Severe lag.
    pub const SEVERE_LAG: Self = Self(80);
    /// Valve close to total failure.
    pub const NEAR_FAILURE: Self = Self(73);

    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ConditionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ConditionCode {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

/// Maintenance urgency attached to a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of a condition: what to call it, how urgent it is and
/// what the maintenance crew should do about it.
///
/// An empty descriptor (no label, no severity, no remedies) is returned for
/// codes the table does not know.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConditionDescriptor {
    pub label: Option<&'static str>,
    pub severity: Option<Severity>,
    pub remedy: &'static [&'static str],
}

impl ConditionDescriptor {
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.severity.is_none() && self.remedy.is_empty()
    }
}

const OPTIMAL_REMEDY: &[&str] = &["System is operating optimally."];
const SMALL_LAG_REMEDY: &[&str] = &["Inspect valve for contamination.", "Check pilot pressure."];
const SEVERE_LAG_REMEDY: &[&str] = &[
    "Schedule valve inspection.",
    "Check for internal leakage.",
    "Verify solenoid signal.",
];
const NEAR_FAILURE_REMEDY: &[&str] = &["System shutdown recommended.", "Replace valve immediately."];

/// Look up the descriptor for a condition code.
pub fn describe(code: ConditionCode) -> ConditionDescriptor {
    let (label, severity, remedy) = match code {
        ConditionCode::OPTIMAL => ("Optimal", Severity::Low, OPTIMAL_REMEDY),
        ConditionCode::SMALL_LAG => ("Small Lag", Severity::Medium, SMALL_LAG_REMEDY),
        ConditionCode::SEVERE_LAG => ("Severe Lag", Severity::High, SEVERE_LAG_REMEDY),
        ConditionCode::NEAR_FAILURE => {
            ("Close to Total Failure", Severity::Critical, NEAR_FAILURE_REMEDY)
        }
        _ => return ConditionDescriptor::default(),
    };

    ConditionDescriptor {
        label: Some(label),
        severity: Some(severity),
        remedy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_have_descriptors() {
        for code in [
            ConditionCode::OPTIMAL,
            ConditionCode::SMALL_LAG,
            ConditionCode::SEVERE_LAG,
            ConditionCode::NEAR_FAILURE,
        ] {
            let d = describe(code);
            assert!(d.label.is_some(), "missing label for {code}");
            assert!(!d.remedy.is_empty(), "missing remedy for {code}");
        }
    }

    #[test]
    fn test_severity_escalates_with_degradation() {
        assert_eq!(describe(ConditionCode(100)).severity, Some(Severity::Low));
        assert_eq!(describe(ConditionCode(90)).severity, Some(Severity::Medium));
        assert_eq!(describe(ConditionCode(80)).severity, Some(Severity::High));
        assert_eq!(describe(ConditionCode(73)).severity, Some(Severity::Critical));
    }

    #[test]
    fn test_unknown_code_is_empty() {
        let d = describe(ConditionCode(55));
        assert!(d.is_empty());
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}
