//! Template-based explanation text
//!
//! Turns one influential feature into a maintenance-oriented sentence. The
//! feature's value is compared against its normal range so the reader learns
//! not only *which* reading drove the diagnosis but *how* it was off.

use crate::types::NormalRange;

/// Where a value sits relative to its normal range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeStatus {
    /// No normal range is known for the feature.
    Unknown,
    Below,
    Within,
    Above,
}

impl RangeStatus {
    pub fn classify(value: f64, range: Option<&NormalRange>) -> Self {
        match range {
            None => Self::Unknown,
            Some(r) if value < r.lower => Self::Below,
            Some(r) if value > r.upper => Self::Above,
            Some(_) => Self::Within,
        }
    }
}

/// Title-case each word: first letter of a run of letters upper case, the
/// rest lower case. `"PS1"` becomes `"Ps1"`.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Split a feature name such as `PS1_mean` into a readable sensor and metric,
/// e.g. `("Ps1", "Mean")`. Everything after the first underscore is the
/// metric; further underscores become spaces.
pub fn humanize_feature(name: &str) -> (String, String) {
    let mut words = name.split('_').filter(|w| !w.is_empty());
    let sensor = words.next().map(title_case).unwrap_or_default();
    let metric = words.map(title_case).collect::<Vec<_>>().join(" ");
    (sensor, metric)
}

fn subject(sensor: &str, metric: &str) -> String {
    if metric.is_empty() {
        sensor.to_string()
    } else {
        format!("{metric} of {sensor}")
    }
}

/// Render the explanation for one feature.
///
/// Without a known range the text only states that the feature mattered;
/// otherwise it says whether the value was low, high, or within range and
/// what that usually points to.
pub fn explain_feature(feature: &str, value: f64, range: Option<&NormalRange>) -> String {
    let (sensor, metric) = humanize_feature(feature);
    let subject = subject(&sensor, &metric);

    match (RangeStatus::classify(value, range), range) {
        (RangeStatus::Below, Some(r)) => format!(
            "The **{subject}** was unusually low ({value:.2}), falling below the normal range of {:.2} - {:.2}. \
             This could indicate a leak or a loss of system pressure.",
            r.lower, r.upper
        ),
        (RangeStatus::Above, Some(r)) => format!(
            "The **{subject}** was unusually high ({value:.2}), exceeding the normal range of {:.2} - {:.2}. \
             This might suggest a blockage or excessive system strain.",
            r.lower, r.upper
        ),
        (RangeStatus::Within, Some(_)) => format!(
            "The **{subject}** ({value:.2}) was within its normal range but still a key factor in the \
             model's decision, possibly due to its interaction with other sensor readings."
        ),
        _ => format!("The {subject} was a significant factor."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANGE: NormalRange = NormalRange { lower: 10.0, upper: 20.0 };

    #[test]
    fn test_humanize_feature() {
        assert_eq!(humanize_feature("PS1_mean"), ("Ps1".into(), "Mean".into()));
        assert_eq!(humanize_feature("VS1_std"), ("Vs1".into(), "Std".into()));
        assert_eq!(humanize_feature("TS2_flow_rate"), ("Ts2".into(), "Flow Rate".into()));
        assert_eq!(humanize_feature("EPS1"), ("Eps1".into(), String::new()));
    }

    #[test]
    fn test_above_range() {
        let text = explain_feature("PS1_mean", 50.0, Some(&RANGE));
        assert!(text.contains("unusually high"));
        assert!(text.contains("50.00"));
        assert!(text.contains("10.00 - 20.00"));
        assert!(text.contains("blockage"));
    }

    #[test]
    fn test_below_range() {
        let text = explain_feature("PS1_mean", 5.0, Some(&RANGE));
        assert!(text.contains("unusually low"));
        assert!(text.contains("5.00"));
        assert!(text.contains("leak"));
    }

    #[test]
    fn test_within_range() {
        let text = explain_feature("PS1_mean", 15.0, Some(&RANGE));
        assert!(text.contains("within"));
        assert!(text.contains("15.00"));
        assert!(text.contains("interaction"));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(explain_feature("PS1_mean", 10.0, Some(&RANGE)).contains("within"));
        assert!(explain_feature("PS1_mean", 20.0, Some(&RANGE)).contains("within"));
    }

    #[test]
    fn test_no_range_is_generic() {
        let text = explain_feature("PS1_mean", 15.0, None);
        assert_eq!(text, "The Mean of Ps1 was a significant factor.");
        assert!(!text.contains("15.00"));
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(
            explain_feature("TS1_max", 33.333, Some(&RANGE)),
            explain_feature("TS1_max", 33.333, Some(&RANGE))
        );
    }
}
