//! Severity ladders and the pure classification step.
//!
//! A ladder holds up to four limits. Classification walks them in a fixed
//! order (upper critical, upper warning, lower critical, lower warning) and
//! stops at the first breached one. Comparisons are strict, so a value equal
//! to a limit is never alerting.

pub mod evaluator;
pub mod messages;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::SensorKind;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Normal,
    WarnUpper,
    CritUpper,
    WarnLower,
    CritLower,
}

impl Severity {
    pub fn is_critical(&self) -> bool {
        matches!(self, Severity::CritUpper | Severity::CritLower)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Severity::WarnUpper | Severity::WarnLower)
    }

    /// Coarse status used by the dashboard: `normal`, `warning` or `danger`.
    pub fn status_label(&self) -> &'static str {
        if self.is_critical() {
            "danger"
        } else if self.is_warning() {
            "warning"
        } else {
            "normal"
        }
    }
}

// ---------------------------------------------------------------------------
// ThresholdLadder
// ---------------------------------------------------------------------------

/// Warning / critical limits for one sensor.
///
/// An `ambient` ladder never alerts.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ThresholdLadder {
    #[serde(default)]
    pub upper_critical: Option<f64>,
    #[serde(default)]
    pub upper_warning: Option<f64>,
    #[serde(default)]
    pub lower_warning: Option<f64>,
    #[serde(default)]
    pub lower_critical: Option<f64>,
    #[serde(default)]
    pub ambient: bool,
}

/// The limit a value broke and the band it falls in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breach {
    pub severity: Severity,
    pub limit: f64,
}

impl ThresholdLadder {
    pub fn ambient() -> Self {
        Self {
            ambient: true,
            ..Self::default()
        }
    }

    /// Checks `upper_critical >= upper_warning >= lower_warning >= lower_critical`
    /// across whichever limits are present.
    pub fn validate(&self) -> Result<(), String> {
        let named = [
            ("upper_critical", self.upper_critical),
            ("upper_warning", self.upper_warning),
            ("lower_warning", self.lower_warning),
            ("lower_critical", self.lower_critical),
        ];
        let present: Vec<(&str, f64)> = named
            .iter()
            .filter_map(|(name, limit)| limit.map(|l| (*name, l)))
            .collect();

        if self.ambient {
            if let Some((name, _)) = present.first() {
                return Err(format!("ambient ladder must not define {name}"));
            }
            return Ok(());
        }

        if let Some((name, _)) = present.iter().find(|(_, l)| !l.is_finite()) {
            return Err(format!("{name} must be a finite number"));
        }

        for pair in present.windows(2) {
            let (hi_name, hi) = pair[0];
            let (lo_name, lo) = pair[1];
            if hi < lo {
                return Err(format!("{hi_name} ({hi}) is below {lo_name} ({lo})"));
            }
        }
        Ok(())
    }

    /// Returns the first breached band in fixed precedence, or `None` when the
    /// value is inside every limit.
    pub fn classify(&self, value: f64) -> Option<Breach> {
        if self.ambient {
            return None;
        }

        let bands = [
            (Severity::CritUpper, self.upper_critical, true),
            (Severity::WarnUpper, self.upper_warning, true),
            (Severity::CritLower, self.lower_critical, false),
            (Severity::WarnLower, self.lower_warning, false),
        ];

        bands.into_iter().find_map(|(severity, limit, upper)| {
            let limit = limit?;
            let breached = if upper { value > limit } else { value < limit };
            breached.then_some(Breach { severity, limit })
        })
    }
}

// ---------------------------------------------------------------------------
// ThresholdTable
// ---------------------------------------------------------------------------

/// Immutable lookup of ladders keyed by `(kind, area_id, sensor_no)`.
#[derive(Debug, Clone, Default)]
pub struct ThresholdTable {
    ladders: HashMap<(SensorKind, i32, i32), ThresholdLadder>,
}

impl ThresholdTable {
    pub fn new(ladders: HashMap<(SensorKind, i32, i32), ThresholdLadder>) -> Self {
        Self { ladders }
    }

    pub fn ladder(&self, kind: SensorKind, area_id: i32, sensor_no: i32) -> Option<&ThresholdLadder> {
        self.ladders.get(&(kind, area_id, sensor_no))
    }

    pub fn len(&self) -> usize {
        self.ladders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ladders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_ladder() -> ThresholdLadder {
        ThresholdLadder {
            upper_critical: Some(24.0),
            upper_warning: Some(23.0),
            lower_warning: Some(21.0),
            lower_critical: Some(20.0),
            ambient: false,
        }
    }

    #[test]
    fn value_inside_all_limits_is_not_breached() {
        assert_eq!(full_ladder().classify(22.0), None);
    }

    #[test]
    fn value_between_warning_and_critical_is_warning() {
        let ladder = full_ladder();
        assert_eq!(ladder.classify(23.5).unwrap().severity, Severity::WarnUpper);
        assert_eq!(ladder.classify(20.5).unwrap().severity, Severity::WarnLower);
    }

    #[test]
    fn value_past_critical_is_critical_with_limit() {
        let ladder = full_ladder();
        assert_eq!(
            ladder.classify(25.0),
            Some(Breach { severity: Severity::CritUpper, limit: 24.0 })
        );
        assert_eq!(
            ladder.classify(19.0),
            Some(Breach { severity: Severity::CritLower, limit: 20.0 })
        );
    }

    #[test]
    fn limits_are_strict() {
        let ladder = ThresholdLadder {
            upper_critical: Some(10.0),
            upper_warning: Some(8.0),
            ..ThresholdLadder::default()
        };
        assert_eq!(ladder.classify(8.0), None);
        assert_eq!(ladder.classify(8.0001).unwrap().severity, Severity::WarnUpper);
        assert_eq!(ladder.classify(10.0).unwrap().severity, Severity::WarnUpper);
    }

    #[test]
    fn ambient_never_breaches() {
        assert_eq!(ThresholdLadder::ambient().classify(1000.0), None);
        assert_eq!(ThresholdLadder::ambient().classify(-1000.0), None);
    }

    #[test]
    fn only_upper_critical_configured() {
        let ladder = ThresholdLadder {
            upper_critical: Some(10.0),
            ..ThresholdLadder::default()
        };
        assert_eq!(
            ladder.classify(12.0),
            Some(Breach { severity: Severity::CritUpper, limit: 10.0 })
        );
        assert_eq!(ladder.classify(-50.0), None);
    }

    #[test]
    fn precedence_favours_upper_critical_on_inverted_ladder() {
        // Not loadable through the catalog, but classification must still be
        // deterministic.
        let ladder = ThresholdLadder {
            upper_critical: Some(-19.0),
            upper_warning: Some(-18.0),
            ..ThresholdLadder::default()
        };
        assert_eq!(ladder.classify(-17.0).unwrap().severity, Severity::CritUpper);
    }

    #[test]
    fn validate_accepts_ordered_and_partial_ladders() {
        assert!(full_ladder().validate().is_ok());
        let partial = ThresholdLadder {
            upper_warning: Some(80.0),
            lower_critical: Some(70.0),
            ..ThresholdLadder::default()
        };
        assert!(partial.validate().is_ok());
        assert!(ThresholdLadder::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_limits() {
        let ladder = ThresholdLadder {
            upper_critical: Some(-19.0),
            upper_warning: Some(-18.0),
            ..ThresholdLadder::default()
        };
        let err = ladder.validate().unwrap_err();
        assert!(err.contains("upper_critical"), "{err}");
    }

    #[test]
    fn validate_rejects_ambient_with_limits() {
        let ladder = ThresholdLadder {
            upper_critical: Some(10.0),
            ambient: true,
            ..ThresholdLadder::default()
        };
        assert!(ladder.validate().unwrap_err().contains("ambient"));
    }

    #[test]
    fn validate_rejects_non_finite_limits() {
        let ladder = ThresholdLadder {
            lower_critical: Some(f64::NAN),
            ..ThresholdLadder::default()
        };
        assert!(ladder.validate().is_err());
    }

    #[test]
    fn table_lookup_is_per_kind() {
        let mut map = HashMap::new();
        map.insert((SensorKind::Temperature, 1, 1), full_ladder());
        let table = ThresholdTable::new(map);
        assert!(table.ladder(SensorKind::Temperature, 1, 1).is_some());
        assert!(table.ladder(SensorKind::Humidity, 1, 1).is_none());
        assert!(table.ladder(SensorKind::Temperature, 1, 2).is_none());
    }
}
