//! Limit alerting for the table axes.
//!
//! An axis is in alarm when its value is within `margin` of either end of
//! its range, both ends inclusive. There is no hysteresis: every evaluation
//! looks only at the current value.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::device::{AlertActivation, Axis, AxisLimits, Pose};

/// Default distance to a limit that raises the alert condition.
pub const DEFAULT_ALERT_MARGIN: f64 = 5.0;

/// Which end of the range an alert condition is close to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertBand {
    /// Within the margin of the upper limit.
    NearMaximum,
    /// Within the margin of the lower limit.
    NearMinimum,
}

/// Result of evaluating one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AlertState {
    /// Whether the limit alert condition is present.
    pub presence: bool,
    /// Which limit triggered the condition, if present.
    pub band: Option<AlertBand>,
}

impl AlertState {
    /// Condition not present.
    pub const ABSENT: Self = Self {
        presence: false,
        band: None,
    };
}

/// Presence of an alert signal as seen by a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignalPresence {
    /// Signal is sounding.
    On,
    /// Signal is silent.
    Off,
}

/// Evaluates `value` against `limits` with [`DEFAULT_ALERT_MARGIN`].
#[must_use]
pub fn evaluate(value: f64, limits: AxisLimits) -> AlertState {
    evaluate_with_margin(value, limits, DEFAULT_ALERT_MARGIN)
}

/// Evaluates `value` against `limits` with an explicit margin.
#[must_use]
pub fn evaluate_with_margin(value: f64, limits: AxisLimits, margin: f64) -> AlertState {
    if limits.max - value <= margin {
        AlertState {
            presence: true,
            band: Some(AlertBand::NearMaximum),
        }
    } else if value - limits.min <= margin {
        AlertState {
            presence: true,
            band: Some(AlertBand::NearMinimum),
        }
    } else {
        AlertState::ABSENT
    }
}

/// Derives signal presence from the condition and the operator activation.
#[must_use]
pub const fn signal_presence(condition: AlertState, activation: AlertActivation) -> SignalPresence {
    match (condition.presence, activation) {
        (true, AlertActivation::On) => SignalPresence::On,
        _ => SignalPresence::Off,
    }
}

/// Per-axis limit evaluator with a configured margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdEvaluator {
    margin: f64,
}

impl Default for ThresholdEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_MARGIN)
    }
}

impl ThresholdEvaluator {
    /// Creates an evaluator. Non-finite or negative margins fall back to the default.
    #[must_use]
    pub fn new(margin: f64) -> Self {
        let margin = if margin.is_finite() && margin >= 0.0 {
            margin
        } else {
            DEFAULT_ALERT_MARGIN
        };
        Self { margin }
    }

    /// Configured margin.
    #[must_use]
    pub const fn margin(&self) -> f64 {
        self.margin
    }

    /// Evaluates a single axis.
    #[must_use]
    pub fn evaluate_axis(&self, axis: Axis, value: f64) -> AlertState {
        evaluate_with_margin(value, axis.limits(), self.margin)
    }

    /// Evaluates every axis of a pose, in [`Axis::ALL`] order.
    #[must_use]
    pub fn evaluate_pose(&self, pose: &Pose) -> [(Axis, AlertState); 4] {
        Axis::ALL.map(|axis| (axis, self.evaluate_axis(axis, pose.get(axis))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_near_maximum() {
        let state = evaluate(136.0, Axis::Height.limits());
        assert!(state.presence);
        assert_eq!(state.band, Some(AlertBand::NearMaximum));
    }

    #[test]
    fn test_height_mid_range_is_absent() {
        assert_eq!(evaluate(100.0, Axis::Height.limits()), AlertState::ABSENT);
    }

    #[test]
    fn test_margin_is_inclusive_on_both_ends() {
        let limits = Axis::Tilt.limits();
        assert!(evaluate(20.0, limits).presence);
        assert!(!evaluate(19.9, limits).presence);
        assert!(evaluate(-20.0, limits).presence);
        assert!(!evaluate(-19.9, limits).presence);
        assert_eq!(evaluate(-25.0, limits).band, Some(AlertBand::NearMinimum));
    }

    #[test]
    fn test_presence_matches_threshold_formula() {
        for axis in Axis::ALL {
            let limits = axis.limits();
            let mut value = limits.min;
            while value <= limits.max {
                let expected = limits.max - value <= 5.0 || value - limits.min <= 5.0;
                assert_eq!(evaluate(value, limits).presence, expected, "{axis} at {value}");
                value += 0.5;
            }
        }
    }

    #[test]
    fn test_custom_margin() {
        let evaluator = ThresholdEvaluator::new(10.0);
        assert!(evaluator.evaluate_axis(Axis::Backplate, 70.0).presence);
        assert!(!ThresholdEvaluator::default()
            .evaluate_axis(Axis::Backplate, 70.0)
            .presence);
    }

    #[test]
    fn test_invalid_margin_falls_back_to_default() {
        assert!((ThresholdEvaluator::new(f64::NAN).margin() - DEFAULT_ALERT_MARGIN).abs() < f64::EPSILON);
        assert!((ThresholdEvaluator::new(-1.0).margin() - DEFAULT_ALERT_MARGIN).abs() < f64::EPSILON);
    }

    #[test]
    fn test_signal_presence_follows_activation() {
        let present = evaluate(140.0, Axis::Height.limits());
        assert_eq!(signal_presence(present, AlertActivation::On), SignalPresence::On);
        assert_eq!(signal_presence(present, AlertActivation::Paused), SignalPresence::Off);
        assert_eq!(signal_presence(present, AlertActivation::Off), SignalPresence::Off);
        assert_eq!(
            signal_presence(AlertState::ABSENT, AlertActivation::On),
            SignalPresence::Off
        );
    }

    #[test]
    fn test_evaluate_pose_covers_all_axes() {
        let pose = Pose {
            height: 60.0,
            trend: 0.0,
            tilt: 24.0,
            backplate: 45.0,
        };
        let results = ThresholdEvaluator::default().evaluate_pose(&pose);
        assert_eq!(results[0], (Axis::Height, evaluate(60.0, Axis::Height.limits())));
        assert!(results[0].1.presence);
        assert!(!results[1].1.presence);
        assert!(results[2].1.presence);
        assert!(!results[3].1.presence);
    }
}
