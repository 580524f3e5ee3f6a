//! The virtual OR table.
//!
//! Holds the four continuous axes, the selected predefined position, the
//! patient/workflow contexts and the per-axis alert-signal activation.
//! Every axis write clamps to the axis range, so the range invariant holds
//! for any sequence of operations.
//!
//! Mutation is `pub(crate)`: outside this crate the table can only be
//! changed through [`crate::dispatcher::OperationDispatcher`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// One of the four movable axes of the table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Table height in cm.
    Height,
    /// Trendelenburg angle in degrees.
    Trend,
    /// Lateral tilt in degrees.
    Tilt,
    /// Back plate angle in degrees.
    Backplate,
}

impl Axis {
    /// All axes in publication order.
    pub const ALL: [Self; 4] = [Self::Height, Self::Trend, Self::Tilt, Self::Backplate];

    /// Lower-case name, also used as the operation handle prefix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Height => "height",
            Self::Trend => "trend",
            Self::Tilt => "tilt",
            Self::Backplate => "backplate",
        }
    }

    /// Closed value range of the axis.
    #[must_use]
    pub const fn limits(self) -> AxisLimits {
        match self {
            Self::Height => AxisLimits::new(60.0, 140.0),
            Self::Trend => AxisLimits::new(-45.0, 45.0),
            Self::Tilt => AxisLimits::new(-25.0, 25.0),
            Self::Backplate => AxisLimits::new(-40.0, 80.0),
        }
    }

    /// Increment applied by a single increase/decrease activate.
    #[must_use]
    pub const fn step(self) -> f64 {
        match self {
            Self::Height => 1.0,
            Self::Trend | Self::Tilt | Self::Backplate => 0.1,
        }
    }

    /// Unit of the published metric.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Height => "cm",
            Self::Trend | Self::Tilt | Self::Backplate => "deg",
        }
    }

    /// Number of decimals kept after an adjustment.
    const fn decimals(self) -> i32 {
        match self {
            Self::Height => 0,
            Self::Trend | Self::Tilt | Self::Backplate => 1,
        }
    }

    /// Parses an axis from its lower-case name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|axis| axis.as_str() == name)
    }

    const fn index(self) -> usize {
        match self {
            Self::Height => 0,
            Self::Trend => 1,
            Self::Tilt => 2,
            Self::Backplate => 3,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed interval `[min, max]` an axis value must stay in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AxisLimits {
    /// Lower bound (inclusive).
    pub min: f64,
    /// Upper bound (inclusive).
    pub max: f64,
}

impl AxisLimits {
    /// Creates a new range.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamps `value` into the range.
    #[must_use]
    pub fn clamp(self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Returns `true` if `value` lies inside the range.
    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Direction of an increase/decrease activate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Add one step.
    Increase,
    /// Subtract one step.
    Decrease,
}

impl Direction {
    /// Handle suffix for this direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
        }
    }

    const fn sign(self) -> f64 {
        match self {
            Self::Increase => 1.0,
            Self::Decrease => -1.0,
        }
    }
}

/// Values of all four axes at once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Pose {
    /// Height in cm.
    #[schema(example = 80.0)]
    pub height: f64,
    /// Trend in degrees.
    #[schema(example = 0.0)]
    pub trend: f64,
    /// Tilt in degrees.
    #[schema(example = 0.0)]
    pub tilt: f64,
    /// Back plate in degrees.
    #[schema(example = 45.0)]
    pub backplate: f64,
}

impl Pose {
    /// Value of a single axis.
    #[must_use]
    pub const fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Height => self.height,
            Axis::Trend => self.trend,
            Axis::Tilt => self.tilt,
            Axis::Backplate => self.backplate,
        }
    }
}

/// Predefined table positions that `position.apply` moves to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PredefinedPosition {
    /// Flat table at working height.
    #[default]
    NullLevel,
    /// Flat table with the back plate raised.
    BeachChair,
}

impl PredefinedPosition {
    /// Target pose of the position.
    #[must_use]
    pub const fn pose(self) -> Pose {
        match self {
            Self::NullLevel => Pose {
                height: 80.0,
                trend: 0.0,
                tilt: 0.0,
                backplate: 0.0,
            },
            Self::BeachChair => Pose {
                height: 80.0,
                trend: 0.0,
                tilt: 0.0,
                backplate: 45.0,
            },
        }
    }

    /// Canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NullLevel => "NullLevel",
            Self::BeachChair => "BeachChair",
        }
    }
}

impl fmt::Display for PredefinedPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`PredefinedPosition`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown predefined position '{0}', expected 'NullLevel' or 'BeachChair'")]
pub struct ParsePositionError(pub String);

impl FromStr for PredefinedPosition {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "nulllevel" => Ok(Self::NullLevel),
            "beachchair" => Ok(Self::BeachChair),
            _ => Err(ParsePositionError(s.to_string())),
        }
    }
}

/// Which context a set-context operation targets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    /// Patient demographics context.
    Patient,
    /// Workflow (procedure) context.
    Workflow,
}

impl ContextKind {
    /// Both contexts.
    pub const ALL: [Self; 2] = [Self::Patient, Self::Workflow];

    /// Lower-case name, used in the operation handle.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Workflow => "workflow",
        }
    }
}

/// Association state of a context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContextAssociation {
    /// No context bound to the table.
    #[default]
    NotAssociated,
    /// Context bound to the table.
    Associated,
}

/// Current state of one context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContextState {
    /// Whether the context is bound.
    pub association: ContextAssociation,
    /// Identification (patient id, procedure id) when associated.
    #[schema(example = "PAT-0042")]
    pub identification: Option<String>,
}

/// Operator setting for an alert signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertActivation {
    /// Signal follows the alert condition.
    #[default]
    On,
    /// Signal never sounds.
    Off,
    /// Signal temporarily silenced.
    Paused,
}

impl FromStr for AlertActivation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            "paused" | "psd" => Ok(Self::Paused),
            other => Err(format!("unknown alert activation '{other}'")),
        }
    }
}

/// In-memory model of the OR table.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualDevice {
    pose: Pose,
    predefined_position: PredefinedPosition,
    patient_context: ContextState,
    workflow_context: ContextState,
    alert_activation: [AlertActivation; 4],
}

impl Default for VirtualDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualDevice {
    /// Creates a table resting in the `NullLevel` pose.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pose: PredefinedPosition::NullLevel.pose(),
            predefined_position: PredefinedPosition::NullLevel,
            patient_context: ContextState::default(),
            workflow_context: ContextState::default(),
            alert_activation: [AlertActivation::On; 4],
        }
    }

    /// Current value of an axis.
    #[must_use]
    pub const fn value(&self, axis: Axis) -> f64 {
        self.pose.get(axis)
    }

    /// All axis values.
    #[must_use]
    pub const fn pose(&self) -> Pose {
        self.pose
    }

    /// The position `position.apply` will move to.
    #[must_use]
    pub const fn predefined_position(&self) -> PredefinedPosition {
        self.predefined_position
    }

    /// State of a context.
    #[must_use]
    pub const fn context(&self, kind: ContextKind) -> &ContextState {
        match kind {
            ContextKind::Patient => &self.patient_context,
            ContextKind::Workflow => &self.workflow_context,
        }
    }

    /// Alert-signal activation of an axis.
    #[must_use]
    pub const fn alert_activation(&self, axis: Axis) -> AlertActivation {
        self.alert_activation[axis.index()]
    }

    /// Copy of the full state, suitable for serialization.
    #[must_use]
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            pose: self.pose,
            predefined_position: self.predefined_position,
            patient_context: self.patient_context.clone(),
            workflow_context: self.workflow_context.clone(),
            alert_activation: Axis::ALL
                .into_iter()
                .map(|axis| AxisActivation {
                    axis,
                    activation: self.alert_activation(axis),
                })
                .collect(),
        }
    }

    /// Writes an axis, clamping into its range.
    pub(crate) fn set_value(&mut self, axis: Axis, value: f64) {
        let clamped = axis.limits().clamp(value);
        match axis {
            Axis::Height => self.pose.height = clamped,
            Axis::Trend => self.pose.trend = clamped,
            Axis::Tilt => self.pose.tilt = clamped,
            Axis::Backplate => self.pose.backplate = clamped,
        }
    }

    /// Moves an axis by one step and returns the new value.
    pub(crate) fn adjust(&mut self, axis: Axis, direction: Direction) -> f64 {
        let scale = 10_f64.powi(axis.decimals());
        let raw = direction.sign().mul_add(axis.step(), self.value(axis));
        self.set_value(axis, (raw * scale).round() / scale);
        self.value(axis)
    }

    /// Overwrites every axis with the pose of the selected position.
    pub(crate) fn apply_predefined_position(&mut self) -> Pose {
        let target = self.predefined_position.pose();
        for axis in Axis::ALL {
            self.set_value(axis, target.get(axis));
        }
        self.pose
    }

    pub(crate) fn select_predefined_position(&mut self, position: PredefinedPosition) {
        self.predefined_position = position;
    }

    pub(crate) fn set_context(&mut self, kind: ContextKind, state: ContextState) {
        match kind {
            ContextKind::Patient => self.patient_context = state,
            ContextKind::Workflow => self.workflow_context = state,
        }
    }

    pub(crate) fn set_alert_activation(&mut self, axis: Axis, activation: AlertActivation) {
        self.alert_activation[axis.index()] = activation;
    }
}

/// Activation entry in a [`DeviceSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AxisActivation {
    /// Axis the alert signal belongs to.
    pub axis: Axis,
    /// Current activation.
    pub activation: AlertActivation,
}

/// Serializable copy of a [`VirtualDevice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeviceSnapshot {
    /// Axis values.
    pub pose: Pose,
    /// Currently selected predefined position.
    pub predefined_position: PredefinedPosition,
    /// Patient context.
    pub patient_context: ContextState,
    /// Workflow context.
    pub workflow_context: ContextState,
    /// Alert-signal activation per axis.
    pub alert_activation: Vec<AxisActivation>,
}

/// Shared handle to the single table instance of a provider.
///
/// Readers take short read locks; only the dispatcher takes the write lock.
/// No guard is ever held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct DeviceHandle {
    inner: Arc<RwLock<VirtualDevice>>,
}

impl DeviceHandle {
    /// Wraps a device.
    #[must_use]
    pub fn new(device: VirtualDevice) -> Self {
        Self {
            inner: Arc::new(RwLock::new(device)),
        }
    }

    /// Read access.
    pub fn read(&self) -> RwLockReadGuard<'_, VirtualDevice> {
        self.inner.read()
    }

    /// Consistent copy of the full state.
    #[must_use]
    pub fn snapshot(&self) -> DeviceSnapshot {
        self.inner.read().snapshot()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, VirtualDevice> {
        self.inner.write()
    }
}
