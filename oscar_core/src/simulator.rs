//! Interfaces between the interpreter and the traffic simulator.
//!
//! The interpreter reads the state of the entities from an immutable [`Snapshot`] of the current tick,
//! and applies actions by sending commands through [`EntityCommands`].
//! A [`Simulator`] additionally owns the simulation clock.

mod sandbox;

use crate::entities::{ObjectType, ScenarioObject};
use crate::math::{BoundingBox, Pose};
use crate::position::AbsolutePosition;
use crate::Time;
pub use sandbox::Sandbox;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Pose of an entity relative to the lane it is driving on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LanePose {
    /// Identifier of the lane.
    pub lane_id: i64,
    /// Longitudinal coordinate along the lane.
    pub s: f64,
    /// Lateral offset from the lane center.
    pub offset: f64,
}

/// Which consumers of the simulation can perceive an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Visibility {
    /// Rendered by the visualization.
    pub graphics: bool,
    /// Perceived by other traffic participants.
    pub traffic: bool,
    /// Detected by sensors.
    pub sensors: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            graphics: true,
            traffic: true,
            sensors: true,
        }
    }
}

/// State of a single entity at the current tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityStatus {
    /// Name of the entity.
    pub name: String,
    /// Type of the entity.
    pub object_type: ObjectType,
    /// World pose of the entity's reference point.
    pub pose: Pose,
    /// Longitudinal speed, in m/s.
    pub linear_velocity: f64,
    /// Longitudinal acceleration, in m/s².
    pub linear_acceleration: f64,
    /// Dimensions of the entity.
    pub bounding_box: BoundingBox,
    /// Lane-relative pose, if the entity is on a lane.
    pub lane_pose: Option<LanePose>,
    /// Visibility flags.
    pub visibility: Visibility,
}

impl EntityStatus {
    /// Status of an object standing still at the given pose.
    pub fn new(object: &ScenarioObject, pose: Pose) -> Self {
        Self {
            name: object.name.clone(),
            object_type: object.object_type,
            pose,
            linear_velocity: 0.0,
            linear_acceleration: 0.0,
            bounding_box: object.bounding_box,
            lane_pose: None,
            visibility: Visibility::default(),
        }
    }
}

/// Read-only view of all existing entities at one tick.
///
/// Entities that have not been spawned (or have been despawned) are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Simulated time of the tick.
    pub time: Time,
    entities: BTreeMap<String, EntityStatus>,
}

impl Snapshot {
    /// An empty snapshot at the given time.
    pub fn new(time: Time) -> Self {
        Self {
            time,
            entities: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) an entity in the snapshot.
    pub fn insert(&mut self, status: EntityStatus) {
        self.entities.insert(status.name.clone(), status);
    }

    /// Builder-style version of [`Snapshot::insert`].
    pub fn with(mut self, status: EntityStatus) -> Self {
        self.insert(status);
        self
    }

    /// Status of the named entity, or `None` if it does not exist at this tick.
    pub fn status(&self, name: &str) -> Option<&EntityStatus> {
        self.entities.get(name)
    }

    /// Whether the named entity exists at this tick.
    pub fn exists(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Iterates over the existing entities, by name.
    pub fn iter(&self) -> impl Iterator<Item = &EntityStatus> {
        self.entities.values()
    }
}

/// Shape of the transition towards a new target value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DynamicsShape {
    /// Constant rate of change.
    Linear,
    /// Cubic easing.
    Cubic,
    /// Sinusoidal easing.
    Sinusoidal,
    /// Instantaneous jump to the target.
    Step,
}

impl DynamicsShape {
    /// Parses the name of a shape as found in documents.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(DynamicsShape::Linear),
            "cubic" => Some(DynamicsShape::Cubic),
            "sinusoidal" => Some(DynamicsShape::Sinusoidal),
            "step" => Some(DynamicsShape::Step),
            _ => None,
        }
    }
}

/// What the value of a [`TransitionDynamics`] constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DynamicsDimension {
    /// Rate of change (e.g. m/s² for speed).
    Rate,
    /// Duration of the transition, in seconds.
    Time,
    /// Distance covered during the transition, in meters.
    Distance,
}

impl DynamicsDimension {
    /// Parses the name of a dimension as found in documents.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rate" => Some(DynamicsDimension::Rate),
            "time" => Some(DynamicsDimension::Time),
            "distance" => Some(DynamicsDimension::Distance),
            _ => None,
        }
    }
}

/// How a quantity transitions to its target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransitionDynamics {
    /// Shape of the transition.
    pub shape: DynamicsShape,
    /// Constrained dimension.
    pub dimension: DynamicsDimension,
    /// Value of the constraint.
    pub value: f64,
}

impl TransitionDynamics {
    /// An instantaneous transition.
    pub const STEP: TransitionDynamics = TransitionDynamics {
        shape: DynamicsShape::Step,
        dimension: DynamicsDimension::Time,
        value: 0.0,
    };
}

/// How a relative target value is combined with the reference one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpeedTargetValueType {
    /// Target = reference + value.
    Delta,
    /// Target = reference × value.
    Factor,
}

impl SpeedTargetValueType {
    /// Parses the name of a value type as found in documents.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "delta" => Some(SpeedTargetValueType::Delta),
            "factor" => Some(SpeedTargetValueType::Factor),
            _ => None,
        }
    }

    /// Applies the relative value to the reference value.
    pub fn apply(&self, reference: f64, value: f64) -> f64 {
        match self {
            SpeedTargetValueType::Delta => reference + value,
            SpeedTargetValueType::Factor => reference * value,
        }
    }
}

/// Target of a speed command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SpeedTarget {
    /// Absolute speed, in m/s.
    Absolute(f64),
    /// Speed relative to the one of another entity.
    Relative {
        /// Reference entity.
        entity_ref: String,
        /// How `value` combines with the reference speed.
        value_type: SpeedTargetValueType,
        /// Relative value.
        value: f64,
    },
}

/// Target of a lane change command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LaneChangeTarget {
    /// A lane, by identifier.
    Absolute(i64),
    /// A number of lanes to the left (positive) or right (negative) of another entity's lane.
    Relative {
        /// Reference entity.
        entity_ref: String,
        /// Number of lanes.
        value: i64,
    },
}

/// Failure of a command sent to the simulator.
///
/// Command failures are recoverable: they are reported to the caller of the interpreter,
/// which decides whether to go on.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommandError {
    /// The command addresses an entity that does not exist.
    #[error("entity `{0}` does not exist")]
    EntityNotPresent(String),
    /// The command addresses an entity that already exists.
    #[error("entity `{0}` already exists")]
    AlreadySpawned(String),
    /// The simulator refused the command.
    #[error("command rejected by simulator: {0}")]
    Rejected(String),
}

/// Commands applying actions to the simulated entities.
///
/// Commands are fire-and-forget: their effect is observed in the snapshots of later ticks.
pub trait EntityCommands {
    /// Sets the target speed of an entity.
    ///
    /// A `continuous` command keeps tracking a relative target until superseded.
    fn apply_speed(
        &mut self,
        entity: &str,
        target: &SpeedTarget,
        dynamics: &TransitionDynamics,
        continuous: bool,
    ) -> Result<(), CommandError>;

    /// Requests an entity to change lane.
    fn request_lane_change(
        &mut self,
        entity: &str,
        target: &LaneChangeTarget,
        dynamics: &TransitionDynamics,
    ) -> Result<(), CommandError>;

    /// Moves an entity instantly.
    fn teleport(&mut self, entity: &str, position: &AbsolutePosition) -> Result<(), CommandError>;

    /// Requests an entity to plan a route to, and drive towards, a position.
    fn request_acquire_position(
        &mut self,
        entity: &str,
        position: &AbsolutePosition,
    ) -> Result<(), CommandError>;

    /// Sets the visibility of an entity.
    fn set_visibility(&mut self, entity: &str, visibility: Visibility) -> Result<(), CommandError>;

    /// Adds an entity to the simulation.
    fn spawn(
        &mut self,
        object: &ScenarioObject,
        position: Option<&AbsolutePosition>,
    ) -> Result<(), CommandError>;

    /// Removes an entity from the simulation.
    fn despawn(&mut self, entity: &str) -> Result<(), CommandError>;
}

/// A simulator driven in discrete steps.
pub trait Simulator: EntityCommands {
    /// State of the entities at the current time.
    fn snapshot(&self) -> Snapshot;

    /// Advances the simulation by `dt` seconds.
    fn step(&mut self, dt: Time) -> Result<(), CommandError>;
}
