use super::Actors;
use crate::entities::{Entities, SemanticError};
use crate::position::{AbsolutePosition, Position};
use crate::simulator::{
    DynamicsShape, LaneChangeTarget, SpeedTarget, SpeedTargetValueType, TransitionDynamics,
    Visibility,
};
use crate::storyboard::{Context, Effects};
use crate::{ROUTING_TOLERANCE, approx_eq};
use log::warn;
use std::fmt;

fn check_reference(entity_ref: &str, entities: &Entities) -> Result<(), SemanticError> {
    if entities.contains(entity_ref) {
        Ok(())
    } else {
        Err(SemanticError::UnknownEntity(entity_ref.to_owned()))
    }
}

/// Target of a [`SpeedAction`].
#[derive(Debug, Clone, PartialEq)]
pub enum SpeedActionTarget {
    /// `AbsoluteTargetSpeed`
    Absolute(f64),
    /// `RelativeTargetSpeed`
    Relative {
        /// Reference entity.
        entity_ref: String,
        /// How `value` combines with the reference speed.
        value_type: SpeedTargetValueType,
        /// Relative value.
        value: f64,
        /// Whether the actors keep tracking the reference speed.
        continuous: bool,
    },
}

/// Sets the speed of the actors.
#[derive(Debug, Clone)]
pub struct SpeedAction {
    actors: Actors,
    target: SpeedActionTarget,
    dynamics: TransitionDynamics,
    // Speed of the reference entity when the action started.
    reference_speed: Option<f64>,
}

impl SpeedAction {
    /// Creates the action, checking its actors are all vehicles or all pedestrians.
    pub fn new(
        actors: &[String],
        target: SpeedActionTarget,
        dynamics: TransitionDynamics,
        entities: &Entities,
    ) -> Result<Self, SemanticError> {
        let actors = Actors::moving("SpeedAction", actors, entities)?;
        if let SpeedActionTarget::Relative { entity_ref, .. } = &target {
            check_reference(entity_ref, entities)?;
        }
        Ok(Self {
            actors,
            target,
            dynamics,
            reference_speed: None,
        })
    }

    /// The actors of the action.
    pub fn actors(&self) -> &Actors {
        &self.actors
    }

    fn is_continuous(&self) -> bool {
        matches!(
            self.target,
            SpeedActionTarget::Relative {
                continuous: true,
                ..
            }
        )
    }

    /// Target speed, as of the start of the action (`NaN` if it cannot be determined).
    pub fn target_speed(&self) -> f64 {
        match &self.target {
            SpeedActionTarget::Absolute(value) => *value,
            SpeedActionTarget::Relative {
                value_type, value, ..
            } => self
                .reference_speed
                .map_or(f64::NAN, |reference| value_type.apply(reference, *value)),
        }
    }

    pub(super) fn start(&mut self, ctx: &Context, fx: &mut Effects) {
        self.actors.reset();
        let (target, continuous) = match &self.target {
            SpeedActionTarget::Absolute(value) => (SpeedTarget::Absolute(*value), false),
            SpeedActionTarget::Relative {
                entity_ref,
                value_type,
                value,
                continuous,
            } => {
                self.reference_speed = ctx
                    .snapshot
                    .status(entity_ref)
                    .map(|reference| reference.linear_velocity);
                if self.reference_speed.is_none() {
                    warn!(target: "storyboard", "SpeedAction: reference entity '{entity_ref}' does not exist");
                }
                let target = SpeedTarget::Relative {
                    entity_ref: entity_ref.clone(),
                    value_type: *value_type,
                    value: *value,
                };
                (target, *continuous)
            }
        };
        for actor in self.actors.names() {
            fx.issue(|commands| commands.apply_speed(actor, &target, &self.dynamics, continuous));
        }
    }

    pub(super) fn accomplished(&mut self, ctx: &Context) -> bool {
        if self.is_continuous() {
            // Tracks its reference until superseded or stopped.
            return false;
        }
        if self.dynamics.shape == DynamicsShape::Step {
            return true;
        }
        let target = self.target_speed();
        self.actors
            .update(ctx.snapshot, |status| approx_eq(status.linear_velocity, target))
    }
}

impl fmt::Display for SpeedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            SpeedActionTarget::Absolute(value) => {
                write!(f, "{}: speed -> {value}", self.actors)
            }
            SpeedActionTarget::Relative {
                entity_ref,
                value_type,
                value,
                continuous,
            } => {
                let op = match value_type {
                    SpeedTargetValueType::Delta => "+",
                    SpeedTargetValueType::Factor => "*",
                };
                write!(f, "{}: speed -> {entity_ref}'s {op} {value}", self.actors)?;
                if *continuous {
                    write!(f, " (continuous)")
                } else {
                    write!(f, " = {}", self.target_speed())
                }
            }
        }
    }
}

/// Makes the actors change lane.
#[derive(Debug, Clone)]
pub struct LaneChangeAction {
    actors: Actors,
    target: LaneChangeTarget,
    dynamics: TransitionDynamics,
    target_lane_offset: f64,
    // Target lane id, fixed when the action starts.
    target_lane: Option<i64>,
}

impl LaneChangeAction {
    /// Creates the action, checking its actors are all vehicles or all pedestrians.
    pub fn new(
        actors: &[String],
        target: LaneChangeTarget,
        dynamics: TransitionDynamics,
        target_lane_offset: f64,
        entities: &Entities,
    ) -> Result<Self, SemanticError> {
        let actors = Actors::moving("LaneChangeAction", actors, entities)?;
        if let LaneChangeTarget::Relative { entity_ref, .. } = &target {
            check_reference(entity_ref, entities)?;
        }
        Ok(Self {
            actors,
            target,
            dynamics,
            target_lane_offset,
            target_lane: None,
        })
    }

    pub(super) fn start(&mut self, ctx: &Context, fx: &mut Effects) {
        self.actors.reset();
        self.target_lane = match &self.target {
            LaneChangeTarget::Absolute(lane_id) => Some(*lane_id),
            LaneChangeTarget::Relative { entity_ref, value } => {
                let reference = ctx.snapshot.status(entity_ref).and_then(|s| s.lane_pose);
                if reference.is_none() {
                    warn!(target: "storyboard", "LaneChangeAction: reference entity '{entity_ref}' is not on a lane");
                }
                reference.map(|lane_pose| lane_pose.lane_id + value)
            }
        };
        for actor in self.actors.names() {
            fx.issue(|commands| commands.request_lane_change(actor, &self.target, &self.dynamics));
        }
    }

    pub(super) fn accomplished(&mut self, ctx: &Context) -> bool {
        if self.dynamics.shape == DynamicsShape::Step {
            return true;
        }
        let Some(target_lane) = self.target_lane else {
            return false;
        };
        self.actors.update(ctx.snapshot, |status| {
            status
                .lane_pose
                .is_some_and(|lane_pose| lane_pose.lane_id == target_lane)
        })
    }
}

impl fmt::Display for LaneChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            LaneChangeTarget::Absolute(lane_id) => {
                write!(f, "{}: change to lane {lane_id}", self.actors)?
            }
            LaneChangeTarget::Relative { entity_ref, value } => write!(
                f,
                "{}: change to {value} lane(s) from {entity_ref}'s",
                self.actors
            )?,
        }
        if self.target_lane_offset != 0.0 {
            write!(f, " (offset {})", self.target_lane_offset)?;
        }
        Ok(())
    }
}

/// Moves the actors instantly.
#[derive(Debug, Clone)]
pub struct TeleportAction {
    actors: Actors,
    position: Position,
}

impl TeleportAction {
    /// Creates the action.
    pub fn new(
        actors: &[String],
        position: Position,
        entities: &Entities,
    ) -> Result<Self, SemanticError> {
        if let Some(entity_ref) = position.entity_ref() {
            check_reference(entity_ref, entities)?;
        }
        Ok(Self {
            actors: Actors::new("TeleportAction", actors, entities)?,
            position,
        })
    }

    pub(super) fn start(&mut self, ctx: &Context, fx: &mut Effects) {
        let Some(position) = self.position.resolve(ctx.snapshot) else {
            warn!(target: "storyboard", "TeleportAction: cannot resolve {}", self.position);
            return;
        };
        for actor in self.actors.names() {
            fx.issue(|commands| commands.teleport(actor, &position));
        }
    }
}

impl fmt::Display for TeleportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: teleport to {}", self.actors, self.position)
    }
}

/// Sets the visibility of the actors.
#[derive(Debug, Clone)]
pub struct VisibilityAction {
    actors: Actors,
    visibility: Visibility,
}

impl VisibilityAction {
    /// Creates the action.
    pub fn new(
        actors: &[String],
        visibility: Visibility,
        entities: &Entities,
    ) -> Result<Self, SemanticError> {
        Ok(Self {
            actors: Actors::new("VisibilityAction", actors, entities)?,
            visibility,
        })
    }

    pub(super) fn start(&mut self, fx: &mut Effects) {
        for actor in self.actors.names() {
            fx.issue(|commands| commands.set_visibility(actor, self.visibility));
        }
    }
}

impl fmt::Display for VisibilityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Visibility {
            graphics,
            traffic,
            sensors,
        } = self.visibility;
        write!(
            f,
            "{}: visibility graphics={graphics} traffic={traffic} sensors={sensors}",
            self.actors
        )
    }
}

/// Makes the actors drive to a position.
#[derive(Debug, Clone)]
pub struct AcquirePositionAction {
    actors: Actors,
    position: Position,
    // Position as resolved when the action started.
    resolved: Option<AbsolutePosition>,
}

impl AcquirePositionAction {
    /// Creates the action, checking its actors are all vehicles or all pedestrians.
    pub fn new(
        actors: &[String],
        position: Position,
        entities: &Entities,
    ) -> Result<Self, SemanticError> {
        if let Some(entity_ref) = position.entity_ref() {
            check_reference(entity_ref, entities)?;
        }
        Ok(Self {
            actors: Actors::moving("AcquirePositionAction", actors, entities)?,
            position,
            resolved: None,
        })
    }

    pub(super) fn start(&mut self, ctx: &Context, fx: &mut Effects) {
        self.actors.reset();
        self.resolved = self.position.resolve(ctx.snapshot);
        let Some(position) = &self.resolved else {
            warn!(target: "storyboard", "AcquirePositionAction: cannot resolve {}", self.position);
            return;
        };
        for actor in self.actors.names() {
            fx.issue(|commands| commands.request_acquire_position(actor, position));
        }
    }

    pub(super) fn accomplished(&mut self, ctx: &Context) -> bool {
        let Some(position) = &self.resolved else {
            return false;
        };
        self.actors.update(ctx.snapshot, |status| {
            position.distance(status) <= ROUTING_TOLERANCE
        })
    }
}

impl fmt::Display for AcquirePositionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: acquire position {}", self.actors, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::interpreter::Outcome;
    use crate::simulator::{DynamicsDimension, Sandbox, Simulator, Snapshot};
    use crate::storyboard::Journal;

    fn ego() -> Vec<String> {
        vec!["ego".to_string()]
    }

    // Runs `f` with a context on the snapshot and effects on the sandbox.
    fn with_effects<R>(
        snapshot: &Snapshot,
        sandbox: &mut Sandbox,
        f: impl FnOnce(&Context, &mut Effects) -> R,
    ) -> R {
        let journal = Journal::default();
        let mut pending = Journal::default();
        let mut outcome = Outcome::Running;
        let ctx = Context {
            snapshot,
            journal: &journal,
        };
        let mut fx = Effects::new(sandbox, &mut pending, &mut outcome);
        let result = f(&ctx, &mut fx);
        assert!(fx.into_errors().is_empty());
        result
    }

    #[test]
    fn absolute_step_speed() {
        let mut action = SpeedAction::new(
            &ego(),
            SpeedActionTarget::Absolute(5.0),
            TransitionDynamics::STEP,
            &fixtures::entities(),
        )
        .expect("speed action");
        let snapshot = Snapshot::new(0.0).with(fixtures::car("ego", 0.0, 0.0));
        let mut sandbox = Sandbox::new();
        sandbox.insert(fixtures::car("ego", 0.0, 0.0));
        let accomplished = with_effects(&snapshot, &mut sandbox, |ctx, fx| {
            action.start(ctx, fx);
            action.accomplished(ctx)
        });
        assert!(accomplished);
        assert_eq!(sandbox.status("ego").expect("ego").linear_velocity, 5.0);
    }

    #[test]
    fn relative_continuous_speed_never_accomplished() {
        let mut action = SpeedAction::new(
            &ego(),
            SpeedActionTarget::Relative {
                entity_ref: "npc".to_string(),
                value_type: SpeedTargetValueType::Delta,
                value: 0.0,
                continuous: true,
            },
            TransitionDynamics::STEP,
            &fixtures::entities(),
        )
        .expect("speed action");
        let mut sandbox = Sandbox::new();
        sandbox.insert(fixtures::car("ego", 0.0, 3.0));
        sandbox.insert(fixtures::car("npc", 10.0, 3.0));
        let snapshot = sandbox.snapshot();
        with_effects(&snapshot, &mut sandbox, |ctx, fx| {
            action.start(ctx, fx);
            assert!(!action.accomplished(ctx));
        });
        for _ in 0..3 {
            sandbox.step(0.1).expect("step");
            let snapshot = sandbox.snapshot();
            // Same speed as the reference, still not accomplished.
            with_effects(&snapshot, &mut sandbox, |ctx, _| {
                assert!(!action.accomplished(ctx))
            });
        }
    }

    #[test]
    fn relative_speed_uses_reference_at_start() {
        let linear = TransitionDynamics {
            shape: DynamicsShape::Linear,
            dimension: DynamicsDimension::Rate,
            value: 10.0,
        };
        let mut action = SpeedAction::new(
            &ego(),
            SpeedActionTarget::Relative {
                entity_ref: "npc".to_string(),
                value_type: SpeedTargetValueType::Factor,
                value: 2.0,
                continuous: false,
            },
            linear,
            &fixtures::entities(),
        )
        .expect("speed action");
        let start = Snapshot::new(0.0)
            .with(fixtures::car("ego", 0.0, 0.0))
            .with(fixtures::car("npc", 10.0, 2.0));
        let mut sandbox = Sandbox::new();
        with_effects(&start, &mut sandbox, |ctx, fx| action.start(ctx, fx));
        assert_eq!(action.target_speed(), 4.0);
        // The reference speeds up: the target does not change.
        let later = Snapshot::new(1.0)
            .with(fixtures::car("ego", 0.0, 4.0))
            .with(fixtures::car("npc", 10.0, 5.0));
        assert!(with_effects(&later, &mut sandbox, |ctx, _| action.accomplished(ctx)));
    }

    #[test]
    fn absent_actor_is_not_accomplished() {
        let linear = TransitionDynamics {
            shape: DynamicsShape::Linear,
            dimension: DynamicsDimension::Rate,
            value: 1.0,
        };
        let mut action = SpeedAction::new(
            &ego(),
            SpeedActionTarget::Absolute(0.0),
            linear,
            &fixtures::entities(),
        )
        .expect("speed action");
        let mut sandbox = Sandbox::new();
        let empty = Snapshot::new(0.0);
        // Commands to missing entities are dropped, not reported.
        let accomplished = with_effects(&empty, &mut sandbox, |ctx, fx| {
            action.start(ctx, fx);
            action.accomplished(ctx)
        });
        assert!(!accomplished);
    }

    #[test]
    fn actor_types_checked_at_construction() {
        let mut entities = fixtures::entities();
        entities
            .add_selection("mixed", vec!["ego".to_string(), "bob".to_string()])
            .expect("selection");
        let result = SpeedAction::new(
            &["mixed".to_string()],
            SpeedActionTarget::Absolute(1.0),
            TransitionDynamics::STEP,
            &entities,
        );
        assert!(matches!(result, Err(SemanticError::InvalidActor { .. })));
        let result = SpeedAction::new(
            &ego(),
            SpeedActionTarget::Relative {
                entity_ref: "ghost".to_string(),
                value_type: SpeedTargetValueType::Delta,
                value: 1.0,
                continuous: false,
            },
            TransitionDynamics::STEP,
            &entities,
        );
        assert_eq!(
            result.map(|_| ()),
            Err(SemanticError::UnknownEntity("ghost".to_string()))
        );
    }

    #[test]
    fn relative_lane_change() {
        let dynamics = TransitionDynamics {
            shape: DynamicsShape::Sinusoidal,
            dimension: DynamicsDimension::Time,
            value: 0.5,
        };
        let mut action = LaneChangeAction::new(
            &ego(),
            LaneChangeTarget::Relative {
                entity_ref: "ego".to_string(),
                value: 1,
            },
            dynamics,
            0.0,
            &fixtures::entities(),
        )
        .expect("lane change");
        let mut sandbox = Sandbox::new();
        let mut ego = fixtures::car("ego", 0.0, 10.0);
        ego.lane_pose = Some(crate::simulator::LanePose {
            lane_id: -1,
            s: 0.0,
            offset: 0.0,
        });
        sandbox.insert(ego);
        let snapshot = sandbox.snapshot();
        let accomplished = with_effects(&snapshot, &mut sandbox, |ctx, fx| {
            action.start(ctx, fx);
            action.accomplished(ctx)
        });
        assert!(!accomplished);
        sandbox.step(0.5).expect("step");
        let snapshot = sandbox.snapshot();
        assert_eq!(snapshot.status("ego").and_then(|s| s.lane_pose).map(|l| l.lane_id), Some(0));
        assert!(with_effects(&snapshot, &mut sandbox, |ctx, _| action.accomplished(ctx)));
    }

    #[test]
    fn relative_lane_change_counts_lanes() {
        let dynamics = TransitionDynamics {
            shape: DynamicsShape::Linear,
            dimension: DynamicsDimension::Time,
            value: 2.0,
        };
        let mut action = LaneChangeAction::new(
            &ego(),
            LaneChangeTarget::Relative {
                entity_ref: "ego".to_string(),
                value: 2,
            },
            dynamics,
            0.0,
            &fixtures::entities(),
        )
        .expect("lane change");
        let on_lane = |time: f64, lane_id: i64| {
            let mut ego = fixtures::car("ego", 0.0, 10.0);
            ego.lane_pose = Some(crate::simulator::LanePose {
                lane_id,
                s: 0.0,
                offset: 0.0,
            });
            Snapshot::new(time).with(ego)
        };
        let mut sandbox = Sandbox::new();
        let accomplished = with_effects(&on_lane(0.0, -1), &mut sandbox, |ctx, fx| {
            action.start(ctx, fx);
            action.accomplished(ctx)
        });
        assert!(!accomplished);
        // One lane over is not enough.
        assert!(!with_effects(&on_lane(1.0, 0), &mut sandbox, |ctx, _| action.accomplished(ctx)));
        assert!(with_effects(&on_lane(2.0, 1), &mut sandbox, |ctx, _| action.accomplished(ctx)));
    }

    #[test]
    fn acquire_position() {
        let mut action = AcquirePositionAction::new(
            &ego(),
            Position::World(fixtures::pose(0.0, 20.0, 0.0)),
            &fixtures::entities(),
        )
        .expect("acquire position");
        let mut sandbox = Sandbox::new();
        sandbox.insert(fixtures::car("ego", 0.0, 10.0));
        let snapshot = sandbox.snapshot();
        with_effects(&snapshot, &mut sandbox, |ctx, fx| {
            action.start(ctx, fx);
            assert!(!action.accomplished(ctx));
        });
        // Heads north at 10 m/s.
        sandbox.step(1.0).expect("step");
        sandbox.step(1.0).expect("step");
        let snapshot = sandbox.snapshot();
        assert!(with_effects(&snapshot, &mut sandbox, |ctx, _| action.accomplished(ctx)));
    }
}
