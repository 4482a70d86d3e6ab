//! A minimal in-memory simulator.
//!
//! The sandbox moves entities along their heading at their current speed,
//! and maps lanes onto straight parallel lines (`s` along x, offset along y).
//! It is meant for dry runs and tests, not as a physics engine.

use super::*;
use crate::ROUTING_TOLERANCE;
use crate::math::Point;
use log::{debug, trace};

#[derive(Debug, Clone)]
struct SpeedCommand {
    target: SpeedTarget,
    dynamics: TransitionDynamics,
    continuous: bool,
    rate: f64,
}

#[derive(Debug, Clone)]
struct SandboxEntity {
    status: EntityStatus,
    speed: Option<SpeedCommand>,
    // Target lane and time left before the lane change completes.
    lane_change: Option<(i64, Time)>,
    route: Option<Point>,
}

/// In-memory [`Simulator`] with trivial kinematics.
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    time: Time,
    entities: BTreeMap<String, SandboxEntity>,
}

impl Sandbox {
    /// Creates an empty sandbox at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time.
    pub fn time(&self) -> Time {
        self.time
    }

    /// Current status of an entity.
    pub fn status(&self, entity: &str) -> Option<&EntityStatus> {
        self.entities.get(entity).map(|e| &e.status)
    }

    /// Overwrites the status of an entity, adding it if missing.
    pub fn insert(&mut self, status: EntityStatus) {
        self.entities.insert(
            status.name.clone(),
            SandboxEntity {
                status,
                speed: None,
                lane_change: None,
                route: None,
            },
        );
    }

    fn entity_mut(&mut self, entity: &str) -> Result<&mut SandboxEntity, CommandError> {
        self.entities
            .get_mut(entity)
            .ok_or_else(|| CommandError::EntityNotPresent(entity.to_owned()))
    }

    fn resolve_speed(&self, target: &SpeedTarget) -> Result<f64, CommandError> {
        match target {
            SpeedTarget::Absolute(value) => Ok(*value),
            SpeedTarget::Relative {
                entity_ref,
                value_type,
                value,
            } => self
                .status(entity_ref)
                .map(|reference| value_type.apply(reference.linear_velocity, *value))
                .ok_or_else(|| CommandError::EntityNotPresent(entity_ref.to_owned())),
        }
    }
}

fn place(status: &mut EntityStatus, position: &AbsolutePosition) {
    match position {
        AbsolutePosition::World(pose) => {
            status.pose = *pose;
            status.lane_pose = None;
        }
        AbsolutePosition::Lane(lane) => {
            status.pose.position = Point::new(lane.s, lane.offset, 0.0);
            status.pose.orientation = Default::default();
            status.lane_pose = Some(LanePose {
                lane_id: lane.lane_id,
                s: lane.s,
                offset: lane.offset,
            });
        }
    }
}

impl EntityCommands for Sandbox {
    fn apply_speed(
        &mut self,
        entity: &str,
        target: &SpeedTarget,
        dynamics: &TransitionDynamics,
        continuous: bool,
    ) -> Result<(), CommandError> {
        let target_speed = self.resolve_speed(target)?;
        let entity = self.entity_mut(entity)?;
        let current = entity.status.linear_velocity;
        let delta = (target_speed - current).abs();
        let rate = match (dynamics.shape, dynamics.dimension) {
            (DynamicsShape::Step, _) => f64::INFINITY,
            (_, DynamicsDimension::Rate) => dynamics.value.abs(),
            (_, DynamicsDimension::Time) if dynamics.value > 0.0 => delta / dynamics.value,
            (_, DynamicsDimension::Distance) if dynamics.value > 0.0 => {
                (target_speed.powi(2) - current.powi(2)).abs() / (2.0 * dynamics.value)
            }
            _ => f64::INFINITY,
        };
        debug!(
            "'{}' speed {current} -> {target_speed} (rate {rate})",
            entity.status.name
        );
        if rate.is_infinite() {
            entity.status.linear_velocity = target_speed;
        }
        entity.speed = (rate.is_finite() || continuous).then(|| SpeedCommand {
            target: target.clone(),
            dynamics: *dynamics,
            continuous,
            rate,
        });
        Ok(())
    }

    fn request_lane_change(
        &mut self,
        entity: &str,
        target: &LaneChangeTarget,
        dynamics: &TransitionDynamics,
    ) -> Result<(), CommandError> {
        let lane_id = match target {
            LaneChangeTarget::Absolute(lane_id) => *lane_id,
            LaneChangeTarget::Relative { entity_ref, value } => {
                self.status(entity_ref)
                    .ok_or_else(|| CommandError::EntityNotPresent(entity_ref.to_owned()))?
                    .lane_pose
                    .ok_or_else(|| {
                        CommandError::Rejected(format!("entity `{entity_ref}` is not on a lane"))
                    })?
                    .lane_id
                    + value
            }
        };
        let duration = match (dynamics.shape, dynamics.dimension) {
            (DynamicsShape::Step, _) => 0.0,
            (_, DynamicsDimension::Time) => dynamics.value.max(0.0),
            // Anything else is approximated by a fixed-duration maneuver.
            _ => 1.0,
        };
        let entity = self.entity_mut(entity)?;
        if duration == 0.0 {
            let lane_pose = entity.status.lane_pose.get_or_insert(LanePose {
                lane_id,
                s: entity.status.pose.position.x,
                offset: 0.0,
            });
            lane_pose.lane_id = lane_id;
        } else {
            entity.lane_change = Some((lane_id, duration));
        }
        Ok(())
    }

    fn teleport(&mut self, entity: &str, position: &AbsolutePosition) -> Result<(), CommandError> {
        let entity = self.entity_mut(entity)?;
        place(&mut entity.status, position);
        Ok(())
    }

    fn request_acquire_position(
        &mut self,
        entity: &str,
        position: &AbsolutePosition,
    ) -> Result<(), CommandError> {
        let target = match position {
            AbsolutePosition::World(pose) => pose.position,
            AbsolutePosition::Lane(lane) => Point::new(lane.s, lane.offset, 0.0),
        };
        self.entity_mut(entity)?.route = Some(target);
        Ok(())
    }

    fn set_visibility(&mut self, entity: &str, visibility: Visibility) -> Result<(), CommandError> {
        self.entity_mut(entity)?.status.visibility = visibility;
        Ok(())
    }

    fn spawn(
        &mut self,
        object: &ScenarioObject,
        position: Option<&AbsolutePosition>,
    ) -> Result<(), CommandError> {
        if self.entities.contains_key(&object.name) {
            return Err(CommandError::AlreadySpawned(object.name.clone()));
        }
        let mut status = EntityStatus::new(object, Pose::default());
        if let Some(position) = position {
            place(&mut status, position);
        }
        debug!("spawn '{}'", object.name);
        self.insert(status);
        Ok(())
    }

    fn despawn(&mut self, entity: &str) -> Result<(), CommandError> {
        self.entities
            .remove(entity)
            .map(|_| debug!("despawn '{entity}'"))
            .ok_or_else(|| CommandError::EntityNotPresent(entity.to_owned()))
    }
}

impl Simulator for Sandbox {
    fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::new(self.time);
        for entity in self.entities.values() {
            snapshot.insert(entity.status.clone());
        }
        snapshot
    }

    fn step(&mut self, dt: Time) -> Result<(), CommandError> {
        // Targets are resolved against the state before the step,
        // so that the update does not depend on iteration order.
        let targets = self
            .entities
            .iter()
            .filter_map(|(name, entity)| {
                let command = entity.speed.as_ref()?;
                let target = self.resolve_speed(&command.target).ok()?;
                Some((name.clone(), target))
            })
            .collect::<BTreeMap<_, _>>();
        self.time += dt;
        for (name, entity) in self.entities.iter_mut() {
            let status = &mut entity.status;
            let previous = status.linear_velocity;
            if let (Some(command), Some(&target)) = (&entity.speed, targets.get(name)) {
                let max_change = command.rate * dt;
                let delta = (target - previous).clamp(-max_change, max_change);
                status.linear_velocity = previous + delta;
                let done = (status.linear_velocity - target).abs() <= f64::EPSILON;
                if done && !command.continuous {
                    trace!("'{name}' reached speed {target} ({:?})", command.dynamics.shape);
                    entity.speed = None;
                }
            }
            status.linear_acceleration = if dt > 0.0 {
                (status.linear_velocity - previous) / dt
            } else {
                0.0
            };
            if let Some(route) = entity.route {
                let position = status.pose.position;
                if position.distance(&route) <= ROUTING_TOLERANCE {
                    entity.route = None;
                } else {
                    status.pose.orientation.h = (route.y - position.y).atan2(route.x - position.x);
                }
            }
            let travel = status.linear_velocity * dt;
            let (sin, cos) = status.pose.orientation.h.sin_cos();
            status.pose.position.x += travel * cos;
            status.pose.position.y += travel * sin;
            if let Some(lane_pose) = status.lane_pose.as_mut() {
                lane_pose.s += travel;
            }
            if let Some((lane_id, remaining)) = entity.lane_change.take() {
                if remaining <= dt {
                    let s = status.pose.position.x;
                    status
                        .lane_pose
                        .get_or_insert(LanePose {
                            lane_id,
                            s,
                            offset: 0.0,
                        })
                        .lane_id = lane_id;
                } else {
                    entity.lane_change = Some((lane_id, remaining - dt));
                }
            }
        }
        Ok(())
    }
}
