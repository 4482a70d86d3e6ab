use crate::math::check_collision_2d;
use crate::position::Position;
use crate::simulator::EntityStatus;
use crate::storyboard::Context;
use crate::trigger::{EntityRef, Measurements, TriggeringEntities};
use crate::{EPSILON, ObjectType, Rule, Time};
use hashbrown::HashMap;
use std::fmt;

/// A condition evaluated on each of its triggering entities.
#[derive(Debug, Clone)]
pub struct ByEntityCondition {
    triggering_entities: TriggeringEntities,
    condition: EntityCondition,
}

impl ByEntityCondition {
    /// Binds a condition to its triggering entities.
    pub fn new(triggering_entities: TriggeringEntities, condition: EntityCondition) -> Self {
        Self {
            triggering_entities,
            condition,
        }
    }

    /// The triggering entities.
    pub fn triggering_entities(&self) -> &TriggeringEntities {
        &self.triggering_entities
    }

    /// The bound condition.
    pub fn condition(&self) -> &EntityCondition {
        &self.condition
    }

    pub(super) fn evaluate(&mut self, ctx: &Context) -> bool {
        let entities = &self.triggering_entities;
        match &mut self.condition {
            EntityCondition::Collision(condition) => condition.evaluate(entities, ctx),
            EntityCondition::TimeHeadway(condition) => condition.evaluate(entities, ctx),
            EntityCondition::Acceleration(condition) => condition.evaluate(entities, ctx),
            EntityCondition::StandStill(condition) => condition.evaluate(entities, ctx),
            EntityCondition::Speed(condition) => condition.evaluate(entities, ctx),
            EntityCondition::ReachPosition(condition) => condition.evaluate(entities, ctx),
            EntityCondition::Distance(condition) => condition.evaluate(entities, ctx),
            EntityCondition::RelativeDistance(condition) => condition.evaluate(entities, ctx),
        }
    }

    pub(super) fn reset(&mut self) {
        match &mut self.condition {
            EntityCondition::StandStill(condition) => {
                condition.standing.clear();
                condition.results.clear();
            }
            EntityCondition::Collision(condition) => condition.results.clear(),
            EntityCondition::TimeHeadway(condition) => condition.results.clear(),
            EntityCondition::Acceleration(condition) => condition.results.clear(),
            EntityCondition::Speed(condition) => condition.results.clear(),
            EntityCondition::ReachPosition(condition) => condition.results.clear(),
            EntityCondition::Distance(condition) => condition.results.clear(),
            EntityCondition::RelativeDistance(condition) => condition.results.clear(),
        }
    }
}

impl fmt::Display for ByEntityCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let who = self.triggering_entities.description();
        match &self.condition {
            EntityCondition::Collision(c) => write!(
                f,
                "{who} colliding with {}? {}",
                c.target,
                format_measurements(&c.results)
            ),
            EntityCondition::TimeHeadway(c) => write!(
                f,
                "{who}'s time headway to {} = {} {} {}?",
                c.entity_ref,
                format_measurements(&c.results),
                c.rule,
                c.value
            ),
            EntityCondition::Acceleration(c) => write!(
                f,
                "{who}'s acceleration = {} {} {}?",
                format_measurements(&c.results),
                c.rule,
                c.value
            ),
            EntityCondition::StandStill(c) => write!(
                f,
                "{who} standing still for {} >= {}?",
                format_measurements(&c.results),
                c.duration
            ),
            EntityCondition::Speed(c) => write!(
                f,
                "{who}'s speed = {} {} {}?",
                format_measurements(&c.results),
                c.rule,
                c.value
            ),
            EntityCondition::ReachPosition(c) => write!(
                f,
                "{who}'s distance to {} = {} <= {}?",
                c.position,
                format_measurements(&c.results),
                c.tolerance
            ),
            EntityCondition::Distance(c) => write!(
                f,
                "{who}'s {}distance to {} = {} {} {}?",
                if c.freespace { "freespace " } else { "" },
                c.position,
                format_measurements(&c.results),
                c.rule,
                c.value
            ),
            EntityCondition::RelativeDistance(c) => write!(
                f,
                "{who}'s {}{} distance to {} = {} {} {}?",
                if c.freespace { "freespace " } else { "" },
                c.relative_distance_type,
                c.entity_ref,
                format_measurements(&c.results),
                c.rule,
                c.value
            ),
        }
    }
}

fn format_measurements<T: fmt::Display>(measurements: &Measurements<T>) -> String {
    let groups = measurements
        .iter()
        .map(|values| {
            let values = values.iter().map(T::to_string).collect::<Vec<_>>();
            format!("[{}]", values.join(", "))
        })
        .collect::<Vec<_>>();
    groups.join(" ")
}

/// The closed set of entity conditions.
#[derive(Debug, Clone)]
pub enum EntityCondition {
    /// `CollisionCondition`
    Collision(CollisionCondition),
    /// `TimeHeadwayCondition`
    TimeHeadway(TimeHeadwayCondition),
    /// `AccelerationCondition`
    Acceleration(AccelerationCondition),
    /// `StandStillCondition`
    StandStill(StandStillCondition),
    /// `SpeedCondition`
    Speed(SpeedCondition),
    /// `ReachPositionCondition`
    ReachPosition(ReachPositionCondition),
    /// `DistanceCondition`
    Distance(DistanceCondition),
    /// `RelativeDistanceCondition`
    RelativeDistance(RelativeDistanceCondition),
}

/// Compares the speed of the triggering entities against a value.
#[derive(Debug, Clone)]
pub struct SpeedCondition {
    /// Threshold, in m/s.
    pub value: f64,
    /// Comparison rule.
    pub rule: Rule,
    results: Measurements<f64>,
}

impl SpeedCondition {
    /// `speed <rule> value`
    pub fn new(value: f64, rule: Rule) -> Self {
        Self {
            value,
            rule,
            results: Vec::new(),
        }
    }

    fn evaluate(&mut self, entities: &TriggeringEntities, ctx: &Context) -> bool {
        entities.evaluate(
            ctx.snapshot,
            &mut self.results,
            |status| status.linear_velocity,
            |speed| self.rule.apply(speed, self.value),
        )
    }
}

/// Compares the acceleration of the triggering entities against a value.
#[derive(Debug, Clone)]
pub struct AccelerationCondition {
    /// Threshold, in m/s².
    pub value: f64,
    /// Comparison rule.
    pub rule: Rule,
    results: Measurements<f64>,
}

impl AccelerationCondition {
    /// `acceleration <rule> value`
    pub fn new(value: f64, rule: Rule) -> Self {
        Self {
            value,
            rule,
            results: Vec::new(),
        }
    }

    fn evaluate(&mut self, entities: &TriggeringEntities, ctx: &Context) -> bool {
        entities.evaluate(
            ctx.snapshot,
            &mut self.results,
            |status| status.linear_acceleration,
            |acceleration| self.rule.apply(acceleration, self.value),
        )
    }
}

/// Holds when the triggering entities have been standing still for a given duration.
#[derive(Debug, Clone)]
pub struct StandStillCondition {
    /// Minimum standstill duration, in seconds.
    pub duration: Time,
    // Per object: time of the last observation and standstill duration at that time.
    standing: HashMap<String, (Time, Time)>,
    results: Measurements<f64>,
}

impl StandStillCondition {
    /// Standing still for at least `duration` seconds.
    pub fn new(duration: Time) -> Self {
        Self {
            duration,
            standing: HashMap::new(),
            results: Vec::new(),
        }
    }

    fn evaluate(&mut self, entities: &TriggeringEntities, ctx: &Context) -> bool {
        let now = ctx.snapshot.time;
        let standing = &mut self.standing;
        entities.evaluate(
            ctx.snapshot,
            &mut self.results,
            |status| {
                if status.linear_velocity.abs() <= EPSILON {
                    let (last, duration) = standing
                        .entry(status.name.clone())
                        .or_insert((now, 0.0));
                    if now > *last {
                        *duration += now - *last;
                        *last = now;
                    }
                    *duration
                } else {
                    standing.remove(&status.name);
                    0.0
                }
            },
            |duration| duration + 1e-9 >= self.duration,
        )
    }
}

/// What a collision is checked against.
#[derive(Debug, Clone, PartialEq)]
pub enum CollisionTarget {
    /// A specific entity (or the members of a selection).
    Entity(EntityRef),
    /// Any entity of the given type.
    ByType(ObjectType),
}

impl fmt::Display for CollisionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionTarget::Entity(entity_ref) => f.write_str(&entity_ref.name),
            CollisionTarget::ByType(object_type) => write!(f, "any {object_type:?}"),
        }
    }
}

/// Holds when the triggering entities collide with the target.
#[derive(Debug, Clone)]
pub struct CollisionCondition {
    /// Colliding counterpart.
    pub target: CollisionTarget,
    results: Measurements<bool>,
}

impl CollisionCondition {
    /// Collision with the given target.
    pub fn new(target: CollisionTarget) -> Self {
        Self {
            target,
            results: Vec::new(),
        }
    }

    fn evaluate(&mut self, entities: &TriggeringEntities, ctx: &Context) -> bool {
        let snapshot = ctx.snapshot;
        let target = &self.target;
        let collides = |status: &EntityStatus, other: &EntityStatus| {
            other.name != status.name
                && check_collision_2d(
                    &status.pose,
                    &status.bounding_box,
                    &other.pose,
                    &other.bounding_box,
                )
        };
        entities.evaluate(
            snapshot,
            &mut self.results,
            |status| match target {
                CollisionTarget::Entity(entity_ref) => entity_ref
                    .objects
                    .iter()
                    .filter_map(|name| snapshot.status(name))
                    .any(|other| collides(status, other)),
                CollisionTarget::ByType(object_type) => snapshot
                    .iter()
                    .filter(|other| other.object_type == *object_type)
                    .any(|other| collides(status, other)),
            },
            |collision| collision,
        )
    }
}

/// Holds when the triggering entities are within `tolerance` from a position.
#[derive(Debug, Clone)]
pub struct ReachPositionCondition {
    /// Position to reach.
    pub position: Position,
    /// Radius around the position, in meters.
    pub tolerance: f64,
    results: Measurements<f64>,
}

impl ReachPositionCondition {
    /// Reaching `position` within `tolerance`.
    pub fn new(position: Position, tolerance: f64) -> Self {
        Self {
            position,
            tolerance,
            results: Vec::new(),
        }
    }

    fn evaluate(&mut self, entities: &TriggeringEntities, ctx: &Context) -> bool {
        entities.evaluate(
            ctx.snapshot,
            &mut self.results,
            |status| self.position.distance(status, ctx.snapshot),
            |distance| distance.is_finite() && distance <= self.tolerance,
        )
    }
}

/// Compares the distance of the triggering entities from a position against a value.
#[derive(Debug, Clone)]
pub struct DistanceCondition {
    /// Reference position.
    pub position: Position,
    /// Threshold, in meters.
    pub value: f64,
    /// Comparison rule.
    pub rule: Rule,
    /// Whether to measure from the entity's bounding box rather than its reference point.
    pub freespace: bool,
    results: Measurements<f64>,
}

impl DistanceCondition {
    /// `distance(position) <rule> value`
    pub fn new(position: Position, value: f64, rule: Rule, freespace: bool) -> Self {
        Self {
            position,
            value,
            rule,
            freespace,
            results: Vec::new(),
        }
    }

    fn evaluate(&mut self, entities: &TriggeringEntities, ctx: &Context) -> bool {
        entities.evaluate(
            ctx.snapshot,
            &mut self.results,
            |status| {
                let distance = self.position.distance(status, ctx.snapshot);
                if self.freespace {
                    (distance - status.bounding_box.half_diagonal()).max(0.0)
                } else {
                    distance
                }
            },
            |distance| self.rule.apply(distance, self.value),
        )
    }
}

/// How a relative distance is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeDistanceType {
    /// Along the triggering entity's heading.
    Longitudinal,
    /// Across the triggering entity's heading.
    Lateral,
    /// Euclidean distance.
    Cartesian,
}

impl RelativeDistanceType {
    /// Parses the name of a relative distance type as found in documents.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "longitudinal" => Some(RelativeDistanceType::Longitudinal),
            "lateral" => Some(RelativeDistanceType::Lateral),
            "cartesianDistance" => Some(RelativeDistanceType::Cartesian),
            _ => None,
        }
    }
}

impl fmt::Display for RelativeDistanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RelativeDistanceType::Longitudinal => "longitudinal",
            RelativeDistanceType::Lateral => "lateral",
            RelativeDistanceType::Cartesian => "cartesian",
        })
    }
}

// Distance between two entities, NaN if the reference does not exist.
fn relative_distance(
    status: &EntityStatus,
    reference: Option<&EntityStatus>,
    relative_distance_type: RelativeDistanceType,
    freespace: bool,
) -> f64 {
    let Some(reference) = reference else {
        return f64::NAN;
    };
    let local = status.pose.to_local(&reference.pose.position);
    let (distance, extent) = match relative_distance_type {
        RelativeDistanceType::Longitudinal => (
            local.x.abs(),
            (status.bounding_box.dimensions.length + reference.bounding_box.dimensions.length)
                / 2.0,
        ),
        RelativeDistanceType::Lateral => (
            local.y.abs(),
            (status.bounding_box.dimensions.width + reference.bounding_box.dimensions.width) / 2.0,
        ),
        RelativeDistanceType::Cartesian => (
            status.pose.position.distance(&reference.pose.position),
            status.bounding_box.half_diagonal() + reference.bounding_box.half_diagonal(),
        ),
    };
    if freespace {
        (distance - extent).max(0.0)
    } else {
        distance
    }
}

/// Compares the distance between the triggering entities and a reference entity against a value.
#[derive(Debug, Clone)]
pub struct RelativeDistanceCondition {
    /// Reference entity.
    pub entity_ref: String,
    /// How the distance is measured.
    pub relative_distance_type: RelativeDistanceType,
    /// Threshold, in meters.
    pub value: f64,
    /// Comparison rule.
    pub rule: Rule,
    /// Whether to measure between bounding boxes rather than reference points.
    pub freespace: bool,
    results: Measurements<f64>,
}

impl RelativeDistanceCondition {
    /// `distance(entity_ref) <rule> value`
    pub fn new(
        entity_ref: &str,
        relative_distance_type: RelativeDistanceType,
        value: f64,
        rule: Rule,
        freespace: bool,
    ) -> Self {
        Self {
            entity_ref: entity_ref.to_owned(),
            relative_distance_type,
            value,
            rule,
            freespace,
            results: Vec::new(),
        }
    }

    fn evaluate(&mut self, entities: &TriggeringEntities, ctx: &Context) -> bool {
        let reference = ctx.snapshot.status(&self.entity_ref);
        entities.evaluate(
            ctx.snapshot,
            &mut self.results,
            |status| {
                relative_distance(
                    status,
                    reference,
                    self.relative_distance_type,
                    self.freespace,
                )
            },
            |distance| self.rule.apply(distance, self.value),
        )
    }
}

/// Compares the time the triggering entities need to reach a reference entity
/// at their current speed against a value.
#[derive(Debug, Clone)]
pub struct TimeHeadwayCondition {
    /// Reference entity.
    pub entity_ref: String,
    /// Threshold, in seconds.
    pub value: f64,
    /// Comparison rule.
    pub rule: Rule,
    /// Whether to measure between bounding boxes rather than reference points.
    pub freespace: bool,
    results: Measurements<f64>,
}

impl TimeHeadwayCondition {
    /// `headway(entity_ref) <rule> value`
    pub fn new(entity_ref: &str, value: f64, rule: Rule, freespace: bool) -> Self {
        Self {
            entity_ref: entity_ref.to_owned(),
            value,
            rule,
            freespace,
            results: Vec::new(),
        }
    }

    fn evaluate(&mut self, entities: &TriggeringEntities, ctx: &Context) -> bool {
        let reference = ctx.snapshot.status(&self.entity_ref);
        entities.evaluate(
            ctx.snapshot,
            &mut self.results,
            |status| {
                // Not moving forward: no headway, which compares false.
                if status.linear_velocity <= 0.0 {
                    return f64::NAN;
                }
                relative_distance(
                    status,
                    reference,
                    RelativeDistanceType::Cartesian,
                    self.freespace,
                ) / status.linear_velocity
            },
            |headway| self.rule.apply(headway, self.value),
        )
    }
}
