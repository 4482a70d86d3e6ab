//! Positions as written in scenarios, and their resolution at a given tick.

use crate::math::{Orientation, Point, Pose};
use crate::simulator::{EntityStatus, LanePose, Snapshot};
use serde::Serialize;
use std::fmt;

/// A position on a lane: lane id, arc length along the lane and lateral offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanePosition {
    /// Road the lane belongs to (informative only).
    pub road_id: String,
    /// Identifier of the lane.
    pub lane_id: i64,
    /// Longitudinal coordinate along the lane, in meters.
    pub s: f64,
    /// Lateral offset from the lane center, in meters.
    pub offset: f64,
}

/// A position that no longer depends on the state of other entities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AbsolutePosition {
    /// A pose in world coordinates.
    World(Pose),
    /// A position on a lane (the simulator maps it onto the road network).
    Lane(LanePosition),
}

/// A position as declared in a scenario.
#[derive(Debug, Clone, PartialEq)]
pub enum Position {
    /// `WorldPosition`
    World(Pose),
    /// `RelativeWorldPosition`: offset in world axes from an entity.
    RelativeWorld {
        /// Reference entity.
        entity_ref: String,
        /// Offset from the reference entity's position.
        offset: Point,
    },
    /// `RelativeObjectPosition`: offset in the local axes of an entity.
    RelativeObject {
        /// Reference entity.
        entity_ref: String,
        /// Offset in the reference entity's frame.
        offset: Point,
    },
    /// `LanePosition`
    Lane(LanePosition),
}

impl Position {
    /// Resolves the position against the entities of the current tick.
    ///
    /// Returns `None` if the position is relative to an entity that does not exist (yet).
    pub fn resolve(&self, snapshot: &Snapshot) -> Option<AbsolutePosition> {
        match self {
            Position::World(pose) => Some(AbsolutePosition::World(*pose)),
            Position::Lane(lane) => Some(AbsolutePosition::Lane(lane.clone())),
            Position::RelativeWorld { entity_ref, offset } => {
                let reference = snapshot.status(entity_ref)?;
                let p = reference.pose.position;
                Some(AbsolutePosition::World(Pose {
                    position: Point::new(p.x + offset.x, p.y + offset.y, p.z + offset.z),
                    orientation: reference.pose.orientation,
                }))
            }
            Position::RelativeObject { entity_ref, offset } => {
                let reference = snapshot.status(entity_ref)?;
                Some(AbsolutePosition::World(Pose {
                    position: reference.pose.to_world(offset),
                    orientation: reference.pose.orientation,
                }))
            }
        }
    }

    /// Distance of an entity from the position.
    ///
    /// It is `NaN` if the position cannot be resolved.
    pub fn distance(&self, status: &EntityStatus, snapshot: &Snapshot) -> f64 {
        self.resolve(snapshot)
            .map_or(f64::NAN, |position| position.distance(status))
    }

    /// The entity this position is relative to, if any.
    pub fn entity_ref(&self) -> Option<&str> {
        match self {
            Position::World(_) | Position::Lane(_) => None,
            Position::RelativeWorld { entity_ref, .. }
            | Position::RelativeObject { entity_ref, .. } => Some(entity_ref),
        }
    }
}

impl AbsolutePosition {
    /// Distance of an entity from the position.
    ///
    /// For lane positions, this is the longitudinal distance along the lane,
    /// and it is undefined (`NaN`) when the entity is on another lane.
    pub fn distance(&self, status: &EntityStatus) -> f64 {
        match self {
            AbsolutePosition::World(pose) => status.pose.position.distance(&pose.position),
            AbsolutePosition::Lane(lane) => match &status.lane_pose {
                Some(LanePose { lane_id, s, .. }) if *lane_id == lane.lane_id => (s - lane.s).abs(),
                _ => f64::NAN,
            },
        }
    }
}

impl From<Pose> for Position {
    fn from(pose: Pose) -> Self {
        Position::World(pose)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::World(Pose {
                position: p,
                orientation: Orientation { h, .. },
            }) => write!(f, "(x: {}, y: {}, z: {}, h: {h})", p.x, p.y, p.z),
            Position::RelativeWorld { entity_ref, offset } => write!(
                f,
                "{entity_ref} + (dx: {}, dy: {}, dz: {})",
                offset.x, offset.y, offset.z
            ),
            Position::RelativeObject { entity_ref, offset } => write!(
                f,
                "{entity_ref}'s local (dx: {}, dy: {}, dz: {})",
                offset.x, offset.y, offset.z
            ),
            Position::Lane(lane) => write!(
                f,
                "lane {} (s: {}, offset: {})",
                lane.lane_id, lane.s, lane.offset
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn relative_positions() {
        let mut npc = fixtures::car("npc", 10.0, 0.0);
        npc.pose.orientation.h = std::f64::consts::FRAC_PI_2;
        let snapshot = Snapshot::new(0.0).with(npc);
        let behind = Position::RelativeObject {
            entity_ref: "npc".to_string(),
            offset: Point::new(-5.0, 0.0, 0.0),
        };
        let Some(AbsolutePosition::World(pose)) = behind.resolve(&snapshot) else {
            panic!("relative position should resolve");
        };
        assert!((pose.position.x - 10.0).abs() < 1e-9);
        assert!((pose.position.y + 5.0).abs() < 1e-9);
        let ghost = Position::RelativeWorld {
            entity_ref: "ghost".to_string(),
            offset: Point::default(),
        };
        assert_eq!(ghost.resolve(&snapshot), None);
        assert!(ghost.distance(&fixtures::car("ego", 0.0, 0.0), &snapshot).is_nan());
    }

    #[test]
    fn lane_distance() {
        let target = AbsolutePosition::Lane(LanePosition {
            road_id: "0".to_string(),
            lane_id: -1,
            s: 50.0,
            offset: 0.0,
        });
        let mut ego = fixtures::car("ego", 0.0, 0.0);
        assert!(target.distance(&ego).is_nan());
        ego.lane_pose = Some(LanePose {
            lane_id: -1,
            s: 42.0,
            offset: 0.3,
        });
        assert_eq!(target.distance(&ego), 8.0);
        ego.lane_pose = Some(LanePose {
            lane_id: -2,
            s: 50.0,
            offset: 0.0,
        });
        assert!(target.distance(&ego).is_nan());
    }
}
