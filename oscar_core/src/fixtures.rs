// Shared builders for unit tests.

use crate::entities::{Entities, ObjectType, ScenarioObject};
use crate::math::{BoundingBox, Orientation, Point, Pose};
use crate::simulator::EntityStatus;

pub(crate) fn object(name: &str, object_type: ObjectType) -> ScenarioObject {
    ScenarioObject {
        name: name.to_string(),
        object_type,
        bounding_box: BoundingBox::default(),
    }
}

pub(crate) fn pose(x: f64, y: f64, h: f64) -> Pose {
    Pose {
        position: Point::new(x, y, 0.0),
        orientation: Orientation { h, p: 0.0, r: 0.0 },
    }
}

/// Registry with vehicles `ego` and `npc`, and pedestrian `bob`.
pub(crate) fn entities() -> Entities {
    let mut entities = Entities::new();
    for (name, object_type) in [
        ("ego", ObjectType::Vehicle),
        ("npc", ObjectType::Vehicle),
        ("bob", ObjectType::Pedestrian),
    ] {
        entities
            .add_object(object(name, object_type))
            .expect("add object");
    }
    entities
}

/// Status of a vehicle at `(x, 0)` heading east at the given speed.
pub(crate) fn car(name: &str, x: f64, speed: f64) -> EntityStatus {
    let mut status = EntityStatus::new(&object(name, ObjectType::Vehicle), pose(x, 0.0, 0.0));
    status.linear_velocity = speed;
    status
}
