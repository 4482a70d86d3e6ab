//! Planar geometry on entity poses and bounding boxes.

use serde::Serialize;

/// A point in world coordinates, in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    /// East.
    pub x: f64,
    /// North.
    pub y: f64,
    /// Up.
    pub z: f64,
}

impl Point {
    /// Creates a point from its coordinates.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance between two points.
    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

/// Heading, pitch and roll, in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Orientation {
    /// Heading (yaw), counter-clockwise from the x axis.
    pub h: f64,
    /// Pitch.
    pub p: f64,
    /// Roll.
    pub r: f64,
}

/// Position and orientation of an entity's reference point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Pose {
    /// Position of the reference point.
    pub position: Point,
    /// Orientation of the entity.
    pub orientation: Orientation,
}

impl Pose {
    /// Transforms a point from the entity's local frame to world coordinates (planar).
    pub fn to_world(&self, local: &Point) -> Point {
        let (sin, cos) = self.orientation.h.sin_cos();
        Point {
            x: self.position.x + local.x * cos - local.y * sin,
            y: self.position.y + local.x * sin + local.y * cos,
            z: self.position.z + local.z,
        }
    }

    /// Expresses a world point in the entity's local frame (planar):
    /// `x` is the longitudinal and `y` the lateral displacement.
    pub fn to_local(&self, world: &Point) -> Point {
        let (sin, cos) = self.orientation.h.sin_cos();
        let dx = world.x - self.position.x;
        let dy = world.y - self.position.y;
        Point {
            x: dx * cos + dy * sin,
            y: -dx * sin + dy * cos,
            z: world.z - self.position.z,
        }
    }
}

/// Width, length and height of a bounding box, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dimensions {
    /// Lateral extent.
    pub width: f64,
    /// Longitudinal extent.
    pub length: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            width: 2.0,
            length: 4.0,
            height: 1.5,
        }
    }
}

/// A bounding box, whose center is given in the entity's local frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BoundingBox {
    /// Center of the box relative to the entity's reference point.
    pub center: Point,
    /// Extent of the box.
    pub dimensions: Dimensions,
}

impl BoundingBox {
    /// The four corners of the box's footprint, in world coordinates.
    pub fn corners(&self, pose: &Pose) -> [Point; 4] {
        let half_length = self.dimensions.length / 2.0;
        let half_width = self.dimensions.width / 2.0;
        [
            (half_length, half_width),
            (-half_length, half_width),
            (-half_length, -half_width),
            (half_length, -half_width),
        ]
        .map(|(dx, dy)| {
            pose.to_world(&Point::new(self.center.x + dx, self.center.y + dy, self.center.z))
        })
    }

    /// Radius of the circle circumscribing the footprint.
    pub fn half_diagonal(&self) -> f64 {
        self.dimensions.length.hypot(self.dimensions.width) / 2.0
    }
}

/// Whether the footprints of two boxes overlap (separating axis theorem).
pub fn check_collision_2d(
    pose0: &Pose,
    bbox0: &BoundingBox,
    pose1: &Pose,
    bbox1: &BoundingBox,
) -> bool {
    let corners0 = bbox0.corners(pose0);
    let corners1 = bbox1.corners(pose1);
    // Candidate separating axes are the edge normals of both rectangles,
    // which are parallel to the entities' local axes.
    [pose0.orientation.h, pose1.orientation.h]
        .into_iter()
        .flat_map(|h| {
            let (sin, cos) = h.sin_cos();
            [(cos, sin), (-sin, cos)]
        })
        .all(|axis| {
            let (min0, max0) = project(&corners0, axis);
            let (min1, max1) = project(&corners1, axis);
            max0 >= min1 && max1 >= min0
        })
}

fn project(corners: &[Point; 4], (ax, ay): (f64, f64)) -> (f64, f64) {
    corners
        .iter()
        .map(|c| c.x * ax + c.y * ay)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), p| {
            (min.min(p), max.max(p))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    fn pose(x: f64, y: f64, h: f64) -> Pose {
        Pose {
            position: Point::new(x, y, 0.0),
            orientation: Orientation { h, p: 0.0, r: 0.0 },
        }
    }

    #[test]
    fn collision() {
        let bbox = BoundingBox::default();
        assert!(check_collision_2d(
            &pose(0.0, 0.0, 0.0),
            &bbox,
            &pose(3.9, 0.0, 0.0),
            &bbox
        ));
        assert!(!check_collision_2d(
            &pose(0.0, 0.0, 0.0),
            &bbox,
            &pose(4.1, 0.0, 0.0),
            &bbox
        ));
        assert!(!check_collision_2d(
            &pose(0.0, 0.0, 0.0),
            &bbox,
            &pose(0.0, 2.5, 0.0),
            &bbox
        ));
    }

    #[test]
    fn rotated_collision() {
        let bbox = BoundingBox::default();
        // Rotated box whose corner pokes into the other one.
        assert!(check_collision_2d(
            &pose(0.0, 0.0, 0.0),
            &bbox,
            &pose(3.5, 0.0, FRAC_PI_4),
            &bbox
        ));
        assert!(!check_collision_2d(
            &pose(0.0, 0.0, 0.0),
            &bbox,
            &pose(5.0, 0.0, FRAC_PI_4),
            &bbox
        ));
    }

    #[test]
    fn local_frame() {
        let pose = pose(1.0, 1.0, std::f64::consts::FRAC_PI_2);
        let local = pose.to_local(&Point::new(1.0, 3.0, 0.0));
        assert!((local.x - 2.0).abs() < 1e-9);
        assert!(local.y.abs() < 1e-9);
    }
}
