use crate::vector::{Axis, Vector3};

use serde::Deserialize;
use std::convert::TryFrom;
use std::ops;
use wavefront_obj::obj;

// Positions in world space. Subtracting two points yields a Vector3, which
// keeps the affine distinction honest throughout the intersection code.
#[derive(Clone, Copy, Deserialize)]
#[serde(try_from = "Vec<f32>")]
pub struct Point3 {
    x: f32,
    y: f32,
    z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Point3 {
        Point3 { x, y, z }
    }

    pub fn origin() -> Point3 {
        Point3::new(0.0, 0.0, 0.0)
    }

    pub fn x(&self) -> f32 {
        self.x
    }
    pub fn y(&self) -> f32 {
        self.y
    }
    pub fn z(&self) -> f32 {
        self.z
    }

    // Componentwise extremes, the building blocks of AABB unions.
    pub fn min(a: Point3, b: Point3) -> Point3 {
        Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z))
    }

    pub fn max(a: Point3, b: Point3) -> Point3 {
        Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z))
    }

    // Blend of two points, used for AABB centroids.
    pub fn midpoint(a: Point3, b: Point3) -> Point3 {
        Point3::new(
            a.x * 0.5 + b.x * 0.5,
            a.y * 0.5 + b.y * 0.5,
            a.z * 0.5 + b.z * 0.5,
        )
    }
}

impl ops::Add<Vector3> for Point3 {
    type Output = Point3;
    fn add(self, rhs: Vector3) -> Point3 {
        Point3::new(self.x + rhs.x(), self.y + rhs.y(), self.z + rhs.z())
    }
}

impl ops::Sub for Point3 {
    type Output = Vector3;
    fn sub(self, rhs: Point3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl ops::Sub<Vector3> for Point3 {
    type Output = Point3;
    fn sub(self, rhs: Vector3) -> Point3 {
        Point3::new(self.x - rhs.x(), self.y - rhs.y(), self.z - rhs.z())
    }
}

impl TryFrom<Vec<f32>> for Point3 {
    type Error = String;

    fn try_from(components: Vec<f32>) -> Result<Point3, String> {
        match components[..] {
            [x, y, z] => Ok(Point3::new(x, y, z)),
            _ => Err(format!(
                "a point needs exactly 3 components, got {}",
                components.len()
            )),
        }
    }
}

impl From<obj::Vertex> for Point3 {
    fn from(vertex: obj::Vertex) -> Self {
        Point3::new(vertex.x as f32, vertex.y as f32, vertex.z as f32)
    }
}

impl ops::Index<Axis> for Point3 {
    type Output = f32;
    fn index(&self, index: Axis) -> &f32 {
        match index {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}
