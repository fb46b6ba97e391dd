use crate::point::Point3;
use crate::vector::Vector3;

pub struct Ray {
    pub origin: Point3,
    pub dir: Vector3,
    // Cached 1/dir per component for the AABB slab test. Rays are immutable
    // after construction, so this never goes stale. Axes with a zero
    // direction component produce an infinity here, which the slab
    // comparisons tolerate.
    pub inv_dir: Vector3,
}

impl Ray {
    pub fn new(origin: Point3, dir: Vector3) -> Ray {
        Ray {
            origin: origin,
            dir: dir,
            inv_dir: dir.reciprocal(),
        }
    }

    pub fn point_at(&self, t: f32) -> Point3 {
        self.origin + (self.dir * t)
    }
}
