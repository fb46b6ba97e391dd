use crate::point::Point3;
use crate::ray::Ray;
use crate::utils;
use crate::vector::Vector3;

// Pinhole camera fixed on the +z view axis. The horizontal NDC coordinate
// is negated, so +x in the image runs toward -x in world space.
pub struct Camera {
    origin: Point3,
    half_height: f32,
    aspect: f32,
    resolution_x: f32,
    resolution_y: f32,
}

impl Camera {
    pub fn new(origin: Point3, vertical_fov: f32, resolution_x: u32, resolution_y: u32) -> Camera {
        Camera {
            origin: origin,
            half_height: (utils::deg2rad(vertical_fov) * 0.5_f32).tan(),
            aspect: resolution_x as f32 / resolution_y as f32,
            resolution_x: resolution_x as f32,
            resolution_y: resolution_y as f32,
        }
    }

    // Primary ray through the center of pixel (i, j), origin top-left.
    pub fn primary_ray(&self, i: u32, j: u32) -> Ray {
        let x = (2.0_f32 * (i as f32 + 0.5_f32) / self.resolution_x - 1.0_f32)
            * self.aspect
            * self.half_height;
        let y = (1.0_f32 - 2.0_f32 * (j as f32 + 0.5_f32) / self.resolution_y) * self.half_height;
        Ray::new(self.origin, Vector3::new(-x, y, 1.0_f32).normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_centers_map_to_mirrored_ndc() {
        // 90 degree fov makes tan(fov / 2) exactly 1.
        let camera = Camera::new(Point3::origin(), 90.0, 2, 2);
        let r = camera.primary_ray(0, 0);
        let expected = Vector3::new(0.5, 0.5, 1.0).normalized();
        assert!((r.dir.x() - expected.x()).abs() < 1e-6);
        assert!((r.dir.y() - expected.y()).abs() < 1e-6);
        assert!((r.dir.z() - expected.z()).abs() < 1e-6);

        // The image center of an odd resolution looks straight down +z.
        let center_camera = Camera::new(Point3::origin(), 40.0, 3, 3);
        let center = center_camera.primary_ray(1, 1);
        assert!(center.dir.x().abs() < 1e-6);
        assert!(center.dir.y().abs() < 1e-6);
        assert!((center.dir.z() - 1.0).abs() < 1e-6);
    }
}
