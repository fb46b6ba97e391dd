use crate::bvh::{Bvh, AABB};
use crate::color::RGB;
use crate::material::Material;
use crate::point::Point3;
use crate::ray::Ray;
use crate::utils;
use crate::vector::Vector3;

use rand::rngs::SmallRng;
use rand::Rng;
use std::f32;
use std::sync::Arc;

// Everything the integrator needs to know about the closest hit. A miss is
// the absence of this record, not a flag on it.
pub struct Intersection<'a> {
    pub point: Point3,
    pub normal: Vector3,
    // Surface parameterization; carried for completeness, the integrator
    // does not read it.
    pub u: f32,
    pub v: f32,
    pub distance: f32,
    pub primitive: &'a SyncPrimitive,
    pub material: &'a Material,
}

// A point drawn from an emissive surface, paired with its density by the
// caller.
pub struct LightSample {
    pub point: Point3,
    pub normal: Vector3,
    pub emission: RGB,
}

pub trait Primitive {
    // Closest intersection strictly in front of `t_max`, or None.
    fn intersect(&self, r: &Ray, t_max: f32) -> Option<Intersection>;
    fn bounding_box(&self) -> AABB;
    fn area(&self) -> f32;
    // Uniform point on the surface; the returned density is 1 / area.
    fn sample(&self, rng: &mut SmallRng) -> (LightSample, f32);
    fn material(&self) -> &Arc<Material>;
    fn is_emissive(&self) -> bool {
        self.material().is_emissive()
    }
}
pub type SyncPrimitive = dyn Primitive + Send + Sync;

// Sphere hits closer than this along the ray are discarded. Doubles as the
// shadow-ray self-intersection guard for spheres; a fully general tracer
// would use an epsilon instead.
const SPHERE_NEAR_CUTOFF: f32 = 0.5_f32;

pub struct Sphere {
    center: Point3,
    radius: f32,
    area: f32,
    material: Arc<Material>,
}

impl Sphere {
    pub fn new(center: Point3, radius: f32, material: Arc<Material>) -> Sphere {
        Sphere {
            center: center,
            radius: radius,
            area: 4.0_f32 * f32::consts::PI * radius * radius,
            material: material,
        }
    }
}

const ONE_OVER_2_PI: f32 = 0.5_f32 * f32::consts::FRAC_1_PI;

impl Primitive for Sphere {
    fn intersect(&self, r: &Ray, t_max: f32) -> Option<Intersection> {
        let towards_origin = r.origin - self.center;
        let a = r.dir.dot(r.dir);
        let b = 2.0_f32 * towards_origin.dot(r.dir);
        let c = towards_origin.dot(towards_origin) - (self.radius * self.radius);

        let discriminant = b * b - 4.0_f32 * a * c;
        if discriminant < 0.0_f32 {
            return None;
        }
        // Nearer root first, falling back to the far one when the origin is
        // inside the sphere.
        let mut t_hit = (-b - discriminant.sqrt()) / (2.0_f32 * a);
        if t_hit < 0.0_f32 {
            t_hit = (-b + discriminant.sqrt()) / (2.0_f32 * a);
        }
        if t_hit < 0.0_f32 || t_hit <= SPHERE_NEAR_CUTOFF || t_hit >= t_max {
            return None;
        }

        let point = r.point_at(t_hit);
        let unit_point = (point - self.center) / self.radius;
        Some(Intersection {
            point: point,
            normal: unit_point,
            u: 1.0_f32 - ((unit_point.z().atan2(unit_point.x()) + f32::consts::PI) * ONE_OVER_2_PI),
            v: (unit_point.y().asin() + f32::consts::FRAC_PI_2) * f32::consts::FRAC_1_PI,
            distance: t_hit,
            primitive: self,
            material: self.material.as_ref(),
        })
    }

    fn bounding_box(&self) -> AABB {
        let extent = Vector3::new(self.radius, self.radius, self.radius);
        AABB::new(self.center - extent, self.center + extent)
    }

    fn area(&self) -> f32 {
        self.area
    }

    // Spherical-coordinate sampling with no sin(phi) weighting; not a true
    // uniform distribution over the surface, but the reported density
    // treats it as one.
    fn sample(&self, rng: &mut SmallRng) -> (LightSample, f32) {
        let theta = 2.0_f32 * f32::consts::PI * rng.gen::<f32>();
        let phi = f32::consts::PI * rng.gen::<f32>();
        let dir = Vector3::new(
            phi.cos(),
            phi.sin() * theta.cos(),
            phi.sin() * theta.sin(),
        );
        (
            LightSample {
                point: self.center + dir * self.radius,
                normal: dir,
                emission: self.material.emission(),
            },
            1.0_f32 / self.area,
        )
    }

    fn material(&self) -> &Arc<Material> {
        &self.material
    }
}

pub struct Triangle {
    v0: Point3,
    v1: Point3,
    v2: Point3,
    e1: Vector3,
    e2: Vector3,
    normal: Vector3,
    area: f32,
    material: Arc<Material>,
}

impl Triangle {
    // Vertices in counter-clockwise winding; the outward normal follows
    // from it.
    pub fn new(v0: Point3, v1: Point3, v2: Point3, material: Arc<Material>) -> Triangle {
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let scaled_normal = e1.cross(e2);
        Triangle {
            v0: v0,
            v1: v1,
            v2: v2,
            e1: e1,
            e2: e2,
            normal: scaled_normal.normalized(),
            area: scaled_normal.length() * 0.5_f32,
            material: material,
        }
    }
}

impl Primitive for Triangle {
    // Moller-Trumbore with back-face culling.
    // https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm
    fn intersect(&self, r: &Ray, t_max: f32) -> Option<Intersection> {
        if r.dir.dot(self.normal) > 0.0_f32 {
            return None;
        }

        let p_vec = r.dir.cross(self.e2);
        let determinant = self.e1.dot(p_vec);
        if determinant.abs() < utils::EPSILON {
            return None;
        }

        let inverse_determinant = 1.0_f32 / determinant;
        let t_vec = r.origin - self.v0;
        let u = t_vec.dot(p_vec) * inverse_determinant;
        if u < 0.0_f32 || u > 1.0_f32 {
            return None;
        }

        let q_vec = t_vec.cross(self.e1);
        let v = r.dir.dot(q_vec) * inverse_determinant;
        if v < 0.0_f32 || u + v > 1.0_f32 {
            return None;
        }

        let t_hit = self.e2.dot(q_vec) * inverse_determinant;
        if t_hit < 0.0_f32 || t_hit >= t_max {
            return None;
        }

        Some(Intersection {
            point: r.point_at(t_hit),
            normal: self.normal,
            u: u,
            v: v,
            distance: t_hit,
            primitive: self,
            material: self.material.as_ref(),
        })
    }

    fn bounding_box(&self) -> AABB {
        AABB::new(
            Point3::min(self.v0, Point3::min(self.v1, self.v2)),
            Point3::max(self.v0, Point3::max(self.v1, self.v2)),
        )
    }

    fn area(&self) -> f32 {
        self.area
    }

    // sqrt on the first coordinate makes the barycentric pair uniform over
    // the triangle interior.
    fn sample(&self, rng: &mut SmallRng) -> (LightSample, f32) {
        let x = rng.gen::<f32>().sqrt();
        let y = rng.gen::<f32>();
        let point = self.v0 + (self.e1 + (self.v2 - self.v1) * y) * x;
        (
            LightSample {
                point: point,
                normal: self.normal,
                emission: self.material.emission(),
            },
            1.0_f32 / self.area,
        )
    }

    fn material(&self) -> &Arc<Material> {
        &self.material
    }
}

// Triangle soup behind its own BVH. The scene-level tree sees the mesh as
// one primitive; intersection and sampling resolve down to the individual
// triangle.
pub struct Mesh {
    bvh: Bvh,
    bounds: AABB,
    area: f32,
    material: Arc<Material>,
}

impl Mesh {
    pub fn new(
        vertices: Vec<Point3>,
        indices: Vec<[usize; 3]>,
        material: Arc<Material>,
    ) -> Result<Mesh, String> {
        if indices.is_empty() {
            return Err(String::from("Mesh requires at least one triangle."));
        }
        let mut triangles: Vec<Arc<SyncPrimitive>> = Vec::with_capacity(indices.len());
        let mut bounds = AABB::empty();
        let mut area = 0.0_f32;
        for face in &indices {
            for index in face {
                if *index >= vertices.len() {
                    return Err(format!(
                        "Mesh has {} vertices but a face references index {}.",
                        vertices.len(),
                        index
                    ));
                }
            }
            let triangle = Triangle::new(
                vertices[face[0]],
                vertices[face[1]],
                vertices[face[2]],
                Arc::clone(&material),
            );
            bounds = AABB::union(&bounds, &triangle.bounding_box());
            area += triangle.area();
            triangles.push(Arc::new(triangle));
        }
        Ok(Mesh {
            bvh: Bvh::new(triangles),
            bounds: bounds,
            area: area,
            material: material,
        })
    }
}

impl Primitive for Mesh {
    fn intersect(&self, r: &Ray, t_max: f32) -> Option<Intersection> {
        self.bvh.intersect(r, t_max)
    }

    fn bounding_box(&self) -> AABB {
        self.bounds
    }

    fn area(&self) -> f32 {
        self.area
    }

    fn sample(&self, rng: &mut SmallRng) -> (LightSample, f32) {
        match self.bvh.sample(rng) {
            Some(drawn) => drawn,
            // Unreachable: the constructor rejects empty meshes.
            None => panic!("Mesh BVH was empty, which Mesh::new forbids."),
        }
    }

    fn material(&self) -> &Arc<Material> {
        &self.material
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;

    fn white() -> Arc<Material> {
        Arc::new(Material::Diffuse {
            kd: RGB::new(1.0, 1.0, 1.0),
            emission: RGB::black(),
        })
    }

    fn unit_triangle() -> Triangle {
        Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            white(),
        )
    }

    #[test]
    fn triangle_area_is_half_the_cross_product() {
        let t = unit_triangle();
        assert!((t.area() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn triangle_intersection_respects_winding() {
        let t = unit_triangle();
        // Against the normal (+z): hit.
        let front = Ray::new(Point3::new(0.25, 0.25, 1.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = t.intersect(&front, f32::MAX).unwrap();
        assert!((hit.distance - 1.0).abs() < 1e-5);
        assert!((hit.normal.z() - 1.0).abs() < 1e-5);
        // Along the normal: back face, miss.
        let back = Ray::new(Point3::new(0.25, 0.25, -1.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(t.intersect(&back, f32::MAX).is_none());
        // Outside the edges: miss.
        let outside = Ray::new(Point3::new(0.9, 0.9, 1.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(t.intersect(&outside, f32::MAX).is_none());
    }

    #[test]
    fn triangle_samples_average_to_the_centroid() {
        let t = unit_triangle();
        let mut rng = SmallRng::seed_from_u64(47);
        let samples = 100_000;
        let mut sum = Vector3::zero();
        for _ in 0..samples {
            let (s, pdf) = t.sample(&mut rng);
            assert!((pdf - 1.0 / t.area()).abs() < 1e-6);
            sum = sum + (s.point - Point3::origin());
        }
        let mean = sum / samples as f32;
        assert!((mean.x() - 1.0 / 3.0).abs() < 0.01);
        assert!((mean.y() - 1.0 / 3.0).abs() < 0.01);
        assert!(mean.z().abs() < 0.01);
    }

    #[test]
    fn sphere_round_trip_from_outside() {
        let radius = 2.0;
        let sphere = Sphere::new(Point3::new(1.0, -2.0, 3.0), radius, white());
        let mut rng = SmallRng::seed_from_u64(53);
        for _ in 0..100 {
            let (s, _) = sphere.sample(&mut rng);
            // Start twice the radius out along the surface normal and march
            // back toward the sampled point.
            let origin = Point3::new(1.0, -2.0, 3.0) + s.normal * (2.0 * radius);
            let r = Ray::new(origin, -s.normal);
            let hit = sphere.intersect(&r, f32::MAX).unwrap();
            assert!((hit.distance - radius).abs() < 1e-3);
        }
    }

    #[test]
    fn sphere_discards_near_hits() {
        // First root at t = 0.4, behind the near cutoff.
        let sphere = Sphere::new(Point3::new(0.0, 0.0, 1.0), 0.6, white());
        let r = Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, 1.0));
        assert!(sphere.intersect(&r, f32::MAX).is_none());

        // Same geometry moved out so the first root clears the cutoff.
        let farther = Sphere::new(Point3::new(0.0, 0.0, 2.0), 0.6, white());
        let hit = farther.intersect(&r, f32::MAX).unwrap();
        assert!((hit.distance - 1.4).abs() < 1e-5);
    }

    #[test]
    fn mesh_delegates_to_its_triangles() {
        let vertices = vec![
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(-1.0, 1.0, 0.0),
        ];
        let indices = vec![[0, 1, 2], [0, 2, 3]];
        let mesh = Mesh::new(vertices, indices, white()).unwrap();
        assert!((mesh.area() - 4.0).abs() < 1e-5);

        let r = Ray::new(Point3::new(0.5, -0.5, 2.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = mesh.intersect(&r, f32::MAX).unwrap();
        assert!((hit.distance - 2.0).abs() < 1e-5);
        assert!((hit.normal.z() - 1.0).abs() < 1e-5);

        let miss = Ray::new(Point3::new(5.0, 0.0, 2.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(mesh.intersect(&miss, f32::MAX).is_none());
    }

    #[test]
    fn mesh_rejects_bad_indices() {
        let vertices = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        assert!(Mesh::new(vertices, vec![[0, 1, 2]], white()).is_err());
        assert!(Mesh::new(Vec::new(), Vec::new(), white()).is_err());
    }
}
