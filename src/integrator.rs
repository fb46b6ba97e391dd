use crate::color::RGB;
use crate::ray::Ray;
use crate::scene::Scene;
use crate::utils;

use rand::rngs::SmallRng;
use rand::Rng;

// A shadow ray counts as reaching the light when its closest hit lands
// within this distance of the sampled point.
const LIGHT_HIT_TOLERANCE: f32 = 1e-2_f32;

// Next-event-estimation path tracer. Each call estimates the radiance
// arriving along `ray` as the sum of a direct term (an explicit sample on
// the emissive surfaces) and an indirect term (one BRDF-sampled bounce,
// continued under Russian roulette).
//
// Emissive surfaces only report their radiance to camera rays (depth 0).
// Deeper hits on a light return black instead, because the bounce that led
// here already accounted for that light through its own direct term;
// counting it again would double the contribution.
pub fn radiance(scene: &Scene, ray: &Ray, depth: u32, rng: &mut SmallRng) -> RGB {
    let hit = match scene.intersect(ray) {
        Some(hit) => hit,
        None => return RGB::black(),
    };

    if hit.material.is_emissive() {
        if depth == 0 {
            return hit.material.emission();
        }
        return RGB::black();
    }

    let normal = hit.normal;

    let mut l_dir = RGB::black();
    if let Some((light, pdf_light)) = scene.sample_light(rng) {
        let to_light = light.point - hit.point;
        let light_dir = to_light.normalized();
        let shadow_ray = Ray::new(hit.point, light_dir);
        if let Some(occluder) = scene.intersect(&shadow_ray) {
            if (occluder.point - light.point).length() < LIGHT_HIT_TOLERANCE {
                let f_r = hit.material.eval(&ray.dir, &light_dir, &normal);
                l_dir = light.emission
                    * f_r
                    * light_dir.dot(normal)
                    * (-light_dir).dot(light.normal)
                    / to_light.squared_length()
                    / pdf_light;
            }
        }
    }

    let mut l_indir = RGB::black();
    if rng.gen::<f32>() < scene.russian_roulette {
        let next_dir = hit.material.sample(&ray.dir, &normal, rng).normalized();
        let next_ray = Ray::new(hit.point, next_dir);
        if let Some(next_hit) = scene.intersect(&next_ray) {
            // Emissive continuations are dropped; see above.
            if !next_hit.material.is_emissive() {
                let pdf = hit.material.pdf(&ray.dir, &next_dir, &normal);
                if pdf > utils::EPSILON {
                    let f_r = hit.material.eval(&ray.dir, &next_dir, &normal);
                    l_indir = radiance(scene, &next_ray, depth + 1, rng)
                        * f_r
                        * next_dir.dot(normal)
                        / pdf
                        / scene.russian_roulette;
                }
            }
        }
    }

    l_dir + l_indir
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::camera::Camera;
    use crate::color::RGB;
    use crate::material::Material;
    use crate::point::Point3;
    use crate::primitive::{Sphere, SyncPrimitive, Triangle};
    use crate::scene::{Logistics, Scene};
    use crate::vector::Vector3;

    use rand::SeedableRng;
    use std::sync::Arc;

    const PANEL_EMISSION: [f32; 3] = [47.8, 38.6, 31.1];

    fn logistics() -> Logistics {
        Logistics {
            resolution_x: 4,
            resolution_y: 4,
            samples: 16,
            tiles_x: 1,
            tiles_y: 1,
            russian_roulette: 0.9,
        }
    }

    fn quad(
        corner: Point3,
        edge_u: Vector3,
        edge_v: Vector3,
        material: &Arc<Material>,
    ) -> Vec<Arc<SyncPrimitive>> {
        let a = corner;
        let b = corner + edge_u;
        let c = corner + edge_u + edge_v;
        let d = corner + edge_v;
        vec![
            Arc::new(Triangle::new(a, b, c, Arc::clone(material))),
            Arc::new(Triangle::new(a, c, d, Arc::clone(material))),
        ]
    }

    fn scene_with(primitives: Vec<Arc<SyncPrimitive>>) -> Scene {
        let camera = Camera::new(Point3::origin(), 40.0, 4, 4);
        Scene::new(primitives, logistics(), camera)
    }

    // A lit-from-nowhere wall: every path ends without ever seeing an
    // emitter, so the estimate is exactly black.
    #[test]
    fn unlit_scene_is_black() {
        let wall = Arc::new(Material::Diffuse {
            kd: RGB::new(1.0, 1.0, 1.0),
            emission: RGB::black(),
        });
        // Facing the camera at z = 1 (counter-clockwise as seen from the
        // origin, normal pointing back at -z).
        let scene = scene_with(quad(
            Point3::new(2.0, -2.0, 1.0),
            Vector3::new(-4.0, 0.0, 0.0),
            Vector3::new(0.0, 4.0, 0.0),
            &wall,
        ));

        let mut rng = SmallRng::seed_from_u64(59);
        let ray = scene.camera.primary_ray(2, 2);
        for _ in 0..16 {
            let color = radiance(&scene, &ray, 0, &mut rng);
            assert_eq!(color.r(), 0.0);
            assert_eq!(color.g(), 0.0);
            assert_eq!(color.b(), 0.0);
        }
    }

    // A camera ray that lands on the panel reports the emission exactly,
    // with no Monte Carlo variance.
    #[test]
    fn camera_visible_emitter_returns_its_emission() {
        let panel = Arc::new(Material::Diffuse {
            kd: RGB::black(),
            emission: RGB::new(PANEL_EMISSION[0], PANEL_EMISSION[1], PANEL_EMISSION[2]),
        });
        let scene = scene_with(quad(
            Point3::new(2.0, -2.0, 2.0),
            Vector3::new(-4.0, 0.0, 0.0),
            Vector3::new(0.0, 4.0, 0.0),
            &panel,
        ));

        let mut rng = SmallRng::seed_from_u64(61);
        let ray = scene.camera.primary_ray(1, 1);
        for _ in 0..16 {
            let color = radiance(&scene, &ray, 0, &mut rng);
            assert_eq!(color.r(), PANEL_EMISSION[0]);
            assert_eq!(color.g(), PANEL_EMISSION[1]);
            assert_eq!(color.b(), PANEL_EMISSION[2]);
        }
    }

    // A diffuse sphere under the panel: the estimator keeps a positive
    // mean, and averaging more samples only tightens it.
    #[test]
    fn lit_sphere_estimates_positive_radiance() {
        let white = Arc::new(Material::Diffuse {
            kd: RGB::new(0.8, 0.8, 0.8),
            emission: RGB::black(),
        });
        let panel = Arc::new(Material::Diffuse {
            kd: RGB::black(),
            emission: RGB::new(PANEL_EMISSION[0], PANEL_EMISSION[1], PANEL_EMISSION[2]),
        });

        // Sphere straight ahead, emissive panel overhead facing down.
        let mut primitives: Vec<Arc<SyncPrimitive>> =
            vec![Arc::new(Sphere::new(Point3::new(0.0, 0.0, 6.0), 2.0, white))];
        primitives.extend(quad(
            Point3::new(-3.0, 8.0, 3.0),
            Vector3::new(6.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 6.0),
            &panel,
        ));
        let scene = scene_with(primitives);

        let mut rng = SmallRng::seed_from_u64(67);
        // Aim at the upper half of the sphere, where the surface faces the
        // panel.
        let ray = scene.camera.primary_ray(2, 0);
        let samples = 256;
        let mut sum = RGB::black();
        for _ in 0..samples {
            sum = sum + radiance(&scene, &ray, 0, &mut rng);
        }
        let mean = sum / samples as f32;
        assert!(mean.r() > 0.0);
        assert!(mean.g() > 0.0);
        assert!(mean.b() > 0.0);
    }

    // No geometry at all: every pixel is black.
    #[test]
    fn empty_scene_renders_black() {
        let scene = scene_with(Vec::new());
        let mut rng = SmallRng::seed_from_u64(71);
        let ray = scene.camera.primary_ray(0, 0);
        let color = radiance(&scene, &ray, 0, &mut rng);
        assert_eq!(color.magnitude(), 0.0);
    }
}
