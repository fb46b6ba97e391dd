use crate::bvh::Bvh;
use crate::camera::Camera;
use crate::material::Material;
use crate::point::Point3;
use crate::primitive::{Intersection, LightSample, Mesh, Sphere, SyncPrimitive};
use crate::ray::Ray;
use crate::utils;

use rand::rngs::SmallRng;
use rand::Rng;
use serde::Deserialize;
use std::{collections::HashMap, fs, io, path, sync::Arc, time::Instant};
use wavefront_obj::obj;

// Everything the render loop needs: geometry behind the root BVH, the
// emissive primitives with a prefix-sum area table for light selection,
// and the camera. All of it is immutable once built.
pub struct Scene {
    pub logistics: Logistics,
    pub camera: Camera,
    pub russian_roulette: f32,
    bvh: Bvh,
    lights: Vec<Arc<SyncPrimitive>>,
    // light_cdf[i] is the summed area of lights[0..=i]; the last entry is
    // the total emissive area.
    light_cdf: Vec<f32>,
    emissive_area: f32,
}

fn default_tiles() -> u32 {
    5_u32
}

fn default_russian_roulette() -> f32 {
    0.9_f32
}

#[derive(Deserialize)]
pub struct Logistics {
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub samples: u32,
    #[serde(default = "default_tiles")]
    pub tiles_x: u32,
    #[serde(default = "default_tiles")]
    pub tiles_y: u32,
    #[serde(default = "default_russian_roulette")]
    pub russian_roulette: f32,
}

impl Scene {
    pub fn new(primitives: Vec<Arc<SyncPrimitive>>, logistics: Logistics, camera: Camera) -> Scene {
        let mut lights = Vec::new();
        let mut light_cdf = Vec::new();
        let mut emissive_area = 0.0_f32;
        for primitive in &primitives {
            if primitive.is_emissive() {
                emissive_area += primitive.area();
                lights.push(Arc::clone(primitive));
                light_cdf.push(emissive_area);
            }
        }

        Scene {
            russian_roulette: logistics.russian_roulette,
            logistics: logistics,
            camera: camera,
            bvh: Bvh::new(primitives),
            lights: lights,
            light_cdf: light_cdf,
            emissive_area: emissive_area,
        }
    }

    pub fn intersect(&self, r: &Ray) -> Option<Intersection> {
        self.bvh.intersect(r, utils::T_MAX)
    }

    // Uniform point over the union of all emissive surfaces: pick a light
    // in proportion to its area through the prefix-sum table, then sample
    // uniformly on it. The joint density is 1 / total emissive area. None
    // when the scene has no lights.
    pub fn sample_light(&self, rng: &mut SmallRng) -> Option<(LightSample, f32)> {
        if self.emissive_area <= 0.0_f32 {
            return None;
        }
        let u = rng.gen::<f32>() * self.emissive_area;
        let index = self
            .light_cdf
            .partition_point(|&running| running < u)
            .min(self.lights.len() - 1);
        let (sample, _) = self.lights[index].sample(rng);
        Some((sample, 1.0_f32 / self.emissive_area))
    }
}

// What can go wrong while turning a scene file into a Scene. The library
// errors pass through untouched; everything the loader itself catches
// becomes an Invalid with a message naming the offender.
#[derive(Debug)]
pub enum SceneLoadError {
    Io(io::Error),
    Json(serde_json::Error),
    ObjParse(wavefront_obj::ParseError),
    Invalid(String),
}

impl From<io::Error> for SceneLoadError {
    fn from(err: io::Error) -> SceneLoadError {
        SceneLoadError::Io(err)
    }
}
impl From<serde_json::Error> for SceneLoadError {
    fn from(err: serde_json::Error) -> SceneLoadError {
        SceneLoadError::Json(err)
    }
}
impl From<wavefront_obj::ParseError> for SceneLoadError {
    fn from(err: wavefront_obj::ParseError) -> SceneLoadError {
        SceneLoadError::ObjParse(err)
    }
}

// Mirror of the scene file layout; serde does the structural validation and
// the loader below only has to resolve material names and mesh files.
#[derive(Deserialize)]
struct SceneDescription {
    #[serde(rename = "Logistics")]
    logistics: Logistics,
    #[serde(rename = "Camera")]
    camera: CameraDescription,
    #[serde(rename = "Materials")]
    materials: HashMap<String, Material>,
    #[serde(rename = "Shapes")]
    shapes: Vec<ShapeDescription>,
}

#[derive(Deserialize)]
struct CameraDescription {
    position: Point3,
    fov: f32,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ShapeDescription {
    Sphere {
        center: Point3,
        radius: f32,
        material: String,
    },
    Mesh {
        file_path: String,
        material: String,
    },
}

// Turns a JSON scene description into a ready-to-render Scene. Mesh file
// paths are resolved relative to `scene_dir`.
pub fn deserialize(data: &str, scene_dir: &path::Path) -> Result<Scene, SceneLoadError> {
    let description: SceneDescription = serde_json::from_str(data)?;

    let mut materials = HashMap::with_capacity(description.materials.len());
    for (name, material) in description.materials {
        materials.insert(name, Arc::new(material));
    }

    let mut primitives: Vec<Arc<SyncPrimitive>> = Vec::with_capacity(description.shapes.len());
    for shape in description.shapes {
        match shape {
            ShapeDescription::Sphere {
                center,
                radius,
                material,
            } => {
                let material = resolve_material(&materials, &material)?;
                primitives.push(Arc::new(Sphere::new(center, radius, material)));
            }
            ShapeDescription::Mesh {
                file_path,
                material,
            } => {
                let material = resolve_material(&materials, &material)?;
                load_meshes(scene_dir, &file_path, material, &mut primitives)?;
            }
        }
    }

    let camera = Camera::new(
        description.camera.position,
        description.camera.fov,
        description.logistics.resolution_x,
        description.logistics.resolution_y,
    );

    println!(" - Generating BVH over {} primitives...", primitives.len());
    let build_start = Instant::now();
    let scene = Scene::new(primitives, description.logistics, camera);
    println!(
        " - BVH generation took {:.3} seconds",
        build_start.elapsed().as_secs_f64()
    );
    Ok(scene)
}

fn resolve_material(
    materials: &HashMap<String, Arc<Material>>,
    name: &str,
) -> Result<Arc<Material>, SceneLoadError> {
    match materials.get(name) {
        Some(material) => Ok(Arc::clone(material)),
        None => Err(SceneLoadError::Invalid(format!(
            "a shape references the material '{}', which the Materials table does not define",
            name
        ))),
    }
}

// Reads one OBJ file and appends a Mesh primitive per object in it, all
// sharing the given material.
fn load_meshes(
    scene_dir: &path::Path,
    file_path: &str,
    material: Arc<Material>,
    primitives: &mut Vec<Arc<SyncPrimitive>>,
) -> Result<(), SceneLoadError> {
    let contents = fs::read_to_string(scene_dir.join(file_path))?;
    let parsed = obj::parse(contents)?;

    for object in parsed.objects {
        let vertices: Vec<Point3> = object.vertices.into_iter().map(Point3::from).collect();

        let mut faces = Vec::new();
        for geometry in object.geometry {
            for shape in geometry.shapes {
                match shape.primitive {
                    obj::Primitive::Triangle((a, ..), (b, ..), (c, ..)) => {
                        faces.push([a, b, c]);
                    }
                    _ => {
                        return Err(SceneLoadError::Invalid(format!(
                            "object '{}' in {} has a non-triangle face; triangulate the mesh first",
                            object.name, file_path
                        )));
                    }
                }
            }
        }

        match Mesh::new(vertices, faces, Arc::clone(&material)) {
            Ok(mesh) => primitives.push(Arc::new(mesh)),
            Err(reason) => {
                return Err(SceneLoadError::Invalid(format!(
                    "object '{}' in {} is not a usable mesh: {}",
                    object.name, file_path, reason
                )));
            }
        }
    }
    Ok(())
}
