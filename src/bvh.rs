use crate::point::Point3;
use crate::primitive::{Intersection, LightSample, SyncPrimitive};
use crate::ray::Ray;
use crate::vector::{Axis, ALL_AXES};

use rand::rngs::SmallRng;
use rand::Rng;
use std::cmp;
use std::f32;
use std::mem;
use std::sync::Arc;

// Axis Aligned Bounding Box
pub struct AABB {
    pub min: Point3,
    pub max: Point3,
}

impl Copy for AABB {}
impl Clone for AABB {
    fn clone(&self) -> AABB {
        *self
    }
}

impl AABB {
    pub fn new(min: Point3, max: Point3) -> AABB {
        AABB { min: min, max: max }
    }

    // Inverted box; union with anything collapses to that thing.
    pub fn empty() -> AABB {
        AABB {
            min: Point3::new(f32::MAX, f32::MAX, f32::MAX),
            max: Point3::new(f32::MIN, f32::MIN, f32::MIN),
        }
    }

    pub fn union(a: &AABB, b: &AABB) -> AABB {
        AABB {
            min: Point3::min(a.min, b.min),
            max: Point3::max(a.max, b.max),
        }
    }

    pub fn union_point(b: &AABB, p: &Point3) -> AABB {
        AABB {
            min: Point3::min(b.min, *p),
            max: Point3::max(b.max, *p),
        }
    }

    pub fn centroid(&self) -> Point3 {
        Point3::midpoint(self.min, self.max)
    }

    pub fn longest_axis(&self) -> Axis {
        let diagonal = self.max - self.min;
        if diagonal.x() > diagonal.y() && diagonal.x() > diagonal.z() {
            Axis::X
        } else if diagonal.y() > diagonal.z() {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    pub fn surface_area(&self) -> f32 {
        let diagonal = self.max - self.min;
        2.0_f32
            * (diagonal.x() * diagonal.y()
                + diagonal.x() * diagonal.z()
                + diagonal.y() * diagonal.z())
    }

    // Slab test. Swapping on the direction sign handles negative components
    // without separate branches per octant; axes where the direction is
    // zero produce infinities that fall through the comparisons.
    pub fn intersect(&self, r: &Ray) -> bool {
        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        for axis in &ALL_AXES {
            let mut t0 = (self.min[*axis] - r.origin[*axis]) * r.inv_dir[*axis];
            let mut t1 = (self.max[*axis] - r.origin[*axis]) * r.inv_dir[*axis];
            if r.dir[*axis] <= 0.0_f32 {
                mem::swap(&mut t0, &mut t1);
            }
            if t0 > t_enter {
                t_enter = t0;
            }
            if t1 < t_exit {
                t_exit = t1;
            }
        }
        t_enter <= t_exit && t_exit >= 0.0_f32
    }
}

// Bounding Volume Hierarchy over a set of primitives. Every node lives in
// one contiguous arena and children are referenced by index: the left child
// sits immediately after its parent, the right child `right_offset` slots
// ahead. The whole tree frees as a unit.
//
// Each node carries the summed surface area of the primitives below it,
// which is what makes the area-weighted emissive sampling below possible.
pub struct Bvh {
    nodes: Vec<Node>,
}

enum Node {
    Leaf {
        bounds: AABB,
        area: f32,
        primitive: Arc<SyncPrimitive>,
    },
    Inner {
        bounds: AABB,
        area: f32,
        right_offset: u32,
    },
}

impl Node {
    fn bounds(&self) -> &AABB {
        match self {
            Node::Leaf { bounds, .. } => bounds,
            Node::Inner { bounds, .. } => bounds,
        }
    }

    fn area(&self) -> f32 {
        match self {
            Node::Leaf { area, .. } => *area,
            Node::Inner { area, .. } => *area,
        }
    }
}

impl Bvh {
    pub fn new(primitives: Vec<Arc<SyncPrimitive>>) -> Bvh {
        // A binary tree with one primitive per leaf has exactly 2n - 1 nodes.
        let mut nodes = Vec::with_capacity(primitives.len() * 2);
        if !primitives.is_empty() {
            build(&mut nodes, primitives);
        }
        Bvh { nodes: nodes }
    }

    // Summed surface area of every primitive in the tree.
    pub fn total_area(&self) -> f32 {
        match self.nodes.first() {
            Some(root) => root.area(),
            None => 0.0_f32,
        }
    }

    // Closest hit along the ray, or None when nothing lies in front of
    // `t_max`.
    pub fn intersect(&self, r: &Ray, t_max: f32) -> Option<Intersection> {
        if self.nodes.is_empty() {
            return None;
        }
        self.intersect_node(0, r, t_max)
    }

    fn intersect_node(&self, index: usize, r: &Ray, t_max: f32) -> Option<Intersection> {
        match &self.nodes[index] {
            Node::Leaf { bounds, primitive, .. } => {
                if !bounds.intersect(r) {
                    return None;
                }
                primitive.intersect(r, t_max)
            }
            Node::Inner {
                bounds,
                right_offset,
                ..
            } => {
                if !bounds.intersect(r) {
                    return None;
                }
                // Descend both sides; the left result tightens the bound
                // the right side has to beat.
                let left = self.intersect_node(index + 1, r, t_max);
                let closest = match &left {
                    Some(hit) => hit.distance,
                    None => t_max,
                };
                let right = self.intersect_node(index + *right_offset as usize, r, closest);
                right.or(left)
            }
        }
    }

    // Draw a point on the surfaces held by this tree, with probability
    // proportional to each subtree's share of the total area. The square
    // root applied to the random value deliberately skews the walk toward
    // larger subtrees; the reported density stays 1 / total_area.
    pub fn sample(&self, rng: &mut SmallRng) -> Option<(LightSample, f32)> {
        let root_area = match self.nodes.first() {
            Some(root) => root.area(),
            None => return None,
        };
        let p = rng.gen::<f32>().sqrt() * root_area;
        let (sample, pdf) = self.sample_node(0, p, rng);
        Some((sample, pdf / root_area))
    }

    fn sample_node(&self, index: usize, p: f32, rng: &mut SmallRng) -> (LightSample, f32) {
        match &self.nodes[index] {
            Node::Leaf {
                area, primitive, ..
            } => {
                // The primitive reports 1 / its own area; scaling by the
                // leaf area cancels that, leaving the division by the root
                // area in `sample` as the final uniform density.
                let (sample, pdf) = primitive.sample(rng);
                (sample, pdf * *area)
            }
            Node::Inner { right_offset, .. } => {
                let left_area = self.nodes[index + 1].area();
                if p < left_area {
                    self.sample_node(index + 1, p, rng)
                } else {
                    self.sample_node(index + *right_offset as usize, p - left_area, rng)
                }
            }
        }
    }
}

// Top-down median-split build. One primitive makes a leaf; two skip the
// sort and recurse on the singletons; more than two sort by centroid along
// the widest centroid axis and cut at n / 2 (the middle element lands in
// the upper half).
fn build(nodes: &mut Vec<Node>, mut primitives: Vec<Arc<SyncPrimitive>>) {
    if primitives.len() == 1 {
        let primitive = match primitives.pop() {
            Some(p) => p,
            None => return,
        };
        nodes.push(Node::Leaf {
            bounds: primitive.bounding_box(),
            area: primitive.area(),
            primitive: primitive,
        });
        return;
    }

    let upper_half = if primitives.len() == 2 {
        primitives.split_off(1)
    } else {
        let mut centroid_bounds = AABB::empty();
        for primitive in &primitives {
            centroid_bounds =
                AABB::union_point(&centroid_bounds, &primitive.bounding_box().centroid());
        }
        let axis = centroid_bounds.longest_axis();

        primitives.sort_by(|a, b| {
            let a_c = a.bounding_box().centroid()[axis];
            let b_c = b.bounding_box().centroid()[axis];
            if a_c < b_c {
                cmp::Ordering::Less
            } else if a_c > b_c {
                cmp::Ordering::Greater
            } else {
                cmp::Ordering::Equal
            }
        });
        let middle = primitives.len() / 2;
        primitives.split_off(middle)
    };

    // Placeholder; replaced below once both subtrees exist and the right
    // child's position is known.
    let node_index = nodes.len();
    nodes.push(Node::Inner {
        bounds: AABB::empty(),
        area: 0.0_f32,
        right_offset: 0,
    });

    build(nodes, primitives);
    let right_offset = (nodes.len() - node_index) as u32;
    let (left_bounds, left_area) = {
        let left = &nodes[node_index + 1];
        (*left.bounds(), left.area())
    };

    build(nodes, upper_half);
    let (bounds, area) = {
        let right = &nodes[node_index + right_offset as usize];
        (
            AABB::union(&left_bounds, right.bounds()),
            left_area + right.area(),
        )
    };

    nodes[node_index] = Node::Inner {
        bounds: bounds,
        area: area,
        right_offset: right_offset,
    };
}
