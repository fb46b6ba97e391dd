use crate::vector::Vector3;

use rand::rngs::SmallRng;
use rand::Rng;
use std::f32;

// Tolerance shared by the triangle determinant test and the emissive
// material check.
pub const EPSILON: f32 = 1e-5_f32;

pub const T_MAX: f32 = f32::MAX;

pub fn clamp(v: f32, min: f32, max: f32) -> f32 {
    if v > max {
        max
    } else if v < min {
        min
    } else {
        v
    }
}

pub fn deg2rad(deg: f32) -> f32 {
    deg * (f32::consts::PI / 180.0_f32)
}

// Uniform direction on the upper hemisphere around +Z, expressed in local
// coordinates. z = |1 - 2u| folds the unit interval so z lands in [0, 1];
// the matching density is the constant 1/(2*pi).
pub fn random_hemisphere_direction(rng: &mut SmallRng) -> Vector3 {
    let u1 = rng.gen::<f32>();
    let u2 = rng.gen::<f32>();
    let z = (1.0_f32 - 2.0_f32 * u1).abs();
    let r = (1.0_f32 - z * z).sqrt();
    let phi = 2.0_f32 * f32::consts::PI * u2;
    Vector3::new(r * phi.cos(), r * phi.sin(), z)
}

// Tangent frame around a surface normal. The auxiliary axis is chosen away
// from the dominant normal component so the normalization below never
// divides by a near-zero length.
pub struct OrthonormalBasis {
    tangent: Vector3,
    bitangent: Vector3,
    normal: Vector3,
}

impl OrthonormalBasis {
    pub fn new(n: &Vector3) -> OrthonormalBasis {
        let bitangent = if n.x().abs() > n.y().abs() {
            let inv_len = 1.0_f32 / (n.x() * n.x() + n.z() * n.z()).sqrt();
            Vector3::new(n.z() * inv_len, 0.0_f32, -n.x() * inv_len)
        } else {
            let inv_len = 1.0_f32 / (n.y() * n.y() + n.z() * n.z()).sqrt();
            Vector3::new(0.0_f32, n.z() * inv_len, -n.y() * inv_len)
        };
        OrthonormalBasis {
            tangent: bitangent.cross(*n),
            bitangent: bitangent,
            normal: *n,
        }
    }

    // Local (x, y, z) into world space.
    pub fn local(&self, v: &Vector3) -> Vector3 {
        (v.x() * self.tangent) + (v.y() * self.bitangent) + (v.z() * self.normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;

    #[test]
    fn basis_is_orthonormal() {
        for n in &[
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.577, -0.577, 0.577),
        ] {
            let onb = OrthonormalBasis::new(n);
            assert!(onb.tangent.dot(onb.bitangent).abs() < 1e-5);
            assert!(onb.tangent.dot(onb.normal).abs() < 1e-5);
            assert!(onb.bitangent.dot(onb.normal).abs() < 1e-5);
            assert!((onb.tangent.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn hemisphere_samples_stay_above_local_horizon() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            let d = random_hemisphere_direction(&mut rng);
            assert!(d.z() >= 0.0);
            assert!((d.length() - 1.0).abs() < 1e-4);
        }
    }
}
