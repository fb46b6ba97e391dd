use crate::color::RGB;
use crate::utils;
use crate::utils::OrthonormalBasis;
use crate::vector::Vector3;

use rand::rngs::SmallRng;
use serde::Deserialize;
use std::f32;

// Both models share one fixed GGX roughness.
const GGX_ROUGHNESS: f32 = 0.35_f32;

// Floors that keep the specular quotient finite at grazing angles.
const MIN_GGX_DENOM: f32 = 0.0000001_f32;
const MIN_SPECULAR_DENOM: f32 = 0.001_f32;

fn default_emission() -> RGB {
    RGB::black()
}

fn default_ior() -> f32 {
    1.85_f32
}

// Surface response, tagged by model. Direction conventions follow the
// integrator: `wi` is the incident ray direction pointing toward the
// surface, `wo` points away from it.
#[derive(Deserialize)]
#[serde(tag = "type")]
pub enum Material {
    Diffuse {
        kd: RGB,
        #[serde(default = "default_emission")]
        emission: RGB,
    },
    Microfacet {
        kd: RGB,
        ks: RGB,
        #[serde(default = "default_ior")]
        ior: f32,
        #[serde(default = "default_emission")]
        emission: RGB,
    },
}

impl Material {
    pub fn emission(&self) -> RGB {
        match self {
            Material::Diffuse { emission, .. } => *emission,
            Material::Microfacet { emission, .. } => *emission,
        }
    }

    pub fn is_emissive(&self) -> bool {
        self.emission().magnitude() > utils::EPSILON
    }

    // Draw an outgoing direction for the next bounce. Both models use the
    // same uniform-hemisphere strategy; the microfacet lobe is not
    // importance sampled.
    pub fn sample(&self, _wi: &Vector3, n: &Vector3, rng: &mut SmallRng) -> Vector3 {
        let local = utils::random_hemisphere_direction(rng);
        OrthonormalBasis::new(n).local(&local)
    }

    // Density of `sample` with respect to solid angle.
    pub fn pdf(&self, _wi: &Vector3, wo: &Vector3, n: &Vector3) -> f32 {
        if wo.dot(*n) > 0.0_f32 {
            0.5_f32 / f32::consts::PI
        } else {
            0.0_f32
        }
    }

    // BRDF value for the (wi, wo) pair.
    pub fn eval(&self, wi: &Vector3, wo: &Vector3, n: &Vector3) -> RGB {
        if wo.dot(*n) <= 0.0_f32 {
            return RGB::black();
        }
        match self {
            Material::Diffuse { kd, .. } => *kd * f32::consts::FRAC_1_PI,
            Material::Microfacet { kd, ks, ior, .. } => {
                let v = -*wi;
                let l = *wo;
                let h = (v + l).normalized();

                let d = ggx_distribution(n, &h, GGX_ROUGHNESS);
                let g = geometry_smith(n, &v, &l, GGX_ROUGHNESS);
                let f = fresnel(wi, n, *ior);

                let denominator = 4.0_f32
                    * n.dot(v).max(0.0_f32)
                    * n.dot(l).max(0.0_f32);
                let specular = (d * g * f) / denominator.max(MIN_SPECULAR_DENOM);

                // The reflected share is already weighted by F inside the
                // specular quotient; the refracted share feeds the diffuse
                // lobe with the remaining 1 - F.
                *ks * specular + *kd * ((1.0_f32 - f) * f32::consts::FRAC_1_PI)
            }
        }
    }
}

// Trowbridge-Reitz normal distribution.
fn ggx_distribution(n: &Vector3, h: &Vector3, roughness: f32) -> f32 {
    let a2 = (roughness * roughness) * (roughness * roughness);
    let n_dot_h = n.dot(*h).max(0.0_f32);
    let denom = n_dot_h * n_dot_h * (a2 - 1.0_f32) + 1.0_f32;
    a2 / (f32::consts::PI * denom * denom).max(MIN_GGX_DENOM)
}

fn geometry_schlick_ggx(n_dot_v: f32, roughness: f32) -> f32 {
    let r = roughness + 1.0_f32;
    let k = (r * r) / 8.0_f32;
    n_dot_v / (n_dot_v * (1.0_f32 - k) + k)
}

// Smith shadow-masking, split into the view and light halves.
fn geometry_smith(n: &Vector3, v: &Vector3, l: &Vector3, roughness: f32) -> f32 {
    let ggx_v = geometry_schlick_ggx(n.dot(*v).max(0.0_f32), roughness);
    let ggx_l = geometry_schlick_ggx(n.dot(*l).max(0.0_f32), roughness);
    ggx_v * ggx_l
}

// Unpolarized dielectric reflectance for incident direction `i` against the
// surface normal. Total internal reflection reflects everything.
fn fresnel(i: &Vector3, n: &Vector3, ior: f32) -> f32 {
    let mut cos_i = utils::clamp(i.dot(*n), -1.0_f32, 1.0_f32);
    let (eta_i, eta_t) = if cos_i > 0.0_f32 { (ior, 1.0_f32) } else { (1.0_f32, ior) };

    // Snell's law for the transmitted angle.
    let sin_t = eta_i / eta_t * (1.0_f32 - cos_i * cos_i).max(0.0_f32).sqrt();
    if sin_t >= 1.0_f32 {
        return 1.0_f32;
    }

    let cos_t = (1.0_f32 - sin_t * sin_t).max(0.0_f32).sqrt();
    cos_i = cos_i.abs();
    let r_s = ((eta_t * cos_i) - (eta_i * cos_t)) / ((eta_t * cos_i) + (eta_i * cos_t));
    let r_p = ((eta_i * cos_i) - (eta_t * cos_t)) / ((eta_i * cos_i) + (eta_t * cos_t));
    (r_s * r_s + r_p * r_p) / 2.0_f32
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn white_diffuse() -> Material {
        Material::Diffuse {
            kd: RGB::new(1.0, 1.0, 1.0),
            emission: RGB::black(),
        }
    }

    #[test]
    fn emissive_requires_nonzero_emission() {
        assert!(!white_diffuse().is_emissive());
        let light = Material::Diffuse {
            kd: RGB::black(),
            emission: RGB::new(47.8, 38.6, 31.1),
        };
        assert!(light.is_emissive());
    }

    #[test]
    fn pdf_is_uniform_over_the_upper_hemisphere() {
        let m = white_diffuse();
        let n = Vector3::new(0.0, 1.0, 0.0);
        let wi = Vector3::new(0.0, -1.0, 0.0);
        let up = Vector3::new(0.3, 0.8, 0.1).normalized();
        let down = Vector3::new(0.3, -0.8, 0.1).normalized();
        assert!((m.pdf(&wi, &up, &n) - 0.5 / std::f32::consts::PI).abs() < 1e-7);
        assert_eq!(m.pdf(&wi, &down, &n), 0.0);
    }

    #[test]
    fn sampled_directions_lie_above_the_surface() {
        let m = white_diffuse();
        let n = Vector3::new(0.577, 0.577, 0.577).normalized();
        let wi = -n;
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..1000 {
            let wo = m.sample(&wi, &n, &mut rng);
            assert!(wo.dot(n) >= -1e-5);
        }
    }

    // Monte Carlo check of the directional-hemispherical reflectance:
    // E[f_r * cos / pdf] over the sampler must not exceed the albedo.
    #[test]
    fn diffuse_conserves_energy() {
        let n = Vector3::new(0.0, 0.0, 1.0);
        let wi = Vector3::new(0.0, 0.0, -1.0);
        let mut rng = SmallRng::seed_from_u64(19);
        for kd in &[0.25_f32, 0.5_f32, 1.0_f32] {
            let m = Material::Diffuse {
                kd: RGB::new(*kd, *kd, *kd),
                emission: RGB::black(),
            };
            let samples = 200_000;
            let mut sum = 0.0_f64;
            for _ in 0..samples {
                let wo = m.sample(&wi, &n, &mut rng);
                let pdf = m.pdf(&wi, &wo, &n);
                if pdf > 0.0 {
                    sum += (m.eval(&wi, &wo, &n).r() * wo.dot(n) / pdf) as f64;
                }
            }
            let integral = sum / samples as f64;
            assert!(integral <= *kd as f64 + 0.01);
            assert!(integral >= *kd as f64 - 0.01);
        }
    }

    #[test]
    fn fresnel_total_internal_reflection() {
        // Leaving the dense medium at a grazing angle.
        let n = Vector3::new(0.0, 0.0, 1.0);
        let i = Vector3::new(0.995, 0.0, 0.0995).normalized();
        assert_eq!(fresnel(&i, &n, 1.85), 1.0);
    }

    // Even with the uniform sampler, the evaluated microfacet lobe must
    // peak along the mirror direction.
    #[test]
    fn microfacet_lobe_dominates_off_lobe_directions() {
        let m = Material::Microfacet {
            kd: RGB::black(),
            ks: RGB::new(1.0, 1.0, 1.0),
            ior: 1.85,
            emission: RGB::black(),
        };
        let n = Vector3::new(0.0, 0.0, 1.0);
        // 45 degree incidence in the xz plane.
        let wi = Vector3::new(1.0, 0.0, -1.0).normalized();
        let mirror = Vector3::new(1.0, 0.0, 1.0).normalized();
        let off_30 = Vector3::new(75.0_f32.to_radians().sin(), 0.0, 75.0_f32.to_radians().cos());

        let on_lobe = m.eval(&wi, &mirror, &n).r();
        let off_lobe = m.eval(&wi, &off_30, &n).r();
        assert!(on_lobe >= 5.0 * off_lobe);
    }

    #[test]
    fn eval_is_black_below_the_horizon() {
        let m = white_diffuse();
        let n = Vector3::new(0.0, 0.0, 1.0);
        let wi = Vector3::new(0.0, 0.0, -1.0);
        let wo = Vector3::new(0.0, 0.0, -1.0);
        assert_eq!(m.eval(&wi, &wo, &n).magnitude(), 0.0);
    }
}
