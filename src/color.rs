use serde::Deserialize;
use std::convert::TryFrom;
use std::ops;

// Linear radiance values. Emission and albedo both live here; nothing in the
// core ever clamps an RGB, tonemapping happens at image write time.
#[derive(Clone, Copy, Deserialize)]
#[serde(try_from = "Vec<f32>")]
pub struct RGB {
    r: f32,
    g: f32,
    b: f32,
}

impl RGB {
    pub fn new(r: f32, g: f32, b: f32) -> RGB {
        RGB { r, g, b }
    }

    pub fn black() -> RGB {
        RGB::new(0.0, 0.0, 0.0)
    }

    pub fn r(&self) -> f32 {
        self.r
    }
    pub fn g(&self) -> f32 {
        self.g
    }
    pub fn b(&self) -> f32 {
        self.b
    }

    // L2 magnitude of the triple; the emissive test compares this
    // against a small epsilon.
    pub fn magnitude(&self) -> f32 {
        (self.r * self.r + self.g * self.g + self.b * self.b).sqrt()
    }
}

impl ops::Add for RGB {
    type Output = RGB;
    fn add(self, rhs: RGB) -> RGB {
        RGB::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl ops::Mul for RGB {
    type Output = RGB;
    fn mul(self, rhs: RGB) -> RGB {
        RGB::new(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b)
    }
}

impl ops::Mul<f32> for RGB {
    type Output = RGB;
    fn mul(self, rhs: f32) -> RGB {
        RGB::new(self.r * rhs, self.g * rhs, self.b * rhs)
    }
}

impl ops::Div<f32> for RGB {
    type Output = RGB;
    fn div(self, rhs: f32) -> RGB {
        RGB::new(self.r / rhs, self.g / rhs, self.b / rhs)
    }
}

impl TryFrom<Vec<f32>> for RGB {
    type Error = String;

    fn try_from(components: Vec<f32>) -> Result<RGB, String> {
        match components[..] {
            [r, g, b] => Ok(RGB::new(r, g, b)),
            _ => Err(format!(
                "a color needs exactly 3 components, got {}",
                components.len()
            )),
        }
    }
}
