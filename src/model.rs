//! Two-band tight-binding style dispersion evaluated over a wavevector mesh.
//!
//! ```text
//! radicand = 1 + 4 cos(3 kx a / 2) cos(√3 ky a / 2) + cos²(√3 ky a / 2)
//! ε₊ = t √radicand
//! ε₋ = -ε₊
//! ```
//!
//! The radicand goes negative for some (kx, ky, a). Those points come out as NaN
//! and are carried through untouched; renderers leave them as gaps.

use serde::{Deserialize, Serialize};

use crate::error::{BandsError, Result};
use crate::grid::Mesh;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Hopping amplitude `t`.
    pub hopping: f64,
    /// Lattice constant `a`.
    pub lattice_constant: f64,
}

impl Default for ModelParameters {
    fn default() -> Self {
        ModelParameters {
            hopping: 1.0,
            lattice_constant: 1.0,
        }
    }
}

impl ModelParameters {
    pub fn new(hopping: f64, lattice_constant: f64) -> Result<Self> {
        let params = ModelParameters {
            hopping,
            lattice_constant,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.hopping.is_finite() {
            return Err(BandsError::InvalidParameters(format!(
                "hopping amplitude must be finite, got {}",
                self.hopping
            )));
        }
        if !(self.lattice_constant.is_finite() && self.lattice_constant > 0.0) {
            return Err(BandsError::InvalidParameters(format!(
                "lattice constant must be positive and finite, got {}",
                self.lattice_constant
            )));
        }
        Ok(())
    }
}

/// The two energy surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Plus,
    Minus,
}

impl Band {
    pub const ALL: [Band; 2] = [Band::Plus, Band::Minus];

    pub fn label(self) -> &'static str {
        match self {
            Band::Plus => "ε₊ (conduction)",
            Band::Minus => "ε₋ (valence)",
        }
    }

    pub fn color_hex(self) -> &'static str {
        match self {
            Band::Plus => "#0c89fa",
            Band::Minus => "#ed619f",
        }
    }

    pub fn rgb(self) -> [u8; 3] {
        match self {
            Band::Plus => [0x0c, 0x89, 0xfa],
            Band::Minus => [0xed, 0x61, 0x9f],
        }
    }
}

pub fn radicand(kx: f64, ky: f64, a: f64) -> f64 {
    let cos_x = (3.0 * kx * a / 2.0).cos();
    let cos_y = (SQRT_3 * ky * a / 2.0).cos();
    1.0 + 4.0 * cos_x * cos_y + cos_y * cos_y
}

/// Upper band at a single wavevector. NaN where the radicand is negative.
pub fn band_energy(kx: f64, ky: f64, params: &ModelParameters) -> f64 {
    params.hopping * radicand(kx, ky, params.lattice_constant).sqrt()
}

/// Both bands over a mesh, flattened row-major in the mesh's layout.
#[derive(Debug, Clone)]
pub struct Bands {
    pub plus: Vec<f64>,
    pub minus: Vec<f64>,
}

/// One pass over the mesh. The lower band is the negation of the upper band,
/// never evaluated on its own.
pub fn evaluate(mesh: &Mesh, params: &ModelParameters) -> Bands {
    let plus: Vec<f64> = mesh
        .kx_grid()
        .iter()
        .zip(mesh.ky_grid())
        .map(|(&kx, &ky)| band_energy(kx, ky, params))
        .collect();
    let minus = plus.iter().map(|v| -v).collect();
    Bands { plus, minus }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{sample, AxisBounds, Resolution};

    #[test]
    fn test_origin_value() {
        assert_eq!(radicand(0.0, 0.0, 1.0), 6.0);
        let params = ModelParameters::default();
        assert_eq!(band_energy(0.0, 0.0, &params), 6.0_f64.sqrt());

        let scaled = ModelParameters::new(2.5, 1.0).unwrap();
        assert!((band_energy(0.0, 0.0, &scaled) - 2.5 * 6.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_negative_radicand_is_nan() {
        // cos(3) ≈ -0.99 with cos(0) = 1 gives 1 - 3.96 + 1 < 0.
        assert!(radicand(2.0, 0.0, 1.0) < 0.0);
        let e = band_energy(2.0, 0.0, &ModelParameters::default());
        assert!(e.is_nan());
    }

    #[test]
    fn test_minus_band_is_negation() {
        let bounds = AxisBounds::square(50.0).unwrap();
        let mesh = sample(bounds, Resolution::square(64).unwrap()).unwrap();
        let bands = evaluate(&mesh, &ModelParameters::default());
        assert_eq!(bands.plus.len(), mesh.len());
        assert_eq!(bands.minus.len(), mesh.len());
        for (p, m) in bands.plus.iter().zip(&bands.minus) {
            if p.is_nan() {
                assert!(m.is_nan());
            } else {
                assert_eq!(*m, -*p);
            }
        }
    }

    #[test]
    fn test_parameter_validation() {
        assert!(ModelParameters::new(1.0, 0.0).is_err());
        assert!(ModelParameters::new(f64::INFINITY, 1.0).is_err());
        assert!(ModelParameters::new(-1.0, 0.5).is_ok());
    }

    #[test]
    fn test_band_palette_is_distinct() {
        assert_ne!(Band::Plus.color_hex(), Band::Minus.color_hex());
        assert_ne!(Band::Plus.rgb(), Band::Minus.rgb());
        assert_ne!(Band::Plus.label(), Band::Minus.label());
    }
}
