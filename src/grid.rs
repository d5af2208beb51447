//! Regular wavevector grids symmetric about the origin.
use serde::{Deserialize, Serialize};

use crate::error::{BandsError, Result};

/// Half-widths of the sampled window: kx covers [-max_kx, max_kx], ky likewise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub max_kx: f64,
    pub max_ky: f64,
}

impl AxisBounds {
    pub fn new(max_kx: f64, max_ky: f64) -> Result<Self> {
        let bounds = AxisBounds { max_kx, max_ky };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn square(max_extent: f64) -> Result<Self> {
        Self::new(max_extent, max_extent)
    }

    pub fn validate(&self) -> Result<()> {
        for extent in [self.max_kx, self.max_ky] {
            if !(extent.is_finite() && extent > 0.0) {
                return Err(BandsError::InvalidExtent(extent));
            }
        }
        Ok(())
    }
}

/// Sample count per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub nx: usize,
    pub ny: usize,
}

impl Resolution {
    pub fn new(nx: usize, ny: usize) -> Result<Self> {
        let res = Resolution { nx, ny };
        res.validate()?;
        Ok(res)
    }

    pub fn square(n: usize) -> Result<Self> {
        Self::new(n, n)
    }

    pub fn validate(&self) -> Result<()> {
        for n in [self.nx, self.ny] {
            if n < 2 {
                return Err(BandsError::InvalidResolution(n));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nx * self.ny
    }
}

/// `n` evenly spaced values from `start` to `end`, both endpoints included.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            // Pin the last sample so accumulated rounding never misses the bound.
            values[n - 1] = end;
            values
        }
    }
}

/// Outer-product expansion of the kx and ky axes.
///
/// Stored row-major with shape `(nx, ny)`: axis 0 follows `kx`, axis 1 follows `ky`,
/// so `kx_grid[i][j] == kx[i]` and `ky_grid[i][j] == ky[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    kx: Vec<f64>,
    ky: Vec<f64>,
    kx_grid: Vec<f64>,
    ky_grid: Vec<f64>,
}

impl Mesh {
    pub fn shape(&self) -> (usize, usize) {
        (self.kx.len(), self.ky.len())
    }

    pub fn len(&self) -> usize {
        self.kx_grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kx_grid.is_empty()
    }

    /// The 1D kx sequence (axis 0).
    pub fn kx_axis(&self) -> &[f64] {
        &self.kx
    }

    /// The 1D ky sequence (axis 1).
    pub fn ky_axis(&self) -> &[f64] {
        &self.ky
    }

    /// Flattened KX array, row-major.
    pub fn kx_grid(&self) -> &[f64] {
        &self.kx_grid
    }

    /// Flattened KY array, row-major.
    pub fn ky_grid(&self) -> &[f64] {
        &self.ky_grid
    }

    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.ky.len() + j
    }

    pub fn point(&self, i: usize, j: usize) -> (f64, f64) {
        (self.kx[i], self.ky[j])
    }

    /// Splits a flattened array of this mesh's shape into rows along axis 0.
    pub fn rows<'a>(&self, values: &'a [f64]) -> impl Iterator<Item = &'a [f64]> {
        values.chunks(self.ky.len().max(1))
    }
}

/// Builds the mesh covering `bounds` at `resolution`.
pub fn sample(bounds: AxisBounds, resolution: Resolution) -> Result<Mesh> {
    bounds.validate()?;
    resolution.validate()?;

    let kx = linspace(-bounds.max_kx, bounds.max_kx, resolution.nx);
    let ky = linspace(-bounds.max_ky, bounds.max_ky, resolution.ny);

    let mut kx_grid = Vec::with_capacity(resolution.len());
    let mut ky_grid = Vec::with_capacity(resolution.len());
    for &x in &kx {
        for &y in &ky {
            kx_grid.push(x);
            ky_grid.push(y);
        }
    }

    Ok(Mesh {
        kx,
        ky,
        kx_grid,
        ky_grid,
    })
}
