//! Static scene drawing on a `plotters` 3D chart.
//!
//! Both bands share one chart, one filled polygon per mesh cell. A cell with a
//! non-finite corner is left out, which shows up as a hole in the surface.

use std::cmp::Reverse;

use plotters::prelude::*;

use crate::dataset::Dataset;
use crate::error::{BandsError, Result};
use crate::model::Band;
use crate::payload::SURFACE_OPACITY;

pub const TITLE: &str = "Band dispersion ε(kx, ky)";
const PROJECTION_SCALE: f64 = 0.8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneStats {
    pub polygons: usize,
    /// Grid cells left out because a corner was a gap.
    pub skipped_cells: usize,
}

type Point = (f64, f64, f64);

struct Cell {
    depth: i32,
    quad: [Point; 4],
    color: RGBColor,
}

/// Draws both bands of `dataset` into `buffer`, an RGB8 raster of `size`.
///
/// `elevation` and `azimuth` are in degrees. Chart coordinates are
/// (kx, energy, ky) since plotters keeps its vertical axis second.
pub fn draw_bands(
    buffer: &mut [u8],
    size: (u32, u32),
    dataset: &Dataset,
    elevation: f64,
    azimuth: f64,
) -> Result<SceneStats> {
    let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
    root.fill(&WHITE).map_err(draw_error)?;

    let bounds = dataset.bounds();
    let (lo, hi) = dataset
        .energy_range()
        .filter(|(lo, hi)| hi > lo)
        .unwrap_or((-1.0, 1.0));
    let caption_size = (size.1 / 30).max(10);

    let mut chart = ChartBuilder::on(&root)
        .caption(TITLE, ("sans-serif", caption_size))
        .margin(10)
        .build_cartesian_3d(
            -bounds.max_kx..bounds.max_kx,
            lo..hi,
            -bounds.max_ky..bounds.max_ky,
        )
        .map_err(draw_error)?;
    chart.with_projection(|mut p| {
        p.pitch = elevation.to_radians();
        p.yaw = azimuth.to_radians();
        p.scale = PROJECTION_SCALE;
        p.into_matrix()
    });
    chart
        .configure_axes()
        .light_grid_style(BLACK.mix(0.15))
        .max_light_lines(3)
        .draw()
        .map_err(draw_error)?;

    let extent = (bounds.max_kx, (hi - lo) / 2.0, bounds.max_ky);
    let mesh = dataset.mesh();
    let (rows, cols) = mesh.shape();
    let mut stats = SceneStats::default();
    let mut cells = Vec::with_capacity(2 * (rows - 1) * (cols - 1));
    let coord = chart.as_coord_spec();
    for band in Band::ALL {
        let values = dataset.band(band);
        for i in 0..rows - 1 {
            for j in 0..cols - 1 {
                let quad = [(i, j), (i + 1, j), (i + 1, j + 1), (i, j + 1)].map(|(ci, cj)| {
                    let (kx, ky) = mesh.point(ci, cj);
                    (kx, values[mesh.index(ci, cj)], ky)
                });
                if quad.iter().any(|p| !p.1.is_finite()) {
                    stats.skipped_cells += 1;
                    continue;
                }
                let (cx, cy, cz) = centre(&quad);
                cells.push(Cell {
                    depth: coord.projected_depth(&cx, &cy, &cz),
                    quad,
                    color: shade(band.rgb(), &quad, extent),
                });
            }
        }
    }

    // Farthest cells first so nearer ones paint over them.
    cells.sort_by_key(|cell| Reverse(cell.depth));
    stats.polygons = cells.len();
    chart
        .draw_series(cells.into_iter().map(|cell| {
            Polygon::new(
                cell.quad.to_vec(),
                cell.color.mix(SURFACE_OPACITY).filled(),
            )
        }))
        .map_err(draw_error)?;

    let label = ("sans-serif", caption_size * 3 / 4).into_font().color(&BLACK);
    chart
        .draw_series([
            Text::new("kx", (bounds.max_kx, lo, -bounds.max_ky), label.clone()),
            Text::new("ky", (-bounds.max_kx, lo, bounds.max_ky), label.clone()),
            Text::new("ε(kx, ky)", (-bounds.max_kx, hi, -bounds.max_ky), label),
        ])
        .map_err(draw_error)?;

    drop(chart);
    root.present().map_err(draw_error)?;
    Ok(stats)
}

fn centre(quad: &[Point; 4]) -> Point {
    let sum = quad
        .iter()
        .fold((0.0, 0.0, 0.0), |acc, p| (acc.0 + p.0, acc.1 + p.1, acc.2 + p.2));
    (sum.0 / 4.0, sum.1 / 4.0, sum.2 / 4.0)
}

/// Lambert shading against a light straight above, in box-normalised space.
fn shade(base: [u8; 3], quad: &[Point; 4], extent: Point) -> RGBColor {
    let norm = |p: Point| [p.0 / extent.0, p.1 / extent.1, p.2 / extent.2];
    let [a, b, d] = [norm(quad[0]), norm(quad[1]), norm(quad[3])];
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [d[0] - a[0], d[1] - a[1], d[2] - a[2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    let intensity = if len > f64::EPSILON && len.is_finite() {
        0.45 + 0.55 * (n[1] / len).abs()
    } else {
        1.0
    };
    let [r, g, b] = base.map(|c| (c as f64 * intensity).round().clamp(0.0, 255.0) as u8);
    RGBColor(r, g, b)
}

fn draw_error<E>(err: E) -> BandsError
where
    E: std::error::Error + Send + Sync + 'static,
{
    BandsError::Draw(Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{AxisBounds, Resolution};
    use crate::model::ModelParameters;

    fn dataset(extent: f64, n: usize) -> Dataset {
        Dataset::evaluate(
            AxisBounds::square(extent).unwrap(),
            Resolution::square(n).unwrap(),
            ModelParameters::default(),
        )
        .unwrap()
    }

    fn raster(ds: &Dataset, size: (u32, u32), elevation: f64) -> (Vec<u8>, SceneStats) {
        let mut buf = vec![0u8; size.0 as usize * size.1 as usize * 3];
        let stats = draw_bands(&mut buf, size, ds, elevation, 45.0).unwrap();
        (buf, stats)
    }

    #[test]
    fn test_gap_free_scene_draws_every_cell() {
        let ds = dataset(1.0, 11);
        let (_, stats) = raster(&ds, (160, 120), 25.0);
        assert_eq!(stats.skipped_cells, 0);
        assert_eq!(stats.polygons, 2 * 10 * 10);
    }

    #[test]
    fn test_gaps_are_skipped_not_fatal() {
        let ds = dataset(50.0, 24);
        assert!(ds.stats().gaps > 0);
        let (_, stats) = raster(&ds, (160, 120), 0.0);
        assert!(stats.skipped_cells > 0);
        assert_eq!(stats.polygons + stats.skipped_cells, 2 * 23 * 23);
    }

    #[test]
    fn test_both_band_colours_reach_the_raster() {
        let ds = dataset(1.0, 21);
        let (buf, _) = raster(&ds, (240, 180), 25.0);
        // Blue dominates red for ε₊, red dominates blue for ε₋.
        let (mut saw_plus, mut saw_minus) = (false, false);
        for px in buf.chunks_exact(3) {
            let (r, b) = (i32::from(px[0]), i32::from(px[2]));
            saw_plus |= b > r + 60;
            saw_minus |= r > b + 30;
        }
        assert!(saw_plus && saw_minus);
    }

    #[test]
    fn test_elevation_changes_the_raster() {
        let ds = dataset(2.0, 16);
        let (side, _) = raster(&ds, (160, 120), 0.0);
        let (top, _) = raster(&ds, (160, 120), 25.0);
        assert_ne!(side, top);
    }

    #[test]
    fn test_shade_keeps_flat_cells_at_full_colour() {
        let flat = [(0.0, 1.0, 0.0), (1.0, 1.0, 0.0), (1.0, 1.0, 1.0), (0.0, 1.0, 1.0)];
        let RGBColor(r, g, b) = shade([100, 150, 200], &flat, (1.0, 1.0, 1.0));
        assert_eq!((r, g, b), (100, 150, 200));
    }
}
