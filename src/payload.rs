//! Render payload handed to the interactive display surface.
//!
//! The shape follows Plotly's figure JSON (`data` + `layout`) so the browser
//! front end can pass it straight to `Plotly.react`. Non-finite band values are
//! serialised as `null`, which the host draws as holes in the surface.

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::model::Band;
use crate::regime::Regime;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

/// Size and margins of the hosting surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySurface {
    pub width: u32,
    pub height: u32,
    pub margin: Margin,
}

impl Default for DisplaySurface {
    fn default() -> Self {
        DisplaySurface {
            width: 900,
            height: 700,
            margin: Margin {
                l: 0,
                r: 0,
                t: 40,
                b: 0,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SurfaceTrace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: &'static str,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<Vec<f64>>,
    pub z: Vec<Vec<f64>>,
    /// Flat single-colour scale: both stops carry the band colour.
    pub colorscale: [(f64, &'static str); 2],
    pub showscale: bool,
    pub opacity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AxisTitle {
    pub title: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Scene {
    pub xaxis: AxisTitle,
    pub yaxis: AxisTitle,
    pub zaxis: AxisTitle,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneLayout {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub margin: Margin,
    pub scene: Scene,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderPayload {
    pub regime: Regime,
    pub data: Vec<SurfaceTrace>,
    pub layout: SceneLayout,
}

pub const SURFACE_OPACITY: f64 = 0.9;

impl RenderPayload {
    /// Both bands of `dataset` as labelled, coloured surfaces sized for `surface`.
    pub fn render(regime: Regime, dataset: &Dataset, surface: &DisplaySurface) -> Self {
        let mesh = dataset.mesh();
        let to_rows = |values: &[f64]| -> Vec<Vec<f64>> {
            mesh.rows(values).map(<[f64]>::to_vec).collect()
        };
        let x = to_rows(mesh.kx_grid());
        let y = to_rows(mesh.ky_grid());

        let data = Band::ALL
            .into_iter()
            .map(|band| SurfaceTrace {
                kind: "surface",
                name: band.label(),
                x: x.clone(),
                y: y.clone(),
                z: to_rows(dataset.band(band)),
                colorscale: [(0.0, band.color_hex()), (1.0, band.color_hex())],
                showscale: false,
                opacity: SURFACE_OPACITY,
            })
            .collect();

        let bounds = dataset.bounds();
        let layout = SceneLayout {
            title: format!(
                "{}: |kx| ≤ {}, |ky| ≤ {}",
                regime.title(),
                bounds.max_kx,
                bounds.max_ky
            ),
            width: surface.width,
            height: surface.height,
            margin: surface.margin,
            scene: Scene {
                xaxis: AxisTitle { title: "kx" },
                yaxis: AxisTitle { title: "ky" },
                zaxis: AxisTitle { title: "ε(kx, ky)" },
            },
        };

        RenderPayload {
            regime,
            data,
            layout,
        }
    }

    /// Serialised form; equal payloads produce identical JSON.
    pub fn to_json(&self) -> serde_json::Value {
        // Every field is plain data, so serialisation cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
