//! Run configuration. Every field has a default matching the reference workflow,
//! so an empty JSON object (or no file at all) is a valid config.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BandsError, Result};
use crate::grid::{AxisBounds, Resolution};
use crate::model::ModelParameters;
use crate::payload::DisplaySurface;
use crate::regime::{PerRegime, Regime, RegimeSpec};

/// Camera and raster settings for one exported image. Has no effect on data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Figure size in inches, (width, height).
    pub figure_size: [f64; 2],
    pub dpi: f64,
    /// Degrees above the kx-ky plane.
    pub elevation: f64,
    /// Degrees about +z, measured from +kx.
    pub azimuth: f64,
    pub output_name: String,
}

impl ViewConfig {
    pub fn validate(&self) -> Result<()> {
        self.pixel_size().map(|_| ())?;
        if !(self.elevation.is_finite() && self.azimuth.is_finite()) {
            return Err(BandsError::InvalidView(format!(
                "camera angles must be finite, got elevation {} azimuth {}",
                self.elevation, self.azimuth
            )));
        }
        let name = Path::new(&self.output_name);
        if self.output_name.trim().is_empty() || name.file_name().is_none() {
            return Err(BandsError::InvalidView(format!(
                "output name {:?} does not name a file",
                self.output_name
            )));
        }
        // Only plain segments, so the file always lands under the output dir.
        if !name.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(BandsError::InvalidView(format!(
                "output name {:?} must be relative to the output directory",
                self.output_name
            )));
        }
        Ok(())
    }

    /// Raster dimensions: figure size times dpi, rounded.
    pub fn pixel_size(&self) -> Result<(u32, u32)> {
        let [w, h] = self.figure_size;
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !(valid(w) && valid(h) && valid(self.dpi)) {
            return Err(BandsError::InvalidView(format!(
                "figure size {w}x{h} at {} dpi",
                self.dpi
            )));
        }
        let px = |inches: f64| (inches * self.dpi).round();
        let (pw, ph) = (px(w), px(h));
        if pw < 1.0 || ph < 1.0 || pw > MAX_PIXELS_PER_SIDE || ph > MAX_PIXELS_PER_SIDE {
            return Err(BandsError::InvalidView(format!(
                "raster size {pw}x{ph} outside 1..={MAX_PIXELS_PER_SIDE}"
            )));
        }
        Ok((pw as u32, ph as u32))
    }
}

const MAX_PIXELS_PER_SIDE: f64 = 16_384.0;

/// One (regime, view) pair of the batch export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    pub regime: Regime,
    #[serde(flatten)]
    pub view: ViewConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub output_dir: PathBuf,
    pub resolution: Resolution,
    pub bounds: PerRegime<AxisBounds>,
    pub jobs: Vec<ExportJob>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        let job = |regime, elevation, output_name: &str| ExportJob {
            regime,
            view: ViewConfig {
                figure_size: [9.0, 7.0],
                dpi: 100.0,
                elevation,
                azimuth: 45.0,
                output_name: output_name.to_string(),
            },
        };
        ExporterConfig {
            output_dir: PathBuf::from("images"),
            resolution: Resolution { nx: 200, ny: 200 },
            bounds: PerRegime {
                small_range: AxisBounds {
                    max_kx: 2.0,
                    max_ky: 2.0,
                },
                large_range: AxisBounds {
                    max_kx: 1000.0,
                    max_ky: 1000.0,
                },
            },
            jobs: vec![
                job(Regime::SmallRange, 0.0, "small_kval_side_plot.png"),
                job(Regime::LargeRange, 0.0, "large_kval_side_plot.png"),
                job(Regime::SmallRange, 25.0, "small_kval_top_plot.png"),
                job(Regime::LargeRange, 25.0, "large_kval_top_plot.png"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractiveConfig {
    pub addr: String,
    pub resolution: Resolution,
    pub bounds: PerRegime<AxisBounds>,
    pub default_regime: Regime,
    pub surface: DisplaySurface,
}

impl Default for InteractiveConfig {
    fn default() -> Self {
        InteractiveConfig {
            addr: "127.0.0.1:3000".to_string(),
            resolution: Resolution { nx: 80, ny: 80 },
            bounds: PerRegime {
                small_range: AxisBounds {
                    max_kx: 2.0,
                    max_ky: 2.0,
                },
                large_range: AxisBounds {
                    max_kx: 50.0,
                    max_ky: 50.0,
                },
            },
            default_regime: Regime::SmallRange,
            surface: DisplaySurface::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelParameters,
    pub exporter: ExporterConfig,
    pub interactive: InteractiveConfig,
}

impl Config {
    /// Reads a JSON config, or returns the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| BandsError::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_json(&text)?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Checks model, regimes and every export job. View problems are reported
    /// per job by the exporter instead, so one bad job does not sink the batch.
    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        for regime in Regime::ALL {
            self.static_regime(regime).validate()?;
            self.interactive_regime(regime).validate()?;
        }
        Ok(())
    }

    pub fn static_regime(&self, regime: Regime) -> RegimeSpec {
        RegimeSpec {
            bounds: *self.exporter.bounds.get(regime),
            resolution: self.exporter.resolution,
            parameters: self.model,
        }
    }

    pub fn interactive_regime(&self, regime: Regime) -> RegimeSpec {
        RegimeSpec {
            bounds: *self.interactive.bounds.get(regime),
            resolution: self.interactive.resolution,
            parameters: self.model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_mirror_reference_run() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.exporter.jobs.len(), 4);
        assert_eq!(config.exporter.output_dir, PathBuf::from("images"));
        let side = &config.exporter.jobs[0];
        assert_eq!(side.regime, Regime::SmallRange);
        assert_eq!(side.view.pixel_size().unwrap(), (900, 700));
        assert_eq!(side.view.elevation, 0.0);
        assert_eq!(config.exporter.jobs[3].view.elevation, 25.0);
        assert!(config.interactive.resolution.nx < config.exporter.resolution.nx);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json(
            r#"{ "model": { "hopping": 2.0, "lattice_constant": 1.5 },
                 "interactive": { "addr": "0.0.0.0:8080" } }"#,
        )
        .unwrap();
        assert_eq!(config.model.hopping, 2.0);
        assert_eq!(config.interactive.addr, "0.0.0.0:8080");
        assert_eq!(config.interactive.default_regime, Regime::SmallRange);
        assert_eq!(config.exporter.jobs.len(), 4);
        let spec = config.interactive_regime(Regime::LargeRange);
        assert_eq!(spec.bounds.max_kx, 50.0);
        assert_eq!(spec.parameters.lattice_constant, 1.5);
    }

    #[test]
    fn test_job_view_is_flattened() {
        let config = Config::from_json(
            r#"{ "exporter": { "jobs": [ { "regime": "large-range",
                 "figure_size": [4, 3], "dpi": 50, "elevation": 10, "azimuth": 30,
                 "output_name": "one.png" } ] } }"#,
        )
        .unwrap();
        let job = &config.exporter.jobs[0];
        assert_eq!(job.regime, Regime::LargeRange);
        assert_eq!(job.view.pixel_size().unwrap(), (200, 150));
        assert_eq!(job.view.output_name, "one.png");
    }

    #[test]
    fn test_invalid_regime_rejected() {
        let config = Config::from_json(
            r#"{ "exporter": { "resolution": { "nx": 1, "ny": 200 } } }"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(BandsError::InvalidResolution(1))
        ));
        assert!(Config::from_json("{ not json").is_err());
    }

    #[test]
    fn test_view_validation() {
        let mut view = Config::default().exporter.jobs[0].view.clone();
        assert!(view.validate().is_ok());
        view.output_name = "  ".into();
        assert!(view.validate().is_err());
        view.output_name = "ok.png".into();
        view.dpi = 0.0;
        assert!(view.validate().is_err());
        view.dpi = 100.0;
        view.azimuth = f64::NAN;
        assert!(view.validate().is_err());
    }

    #[test]
    fn test_output_name_must_stay_relative() {
        let mut view = Config::default().exporter.jobs[0].view.clone();
        for name in ["/abs.png", "../x.png", "views/../../x.png", "./x.png"] {
            view.output_name = name.into();
            assert!(
                matches!(view.validate(), Err(BandsError::InvalidView(_))),
                "{name} accepted"
            );
        }
        view.output_name = "views/side.png".into();
        assert!(view.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::load(Some(Path::new("/definitely/not/here.json"))).unwrap_err();
        assert!(matches!(err, BandsError::ConfigRead { .. }));
    }
}
