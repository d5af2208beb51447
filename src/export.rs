//! Static image export: one dataset plus one camera view in, one file out.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use image::{ColorType, ImageFormat};
use tracing::{error, info};

use crate::config::{Config, ExportJob, ViewConfig};
use crate::dataset::{Dataset, DatasetCache};
use crate::error::{BandsError, Result};
use crate::render::{self, SceneStats};

#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub scene: SceneStats,
}

pub struct StaticExporter {
    output_dir: PathBuf,
}

impl StaticExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        StaticExporter {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Renders both bands of `dataset` from `view` and writes
    /// `<output_dir>/<view.output_name>`, replacing any existing file.
    pub fn export(&self, dataset: &Dataset, view: &ViewConfig) -> Result<ExportReport> {
        view.validate()?;
        let (width, height) = view.pixel_size()?;
        let path = self.output_dir.join(&view.output_name);
        ensure_parent(&path)?;

        let started = Instant::now();
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        let scene = render::draw_bands(
            &mut buffer,
            (width, height),
            dataset,
            view.elevation,
            view.azimuth,
        )?;
        save_rgb(&path, &buffer, width, height)?;
        drop(buffer);

        info!(
            path = %path.display(),
            width,
            height,
            elevation = view.elevation,
            azimuth = view.azimuth,
            skipped_cells = scene.skipped_cells,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "exported view"
        );

        Ok(ExportReport {
            path,
            width,
            height,
            scene,
        })
    }
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub written: Vec<ExportReport>,
    /// Output name and error of every job that failed.
    pub failed: Vec<(String, BandsError)>,
}

/// Runs `jobs` in order against the static regimes of `config`.
///
/// Datasets come from `cache`, so views sharing a regime share one evaluation.
/// A failing job is logged and recorded; the remaining jobs still run.
pub fn run_batch(
    config: &Config,
    jobs: &[ExportJob],
    exporter: &StaticExporter,
    cache: &DatasetCache,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for job in jobs {
        let spec = config.static_regime(job.regime);
        let result = cache
            .get_or_evaluate(spec.bounds, spec.resolution, spec.parameters)
            .and_then(|dataset| exporter.export(&dataset, &job.view));
        match result {
            Ok(report) => summary.written.push(report),
            Err(err) => {
                error!(
                    regime = %job.regime,
                    output = %job.view.output_name,
                    error = %err,
                    "export failed"
                );
                summary.failed.push((job.view.output_name.clone(), err));
            }
        }
    }
    summary
}

/// Encodes by the file extension; anything unrecognised is written as PNG.
fn save_rgb(path: &Path, buffer: &[u8], width: u32, height: u32) -> Result<()> {
    let format = match ImageFormat::from_path(path) {
        Ok(format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp)) => format,
        _ => ImageFormat::Png,
    };
    image::save_buffer_with_format(path, buffer, width, height, ColorType::Rgb8, format)
        .map_err(|source| BandsError::ImageWrite {
            path: path.to_path_buf(),
            source,
        })
}

/// Creates the directory that will hold `path`. Existing directories are fine.
fn ensure_parent(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(parent).map_err(|source| BandsError::OutputLocation {
        path: parent.to_path_buf(),
        source,
    })
}
