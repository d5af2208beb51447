use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use dispersion_viz::export::{run_batch, StaticExporter};
use dispersion_viz::{telemetry, Config, DatasetCache, Regime};

/// Render the two dispersion bands to static images, one per configured view.
#[derive(Parser)]
#[command(name = "dispersion")]
struct Args {
    /// JSON config file. Defaults reproduce the four reference views.
    #[arg(long, env = "DISPERSION_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the images are written to (overrides the config).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Only export views of this regime (small-range or large-range).
    #[arg(long)]
    regime: Option<String>,
}

fn main() -> anyhow::Result<()> {
    telemetry::init();
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("loading config")?;
    if let Some(dir) = args.output_dir {
        config.exporter.output_dir = dir;
    }

    let only = match args.regime.as_deref() {
        Some(label) => match Regime::from_label(label) {
            Some(regime) => Some(regime),
            None => bail!("unknown regime {label:?}, expected small-range or large-range"),
        },
        None => None,
    };
    let jobs: Vec<_> = config
        .exporter
        .jobs
        .iter()
        .filter(|job| only.map_or(true, |r| job.regime == r))
        .cloned()
        .collect();

    info!(
        jobs = jobs.len(),
        output_dir = %config.exporter.output_dir.display(),
        t = config.model.hopping,
        a = config.model.lattice_constant,
        "starting export"
    );

    let cache = DatasetCache::new();
    let exporter = StaticExporter::new(&config.exporter.output_dir);
    let summary = run_batch(&config, &jobs, &exporter, &cache);

    info!(
        written = summary.written.len(),
        failed = summary.failed.len(),
        evaluations = cache.evaluations(),
        "export finished"
    );

    if !summary.failed.is_empty() {
        let names: Vec<&str> = summary.failed.iter().map(|(name, _)| name.as_str()).collect();
        bail!(
            "{} of {} exports failed: {}",
            summary.failed.len(),
            jobs.len(),
            names.join(", ")
        );
    }
    Ok(())
}
