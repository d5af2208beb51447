//! Two-band dispersion surfaces: sample once per regime, render many times.
//!
//! [`dataset::DatasetCache`] evaluates each regime exactly once. The results are
//! shared by the batch [`export::StaticExporter`] and the
//! [`selector::InteractiveSelector`] behind the web view.

pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod grid;
pub mod model;
pub mod payload;
pub mod regime;
pub mod render;
pub mod selector;
pub mod telemetry;

pub use config::{Config, ViewConfig};
pub use dataset::{Dataset, DatasetCache};
pub use error::{BandsError, Result};
pub use regime::{PerRegime, Regime};
