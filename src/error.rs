//! Error type shared across the library.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BandsError {
    #[error("axis extent must be positive and finite, got {0}")]
    InvalidExtent(f64),

    #[error("resolution must be at least 2 samples per axis, got {0}")]
    InvalidResolution(usize),

    #[error("invalid model parameters: {0}")]
    InvalidParameters(String),

    #[error("invalid view configuration: {0}")]
    InvalidView(String),

    #[error("output location {path}: {source}")]
    OutputLocation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to draw scene: {0}")]
    Draw(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to write image {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BandsError>;
