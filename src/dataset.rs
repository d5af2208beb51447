//! Immutable evaluated bundles and the compute-once cache that hands them out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::error::Result;
use crate::grid::{self, AxisBounds, Mesh, Resolution};
use crate::model::{self, Band, ModelParameters};

/// Summary of the upper band, taken once at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandStats {
    /// Elements whose radicand was negative (NaN in both bands).
    pub gaps: usize,
    /// Smallest finite value of the upper band, `None` if every point is a gap.
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl BandStats {
    fn of(values: &[f64]) -> Self {
        let mut gaps = 0;
        let mut min: Option<f64> = None;
        let mut max: Option<f64> = None;
        for &v in values {
            if !v.is_finite() {
                gaps += 1;
                continue;
            }
            min = Some(min.map_or(v, |m| m.min(v)));
            max = Some(max.map_or(v, |m| m.max(v)));
        }
        BandStats { gaps, min, max }
    }
}

/// One fully evaluated regime. Fields are private so nothing can mutate it after
/// construction; consumers share it through `Arc`.
#[derive(Debug)]
pub struct Dataset {
    mesh: Mesh,
    band_plus: Vec<f64>,
    band_minus: Vec<f64>,
    parameters: ModelParameters,
    bounds: AxisBounds,
    resolution: Resolution,
    stats: BandStats,
}

impl Dataset {
    /// Samples the grid and evaluates the model in a single pass.
    pub fn evaluate(
        bounds: AxisBounds,
        resolution: Resolution,
        parameters: ModelParameters,
    ) -> Result<Self> {
        parameters.validate()?;
        let mesh = grid::sample(bounds, resolution)?;
        let bands = model::evaluate(&mesh, &parameters);
        let stats = BandStats::of(&bands.plus);
        Ok(Dataset {
            mesh,
            band_plus: bands.plus,
            band_minus: bands.minus,
            parameters,
            bounds,
            resolution,
            stats,
        })
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn band(&self, band: Band) -> &[f64] {
        match band {
            Band::Plus => &self.band_plus,
            Band::Minus => &self.band_minus,
        }
    }

    pub fn band_plus(&self) -> &[f64] {
        &self.band_plus
    }

    pub fn band_minus(&self) -> &[f64] {
        &self.band_minus
    }

    pub fn parameters(&self) -> &ModelParameters {
        &self.parameters
    }

    pub fn bounds(&self) -> AxisBounds {
        self.bounds
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn stats(&self) -> BandStats {
        self.stats
    }

    /// Energy range spanned by both bands, ignoring gaps.
    pub fn energy_range(&self) -> Option<(f64, f64)> {
        let min = self.stats.min?;
        let max = self.stats.max?;
        // The lower band mirrors the upper one, so the union is symmetric.
        Some((min.min(-max), max.max(-min)))
    }
}

/// Exact identity of an evaluation. Floats are keyed by bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetKey {
    max_kx: u64,
    max_ky: u64,
    resolution: Resolution,
    hopping: u64,
    lattice_constant: u64,
}

impl DatasetKey {
    pub fn new(bounds: AxisBounds, resolution: Resolution, parameters: ModelParameters) -> Self {
        DatasetKey {
            max_kx: bounds.max_kx.to_bits(),
            max_ky: bounds.max_ky.to_bits(),
            resolution,
            hopping: parameters.hopping.to_bits(),
            lattice_constant: parameters.lattice_constant.to_bits(),
        }
    }
}

type Slot = Arc<OnceCell<Arc<Dataset>>>;

/// Hands out one shared `Dataset` per distinct (bounds, resolution, parameters).
///
/// Concurrent requests for the same key block on the same slot, so each key is
/// evaluated at most once for the lifetime of the cache.
#[derive(Default)]
pub struct DatasetCache {
    slots: RwLock<HashMap<DatasetKey, Slot>>,
    evaluations: AtomicUsize,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_evaluate(
        &self,
        bounds: AxisBounds,
        resolution: Resolution,
        parameters: ModelParameters,
    ) -> Result<Arc<Dataset>> {
        let key = DatasetKey::new(bounds, resolution, parameters);
        let slot = self.slot(key);

        if let Some(dataset) = slot.get() {
            debug!(?bounds, ?resolution, "dataset cache hit");
            return Ok(dataset.clone());
        }

        let evaluated = slot.get_or_try_init(|| {
            let started = Instant::now();
            let dataset = Dataset::evaluate(bounds, resolution, parameters)?;
            self.evaluations.fetch_add(1, Ordering::Relaxed);
            let stats = dataset.stats();
            info!(
                max_kx = bounds.max_kx,
                max_ky = bounds.max_ky,
                nx = resolution.nx,
                ny = resolution.ny,
                gaps = stats.gaps,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "evaluated dataset"
            );
            Ok::<_, crate::error::BandsError>(Arc::new(dataset))
        });
        match evaluated {
            Ok(dataset) => Ok(dataset.clone()),
            Err(err) => {
                self.forget_empty(&key);
                Err(err)
            }
        }
    }

    /// Number of evaluations performed so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: DatasetKey) -> Slot {
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return slot.clone();
        }
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .clone()
    }

    /// Drops the slot for `key` if it never got a value.
    fn forget_empty(&self, key: &DatasetKey) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if slots.get(key).is_some_and(|slot| slot.get().is_none()) {
            slots.remove(key);
        }
    }
}
