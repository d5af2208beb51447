//! Regime selector behind the interactive view.
//!
//! Holds one precomputed dataset per regime and swaps between them on request.
//! A transition only re-renders; nothing is ever re-evaluated here.

use std::sync::Arc;

use tracing::{info, warn};

use crate::dataset::Dataset;
use crate::payload::{DisplaySurface, RenderPayload};
use crate::regime::{PerRegime, Regime};

/// Current selection, carrying the dataset bound to that regime.
#[derive(Debug, Clone)]
pub enum SelectorState {
    SmallRange(Arc<Dataset>),
    LargeRange(Arc<Dataset>),
}

impl SelectorState {
    fn bind(regime: Regime, datasets: &PerRegime<Arc<Dataset>>) -> Self {
        let dataset = datasets.get(regime).clone();
        match regime {
            Regime::SmallRange => SelectorState::SmallRange(dataset),
            Regime::LargeRange => SelectorState::LargeRange(dataset),
        }
    }

    pub fn regime(&self) -> Regime {
        match self {
            SelectorState::SmallRange(_) => Regime::SmallRange,
            SelectorState::LargeRange(_) => Regime::LargeRange,
        }
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        match self {
            SelectorState::SmallRange(ds) | SelectorState::LargeRange(ds) => ds,
        }
    }
}

/// What a selection event did.
#[derive(Debug, Clone)]
pub struct Transition {
    pub regime: Regime,
    /// False when the label was not a known regime; state and payload are then
    /// exactly what they were before the event.
    pub recognized: bool,
    pub changed: bool,
    pub payload: Arc<RenderPayload>,
}

pub struct InteractiveSelector {
    datasets: PerRegime<Arc<Dataset>>,
    surface: DisplaySurface,
    state: SelectorState,
    last: Arc<RenderPayload>,
}

impl InteractiveSelector {
    /// Starts in `initial` and renders it straight away.
    pub fn new(
        datasets: PerRegime<Arc<Dataset>>,
        initial: Regime,
        surface: DisplaySurface,
    ) -> Self {
        let state = SelectorState::bind(initial, &datasets);
        let last = Arc::new(RenderPayload::render(initial, state.dataset(), &surface));
        info!(regime = %initial, "selector ready");
        InteractiveSelector {
            datasets,
            surface,
            state,
            last,
        }
    }

    pub fn state(&self) -> &SelectorState {
        &self.state
    }

    pub fn regime(&self) -> Regime {
        self.state.regime()
    }

    /// The payload emitted by the most recent transition (or the initial render).
    pub fn current_payload(&self) -> Arc<RenderPayload> {
        self.last.clone()
    }

    pub fn dataset(&self, regime: Regime) -> &Arc<Dataset> {
        self.datasets.get(regime)
    }

    /// Handles a selection event by label. Unknown labels leave the selector
    /// untouched and hand back the previous payload.
    pub fn select(&mut self, label: &str) -> Transition {
        match Regime::from_label(label) {
            Some(regime) => self.select_regime(regime),
            None => {
                warn!(label, current = %self.regime(), "ignoring unknown regime selection");
                Transition {
                    regime: self.regime(),
                    recognized: false,
                    changed: false,
                    payload: self.last.clone(),
                }
            }
        }
    }

    pub fn select_regime(&mut self, regime: Regime) -> Transition {
        let previous = self.regime();
        self.state = SelectorState::bind(regime, &self.datasets);
        self.last = Arc::new(RenderPayload::render(
            regime,
            self.state.dataset(),
            &self.surface,
        ));
        info!(from = %previous, to = %regime, "regime selected");
        Transition {
            regime,
            recognized: true,
            changed: previous != regime,
            payload: self.last.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetCache;
    use crate::grid::{AxisBounds, Resolution};
    use crate::model::ModelParameters;

    fn selector(cache: &DatasetCache) -> InteractiveSelector {
        let res = Resolution::square(9).unwrap();
        let params = ModelParameters::default();
        let datasets = PerRegime {
            small_range: cache
                .get_or_evaluate(AxisBounds::square(2.0).unwrap(), res, params)
                .unwrap(),
            large_range: cache
                .get_or_evaluate(AxisBounds::square(50.0).unwrap(), res, params)
                .unwrap(),
        };
        InteractiveSelector::new(datasets, Regime::SmallRange, DisplaySurface::default())
    }

    #[test]
    fn test_initial_render_uses_default_regime() {
        let cache = DatasetCache::new();
        let sel = selector(&cache);
        assert_eq!(sel.regime(), Regime::SmallRange);
        assert_eq!(sel.current_payload().regime, Regime::SmallRange);
        assert!(matches!(sel.state(), SelectorState::SmallRange(_)));
    }

    #[test]
    fn test_switching_reuses_precomputed_datasets() {
        let cache = DatasetCache::new();
        let mut sel = selector(&cache);
        let large = sel.dataset(Regime::LargeRange).clone();
        for label in ["large-range", "small-range", "large-range"] {
            let t = sel.select(label);
            assert!(t.recognized);
            assert!(t.changed);
        }
        assert!(Arc::ptr_eq(sel.state().dataset(), &large));
        assert_eq!(cache.evaluations(), 2);
    }

    #[test]
    fn test_round_trip_reproduces_payload() {
        let cache = DatasetCache::new();
        let mut sel = selector(&cache);
        let first = sel.current_payload().to_json();
        sel.select("large-range");
        assert_ne!(sel.current_payload().to_json(), first);
        sel.select("small-range");
        assert_eq!(sel.current_payload().to_json(), first);
    }

    #[test]
    fn test_unknown_label_is_ignored() {
        let cache = DatasetCache::new();
        let mut sel = selector(&cache);
        sel.select("large-range");
        let before = sel.current_payload();
        let t = sel.select("huge-range");
        assert!(!t.recognized);
        assert!(!t.changed);
        assert_eq!(t.regime, Regime::LargeRange);
        assert_eq!(sel.regime(), Regime::LargeRange);
        assert!(Arc::ptr_eq(&before, &sel.current_payload()));
    }

    #[test]
    fn test_reselecting_same_regime_is_not_a_change() {
        let cache = DatasetCache::new();
        let mut sel = selector(&cache);
        let t = sel.select("small-range");
        assert!(t.recognized);
        assert!(!t.changed);
    }
}
