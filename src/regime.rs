//! Parameter regimes the run switches between, and per-regime containers.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::{AxisBounds, Resolution};
use crate::model::ModelParameters;

/// The closed set of parameter regimes a run works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Regime {
    SmallRange,
    LargeRange,
}

impl Regime {
    pub const ALL: [Regime; 2] = [Regime::SmallRange, Regime::LargeRange];

    /// Looks up a regime by its label. Case-insensitive; `None` for anything else.
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "small-range" => Some(Regime::SmallRange),
            "large-range" => Some(Regime::LargeRange),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Regime::SmallRange => "small-range",
            Regime::LargeRange => "large-range",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Regime::SmallRange => "Small k range",
            Regime::LargeRange => "Large k range",
        }
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to evaluate one regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeSpec {
    pub bounds: AxisBounds,
    pub resolution: Resolution,
    pub parameters: ModelParameters,
}

impl RegimeSpec {
    pub fn validate(&self) -> Result<()> {
        self.bounds.validate()?;
        self.resolution.validate()?;
        self.parameters.validate()
    }
}

/// One value per regime. Exhaustive by construction, so no regime can be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerRegime<T> {
    pub small_range: T,
    pub large_range: T,
}

impl<T> PerRegime<T> {
    pub fn get(&self, regime: Regime) -> &T {
        match regime {
            Regime::SmallRange => &self.small_range,
            Regime::LargeRange => &self.large_range,
        }
    }

    pub fn try_map<U, E>(
        &self,
        mut f: impl FnMut(Regime, &T) -> std::result::Result<U, E>,
    ) -> std::result::Result<PerRegime<U>, E> {
        Ok(PerRegime {
            small_range: f(Regime::SmallRange, &self.small_range)?,
            large_range: f(Regime::LargeRange, &self.large_range)?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (Regime, &T)> {
        Regime::ALL.into_iter().map(move |r| (r, self.get(r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip() {
        for regime in Regime::ALL {
            assert_eq!(Regime::from_label(regime.as_str()), Some(regime));
        }
        assert_eq!(Regime::from_label(" Large-Range "), Some(Regime::LargeRange));
        assert_eq!(Regime::from_label("medium-range"), None);
        assert_eq!(Regime::from_label(""), None);
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&Regime::SmallRange).unwrap();
        assert_eq!(json, "\"small-range\"");
    }

    #[test]
    fn test_per_regime_iter_order() {
        let table = PerRegime {
            small_range: 1,
            large_range: 2,
        };
        let seen: Vec<_> = table.iter().map(|(r, v)| (r, *v)).collect();
        assert_eq!(seen, vec![(Regime::SmallRange, 1), (Regime::LargeRange, 2)]);
        let doubled: PerRegime<i32> = table.try_map(|_, v| Ok::<_, ()>(v * 2)).unwrap();
        assert_eq!(*doubled.get(Regime::LargeRange), 4);
    }
}
