//! Per-column scaling transforms fitted at training time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::features::{Attribute, FeatureVector};

/// Attributes whose column is rescaled before inference.
pub const SCALED_ATTRIBUTES: [Attribute; 5] = [
    Attribute::Age,
    Attribute::RestingBP,
    Attribute::Cholesterol,
    Attribute::MaxHR,
    Attribute::Oldpeak,
];

/// Error type for scaler configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScalerError {
    #[error("No scaler registered for {0}")]
    Missing(Attribute),

    #[error("Invalid scaler parameters for {attribute}: {reason}")]
    InvalidParameters { attribute: Attribute, reason: String },
}

fn one() -> f64 {
    1.0
}

/// A fixed scalar transform. Parameters are the exported attributes of the
/// fitted preprocessing object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    /// `(x - mean) / scale`
    Standard {
        #[serde(default)]
        mean: f64,
        #[serde(default = "one")]
        scale: f64,
    },
    /// `x * scale + min`
    MinMax { min: f64, scale: f64 },
    /// `(x - center) / scale`
    Robust {
        #[serde(default)]
        center: f64,
        #[serde(default = "one")]
        scale: f64,
    },
}

impl Scaler {
    #[must_use]
    pub fn transform(&self, x: f64) -> f64 {
        match *self {
            Self::Standard { mean, scale } => (x - mean) / scale,
            Self::MinMax { min, scale } => x * scale + min,
            Self::Robust { center, scale } => (x - center) / scale,
        }
    }

    fn check(&self) -> Result<(), String> {
        let (offset, scale) = match *self {
            Self::Standard { mean, scale } => (mean, scale),
            Self::MinMax { min, scale } => (min, scale),
            Self::Robust { center, scale } => (center, scale),
        };
        if !offset.is_finite() || !scale.is_finite() {
            return Err("parameters must be finite".into());
        }
        if scale == 0.0 && !matches!(self, Self::MinMax { .. }) {
            return Err("scale must be non-zero".into());
        }
        Ok(())
    }
}

/// The scalers for every attribute in [`SCALED_ATTRIBUTES`].
#[derive(Debug, Clone)]
pub struct ScalerSet {
    scalers: BTreeMap<Attribute, Scaler>,
}

impl ScalerSet {
    /// Build the set, requiring a valid scaler for each scaled attribute.
    ///
    /// Scalers registered for other attributes are ignored.
    ///
    /// # Errors
    /// Returns [`ScalerError::Missing`] or [`ScalerError::InvalidParameters`].
    pub fn new(mut scalers: BTreeMap<Attribute, Scaler>) -> Result<Self, ScalerError> {
        scalers.retain(|attribute, _| {
            let keep = SCALED_ATTRIBUTES.contains(attribute);
            if !keep {
                tracing::warn!(%attribute, "Ignoring scaler for unscaled attribute");
            }
            keep
        });

        for attribute in SCALED_ATTRIBUTES {
            let scaler = scalers.get(&attribute).ok_or(ScalerError::Missing(attribute))?;
            scaler
                .check()
                .map_err(|reason| ScalerError::InvalidParameters { attribute, reason })?;
        }

        Ok(Self { scalers })
    }

    #[must_use]
    pub fn get(&self, attribute: Attribute) -> Option<&Scaler> {
        self.scalers.get(&attribute)
    }

    /// Return a copy of `raw` with each scaled column replaced by its
    /// transform. All other columns are left untouched.
    #[must_use]
    pub fn apply(&self, raw: &FeatureVector) -> FeatureVector {
        let mut scaled = *raw;
        for (attribute, scaler) in &self.scalers {
            scaled.set(*attribute, scaler.transform(raw.get(*attribute)));
        }
        scaled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::FEATURE_COUNT;

    fn standard(mean: f64, scale: f64) -> Scaler {
        Scaler::Standard { mean, scale }
    }

    fn standard_set() -> ScalerSet {
        let scalers = BTreeMap::from([
            (Attribute::Age, standard(53.5, 9.4)),
            (Attribute::RestingBP, standard(132.4, 18.5)),
            (Attribute::Cholesterol, standard(198.8, 109.4)),
            (Attribute::MaxHR, standard(136.8, 25.5)),
            (Attribute::Oldpeak, standard(0.89, 1.07)),
        ]);
        ScalerSet::new(scalers).expect("Should build")
    }

    #[test]
    fn test_transform_kinds() {
        let scaler = standard(10.0, 2.0);
        assert!((scaler.transform(14.0) - 2.0).abs() < f64::EPSILON);

        let min_max = Scaler::MinMax {
            min: -0.5,
            scale: 0.01,
        };
        assert!((min_max.transform(100.0) - 0.5).abs() < 1e-12);

        let robust = Scaler::Robust {
            center: 5.0,
            scale: 0.5,
        };
        assert!((robust.transform(6.0) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_only_scaled_columns_change() {
        let set = standard_set();
        let raw = FeatureVector::new([
            50.0, 1.0, 0.0, 120.0, 200.0, 0.0, 0.0, 150.0, 0.0, 1.0, 0.0,
        ]);
        let scaled = set.apply(&raw);

        for i in 0..FEATURE_COUNT {
            let attribute = Attribute::ALL[i];
            let before = raw.as_slice()[i];
            let after = scaled.as_slice()[i];
            if SCALED_ATTRIBUTES.contains(&attribute) {
                let expected = set.get(attribute).expect("scaler").transform(before);
                assert_eq!(after.to_bits(), expected.to_bits());
            } else {
                assert_eq!(after.to_bits(), before.to_bits(), "{attribute} changed");
            }
        }
    }

    #[test]
    fn test_missing_scaler_is_rejected() {
        let scalers = BTreeMap::from([(Attribute::Age, standard(0.0, 1.0))]);
        let err = ScalerSet::new(scalers).expect_err("must fail");
        assert_eq!(err, ScalerError::Missing(Attribute::RestingBP));
    }

    #[test]
    fn test_invalid_parameters_are_rejected() {
        let mut scalers: BTreeMap<Attribute, Scaler> = SCALED_ATTRIBUTES
            .iter()
            .map(|a| (*a, standard(0.0, 1.0)))
            .collect();
        scalers.insert(Attribute::MaxHR, standard(0.0, 0.0));
        assert!(matches!(
            ScalerSet::new(scalers.clone()),
            Err(ScalerError::InvalidParameters { attribute: Attribute::MaxHR, .. })
        ));

        let robust = Scaler::Robust {
            center: f64::NAN,
            scale: 1.0,
        };
        scalers.insert(Attribute::MaxHR, robust);
        assert!(ScalerSet::new(scalers).is_err());
    }

    #[test]
    fn test_scalers_for_unscaled_columns_are_ignored() {
        let mut scalers: BTreeMap<Attribute, Scaler> = SCALED_ATTRIBUTES
            .iter()
            .map(|a| (*a, standard(0.0, 1.0)))
            .collect();
        scalers.insert(Attribute::Sex, standard(5.0, 1.0));
        let set = ScalerSet::new(scalers).expect("Should build");
        assert!(set.get(Attribute::Sex).is_none());

        let raw = FeatureVector::new([1.0; FEATURE_COUNT]);
        assert_eq!(set.apply(&raw).get(Attribute::Sex), 1.0);
    }

    #[test]
    fn test_deserialize_tagged_scaler() {
        let s: Scaler = serde_json::from_str(r#"{"kind":"standard","mean":3.0,"scale":2.0}"#)
            .expect("Should parse");
        assert_eq!(s, standard(3.0, 2.0));

        let s: Scaler = serde_json::from_str(r#"{"kind":"min_max","min":0.1,"scale":0.5}"#)
            .expect("Should parse");
        assert_eq!(
            s,
            Scaler::MinMax {
                min: 0.1,
                scale: 0.5
            }
        );
    }
}
