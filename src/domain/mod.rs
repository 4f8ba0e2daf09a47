//! Domain layer: Core types and the preprocessing pipeline.
//!
//! Pure Rust, no I/O. Encoding and scaling here must reproduce the
//! preprocessing applied when the models were trained.

mod features;
mod prediction;
mod scaler;

pub use features::{
    encode, Attribute, AttributeKind, CodeMap, EncodingError, FeatureVector, RawInput, RawValue,
    FEATURE_COUNT,
};
pub use prediction::{ModelFamily, ModelPrediction, PredictionReport, Verdict};
pub use scaler::{Scaler, ScalerError, ScalerSet, SCALED_ATTRIBUTES};
