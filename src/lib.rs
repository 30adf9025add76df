//! Multi-horizon tropical cyclone intensity and track inference.
//!
//! This crate turns a storm's raw observation history into model-ready
//! derived features, runs a trained sequence model (ONNX) over the feature
//! window, and descales the outputs back into physical units at each
//! forecast horizon. Ingestion of storm feeds and formatting of results are
//! external collaborators; the crate's obligation is a complete, well-typed
//! forecast structure per storm.

pub mod features;
pub mod forecast;
pub mod model;
pub mod scaling;
pub mod track;

pub use features::{derive_features, FeatureRow};
pub use forecast::{
    forecast_all_anchors, forecast_fleet, forecast_storm, FleetOutcome, ForecastConfig,
    HorizonForecast, StormForecast,
};
pub use model::{
    ForecastModel, HorizonPredictor, ModelDescriptor, ModelVariant, SingularEnsemble,
    StepForecast, TargetVariable, UniversalModel,
};
pub use scaling::RobustScaler;
pub use track::{Observation, StormTrack};

use std::path::PathBuf;

/// Library-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A storm with too little history to form a feature window. Non-fatal:
    /// callers skip the storm and continue with the rest of the batch.
    #[error("storm {storm}: {observations} observations, need at least {required}")]
    InsufficientData {
        storm: String,
        observations: usize,
        required: usize,
    },

    /// A missing or malformed model, scaler, or descriptor artifact. Fatal
    /// to the run; the message names the offending path.
    #[error("failed to load artifact {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Feature index outside the scaler's fitted dimensionality. Indicates a
    /// configuration mismatch between model and scaler.
    #[error("feature index {index} out of range for scaler fitted on {dimensions} features")]
    ScalerShape { index: usize, dimensions: usize },

    /// Feature vector width that does not match the scaler's fitted space.
    #[error("feature vector width {got} does not match scaler fitted on {expected} features")]
    FeatureWidth { got: usize, expected: usize },

    /// Inference session failure.
    #[error("inference session failure: {0}")]
    Inference(#[from] ort::Error),

    /// Model output incompatible with the configured variant.
    #[error("model output shape mismatch: {0}")]
    OutputShape(String),

    /// A model handle wired into an adapter of the wrong variant.
    #[error("model variant mismatch: {0}")]
    VariantMismatch(String),
}

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;
