//! Forecast model loading and inference.
//!
//! Wraps trained sequence models behind a uniform multi-horizon prediction
//! interface, regardless of whether the underlying network predicts one
//! variable per forecast step (singular) or all three (universal). The
//! architecture (a bi-directional recurrent encoder over the feature window
//! followed by a recurrent decoder) is fixed at training time and loaded
//! here as serialized ONNX weights; prediction is a strictly read-only
//! forward pass.

use crate::features::{FeatureRow, LAT_INDEX, LON_INDEX, MODEL_FEATURE_COUNT, WIND_INDEX};
use crate::scaling::RobustScaler;
use crate::{Error, Result};
use ndarray::Array3;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// The physical variable a singular model predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetVariable {
    Wind,
    Lat,
    Lon,
}

impl TargetVariable {
    /// Index of this variable in the scaler feature space.
    pub fn feature_index(&self) -> usize {
        match self {
            TargetVariable::Wind => WIND_INDEX,
            TargetVariable::Lat => LAT_INDEX,
            TargetVariable::Lon => LON_INDEX,
        }
    }
}

/// Model architecture variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelVariant {
    /// Predicts one variable per forecast step; three trained instances are
    /// needed to cover a full forecast.
    Singular(TargetVariable),
    /// Predicts wind, latitude, and longitude jointly per forecast step.
    Universal,
}

impl ModelVariant {
    /// Number of scalars the network emits per forecast step.
    pub fn output_arity(&self) -> usize {
        match self {
            ModelVariant::Singular(_) => 1,
            ModelVariant::Universal => 3,
        }
    }
}

fn default_forecast_steps() -> usize {
    4
}

/// Serialized model configuration descriptor (`hyperparameters.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Whether the weights are a universal (three-output) architecture.
    pub universal: bool,
    /// Target variable for singular weights. Ignored for universal.
    #[serde(default)]
    pub target: Option<TargetVariable>,
    /// Number of forecast steps the architecture was trained to emit.
    #[serde(default = "default_forecast_steps")]
    pub forecast_steps: usize,
}

impl ModelDescriptor {
    /// Load and validate a descriptor from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::ModelLoad {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        let descriptor: ModelDescriptor =
            serde_json::from_str(&text).map_err(|e| Error::ModelLoad {
                path: path.to_path_buf(),
                source: Box::new(e),
            })?;
        if descriptor.variant().is_none() {
            return Err(Error::ModelLoad {
                path: path.to_path_buf(),
                source: "singular descriptor does not name a target variable".into(),
            });
        }
        Ok(descriptor)
    }

    /// The variant these weights implement, when the descriptor is complete.
    pub fn variant(&self) -> Option<ModelVariant> {
        if self.universal {
            Some(ModelVariant::Universal)
        } else {
            self.target.map(ModelVariant::Singular)
        }
    }
}

/// One forecast step in physical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepForecast {
    pub wind: f64,
    pub lat: f64,
    pub lon: f64,
}

/// A loaded inference session paired with its variant and fitted scaler.
///
/// Read-only after construction; the session lives for the process duration
/// and is released by drop.
pub struct ForecastModel {
    session: Session,
    variant: ModelVariant,
    forecast_steps: usize,
    scaler: RobustScaler,
}

impl ForecastModel {
    /// Load serialized weights and mark the model ready for inference.
    pub fn load(
        model_path: &Path,
        variant: ModelVariant,
        forecast_steps: usize,
        scaler: RobustScaler,
    ) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(1)? // Single-threaded for determinism
            .commit_from_file(model_path)
            .map_err(|e| Error::ModelLoad {
                path: model_path.to_path_buf(),
                source: Box::new(e),
            })?;

        info!(
            path = %model_path.display(),
            ?variant,
            steps = forecast_steps,
            "loaded forecast model"
        );

        Ok(Self {
            session,
            variant,
            forecast_steps,
            scaler,
        })
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    pub fn forecast_steps(&self) -> usize {
        self.forecast_steps
    }

    /// The fitted scaler paired with these weights.
    pub fn scaler(&self) -> &RobustScaler {
        &self.scaler
    }

    /// Run the network over a feature window.
    ///
    /// Returns one scaled output group per forecast step: one value for
    /// singular models, three in (wind, lat, lon) order for universal
    /// models. The caller has already filtered out windows that are too
    /// short; only a cheap shape assertion happens here.
    pub fn predict_scaled(&mut self, window: &[FeatureRow]) -> Result<Vec<Vec<f64>>> {
        if window.is_empty() {
            return Err(Error::OutputShape("empty feature window".into()));
        }

        let arity = self.variant.output_arity();

        let mut input = Array3::<f32>::zeros((1, window.len(), MODEL_FEATURE_COUNT));
        for (i, row) in window.iter().enumerate() {
            let scaled = self.scaler.transform_row(&row.to_model_vector())?;
            for (j, &value) in scaled.iter().enumerate() {
                input[[0, i, j]] = value as f32;
            }
        }

        let output_name = self
            .session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| Error::OutputShape("model declares no outputs".into()))?;

        let input_tensor = Value::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_tensor])?;
        let output = outputs
            .get(&output_name)
            .ok_or_else(|| Error::OutputShape(format!("missing model output {output_name}")))?;
        let (_shape, data) = output.try_extract_tensor::<f32>()?;

        if data.len() < self.forecast_steps * arity {
            return Err(Error::OutputShape(format!(
                "got {} values for {} steps of arity {}",
                data.len(),
                self.forecast_steps,
                arity
            )));
        }

        Ok(data
            .chunks(arity)
            .take(self.forecast_steps)
            .map(|step| step.iter().map(|&v| v as f64).collect())
            .collect())
    }
}

/// Uniform multi-horizon prediction interface over model variants.
///
/// Implementations run a strictly read-only forward pass: identical feature
/// windows yield identical outputs across repeated calls.
pub trait HorizonPredictor {
    /// Number of forecast steps the underlying architecture emits.
    fn forecast_steps(&self) -> usize;

    /// Predict physical-unit (wind, lat, lon) values for each forecast step.
    fn predict(&mut self, window: &[FeatureRow]) -> Result<Vec<StepForecast>>;
}

/// A universal model: one session predicting all three variables per step.
pub struct UniversalModel {
    model: ForecastModel,
}

impl UniversalModel {
    pub fn new(model: ForecastModel) -> Result<Self> {
        match model.variant() {
            ModelVariant::Universal => Ok(Self { model }),
            ModelVariant::Singular(target) => Err(Error::VariantMismatch(format!(
                "singular {target:?} weights handed to the universal adapter"
            ))),
        }
    }
}

impl HorizonPredictor for UniversalModel {
    fn forecast_steps(&self) -> usize {
        self.model.forecast_steps()
    }

    fn predict(&mut self, window: &[FeatureRow]) -> Result<Vec<StepForecast>> {
        let raw = self.model.predict_scaled(window)?;
        let scaler = self.model.scaler();

        raw.into_iter()
            .map(|step| match step.as_slice() {
                &[wind, lat, lon] => Ok(StepForecast {
                    wind: scaler.descale(wind, WIND_INDEX)?,
                    lat: scaler.descale(lat, LAT_INDEX)?,
                    lon: scaler.descale(lon, LON_INDEX)?,
                }),
                other => Err(Error::OutputShape(format!(
                    "universal step emitted {} values",
                    other.len()
                ))),
            })
            .collect()
    }
}

/// Three singular models covering wind, latitude, and longitude.
pub struct SingularEnsemble {
    wind: ForecastModel,
    lat: ForecastModel,
    lon: ForecastModel,
}

impl SingularEnsemble {
    pub fn new(wind: ForecastModel, lat: ForecastModel, lon: ForecastModel) -> Result<Self> {
        expect_singular(&wind, TargetVariable::Wind)?;
        expect_singular(&lat, TargetVariable::Lat)?;
        expect_singular(&lon, TargetVariable::Lon)?;
        Ok(Self { wind, lat, lon })
    }
}

fn expect_singular(model: &ForecastModel, target: TargetVariable) -> Result<()> {
    match model.variant() {
        ModelVariant::Singular(t) if t == target => Ok(()),
        other => Err(Error::VariantMismatch(format!(
            "{other:?} weights in the {target:?} slot of a singular ensemble"
        ))),
    }
}

impl HorizonPredictor for SingularEnsemble {
    fn forecast_steps(&self) -> usize {
        self.wind
            .forecast_steps()
            .min(self.lat.forecast_steps())
            .min(self.lon.forecast_steps())
    }

    fn predict(&mut self, window: &[FeatureRow]) -> Result<Vec<StepForecast>> {
        let steps = self.forecast_steps();
        let wind_raw = self.wind.predict_scaled(window)?;
        let lat_raw = self.lat.predict_scaled(window)?;
        let lon_raw = self.lon.predict_scaled(window)?;

        fn scalar(step: &[f64], target: TargetVariable) -> Result<f64> {
            match step {
                &[value] => Ok(value),
                other => Err(Error::OutputShape(format!(
                    "singular {target:?} step emitted {} values",
                    other.len()
                ))),
            }
        }

        let mut forecasts = Vec::with_capacity(steps);
        for k in 0..steps {
            let wind = scalar(&wind_raw[k], TargetVariable::Wind)?;
            let lat = scalar(&lat_raw[k], TargetVariable::Lat)?;
            let lon = scalar(&lon_raw[k], TargetVariable::Lon)?;
            forecasts.push(StepForecast {
                wind: self.wind.scaler().descale(wind, WIND_INDEX)?,
                lat: self.lat.scaler().descale(lat, LAT_INDEX)?,
                lon: self.lon.scaler().descale(lon, LON_INDEX)?,
            });
        }
        Ok(forecasts)
    }
}
