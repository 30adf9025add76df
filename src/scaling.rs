//! Robust scaling and single-feature descaling.
//!
//! The training pipeline fits one robust scaler jointly over the full
//! feature space, so the transform only inverts full-width vectors. Model
//! outputs come back one scaled feature at a time; recovering the physical
//! value reconstructs a sparse full-width vector, inverts it, and reads back
//! the single coordinate.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Fitted robust-scaling transform over the model feature space.
///
/// `center` and `scale` are the per-feature median and IQR captured at
/// training time and exported to a JSON artifact alongside the weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobustScaler {
    pub center: Vec<f64>,
    pub scale: Vec<f64>,
}

impl RobustScaler {
    /// Load a scaler artifact from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::ModelLoad {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        let scaler: RobustScaler = serde_json::from_str(&text).map_err(|e| Error::ModelLoad {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        if scaler.center.len() != scaler.scale.len() {
            return Err(Error::ModelLoad {
                path: path.to_path_buf(),
                source: format!(
                    "center has {} entries but scale has {}",
                    scaler.center.len(),
                    scaler.scale.len()
                )
                .into(),
            });
        }
        Ok(scaler)
    }

    /// Dimensionality of the fitted feature space.
    pub fn dimensions(&self) -> usize {
        self.center.len()
    }

    /// Scale a raw feature vector into model space.
    pub fn transform_row(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.dimensions() {
            return Err(Error::FeatureWidth {
                got: features.len(),
                expected: self.dimensions(),
            });
        }
        Ok(features
            .iter()
            .zip(self.center.iter().zip(&self.scale))
            .map(|(&x, (&c, &s))| (x - c) / s)
            .collect())
    }

    /// Invert a full scaled vector back to physical units.
    pub fn inverse_transform(&self, scaled: &[f64]) -> Result<Vec<f64>> {
        if scaled.len() != self.dimensions() {
            return Err(Error::FeatureWidth {
                got: scaled.len(),
                expected: self.dimensions(),
            });
        }
        Ok(scaled
            .iter()
            .zip(self.center.iter().zip(&self.scale))
            .map(|(&x, (&c, &s))| x * s + c)
            .collect())
    }

    /// Recover the physical value of a single feature from a scaled model
    /// output.
    ///
    /// Builds a zero vector of the fitted width, places the scalar at
    /// `feature_index`, inverts the full vector, and reads back the same
    /// position. The other positions of the inverted vector are meaningless
    /// and discarded.
    pub fn descale(&self, value: f64, feature_index: usize) -> Result<f64> {
        if feature_index >= self.dimensions() {
            return Err(Error::ScalerShape {
                index: feature_index,
                dimensions: self.dimensions(),
            });
        }
        let mut sparse = vec![0.0; self.dimensions()];
        sparse[feature_index] = value;
        let inverted = self.inverse_transform(&sparse)?;
        Ok(inverted[feature_index])
    }
}
