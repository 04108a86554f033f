use serde::{de::DeserializeOwned, Deserialize};
use std::{fs, path::Path, sync::Arc};

use crate::{
    error::{ComputationError, StartupError},
    features::FeatureVector,
    schema::SchemaVersion,
};

/// Normalizes a feature vector before prediction.
pub trait FeatureScaler: Send + Sync {
    /// Number of features the scaler was fitted on.
    fn width(&self) -> usize;
    fn transform(&self, x: &[f64]) -> Result<Vec<f64>, ComputationError>;
}

/// Maps a scaled feature vector to a single prediction.
pub trait Regressor: Send + Sync {
    fn width(&self) -> usize;
    fn predict(&self, x: &[f64]) -> Result<f64, ComputationError>;
}

// ---------- Artifact files ----------

#[derive(Deserialize)]
struct ScalerJson {
    schema: Option<SchemaVersion>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

#[derive(Deserialize)]
struct ModelJson {
    schema: Option<SchemaVersion>,
    coef: Vec<f64>,
    intercept: f64,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StartupError> {
    let txt = fs::read_to_string(path).map_err(|source| StartupError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&txt).map_err(|source| StartupError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn invalid(path: &Path, reason: impl Into<String>) -> StartupError {
    StartupError::InvalidArtifact {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn check_width(stage: &'static str, expected: usize, x: &[f64]) -> Result<(), ComputationError> {
    if x.len() != expected {
        return Err(ComputationError::WidthMismatch {
            stage,
            expected,
            got: x.len(),
        });
    }
    Ok(())
}

// ---------- Standard scaler ----------

/// `(x - mean) / scale`, per feature.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, String> {
        if mean.is_empty() {
            return Err("scaler has no features".into());
        }
        if mean.len() != scale.len() {
            return Err(format!(
                "mean has {} entries but scale has {}",
                mean.len(),
                scale.len()
            ));
        }
        if mean.iter().chain(&scale).any(|v| !v.is_finite()) {
            return Err("scaler parameters must be finite".into());
        }
        if let Some(i) = scale.iter().position(|s| *s == 0.0) {
            return Err(format!("scale[{}] is zero", i));
        }
        Ok(Self { mean, scale })
    }

    fn load(path: &Path) -> Result<(Self, Option<SchemaVersion>), StartupError> {
        let raw: ScalerJson = read_json(path)?;
        let scaler = Self::new(raw.mean, raw.scale).map_err(|r| invalid(path, r))?;
        Ok((scaler, raw.schema))
    }
}

impl FeatureScaler for StandardScaler {
    fn width(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, x: &[f64]) -> Result<Vec<f64>, ComputationError> {
        check_width("scaler", self.width(), x)?;
        let out: Vec<f64> = x
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect();
        if out.iter().any(|v| !v.is_finite()) {
            return Err(ComputationError::NonFinite { stage: "scaler" });
        }
        Ok(out)
    }
}

// ---------- Linear regression ----------

/// `dot(coef, x) + intercept`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    coef: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    pub fn new(coef: Vec<f64>, intercept: f64) -> Result<Self, String> {
        if coef.is_empty() {
            return Err("model has no coefficients".into());
        }
        if !intercept.is_finite() || coef.iter().any(|c| !c.is_finite()) {
            return Err("model parameters must be finite".into());
        }
        Ok(Self { coef, intercept })
    }

    fn load(path: &Path) -> Result<(Self, Option<SchemaVersion>), StartupError> {
        let raw: ModelJson = read_json(path)?;
        let model = Self::new(raw.coef, raw.intercept).map_err(|r| invalid(path, r))?;
        Ok((model, raw.schema))
    }
}

impl Regressor for LinearModel {
    fn width(&self) -> usize {
        self.coef.len()
    }

    fn predict(&self, x: &[f64]) -> Result<f64, ComputationError> {
        check_width("model", self.width(), x)?;
        let y = self.coef.iter().zip(x).map(|(c, v)| c * v).sum::<f64>() + self.intercept;
        if !y.is_finite() {
            return Err(ComputationError::NonFinite { stage: "model" });
        }
        Ok(y)
    }
}

// ---------- Pipeline ----------

/// Round half away from zero to two decimals. Values too large to scale by
/// 100 already have no fractional digits and are returned as is.
pub fn round2(x: f64) -> f64 {
    let scaled = x * 100.0;
    if !scaled.is_finite() {
        return x;
    }
    scaled.round() / 100.0
}

/// A scaler/model pair bound to the schema it was trained on.
#[derive(Clone)]
pub struct Pipeline {
    schema: SchemaVersion,
    scaler: Arc<dyn FeatureScaler>,
    model: Arc<dyn Regressor>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("schema", &self.schema)
            .field("scaler_width", &self.scaler.width())
            .field("model_width", &self.model.width())
            .finish()
    }
}

impl Pipeline {
    /// Bind a scaler and model to `schema`, rejecting any width disagreement.
    pub fn new(
        schema: SchemaVersion,
        scaler: Arc<dyn FeatureScaler>,
        model: Arc<dyn Regressor>,
    ) -> Result<Self, StartupError> {
        let expected = schema.width();
        for (artifact, got) in [("scaler", scaler.width()), ("model", model.width())] {
            if got != expected {
                return Err(StartupError::WidthMismatch {
                    artifact,
                    schema,
                    expected,
                    got,
                });
            }
        }
        Ok(Self {
            schema,
            scaler,
            model,
        })
    }

    /// Load both artifacts from JSON and check them against `schema`.
    pub fn load(
        schema: SchemaVersion,
        model_path: &Path,
        scaler_path: &Path,
    ) -> Result<Self, StartupError> {
        let (scaler, scaler_schema) = StandardScaler::load(scaler_path)?;
        let (model, model_schema) = LinearModel::load(model_path)?;

        for (artifact, declared) in [("scaler", scaler_schema), ("model", model_schema)] {
            if let Some(declared) = declared {
                if declared != schema {
                    return Err(StartupError::SchemaMismatch {
                        artifact,
                        declared,
                        configured: schema,
                    });
                }
            }
        }

        Self::new(schema, Arc::new(scaler), Arc::new(model))
    }

    pub fn schema(&self) -> SchemaVersion {
        self.schema
    }

    /// Push an all-zero vector through both stages.
    pub fn warmup(&self) -> Result<f64, StartupError> {
        let zeros = vec![0.0; self.schema.width()];
        self.scaler
            .transform(&zeros)
            .and_then(|scaled| self.model.predict(&scaled))
            .map_err(StartupError::Warmup)
    }

    pub fn scale(&self, features: &FeatureVector) -> Result<Vec<f64>, ComputationError> {
        self.scaler.transform(features.as_slice())
    }

    /// Raw model output for an already scaled vector.
    pub fn predict_scaled(&self, scaled: &[f64]) -> Result<f64, ComputationError> {
        self.model.predict(scaled)
    }

    /// Scale, predict and round to two decimals.
    pub fn predict(&self, features: &FeatureVector) -> Result<f64, ComputationError> {
        let scaled = self.scale(features)?;
        self.predict_scaled(&scaled).map(round2)
    }
}
