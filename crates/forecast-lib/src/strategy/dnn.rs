//! Feed-forward network strategy for weekly sales
//!
//! The network ships as two artifacts: a JSON descriptor naming the input
//! width and columns, and the weights exported to ONNX. Inference runs on
//! tract. Builds without the `onnx` feature keep the strategy registered but
//! report it as unavailable.

use super::{curated_price_columns, LoadGuard, LoadState, Strategy};
use crate::error::{ForecastError, Result};
use crate::models::{FeatureSchema, FeatureVector};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// Input width of the curated price network
pub const DNN_INPUT_DIM: usize = 23;

/// Network descriptor (`dnn_regressor.json`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DnnDescriptor {
    #[serde(default = "default_input_dim")]
    pub input_dim: usize,
    #[serde(default)]
    pub feature_columns: Option<Vec<String>>,
    /// Hex SHA256 of the weights file
    #[serde(default)]
    pub weights_sha256: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

fn default_input_dim() -> usize {
    DNN_INPUT_DIM
}

impl DnnDescriptor {
    /// Declared columns, or the curated ordering for the default width
    pub fn schema(&self) -> Result<FeatureSchema> {
        let columns = match &self.feature_columns {
            Some(columns) if columns.len() != self.input_dim => {
                return Err(ForecastError::configuration(format!(
                    "Network descriptor declares {} columns for input_dim {}",
                    columns.len(),
                    self.input_dim
                )));
            }
            Some(columns) => columns.clone(),
            None if self.input_dim == DNN_INPUT_DIM => curated_price_columns(),
            None => {
                return Err(ForecastError::configuration(format!(
                    "Network with input_dim {} must declare its feature columns",
                    self.input_dim
                )));
            }
        };
        let version = self
            .version
            .clone()
            .unwrap_or_else(|| "unversioned".to_string());
        Ok(FeatureSchema::new(version, columns))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DnnArtifacts {
    pub descriptor_path: PathBuf,
    pub weights_path: PathBuf,
}

#[cfg(feature = "onnx")]
mod runtime {
    use anyhow::{Context, Result};
    use tract_onnx::prelude::*;

    pub const AVAILABLE: bool = true;

    type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

    pub struct Network {
        plan: TractModel,
        input_dim: usize,
    }

    impl Network {
        pub fn from_bytes(bytes: &[u8], input_dim: usize) -> Result<Self> {
            let plan = tract_onnx::onnx()
                .model_for_read(&mut std::io::Cursor::new(bytes))
                .context("Failed to parse ONNX model")?
                .with_input_fact(0, f32::fact([1, input_dim]).into())
                .context("Failed to set input shape")?
                .into_optimized()
                .context("Failed to optimize model")?
                .into_runnable()
                .context("Failed to create runnable model")?;
            Ok(Self { plan, input_dim })
        }

        pub fn run(&self, row: &[f32]) -> Result<f32> {
            let input: Tensor =
                tract_ndarray::Array2::from_shape_vec((1, self.input_dim), row.to_vec())
                    .context("Input row does not match the network width")?
                    .into();
            let outputs = self.plan.run(tvec!(input.into()))?;
            let output = outputs.first().context("No output from model")?;
            let view = output.to_array_view::<f32>()?;
            view.iter().next().copied().context("Model output is empty")
        }
    }
}

#[cfg(not(feature = "onnx"))]
mod runtime {
    use anyhow::{bail, Result};

    pub const AVAILABLE: bool = false;

    pub struct Network;

    impl Network {
        pub fn from_bytes(_bytes: &[u8], _input_dim: usize) -> Result<Self> {
            bail!("built without the onnx feature")
        }

        pub fn run(&self, _row: &[f32]) -> Result<f32> {
            bail!("built without the onnx feature")
        }
    }
}

struct LoadedDnn {
    schema: FeatureSchema,
    network: runtime::Network,
}

/// Neural network strategy
pub struct DnnStrategy {
    name: String,
    artifacts: DnnArtifacts,
    state: LoadGuard<LoadedDnn>,
}

impl DnnStrategy {
    pub fn new(name: impl Into<String>, artifacts: DnnArtifacts) -> Self {
        Self {
            name: name.into(),
            artifacts,
            state: LoadGuard::new(),
        }
    }

    /// Whether this build can run networks at all
    pub fn runtime_available() -> bool {
        runtime::AVAILABLE
    }

    fn loaded(&self) -> Result<&LoadedDnn> {
        self.state.get_or_load(|| self.load_artifacts())
    }

    fn load_artifacts(&self) -> Result<LoadedDnn> {
        if !runtime::AVAILABLE {
            return Err(ForecastError::unavailable(
                &self.name,
                "network runtime not compiled in (enable the onnx feature)",
            ));
        }

        let start = Instant::now();
        let descriptor_path = &self.artifacts.descriptor_path;
        let raw = std::fs::read_to_string(descriptor_path).map_err(|e| {
            ForecastError::configuration(format!(
                "Failed to read {}: {}",
                descriptor_path.display(),
                e
            ))
        })?;
        let descriptor: DnnDescriptor = serde_json::from_str(&raw).map_err(|e| {
            ForecastError::configuration(format!(
                "Failed to parse {}: {}",
                descriptor_path.display(),
                e
            ))
        })?;
        let schema = descriptor.schema()?;

        let weights_path = &self.artifacts.weights_path;
        let weights = std::fs::read(weights_path).map_err(|e| {
            ForecastError::configuration(format!(
                "Failed to read {}: {}",
                weights_path.display(),
                e
            ))
        })?;

        if let Some(expected) = &descriptor.weights_sha256 {
            let computed = compute_checksum(&weights);
            if !computed.eq_ignore_ascii_case(expected.trim()) {
                return Err(ForecastError::configuration(format!(
                    "Checksum mismatch for {}: expected {}, got {}",
                    weights_path.display(),
                    expected,
                    computed
                )));
            }
            debug!(strategy = %self.name, checksum = %computed, "Network checksum validated");
        }

        let network = runtime::Network::from_bytes(&weights, descriptor.input_dim).map_err(|e| {
            ForecastError::configuration(format!("{}: {:#}", weights_path.display(), e))
        })?;

        info!(
            strategy = %self.name,
            input_dim = descriptor.input_dim,
            version = %schema.version,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Network loaded"
        );
        Ok(LoadedDnn { schema, network })
    }
}

/// Compute SHA256 checksum of data
fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

impl Strategy for DnnStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<()> {
        self.loaded().map(|_| ())
    }

    fn state(&self) -> LoadState {
        self.state.state()
    }

    fn schema(&self) -> Result<&FeatureSchema> {
        self.loaded().map(|l| &l.schema)
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let loaded = self.loaded()?;
        let row: Vec<f32> = loaded
            .schema
            .select(features)?
            .into_iter()
            .map(|v| v as f32)
            .collect();
        let prediction = loaded
            .network
            .run(&row)
            .map_err(|e| ForecastError::Inference(format!("{:#}", e)))?;
        Ok(f64::from(prediction))
    }
}
