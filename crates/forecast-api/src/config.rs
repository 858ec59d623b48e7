//! Service configuration

use anyhow::{Context, Result};
use forecast_lib::ServiceArtifacts;
use serde::Deserialize;
use std::path::PathBuf;

/// Service configuration
///
/// Read from an optional `forecast.toml` in the working directory, then
/// overridden by `FORECAST_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    /// Instance name attached to structured log records
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// HTTP listener port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory holding `config.json` and the `model_fold_{i}.txt` boosters
    #[serde(default = "default_demand_model_dir")]
    pub demand_model_dir: PathBuf,

    /// Directory holding `encoding_dicts.json`
    #[serde(default = "default_demand_encoder_dir")]
    pub demand_encoder_dir: PathBuf,

    #[serde(default = "default_demand_folds")]
    pub demand_folds: usize,

    /// Directory holding the price strategy artifacts
    #[serde(default = "default_price_model_dir")]
    pub price_model_dir: PathBuf,

    /// Directory holding `stores.csv`, `features.csv` and `train.csv`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Load every artifact right after the listener is bound
    #[serde(default = "default_warm_up")]
    pub warm_up: bool,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "forecast".to_string())
}

fn default_api_port() -> u16 {
    8000
}

fn default_demand_model_dir() -> PathBuf {
    PathBuf::from("models/demand/weight")
}

fn default_demand_encoder_dir() -> PathBuf {
    PathBuf::from("models/demand/encoders")
}

fn default_demand_folds() -> usize {
    10
}

fn default_price_model_dir() -> PathBuf {
    PathBuf::from("models/price")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_warm_up() -> bool {
    true
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            demand_model_dir: default_demand_model_dir(),
            demand_encoder_dir: default_demand_encoder_dir(),
            demand_folds: default_demand_folds(),
            price_model_dir: default_price_model_dir(),
            data_dir: default_data_dir(),
            warm_up: default_warm_up(),
        }
    }
}

impl ForecastConfig {
    /// Load configuration from environment and config file
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("forecast").required(false))
            .add_source(config::Environment::with_prefix("FORECAST"))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid forecast configuration")
    }

    /// Artifact locations for the stock strategy set
    pub fn artifacts(&self) -> ServiceArtifacts {
        ServiceArtifacts {
            demand_model_dir: self.demand_model_dir.clone(),
            demand_encodings: self.demand_encoder_dir.join("encoding_dicts.json"),
            demand_folds: self.demand_folds,
            price_linear_model: self.price_model_dir.join("linear_regressor.json"),
            price_dnn_descriptor: self.price_model_dir.join("dnn_regressor.json"),
            price_dnn_weights: self.price_model_dir.join("dnn_regressor.onnx"),
            data_dir: self.data_dir.clone(),
        }
    }
}
