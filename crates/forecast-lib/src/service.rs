//! Prediction orchestration
//!
//! Sequences each domain's pipeline: resolve the strategy, make sure its
//! artifacts are loaded, prepare features, score. Every outcome is recorded
//! in metrics and the structured log.

use crate::dataset::{CsvDatasetProvider, DatasetPaths, DatasetProvider};
use crate::demand::{parse_iso_date, DemandArtifacts, DemandFeatureEncoder, DemandInput};
use crate::error::{ForecastError, Result};
use crate::health::{components, ComponentHealth};
use crate::models::{DemandRequest, DemandResponse, PriceRequest, PriceResponse};
use crate::observability::{ForecastMetrics, StructuredLogger};
use crate::price::PriceFeatureAssembler;
use crate::registry::{LoadReport, StrategyRegistry};
use crate::strategy::{
    DnnArtifacts, DnnStrategy, LinearArtifacts, LinearStrategy, LoadState,
    TreeEnsembleArtifacts, TreeEnsembleStrategy,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub const DEMAND_DOMAIN: &str = "demand";
pub const PRICE_DOMAIN: &str = "price";

const STATUS_SUCCESS: &str = "success";

/// Artifact locations for the stock strategy set
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceArtifacts {
    /// Fold boosters and `config.json`
    pub demand_model_dir: PathBuf,
    /// `encoding_dicts.json`
    pub demand_encodings: PathBuf,
    pub demand_folds: usize,
    pub price_linear_model: PathBuf,
    pub price_dnn_descriptor: PathBuf,
    pub price_dnn_weights: PathBuf,
    /// `stores.csv`, `features.csv` and `train.csv`
    pub data_dir: PathBuf,
}

/// Outcome of loading everything ahead of the first request
#[derive(Debug, Clone)]
pub struct WarmUpReport {
    pub encoder: Result<()>,
    pub dataset: Result<()>,
    pub demand: Vec<LoadReport>,
    pub price: Vec<LoadReport>,
}

impl WarmUpReport {
    pub fn failures(&self) -> usize {
        let strategies = self
            .demand
            .iter()
            .chain(&self.price)
            .filter(|r| r.result.is_err())
            .count();
        strategies + usize::from(self.encoder.is_err()) + usize::from(self.dataset.is_err())
    }
}

/// Entry point for both forecasting domains
pub struct PredictionService {
    demand: Arc<StrategyRegistry>,
    encoder: Arc<DemandFeatureEncoder>,
    price: Arc<StrategyRegistry>,
    assembler: PriceFeatureAssembler,
    metrics: ForecastMetrics,
    logger: StructuredLogger,
}

impl PredictionService {
    pub fn new(
        demand: Arc<StrategyRegistry>,
        encoder: Arc<DemandFeatureEncoder>,
        price: Arc<StrategyRegistry>,
        provider: Arc<dyn DatasetProvider>,
    ) -> Self {
        Self {
            demand,
            encoder,
            price,
            assembler: PriceFeatureAssembler::new(provider),
            metrics: ForecastMetrics::new(),
            logger: StructuredLogger::new("forecast"),
        }
    }

    /// Stock strategy set over on-disk artifacts: `lightgbm` for demand,
    /// `linear` (default) and `dnn` for price. Nothing is read until first
    /// use or [`warm_up`](Self::warm_up).
    pub fn from_artifacts(artifacts: &ServiceArtifacts) -> Result<Self> {
        let provider: Arc<dyn DatasetProvider> =
            Arc::new(CsvDatasetProvider::new(DatasetPaths::in_dir(&artifacts.data_dir)));

        let mut demand = StrategyRegistry::new();
        demand.register(
            "lightgbm",
            Arc::new(TreeEnsembleStrategy::new(
                "lightgbm",
                TreeEnsembleArtifacts::in_dir(&artifacts.demand_model_dir)
                    .with_folds(artifacts.demand_folds),
            )),
        );
        demand.set_default("lightgbm")?;

        let encoder = DemandFeatureEncoder::from_artifacts(DemandArtifacts {
            config_path: artifacts.demand_model_dir.join("config.json"),
            encodings_path: artifacts.demand_encodings.clone(),
        });

        let mut price = StrategyRegistry::new();
        price.register(
            "linear",
            Arc::new(LinearStrategy::new(
                "linear",
                LinearArtifacts {
                    model_path: artifacts.price_linear_model.clone(),
                },
                Some(provider.clone()),
            )),
        );
        price.register(
            "dnn",
            Arc::new(DnnStrategy::new(
                "dnn",
                DnnArtifacts {
                    descriptor_path: artifacts.price_dnn_descriptor.clone(),
                    weights_path: artifacts.price_dnn_weights.clone(),
                },
            )),
        );
        price.set_default("linear")?;

        Ok(Self::new(
            Arc::new(demand),
            Arc::new(encoder),
            Arc::new(price),
            provider,
        ))
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn demand_registry(&self) -> &StrategyRegistry {
        &self.demand
    }

    pub fn price_registry(&self) -> &StrategyRegistry {
        &self.price
    }

    pub fn predict_demand(&self, request: &DemandRequest) -> Result<DemandResponse> {
        let start = Instant::now();
        let outcome = self.run_demand(request);
        self.record(DEMAND_DOMAIN, start, &outcome);
        outcome.map(|(strategy, value)| DemandResponse {
            predicted_units_sold: value,
            record_id: None,
            strategy_used: strategy,
            status: STATUS_SUCCESS.to_string(),
        })
    }

    fn run_demand(&self, request: &DemandRequest) -> Result<(String, f64)> {
        request.validate()?;
        let strategy = self.demand.get(request.strategy.as_deref())?;
        strategy.load()?;

        let features = self.encoder.encode(&DemandInput {
            week: &request.week,
            store_id: request.store_id,
            sku_id: request.sku_id,
            base_price: request.base_price,
            total_price: request.total_price,
            is_featured_sku: request.is_featured_sku,
            is_display_sku: request.is_display_sku,
        })?;
        debug!(features = features.len(), "Encoded demand request");

        let value = strategy.predict(&features)?;
        Ok((strategy.name().to_string(), value))
    }

    pub fn predict_price(&self, request: &PriceRequest) -> Result<PriceResponse> {
        let start = Instant::now();
        let outcome = self.run_price(request);
        self.record(PRICE_DOMAIN, start, &outcome);
        outcome.map(|(strategy, value)| PriceResponse {
            predicted_weekly_sales: value,
            store: request.store,
            dept: request.dept,
            date: request.date.clone(),
            strategy_used: strategy,
            status: STATUS_SUCCESS.to_string(),
        })
    }

    fn run_price(&self, request: &PriceRequest) -> Result<(String, f64)> {
        request.validate()?;
        let date = parse_iso_date(&request.date)?;
        let strategy = self.price.get(request.strategy.as_deref())?;
        let schema = strategy.schema()?;

        let features = self.assembler.assemble_for(
            schema,
            request.store,
            request.dept,
            date,
            request.is_holiday,
        )?;
        let value = strategy.predict(&features)?;
        Ok((strategy.name().to_string(), value))
    }

    fn record(&self, domain: &str, start: Instant, outcome: &Result<(String, f64)>) {
        let elapsed = start.elapsed();
        match outcome {
            Ok((strategy, value)) => {
                self.metrics
                    .observe_prediction(domain, strategy, elapsed.as_secs_f64());
                self.logger
                    .log_prediction(domain, strategy, *value, elapsed.as_micros() as u64);
            }
            Err(e) => {
                self.metrics.inc_prediction_errors(domain, e.kind());
                if e.is_client_error() {
                    debug!(domain, error = %e, "Rejected prediction request");
                } else {
                    warn!(domain, kind = e.kind(), error = %e, "Prediction failed");
                }
            }
        }
    }

    /// Load every strategy, the demand encoder and the dataset. Failures are
    /// recorded per component and never abort the others.
    pub fn warm_up(&self) -> WarmUpReport {
        let encoder = self.encoder.load();
        let dataset = self.assembler.provider().load();
        if let Err(e) = &dataset {
            warn!(error = %e, "Dataset failed to load");
        }
        let demand = self.warm_registry(DEMAND_DOMAIN, &self.demand);
        let price = self.warm_registry(PRICE_DOMAIN, &self.price);
        WarmUpReport {
            encoder,
            dataset,
            demand,
            price,
        }
    }

    fn warm_registry(&self, domain: &str, registry: &StrategyRegistry) -> Vec<LoadReport> {
        let reports = registry.load_all();
        for report in &reports {
            let error = report.result.as_ref().err().map(ToString::to_string);
            self.metrics
                .observe_strategy_load(domain, &report.name, report.elapsed_ms as f64 / 1000.0);
            self.logger.log_strategy_load(
                domain,
                &report.name,
                report.elapsed_ms as u64,
                error.as_deref(),
            );
        }
        let loaded = reports.iter().filter(|r| r.result.is_ok()).count();
        self.metrics.set_strategies_loaded(domain, loaded as i64);
        reports
    }

    /// Current health of every strategy plus the shared artifacts. Never
    /// triggers a load.
    pub fn component_health(&self) -> Vec<(String, ComponentHealth)> {
        let mut out = Vec::new();
        for (domain, registry) in [(DEMAND_DOMAIN, &self.demand), (PRICE_DOMAIN, &self.price)] {
            for (name, strategy) in registry.iter() {
                out.push((
                    components::strategy(domain, name),
                    load_health(strategy.state(), || strategy.load()),
                ));
            }
        }
        out.push((
            components::DEMAND_ENCODER.to_string(),
            load_health(self.encoder.load_state(), || self.encoder.load()),
        ));
        let provider = self.assembler.provider();
        out.push((
            components::DATASET.to_string(),
            load_health(provider.state(), || provider.load()),
        ));
        out
    }
}

// Once failed, load() only returns the recorded error
fn load_health(state: LoadState, recorded: impl FnOnce() -> Result<()>) -> ComponentHealth {
    let failure: Option<ForecastError> = match state {
        LoadState::Failed => recorded().err(),
        _ => None,
    };
    ComponentHealth::from_load(state, failure.as_ref())
}
