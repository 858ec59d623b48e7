//! Forecast library for demand and weekly-sales prediction
//!
//! This crate provides the core functionality for:
//! - Named, lazily loaded prediction strategies and their registry
//! - Demand feature encoding (target encodings, calendar fields)
//! - Price feature assembly from historical store data
//! - Prediction orchestration
//! - Health checks and observability

pub mod dataset;
pub mod demand;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod price;
pub mod registry;
pub mod service;
pub mod strategy;

pub use error::{ForecastError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ForecastMetrics, StructuredLogger};
pub use registry::{LoadReport, StrategyRegistry};
pub use service::{PredictionService, ServiceArtifacts, WarmUpReport, DEMAND_DOMAIN, PRICE_DOMAIN};
pub use strategy::{LoadState, Strategy};
