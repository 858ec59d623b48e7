//! Core data models for the forecast service

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordered sequence of named numeric features
///
/// Inserting a name that is already present overwrites the value in place,
/// so column order is always first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "FeatureColumns")]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct FeatureColumns {
    names: Vec<String>,
    values: Vec<f64>,
}

impl From<FeatureColumns> for FeatureVector {
    fn from(columns: FeatureColumns) -> Self {
        columns.names.into_iter().zip(columns.values).collect()
    }
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            names: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&idx) => self.values[idx] = value,
            None => {
                self.index.insert(name.clone(), self.names.len());
                self.names.push(name);
                self.values.push(value);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.position(name).map(|idx| self.values[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut vector = FeatureVector::new();
        for (name, value) in iter {
            vector.insert(name, value);
        }
        vector
    }
}

/// Declared input contract of a loaded model: ordered column names plus
/// the subset the model treats as categorical
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub categorical: Vec<String>,
}

impl FeatureSchema {
    pub fn new(version: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            version: version.into(),
            columns,
            categorical: Vec::new(),
        }
    }

    pub fn with_categorical(mut self, categorical: Vec<String>) -> Self {
        self.categorical = categorical;
        self
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Pick the declared columns in order, failing on the first one absent
    pub fn select(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        let index: HashMap<&str, f64> = features.iter().collect();
        self.columns
            .iter()
            .map(|col| {
                index
                    .get(col.as_str())
                    .copied()
                    .ok_or_else(|| ForecastError::validation(format!("Missing feature: {}", col)))
            })
            .collect()
    }

    /// Reconcile a produced record with the declared columns: absent columns
    /// become 0.0, columns the model does not declare are dropped
    pub fn align(&self, features: &FeatureVector) -> FeatureVector {
        let index: HashMap<&str, f64> = features.iter().collect();
        self.columns
            .iter()
            .map(|col| (col.clone(), index.get(col.as_str()).copied().unwrap_or(0.0)))
            .collect()
    }

    pub fn categorical_indices(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, col)| self.categorical.contains(col))
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// Store format category from the store metadata table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreType {
    A,
    B,
    C,
}

impl StoreType {
    pub const ALL: [StoreType; 3] = [StoreType::A, StoreType::B, StoreType::C];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreType::A => "A",
            StoreType::B => "B",
            StoreType::C => "C",
        }
    }
}

impl std::str::FromStr for StoreType {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "A" => Ok(StoreType::A),
            "B" => Ok(StoreType::B),
            "C" => Ok(StoreType::C),
            other => Err(ForecastError::validation(format!(
                "Unknown store type '{}'",
                other
            ))),
        }
    }
}

/// Store metadata
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoreInfo {
    pub store_type: StoreType,
    pub size: u32,
}

/// Snapshot of exogenous variables for a store at one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub date: NaiveDate,
    pub temperature: f64,
    pub fuel_price: f64,
    pub cpi: f64,
    pub unemployment: f64,
    pub markdowns: [f64; 5],
    pub is_holiday: bool,
}

impl FeatureRecord {
    pub fn total_markdown(&self) -> f64 {
        self.markdowns.iter().sum()
    }
}

/// Aggregate statistics of historical weekly sales for a (store, dept) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreDeptStatistics {
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
}

/// Demand forecasting request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandRequest {
    /// Week start in `dd/mm/yy` format
    pub week: String,
    pub store_id: i64,
    pub sku_id: i64,
    pub base_price: f64,
    #[serde(default)]
    pub total_price: Option<f64>,
    #[serde(default)]
    pub is_featured_sku: u8,
    #[serde(default)]
    pub is_display_sku: u8,
    #[serde(default)]
    pub strategy: Option<String>,
}

/// Demand forecasting response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandResponse {
    pub predicted_units_sold: f64,
    pub record_id: Option<i64>,
    pub strategy_used: String,
    pub status: String,
}

/// Price (weekly sales) forecasting request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRequest {
    #[serde(rename = "Store")]
    pub store: u32,
    #[serde(rename = "Dept")]
    pub dept: u32,
    /// Target date in `YYYY-MM-DD` format
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "IsHoliday", default)]
    pub is_holiday: Option<bool>,
    #[serde(default)]
    pub strategy: Option<String>,
}

/// Price (weekly sales) forecasting response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceResponse {
    pub predicted_weekly_sales: f64,
    pub store: u32,
    pub dept: u32,
    pub date: String,
    pub strategy_used: String,
    pub status: String,
}

impl DemandRequest {
    /// Field constraints of the demand endpoint
    pub fn validate(&self) -> Result<()> {
        if !(self.base_price > 0.0) {
            return Err(ForecastError::validation("base_price must be greater than 0"));
        }
        if let Some(total) = self.total_price {
            if !(total > 0.0) {
                return Err(ForecastError::validation("total_price must be greater than 0"));
            }
        }
        if self.is_featured_sku > 1 {
            return Err(ForecastError::validation("is_featured_sku must be 0 or 1"));
        }
        if self.is_display_sku > 1 {
            return Err(ForecastError::validation("is_display_sku must be 0 or 1"));
        }
        Ok(())
    }
}

impl PriceRequest {
    /// Field constraints of the price endpoint
    pub fn validate(&self) -> Result<()> {
        if self.store < 1 {
            return Err(ForecastError::validation("Store must be at least 1"));
        }
        if self.dept < 1 {
            return Err(ForecastError::validation("Dept must be at least 1"));
        }
        Ok(())
    }
}
