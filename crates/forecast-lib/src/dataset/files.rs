//! CSV-backed dataset provider

use super::tables::{Dataset, FeatureRow, SalesRow, StoreRow};
use super::DatasetProvider;
use crate::error::{ForecastError, Result};
use crate::models::{FeatureRecord, StoreDeptStatistics, StoreInfo, StoreType};
use crate::strategy::{LoadGuard, LoadState};
use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Locations of the three historical tables
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetPaths {
    pub stores: PathBuf,
    pub features: PathBuf,
    pub train: PathBuf,
}

impl DatasetPaths {
    /// `stores.csv`, `features.csv` and `train.csv` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            stores: dir.join("stores.csv"),
            features: dir.join("features.csv"),
            train: dir.join("train.csv"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StoreCsvRow {
    #[serde(rename = "Store")]
    store: u32,
    #[serde(rename = "Type")]
    store_type: String,
    #[serde(rename = "Size")]
    size: u32,
}

// Missing values are written as `NA`; `invalid_option` maps them to None
#[derive(Debug, Deserialize)]
struct FeatureCsvRow {
    #[serde(rename = "Store")]
    store: u32,
    #[serde(rename = "Date", default, deserialize_with = "csv::invalid_option")]
    date: Option<NaiveDate>,
    #[serde(rename = "Temperature", default, deserialize_with = "csv::invalid_option")]
    temperature: Option<f64>,
    #[serde(rename = "Fuel_Price", default, deserialize_with = "csv::invalid_option")]
    fuel_price: Option<f64>,
    #[serde(rename = "MarkDown1", default, deserialize_with = "csv::invalid_option")]
    markdown1: Option<f64>,
    #[serde(rename = "MarkDown2", default, deserialize_with = "csv::invalid_option")]
    markdown2: Option<f64>,
    #[serde(rename = "MarkDown3", default, deserialize_with = "csv::invalid_option")]
    markdown3: Option<f64>,
    #[serde(rename = "MarkDown4", default, deserialize_with = "csv::invalid_option")]
    markdown4: Option<f64>,
    #[serde(rename = "MarkDown5", default, deserialize_with = "csv::invalid_option")]
    markdown5: Option<f64>,
    #[serde(rename = "CPI", default, deserialize_with = "csv::invalid_option")]
    cpi: Option<f64>,
    #[serde(rename = "Unemployment", default, deserialize_with = "csv::invalid_option")]
    unemployment: Option<f64>,
    #[serde(rename = "IsHoliday", default, deserialize_with = "holiday_flag")]
    is_holiday: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct SalesCsvRow {
    #[serde(rename = "Store")]
    store: u32,
    #[serde(rename = "Dept")]
    dept: u32,
    #[serde(rename = "Weekly_Sales", default, deserialize_with = "csv::invalid_option")]
    weekly_sales: Option<f64>,
}

/// Accepts `TRUE`/`FALSE` in any case as well as `1`/`0`
fn holiday_flag<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<bool>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.and_then(|s| match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }))
}

fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    reader
        .deserialize()
        .enumerate()
        .map(|(idx, row)| {
            row.with_context(|| format!("Malformed row {} in {}", idx + 2, path.display()))
        })
        .collect()
}

fn read_dataset(paths: &DatasetPaths) -> anyhow::Result<Dataset> {
    let stores = read_rows::<StoreCsvRow>(&paths.stores)?
        .into_iter()
        .map(|r| {
            let store_type = r
                .store_type
                .parse::<StoreType>()
                .with_context(|| format!("Store {} in {}", r.store, paths.stores.display()))?;
            Ok(StoreRow {
                store: r.store,
                store_type,
                size: r.size,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let features = read_rows::<FeatureCsvRow>(&paths.features)?
        .into_iter()
        .map(|r| FeatureRow {
            store: r.store,
            date: r.date,
            temperature: r.temperature,
            fuel_price: r.fuel_price,
            markdowns: [r.markdown1, r.markdown2, r.markdown3, r.markdown4, r.markdown5],
            cpi: r.cpi,
            unemployment: r.unemployment,
            is_holiday: r.is_holiday,
        })
        .collect();

    let sales = read_rows::<SalesCsvRow>(&paths.train)?
        .into_iter()
        .filter_map(|r| {
            r.weekly_sales.map(|weekly_sales| SalesRow {
                store: r.store,
                dept: r.dept,
                weekly_sales,
            })
        })
        .collect();

    Ok(Dataset::new(stores, features, sales))
}

/// Dataset provider reading the Walmart CSV exports on first use
pub struct CsvDatasetProvider {
    paths: DatasetPaths,
    dataset: LoadGuard<Dataset>,
}

impl CsvDatasetProvider {
    pub fn new(paths: DatasetPaths) -> Self {
        Self {
            paths,
            dataset: LoadGuard::new(),
        }
    }

    fn dataset(&self) -> Result<&Dataset> {
        self.dataset.get_or_load(|| {
            let start = Instant::now();
            let dataset = read_dataset(&self.paths)
                .map_err(|e| ForecastError::configuration(format!("{:#}", e)))?;
            info!(
                stores = dataset.store_count(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Loaded historical dataset"
            );
            Ok(dataset)
        })
    }
}

impl DatasetProvider for CsvDatasetProvider {
    fn store_info(&self, store: u32) -> Result<StoreInfo> {
        self.dataset()?.store_info(store)
    }

    fn nearest_features(&self, store: u32, date: NaiveDate) -> Result<FeatureRecord> {
        self.dataset()?.nearest_features(store, date)
    }

    fn store_dept_stats(&self, store: u32, dept: u32) -> Result<StoreDeptStatistics> {
        self.dataset()?.store_dept_stats(store, dept)
    }

    fn department_domain(&self) -> Result<&[u32]> {
        self.dataset()?.department_domain()
    }

    fn load(&self) -> Result<()> {
        self.dataset().map(|_| ())
    }

    fn state(&self) -> LoadState {
        self.dataset.state()
    }
}
