//! In-memory historical tables

use super::DatasetProvider;
use crate::error::{ForecastError, Result};
use crate::models::{FeatureRecord, StoreDeptStatistics, StoreInfo, StoreType};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Row of the store metadata table
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRow {
    pub store: u32,
    pub store_type: StoreType,
    pub size: u32,
}

/// Row of the exogenous features table; `None` marks a missing value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    pub store: u32,
    pub date: Option<NaiveDate>,
    pub temperature: Option<f64>,
    pub fuel_price: Option<f64>,
    pub markdowns: [Option<f64>; 5],
    pub cpi: Option<f64>,
    pub unemployment: Option<f64>,
    pub is_holiday: Option<bool>,
}

/// Row of the training sales history
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRow {
    pub store: u32,
    pub dept: u32,
    pub weekly_sales: f64,
}

/// Global medians used to backfill missing exogenous values
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ExogenousMedians {
    temperature: f64,
    fuel_price: f64,
    cpi: f64,
    unemployment: f64,
}

/// Immutable in-memory copy of the store, feature and sales tables
#[derive(Debug, Clone)]
pub struct Dataset {
    stores: HashMap<u32, StoreInfo>,
    /// Per-store feature rows, in source order
    features: HashMap<u32, Vec<(NaiveDate, FeatureRow)>>,
    sales: HashMap<(u32, u32), Vec<f64>>,
    departments: Vec<u32>,
    medians: ExogenousMedians,
}

impl Dataset {
    pub fn new(stores: Vec<StoreRow>, features: Vec<FeatureRow>, sales: Vec<SalesRow>) -> Self {
        let medians = ExogenousMedians {
            temperature: column_median(features.iter().filter_map(|r| r.temperature)),
            fuel_price: column_median(features.iter().filter_map(|r| r.fuel_price)),
            cpi: column_median(features.iter().filter_map(|r| r.cpi)),
            unemployment: column_median(features.iter().filter_map(|r| r.unemployment)),
        };

        let stores = stores
            .into_iter()
            .map(|r| {
                (
                    r.store,
                    StoreInfo {
                        store_type: r.store_type,
                        size: r.size,
                    },
                )
            })
            .collect();

        let mut by_store: HashMap<u32, Vec<(NaiveDate, FeatureRow)>> = HashMap::new();
        for row in features {
            // Undated rows can never be matched to a request
            if let Some(date) = row.date {
                by_store.entry(row.store).or_default().push((date, row));
            }
        }

        let mut departments = BTreeSet::new();
        let mut by_pair: HashMap<(u32, u32), Vec<f64>> = HashMap::new();
        for row in sales {
            departments.insert(row.dept);
            by_pair
                .entry((row.store, row.dept))
                .or_default()
                .push(row.weekly_sales);
        }

        Self {
            stores,
            features: by_store,
            sales: by_pair,
            departments: departments.into_iter().collect(),
            medians,
        }
    }

    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    fn to_record(&self, date: NaiveDate, row: &FeatureRow) -> FeatureRecord {
        FeatureRecord {
            date,
            temperature: row.temperature.unwrap_or(self.medians.temperature),
            fuel_price: row.fuel_price.unwrap_or(self.medians.fuel_price),
            cpi: row.cpi.unwrap_or(self.medians.cpi),
            unemployment: row.unemployment.unwrap_or(self.medians.unemployment),
            markdowns: row.markdowns.map(|m| m.unwrap_or(0.0)),
            is_holiday: row.is_holiday.unwrap_or(false),
        }
    }
}

impl DatasetProvider for Dataset {
    fn store_info(&self, store: u32) -> Result<StoreInfo> {
        self.stores
            .get(&store)
            .copied()
            .ok_or_else(|| ForecastError::not_found(format!("Store {}", store)))
    }

    fn nearest_features(&self, store: u32, date: NaiveDate) -> Result<FeatureRecord> {
        let rows = self
            .features
            .get(&store)
            .filter(|rows| !rows.is_empty())
            .ok_or_else(|| ForecastError::not_found(format!("Features for store {}", store)))?;

        if let Some((d, row)) = rows.iter().find(|(d, _)| *d == date) {
            return Ok(self.to_record(*d, row));
        }

        // min_by_key keeps the first of equally distant records
        let (d, row) = rows
            .iter()
            .min_by_key(|(d, _)| d.signed_duration_since(date).num_days().abs())
            .ok_or_else(|| ForecastError::not_found(format!("Features for store {}", store)))?;

        debug!(
            store,
            requested = %date,
            nearest = %d,
            "Using features from nearest date"
        );
        Ok(self.to_record(*d, row))
    }

    fn store_dept_stats(&self, store: u32, dept: u32) -> Result<StoreDeptStatistics> {
        Ok(self
            .sales
            .get(&(store, dept))
            .map(|sales| sales_statistics(sales))
            .unwrap_or_default())
    }

    fn department_domain(&self) -> Result<&[u32]> {
        Ok(&self.departments)
    }
}

/// Max, min, mean, median and sample standard deviation (zero for fewer
/// than two values) of a sales series; all zeros when empty
pub fn sales_statistics(sales: &[f64]) -> StoreDeptStatistics {
    if sales.is_empty() {
        return StoreDeptStatistics::default();
    }
    let n = sales.len() as f64;
    let mean = sales.iter().sum::<f64>() / n;
    let std = if sales.len() > 1 {
        let sum_sq: f64 = sales.iter().map(|v| (v - mean).powi(2)).sum();
        (sum_sq / (n - 1.0)).sqrt()
    } else {
        0.0
    };
    StoreDeptStatistics {
        max: sales.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        min: sales.iter().copied().fold(f64::INFINITY, f64::min),
        mean,
        median: median(sales),
        std,
    }
}

fn column_median(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.filter(|v| !v.is_nan()).collect();
    if values.is_empty() {
        0.0
    } else {
        median(&values)
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn feature(store: u32, day: NaiveDate, temperature: f64) -> FeatureRow {
        FeatureRow {
            store,
            date: Some(day),
            temperature: Some(temperature),
            fuel_price: Some(2.5),
            markdowns: [Some(10.0), None, Some(5.0), None, None],
            cpi: Some(211.0),
            unemployment: Some(8.1),
            is_holiday: Some(false),
        }
    }

    fn dataset() -> Dataset {
        let mut gap = feature(1, date(2012, 1, 6), 40.0);
        gap.cpi = None;
        gap.unemployment = None;
        gap.is_holiday = None;
        Dataset::new(
            vec![StoreRow {
                store: 1,
                store_type: StoreType::A,
                size: 151_315,
            }],
            vec![
                feature(1, date(2012, 1, 13), 30.0),
                feature(1, date(2012, 1, 27), 50.0),
                gap,
                feature(2, date(2012, 1, 13), 60.0),
            ],
            vec![
                SalesRow { store: 1, dept: 3, weekly_sales: 100.0 },
                SalesRow { store: 1, dept: 3, weekly_sales: 300.0 },
                SalesRow { store: 1, dept: 1, weekly_sales: 50.0 },
            ],
        )
    }

    #[test]
    fn test_store_info() {
        let ds = dataset();
        assert_eq!(ds.store_info(1).unwrap().size, 151_315);
        assert!(matches!(ds.store_info(9), Err(ForecastError::NotFound { .. })));
    }

    #[test]
    fn test_exact_match_used_verbatim() {
        let record = dataset().nearest_features(1, date(2012, 1, 27)).unwrap();
        assert_eq!(record.date, date(2012, 1, 27));
        assert_eq!(record.temperature, 50.0);
        assert_eq!(record.markdowns, [10.0, 0.0, 5.0, 0.0, 0.0]);
        assert_eq!(record.total_markdown(), 15.0);
    }

    #[test]
    fn test_nearest_date_selected() {
        let record = dataset().nearest_features(1, date(2012, 1, 25)).unwrap();
        assert_eq!(record.date, date(2012, 1, 27));
    }

    #[test]
    fn test_equidistant_resolves_to_first_in_source_order() {
        // 2012-01-20 is 7 days from both 2012-01-13 and 2012-01-27
        let record = dataset().nearest_features(1, date(2012, 1, 20)).unwrap();
        assert_eq!(record.date, date(2012, 1, 13));
    }

    #[test]
    fn test_missing_values_backfilled() {
        let record = dataset().nearest_features(1, date(2012, 1, 6)).unwrap();
        // medians over all rows with values: 211.0 and 8.1
        assert_eq!(record.cpi, 211.0);
        assert_eq!(record.unemployment, 8.1);
        assert!(!record.is_holiday);
    }

    #[test]
    fn test_store_without_features() {
        assert!(matches!(
            dataset().nearest_features(7, date(2012, 1, 6)),
            Err(ForecastError::NotFound { .. })
        ));
    }

    #[test]
    fn test_stats_for_pair() {
        let stats = dataset().store_dept_stats(1, 3).unwrap();
        assert_eq!(stats.max, 300.0);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.mean, 200.0);
        assert_eq!(stats.median, 200.0);
        assert!((stats.std - 141.421_356_237).abs() < 1e-6);
    }

    #[test]
    fn test_stats_without_history_are_zero() {
        let stats = dataset().store_dept_stats(1, 99).unwrap();
        assert_eq!(stats, StoreDeptStatistics::default());
    }

    #[test]
    fn test_single_sale_has_zero_std() {
        let stats = dataset().store_dept_stats(1, 1).unwrap();
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.median, 50.0);
    }

    #[test]
    fn test_department_domain_sorted() {
        assert_eq!(dataset().department_domain().unwrap(), &[1, 3]);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
    }
}
