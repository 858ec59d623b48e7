//! Dataset access for price feature assembly
//!
//! The assembler only sees the [`DatasetProvider`] trait. [`Dataset`] holds
//! the three historical tables in memory; [`CsvDatasetProvider`] loads them
//! from the CSV exports once, on first use.

mod files;
mod tables;

pub use files::{CsvDatasetProvider, DatasetPaths};
pub use tables::{sales_statistics, Dataset, FeatureRow, SalesRow, StoreRow};

use crate::error::Result;
use crate::models::{FeatureRecord, StoreDeptStatistics, StoreInfo};
use crate::strategy::LoadState;
use chrono::NaiveDate;

/// Trait for historical data sources
pub trait DatasetProvider: Send + Sync {
    /// Store type and size; unknown store is `NotFound`
    fn store_info(&self, store: u32) -> Result<StoreInfo>;

    /// Exogenous record for the date, or the nearest one for that store.
    /// `NotFound` when the store has no records at all.
    fn nearest_features(&self, store: u32, date: NaiveDate) -> Result<FeatureRecord>;

    /// Weekly sales statistics; all zeros when the pair has no history
    fn store_dept_stats(&self, store: u32, dept: u32) -> Result<StoreDeptStatistics>;

    /// Distinct department ids seen in training history, ascending
    fn department_domain(&self) -> Result<&[u32]>;

    /// Bring the tables into memory ahead of the first request
    fn load(&self) -> Result<()> {
        Ok(())
    }

    fn state(&self) -> LoadState {
        LoadState::Loaded
    }
}
