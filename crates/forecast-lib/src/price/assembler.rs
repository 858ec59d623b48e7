//! Historical-context feature assembly for the price models
//!
//! A price request only names a store, a department and a date. Everything
//! else the models were trained on is reconstructed from history: the store's
//! metadata, the exogenous record nearest to the date, and sales statistics
//! of the (store, department) pair.

use super::{dept_column, store_column, type_column, STORE_DOMAIN};
use crate::dataset::DatasetProvider;
use crate::error::Result;
use crate::models::{FeatureSchema, FeatureVector, StoreType};
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;
use tracing::debug;

/// Assembled record plus the non-numeric context that travels with it
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledFeatures {
    pub features: FeatureVector,
    pub date: NaiveDate,
    pub store_type: StoreType,
    /// Date of the exogenous record that was used
    pub record_date: NaiveDate,
}

/// Builds price feature vectors from a dataset provider
pub struct PriceFeatureAssembler {
    provider: Arc<dyn DatasetProvider>,
}

impl PriceFeatureAssembler {
    pub fn new(provider: Arc<dyn DatasetProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn DatasetProvider> {
        &self.provider
    }

    /// Base record followed by the store, department and store-type
    /// indicator blocks. `is_holiday` overrides the record's flag.
    pub fn assemble(
        &self,
        store: u32,
        dept: u32,
        date: NaiveDate,
        is_holiday: Option<bool>,
    ) -> Result<AssembledFeatures> {
        let info = self.provider.store_info(store)?;
        let record = self.provider.nearest_features(store, date)?;
        let stats = self.provider.store_dept_stats(store, dept)?;
        let departments = self.provider.department_domain()?;

        let holiday = is_holiday.unwrap_or(record.is_holiday);
        if record.date != date {
            debug!(store, requested = %date, used = %record.date, "Exogenous record from nearest date");
        }

        let mut features =
            FeatureVector::with_capacity(17 + STORE_DOMAIN.count() + departments.len() + 3);
        features.insert("Store", f64::from(store));
        features.insert("Dept", f64::from(dept));
        features.insert("IsHoliday", if holiday { 1.0 } else { 0.0 });
        features.insert("Year", f64::from(date.year()));
        features.insert("Month", f64::from(date.month()));
        features.insert("Week", f64::from(date.iso_week().week()));
        features.insert("Size", f64::from(info.size));
        features.insert("Temperature", record.temperature);
        features.insert("Fuel_Price", record.fuel_price);
        features.insert("CPI", record.cpi);
        features.insert("Unemployment", record.unemployment);
        features.insert("Total_MarkDown", record.total_markdown());
        features.insert("max", stats.max);
        features.insert("min", stats.min);
        features.insert("mean", stats.mean);
        features.insert("median", stats.median);
        features.insert("std", stats.std);

        for s in STORE_DOMAIN {
            features.insert(store_column(s), indicator(s == store));
        }
        for &d in departments {
            features.insert(dept_column(d), indicator(d == dept));
        }
        for t in StoreType::ALL {
            features.insert(type_column(t), indicator(t == info.store_type));
        }

        Ok(AssembledFeatures {
            features,
            date,
            store_type: info.store_type,
            record_date: record.date,
        })
    }

    /// Assemble and reconcile with a model's declared columns
    pub fn assemble_for(
        &self,
        schema: &FeatureSchema,
        store: u32,
        dept: u32,
        date: NaiveDate,
        is_holiday: Option<bool>,
    ) -> Result<FeatureVector> {
        let assembled = self.assemble(store, dept, date, is_holiday)?;
        Ok(schema.align(&assembled.features))
    }
}

fn indicator(hit: bool) -> f64 {
    if hit {
        1.0
    } else {
        0.0
    }
}
