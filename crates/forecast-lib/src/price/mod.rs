//! Price (weekly sales) feature preparation

mod assembler;

pub use assembler::{AssembledFeatures, PriceFeatureAssembler};

use crate::models::StoreType;
use std::ops::RangeInclusive;

/// Store ids covered by the `Store_<n>` indicator block
pub const STORE_DOMAIN: RangeInclusive<u32> = 1..=45;

pub fn store_column(store: u32) -> String {
    format!("Store_{}", store)
}

pub fn dept_column(dept: u32) -> String {
    format!("Dept_{}", dept)
}

pub fn type_column(store_type: StoreType) -> String {
    format!("Type_{}", store_type.as_str())
}
