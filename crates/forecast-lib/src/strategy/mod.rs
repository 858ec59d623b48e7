//! Prediction strategies
//!
//! A strategy is an interchangeable prediction backend selected by name.
//! Every strategy owns its artifacts and loads them at most once, on first
//! use or during warm-up. A failed load is terminal: the recorded error is
//! returned to every later caller.

mod dnn;
mod guard;
mod lightgbm;
mod linear;

pub use dnn::{DnnArtifacts, DnnDescriptor, DnnStrategy, DNN_INPUT_DIM};
pub use guard::{LoadGuard, LoadState};
pub use lightgbm::{
    Booster, LightGbmBooster, TreeEnsembleArtifacts, TreeEnsembleStrategy, DEFAULT_FOLD_COUNT,
};
pub use linear::{LinearArtifacts, LinearModel, LinearStrategy};

use crate::error::Result;
use crate::models::{FeatureSchema, FeatureVector};
use crate::price::dept_column;

/// Curated leading columns shared by the price models, in ranking order
pub const PRICE_BASE_COLUMNS: [&str; 15] = [
    "mean",
    "median",
    "Week",
    "Temperature",
    "max",
    "CPI",
    "Fuel_Price",
    "min",
    "Unemployment",
    "std",
    "Month",
    "Total_MarkDown",
    "IsHoliday",
    "Size",
    "Year",
];

/// Department indicators that follow the base columns in the curated ordering
pub const PRICE_CURATED_DEPTS: [u32; 8] = [1, 3, 5, 9, 11, 16, 18, 56];

/// Curated price ordering: base columns followed by the curated departments
pub fn curated_price_columns() -> Vec<String> {
    PRICE_BASE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(PRICE_CURATED_DEPTS.iter().map(|d| dept_column(*d)))
        .collect()
}

/// Trait for prediction backends
pub trait Strategy: Send + Sync {
    /// Registry name of the strategy
    fn name(&self) -> &str;

    /// Load artifacts if not already loaded; safe to call concurrently
    fn load(&self) -> Result<()>;

    /// Current position in the load state machine
    fn state(&self) -> LoadState;

    /// Input contract of the loaded model (loads on first call)
    fn schema(&self) -> Result<&FeatureSchema>;

    /// Score one feature vector (loads on first call)
    fn predict(&self, features: &FeatureVector) -> Result<f64>;

    fn is_loaded(&self) -> bool {
        self.state() == LoadState::Loaded
    }
}
