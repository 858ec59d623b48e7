//! Demand feature encoding
//!
//! Turns raw demand request fields into the named feature vector the
//! gradient-boosted ensemble was trained on: price deltas, promotion flags,
//! target-encoded store/SKU ids, and calendar fields of the week.

use super::calendar::{parse_week_label, WeekCalendar};
use super::encoding::EncodingTables;
use crate::error::{ForecastError, Result};
use crate::models::{FeatureSchema, FeatureVector};
use crate::strategy::{LoadGuard, LoadState};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Preprocessing descriptor shipped with the demand model (`config.json`)
#[derive(Debug, Clone, Deserialize)]
pub struct DemandModelConfig {
    #[serde(default = "default_version")]
    pub version: String,
    pub feature_columns: Vec<String>,
    #[serde(default)]
    pub categorical_columns: Vec<String>,
    #[serde(with = "iso_date")]
    pub base_date: NaiveDate,
    #[serde(default)]
    pub time_features: Vec<String>,
}

fn default_version() -> String {
    "unversioned".to_string()
}

mod iso_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(serde::de::Error::custom)
    }
}

impl DemandModelConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ForecastError::configuration(format!(
                "Failed to read demand config {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            ForecastError::configuration(format!(
                "Failed to parse demand config {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Declared input contract of the demand ensemble
    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::new(self.version.clone(), self.feature_columns.clone())
            .with_categorical(self.categorical_columns.clone())
    }
}

/// Raw demand request fields
#[derive(Debug, Clone, PartialEq)]
pub struct DemandInput<'a> {
    pub week: &'a str,
    pub store_id: i64,
    pub sku_id: i64,
    pub base_price: f64,
    pub total_price: Option<f64>,
    pub is_featured_sku: u8,
    pub is_display_sku: u8,
}

/// Locations of the demand preprocessing artifacts
#[derive(Debug, Clone)]
pub struct DemandArtifacts {
    pub config_path: PathBuf,
    pub encodings_path: PathBuf,
}

struct EncoderState {
    config: DemandModelConfig,
    tables: EncodingTables,
}

/// Demand feature encoder; artifacts load once, on first use
pub struct DemandFeatureEncoder {
    artifacts: Option<DemandArtifacts>,
    state: LoadGuard<EncoderState>,
}

impl DemandFeatureEncoder {
    /// Encoder that loads its artifacts lazily
    pub fn from_artifacts(artifacts: DemandArtifacts) -> Self {
        Self {
            artifacts: Some(artifacts),
            state: LoadGuard::new(),
        }
    }

    /// Encoder over already-loaded artifacts
    pub fn new(config: DemandModelConfig, tables: EncodingTables) -> Self {
        Self {
            artifacts: None,
            state: LoadGuard::ready(EncoderState { config, tables }),
        }
    }

    pub fn load(&self) -> Result<()> {
        self.state().map(|_| ())
    }

    pub fn is_loaded(&self) -> bool {
        self.state.get().is_some()
    }

    pub fn load_state(&self) -> LoadState {
        self.state.state()
    }

    fn state(&self) -> Result<&EncoderState> {
        self.state.get_or_load(|| {
            let artifacts = self.artifacts.as_ref().ok_or_else(|| {
                ForecastError::configuration("Demand encoder has no artifacts configured")
            })?;
            let config = DemandModelConfig::load(&artifacts.config_path)?;
            let tables = EncodingTables::load(&artifacts.encodings_path)?;
            info!(
                stores = tables.store.len(),
                skus = tables.sku.len(),
                time_tables = tables.time.len(),
                base_date = %config.base_date,
                "Loaded demand encoding tables"
            );
            Ok(EncoderState { config, tables })
        })
    }

    /// Build the named feature vector for one demand request
    pub fn encode(&self, input: &DemandInput<'_>) -> Result<FeatureVector> {
        let state = self.state()?;
        let week_start = parse_week_label(input.week)?;

        let base_price = input.base_price;
        let total_price = input.total_price.unwrap_or(base_price);
        let diff = base_price - total_price;
        let relative_diff_base = if base_price != 0.0 { diff / base_price } else { 0.0 };
        let relative_diff_total = if total_price != 0.0 { diff / total_price } else { 0.0 };

        let calendar = WeekCalendar::new(week_start, state.config.base_date);
        let tables = &state.tables;

        let mut features = FeatureVector::with_capacity(11 + state.config.time_features.len());
        features.insert("base_price", base_price);
        features.insert("total_price", total_price);
        features.insert("diff", diff);
        features.insert("relative_diff_base", relative_diff_base);
        features.insert("relative_diff_total", relative_diff_total);
        features.insert("is_featured_sku", f64::from(input.is_featured_sku));
        features.insert("is_display_sku", f64::from(input.is_display_sku));
        features.insert("store_encoded", tables.encode_store(input.store_id));
        features.insert("sku_encoded", tables.encode_sku(input.sku_id));
        features.insert("store_id", input.store_id as f64);
        features.insert("sku_id", input.sku_id as f64);

        for name in &state.config.time_features {
            let Some(raw) = calendar.field(name) else {
                debug!(feature = %name, "Skipping unknown time feature");
                continue;
            };
            let value = tables.encode_time(name, raw).unwrap_or(raw);
            features.insert(name.clone(), value);
        }

        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"{
        "version": "demand-v1",
        "feature_columns": ["base_price", "total_price", "diff", "store_encoded", "sku_encoded", "month", "weekday", "end_weeknum", "week_serial"],
        "categorical_columns": ["store_id", "sku_id"],
        "base_date": "2011-01-17",
        "time_features": ["month", "weekday", "end_weeknum", "week_serial", "quarter"]
    }"#;

    const TABLES: &str = r#"{
        "store_encoding_dict": {"8091": 3.5},
        "sku_encoding_dict": [[216418, 2.75]],
        "time_encoding_dicts": {"month": {"1": 3.1}, "weekday": [[0, 2.2]]},
        "global_mean": 3.0
    }"#;

    fn encoder() -> DemandFeatureEncoder {
        DemandFeatureEncoder::new(
            serde_json::from_str(CONFIG).unwrap(),
            serde_json::from_str(TABLES).unwrap(),
        )
    }

    fn input(total_price: Option<f64>) -> DemandInput<'static> {
        DemandInput {
            week: "17/01/11",
            store_id: 8091,
            sku_id: 216418,
            base_price: 111.8625,
            total_price,
            is_featured_sku: 0,
            is_display_sku: 1,
        }
    }

    #[test]
    fn test_price_deltas() {
        let f = encoder().encode(&input(Some(99.0375))).unwrap();
        let diff = 111.8625 - 99.0375;
        assert_eq!(f.get("diff"), Some(diff));
        assert_eq!(f.get("relative_diff_base"), Some(diff / 111.8625));
        assert_eq!(f.get("relative_diff_total"), Some(diff / 99.0375));
        assert_eq!(f.get("is_display_sku"), Some(1.0));
    }

    #[test]
    fn test_missing_total_price_matches_explicit_base_price() {
        let enc = encoder();
        let implicit = enc.encode(&input(None)).unwrap();
        let explicit = enc.encode(&input(Some(111.8625))).unwrap();
        assert_eq!(implicit, explicit);
        assert_eq!(implicit.get("diff"), Some(0.0));
        assert_eq!(implicit.get("relative_diff_base"), Some(0.0));
        assert_eq!(implicit.get("relative_diff_total"), Some(0.0));
    }

    #[test]
    fn test_zero_prices_do_not_divide() {
        let mut req = input(Some(0.0));
        req.base_price = 0.0;
        let f = encoder().encode(&req).unwrap();
        assert_eq!(f.get("relative_diff_base"), Some(0.0));
        assert_eq!(f.get("relative_diff_total"), Some(0.0));
    }

    #[test]
    fn test_categorical_encoding_and_raw_ids() {
        let f = encoder().encode(&input(None)).unwrap();
        assert_eq!(f.get("store_encoded"), Some(3.5));
        assert_eq!(f.get("sku_encoded"), Some(2.75));
        assert_eq!(f.get("store_id"), Some(8091.0));
        assert_eq!(f.get("sku_id"), Some(216418.0));
    }

    #[test]
    fn test_unseen_ids_use_global_mean() {
        let mut req = input(None);
        req.store_id = 1;
        req.sku_id = 2;
        let f = encoder().encode(&req).unwrap();
        assert_eq!(f.get("store_encoded"), Some(3.0));
        assert_eq!(f.get("sku_encoded"), Some(3.0));
    }

    #[test]
    fn test_time_features() {
        let f = encoder().encode(&input(None)).unwrap();
        // month 1 and weekday 0 (Monday) have tables
        assert_eq!(f.get("month"), Some(3.1));
        assert_eq!(f.get("weekday"), Some(2.2));
        // no tables: raw values pass through
        assert_eq!(f.get("end_weeknum"), Some(3.0));
        assert_eq!(f.get("week_serial"), Some(0.0));
        // unknown calendar field is skipped
        assert!(!f.contains("quarter"));
    }

    #[test]
    fn test_unseen_time_category_uses_global_mean() {
        let mut req = input(None);
        req.week = "15/02/11";
        let f = encoder().encode(&req).unwrap();
        // February and Tuesday are not in the tables
        assert_eq!(f.get("month"), Some(3.0));
        assert_eq!(f.get("weekday"), Some(3.0));
    }

    #[test]
    fn test_schema_selects_model_order() {
        let enc = encoder();
        let config: DemandModelConfig = serde_json::from_str(CONFIG).unwrap();
        let f = enc.encode(&input(None)).unwrap();
        let row = config.schema().select(&f).unwrap();
        assert_eq!(row.len(), 9);
        assert_eq!(row[0], 111.8625);
        assert_eq!(row[3], 3.5);
    }

    #[test]
    fn test_malformed_week() {
        let mut req = input(None);
        req.week = "2011-01-17";
        assert!(matches!(
            encoder().encode(&req),
            Err(ForecastError::Validation(_))
        ));
    }

    #[test]
    fn test_lazy_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        let encodings_path = dir.path().join("encoding_dicts.json");
        std::fs::File::create(&config_path)
            .unwrap()
            .write_all(CONFIG.as_bytes())
            .unwrap();
        std::fs::File::create(&encodings_path)
            .unwrap()
            .write_all(TABLES.as_bytes())
            .unwrap();

        let enc = DemandFeatureEncoder::from_artifacts(DemandArtifacts {
            config_path,
            encodings_path,
        });
        assert!(!enc.is_loaded());
        let f = enc.encode(&input(None)).unwrap();
        assert!(enc.is_loaded());
        assert_eq!(f.get("store_encoded"), Some(3.5));
    }

    #[test]
    fn test_missing_artifacts_fail_every_time() {
        let enc = DemandFeatureEncoder::from_artifacts(DemandArtifacts {
            config_path: PathBuf::from("/nonexistent/config.json"),
            encodings_path: PathBuf::from("/nonexistent/encoding_dicts.json"),
        });
        for _ in 0..2 {
            assert!(matches!(
                enc.encode(&input(None)),
                Err(ForecastError::Configuration(_))
            ));
        }
    }
}
