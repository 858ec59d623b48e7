//! Target-encoding tables
//!
//! Tables come from `encoding_dicts.json`. A table is either a JSON object
//! (text keys) or a list of `[key, value]` pairs whose keys may be text or
//! integers. Training exports are not consistent about key typing, so lookups
//! try the text form first and the integer form second before falling back
//! to the global mean.

use crate::error::{ForecastError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// A categorical key as it was written by the training export
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum EncodingKey {
    Int(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTable {
    Map(HashMap<String, f64>),
    Pairs(Vec<(EncodingKey, f64)>),
}

/// Learned target-encoding values for one categorical field
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawTable")]
pub struct EncodingTable {
    values: HashMap<EncodingKey, f64>,
}

impl From<RawTable> for EncodingTable {
    fn from(raw: RawTable) -> Self {
        let values = match raw {
            RawTable::Map(map) => map
                .into_iter()
                .map(|(k, v)| (EncodingKey::Text(k), v))
                .collect(),
            RawTable::Pairs(pairs) => pairs.into_iter().collect(),
        };
        Self { values }
    }
}

impl EncodingTable {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (EncodingKey, f64)>) -> Self {
        Self {
            values: pairs.into_iter().collect(),
        }
    }

    /// Look up an integer category under both key representations
    pub fn lookup(&self, key: i64) -> Option<f64> {
        self.values
            .get(&EncodingKey::Text(key.to_string()))
            .or_else(|| self.values.get(&EncodingKey::Int(key)))
            .copied()
    }

    /// Look up a numeric category. Whole numbers try the integer forms and
    /// then the one-decimal text form (`"3.0"`); anything else is matched on
    /// its text form only.
    pub fn lookup_value(&self, value: f64) -> Option<f64> {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            self.lookup(value as i64).or_else(|| {
                self.values
                    .get(&EncodingKey::Text(format!("{:.1}", value)))
                    .copied()
            })
        } else {
            self.values.get(&EncodingKey::Text(value.to_string())).copied()
        }
    }

    /// True when the export wrote both text and integer keys
    pub fn has_mixed_keys(&self) -> bool {
        let ints = self
            .values
            .keys()
            .filter(|k| matches!(k, EncodingKey::Int(_)))
            .count();
        ints > 0 && ints < self.values.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn default_m_store() -> f64 {
    10.0
}

fn default_m_sku() -> f64 {
    10.0
}

fn default_m_time() -> f64 {
    5.0
}

/// Every target-encoding table the demand model was trained with
#[derive(Debug, Clone, Deserialize)]
pub struct EncodingTables {
    #[serde(rename = "store_encoding_dict")]
    pub store: EncodingTable,
    #[serde(rename = "sku_encoding_dict")]
    pub sku: EncodingTable,
    #[serde(rename = "time_encoding_dicts", default)]
    pub time: HashMap<String, EncodingTable>,
    pub global_mean: f64,
    /// Smoothing strengths used at training time; kept for provenance only
    #[serde(default = "default_m_store")]
    pub m_store: f64,
    #[serde(default = "default_m_sku")]
    pub m_sku: f64,
    #[serde(default = "default_m_time")]
    pub m_time: f64,
}

impl EncodingTables {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ForecastError::configuration(format!(
                "Failed to read encoding tables {}: {}",
                path.display(),
                e
            ))
        })?;
        let tables: Self = serde_json::from_str(&raw).map_err(|e| {
            ForecastError::configuration(format!(
                "Failed to parse encoding tables {}: {}",
                path.display(),
                e
            ))
        })?;

        let tables_with_mixed_keys = [("store", &tables.store), ("sku", &tables.sku)]
            .into_iter()
            .chain(tables.time.iter().map(|(name, table)| (name.as_str(), table)))
            .filter(|(_, table)| table.has_mixed_keys());
        for (name, _) in tables_with_mixed_keys {
            warn!(table = name, path = %path.display(), "Encoding table mixes text and integer keys");
        }
        Ok(tables)
    }

    pub fn encode_store(&self, store_id: i64) -> f64 {
        self.store.lookup(store_id).unwrap_or(self.global_mean)
    }

    pub fn encode_sku(&self, sku_id: i64) -> f64 {
        self.sku.lookup(sku_id).unwrap_or(self.global_mean)
    }

    /// Encode a calendar field. `None` means the field has no table and its
    /// raw value should pass through.
    pub fn encode_time(&self, field: &str, value: f64) -> Option<f64> {
        self.time
            .get(field)
            .map(|table| table.lookup_value(value).unwrap_or(self.global_mean))
    }
}
