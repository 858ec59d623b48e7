//! Linear regression strategy for weekly sales

use super::{curated_price_columns, LoadGuard, LoadState, Strategy};
use crate::dataset::DatasetProvider;
use crate::error::{ForecastError, Result};
use crate::models::{FeatureSchema, FeatureVector, StoreType};
use crate::price::{dept_column, store_column, type_column, STORE_DOMAIN};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Exported linear model (`linear_regressor.json`)
///
/// ```json
/// {
///   "version": "price-linear-v1",
///   "coefficients": [1.02, 0.31, ...],
///   "intercept": 15981.2,
///   "feature_columns": ["mean", "median", ...]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinearModel {
    #[serde(alias = "coef")]
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub feature_columns: Option<Vec<String>>,
    #[serde(default)]
    pub version: Option<String>,
}

impl LinearModel {
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearArtifacts {
    pub model_path: PathBuf,
}

struct LoadedLinear {
    model: LinearModel,
    schema: FeatureSchema,
}

/// Linear strategy; the schema comes from the artifact or is derived once
pub struct LinearStrategy {
    name: String,
    artifacts: Option<LinearArtifacts>,
    provider: Option<Arc<dyn DatasetProvider>>,
    state: LoadGuard<LoadedLinear>,
}

impl LinearStrategy {
    /// Strategy that reads its artifact on first use. `provider` supplies the
    /// department domain when the artifact declares no columns.
    pub fn new(
        name: impl Into<String>,
        artifacts: LinearArtifacts,
        provider: Option<Arc<dyn DatasetProvider>>,
    ) -> Self {
        Self {
            name: name.into(),
            artifacts: Some(artifacts),
            provider,
            state: LoadGuard::new(),
        }
    }

    /// Strategy over a model already in memory
    pub fn from_model(
        name: impl Into<String>,
        model: LinearModel,
        provider: Option<Arc<dyn DatasetProvider>>,
    ) -> Result<Self> {
        let name = name.into();
        let loaded = resolve_schema(&name, model, provider.as_deref())?;
        Ok(Self {
            name,
            artifacts: None,
            provider,
            state: LoadGuard::ready(loaded),
        })
    }

    fn loaded(&self) -> Result<&LoadedLinear> {
        self.state.get_or_load(|| {
            let artifacts = self.artifacts.as_ref().ok_or_else(|| {
                ForecastError::configuration(format!("Strategy '{}' has no artifacts", self.name))
            })?;
            let path = &artifacts.model_path;
            let raw = std::fs::read_to_string(path).map_err(|e| {
                ForecastError::configuration(format!("Failed to read {}: {}", path.display(), e))
            })?;
            let model: LinearModel = serde_json::from_str(&raw).map_err(|e| {
                ForecastError::configuration(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            let loaded = resolve_schema(&self.name, model, self.provider.as_deref())?;
            info!(
                strategy = %self.name,
                coefficients = loaded.model.coefficients.len(),
                version = %loaded.schema.version,
                "Linear model loaded"
            );
            Ok(loaded)
        })
    }
}

fn resolve_schema(
    name: &str,
    model: LinearModel,
    provider: Option<&dyn DatasetProvider>,
) -> Result<LoadedLinear> {
    let width = model.coefficients.len();
    if width == 0 {
        return Err(ForecastError::configuration("Linear model has no coefficients"));
    }
    let columns = match &model.feature_columns {
        Some(columns) if columns.len() != width => {
            return Err(ForecastError::configuration(format!(
                "Linear model declares {} feature columns but has {} coefficients",
                columns.len(),
                width
            )));
        }
        Some(columns) => columns.clone(),
        None => {
            warn!(
                strategy = %name,
                width,
                "Linear model declares no feature columns, deriving price ordering"
            );
            let departments = match (width > fixed_price_columns().len(), provider) {
                (true, Some(p)) => p.department_domain()?.to_vec(),
                _ => Vec::new(),
            };
            derive_price_columns(width, &departments)
        }
    };
    let version = model
        .version
        .clone()
        .unwrap_or_else(|| "unversioned".to_string());
    Ok(LoadedLinear {
        schema: FeatureSchema::new(version, columns),
        model,
    })
}

/// Curated ordering followed by the store and store-type indicators
fn fixed_price_columns() -> Vec<String> {
    let mut columns = curated_price_columns();
    columns.extend(STORE_DOMAIN.map(store_column));
    columns.extend(StoreType::ALL.iter().map(|t| type_column(*t)));
    columns
}

/// Column ordering for a price model that declares none: the fixed ordering
/// cut to `width`, or extended with the remaining departments in ascending
/// order and then `_pad_<i>` columns
pub fn derive_price_columns(width: usize, departments: &[u32]) -> Vec<String> {
    let mut columns = fixed_price_columns();
    if columns.len() >= width {
        columns.truncate(width);
        return columns;
    }

    let mut remaining: Vec<u32> = departments.to_vec();
    remaining.sort_unstable();
    remaining.dedup();
    for dept in remaining {
        if columns.len() == width {
            break;
        }
        let column = dept_column(dept);
        if !columns.contains(&column) {
            columns.push(column);
        }
    }

    let mut pad = 0;
    while columns.len() < width {
        columns.push(format!("_pad_{}", pad));
        pad += 1;
    }
    columns
}

impl Strategy for LinearStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<()> {
        self.loaded().map(|_| ())
    }

    fn state(&self) -> LoadState {
        self.state.state()
    }

    fn schema(&self) -> Result<&FeatureSchema> {
        self.loaded().map(|l| &l.schema)
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let loaded = self.loaded()?;
        let row = loaded.schema.select(features)?;
        let prediction = loaded.model.predict_row(&row);
        if !prediction.is_finite() {
            return Err(ForecastError::Inference(
                "Linear model produced a non-finite prediction".to_string(),
            ));
        }
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, SalesRow};

    fn model(coefficients: Vec<f64>, columns: Option<Vec<&str>>) -> LinearModel {
        LinearModel {
            coefficients,
            intercept: 10.0,
            feature_columns: columns.map(|c| c.into_iter().map(String::from).collect()),
            version: Some("v1".to_string()),
        }
    }

    fn provider(depts: &[u32]) -> Arc<dyn DatasetProvider> {
        let sales = depts
            .iter()
            .map(|&dept| SalesRow {
                store: 1,
                dept,
                weekly_sales: 1.0,
            })
            .collect();
        Arc::new(Dataset::new(Vec::new(), Vec::new(), sales))
    }

    #[test]
    fn test_declared_columns_dot_product() {
        let strategy =
            LinearStrategy::from_model("linear", model(vec![2.0, -1.0], Some(vec!["a", "b"])), None)
                .unwrap();
        let features: FeatureVector = [("b", 4.0), ("a", 3.0), ("c", 100.0)]
            .into_iter()
            .map(|(n, v)| (n.to_string(), v))
            .collect();
        assert_eq!(strategy.predict(&features).unwrap(), 10.0 + 6.0 - 4.0);
        assert_eq!(strategy.schema().unwrap().version, "v1");
    }

    #[test]
    fn test_declared_column_count_mismatch() {
        assert!(matches!(
            LinearStrategy::from_model("linear", model(vec![1.0], Some(vec!["a", "b"])), None),
            Err(ForecastError::Configuration(_))
        ));
    }

    #[test]
    fn test_derived_columns_truncate() {
        let columns = derive_price_columns(23, &[]);
        assert_eq!(columns, curated_price_columns());

        let columns = derive_price_columns(24, &[]);
        assert_eq!(columns.last().map(String::as_str), Some("Store_1"));
    }

    #[test]
    fn test_derived_columns_cover_stores_and_types() {
        let columns = derive_price_columns(71, &[]);
        assert_eq!(columns[23], "Store_1");
        assert_eq!(columns[67], "Store_45");
        assert_eq!(&columns[68..], &["Type_A", "Type_B", "Type_C"]);
    }

    #[test]
    fn test_derived_columns_pad_with_departments_then_placeholders() {
        let columns = derive_price_columns(75, &[98, 1, 2, 3, 97]);
        assert_eq!(&columns[71..], &["Dept_2", "Dept_97", "Dept_98", "_pad_0"]);
    }

    #[test]
    fn test_derivation_uses_provider_domain() {
        let strategy =
            LinearStrategy::from_model("linear", model(vec![0.0; 73], None), Some(provider(&[1, 2, 4])))
                .unwrap();
        let schema = strategy.schema().unwrap();
        assert_eq!(schema.width(), 73);
        assert_eq!(&schema.columns[71..], &["Dept_2", "Dept_4"]);
    }

    #[test]
    fn test_lazy_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linear_regressor.json");
        std::fs::write(&path, r#"{"coef": [1.5], "intercept": 2.0, "feature_columns": ["mean"]}"#)
            .unwrap();

        let strategy = LinearStrategy::new("linear", LinearArtifacts { model_path: path }, None);
        assert_eq!(strategy.state(), LoadState::Unloaded);
        let features: FeatureVector = std::iter::once(("mean".to_string(), 4.0)).collect();
        assert_eq!(strategy.predict(&features).unwrap(), 8.0);
        assert_eq!(strategy.state(), LoadState::Loaded);
        assert_eq!(strategy.schema().unwrap().version, "unversioned");
    }

    #[test]
    fn test_unreadable_artifact_fails_once() {
        let strategy = LinearStrategy::new(
            "linear",
            LinearArtifacts {
                model_path: PathBuf::from("/nonexistent/linear.json"),
            },
            None,
        );
        assert!(matches!(strategy.load(), Err(ForecastError::Configuration(_))));
        assert_eq!(strategy.state(), LoadState::Failed);
        assert!(strategy.predict(&FeatureVector::new()).is_err());
    }
}
