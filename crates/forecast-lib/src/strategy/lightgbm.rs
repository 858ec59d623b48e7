//! Gradient-boosted tree ensemble
//!
//! Scores the demand ensemble: one booster per cross-validation fold, each
//! trained on `log1p(units)`. The fold outputs are averaged in log space and
//! mapped back with `exp(mean) - 1`.
//!
//! Boosters are read from LightGBM's text model format (`model_fold_{i}.txt`)
//! and evaluated natively, including numerical splits with missing-value
//! routing and categorical bitset splits.

use super::{LoadGuard, LoadState, Strategy};
use crate::error::{ForecastError, Result};
use crate::models::{FeatureSchema, FeatureVector};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Number of fold boosters looked for when none is configured
pub const DEFAULT_FOLD_COUNT: usize = 10;

/// `|x| <= ZERO_THRESHOLD` counts as zero for zero-as-missing splits
const ZERO_THRESHOLD: f64 = 1e-35;

const CATEGORICAL_MASK: u8 = 1;
const DEFAULT_LEFT_MASK: u8 = 2;

/// Trait for a single fitted booster
pub trait Booster: Send + Sync {
    /// Score one row laid out in schema order
    fn predict_row(&self, row: &[f64]) -> f64;

    /// Highest feature index any split reads, if known
    fn max_feature_index(&self) -> Option<usize> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingType {
    None,
    Zero,
    NaN,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputTransform {
    Identity,
    Exp,
    Sigmoid(f64),
}

#[derive(Debug, Clone)]
struct Tree {
    split_feature: Vec<usize>,
    threshold: Vec<f64>,
    decision_type: Vec<u8>,
    left_child: Vec<i32>,
    right_child: Vec<i32>,
    leaf_value: Vec<f64>,
    cat_boundaries: Vec<usize>,
    cat_threshold: Vec<u32>,
}

impl Tree {
    fn predict(&self, row: &[f64]) -> f64 {
        if self.split_feature.is_empty() {
            return self.leaf_value[0];
        }
        let mut node = 0i32;
        while node >= 0 {
            node = self.decide(node as usize, row);
        }
        self.leaf_value[!node as usize]
    }

    fn decide(&self, node: usize, row: &[f64]) -> i32 {
        let value = row
            .get(self.split_feature[node])
            .copied()
            .unwrap_or(f64::NAN);
        let decision = self.decision_type[node];
        let missing = match (decision >> 2) & 3 {
            1 => MissingType::Zero,
            2 => MissingType::NaN,
            _ => MissingType::None,
        };

        let go_left = if decision & CATEGORICAL_MASK != 0 {
            self.categorical_left(node, value, missing)
        } else {
            let value = if value.is_nan() && missing != MissingType::NaN {
                0.0
            } else {
                value
            };
            let is_missing = match missing {
                MissingType::Zero => value.abs() <= ZERO_THRESHOLD,
                MissingType::NaN => value.is_nan(),
                MissingType::None => false,
            };
            if is_missing {
                decision & DEFAULT_LEFT_MASK != 0
            } else {
                value <= self.threshold[node]
            }
        };

        if go_left {
            self.left_child[node]
        } else {
            self.right_child[node]
        }
    }

    fn categorical_left(&self, node: usize, value: f64, missing: MissingType) -> bool {
        let category = if value.is_nan() {
            if missing == MissingType::NaN {
                return false;
            }
            0
        } else if value < 0.0 {
            return false;
        } else {
            value as u64
        };

        let cat_idx = self.threshold[node] as usize;
        let bits = &self.cat_threshold[self.cat_boundaries[cat_idx]..self.cat_boundaries[cat_idx + 1]];
        let word = (category / 32) as usize;
        word < bits.len() && (bits[word] >> (category % 32)) & 1 == 1
    }

    fn max_feature_index(&self) -> Option<usize> {
        self.split_feature.iter().copied().max()
    }
}

/// A booster parsed from LightGBM's text model format
#[derive(Debug, Clone)]
pub struct LightGbmBooster {
    trees: Vec<Tree>,
    transform: OutputTransform,
    average_output: bool,
    feature_names: Vec<String>,
}

impl LightGbmBooster {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ForecastError::configuration(format!("Failed to read booster {}: {}", path.display(), e))
        })?;
        Self::parse(&text).map_err(|e| match e {
            ForecastError::Configuration(msg) => {
                ForecastError::configuration(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut header: HashMap<&str, &str> = HashMap::new();
        let mut blocks: Vec<HashMap<&str, &str>> = Vec::new();
        let mut average_output = false;

        for line in text.lines().map(str::trim) {
            if line == "end of trees" {
                break;
            }
            if line.is_empty() {
                continue;
            }
            if line.starts_with("Tree=") {
                blocks.push(HashMap::new());
                continue;
            }
            if line == "average_output" {
                average_output = true;
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                match blocks.last_mut() {
                    Some(block) => block.insert(key, value),
                    None => header.insert(key, value),
                };
            }
        }

        if let Some(n) = header.get("num_class") {
            if n.trim() != "1" {
                return Err(ForecastError::configuration(format!(
                    "Multiclass boosters are not supported (num_class={})",
                    n
                )));
            }
        }
        if blocks.is_empty() {
            return Err(ForecastError::configuration("Booster contains no trees"));
        }

        let trees = blocks
            .iter()
            .enumerate()
            .map(|(idx, block)| {
                parse_tree(block)
                    .map_err(|msg| ForecastError::configuration(format!("Tree {}: {}", idx, msg)))
            })
            .collect::<Result<Vec<_>>>()?;

        let feature_names = header
            .get("feature_names")
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        Ok(Self {
            trees,
            transform: output_transform(header.get("objective").copied().unwrap_or("")),
            average_output,
            feature_names,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

impl Booster for LightGbmBooster {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut raw: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        if self.average_output {
            raw /= self.trees.len() as f64;
        }
        match self.transform {
            OutputTransform::Identity => raw,
            OutputTransform::Exp => raw.exp(),
            OutputTransform::Sigmoid(scale) => 1.0 / (1.0 + (-scale * raw).exp()),
        }
    }

    fn max_feature_index(&self) -> Option<usize> {
        self.trees.iter().filter_map(Tree::max_feature_index).max()
    }
}

fn output_transform(objective: &str) -> OutputTransform {
    let mut parts = objective.split_whitespace();
    match parts.next().unwrap_or("") {
        "poisson" | "gamma" | "tweedie" => OutputTransform::Exp,
        "binary" | "cross_entropy" | "xentropy" => {
            let scale = parts
                .find_map(|p| p.strip_prefix("sigmoid:"))
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0);
            OutputTransform::Sigmoid(scale)
        }
        _ => OutputTransform::Identity,
    }
}

fn field<T: FromStr>(block: &HashMap<&str, &str>, key: &str, expected: usize) -> std::result::Result<Vec<T>, String> {
    let values = match block.get(key) {
        Some(raw) => raw
            .split_whitespace()
            .map(|v| v.parse::<T>().map_err(|_| format!("invalid value '{}' in {}", v, key)))
            .collect::<std::result::Result<Vec<T>, String>>()?,
        None if expected == 0 => Vec::new(),
        None => return Err(format!("missing {}", key)),
    };
    if values.len() != expected {
        return Err(format!("{} has {} values, expected {}", key, values.len(), expected));
    }
    Ok(values)
}

fn parse_tree(block: &HashMap<&str, &str>) -> std::result::Result<Tree, String> {
    if block.get("is_linear").map(|v| v.trim()) == Some("1") {
        return Err("linear trees are not supported".to_string());
    }
    let num_leaves: usize = block
        .get("num_leaves")
        .ok_or("missing num_leaves")?
        .trim()
        .parse()
        .map_err(|_| "invalid num_leaves".to_string())?;
    if num_leaves == 0 {
        return Err("num_leaves must be positive".to_string());
    }
    let num_cat: usize = block
        .get("num_cat")
        .map(|v| v.trim().parse().map_err(|_| "invalid num_cat".to_string()))
        .transpose()?
        .unwrap_or(0);
    let internal = num_leaves - 1;

    let tree = Tree {
        split_feature: field(block, "split_feature", internal)?,
        threshold: field(block, "threshold", internal)?,
        decision_type: field(block, "decision_type", internal)?,
        left_child: field(block, "left_child", internal)?,
        right_child: field(block, "right_child", internal)?,
        leaf_value: field(block, "leaf_value", num_leaves)?,
        cat_boundaries: if num_cat > 0 {
            field(block, "cat_boundaries", num_cat + 1)?
        } else {
            Vec::new()
        },
        cat_threshold: if num_cat > 0 {
            let raw = block.get("cat_threshold").ok_or("missing cat_threshold")?;
            let words = raw.split_whitespace().count();
            field(block, "cat_threshold", words)?
        } else {
            Vec::new()
        },
    };

    validate_tree(&tree, num_leaves, num_cat)?;
    Ok(tree)
}

fn validate_tree(tree: &Tree, num_leaves: usize, num_cat: usize) -> std::result::Result<(), String> {
    let internal = num_leaves - 1;
    for node in 0..internal {
        for child in [tree.left_child[node], tree.right_child[node]] {
            let ok = if child >= 0 {
                // Children are numbered after their parent, so traversal terminates
                (child as usize) > node && (child as usize) < internal
            } else {
                (!child as usize) < num_leaves
            };
            if !ok {
                return Err(format!("node {} has invalid child {}", node, child));
            }
        }
        if tree.decision_type[node] & CATEGORICAL_MASK != 0 {
            let cat_idx = tree.threshold[node];
            if cat_idx < 0.0 || cat_idx as usize >= num_cat {
                return Err(format!("node {} references missing category set {}", node, cat_idx));
            }
        }
    }
    if let Some(window) = tree.cat_boundaries.windows(2).find(|w| w[0] > w[1]) {
        return Err(format!("cat_boundaries not ascending at {:?}", window));
    }
    if let Some(&last) = tree.cat_boundaries.last() {
        if last > tree.cat_threshold.len() {
            return Err("cat_boundaries exceed cat_threshold".to_string());
        }
    }
    Ok(())
}

/// Locations of the fold boosters and their shared preprocessing config
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEnsembleArtifacts {
    pub model_dir: PathBuf,
    pub config_path: PathBuf,
    pub n_folds: usize,
}

impl TreeEnsembleArtifacts {
    /// `model_fold_{i}.txt` and `config.json` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model_dir: dir.to_path_buf(),
            config_path: dir.join("config.json"),
            n_folds: DEFAULT_FOLD_COUNT,
        }
    }

    pub fn with_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }

    pub fn fold_path(&self, fold: usize) -> PathBuf {
        self.model_dir.join(format!("model_fold_{}.txt", fold))
    }
}

/// Columns part of the shared preprocessing config
#[derive(Debug, Deserialize)]
struct EnsembleColumns {
    #[serde(default = "default_version")]
    version: String,
    feature_columns: Vec<String>,
    #[serde(default)]
    categorical_columns: Vec<String>,
}

fn default_version() -> String {
    "unversioned".to_string()
}

struct LoadedEnsemble {
    schema: FeatureSchema,
    boosters: Vec<Box<dyn Booster>>,
}

/// Fold-averaged tree ensemble strategy
pub struct TreeEnsembleStrategy {
    name: String,
    artifacts: Option<TreeEnsembleArtifacts>,
    state: LoadGuard<LoadedEnsemble>,
}

impl TreeEnsembleStrategy {
    /// Strategy that reads its artifacts on first use
    pub fn new(name: impl Into<String>, artifacts: TreeEnsembleArtifacts) -> Self {
        Self {
            name: name.into(),
            artifacts: Some(artifacts),
            state: LoadGuard::new(),
        }
    }

    /// Strategy over boosters that are already in memory
    pub fn from_boosters(
        name: impl Into<String>,
        schema: FeatureSchema,
        boosters: Vec<Box<dyn Booster>>,
    ) -> Result<Self> {
        let loaded = check_ensemble(schema, boosters)?;
        Ok(Self {
            name: name.into(),
            artifacts: None,
            state: LoadGuard::ready(loaded),
        })
    }

    /// Number of fold boosters, once loaded
    pub fn fold_count(&self) -> Option<usize> {
        self.state.get().map(|s| s.boosters.len())
    }

    fn loaded(&self) -> Result<&LoadedEnsemble> {
        self.state.get_or_load(|| {
            let artifacts = self.artifacts.as_ref().ok_or_else(|| {
                ForecastError::configuration(format!("Strategy '{}' has no artifacts", self.name))
            })?;
            load_ensemble(&self.name, artifacts)
        })
    }
}

fn load_ensemble(name: &str, artifacts: &TreeEnsembleArtifacts) -> Result<LoadedEnsemble> {
    let raw = std::fs::read_to_string(&artifacts.config_path).map_err(|e| {
        ForecastError::configuration(format!(
            "Failed to read {}: {}",
            artifacts.config_path.display(),
            e
        ))
    })?;
    let columns: EnsembleColumns = serde_json::from_str(&raw).map_err(|e| {
        ForecastError::configuration(format!(
            "Failed to parse {}: {}",
            artifacts.config_path.display(),
            e
        ))
    })?;

    let mut boosters: Vec<Box<dyn Booster>> = Vec::with_capacity(artifacts.n_folds);
    for fold in 0..artifacts.n_folds {
        let path = artifacts.fold_path(fold);
        if !path.exists() {
            warn!(strategy = %name, fold, path = %path.display(), "Fold booster missing, skipping");
            continue;
        }
        let booster = LightGbmBooster::load(&path)?;
        debug!(strategy = %name, fold, trees = booster.num_trees(), "Loaded fold booster");
        boosters.push(Box::new(booster));
    }

    let schema = FeatureSchema::new(columns.version, columns.feature_columns)
        .with_categorical(columns.categorical_columns);
    let loaded = check_ensemble(schema, boosters).map_err(|e| match e {
        ForecastError::Configuration(msg) => ForecastError::configuration(format!(
            "{} in {}",
            msg,
            artifacts.model_dir.display()
        )),
        other => other,
    })?;

    info!(
        strategy = %name,
        folds = loaded.boosters.len(),
        features = loaded.schema.width(),
        categorical = ?loaded.schema.categorical_indices(),
        version = %loaded.schema.version,
        "Tree ensemble loaded"
    );
    Ok(loaded)
}

fn check_ensemble(schema: FeatureSchema, boosters: Vec<Box<dyn Booster>>) -> Result<LoadedEnsemble> {
    if boosters.is_empty() {
        return Err(ForecastError::configuration("No fold boosters found"));
    }
    if let Some(max) = boosters.iter().filter_map(|b| b.max_feature_index()).max() {
        if max >= schema.width() {
            return Err(ForecastError::configuration(format!(
                "Booster splits on feature {} but the schema declares {} columns",
                max,
                schema.width()
            )));
        }
    }
    Ok(LoadedEnsemble { schema, boosters })
}

impl Strategy for TreeEnsembleStrategy {
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
        self.loaded().map(|s| &s.schema)
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let loaded = self.loaded()?;
        // Boosters were trained on a float32 matrix
        let row: Vec<f64> = loaded
            .schema
            .select(features)?
            .into_iter()
            .map(|v| v as f32 as f64)
            .collect();

        let total: f64 = loaded.boosters.iter().map(|b| b.predict_row(&row)).sum();
        let mean_log = total / loaded.boosters.len() as f64;
        let prediction = mean_log.exp_m1();
        if !prediction.is_finite() {
            return Err(ForecastError::Inference(format!(
                "Ensemble produced a non-finite prediction (mean log output {})",
                mean_log
            )));
        }
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "tree
version=v4
num_class=1
num_tree_per_iteration=1
label_index=0
max_feature_idx=1
objective=regression
feature_names=a b
feature_infos=[0:10] [0:10]
tree_sizes=300 120

Tree=0
num_leaves=3
num_cat=0
split_feature=0 1
split_gain=10 5
threshold=1.5 2.5
decision_type=2 2
left_child=-1 -2
right_child=1 -3
leaf_value=0.1 0.2 0.29999999999999999
leaf_weight=1 1 1
leaf_count=1 1 1
internal_value=0 0
internal_weight=0 0
internal_count=3 2
is_linear=0
shrinkage=1


Tree=1
num_leaves=1
num_cat=0
split_feature=
threshold=
decision_type=
left_child=
right_child=
leaf_value=0.5
is_linear=0
shrinkage=1


end of trees

feature_importances:
a=1
b=1

parameters:
[boosting: gbdt]
end of parameters
";

    const CATEGORICAL_MODEL: &str = "tree
version=v4
num_class=1
max_feature_idx=0
objective=regression

Tree=0
num_leaves=2
num_cat=1
split_feature=0
threshold=0
decision_type=1
left_child=-1
right_child=-2
leaf_value=1 2
cat_boundaries=0 1
cat_threshold=10
is_linear=0
shrinkage=1

end of trees
";

    struct FixedBooster(f64);

    impl Booster for FixedBooster {
        fn predict_row(&self, _row: &[f64]) -> f64 {
            self.0
        }
    }

    fn schema(columns: &[&str]) -> FeatureSchema {
        FeatureSchema::new("test", columns.iter().map(|c| c.to_string()).collect())
    }

    fn features(pairs: &[(&str, f64)]) -> FeatureVector {
        pairs.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    #[test]
    fn test_numerical_splits() {
        let booster = LightGbmBooster::parse(MODEL).unwrap();
        assert_eq!(booster.num_trees(), 2);
        assert_eq!(booster.feature_names(), &["a".to_string(), "b".to_string()]);
        assert!((booster.predict_row(&[1.0, 9.0]) - 0.6).abs() < 1e-12);
        assert!((booster.predict_row(&[2.0, 2.0]) - 0.7).abs() < 1e-12);
        assert!((booster.predict_row(&[2.0, 3.0]) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_nan_treated_as_zero_without_missing_type() {
        let booster = LightGbmBooster::parse(MODEL).unwrap();
        assert!((booster.predict_row(&[f64::NAN, 9.0]) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_nan_routed_by_default_direction() {
        // missing type NaN (8) with default left (2)
        let model = MODEL.replacen("decision_type=2 2", "decision_type=10 2", 1);
        let booster = LightGbmBooster::parse(&model).unwrap();
        assert!((booster.predict_row(&[f64::NAN, 9.0]) - 0.6).abs() < 1e-12);

        // missing type NaN without default left goes right
        let model = MODEL.replacen("decision_type=2 2", "decision_type=8 2", 1);
        let booster = LightGbmBooster::parse(&model).unwrap();
        assert!((booster.predict_row(&[f64::NAN, 9.0]) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_categorical_split() {
        let booster = LightGbmBooster::parse(CATEGORICAL_MODEL).unwrap();
        // bitset 10 = categories 1 and 3
        assert_eq!(booster.predict_row(&[1.0]), 1.0);
        assert_eq!(booster.predict_row(&[3.0]), 1.0);
        assert_eq!(booster.predict_row(&[2.0]), 2.0);
        assert_eq!(booster.predict_row(&[-1.0]), 2.0);
        assert_eq!(booster.predict_row(&[35.0]), 2.0);
        assert_eq!(booster.predict_row(&[f64::NAN]), 2.0);
    }

    #[test]
    fn test_linear_trees_rejected() {
        let model = MODEL.replacen("is_linear=0", "is_linear=1", 1);
        assert!(matches!(
            LightGbmBooster::parse(&model),
            Err(ForecastError::Configuration(_))
        ));
    }

    #[test]
    fn test_malformed_tree_rejected() {
        let model = MODEL.replacen("left_child=-1 -2", "left_child=-1 -9", 1);
        assert!(matches!(
            LightGbmBooster::parse(&model),
            Err(ForecastError::Configuration(_))
        ));
        assert!(LightGbmBooster::parse("tree\nversion=v4\n").is_err());
    }

    #[test]
    fn test_poisson_objective_exponentiates() {
        let model = MODEL.replacen("objective=regression", "objective=poisson max_delta_step:0.7", 1);
        let booster = LightGbmBooster::parse(&model).unwrap();
        assert!((booster.predict_row(&[1.0, 9.0]) - 0.6f64.exp()).abs() < 1e-12);
    }

    #[test]
    fn test_ensemble_averages_in_log_space() {
        let strategy = TreeEnsembleStrategy::from_boosters(
            "lightgbm",
            schema(&["a"]),
            vec![Box::new(FixedBooster(1.0)), Box::new(FixedBooster(3.0))],
        )
        .unwrap();
        let prediction = strategy.predict(&features(&[("a", 0.0)])).unwrap();
        assert!((prediction - (2.0f64.exp() - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_missing_feature_is_validation_error() {
        let strategy = TreeEnsembleStrategy::from_boosters(
            "lightgbm",
            schema(&["a", "b"]),
            vec![Box::new(FixedBooster(1.0))],
        )
        .unwrap();
        let err = strategy.predict(&features(&[("a", 1.0)])).unwrap_err();
        assert_eq!(err, ForecastError::validation("Missing feature: b"));
    }

    #[test]
    fn test_empty_ensemble_rejected() {
        assert!(matches!(
            TreeEnsembleStrategy::from_boosters("lightgbm", schema(&["a"]), Vec::new()),
            Err(ForecastError::Configuration(_))
        ));
    }

    #[test]
    fn test_loads_present_folds_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"feature_columns": ["a", "b"], "base_date": "2011-01-17"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("model_fold_0.txt"), MODEL).unwrap();
        std::fs::write(dir.path().join("model_fold_2.txt"), MODEL).unwrap();

        let strategy = TreeEnsembleStrategy::new("lightgbm", TreeEnsembleArtifacts::in_dir(dir.path()));
        assert_eq!(strategy.state(), LoadState::Unloaded);
        let prediction = strategy.predict(&features(&[("a", 1.0), ("b", 0.0)])).unwrap();
        assert_eq!(strategy.fold_count(), Some(2));
        assert!((prediction - 0.6f64.exp_m1()).abs() < 1e-9);
        assert_eq!(strategy.schema().unwrap().version, "unversioned");
    }

    #[test]
    fn test_no_folds_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), r#"{"feature_columns": ["a"]}"#).unwrap();

        let strategy = TreeEnsembleStrategy::new(
            "lightgbm",
            TreeEnsembleArtifacts::in_dir(dir.path()).with_folds(3),
        );
        for _ in 0..2 {
            assert!(matches!(
                strategy.load(),
                Err(ForecastError::Configuration(_))
            ));
        }
        assert_eq!(strategy.state(), LoadState::Failed);
    }

    #[test]
    fn test_schema_narrower_than_booster_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), r#"{"feature_columns": ["a"]}"#).unwrap();
        std::fs::write(dir.path().join("model_fold_0.txt"), MODEL).unwrap();
        let strategy = TreeEnsembleStrategy::new("lightgbm", TreeEnsembleArtifacts::in_dir(dir.path()));
        assert!(matches!(
            strategy.load(),
            Err(ForecastError::Configuration(_))
        ));
    }
}
