//! Regressor variants, model selection and the predictor seam used downstream.

use std::fmt;

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use sc_core::{CoreError, FeatureSet, Result};

pub mod forest;
pub mod linear;
pub mod metrics;
pub mod split;
pub mod trainer;
pub mod tree;

pub use forest::{ForestParams, RandomForestRegressor};
pub use linear::LinearRegression;
pub use metrics::{evaluate, RegressionMetrics};
pub use split::{train_test_split, SplitIndices, SplitParams};
pub use trainer::{
    select_best, train_and_select, FeatureImportance, ModelBundle, ModelTrainer, RankedFeature,
    SelectedModel, TrainerConfig, VariantReport,
};

/// A model that scores engineered feature rows laid out in its feature-set order.
pub trait Predictor: Send + Sync {
    fn features(&self) -> &FeatureSet;

    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>>;
}

/// Fit/predict/explain capability shared by the regressor variants.
pub trait Regressor {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<()>;

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>>;

    fn importances(&self) -> Importances;
}

/// Per-feature importances in input column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Importances {
    Available(Vec<f64>),
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    RandomForest,
    LinearRegression,
}

impl ModelKind {
    pub const fn name(self) -> &'static str {
        match self {
            ModelKind::RandomForest => "Random Forest",
            ModelKind::LinearRegression => "Linear Regression",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "model", rename_all = "snake_case")]
pub enum TrainedModel {
    RandomForest(RandomForestRegressor),
    LinearRegression(LinearRegression),
}

impl TrainedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            TrainedModel::RandomForest(_) => ModelKind::RandomForest,
            TrainedModel::LinearRegression(_) => ModelKind::LinearRegression,
        }
    }

    /// Checks a deserialized model against the width of the rows it will score.
    pub fn validate(&self, n_features: usize) -> Result<()> {
        match self {
            TrainedModel::RandomForest(m) => m.validate(n_features),
            TrainedModel::LinearRegression(m) => m.validate(n_features),
        }
    }
}

impl Regressor for TrainedModel {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<()> {
        match self {
            TrainedModel::RandomForest(m) => m.fit(x, y),
            TrainedModel::LinearRegression(m) => m.fit(x, y),
        }
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        match self {
            TrainedModel::RandomForest(m) => m.predict(x),
            TrainedModel::LinearRegression(m) => m.predict(x),
        }
    }

    fn importances(&self) -> Importances {
        match self {
            TrainedModel::RandomForest(m) => m.importances(),
            TrainedModel::LinearRegression(m) => m.importances(),
        }
    }
}

/// Checks a design matrix and returns its width.
pub(crate) fn check_design(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<usize> {
    if x.nrows() == 0 {
        return Err(CoreError::Training("cannot fit on an empty partition".into()));
    }
    if x.nrows() != y.len() {
        return Err(CoreError::Training(format!("{} rows but {} targets", x.nrows(), y.len())));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(CoreError::Training("training data contains non-finite values".into()));
    }
    Ok(x.ncols())
}

pub(crate) fn check_rows(rows: ArrayView2<'_, f64>, width: usize) -> Result<()> {
    if rows.ncols() == width {
        Ok(())
    } else {
        Err(CoreError::Data(format!("rows have {} features, expected {width}", rows.ncols())))
    }
}
