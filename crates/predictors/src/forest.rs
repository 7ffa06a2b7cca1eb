use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sc_core::{CoreError, Result};

use crate::tree::{RegressionTree, TreeParams};
use crate::{check_design, check_rows, Importances, Regressor};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    /// `None` grows every tree until its leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub random_state: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self { n_estimators: 100, max_depth: None, min_samples_split: 2, random_state: 42 }
    }
}

/// Bagged regression trees; every split considers all features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    params: ForestParams,
    n_features: usize,
    trees: Vec<RegressionTree>,
    importances: Vec<f64>,
}

impl RandomForestRegressor {
    pub fn new(params: ForestParams) -> Self {
        Self { params, n_features: 0, trees: Vec::new(), importances: Vec::new() }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn validate(&self, n_features: usize) -> Result<()> {
        if self.trees.is_empty() {
            return Err(CoreError::Data("forest has no trees".into()));
        }
        if self.n_features != n_features || self.importances.len() != n_features {
            return Err(CoreError::Data(format!(
                "forest was fitted on {} features ({} importances), expected {n_features}",
                self.n_features,
                self.importances.len()
            )));
        }
        self.trees.iter().try_for_each(|tree| tree.validate(n_features))
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<()> {
        let n_features = check_design(x, y)?;
        if self.params.n_estimators == 0 {
            return Err(CoreError::Training("forest needs at least one estimator".into()));
        }
        if self.params.min_samples_split < 2 {
            return Err(CoreError::Training("min_samples_split must be at least 2".into()));
        }

        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
        };
        let mut rng = StdRng::seed_from_u64(self.params.random_state);
        let n = x.nrows();
        let mut trees = Vec::with_capacity(self.params.n_estimators);
        let mut total = vec![0.0; n_features];

        for _ in 0..self.params.n_estimators {
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut gains = vec![0.0; n_features];
            trees.push(RegressionTree::grow(x, y, bootstrap, tree_params, &mut gains));
            normalize(&mut gains);
            for (acc, g) in total.iter_mut().zip(&gains) {
                *acc += g;
            }
        }
        normalize(&mut total);

        self.n_features = n_features;
        self.trees = trees;
        self.importances = total;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(CoreError::UntrainedModel);
        }
        check_rows(x, self.n_features)?;
        let n_trees = self.trees.len() as f64;
        let mut out = Array1::zeros(x.nrows());
        for (slot, row) in out.iter_mut().zip(x.rows()) {
            let mut sum = 0.0;
            for tree in &self.trees {
                sum += tree.predict_row(row)?;
            }
            *slot = sum / n_trees;
        }
        Ok(out)
    }

    fn importances(&self) -> Importances {
        if self.trees.is_empty() {
            Importances::Unavailable
        } else {
            Importances::Available(self.importances.clone())
        }
    }
}

fn normalize(values: &mut [f64]) {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        values.iter_mut().for_each(|v| *v /= sum);
    }
}
