//! Ordinary least squares with an intercept, fitted by `linfa-linear`.
//!
//! Columns are standardized first. Constant columns get a zero coefficient, and a ridge
//! far below any real signal (appended as pseudo-rows) keeps collinear columns solvable.

use linfa::traits::Fit;
use linfa::Dataset;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use sc_core::{CoreError, Result};

use crate::{check_design, check_rows, Importances, Regressor};

const RIDGE: f64 = 1e-8;
const CONSTANT_SCALE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinearRegression {
    coefficients: Array1<f64>,
    intercept: f64,
    fitted: bool,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coefficients(&self) -> ArrayView1<'_, f64> {
        self.coefficients.view()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn validate(&self, n_features: usize) -> Result<()> {
        if !self.fitted {
            return Err(CoreError::Data("linear model has not been fitted".into()));
        }
        if self.coefficients.len() != n_features {
            return Err(CoreError::Data(format!(
                "linear model has {} coefficients, expected {n_features}",
                self.coefficients.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(CoreError::Data("linear model has non-finite parameters".into()));
        }
        Ok(())
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<()> {
        let p = check_design(x, y)?;
        let n = x.nrows();

        let means = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(p));
        let scales = x.std_axis(Axis(0), 0.0);
        let y_mean = y.sum() / n as f64;
        let active: Vec<usize> = (0..p).filter(|&j| scales[j] > CONSTANT_SCALE).collect();

        let mut coefficients = Array1::<f64>::zeros(p);
        if !active.is_empty() {
            let k = active.len();
            let ridge = (RIDGE * n as f64).sqrt();
            let mut design = Array2::<f64>::zeros((n + k, k));
            for (slot, &j) in active.iter().enumerate() {
                let standardized = (&x.column(j) - means[j]) / scales[j];
                design.slice_mut(s![..n, slot]).assign(&standardized);
                design[[n + slot, slot]] = ridge;
            }
            let mut target = Array1::<f64>::zeros(n + k);
            target.slice_mut(s![..n]).assign(&(&y - y_mean));

            let ols = linfa_linear::LinearRegression::new()
                .with_intercept(false)
                .fit(&Dataset::new(design, target))
                .map_err(|e| CoreError::Training(format!("least squares fit failed: {e}")))?;
            for (slot, &j) in active.iter().enumerate() {
                coefficients[j] = ols.params()[slot] / scales[j];
            }
        }

        self.intercept = y_mean - coefficients.dot(&means);
        self.coefficients = coefficients;
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        if !self.fitted {
            return Err(CoreError::UntrainedModel);
        }
        check_rows(x, self.coefficients.len())?;
        Ok(x.dot(&self.coefficients) + self.intercept)
    }

    fn importances(&self) -> Importances {
        Importances::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    const TOL: f64 = 1e-5;

    #[test]
    fn recovers_exact_linear_relationship() {
        let x = Array2::from_shape_fn((25, 2), |(i, j)| {
            if j == 0 {
                i as f64
            } else {
                ((i * 7) % 5) as f64 * 10.0
            }
        });
        let y = x.map_axis(Axis(1), |r| 3.0 + 2.0 * r[0] - 0.5 * r[1]);
        let mut model = LinearRegression::new();
        model.fit(x.view(), y.view()).unwrap();

        assert!((model.coefficients()[0] - 2.0).abs() < TOL);
        assert!((model.coefficients()[1] + 0.5).abs() < TOL);
        assert!((model.intercept() - 3.0).abs() < TOL);
        let pred = model.predict(array![[100.0, 20.0]].view()).unwrap();
        assert!((pred[0] - 193.0).abs() < 1e-3);
        model.validate(2).unwrap();
    }

    #[test]
    fn constant_and_collinear_columns_still_fit() {
        let x = Array2::from_shape_fn((20, 3), |(i, j)| match j {
            0 => i as f64,
            1 => 2.0 * i as f64,
            _ => 1.0,
        });
        let y = Array1::from_shape_fn(20, |i| 4.0 * i as f64 + 1.0);
        let mut model = LinearRegression::new();
        model.fit(x.view(), y.view()).unwrap();

        assert_eq!(model.coefficients()[2], 0.0);
        let preds = model.predict(x.view()).unwrap();
        for (p, t) in preds.iter().zip(&y) {
            assert!((p - t).abs() < 1e-4, "{p} vs {t}");
        }
    }

    #[test]
    fn all_constant_columns_predict_the_mean() {
        let x = Array2::from_elem((4, 2), 3.0);
        let y = array![1.0, 2.0, 3.0, 6.0];
        let mut model = LinearRegression::new();
        model.fit(x.view(), y.view()).unwrap();
        let preds = model.predict(x.view()).unwrap();
        assert!(preds.iter().all(|p| (p - 3.0).abs() < 1e-12));
    }

    #[test]
    fn unfitted_model_and_importances() {
        let model = LinearRegression::new();
        let err = model.predict(array![[1.0]].view()).unwrap_err();
        assert!(matches!(err, CoreError::UntrainedModel));
        assert_eq!(model.importances(), Importances::Unavailable);
        assert!(matches!(model.validate(1), Err(CoreError::Data(_))));
    }

    #[test]
    fn rejects_non_finite_training_data() {
        let mut model = LinearRegression::new();
        let err = model.fit(array![[1.0], [f64::NAN]].view(), array![1.0, 2.0].view()).unwrap_err();
        assert!(matches!(err, CoreError::Training(_)));
    }

    #[test]
    fn coefficient_count_must_match_the_feature_set() {
        let x = Array2::from_shape_fn((10, 2), |(i, j)| (i * (j + 1)) as f64 + j as f64);
        let y = x.column(0).to_owned();
        let mut model = LinearRegression::new();
        model.fit(x.view(), y.view()).unwrap();
        assert!(matches!(model.validate(13), Err(CoreError::Data(_))));
    }
}
