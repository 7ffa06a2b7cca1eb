use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use sc_core::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub mse: f64,
    pub r2: f64,
}

pub fn evaluate(
    actual: ArrayView1<'_, f64>,
    predicted: ArrayView1<'_, f64>,
) -> Result<RegressionMetrics> {
    if actual.len() != predicted.len() {
        return Err(CoreError::Training(format!(
            "{} targets but {} predictions",
            actual.len(),
            predicted.len()
        )));
    }
    let Some(mean) = actual.mean() else {
        return Err(CoreError::Training("cannot score an empty partition".into()));
    };
    let n = actual.len() as f64;

    let residuals = &actual - &predicted;
    let ss_res = residuals.dot(&residuals);
    let ss_tot = actual.mapv(|y| (y - mean).powi(2)).sum();

    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };

    Ok(RegressionMetrics { mae: residuals.mapv(f64::abs).sum() / n, mse: ss_res / n, r2 })
}
