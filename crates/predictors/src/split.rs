use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use sc_core::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitParams {
    pub test_size: f64,
    pub random_state: u64,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self { test_size: 0.2, random_state: 42 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Seeded shuffle; the first `ceil(test_size * n)` shuffled indices form the test partition.
pub fn train_test_split(n: usize, params: SplitParams) -> Result<SplitIndices> {
    if !(params.test_size > 0.0 && params.test_size < 1.0) {
        return Err(CoreError::Training(format!(
            "test_size must be in (0, 1), got {}",
            params.test_size
        )));
    }
    let n_test = (params.test_size * n as f64).ceil() as usize;
    if n_test < 2 || n_test >= n {
        return Err(CoreError::Training(format!(
            "{n} rows cannot be split into train and test partitions of at least 2 rows each"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(params.random_state);
    indices.shuffle(&mut rng);
    let train = indices.split_off(n_test);
    Ok(SplitIndices { train, test: indices })
}
