//! Category/brand what-if scenarios and single-record inference.

use serde::{Deserialize, Serialize};

pub mod builder;
pub mod inference;
pub mod ranking;

pub use builder::median;
pub use inference::InferenceAdapter;
pub use ranking::RankedScenario;

/// Representative customer used for every scenario row.
pub const SCENARIO_AGE: u32 = 35;
pub const SCENARIO_GENDER: i64 = 1;
pub const SCENARIO_FREQUENCY: u32 = 3;
pub const SCENARIO_SATISFACTION: u32 = 4;
pub const SCENARIO_INTENT: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub top_k: usize,
    /// Leading distinct brands considered per category.
    pub brand_pool: usize,
    pub brands_per_category: usize,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self { top_k: 10, brand_pool: 5, brands_per_category: 3 }
    }
}

impl ScenarioConfig {
    pub fn brands_taken(&self) -> usize {
        self.brand_pool.min(self.brands_per_category)
    }
}

pub struct ScenarioGenerator {
    cfg: ScenarioConfig,
    engineer: sc_features::FeatureEngineer,
}

impl ScenarioGenerator {
    pub fn new(cfg: ScenarioConfig, engineer: sc_features::FeatureEngineer) -> Self {
        Self { cfg, engineer }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.cfg
    }
}
