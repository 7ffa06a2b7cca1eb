use serde::{Deserialize, Serialize};
use tracing::info;

use sc_core::{Record, Result};
use sc_features::{feature_matrix, Encoding, FeatureReference, UnseenPolicy};
use sc_predictors::Predictor;

use crate::ScenarioGenerator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedScenario {
    #[serde(rename = "ProductCategory")]
    pub category: String,
    #[serde(rename = "ProductBrand")]
    pub brand: String,
    #[serde(rename = "ProductPrice")]
    pub price: f64,
    pub predicted_sales: f64,
}

impl ScenarioGenerator {
    /// Engineers scenarios against the training reference, scores them and keeps the
    /// `top_k` highest predictions in descending order.
    pub fn score_scenarios<P>(
        &self,
        scenarios: &[Record],
        model: &P,
        reference: &FeatureReference,
    ) -> Result<Vec<RankedScenario>>
    where
        P: Predictor + ?Sized,
    {
        let engineered = self
            .engineer
            .engineer(scenarios, Encoding::Reference(reference, UnseenPolicy::Reject))?;
        let rows = feature_matrix(&engineered, model.features())?;
        let predictions = model.predict(rows.view())?;

        let mut ranked: Vec<RankedScenario> = scenarios
            .iter()
            .zip(predictions.iter())
            .map(|(s, &predicted_sales)| RankedScenario {
                category: s.category.clone(),
                brand: s.brand.clone(),
                price: s.price,
                predicted_sales,
            })
            .collect();
        // Descending, undefined predictions last.
        ranked.sort_by(|a, b| {
            let (x, y) = (a.predicted_sales, b.predicted_sales);
            x.is_nan().cmp(&y.is_nan()).then_with(|| y.total_cmp(&x))
        });
        ranked.truncate(self.cfg.top_k);
        Ok(ranked)
    }

    pub fn generate<'a, P>(
        &self,
        model: &P,
        dataset: impl IntoIterator<Item = &'a Record>,
        reference: &FeatureReference,
    ) -> Result<Vec<RankedScenario>>
    where
        P: Predictor + ?Sized,
    {
        let scenarios = self.build_scenarios(dataset)?;
        let ranked = self.score_scenarios(&scenarios, model, reference)?;
        info!(scenarios = scenarios.len(), returned = ranked.len(), "generated sales scenarios");
        Ok(ranked)
    }
}
