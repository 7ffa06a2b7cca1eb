use std::collections::HashMap;

use tracing::debug;

use sc_core::{CoreError, Record, Result};

use crate::{
    ScenarioGenerator, SCENARIO_AGE, SCENARIO_FREQUENCY, SCENARIO_GENDER, SCENARIO_INTENT,
    SCENARIO_SATISFACTION,
};

struct CategoryStats<'a> {
    name: &'a str,
    prices: Vec<f64>,
    brands: Vec<&'a str>,
}

impl ScenarioGenerator {
    /// One scenario per (category, brand) pair: categories in first-seen order, each with its
    /// leading first-seen brands, priced at the category median.
    pub fn build_scenarios<'a>(
        &self,
        reference: impl IntoIterator<Item = &'a Record>,
    ) -> Result<Vec<Record>> {
        let mut order: HashMap<&str, usize> = HashMap::new();
        let mut stats: Vec<CategoryStats<'a>> = Vec::new();

        for record in reference {
            let slot = *order.entry(record.category.as_str()).or_insert_with(|| {
                stats.push(CategoryStats {
                    name: &record.category,
                    prices: Vec::new(),
                    brands: Vec::new(),
                });
                stats.len() - 1
            });
            let entry = &mut stats[slot];
            entry.prices.push(record.price);
            if !entry.brands.contains(&record.brand.as_str()) {
                entry.brands.push(&record.brand);
            }
        }
        if stats.is_empty() {
            return Err(CoreError::Data("reference dataset is empty".into()));
        }

        let take = self.cfg.brands_taken();
        let mut scenarios = Vec::new();
        for category in stats {
            let price = median(&category.prices).ok_or_else(|| {
                CoreError::Data(format!("no prices for category {}", category.name))
            })?;
            for brand in category.brands.into_iter().take(take) {
                scenarios.push(Record {
                    category: category.name.to_string(),
                    brand: brand.to_string(),
                    price,
                    age: SCENARIO_AGE,
                    gender: SCENARIO_GENDER,
                    frequency: SCENARIO_FREQUENCY,
                    satisfaction: SCENARIO_SATISFACTION,
                    intent: SCENARIO_INTENT,
                });
            }
        }
        debug!(count = scenarios.len(), "built scenarios");
        Ok(scenarios)
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 { (sorted[mid - 1] + sorted[mid]) / 2.0 } else { sorted[mid] })
}
