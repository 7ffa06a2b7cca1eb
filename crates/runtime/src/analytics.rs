use std::collections::BTreeMap;

use serde::Serialize;

use sc_core::{CoreError, Result};
use sc_features::EngineeredRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Summary of a processed dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetAnalytics {
    pub total_records: usize,
    pub avg_sales_potential: f64,
    pub max_sales_potential: f64,
    pub categories: BTreeMap<String, usize>,
    pub price_range: PriceRange,
}

pub fn summarize(records: &[EngineeredRecord]) -> Result<DatasetAnalytics> {
    if records.is_empty() {
        return Err(CoreError::Data("no records to summarize".into()));
    }
    let n = records.len() as f64;
    let mut categories = BTreeMap::new();
    let mut potential_sum = 0.0;
    let mut potential_max = f64::NEG_INFINITY;
    let mut price = PriceRange { min: f64::INFINITY, max: f64::NEG_INFINITY, avg: 0.0 };

    for row in records {
        *categories.entry(row.record.category.clone()).or_insert(0) += 1;
        potential_sum += row.sales_potential;
        potential_max = potential_max.max(row.sales_potential);
        price.min = price.min.min(row.record.price);
        price.max = price.max.max(row.record.price);
        price.avg += row.record.price;
    }
    price.avg /= n;

    Ok(DatasetAnalytics {
        total_records: records.len(),
        avg_sales_potential: potential_sum / n,
        max_sales_potential: potential_max,
        categories,
        price_range: price,
    })
}
