//! Feature engineering: sales target, categorical codes and behavioral features.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sc_core::{CoreError, FeatureColumn, FeatureSet, Record, Result};

pub mod binning;
pub mod encoding;

pub use binning::{age_segment_code, AgeSegment, PriceTier, PriceTierEdges, PriceTierMode};
pub use encoding::{CategoryEncoding, UnseenPolicy};

pub const FREQUENCY_WEIGHT: f64 = 0.4;
pub const SATISFACTION_WEIGHT: f64 = 0.3;
pub const INTENT_WEIGHT: f64 = 0.3;

/// Universes and bin edges fixed by the training pass and reused downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureReference {
    pub categories: CategoryEncoding,
    pub brands: CategoryEncoding,
    pub price_tiers: PriceTierEdges,
}

impl FeatureReference {
    pub fn fit(records: &[Record]) -> Result<Self> {
        if records.is_empty() {
            return Err(CoreError::Data(
                "cannot build a feature reference from an empty dataset".into(),
            ));
        }
        Ok(Self {
            categories: CategoryEncoding::fit(records.iter().map(|r| r.category.as_str())),
            brands: CategoryEncoding::fit(records.iter().map(|r| r.brand.as_str())),
            price_tiers: PriceTierEdges::from_prices(records.iter().map(|r| r.price))?,
        })
    }
}

/// Codes to assign to rows that carry no category or brand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedCodes {
    pub category: i64,
    pub brand: i64,
}

impl Default for FixedCodes {
    fn default() -> Self {
        Self { category: 0, brand: 0 }
    }
}

/// How `encode_categorical` obtains category and brand codes.
#[derive(Debug, Clone, Copy)]
pub enum Encoding<'a> {
    /// Universes and price edges are derived from the batch itself.
    Own,
    /// Codes are looked up in a reference universe.
    Reference(&'a FeatureReference, UnseenPolicy),
    /// Every row gets the same category and brand codes.
    Fixed(&'a FeatureReference, FixedCodes),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoricalCodes {
    pub category: i64,
    pub brand: i64,
    pub age_segment: i64,
    pub price_tier: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BehavioralFeatures {
    pub behavior_score: f64,
    pub customer_value: f64,
    pub price_satisfaction_interaction: f64,
    pub age_frequency_interaction: f64,
}

/// A record together with whatever derived stages have been applied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineeredRecord {
    pub record: Record,
    pub sales_potential: f64,
    pub codes: Option<CategoricalCodes>,
    pub behavior: Option<BehavioralFeatures>,
}

impl EngineeredRecord {
    pub fn value(&self, column: FeatureColumn) -> Result<f64> {
        let r = &self.record;
        let value = match column {
            FeatureColumn::ProductPrice => r.price,
            FeatureColumn::CustomerAge => r.age as f64,
            FeatureColumn::CustomerGender => r.gender as f64,
            FeatureColumn::PurchaseFrequency => r.frequency as f64,
            FeatureColumn::CustomerSatisfaction => r.satisfaction as f64,
            FeatureColumn::CategoryEncoded => self.codes()?.category as f64,
            FeatureColumn::BrandEncoded => self.codes()?.brand as f64,
            FeatureColumn::AgeSegmentEncoded => self.codes()?.age_segment as f64,
            FeatureColumn::PriceTierEncoded => self.codes()?.price_tier as f64,
            FeatureColumn::BehaviorScore => self.behavior()?.behavior_score,
            FeatureColumn::CustomerValue => self.behavior()?.customer_value,
            FeatureColumn::PriceSatisfactionInteraction => {
                self.behavior()?.price_satisfaction_interaction
            }
            FeatureColumn::AgeFrequencyInteraction => self.behavior()?.age_frequency_interaction,
        };
        Ok(value)
    }

    fn codes(&self) -> Result<&CategoricalCodes> {
        self.codes
            .as_ref()
            .ok_or_else(|| CoreError::Data("categorical encoding has not been applied".into()))
    }

    fn behavior(&self) -> Result<&BehavioralFeatures> {
        self.behavior
            .as_ref()
            .ok_or_else(|| CoreError::Data("behavioral features have not been derived".into()))
    }
}

/// One row per record, columns in feature-set order.
pub fn feature_matrix(records: &[EngineeredRecord], features: &FeatureSet) -> Result<Array2<f64>> {
    let mut matrix = Array2::zeros((records.len(), features.len()));
    for (mut row, record) in matrix.rows_mut().into_iter().zip(records) {
        for (slot, &column) in row.iter_mut().zip(features.columns()) {
            *slot = record.value(column)?;
        }
    }
    Ok(matrix)
}

pub fn targets(records: &[EngineeredRecord]) -> Array1<f64> {
    records.iter().map(|r| r.sales_potential).collect()
}

pub fn sales_potential(record: &Record) -> f64 {
    record.price * record.intent as f64 * (record.satisfaction as f64 / 5.0)
}

pub fn behavior_score(record: &Record) -> f64 {
    record.frequency as f64 * FREQUENCY_WEIGHT
        + record.satisfaction as f64 * SATISFACTION_WEIGHT
        + record.intent as f64 * INTENT_WEIGHT
}

/// Output of the training-side feature pass.
#[derive(Debug, Clone)]
pub struct ProcessedDataset {
    pub records: Vec<EngineeredRecord>,
    pub features: FeatureSet,
    pub reference: FeatureReference,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEngineer {
    price_tiers: PriceTierMode,
}

impl FeatureEngineer {
    pub fn new(price_tiers: PriceTierMode) -> Self {
        Self { price_tiers }
    }

    pub fn derive_target(&self, records: &[Record]) -> Result<Vec<EngineeredRecord>> {
        records
            .iter()
            .map(|record| {
                record.check_target_inputs()?;
                Ok(EngineeredRecord {
                    record: record.clone(),
                    sales_potential: sales_potential(record),
                    codes: None,
                    behavior: None,
                })
            })
            .collect()
    }

    pub fn encode_categorical(
        &self,
        records: Vec<EngineeredRecord>,
        encoding: Encoding<'_>,
    ) -> Result<Vec<EngineeredRecord>> {
        if records.is_empty() {
            return Ok(records);
        }
        let (reference, fixed, unseen) = match encoding {
            Encoding::Own => {
                // A batch reference has the batch's own price range, so both tier modes agree.
                let raw: Vec<Record> = records.iter().map(|r| r.record.clone()).collect();
                let reference = FeatureReference::fit(&raw)?;
                let encoding = Encoding::Reference(&reference, UnseenPolicy::Reject);
                return self.encode_categorical(records, encoding);
            }
            Encoding::Reference(reference, unseen) => (reference, None, unseen),
            Encoding::Fixed(reference, codes) => (reference, Some(codes), UnseenPolicy::Reject),
        };
        let edges = match self.price_tiers {
            PriceTierMode::Reference => reference.price_tiers,
            PriceTierMode::PerBatch => {
                PriceTierEdges::from_prices(records.iter().map(|r| r.record.price))?
            }
        };

        records
            .into_iter()
            .map(|mut row| {
                let (category, brand) = match fixed {
                    Some(codes) => (codes.category, codes.brand),
                    None => lookup(reference, &row.record, unseen)?,
                };
                row.codes = Some(CategoricalCodes {
                    category,
                    brand,
                    age_segment: age_segment_code(row.record.age),
                    price_tier: edges.tier(row.record.price).code(),
                });
                Ok(row)
            })
            .collect()
    }

    pub fn derive_behavioral(&self, records: Vec<EngineeredRecord>) -> Vec<EngineeredRecord> {
        records
            .into_iter()
            .map(|mut row| {
                let r = &row.record;
                let score = behavior_score(r);
                row.behavior = Some(BehavioralFeatures {
                    behavior_score: score,
                    customer_value: (r.age as f64 / 100.0) * score * (r.price / 1000.0),
                    price_satisfaction_interaction: r.price * r.satisfaction as f64,
                    age_frequency_interaction: r.age as f64 * r.frequency as f64,
                });
                row
            })
            .collect()
    }

    /// Runs target, categorical and behavioral stages in order.
    pub fn engineer(
        &self,
        records: &[Record],
        encoding: Encoding<'_>,
    ) -> Result<Vec<EngineeredRecord>> {
        let rows = self.derive_target(records)?;
        let rows = self.encode_categorical(rows, encoding)?;
        Ok(self.derive_behavioral(rows))
    }

    /// Training-side pass: fits the reference on the full dataset and engineers every row.
    pub fn process_dataset(&self, raw: &[Record]) -> Result<ProcessedDataset> {
        if raw.is_empty() {
            return Err(CoreError::Data("dataset is empty".into()));
        }
        let reference = FeatureReference::fit(raw)?;
        let records = self.engineer(raw, Encoding::Reference(&reference, UnseenPolicy::Reject))?;

        let (lo, hi) = records
            .iter()
            .map(|r| r.sales_potential)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        info!(min = lo, max = hi, "sales potential range");

        let features = FeatureSet::default();
        debug!(
            categories = reference.categories.len(),
            brands = reference.brands.len(),
            "category universes fixed"
        );
        info!(count = features.len(), "created features for modeling");
        Ok(ProcessedDataset { records, features, reference })
    }
}

fn lookup(
    reference: &FeatureReference,
    record: &Record,
    unseen: UnseenPolicy,
) -> Result<(i64, i64)> {
    Ok((
        reference.categories.encode("category", &record.category, unseen)?,
        reference.brands.encode("brand", &record.brand, unseen)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn record(category: &str, brand: &str, price: f64, satisfaction: u32, intent: u8) -> Record {
        Record {
            category: category.into(),
            brand: brand.into(),
            price,
            age: 30,
            gender: 1,
            frequency: 4,
            satisfaction,
            intent,
        }
    }

    fn sample() -> Vec<Record> {
        vec![
            record("Phones", "Samsung", 500.0, 4, 1),
            record("Laptops", "Apple", 1500.0, 5, 1),
            record("Tablets", "Sony", 300.0, 2, 0),
            record("Phones", "Apple", 900.0, 3, 1),
        ]
    }

    #[test]
    fn sales_potential_boundaries() {
        let engineer = FeatureEngineer::default();
        let rows = engineer
            .derive_target(&[
                record("P", "A", 250.0, 5, 1),
                record("P", "A", 250.0, 4, 0),
                record("P", "A", 250.0, 2, 1),
            ])
            .unwrap();
        assert!((rows[0].sales_potential - 250.0).abs() < EPS);
        assert_eq!(rows[1].sales_potential, 0.0);
        assert!((rows[2].sales_potential - 100.0).abs() < EPS);
    }

    #[test]
    fn derive_target_rejects_non_numeric_price() {
        let engineer = FeatureEngineer::default();
        let err = engineer.derive_target(&[record("P", "A", f64::NAN, 3, 1)]).unwrap_err();
        assert!(matches!(err, CoreError::Data(_)));
    }

    #[test]
    fn behavioral_features_use_fixed_weights() {
        let engineer = FeatureEngineer::default();
        let rows = engineer.engineer(&sample(), Encoding::Own).unwrap();
        for row in &rows {
            let r = &row.record;
            let b = row.behavior.unwrap();
            let expected =
                0.4 * r.frequency as f64 + 0.3 * r.satisfaction as f64 + 0.3 * r.intent as f64;
            let value = r.age as f64 / 100.0 * expected * r.price / 1000.0;
            assert!((b.behavior_score - expected).abs() < EPS);
            assert!((b.customer_value - value).abs() < EPS);
            let interaction = r.price * r.satisfaction as f64;
            assert!((b.price_satisfaction_interaction - interaction).abs() < EPS);
            assert!((b.age_frequency_interaction - (r.age * r.frequency) as f64).abs() < EPS);
        }
    }

    #[test]
    fn own_encoding_uses_sorted_universe_of_the_batch() {
        let engineer = FeatureEngineer::default();
        let rows = engineer.engineer(&sample(), Encoding::Own).unwrap();
        let cats: Vec<i64> = rows.iter().map(|r| r.codes.unwrap().category).collect();
        let brands: Vec<i64> = rows.iter().map(|r| r.codes.unwrap().brand).collect();
        // Laptops=0, Phones=1, Tablets=2 / Apple=0, Samsung=1, Sony=2
        assert_eq!(cats, vec![1, 0, 2, 1]);
        assert_eq!(brands, vec![1, 0, 2, 0]);
    }

    #[test]
    fn reference_encoding_ignores_the_subset_universe() {
        let engineer = FeatureEngineer::default();
        let reference = FeatureReference::fit(&sample()).unwrap();
        let subset = vec![record("Tablets", "Sony", 300.0, 4, 1)];

        let own = engineer.engineer(&subset, Encoding::Own).unwrap();
        assert_eq!(own[0].codes.unwrap().category, 0);

        let referenced = engineer
            .engineer(&subset, Encoding::Reference(&reference, UnseenPolicy::Reject))
            .unwrap();
        assert_eq!(referenced[0].codes.unwrap().category, 2);
        assert_eq!(referenced[0].codes.unwrap().brand, 2);
    }

    #[test]
    fn unseen_reference_values_are_explicit() {
        let engineer = FeatureEngineer::default();
        let reference = FeatureReference::fit(&sample()).unwrap();
        let unseen = vec![record("Cameras", "Canon", 400.0, 4, 1)];

        let err = engineer
            .engineer(&unseen, Encoding::Reference(&reference, UnseenPolicy::Reject))
            .unwrap_err();
        assert!(matches!(err, CoreError::Encoding { universe: "category", .. }));

        let rows = engineer
            .engineer(&unseen, Encoding::Reference(&reference, UnseenPolicy::Sentinel))
            .unwrap();
        assert_eq!(rows[0].codes.unwrap().category, sc_core::UNKNOWN_CODE);
        assert_eq!(rows[0].codes.unwrap().brand, sc_core::UNKNOWN_CODE);
    }

    #[test]
    fn fixed_codes_apply_to_every_row() {
        let engineer = FeatureEngineer::default();
        let reference = FeatureReference::fit(&sample()).unwrap();
        let rows = engineer
            .engineer(&sample(), Encoding::Fixed(&reference, FixedCodes::default()))
            .unwrap();
        assert!(rows.iter().all(|r| r.codes.unwrap().category == 0 && r.codes.unwrap().brand == 0));
    }

    #[test]
    fn per_batch_tiers_rebin_small_inputs() {
        let reference = FeatureReference::fit(&sample()).unwrap();
        let single = vec![record("Phones", "Apple", 300.0, 4, 1)];
        let encoding = Encoding::Reference(&reference, UnseenPolicy::Reject);

        // Against the training range 300..1500, 300 is the cheapest tier.
        let fixed =
            FeatureEngineer::new(PriceTierMode::Reference).engineer(&single, encoding).unwrap();
        assert_eq!(fixed[0].codes.unwrap().price_tier, PriceTier::Budget.code());

        // A one-row batch has a degenerate range and always lands mid-tier.
        let rebinned =
            FeatureEngineer::new(PriceTierMode::PerBatch).engineer(&single, encoding).unwrap();
        assert_eq!(rebinned[0].codes.unwrap().price_tier, PriceTier::Mid.code());
    }

    #[test]
    fn engineering_is_idempotent_for_a_fixed_reference() {
        let engineer = FeatureEngineer::default();
        let reference = FeatureReference::fit(&sample()).unwrap();
        let encoding = Encoding::Reference(&reference, UnseenPolicy::Reject);
        let first = engineer.engineer(&sample(), encoding).unwrap();
        let second = engineer.engineer(&sample(), encoding).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn feature_matrix_requires_every_stage() {
        let engineer = FeatureEngineer::default();
        let targeted = engineer.derive_target(&sample()).unwrap();
        assert!(feature_matrix(&targeted, &FeatureSet::default()).is_err());

        let processed = engineer.process_dataset(&sample()).unwrap();
        let matrix = feature_matrix(&processed.records, &processed.features).unwrap();
        assert_eq!(matrix.dim(), (4, 13));
        assert_eq!(matrix[[1, 0]], 1500.0);
        assert_eq!(targets(&processed.records)[1], 1500.0);
    }

    #[test]
    fn empty_dataset_is_a_data_error() {
        let err = FeatureEngineer::default().process_dataset(&[]).unwrap_err();
        assert!(matches!(err, CoreError::Data(_)));
    }
}
