use tracing::debug;

use sc_core::{AdHocFields, CoreError, RawInput, Result};
use sc_features::{feature_matrix, Encoding, FeatureEngineer, FeatureReference, FixedCodes};
use sc_predictors::Predictor;

/// Point prediction for a single caller-supplied record.
///
/// Callers supply no category or brand, so those features take the configured fixed
/// codes (0 unless overridden) rather than a lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceAdapter {
    engineer: FeatureEngineer,
    defaults: FixedCodes,
}

impl InferenceAdapter {
    pub fn new(engineer: FeatureEngineer, defaults: FixedCodes) -> Self {
        Self { engineer, defaults }
    }

    pub fn predict_one<P>(
        &self,
        input: &RawInput,
        model: &P,
        reference: &FeatureReference,
    ) -> Result<f64>
    where
        P: Predictor + ?Sized,
    {
        let fields = input.coerce()?;
        self.predict_fields(fields, model, reference)
    }

    pub fn predict_fields<P>(
        &self,
        fields: AdHocFields,
        model: &P,
        reference: &FeatureReference,
    ) -> Result<f64>
    where
        P: Predictor + ?Sized,
    {
        let record = fields.into_record();
        let encoding = Encoding::Fixed(reference, self.defaults);
        let engineered = self.engineer.engineer(std::slice::from_ref(&record), encoding)?;
        let rows = feature_matrix(&engineered, model.features())?;
        let prediction = model
            .predict(rows.view())?
            .get(0)
            .copied()
            .ok_or_else(|| CoreError::Data("model returned no prediction".into()))?;
        debug!(?fields, prediction, "single prediction");
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, ArrayView2, Axis};
    use sc_core::{FeatureColumn, FeatureSet, Record};
    use sc_features::PriceTierMode;

    use super::*;

    struct Echo(FeatureSet);

    impl Predictor for Echo {
        fn features(&self) -> &FeatureSet {
            &self.0
        }

        fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
            Ok(rows.sum_axis(Axis(1)))
        }
    }

    fn reference() -> FeatureReference {
        let rows: Vec<Record> = [("Phones", "Apple", 100.0), ("Laptops", "Dell", 1100.0)]
            .iter()
            .map(|&(c, b, p)| Record {
                category: c.into(),
                brand: b.into(),
                price: p,
                age: 40,
                gender: 1,
                frequency: 2,
                satisfaction: 4,
                intent: 1,
            })
            .collect();
        FeatureReference::fit(&rows).unwrap()
    }

    fn input() -> RawInput {
        RawInput::new()
            .with("price", 200)
            .with("age", 30)
            .with("gender", 1)
            .with("frequency", 2)
            .with("satisfaction", 3)
            .with("intent", 1)
    }

    #[test]
    fn category_and_brand_take_the_fixed_defaults() {
        let columns = vec![FeatureColumn::CategoryEncoded, FeatureColumn::BrandEncoded];
        let model = Echo(FeatureSet::new(columns).unwrap());
        let adapter = InferenceAdapter::default();
        assert_eq!(adapter.predict_one(&input(), &model, &reference()).unwrap(), 0.0);

        let codes = FixedCodes { category: 1, brand: 0 };
        let custom = InferenceAdapter::new(FeatureEngineer::default(), codes);
        assert_eq!(custom.predict_one(&input(), &model, &reference()).unwrap(), 1.0);
    }

    #[test]
    fn derived_features_follow_the_training_pipeline() {
        let columns = vec![FeatureColumn::BehaviorScore, FeatureColumn::PriceTierEncoded];
        let model = Echo(FeatureSet::new(columns).unwrap());
        // behavior = 0.4*2 + 0.3*3 + 0.3*1 = 2.0; price 200 on a 100..1100 range is Budget (0)
        let reference_tiers = InferenceAdapter::default();
        let p = reference_tiers.predict_one(&input(), &model, &reference()).unwrap();
        assert!((p - 2.0).abs() < 1e-9);

        // Rebinning a single row always yields the middle tier (2)
        let engineer = FeatureEngineer::new(PriceTierMode::PerBatch);
        let per_batch = InferenceAdapter::new(engineer, FixedCodes::default());
        let p = per_batch.predict_one(&input(), &model, &reference()).unwrap();
        assert!((p - 4.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let model = Echo(FeatureSet::default());
        let adapter = InferenceAdapter::default();
        let first = adapter.predict_one(&input(), &model, &reference()).unwrap();
        for _ in 0..5 {
            assert_eq!(adapter.predict_one(&input(), &model, &reference()).unwrap(), first);
        }
    }

    #[test]
    fn invalid_input_is_a_validation_error() {
        let model = Echo(FeatureSet::default());
        let bad = input().with("satisfaction", "great");
        let err = InferenceAdapter::default().predict_one(&bad, &model, &reference()).unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
    }
}
