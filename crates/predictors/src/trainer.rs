use ndarray::{Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sc_core::{CoreError, FeatureColumn, FeatureSet, Result};
use sc_features::{feature_matrix, targets, EngineeredRecord};

use crate::metrics::{evaluate, RegressionMetrics};
use crate::split::{train_test_split, SplitParams};
use crate::{
    check_rows, ForestParams, Importances, LinearRegression, ModelKind, Predictor,
    RandomForestRegressor, Regressor, TrainedModel,
};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub split: SplitParams,
    pub forest: ForestParams,
}

/// One fitted variant with its held-out evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantReport {
    pub kind: ModelKind,
    pub model: TrainedModel,
    pub metrics: RegressionMetrics,
    pub predictions: Array1<f64>,
    pub actual: Array1<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFeature {
    pub feature: FeatureColumn,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureImportance {
    /// Descending by importance.
    Ranked(Vec<RankedFeature>),
    Unavailable(ModelKind),
}

/// Artifact of one training run. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BundleParts")]
pub struct ModelBundle {
    features: FeatureSet,
    variants: Vec<VariantReport>,
    best: usize,
}

#[derive(Deserialize)]
struct BundleParts {
    features: FeatureSet,
    variants: Vec<VariantReport>,
    best: usize,
}

impl TryFrom<BundleParts> for ModelBundle {
    type Error = CoreError;

    fn try_from(parts: BundleParts) -> Result<Self> {
        let BundleParts { features, variants, best } = parts;
        if best >= variants.len() {
            return Err(CoreError::Data(format!(
                "best variant {best} is out of range for {} variants",
                variants.len()
            )));
        }
        for variant in &variants {
            variant.model.validate(features.len())?;
        }
        Ok(Self { features, variants, best })
    }
}

impl ModelBundle {
    pub fn best(&self) -> &VariantReport {
        &self.variants[self.best]
    }

    pub fn best_kind(&self) -> ModelKind {
        self.best().kind
    }

    pub fn variants(&self) -> &[VariantReport] {
        &self.variants
    }

    pub fn variant(&self, kind: ModelKind) -> Option<&VariantReport> {
        self.variants.iter().find(|v| v.kind == kind)
    }

    pub fn feature_importance(&self) -> FeatureImportance {
        rank_importances(&self.best().model, &self.features)
    }

    pub fn selected(&self) -> SelectedModel {
        let best = self.best();
        SelectedModel {
            kind: best.kind,
            model: best.model.clone(),
            features: self.features.clone(),
            metrics: best.metrics,
        }
    }
}

impl Predictor for ModelBundle {
    fn features(&self) -> &FeatureSet {
        &self.features
    }

    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        check_rows(rows, self.features.len())?;
        self.best().model.predict(rows)
    }
}

/// The winning variant on its own, as handed to a serving layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedModel {
    pub kind: ModelKind,
    pub model: TrainedModel,
    pub features: FeatureSet,
    pub metrics: RegressionMetrics,
}

impl SelectedModel {
    pub fn feature_importance(&self) -> FeatureImportance {
        rank_importances(&self.model, &self.features)
    }
}

impl Predictor for SelectedModel {
    fn features(&self) -> &FeatureSet {
        &self.features
    }

    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        check_rows(rows, self.features.len())?;
        self.model.predict(rows)
    }
}

fn rank_importances(model: &TrainedModel, features: &FeatureSet) -> FeatureImportance {
    match model.importances() {
        Importances::Unavailable => FeatureImportance::Unavailable(model.kind()),
        Importances::Available(scores) => {
            let mut ranked: Vec<RankedFeature> = features
                .columns()
                .iter()
                .zip(scores)
                .map(|(&feature, importance)| RankedFeature { feature, importance })
                .collect();
            ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
            FeatureImportance::Ranked(ranked)
        }
    }
}

/// Index of the variant with the highest R². Only a strictly higher score displaces
/// the incumbent, so ties go to the earlier variant.
pub fn select_best(variants: &[VariantReport]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, v) in variants.iter().enumerate() {
        if best.map_or(true, |b| v.metrics.r2 > variants[b].metrics.r2) {
            best = Some(i);
        }
    }
    best
}

/// Splits the dataset, fits both variants on the train partition, scores them on the
/// test partition and picks the winner.
pub fn train_and_select(
    config: &TrainerConfig,
    dataset: &[EngineeredRecord],
    features: &FeatureSet,
) -> Result<ModelBundle> {
    let x = feature_matrix(dataset, features)?;
    let y = targets(dataset);
    info!(rows = x.nrows(), features = features.len(), "training models");
    debug!(columns = ?features.names(), "feature columns");

    let split = train_test_split(x.nrows(), config.split)?;
    let (x_train, y_train) = (x.select(Axis(0), &split.train), y.select(Axis(0), &split.train));
    let (x_test, y_test) = (x.select(Axis(0), &split.test), y.select(Axis(0), &split.test));
    info!(train = x_train.nrows(), test = x_test.nrows(), "split dataset");

    let candidates = [
        TrainedModel::RandomForest(RandomForestRegressor::new(config.forest)),
        TrainedModel::LinearRegression(LinearRegression::new()),
    ];

    let mut variants = Vec::with_capacity(candidates.len());
    for mut model in candidates {
        let kind = model.kind();
        info!(model = %kind, "fitting variant");
        model.fit(x_train.view(), y_train.view())?;
        let predictions = model.predict(x_test.view())?;
        let metrics = evaluate(y_test.view(), predictions.view())?;
        info!(
            model = %kind,
            mae = metrics.mae,
            mse = metrics.mse,
            r2 = metrics.r2,
            "variant scored"
        );
        variants.push(VariantReport { kind, model, metrics, predictions, actual: y_test.clone() });
    }

    let best = select_best(&variants)
        .ok_or_else(|| CoreError::Training("no variant produced a score".into()))?;
    info!(model = %variants[best].kind, r2 = variants[best].metrics.r2, "selected best model");

    Ok(ModelBundle { features: features.clone(), variants, best })
}

/// Holds the most recent bundle. Retraining replaces the bundle rather than mutating it.
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    config: TrainerConfig,
    bundle: Option<ModelBundle>,
}

impl ModelTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config, bundle: None }
    }

    pub fn train(
        &mut self,
        dataset: &[EngineeredRecord],
        features: &FeatureSet,
    ) -> Result<&ModelBundle> {
        let bundle = train_and_select(&self.config, dataset, features)?;
        Ok(&*self.bundle.insert(bundle))
    }

    pub fn bundle(&self) -> Result<&ModelBundle> {
        self.bundle.as_ref().ok_or(CoreError::UntrainedModel)
    }

    pub fn into_bundle(self) -> Result<ModelBundle> {
        self.bundle.ok_or(CoreError::UntrainedModel)
    }

    pub fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        Predictor::predict(self.bundle()?, rows)
    }

    pub fn feature_importance(&self) -> Result<FeatureImportance> {
        Ok(self.bundle()?.feature_importance())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;
    use sc_core::Record;
    use sc_features::FeatureEngineer;

    use super::*;

    fn dataset(n: usize) -> Vec<EngineeredRecord> {
        let categories = ["Phones", "Laptops", "Tablets", "Headphones"];
        let brands = ["Apple", "Samsung", "Sony", "HP", "Other"];
        let raw: Vec<Record> = (0..n)
            .map(|i| Record {
                category: categories[i % 4].to_string(),
                brand: brands[(i / 3) % 5].to_string(),
                price: 100.0 + ((i * 37) % 29) as f64 * 50.0,
                age: 18 + ((i * 11) % 60) as u32,
                gender: (i % 2) as i64,
                frequency: ((i * 7) % 20) as u32,
                satisfaction: 1 + (i % 5) as u32,
                intent: ((i * 3) % 4 != 0) as u8,
            })
            .collect();
        FeatureEngineer::default().process_dataset(&raw).unwrap().records
    }

    fn fast_config() -> TrainerConfig {
        TrainerConfig {
            forest: ForestParams { n_estimators: 8, ..ForestParams::default() },
            ..TrainerConfig::default()
        }
    }

    fn report(kind: ModelKind, r2: f64) -> VariantReport {
        let model = match kind {
            ModelKind::RandomForest => {
                TrainedModel::RandomForest(RandomForestRegressor::new(ForestParams::default()))
            }
            ModelKind::LinearRegression => TrainedModel::LinearRegression(LinearRegression::new()),
        };
        VariantReport {
            kind,
            model,
            metrics: RegressionMetrics { mae: 0.0, mse: 0.0, r2 },
            predictions: Array1::zeros(0),
            actual: Array1::zeros(0),
        }
    }

    #[test]
    fn selection_prefers_highest_r2_and_first_on_ties() {
        let variants =
            vec![report(ModelKind::RandomForest, 0.5), report(ModelKind::LinearRegression, 0.7)];
        assert_eq!(select_best(&variants), Some(1));
        let tied =
            vec![report(ModelKind::RandomForest, 0.7), report(ModelKind::LinearRegression, 0.7)];
        assert_eq!(select_best(&tied), Some(0));
        assert_eq!(select_best(&[]), None);
    }

    #[test]
    fn bundle_parts_with_a_dangling_best_index_are_rejected() {
        let trained =
            train_and_select(&fast_config(), &dataset(40), &FeatureSet::default()).unwrap();
        let parts = |best| BundleParts {
            features: trained.features.clone(),
            variants: trained.variants.clone(),
            best,
        };
        assert_eq!(ModelBundle::try_from(parts(trained.best)).unwrap(), trained);
        assert!(matches!(ModelBundle::try_from(parts(2)), Err(CoreError::Data(_))));

        let unfitted = BundleParts {
            features: FeatureSet::default(),
            variants: vec![report(ModelKind::LinearRegression, 0.1)],
            best: 0,
        };
        assert!(matches!(ModelBundle::try_from(unfitted), Err(CoreError::Data(_))));
    }

    #[test]
    fn trains_both_variants_and_scores_the_test_partition() {
        let data = dataset(120);
        let bundle = train_and_select(&fast_config(), &data, &FeatureSet::default()).unwrap();

        let kinds: Vec<ModelKind> = bundle.variants().iter().map(|v| v.kind).collect();
        assert_eq!(kinds, vec![ModelKind::RandomForest, ModelKind::LinearRegression]);
        for v in bundle.variants() {
            assert_eq!(v.predictions.len(), 24);
            assert_eq!(v.actual.len(), 24);
            assert!(v.metrics.mse >= 0.0 && v.metrics.mae >= 0.0);
        }
        let best = bundle.best().metrics.r2;
        assert!(bundle.variants().iter().all(|v| v.metrics.r2 <= best));
    }

    #[test]
    fn training_is_deterministic() {
        let data = dataset(100);
        let a = train_and_select(&fast_config(), &data, &FeatureSet::default()).unwrap();
        let b = train_and_select(&fast_config(), &data, &FeatureSet::default()).unwrap();
        assert_eq!(a.best_kind(), b.best_kind());
        for (va, vb) in a.variants().iter().zip(b.variants()) {
            assert!((va.metrics.r2 - vb.metrics.r2).abs() < 1e-9);
            assert!((va.metrics.mae - vb.metrics.mae).abs() < 1e-9);
        }
    }

    #[test]
    fn trainer_refuses_to_predict_before_training() {
        let trainer = ModelTrainer::new(fast_config());
        let rows = Array2::<f64>::zeros((1, 13));
        assert!(matches!(trainer.predict(rows.view()), Err(CoreError::UntrainedModel)));
        assert!(matches!(trainer.feature_importance(), Err(CoreError::UntrainedModel)));
        assert!(matches!(trainer.into_bundle(), Err(CoreError::UntrainedModel)));
    }

    #[test]
    fn trainer_predicts_with_the_best_variant() {
        let data = dataset(80);
        let features = FeatureSet::default();
        let mut trainer = ModelTrainer::new(fast_config());
        trainer.train(&data, &features).unwrap();

        let rows = feature_matrix(&data[..3], &features).unwrap();
        let via_trainer = trainer.predict(rows.view()).unwrap();
        let via_model = trainer.bundle().unwrap().best().model.predict(rows.view()).unwrap();
        assert_eq!(via_trainer, via_model);
        let narrow = Array2::<f64>::ones((1, 4));
        assert!(matches!(trainer.predict(narrow.view()), Err(CoreError::Data(_))));
    }

    #[test]
    fn importance_is_ranked_for_forests_and_unavailable_for_linear() {
        let data = dataset(80);
        let bundle = train_and_select(&fast_config(), &data, &FeatureSet::default()).unwrap();

        let forest = bundle.variant(ModelKind::RandomForest).unwrap();
        match rank_importances(&forest.model, &FeatureSet::default()) {
            FeatureImportance::Ranked(ranked) => {
                assert_eq!(ranked.len(), 13);
                assert!(ranked.windows(2).all(|w| w[0].importance >= w[1].importance));
            }
            other => panic!("forest importances should be ranked, got {other:?}"),
        }

        let linear = bundle.variant(ModelKind::LinearRegression).unwrap();
        assert_eq!(
            rank_importances(&linear.model, &FeatureSet::default()),
            FeatureImportance::Unavailable(ModelKind::LinearRegression)
        );
    }

    #[test]
    fn tiny_datasets_fail_with_a_training_error() {
        let data = dataset(4);
        let err = train_and_select(&fast_config(), &data, &FeatureSet::default()).unwrap_err();
        assert!(matches!(err, CoreError::Training(_)));
    }

    #[test]
    fn selected_model_predicts_like_the_bundle() {
        let data = dataset(60);
        let features = FeatureSet::default();
        let bundle = train_and_select(&fast_config(), &data, &features).unwrap();
        let selected = bundle.selected();
        let rows = feature_matrix(&data, &features).unwrap();
        assert_eq!(selected.kind, bundle.best_kind());
        assert_eq!(
            Predictor::predict(&selected, rows.view()).unwrap(),
            Predictor::predict(&bundle, rows.view()).unwrap()
        );
        assert_eq!(selected.feature_importance(), bundle.feature_importance());
    }
}
