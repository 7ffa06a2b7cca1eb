//! Stage entry points shared by the CLI and [`AppContext`](crate::AppContext).

use tracing::{info, warn};

use sc_core::{RawInput, Record};
use sc_features::{FeatureReference, ProcessedDataset};
use sc_predictors::{FeatureImportance, ModelBundle, Predictor};
use sc_scenarios::RankedScenario;

use crate::metrics::{PipelineMetrics, StageTimer};
use crate::{PipelineConfig, Result};

pub fn process_dataset(
    config: &PipelineConfig,
    raw: &[Record],
    metrics: &PipelineMetrics,
) -> Result<ProcessedDataset> {
    let timer = StageTimer::start("process_dataset");
    let processed = config.engineer().process_dataset(raw)?;
    metrics.inc_records_processed(processed.records.len() as u64);
    timer.finish();
    Ok(processed)
}

pub fn train_and_select(
    config: &PipelineConfig,
    processed: &ProcessedDataset,
    metrics: &PipelineMetrics,
) -> Result<ModelBundle> {
    let timer = StageTimer::start("train_and_select");
    let bundle = sc_predictors::train_and_select(
        &config.trainer(),
        &processed.records,
        &processed.features,
    )?;
    metrics.inc_training_runs(1);

    for variant in bundle.variants() {
        info!(
            model = %variant.kind,
            mae = variant.metrics.mae,
            mse = variant.metrics.mse,
            r2 = variant.metrics.r2,
            "model performance"
        );
    }
    match bundle.feature_importance() {
        FeatureImportance::Ranked(ranked) => {
            for entry in ranked.iter().take(5) {
                info!(
                    feature = %entry.feature,
                    importance = entry.importance,
                    "feature importance"
                );
            }
        }
        FeatureImportance::Unavailable(kind) => {
            info!(model = %kind, "feature importance not available for selected model")
        }
    }
    timer.finish();
    Ok(bundle)
}

pub fn generate_scenario_predictions<P>(
    config: &PipelineConfig,
    model: &P,
    processed: &ProcessedDataset,
    metrics: &PipelineMetrics,
) -> Result<Vec<RankedScenario>>
where
    P: Predictor + ?Sized,
{
    let timer = StageTimer::start("generate_scenarios");
    let raw = processed.records.iter().map(|r| &r.record);
    let ranked = config.scenario_generator().generate(model, raw, &processed.reference)?;
    metrics.inc_scenarios_scored(ranked.len() as u64);
    timer.finish();
    Ok(ranked)
}

pub fn predict_single<P>(
    config: &PipelineConfig,
    model: &P,
    reference: &FeatureReference,
    input: &RawInput,
    metrics: &PipelineMetrics,
) -> Result<f64>
where
    P: Predictor + ?Sized,
{
    match config.inference().predict_one(input, model, reference) {
        Ok(prediction) => {
            metrics.inc_predictions_served(1);
            Ok(prediction)
        }
        Err(err) => {
            metrics.inc_rejected_inputs(1);
            warn!(error = %err, "single prediction rejected");
            Err(err.into())
        }
    }
}
