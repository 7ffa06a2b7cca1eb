use std::sync::Arc;

use tracing::info;

use sc_core::{RawInput, Record};
use sc_features::{FeatureReference, ProcessedDataset};
use sc_predictors::ModelBundle;
use sc_scenarios::RankedScenario;

use crate::analytics::{summarize, DatasetAnalytics};
use crate::metrics::{PipelineMetrics, StageTimer};
use crate::persist::BundleArtifact;
use crate::{pipeline, PipelineConfig, Result};

/// Trained state for a serving process. Built once, then only read. Share it through
/// [`AppContext::shared`] and hand the `Arc` to every handler.
#[derive(Debug)]
pub struct AppContext {
    config: PipelineConfig,
    dataset: ProcessedDataset,
    bundle: ModelBundle,
    metrics: PipelineMetrics,
}

impl AppContext {
    /// Engineers `raw` and trains a fresh bundle on it.
    pub fn build(config: PipelineConfig, raw: &[Record]) -> Result<Self> {
        let timer = StageTimer::start("startup");
        let metrics = PipelineMetrics::default();
        let dataset = pipeline::process_dataset(&config, raw, &metrics)?;
        let bundle = pipeline::train_and_select(&config, &dataset, &metrics)?;
        info!(
            records = dataset.records.len(),
            model = %bundle.best_kind(),
            elapsed_ms = timer.elapsed().as_millis() as u64,
            "context ready"
        );
        Ok(Self { config, dataset, bundle, metrics })
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn dataset(&self) -> &ProcessedDataset {
        &self.dataset
    }

    pub fn reference(&self) -> &FeatureReference {
        &self.dataset.reference
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn scenarios(&self) -> Result<Vec<RankedScenario>> {
        pipeline::generate_scenario_predictions(
            &self.config,
            &self.bundle,
            &self.dataset,
            &self.metrics,
        )
    }

    pub fn predict(&self, input: &RawInput) -> Result<f64> {
        pipeline::predict_single(&self.config, &self.bundle, self.reference(), input, &self.metrics)
    }

    pub fn analytics(&self) -> Result<DatasetAnalytics> {
        Ok(summarize(&self.dataset.records)?)
    }

    pub fn artifact(&self) -> BundleArtifact {
        BundleArtifact::from_bundle(&self.bundle, self.reference(), self.config.features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn context_can_be_shared_across_threads() {
        assert_send_sync::<AppContext>();
        assert_send_sync::<Arc<AppContext>>();
    }
}
