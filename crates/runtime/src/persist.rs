use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use sc_core::{CoreError, FeatureSet, RawInput};
use sc_features::FeatureReference;
use sc_predictors::{ModelBundle, ModelKind, RegressionMetrics, SelectedModel};

use crate::config::FeatureConfig;
use crate::{Result, RuntimeError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariantMetrics {
    pub kind: ModelKind,
    pub metrics: RegressionMetrics,
}

/// Everything a serving process needs to reproduce training-time features and predict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleArtifact {
    pub selected: SelectedModel,
    pub variants: Vec<VariantMetrics>,
    pub reference: FeatureReference,
    pub features: FeatureConfig,
}

impl BundleArtifact {
    pub fn from_bundle(
        bundle: &ModelBundle,
        reference: &FeatureReference,
        features: FeatureConfig,
    ) -> Self {
        Self {
            selected: bundle.selected(),
            variants: bundle
                .variants()
                .iter()
                .map(|v| VariantMetrics { kind: v.kind, metrics: v.metrics })
                .collect(),
            reference: reference.clone(),
            features,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let io_err = |source| RuntimeError::Io { path: path.to_path_buf(), source };
        let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush().map_err(io_err)?;
        info!(path = %path.display(), model = %self.selected.kind, "saved model bundle");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|source| RuntimeError::Io { path: path.to_path_buf(), source })?;
        let artifact: Self = serde_json::from_reader(BufReader::new(file))?;
        artifact.check()?;
        info!(path = %path.display(), model = %artifact.selected.kind, "loaded model bundle");
        Ok(artifact)
    }

    /// The stored feature set must be the one this build engineers, and the stored model
    /// must be able to score rows of that width.
    pub fn check(&self) -> Result<()> {
        let expected = FeatureSet::default();
        if self.selected.features != expected {
            return Err(CoreError::Data(format!(
                "bundle feature set {:?} does not match {:?}",
                self.selected.features.names(),
                expected.names()
            ))
            .into());
        }
        if self.selected.model.kind() != self.selected.kind {
            return Err(CoreError::Data(format!(
                "bundle labels a {} model as {}",
                self.selected.model.kind(),
                self.selected.kind
            ))
            .into());
        }
        if !self.variants.iter().any(|v| v.kind == self.selected.kind) {
            let reason = format!("bundle has no metrics for {}", self.selected.kind);
            return Err(CoreError::Data(reason).into());
        }
        self.selected.model.validate(self.selected.features.len())?;
        Ok(())
    }

    pub fn predict_one(&self, input: &RawInput) -> Result<f64> {
        Ok(self.features.inference().predict_one(input, &self.selected, &self.reference)?)
    }
}
