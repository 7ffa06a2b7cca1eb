use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sc_features::{FeatureEngineer, FixedCodes, PriceTierMode};
use sc_predictors::{ForestParams, SplitParams, TrainerConfig};
use sc_scenarios::{InferenceAdapter, ScenarioConfig, ScenarioGenerator};

pub const DEFAULT_CONFIG_FILE: &str = "salescast.toml";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub split: SplitParams,
    pub forest: ForestParams,
    pub features: FeatureConfig,
    pub scenarios: ScenarioConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub price_tiers: PriceTierMode,
    pub default_category_code: i64,
    pub default_brand_code: i64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        let codes = FixedCodes::default();
        Self {
            price_tiers: PriceTierMode::default(),
            default_category_code: codes.category,
            default_brand_code: codes.brand,
        }
    }
}

impl FeatureConfig {
    pub fn engineer(&self) -> FeatureEngineer {
        FeatureEngineer::new(self.price_tiers)
    }

    pub fn fixed_codes(&self) -> FixedCodes {
        FixedCodes { category: self.default_category_code, brand: self.default_brand_code }
    }

    pub fn inference(&self) -> InferenceAdapter {
        InferenceAdapter::new(self.engineer(), self.fixed_codes())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

pub fn parse_price_tiers(value: &str) -> Result<PriceTierMode, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "reference" => Ok(PriceTierMode::Reference),
        "per_batch" | "per-batch" => Ok(PriceTierMode::PerBatch),
        other => Err(ConfigError::Validation(format!(
            "unsupported price tier mode `{other}` (expected reference|per_batch)"
        ))),
    }
}

/// Command-line values that win over both the file and the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub test_size: Option<f64>,
    pub random_state: Option<u64>,
    pub n_estimators: Option<usize>,
    pub max_depth: Option<usize>,
    pub top_k: Option<usize>,
    pub price_tiers: Option<PriceTierMode>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl PipelineConfig {
    /// Defaults, then the config file, then `SALESCAST_*` variables, then `options.overrides`.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = match resolve_config_path(options.config_path.as_deref()) {
            Some(path) => read_file(&path)?,
            None if options.require_file => {
                let expected =
                    options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => Self::default(),
        };

        config.apply_env(read_env)?;
        config.apply_overrides(options.overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = lookup("SALESCAST_TEST_SIZE") {
            self.split.test_size = parse_env("SALESCAST_TEST_SIZE", &value)?;
        }
        if let Some(value) = lookup("SALESCAST_RANDOM_STATE") {
            let seed = parse_env("SALESCAST_RANDOM_STATE", &value)?;
            self.split.random_state = seed;
            self.forest.random_state = seed;
        }
        if let Some(value) = lookup("SALESCAST_N_ESTIMATORS") {
            self.forest.n_estimators = parse_env("SALESCAST_N_ESTIMATORS", &value)?;
        }
        if let Some(value) = lookup("SALESCAST_MAX_DEPTH") {
            self.forest.max_depth = match value.trim().to_ascii_lowercase().as_str() {
                "none" => None,
                _ => Some(parse_env("SALESCAST_MAX_DEPTH", &value)?),
            };
        }
        if let Some(value) = lookup("SALESCAST_TOP_K") {
            self.scenarios.top_k = parse_env("SALESCAST_TOP_K", &value)?;
        }
        if let Some(value) = lookup("SALESCAST_PRICE_TIERS") {
            self.features.price_tiers = parse_price_tiers(&value)
                .map_err(|_| invalid_env("SALESCAST_PRICE_TIERS", &value))?;
        }

        let log_level = lookup("SALESCAST_LOGGING_LEVEL").or_else(|| lookup("SALESCAST_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        if let Some(value) = lookup("SALESCAST_LOG_FORMAT") {
            self.logging.format =
                value.parse().map_err(|_| invalid_env("SALESCAST_LOG_FORMAT", &value))?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(test_size) = overrides.test_size {
            self.split.test_size = test_size;
        }
        if let Some(seed) = overrides.random_state {
            self.split.random_state = seed;
            self.forest.random_state = seed;
        }
        if let Some(n) = overrides.n_estimators {
            self.forest.n_estimators = n;
        }
        if let Some(depth) = overrides.max_depth {
            self.forest.max_depth = Some(depth);
        }
        if let Some(top_k) = overrides.top_k {
            self.scenarios.top_k = top_k;
        }
        if let Some(mode) = overrides.price_tiers {
            self.features.price_tiers = mode;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let test_size = self.split.test_size;
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(ConfigError::Validation(format!(
                "split.test_size must be in (0, 1), got {test_size}"
            )));
        }
        if self.forest.n_estimators == 0 {
            let reason = "forest.n_estimators must be at least 1";
            return Err(ConfigError::Validation(reason.to_string()));
        }
        if self.forest.min_samples_split < 2 {
            let reason = "forest.min_samples_split must be at least 2";
            return Err(ConfigError::Validation(reason.to_string()));
        }
        if self.scenarios.top_k == 0 {
            return Err(ConfigError::Validation("scenarios.top_k must be at least 1".to_string()));
        }
        if self.scenarios.brands_taken() == 0 {
            let reason =
                "scenarios.brand_pool and scenarios.brands_per_category must be at least 1";
            return Err(ConfigError::Validation(reason.to_string()));
        }
        validate_logging(&self.logging)
    }

    pub fn trainer(&self) -> TrainerConfig {
        TrainerConfig { split: self.split, forest: self.forest }
    }

    pub fn engineer(&self) -> FeatureEngineer {
        self.features.engineer()
    }

    pub fn scenario_generator(&self) -> ScenarioGenerator {
        ScenarioGenerator::new(self.scenarios, self.engineer())
    }

    pub fn inference(&self) -> InferenceAdapter {
        self.features.inference()
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    match explicit_path {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.exists().then_some(default)
        }
    }
}

fn read_file(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    PipelineConfig::from_toml_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    match logging.level.trim().to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| invalid_env(key, value))
}

fn invalid_env(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}
