//! Core types and errors for the sales-potential pipeline.

pub mod feature_set;
pub mod record;

pub use feature_set::{FeatureColumn, FeatureSet};
pub use record::{AdHocFields, RawInput, Record};

/// Code assigned to a value that falls outside a known universe or bin range.
pub const UNKNOWN_CODE: i64 = -1;

#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("data error: {0}")]
    Data(String),
    #[error("encoding error: {universe} `{value}` is not part of the reference universe")]
    Encoding { universe: &'static str, value: String },
    #[error("training error: {0}")]
    Training(String),
    #[error("no trained model available, train models first")]
    UntrainedModel,
    #[error("invalid field `{field}`: {reason}")]
    Validation { field: String, reason: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl CoreError {
    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation { field: field.to_string(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
