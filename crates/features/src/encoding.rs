use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use sc_core::{CoreError, Result, UNKNOWN_CODE};

/// What to do with a value missing from a reference universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnseenPolicy {
    /// Fail with an encoding error.
    Reject,
    /// Assign `UNKNOWN_CODE`.
    Sentinel,
}

/// Ordered universe of categorical values with its lookup table.
///
/// Codes are positions in the sorted universe, so the same set of observed values
/// always yields the same codes regardless of row order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CategoryEncoding {
    values: Vec<String>,
    index: HashMap<String, i64>,
}

impl CategoryEncoding {
    pub fn fit<'a>(observed: impl IntoIterator<Item = &'a str>) -> Self {
        let values: BTreeSet<&str> = observed.into_iter().collect();
        Self::from(values.into_iter().map(str::to_string).collect::<Vec<_>>())
    }

    pub fn code(&self, value: &str) -> Option<i64> {
        self.index.get(value).copied()
    }

    pub fn encode(&self, universe: &'static str, value: &str, unseen: UnseenPolicy) -> Result<i64> {
        match (self.code(value), unseen) {
            (Some(code), _) => Ok(code),
            (None, UnseenPolicy::Sentinel) => Ok(UNKNOWN_CODE),
            (None, UnseenPolicy::Reject) => Err(CoreError::Encoding {
                universe,
                value: value.to_string(),
            }),
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<String>> for CategoryEncoding {
    fn from(mut values: Vec<String>) -> Self {
        values.sort();
        values.dedup();
        let index = values
            .iter()
            .enumerate()
            .map(|(i, v)| (v.clone(), i as i64))
            .collect();
        Self { values, index }
    }
}

impl From<CategoryEncoding> for Vec<String> {
    fn from(encoding: CategoryEncoding) -> Self {
        encoding.values
    }
}
