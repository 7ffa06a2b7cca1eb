use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CoreError, Result};

/// A named model input column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FeatureColumn {
    #[serde(rename = "ProductPrice")]
    ProductPrice,
    #[serde(rename = "CustomerAge")]
    CustomerAge,
    #[serde(rename = "CustomerGender")]
    CustomerGender,
    #[serde(rename = "PurchaseFrequency")]
    PurchaseFrequency,
    #[serde(rename = "CustomerSatisfaction")]
    CustomerSatisfaction,
    #[serde(rename = "category_encoded")]
    CategoryEncoded,
    #[serde(rename = "brand_encoded")]
    BrandEncoded,
    #[serde(rename = "age_segment_encoded")]
    AgeSegmentEncoded,
    #[serde(rename = "behavior_score")]
    BehaviorScore,
    #[serde(rename = "customer_value")]
    CustomerValue,
    #[serde(rename = "price_satisfaction_interaction")]
    PriceSatisfactionInteraction,
    #[serde(rename = "age_frequency_interaction")]
    AgeFrequencyInteraction,
    #[serde(rename = "price_tier_encoded")]
    PriceTierEncoded,
}

impl FeatureColumn {
    pub const ALL: [FeatureColumn; 13] = [
        FeatureColumn::ProductPrice,
        FeatureColumn::CustomerAge,
        FeatureColumn::CustomerGender,
        FeatureColumn::PurchaseFrequency,
        FeatureColumn::CustomerSatisfaction,
        FeatureColumn::CategoryEncoded,
        FeatureColumn::BrandEncoded,
        FeatureColumn::AgeSegmentEncoded,
        FeatureColumn::BehaviorScore,
        FeatureColumn::CustomerValue,
        FeatureColumn::PriceSatisfactionInteraction,
        FeatureColumn::AgeFrequencyInteraction,
        FeatureColumn::PriceTierEncoded,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            FeatureColumn::ProductPrice => "ProductPrice",
            FeatureColumn::CustomerAge => "CustomerAge",
            FeatureColumn::CustomerGender => "CustomerGender",
            FeatureColumn::PurchaseFrequency => "PurchaseFrequency",
            FeatureColumn::CustomerSatisfaction => "CustomerSatisfaction",
            FeatureColumn::CategoryEncoded => "category_encoded",
            FeatureColumn::BrandEncoded => "brand_encoded",
            FeatureColumn::AgeSegmentEncoded => "age_segment_encoded",
            FeatureColumn::BehaviorScore => "behavior_score",
            FeatureColumn::CustomerValue => "customer_value",
            FeatureColumn::PriceSatisfactionInteraction => "price_satisfaction_interaction",
            FeatureColumn::AgeFrequencyInteraction => "age_frequency_interaction",
            FeatureColumn::PriceTierEncoded => "price_tier_encoded",
        }
    }
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered list of model input columns. The order is the column order of every
/// feature matrix built from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Vec<FeatureColumn>", into = "Vec<FeatureColumn>")]
pub struct FeatureSet(Vec<FeatureColumn>);

impl FeatureSet {
    pub fn new(columns: Vec<FeatureColumn>) -> Result<Self> {
        if columns.is_empty() {
            return Err(CoreError::Data("feature set is empty".into()));
        }
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(*column) {
                return Err(CoreError::Data(format!("feature `{column}` listed twice")));
            }
        }
        Ok(Self(columns))
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.0
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self(FeatureColumn::ALL.to_vec())
    }
}

impl TryFrom<Vec<FeatureColumn>> for FeatureSet {
    type Error = CoreError;

    fn try_from(columns: Vec<FeatureColumn>) -> Result<Self> {
        Self::new(columns)
    }
}

impl From<FeatureSet> for Vec<FeatureColumn> {
    fn from(set: FeatureSet) -> Self {
        set.0
    }
}
