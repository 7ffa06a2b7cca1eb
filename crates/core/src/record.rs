use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CoreError, Result};

pub type GenderCode = i64;

/// One product/customer observation as supplied by the dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    #[serde(rename = "ProductCategory")]
    pub category: String,
    #[serde(rename = "ProductBrand")]
    pub brand: String,
    #[serde(rename = "ProductPrice")]
    pub price: f64,
    #[serde(rename = "CustomerAge")]
    pub age: u32,
    #[serde(rename = "CustomerGender")]
    pub gender: GenderCode,
    #[serde(rename = "PurchaseFrequency")]
    pub frequency: u32,
    #[serde(rename = "CustomerSatisfaction")]
    pub satisfaction: u32,
    #[serde(rename = "PurchaseIntent")]
    pub intent: u8,
}

impl Record {
    /// Checks the fields the sales target is derived from.
    pub fn check_target_inputs(&self) -> Result<()> {
        if !self.price.is_finite() {
            return Err(CoreError::Data(format!(
                "ProductPrice is not numeric for {}/{}",
                self.category, self.brand
            )));
        }
        if self.price <= 0.0 {
            return Err(CoreError::Data(format!(
                "ProductPrice must be positive, got {} for {}/{}",
                self.price, self.category, self.brand
            )));
        }
        if self.intent > 1 {
            return Err(CoreError::Data(format!(
                "PurchaseIntent must be 0 or 1, got {}",
                self.intent
            )));
        }
        Ok(())
    }
}

/// The six numeric fields collected for an on-demand prediction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AdHocFields {
    pub price: f64,
    pub age: u32,
    pub gender: GenderCode,
    pub frequency: u32,
    pub satisfaction: u32,
    pub intent: u8,
}

impl AdHocFields {
    /// Builds a record without category or brand; those are assigned fixed codes downstream.
    pub fn into_record(self) -> Record {
        Record {
            category: String::new(),
            brand: String::new(),
            price: self.price,
            age: self.age,
            gender: self.gender,
            frequency: self.frequency,
            satisfaction: self.satisfaction,
            intent: self.intent,
        }
    }
}

/// Loosely-typed caller input, e.g. a decoded JSON request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct RawInput(Map<String, Value>);

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CoreError::validation("body", format!("expected an object, got {other}"))),
        }
    }

    pub fn coerce(&self) -> Result<AdHocFields> {
        let price = self.float("price")?;
        if !price.is_finite() || price <= 0.0 {
            return Err(CoreError::validation("price", "must be a positive number"));
        }
        let intent = self.int("intent")?;
        if !(0..=1).contains(&intent) {
            return Err(CoreError::validation("intent", "must be 0 or 1"));
        }
        Ok(AdHocFields {
            price,
            age: self.unsigned("age")?,
            gender: self.int("gender")?,
            frequency: self.unsigned("frequency")?,
            satisfaction: self.unsigned("satisfaction")?,
            intent: intent as u8,
        })
    }

    fn field(&self, field: &str) -> Result<&Value> {
        match self.0.get(field) {
            None | Some(Value::Null) => Err(CoreError::validation(field, "missing")),
            Some(value) => Ok(value),
        }
    }

    fn float(&self, field: &str) -> Result<f64> {
        match self.field(field)? {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| CoreError::validation(field, "not representable as a float")),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| CoreError::validation(field, format!("`{s}` is not a number"))),
            other => Err(CoreError::validation(field, format!("`{other}` is not a number"))),
        }
    }

    fn int(&self, field: &str) -> Result<i64> {
        match self.field(field)? {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(i);
                }
                // Fractional numbers truncate toward zero.
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(f.trunc() as i64),
                    _ => Err(CoreError::validation(field, "not representable as an integer")),
                }
            }
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| CoreError::validation(field, format!("`{s}` is not an integer"))),
            other => Err(CoreError::validation(field, format!("`{other}` is not an integer"))),
        }
    }

    fn unsigned(&self, field: &str) -> Result<u32> {
        let value = self.int(field)?;
        u32::try_from(value)
            .map_err(|_| CoreError::validation(field, format!("{value} is out of range")))
    }
}
