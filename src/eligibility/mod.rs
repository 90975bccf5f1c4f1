pub mod builder;

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::products::{
    CalculatorVariant, DirectionParseError, Product, ProductDirection, ProductParseError,
    ReactionTimeError,
};

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error(transparent)]
    InvalidDirection(#[from] DirectionParseError),
    #[error(transparent)]
    InvalidReactionTime(#[from] ReactionTimeError),
    #[error(transparent)]
    InvalidProduct(#[from] ProductParseError),
    #[error("{product} is not offered by the {variant} calculator")]
    ProductNotOffered {
        variant: CalculatorVariant,
        product: Product,
    },
    #[error("eligibility flag for {product} must be a boolean, got {value}")]
    InvalidFlag { product: String, value: String },
    #[error("hourly profile {name} must have 24 values, got {len}")]
    InvalidHourlyProfile { name: &'static str, len: usize },
    #[error("{field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Per-product eligibility flags sent to the backend as `produktai`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Eligibility {
    flags: BTreeMap<Product, bool>,
}

impl Eligibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, product: Product, eligible: bool) {
        self.flags.insert(product, eligible);
    }

    pub fn get(&self, product: Product) -> Option<bool> {
        self.flags.get(&product).copied()
    }

    pub fn contains(&self, product: Product) -> bool {
        self.flags.contains_key(&product)
    }

    pub fn is_eligible(&self, product: Product) -> bool {
        self.get(product).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Product, bool)> + '_ {
        self.flags.iter().map(|(product, eligible)| (*product, *eligible))
    }

    pub fn eligible_products(&self) -> Vec<Product> {
        self.iter()
            .filter_map(|(product, eligible)| eligible.then_some(product))
            .collect()
    }

    /// True when any product regulating in `direction` is flagged eligible.
    pub fn any_in_direction(&self, direction: ProductDirection) -> bool {
        self.iter()
            .any(|(product, eligible)| eligible && product.direction() == direction)
    }

    /// Wire form for `variant`: plain booleans, or `"True"`/`"False"` for BEKS.
    pub fn to_wire(&self, variant: CalculatorVariant) -> Value {
        let mut object = Map::new();
        for (product, eligible) in self.iter() {
            let value = if variant.uses_string_flags() {
                Value::String(python_bool(eligible).to_string())
            } else {
                Value::Bool(eligible)
            };
            object.insert(product.wire_name().to_string(), value);
        }
        Value::Object(object)
    }

    /// Reads either wire form back.
    pub fn from_wire(value: &Value) -> Result<Self, RequestError> {
        let Some(object) = value.as_object() else {
            return Err(RequestError::InvalidField {
                field: "produktai",
                reason: format!("expected an object, got {value}"),
            });
        };
        let mut out = Self::new();
        for (key, raw) in object {
            let product: Product = key.parse()?;
            out.insert(product, parse_flag(key, raw)?);
        }
        Ok(out)
    }
}

fn python_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn parse_flag(key: &str, raw: &Value) -> Result<bool, RequestError> {
    match raw {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(RequestError::InvalidFlag {
            product: key.to_string(),
            value: other.to_string(),
        }),
    }
}

impl FromIterator<(Product, bool)> for Eligibility {
    fn from_iter<T: IntoIterator<Item = (Product, bool)>>(iter: T) -> Self {
        Self {
            flags: iter.into_iter().collect(),
        }
    }
}

impl Serialize for Eligibility {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.flags.len()))?;
        for (product, eligible) in &self.flags {
            map.serialize_entry(product.wire_name(), eligible)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Eligibility {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_wire(&value).map_err(de::Error::custom)
    }
}

/// Reaction times after directional adjustment; a zero marks an inactive direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionTimePair {
    #[serde(rename = "reaction_time_u")]
    pub up: u32,
    #[serde(rename = "reaction_time_d")]
    pub down: u32,
}

/// Output of the request builder for one submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductSelection {
    #[serde(rename = "produktai")]
    pub eligibility: Eligibility,
    #[serde(flatten)]
    pub reaction_times: ReactionTimePair,
}

impl ProductSelection {
    pub fn adjusted_up(&self) -> u32 {
        self.reaction_times.up
    }

    pub fn adjusted_down(&self) -> u32 {
        self.reaction_times.down
    }

    /// No product may be eligible in a direction whose reaction time was zeroed.
    pub fn is_consistent(&self) -> bool {
        let up_ok = self.reaction_times.up != 0
            || !self.eligibility.any_in_direction(ProductDirection::Upward);
        let down_ok = self.reaction_times.down != 0
            || !self.eligibility.any_in_direction(ProductDirection::Downward);
        up_ok && down_ok
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Eligibility, ProductSelection, ReactionTimePair, RequestError};
    use crate::products::{CalculatorVariant, Product};

    #[test]
    fn beks_wire_form_uses_python_strings() {
        let eligibility: Eligibility = [(Product::Fcr, false), (Product::AfrrUp, true)]
            .into_iter()
            .collect();
        assert_eq!(
            eligibility.to_wire(CalculatorVariant::Beks),
            json!({"FCR": "False", "aFRRu": "True"})
        );
        assert_eq!(
            eligibility.to_wire(CalculatorVariant::P2h),
            json!({"FCR": false, "aFRRu": true})
        );
    }

    #[test]
    fn decodes_both_flag_encodings() {
        let parsed =
            Eligibility::from_wire(&json!({"aFRRd": "True", "mFRRd": false})).expect("decode");
        assert_eq!(parsed.get(Product::AfrrDown), Some(true));
        assert_eq!(parsed.get(Product::MfrrDown), Some(false));

        let err = Eligibility::from_wire(&json!({"aFRRd": 1})).expect_err("number flag");
        assert!(matches!(err, RequestError::InvalidFlag { .. }));
        assert!(Eligibility::from_wire(&json!({"XYZ": true})).is_err());
    }

    #[test]
    fn selection_consistency_detects_zeroed_direction() {
        let selection = ProductSelection {
            eligibility: [(Product::AfrrDown, true)].into_iter().collect(),
            reaction_times: ReactionTimePair { up: 300, down: 0 },
        };
        assert!(!selection.is_consistent());
    }
}
