pub mod beks;
pub mod dsr;
pub mod p2g;
pub mod p2h;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::eligibility::RequestError;
use crate::products::{CalculatorVariant, Product};

pub use beks::BeksForm;
pub use dsr::DsrForm;
pub use p2g::P2gForm;
pub use p2h::P2hForm;

/// One calculator input form, ready to be turned into the backend request body.
pub trait CalculatorForm: Send + Sync {
    fn variant(&self) -> CalculatorVariant;
    fn to_request_body(&self) -> Result<Value, RequestError>;
}

/// Decodes a JSON form (as posted to the local facade) for `variant`.
pub fn form_from_json(
    variant: CalculatorVariant,
    value: Value,
) -> Result<Box<dyn CalculatorForm>, serde_json::Error> {
    let form: Box<dyn CalculatorForm> = match variant {
        CalculatorVariant::Beks => Box::new(serde_json::from_value::<BeksForm>(value)?),
        CalculatorVariant::P2h => Box::new(serde_json::from_value::<P2hForm>(value)?),
        CalculatorVariant::P2g => Box::new(serde_json::from_value::<P2gForm>(value)?),
        CalculatorVariant::Dsr => Box::new(serde_json::from_value::<DsrForm>(value)?),
    };
    Ok(form)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    #[serde(rename = "ESO", alias = "eso")]
    Eso,
    #[serde(rename = "Litgrid", alias = "litgrid")]
    Litgrid,
}

impl Display for Provider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Eso => "ESO",
            Self::Litgrid => "Litgrid",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
pub enum Sector {
    #[serde(rename = "Paslaugų", alias = "services")]
    Services,
    #[serde(rename = "Energetikos", alias = "energy")]
    Energy,
    #[serde(rename = "Pramonės", alias = "industry")]
    Industry,
    #[serde(rename = "Telkėjas", alias = "aggregator")]
    Aggregator,
    #[serde(rename = "Kita", alias = "other")]
    Other,
}

impl Sector {
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Services => "Paslaugų",
            Self::Energy => "Energetikos",
            Self::Industry => "Pramonės",
            Self::Aggregator => "Telkėjas",
            Self::Other => "Kita",
        }
    }
}

/// Minimum bid prices for capacity (`P_*_CAP_BSP`) and energy (`P_*_BSP`).
#[derive(Debug, Clone, Args, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PriceThresholds {
    #[arg(long = "fcr-cap-price", default_value_t = 0.0)]
    #[serde(rename = "P_FCR_CAP_BSP")]
    pub fcr_capacity: f64,
    #[arg(long = "afrru-cap-price", default_value_t = 0.0)]
    #[serde(rename = "P_aFRRu_CAP_BSP")]
    pub afrr_up_capacity: f64,
    #[arg(long = "afrrd-cap-price", default_value_t = 0.0)]
    #[serde(rename = "P_aFRRd_CAP_BSP")]
    pub afrr_down_capacity: f64,
    #[arg(long = "mfrru-cap-price", default_value_t = 0.0)]
    #[serde(rename = "P_mFRRu_CAP_BSP")]
    pub mfrr_up_capacity: f64,
    #[arg(long = "mfrrd-cap-price", default_value_t = 0.0)]
    #[serde(rename = "P_mFRRd_CAP_BSP")]
    pub mfrr_down_capacity: f64,
    #[arg(long = "afrru-energy-price", default_value_t = 0.0, allow_hyphen_values = true)]
    #[serde(rename = "P_aFRRu_BSP")]
    pub afrr_up_energy: f64,
    #[arg(long = "afrrd-energy-price", default_value_t = 0.0, allow_hyphen_values = true)]
    #[serde(rename = "P_aFRRd_BSP")]
    pub afrr_down_energy: f64,
    #[arg(long = "mfrru-energy-price", default_value_t = 0.0, allow_hyphen_values = true)]
    #[serde(rename = "P_mFRRu_BSP")]
    pub mfrr_up_energy: f64,
    #[arg(long = "mfrrd-energy-price", default_value_t = 0.0, allow_hyphen_values = true)]
    #[serde(rename = "P_mFRRd_BSP")]
    pub mfrr_down_energy: f64,
}

impl Default for PriceThresholds {
    fn default() -> Self {
        Self {
            fcr_capacity: 0.0,
            afrr_up_capacity: 0.0,
            afrr_down_capacity: 0.0,
            mfrr_up_capacity: 0.0,
            mfrr_down_capacity: 0.0,
            afrr_up_energy: 0.0,
            afrr_down_energy: 0.0,
            mfrr_up_energy: 0.0,
            mfrr_down_energy: 0.0,
        }
    }
}

impl PriceThresholds {
    /// Writes the thresholds the variant knows about into `body`.
    /// Capacity prices must be non-negative; energy prices may be negative.
    pub fn write_into(
        &self,
        variant: CalculatorVariant,
        body: &mut Map<String, Value>,
    ) -> Result<(), RequestError> {
        let capacity = [
            (Product::Fcr, "P_FCR_CAP_BSP", self.fcr_capacity),
            (Product::AfrrUp, "P_aFRRu_CAP_BSP", self.afrr_up_capacity),
            (Product::AfrrDown, "P_aFRRd_CAP_BSP", self.afrr_down_capacity),
            (Product::MfrrUp, "P_mFRRu_CAP_BSP", self.mfrr_up_capacity),
            (Product::MfrrDown, "P_mFRRd_CAP_BSP", self.mfrr_down_capacity),
        ];
        for (product, field, value) in capacity {
            if !variant.offers(product) {
                continue;
            }
            ensure_non_negative(field, value)?;
            body.insert(field.to_string(), Value::from(value));
        }
        for (field, value) in [
            ("P_aFRRu_BSP", self.afrr_up_energy),
            ("P_aFRRd_BSP", self.afrr_down_energy),
            ("P_mFRRu_BSP", self.mfrr_up_energy),
            ("P_mFRRd_BSP", self.mfrr_down_energy),
        ] {
            ensure_finite(field, value)?;
            body.insert(field.to_string(), Value::from(value));
        }
        Ok(())
    }
}

pub(crate) fn ensure_finite(field: &'static str, value: f64) -> Result<(), RequestError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RequestError::InvalidField {
            field,
            reason: format!("must be a finite number, got {value}"),
        })
    }
}

pub(crate) fn ensure_non_negative(field: &'static str, value: f64) -> Result<(), RequestError> {
    ensure_finite(field, value)?;
    if value < 0.0 {
        return Err(RequestError::InvalidField {
            field,
            reason: format!("must not be negative, got {value}"),
        });
    }
    Ok(())
}

pub(crate) fn ensure_percent(field: &'static str, value: f64) -> Result<(), RequestError> {
    ensure_non_negative(field, value)?;
    if value > 100.0 {
        return Err(RequestError::InvalidField {
            field,
            reason: format!("must be at most 100 %, got {value}"),
        });
    }
    Ok(())
}

pub(crate) fn ensure_at_least_one(field: &'static str, value: u32) -> Result<(), RequestError> {
    if value == 0 {
        return Err(RequestError::InvalidField {
            field,
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Folds the Lithuanian letters the backend does not accept in county names.
pub fn fold_lithuanian(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'ė' => 'e',
            'ž' => 'z',
            'š' => 's',
            other => other,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(try_from = "String", into = "String")]
pub enum County {
    Alytus,
    Kaunas,
    Klaipeda,
    Marijampole,
    Panevezys,
    Siauliai,
    Taurage,
    Telsiai,
    Utena,
    Vilnius,
}

impl County {
    pub const ALL: [County; 10] = [
        County::Alytus,
        County::Kaunas,
        County::Klaipeda,
        County::Marijampole,
        County::Panevezys,
        County::Siauliai,
        County::Taurage,
        County::Telsiai,
        County::Utena,
        County::Vilnius,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Alytus => "Alytus",
            Self::Kaunas => "Kaunas",
            Self::Klaipeda => "Klaipėda",
            Self::Marijampole => "Marijampolė",
            Self::Panevezys => "Panevėžys",
            Self::Siauliai => "Šiauliai",
            Self::Taurage => "Tauragė",
            Self::Telsiai => "Telšiai",
            Self::Utena => "Utena",
            Self::Vilnius => "Vilnius",
        }
    }

    pub fn wire_name(&self) -> String {
        fold_lithuanian(self.label())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("unknown county: {0}")]
pub struct CountyParseError(pub String);

impl FromStr for County {
    type Err = CountyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = fold_lithuanian(s.trim());
        Self::ALL
            .into_iter()
            .find(|county| county.wire_name() == folded)
            .ok_or_else(|| CountyParseError(s.to_string()))
    }
}

impl TryFrom<String> for County {
    type Error = CountyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<County> for String {
    fn from(value: County) -> Self {
        value.label().to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use serde_json::{json, Map};

    use super::{fold_lithuanian, County, PriceThresholds, Sector};
    use crate::eligibility::RequestError;
    use crate::products::CalculatorVariant;

    #[test]
    fn folds_county_names() {
        assert_eq!(fold_lithuanian("Panevėžys"), "panevezys");
        assert_eq!(County::Siauliai.wire_name(), "siauliai");
        assert_eq!(County::from_str("Klaipėda").expect("county"), County::Klaipeda);
        assert_eq!(County::from_str("telsiai").expect("county"), County::Telsiai);
        assert!(County::from_str("Riga").is_err());
    }

    #[test]
    fn sector_accepts_wire_and_english_names() {
        let wire: Sector = serde_json::from_value(json!("Pramonės")).expect("wire");
        let english: Sector = serde_json::from_value(json!("aggregator")).expect("alias");
        assert_eq!(wire, Sector::Industry);
        assert_eq!(english, Sector::Aggregator);
        assert_eq!(serde_json::to_value(Sector::Other).expect("json"), json!("Kita"));
    }

    #[test]
    fn thresholds_skip_fcr_for_dsr() {
        let thresholds = PriceThresholds {
            fcr_capacity: 12.0,
            ..PriceThresholds::default()
        };
        let mut dsr = Map::new();
        thresholds
            .write_into(CalculatorVariant::Dsr, &mut dsr)
            .expect("dsr");
        assert!(!dsr.contains_key("P_FCR_CAP_BSP"));
        assert_eq!(dsr.len(), 8);

        let mut p2h = Map::new();
        thresholds
            .write_into(CalculatorVariant::P2h, &mut p2h)
            .expect("p2h");
        assert_eq!(p2h["P_FCR_CAP_BSP"], json!(12.0));
    }

    #[test]
    fn negative_capacity_price_is_rejected() {
        let thresholds = PriceThresholds {
            afrr_up_capacity: -1.0,
            afrr_up_energy: -50.0,
            ..PriceThresholds::default()
        };
        let err = thresholds
            .write_into(CalculatorVariant::P2g, &mut Map::new())
            .expect_err("negative capacity");
        assert!(matches!(
            err,
            RequestError::InvalidField {
                field: "P_aFRRu_CAP_BSP",
                ..
            }
        ));
    }
}
