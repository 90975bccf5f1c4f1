use clap::Args;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::eligibility::builder::checkbox_eligibility;
use crate::eligibility::{Eligibility, RequestError};
use crate::forms::{
    ensure_at_least_one, ensure_non_negative, ensure_percent, into_object, CalculatorForm,
    PriceThresholds, Provider, Sector,
};
use crate::products::{CalculatorVariant, Product, ReactionTime};

/// Battery energy storage form. Products come from checkboxes, not a direction.
#[derive(Debug, Clone, Args, Deserialize)]
#[serde(default)]
pub struct BeksForm {
    #[arg(long, value_enum, default_value_t = Provider::Litgrid)]
    pub provider: Provider,
    #[arg(long, value_enum, default_value_t = Sector::Energy)]
    #[serde(rename = "Sector")]
    pub sector: Sector,
    /// Rated power (MW).
    #[arg(long = "q-max", default_value_t = 1.0)]
    #[serde(rename = "Q_max")]
    pub q_max: f64,
    /// Storage capacity (MWh).
    #[arg(long = "e-max", default_value_t = 2.0)]
    #[serde(rename = "E_max")]
    pub e_max: f64,
    /// Round-trip efficiency (%).
    #[arg(long, default_value_t = 90.0)]
    #[serde(rename = "RTE")]
    pub rte: f64,
    #[arg(long = "soc-min", default_value_t = 10.0)]
    #[serde(rename = "SOC_min")]
    pub soc_min: f64,
    #[arg(long = "soc-max", default_value_t = 90.0)]
    #[serde(rename = "SOC_max")]
    pub soc_max: f64,
    /// Reaction time in seconds: 30, 300, 750 or 1000.
    #[arg(long = "reaction-time", default_value = "30")]
    pub reaction_time: ReactionTime,
    /// Power CAPEX (tūkst. EUR/MW).
    #[arg(long = "capex-p", default_value_t = 300.0)]
    #[serde(rename = "CAPEX_P")]
    pub capex_p: f64,
    /// Energy CAPEX (tūkst. EUR/MWh).
    #[arg(long = "capex-e", default_value_t = 250.0)]
    #[serde(rename = "CAPEX_E")]
    pub capex_e: f64,
    /// OPEX (tūkst. EUR/MW/year).
    #[arg(long, default_value_t = 5.0)]
    #[serde(rename = "OPEX")]
    pub opex: f64,
    #[arg(long = "discount-rate", default_value_t = 5.0)]
    pub discount_rate: f64,
    #[arg(long = "number-of-years", default_value_t = 10)]
    pub number_of_years: u32,
    /// Ticked product checkboxes.
    #[arg(
        long,
        value_delimiter = ',',
        num_args = 0..,
        default_values_t = Product::FULL_SET
    )]
    #[serde(rename = "produktai", deserialize_with = "deserialize_ticked")]
    pub products: Vec<Product>,
    #[command(flatten)]
    #[serde(flatten)]
    pub thresholds: PriceThresholds,
}

impl Default for BeksForm {
    fn default() -> Self {
        Self {
            provider: Provider::Litgrid,
            sector: Sector::Energy,
            q_max: 1.0,
            e_max: 2.0,
            rte: 90.0,
            soc_min: 10.0,
            soc_max: 90.0,
            reaction_time: ReactionTime::S30,
            capex_p: 300.0,
            capex_e: 250.0,
            opex: 5.0,
            discount_rate: 5.0,
            number_of_years: 10,
            products: Product::FULL_SET.to_vec(),
            thresholds: PriceThresholds::default(),
        }
    }
}

impl CalculatorForm for BeksForm {
    fn variant(&self) -> CalculatorVariant {
        CalculatorVariant::Beks
    }

    fn to_request_body(&self) -> Result<Value, RequestError> {
        ensure_non_negative("Q_max", self.q_max)?;
        ensure_non_negative("E_max", self.e_max)?;
        ensure_percent("RTE", self.rte)?;
        ensure_percent("SOC_min", self.soc_min)?;
        ensure_percent("SOC_max", self.soc_max)?;
        if self.soc_min > self.soc_max {
            return Err(RequestError::InvalidField {
                field: "SOC_min",
                reason: format!("must not exceed SOC_max ({})", self.soc_max),
            });
        }
        ensure_non_negative("CAPEX_P", self.capex_p)?;
        ensure_non_negative("CAPEX_E", self.capex_e)?;
        ensure_non_negative("OPEX", self.opex)?;
        ensure_percent("discount_rate", self.discount_rate)?;
        ensure_at_least_one("number_of_years", self.number_of_years)?;

        let eligibility = checkbox_eligibility(self.variant(), &self.products)?;
        let mut body = into_object(json!({
            "provider": self.provider,
            "Sector": self.sector,
            "Q_max": self.q_max,
            "E_max": self.e_max,
            "RTE": self.rte,
            "SOC_min": self.soc_min,
            "SOC_max": self.soc_max,
            "reaction_time": self.reaction_time.seconds(),
            "CAPEX_P": self.capex_p,
            "CAPEX_E": self.capex_e,
            "OPEX": self.opex,
            "discount_rate": self.discount_rate,
            "number_of_years": self.number_of_years,
        }));
        self.thresholds.write_into(self.variant(), &mut body)?;
        body.insert("produktai".to_string(), eligibility.to_wire(self.variant()));
        Ok(Value::Object(body))
    }
}

// A list of ticked names, or the same checkbox map the request body carries.
fn deserialize_ticked<'de, D>(deserializer: D) -> Result<Vec<Product>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        map @ Value::Object(_) => Eligibility::from_wire(&map)
            .map(|eligibility| eligibility.eligible_products())
            .map_err(de::Error::custom),
        other => Vec::<Product>::deserialize(other).map_err(de::Error::custom),
    }
}
