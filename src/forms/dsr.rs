use std::collections::BTreeMap;

use clap::Args;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::eligibility::builder::build;
use crate::eligibility::RequestError;
use crate::forms::{
    ensure_at_least_one, ensure_non_negative, ensure_percent, into_object, CalculatorForm,
    PriceThresholds, Provider, Sector,
};
use crate::products::{CalculatorVariant, ReactionTime, RegulationDirection};

pub const HOURS_PER_DAY: usize = 24;

/// Demand-side response: a flexible load shifting consumption.
#[derive(Debug, Clone, Args, Deserialize)]
#[serde(default)]
pub struct DsrForm {
    #[arg(long, value_enum, default_value_t = Provider::Litgrid)]
    pub provider: Provider,
    #[arg(long, value_enum, default_value_t = Sector::Industry)]
    #[serde(rename = "Sector")]
    pub sector: Sector,
    #[arg(long, default_value = "up")]
    pub regulation_direction: RegulationDirection,
    /// Average consumption (MW).
    #[arg(long = "q-avg", default_value_t = 10.0)]
    #[serde(rename = "Q_avg")]
    pub q_avg: f64,
    #[arg(long = "q-min", default_value_t = 5.0)]
    #[serde(rename = "Q_min")]
    pub q_min: f64,
    #[arg(long = "q-max", default_value_t = 15.0)]
    #[serde(rename = "Q_max")]
    pub q_max: f64,
    /// Reaction time in seconds, sent as-is for both directions.
    #[arg(long = "reaction-time", default_value = "300")]
    pub reaction_time: ReactionTime,
    /// Restoration time shift (quarter hours).
    #[arg(long = "t-shift", default_value_t = 1)]
    #[serde(rename = "T_shift")]
    pub t_shift: u32,
    #[arg(long, default_value_t = 150.0)]
    #[serde(rename = "CAPEX")]
    pub capex: f64,
    #[arg(long, default_value_t = 10.0)]
    #[serde(rename = "OPEX")]
    pub opex: f64,
    #[arg(long = "discount-rate", default_value_t = 5.0)]
    pub discount_rate: f64,
    #[arg(long = "number-of-years", default_value_t = 10)]
    pub number_of_years: u32,
    #[command(flatten)]
    #[serde(flatten)]
    pub restoration: Restoration,
    /// Send an hourly consumption profile; flat Q_avg when not given.
    #[arg(long = "use-hourly-power")]
    pub use_hourly_power: bool,
    /// 24 comma-separated hourly consumption values (MW).
    #[arg(long = "hourly-power", value_delimiter = ',')]
    #[serde(deserialize_with = "deserialize_profile")]
    pub hourly_power: Option<Vec<f64>>,
    /// Send hourly min/max profiles; flat Q_min/Q_max when not given.
    #[arg(long = "use-hourly-min-max")]
    pub use_hourly_min_max: bool,
    #[arg(long = "hourly-min-power", value_delimiter = ',')]
    #[serde(deserialize_with = "deserialize_profile")]
    pub hourly_min_power: Option<Vec<f64>>,
    #[arg(long = "hourly-max-power", value_delimiter = ',')]
    #[serde(deserialize_with = "deserialize_profile")]
    pub hourly_max_power: Option<Vec<f64>>,
    #[command(flatten)]
    #[serde(flatten)]
    pub thresholds: PriceThresholds,
}

#[derive(Debug, Clone, Args, Deserialize, PartialEq)]
#[serde(default)]
pub struct Restoration {
    #[arg(long = "restoration")]
    #[serde(rename = "restoration_investment_needed")]
    pub needed: bool,
    /// Restoration investment (% of CAPEX).
    #[arg(long = "restoration-percentage", default_value_t = 25.0)]
    #[serde(rename = "restoration_investment_percentage")]
    pub percentage: f64,
    #[arg(long = "restoration-hours", default_value_t = 45_000)]
    #[serde(rename = "restoration_working_hours")]
    pub working_hours: u32,
}

impl Default for Restoration {
    fn default() -> Self {
        Self {
            needed: false,
            percentage: 25.0,
            working_hours: 45_000,
        }
    }
}

impl Restoration {
    fn write_into(&self, body: &mut Map<String, Value>) -> Result<(), RequestError> {
        let (percentage, hours) = if self.needed {
            ensure_percent("restoration_investment_percentage", self.percentage)?;
            (self.percentage, self.working_hours)
        } else {
            (0.0, 0)
        };
        body.insert("restoration_investment_needed".to_string(), json!(self.needed));
        body.insert("restoration_investment_percentage".to_string(), json!(percentage));
        body.insert("restoration_working_hours".to_string(), json!(hours));
        Ok(())
    }
}

impl Default for DsrForm {
    fn default() -> Self {
        Self {
            provider: Provider::Litgrid,
            sector: Sector::Industry,
            regulation_direction: RegulationDirection::Up,
            q_avg: 10.0,
            q_min: 5.0,
            q_max: 15.0,
            reaction_time: ReactionTime::S300,
            t_shift: 1,
            capex: 150.0,
            opex: 10.0,
            discount_rate: 5.0,
            number_of_years: 10,
            restoration: Restoration::default(),
            use_hourly_power: false,
            hourly_power: None,
            use_hourly_min_max: false,
            hourly_min_power: None,
            hourly_max_power: None,
            thresholds: PriceThresholds::default(),
        }
    }
}

impl DsrForm {
    fn validate(&self) -> Result<(), RequestError> {
        ensure_non_negative("Q_avg", self.q_avg)?;
        ensure_non_negative("Q_min", self.q_min)?;
        ensure_non_negative("Q_max", self.q_max)?;
        if self.q_min > self.q_max {
            return Err(RequestError::InvalidField {
                field: "Q_min",
                reason: format!("must not exceed Q_max ({})", self.q_max),
            });
        }
        ensure_at_least_one("T_shift", self.t_shift)?;
        ensure_non_negative("CAPEX", self.capex)?;
        ensure_non_negative("OPEX", self.opex)?;
        ensure_percent("discount_rate", self.discount_rate)?;
        ensure_at_least_one("number_of_years", self.number_of_years)
    }

    fn min_max_requested(&self) -> bool {
        self.use_hourly_min_max || self.hourly_min_power.is_some() || self.hourly_max_power.is_some()
    }
}

impl CalculatorForm for DsrForm {
    fn variant(&self) -> CalculatorVariant {
        CalculatorVariant::Dsr
    }

    fn to_request_body(&self) -> Result<Value, RequestError> {
        self.validate()?;
        let seconds = self.reaction_time.seconds();
        let selection = build(self.regulation_direction, self.variant(), seconds, seconds)?;

        let mut body = into_object(json!({
            "Q_avg": self.q_avg,
            "Q_min": self.q_min,
            "Q_max": self.q_max,
            "reaction_time": seconds,
            "T_shift": self.t_shift,
            "CAPEX": self.capex,
            "OPEX": self.opex,
            "discount_rate": self.discount_rate,
            "number_of_years": self.number_of_years,
            "provider": self.provider,
            "Sector": self.sector,
        }));
        self.thresholds.write_into(self.variant(), &mut body)?;
        body.insert(
            "produktai".to_string(),
            selection.eligibility.to_wire(self.variant()),
        );
        self.restoration.write_into(&mut body)?;

        if self.use_hourly_power || self.hourly_power.is_some() {
            let values = self
                .hourly_power
                .clone()
                .unwrap_or_else(|| vec![self.q_avg; HOURS_PER_DAY]);
            body.insert(
                "hourly_power".to_string(),
                hourly_profile("hourly_power", &values)?,
            );
        }
        if self.min_max_requested() {
            let min = self
                .hourly_min_power
                .clone()
                .unwrap_or_else(|| vec![self.q_min; HOURS_PER_DAY]);
            let max = self
                .hourly_max_power
                .clone()
                .unwrap_or_else(|| vec![self.q_max; HOURS_PER_DAY]);
            body.insert(
                "hourly_min_power".to_string(),
                hourly_profile("hourly_min_power", &min)?,
            );
            body.insert(
                "hourly_max_power".to_string(),
                hourly_profile("hourly_max_power", &max)?,
            );
        }
        Ok(Value::Object(body))
    }
}

/// Wire form of an hourly profile: an object keyed `"0"`..`"23"`.
pub fn hourly_profile(name: &'static str, values: &[f64]) -> Result<Value, RequestError> {
    if values.len() != HOURS_PER_DAY {
        return Err(RequestError::InvalidHourlyProfile {
            name,
            len: values.len(),
        });
    }
    let mut object = Map::new();
    for (hour, value) in values.iter().enumerate() {
        ensure_non_negative(name, *value)?;
        object.insert(hour.to_string(), json!(value));
    }
    Ok(Value::Object(object))
}

// Accepts a plain list or the hour-keyed object the backend itself uses.
fn deserialize_profile<'de, D>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_f64()
                    .ok_or_else(|| de::Error::custom(format!("non-numeric hourly value {item}")))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(Value::Object(object)) => {
            let mut by_hour = BTreeMap::new();
            for (key, item) in &object {
                let hour: usize = key
                    .parse()
                    .map_err(|_| de::Error::custom(format!("invalid hour key {key:?}")))?;
                let value = item
                    .as_f64()
                    .ok_or_else(|| de::Error::custom(format!("non-numeric hourly value {item}")))?;
                by_hour.insert(hour, value);
            }
            if by_hour.keys().copied().ne(0..by_hour.len()) {
                return Err(de::Error::custom("hour keys must run from 0 without gaps"));
            }
            Ok(Some(by_hour.into_values().collect()))
        }
        Some(other) => Err(de::Error::custom(format!(
            "expected a list or an hour-keyed object, got {other}"
        ))),
    }
}
