use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::eligibility::builder::build;
use crate::eligibility::RequestError;
use crate::forms::{
    ensure_at_least_one, ensure_finite, ensure_non_negative, ensure_percent, into_object,
    CalculatorForm, PriceThresholds, Provider, Sector,
};
use crate::products::{CalculatorVariant, ReactionTime, RegulationDirection};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum ElectrolyzerTech {
    Soec,
    Ael,
    Pem,
}

/// Power-to-gas: an electrolyzer selling hydrogen.
#[derive(Debug, Clone, Args, Deserialize)]
#[serde(default)]
pub struct P2gForm {
    #[arg(long, value_enum, default_value_t = Provider::Litgrid)]
    pub provider: Provider,
    #[arg(long, value_enum, default_value_t = Sector::Services)]
    #[serde(rename = "Sector")]
    pub sector: Sector,
    #[arg(long, default_value = "up")]
    pub regulation_direction: RegulationDirection,
    #[arg(long, value_enum, default_value_t = ElectrolyzerTech::Soec)]
    pub electrolyzer_tech: ElectrolyzerTech,
    /// Electrolyzer electrical power (MW).
    #[arg(long = "q-max", default_value_t = 1.0)]
    #[serde(rename = "Q_max")]
    pub q_max: f64,
    #[arg(long = "reaction-time-u", default_value = "30")]
    pub reaction_time_u: ReactionTime,
    #[arg(long = "reaction-time-d", default_value = "30")]
    pub reaction_time_d: ReactionTime,
    /// Electricity to hydrogen efficiency (%).
    #[arg(long = "eta-h2", default_value_t = 50.0)]
    #[serde(rename = "eta_H2")]
    pub eta_h2: f64,
    /// Produced gas temperature (°C).
    #[arg(long = "t0", default_value_t = 80.0, allow_hyphen_values = true)]
    #[serde(rename = "T0")]
    pub t0: f64,
    /// Produced gas pressure (bar).
    #[arg(long = "p0", default_value_t = 30.0)]
    pub p0: f64,
    /// Compressor efficiency (%).
    #[arg(long = "eta-c", default_value_t = 80.0)]
    #[serde(rename = "eta_C")]
    pub eta_c: f64,
    /// Hydrogen price (EUR/kg).
    #[arg(long = "p-h2", default_value_t = 3.5)]
    #[serde(rename = "P_H2")]
    pub p_h2: f64,
    #[arg(long, default_value_t = 2000.0)]
    #[serde(rename = "CAPEX")]
    pub capex: f64,
    #[arg(long, default_value_t = 16.0)]
    #[serde(rename = "OPEX")]
    pub opex: f64,
    #[arg(long = "discount-rate", default_value_t = 5.0)]
    pub discount_rate: f64,
    #[arg(long = "number-of-years", default_value_t = 10)]
    pub number_of_years: u32,
    #[command(flatten)]
    #[serde(flatten)]
    pub thresholds: PriceThresholds,
}

impl Default for P2gForm {
    fn default() -> Self {
        Self {
            provider: Provider::Litgrid,
            sector: Sector::Services,
            regulation_direction: RegulationDirection::Up,
            electrolyzer_tech: ElectrolyzerTech::Soec,
            q_max: 1.0,
            reaction_time_u: ReactionTime::S30,
            reaction_time_d: ReactionTime::S30,
            eta_h2: 50.0,
            t0: 80.0,
            p0: 30.0,
            eta_c: 80.0,
            p_h2: 3.5,
            capex: 2000.0,
            opex: 16.0,
            discount_rate: 5.0,
            number_of_years: 10,
            thresholds: PriceThresholds::default(),
        }
    }
}

impl CalculatorForm for P2gForm {
    fn variant(&self) -> CalculatorVariant {
        CalculatorVariant::P2g
    }

    fn to_request_body(&self) -> Result<Value, RequestError> {
        ensure_non_negative("Q_max", self.q_max)?;
        ensure_percent("eta_H2", self.eta_h2)?;
        ensure_finite("T0", self.t0)?;
        ensure_non_negative("p0", self.p0)?;
        ensure_percent("eta_C", self.eta_c)?;
        ensure_non_negative("P_H2", self.p_h2)?;
        ensure_non_negative("CAPEX", self.capex)?;
        ensure_non_negative("OPEX", self.opex)?;
        ensure_percent("discount_rate", self.discount_rate)?;
        ensure_at_least_one("number_of_years", self.number_of_years)?;

        let selection = build(
            self.regulation_direction,
            self.variant(),
            self.reaction_time_u.seconds(),
            self.reaction_time_d.seconds(),
        )?;
        let mut body = into_object(json!({
            "Q_max": self.q_max,
            "P_H2": self.p_h2,
            "electrolyzer_tech": self.electrolyzer_tech,
            "eta_H2": self.eta_h2,
            "reaction_time_d": selection.adjusted_down(),
            "reaction_time_u": selection.adjusted_up(),
            "T0": self.t0,
            "p0": self.p0,
            "eta_C": self.eta_c,
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
        Ok(Value::Object(body))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ElectrolyzerTech, P2gForm};
    use crate::eligibility::Eligibility;
    use crate::forms::CalculatorForm;
    use crate::products::{Product, ReactionTime, RegulationDirection};

    #[test]
    fn upward_scenario_body() {
        let form = P2gForm {
            regulation_direction: RegulationDirection::Up,
            reaction_time_u: ReactionTime::S300,
            reaction_time_d: ReactionTime::S750,
            electrolyzer_tech: ElectrolyzerTech::Pem,
            ..P2gForm::default()
        };
        let body = form.to_request_body().expect("body");
        assert_eq!(body["reaction_time_u"], json!(300));
        assert_eq!(body["reaction_time_d"], json!(0));
        assert_eq!(body["electrolyzer_tech"], json!("PEM"));
        assert_eq!(
            body["produktai"],
            json!({"FCR": false, "aFRRu": true, "aFRRd": false, "mFRRu": true, "mFRRd": false})
        );
    }

    #[test]
    fn body_round_trips_through_json_text() {
        let form = P2gForm {
            regulation_direction: RegulationDirection::Both,
            ..P2gForm::default()
        };
        let body = form.to_request_body().expect("body");
        let text = serde_json::to_string(&body).expect("encode");
        let decoded: serde_json::Value = serde_json::from_str(&text).expect("decode");
        let eligibility = Eligibility::from_wire(&decoded["produktai"]).expect("produktai");
        assert!(eligibility.is_eligible(Product::Fcr));
        assert_eq!(decoded["reaction_time_u"], json!(30));
        assert_eq!(decoded["reaction_time_d"], json!(30));
    }

    #[test]
    fn efficiency_above_hundred_is_rejected() {
        let form = P2gForm {
            eta_h2: 120.0,
            ..P2gForm::default()
        };
        assert!(form.to_request_body().is_err());
    }
}
