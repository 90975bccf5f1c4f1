use clap::Args;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::eligibility::builder::build;
use crate::eligibility::RequestError;
use crate::forms::{
    ensure_at_least_one, ensure_finite, ensure_non_negative, ensure_percent, into_object,
    CalculatorForm, County, PriceThresholds, Provider, Sector,
};
use crate::products::{CalculatorVariant, ReactionTime, RegulationDirection};

/// Power-to-heat: heat pump plus boiler and a heat storage tank.
#[derive(Debug, Clone, Args, Deserialize)]
#[serde(default)]
pub struct P2hForm {
    #[arg(long, value_enum, default_value_t = Provider::Eso)]
    pub provider: Provider,
    #[arg(long, value_enum, default_value_t = Sector::Services)]
    #[serde(rename = "Sector")]
    pub sector: Sector,
    /// Regulation the asset can offer: up, down or both.
    #[arg(long, default_value = "up")]
    pub regulation_direction: RegulationDirection,
    #[arg(long, value_enum, default_value_t = County::Kaunas)]
    #[serde(rename = "County")]
    pub county: County,
    /// Yearly heat demand (MWh).
    #[arg(long = "q-yearly", default_value_t = 13_000_000.0)]
    #[serde(rename = "Q_yearly")]
    pub q_yearly: f64,
    /// Heat pump power (MW).
    #[arg(long = "q-max-hp", default_value_t = 2.0)]
    #[serde(rename = "Q_max_HP")]
    pub q_max_hp: f64,
    #[arg(long = "reaction-time-u", default_value = "300")]
    pub reaction_time_u: ReactionTime,
    #[arg(long = "reaction-time-d", default_value = "300")]
    pub reaction_time_d: ReactionTime,
    /// Heat pump design outdoor temperature (°C).
    #[arg(long = "t-hp", default_value_t = -10.0, allow_hyphen_values = true)]
    #[serde(rename = "T_HP")]
    pub t_hp: f64,
    #[arg(long = "q-max-boiler", default_value_t = 3.0)]
    #[serde(rename = "Q_max_BOILER")]
    pub q_max_boiler: f64,
    /// Fuel price (EUR/nm³).
    #[arg(long = "p-fuel", default_value_t = 0.75)]
    #[serde(rename = "P_FUEL")]
    pub p_fuel: f64,
    /// Fuel heating value (kWh/nm³).
    #[arg(long = "q-fuel", default_value_t = 9550.0)]
    #[serde(rename = "q_FUEL")]
    pub q_fuel: f64,
    #[arg(long = "eta-boiler", default_value_t = 98.0)]
    #[serde(rename = "eta_BOILER")]
    pub eta_boiler: f64,
    /// Storage tank diameter (m).
    #[arg(long = "d-hs", default_value_t = 5.0)]
    #[serde(rename = "d_HS")]
    pub d_hs: f64,
    /// Storage tank height (m).
    #[arg(long = "h-hs", default_value_t = 12.0)]
    #[serde(rename = "H_HS")]
    pub h_hs: f64,
    #[arg(long = "t-max-hs", default_value_t = 85.0)]
    #[serde(rename = "T_max_HS")]
    pub t_max_hs: f64,
    /// Insulation conductivity (W/m·K).
    #[arg(long = "lambda-hs", default_value_t = 0.032)]
    #[serde(rename = "lambda_HS")]
    pub lambda_hs: f64,
    /// Insulation thickness (m).
    #[arg(long = "dx-hs", default_value_t = 0.25)]
    #[serde(rename = "dx_HS")]
    pub dx_hs: f64,
    #[arg(long = "capex-hp", default_value_t = 6000.0)]
    #[serde(rename = "CAPEX_HP")]
    pub capex_hp: f64,
    #[arg(long = "capex-hs", default_value_t = 0.1)]
    #[serde(rename = "CAPEX_HS")]
    pub capex_hs: f64,
    #[arg(long = "opex-hp", default_value_t = 300.0)]
    #[serde(rename = "OPEX_HP")]
    pub opex_hp: f64,
    #[arg(long = "opex-hs", default_value_t = 0.005)]
    #[serde(rename = "OPEX_HS")]
    pub opex_hs: f64,
    #[arg(long = "discount-rate", default_value_t = 5.0)]
    pub discount_rate: f64,
    #[arg(long = "number-of-years", default_value_t = 10)]
    pub number_of_years: u32,
    #[command(flatten)]
    #[serde(flatten)]
    pub thresholds: PriceThresholds,
}

impl Default for P2hForm {
    fn default() -> Self {
        Self {
            provider: Provider::Eso,
            sector: Sector::Services,
            regulation_direction: RegulationDirection::Up,
            county: County::Kaunas,
            q_yearly: 13_000_000.0,
            q_max_hp: 2.0,
            reaction_time_u: ReactionTime::S300,
            reaction_time_d: ReactionTime::S300,
            t_hp: -10.0,
            q_max_boiler: 3.0,
            p_fuel: 0.75,
            q_fuel: 9550.0,
            eta_boiler: 98.0,
            d_hs: 5.0,
            h_hs: 12.0,
            t_max_hs: 85.0,
            lambda_hs: 0.032,
            dx_hs: 0.25,
            capex_hp: 6000.0,
            capex_hs: 0.1,
            opex_hp: 300.0,
            opex_hs: 0.005,
            discount_rate: 5.0,
            number_of_years: 10,
            thresholds: PriceThresholds::default(),
        }
    }
}

impl P2hForm {
    fn validate(&self) -> Result<(), RequestError> {
        for (field, value) in [
            ("Q_yearly", self.q_yearly),
            ("Q_max_HP", self.q_max_hp),
            ("Q_max_BOILER", self.q_max_boiler),
            ("P_FUEL", self.p_fuel),
            ("q_FUEL", self.q_fuel),
            ("d_HS", self.d_hs),
            ("H_HS", self.h_hs),
            ("T_max_HS", self.t_max_hs),
            ("lambda_HS", self.lambda_hs),
            ("dx_HS", self.dx_hs),
            ("CAPEX_HP", self.capex_hp),
            ("CAPEX_HS", self.capex_hs),
            ("OPEX_HP", self.opex_hp),
            ("OPEX_HS", self.opex_hs),
        ] {
            ensure_non_negative(field, value)?;
        }
        ensure_finite("T_HP", self.t_hp)?;
        ensure_percent("eta_BOILER", self.eta_boiler)?;
        ensure_percent("discount_rate", self.discount_rate)?;
        ensure_at_least_one("number_of_years", self.number_of_years)
    }
}

impl CalculatorForm for P2hForm {
    fn variant(&self) -> CalculatorVariant {
        CalculatorVariant::P2h
    }

    fn to_request_body(&self) -> Result<Value, RequestError> {
        self.validate()?;
        let selection = build(
            self.regulation_direction,
            self.variant(),
            self.reaction_time_u.seconds(),
            self.reaction_time_d.seconds(),
        )?;
        let mut body = into_object(json!({
            "provider": self.provider,
            "Sector": self.sector,
            "County": self.county.wire_name(),
            "Q_yearly": self.q_yearly,
            "Q_max_HP": self.q_max_hp,
            "reaction_time_u": selection.adjusted_up(),
            "reaction_time_d": selection.adjusted_down(),
            "T_HP": self.t_hp,
            "Q_max_BOILER": self.q_max_boiler,
            "P_FUEL": self.p_fuel,
            "q_FUEL": self.q_fuel,
            "eta_BOILER": self.eta_boiler,
            "d_HS": self.d_hs,
            "H_HS": self.h_hs,
            "T_max_HS": self.t_max_hs,
            "lambda_HS": self.lambda_hs,
            "dx_HS": self.dx_hs,
            "CAPEX_HP": self.capex_hp,
            "CAPEX_HS": self.capex_hs,
            "OPEX_HP": self.opex_hp,
            "OPEX_HS": self.opex_hs,
            "discount_rate": self.discount_rate,
            "number_of_years": self.number_of_years,
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

    use super::P2hForm;
    use crate::forms::{CalculatorForm, County};
    use crate::products::{ReactionTime, RegulationDirection};

    #[test]
    fn downward_body_zeroes_upward_reaction_time() {
        let form = P2hForm {
            regulation_direction: RegulationDirection::Down,
            reaction_time_u: ReactionTime::S30,
            reaction_time_d: ReactionTime::S750,
            ..P2hForm::default()
        };
        let body = form.to_request_body().expect("body");
        assert_eq!(body["reaction_time_u"], json!(0));
        assert_eq!(body["reaction_time_d"], json!(750));
        assert_eq!(
            body["produktai"],
            json!({"FCR": false, "aFRRu": false, "aFRRd": true, "mFRRu": false, "mFRRd": true})
        );
    }

    #[test]
    fn county_is_ascii_folded_on_the_wire() {
        let form = P2hForm {
            county: County::Panevezys,
            ..P2hForm::default()
        };
        let body = form.to_request_body().expect("body");
        assert_eq!(body["County"], json!("panevezys"));
        assert_eq!(body["provider"], json!("ESO"));
        assert_eq!(body["Sector"], json!("Paslaugų"));
    }

    #[test]
    fn json_form_accepts_lithuanian_selector_values() {
        let form: P2hForm = serde_json::from_value(json!({
            "regulation_direction": "Į abi puses",
            "County": "Šiauliai",
            "Q_max_HP": 4.5
        }))
        .expect("form");
        let body = form.to_request_body().expect("body");
        assert_eq!(body["County"], json!("siauliai"));
        assert_eq!(body["Q_max_HP"], json!(4.5));
        assert_eq!(body["reaction_time_u"], json!(300));
        assert_eq!(body["reaction_time_d"], json!(300));
        assert_eq!(body["produktai"]["FCR"], json!(true));
    }

    #[test]
    fn unknown_direction_fails_to_decode() {
        let err = serde_json::from_value::<P2hForm>(json!({"regulation_direction": "diagonal"}))
            .expect_err("direction");
        assert!(err.to_string().contains("invalid regulation direction"));
    }
}
