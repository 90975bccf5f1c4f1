use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::response::to_f64;

struct MetricSpec {
    key: &'static str,
    header: &'static str,
    unit: &'static str,
}

struct MarketSpec {
    key: &'static str,
    title: &'static str,
    entries: &'static [(&'static str, &'static str)],
    metrics: &'static [MetricSpec],
}

const UTILISATION: MetricSpec = MetricSpec {
    key: "utilisation",
    header: "UTILISATION (% OF TIME)",
    unit: "%",
};
const POTENTIAL_REVENUE: MetricSpec = MetricSpec {
    key: "potential_revenue",
    header: "POTENTIAL REVENUE",
    unit: "tūkst. EUR",
};
const BIDS_SELECTED: MetricSpec = MetricSpec {
    key: "bids_selected",
    header: "% OF BIDS SELECTED",
    unit: "%",
};
const COST_REVENUE: MetricSpec = MetricSpec {
    key: "potential_cost_revenue",
    header: "COST & REVENUE",
    unit: "tūkst. EUR",
};

const MARKETS: [MarketSpec; 4] = [
    MarketSpec {
        key: "BALANSAVIMO_PAJEGUMU_RINKA",
        title: "Balancing capacity market",
        entries: &[
            ("FCR", "FREQUENCY CONTAINMENT RESERVE"),
            ("aFRR", "AUTOMATIC FREQUENCY RESTORATION RESERVE"),
            ("mFRR", "MANUAL FREQUENCY RESTORATION RESERVE"),
        ],
        metrics: &[
            MetricSpec {
                key: "volume_of_procured_reserves",
                header: "VOLUME OF PROCURED RESERVES",
                unit: "MW",
            },
            UTILISATION,
            POTENTIAL_REVENUE,
            BIDS_SELECTED,
        ],
    },
    MarketSpec {
        key: "BALANSAVIMO_ENERGIJOS_RINKA",
        title: "Balancing energy market",
        entries: &[
            ("aFRR", "AUTOMATIC FREQUENCY RESTORATION RESERVE"),
            ("mFRR", "MANUAL FREQUENCY RESTORATION RESERVE"),
        ],
        metrics: &[
            MetricSpec {
                key: "volume_of_procured_energy",
                header: "VOLUME OF PROCURED ENERGY",
                unit: "MWh",
            },
            UTILISATION,
            POTENTIAL_REVENUE,
            BIDS_SELECTED,
        ],
    },
    MarketSpec {
        key: "ELEKTROS_ENERGIJOS_PREKYBA",
        title: "Electricity trading",
        entries: &[("Day_Ahead", ""), ("Intraday", "")],
        metrics: &[
            MetricSpec {
                key: "volume_of_energy_exchange",
                header: "VOLUME OF ENERGY EXCHANGE",
                unit: "MWh",
            },
            MetricSpec {
                key: "percentage_of_time",
                header: "% OF TIME",
                unit: "%",
            },
            COST_REVENUE,
        ],
    },
    MarketSpec {
        key: "VANDENILIO_PREKYBA",
        title: "Hydrogen trading",
        entries: &[("Hydrogen_Sales", "")],
        metrics: &[
            MetricSpec {
                key: "volume_of_h2_sold",
                header: "VOLUME SOLD",
                unit: "kg",
            },
            COST_REVENUE,
        ],
    },
];

// Sub-keys a metric may split into, in display order.
const SPLITS: [(&str, &str); 6] = [
    ("upward", "up"),
    ("downward", "down"),
    ("purchase", "purchase"),
    ("sale", "sale"),
    ("cost", "cost"),
    ("revenue", "revenue"),
];

/// One reading of a metric; `split` is empty for an undivided metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricValue {
    pub split: &'static str,
    pub value: f64,
    pub unit: String,
}

impl MetricValue {
    pub fn formatted(&self) -> String {
        if self.split.is_empty() {
            format!("{:.2} {}", self.value, self.unit)
        } else {
            format!("{}: {:.2} {}", self.split, self.value, self.unit)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketMetric {
    pub header: String,
    pub values: Vec<MetricValue>,
}

impl MarketMetric {
    pub fn formatted(&self) -> String {
        self.values
            .iter()
            .map(MetricValue::formatted)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketEntry {
    pub key: String,
    pub header: String,
    pub description: String,
    pub metrics: Vec<MarketMetric>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSection {
    pub key: &'static str,
    pub title: &'static str,
    pub entries: Vec<MarketEntry>,
}

pub(crate) fn market_sections(markets: &Map<String, Value>) -> Vec<MarketSection> {
    for key in markets.keys() {
        if !MARKETS.iter().any(|spec| spec.key == key.as_str()) {
            debug!("ignoring unknown market section {key}");
        }
    }
    MARKETS
        .iter()
        .filter_map(|spec| {
            let market = markets.get(spec.key)?.as_object()?;
            Some(MarketSection {
                key: spec.key,
                title: spec.title,
                entries: spec
                    .entries
                    .iter()
                    .filter_map(|(entry_key, description)| {
                        let entry = market.get(*entry_key)?.as_object()?;
                        Some(market_entry(entry_key, description, entry, spec.metrics))
                    })
                    .collect(),
            })
        })
        .collect()
}

fn market_entry(
    key: &str,
    default_description: &str,
    entry: &Map<String, Value>,
    metrics: &[MetricSpec],
) -> MarketEntry {
    let text = |field: &str, default: &str| {
        entry
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };
    MarketEntry {
        key: key.to_string(),
        header: text("header", &key.replace('_', " ")),
        description: text("description", default_description),
        metrics: metrics
            .iter()
            .filter_map(|spec| {
                let metric = entry.get(spec.key)?.as_object()?;
                Some(market_metric(spec, metric))
            })
            .collect(),
    }
}

fn market_metric(spec: &MetricSpec, metric: &Map<String, Value>) -> MarketMetric {
    let header = metric
        .get("header")
        .and_then(Value::as_str)
        .unwrap_or(spec.header)
        .to_string();
    let metric_unit = unit_of(metric, spec.unit);
    let values = match metric.get("value") {
        Some(value) => vec![MetricValue {
            split: "",
            value: to_f64(value).unwrap_or(0.0),
            unit: metric_unit.to_string(),
        }],
        None => SPLITS
            .iter()
            .filter_map(|(key, label)| {
                let split = metric.get(*key)?;
                let value = split.get("value").and_then(to_f64).unwrap_or(0.0);
                let unit = split
                    .as_object()
                    .map(|object| unit_of(object, metric_unit))
                    .unwrap_or(metric_unit);
                Some(MetricValue {
                    split: *label,
                    value,
                    unit: unit.to_string(),
                })
            })
            .collect(),
    };
    MarketMetric { header, values }
}

fn unit_of<'a>(object: &'a Map<String, Value>, fallback: &'a str) -> &'a str {
    object
        .get("unit")
        .and_then(Value::as_str)
        .filter(|unit| !unit.is_empty())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::response::CalculationResult;

    #[test]
    fn reads_capacity_market_with_directional_splits() {
        let result = CalculationResult::new(json!({"aggregated": {"markets": {
            "BALANSAVIMO_PAJEGUMU_RINKA": {
                "FCR": {
                    "header": "FCR",
                    "volume_of_procured_reserves": {"value": 1.5},
                    "utilisation": {"header": "UTIL", "value": 42.0}
                },
                "aFRR": {
                    "potential_revenue": {
                        "upward": {"value": 12.346},
                        "downward": {"value": 3.0}
                    }
                }
            }
        }}}));
        let markets = result.markets();
        assert_eq!(markets.len(), 1);
        let capacity = &markets[0];
        assert_eq!(capacity.entries.len(), 2);

        let fcr = &capacity.entries[0];
        assert_eq!(fcr.description, "FREQUENCY CONTAINMENT RESERVE");
        assert_eq!(fcr.metrics[0].formatted(), "1.50 MW");
        assert_eq!(fcr.metrics[1].header, "UTIL");

        let afrr = &capacity.entries[1];
        assert_eq!(afrr.metrics[0].header, "POTENTIAL REVENUE");
        assert_eq!(
            afrr.metrics[0].formatted(),
            "up: 12.35 tūkst. EUR, down: 3.00 tūkst. EUR"
        );
    }

    #[test]
    fn reads_trading_and_hydrogen_sections_in_fixed_order() {
        let result = CalculationResult::new(json!({"aggregated": {"markets": {
            "VANDENILIO_PREKYBA": {
                "Hydrogen_Sales": {
                    "volume_of_h2_sold": {"value": 900.0},
                    "potential_cost_revenue": {"revenue": {"value": 3.15}}
                }
            },
            "ELEKTROS_ENERGIJOS_PREKYBA": {
                "Day_Ahead": {
                    "volume_of_energy_exchange": {"purchase": {"value": 10.0}, "sale": {}}
                }
            }
        }}}));
        let markets = result.markets();
        assert_eq!(markets[0].key, "ELEKTROS_ENERGIJOS_PREKYBA");
        assert_eq!(markets[0].entries[0].header, "Day Ahead");
        let volume = &markets[0].entries[0].metrics[0];
        let splits: Vec<(&str, f64)> = volume.values.iter().map(|v| (v.split, v.value)).collect();
        assert_eq!(splits, vec![("purchase", 10.0), ("sale", 0.0)]);
        assert_eq!(markets[1].entries[0].metrics[0].formatted(), "900.00 kg");
        assert_eq!(
            markets[1].entries[0].metrics[1].formatted(),
            "revenue: 3.15 tūkst. EUR"
        );
    }

    #[test]
    fn units_come_from_the_response_when_present() {
        let result = CalculationResult::new(json!({"aggregated": {"markets": {
            "ELEKTROS_ENERGIJOS_PREKYBA": {
                "Intraday": {
                    "volume_of_energy_exchange": {
                        "purchase": {"value": 4.0, "unit": "MWh/year"},
                        "sale": {"value": 1.0}
                    },
                    "percentage_of_time": {"value": 12.5, "unit": "% of hours"}
                }
            }
        }}}));
        let entry = &result.markets()[0].entries[0];
        assert_eq!(
            entry.metrics[0].formatted(),
            "purchase: 4.00 MWh/year, sale: 1.00 MWh"
        );
        assert_eq!(entry.metrics[1].formatted(), "12.50 % of hours");
    }
}
