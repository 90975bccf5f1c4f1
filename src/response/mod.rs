//! Read-only views over the backend's `aggregated` payload.
//!
//! Every accessor tolerates missing keys: an absent section yields `None` or an
//! empty list so renderers can print a "no data" line instead of failing.

pub mod finance;
pub mod markets;

use serde::Serialize;
use serde_json::{Map, Value};

pub use finance::FinancialBreakdown;
pub use markets::{MarketEntry, MarketMetric, MarketSection, MetricValue};

/// A labelled row of one of the summary tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub label: String,
    pub value: Option<f64>,
    /// Raw value when the backend sent a non-numeric `Value`.
    pub text: Option<String>,
}

impl SummaryRow {
    pub fn formatted(&self, unit: &str) -> String {
        match (self.value, &self.text) {
            (Some(value), _) => format!("{value:.2} {unit}"),
            (None, Some(text)) => text.clone(),
            (None, None) => "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NpvPoint {
    pub year: String,
    pub dcf: f64,
    pub npv: f64,
    pub break_even: bool,
}

/// Label/value pairs from a `{products, values}` chart block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductValue {
    pub product: String,
    pub value: f64,
}

/// A list-of-rows table rendered generically.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RowTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A numeric scalar under `economic_results`, e.g. `total_profit`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EconomicMetric {
    pub key: String,
    pub value: f64,
}

impl EconomicMetric {
    pub fn label(&self) -> String {
        self.key.replace('_', " ").to_uppercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonLine {
    pub label: String,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Comparison {
    pub number_of_years: Option<u64>,
    pub totals: Vec<ComparisonLine>,
    pub chart: Vec<ComparisonLine>,
}

impl Comparison {
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty() && self.chart.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct CalculationResult {
    raw: Value,
}

impl CalculationResult {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// Value at `path` below `aggregated`, e.g. `"yearly"`.
    pub fn aggregated(&self, path: &str) -> Option<&Value> {
        let root = self.raw.as_object()?;
        object_path_value(root, &format!("aggregated.{path}"))
    }

    /// Object at `path` below `aggregated`, e.g. `"summary.npv_chart_data"`.
    pub fn section(&self, path: &str) -> Option<&Map<String, Value>> {
        self.aggregated(path)?.as_object()
    }

    pub fn has_aggregated(&self) -> bool {
        self.raw
            .as_object()
            .and_then(|root| object_get_case_insensitive(root, "aggregated"))
            .is_some_and(Value::is_object)
    }

    pub fn yearly_summary(&self) -> Option<Vec<SummaryRow>> {
        self.summary_rows("yearly_summary_table")
    }

    pub fn project_summary(&self) -> Option<Vec<SummaryRow>> {
        self.summary_rows("project_summary_table")
    }

    fn summary_rows(&self, key: &str) -> Option<Vec<SummaryRow>> {
        let rows = self.section("summary")?.get(key)?.as_array()?;
        Some(
            rows.iter()
                .filter_map(Value::as_object)
                .map(summary_row)
                .collect(),
        )
    }

    /// Discounted cash flow and cumulative NPV per year. `None` when any series is missing.
    pub fn npv_series(&self) -> Option<Vec<NpvPoint>> {
        let chart = self.section("summary.npv_chart_data")?;
        let years = chart.get("years")?.as_array()?;
        let dcfs = chart.get("dcfs")?.as_array()?;
        let npv = chart.get("npv")?.as_array()?;
        let break_even = chart
            .get("break_even_point")
            .and_then(Value::as_u64)
            .map(|idx| idx as usize)
            .filter(|idx| *idx < years.len());

        Some(
            years
                .iter()
                .zip(dcfs)
                .zip(npv)
                .enumerate()
                .map(|(idx, ((year, dcf), npv))| NpvPoint {
                    year: cell_text(year),
                    dcf: to_f64(dcf).unwrap_or(0.0),
                    npv: to_f64(npv).unwrap_or(0.0),
                    break_even: break_even == Some(idx),
                })
                .collect(),
        )
    }

    pub fn break_even_year(&self) -> Option<String> {
        self.npv_series()?
            .into_iter()
            .find(|point| point.break_even)
            .map(|point| point.year)
    }

    /// `{products, values}` chart block under `summary`, e.g. `revenue_cost_chart_data`.
    pub fn product_chart(&self, key: &str) -> Option<Vec<ProductValue>> {
        let chart = self.section(&format!("summary.{key}"))?;
        let products = chart.get("products")?.as_array()?;
        let values = chart.get("values")?.as_array()?;
        Some(
            products
                .iter()
                .zip(values)
                .map(|(product, value)| ProductValue {
                    product: cell_text(product),
                    value: to_f64(value).unwrap_or(0.0),
                })
                .collect(),
        )
    }

    pub fn markets(&self) -> Vec<MarketSection> {
        match self.section("markets") {
            Some(markets) => markets::market_sections(markets),
            None => Vec::new(),
        }
    }

    /// Every list-of-rows table under `economic_results`, in response order.
    pub fn economic_tables(&self) -> Vec<RowTable> {
        let Some(results) = self.section("economic_results") else {
            return Vec::new();
        };
        results
            .iter()
            .filter_map(|(name, value)| row_table(name, value.as_array()?))
            .collect()
    }

    /// Numeric scalars under `economic_results`, in response order.
    pub fn economic_metrics(&self) -> Vec<EconomicMetric> {
        let Some(results) = self.section("economic_results") else {
            return Vec::new();
        };
        results
            .iter()
            .filter_map(|(key, value)| {
                Some(EconomicMetric {
                    key: key.clone(),
                    value: value.as_f64()?,
                })
            })
            .collect()
    }

    pub fn comparison(&self) -> Option<Comparison> {
        let section = self.section("comparison")?;
        let mut comparison = Comparison {
            number_of_years: section.get("number_of_years").and_then(Value::as_u64),
            ..Comparison::default()
        };
        for (key, value) in section {
            let Some(object) = value.as_object() else {
                continue;
            };
            if key == "comparison_chart_data" {
                comparison.chart = object
                    .iter()
                    .filter_map(|(label, v)| {
                        Some(ComparisonLine {
                            label: label.clone(),
                            total: v.as_f64()?,
                        })
                    })
                    .collect();
            } else if let Some(total) = object
                .get("total")
                .or_else(|| object.get("value"))
                .and_then(to_f64)
            {
                let label = object
                    .get("label")
                    .and_then(Value::as_str)
                    .unwrap_or(key)
                    .to_string();
                comparison.totals.push(ComparisonLine { label, total });
            }
        }
        Some(comparison)
    }
}

fn summary_row(row: &Map<String, Value>) -> SummaryRow {
    let label = row
        .iter()
        .filter(|(key, _)| !key.eq_ignore_ascii_case("value"))
        .map(|(_, value)| cell_text(value))
        .collect::<Vec<_>>()
        .join(" / ");
    let raw = object_get_case_insensitive(row, "Value");
    let value = raw.and_then(|v| v.as_f64());
    let text = match raw {
        Some(Value::Number(_)) | None => None,
        Some(other) => Some(cell_text(other)),
    };
    SummaryRow { label, value, text }
}

/// Builds a table from row objects; columns are the union of keys in first-seen order.
pub fn row_table(name: &str, rows: &[Value]) -> Option<RowTable> {
    let objects: Vec<&Map<String, Value>> = rows.iter().filter_map(Value::as_object).collect();
    if objects.is_empty() && !rows.is_empty() {
        return None;
    }
    let mut columns: Vec<String> = Vec::new();
    for object in &objects {
        for key in object.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    let rows = objects
        .iter()
        .map(|object| {
            columns
                .iter()
                .map(|column| object.get(column).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();
    Some(RowTable {
        name: name.to_string(),
        columns,
        rows,
    })
}

/// Display text for a table cell: floats to two decimals, strings verbatim.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
        Value::Number(n) => n
            .as_f64()
            .map(|f| format!("{f:.2}"))
            .unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

pub(crate) fn object_path_value<'a>(object: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = object_get_case_insensitive(object, first)?;
    for segment in segments {
        let nested = current.as_object()?;
        current = object_get_case_insensitive(nested, segment)?;
    }
    Some(current)
}

pub(crate) fn object_get_case_insensitive<'a>(
    object: &'a Map<String, Value>,
    key: &str,
) -> Option<&'a Value> {
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

pub(crate) fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let sanitized = s.trim().replace(',', "").replace('%', "");
            sanitized.parse::<f64>().ok()
        }
        _ => None,
    }
}
