//! Project-lifetime finance views: the stacked savings/revenue/cost breakdown
//! and the revenue-versus-cost chart by product.

use serde::Serialize;
use serde_json::Value;

use crate::response::{to_f64, CalculationResult, ProductValue};

const SAVINGS: &str = "Sutaupymai";
const DA_SAVINGS: &str = "DA Sutaupymai";
const BALANCING_REVENUE: &str = "Pajamos iš balansavimo";

const BALANCING_PRODUCTS: [&str; 3] = ["FCR", "aFRR", "mFRR"];

// `total_finance` keys, costs first.
const FINANCE_COSTS: [&str; 1] = ["perkama ID"];
const FINANCE_REVENUES: [&str; 10] = [
    "FCR CAP",
    "aFRRu CAP",
    "aFRRd CAP",
    "mFRRu CAP",
    "mFRRd CAP",
    "parduodama ID",
    "aFRRu",
    "aFRRd",
    "mFRRu",
    "mFRRd",
];

const NEAR_ZERO: f64 = 0.001;

/// Lifetime totals in tūkst. EUR. Costs are positive amounts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialBreakdown {
    pub savings_label: &'static str,
    pub savings: f64,
    pub balancing_revenue: f64,
    pub capex: f64,
    pub opex: f64,
    pub years: u64,
}

impl FinancialBreakdown {
    /// Signed lines in display order: gains above zero, costs below.
    pub fn lines(&self) -> [(&'static str, f64); 4] {
        [
            (self.savings_label, self.savings),
            (BALANCING_REVENUE, self.balancing_revenue),
            ("CAPEX", -self.capex),
            ("OPEX", -self.opex),
        ]
    }

    pub fn net(&self) -> f64 {
        self.savings + self.balancing_revenue - self.capex - self.opex
    }
}

impl CalculationResult {
    /// `summary.profit_breakdown_chart_data` when the backend sends it, otherwise
    /// derived from `yearly`, `comparison.skirtumas` and gross revenue by product.
    pub fn financial_breakdown(&self) -> Option<FinancialBreakdown> {
        self.reported_breakdown().or_else(|| self.derived_breakdown())
    }

    /// Product chart from `summary.revenue_cost_chart_data` plus day-ahead savings,
    /// or lifetime `total_finance` values when only those are present.
    pub fn revenue_cost_by_product(&self) -> Option<Vec<ProductValue>> {
        let Some(mut chart) = self.product_chart("revenue_cost_chart_data") else {
            return self.total_finance_chart();
        };
        let da_savings = self.profit_breakdown_value("da_savings");
        if da_savings.abs() > 0.01 {
            chart.push(ProductValue {
                product: SAVINGS.to_string(),
                value: da_savings,
            });
        }
        Some(chart)
    }

    fn profit_breakdown_value(&self, key: &str) -> f64 {
        self.section("summary.profit_breakdown_chart_data")
            .and_then(|data| data.get(key))
            .and_then(to_f64)
            .unwrap_or(0.0)
    }

    fn reported_breakdown(&self) -> Option<FinancialBreakdown> {
        let data = self.section("summary.profit_breakdown_chart_data")?;
        if data.is_empty() {
            return None;
        }
        let years = self
            .aggregated("summary.npv_chart_data.years")
            .and_then(Value::as_array)
            .map(|years| lifetime_years(years.len()))
            .unwrap_or(1);
        let value = |key: &str| data.get(key).and_then(to_f64).unwrap_or(0.0);
        Some(FinancialBreakdown {
            savings_label: DA_SAVINGS,
            savings: value("da_savings") * years as f64,
            balancing_revenue: value("balancing_revenue") * years as f64,
            capex: value("capex"),
            opex: value("opex"),
            years,
        })
    }

    fn derived_breakdown(&self) -> Option<FinancialBreakdown> {
        let yearly = self.aggregated("yearly")?.as_array()?;
        let savings = self.lifetime_savings()?;
        let years = lifetime_years(yearly.len());
        let column = |idx: usize, name: &str| {
            yearly
                .get(idx)
                .and_then(|row| row.get(name))
                .and_then(to_f64)
                .unwrap_or(0.0)
        };
        Some(FinancialBreakdown {
            savings_label: SAVINGS,
            savings,
            balancing_revenue: self.yearly_balancing_revenue() * years as f64,
            capex: column(0, "CAPEX (tūkst. EUR)"),
            opex: column(1, "OPEX (tūkst. EUR)") * years as f64,
            years,
        })
    }

    fn lifetime_savings(&self) -> Option<f64> {
        self.aggregated("comparison.skirtumas.total").and_then(to_f64)
    }

    // Gross revenue rows whose product is a balancing-market product.
    fn yearly_balancing_revenue(&self) -> f64 {
        self.aggregated("economic_results.gross_revenue_by_product")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        let product = row.get("Product").and_then(Value::as_str).unwrap_or("");
                        BALANCING_PRODUCTS.iter().any(|p| product.contains(*p))
                    })
                    .filter_map(|row| row.get("Value (tūkst. EUR)").and_then(to_f64))
                    .sum()
            })
            .unwrap_or(0.0)
    }

    fn total_finance_chart(&self) -> Option<Vec<ProductValue>> {
        let finance = self.section("total_finance")?;
        let yearly = self.aggregated("yearly")?.as_array()?;
        self.section("comparison")?;
        let years = lifetime_years(yearly.len()) as f64;

        let mut chart: Vec<ProductValue> = FINANCE_COSTS
            .iter()
            .chain(FINANCE_REVENUES.iter())
            .filter_map(|product| {
                let value = finance.get(*product).and_then(to_f64).unwrap_or(0.0) * years;
                (value.abs() > NEAR_ZERO).then(|| ProductValue {
                    product: product.to_string(),
                    value,
                })
            })
            .collect();
        if let Some(savings) = self.lifetime_savings().map(|total| -total) {
            if savings.abs() > NEAR_ZERO {
                chart.push(ProductValue {
                    product: SAVINGS.to_string(),
                    value: savings,
                });
            }
        }
        Some(chart)
    }
}

// Year 0 is the investment year.
fn lifetime_years(len: usize) -> u64 {
    if len > 1 {
        (len - 1) as u64
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::response::CalculationResult;

    fn heat_pump() -> CalculationResult {
        CalculationResult::new(json!({"aggregated": {
            "yearly": [
                {"YEAR": 0, "CAPEX (tūkst. EUR)": 400.0},
                {"YEAR": 1, "OPEX (tūkst. EUR)": 5.0},
                {"YEAR": 2, "OPEX (tūkst. EUR)": 5.0},
                {"YEAR": 3, "OPEX (tūkst. EUR)": 5.0}
            ],
            "comparison": {"skirtumas": {"total": 90.0}},
            "economic_results": {"gross_revenue_by_product": [
                {"Product": "FCR CAP", "Value (tūkst. EUR)": 10.0},
                {"Product": "aFRRu", "Value (tūkst. EUR)": 2.5},
                {"Product": "perkama DA", "Value (tūkst. EUR)": 99.0}
            ]},
            "total_finance": {"perkama ID": -4.0, "aFRRu CAP": 6.0, "mFRRd": 0.0001}
        }}))
    }

    #[test]
    fn breakdown_is_derived_from_yearly_and_comparison() {
        let breakdown = heat_pump().financial_breakdown().expect("breakdown");
        assert_eq!(breakdown.years, 3);
        assert_eq!(breakdown.savings_label, "Sutaupymai");
        assert_eq!(breakdown.savings, 90.0);
        assert_eq!(breakdown.balancing_revenue, 37.5);
        assert_eq!(breakdown.capex, 400.0);
        assert_eq!(breakdown.opex, 15.0);
        assert_eq!(breakdown.lines()[2], ("CAPEX", -400.0));
        assert_eq!(breakdown.net(), 90.0 + 37.5 - 400.0 - 15.0);
    }

    #[test]
    fn total_finance_chart_scales_to_lifetime_and_adds_savings() {
        let chart = heat_pump().revenue_cost_by_product().expect("chart");
        let rows: Vec<(&str, f64)> = chart
            .iter()
            .map(|item| (item.product.as_str(), item.value))
            .collect();
        assert_eq!(
            rows,
            vec![("perkama ID", -12.0), ("aFRRu CAP", 18.0), ("Sutaupymai", -90.0)]
        );
    }

    #[test]
    fn reported_breakdown_scales_annual_values() {
        let result = CalculationResult::new(json!({"aggregated": {"summary": {
            "npv_chart_data": {"years": [0, 1, 2, 3, 4], "dcfs": [], "npv": []},
            "profit_breakdown_chart_data": {
                "categories": ["Project"],
                "da_savings": 20.0,
                "balancing_revenue": 5.0,
                "capex": 150.0,
                "opex": 40.0
            },
            "revenue_cost_chart_data": {"products": ["aFRRu"], "values": [5.0]}
        }}}));
        let breakdown = result.financial_breakdown().expect("breakdown");
        assert_eq!(breakdown.savings_label, "DA Sutaupymai");
        assert_eq!(breakdown.savings, 80.0);
        assert_eq!(breakdown.balancing_revenue, 20.0);
        assert_eq!(breakdown.capex, 150.0);
        assert_eq!(breakdown.opex, 40.0);

        let chart = result.revenue_cost_by_product().expect("chart");
        assert_eq!(chart.len(), 2);
        assert_eq!(chart[1].product, "Sutaupymai");
        assert_eq!(chart[1].value, 20.0);
    }

    #[test]
    fn breakdown_needs_savings_or_reported_data() {
        let result = CalculationResult::new(json!({"aggregated": {
            "yearly": [{"CAPEX (tūkst. EUR)": 1.0}]
        }}));
        assert!(result.financial_breakdown().is_none());
        assert!(result.revenue_cost_by_product().is_none());
    }
}
