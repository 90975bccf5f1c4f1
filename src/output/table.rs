use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};
use serde_json::Value;

use crate::eligibility::Eligibility;
use crate::output::NO_DATA;
use crate::products::CalculatorVariant;
use crate::response::{cell_text, CalculationResult, ProductValue, RowTable, SummaryRow};

const YEARLY_UNIT: &str = "tūkst. EUR/year";
const PROJECT_UNIT: &str = "tūkst. EUR";

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn flag_cell(eligible: bool) -> Cell {
    if eligible {
        Cell::new("YES").fg(Color::Green)
    } else {
        Cell::new("NO").fg(Color::Red)
    }
}

fn signed_cell(value: f64) -> Cell {
    let cell = Cell::new(format!("{value:.2}"));
    if value < 0.0 {
        cell.fg(Color::Red)
    } else {
        cell
    }
}

fn no_data(section: &str) -> String {
    format!("{NO_DATA}: {section}")
}

/// The request body as sent, with `produktai` expanded to one row per product.
pub fn render_request_table(variant: CalculatorVariant, body: &Value) -> String {
    let mut table = new_table();
    table.set_header(vec!["Field", "Value"]);
    let Some(object) = body.as_object() else {
        return no_data("request body");
    };
    for (field, value) in object {
        match field.as_str() {
            "produktai" => continue,
            name if name.starts_with("hourly_") => {
                let hours = value.as_object().map(|o| o.len()).unwrap_or(0);
                table.add_row(vec![field.clone(), format!("{hours} hourly values")]);
            }
            _ => {
                table.add_row(vec![field.clone(), cell_text(value)]);
            }
        }
    }

    let mut products = new_table();
    products.set_header(vec!["Product", "Eligible"]);
    match body.get("produktai").map(Eligibility::from_wire) {
        Some(Ok(eligibility)) => {
            for (product, eligible) in eligibility.iter() {
                products.add_row(Row::from(vec![
                    Cell::new(product.wire_name()),
                    flag_cell(eligible),
                ]));
            }
        }
        _ => {
            products.add_row(vec!["-", "-"]);
        }
    }
    format!("{variant} request\n{table}\n{products}")
}

fn summary_table(rows: &[SummaryRow], unit: &str) -> String {
    let mut table = new_table();
    table.set_header(vec!["Parameter", "Value"]);
    for row in rows {
        let value = Cell::new(row.formatted(unit));
        let value = match row.value {
            Some(v) if v < 0.0 => value.fg(Color::Red),
            _ => value,
        };
        table.add_row(Row::from(vec![Cell::new(&row.label), value]));
    }
    table.to_string()
}

fn product_table(chart: &[ProductValue]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Product", "Value"]);
    for item in chart {
        table.add_row(Row::from(vec![
            Cell::new(&item.product),
            signed_cell(item.value),
        ]));
    }
    table.to_string()
}

pub fn render_summary(result: &CalculationResult) -> String {
    let mut out = Vec::new();

    out.push("YEARLY SUMMARY".to_string());
    out.push(match result.yearly_summary() {
        Some(rows) if !rows.is_empty() => summary_table(&rows, YEARLY_UNIT),
        _ => no_data("yearly summary"),
    });

    out.push("PROJECT (LIFETIME) SUMMARY".to_string());
    out.push(match result.project_summary() {
        Some(rows) if !rows.is_empty() => summary_table(&rows, PROJECT_UNIT),
        _ => no_data("project summary"),
    });

    out.push("NET PRESENT VALUE".to_string());
    out.push(match result.npv_series() {
        Some(series) if !series.is_empty() => {
            let mut table = new_table();
            table.set_header(vec![
                "Year",
                "Discounted Cash Flow (tūkst. EUR)",
                "Cumulative NPV (tūkst. EUR)",
                "Break-even",
            ]);
            for point in series {
                table.add_row(Row::from(vec![
                    Cell::new(&point.year),
                    signed_cell(point.dcf),
                    signed_cell(point.npv),
                    if point.break_even {
                        Cell::new("◆").fg(Color::Green)
                    } else {
                        Cell::new("")
                    },
                ]));
            }
            table.to_string()
        }
        _ => no_data("NPV chart data is incomplete or missing key fields"),
    });

    if let Some(chart) = result.revenue_cost_by_product() {
        out.push("REVENUE vs COST BY PRODUCTS".to_string());
        out.push(if chart.is_empty() {
            no_data("revenue/cost by product")
        } else {
            product_table(&chart)
        });
    }

    if let Some(breakdown) = result.financial_breakdown() {
        let mut table = new_table();
        table.set_header(vec!["Item", "Value (tūkst. EUR)"]);
        for (label, value) in breakdown.lines() {
            table.add_row(Row::from(vec![Cell::new(label), signed_cell(value)]));
        }
        table.add_row(Row::from(vec![
            Cell::new("Net"),
            signed_cell(breakdown.net()),
        ]));
        out.push(format!("PROJECT FINANCIAL BREAKDOWN ({} years)", breakdown.years));
        out.push(table.to_string());
    }

    if let Some(chart) = result.product_chart("utilisation_chart_data") {
        out.push("UTILISATION BY PRODUCT".to_string());
        out.push(product_table(&chart));
    }
    out.join("\n")
}

pub fn render_markets(result: &CalculationResult) -> String {
    let markets = result.markets();
    if markets.is_empty() {
        return no_data("markets");
    }
    let mut out = Vec::new();
    for market in markets {
        out.push(market.title.to_uppercase());
        if market.entries.is_empty() {
            out.push(no_data(market.key));
            continue;
        }
        let mut table = new_table();
        table.set_header(vec!["Product", "Metric", "Value"]);
        for entry in &market.entries {
            let name = if entry.description.is_empty() {
                entry.header.clone()
            } else {
                format!("{}\n{}", entry.header, entry.description)
            };
            if entry.metrics.is_empty() {
                table.add_row(vec![name, "-".to_string(), "-".to_string()]);
                continue;
            }
            for (idx, metric) in entry.metrics.iter().enumerate() {
                let product = if idx == 0 { name.clone() } else { String::new() };
                table.add_row(vec![product, metric.header.clone(), metric.formatted()]);
            }
        }
        out.push(table.to_string());
    }
    out.join("\n")
}

fn row_table_to_string(row_table: &RowTable) -> String {
    let mut table = new_table();
    table.set_header(row_table.columns.clone());
    for row in &row_table.rows {
        table.add_row(row.clone());
    }
    table.to_string()
}

pub fn render_economic_results(result: &CalculationResult) -> String {
    let tables = result.economic_tables();
    let metrics = result.economic_metrics();
    if tables.is_empty() && metrics.is_empty() {
        return no_data("economic results");
    }
    let mut out = Vec::new();
    for table in tables {
        out.push(table.name.replace('_', " ").to_uppercase());
        if table.is_empty() {
            out.push(no_data(&table.name));
        } else {
            out.push(row_table_to_string(&table));
        }
    }
    if !metrics.is_empty() {
        let mut table = new_table();
        table.set_header(vec!["Metric", "Value (tūkst. EUR)"]);
        for metric in &metrics {
            table.add_row(Row::from(vec![
                Cell::new(metric.label()),
                signed_cell(metric.value),
            ]));
        }
        out.push("ECONOMIC METRICS".to_string());
        out.push(table.to_string());
    }
    out.join("\n")
}

pub fn render_comparison(result: &CalculationResult) -> String {
    let Some(comparison) = result.comparison().filter(|c| !c.is_empty()) else {
        return no_data("comparison");
    };
    let mut table = new_table();
    table.set_header(vec!["Item", "Total (tūkst. EUR)"]);
    for line in comparison.totals.iter().chain(&comparison.chart) {
        table.add_row(Row::from(vec![
            Cell::new(&line.label),
            signed_cell(line.total),
        ]));
    }
    match comparison.number_of_years {
        Some(years) => format!("COMPARISON ({years} years)\n{table}"),
        None => format!("COMPARISON\n{table}"),
    }
}

/// All sections of a calculation, in dashboard order.
pub fn render_report(result: &CalculationResult) -> String {
    if !result.has_aggregated() {
        return no_data("response has no aggregated results");
    }
    [
        render_summary(result),
        render_markets(result),
        render_economic_results(result),
        render_comparison(result),
    ]
    .join("\n\n")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{render_report, render_request_table};
    use crate::products::CalculatorVariant;
    use crate::response::CalculationResult;

    #[test]
    fn request_table_expands_products() {
        let body = json!({
            "Q_max": 1.0,
            "hourly_power": {"0": 1.0, "1": 2.0},
            "produktai": {"FCR": "False", "aFRRu": "True"}
        });
        let rendered = render_request_table(CalculatorVariant::Beks, &body);
        assert!(rendered.starts_with("BEKS request"));
        assert!(rendered.contains("Q_max"));
        assert!(rendered.contains("2 hourly values"));
        assert!(rendered.contains("aFRRu"));
        assert!(rendered.contains("YES"));
        assert!(rendered.contains("NO"));
    }

    #[test]
    fn report_prints_no_data_for_missing_sections() {
        let result = CalculationResult::new(json!({"aggregated": {"summary": {
            "yearly_summary_table": [{"Parameter": "Revenue", "Value": 12.0}]
        }}}));
        let rendered = render_report(&result);
        assert!(rendered.contains("12.00 tūkst. EUR/year"));
        assert!(rendered.contains("No data available: project summary"));
        assert!(rendered.contains("No data available: markets"));
        assert!(rendered.contains("No data available: economic results"));
        assert!(rendered.contains("No data available: comparison"));
    }

    #[test]
    fn economic_scalars_render_next_to_tables() {
        let result = CalculationResult::new(json!({"aggregated": {"economic_results": {
            "cost_table": [{"Product": "OPEX", "Value (tūkst. EUR)": 3.0}],
            "total_profit": 123.45
        }}}));
        let rendered = render_report(&result);
        assert!(rendered.contains("COST TABLE"));
        assert!(rendered.contains("ECONOMIC METRICS"));
        assert!(rendered.contains("TOTAL PROFIT"));
        assert!(rendered.contains("123.45"));
    }

    #[test]
    fn summary_shows_breakdown_and_savings_row() {
        let result = CalculationResult::new(json!({"aggregated": {"summary": {
            "profit_breakdown_chart_data": {
                "da_savings": 12.0,
                "balancing_revenue": 3.0,
                "capex": 100.0,
                "opex": 7.0
            },
            "revenue_cost_chart_data": {"products": ["mFRRu"], "values": [3.0]}
        }}}));
        let rendered = render_report(&result);
        assert!(rendered.contains("REVENUE vs COST BY PRODUCTS"));
        assert!(rendered.contains("Sutaupymai"));
        assert!(rendered.contains("PROJECT FINANCIAL BREAKDOWN (1 years)"));
        assert!(rendered.contains("DA Sutaupymai"));
        assert!(rendered.contains("-100.00"));
        assert!(rendered.contains("-92.00"));
    }

    #[test]
    fn report_without_aggregated_is_a_single_notice() {
        let result = CalculationResult::new(json!({"unexpected": true}));
        assert_eq!(
            render_report(&result),
            "No data available: response has no aggregated results"
        );
    }
}
