use anyhow::Result;
use serde_json::Value;

use crate::response::{cell_text, CalculationResult};

/// Flattens a response into `section,item,metric,value` records.
pub fn report_to_csv(result: &CalculationResult) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["section", "item", "metric", "value"])?;

    for (section, rows) in [
        ("yearly_summary", result.yearly_summary()),
        ("project_summary", result.project_summary()),
    ] {
        for row in rows.unwrap_or_default() {
            let value = row
                .value
                .map(|v| format!("{v:.4}"))
                .or(row.text)
                .unwrap_or_default();
            writer.write_record([section, row.label.as_str(), "value", value.as_str()])?;
        }
    }

    for point in result.npv_series().unwrap_or_default() {
        writer.write_record([
            "npv",
            point.year.as_str(),
            "dcf",
            format!("{:.4}", point.dcf).as_str(),
        ])?;
        writer.write_record([
            "npv",
            point.year.as_str(),
            "npv",
            format!("{:.4}", point.npv).as_str(),
        ])?;
    }

    for item in result.revenue_cost_by_product().unwrap_or_default() {
        writer.write_record([
            "revenue_cost_by_product",
            item.product.as_str(),
            "value",
            format!("{:.4}", item.value).as_str(),
        ])?;
    }

    if let Some(breakdown) = result.financial_breakdown() {
        for (label, value) in breakdown.lines() {
            writer.write_record([
                "financial_breakdown",
                label,
                "total",
                format!("{value:.4}").as_str(),
            ])?;
        }
    }

    for market in result.markets() {
        for entry in &market.entries {
            for metric in &entry.metrics {
                for reading in &metric.values {
                    let name = if reading.split.is_empty() {
                        metric.header.clone()
                    } else {
                        format!("{} ({})", metric.header, reading.split)
                    };
                    writer.write_record([
                        market.key,
                        entry.key.as_str(),
                        name.as_str(),
                        format!("{:.4}", reading.value).as_str(),
                    ])?;
                }
            }
        }
    }

    for table in result.economic_tables() {
        // first column labels the row; the rest become metrics
        for row in &table.rows {
            let item = row.first().map(String::as_str).unwrap_or_default();
            for (column, value) in table.columns.iter().zip(row).skip(1) {
                writer.write_record([table.name.as_str(), item, column.as_str(), value.as_str()])?;
            }
        }
    }

    for metric in result.economic_metrics() {
        writer.write_record([
            "economic_results",
            metric.key.as_str(),
            "value",
            format!("{:.4}", metric.value).as_str(),
        ])?;
    }

    if let Some(comparison) = result.comparison() {
        for line in comparison.totals.iter().chain(&comparison.chart) {
            writer.write_record([
                "comparison",
                line.label.as_str(),
                "total",
                format!("{:.4}", line.total).as_str(),
            ])?;
        }
    }

    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

/// The request body as `field,value` records; nested objects are flattened with dots.
pub fn request_to_csv(body: &Value) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["field", "value"])?;
    if let Some(object) = body.as_object() {
        for (field, value) in object {
            match value.as_object() {
                Some(nested) => {
                    for (key, inner) in nested {
                        writer.write_record([format!("{field}.{key}"), cell_text(inner)])?;
                    }
                }
                None => writer.write_record([field.clone(), cell_text(value)])?,
            }
        }
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}
