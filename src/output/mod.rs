pub mod csv;
pub mod json;
pub mod table;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::backend::Submission;
use crate::products::CalculatorVariant;

pub const NO_DATA: &str = "No data available";

/// Envelope printed for `-o json` and written by `--save`.
#[derive(Debug, Clone, Serialize)]
pub struct CalculationReport {
    pub calculator: CalculatorVariant,
    pub requested_at: DateTime<Utc>,
    pub endpoint: String,
    pub request: Value,
    pub response: Value,
}

impl CalculationReport {
    pub fn new(submission: Submission, endpoint: String, requested_at: DateTime<Utc>) -> Self {
        Self {
            calculator: submission.variant,
            requested_at,
            endpoint,
            request: submission.request,
            response: submission.response,
        }
    }
}
