use anyhow::Result;
use serde::Serialize;

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    use super::render_json;
    use crate::backend::Submission;
    use crate::output::CalculationReport;
    use crate::products::CalculatorVariant;

    #[test]
    fn report_envelope_is_pretty_and_tagged() {
        let submission = Submission {
            variant: CalculatorVariant::P2h,
            request: json!({"reaction_time_u": 300}),
            response: json!({"aggregated": {}}),
        };
        let requested_at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let report = CalculationReport::new(
            submission,
            "http://localhost:80/p2h".to_string(),
            requested_at,
        );
        let text = render_json(&report).expect("json");
        assert!(text.contains('\n'));
        let parsed: Value = serde_json::from_str(&text).expect("parse");
        assert_eq!(parsed["calculator"], json!("p2h"));
        assert_eq!(parsed["requested_at"], json!("2025-03-01T12:00:00Z"));
        assert_eq!(parsed["request"]["reaction_time_u"], json!(300));
    }
}
