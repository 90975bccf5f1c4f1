pub mod http;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::eligibility::RequestError;
use crate::forms::CalculatorForm;
use crate::products::CalculatorVariant;

pub use http::HttpBackend;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("error making request: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("{}", status_message(*status, detail.as_deref()))]
    Status { status: u16, detail: Option<String> },
    #[error("backend returned {status} with a body that is not valid JSON")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed encoding request body: {0}")]
    Encode(#[source] serde_json::Error),
}

fn status_message(status: u16, detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!("backend error ({status}): {detail}"),
        None => format!("backend error: status code {status}"),
    }
}

/// The remote calculator. One call per submission, no retries.
#[async_trait]
pub trait CalculationBackend: Send + Sync {
    async fn calculate(
        &self,
        variant: CalculatorVariant,
        body: &Value,
    ) -> Result<Value, ClientError>;
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid form: {0}")]
    Request(#[from] RequestError),
    #[error(transparent)]
    Backend(#[from] ClientError),
}

/// Built request body together with the backend's answer.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub variant: CalculatorVariant,
    pub request: Value,
    pub response: Value,
}

pub async fn submit(
    backend: &dyn CalculationBackend,
    form: &dyn CalculatorForm,
) -> Result<Submission, SubmitError> {
    let variant = form.variant();
    let request = form.to_request_body()?;
    info!("submitting {variant} calculation");
    let response = backend.calculate(variant, &request).await?;
    Ok(Submission {
        variant,
        request,
        response,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::{submit, CalculationBackend, ClientError, SubmitError};
    use crate::forms::{DsrForm, P2gForm};
    use crate::products::{CalculatorVariant, RegulationDirection};

    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<(CalculatorVariant, Value)>>,
    }

    #[async_trait]
    impl CalculationBackend for RecordingBackend {
        async fn calculate(
            &self,
            variant: CalculatorVariant,
            body: &Value,
        ) -> Result<Value, ClientError> {
            self.calls
                .lock()
                .expect("lock")
                .push((variant, body.clone()));
            Ok(json!({"aggregated": {"summary": {}}}))
        }
    }

    #[test]
    fn submit_sends_built_body_once() {
        let backend = RecordingBackend::default();
        let form = P2gForm {
            regulation_direction: RegulationDirection::Up,
            ..P2gForm::default()
        };
        let submission = tokio_test::block_on(submit(&backend, &form)).expect("submit");
        assert_eq!(submission.variant, CalculatorVariant::P2g);
        assert_eq!(submission.request["reaction_time_d"], json!(0));

        let calls = backend.calls.lock().expect("lock");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, CalculatorVariant::P2g);
        assert_eq!(calls[0].1, submission.request);
    }

    #[test]
    fn invalid_form_never_reaches_backend() {
        let backend = RecordingBackend::default();
        let form = DsrForm {
            hourly_power: Some(vec![1.0; 3]),
            ..DsrForm::default()
        };
        let err = tokio_test::block_on(submit(&backend, &form)).expect_err("invalid");
        assert!(matches!(err, SubmitError::Request(_)));
        assert!(backend.calls.lock().expect("lock").is_empty());
    }

    #[test]
    fn status_error_prefers_detail() {
        let with_detail = ClientError::Status {
            status: 422,
            detail: Some("Q_max must be positive".to_string()),
        };
        assert_eq!(
            with_detail.to_string(),
            "backend error (422): Q_max must be positive"
        );
        let bare = ClientError::Status {
            status: 503,
            detail: None,
        };
        assert_eq!(bare.to_string(), "backend error: status code 503");
    }
}
