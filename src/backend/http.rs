use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{CalculationBackend, ClientError};
use crate::config::{BackendConfig, BodyEncoding};
use crate::products::CalculatorVariant;

pub const SECRET_HEADER: &str = "P2X-APIM-Secret";
const USER_AGENT: &str = concat!("p2x-calc/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed client for the remote calculator service.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(ClientError::Transport)?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl CalculationBackend for HttpBackend {
    async fn calculate(
        &self,
        variant: CalculatorVariant,
        body: &Value,
    ) -> Result<Value, ClientError> {
        let url = self.config.endpoint(variant);
        let mut request = self.client.post(&url);
        if self.config.local_mode {
            request = request.header(SECRET_HEADER, &self.config.apim_secret);
        }
        request = match self.config.body_encoding {
            BodyEncoding::Form => {
                let encoded = serde_json::to_string(body).map_err(ClientError::Encode)?;
                request.form(&[("parameters", encoded)])
            }
            BodyEncoding::Json => request.json(body),
        };

        debug!("POST {url}");
        let response = request.send().await.map_err(ClientError::Transport)?;
        let status = response.status();
        let text = response.text().await.map_err(ClientError::Transport)?;
        if !status.is_success() {
            let detail = error_detail(&text);
            let preview: String = text.chars().take(180).collect();
            warn!("POST {url} returned {status}: {preview}");
            return Err(ClientError::Status {
                status: status.as_u16(),
                detail,
            });
        }
        serde_json::from_str(&text).map_err(|source| ClientError::Decode {
            status: status.as_u16(),
            source,
        })
    }
}

/// Pulls `detail` out of an error body; `None` when the body is not JSON or has no detail.
pub fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    use super::{error_detail, HttpBackend, SECRET_HEADER};
    use crate::backend::{CalculationBackend, ClientError};
    use crate::config::{BackendConfig, BodyEncoding};
    use crate::products::CalculatorVariant;

    async fn spawn_stub(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        format!("http://{addr}/")
    }

    fn secret_of(headers: &HeaderMap) -> Option<String> {
        headers
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    async fn echo_form(
        Path(variant): Path<String>,
        headers: HeaderMap,
        Form(fields): Form<HashMap<String, String>>,
    ) -> Json<Value> {
        Json(json!({"variant": variant, "fields": fields, "secret": secret_of(&headers)}))
    }

    async fn echo_json(Path(variant): Path<String>, Json(body): Json<Value>) -> Json<Value> {
        Json(json!({"variant": variant, "body": body}))
    }

    fn backend_config(url: String) -> BackendConfig {
        BackendConfig {
            url,
            apim_secret: "s3cret".to_string(),
            ..BackendConfig::default()
        }
    }

    #[tokio::test]
    async fn form_encoding_sends_single_parameters_field() {
        let url = spawn_stub(Router::new().route("/:variant", post(echo_form))).await;
        let backend = HttpBackend::new(&backend_config(url)).expect("client");
        let body = json!({"Q_max": 1.0, "produktai": {"FCR": "True"}});

        let echoed = backend
            .calculate(CalculatorVariant::Beks, &body)
            .await
            .expect("calculate");
        assert_eq!(echoed["variant"], json!("beks"));
        let fields = echoed["fields"].as_object().expect("fields");
        assert_eq!(fields.len(), 1);
        let parameters = fields["parameters"].as_str().expect("parameters");
        let decoded: Value = serde_json::from_str(parameters).expect("decode");
        assert_eq!(decoded, body);
        assert_eq!(echoed["secret"], Value::Null);
    }

    #[tokio::test]
    async fn local_mode_adds_secret_header() {
        let url = spawn_stub(Router::new().route("/:variant", post(echo_form))).await;
        let config = BackendConfig {
            local_mode: true,
            ..backend_config(url)
        };
        let backend = HttpBackend::new(&config).expect("client");
        let echoed = backend
            .calculate(CalculatorVariant::Dsr, &json!({}))
            .await
            .expect("calculate");
        assert_eq!(echoed["secret"], json!("s3cret"));
        assert_eq!(echoed["variant"], json!("dsr"));
    }

    #[tokio::test]
    async fn json_encoding_posts_raw_object() {
        let url = spawn_stub(Router::new().route("/:variant", post(echo_json))).await;
        let config = BackendConfig {
            body_encoding: BodyEncoding::Json,
            ..backend_config(url)
        };
        let backend = HttpBackend::new(&config).expect("client");
        let body = json!({"reaction_time_u": 300, "reaction_time_d": 0});
        let echoed = backend
            .calculate(CalculatorVariant::P2h, &body)
            .await
            .expect("calculate");
        assert_eq!(echoed["body"], body);
    }

    #[tokio::test]
    async fn error_status_surfaces_detail() {
        async fn reject() -> impl IntoResponse {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"detail": "Q_max must be positive"})),
            )
        }
        let url = spawn_stub(Router::new().route("/p2g", post(reject))).await;
        let backend = HttpBackend::new(&backend_config(url)).expect("client");
        let err = backend
            .calculate(CalculatorVariant::P2g, &json!({}))
            .await
            .expect_err("status");
        match err {
            ClientError::Status { status, detail } => {
                assert_eq!(status, 422);
                assert_eq!(detail.as_deref(), Some("Q_max must be positive"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_body_has_no_detail() {
        async fn crash() -> impl IntoResponse {
            (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
        }
        let url = spawn_stub(Router::new().route("/p2h", post(crash))).await;
        let backend = HttpBackend::new(&backend_config(url)).expect("client");
        let err = backend
            .calculate(CalculatorVariant::P2h, &json!({}))
            .await
            .expect_err("status");
        assert!(matches!(
            err,
            ClientError::Status {
                status: 500,
                detail: None
            }
        ));
    }

    #[tokio::test]
    async fn malformed_success_body_is_decode_error() {
        async fn garbage() -> &'static str {
            "<html>maintenance</html>"
        }
        let url = spawn_stub(Router::new().route("/beks", post(garbage))).await;
        let backend = HttpBackend::new(&backend_config(url)).expect("client");
        let err = backend
            .calculate(CalculatorVariant::Beks, &json!({}))
            .await
            .expect_err("decode");
        assert!(matches!(err, ClientError::Decode { status: 200, .. }));
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let backend =
            HttpBackend::new(&backend_config(format!("http://{addr}/"))).expect("client");
        let err = backend
            .calculate(CalculatorVariant::Dsr, &json!({}))
            .await
            .expect_err("transport");
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[test]
    fn detail_extraction() {
        assert_eq!(error_detail(r#"{"detail": "bad"}"#).as_deref(), Some("bad"));
        assert_eq!(
            error_detail(r#"{"detail": [{"loc": ["body"]}]}"#).as_deref(),
            Some(r#"[{"loc":["body"]}]"#)
        );
        assert_eq!(error_detail(r#"{"message": "bad"}"#), None);
        assert_eq!(error_detail("not json"), None);
    }
}
