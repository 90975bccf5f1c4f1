use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::backend::{submit, CalculationBackend, HttpBackend, SubmitError, Submission};
use crate::config::Config;
use crate::forms::{form_from_json, CalculatorForm};
use crate::products::CalculatorVariant;

#[derive(Clone)]
struct ApiState {
    config: Config,
    backend: Arc<dyn CalculationBackend>,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn bad_gateway(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: error.to_string(),
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(error: SubmitError) -> Self {
        match error {
            SubmitError::Request(err) => Self::bad_request(err.to_string()),
            SubmitError::Backend(err) => {
                warn!("backend call failed: {err}");
                Self::bad_gateway(err)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct RequestPreview {
    variant: CalculatorVariant,
    request: Value,
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let backend = HttpBackend::new(&config.backend).context("failed building backend client")?;
    let app = router(config, Arc::new(backend));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed binding {bind}"))?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(config: Config, backend: Arc<dyn CalculationBackend>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    Router::new()
        .route("/health", get(health))
        .route("/v1/config", get(show_config))
        .route("/v1/:variant/request", post(build_request))
        .route("/v1/:variant/calculate", post(calculate))
        .layer(cors)
        .with_state(ApiState { config, backend })
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse { status: "ok" })
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config.redacted())
}

async fn build_request(
    Path(variant): Path<String>,
    Json(form): Json<Value>,
) -> ApiResult<RequestPreview> {
    let form = parse_form(&variant, form)?;
    let request = form
        .to_request_body()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    Ok(ok(RequestPreview {
        variant: form.variant(),
        request,
    }))
}

async fn calculate(
    State(state): State<ApiState>,
    Path(variant): Path<String>,
    Json(form): Json<Value>,
) -> ApiResult<Submission> {
    let form = parse_form(&variant, form)?;
    let submission = submit(state.backend.as_ref(), form.as_ref()).await?;
    Ok(ok(submission))
}

fn parse_form(
    variant: &str,
    form: Value,
) -> std::result::Result<Box<dyn CalculatorForm>, ApiError> {
    let variant = variant
        .parse::<CalculatorVariant>()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    form_from_json(variant, form)
        .map_err(|err| ApiError::bad_request(format!("invalid {variant} form: {err}")))
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}
