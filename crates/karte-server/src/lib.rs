//! HTTP surface for flowchart generation.
//!
//! A single endpoint accepts `{ "hypotheses": [...] }`, asks the completion
//! service to structure it, and answers with `{ "nodes": [...] }` or
//! `{ "error": "..." }`. Every response carries permissive CORS headers.

pub mod config;
mod error;

pub use error::{ApiError, UNEXPECTED_MESSAGE};

use std::any::Any;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use karte_core::{GeneratorSettings, HypothesisInput};
use karte_generate::CompletionClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

pub const FLOWCHART_PATH: &str = "/api/generate-flowchart";

const BODY_LIMIT: usize = 1024 * 1024;

/// Per-process collaborators. Nothing here is mutated by requests.
#[derive(Clone)]
pub struct AppState {
    settings: Arc<GeneratorSettings>,
    client: Arc<dyn CompletionClient>,
}

impl AppState {
    pub fn new(settings: GeneratorSettings, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            settings: Arc::new(settings),
            client,
        }
    }
}

#[derive(Serialize)]
struct Health {
    ok: bool,
    service: &'static str,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/healthz", get(health))
        .route(FLOWCHART_PATH, any(generate_flowchart))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Health> {
    Json(Health {
        ok: true,
        service: "karte",
    })
}

async fn generate_flowchart(
    State(state): State<AppState>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    if method == Method::OPTIONS {
        return Ok(StatusCode::OK.into_response());
    }
    if method != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }

    // An oversized or unreadable body is bad input like any other.
    let body = body.map_err(|_| ApiError::InvalidInput)?;
    let hypotheses = parse_hypotheses(&body)?;
    let data =
        karte_generate::generate_flowchart(state.client.as_ref(), &state.settings, &hypotheses)
            .await?;

    Ok((StatusCode::OK, Json(data)).into_response())
}

/// Read the non-empty `hypotheses` array from a request body.
fn parse_hypotheses(body: &[u8]) -> Result<Vec<HypothesisInput>, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ApiError::InvalidInput)?;

    let items = value
        .get("hypotheses")
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .ok_or(ApiError::InvalidInput)?;

    items
        .iter()
        .map(HypothesisInput::deserialize)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ApiError::InvalidInput)
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        UNEXPECTED_MESSAGE.to_string()
    };
    error!("flowchart handler panicked: {}", detail);
    ApiError::Unhandled(detail).into_response()
}
