//! HTTP surface: routes, payload extraction and error mapping.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ServiceConfig;
use crate::models::ModelKind;
use crate::pipeline::{PipelineError, Recommendation, Recommender, RequestError, RequestFields};

pub const WELCOME: &str = "Welcome to the Bharat Agro API. Use the endpoints to get predictions.";

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    recommender: Arc<Recommender>,
}

/// Error response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// A pipeline failure on its way to becoming an HTTP response
#[derive(Debug)]
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError(err)
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        ApiError(PipelineError::Rejected(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            PipelineError::Rejected(err) => {
                let body = ErrorBody {
                    error: err.to_string(),
                    field: Some(err.field().to_string()),
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            PipelineError::Fault(fault) => {
                error!("Request failed: {}", fault);
                let body = ErrorBody {
                    error: "Internal server error".to_string(),
                    field: None,
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

/// Request fields from either a JSON object or a url-encoded form body.
#[derive(Debug)]
pub struct Payload(pub RequestFields);

#[async_trait]
impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);

        if is_form {
            let Form(pairs) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| RequestError::invalid("body", e.body_text()))?;
            return Ok(Payload(RequestFields::from_pairs(pairs)));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| RequestError::invalid("body", e.body_text()))?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| RequestError::invalid("body", format!("malformed JSON: {}", e)))?;
        Ok(Payload(RequestFields::from_json(value)?))
    }
}

async fn index() -> &'static str {
    WELCOME
}

async fn predict_crop(
    State(state): State<AppState>,
    Payload(fields): Payload,
) -> Result<Json<Recommendation>, ApiError> {
    Ok(Json(state.recommender.recommend(ModelKind::Crop, &fields)?))
}

async fn predict_fertilizer(
    State(state): State<AppState>,
    Payload(fields): Payload,
) -> Result<Json<Recommendation>, ApiError> {
    Ok(Json(state.recommender.recommend(ModelKind::Fertilizer, &fields)?))
}

async fn crop_location(
    State(state): State<AppState>,
    Payload(fields): Payload,
) -> Result<Json<Recommendation>, ApiError> {
    Ok(Json(state.recommender.recommend(ModelKind::Region, &fields)?))
}

/// Builds the application router around a loaded recommender.
pub fn router(recommender: Arc<Recommender>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predictcrop", post(predict_crop))
        .route("/predictfertilizer", post(predict_fertilizer))
        .route("/api/cropLocation", post(crop_location))
        .with_state(AppState { recommender })
}

/// Serves the API until the process receives Ctrl-C.
pub async fn serve(config: &ServiceConfig, recommender: Arc<Recommender>) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(recommender))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
