//! REST API handlers.
//!
//! Each handler reads/writes through the local cluster so that writes
//! emit the same watch events a cluster API server would.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::info;

use foresight_state::*;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

fn internal_error(e: impl std::fmt::Display) -> axum::response::Response {
    error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
}

// ── Autoscalers ────────────────────────────────────────────────

/// GET /api/v1/autoscalers
pub async fn list_autoscalers(State(state): State<ApiState>) -> impl IntoResponse {
    match state.cluster.state().list_autoscalers() {
        Ok(autoscalers) => ApiResponse::ok(autoscalers).into_response(),
        Err(e) => internal_error(e),
    }
}

/// GET /api/v1/autoscalers/{namespace}/{name}
pub async fn get_autoscaler(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    match state
        .cluster
        .state()
        .get_autoscaler(&ObjectKey::new(namespace, name))
    {
        Ok(Some(autoscaler)) => ApiResponse::ok(autoscaler).into_response(),
        Ok(None) => error_response("autoscaler not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => internal_error(e),
    }
}

/// POST /api/v1/autoscalers
///
/// The status is owned by the controller: replacing an autoscaler keeps
/// the stored status and ignores any status in the body.
pub async fn apply_autoscaler(
    State(state): State<ApiState>,
    Json(mut autoscaler): Json<PredictiveAutoscaler>,
) -> impl IntoResponse {
    let key = autoscaler.key();
    let existing = match state.cluster.state().get_autoscaler(&key) {
        Ok(existing) => existing,
        Err(e) => return internal_error(e),
    };

    let created = existing.is_none();
    autoscaler.status = existing.map(|a| a.status).unwrap_or_default();
    autoscaler.metadata.generation += 1;

    match state.cluster.apply_autoscaler(&autoscaler) {
        Ok(()) => {
            info!(%key, created, "autoscaler applied");
            let status = if created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, ApiResponse::ok(autoscaler)).into_response()
        }
        Err(e) => internal_error(e),
    }
}

/// DELETE /api/v1/autoscalers/{namespace}/{name}
pub async fn delete_autoscaler(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let key = ObjectKey::new(namespace, name);
    match state.cluster.delete_autoscaler(&key) {
        Ok(true) => {
            info!(%key, "autoscaler deleted");
            ApiResponse::ok("deleted").into_response()
        }
        Ok(false) => error_response("autoscaler not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => internal_error(e),
    }
}

/// GET /api/v1/autoscalers/{namespace}/{name}/data
pub async fn get_autoscaler_data(
    State(state): State<ApiState>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let key = ObjectKey::new(namespace, name);
    match state.cluster.state().get_state_document(&key) {
        Ok(Some(doc)) => match doc.load_data() {
            Ok(data) => ApiResponse::ok(data).into_response(),
            Err(e) => internal_error(e),
        },
        Ok(None) => {
            error_response("state document not found", StatusCode::NOT_FOUND).into_response()
        }
        Err(e) => internal_error(e),
    }
}

// ── Scale targets ──────────────────────────────────────────────

/// Scale target registration body.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleRequest {
    pub replicas: i32,
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub api_version: Option<String>,
}

/// PUT /api/v1/scales/{namespace}/{kind}/{name}
pub async fn put_scale(
    State(state): State<ApiState>,
    Path((namespace, kind, name)): Path<(String, String, String)>,
    Json(req): Json<ScaleRequest>,
) -> impl IntoResponse {
    if req.replicas < 0 {
        return error_response("replicas must not be negative", StatusCode::BAD_REQUEST)
            .into_response();
    }

    let scale = Scale {
        namespace,
        target: CrossVersionObjectReference {
            api_version: req.api_version,
            kind,
            name,
        },
        replicas: req.replicas,
        selector: req.selector,
    };
    match state.cluster.state().put_scale(&scale) {
        Ok(()) => ApiResponse::ok(scale).into_response(),
        Err(e) => internal_error(e),
    }
}

/// GET /api/v1/scales/{namespace}/{kind}/{name}
pub async fn get_scale(
    State(state): State<ApiState>,
    Path((namespace, kind, name)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let target = CrossVersionObjectReference {
        api_version: None,
        kind,
        name,
    };
    match state.cluster.state().get_scale(&namespace, &target) {
        Ok(Some(scale)) => ApiResponse::ok(scale).into_response(),
        Ok(None) => error_response("scale target not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => internal_error(e),
    }
}

// ── Metric readings ────────────────────────────────────────────

/// Metric readings body for one selector.
#[derive(Debug, serde::Deserialize)]
pub struct ReadingsRequest {
    pub selector: String,
    pub readings: Vec<MetricReading>,
}

/// PUT /api/v1/readings/{namespace}
pub async fn put_readings(
    State(state): State<ApiState>,
    Path(namespace): Path<String>,
    Json(req): Json<ReadingsRequest>,
) -> impl IntoResponse {
    let readings = MetricReadings {
        namespace,
        selector: req.selector,
        readings: req.readings,
    };
    match state.cluster.state().put_metric_readings(&readings) {
        Ok(()) => ApiResponse::ok(readings).into_response(),
        Err(e) => internal_error(e),
    }
}
