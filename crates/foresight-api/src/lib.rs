//! foresight-api — REST API for Foresight.
//!
//! Provides axum route handlers for managing predictive autoscalers and
//! for feeding the local cluster the scale targets and metric readings
//! the controller reconciles against.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/autoscalers` | List all autoscalers |
//! | POST | `/api/v1/autoscalers` | Create or replace an autoscaler |
//! | GET | `/api/v1/autoscalers/{namespace}/{name}` | Get an autoscaler with its status |
//! | DELETE | `/api/v1/autoscalers/{namespace}/{name}` | Delete an autoscaler and its state |
//! | GET | `/api/v1/autoscalers/{namespace}/{name}/data` | Get the model histories |
//! | PUT | `/api/v1/scales/{namespace}/{kind}/{name}` | Register or update a scale target |
//! | GET | `/api/v1/scales/{namespace}/{kind}/{name}` | Get a scale target |
//! | PUT | `/api/v1/readings/{namespace}` | Push metric readings for a selector |

pub mod handlers;

use axum::Router;
use axum::routing::{get, put};
use foresight_autoscale::LocalCluster;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub cluster: LocalCluster,
}

/// Build the API router.
pub fn build_router(cluster: LocalCluster) -> Router {
    let api_state = ApiState { cluster };

    let api_routes = Router::new()
        .route(
            "/autoscalers",
            get(handlers::list_autoscalers).post(handlers::apply_autoscaler),
        )
        .route(
            "/autoscalers/{namespace}/{name}",
            get(handlers::get_autoscaler).delete(handlers::delete_autoscaler),
        )
        .route("/autoscalers/{namespace}/{name}/data", get(handlers::get_autoscaler_data))
        .route(
            "/scales/{namespace}/{kind}/{name}",
            get(handlers::get_scale).put(handlers::put_scale),
        )
        .route("/readings/{namespace}", put(handlers::put_readings))
        .with_state(api_state);

    Router::new().nest("/api/v1", api_routes)
}
