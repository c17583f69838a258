//! HTTP status and control surface
//!
//! | Route                        | Action                                   |
//! |------------------------------|------------------------------------------|
//! | `GET /status`                | service snapshot as JSON                 |
//! | `POST /start-service`        | start scheduling                         |
//! | `POST /stop-service`         | stop scheduling                          |
//! | `POST /update?force=`        | immediate update, replaces the schedule  |
//! | `POST /update-async?force=`  | out-of-band update, schedule untouched   |

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ipkeeper_core::{ServiceSnapshot, ServiceStatus, UpdateService};
use serde::Deserialize;
use tracing::info;

/// Query string of the update routes
#[derive(Debug, Default, Deserialize)]
pub struct UpdateParams {
    force: Option<String>,
}

impl UpdateParams {
    /// A bare `?force` counts as true; only explicit negatives disable it
    pub fn force(&self) -> bool {
        match self.force.as_deref().map(str::trim) {
            None => false,
            Some(value) => !matches!(
                value.to_ascii_lowercase().as_str(),
                "false" | "0" | "no" | "off"
            ),
        }
    }
}

/// Build the control router over `service`
pub fn router(service: UpdateService) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/start-service", post(start_service))
        .route("/stop-service", post(stop_service))
        .route("/update", post(update))
        .route("/update-async", post(update_async))
        .with_state(service)
}

async fn status(State(service): State<UpdateService>) -> Json<ServiceSnapshot> {
    Json(service.service_data())
}

async fn start_service(State(service): State<UpdateService>) -> &'static str {
    if service.start() {
        info!("Service started through the control API");
        "Service started."
    } else {
        "Service already running."
    }
}

async fn stop_service(State(service): State<UpdateService>) -> &'static str {
    if service.stop() {
        info!("Service stopped through the control API");
        "Service stopped."
    } else {
        "Service already stopped."
    }
}

async fn update(
    State(service): State<UpdateService>,
    Query(params): Query<UpdateParams>,
) -> Response {
    match service.update_sync(params.force()).await {
        Some(result) => Json(result).into_response(),
        None if service.status() != ServiceStatus::Running => {
            (StatusCode::CONFLICT, "Service not running.").into_response()
        }
        None => (StatusCode::ACCEPTED, "Update superseded.").into_response(),
    }
}

async fn update_async(
    State(service): State<UpdateService>,
    Query(params): Query<UpdateParams>,
) -> Response {
    Json(service.update_async(params.force()).await).into_response()
}
