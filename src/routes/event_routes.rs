use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::controllers::EventController;
use crate::dto::event_dto::{EventRegisteredResponse, EventRequest, ManualEventRequest};
use crate::models::GateEvent;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_event_router() -> Router<AppState> {
    Router::new()
        .route("/evento", post(register_event))
        .route("/evento/manual", post(register_manual_event))
        .route("/vehiculo/:placa", get(plate_history))
}

async fn register_event(
    State(state): State<AppState>,
    Json(request): Json<EventRequest>,
) -> Result<(StatusCode, Json<EventRegisteredResponse>), AppError> {
    let controller = EventController::new(&state);
    let response = controller.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn register_manual_event(
    State(state): State<AppState>,
    Json(request): Json<ManualEventRequest>,
) -> Result<(StatusCode, Json<EventRegisteredResponse>), AppError> {
    let controller = EventController::new(&state);
    let response = controller.register_manual(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn plate_history(
    State(state): State<AppState>,
    Path(placa): Path<String>,
) -> Result<Json<Vec<GateEvent>>, AppError> {
    let controller = EventController::new(&state);
    let response = controller.plate_history(&placa).await?;
    Ok(Json(response))
}
