use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::controllers::UserController;
use crate::dto::user_dto::{AddVehicleRequest, LoginRequest, LoginResponse, RegisterUserRequest, StatusResponse};
use crate::models::{GateEvent, Vehicle};
use crate::services::ActiveStatus;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_user_router() -> Router<AppState> {
    Router::new()
        .route("/usuario", post(register_user))
        .route("/login", post(login))
        .route("/vehiculo", post(add_vehicle))
        .route("/vehiculos/:telefono", get(list_vehicles))
        .route("/usuario/:telefono/vehiculos-activos", get(active_vehicles))
        .route("/usuario/:telefono/historial-eventos", get(event_history))
        .route("/usuario/:telefono/vehiculo/:placa/historial", get(vehicle_history))
}

async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<StatusResponse>), AppError> {
    let controller = UserController::new(&state);
    let response = controller.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let controller = UserController::new(&state);
    let response = controller.login(request).await?;
    Ok(Json(response))
}

async fn add_vehicle(
    State(state): State<AppState>,
    Json(request): Json<AddVehicleRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let controller = UserController::new(&state);
    let response = controller.add_vehicle(request).await?;
    Ok(Json(response))
}

async fn list_vehicles(
    State(state): State<AppState>,
    Path(telefono): Path<String>,
) -> Result<Json<Vec<Vehicle>>, AppError> {
    let controller = UserController::new(&state);
    let response = controller.list_vehicles(&telefono).await?;
    Ok(Json(response))
}

async fn active_vehicles(
    State(state): State<AppState>,
    Path(telefono): Path<String>,
) -> Result<Json<Vec<ActiveStatus>>, AppError> {
    let controller = UserController::new(&state);
    let response = controller.active_vehicles(&telefono).await?;
    Ok(Json(response))
}

async fn event_history(
    State(state): State<AppState>,
    Path(telefono): Path<String>,
) -> Result<Json<Vec<GateEvent>>, AppError> {
    let controller = UserController::new(&state);
    let response = controller.event_history(&telefono).await?;
    Ok(Json(response))
}

async fn vehicle_history(
    State(state): State<AppState>,
    Path((telefono, placa)): Path<(String, String)>,
) -> Result<Json<Vec<GateEvent>>, AppError> {
    let controller = UserController::new(&state);
    let response = controller.vehicle_history(&telefono, &placa).await?;
    Ok(Json(response))
}
