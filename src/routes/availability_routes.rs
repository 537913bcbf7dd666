use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};

use crate::controllers::AvailabilityController;
use crate::dto::event_dto::{HealthResponse, PicoYPlacaQuery};
use crate::models::AvailabilitySnapshot;
use crate::services::pico_y_placa::PicoYPlaca;
use crate::state::AppState;

pub fn create_availability_router() -> Router<AppState> {
    Router::new()
        .route("/disponibilidad", get(current_availability))
        .route("/sse/disponibilidad", get(availability_stream))
        .route("/pico-y-placa", get(pico_y_placa))
        .route("/health", get(health))
}

async fn current_availability(State(state): State<AppState>) -> Json<AvailabilitySnapshot> {
    let controller = AvailabilityController::new(&state);
    Json(controller.current().await)
}

/// Foto actual al conectar y luego una por cada evento registrado
async fn availability_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let controller = AvailabilityController::new(&state);
    let (initial, subscription) = controller.live().await;

    let first = stream::once(async move { snapshot_event(&initial) });
    let updates = stream::unfold(subscription, |mut subscription| async move {
        subscription
            .next()
            .await
            .map(|snapshot| (snapshot_event(&snapshot), subscription))
    });

    Sse::new(first.chain(updates)).keep_alive(KeepAlive::default())
}

fn snapshot_event(snapshot: &AvailabilitySnapshot) -> Result<Event, axum::Error> {
    Event::default().event("disponibilidad").json_data(snapshot)
}

async fn pico_y_placa(
    State(state): State<AppState>,
    Query(query): Query<PicoYPlacaQuery>,
) -> Json<PicoYPlaca> {
    let controller = AvailabilityController::new(&state);
    Json(controller.pico_y_placa(query.placa.as_ref()))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let controller = AvailabilityController::new(&state);
    Json(controller.health().await)
}
