//! Rutas HTTP
//!
//! Cada recurso expone su propio router; `create_router` los junta y agrega
//! CORS y trazas de requests.

pub mod availability_routes;
pub mod event_routes;
pub mod user_routes;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::middleware::cors_middleware;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = cors_middleware(&state.config);

    Router::new()
        .merge(user_routes::create_user_router())
        .merge(event_routes::create_event_router())
        .merge(availability_routes::create_availability_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
