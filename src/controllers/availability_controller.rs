use std::sync::Arc;

use crate::config::EnvironmentConfig;
use crate::dto::event_dto::HealthResponse;
use crate::models::{AvailabilitySnapshot, Plate};
use crate::services::pico_y_placa::{self, PicoYPlaca};
use crate::services::{AvailabilityBroadcaster, OccupancyEngine, Subscription};
use crate::state::AppState;

pub struct AvailabilityController {
    config: Arc<EnvironmentConfig>,
    occupancy: Arc<OccupancyEngine>,
    broadcaster: Arc<AvailabilityBroadcaster>,
}

impl AvailabilityController {
    pub fn new(state: &AppState) -> Self {
        Self {
            config: state.config.clone(),
            occupancy: state.occupancy.clone(),
            broadcaster: state.broadcaster.clone(),
        }
    }

    pub async fn current(&self) -> AvailabilitySnapshot {
        self.occupancy.availability().await
    }

    /// Foto actual más la suscripción a las siguientes
    pub async fn live(&self) -> (AvailabilitySnapshot, Subscription) {
        // Suscribir primero para no perder un evento entre la foto y la suscripción
        let subscription = self.broadcaster.subscribe();
        (self.occupancy.availability().await, subscription)
    }

    pub fn pico_y_placa(&self, plate: Option<&Plate>) -> PicoYPlaca {
        pico_y_placa::today(plate)
    }

    pub async fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok".to_string(),
            almacenamiento: self.config.storage.as_str().to_string(),
            suscriptores_en_vivo: self.broadcaster.subscriber_count(),
            disponibilidad: self.occupancy.availability().await,
        }
    }
}
