use tracing::info;
use validator::Validate;

use crate::dto::event_dto::{EventRegisteredResponse, EventRequest, ManualEventRequest};
use crate::models::{GateEvent, Plate};
use crate::services::{AuthService, EventService};
use crate::state::AppState;
use crate::utils::errors::{empty_plate_error, AppError};

pub struct EventController {
    auth: AuthService,
    events: EventService,
}

impl EventController {
    pub fn new(state: &AppState) -> Self {
        Self {
            auth: state.auth.clone(),
            events: state.events.clone(),
        }
    }

    /// Evento reportado por la portería
    pub async fn register(&self, request: EventRequest) -> Result<EventRegisteredResponse, AppError> {
        request.validate()?;

        let stored = self.events.register(request.into_new_event()).await?;
        Ok(EventRegisteredResponse::new(stored))
    }

    /// Evento manual, solo para administradores
    pub async fn register_manual(
        &self,
        request: ManualEventRequest,
    ) -> Result<EventRegisteredResponse, AppError> {
        request.validate()?;

        let admin = self
            .auth
            .authorize_admin(&request.admin_telefono, &request.admin_password)
            .await?;
        info!("👮 Evento manual de {} para {}", admin.phone, request.evento.placa);

        let stored = self.events.register(request.evento.into_new_event()).await?;
        Ok(EventRegisteredResponse::new(stored))
    }

    pub async fn plate_history(&self, plate: &str) -> Result<Vec<GateEvent>, AppError> {
        let plate = Plate::normalize(plate);
        if plate.is_empty() {
            return Err(empty_plate_error());
        }
        self.events.history_by_plate(&plate).await
    }
}
