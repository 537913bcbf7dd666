use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::dto::user_dto::{AddVehicleRequest, LoginRequest, LoginResponse, RegisterUserRequest, StatusResponse};
use crate::models::{GateEvent, Plate, Vehicle};
use crate::repositories::UserStore;
use crate::services::{ActiveStatus, AuthService, EventService, OccupancyEngine};
use crate::state::AppState;
use crate::utils::errors::{empty_plate_error, AppError};

pub struct UserController {
    users: Arc<dyn UserStore>,
    auth: AuthService,
    occupancy: Arc<OccupancyEngine>,
    events: EventService,
}

impl UserController {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: state.users.clone(),
            auth: state.auth.clone(),
            occupancy: state.occupancy.clone(),
            events: state.events.clone(),
        }
    }

    pub async fn register(&self, request: RegisterUserRequest) -> Result<StatusResponse, AppError> {
        request.validate()?;

        let user = self
            .auth
            .register(&request.nombre, &request.telefono, &request.password)
            .await?;

        info!("👤 Usuario registrado: {} ({})", user.name, user.phone);
        Ok(StatusResponse::new("usuario creado"))
    }

    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AppError> {
        request.validate()?;

        let user = self.auth.login(&request.nombre, &request.password).await?;
        info!("🔐 Login exitoso: {}", user.phone);
        Ok(LoginResponse::from(user))
    }

    pub async fn add_vehicle(&self, request: AddVehicleRequest) -> Result<StatusResponse, AppError> {
        request.validate()?;

        let added = self.users.add_vehicle(&request.telefono, request.vehiculo.clone()).await?;
        if added {
            info!(
                "🚙 Vehículo {} ({}) agregado a {}",
                request.vehiculo.plate, request.vehiculo.vehicle_class, request.telefono
            );
            Ok(StatusResponse::new("vehículo agregado"))
        } else {
            Ok(StatusResponse::new("vehículo ya registrado"))
        }
    }

    pub async fn list_vehicles(&self, phone: &str) -> Result<Vec<Vehicle>, AppError> {
        let user = self.auth.require_user(phone).await?;
        Ok(user.vehicles)
    }

    /// Vehículos del usuario que están dentro ahora mismo
    pub async fn active_vehicles(&self, phone: &str) -> Result<Vec<ActiveStatus>, AppError> {
        let user = self.auth.require_user(phone).await?;

        let mut active = Vec::new();
        for plate in user.plates() {
            if let Some(status) = self.occupancy.active_status(&plate).await? {
                active.push(status);
            }
        }
        Ok(active)
    }

    /// Historial combinado de todas las placas del usuario
    pub async fn event_history(&self, phone: &str) -> Result<Vec<GateEvent>, AppError> {
        let user = self.auth.require_user(phone).await?;
        let plates = user.plates();
        if plates.is_empty() {
            return Ok(Vec::new());
        }
        self.events.history_by_plates(&plates).await
    }

    pub async fn vehicle_history(&self, phone: &str, plate: &str) -> Result<Vec<GateEvent>, AppError> {
        let user = self.auth.require_user(phone).await?;
        let plate = Plate::normalize(plate);
        if plate.is_empty() {
            return Err(empty_plate_error());
        }
        self.auth.ensure_owns_plate(&user, &plate)?;
        self.events.history_by_plate(&plate).await
    }
}
