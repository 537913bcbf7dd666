//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::{EventStore, UserStore};
use crate::services::{
    AuthService, AvailabilityBroadcaster, EventService, NotificationDispatcher, NotificationWorker,
    OccupancyEngine, SmsSender,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EnvironmentConfig>,
    pub users: Arc<dyn UserStore>,
    pub auth: AuthService,
    pub occupancy: Arc<OccupancyEngine>,
    pub broadcaster: Arc<AvailabilityBroadcaster>,
    pub events: EventService,
}

impl AppState {
    /// Arma el estado y arranca el worker de notificaciones.
    ///
    /// El worker termina cuando se suelta el último clon del estado.
    pub fn new(
        config: EnvironmentConfig,
        users: Arc<dyn UserStore>,
        events: Arc<dyn EventStore>,
        sms: Arc<dyn SmsSender>,
    ) -> (Self, NotificationWorker) {
        let occupancy = Arc::new(OccupancyEngine::new(events.clone(), config.capacities.clone()));
        let broadcaster = Arc::new(AvailabilityBroadcaster::new(config.sse_buffer));
        let (notifier, worker) =
            NotificationDispatcher::start(users.clone(), sms, &config.notifications);

        let state = Self {
            auth: AuthService::new(users.clone(), config.bcrypt_cost),
            events: EventService::new(events, occupancy.clone(), broadcaster.clone(), notifier),
            config: Arc::new(config),
            users,
            occupancy,
            broadcaster,
        };
        (state, worker)
    }
}
