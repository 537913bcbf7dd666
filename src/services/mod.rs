//! Services module
//!
//! Este módulo contiene la lógica de negocio: el motor de ocupación, el
//! registro de eventos, la política de autenticación, las notificaciones
//! y la difusión en vivo de la disponibilidad.

pub mod auth_service;
pub mod availability_broadcaster;
pub mod event_service;
pub mod notification_service;
pub mod occupancy_service;
pub mod pico_y_placa;

pub use auth_service::AuthService;
pub use availability_broadcaster::{AvailabilityBroadcaster, Subscription};
pub use event_service::EventService;
pub use notification_service::{
    NotificationDispatcher, NotificationWorker, SimulatedSmsSender, SmsSender, TwilioSmsSender,
};
pub use occupancy_service::{ActiveStatus, OccupancyEngine};
