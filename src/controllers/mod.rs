//! Controllers
//!
//! Orquestación por recurso: usuarios, eventos y disponibilidad.

pub mod availability_controller;
pub mod event_controller;
pub mod user_controller;

pub use availability_controller::AvailabilityController;
pub use event_controller::EventController;
pub use user_controller::UserController;
