//! Modelos del sistema
//!
//! Este módulo contiene los tipos de dominio del parqueadero: placas,
//! vehículos, usuarios, eventos de portería y disponibilidad.

pub mod availability;
pub mod event;
pub mod plate;
pub mod user;
pub mod vehicle;

pub use availability::{AvailabilitySnapshot, Capacities, ClassAvailability};
pub use event::{EventKind, GateEvent, NewEvent};
pub use plate::Plate;
pub use user::{NewUser, User, UserRole};
pub use vehicle::{Vehicle, VehicleClass};
