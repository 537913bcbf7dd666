//! Repositorios
//!
//! Contratos de almacenamiento (log de eventos y registro de usuarios) con
//! implementaciones sobre PostgreSQL y en memoria.

pub mod event_repository;
pub mod memory;
pub mod user_repository;

pub use event_repository::{EventStore, PgEventStore};
pub use memory::{InMemoryEventStore, InMemoryUserStore};
pub use user_repository::{PgUserStore, UserStore};
