//! Almacenamiento en memoria
//!
//! Misma semántica que los repositorios de PostgreSQL detrás de los mismos
//! traits. Se usa con `STORAGE=memory` y en las pruebas.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::event::sort_descending;
use crate::models::{GateEvent, NewEvent, NewUser, Plate, User, Vehicle, VehicleClass};
use crate::utils::errors::{conflict_error, not_found_error, AppResult};

use super::event_repository::EventStore;
use super::user_repository::UserStore;

#[derive(Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<GateEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: NewEvent) -> AppResult<GateEvent> {
        let mut events = self.events.write().await;
        let seq = events.len() as i64 + 1;
        let stored = GateEvent::from_new(event, Uuid::new_v4(), seq);
        events.push(stored.clone());
        Ok(stored)
    }

    async fn query_by_plate(&self, plate: &Plate) -> AppResult<Vec<GateEvent>> {
        let events = self.events.read().await;
        let mut matching: Vec<GateEvent> =
            events.iter().filter(|e| &e.plate == plate).cloned().collect();
        sort_descending(&mut matching);
        Ok(matching)
    }

    async fn query_by_plates(&self, plates: &[Plate]) -> AppResult<Vec<GateEvent>> {
        let events = self.events.read().await;
        let mut matching: Vec<GateEvent> = events
            .iter()
            .filter(|e| plates.contains(&e.plate))
            .cloned()
            .collect();
        sort_descending(&mut matching);
        Ok(matching)
    }

    async fn latest(&self, plate: &Plate) -> AppResult<Option<GateEvent>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| &e.plate == plate)
            .max_by_key(|e| e.order_key())
            .cloned())
    }

    async fn distinct_plates(&self, class: VehicleClass) -> AppResult<HashSet<Plate>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| e.vehicle_class == class)
            .map(|e| e.plate.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.phone == user.phone) {
            return Err(conflict_error("Usuario", "teléfono", &user.phone));
        }

        let created = User {
            name: user.name,
            phone: user.phone,
            password_hash: user.password_hash,
            role: user.role,
            vehicles: Vec::new(),
            created_at: Utc::now(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.phone == phone).cloned())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.name == name).cloned())
    }

    async fn add_vehicle(&self, phone: &str, vehicle: Vehicle) -> AppResult<bool> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.phone == phone)
            .ok_or_else(|| not_found_error("Usuario", phone))?;

        if user.vehicles.contains(&vehicle) {
            return Ok(false);
        }
        user.vehicles.push(vehicle);
        Ok(true)
    }

    async fn find_owner_by_plate(&self, plate: &Plate) -> AppResult<Option<User>> {
        // `users` está en orden de registro
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.owns_plate(plate)).cloned())
    }
}
