//! Disponibilidad de cupos
//!
//! `AvailabilitySnapshot` es siempre derivado del log de eventos; nunca se
//! persiste.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::vehicle::VehicleClass;

/// Capacidad fija por tipo de vehículo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capacities(BTreeMap<VehicleClass, u32>);

impl Capacities {
    pub fn new(car: u32, motorcycle: u32) -> Self {
        let mut map = BTreeMap::new();
        map.insert(VehicleClass::Carro, car);
        map.insert(VehicleClass::Moto, motorcycle);
        Self(map)
    }

    pub fn get(&self, class: VehicleClass) -> u32 {
        self.0.get(&class).copied().unwrap_or(0)
    }

    pub fn classes(&self) -> impl Iterator<Item = VehicleClass> + '_ {
        self.0.keys().copied()
    }
}

impl Default for Capacities {
    fn default() -> Self {
        Self::new(24, 50)
    }
}

/// Cupos de un tipo de vehículo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassAvailability {
    #[serde(rename = "capacidad")]
    pub capacity: u32,
    #[serde(rename = "ocupados")]
    pub inside: u32,
    #[serde(rename = "disponibles")]
    pub available: u32,
}

impl ClassAvailability {
    /// `available = max(capacity - inside, 0)`
    pub fn new(capacity: u32, inside: u32) -> Self {
        Self {
            capacity,
            inside,
            available: capacity.saturating_sub(inside),
        }
    }
}

/// Foto de la disponibilidad del parqueadero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilitySnapshot {
    #[serde(rename = "clases")]
    pub classes: BTreeMap<VehicleClass, ClassAvailability>,
    #[serde(rename = "generado_en")]
    pub generated_at: DateTime<Utc>,
}

impl AvailabilitySnapshot {
    /// Construye la foto a partir del conteo de placas dentro por tipo
    pub fn from_counts(capacities: &Capacities, inside: &BTreeMap<VehicleClass, u32>) -> Self {
        let classes = capacities
            .classes()
            .map(|class| {
                let count = inside.get(&class).copied().unwrap_or(0);
                (class, ClassAvailability::new(capacities.get(class), count))
            })
            .collect();

        Self {
            classes,
            generated_at: Utc::now(),
        }
    }

    pub fn available(&self, class: VehicleClass) -> u32 {
        self.classes.get(&class).map(|c| c.available).unwrap_or(0)
    }

    pub fn inside(&self, class: VehicleClass) -> u32 {
        self.classes.get(&class).map(|c| c.inside).unwrap_or(0)
    }

    /// Compara solo los conteos, ignorando la hora de generación
    pub fn same_counts(&self, other: &AvailabilitySnapshot) -> bool {
        self.classes == other.classes
    }
}
