//! Modelo de User
//!
//! El teléfono es la llave de identidad del usuario. Los usuarios solo se
//! crean y se les agregan vehículos; nunca se borran.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::plate::Plate;
use super::vehicle::Vehicle;

/// Roles del sistema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Usuario,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Usuario => "usuario",
            UserRole::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "usuario" => Some(UserRole::Usuario),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// Usuario con sus vehículos
#[derive(Debug, Clone)]
pub struct User {
    pub name: String,
    pub phone: String,
    pub password_hash: String,
    pub role: UserRole,
    pub vehicles: Vec<Vehicle>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn owns_plate(&self, plate: &Plate) -> bool {
        self.vehicles.iter().any(|v| &v.plate == plate)
    }

    /// Placas del usuario sin repetir, en orden de registro
    pub fn plates(&self) -> Vec<Plate> {
        let mut plates: Vec<Plate> = Vec::with_capacity(self.vehicles.len());
        for vehicle in &self.vehicles {
            if !plates.contains(&vehicle.plate) {
                plates.push(vehicle.plate.clone());
            }
        }
        plates
    }
}

/// Datos para crear un usuario (contraseña ya hasheada)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub phone: String,
    pub password_hash: String,
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::vehicle::VehicleClass;

    #[test]
    fn plates_are_deduplicated_across_classes() {
        let user = User {
            name: "Ana".to_string(),
            phone: "3001234567".to_string(),
            password_hash: String::new(),
            role: UserRole::Usuario,
            vehicles: vec![
                Vehicle::new(Plate::from("ABC123"), VehicleClass::Carro),
                Vehicle::new(Plate::from("abc-123"), VehicleClass::Moto),
                Vehicle::new(Plate::from("XYZ98B"), VehicleClass::Moto),
            ],
            created_at: Utc::now(),
        };

        assert_eq!(user.plates(), vec![Plate::from("ABC123"), Plate::from("XYZ98B")]);
        assert!(user.owns_plate(&Plate::from("xyz 98 b")));
        assert!(!user.is_admin());
    }
}
