use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use crate::models::{User, UserRole, Vehicle};
use crate::utils::validation::{validate_not_blank, validate_plate, PHONE_REGEX};

// El nombre se recorta al deserializar, antes de validar y de buscar
fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}

// Request para registrar un usuario (sin vehículos)
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 2, max = 100), custom = "validate_not_blank")]
    pub nombre: String,

    #[validate(regex = "PHONE_REGEX")]
    pub telefono: String,

    #[validate(length(min = 6, max = 100))]
    pub password: String,
}

// Login por nombre
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1))]
    pub nombre: String,

    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub nombre: String,
    pub telefono: String,
    pub rol: UserRole,
}

impl From<User> for LoginResponse {
    fn from(user: User) -> Self {
        Self {
            nombre: user.name,
            telefono: user.phone,
            rol: user.role,
        }
    }
}

fn validate_vehicle(vehicle: &Vehicle) -> Result<(), ValidationError> {
    validate_plate(&vehicle.plate)
}

// Request para agregar un vehículo a un usuario ya registrado
#[derive(Debug, Deserialize, Validate)]
pub struct AddVehicleRequest {
    #[validate(regex = "PHONE_REGEX")]
    pub telefono: String,

    #[validate(custom = "validate_vehicle")]
    pub vehiculo: Vehicle,
}

// Response genérica con estado
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: impl Into<String>) -> Self {
        Self { status: status.into() }
    }
}
