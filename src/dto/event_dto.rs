use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::models::{AvailabilitySnapshot, EventKind, GateEvent, NewEvent, Plate, VehicleClass};
use crate::utils::validation::{validate_plate, PHONE_REGEX};

// Request de evento de portería
#[derive(Debug, Deserialize, Validate)]
pub struct EventRequest {
    pub evento: EventKind,

    pub tipo_vehiculo: VehicleClass,

    #[validate(custom = "validate_plate")]
    pub placa: Plate,

    /// Hora del evento; si no viene se usa la hora del servidor
    #[serde(default, deserialize_with = "deserialize_event_time")]
    pub hora: Option<DateTime<Utc>>,
}

// Formatos sin zona horaria que mandan las porterías
const NAIVE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// RFC 3339 primero; una hora sin zona se toma como UTC
pub fn parse_event_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Utc));
    }
    NAIVE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn deserialize_event_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|raw| {
        parse_event_time(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("hora inválida: '{}'", raw)))
    })
    .transpose()
}

impl EventRequest {
    pub fn into_new_event(self) -> NewEvent {
        NewEvent {
            plate: self.placa,
            vehicle_class: self.tipo_vehiculo,
            kind: self.evento,
            timestamp: self.hora.unwrap_or_else(Utc::now),
        }
    }
}

// Evento manual: mismo evento más credenciales de un administrador
#[derive(Debug, Deserialize, Validate)]
pub struct ManualEventRequest {
    #[serde(flatten)]
    #[validate]
    pub evento: EventRequest,

    #[validate(regex = "PHONE_REGEX")]
    pub admin_telefono: String,

    #[validate(length(min = 1))]
    pub admin_password: String,
}

#[derive(Debug, Serialize)]
pub struct EventRegisteredResponse {
    pub status: String,
    pub evento: GateEvent,
}

impl EventRegisteredResponse {
    pub fn new(evento: GateEvent) -> Self {
        Self {
            status: "evento registrado".to_string(),
            evento,
        }
    }
}

// Estado del servicio
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub almacenamiento: String,
    pub suscriptores_en_vivo: usize,
    pub disponibilidad: AvailabilitySnapshot,
}

// Query opcional de pico y placa
#[derive(Debug, Deserialize)]
pub struct PicoYPlacaQuery {
    pub placa: Option<Plate>,
}
