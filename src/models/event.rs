//! Eventos de portería
//!
//! Un evento es un registro inmutable de entrada o salida de una placa.
//! El log de eventos es append-only: nunca se actualiza ni se borra.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::plate::Plate;
use super::vehicle::VehicleClass;

/// Tipo de evento - se guarda como TEXT ("entrada" / "salida")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Entrada,
    Salida,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Entrada => "entrada",
            EventKind::Salida => "salida",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "entrada" => Some(EventKind::Entrada),
            "salida" => Some(EventKind::Salida),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evento aún no persistido
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub plate: Plate,
    pub vehicle_class: VehicleClass,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

/// Evento tal como quedó en el log
///
/// `seq` es la secuencia de inserción asignada por el almacenamiento; junto con
/// `timestamp` forma la clave de orden del evento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateEvent {
    pub id: Uuid,
    pub seq: i64,
    #[serde(rename = "placa")]
    pub plate: Plate,
    #[serde(rename = "tipo_vehiculo")]
    pub vehicle_class: VehicleClass,
    #[serde(rename = "evento")]
    pub kind: EventKind,
    #[serde(rename = "hora")]
    pub timestamp: DateTime<Utc>,
}

impl GateEvent {
    pub fn from_new(event: NewEvent, id: Uuid, seq: i64) -> Self {
        Self {
            id,
            seq,
            plate: event.plate,
            vehicle_class: event.vehicle_class,
            kind: event.kind,
            timestamp: event.timestamp,
        }
    }

    /// Clave de orden: hora del evento, desempate por orden de inserción
    pub fn order_key(&self) -> (DateTime<Utc>, i64) {
        (self.timestamp, self.seq)
    }

    pub fn is_entrance(&self) -> bool {
        self.kind == EventKind::Entrada
    }
}

/// Ordena de más reciente a más antiguo según `order_key`
pub fn sort_descending(events: &mut [GateEvent]) {
    events.sort_by(|a, b| b.order_key().cmp(&a.order_key()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(seq: i64, minute: u32) -> GateEvent {
        GateEvent {
            id: Uuid::new_v4(),
            seq,
            plate: Plate::from("ABC123"),
            vehicle_class: VehicleClass::Carro,
            kind: EventKind::Entrada,
            timestamp: Utc.with_ymd_and_hms(2025, 3, 10, 8, minute, 0).unwrap(),
        }
    }

    #[test]
    fn sort_breaks_timestamp_ties_by_insertion_order() {
        let mut events = vec![event(1, 0), event(2, 5), event(3, 5), event(4, 1)];
        sort_descending(&mut events);
        let seqs: Vec<i64> = events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![3, 2, 4, 1]);
    }

    #[test]
    fn serializes_with_gate_field_names() {
        let json = serde_json::to_value(event(7, 0)).unwrap();
        assert_eq!(json["placa"], "ABC123");
        assert_eq!(json["tipo_vehiculo"], "carro");
        assert_eq!(json["evento"], "entrada");
        assert!(json["hora"].is_string());
        assert_eq!(json["seq"], 7);
    }
}
