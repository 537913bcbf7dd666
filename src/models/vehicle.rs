//! Modelo de Vehicle
//!
//! Tipos de vehículo admitidos en el parqueadero y el par placa/tipo
//! que un usuario registra a su nombre.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::plate::Plate;

/// Tipo de vehículo - se guarda como TEXT ("carro" / "moto")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    Carro,
    Moto,
}

impl VehicleClass {
    /// Todos los tipos con cupo en el parqueadero
    pub const ALL: [VehicleClass; 2] = [VehicleClass::Carro, VehicleClass::Moto];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleClass::Carro => "carro",
            VehicleClass::Moto => "moto",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "carro" => Some(VehicleClass::Carro),
            "moto" => Some(VehicleClass::Moto),
            _ => None,
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vehículo registrado por un usuario
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(rename = "placa")]
    pub plate: Plate,
    #[serde(rename = "tipo_vehiculo")]
    pub vehicle_class: VehicleClass,
}

impl Vehicle {
    pub fn new(plate: Plate, vehicle_class: VehicleClass) -> Self {
        Self { plate, vehicle_class }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_round_trips_through_text() {
        for class in VehicleClass::ALL {
            assert_eq!(VehicleClass::from_str(class.as_str()), Some(class));
        }
        assert_eq!(VehicleClass::from_str("bicicleta"), None);
    }

    #[test]
    fn vehicle_uses_spanish_wire_names() {
        let vehicle: Vehicle =
            serde_json::from_str(r#"{"placa":"abc-123","tipo_vehiculo":"moto"}"#).unwrap();
        assert_eq!(vehicle.plate.as_str(), "ABC123");
        assert_eq!(vehicle.vehicle_class, VehicleClass::Moto);

        let json = serde_json::to_value(&vehicle).unwrap();
        assert_eq!(json["placa"], "ABC123");
        assert_eq!(json["tipo_vehiculo"], "moto");
    }
}
