//! Placa normalizada
//!
//! Toda placa que entra al sistema (eventos, registro de vehículos, consultas)
//! pasa por `Plate::normalize`, de modo que "ABC-123", "abc 123" y "AbC123"
//! se refieren al mismo vehículo.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Placa en forma canónica: solo letras y dígitos, en mayúsculas.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Plate(String);

impl Plate {
    /// Elimina todo carácter que no sea letra o dígito y pasa el resto a mayúsculas.
    ///
    /// Es total e idempotente: `normalize(normalize(x)) == normalize(x)`.
    pub fn normalize(raw: &str) -> Self {
        let canonical = raw
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_uppercase)
            .collect();
        Self(canonical)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Último dígito de la placa, usado por pico y placa
    pub fn last_digit(&self) -> Option<char> {
        self.0.chars().rev().find(|c| c.is_ascii_digit())
    }
}

impl fmt::Display for Plate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Plate {
    fn from(raw: &str) -> Self {
        Self::normalize(raw)
    }
}

impl From<String> for Plate {
    fn from(raw: String) -> Self {
        Self::normalize(&raw)
    }
}

// Cualquier placa que llegue por JSON se normaliza al deserializar.
impl<'de> Deserialize<'de> for Plate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::normalize(&raw))
    }
}
