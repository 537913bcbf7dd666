//! Pico y placa
//!
//! Tabla fija de dígitos restringidos por día de la semana (0 = lunes).

use chrono::{Datelike, Local, Weekday};
use serde::Serialize;

use crate::models::Plate;

const RESTRICTED_DIGITS: [&[char]; 7] = [
    &['1', '2'],
    &['3', '4'],
    &['5', '6'],
    &['7', '8'],
    &['9', '0'],
    &[],
    &[],
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PicoYPlaca {
    pub dia: u32,
    pub placas_restringidas: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restringida: Option<bool>,
}

pub fn for_weekday(weekday: Weekday) -> PicoYPlaca {
    let dia = weekday.num_days_from_monday();
    PicoYPlaca {
        dia,
        placas_restringidas: RESTRICTED_DIGITS[dia as usize]
            .iter()
            .map(|d| d.to_string())
            .collect(),
        restringida: None,
    }
}

/// Restricción de hoy; con placa, indica además si esa placa tiene pico y placa
pub fn today(plate: Option<&Plate>) -> PicoYPlaca {
    let weekday = Local::now().weekday();
    let mut result = for_weekday(weekday);
    result.restringida = plate.map(|p| is_restricted(p, weekday));
    result
}

/// Si la placa tiene restricción ese día según su último dígito
pub fn is_restricted(plate: &Plate, weekday: Weekday) -> bool {
    plate
        .last_digit()
        .map(|digit| RESTRICTED_DIGITS[weekday.num_days_from_monday() as usize].contains(&digit))
        .unwrap_or(false)
}
