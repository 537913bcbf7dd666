//! Utilidades de validación
//!
//! Validadores personalizados usados por los DTOs con `#[derive(Validate)]`.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

use crate::models::Plate;

lazy_static! {
    /// Teléfono: dígitos, opcionalmente con prefijo `+`
    pub static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9]{7,15}$").unwrap();
}

/// Validar que la placa conserve algún carácter tras normalizarse
pub fn validate_plate(plate: &Plate) -> Result<(), ValidationError> {
    if plate.is_empty() {
        let mut error = ValidationError::new("plate");
        error.add_param("message".into(), &"la placa no tiene letras ni dígitos");
        return Err(error);
    }
    Ok(())
}

/// Validar que un string no esté vacío
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_regex_accepts_local_and_international() {
        assert!(PHONE_REGEX.is_match("3001234567"));
        assert!(PHONE_REGEX.is_match("+573001234567"));
        assert!(!PHONE_REGEX.is_match("300-123"));
        assert!(!PHONE_REGEX.is_match("telefono"));
    }

    #[test]
    fn plate_must_keep_some_characters() {
        assert!(validate_plate(&Plate::from("ABC-123")).is_ok());
        assert!(validate_plate(&Plate::from("--")).is_err());
    }

    #[test]
    fn blank_strings_are_rejected() {
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("Ana").is_ok());
    }
}
