//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno. Todas las variables son
//! opcionales; un valor numérico mal formado es un error de arranque.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::models::Capacities;

/// Backend de almacenamiento
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Postgres => "postgres",
            StorageBackend::Memory => "memory",
        }
    }
}

/// Credenciales de Twilio para el envío de SMS
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from: String,
}

/// Administrador que se crea al arrancar si no existe
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub name: String,
    pub phone: String,
    pub password: String,
}

/// Política de reintentos de notificaciones
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub queue_size: usize,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub attempt_timeout: Duration,
    pub max_concurrent: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            queue_size: 256,
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
            attempt_timeout: Duration::from_secs(10),
            max_concurrent: 8,
        }
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub capacities: Capacities,
    pub twilio: Option<TwilioConfig>,
    pub notifications: NotificationConfig,
    pub sse_buffer: usize,
    pub reconcile_interval: Option<Duration>,
    pub bcrypt_cost: u32,
    pub admin: Option<AdminBootstrap>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            storage: StorageBackend::Memory,
            database_url: None,
            cors_origins: vec!["*".to_string()],
            capacities: Capacities::default(),
            twilio: None,
            notifications: NotificationConfig::default(),
            sse_buffer: 64,
            reconcile_interval: Some(Duration::from_secs(60)),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            admin: None,
        }
    }
}

impl EnvironmentConfig {
    /// Cargar la configuración desde las variables de entorno
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let database_url = optional_var("DATABASE_URL");

        let storage = match optional_var("STORAGE").as_deref() {
            Some("postgres") => StorageBackend::Postgres,
            Some("memory") => StorageBackend::Memory,
            Some(other) => anyhow::bail!("STORAGE debe ser 'postgres' o 'memory', no '{}'", other),
            None if database_url.is_some() => StorageBackend::Postgres,
            None => StorageBackend::Memory,
        };
        if storage == StorageBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL es obligatoria con STORAGE=postgres");
        }

        let twilio = match (
            optional_var("TWILIO_SID"),
            optional_var("TWILIO_TOKEN"),
            optional_var("TWILIO_FROM"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from,
            }),
            _ => None,
        };

        let admin = match (
            optional_var("ADMIN_NOMBRE"),
            optional_var("ADMIN_TELEFONO"),
            optional_var("ADMIN_PASSWORD"),
        ) {
            (Some(name), Some(phone), Some(password)) => Some(AdminBootstrap { name, phone, password }),
            _ => None,
        };

        let reconcile_secs: u64 = parse_var("RECONCILIACION_SECS", 60)?;

        Ok(Self {
            environment: optional_var("ENVIRONMENT").unwrap_or(defaults.environment),
            host: optional_var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port)?,
            storage,
            database_url,
            cors_origins: optional_var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            capacities: Capacities::new(
                parse_var("CAPACIDAD_CARROS", 24)?,
                parse_var("CAPACIDAD_MOTOS", 50)?,
            ),
            twilio,
            notifications: NotificationConfig {
                queue_size: parse_var("COLA_NOTIFICACIONES", defaults.notifications.queue_size)?,
                max_attempts: parse_var("SMS_MAX_INTENTOS", defaults.notifications.max_attempts)?,
                backoff_base: Duration::from_millis(parse_var("SMS_BACKOFF_MS", 500)?),
                attempt_timeout: Duration::from_secs(parse_var("SMS_TIMEOUT_SECS", 10)?),
                max_concurrent: defaults.notifications.max_concurrent,
            },
            sse_buffer: parse_var("SSE_BUFFER", defaults.sse_buffer)?,
            reconcile_interval: (reconcile_secs > 0).then(|| Duration::from_secs(reconcile_secs)),
            bcrypt_cost: parse_var("BCRYPT_COST", defaults.bcrypt_cost)?,
            admin,
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Obtener la dirección del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// CORS abierto cuando no hay orígenes o se usa `*`
    pub fn cors_is_permissive(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} debe ser un número válido, se recibió '{}'", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_facility_layout() {
        let config = EnvironmentConfig::default();
        assert_eq!(config.capacities, Capacities::new(24, 50));
        assert_eq!(config.storage, StorageBackend::Memory);
        assert!(config.cors_is_permissive());
        assert_eq!(config.server_url(), "0.0.0.0:8000");
    }

    #[test]
    fn parse_var_falls_back_to_default_when_unset() {
        let value: u32 = parse_var("PARQUEADERO_TEST_VARIABLE_QUE_NO_EXISTE", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn explicit_origins_disable_permissive_cors() {
        let config = EnvironmentConfig {
            cors_origins: vec!["https://parqueadero.example".to_string()],
            ..EnvironmentConfig::default()
        };
        assert!(!config.cors_is_permissive());
    }
}
