//! Log de eventos de portería
//!
//! Contrato append-only del log y su implementación sobre PostgreSQL.
//! La atomicidad por fila la garantiza la base de datos; el núcleo no
//! agrega bloqueos propios sobre el log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::{EventKind, GateEvent, NewEvent, Plate, VehicleClass};
use crate::utils::errors::{AppError, AppResult};

/// Almacenamiento append-only de eventos
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Agrega un evento y devuelve la versión persistida (con `id` y `seq`)
    async fn append(&self, event: NewEvent) -> AppResult<GateEvent>;

    /// Historial de una placa, del más reciente al más antiguo
    async fn query_by_plate(&self, plate: &Plate) -> AppResult<Vec<GateEvent>>;

    /// Historial combinado de varias placas, del más reciente al más antiguo
    async fn query_by_plates(&self, plates: &[Plate]) -> AppResult<Vec<GateEvent>>;

    /// Evento más reciente de una placa
    async fn latest(&self, plate: &Plate) -> AppResult<Option<GateEvent>>;

    /// Toda placa que alguna vez produjo un evento de ese tipo
    async fn distinct_plates(&self, class: VehicleClass) -> AppResult<HashSet<Plate>>;
}

#[derive(Debug, FromRow)]
struct EventRow {
    seq: i64,
    id: Uuid,
    placa: String,
    tipo_vehiculo: String,
    evento: String,
    hora: DateTime<Utc>,
}

impl TryFrom<EventRow> for GateEvent {
    type Error = AppError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let vehicle_class = VehicleClass::from_str(&row.tipo_vehiculo).ok_or_else(|| {
            AppError::Internal(format!("tipo_vehiculo desconocido en evento {}: {}", row.seq, row.tipo_vehiculo))
        })?;
        let kind = EventKind::from_str(&row.evento).ok_or_else(|| {
            AppError::Internal(format!("evento desconocido en evento {}: {}", row.seq, row.evento))
        })?;

        Ok(GateEvent {
            id: row.id,
            seq: row.seq,
            plate: Plate::normalize(&row.placa),
            vehicle_class,
            kind,
            timestamp: row.hora,
        })
    }
}

fn into_events(rows: Vec<EventRow>) -> AppResult<Vec<GateEvent>> {
    rows.into_iter().map(GateEvent::try_from).collect()
}

const EVENT_COLUMNS: &str = "seq, id, placa, tipo_vehiculo, evento, hora";

pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append(&self, event: NewEvent) -> AppResult<GateEvent> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO eventos (id, placa, tipo_vehiculo, evento, hora)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(event.plate.as_str())
        .bind(event.vehicle_class.as_str())
        .bind(event.kind.as_str())
        .bind(event.timestamp)
        .fetch_one(&self.pool)
        .await?;

        GateEvent::try_from(row)
    }

    async fn query_by_plate(&self, plate: &Plate) -> AppResult<Vec<GateEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM eventos WHERE placa = $1 ORDER BY hora DESC, seq DESC",
            EVENT_COLUMNS
        ))
        .bind(plate.as_str())
        .fetch_all(&self.pool)
        .await?;

        into_events(rows)
    }

    async fn query_by_plates(&self, plates: &[Plate]) -> AppResult<Vec<GateEvent>> {
        if plates.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = plates.iter().map(|p| p.as_str().to_string()).collect();

        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM eventos WHERE placa = ANY($1) ORDER BY hora DESC, seq DESC",
            EVENT_COLUMNS
        ))
        .bind(keys)
        .fetch_all(&self.pool)
        .await?;

        into_events(rows)
    }

    async fn latest(&self, plate: &Plate) -> AppResult<Option<GateEvent>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM eventos WHERE placa = $1 ORDER BY hora DESC, seq DESC LIMIT 1",
            EVENT_COLUMNS
        ))
        .bind(plate.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(GateEvent::try_from).transpose()
    }

    async fn distinct_plates(&self, class: VehicleClass) -> AppResult<HashSet<Plate>> {
        let plates: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT placa FROM eventos WHERE tipo_vehiculo = $1")
                .bind(class.as_str())
                .fetch_all(&self.pool)
                .await?;

        Ok(plates.iter().map(|p| Plate::normalize(p)).collect())
    }
}
