//! Registro de usuarios y vehículos
//!
//! Contrato del almacenamiento de usuarios y su implementación sobre
//! PostgreSQL. El teléfono es la llave primaria.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::models::{NewUser, Plate, User, UserRole, Vehicle, VehicleClass};
use crate::utils::errors::{conflict_error, not_found_error, AppError, AppResult};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Crea el usuario; `Conflict` si el teléfono ya existe
    async fn create(&self, user: NewUser) -> AppResult<User>;

    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<User>>;

    /// Primer usuario registrado con ese nombre
    async fn find_by_name(&self, name: &str) -> AppResult<Option<User>>;

    /// Agrega un vehículo de forma idempotente; devuelve `false` si ya estaba.
    /// `NotFound` si el teléfono no existe.
    async fn add_vehicle(&self, phone: &str, vehicle: Vehicle) -> AppResult<bool>;

    /// Dueño de la placa: el usuario registrado primero entre los que la tienen
    async fn find_owner_by_plate(&self, plate: &Plate) -> AppResult<Option<User>>;
}

#[derive(Debug, FromRow)]
struct UserRow {
    telefono: String,
    nombre: String,
    password_hash: String,
    rol: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct VehicleRow {
    placa: String,
    tipo_vehiculo: String,
}

impl TryFrom<VehicleRow> for Vehicle {
    type Error = AppError;

    fn try_from(row: VehicleRow) -> Result<Self, Self::Error> {
        let class = VehicleClass::from_str(&row.tipo_vehiculo).ok_or_else(|| {
            AppError::Internal(format!("tipo_vehiculo desconocido: {}", row.tipo_vehiculo))
        })?;
        Ok(Vehicle::new(Plate::normalize(&row.placa), class))
    }
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_vehicles(&self, phone: &str) -> AppResult<Vec<Vehicle>> {
        let rows = sqlx::query_as::<_, VehicleRow>(
            "SELECT placa, tipo_vehiculo FROM vehiculos WHERE telefono = $1 ORDER BY agregado_en, placa",
        )
        .bind(phone)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Vehicle::try_from).collect()
    }

    async fn hydrate(&self, row: UserRow) -> AppResult<User> {
        let role = UserRole::from_str(&row.rol)
            .ok_or_else(|| AppError::Internal(format!("rol desconocido: {}", row.rol)))?;
        let vehicles = self.load_vehicles(&row.telefono).await?;

        Ok(User {
            name: row.nombre,
            phone: row.telefono,
            password_hash: row.password_hash,
            role,
            vehicles,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO usuarios (telefono, nombre, password_hash, rol, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (telefono) DO NOTHING
            RETURNING telefono, nombre, password_hash, rol, created_at
            "#,
        )
        .bind(&user.phone)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => self.hydrate(row).await,
            None => Err(conflict_error("Usuario", "teléfono", &user.phone)),
        }
    }

    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT telefono, nombre, password_hash, rol, created_at FROM usuarios WHERE telefono = $1",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT telefono, nombre, password_hash, rol, created_at
            FROM usuarios WHERE nombre = $1
            ORDER BY created_at LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn add_vehicle(&self, phone: &str, vehicle: Vehicle) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM usuarios WHERE telefono = $1)")
                .bind(phone)
                .fetch_one(&self.pool)
                .await?;
        if !exists {
            return Err(not_found_error("Usuario", phone));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO vehiculos (telefono, placa, tipo_vehiculo)
            VALUES ($1, $2, $3)
            ON CONFLICT (telefono, placa, tipo_vehiculo) DO NOTHING
            "#,
        )
        .bind(phone)
        .bind(vehicle.plate.as_str())
        .bind(vehicle.vehicle_class.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_owner_by_plate(&self, plate: &Plate) -> AppResult<Option<User>> {
        let phone: Option<String> = sqlx::query_scalar(
            r#"
            SELECT u.telefono
            FROM vehiculos v
            JOIN usuarios u ON u.telefono = v.telefono
            WHERE v.placa = $1
            ORDER BY u.created_at, u.telefono
            LIMIT 1
            "#,
        )
        .bind(plate.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match phone {
            Some(phone) => self.find_by_phone(&phone).await,
            None => Ok(None),
        }
    }
}
