//! Servicio de autenticación y autorización
//!
//! Único lugar donde se hashean y verifican contraseñas (bcrypt) y donde se
//! revisan roles y propiedad de placas. Los handlers no repiten estas reglas.

use bcrypt::{hash, verify};
use std::sync::Arc;
use tracing::info;

use crate::config::AdminBootstrap;
use crate::models::{NewUser, Plate, User, UserRole};
use crate::repositories::UserStore;
use crate::utils::errors::{forbidden_error, not_found_error, AppError, AppResult};

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, bcrypt_cost: u32) -> Self {
        Self { users, bcrypt_cost }
    }

    /// Registra un usuario con rol `usuario`
    pub async fn register(&self, name: &str, phone: &str, password: &str) -> AppResult<User> {
        self.create_with_role(name, phone, password, UserRole::Usuario).await
    }

    /// Crea el administrador configurado si su teléfono no existe.
    /// Devuelve `true` si lo creó.
    pub async fn ensure_admin(&self, admin: &AdminBootstrap) -> AppResult<bool> {
        if self.users.find_by_phone(&admin.phone).await?.is_some() {
            return Ok(false);
        }
        self.create_with_role(&admin.name, &admin.phone, &admin.password, UserRole::Admin)
            .await?;
        info!("👮 Administrador {} creado", admin.phone);
        Ok(true)
    }

    /// Login por nombre (primer usuario con ese nombre)
    pub async fn login(&self, name: &str, password: &str) -> AppResult<User> {
        let user = self
            .users
            .find_by_name(name)
            .await?
            .ok_or_else(|| not_found_error("Usuario", name))?;

        self.check_password(&user, password).await?;
        Ok(user)
    }

    /// Verifica credenciales de un administrador
    pub async fn authorize_admin(&self, phone: &str, password: &str) -> AppResult<User> {
        let user = self.require_user(phone).await?;
        self.check_password(&user, password).await?;

        if !user.is_admin() {
            return Err(forbidden_error("registrar eventos manuales", "se requiere rol admin"));
        }
        Ok(user)
    }

    /// La placa debe estar registrada a nombre del usuario
    pub fn ensure_owns_plate(&self, user: &User, plate: &Plate) -> AppResult<()> {
        if !user.owns_plate(plate) {
            return Err(forbidden_error(
                "consultar el historial",
                &format!("la placa {} no pertenece al usuario {}", plate, user.phone),
            ));
        }
        Ok(())
    }

    pub async fn require_user(&self, phone: &str) -> AppResult<User> {
        self.users
            .find_by_phone(phone)
            .await?
            .ok_or_else(|| not_found_error("Usuario", phone))
    }

    async fn create_with_role(
        &self,
        name: &str,
        phone: &str,
        password: &str,
        role: UserRole,
    ) -> AppResult<User> {
        let password_hash = self.hash_password(password).await?;
        self.users
            .create(NewUser {
                name: name.to_string(),
                phone: phone.to_string(),
                password_hash,
                role,
            })
            .await
    }

    async fn hash_password(&self, password: &str) -> AppResult<String> {
        let password = password.to_string();
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("tarea de hash interrumpida: {}", e)))?
            .map_err(AppError::from)
    }

    async fn check_password(&self, user: &User, password: &str) -> AppResult<()> {
        let password = password.to_string();
        let stored = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify(password, &stored))
            .await
            .map_err(|e| AppError::Internal(format!("tarea de verificación interrumpida: {}", e)))??;

        if !valid {
            return Err(AppError::Unauthorized("Contraseña incorrecta".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Vehicle, VehicleClass};
    use crate::repositories::InMemoryUserStore;

    const TEST_COST: u32 = 4;

    fn service() -> (AuthService, Arc<InMemoryUserStore>) {
        let users = Arc::new(InMemoryUserStore::new());
        (AuthService::new(users.clone(), TEST_COST), users)
    }

    fn admin() -> AdminBootstrap {
        AdminBootstrap {
            name: "Portería".to_string(),
            phone: "3000000000".to_string(),
            password: "admin123".to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let (auth, _) = service();
        let created = auth.register("Ana", "3001234567", "secreto1").await.unwrap();
        assert_eq!(created.role, UserRole::Usuario);
        assert_ne!(created.password_hash, "secreto1");

        let logged = auth.login("Ana", "secreto1").await.unwrap();
        assert_eq!(logged.phone, "3001234567");
    }

    #[tokio::test]
    async fn login_failures_are_distinguished() {
        let (auth, _) = service();
        auth.register("Ana", "3001234567", "secreto1").await.unwrap();

        assert!(matches!(auth.login("Nadie", "x").await, Err(AppError::NotFound(_))));
        assert!(matches!(auth.login("Ana", "mala").await, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let (auth, _) = service();
        auth.register("Ana", "3001234567", "secreto1").await.unwrap();
        let err = auth.register("Ana B", "3001234567", "otro123").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn admin_bootstrap_is_idempotent() {
        let (auth, _) = service();
        assert!(auth.ensure_admin(&admin()).await.unwrap());
        assert!(!auth.ensure_admin(&admin()).await.unwrap());

        let user = auth.authorize_admin("3000000000", "admin123").await.unwrap();
        assert!(user.is_admin());
    }

    #[tokio::test]
    async fn regular_user_is_forbidden_as_admin() {
        let (auth, _) = service();
        auth.register("Ana", "3001234567", "secreto1").await.unwrap();

        let err = auth.authorize_admin("3001234567", "secreto1").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = auth.authorize_admin("3001234567", "mala").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        let err = auth.authorize_admin("999", "x").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn ownership_check_uses_normalized_plate() {
        let (auth, users) = service();
        auth.register("Ana", "3001234567", "secreto1").await.unwrap();
        users
            .add_vehicle("3001234567", Vehicle::new(Plate::from("ABC123"), VehicleClass::Carro))
            .await
            .unwrap();
        let user = auth.require_user("3001234567").await.unwrap();

        assert!(auth.ensure_owns_plate(&user, &Plate::from("abc-123")).is_ok());
        assert!(matches!(
            auth.ensure_owns_plate(&user, &Plate::from("ZZZ999")),
            Err(AppError::Forbidden(_))
        ));
    }
}
