use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use dotenvy::dotenv;

use parqueadero::config::{EnvironmentConfig, StorageBackend};
use parqueadero::database;
use parqueadero::repositories::{
    EventStore, InMemoryEventStore, InMemoryUserStore, PgEventStore, PgUserStore, UserStore,
};
use parqueadero::routes::create_router;
use parqueadero::services::{SimulatedSmsSender, SmsSender, TwilioSmsSender};
use parqueadero::state::AppState;

const NOTIFICATION_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🅿️ Parqueadero - API de portería y disponibilidad");
    info!("================================================");

    let config = EnvironmentConfig::from_env()?;
    if config.is_development() {
        info!("🛠️ Modo desarrollo");
    }

    // Almacenamiento
    let (users, events): (Arc<dyn UserStore>, Arc<dyn EventStore>) = match config.storage {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL es obligatoria con STORAGE=postgres"))?;
            let pool = match database::connect(url).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {:#}", e);
                    return Err(e);
                }
            };
            (
                Arc::new(PgUserStore::new(pool.clone())),
                Arc::new(PgEventStore::new(pool)),
            )
        }
        StorageBackend::Memory => {
            warn!("💾 Almacenamiento en memoria: los datos se pierden al reiniciar");
            (
                Arc::new(InMemoryUserStore::new()),
                Arc::new(InMemoryEventStore::new()),
            )
        }
    };

    // SMS
    let sms: Arc<dyn SmsSender> = match config.twilio.clone() {
        Some(twilio) => {
            info!("📱 SMS por Twilio desde {}", twilio.from);
            Arc::new(TwilioSmsSender::new(twilio, config.notifications.attempt_timeout)?)
        }
        None => {
            warn!("📱 Twilio sin configurar, los SMS solo se registran en el log");
            Arc::new(SimulatedSmsSender)
        }
    };

    let addr: SocketAddr = config.server_url().parse()?;
    let reconcile_interval = config.reconcile_interval;
    let admin = config.admin.clone();

    let (state, notification_worker) = AppState::new(config, users, events, sms);

    if let Some(admin) = admin {
        state.auth.ensure_admin(&admin).await?;
    }

    // El log es la fuente de verdad: reconstruir la ocupación al arrancar
    state.occupancy.load_from_log().await?;
    let snapshot = state.occupancy.availability().await;
    info!("📊 Disponibilidad inicial: {}", serde_json::to_string(&snapshot)?);

    let reconciliation = reconcile_interval
        .map(|every| tokio::spawn(state.occupancy.clone().run_reconciliation(every)));

    let broadcaster = state.broadcaster.clone();
    let app = create_router(state);

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   POST /usuario - Registrar usuario");
    info!("   POST /login - Login por nombre");
    info!("   POST /vehiculo - Agregar vehículo a un usuario");
    info!("   GET  /vehiculos/:telefono - Vehículos del usuario");
    info!("   GET  /usuario/:telefono/vehiculos-activos - Vehículos dentro");
    info!("   GET  /usuario/:telefono/historial-eventos - Historial del usuario");
    info!("   GET  /usuario/:telefono/vehiculo/:placa/historial - Historial de una placa propia");
    info!("   POST /evento - Evento de portería");
    info!("   POST /evento/manual - Evento manual (admin)");
    info!("   GET  /vehiculo/:placa - Historial de una placa");
    info!("   GET  /disponibilidad - Disponibilidad actual");
    info!("   GET  /sse/disponibilidad - Disponibilidad en vivo (SSE)");
    info!("   GET  /pico-y-placa - Restricción de hoy");
    info!("   GET  /health - Estado del servicio");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Los streams SSE no terminan solos
            broadcaster.close();
        })
        .await;

    if let Some(task) = reconciliation {
        task.abort();
    }
    // El router ya soltó el estado: la cola se cierra y el worker termina lo pendiente
    notification_worker.shutdown(NOTIFICATION_GRACE).await;

    if let Err(e) = served {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo escuchar Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo escuchar SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
