//! Notificaciones por SMS
//!
//! El registro de eventos encola el evento con `try_send` y sigue; nunca
//! espera por el SMS. Un worker en background busca al dueño de la placa,
//! arma el mensaje y lo entrega con timeout por intento y backoff
//! exponencial. Los fallos solo se registran en el log.

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::{NotificationConfig, TwilioConfig};
use crate::models::GateEvent;
use crate::repositories::UserStore;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMS rechazado ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Tiempo de espera agotado tras {0:?}")]
    Timeout(Duration),
}

/// Proveedor de envío de SMS
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Envía el mensaje y devuelve el identificador del proveedor
    async fn send(&self, to: &str, body: &str) -> Result<String, NotificationError>;
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
}

/// Envío real vía API REST de Twilio
pub struct TwilioSmsSender {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioSmsSender {
    pub fn new(config: TwilioConfig, timeout: Duration) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.config.account_sid
        )
    }
}

#[async_trait]
impl SmsSender for TwilioSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<String, NotificationError> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("To", to), ("From", self.config.from.as_str()), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let message: TwilioMessage = response.json().await?;
        Ok(message.sid)
    }
}

/// Envío simulado: solo deja el mensaje en el log
pub struct SimulatedSmsSender;

#[async_trait]
impl SmsSender for SimulatedSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<String, NotificationError> {
        info!("📱 SMS simulado a {}: {}", to, body);
        Ok(format!("simulado-{}", uuid::Uuid::new_v4()))
    }
}

/// Texto que recibe el dueño del vehículo
pub fn format_message(owner_name: &str, event: &GateEvent) -> String {
    format!(
        "Hola {}, tu vehículo {} hizo {} el {}",
        owner_name,
        event.plate,
        event.kind,
        event.timestamp.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Resultado de intentar notificar un evento
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent { sid: String, attempts: u32 },
    NoOwner,
    LookupFailed,
    Failed { attempts: u32 },
}

#[derive(Clone)]
struct DeliveryContext {
    users: Arc<dyn UserStore>,
    sms: Arc<dyn SmsSender>,
    max_attempts: u32,
    backoff_base: Duration,
    attempt_timeout: Duration,
}

/// Retardo antes del siguiente intento: `base * 2^(intento-1)` más jitter
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponential = base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
    let jitter_ms = base.as_millis() as u64 / 2;
    let jitter = if jitter_ms > 0 {
        Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    } else {
        Duration::ZERO
    };
    exponential + jitter
}

async fn deliver(ctx: &DeliveryContext, event: &GateEvent) -> DeliveryOutcome {
    let owner = match ctx.users.find_owner_by_plate(&event.plate).await {
        Ok(Some(owner)) => owner,
        Ok(None) => {
            debug!("📭 Placa {} sin dueño registrado, no se notifica", event.plate);
            return DeliveryOutcome::NoOwner;
        }
        Err(e) => {
            warn!("⚠️ No se pudo buscar el dueño de {}: {}", event.plate, e);
            return DeliveryOutcome::LookupFailed;
        }
    };

    let message = format_message(&owner.name, event);
    let max_attempts = ctx.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let result = tokio::time::timeout(ctx.attempt_timeout, ctx.sms.send(&owner.phone, &message))
            .await
            .unwrap_or(Err(NotificationError::Timeout(ctx.attempt_timeout)));

        match result {
            Ok(sid) => {
                info!("[SMS] Enviado a {} | SID: {}", owner.phone, sid);
                return DeliveryOutcome::Sent { sid, attempts: attempt };
            }
            Err(e) => {
                warn!(
                    "⚠️ Intento {}/{} de SMS a {} falló: {}",
                    attempt, max_attempts, owner.phone, e
                );
            }
        }

        if attempt < max_attempts {
            tokio::time::sleep(backoff_delay(ctx.backoff_base, attempt)).await;
        }
    }

    error!(
        "❌ No se pudo enviar SMS a {} por el evento {} de {}",
        owner.phone, event.kind, event.plate
    );
    DeliveryOutcome::Failed { attempts: max_attempts }
}

/// Cola de notificaciones; clonable y barata de compartir
#[derive(Clone)]
pub struct NotificationDispatcher {
    queue: mpsc::Sender<GateEvent>,
}

/// Worker que consume la cola
pub struct NotificationWorker {
    handle: JoinHandle<()>,
}

impl NotificationDispatcher {
    /// Crea la cola y arranca el worker
    pub fn start(
        users: Arc<dyn UserStore>,
        sms: Arc<dyn SmsSender>,
        config: &NotificationConfig,
    ) -> (Self, NotificationWorker) {
        let (queue, receiver) = mpsc::channel(config.queue_size.max(1));
        let ctx = DeliveryContext {
            users,
            sms,
            max_attempts: config.max_attempts,
            backoff_base: config.backoff_base,
            attempt_timeout: config.attempt_timeout,
        };
        let handle = tokio::spawn(run_worker(receiver, ctx, config.max_concurrent.max(1)));

        (Self { queue }, NotificationWorker { handle })
    }

    /// Encola la notificación de un evento sin esperar
    pub fn notify(&self, event: GateEvent) {
        match self.queue.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!("⚠️ Cola de notificaciones llena, se descarta el aviso de {}", event.plate);
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!("⚠️ Worker de notificaciones detenido, se descarta el aviso de {}", event.plate);
            }
        }
    }
}

impl NotificationWorker {
    /// Espera a que la cola se vacíe (todas las colas soltadas) hasta `grace`;
    /// después aborta los envíos pendientes.
    pub async fn shutdown(self, grace: Duration) {
        let mut handle = self.handle;
        match tokio::time::timeout(grace, &mut handle).await {
            Ok(_) => info!("📪 Notificaciones pendientes entregadas"),
            Err(_) => {
                warn!("⏱️ Se abandonan notificaciones pendientes tras {:?}", grace);
                handle.abort();
            }
        }
    }
}

async fn run_worker(mut receiver: mpsc::Receiver<GateEvent>, ctx: DeliveryContext, max_concurrent: usize) {
    let limiter = Arc::new(Semaphore::new(max_concurrent));
    let mut deliveries = JoinSet::new();

    loop {
        tokio::select! {
            job = receiver.recv() => {
                let Some(event) = job else { break };
                let Ok(permit) = limiter.clone().acquire_owned().await else { break };
                let ctx = ctx.clone();
                deliveries.spawn(async move {
                    let _permit = permit;
                    deliver(&ctx, &event).await
                });
            }
            Some(finished) = deliveries.join_next(), if !deliveries.is_empty() => {
                if let Err(e) = finished {
                    error!("❌ Tarea de notificación falló: {}", e);
                }
            }
        }
    }

    while let Some(finished) = deliveries.join_next().await {
        if let Err(e) = finished {
            error!("❌ Tarea de notificación falló: {}", e);
        }
    }
    debug!("Worker de notificaciones terminado");
}
