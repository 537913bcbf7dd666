//! Registro de eventos de portería
//!
//! Flujo de un evento: placa normalizada → log → tracker de ocupación →
//! difusión de disponibilidad → cola de SMS. Solo el append al log puede
//! hacer fallar el registro; lo que sigue es best-effort.

use std::sync::Arc;
use tracing::info;

use crate::models::{GateEvent, NewEvent, Plate};
use crate::repositories::EventStore;
use crate::utils::errors::AppResult;

use super::availability_broadcaster::AvailabilityBroadcaster;
use super::notification_service::NotificationDispatcher;
use super::occupancy_service::OccupancyEngine;

#[derive(Clone)]
pub struct EventService {
    events: Arc<dyn EventStore>,
    occupancy: Arc<OccupancyEngine>,
    broadcaster: Arc<AvailabilityBroadcaster>,
    notifier: NotificationDispatcher,
}

impl EventService {
    pub fn new(
        events: Arc<dyn EventStore>,
        occupancy: Arc<OccupancyEngine>,
        broadcaster: Arc<AvailabilityBroadcaster>,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            events,
            occupancy,
            broadcaster,
            notifier,
        }
    }

    /// Agrega el evento al log y dispara las actualizaciones derivadas
    pub async fn register(&self, event: NewEvent) -> AppResult<GateEvent> {
        let stored = self.events.append(event).await?;
        info!(
            "🚗 Evento {} registrado: {} {} ({})",
            stored.seq, stored.plate, stored.kind, stored.vehicle_class
        );

        self.occupancy.record(&stored).await;
        self.broadcaster.publish(self.occupancy.availability().await);
        self.notifier.notify(stored.clone());

        Ok(stored)
    }

    /// Historial completo de una placa, del más reciente al más antiguo
    pub async fn history_by_plate(&self, plate: &Plate) -> AppResult<Vec<GateEvent>> {
        self.events.query_by_plate(plate).await
    }

    /// Historial combinado de varias placas
    pub async fn history_by_plates(&self, plates: &[Plate]) -> AppResult<Vec<GateEvent>> {
        self.events.query_by_plates(plates).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotificationConfig;
    use crate::models::{Capacities, EventKind, VehicleClass};
    use crate::repositories::{InMemoryEventStore, InMemoryUserStore};
    use crate::services::notification_service::SimulatedSmsSender;
    use chrono::{TimeZone, Utc};

    fn service() -> (EventService, Arc<AvailabilityBroadcaster>) {
        let events = Arc::new(InMemoryEventStore::new());
        let occupancy = Arc::new(OccupancyEngine::new(events.clone(), Capacities::new(2, 1)));
        let broadcaster = Arc::new(AvailabilityBroadcaster::new(16));
        let (notifier, _worker) = NotificationDispatcher::start(
            Arc::new(InMemoryUserStore::new()),
            Arc::new(SimulatedSmsSender),
            &NotificationConfig::default(),
        );
        (
            EventService::new(events, occupancy, broadcaster.clone(), notifier),
            broadcaster,
        )
    }

    fn new_event(plate: &str, kind: EventKind, minute: u32) -> NewEvent {
        NewEvent {
            plate: Plate::from(plate),
            vehicle_class: VehicleClass::Carro,
            kind,
            timestamp: Utc.with_ymd_and_hms(2025, 3, 10, 9, minute, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn each_registration_publishes_a_snapshot() {
        let (service, broadcaster) = service();
        let mut feed = broadcaster.subscribe();

        service.register(new_event("AAA111", EventKind::Entrada, 0)).await.unwrap();
        service.register(new_event("BBB222", EventKind::Entrada, 1)).await.unwrap();
        service.register(new_event("AAA111", EventKind::Salida, 2)).await.unwrap();

        let available: Vec<u32> = vec![
            feed.next().await.unwrap().available(VehicleClass::Carro),
            feed.next().await.unwrap().available(VehicleClass::Carro),
            feed.next().await.unwrap().available(VehicleClass::Carro),
        ];
        assert_eq!(available, vec![1, 0, 1]);
    }

    #[tokio::test]
    async fn unregistered_plate_is_still_recorded() {
        let (service, _) = service();
        let stored = service
            .register(new_event("sin-dueño 1", EventKind::Entrada, 0))
            .await
            .unwrap();

        let history = service.history_by_plate(&Plate::from("SINDUEÑO1")).await.unwrap();
        assert_eq!(history, vec![stored]);
    }
}
