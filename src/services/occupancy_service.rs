//! Motor de ocupación
//!
//! Deriva, a partir del log de eventos, si una placa está dentro del
//! parqueadero y cuántos cupos quedan por tipo de vehículo.
//!
//! El estado de una placa es siempre el de su evento más reciente según
//! `(hora, seq)`. No se rechaza ninguna transición: dos entradas seguidas
//! dejan la placa dentro, y un evento atrasado no pisa uno más nuevo.
//!
//! La disponibilidad se sirve desde un `OccupancyTracker` incremental. El
//! tracker guarda el último evento por placa y solo lo reemplaza por uno más
//! nuevo, así que el resultado no depende del orden en que se apliquen los
//! eventos y coincide con recalcular desde el log.
//! `recompute_availability` es esa referencia. `load_from_log` llena el
//! tracker al arrancar y `reconcile` lo corrige si alguna actualización se
//! perdió.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::models::{AvailabilitySnapshot, Capacities, EventKind, GateEvent, Plate, VehicleClass};
use crate::repositories::EventStore;
use crate::utils::errors::AppResult;

/// Vehículo que está dentro del parqueadero
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveStatus {
    #[serde(rename = "placa")]
    pub plate: Plate,
    #[serde(rename = "tipo_vehiculo")]
    pub vehicle_class: VehicleClass,
    #[serde(rename = "hora_entrada")]
    pub entered_at: DateTime<Utc>,
}

impl ActiveStatus {
    fn from_latest(event: GateEvent) -> Option<Self> {
        event.is_entrance().then(|| Self {
            plate: event.plate,
            vehicle_class: event.vehicle_class,
            entered_at: event.timestamp,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct LatestEvent {
    class: VehicleClass,
    kind: EventKind,
    order: (DateTime<Utc>, i64),
}

/// Último evento por placa y conteo de placas dentro por tipo
#[derive(Debug, Default)]
pub struct OccupancyTracker {
    latest: HashMap<Plate, LatestEvent>,
    inside: BTreeMap<VehicleClass, u32>,
}

impl OccupancyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aplica un evento si es más nuevo que el último conocido de su placa.
    /// Devuelve `true` si el estado cambió.
    pub fn apply(&mut self, event: &GateEvent) -> bool {
        if let Some(current) = self.latest.get(&event.plate).copied() {
            if current.order >= event.order_key() {
                return false;
            }
            if current.kind == EventKind::Entrada {
                if let Some(count) = self.inside.get_mut(&current.class) {
                    *count = count.saturating_sub(1);
                }
            }
        }

        if event.is_entrance() {
            *self.inside.entry(event.vehicle_class).or_insert(0) += 1;
        }
        self.latest.insert(
            event.plate.clone(),
            LatestEvent {
                class: event.vehicle_class,
                kind: event.kind,
                order: event.order_key(),
            },
        );
        true
    }

    pub fn inside_counts(&self) -> &BTreeMap<VehicleClass, u32> {
        &self.inside
    }

    pub fn tracked_plates(&self) -> usize {
        self.latest.len()
    }
}

pub struct OccupancyEngine {
    events: Arc<dyn EventStore>,
    capacities: Capacities,
    tracker: RwLock<OccupancyTracker>,
}

impl OccupancyEngine {
    pub fn new(events: Arc<dyn EventStore>, capacities: Capacities) -> Self {
        Self {
            events,
            capacities,
            tracker: RwLock::new(OccupancyTracker::new()),
        }
    }

    pub fn capacities(&self) -> &Capacities {
        &self.capacities
    }

    /// `true` si el último evento de la placa es una entrada
    pub async fn is_inside(&self, plate: &Plate) -> AppResult<bool> {
        Ok(self
            .events
            .latest(plate)
            .await?
            .map(|event| event.is_entrance())
            .unwrap_or(false))
    }

    /// Igual que `is_inside`, con el tipo y la hora de entrada
    pub async fn active_status(&self, plate: &Plate) -> AppResult<Option<ActiveStatus>> {
        Ok(self.events.latest(plate).await?.and_then(ActiveStatus::from_latest))
    }

    /// Incorpora al tracker un evento recién agregado al log
    pub async fn record(&self, event: &GateEvent) {
        let mut tracker = self.tracker.write().await;
        if !tracker.apply(event) {
            debug!(
                "⏪ Evento {} de {} es anterior al último conocido, no cambia la ocupación",
                event.seq, event.plate
            );
        }
    }

    /// Disponibilidad actual desde el tracker incremental
    pub async fn availability(&self) -> AvailabilitySnapshot {
        let tracker = self.tracker.read().await;
        AvailabilitySnapshot::from_counts(&self.capacities, tracker.inside_counts())
    }

    /// Disponibilidad recalculada desde el log; implementación de referencia
    pub async fn recompute_availability(&self) -> AppResult<AvailabilitySnapshot> {
        let mut inside = BTreeMap::new();

        for class in self.capacities.classes() {
            let mut count = 0u32;
            for plate in self.events.distinct_plates(class).await? {
                if let Some(latest) = self.events.latest(&plate).await? {
                    // Una placa cuenta para el tipo de su último evento
                    if latest.is_entrance() && latest.vehicle_class == class {
                        count += 1;
                    }
                }
            }
            inside.insert(class, count);
        }

        Ok(AvailabilitySnapshot::from_counts(&self.capacities, &inside))
    }

    /// Carga inicial del tracker desde el log, al arrancar.
    /// Devuelve cuántas placas se cargaron.
    pub async fn load_from_log(&self) -> AppResult<usize> {
        let (loaded, _) = self.merge_log().await?;
        info!("📥 Ocupación cargada desde el log ({} placas)", loaded);
        Ok(loaded)
    }

    /// Fusiona en el tracker el último evento de cada placa del log.
    /// Devuelve cuántas placas estaban desactualizadas.
    pub async fn reconcile(&self) -> AppResult<usize> {
        let (stale, tracked) = self.merge_log().await?;

        if stale > 0 {
            warn!("⚠️ Reconciliación corrigió {} de {} placas", stale, tracked);
        } else {
            debug!("✅ Reconciliación sin diferencias ({} placas)", tracked);
        }
        Ok(stale)
    }

    /// Aplica el último evento de cada placa; devuelve (cambios, placas seguidas)
    async fn merge_log(&self) -> AppResult<(usize, usize)> {
        let mut plates = HashSet::new();
        for class in VehicleClass::ALL {
            plates.extend(self.events.distinct_plates(class).await?);
        }

        let mut latest_events = Vec::with_capacity(plates.len());
        for plate in &plates {
            if let Some(event) = self.events.latest(plate).await? {
                latest_events.push(event);
            }
        }

        let mut tracker = self.tracker.write().await;
        let changed = latest_events.iter().filter(|event| tracker.apply(event)).count();
        Ok((changed, tracker.tracked_plates()))
    }

    /// Reconciliación periódica en background
    pub async fn run_reconciliation(self: Arc<Self>, every: Duration) {
        info!("🔁 Reconciliación de ocupación cada {:?}", every);
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // El primer tick es inmediato; el arranque ya reconcilió
        interval.tick().await;

        loop {
            interval.tick().await;
            if let Err(e) = self.reconcile().await {
                error!("❌ Error reconciliando ocupación: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewEvent;
    use crate::repositories::InMemoryEventStore;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 7, 0, 0).unwrap() + ChronoDuration::minutes(minutes)
    }

    struct Fixture {
        store: Arc<InMemoryEventStore>,
        engine: OccupancyEngine,
    }

    impl Fixture {
        fn new(cars: u32, motorcycles: u32) -> Self {
            let store = Arc::new(InMemoryEventStore::new());
            let engine = OccupancyEngine::new(store.clone(), Capacities::new(cars, motorcycles));
            Self { store, engine }
        }

        /// Agrega al log y al tracker, como hace el registro de eventos
        async fn push(&self, plate: &str, class: VehicleClass, kind: EventKind, minutes: i64) -> GateEvent {
            let event = self.append_only(plate, class, kind, minutes).await;
            self.engine.record(&event).await;
            event
        }

        /// Agrega solo al log, simulando una actualización perdida
        async fn append_only(&self, plate: &str, class: VehicleClass, kind: EventKind, minutes: i64) -> GateEvent {
            self.store
                .append(NewEvent {
                    plate: Plate::from(plate),
                    vehicle_class: class,
                    kind,
                    timestamp: at(minutes),
                })
                .await
                .unwrap()
        }

        async fn assert_tracker_matches_log(&self) {
            let incremental = self.engine.availability().await;
            let recomputed = self.engine.recompute_availability().await.unwrap();
            assert!(
                incremental.same_counts(&recomputed),
                "tracker {:?} != log {:?}",
                incremental.classes,
                recomputed.classes
            );
        }
    }

    #[tokio::test]
    async fn empty_log_is_fully_available() {
        let fx = Fixture::new(24, 50);
        let snapshot = fx.engine.recompute_availability().await.unwrap();
        assert_eq!(snapshot.available(VehicleClass::Carro), 24);
        assert_eq!(snapshot.available(VehicleClass::Moto), 50);
        assert!(!fx.engine.is_inside(&Plate::from("ABC123")).await.unwrap());
        assert!(fx.engine.active_status(&Plate::from("ABC123")).await.unwrap().is_none());
        fx.assert_tracker_matches_log().await;
    }

    #[tokio::test]
    async fn over_capacity_floors_at_zero() {
        let fx = Fixture::new(24, 50);
        for i in 0..25 {
            fx.push(&format!("CAR{:03}", i), VehicleClass::Carro, EventKind::Entrada, i)
                .await;
        }

        let snapshot = fx.engine.availability().await;
        assert_eq!(snapshot.available(VehicleClass::Carro), 0);
        assert_eq!(snapshot.inside(VehicleClass::Carro), 25);
        assert_eq!(snapshot.available(VehicleClass::Moto), 50);
        fx.assert_tracker_matches_log().await;
    }

    #[tokio::test]
    async fn differently_formatted_plates_share_state() {
        let fx = Fixture::new(24, 50);
        fx.push("ABC-123", VehicleClass::Carro, EventKind::Entrada, 0).await;
        assert!(fx.engine.is_inside(&Plate::from("ABC123")).await.unwrap());

        fx.push("abc 123", VehicleClass::Carro, EventKind::Salida, 10).await;
        assert!(!fx.engine.is_inside(&Plate::from("ABC123")).await.unwrap());
        assert_eq!(fx.engine.availability().await.available(VehicleClass::Carro), 24);
        fx.assert_tracker_matches_log().await;
    }

    #[tokio::test]
    async fn duplicate_entrance_keeps_plate_inside_once() {
        let fx = Fixture::new(24, 50);
        fx.push("ABC123", VehicleClass::Carro, EventKind::Entrada, 0).await;
        fx.push("ABC123", VehicleClass::Carro, EventKind::Entrada, 5).await;

        assert!(fx.engine.is_inside(&Plate::from("ABC123")).await.unwrap());
        assert_eq!(fx.engine.availability().await.inside(VehicleClass::Carro), 1);
        fx.assert_tracker_matches_log().await;
    }

    #[tokio::test]
    async fn late_arriving_event_does_not_override_newer_one() {
        let fx = Fixture::new(24, 50);
        fx.push("ABC123", VehicleClass::Carro, EventKind::Salida, 30).await;
        // Llega después pero ocurrió antes
        fx.push("ABC123", VehicleClass::Carro, EventKind::Entrada, 10).await;

        assert!(!fx.engine.is_inside(&Plate::from("ABC123")).await.unwrap());
        assert_eq!(fx.engine.availability().await.inside(VehicleClass::Carro), 0);
        fx.assert_tracker_matches_log().await;
    }

    #[tokio::test]
    async fn equal_timestamps_resolve_by_insertion_order() {
        let fx = Fixture::new(24, 50);
        fx.push("ABC123", VehicleClass::Carro, EventKind::Entrada, 5).await;
        fx.push("ABC123", VehicleClass::Carro, EventKind::Salida, 5).await;
        assert!(!fx.engine.is_inside(&Plate::from("ABC123")).await.unwrap());

        fx.push("XYZ98B", VehicleClass::Moto, EventKind::Salida, 7).await;
        fx.push("XYZ98B", VehicleClass::Moto, EventKind::Entrada, 7).await;
        assert!(fx.engine.is_inside(&Plate::from("XYZ98B")).await.unwrap());
        fx.assert_tracker_matches_log().await;
    }

    #[tokio::test]
    async fn plate_counts_toward_class_of_its_latest_event() {
        let fx = Fixture::new(24, 50);
        fx.push("ABC123", VehicleClass::Carro, EventKind::Entrada, 0).await;
        fx.push("ABC123", VehicleClass::Moto, EventKind::Entrada, 5).await;

        let snapshot = fx.engine.availability().await;
        assert_eq!(snapshot.inside(VehicleClass::Carro), 0);
        assert_eq!(snapshot.inside(VehicleClass::Moto), 1);
        fx.assert_tracker_matches_log().await;
    }

    #[tokio::test]
    async fn active_status_reports_class_and_entrance_time() {
        let fx = Fixture::new(24, 50);
        fx.push("XYZ98B", VehicleClass::Moto, EventKind::Entrada, 15).await;

        let status = fx.engine.active_status(&Plate::from("xyz-98b")).await.unwrap().unwrap();
        assert_eq!(status.plate, Plate::from("XYZ98B"));
        assert_eq!(status.vehicle_class, VehicleClass::Moto);
        assert_eq!(status.entered_at, at(15));

        fx.push("XYZ98B", VehicleClass::Moto, EventKind::Salida, 40).await;
        assert!(fx.engine.active_status(&Plate::from("XYZ98B")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reconcile_repairs_missed_updates() {
        let fx = Fixture::new(24, 50);
        fx.push("AAA111", VehicleClass::Carro, EventKind::Entrada, 0).await;
        fx.append_only("BBB222", VehicleClass::Carro, EventKind::Entrada, 1).await;
        fx.append_only("AAA111", VehicleClass::Carro, EventKind::Salida, 2).await;
        fx.append_only("CCC33D", VehicleClass::Moto, EventKind::Entrada, 3).await;

        assert_eq!(fx.engine.availability().await.inside(VehicleClass::Carro), 1);

        let stale = fx.engine.reconcile().await.unwrap();
        assert_eq!(stale, 3);
        let snapshot = fx.engine.availability().await;
        assert_eq!(snapshot.inside(VehicleClass::Carro), 1);
        assert_eq!(snapshot.inside(VehicleClass::Moto), 1);
        fx.assert_tracker_matches_log().await;

        assert_eq!(fx.engine.reconcile().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn startup_load_is_not_reported_as_drift() {
        let fx = Fixture::new(24, 50);
        fx.append_only("AAA111", VehicleClass::Carro, EventKind::Entrada, 0).await;
        fx.append_only("BBB222", VehicleClass::Moto, EventKind::Entrada, 1).await;
        fx.append_only("AAA111", VehicleClass::Carro, EventKind::Salida, 2).await;

        assert_eq!(fx.engine.load_from_log().await.unwrap(), 2);
        assert_eq!(fx.engine.availability().await.inside(VehicleClass::Moto), 1);
        fx.assert_tracker_matches_log().await;

        assert_eq!(fx.engine.reconcile().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn tracker_is_independent_of_application_order() {
        let fx = Fixture::new(24, 50);
        let events = vec![
            fx.append_only("AAA111", VehicleClass::Carro, EventKind::Entrada, 0).await,
            fx.append_only("AAA111", VehicleClass::Carro, EventKind::Salida, 9).await,
            fx.append_only("BBB222", VehicleClass::Carro, EventKind::Entrada, 3).await,
            fx.append_only("CCC33D", VehicleClass::Moto, EventKind::Entrada, 4).await,
            fx.append_only("CCC33D", VehicleClass::Moto, EventKind::Entrada, 6).await,
            fx.append_only("BBB222", VehicleClass::Carro, EventKind::Salida, 2).await,
        ];

        let mut forward = OccupancyTracker::new();
        events.iter().for_each(|e| {
            forward.apply(e);
        });
        let mut backward = OccupancyTracker::new();
        events.iter().rev().for_each(|e| {
            backward.apply(e);
        });

        assert_eq!(forward.inside_counts(), backward.inside_counts());
        assert_eq!(forward.inside_counts().get(&VehicleClass::Carro), Some(&1));
        assert_eq!(forward.inside_counts().get(&VehicleClass::Moto), Some(&1));
    }

    #[tokio::test]
    async fn concurrent_registrations_are_all_counted() {
        let fx = Arc::new(Fixture::new(100, 100));
        let mut handles = Vec::new();
        for i in 0..40 {
            let fx = fx.clone();
            handles.push(tokio::spawn(async move {
                fx.push(&format!("CON{:03}", i), VehicleClass::Carro, EventKind::Entrada, i)
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(fx.engine.availability().await.inside(VehicleClass::Carro), 40);
        fx.assert_tracker_matches_log().await;
    }
}
