//! Difusión en vivo de la disponibilidad
//!
//! [`AvailabilityBroadcaster`] es un pub/sub en proceso sobre un canal
//! `tokio::sync::broadcast`. El registro de eventos publica una foto por cada
//! evento; cada suscriptor tiene un buffer acotado y, si se atrasa, pierde las
//! fotos más viejas en lugar de frenar al productor. `close` termina todas
//! las suscripciones para que el apagado no espere a clientes SSE abiertos.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use crate::models::AvailabilitySnapshot;

pub struct AvailabilityBroadcaster {
    sender: broadcast::Sender<AvailabilitySnapshot>,
    closed: watch::Sender<bool>,
    subscribers: Arc<AtomicUsize>,
}

impl AvailabilityBroadcaster {
    /// `buffer` es la cantidad de fotos pendientes por suscriptor
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        let (closed, _) = watch::channel(false);
        Self {
            sender,
            closed,
            subscribers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publica una foto a los suscriptores actuales; nunca bloquea.
    pub fn publish(&self, snapshot: AvailabilitySnapshot) {
        // Un error solo indica que no hay suscriptores
        let _ = self.sender.send(snapshot);
    }

    /// Nueva suscripción; se da de baja al soltarla.
    pub fn subscribe(&self) -> Subscription {
        let active = self.subscribers.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("📡 Nuevo suscriptor de disponibilidad ({} activos)", active);
        Subscription {
            receiver: self.sender.subscribe(),
            closed: self.closed.subscribe(),
            subscribers: self.subscribers.clone(),
        }
    }

    /// Cierra todas las suscripciones actuales y futuras
    pub fn close(&self) {
        self.closed.send_replace(true);
        debug!("📴 Difusión de disponibilidad cerrada");
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }
}

/// Suscripción a la disponibilidad en vivo
pub struct Subscription {
    receiver: broadcast::Receiver<AvailabilitySnapshot>,
    closed: watch::Receiver<bool>,
    subscribers: Arc<AtomicUsize>,
}

impl Subscription {
    /// Siguiente foto, saltando las que se perdieron por atraso.
    /// `None` cuando el broadcaster se cerró o se soltó.
    pub async fn next(&mut self) -> Option<AvailabilitySnapshot> {
        loop {
            if *self.closed.borrow() {
                return None;
            }
            tokio::select! {
                received = self.receiver.recv() => match received {
                    Ok(snapshot) => return Some(snapshot),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("🐢 Suscriptor atrasado, se omitieron {} fotos", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
                changed = self.closed.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let remaining = self.subscribers.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        debug!("🔌 Suscriptor desconectado ({} activos)", remaining);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Capacities, VehicleClass};
    use std::collections::BTreeMap;

    fn snapshot(cars_inside: u32) -> AvailabilitySnapshot {
        let mut inside = BTreeMap::new();
        inside.insert(VehicleClass::Carro, cars_inside);
        AvailabilitySnapshot::from_counts(&Capacities::default(), &inside)
    }

    #[tokio::test]
    async fn every_subscriber_receives_published_snapshots_in_order() {
        let broadcaster = AvailabilityBroadcaster::new(8);
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();

        broadcaster.publish(snapshot(1));
        broadcaster.publish(snapshot(2));

        for sub in [&mut first, &mut second] {
            assert_eq!(sub.next().await.unwrap().inside(VehicleClass::Carro), 1);
            assert_eq!(sub.next().await.unwrap().inside(VehicleClass::Carro), 2);
        }
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let broadcaster = AvailabilityBroadcaster::new(4);
        broadcaster.publish(snapshot(0));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_to_newest_without_blocking_producer() {
        let broadcaster = AvailabilityBroadcaster::new(2);
        let mut slow = broadcaster.subscribe();

        for i in 0..10 {
            broadcaster.publish(snapshot(i));
        }

        assert_eq!(slow.next().await.unwrap().inside(VehicleClass::Carro), 8);
        assert_eq!(slow.next().await.unwrap().inside(VehicleClass::Carro), 9);
    }

    #[tokio::test]
    async fn dropping_a_subscription_unsubscribes() {
        let broadcaster = AvailabilityBroadcaster::new(4);
        let first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        drop(first);
        assert_eq!(broadcaster.subscriber_count(), 1);

        broadcaster.publish(snapshot(3));
        assert_eq!(second.next().await.unwrap().inside(VehicleClass::Carro), 3);
    }

    #[tokio::test]
    async fn close_ends_pending_and_new_subscriptions() {
        let broadcaster = Arc::new(AvailabilityBroadcaster::new(4));
        let mut waiting = broadcaster.subscribe();

        let pending = tokio::spawn(async move { waiting.next().await });
        tokio::task::yield_now().await;
        broadcaster.close();

        assert!(pending.await.unwrap().is_none());
        assert!(broadcaster.subscribe().next().await.is_none());
    }

    #[tokio::test]
    async fn closed_broadcaster_ends_subscription() {
        let broadcaster = AvailabilityBroadcaster::new(4);
        let mut sub = broadcaster.subscribe();
        drop(broadcaster);
        assert!(sub.next().await.is_none());
    }
}
