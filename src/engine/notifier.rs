use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::engine::registry::ConnectionRegistry;
use crate::models::events::{
    DriverLocationPayload, DriverStatusPayload, NoDriversPayload, ServerEvent,
};
use crate::models::location::GeoPoint;
use crate::models::ride::{Assignment, RideStatus};
use crate::models::user::{ConnectionId, Role};
use crate::observability::metrics::Metrics;

pub type Outbox = mpsc::Sender<ServerEvent>;

/// Outbound side of every live socket.
///
/// Delivery never waits: a full or closed outbox loses that one message.
pub struct Notifier {
    outboxes: DashMap<ConnectionId, Outbox>,
    metrics: Metrics,
}

impl Notifier {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            outboxes: DashMap::new(),
            metrics,
        }
    }

    pub fn attach(&self, connection: ConnectionId, outbox: Outbox) {
        self.outboxes.insert(connection, outbox);
    }

    pub fn detach(&self, connection: ConnectionId) {
        self.outboxes.remove(&connection);
    }

    pub fn connections(&self) -> usize {
        self.outboxes.len()
    }

    pub fn send(&self, connection: ConnectionId, event: ServerEvent) -> bool {
        let Some(outbox) = self
            .outboxes
            .get(&connection)
            .map(|entry| entry.value().clone())
        else {
            debug!(connection_id = %connection, "no outbox for connection");
            self.dropped("unresolved");
            return false;
        };

        match outbox.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(connection_id = %connection, "outbox full; dropping message");
                self.dropped("full");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(connection_id = %connection, "outbox closed");
                self.dropped("closed");
                false
            }
        }
    }

    /// Location fan-out to every rider, without any distance filter.
    pub fn notify_driver_location(
        &self,
        registry: &ConnectionRegistry,
        driver_id: &str,
        location: GeoPoint,
    ) {
        let event = ServerEvent::DriverLocationUpdate(DriverLocationPayload {
            driver_id: driver_id.to_string(),
            location,
        });

        for connection in registry.connections_with_role(Role::Rider) {
            self.send(connection, event.clone());
        }
    }

    pub fn notify_assignment(&self, registry: &ConnectionRegistry, assignment: &Assignment) {
        match registry.resolve(&assignment.rider_id) {
            Some(connection) => {
                self.send(connection, ServerEvent::RideAssigned(assignment.clone()));
            }
            None => self.unresolved(&assignment.rider_id),
        }

        match registry.resolve(&assignment.driver_id) {
            Some(connection) => {
                self.send(connection, ServerEvent::RideAccepted(assignment.clone()));
            }
            None => self.unresolved(&assignment.driver_id),
        }
    }

    pub fn notify_no_drivers(&self, registry: &ConnectionRegistry, rider_id: &str, ride_id: &str) {
        match registry.resolve(rider_id) {
            Some(connection) => {
                self.send(
                    connection,
                    ServerEvent::NoDriversAvailable(NoDriversPayload {
                        ride_id: ride_id.to_string(),
                    }),
                );
            }
            None => self.unresolved(rider_id),
        }
    }

    /// Status fan-out to every live connection.
    pub fn notify_status(&self, driver_id: &str, ride_id: &str, status: &RideStatus) {
        let event = ServerEvent::DriverStatusUpdate(DriverStatusPayload {
            driver_id: driver_id.to_string(),
            ride_id: ride_id.to_string(),
            status: status.clone(),
        });

        let connections: Vec<ConnectionId> =
            self.outboxes.iter().map(|entry| *entry.key()).collect();
        for connection in connections {
            self.send(connection, event.clone());
        }
    }

    fn unresolved(&self, user_id: &str) {
        debug!(user_id, "notification target not connected");
        self.dropped("unresolved");
    }

    fn dropped(&self, reason: &str) {
        self.metrics
            .notifications_dropped_total
            .with_label_values(&[reason])
            .inc();
    }
}
