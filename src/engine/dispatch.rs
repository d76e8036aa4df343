use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::engine::locations::LocationStore;
use crate::engine::matching::find_nearest_available;
use crate::engine::notifier::Notifier;
use crate::engine::registry::ConnectionRegistry;
use crate::error::AppError;
use crate::models::events::{
    ClientEvent, DriverLocationPayload, DriverStatusPayload, RegisterPayload, RiderLocationPayload,
};
use crate::models::location::GeoPoint;
use crate::models::ride::{ActiveRide, Assignment, RideId, RideRequest, RideStatus};
use crate::models::user::{ConnectionId, Role, UserId};
use crate::observability::metrics::Metrics;
use crate::state::AppState;

/// Work items for the dispatch engine. Sockets and HTTP handlers only ever
/// talk to the dispatcher through these.
#[derive(Debug)]
pub enum Command {
    Event {
        connection_id: ConnectionId,
        event: ClientEvent,
    },
    Disconnected {
        connection_id: ConnectionId,
    },
    Snapshot {
        reply: oneshot::Sender<DispatchSnapshot>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverView {
    pub driver_id: UserId,
    pub location: Option<GeoPoint>,
    pub available: bool,
    pub connected: bool,
    pub ride_id: Option<RideId>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSnapshot {
    pub drivers: Vec<DriverView>,
    pub rides: Vec<ActiveRide>,
    pub users: usize,
}

pub async fn run_dispatch_engine(state: Arc<AppState>, mut command_rx: mpsc::Receiver<Command>) {
    info!("dispatch engine started");

    let mut dispatcher = Dispatcher::new(state.notifier.clone(), state.metrics.clone());

    while let Some(command) = command_rx.recv().await {
        if let Err(err) = dispatcher.handle(command) {
            match &err {
                AppError::NoCapacity(ride_id) => {
                    info!(ride_id = %ride_id, "ride rejected: no drivers available");
                }
                AppError::UnresolvedIdentity(_) => {
                    debug!(error = %err, "event dropped");
                    dispatcher.dropped("unresolved");
                }
                AppError::MalformedEvent(_) => {
                    warn!(error = %err, "event dropped");
                    dispatcher.dropped("malformed");
                }
                _ => error!(error = %err, "failed to handle command"),
            }
        }
    }

    warn!("dispatch engine stopped: command channel closed");
}

/// Single owner of registry, locations and ride state.
///
/// Every method takes `&mut self`, so matching a driver and flipping its
/// availability can never interleave with another request.
pub struct Dispatcher {
    registry: ConnectionRegistry,
    locations: LocationStore,
    notifier: Arc<Notifier>,
    metrics: Metrics,
}

impl Dispatcher {
    pub fn new(notifier: Arc<Notifier>, metrics: Metrics) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            locations: LocationStore::new(),
            notifier,
            metrics,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn locations(&self) -> &LocationStore {
        &self.locations
    }

    pub fn handle(&mut self, command: Command) -> Result<(), AppError> {
        match command {
            Command::Event {
                connection_id,
                event,
            } => {
                self.metrics
                    .events_total
                    .with_label_values(&[event.name()])
                    .inc();
                self.handle_event(connection_id, event)
            }
            Command::Disconnected { connection_id } => {
                self.disconnect(connection_id);
                Ok(())
            }
            Command::Snapshot { reply } => {
                // The caller may have given up waiting.
                let _ = reply.send(self.snapshot());
                Ok(())
            }
        }
    }

    pub fn handle_event(
        &mut self,
        connection_id: ConnectionId,
        event: ClientEvent,
    ) -> Result<(), AppError> {
        match event {
            ClientEvent::Register(payload) => self.register(connection_id, payload),
            ClientEvent::DriverLocation(payload) => self.update_driver_location(payload),
            ClientEvent::RiderLocation(payload) => self.update_rider_location(payload),
            ClientEvent::RequestRide(request) => self.request_ride(request).map(|_| ()),
            ClientEvent::DriverUpdate(update) => self.report_status(update),
        }
    }

    pub fn register(
        &mut self,
        connection_id: ConnectionId,
        payload: RegisterPayload,
    ) -> Result<(), AppError> {
        if payload.user_id.is_empty() {
            return Err(AppError::MalformedEvent("userId cannot be empty".to_string()));
        }

        let registration = self
            .registry
            .register(connection_id, payload.user_id.clone(), payload.role);

        if let Some(displaced) = registration.displaced {
            info!(
                connection_id = %connection_id,
                user_id = %displaced.id,
                "connection rebound; previous identity released"
            );
            self.forget(&displaced.id, displaced.role);
        }
        if let Some(previous) = registration.previous_role {
            self.forget(&payload.user_id, previous);
        }

        match payload.role {
            Role::Driver => self.locations.ensure_driver(&payload.user_id),
            Role::Rider => self.locations.ensure_rider(&payload.user_id),
        }
        self.refresh_available_gauge();

        info!(
            connection_id = %connection_id,
            user_id = %payload.user_id,
            role = ?payload.role,
            "user registered"
        );
        Ok(())
    }

    pub fn update_driver_location(
        &mut self,
        payload: DriverLocationPayload,
    ) -> Result<(), AppError> {
        if !self.registry.is_registered_as(&payload.driver_id, Role::Driver) {
            return Err(AppError::UnresolvedIdentity(format!(
                "driver {} is not registered",
                payload.driver_id
            )));
        }

        self.locations
            .update_driver_location(&payload.driver_id, payload.location);
        self.refresh_available_gauge();
        self.notifier
            .notify_driver_location(&self.registry, &payload.driver_id, payload.location);

        Ok(())
    }

    pub fn update_rider_location(&mut self, payload: RiderLocationPayload) -> Result<(), AppError> {
        if !self.registry.is_registered_as(&payload.rider_id, Role::Rider) {
            return Err(AppError::UnresolvedIdentity(format!(
                "rider {} is not registered",
                payload.rider_id
            )));
        }

        self.locations
            .update_rider_location(&payload.rider_id, payload.location);
        Ok(())
    }

    /// Matches the request to the nearest available driver and claims it.
    ///
    /// A rejection is reported to the rider and returned as `NoCapacity`;
    /// nothing is kept for it.
    pub fn request_ride(&mut self, request: RideRequest) -> Result<Assignment, AppError> {
        if !self.registry.is_registered_as(&request.rider_id, Role::Rider) {
            return Err(AppError::UnresolvedIdentity(format!(
                "rider {} is not registered",
                request.rider_id
            )));
        }

        let start = Instant::now();
        let Some(found) = find_nearest_available(&request.pickup, self.locations.drivers()) else {
            self.record_request("rejected", start);
            self.notifier
                .notify_no_drivers(&self.registry, &request.rider_id, &request.ride_id);
            return Err(AppError::NoCapacity(request.ride_id));
        };

        let assignment = Assignment {
            ride_id: request.ride_id,
            rider_id: request.rider_id,
            driver_id: found.driver_id.clone(),
            driver_location: found.location,
            eta_minutes: found.eta_minutes(),
        };

        if !self.locations.claim_driver(assignment.clone()) {
            self.record_request("error", start);
            return Err(AppError::Internal(format!(
                "matched driver {} could not be claimed",
                found.driver_id
            )));
        }
        self.record_request("assigned", start);
        self.refresh_available_gauge();

        self.notifier.notify_assignment(&self.registry, &assignment);

        info!(
            ride_id = %assignment.ride_id,
            rider_id = %assignment.rider_id,
            driver_id = %assignment.driver_id,
            distance_km = found.distance_km,
            eta_min = assignment.eta_minutes,
            "ride assigned"
        );

        Ok(assignment)
    }

    /// Forwards a driver-reported status. Transitions are not checked against
    /// the current status; `completed` always frees the driver.
    pub fn report_status(&mut self, update: DriverStatusPayload) -> Result<(), AppError> {
        if !self.registry.is_registered_as(&update.driver_id, Role::Driver) {
            return Err(AppError::UnresolvedIdentity(format!(
                "driver {} is not registered",
                update.driver_id
            )));
        }

        self.notifier
            .notify_status(&update.driver_id, &update.ride_id, &update.status);

        if update.status == RideStatus::Completed {
            match self.locations.release_driver(&update.driver_id) {
                Some(ride) if ride.assignment.ride_id == update.ride_id => {
                    info!(
                        ride_id = %update.ride_id,
                        driver_id = %update.driver_id,
                        "ride completed"
                    );
                }
                Some(ride) => {
                    warn!(
                        ride_id = %update.ride_id,
                        active_ride_id = %ride.assignment.ride_id,
                        driver_id = %update.driver_id,
                        "completion for a different ride; driver released anyway"
                    );
                }
                None => {
                    debug!(
                        ride_id = %update.ride_id,
                        driver_id = %update.driver_id,
                        "completion without active ride; driver marked available"
                    );
                }
            }
            self.refresh_available_gauge();
        } else if !self
            .locations
            .set_ride_status(&update.driver_id, &update.ride_id, update.status.clone())
        {
            debug!(
                ride_id = %update.ride_id,
                driver_id = %update.driver_id,
                status = %update.status,
                "status for unknown ride forwarded"
            );
        }

        Ok(())
    }

    /// Drops the identity bound to `connection_id`. Rides it was part of are
    /// left as they are.
    pub fn disconnect(&mut self, connection_id: ConnectionId) {
        let Some(user) = self.registry.unregister(connection_id) else {
            debug!(connection_id = %connection_id, "anonymous connection closed");
            return;
        };

        self.forget(&user.id, user.role);
        self.refresh_available_gauge();
        info!(connection_id = %connection_id, user_id = %user.id, "user disconnected");
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        let mut drivers: Vec<DriverView> = self
            .locations
            .drivers()
            .map(|(id, driver)| DriverView {
                driver_id: id.clone(),
                location: driver.location,
                available: driver.available,
                connected: self.registry.resolve(id).is_some(),
                ride_id: driver
                    .active_ride
                    .as_ref()
                    .map(|ride| ride.assignment.ride_id.clone()),
            })
            .collect();
        drivers.sort_by(|a, b| a.driver_id.cmp(&b.driver_id));

        let mut rides: Vec<ActiveRide> = self
            .locations
            .drivers()
            .filter_map(|(_, driver)| driver.active_ride.clone())
            .collect();
        rides.sort_by(|a, b| a.assigned_at.cmp(&b.assigned_at));

        DispatchSnapshot {
            drivers,
            rides,
            users: self.registry.len(),
        }
    }

    fn forget(&mut self, user_id: &str, role: Role) {
        match role {
            Role::Driver => {
                if let Some(ride) = self
                    .locations
                    .remove_driver(user_id)
                    .and_then(|driver| driver.active_ride)
                {
                    warn!(
                        driver_id = user_id,
                        ride_id = %ride.assignment.ride_id,
                        "driver left with an unresolved ride"
                    );
                }
            }
            Role::Rider => {
                self.locations.remove_rider(user_id);
            }
        }
    }

    fn record_request(&self, outcome: &str, start: Instant) {
        self.metrics
            .match_latency_seconds
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());
        self.metrics
            .ride_requests_total
            .with_label_values(&[outcome])
            .inc();
    }

    fn refresh_available_gauge(&self) {
        let available = self.locations.matchable_count();
        self.metrics.available_drivers.set(available as i64);
    }

    fn dropped(&self, reason: &str) {
        self.metrics
            .events_dropped_total
            .with_label_values(&[reason])
            .inc();
    }
}
