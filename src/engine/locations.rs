use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;

use crate::models::location::GeoPoint;
use crate::models::ride::{ActiveRide, Assignment, RideStatus};
use crate::models::user::UserId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverState {
    pub location: Option<GeoPoint>,
    pub available: bool,
    pub active_ride: Option<ActiveRide>,
}

impl Default for DriverState {
    fn default() -> Self {
        Self {
            location: None,
            available: true,
            active_ride: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderState {
    pub location: Option<GeoPoint>,
}

/// Latest known position per driver and rider, plus driver availability.
///
/// No timestamps are kept: a driver that stops reporting stays eligible.
#[derive(Debug, Default)]
pub struct LocationStore {
    drivers: HashMap<UserId, DriverState>,
    riders: HashMap<UserId, RiderState>,
}

impl LocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates driver state if missing. Existing location and availability survive.
    pub fn ensure_driver(&mut self, driver_id: &str) {
        if !self.drivers.contains_key(driver_id) {
            self.drivers.insert(driver_id.to_string(), DriverState::default());
        }
    }

    pub fn ensure_rider(&mut self, rider_id: &str) {
        if !self.riders.contains_key(rider_id) {
            self.riders.insert(rider_id.to_string(), RiderState::default());
        }
    }

    pub fn update_driver_location(&mut self, driver_id: &str, location: GeoPoint) {
        self.drivers
            .entry(driver_id.to_string())
            .or_default()
            .location = Some(location);
    }

    pub fn update_rider_location(&mut self, rider_id: &str, location: GeoPoint) {
        self.riders
            .entry(rider_id.to_string())
            .or_default()
            .location = Some(location);
    }

    pub fn driver(&self, driver_id: &str) -> Option<&DriverState> {
        self.drivers.get(driver_id)
    }

    pub fn rider(&self, rider_id: &str) -> Option<&RiderState> {
        self.riders.get(rider_id)
    }

    pub fn drivers(&self) -> impl Iterator<Item = (&UserId, &DriverState)> {
        self.drivers.iter()
    }

    /// Owned copy of every available driver with a known position.
    pub fn available_drivers_with_location(&self) -> Vec<(UserId, GeoPoint)> {
        self.drivers
            .iter()
            .filter(|(_, driver)| driver.available)
            .filter_map(|(id, driver)| driver.location.map(|location| (id.clone(), location)))
            .collect()
    }

    /// Number of drivers `available_drivers_with_location` would return.
    pub fn matchable_count(&self) -> usize {
        self.drivers
            .values()
            .filter(|driver| driver.available && driver.location.is_some())
            .count()
    }

    /// Hands `assignment` to its driver and marks the driver unavailable.
    /// Returns false when the driver is unknown or already busy.
    pub fn claim_driver(&mut self, assignment: Assignment) -> bool {
        let Some(driver) = self.drivers.get_mut(&assignment.driver_id) else {
            return false;
        };
        if !driver.available || driver.active_ride.is_some() {
            return false;
        }

        driver.available = false;
        driver.active_ride = Some(ActiveRide {
            assignment,
            status: RideStatus::Assigned,
            assigned_at: Utc::now(),
        });
        true
    }

    /// Marks the driver available again and returns the ride it was serving.
    pub fn release_driver(&mut self, driver_id: &str) -> Option<ActiveRide> {
        let driver = self.drivers.get_mut(driver_id)?;
        driver.available = true;
        driver.active_ride.take()
    }

    /// Records a non-terminal status on the driver's ride when the ride id matches.
    pub fn set_ride_status(&mut self, driver_id: &str, ride_id: &str, status: RideStatus) -> bool {
        match self
            .drivers
            .get_mut(driver_id)
            .and_then(|driver| driver.active_ride.as_mut())
        {
            Some(ride) if ride.assignment.ride_id == ride_id => {
                ride.status = status;
                true
            }
            _ => false,
        }
    }

    pub fn remove_driver(&mut self, driver_id: &str) -> Option<DriverState> {
        self.drivers.remove(driver_id)
    }

    pub fn remove_rider(&mut self, rider_id: &str) -> Option<RiderState> {
        self.riders.remove(rider_id)
    }
}

#[cfg(test)]
mod tests {
    use super::LocationStore;
    use crate::models::location::GeoPoint;
    use crate::models::ride::{Assignment, RideStatus};

    fn assignment(ride_id: &str, driver_id: &str) -> Assignment {
        Assignment {
            ride_id: ride_id.to_string(),
            rider_id: "r1".to_string(),
            driver_id: driver_id.to_string(),
            driver_location: GeoPoint::new(0.0, 0.0),
            eta_minutes: 1,
        }
    }

    #[test]
    fn location_update_keeps_availability() {
        let mut store = LocationStore::new();
        store.ensure_driver("d1");
        store.update_driver_location("d1", GeoPoint::new(0.0, 0.0));
        assert!(store.claim_driver(assignment("ride-1", "d1")));

        store.update_driver_location("d1", GeoPoint::new(1.0, 1.0));

        let driver = store.driver("d1").unwrap();
        assert!(!driver.available);
        assert_eq!(driver.location, Some(GeoPoint::new(1.0, 1.0)));
    }

    #[test]
    fn rider_location_is_upserted() {
        let mut store = LocationStore::new();
        store.update_rider_location("r1", GeoPoint::new(3.0, 4.0));
        assert_eq!(store.rider("r1").unwrap().location, Some(GeoPoint::new(3.0, 4.0)));

        store.ensure_rider("r1");
        assert_eq!(store.rider("r1").unwrap().location, Some(GeoPoint::new(3.0, 4.0)));

        assert!(store.remove_rider("r1").is_some());
        assert!(store.rider("r1").is_none());
    }

    #[test]
    fn ensure_driver_does_not_reset_state() {
        let mut store = LocationStore::new();
        store.ensure_driver("d1");
        store.update_driver_location("d1", GeoPoint::new(2.0, 2.0));
        store.claim_driver(assignment("ride-1", "d1"));

        store.ensure_driver("d1");

        let driver = store.driver("d1").unwrap();
        assert_eq!(driver.location, Some(GeoPoint::new(2.0, 2.0)));
        assert!(!driver.available);
    }

    #[test]
    fn snapshot_only_lists_available_drivers_with_location() {
        let mut store = LocationStore::new();
        store.ensure_driver("no-location");
        store.update_driver_location("busy", GeoPoint::new(0.0, 0.0));
        store.claim_driver(assignment("ride-1", "busy"));
        store.update_driver_location("free", GeoPoint::new(1.0, 0.0));

        let snapshot = store.available_drivers_with_location();
        assert_eq!(snapshot, vec![("free".to_string(), GeoPoint::new(1.0, 0.0))]);
        assert_eq!(store.matchable_count(), snapshot.len());
    }

    #[test]
    fn busy_driver_cannot_be_claimed_twice() {
        let mut store = LocationStore::new();
        store.update_driver_location("d1", GeoPoint::new(0.0, 0.0));

        assert!(store.claim_driver(assignment("ride-1", "d1")));
        assert!(!store.claim_driver(assignment("ride-2", "d1")));
        assert!(!store.claim_driver(assignment("ride-3", "ghost")));
    }

    #[test]
    fn release_returns_ride_once() {
        let mut store = LocationStore::new();
        store.update_driver_location("d1", GeoPoint::new(0.0, 0.0));
        store.claim_driver(assignment("ride-1", "d1"));

        let ride = store.release_driver("d1").unwrap();
        assert_eq!(ride.assignment.ride_id, "ride-1");
        assert!(store.driver("d1").unwrap().available);
        assert!(store.release_driver("d1").is_none());
    }

    #[test]
    fn status_only_applies_to_matching_ride() {
        let mut store = LocationStore::new();
        store.update_driver_location("d1", GeoPoint::new(0.0, 0.0));
        store.claim_driver(assignment("ride-1", "d1"));

        assert!(!store.set_ride_status("d1", "ride-9", RideStatus::Arriving));
        assert!(store.set_ride_status("d1", "ride-1", RideStatus::Arriving));

        let ride = store.driver("d1").unwrap().active_ride.as_ref().unwrap();
        assert_eq!(ride.status, RideStatus::Arriving);
    }
}
