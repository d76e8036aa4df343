//! Wire messages exchanged over a client socket.
//!
//! Every frame is a JSON object `{"event": "<name>", "data": {...}}`.

use serde::{Deserialize, Serialize};

use crate::models::location::GeoPoint;
use crate::models::ride::{Assignment, RideId, RideRequest, RideStatus};
use crate::models::user::{Role, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub user_id: UserId,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocationPayload {
    pub driver_id: UserId,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderLocationPayload {
    pub rider_id: UserId,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverStatusPayload {
    pub driver_id: UserId,
    pub ride_id: RideId,
    pub status: RideStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoDriversPayload {
    pub ride_id: RideId,
}

/// Client to service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    Register(RegisterPayload),
    DriverLocation(DriverLocationPayload),
    RiderLocation(RiderLocationPayload),
    RequestRide(RideRequest),
    DriverUpdate(DriverStatusPayload),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Register(_) => "register",
            ClientEvent::DriverLocation(_) => "driverLocation",
            ClientEvent::RiderLocation(_) => "riderLocation",
            ClientEvent::RequestRide(_) => "requestRide",
            ClientEvent::DriverUpdate(_) => "driverUpdate",
        }
    }
}

/// Service to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    DriverLocationUpdate(DriverLocationPayload),
    RideAssigned(Assignment),
    RideAccepted(Assignment),
    NoDriversAvailable(NoDriversPayload),
    DriverStatusUpdate(DriverStatusPayload),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ClientEvent, ServerEvent};
    use crate::models::location::GeoPoint;
    use crate::models::ride::{Assignment, RideStatus};
    use crate::models::user::Role;

    #[test]
    fn parses_register_frame() {
        let frame = json!({
            "event": "register",
            "data": { "userId": "d1", "role": "driver" }
        });

        match serde_json::from_value::<ClientEvent>(frame).unwrap() {
            ClientEvent::Register(payload) => {
                assert_eq!(payload.user_id, "d1");
                assert_eq!(payload.role, Role::Driver);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn parses_request_ride_frame() {
        let frame = json!({
            "event": "requestRide",
            "data": {
                "rideId": "ride-1",
                "riderId": "r1",
                "pickup": { "lat": 1.0, "lng": 2.0 },
                "destination": { "lat": 3.0, "lng": 4.0 }
            }
        });

        match serde_json::from_value::<ClientEvent>(frame).unwrap() {
            ClientEvent::RequestRide(request) => {
                assert_eq!(request.ride_id, "ride-1");
                assert_eq!(request.pickup, GeoPoint::new(1.0, 2.0));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn driver_update_accepts_any_status() {
        let frame = json!({
            "event": "driverUpdate",
            "data": { "driverId": "d1", "rideId": "ride-1", "status": "picked" }
        });

        match serde_json::from_value::<ClientEvent>(frame).unwrap() {
            ClientEvent::DriverUpdate(update) => assert_eq!(update.status, RideStatus::PickedUp),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn missing_fields_are_rejected() {
        let frame = json!({ "event": "requestRide", "data": { "rideId": "ride-1" } });
        assert!(serde_json::from_value::<ClientEvent>(frame).is_err());

        let frame = json!({ "event": "register", "data": { "userId": "x", "role": "pilot" } });
        assert!(serde_json::from_value::<ClientEvent>(frame).is_err());
    }

    #[test]
    fn assignment_uses_eta_min_on_the_wire() {
        let event = ServerEvent::RideAssigned(Assignment {
            ride_id: "ride-1".to_string(),
            rider_id: "r1".to_string(),
            driver_id: "d1".to_string(),
            driver_location: GeoPoint::new(0.0, 0.0),
            eta_minutes: 4,
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "rideAssigned");
        assert_eq!(value["data"]["etaMin"], 4);
        assert_eq!(value["data"]["driverLocation"]["lat"], 0.0);
        assert_eq!(value["data"]["driverId"], "d1");
    }
}
