use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::location::GeoPoint;
use crate::models::user::UserId;

pub type RideId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideRequest {
    pub ride_id: RideId,
    pub rider_id: UserId,
    pub pickup: GeoPoint,
    pub destination: GeoPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub ride_id: RideId,
    pub rider_id: UserId,
    pub driver_id: UserId,
    pub driver_location: GeoPoint,
    #[serde(rename = "etaMin")]
    pub eta_minutes: u32,
}

/// Ride lifecycle. Drivers may report any value; unknown ones are kept verbatim
/// in `Other` and forwarded unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RideStatus {
    Requested,
    Assigned,
    Accepted,
    Arriving,
    PickedUp,
    Completed,
    Rejected,
    Cancelled,
    Other(String),
}

impl RideStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RideStatus::Requested => "requested",
            RideStatus::Assigned => "assigned",
            RideStatus::Accepted => "accepted",
            RideStatus::Arriving => "arriving",
            RideStatus::PickedUp => "picked",
            RideStatus::Completed => "completed",
            RideStatus::Rejected => "rejected",
            RideStatus::Cancelled => "cancelled",
            RideStatus::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for RideStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "requested" => RideStatus::Requested,
            "assigned" => RideStatus::Assigned,
            "accepted" => RideStatus::Accepted,
            "arriving" => RideStatus::Arriving,
            "picked" => RideStatus::PickedUp,
            "completed" => RideStatus::Completed,
            "rejected" => RideStatus::Rejected,
            "cancelled" => RideStatus::Cancelled,
            _ => RideStatus::Other(raw),
        }
    }
}

impl From<RideStatus> for String {
    fn from(status: RideStatus) -> Self {
        match status {
            RideStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The assignment a driver is currently serving.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveRide {
    pub assignment: Assignment,
    pub status: RideStatus,
    pub assigned_at: DateTime<Utc>,
}
