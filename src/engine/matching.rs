use crate::engine::locations::DriverState;
use crate::geo::{eta_minutes, haversine_km};
use crate::models::location::GeoPoint;
use crate::models::user::UserId;

/// Closest eligible driver for a pickup.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverMatch {
    pub driver_id: UserId,
    pub location: GeoPoint,
    pub distance_km: f64,
}

impl DriverMatch {
    pub fn eta_minutes(&self) -> u32 {
        eta_minutes(self.distance_km)
    }
}

/// Picks the available driver with a known location nearest to `pickup`.
///
/// Ties go to whichever candidate is seen first, so callers must not rely on
/// which of two equidistant drivers wins.
pub fn find_nearest_available<'a, I>(pickup: &GeoPoint, candidates: I) -> Option<DriverMatch>
where
    I: IntoIterator<Item = (&'a UserId, &'a DriverState)>,
{
    let mut best: Option<DriverMatch> = None;

    for (driver_id, driver) in candidates {
        if !driver.available {
            continue;
        }
        let Some(location) = driver.location else {
            continue;
        };

        let distance_km = haversine_km(pickup, &location);
        let closer = best
            .as_ref()
            .is_none_or(|current| distance_km < current.distance_km);

        if closer {
            best = Some(DriverMatch {
                driver_id: driver_id.clone(),
                location,
                distance_km,
            });
        }
    }

    best
}
