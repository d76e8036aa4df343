use crate::models::location::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Minutes of driving per straight-line kilometre (roughly 20 km/h in town).
const MINUTES_PER_KM: f64 = 3.0;

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + sin_lng * sin_lng * lat1.cos() * lat2.cos();
    let central_angle = 2.0 * haversine.sqrt().atan2((1.0 - haversine).sqrt());

    EARTH_RADIUS_KM * central_angle
}

/// Straight-line pickup estimate. Never below one minute.
pub fn eta_minutes(distance_km: f64) -> u32 {
    (distance_km.max(0.0) * MINUTES_PER_KM).round() as u32 + 1
}
