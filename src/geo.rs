//! Great-circle distance and walking-time conversion

use haversine::{Location as HaversineLocation, Units, distance};

use crate::models::Coordinates;

/// Average adult-with-child walking pace
pub const WALKING_KMH: f64 = 3.8;

/// Great-circle distance between two points in kilometers
#[must_use]
pub fn distance_km(from: Coordinates, to: Coordinates) -> f64 {
    let from_haversine = HaversineLocation {
        latitude: from.lat,
        longitude: from.lng,
    };
    let to_haversine = HaversineLocation {
        latitude: to.lat,
        longitude: to.lng,
    };
    distance(from_haversine, to_haversine, Units::Kilometers)
}

/// Minutes of walking needed to cover the given distance
#[must_use]
pub fn travel_minutes(distance_km: f64) -> f64 {
    (distance_km / WALKING_KMH) * 60.0
}

/// Latitude within [-90, 90] and longitude within [-180, 180]
#[must_use]
pub fn is_valid_lat_lng(lat: f64, lng: f64) -> bool {
    lat.is_finite() && lng.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn point(lat: f64, lng: f64) -> Coordinates {
        Coordinates { lat, lng }
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = point(37.5715, 126.978);
        let b = point(37.574, 126.976);
        assert!((distance_km(a, b) - distance_km(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_distance_zero_for_identical_points() {
        let a = point(37.5715, 126.978);
        assert_eq!(distance_km(a, a), 0.0);
    }

    #[test]
    fn test_known_distance() {
        // Seoul City Hall to Gwanghwamun is roughly 1 km as the crow flies
        let city_hall = point(37.5663, 126.9779);
        let gwanghwamun = point(37.5759, 126.9768);
        let km = distance_km(city_hall, gwanghwamun);
        assert!(km > 0.9 && km < 1.2, "got {km}");
    }

    #[test]
    fn test_travel_minutes() {
        assert!((travel_minutes(3.8) - 60.0).abs() < 1e-9);
        assert_eq!(travel_minutes(0.0), 0.0);
    }

    #[rstest]
    #[case(0.0, 0.0, true)]
    #[case(90.0, 180.0, true)]
    #[case(-90.0, -180.0, true)]
    #[case(90.1, 0.0, false)]
    #[case(0.0, 180.1, false)]
    #[case(f64::NAN, 0.0, false)]
    fn test_lat_lng_validity(#[case] lat: f64, #[case] lng: f64, #[case] expected: bool) {
        assert_eq!(is_valid_lat_lng(lat, lng), expected);
    }
}
