//! Canonicalizes raw provider records into `Place` entities
//!
//! Rejection happens here, at the boundary: records without a usable
//! coordinate or matching the base exclusion lists never reach the engine.

use crate::config::SearchConfig;
use crate::geo;
use crate::keywords;
use crate::models::{
    Coordinates, KID_AGE_MAX_MONTHS, KID_AGE_MIN_MONTHS, Place, RawPlaceRecord,
};
use crate::text::{strip_html, to_https_url};

/// Searched places carry no per-venue stay estimate; the planner assumes a
/// typical visit until the presentation layer refines it.
pub const DEFAULT_STAY_MINUTES: u32 = 40;

/// Scale divisor for provider integer map coordinates
const MAP_COORD_SCALE: f64 = 10_000_000.0;

/// Derive WGS84 coordinates from a raw record, trying in order: explicit
/// lat/lng, scaled integer map coordinates, then the raw pair as-is.
#[must_use]
pub fn coords_from_record(raw: &RawPlaceRecord) -> Option<Coordinates> {
    if let (Some(lat), Some(lng)) = (raw.lat, raw.lng) {
        if geo::is_valid_lat_lng(lat, lng) {
            return Some(Coordinates::new(lat, lng));
        }
    }

    let mapx: f64 = raw.mapx.trim().parse().ok()?;
    let mapy: f64 = raw.mapy.trim().parse().ok()?;
    if !mapx.is_finite() || !mapy.is_finite() {
        return None;
    }

    let scaled = Coordinates::new(mapy / MAP_COORD_SCALE, mapx / MAP_COORD_SCALE);
    if scaled.is_valid() {
        return Some(scaled);
    }

    let raw_pair = Coordinates::new(mapy, mapx);
    if raw_pair.is_valid() {
        return Some(raw_pair);
    }

    None
}

/// Dedup key across repeated fetches of the same raw record
#[must_use]
pub fn record_dedup_key(raw: &RawPlaceRecord) -> String {
    format!(
        "{}|{}|{}|{}",
        strip_html(&raw.title).trim(),
        strip_html(&raw.road_address).trim(),
        raw.mapx.trim(),
        raw.mapy.trim()
    )
}

/// Normalize one raw provider record into a canonical `Place`.
///
/// Returns `None` when the record has no usable title or coordinate, or when
/// its base text matches the exclusion lists.
#[must_use]
pub fn normalize_record(
    raw: &RawPlaceRecord,
    id: impl Into<String>,
    origin: Option<Coordinates>,
) -> Option<Place> {
    let title = strip_html(&raw.title).trim().to_string();
    if title.is_empty() {
        return None;
    }

    let road_address = strip_html(&raw.road_address).trim().to_string();
    let address = strip_html(&raw.address).trim().to_string();
    let category = strip_html(&raw.category).trim().to_string();
    let description = strip_html(&raw.description).trim().to_string();

    let base_text = keywords::build_filter_text([
        title.as_str(),
        category.as_str(),
        road_address.as_str(),
        address.as_str(),
    ]);
    if keywords::should_exclude_base_text(&base_text) {
        return None;
    }

    let coords = coords_from_record(raw)?;

    let mut place = Place::new(
        id,
        title,
        coords,
        KID_AGE_MIN_MONTHS,
        KID_AGE_MAX_MONTHS,
        DEFAULT_STAY_MINUTES,
        category,
    );
    place.road_address = road_address;
    place.address = address;
    place.description = description;
    place.phone = strip_html(&raw.telephone).trim().to_string();
    place.place_link = to_https_url(&raw.link);
    place.distance_km = origin
        .map(|from| geo::distance_km(from, coords))
        .map(|km| (km * 1000.0).round() / 1000.0);

    Some(place)
}

/// Two-tier radius gating: keep the strict matches when any exist, fall back
/// to a relaxed bound, and keep everything when even that is empty. Strict
/// first, but never zero results if a wider look would have found something.
#[must_use]
pub fn apply_radius_gate(places: Vec<Place>, radius_km: f64, search: &SearchConfig) -> Vec<Place> {
    let strict_km = radius_km + search.radius_padding_km;
    let relaxed_km =
        (radius_km + search.relaxed_radius_extra_km).min(search.relaxed_radius_cap_km);

    let within = |bound: f64| {
        places
            .iter()
            .filter(|place| place.distance_km.is_some_and(|km| km <= bound))
            .cloned()
            .collect::<Vec<_>>()
    };

    let strict_matches = within(strict_km);
    if !strict_matches.is_empty() {
        return strict_matches;
    }

    let relaxed_matches = within(relaxed_km);
    if !relaxed_matches.is_empty() {
        tracing::debug!(
            radius_km,
            relaxed_km,
            "strict radius empty, using relaxed bound"
        );
        return relaxed_matches;
    }

    places
}

/// Result ordering: distance first (unknown distances last), then title
pub fn sort_places(places: &mut [Place]) {
    places.sort_by(|a, b| {
        let distance_a = a.distance_km.unwrap_or(f64::INFINITY);
        let distance_b = b.distance_km.unwrap_or(f64::INFINITY);
        distance_a
            .partial_cmp(&distance_b)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
}
