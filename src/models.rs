//! Domain model: places, coordinates and selection identity

use serde::{Deserialize, Serialize};

use crate::geo;
use crate::text::normalize_compare_text;

/// Target visitor age band, in months
pub const KID_AGE_MIN_MONTHS: u32 = 12;
pub const KID_AGE_MAX_MONTHS: u32 = 72;

/// A WGS84 coordinate pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        geo::is_valid_lat_lng(self.lat, self.lng)
    }
}

/// One blog review snippet attached to a place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlogReview {
    pub title: String,
    pub description: String,
    pub link: String,
    pub blogger_name: String,
    pub post_date: String,
}

/// A canonical child-friendly place.
///
/// Created once by the normalizer (or from the static seed list) and treated
/// as immutable after admission to a candidate set; enrichment fields are
/// filled in before admission and default to empty when a lookup fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub coords: Coordinates,
    pub min_age_months: u32,
    pub max_age_months: u32,
    pub expected_stay_minutes: u32,
    pub category: String,
    /// Coarse venue tag (playground, indoor, park, ...) used by theme scoring
    #[serde(default)]
    pub place_type: Option<String>,

    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub road_address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub place_link: String,
    #[serde(default)]
    pub review_link: String,
    #[serde(default)]
    pub blog_review_link: String,
    #[serde(default)]
    pub mobile_home_link: String,
    #[serde(default)]
    pub photo_thumbnail: String,
    #[serde(default)]
    pub photo_link: String,

    #[serde(default)]
    pub blog_review_total: u64,
    #[serde(default)]
    pub blog_reviews: Vec<BlogReview>,
    #[serde(default)]
    pub rating_estimated: Option<f64>,
    #[serde(default)]
    pub rating_source: Option<String>,

    #[serde(default)]
    pub family_summary: String,
    #[serde(default)]
    pub family_highlights: Vec<String>,
    #[serde(default)]
    pub family_confidence: Option<f64>,

    #[serde(default)]
    pub ai_suitable: Option<bool>,
    #[serde(default)]
    pub ai_confidence: Option<f64>,
    #[serde(default)]
    pub ai_reason: Option<String>,

    /// Distance from the query origin, when an origin was supplied
    #[serde(default)]
    pub distance_km: Option<f64>,
}

impl Place {
    /// Create a bare place with empty enrichment
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        coords: Coordinates,
        min_age_months: u32,
        max_age_months: u32,
        expected_stay_minutes: u32,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coords,
            min_age_months,
            max_age_months,
            expected_stay_minutes,
            category: category.into(),
            place_type: None,
            address: String::new(),
            road_address: String::new(),
            phone: String::new(),
            description: String::new(),
            place_link: String::new(),
            review_link: String::new(),
            blog_review_link: String::new(),
            mobile_home_link: String::new(),
            photo_thumbnail: String::new(),
            photo_link: String::new(),
            blog_review_total: 0,
            blog_reviews: Vec::new(),
            rating_estimated: None,
            rating_source: None,
            family_summary: String::new(),
            family_highlights: Vec::new(),
            family_confidence: None,
            ai_suitable: None,
            ai_confidence: None,
            ai_reason: None,
            distance_km: None,
        }
    }

    /// Coordinate validity and a coherent age window
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.coords.is_valid() && self.min_age_months <= self.max_age_months
    }

    /// Age window overlaps the target kid age band
    #[must_use]
    pub fn matches_kid_age_band(&self) -> bool {
        self.min_age_months <= KID_AGE_MAX_MONTHS && self.max_age_months >= KID_AGE_MIN_MONTHS
    }

    /// Stable identity across repeated fetches
    #[must_use]
    pub fn selection_key(&self) -> SelectionKey {
        SelectionKey::new(&self.name, self.coords)
    }

    /// Preferred address line: road address when present
    #[must_use]
    pub fn best_address(&self) -> &str {
        if self.road_address.is_empty() {
            &self.address
        } else {
            &self.road_address
        }
    }
}

/// Deterministic place identity: normalized name plus coordinates rounded to
/// six decimal places. Two fetches of the same venue get different ephemeral
/// ids but identical keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionKey {
    name: String,
    lat_micro: i64,
    lng_micro: i64,
}

impl SelectionKey {
    #[must_use]
    pub fn new(name: &str, coords: Coordinates) -> Self {
        Self {
            name: normalize_compare_text(name),
            lat_micro: (coords.lat * 1_000_000.0).round() as i64,
            lng_micro: (coords.lng * 1_000_000.0).round() as i64,
        }
    }
}

/// One raw record from the Naver local-search API.
///
/// Every field is optional on the wire; the normalizer rejects what it cannot
/// canonicalize instead of threading loose data into the engine. Naver ships
/// `mapx`/`mapy` as scaled-integer strings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPlaceRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub telephone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, rename = "roadAddress")]
    pub road_address: String,
    #[serde(default)]
    pub mapx: String,
    #[serde(default)]
    pub mapy: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

/// The static Seoul seed set used for offline suggestions and tests
#[must_use]
pub fn seed_places() -> Vec<Place> {
    let seeds: [(&str, &str, f64, f64, u32, u32, u32, &str); 8] = [
        ("s1", "강변 놀이터", 37.574, 126.976, 12, 72, 35, "playground"),
        ("s2", "어린이 도서관 코너", 37.572, 126.984, 18, 72, 30, "library"),
        ("s3", "키즈 실내 체육관", 37.569, 126.979, 12, 60, 45, "indoor"),
        ("s4", "미니 과학 체험관", 37.566, 126.973, 30, 72, 40, "museum"),
        ("s5", "유모차 산책 공원길", 37.567, 126.988, 12, 72, 30, "park"),
        ("s6", "동물 먹이 체험장", 37.562, 126.982, 24, 72, 50, "experience"),
        ("s7", "물놀이 광장", 37.578, 126.986, 20, 72, 40, "outdoor"),
        ("s8", "부모-아이 공예 스튜디오", 37.571, 126.969, 24, 72, 35, "creative"),
    ];

    seeds
        .into_iter()
        .map(|(id, name, lat, lng, min_age, max_age, stay, kind)| {
            let mut place = Place::new(
                id,
                name,
                Coordinates::new(lat, lng),
                min_age,
                max_age,
                stay,
                kind,
            );
            place.place_type = Some(kind.to_string());
            place
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_validity() {
        let place = Place::new("p1", "테스트 놀이터", Coordinates::new(37.5, 127.0), 12, 72, 30, "playground");
        assert!(place.is_valid());

        let mut inverted = place.clone();
        inverted.min_age_months = 80;
        assert!(!inverted.is_valid());

        let mut off_globe = place;
        off_globe.coords = Coordinates::new(95.0, 127.0);
        assert!(!off_globe.is_valid());
    }

    #[test]
    fn test_age_band_overlap() {
        let mut place =
            Place::new("p1", "x", Coordinates::new(37.5, 127.0), 12, 72, 30, "playground");
        assert!(place.matches_kid_age_band());

        place.min_age_months = 73;
        place.max_age_months = 120;
        assert!(!place.matches_kid_age_band());
    }

    #[test]
    fn test_selection_key_identity_across_fetches() {
        let a = Place::new("ephemeral-1", "강변 놀이터", Coordinates::new(37.574, 126.976), 12, 72, 35, "playground");
        let b = Place::new("ephemeral-2", "강변  놀이터", Coordinates::new(37.574_000_4, 126.976_000_3), 12, 72, 35, "playground");
        assert_eq!(a.selection_key(), b.selection_key());
    }

    #[test]
    fn test_selection_key_distinguishes_locations() {
        let a = SelectionKey::new("놀이터", Coordinates::new(37.574, 126.976));
        let b = SelectionKey::new("놀이터", Coordinates::new(37.575, 126.976));
        assert_ne!(a, b);
    }

    #[test]
    fn test_seed_places_are_valid() {
        let seeds = seed_places();
        assert_eq!(seeds.len(), 8);
        assert!(seeds.iter().all(Place::is_valid));
        assert!(seeds.iter().all(Place::matches_kid_age_band));
    }
}
