//! HTTP API for the nearby-place proxy

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use crate::error::KidsonError;
use crate::geo;
use crate::models::Coordinates;
use crate::service::{NearbyPlaceService, NearbyQuery};

const RADIUS_KM_MIN: f64 = 0.5;
const RADIUS_KM_MAX: f64 = 20.0;
const RADIUS_KM_DEFAULT: f64 = 3.0;
const DISPLAY_MIN: usize = 1;
const DISPLAY_MAX: usize = 5;

pub fn router(service: Arc<NearbyPlaceService>) -> Router {
    Router::new()
        .route("/nearby-places", get(nearby_places))
        .with_state(service)
}

/// Raw query parameters; malformed numerics clamp to defaults instead of
/// failing the request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NearbyParams {
    queries: Option<String>,
    #[serde(rename = "areaHint")]
    area_hint: Option<String>,
    lat: Option<String>,
    lng: Option<String>,
    #[serde(rename = "radiusKm")]
    radius_km: Option<String>,
    display: Option<String>,
    #[serde(rename = "withDetails")]
    with_details: Option<String>,
}

impl NearbyParams {
    fn origin(&self) -> Option<Coordinates> {
        let lat: f64 = self.lat.as_deref()?.trim().parse().ok()?;
        let lng: f64 = self.lng.as_deref()?.trim().parse().ok()?;
        if geo::is_valid_lat_lng(lat, lng) {
            Some(Coordinates::new(lat, lng))
        } else {
            None
        }
    }

    fn radius_km(&self) -> f64 {
        self.radius_km
            .as_deref()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .unwrap_or(RADIUS_KM_DEFAULT)
            .clamp(RADIUS_KM_MIN, RADIUS_KM_MAX)
    }

    fn display(&self) -> usize {
        self.display
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(DISPLAY_MAX)
            .clamp(DISPLAY_MIN, DISPLAY_MAX)
    }

    fn with_details(&self) -> bool {
        self.with_details.as_deref().map(str::trim) != Some("0")
    }

    fn into_query(self) -> NearbyQuery {
        NearbyQuery {
            origin: self.origin(),
            radius_km: self.radius_km(),
            display: self.display(),
            with_details: self.with_details(),
            area_hint: self.area_hint.clone().unwrap_or_default(),
            queries: self.queries,
        }
    }
}

async fn nearby_places(
    State(service): State<Arc<NearbyPlaceService>>,
    Query(params): Query<NearbyParams>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let query = params.into_query();
    match service.find_nearby_places(&query).await {
        Ok(result) => Ok(Json(json!({
            "source": "naver-local-search",
            "count": result.items.len(),
            "items": result.items,
            "debug": result.debug,
        }))),
        Err(err) => {
            error!(%err, "nearby place lookup failed");
            Err(upstream_failure(&err))
        }
    }
}

fn upstream_failure(err: &KidsonError) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({
            "error": err.user_message(),
            "details": err.to_string(),
        })),
    )
}
