//! Nearby-place pipeline: search, normalize, filter, enrich, classify
//!
//! The primary local search is fatal per request; every later stage degrades
//! per place. The pipeline result feeds both the HTTP proxy response and the
//! suggestion engine's candidate set.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::{CacheConfig, ClassifierConfig, SearchConfig};
use crate::classifier::{SuitabilityClassifier, SuitabilityFilter};
use crate::engine::{self, SuggestionRequest, Suggestions};
use crate::enrich::{Enricher, build_fallback_place_links, normalize_naver_place_links};
use crate::error::Result;
use crate::keywords;
use crate::models::{Coordinates, Place, seed_places};
use crate::normalizer;
use crate::search::{
    SearchProvider, build_area_hint_candidates, build_search_queries, parse_queries,
};
use crate::tracker::SelectionTracker;

/// One nearby-place lookup
#[derive(Debug, Clone)]
pub struct NearbyQuery {
    /// Raw comma-separated query list; defaults apply when empty
    pub queries: Option<String>,
    pub area_hint: String,
    pub origin: Option<Coordinates>,
    pub radius_km: f64,
    /// Per-query result cap passed to the provider
    pub display: usize,
    pub with_details: bool,
}

/// Diagnostic counters surfaced in the proxy response
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchDebug {
    #[serde(rename = "apiCallCount")]
    pub api_call_count: usize,
    #[serde(rename = "queryCount")]
    pub query_count: usize,
    #[serde(rename = "areaHintCandidates")]
    pub area_hint_candidates: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NearbySearchResult {
    pub items: Vec<Place>,
    pub debug: SearchDebug,
}

/// End-to-end nearby-place service
pub struct NearbyPlaceService {
    provider: Arc<dyn SearchProvider>,
    enricher: Enricher,
    suitability: SuitabilityFilter,
    search: SearchConfig,
}

impl NearbyPlaceService {
    #[must_use]
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        classifier: Option<Arc<dyn SuitabilityClassifier>>,
        search: SearchConfig,
        classifier_config: ClassifierConfig,
        cache: &CacheConfig,
    ) -> Self {
        Self {
            enricher: Enricher::new(Arc::clone(&provider), search.clone(), cache),
            suitability: SuitabilityFilter::new(classifier, classifier_config, cache),
            provider,
            search,
        }
    }

    /// Run the full pipeline for one lookup. Only a primary-search failure
    /// propagates; enrichment and classification degrade in place.
    #[instrument(skip(self, query), fields(radius_km = query.radius_km))]
    pub async fn find_nearby_places(&self, query: &NearbyQuery) -> Result<NearbySearchResult> {
        let queries = parse_queries(query.queries.as_deref());
        let area_hints = build_area_hint_candidates(
            &query.area_hint,
            query.origin,
            self.search.search_variants_limit,
        );

        let mut api_call_count = 0usize;
        let mut seen_keys: Vec<String> = Vec::new();
        let mut places: Vec<Place> = Vec::new();

        for base_query in &queries {
            let variants =
                build_search_queries(base_query, &area_hints, self.search.search_variants_limit);
            for variant in variants {
                let records = self.provider.local_search(&variant, query.display).await?;
                api_call_count += 1;
                for record in records {
                    let key = normalizer::record_dedup_key(&record);
                    if seen_keys.contains(&key) {
                        continue;
                    }
                    seen_keys.push(key);
                    let id = format!("n{}", places.len() + 1);
                    if let Some(place) = normalizer::normalize_record(&record, id, query.origin) {
                        places.push(place);
                    }
                }
            }
        }
        debug!(
            raw_count = places.len(),
            api_call_count, "local search aggregation done"
        );

        if query.origin.is_some() {
            places = normalizer::apply_radius_gate(places, query.radius_km, &self.search);
        }

        // Heuristic pass before enrichment: gardens without evidence survive
        // until blog data can confirm or deny them. Runs on the gated set, so
        // an all-unsuitable strict radius never falls through to relaxation.
        places.retain(|place| keywords::is_kid_play_suitable_place(place, true));

        normalizer::sort_places(&mut places);
        places.truncate(self.search.max_results);

        // Every returned item carries canonical place links, details or not;
        // enrichment below may replace these with resolved ones.
        for place in &mut places {
            let links = normalize_naver_place_links(&place.place_link)
                .unwrap_or_else(|| build_fallback_place_links(place));
            place.place_link = links.place_link;
            place.review_link = links.review_link;
            place.blog_review_link = links.blog_review_link;
            place.mobile_home_link = links.mobile_home_link;
        }

        if query.with_details {
            let primary_hint = area_hints.first().map(String::as_str).unwrap_or_default();
            self.enricher.enrich_places(&mut places, primary_hint).await;
            places.retain(|place| keywords::is_kid_play_suitable_place(place, false));
            places = self.suitability.apply(places).await;
            crate::insight::apply_family_insights(&mut places);
        }

        info!(count = places.len(), "nearby place lookup finished");
        Ok(NearbySearchResult {
            items: places,
            debug: SearchDebug {
                api_call_count,
                query_count: queries.len(),
                area_hint_candidates: area_hints,
            },
        })
    }
}

/// Explicit per-session context: the candidate set plus the user's
/// must-visit selections. The engine never mutates it.
#[derive(Debug, Default)]
pub struct SessionState {
    pub candidates: Vec<Place>,
    pub tracker: SelectionTracker,
}

impl SessionState {
    #[must_use]
    pub fn new(candidates: Vec<Place>) -> Self {
        Self {
            candidates,
            tracker: SelectionTracker::new(),
        }
    }

    /// Session pre-loaded with the offline seed set
    #[must_use]
    pub fn with_seed_places() -> Self {
        Self::new(seed_places())
    }

    pub fn replace_candidates(&mut self, candidates: Vec<Place>) {
        self.candidates = candidates;
    }

    /// Compute suggestions for the current candidates and selections
    #[must_use]
    pub fn suggest(&self, request: &SuggestionRequest) -> Suggestions {
        let ranks = self.tracker.priority_ranks_for(&self.candidates);
        engine::suggest(&self.candidates, request, &ranks)
    }
}
