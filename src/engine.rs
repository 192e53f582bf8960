//! Itinerary suggestion engine
//!
//! Pure and deterministic: given an origin, a candidate set, a time budget
//! and the current priority ranks, builds one greedy route per strategy plus
//! an optional route covering every must-visit place, then dedupes, ranks
//! and truncates. Safe to re-run on every input change.

use std::collections::HashMap;

use crate::geo;
use crate::keywords;
use crate::models::{Coordinates, Place, SelectionKey};

pub const MAX_COURSE_SUGGESTIONS: usize = 5;

const PRIORITY_BONUS_FLOOR: f64 = 2.0;
const PRIORITY_BONUS_CEILING: f64 = 8.0;
const PRIORITY_BONUS_STEP: f64 = 0.6;

/// Locality bands: neighbors within each radius score the band weight,
/// tightest band wins
const DENSITY_BANDS: [(f64, f64); 3] = [(0.4, 2.4), (0.8, 1.4), (1.2, 0.8)];

const POPULARITY_RATING_WEIGHT: f64 = 1.5;
const POPULARITY_REVIEW_WEIGHT: f64 = 2.2;
const POPULARITY_REVIEW_CAP: f64 = 4.5;
const THEME_TYPE_TAG_BOOST: f64 = 2.0;

/// Balanced next-stop scorer used to extend the must-visit route
const BALANCED_STAY_WEIGHT: f64 = 1.4;
const BALANCED_LEG_WEIGHT: f64 = 8.0;

pub const MUST_ROUTE_LABEL: &str = "must-visit route";

/// One suggestion request; candidates and priority ranks come separately
#[derive(Debug, Clone, Copy)]
pub struct SuggestionRequest {
    pub origin: Coordinates,
    pub radius_km: f64,
    pub time_budget_minutes: u32,
}

/// Why the engine returned no itineraries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// Nothing admissible within the radius and age band
    NoCandidates,
    /// Admissible candidates exist but no route fits the time budget
    NoneFitBudget,
    /// The must-visit set cannot be fully seated within the budget
    MandatoryUnsatisfiable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItineraryStop {
    pub id: String,
    pub name: String,
    pub coords: Coordinates,
    pub stay_minutes: u32,
    pub is_mandatory: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Itinerary {
    pub label: String,
    pub stops: Vec<ItineraryStop>,
    pub total_minutes: f64,
    pub total_distance_km: f64,
    /// How many stops are currently on the must-visit list
    pub selected_hits: usize,
    pub is_must_route: bool,
}

#[derive(Debug, Clone)]
pub struct Suggestions {
    pub itineraries: Vec<Itinerary>,
    /// Set only when `itineraries` is empty
    pub reason: Option<EmptyReason>,
    /// False when a non-empty must-visit set could not be fully routed
    pub mandatory_satisfied: bool,
}

/// Fixed strategy order; each builds at most one route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    ClosestFromOrigin,
    NearbyCluster,
    MostPopular,
    IndoorThemed,
    OutdoorThemed,
}

const STRATEGIES: [Strategy; 5] = [
    Strategy::ClosestFromOrigin,
    Strategy::NearbyCluster,
    Strategy::MostPopular,
    Strategy::IndoorThemed,
    Strategy::OutdoorThemed,
];

impl Strategy {
    fn label(self) -> &'static str {
        match self {
            Strategy::ClosestFromOrigin => "closest-from-origin",
            Strategy::NearbyCluster => "nearby-cluster",
            Strategy::MostPopular => "most-popular",
            Strategy::IndoorThemed => "indoor-themed",
            Strategy::OutdoorThemed => "outdoor-themed",
        }
    }
}

/// Build, dedupe, rank and truncate itinerary suggestions
#[must_use]
pub fn suggest(
    candidates: &[Place],
    request: &SuggestionRequest,
    priority_ranks: &HashMap<SelectionKey, usize>,
) -> Suggestions {
    let admissible: Vec<&Place> = candidates
        .iter()
        .filter(|place| place.is_valid() && place.matches_kid_age_band())
        .filter(|place| geo::distance_km(request.origin, place.coords) <= request.radius_km)
        .collect();

    let ranks: HashMap<SelectionKey, usize> = admissible
        .iter()
        .filter_map(|place| {
            let key = place.selection_key();
            priority_ranks.get(&key).map(|rank| (key, *rank))
        })
        .collect();

    if admissible.is_empty() {
        return Suggestions {
            itineraries: Vec::new(),
            reason: Some(EmptyReason::NoCandidates),
            mandatory_satisfied: priority_ranks.is_empty(),
        };
    }

    let ctx = ScoringContext::new(&admissible, request, &ranks);

    let mut mandatory_satisfied = true;
    let mut routes: Vec<Itinerary> = Vec::new();

    if !ranks.is_empty() {
        match build_mandatory_route(&admissible, &ctx) {
            Some(route) => routes.push(route),
            None => mandatory_satisfied = false,
        }
    }

    for strategy in STRATEGIES {
        if let Some(route) = build_strategy_route(strategy, &admissible, &ctx) {
            routes.push(route);
        }
    }

    dedup_routes(&mut routes);
    rank_routes(&mut routes);
    routes.truncate(MAX_COURSE_SUGGESTIONS);

    let reason = if routes.is_empty() {
        if !mandatory_satisfied {
            Some(EmptyReason::MandatoryUnsatisfiable)
        } else {
            Some(EmptyReason::NoneFitBudget)
        }
    } else {
        None
    };

    Suggestions {
        itineraries: routes,
        reason,
        mandatory_satisfied,
    }
}

/// Per-request precomputed scoring inputs
struct ScoringContext<'a> {
    origin: Coordinates,
    budget_minutes: f64,
    ranks: &'a HashMap<SelectionKey, usize>,
    density: Vec<f64>,
    from_origin_km: Vec<f64>,
}

impl<'a> ScoringContext<'a> {
    fn new(
        admissible: &[&Place],
        request: &SuggestionRequest,
        ranks: &'a HashMap<SelectionKey, usize>,
    ) -> Self {
        let from_origin_km: Vec<f64> = admissible
            .iter()
            .map(|place| geo::distance_km(request.origin, place.coords))
            .collect();
        let density = admissible
            .iter()
            .enumerate()
            .map(|(index, place)| {
                admissible
                    .iter()
                    .enumerate()
                    .filter(|(other, _)| *other != index)
                    .map(|(_, neighbor)| {
                        let km = geo::distance_km(place.coords, neighbor.coords);
                        DENSITY_BANDS
                            .iter()
                            .find(|(radius, _)| km <= *radius)
                            .map(|(_, weight)| *weight)
                            .unwrap_or(0.0)
                    })
                    .sum()
            })
            .collect();

        Self {
            origin: request.origin,
            budget_minutes: f64::from(request.time_budget_minutes),
            ranks,
            density,
            from_origin_km,
        }
    }

    fn priority_bonus(&self, place: &Place) -> f64 {
        match self.ranks.get(&place.selection_key()) {
            Some(rank) => (PRIORITY_BONUS_CEILING - PRIORITY_BONUS_STEP * *rank as f64)
                .max(PRIORITY_BONUS_FLOOR),
            None => 0.0,
        }
    }

    fn is_mandatory(&self, place: &Place) -> bool {
        self.ranks.contains_key(&place.selection_key())
    }
}

/// Mutable route under construction
struct RouteState {
    stop_indices: Vec<usize>,
    cursor: Coordinates,
    elapsed_minutes: f64,
    distance_km: f64,
}

impl RouteState {
    fn new(origin: Coordinates) -> Self {
        Self {
            stop_indices: Vec::new(),
            cursor: origin,
            elapsed_minutes: 0.0,
            distance_km: 0.0,
        }
    }

    fn contains(&self, index: usize) -> bool {
        self.stop_indices.contains(&index)
    }

    /// Cost of reaching and staying at a candidate from the current cursor
    fn leg_cost(&self, place: &Place) -> (f64, f64) {
        let leg_km = geo::distance_km(self.cursor, place.coords);
        let minutes = geo::travel_minutes(leg_km) + f64::from(place.expected_stay_minutes);
        (leg_km, minutes)
    }

    fn fits(&self, place: &Place, budget_minutes: f64) -> bool {
        let (_, minutes) = self.leg_cost(place);
        self.elapsed_minutes + minutes <= budget_minutes
    }

    fn push(&mut self, index: usize, place: &Place) {
        let (leg_km, minutes) = self.leg_cost(place);
        self.stop_indices.push(index);
        self.cursor = place.coords;
        self.elapsed_minutes += minutes;
        self.distance_km += leg_km;
    }

    fn into_itinerary(self, label: &str, admissible: &[&Place], ctx: &ScoringContext) -> Itinerary {
        let stops: Vec<ItineraryStop> = self
            .stop_indices
            .iter()
            .map(|&index| {
                let place = admissible[index];
                ItineraryStop {
                    id: place.id.clone(),
                    name: place.name.clone(),
                    coords: place.coords,
                    stay_minutes: place.expected_stay_minutes,
                    is_mandatory: ctx.is_mandatory(place),
                }
            })
            .collect();
        let selected_hits = stops.iter().filter(|stop| stop.is_mandatory).count();

        Itinerary {
            label: label.to_string(),
            stops,
            total_minutes: self.elapsed_minutes,
            total_distance_km: self.distance_km,
            selected_hits,
            is_must_route: label == MUST_ROUTE_LABEL,
        }
    }
}

/// Visit every ranked place in rank order; abort unless the full set fits,
/// then keep extending with the balanced scorer.
fn build_mandatory_route(admissible: &[&Place], ctx: &ScoringContext) -> Option<Itinerary> {
    let mut ordered: Vec<(usize, usize)> = admissible
        .iter()
        .enumerate()
        .filter_map(|(index, place)| {
            ctx.ranks
                .get(&place.selection_key())
                .map(|rank| (*rank, index))
        })
        .collect();
    ordered.sort_by_key(|(rank, _)| *rank);

    let mut route = RouteState::new(ctx.origin);
    for (_, index) in ordered {
        let place = admissible[index];
        if !route.fits(place, ctx.budget_minutes) {
            return None;
        }
        route.push(index, place);
    }

    extend_route(&mut route, admissible, ctx, |state, place, _| {
        let leg_km = geo::distance_km(state.cursor, place.coords);
        BALANCED_STAY_WEIGHT * f64::from(place.expected_stay_minutes)
            - BALANCED_LEG_WEIGHT * leg_km
            + ctx.priority_bonus(place)
    });

    Some(route.into_itinerary(MUST_ROUTE_LABEL, admissible, ctx))
}

fn build_strategy_route(
    strategy: Strategy,
    admissible: &[&Place],
    ctx: &ScoringContext,
) -> Option<Itinerary> {
    let mut route = RouteState::new(ctx.origin);
    let score = |state: &RouteState, place: &Place, index: usize| {
        strategy_score(strategy, state, place, index, admissible, ctx)
    };

    // Seed: best-scoring candidate that fits the budget on its own
    let seed = best_fitting_candidate(&route, admissible, ctx, score)?;
    route.push(seed, admissible[seed]);

    extend_route(&mut route, admissible, ctx, score);
    Some(route.into_itinerary(strategy.label(), admissible, ctx))
}

/// Greedy extension: repeatedly take the best-scoring unvisited candidate
/// that fits the remaining budget.
fn extend_route(
    route: &mut RouteState,
    admissible: &[&Place],
    ctx: &ScoringContext,
    score: impl Fn(&RouteState, &Place, usize) -> f64,
) {
    while let Some(next) = best_fitting_candidate(route, admissible, ctx, &score) {
        route.push(next, admissible[next]);
    }
}

/// Argmax over unvisited, budget-fitting candidates; stable ties keep the
/// earliest insertion index.
fn best_fitting_candidate(
    route: &RouteState,
    admissible: &[&Place],
    ctx: &ScoringContext,
    score: impl Fn(&RouteState, &Place, usize) -> f64,
) -> Option<usize> {
    let mut best: Option<usize> = None;
    let mut best_score = f64::NEG_INFINITY;
    for (index, place) in admissible.iter().enumerate() {
        if route.contains(index) || !route.fits(place, ctx.budget_minutes) {
            continue;
        }
        let value = score(route, place, index);
        if value > best_score {
            best_score = value;
            best = Some(index);
        }
    }
    best
}

fn strategy_score(
    strategy: Strategy,
    state: &RouteState,
    place: &Place,
    index: usize,
    admissible: &[&Place],
    ctx: &ScoringContext,
) -> f64 {
    let from_origin = ctx.from_origin_km[index];
    let from_cursor = geo::distance_km(state.cursor, place.coords);
    let bonus = ctx.priority_bonus(place);

    match strategy {
        Strategy::ClosestFromOrigin => {
            -3.0 * from_origin - from_cursor + 0.2 * popularity(place) + bonus
        }
        Strategy::NearbyCluster => {
            let cluster_km = mean_distance_to_stops(state, place, admissible);
            1.6 * ctx.density[index] - 2.0 * from_cursor - cluster_km + bonus
        }
        Strategy::MostPopular => popularity(place) - 0.8 * from_cursor + bonus,
        Strategy::IndoorThemed => {
            2.0 * theme_affinity(
                place,
                keywords::INDOOR_THEME_KEYWORDS,
                keywords::INDOOR_TYPE_TAGS,
            ) + 0.5 * popularity(place)
                - 0.8 * from_cursor
                + bonus
        }
        Strategy::OutdoorThemed => {
            2.0 * theme_affinity(
                place,
                keywords::OUTDOOR_THEME_KEYWORDS,
                keywords::OUTDOOR_TYPE_TAGS,
            ) + 0.5 * popularity(place)
                - 0.8 * from_cursor
                + bonus
        }
    }
}

/// Rating plus a capped review-volume term
fn popularity(place: &Place) -> f64 {
    let rating = place.rating_estimated.unwrap_or(0.0);
    let review_term =
        (POPULARITY_REVIEW_WEIGHT * ((place.blog_review_total + 1) as f64).log10())
            .min(POPULARITY_REVIEW_CAP);
    POPULARITY_RATING_WEIGHT * rating + review_term
}

/// Theme keyword matches over the place text, boosted by a matching type tag
fn theme_affinity(place: &Place, theme_keywords: &[&str], type_tags: &[&str]) -> f64 {
    let text = keywords::place_base_text(place);
    let mut score = keywords::count_keyword_matches(&text, theme_keywords) as f64;
    if let Some(tag) = place.place_type.as_deref() {
        if type_tags.contains(&tag) {
            score += THEME_TYPE_TAG_BOOST;
        }
    }
    score
}

fn mean_distance_to_stops(state: &RouteState, place: &Place, admissible: &[&Place]) -> f64 {
    if state.stop_indices.is_empty() {
        return 0.0;
    }
    let total: f64 = state
        .stop_indices
        .iter()
        .map(|&index| geo::distance_km(place.coords, admissible[index].coords))
        .sum();
    total / state.stop_indices.len() as f64
}

/// Identical ordered id sequences are duplicates; the first occurrence wins
fn dedup_routes(routes: &mut Vec<Itinerary>) {
    let mut seen: Vec<Vec<String>> = Vec::new();
    routes.retain(|route| {
        let ids: Vec<String> = route.stops.iter().map(|stop| stop.id.clone()).collect();
        if seen.contains(&ids) {
            false
        } else {
            seen.push(ids);
            true
        }
    });
}

fn rank_routes(routes: &mut [Itinerary]) {
    routes.sort_by(|a, b| {
        b.is_must_route
            .cmp(&a.is_must_route)
            .then_with(|| b.selected_hits.cmp(&a.selected_hits))
            .then_with(|| b.stops.len().cmp(&a.stops.len()))
            .then_with(|| {
                a.total_minutes
                    .partial_cmp(&b.total_minutes)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::seed_places;
    use crate::tracker::SelectionTracker;

    fn request(radius_km: f64, budget: u32) -> SuggestionRequest {
        SuggestionRequest {
            origin: Coordinates::new(37.5715, 126.978),
            radius_km,
            time_budget_minutes: budget,
        }
    }

    #[test]
    fn test_returns_itineraries_within_budget() {
        let candidates = seed_places();
        let result = suggest(&candidates, &request(3.0, 150), &HashMap::new());

        assert!(!result.itineraries.is_empty());
        assert!(result.reason.is_none());
        for itinerary in &result.itineraries {
            assert!(itinerary.total_minutes <= 150.0);
            assert!(!itinerary.stops.is_empty());
        }
    }

    #[test]
    fn test_stop_ids_pairwise_distinct() {
        let candidates = seed_places();
        let result = suggest(&candidates, &request(3.0, 240), &HashMap::new());
        for itinerary in &result.itineraries {
            let mut ids: Vec<&str> = itinerary.stops.iter().map(|s| s.id.as_str()).collect();
            let before = ids.len();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), before);
        }
    }

    #[test]
    fn test_no_candidates_reason() {
        let candidates = seed_places();
        let mut far = request(0.5, 150);
        far.origin = Coordinates::new(35.0, 129.0);
        let result = suggest(&candidates, &far, &HashMap::new());

        assert!(result.itineraries.is_empty());
        assert_eq!(result.reason, Some(EmptyReason::NoCandidates));
    }

    #[test]
    fn test_none_fit_budget_reason() {
        let candidates = seed_places();
        let result = suggest(&candidates, &request(3.0, 5), &HashMap::new());

        assert!(result.itineraries.is_empty());
        assert_eq!(result.reason, Some(EmptyReason::NoneFitBudget));
    }

    #[test]
    fn test_mandatory_route_covers_selection_in_recency_order() {
        let candidates = seed_places();
        let mut tracker = SelectionTracker::new();
        tracker.add(candidates[1].selection_key());
        tracker.add(candidates[4].selection_key());
        let ranks = tracker.priority_ranks_for(&candidates);

        let result = suggest(&candidates, &request(3.0, 240), &ranks);
        let must = result
            .itineraries
            .iter()
            .find(|i| i.is_must_route)
            .expect("must-visit route present");

        assert_eq!(must.label, MUST_ROUTE_LABEL);
        assert!(result.mandatory_satisfied);
        assert_eq!(must.selected_hits, 2);
        // most recently selected place is seated first
        assert_eq!(must.stops[0].id, candidates[4].id);
        assert!(must.stops.iter().any(|s| s.id == candidates[1].id));
        assert!(must.stops.iter().all(|s| !s.is_mandatory || s.id == candidates[4].id || s.id == candidates[1].id));
    }

    #[test]
    fn test_must_route_ranked_first() {
        let candidates = seed_places();
        let mut tracker = SelectionTracker::new();
        tracker.add(candidates[0].selection_key());
        let ranks = tracker.priority_ranks_for(&candidates);

        let result = suggest(&candidates, &request(3.0, 200), &ranks);
        assert!(result.itineraries[0].is_must_route);
    }

    #[test]
    fn test_mandatory_unsatisfiable_flag() {
        let candidates = seed_places();
        let mut tracker = SelectionTracker::new();
        tracker.add(candidates[0].selection_key());
        tracker.add(candidates[5].selection_key());
        let ranks = tracker.priority_ranks_for(&candidates);

        // budget fits one short stop but never both mandatory stays
        let result = suggest(&candidates, &request(3.0, 40), &ranks);
        assert!(!result.mandatory_satisfied);
        assert!(result.itineraries.iter().all(|i| !i.is_must_route));
    }

    #[test]
    fn test_mandatory_unsatisfiable_reason_when_nothing_fits() {
        let candidates = seed_places();
        let mut tracker = SelectionTracker::new();
        tracker.add(candidates[0].selection_key());
        let ranks = tracker.priority_ranks_for(&candidates);

        let result = suggest(&candidates, &request(3.0, 5), &ranks);
        assert!(result.itineraries.is_empty());
        assert_eq!(result.reason, Some(EmptyReason::MandatoryUnsatisfiable));
    }

    #[test]
    fn test_idempotent_for_identical_inputs() {
        let candidates = seed_places();
        let mut tracker = SelectionTracker::new();
        tracker.add(candidates[2].selection_key());
        let ranks = tracker.priority_ranks_for(&candidates);
        let req = request(3.0, 180);

        let first = suggest(&candidates, &req, &ranks);
        let second = suggest(&candidates, &req, &ranks);
        assert_eq!(first.itineraries, second.itineraries);
    }

    #[test]
    fn test_truncated_to_max_suggestions() {
        let candidates = seed_places();
        let result = suggest(&candidates, &request(3.0, 300), &HashMap::new());
        assert!(result.itineraries.len() <= MAX_COURSE_SUGGESTIONS);
    }

    #[test]
    fn test_age_band_mismatch_excluded() {
        let mut candidates = seed_places();
        candidates[0].min_age_months = 120;
        candidates[0].max_age_months = 180;
        let excluded_id = candidates[0].id.clone();

        let result = suggest(&candidates, &request(3.0, 240), &HashMap::new());
        for itinerary in &result.itineraries {
            assert!(itinerary.stops.iter().all(|s| s.id != excluded_id));
        }
    }

    #[test]
    fn test_indoor_strategy_prefers_indoor_seed() {
        // the playground sits at the origin and the gym half a kilometer out,
        // so the indoor route stays distinct from closest-from-origin and is
        // not collapsed by identical-sequence dedup
        let mut playground = Place::new(
            "p1",
            "강변 놀이터",
            Coordinates::new(37.5718, 126.9782),
            12,
            72,
            30,
            "놀이터",
        );
        playground.place_type = Some("playground".to_string());
        let mut gym = Place::new(
            "p2",
            "실내 키즈 체육관",
            Coordinates::new(37.576, 126.978),
            12,
            72,
            45,
            "키즈카페",
        );
        gym.place_type = Some("indoor".to_string());
        let candidates = vec![playground, gym];

        let result = suggest(&candidates, &request(3.0, 60), &HashMap::new());
        let indoor = result
            .itineraries
            .iter()
            .find(|i| i.label == "indoor-themed")
            .expect("indoor route present");
        assert_eq!(indoor.stops[0].id, "p2");
        let closest = result
            .itineraries
            .iter()
            .find(|i| i.label == "closest-from-origin")
            .expect("closest route present");
        assert_eq!(closest.stops[0].id, "p1");
    }

    #[test]
    fn test_priority_bonus_decay() {
        let candidates = seed_places();
        let mut tracker = SelectionTracker::new();
        for place in &candidates {
            tracker.add(place.selection_key());
        }
        let ranks = tracker.priority_ranks_for(&candidates);
        let ctx_request = request(3.0, 100);
        let admissible: Vec<&Place> = candidates.iter().collect();
        let ctx = ScoringContext::new(&admissible, &ctx_request, &ranks);

        // rank 0 gets the ceiling, deep ranks hold at the floor
        let most_recent = candidates.iter().find(|p| ranks[&p.selection_key()] == 0).unwrap();
        assert_eq!(ctx.priority_bonus(most_recent), PRIORITY_BONUS_CEILING);
        let deepest = candidates.iter().find(|p| ranks[&p.selection_key()] == 7).unwrap();
        assert!(ctx.priority_bonus(deepest) >= PRIORITY_BONUS_FLOOR);
    }
}
