//! `Kidson` - child-friendly walking-itinerary recommendations
//!
//! This library provides the core functionality for finding kid-suitable
//! nearby places, scoring them, and building walking itineraries under a
//! time budget.

pub mod api;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod geo;
pub mod insight;
pub mod keywords;
pub mod models;
pub mod normalizer;
pub mod search;
pub mod service;
pub mod text;
pub mod tracker;
pub mod web;

// Re-export core types for public API
pub use cache::TtlCache;
pub use classifier::{AiCandidate, AiDecision, OpenAiClassifier, SuitabilityClassifier};
pub use config::KidsonConfig;
pub use engine::{EmptyReason, Itinerary, ItineraryStop, SuggestionRequest, Suggestions};
pub use error::{KidsonError, Result};
pub use models::{Coordinates, Place, RawPlaceRecord, SelectionKey};
pub use search::{NaverSearchClient, SearchProvider};
pub use service::{NearbyPlaceService, NearbyQuery, SessionState};
pub use tracker::SelectionTracker;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
