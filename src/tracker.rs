//! Recency-ordered record of places the user has marked as priorities
//!
//! Most recent selection first, bounded capacity, oldest dropped on
//! overflow. Re-selecting a place promotes it to the front instead of
//! duplicating it.

use std::collections::{HashMap, VecDeque};

use crate::models::{Place, SelectionKey};

pub const SELECTION_CAPACITY: usize = 15;

/// Tracks user-selected places in most-recent-first order
#[derive(Debug, Default)]
pub struct SelectionTracker {
    selections: VecDeque<SelectionKey>,
}

impl SelectionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a selection, promoting it to the front if already present.
    /// The oldest entry is dropped when the capacity is exceeded.
    pub fn add(&mut self, key: SelectionKey) {
        self.selections.retain(|existing| existing != &key);
        self.selections.push_front(key);
        self.selections.truncate(SELECTION_CAPACITY);
    }

    /// Withdraw a selection; unknown keys are a no-op
    pub fn remove(&mut self, key: &SelectionKey) {
        self.selections.retain(|existing| existing != key);
    }

    pub fn clear(&mut self) {
        self.selections.clear();
    }

    #[must_use]
    pub fn contains(&self, key: &SelectionKey) -> bool {
        self.selections.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.selections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Keys in most-recent-first order
    #[must_use]
    pub fn keys(&self) -> Vec<SelectionKey> {
        self.selections.iter().cloned().collect()
    }

    /// Recency rank (0 = most recent) for each candidate that has been
    /// selected; unselected candidates are absent from the map.
    #[must_use]
    pub fn priority_ranks_for(&self, candidates: &[Place]) -> HashMap<SelectionKey, usize> {
        let mut ranks = HashMap::new();
        for candidate in candidates {
            let key = candidate.selection_key();
            if let Some(rank) = self.selections.iter().position(|k| k == &key) {
                ranks.insert(key, rank);
            }
        }
        ranks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;

    fn place(name: &str, lat: f64) -> Place {
        Place::new("id", name, Coordinates::new(lat, 126.98), 12, 72, 40, "공원")
    }

    #[test]
    fn test_most_recent_first() {
        let mut tracker = SelectionTracker::new();
        tracker.add(place("a", 37.1).selection_key());
        tracker.add(place("b", 37.2).selection_key());

        let keys = tracker.keys();
        assert_eq!(keys[0], place("b", 37.2).selection_key());
        assert_eq!(keys[1], place("a", 37.1).selection_key());
    }

    #[test]
    fn test_reselect_promotes_without_duplicate() {
        let mut tracker = SelectionTracker::new();
        tracker.add(place("a", 37.1).selection_key());
        tracker.add(place("b", 37.2).selection_key());
        tracker.add(place("a", 37.1).selection_key());

        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.keys()[0], place("a", 37.1).selection_key());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut tracker = SelectionTracker::new();
        for i in 0..(SELECTION_CAPACITY + 3) {
            tracker.add(place("p", 37.0 + i as f64 * 0.01).selection_key());
        }
        assert_eq!(tracker.len(), SELECTION_CAPACITY);
        assert!(!tracker.contains(&place("p", 37.0).selection_key()));
        assert!(tracker.contains(&place("p", 37.0 + 0.03).selection_key()));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut tracker = SelectionTracker::new();
        let key = place("a", 37.1).selection_key();
        tracker.add(key.clone());
        tracker.remove(&key);
        assert!(tracker.is_empty());

        tracker.add(key.clone());
        tracker.clear();
        assert!(tracker.is_empty());
        tracker.remove(&key);
    }

    #[test]
    fn test_priority_ranks() {
        let mut tracker = SelectionTracker::new();
        let first = place("a", 37.1);
        let second = place("b", 37.2);
        let unselected = place("c", 37.3);
        tracker.add(first.selection_key());
        tracker.add(second.selection_key());

        let candidates = vec![first.clone(), second.clone(), unselected.clone()];
        let ranks = tracker.priority_ranks_for(&candidates);
        assert_eq!(ranks.get(&second.selection_key()), Some(&0));
        assert_eq!(ranks.get(&first.selection_key()), Some(&1));
        assert!(!ranks.contains_key(&unselected.selection_key()));
    }
}
