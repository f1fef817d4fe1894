//! Mapping SSC application versions onto Aviator applications.
//!
//! A mapping is a `source -> target` pair where the source is an SSC
//! `application:version` key and the target is an Aviator application name.
//! Mappings are stored in the `app_mappings` config section.
//!
//! # Bulk mapping rule
//!
//! The front end lets the user tick several entries on each side:
//!
//! - Exactly **one** Aviator app selected: every selected SSC version maps to it.
//! - **Several** Aviator apps selected: selections are paired 1:1 in order,
//!   up to the length of the shorter list.  Leftovers are ignored.

use std::collections::BTreeSet;

/// A set of ticked entries.
///
/// Backed by a `BTreeSet` so iteration order is deterministic (sorted), which
/// makes the 1:1 pairing in [`plan_bulk_mappings`] reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    items: BTreeSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks or unticks `item`.
    pub fn toggle(&mut self, item: impl Into<String>, selected: bool) {
        let item = item.into();
        if selected {
            self.items.insert(item);
        } else {
            self.items.remove(&item);
        }
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.contains(item)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Selection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Plans the mappings produced by a bulk "map selected" action.
///
/// Returns `(ssc_key, aviator_app)` pairs; empty when either side is empty.
pub fn plan_bulk_mappings(ssc: &Selection, aviator: &Selection) -> Vec<(String, String)> {
    let mut targets = aviator.iter();
    match (targets.next(), targets.next()) {
        (None, _) => Vec::new(),
        (Some(only), None) => ssc
            .iter()
            .map(|source| (source.to_string(), only.to_string()))
            .collect(),
        _ => ssc
            .iter()
            .zip(aviator.iter())
            .map(|(source, target)| (source.to_string(), target.to_string()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_toggle_adds_and_removes() {
        let mut selection = Selection::new();

        selection.toggle("WebGoat:1", true);
        selection.toggle("Bank:2", true);
        selection.toggle("WebGoat:1", false);

        assert_eq!(selection.len(), 1);
        assert!(selection.contains("Bank:2"));
        assert!(!selection.contains("WebGoat:1"));
    }

    #[test]
    fn test_selection_toggle_twice_is_idempotent() {
        let mut selection = Selection::new();
        selection.toggle("a", true);
        selection.toggle("a", true);
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_plan_single_target_maps_every_source_to_it() {
        // Arrange
        let ssc: Selection = ["b:1", "a:1", "c:2"].into_iter().collect();
        let aviator: Selection = ["shared"].into_iter().collect();

        // Act
        let plan = plan_bulk_mappings(&ssc, &aviator);

        // Assert
        assert_eq!(
            plan,
            vec![
                ("a:1".to_string(), "shared".to_string()),
                ("b:1".to_string(), "shared".to_string()),
                ("c:2".to_string(), "shared".to_string()),
            ]
        );
    }

    #[test]
    fn test_plan_multiple_targets_pairs_up_to_shorter_side() {
        let ssc: Selection = ["a:1", "b:1", "c:1"].into_iter().collect();
        let aviator: Selection = ["x", "y"].into_iter().collect();

        let plan = plan_bulk_mappings(&ssc, &aviator);

        assert_eq!(
            plan,
            vec![
                ("a:1".to_string(), "x".to_string()),
                ("b:1".to_string(), "y".to_string()),
            ]
        );
    }

    #[test]
    fn test_plan_with_more_targets_than_sources_ignores_extra_targets() {
        let ssc: Selection = ["a:1"].into_iter().collect();
        let aviator: Selection = ["x", "y", "z"].into_iter().collect();

        assert_eq!(plan_bulk_mappings(&ssc, &aviator).len(), 1);
    }

    #[test]
    fn test_plan_with_empty_side_is_empty() {
        let some: Selection = ["a:1"].into_iter().collect();
        assert!(plan_bulk_mappings(&some, &Selection::new()).is_empty());
        assert!(plan_bulk_mappings(&Selection::new(), &some).is_empty());
    }
}
