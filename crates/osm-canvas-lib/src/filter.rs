//! Tag/value filtering of elements
//!
//! [`FilterState`] is the user-controlled rule set. [`FilterEvaluator`] owns it together
//! with a memoized per-element verdict, so every mutation goes through the evaluator and
//! the memo can never outlive the rules it was computed from.

use crate::{Dataset, Tags};
use std::collections::BTreeMap;

/// Active tag keys and, per key, the values selected for it
///
/// An empty state (or one with no active key) shows everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterState {
    active: BTreeMap<String, bool>,
    values: BTreeMap<String, BTreeMap<String, bool>>,
}

impl FilterState {
    /// True if no tag key is active, i.e. everything is shown
    pub fn is_empty(&self) -> bool {
        !self.active.values().any(|&on| on)
    }

    pub fn is_tag_active(&self, tag: &str) -> bool {
        self.active.get(tag).copied().unwrap_or(false)
    }

    pub fn is_value_selected(&self, tag: &str, value: &str) -> bool {
        self.values
            .get(tag)
            .and_then(|values| values.get(value))
            .copied()
            .unwrap_or(false)
    }

    /// Active tag keys in key order
    pub fn active_tags(&self) -> impl Iterator<Item = &str> {
        self.active
            .iter()
            .filter(|(_, on)| **on)
            .map(|(tag, _)| tag.as_str())
    }

    /// Selected values of one key in value order
    pub fn selected_values<'a>(&'a self, tag: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.values
            .get(tag)
            .into_iter()
            .flat_map(|values| values.iter())
            .filter(|(_, on)| **on)
            .map(|(value, _)| value.as_str())
    }

    fn has_value_selection(&self, tag: &str) -> bool {
        self.values
            .get(tag)
            .is_some_and(|values| values.values().any(|&on| on))
    }

    /// Visibility of an element carrying `tags`
    ///
    /// The element passes if any active key accepts it. A key with selected values only
    /// accepts matching values; a key without a value selection accepts any non-empty
    /// value. An empty value counts as the key being absent.
    pub fn is_visible(&self, tags: &Tags) -> bool {
        let mut any_active = false;
        for tag in self.active_tags() {
            any_active = true;
            let Some(value) = tags.get(tag).filter(|value| !value.is_empty()) else {
                continue;
            };
            if !self.has_value_selection(tag) || self.is_value_selected(tag, value) {
                return true;
            }
        }
        !any_active
    }

    fn set_tag_active(&mut self, tag: &str, active: bool) {
        self.active.insert(tag.to_owned(), active);
        if !active {
            self.values.remove(tag);
        }
        if self.is_empty() {
            self.clear();
        }
    }

    fn set_value_selected(&mut self, tag: &str, value: &str, selected: bool) {
        self.values
            .entry(tag.to_owned())
            .or_default()
            .insert(value.to_owned(), selected);
    }

    fn clear(&mut self) {
        self.active.clear();
        self.values.clear();
    }
}

/// Per-element verdicts, indexed like the dataset's node and way lists
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Visibility {
    nodes: Vec<bool>,
    ways: Vec<bool>,
}

impl Visibility {
    /// Everything visible
    pub fn all(dataset: &Dataset) -> Self {
        Self {
            nodes: vec![true; dataset.nodes().len()],
            ways: vec![true; dataset.ways().len()],
        }
    }

    /// Nothing visible
    pub fn none(dataset: &Dataset) -> Self {
        Self {
            nodes: vec![false; dataset.nodes().len()],
            ways: vec![false; dataset.ways().len()],
        }
    }

    fn evaluate(state: &FilterState, dataset: &Dataset) -> Self {
        if state.is_empty() {
            return Self::all(dataset);
        }
        Self {
            nodes: dataset.nodes().iter().map(|n| state.is_visible(&n.tags)).collect(),
            ways: dataset.ways().iter().map(|w| state.is_visible(&w.tags)).collect(),
        }
    }

    /// Out-of-range indices are reported as hidden
    #[inline]
    pub fn node(&self, index: usize) -> bool {
        self.nodes.get(index).copied().unwrap_or(false)
    }

    #[inline]
    pub fn way(&self, index: usize) -> bool {
        self.ways.get(index).copied().unwrap_or(false)
    }

    pub fn visible_nodes(&self) -> usize {
        self.nodes.iter().filter(|&&v| v).count()
    }

    pub fn visible_ways(&self) -> usize {
        self.ways.iter().filter(|&&v| v).count()
    }
}

/// Filter rules plus their memoized evaluation over one dataset
#[derive(Clone, Debug, Default)]
pub struct FilterEvaluator {
    state: FilterState,
    cache: Option<Visibility>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl FilterEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// Single-element check, bypassing the memo
    #[inline]
    pub fn is_visible(&self, tags: &Tags) -> bool {
        self.state.is_visible(tags)
    }

    /// Verdicts for every element of `dataset`, computed at most once per state change
    ///
    /// The memo is keyed on nothing but the state; callers switching datasets must call
    /// [`FilterEvaluator::invalidate`].
    pub fn visibility(&mut self, dataset: &Dataset) -> &Visibility {
        self.cache.get_or_insert_with(|| {
            let visibility = Visibility::evaluate(&self.state, dataset);
            tracing::debug!(
                "Evaluated filters: {} of {} nodes, {} of {} ways visible",
                visibility.visible_nodes(),
                dataset.nodes().len(),
                visibility.visible_ways(),
                dataset.ways().len()
            );
            visibility
        })
    }

    /// Drop the memoized verdicts
    #[inline]
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    #[inline]
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Activate or deactivate a tag key
    ///
    /// Deactivating drops the key's value selection, and deactivating the last active
    /// key resets the state to "show all".
    pub fn set_tag_active(&mut self, tag: &str, active: bool) {
        self.state.set_tag_active(tag, active);
        self.invalidate();
    }

    pub fn set_tag_value_selected(&mut self, tag: &str, value: &str, selected: bool) {
        self.state.set_value_selected(tag, value, selected);
        self.invalidate();
    }

    /// Back to "show all"
    pub fn disable_all(&mut self) {
        self.state.clear();
        self.invalidate();
    }

    /// Activate every given tag key, keeping existing value selections
    pub fn enable_all<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            self.state.active.insert(tag.as_ref().to_owned(), true);
        }
        self.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Node, Way};

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn create_test_dataset() -> Dataset {
        Dataset::new(
            vec![
                Node::new(1, 48.0, 2.0).with_tag("shop", "bakery"),
                Node::new(2, 48.01, 2.01),
                Node::new(3, 48.02, 2.02).with_tag("shop", "butcher"),
                Node::new(4, 48.03, 2.03).with_tag("amenity", "cafe"),
            ],
            vec![Way::new(10, vec![1, 2]).with_tag("highway", "residential")],
        )
    }

    #[test]
    fn test_empty_state_shows_everything() {
        let state = FilterState::default();
        assert!(state.is_empty());
        assert!(state.is_visible(&Tags::new()));
        assert!(state.is_visible(&tags(&[("shop", "bakery")])));
    }

    #[test]
    fn test_active_tag_requires_presence() {
        let mut filter = FilterEvaluator::new();
        filter.set_tag_active("shop", true);
        assert!(filter.is_visible(&tags(&[("shop", "bakery")])));
        assert!(!filter.is_visible(&tags(&[("amenity", "cafe")])));
        assert!(!filter.is_visible(&Tags::new()));
    }

    #[test]
    fn test_empty_value_counts_as_absent() {
        let mut filter = FilterEvaluator::new();
        filter.set_tag_active("shop", true);
        assert!(!filter.is_visible(&tags(&[("shop", "")])));
        assert!(!filter.is_visible(&tags(&[("shop", ""), ("amenity", "cafe")])));

        filter.set_tag_active("amenity", true);
        assert!(filter.is_visible(&tags(&[("shop", ""), ("amenity", "cafe")])));

        // A selected empty value still never matches
        filter.set_tag_value_selected("shop", "", true);
        assert!(!filter.is_visible(&tags(&[("shop", "")])));
    }

    #[test]
    fn test_value_selection_narrows() {
        let mut filter = FilterEvaluator::new();
        filter.set_tag_active("shop", true);
        filter.set_tag_value_selected("shop", "bakery", true);
        assert!(filter.is_visible(&tags(&[("shop", "bakery")])));
        assert!(!filter.is_visible(&tags(&[("shop", "butcher")])));

        // Unselecting the only value falls back to presence
        filter.set_tag_value_selected("shop", "bakery", false);
        assert!(filter.is_visible(&tags(&[("shop", "butcher")])));
    }

    #[test]
    fn test_active_tags_are_ored() {
        let mut filter = FilterEvaluator::new();
        filter.set_tag_active("shop", true);
        filter.set_tag_value_selected("shop", "bakery", true);
        filter.set_tag_active("amenity", true);

        assert!(filter.is_visible(&tags(&[("amenity", "cafe")])));
        assert!(filter.is_visible(&tags(&[("shop", "bakery")])));
        // Fails `shop` but passes `amenity`
        assert!(filter.is_visible(&tags(&[("shop", "butcher"), ("amenity", "bar")])));
        assert!(!filter.is_visible(&tags(&[("shop", "butcher")])));
    }

    #[test]
    fn test_deactivating_last_tag_restores_show_all() {
        let mut filter = FilterEvaluator::new();
        filter.set_tag_active("shop", true);
        filter.set_tag_value_selected("shop", "bakery", true);
        filter.set_tag_active("shop", false);
        assert_eq!(filter.state(), &FilterState::default());
        assert!(filter.is_visible(&Tags::new()));
    }

    #[test]
    fn test_deactivating_tag_drops_its_values() {
        let mut filter = FilterEvaluator::new();
        filter.set_tag_active("shop", true);
        filter.set_tag_active("amenity", true);
        filter.set_tag_value_selected("shop", "bakery", true);
        filter.set_tag_active("shop", false);
        assert!(!filter.state().is_value_selected("shop", "bakery"));

        filter.set_tag_active("shop", true);
        assert!(filter.is_visible(&tags(&[("shop", "butcher")])));
    }

    #[test]
    fn test_adding_value_never_hides() {
        let dataset = create_test_dataset();
        let mut filter = FilterEvaluator::new();
        filter.set_tag_active("shop", true);
        filter.set_tag_value_selected("shop", "bakery", true);
        let before = filter.visibility(&dataset).clone();

        filter.set_tag_value_selected("shop", "butcher", true);
        let after = filter.visibility(&dataset).clone();
        for index in 0..dataset.nodes().len() {
            assert!(!before.node(index) || after.node(index), "node {} hidden", index);
        }
        assert!(after.node(2));
    }

    #[test]
    fn test_visibility_memo_invalidated_by_mutation() {
        let dataset = create_test_dataset();
        let mut filter = FilterEvaluator::new();
        assert_eq!(filter.visibility(&dataset).visible_nodes(), 4);
        assert!(filter.is_cached());

        filter.set_tag_active("shop", true);
        assert!(!filter.is_cached());
        let visibility = filter.visibility(&dataset);
        assert_eq!(visibility.visible_nodes(), 2);
        assert!(visibility.node(0));
        assert!(!visibility.node(1));
        assert!(!visibility.way(0));
    }

    #[test]
    fn test_enable_and_disable_all() {
        let dataset = create_test_dataset();
        let mut filter = FilterEvaluator::new();
        filter.enable_all(["shop", "amenity", "highway"]);
        assert_eq!(filter.state().active_tags().count(), 3);
        let visibility = filter.visibility(&dataset);
        // Only the untagged node disappears
        assert_eq!(visibility.visible_nodes(), 3);
        assert!(!visibility.node(1));
        assert!(visibility.way(0));

        filter.disable_all();
        assert!(filter.state().is_empty());
        assert_eq!(filter.visibility(&dataset).visible_nodes(), 4);
    }

    #[test]
    fn test_out_of_range_index_is_hidden() {
        let visibility = Visibility::all(&create_test_dataset());
        assert!(visibility.node(3));
        assert!(!visibility.node(4));
        assert!(!visibility.way(99));
    }

    #[test]
    fn test_selected_values_listing() {
        let mut filter = FilterEvaluator::new();
        filter.set_tag_active("shop", true);
        filter.set_tag_value_selected("shop", "butcher", true);
        filter.set_tag_value_selected("shop", "bakery", true);
        filter.set_tag_value_selected("shop", "deli", false);
        let values: Vec<&str> = filter.state().selected_values("shop").collect();
        assert_eq!(values, vec!["bakery", "butcher"]);
        assert_eq!(filter.state().selected_values("amenity").count(), 0);
    }
}
