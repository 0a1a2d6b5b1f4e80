//! Catalog of the tag keys and values present in a dataset
//!
//! Feeds the filter controls: which keys exist, how common they are, and which values
//! one key takes.

use crate::{Dataset, Tags};
use std::collections::HashMap;

/// Elements processed per chunk while counting
const CHUNK_SIZE: usize = 5000;

/// A tag key or value with the number of elements carrying it
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagCount {
    pub name: String,
    pub count: usize,
}

/// The values one key takes across a dataset
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagValues {
    /// Distinct values, most common first
    pub values: Vec<TagCount>,
    /// Number of elements carrying the key at all
    pub total: usize,
}

impl TagValues {
    /// The `limit` most common values
    pub fn top(&self, limit: usize) -> &[TagCount] {
        &self.values[..self.values.len().min(limit)]
    }

    /// Whether `top(limit)` leaves values out
    pub fn is_truncated(&self, limit: usize) -> bool {
        self.values.len() > limit
    }
}

/// All tag keys of a dataset with their element counts, most common first
///
/// Per-key value lists are computed on demand and kept until the catalog is dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagCatalog {
    tags: Vec<TagCount>,
    value_cache: HashMap<String, TagValues>,
}

/// Most common first, then by name for a stable order
fn into_sorted(counts: HashMap<&str, usize>) -> Vec<TagCount> {
    let mut sorted: Vec<TagCount> = counts
        .into_iter()
        .map(|(name, count)| TagCount {
            name: name.to_owned(),
            count,
        })
        .collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    sorted
}

fn all_tags(dataset: &Dataset) -> impl Iterator<Item = &Tags> {
    dataset
        .nodes()
        .iter()
        .map(|n| &n.tags)
        .chain(dataset.ways().iter().map(|w| &w.tags))
}

fn count_keys<'a>(counts: &mut HashMap<&'a str, usize>, chunk: &[&'a Tags]) {
    for tags in chunk {
        for key in tags.keys() {
            *counts.entry(key.as_str()).or_insert(0) += 1;
        }
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl TagCatalog {
    pub fn build(dataset: &Dataset) -> Self {
        let start = instant::Instant::now();
        let mut counts: HashMap<&str, usize> = HashMap::new();

        let elements: Vec<&Tags> = all_tags(dataset).collect();
        for chunk in elements.chunks(CHUNK_SIZE) {
            count_keys(&mut counts, chunk);
        }

        let tags = into_sorted(counts);
        tracing::debug!(
            "Extracted {} unique tags from {} elements in {:?}",
            tags.len(),
            dataset.len(),
            start.elapsed()
        );
        Self {
            tags,
            value_cache: HashMap::new(),
        }
    }

    /// Values of one key with counts, most common first
    ///
    /// Empty values count as the key being absent, as they do for filtering.
    pub fn values(dataset: &Dataset, key: &str) -> TagValues {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut total = 0;
        for tags in all_tags(dataset) {
            if let Some(value) = tags.get(key).filter(|value| !value.is_empty()) {
                *counts.entry(value.as_str()).or_insert(0) += 1;
                total += 1;
            }
        }
        TagValues {
            values: into_sorted(counts),
            total,
        }
    }

    /// Compute and keep the values of `key` unless already kept
    ///
    /// `dataset` must be the one the catalog was built from.
    pub fn cache_values(&mut self, dataset: &Dataset, key: &str) -> &TagValues {
        if !self.value_cache.contains_key(key) {
            let values = Self::values(dataset, key);
            tracing::debug!("Cached {} values of tag {:?}", values.values.len(), key);
            self.value_cache.insert(key.to_owned(), values);
        }
        &self.value_cache[key]
    }

    /// Values of `key` if [`TagCatalog::cache_values`] computed them
    #[inline]
    pub fn cached_values(&self, key: &str) -> Option<&TagValues> {
        self.value_cache.get(key)
    }

    #[inline]
    pub fn tags(&self) -> &[TagCount] {
        &self.tags
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.name.as_str())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Node, Way};

    fn create_test_dataset() -> Dataset {
        Dataset::new(
            vec![
                Node::new(1, 0.0, 0.0).with_tag("shop", "bakery").with_tag("name", "A"),
                Node::new(2, 0.0, 0.0).with_tag("shop", "bakery"),
                Node::new(3, 0.0, 0.0).with_tag("shop", "butcher"),
                Node::new(4, 0.0, 0.0).with_tag("amenity", "cafe"),
                Node::new(5, 0.0, 0.0),
            ],
            vec![
                Way::new(10, vec![1, 2]).with_tag("highway", "residential").with_tag("name", "B"),
            ],
        )
    }

    #[test]
    fn test_catalog_sorted_by_count_then_name() {
        let catalog = TagCatalog::build(&create_test_dataset());
        let names: Vec<&str> = catalog.keys().collect();
        assert_eq!(names, vec!["shop", "name", "amenity", "highway"]);
        assert_eq!(catalog.tags()[0].count, 3);
        assert_eq!(catalog.tags()[1].count, 2);
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn test_catalog_spans_chunks() {
        let nodes: Vec<Node> = (0..12_001)
            .map(|i| Node::new(i, 0.0, 0.0).with_tag("k", "v"))
            .collect();
        let catalog = TagCatalog::build(&Dataset::new(nodes, vec![]));
        assert_eq!(catalog.tags(), &[TagCount { name: "k".into(), count: 12_001 }]);
    }

    #[test]
    fn test_values_with_total() {
        let values = TagCatalog::values(&create_test_dataset(), "shop");
        assert_eq!(values.total, 3);
        assert_eq!(
            values.values,
            vec![
                TagCount { name: "bakery".into(), count: 2 },
                TagCount { name: "butcher".into(), count: 1 },
            ]
        );
        assert_eq!(values.top(1).len(), 1);
        assert!(values.is_truncated(1));
        assert!(!values.is_truncated(20));
    }

    #[test]
    fn test_empty_values_are_not_listed() {
        let dataset = Dataset::new(
            vec![
                Node::new(1, 0.0, 0.0).with_tag("shop", ""),
                Node::new(2, 0.0, 0.0).with_tag("shop", "bakery"),
            ],
            vec![],
        );
        let values = TagCatalog::values(&dataset, "shop");
        assert_eq!(values.total, 1);
        assert_eq!(values.values, vec![TagCount { name: "bakery".into(), count: 1 }]);
        // The key itself is still present on both
        assert_eq!(TagCatalog::build(&dataset).tags()[0].count, 2);
    }

    #[test]
    fn test_cached_values_computed_once() {
        let dataset = create_test_dataset();
        let mut catalog = TagCatalog::build(&dataset);
        assert!(catalog.cached_values("shop").is_none());

        let expected = TagCatalog::values(&dataset, "shop");
        assert_eq!(catalog.cache_values(&dataset, "shop"), &expected);
        assert_eq!(catalog.cached_values("shop"), Some(&expected));

        // A kept entry is not recomputed, even against other data
        let other = Dataset::default();
        assert_eq!(catalog.cache_values(&other, "shop"), &expected);
        assert!(catalog.cached_values("amenity").is_none());
    }

    #[test]
    fn test_unknown_key_and_empty_dataset() {
        assert_eq!(TagCatalog::values(&create_test_dataset(), "nope"), TagValues::default());
        assert!(TagCatalog::build(&Dataset::default()).is_empty());
    }
}
