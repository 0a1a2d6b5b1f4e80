//! Element storage module
//!
//! This module provides the OSM element model (nodes and ways with free-form tags) and
//! the `Dataset` that owns one load worth of elements together with id lookups.

use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Free-form `key -> value` annotations attached to an element
pub type Tags = HashMap<String, String>;

/// A single point element
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Node {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "HashMap::is_empty"))]
    pub tags: Tags,
}

/// An ordered polyline of node references
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Way {
    pub id: i64,
    /// Referenced node ids; some may be absent from the loaded node set
    pub nodes: Vec<i64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "HashMap::is_empty"))]
    pub tags: Tags,
}

/// Either kind of element, tagged the way OSM JSON tags them (`"type": "node"`)
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "type", rename_all = "lowercase")
)]
pub enum Element {
    Node(Node),
    Way(Way),
}

/// Discriminant of [`Element`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum ElementKind {
    Node,
    Way,
}

/// A reference to an element that never touches the element itself
///
/// Hover and selection state hold these instead of tagging the element in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementRef {
    pub kind: ElementKind,
    pub id: i64,
}

impl Node {
    pub fn new(id: i64, lat: f64, lon: f64) -> Self {
        Self {
            id,
            lat,
            lon,
            tags: Tags::new(),
        }
    }

    /// Builder-style helper to attach one tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    #[inline]
    pub fn reference(&self) -> ElementRef {
        ElementRef::node(self.id)
    }

    /// The `name` tag, used for labels
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.tags.get("name").map(String::as_str)
    }
}

impl Way {
    pub fn new(id: i64, nodes: Vec<i64>) -> Self {
        Self {
            id,
            nodes,
            tags: Tags::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    #[inline]
    pub fn reference(&self) -> ElementRef {
        ElementRef::way(self.id)
    }
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Node(_) => ElementKind::Node,
            Element::Way(_) => ElementKind::Way,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Element::Node(node) => node.id,
            Element::Way(way) => way.id,
        }
    }

    pub fn tags(&self) -> &Tags {
        match self {
            Element::Node(node) => &node.tags,
            Element::Way(way) => &way.tags,
        }
    }

    pub fn reference(&self) -> ElementRef {
        ElementRef {
            kind: self.kind(),
            id: self.id(),
        }
    }
}

impl ElementRef {
    #[inline]
    pub fn node(id: i64) -> Self {
        Self {
            kind: ElementKind::Node,
            id,
        }
    }

    #[inline]
    pub fn way(id: i64) -> Self {
        Self {
            kind: ElementKind::Way,
            id,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Node => f.write_str("node"),
            ElementKind::Way => f.write_str("way"),
        }
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// All elements of one load, immutable after construction
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    nodes: Vec<Node>,
    ways: Vec<Way>,
    /// Node id -> index into `nodes`
    node_index: HashMap<i64, usize>,
    /// Way id -> index into `ways`
    way_index: HashMap<i64, usize>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Dataset {
    /// Build a dataset, keeping nodes and ways in the given order
    ///
    /// Duplicate ids keep every element for drawing, but lookups resolve to the last one.
    pub fn new(nodes: Vec<Node>, ways: Vec<Way>) -> Self {
        let mut node_index = HashMap::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            if node_index.insert(node.id, index).is_some() {
                tracing::debug!("Duplicate node id {}, last occurrence wins", node.id);
            }
        }

        let mut way_index = HashMap::with_capacity(ways.len());
        for (index, way) in ways.iter().enumerate() {
            if way_index.insert(way.id, index).is_some() {
                tracing::debug!("Duplicate way id {}, last occurrence wins", way.id);
            }
        }

        Self {
            nodes,
            ways,
            node_index,
            way_index,
        }
    }

    /// Split a mixed element list into nodes and ways, preserving relative order
    pub fn from_elements(elements: impl IntoIterator<Item = Element>) -> Self {
        let mut nodes = Vec::new();
        let mut ways = Vec::new();
        for element in elements {
            match element {
                Element::Node(node) => nodes.push(node),
                Element::Way(way) => ways.push(way),
            }
        }
        Self::new(nodes, ways)
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[inline]
    pub fn ways(&self) -> &[Way] {
        &self.ways
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.ways.is_empty()
    }

    /// Total number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len() + self.ways.len()
    }

    #[inline]
    pub fn node(&self, id: i64) -> Option<&Node> {
        self.node_index.get(&id).map(|&index| &self.nodes[index])
    }

    #[inline]
    pub fn way(&self, id: i64) -> Option<&Way> {
        self.way_index.get(&id).map(|&index| &self.ways[index])
    }

    /// Present vertices of a way, in order; dangling references are skipped
    pub fn way_vertices<'a>(&'a self, way: &'a Way) -> impl Iterator<Item = &'a Node> + 'a {
        way.nodes.iter().filter_map(move |id| self.node(*id))
    }

    /// Consecutive pairs of referenced nodes where both ends are present
    ///
    /// A pair with a dangling end is skipped entirely rather than bridged.
    pub fn way_segments<'a>(
        &'a self,
        way: &'a Way,
    ) -> impl Iterator<Item = (&'a Node, &'a Node)> + 'a {
        way.nodes
            .windows(2)
            .filter_map(move |pair| Some((self.node(pair[0])?, self.node(pair[1])?)))
    }

    /// A way needs at least two present vertices to be indexed or drawn
    pub fn is_renderable(&self, way: &Way) -> bool {
        self.way_vertices(way).nth(1).is_some()
    }

    /// Tags of the referenced element, if it exists
    pub fn tags_of(&self, element: ElementRef) -> Option<&Tags> {
        match element.kind {
            ElementKind::Node => self.node(element.id).map(|n| &n.tags),
            ElementKind::Way => self.way(element.id).map(|w| &w.tags),
        }
    }

    /// Owned copy of the referenced element, for read-outs
    pub fn element(&self, element: ElementRef) -> Option<Element> {
        match element.kind {
            ElementKind::Node => self.node(element.id).cloned().map(Element::Node),
            ElementKind::Way => self.way(element.id).cloned().map(Element::Way),
        }
    }

    pub fn contains(&self, element: ElementRef) -> bool {
        match element.kind {
            ElementKind::Node => self.node_index.contains_key(&element.id),
            ElementKind::Way => self.way_index.contains_key(&element.id),
        }
    }
}
