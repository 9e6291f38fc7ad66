//! # Query Module
//!
//! Read-only projections over a loaded graph.
//!
//! - `search_nodes`: case-insensitive substring match with tag and
//!   importance filters
//! - `open_nodes`: exact name lookup
//! - `search_by_date_range`: timestamp window with type and tag filters
//!
//! Every projection keeps store order and returns the induced subgraph:
//! only relations whose two endpoints are both in the result survive.

use crate::graph::Graph;
use crate::{Entity, Relation, Timestamp};
use serde::{Deserialize, Serialize};

// =============================================================================
// QUERY TYPES
// =============================================================================

/// Free-text search with optional filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Substring matched against name, type and observations.
    pub query: String,
    /// When non-empty, entities must carry at least one of these tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_importance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_importance: Option<f64>,
}

impl SearchQuery {
    /// Search for `query` with no filters.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    #[must_use]
    pub fn with_min_importance(mut self, min: f64) -> Self {
        self.min_importance = Some(min);
        self
    }

    #[must_use]
    pub fn with_max_importance(mut self, max: f64) -> Self {
        self.max_importance = Some(max);
        self
    }
}

/// Timestamp window with optional type and tag filters. Bounds are
/// inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl DateRangeQuery {
    /// True when no filter field is set.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.start_date.is_none()
            && self.end_date.is_none()
            && self.entity_type.is_none()
            && self.tags.is_none()
    }

    fn contains(&self, instant: Timestamp) -> bool {
        self.start_date.is_none_or(|start| instant >= start)
            && self.end_date.is_none_or(|end| instant <= end)
    }
}

// =============================================================================
// QUERY ENGINE
// =============================================================================

/// Stateless projections over a borrowed graph.
pub struct QueryEngine;

impl QueryEngine {
    /// Entities whose name, type or any observation contains `query`
    /// (case-insensitive), narrowed by the tag and importance filters.
    #[must_use]
    pub fn search_nodes(graph: &Graph, query: &SearchQuery) -> Graph {
        let needle = query.query.to_lowercase();
        let entities = graph
            .entities
            .iter()
            .filter(|e| text_matches(e, &needle))
            .filter(|e| tags_overlap(e, query.tags.as_deref()))
            .filter(|e| importance_within(e, query.min_importance, query.max_importance))
            .cloned()
            .collect();
        Graph::induced(entities, &graph.relations)
    }

    /// Entities whose names appear in `names`, in store order.
    #[must_use]
    pub fn open_nodes(graph: &Graph, names: &[String]) -> Graph {
        let entities = graph
            .entities
            .iter()
            .filter(|e| names.contains(&e.name))
            .cloned()
            .collect();
        Graph::induced(entities, &graph.relations)
    }

    /// Entities whose effective date falls in the window, and the relations
    /// between them whose own effective date also falls in it.
    #[must_use]
    pub fn search_by_date_range(graph: &Graph, query: &DateRangeQuery) -> Graph {
        let entities: Vec<Entity> = graph
            .entities
            .iter()
            .filter(|e| query.contains(e.effective_date()))
            .filter(|e| {
                query
                    .entity_type
                    .as_deref()
                    .is_none_or(|wanted| e.entity_type == wanted)
            })
            .filter(|e| tags_overlap(e, query.tags.as_deref()))
            .cloned()
            .collect();

        let dated: Vec<Relation> = graph
            .relations
            .iter()
            .filter(|r| query.contains(r.effective_date()))
            .cloned()
            .collect();
        Graph::induced(entities, &dated)
    }
}

// =============================================================================
// FILTERS
// =============================================================================

fn text_matches(entity: &Entity, needle: &str) -> bool {
    entity.name.to_lowercase().contains(needle)
        || entity.entity_type.to_lowercase().contains(needle)
        || entity
            .observations
            .iter()
            .any(|o| o.to_lowercase().contains(needle))
}

/// An empty or absent filter passes everything; otherwise untagged
/// entities never match.
fn tags_overlap(entity: &Entity, wanted: Option<&[String]>) -> bool {
    match wanted {
        None | Some([]) => true,
        Some(wanted) => entity.tag_list().iter().any(|tag| {
            let tag = tag.to_lowercase();
            wanted.iter().any(|w| w.to_lowercase() == tag)
        }),
    }
}

fn importance_within(entity: &Entity, min: Option<f64>, max: Option<f64>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    entity.importance.is_some_and(|value| {
        min.is_none_or(|min| value >= min) && max.is_none_or(|max| value <= max)
    })
}

// =============================================================================
// TESTS
// =============================================================================
