//! # Graph Statistics
//!
//! Aggregate counts and extremes, computed fresh from a loaded graph.
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `entityCount` / `relationCount` | collection sizes |
//! | `entityTypes` / `relationTypes` | per-type histograms |
//! | `oldest*` / `newest*` | extremes by `createdAt`, first-seen wins ties |
//! | `entityDateRange` / `relationDateRange` | `[earliest, latest]` `createdAt`, omitted when empty |

use crate::graph::Graph;
use crate::{Entity, Relation, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// STATS TYPES
// =============================================================================

/// A named entity and when it was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMarker {
    pub name: String,
    pub created_at: Timestamp,
}

/// A relation identity and when it was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationMarker {
    pub from: String,
    pub to: String,
    pub relation_type: String,
    pub created_at: Timestamp,
}

/// Inclusive `createdAt` span of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: Timestamp,
    pub latest: Timestamp,
}

/// Aggregate statistics over one graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub entity_count: usize,
    pub relation_count: usize,
    pub entity_types: BTreeMap<String, usize>,
    pub relation_types: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oldest_entity: Option<EntityMarker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newest_entity: Option<EntityMarker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oldest_relation: Option<RelationMarker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newest_relation: Option<RelationMarker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_date_range: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_date_range: Option<DateRange>,
}

impl GraphStats {
    /// Compute statistics from a graph.
    #[must_use]
    pub fn from_graph(graph: &Graph) -> Self {
        let mut entity_types = BTreeMap::new();
        for entity in &graph.entities {
            *entity_types.entry(entity.entity_type.clone()).or_insert(0) += 1;
        }
        let mut relation_types = BTreeMap::new();
        for relation in &graph.relations {
            *relation_types
                .entry(relation.relation_type.clone())
                .or_insert(0) += 1;
        }

        let (oldest_entity, newest_entity) = extremes(&graph.entities, |e| e.created_at);
        let (oldest_relation, newest_relation) = extremes(&graph.relations, |r| r.created_at);

        Self {
            entity_count: graph.entities.len(),
            relation_count: graph.relations.len(),
            entity_types,
            relation_types,
            entity_date_range: span(oldest_entity, newest_entity, |e| e.created_at),
            relation_date_range: span(oldest_relation, newest_relation, |r| r.created_at),
            oldest_entity: oldest_entity.map(EntityMarker::from),
            newest_entity: newest_entity.map(EntityMarker::from),
            oldest_relation: oldest_relation.map(RelationMarker::from),
            newest_relation: newest_relation.map(RelationMarker::from),
        }
    }
}

impl From<&Entity> for EntityMarker {
    fn from(entity: &Entity) -> Self {
        Self {
            name: entity.name.clone(),
            created_at: entity.created_at,
        }
    }
}

impl From<&Relation> for RelationMarker {
    fn from(relation: &Relation) -> Self {
        Self {
            from: relation.from.clone(),
            to: relation.to.clone(),
            relation_type: relation.relation_type.clone(),
            created_at: relation.created_at,
        }
    }
}

/// Oldest and newest item; a later item replaces the current extreme only
/// when strictly older or strictly newer.
fn extremes<T>(items: &[T], date: impl Fn(&T) -> Timestamp) -> (Option<&T>, Option<&T>) {
    let mut oldest: Option<&T> = None;
    let mut newest: Option<&T> = None;
    for item in items {
        let at = date(item);
        if oldest.is_none_or(|current| at < date(current)) {
            oldest = Some(item);
        }
        if newest.is_none_or(|current| at > date(current)) {
            newest = Some(item);
        }
    }
    (oldest, newest)
}

fn span<T>(
    oldest: Option<&T>,
    newest: Option<&T>,
    date: impl Fn(&T) -> Timestamp,
) -> Option<DateRange> {
    Some(DateRange {
        earliest: date(oldest?),
        latest: date(newest?),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).expect("timestamp")
    }

    fn entity(name: &str, entity_type: &str, created: &str) -> Entity {
        Entity {
            name: name.to_string(),
            entity_type: entity_type.to_string(),
            observations: vec![],
            created_at: ts(created),
            last_modified: ts(created),
            tags: None,
            importance: None,
        }
    }

    #[test]
    fn empty_graph_has_no_extremes_or_ranges() {
        let stats = GraphStats::from_graph(&Graph::new());
        assert_eq!(stats, GraphStats::default());

        let json = serde_json::to_value(&stats).expect("serialize");
        assert!(json.get("entityDateRange").is_none());
        assert!(json.get("oldestEntity").is_none());
        assert_eq!(json["entityCount"], 0);
    }

    #[test]
    fn histograms_and_extremes() {
        let graph = Graph::with_data(
            vec![
                entity("B", "person", "2024-02-01T00:00:00Z"),
                entity("A", "person", "2024-01-01T00:00:00Z"),
                entity("C", "project", "2024-03-01T00:00:00Z"),
            ],
            vec![Relation {
                from: "A".to_string(),
                to: "C".to_string(),
                relation_type: "owns".to_string(),
                created_at: ts("2024-04-01T00:00:00Z"),
                last_modified: ts("2024-04-01T00:00:00Z"),
            }],
        );

        let stats = GraphStats::from_graph(&graph);
        assert_eq!(stats.entity_count, 3);
        assert_eq!(stats.entity_types.get("person"), Some(&2));
        assert_eq!(stats.relation_types.get("owns"), Some(&1));
        assert_eq!(stats.oldest_entity.map(|m| m.name), Some("A".to_string()));
        assert_eq!(stats.newest_entity.map(|m| m.name), Some("C".to_string()));
        assert_eq!(
            stats.entity_date_range,
            Some(DateRange {
                earliest: ts("2024-01-01T00:00:00Z"),
                latest: ts("2024-03-01T00:00:00Z"),
            })
        );
        assert_eq!(stats.oldest_relation, stats.newest_relation);
    }

    #[test]
    fn ties_keep_first_seen() {
        let graph = Graph::with_data(
            vec![
                entity("first", "x", "2024-01-01T00:00:00Z"),
                entity("second", "x", "2024-01-01T00:00:00Z"),
            ],
            vec![],
        );

        let stats = GraphStats::from_graph(&graph);
        assert_eq!(stats.oldest_entity.map(|m| m.name), Some("first".to_string()));
        assert_eq!(stats.newest_entity.map(|m| m.name), Some("first".to_string()));
    }
}
