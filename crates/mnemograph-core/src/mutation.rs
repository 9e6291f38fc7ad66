//! # Mutation Engine
//!
//! Pure, in-memory graph transforms. Each function takes the loaded graph and
//! the operation's single `now` reading, changes the graph in place, and
//! returns exactly what changed. Persisting is the caller's job (`Session`),
//! which saves only after the transform returned `Ok`.
//!
//! Invariants enforced here:
//! - entity names and relation triples stay unique (duplicates are skipped)
//! - importance stays in `[0, 10]`
//! - tags stay lowercase and unique; an emptied tag set becomes absent
//! - `lastModified` advances only on actual change, except `set_importance`
//! - deleting an entity removes every relation that touches it

use crate::graph::Graph;
use crate::primitives::{IMPORTANCE_MAX, IMPORTANCE_MIN};
use crate::{
    AddedObservations, Entity, GraphError, ImportanceSet, NewEntity, NewRelation,
    ObservationAddition, ObservationDeletion, Relation, RelationKey, TagsAdded, TagsRemoved,
    Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which entities `delete_relations` stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointStamping {
    /// Stamp the endpoints of relations that were actually removed.
    #[default]
    OnChange,
    /// Stamp every entity named as an endpoint in the request, whether or
    /// not a matching relation existed.
    Always,
}

/// What a delete operation removed, and which surviving entities it stamped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Removed {
    pub entities: usize,
    pub relations: usize,
    pub observations: usize,
    /// Names whose `lastModified` was set to the operation's `now`, in name
    /// order.
    pub touched_entities: Vec<String>,
}

/// The MutationEngine groups every graph-changing transform.
pub struct MutationEngine;

impl MutationEngine {
    /// Reject importance values outside `[0, 10]` (and NaN).
    pub fn validate_importance(importance: f64) -> Result<f64, GraphError> {
        if (IMPORTANCE_MIN..=IMPORTANCE_MAX).contains(&importance) {
            Ok(importance)
        } else {
            Err(GraphError::Validation(format!(
                "Importance must be between {} and {}, got {}",
                IMPORTANCE_MIN, IMPORTANCE_MAX, importance
            )))
        }
    }

    /// Lowercase and de-duplicate tags, keeping first-seen order.
    #[must_use]
    pub fn normalize_tags(tags: &[String]) -> Vec<String> {
        dedupe(tags.iter().map(|t| t.to_lowercase()))
    }

    /// Insert entities whose names are not yet taken.
    ///
    /// Every candidate's importance is validated before anything is
    /// inserted, so one bad value rejects the whole batch.
    pub fn create_entities(
        graph: &mut Graph,
        candidates: Vec<NewEntity>,
        now: Timestamp,
    ) -> Result<Vec<Entity>, GraphError> {
        for candidate in &candidates {
            if let Some(importance) = candidate.importance {
                Self::validate_importance(importance)?;
            }
        }

        let mut created = Vec::new();
        for candidate in candidates {
            if graph.contains_entity(&candidate.name) {
                continue;
            }
            let created_at = candidate.created_at.unwrap_or(now);
            let entity = Entity {
                name: candidate.name,
                entity_type: candidate.entity_type,
                observations: dedupe(candidate.observations),
                created_at,
                last_modified: candidate.last_modified.unwrap_or(now).max(created_at),
                tags: candidate
                    .tags
                    .map(|tags| Self::normalize_tags(&tags))
                    .filter(|tags| !tags.is_empty()),
                importance: candidate.importance,
            };
            graph.entities.push(entity.clone());
            created.push(entity);
        }
        Ok(created)
    }

    /// Insert relations whose `(from, to, relationType)` is not yet taken.
    pub fn create_relations(
        graph: &mut Graph,
        candidates: Vec<NewRelation>,
        now: Timestamp,
    ) -> Vec<Relation> {
        let mut created = Vec::new();
        for candidate in candidates {
            if graph.contains_relation(&candidate.key()) {
                continue;
            }
            let created_at = candidate.created_at.unwrap_or(now);
            let relation = Relation {
                from: candidate.from,
                to: candidate.to,
                relation_type: candidate.relation_type,
                created_at,
                last_modified: candidate.last_modified.unwrap_or(now).max(created_at),
            };
            graph.relations.push(relation.clone());
            created.push(relation);
        }
        created
    }

    /// Append observations not already present.
    ///
    /// Fails with `EntityNotFound` on the first unknown entity name.
    pub fn add_observations(
        graph: &mut Graph,
        additions: Vec<ObservationAddition>,
        now: Timestamp,
    ) -> Result<Vec<AddedObservations>, GraphError> {
        let mut results = Vec::with_capacity(additions.len());
        for addition in additions {
            let entity = graph.require_entity_mut(&addition.entity_name)?;
            let mut added = Vec::new();
            for content in addition.contents {
                if !entity.observations.contains(&content) {
                    entity.observations.push(content.clone());
                    added.push(content);
                }
            }
            if !added.is_empty() {
                entity.touch(now);
            }
            results.push(AddedObservations {
                entity_name: addition.entity_name,
                added_observations: added,
            });
        }
        Ok(results)
    }

    /// Remove named entities and every relation touching them.
    pub fn delete_entities(graph: &mut Graph, names: &[String]) -> Removed {
        let doomed: BTreeSet<&str> = names.iter().map(String::as_str).collect();

        let entities_before = graph.entities.len();
        graph
            .entities
            .retain(|e| !doomed.contains(e.name.as_str()));

        let relations_before = graph.relations.len();
        graph
            .relations
            .retain(|r| !doomed.contains(r.from.as_str()) && !doomed.contains(r.to.as_str()));

        Removed {
            entities: entities_before - graph.entities.len(),
            relations: relations_before - graph.relations.len(),
            ..Removed::default()
        }
    }

    /// Remove listed observations; unknown entities and strings are ignored.
    pub fn delete_observations(
        graph: &mut Graph,
        deletions: &[ObservationDeletion],
        now: Timestamp,
    ) -> Removed {
        let mut removed = 0;
        let mut touched = BTreeSet::new();
        for deletion in deletions {
            let Some(entity) = graph.entity_mut(&deletion.entity_name) else {
                continue;
            };
            let before = entity.observations.len();
            entity
                .observations
                .retain(|o| !deletion.observations.contains(o));
            let dropped = before - entity.observations.len();
            if dropped > 0 {
                entity.touch(now);
                touched.insert(entity.name.clone());
                removed += dropped;
            }
        }
        Removed {
            observations: removed,
            touched_entities: touched.into_iter().collect(),
            ..Removed::default()
        }
    }

    /// Remove relations matching any key, then stamp endpoints per `stamping`.
    pub fn delete_relations(
        graph: &mut Graph,
        keys: &[RelationKey],
        now: Timestamp,
        stamping: EndpointStamping,
    ) -> Removed {
        let before = graph.relations.len();
        let mut touched: BTreeSet<String> = BTreeSet::new();
        graph.relations.retain(|relation| {
            if keys.iter().any(|key| relation.matches(key)) {
                touched.insert(relation.from.clone());
                touched.insert(relation.to.clone());
                false
            } else {
                true
            }
        });

        if stamping == EndpointStamping::Always {
            for key in keys {
                touched.insert(key.from.clone());
                touched.insert(key.to.clone());
            }
        }
        touched.retain(|name| graph.touch_entity(name, now));

        Removed {
            relations: before - graph.relations.len(),
            touched_entities: touched.into_iter().collect(),
            ..Removed::default()
        }
    }

    /// Union `tags` (lowercased) into the entity's tag set.
    pub fn add_tags(
        graph: &mut Graph,
        entity_name: &str,
        tags: &[String],
        now: Timestamp,
    ) -> Result<TagsAdded, GraphError> {
        let requested = Self::normalize_tags(tags);
        let entity = graph.require_entity_mut(entity_name)?;

        let mut current = entity.tags.take().unwrap_or_default();
        let added: Vec<String> = requested
            .into_iter()
            .filter(|tag| !current.iter().any(|existing| existing.to_lowercase() == *tag))
            .collect();
        current.extend(added.iter().cloned());
        entity.tags = (!current.is_empty()).then_some(current);

        if !added.is_empty() {
            entity.touch(now);
        }
        Ok(TagsAdded {
            entity_name: entity_name.to_string(),
            added_tags: added,
        })
    }

    /// Remove tags, matching case-insensitively.
    ///
    /// The removed list is the set difference between the stored tags and
    /// the lowercased request.
    pub fn remove_tags(
        graph: &mut Graph,
        entity_name: &str,
        tags: &[String],
        now: Timestamp,
    ) -> Result<TagsRemoved, GraphError> {
        let requested: BTreeSet<String> = Self::normalize_tags(tags).into_iter().collect();
        let entity = graph.require_entity_mut(entity_name)?;

        let current = entity.tags.take().unwrap_or_default();
        let (removed, kept): (Vec<String>, Vec<String>) = current
            .into_iter()
            .partition(|tag| requested.contains(&tag.to_lowercase()));
        entity.tags = (!kept.is_empty()).then_some(kept);

        if !removed.is_empty() {
            entity.touch(now);
        }
        Ok(TagsRemoved {
            entity_name: entity_name.to_string(),
            removed_tags: removed,
        })
    }

    /// Set the importance score. Always stamps, even if unchanged.
    pub fn set_importance(
        graph: &mut Graph,
        entity_name: &str,
        importance: f64,
        now: Timestamp,
    ) -> Result<ImportanceSet, GraphError> {
        let importance = Self::validate_importance(importance)?;
        let entity = graph.require_entity_mut(entity_name)?;
        entity.importance = Some(importance);
        entity.touch(now);
        Ok(ImportanceSet {
            entity_name: entity_name.to_string(),
            importance,
        })
    }
}

/// Drop repeated strings, keeping the first occurrence of each.
fn dedupe(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
