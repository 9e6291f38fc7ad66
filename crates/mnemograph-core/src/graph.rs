//! # Graph
//!
//! The in-memory graph and the storage seam.
//!
//! A `Graph` is two ordered collections held together only by name strings:
//! relations are found by scanning and matching names, never by pointer.
//! Iteration order is load order (file order), which every query and export
//! preserves.
//!
//! The `GraphStore` trait is the boundary between the operations in
//! `Session` and a backing medium. Two implementations exist:
//! - `JsonlStore` (in `storage`): line-delimited file with atomic rewrite
//! - `InMemoryStore`: a mutex-held graph, for tests and embedders

use crate::{Entity, GraphError, Relation, RelationKey, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Mutex;

// =============================================================================
// GRAPH
// =============================================================================

/// Entities plus relations, in load order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph from existing collections.
    #[must_use]
    pub fn with_data(entities: Vec<Entity>, relations: Vec<Relation>) -> Self {
        Self {
            entities,
            relations,
        }
    }

    /// True when there are neither entities nor relations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    /// Find an entity by exact name.
    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Find an entity by exact name (mutable).
    pub fn entity_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.name == name)
    }

    /// Find an entity by exact name, or fail with `EntityNotFound`.
    pub fn require_entity_mut(&mut self, name: &str) -> Result<&mut Entity, GraphError> {
        self.entity_mut(name)
            .ok_or_else(|| GraphError::EntityNotFound(name.to_string()))
    }

    /// Whether an entity with this name exists.
    #[must_use]
    pub fn contains_entity(&self, name: &str) -> bool {
        self.entity(name).is_some()
    }

    /// Whether a relation with this identity exists.
    #[must_use]
    pub fn contains_relation(&self, key: &RelationKey) -> bool {
        self.relations.iter().any(|r| r.matches(key))
    }

    /// Advance `lastModified` on the named entity if it exists.
    ///
    /// Returns whether an entity was stamped.
    pub fn touch_entity(&mut self, name: &str, now: Timestamp) -> bool {
        match self.entity_mut(name) {
            Some(entity) => {
                entity.touch(now);
                true
            }
            None => false,
        }
    }

    /// Names of all entities, for membership checks.
    #[must_use]
    pub fn entity_names(&self) -> BTreeSet<&str> {
        self.entities.iter().map(|e| e.name.as_str()).collect()
    }

    /// Keep the given entities and only the relations whose endpoints are
    /// both among them.
    #[must_use]
    pub fn induced(entities: Vec<Entity>, relations: &[Relation]) -> Self {
        let names: BTreeSet<&str> = entities.iter().map(|e| e.name.as_str()).collect();
        let relations = relations
            .iter()
            .filter(|r| names.contains(r.from.as_str()) && names.contains(r.to.as_str()))
            .cloned()
            .collect();
        Self {
            entities,
            relations,
        }
    }
}

// =============================================================================
// GRAPHSTORE TRAIT
// =============================================================================

/// A medium that can hold one whole graph.
///
/// `load` and `save` always move the complete graph; there is no partial
/// read or append. `acquire` returns a guard held across a load→save window
/// so that no other writer can interleave.
pub trait GraphStore: Send + Sync {
    /// Exclusive-access guard; released on drop.
    type Guard;

    /// Read the full graph. `now` back-fills missing record timestamps.
    ///
    /// A store that has never been written yields an empty graph.
    fn load(&self, now: Timestamp) -> Result<Graph, GraphError>;

    /// Replace the full graph.
    fn save(&self, graph: &Graph) -> Result<(), GraphError>;

    /// Take exclusive access for one load→save window.
    fn acquire(&self) -> Result<Self::Guard, GraphError>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// A `GraphStore` that keeps the graph in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    graph: Mutex<Graph>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `graph`.
    #[must_use]
    pub fn with_graph(graph: Graph) -> Self {
        Self {
            graph: Mutex::new(graph),
        }
    }

    /// A copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> Graph {
        self.graph.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl GraphStore for InMemoryStore {
    type Guard = ();

    fn load(&self, _now: Timestamp) -> Result<Graph, GraphError> {
        Ok(self.snapshot())
    }

    fn save(&self, graph: &Graph) -> Result<(), GraphError> {
        *self.graph.lock().unwrap_or_else(|e| e.into_inner()) = graph.clone();
        Ok(())
    }

    fn acquire(&self) -> Result<Self::Guard, GraphError> {
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
