//! # Session Module
//!
//! The store handle every operation goes through.
//!
//! A `Session` is constructed explicitly with a `GraphStore` and a `Clock`;
//! there is no process-wide store. Each call is one full cycle:
//!
//! - Mutations: in-process mutex → `store.acquire()` → `load` →
//!   `MutationEngine` transform → `save`. A transform error returns before
//!   `save`, so a failed call persists nothing.
//! - Reads: in-process mutex → `load` → projection. No file lock.
//!
//! Every stamp written by one call comes from a single `clock.now()`
//! reading taken at the start of that call.

use crate::clock::{Clock, SystemClock};
use crate::export::{self, ExportFilter, ExportFormat};
use crate::graph::{Graph, GraphStore};
use crate::mutation::{EndpointStamping, MutationEngine, Removed};
use crate::query::{DateRangeQuery, QueryEngine, SearchQuery};
use crate::storage::JsonlStore;
use crate::system::GraphStats;
use crate::{
    AddedObservations, Entity, GraphError, ImportanceSet, NewEntity, NewRelation,
    ObservationAddition, ObservationDeletion, Relation, RelationKey, TagsAdded, TagsRemoved,
    Timestamp,
};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// A graph store handle. See the module docs for the call cycle.
pub struct Session<S: GraphStore = JsonlStore> {
    store: S,
    clock: Arc<dyn Clock>,
    gate: Mutex<()>,
    endpoint_stamping: EndpointStamping,
}

impl Session<JsonlStore> {
    /// A session over the backing file at `path`, using wall-clock time.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_store(JsonlStore::new(path), Arc::new(SystemClock))
    }
}

impl<S: GraphStore> Session<S> {
    /// A session over an explicit store and clock.
    #[must_use]
    pub fn with_store(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            gate: Mutex::new(()),
            endpoint_stamping: EndpointStamping::default(),
        }
    }

    /// Select which entities `delete_relations` stamps.
    #[must_use]
    pub fn with_endpoint_stamping(mut self, stamping: EndpointStamping) -> Self {
        self.endpoint_stamping = stamping;
        self
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn endpoint_stamping(&self) -> EndpointStamping {
        self.endpoint_stamping
    }

    // =========================================================================
    // CALL CYCLE
    // =========================================================================

    fn mutate<T>(
        &self,
        operation: &'static str,
        transform: impl FnOnce(&mut Graph, Timestamp) -> Result<T, GraphError>,
    ) -> Result<T, GraphError> {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = self.store.acquire()?;
        let now = self.clock.now();
        let mut graph = self.store.load(now)?;

        let outcome = transform(&mut graph, now).inspect_err(|e| {
            tracing::debug!(operation, error = %e, "Mutation rejected");
        })?;

        self.store.save(&graph)?;
        tracing::debug!(operation, "Mutation committed");
        Ok(outcome)
    }

    fn read<T>(&self, project: impl FnOnce(Graph) -> T) -> Result<T, GraphError> {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let graph = self.store.load(self.clock.now())?;
        Ok(project(graph))
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Create entities whose names are not already taken. Returns only the
    /// newly created entities.
    pub fn create_entities(&self, entities: Vec<NewEntity>) -> Result<Vec<Entity>, GraphError> {
        self.mutate("create_entities", |graph, now| {
            MutationEngine::create_entities(graph, entities, now)
        })
    }

    /// Create relations whose `(from, to, relationType)` is not already
    /// taken. Endpoints are not required to exist.
    pub fn create_relations(
        &self,
        relations: Vec<NewRelation>,
    ) -> Result<Vec<Relation>, GraphError> {
        self.mutate("create_relations", |graph, now| {
            Ok(MutationEngine::create_relations(graph, relations, now))
        })
    }

    pub fn add_observations(
        &self,
        additions: Vec<ObservationAddition>,
    ) -> Result<Vec<AddedObservations>, GraphError> {
        self.mutate("add_observations", |graph, now| {
            MutationEngine::add_observations(graph, additions, now)
        })
    }

    /// Delete entities and every relation touching them.
    pub fn delete_entities(&self, names: &[String]) -> Result<Removed, GraphError> {
        self.mutate("delete_entities", |graph, _now| {
            let removed = MutationEngine::delete_entities(graph, names);
            tracing::debug!(
                entities = removed.entities,
                relations = removed.relations,
                "Deleted entities"
            );
            Ok(removed)
        })
    }

    pub fn delete_observations(
        &self,
        deletions: &[ObservationDeletion],
    ) -> Result<Removed, GraphError> {
        self.mutate("delete_observations", |graph, now| {
            Ok(MutationEngine::delete_observations(graph, deletions, now))
        })
    }

    /// Stamped endpoints are reported in `Removed::touched_entities`.
    pub fn delete_relations(&self, relations: &[RelationKey]) -> Result<Removed, GraphError> {
        let stamping = self.endpoint_stamping;
        self.mutate("delete_relations", |graph, now| {
            Ok(MutationEngine::delete_relations(graph, relations, now, stamping))
        })
    }

    pub fn add_tags(&self, entity_name: &str, tags: &[String]) -> Result<TagsAdded, GraphError> {
        self.mutate("add_tags", |graph, now| {
            MutationEngine::add_tags(graph, entity_name, tags, now)
        })
    }

    pub fn remove_tags(
        &self,
        entity_name: &str,
        tags: &[String],
    ) -> Result<TagsRemoved, GraphError> {
        self.mutate("remove_tags", |graph, now| {
            MutationEngine::remove_tags(graph, entity_name, tags, now)
        })
    }

    pub fn set_importance(
        &self,
        entity_name: &str,
        importance: f64,
    ) -> Result<ImportanceSet, GraphError> {
        self.mutate("set_importance", |graph, now| {
            MutationEngine::set_importance(graph, entity_name, importance, now)
        })
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// The full graph.
    pub fn read_graph(&self) -> Result<Graph, GraphError> {
        self.read(|graph| graph)
    }

    pub fn search_nodes(&self, query: &SearchQuery) -> Result<Graph, GraphError> {
        self.read(|graph| QueryEngine::search_nodes(&graph, query))
    }

    pub fn open_nodes(&self, names: &[String]) -> Result<Graph, GraphError> {
        self.read(|graph| QueryEngine::open_nodes(&graph, names))
    }

    pub fn search_by_date_range(&self, query: &DateRangeQuery) -> Result<Graph, GraphError> {
        self.read(|graph| QueryEngine::search_by_date_range(&graph, query))
    }

    pub fn stats(&self) -> Result<GraphStats, GraphError> {
        self.read(|graph| GraphStats::from_graph(&graph))
    }

    /// Export the graph, narrowed by `filter` when any of its fields is set.
    ///
    /// `format` is checked before the store is read.
    pub fn export_graph(&self, format: &str, filter: &ExportFilter) -> Result<String, GraphError> {
        let format: ExportFormat = format.parse()?;
        let graph = self.read(|graph| {
            if filter.is_unbounded() {
                graph
            } else {
                QueryEngine::search_by_date_range(&graph, filter)
            }
        })?;
        export::encode(&graph, format)
    }
}

impl<S: GraphStore + fmt::Debug> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store)
            .field("endpoint_stamping", &self.endpoint_stamping)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================
