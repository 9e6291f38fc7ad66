//! # Record Codec
//!
//! One line of the backing file holds one JSON object tagged by a `type`
//! field of `"entity"` or `"relation"`:
//!
//! ```text
//! {"type":"entity","name":"A","entityType":"person","observations":["o1"],"createdAt":"...","lastModified":"..."}
//! {"type":"relation","from":"A","to":"B","relationType":"knows","createdAt":"...","lastModified":"..."}
//! ```
//!
//! ## Compatibility
//!
//! - Records written before timestamps existed are back-filled on decode:
//!   missing `createdAt` becomes the decode time, missing `lastModified`
//!   inherits `createdAt`. This happens in memory only.
//! - Unknown `type` values (and lines without one) are skipped.
//! - `tags` and `importance` are written only when present.

use crate::graph::Graph;
use crate::primitives::{ENTITY_RECORD_TAG, RECORD_TAG_FIELD, RELATION_RECORD_TAG};
use crate::{Entity, GraphError, Relation, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// RECORD
// =============================================================================

/// One decoded line of the backing file.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Entity(Entity),
    Relation(Relation),
}

/// Borrowed, tagged view used for encoding.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RecordRef<'a> {
    Entity(&'a Entity),
    Relation(&'a Relation),
}

/// Entity fields as found on disk, before back-fill.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntity {
    name: String,
    entity_type: String,
    #[serde(default)]
    observations: Vec<String>,
    #[serde(default)]
    created_at: Option<Timestamp>,
    #[serde(default)]
    last_modified: Option<Timestamp>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    importance: Option<f64>,
}

impl StoredEntity {
    fn into_entity(self, now: Timestamp) -> Entity {
        let created_at = self.created_at.unwrap_or(now);
        Entity {
            name: self.name,
            entity_type: self.entity_type,
            observations: self.observations,
            created_at,
            last_modified: self.last_modified.unwrap_or(created_at),
            tags: self.tags.filter(|tags| !tags.is_empty()),
            importance: self.importance,
        }
    }
}

/// Relation fields as found on disk, before back-fill.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRelation {
    from: String,
    to: String,
    relation_type: String,
    #[serde(default)]
    created_at: Option<Timestamp>,
    #[serde(default)]
    last_modified: Option<Timestamp>,
}

impl StoredRelation {
    fn into_relation(self, now: Timestamp) -> Relation {
        let created_at = self.created_at.unwrap_or(now);
        Relation {
            from: self.from,
            to: self.to,
            relation_type: self.relation_type,
            created_at,
            last_modified: self.last_modified.unwrap_or(created_at),
        }
    }
}

// =============================================================================
// DECODE
// =============================================================================

/// Decode one line. `line_no` is 1-based and only used in error messages.
///
/// Returns `Ok(None)` for records of an unrecognized type.
pub fn decode_line(
    line: &str,
    line_no: usize,
    now: Timestamp,
) -> Result<Option<Record>, GraphError> {
    let decode_err = |e: serde_json::Error| GraphError::Decode {
        line: line_no,
        message: e.to_string(),
    };

    let value: Value = serde_json::from_str(line).map_err(decode_err)?;
    let tag = value
        .get(RECORD_TAG_FIELD)
        .and_then(Value::as_str)
        .map(str::to_owned);

    match tag.as_deref() {
        Some(ENTITY_RECORD_TAG) => {
            let stored: StoredEntity = serde_json::from_value(value).map_err(decode_err)?;
            Ok(Some(Record::Entity(stored.into_entity(now))))
        }
        Some(RELATION_RECORD_TAG) => {
            let stored: StoredRelation = serde_json::from_value(value).map_err(decode_err)?;
            Ok(Some(Record::Relation(stored.into_relation(now))))
        }
        _ => Ok(None),
    }
}

/// Decode a whole document, preserving line order within each collection.
///
/// Blank lines are skipped. This is a pure transformation - no file I/O.
pub fn graph_from_text(text: &str, now: Timestamp) -> Result<Graph, GraphError> {
    let mut graph = Graph::new();
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match decode_line(trimmed, index + 1, now)? {
            Some(Record::Entity(entity)) => graph.entities.push(entity),
            Some(Record::Relation(relation)) => graph.relations.push(relation),
            None => {}
        }
    }
    Ok(graph)
}

// =============================================================================
// ENCODE
// =============================================================================

/// Encode one entity as a tagged record line (no trailing newline).
pub fn encode_entity(entity: &Entity) -> Result<String, GraphError> {
    serde_json::to_string(&RecordRef::Entity(entity))
        .map_err(|e| GraphError::Serialization(e.to_string()))
}

/// Encode one relation as a tagged record line (no trailing newline).
pub fn encode_relation(relation: &Relation) -> Result<String, GraphError> {
    serde_json::to_string(&RecordRef::Relation(relation))
        .map_err(|e| GraphError::Serialization(e.to_string()))
}

/// Encode a whole graph: every entity, then every relation, one per line.
///
/// This is a pure transformation - no file I/O.
pub fn graph_to_text(graph: &Graph) -> Result<String, GraphError> {
    let mut out = String::new();
    for entity in &graph.entities {
        out.push_str(&encode_entity(entity)?);
        out.push('\n');
    }
    for relation in &graph.relations {
        out.push_str(&encode_relation(relation)?);
        out.push('\n');
    }
    Ok(out)
}

// =============================================================================
// TESTS
// =============================================================================
