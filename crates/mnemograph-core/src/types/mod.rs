//! # Core Type Definitions
//!
//! This module contains the value types shared by every layer of the store:
//! - Graph records (`Entity`, `Relation`, `RelationKey`)
//! - Time (`Timestamp`)
//! - Operation inputs (`NewEntity`, `NewRelation`, `ObservationAddition`, ...)
//! - Operation results (`AddedObservations`, `TagsAdded`, ...)
//! - Error types (`GraphError`, `ErrorKind`)
//!
//! All JSON shapes use camelCase field names, matching the backing file.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// TIMESTAMP
// =============================================================================

/// A UTC instant with millisecond precision.
///
/// Serialized as RFC 3339 with exactly three fractional digits and a `Z`
/// suffix (`2024-05-01T12:00:00.000Z`). Parsing accepts any RFC 3339 offset
/// and normalizes to UTC. Sub-millisecond precision is truncated on
/// construction so that an in-memory value always equals its reloaded form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Wrap a chrono instant, truncating to milliseconds.
    #[must_use]
    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        Self(instant.trunc_subsecs(3))
    }

    /// Parse an RFC 3339 string.
    pub fn parse(s: &str) -> Result<Self, GraphError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self::from_datetime(dt.with_timezone(&Utc)))
            .map_err(|e| GraphError::Validation(format!("Invalid timestamp '{}': {}", s, e)))
    }

    /// The underlying chrono instant.
    #[must_use]
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Canonical string form used on disk and in every export.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl FromStr for Timestamp {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// IMPORTANCE
// =============================================================================

/// Importance scores are `f64`, but whole values are written as JSON
/// integers (`6`, not `6.0`) so files written by older tools come back
/// byte-identical after a rewrite.
mod importance_format {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.fract() == 0.0 && value.abs() <= i64::MAX as f64 {
            serializer.serialize_i64(*value as i64)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn serialize_opt<S: Serializer>(
        value: &Option<f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }
}

// =============================================================================
// ENTITY
// =============================================================================

/// A uniquely named node of the knowledge graph.
///
/// `tags` and `importance` are optional: absent means "none", and an absent
/// field is never written to disk. A present tag list is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Globally unique, case-sensitive, immutable.
    pub name: String,
    /// Free-form classification.
    pub entity_type: String,
    /// Facts in insertion order, duplicate-free.
    pub observations: Vec<String>,
    pub created_at: Timestamp,
    pub last_modified: Timestamp,
    /// Lowercase, duplicate-free labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Priority score in `[0, 10]`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "importance_format::serialize_opt"
    )]
    pub importance: Option<f64>,
}

impl Entity {
    /// Tag slice, empty when the entity carries no tags.
    #[must_use]
    pub fn tag_list(&self) -> &[String] {
        self.tags.as_deref().unwrap_or(&[])
    }

    /// Date used by range filters: `lastModified`.
    #[must_use]
    pub fn effective_date(&self) -> Timestamp {
        self.last_modified
    }

    /// Advance `lastModified`, never moving it backwards past `createdAt`.
    pub fn touch(&mut self, now: Timestamp) {
        self.last_modified = now.max(self.created_at);
    }
}

// =============================================================================
// RELATION
// =============================================================================

/// The identity of a relation: `(from, to, relationType)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationKey {
    pub from: String,
    pub to: String,
    pub relation_type: String,
}

impl RelationKey {
    /// Create a new relation key.
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            relation_type: relation_type.into(),
        }
    }
}

/// A directed, typed edge between two entity names.
///
/// Endpoints are plain names; the referenced entities need not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub from: String,
    pub to: String,
    pub relation_type: String,
    pub created_at: Timestamp,
    pub last_modified: Timestamp,
}

impl Relation {
    /// Whether this relation has the given identity.
    #[must_use]
    pub fn matches(&self, key: &RelationKey) -> bool {
        self.from == key.from && self.to == key.to && self.relation_type == key.relation_type
    }

    /// Whether `name` is either endpoint.
    #[must_use]
    pub fn touches(&self, name: &str) -> bool {
        self.from == name || self.to == name
    }

    /// Owned identity triple.
    #[must_use]
    pub fn key(&self) -> RelationKey {
        RelationKey::new(&self.from, &self.to, &self.relation_type)
    }

    /// Date used by range filters: `lastModified`.
    #[must_use]
    pub fn effective_date(&self) -> Timestamp {
        self.last_modified
    }
}

// =============================================================================
// OPERATION INPUTS
// =============================================================================

/// A candidate entity for `create_entities`.
///
/// Timestamps default to the current time when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntity {
    pub name: String,
    pub entity_type: String,
    #[serde(default)]
    pub observations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,
}

impl NewEntity {
    /// A bare candidate with no timestamps, tags or importance.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        entity_type: impl Into<String>,
        observations: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            observations,
            created_at: None,
            last_modified: None,
            tags: None,
            importance: None,
        }
    }

    /// Attach tags (normalized on insert).
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Attach an importance score (validated on insert).
    #[must_use]
    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = Some(importance);
        self
    }
}

/// A candidate relation for `create_relations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRelation {
    pub from: String,
    pub to: String,
    pub relation_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
}

impl NewRelation {
    /// A candidate relation stamped with the current time on insert.
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            relation_type: relation_type.into(),
            created_at: None,
            last_modified: None,
        }
    }

    /// Identity triple of the candidate.
    #[must_use]
    pub fn key(&self) -> RelationKey {
        RelationKey::new(&self.from, &self.to, &self.relation_type)
    }
}

/// Observations to append to one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationAddition {
    pub entity_name: String,
    pub contents: Vec<String>,
}

/// Observations to remove from one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationDeletion {
    pub entity_name: String,
    pub observations: Vec<String>,
}

// =============================================================================
// OPERATION RESULTS
// =============================================================================

/// Observations actually appended to one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedObservations {
    pub entity_name: String,
    pub added_observations: Vec<String>,
}

/// Tags actually added to one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagsAdded {
    pub entity_name: String,
    pub added_tags: Vec<String>,
}

/// Tags actually removed from one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagsRemoved {
    pub entity_name: String,
    pub removed_tags: Vec<String>,
}

/// The importance now stored on one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportanceSet {
    pub entity_name: String,
    #[serde(serialize_with = "importance_format::serialize")]
    pub importance: f64,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the store.
///
/// Every error aborts only the operation in progress. Because `save` runs at
/// most once per operation, after every in-memory transform has succeeded, an
/// error never leaves a partial write behind.
#[derive(Debug, Error)]
pub enum GraphError {
    /// An operation requires an entity that does not exist.
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// An argument violates a data-model invariant.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Export requested with an unknown format identifier.
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// Reading, writing or renaming the backing file failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// A line of the backing file is not a valid record.
    #[error("Decode error on line {line}: {message}")]
    Decode { line: usize, message: String },

    /// A record could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backing file lock could not be acquired in time.
    #[error("Store lock busy: {0}")]
    LockBusy(String),
}

/// Coarse classification of a [`GraphError`] for callers that report errors
/// across a transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Validation,
    UnsupportedFormat,
    Storage,
}

impl ErrorKind {
    /// Stable snake_case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::UnsupportedFormat => "unsupported_format",
            Self::Storage => "storage",
        }
    }
}

impl GraphError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EntityNotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::Io(_) | Self::Decode { .. } | Self::Serialization(_) | Self::LockBusy(_) => {
                ErrorKind::Storage
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_serializes_with_millis_and_z() {
        let ts = Timestamp::parse("2024-05-01T12:00:00Z").expect("parse");
        assert_eq!(ts.to_rfc3339(), "2024-05-01T12:00:00.000Z");

        let json = serde_json::to_string(&ts).expect("serialize");
        assert_eq!(json, "\"2024-05-01T12:00:00.000Z\"");
    }

    #[test]
    fn timestamp_normalizes_offset_and_truncates() {
        let ts = Timestamp::parse("2024-05-01T14:00:00.123456+02:00").expect("parse");
        assert_eq!(ts.to_string(), "2024-05-01T12:00:00.123Z");
    }

    #[test]
    fn timestamp_rejects_garbage() {
        let result = Timestamp::parse("yesterday");
        assert!(matches!(result, Err(GraphError::Validation(_))));
    }

    #[test]
    fn entity_omits_absent_optionals() {
        let ts = Timestamp::parse("2024-01-01T00:00:00Z").expect("parse");
        let entity = Entity {
            name: "A".to_string(),
            entity_type: "x".to_string(),
            observations: vec![],
            created_at: ts,
            last_modified: ts,
            tags: None,
            importance: None,
        };

        let json = serde_json::to_string(&entity).expect("serialize");
        assert!(!json.contains("tags"));
        assert!(!json.contains("importance"));
        assert!(json.contains("\"entityType\":\"x\""));
    }

    #[test]
    fn whole_importance_is_written_as_integer() {
        let line = r#"{"name":"A","entityType":"x","observations":[],"createdAt":"2024-01-01T00:00:00.000Z","lastModified":"2024-01-01T00:00:00.000Z","importance":6}"#;

        let entity: Entity = serde_json::from_str(line).expect("deserialize");
        assert_eq!(entity.importance, Some(6.0));
        assert_eq!(serde_json::to_string(&entity).expect("serialize"), line);

        let fractional = Entity {
            importance: Some(2.5),
            ..entity.clone()
        };
        let json = serde_json::to_string(&fractional).expect("serialize");
        assert!(json.contains("\"importance\":2.5"));

        let set = ImportanceSet {
            entity_name: "A".to_string(),
            importance: 10.0,
        };
        assert_eq!(
            serde_json::to_value(&set).expect("serialize")["importance"],
            serde_json::json!(10)
        );
    }

    #[test]
    fn touch_never_precedes_creation() {
        let created = Timestamp::parse("2024-01-02T00:00:00Z").expect("parse");
        let earlier = Timestamp::parse("2024-01-01T00:00:00Z").expect("parse");
        let mut entity = Entity {
            name: "A".to_string(),
            entity_type: "x".to_string(),
            observations: vec![],
            created_at: created,
            last_modified: created,
            tags: None,
            importance: None,
        };

        entity.touch(earlier);
        assert_eq!(entity.last_modified, created);
    }

    #[test]
    fn relation_identity() {
        let ts = Timestamp::parse("2024-01-01T00:00:00Z").expect("parse");
        let relation = Relation {
            from: "A".to_string(),
            to: "B".to_string(),
            relation_type: "knows".to_string(),
            created_at: ts,
            last_modified: ts,
        };

        assert!(relation.matches(&RelationKey::new("A", "B", "knows")));
        assert!(!relation.matches(&RelationKey::new("B", "A", "knows")));
        assert!(relation.touches("B"));
        assert!(!relation.touches("C"));
    }

    #[test]
    fn error_kinds() {
        assert_eq!(
            GraphError::EntityNotFound("x".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            GraphError::Decode {
                line: 3,
                message: "bad".into()
            }
            .kind(),
            ErrorKind::Storage
        );
        assert_eq!(ErrorKind::UnsupportedFormat.as_str(), "unsupported_format");
    }
}
