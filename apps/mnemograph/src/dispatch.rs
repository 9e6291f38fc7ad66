//! # Request Dispatch
//!
//! Typed requests in, JSON responses out.
//!
//! A request line is `{"operation": "<name>", "arguments": {...}}`. It is
//! decoded into [`Request`] before the store is touched, so unknown
//! operations and malformed arguments never reach a `Session`.

use mnemograph_core::{
    DateRangeQuery, ExportFilter, GraphError, GraphStore, NewEntity, NewRelation,
    ObservationAddition, ObservationDeletion, RelationKey, SearchQuery, Session,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// REQUEST
// =============================================================================

/// One decoded operation with its arguments.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "operation",
    content = "arguments",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Request {
    CreateEntities {
        entities: Vec<NewEntity>,
    },
    CreateRelations {
        relations: Vec<NewRelation>,
    },
    AddObservations {
        observations: Vec<ObservationAddition>,
    },
    DeleteEntities {
        entity_names: Vec<String>,
    },
    DeleteObservations {
        deletions: Vec<ObservationDeletion>,
    },
    DeleteRelations {
        relations: Vec<RelationKey>,
    },
    AddTags {
        entity_name: String,
        tags: Vec<String>,
    },
    RemoveTags {
        entity_name: String,
        tags: Vec<String>,
    },
    SetImportance {
        entity_name: String,
        importance: f64,
    },
    ReadGraph {},
    SearchNodes(SearchQuery),
    OpenNodes {
        names: Vec<String>,
    },
    SearchByDateRange(DateRangeQuery),
    GetStats {},
    ExportGraph {
        format: String,
        #[serde(flatten)]
        filter: ExportFilter,
    },
}

/// Outer shape of a request line; `arguments` may be omitted for
/// operations that take none.
#[derive(Deserialize)]
struct Envelope {
    operation: String,
    #[serde(default)]
    arguments: Option<Value>,
}

impl Request {
    /// Decode one request from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let envelope: Envelope = serde_json::from_str(text)?;
        let mut tagged = Map::new();
        tagged.insert("operation".to_string(), Value::String(envelope.operation));
        tagged.insert(
            "arguments".to_string(),
            envelope
                .arguments
                .filter(|args| !args.is_null())
                .unwrap_or_else(|| Value::Object(Map::new())),
        );
        serde_json::from_value(Value::Object(tagged))
    }

    /// The snake_case operation name, for logging.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::CreateEntities { .. } => "create_entities",
            Self::CreateRelations { .. } => "create_relations",
            Self::AddObservations { .. } => "add_observations",
            Self::DeleteEntities { .. } => "delete_entities",
            Self::DeleteObservations { .. } => "delete_observations",
            Self::DeleteRelations { .. } => "delete_relations",
            Self::AddTags { .. } => "add_tags",
            Self::RemoveTags { .. } => "remove_tags",
            Self::SetImportance { .. } => "set_importance",
            Self::ReadGraph {} => "read_graph",
            Self::SearchNodes(_) => "search_nodes",
            Self::OpenNodes { .. } => "open_nodes",
            Self::SearchByDateRange(_) => "search_by_date_range",
            Self::GetStats {} => "get_stats",
            Self::ExportGraph { .. } => "export_graph",
        }
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

/// `{"ok": true, "result": ...}` or `{"ok": false, "error": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

/// Error kind for requests rejected before reaching the store.
pub const INVALID_REQUEST: &str = "invalid_request";

impl Response {
    #[must_use]
    pub fn success(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(ErrorBody {
                kind: kind.into(),
                message: message.into(),
            }),
        }
    }
}

impl From<GraphError> for Response {
    fn from(error: GraphError) -> Self {
        Self::failure(error.kind().as_str(), error.to_string())
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Decode `line` and run it against `session`.
pub fn handle_line<S: GraphStore>(session: &Session<S>, line: &str) -> Response {
    match Request::from_json(line) {
        Ok(request) => dispatch(session, request),
        Err(e) => {
            tracing::warn!(error = %e, "Rejected malformed request");
            Response::failure(INVALID_REQUEST, e.to_string())
        }
    }
}

/// Run one decoded request.
pub fn dispatch<S: GraphStore>(session: &Session<S>, request: Request) -> Response {
    let operation = request.operation();
    match execute(session, request) {
        Ok(result) => {
            tracing::debug!(operation, "Request completed");
            Response::success(result)
        }
        Err(e) => {
            tracing::warn!(operation, kind = e.kind().as_str(), error = %e, "Request failed");
            Response::from(e)
        }
    }
}

fn execute<S: GraphStore>(session: &Session<S>, request: Request) -> Result<Value, GraphError> {
    match request {
        Request::CreateEntities { entities } => to_value(session.create_entities(entities)?),
        Request::CreateRelations { relations } => to_value(session.create_relations(relations)?),
        Request::AddObservations { observations } => {
            to_value(session.add_observations(observations)?)
        }
        Request::DeleteEntities { entity_names } => {
            to_value(session.delete_entities(&entity_names)?)
        }
        Request::DeleteObservations { deletions } => {
            to_value(session.delete_observations(&deletions)?)
        }
        Request::DeleteRelations { relations } => to_value(session.delete_relations(&relations)?),
        Request::AddTags { entity_name, tags } => to_value(session.add_tags(&entity_name, &tags)?),
        Request::RemoveTags { entity_name, tags } => {
            to_value(session.remove_tags(&entity_name, &tags)?)
        }
        Request::SetImportance {
            entity_name,
            importance,
        } => to_value(session.set_importance(&entity_name, importance)?),
        Request::ReadGraph {} => to_value(session.read_graph()?),
        Request::SearchNodes(query) => to_value(session.search_nodes(&query)?),
        Request::OpenNodes { names } => to_value(session.open_nodes(&names)?),
        Request::SearchByDateRange(query) => to_value(session.search_by_date_range(&query)?),
        Request::GetStats {} => to_value(session.stats()?),
        Request::ExportGraph { format, filter } => {
            Ok(Value::String(session.export_graph(&format, &filter)?))
        }
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, GraphError> {
    serde_json::to_value(value).map_err(|e| GraphError::Serialization(e.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================
