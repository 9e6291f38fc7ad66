//! Two-section CSV: entities, a blank line, then relations.

use crate::graph::Graph;
use crate::primitives::LIST_SEPARATOR;
use crate::{Entity, Relation};

const ENTITY_HEADER: &str = "name,entityType,observations,createdAt,lastModified,tags,importance";
const RELATION_HEADER: &str = "from,to,relationType,createdAt,lastModified";

/// Render `graph` as CSV.
#[must_use]
pub fn to_csv(graph: &Graph) -> String {
    let mut out = String::new();
    out.push_str("# Entities\n");
    out.push_str(ENTITY_HEADER);
    out.push('\n');
    for entity in &graph.entities {
        push_row(&mut out, &entity_row(entity));
    }

    out.push('\n');
    out.push_str("# Relations\n");
    out.push_str(RELATION_HEADER);
    out.push('\n');
    for relation in &graph.relations {
        push_row(&mut out, &relation_row(relation));
    }
    out
}

fn entity_row(entity: &Entity) -> [String; 7] {
    [
        entity.name.clone(),
        entity.entity_type.clone(),
        entity.observations.join(LIST_SEPARATOR),
        entity.created_at.to_rfc3339(),
        entity.last_modified.to_rfc3339(),
        entity.tag_list().join(LIST_SEPARATOR),
        entity.importance.map(|i| i.to_string()).unwrap_or_default(),
    ]
}

fn relation_row(relation: &Relation) -> [String; 5] {
    [
        relation.from.clone(),
        relation.to.clone(),
        relation.relation_type.clone(),
        relation.created_at.to_rfc3339(),
        relation.last_modified.to_rfc3339(),
    ]
}

fn push_row(out: &mut String, fields: &[String]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(field));
    }
    out.push('\n');
}

/// Quote a field iff it contains a comma, a double quote or a newline (LF);
/// inner quotes are doubled. A bare CR is emitted verbatim.
pub(crate) fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
