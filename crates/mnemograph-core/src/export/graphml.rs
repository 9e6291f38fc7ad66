//! GraphML document with typed attribute keys.

use crate::graph::Graph;
use crate::primitives::LIST_SEPARATOR;

/// `(id, for, attr.name, attr.type)` for every declared key.
const KEYS: [(&str, &str, &str, &str); 9] = [
    ("entityType", "node", "entityType", "string"),
    ("observations", "node", "observations", "string"),
    ("createdAt", "node", "createdAt", "string"),
    ("lastModified", "node", "lastModified", "string"),
    ("tags", "node", "tags", "string"),
    ("importance", "node", "importance", "double"),
    ("relationType", "edge", "relationType", "string"),
    ("edgeCreatedAt", "edge", "createdAt", "string"),
    ("edgeLastModified", "edge", "lastModified", "string"),
];

/// Render `graph` as GraphML. Edge ids are `e0`, `e1`, ... in store order.
#[must_use]
pub fn to_graphml(graph: &Graph) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">\n");
    for (id, target, name, kind) in KEYS {
        out.push_str(&format!(
            "  <key id=\"{id}\" for=\"{target}\" attr.name=\"{name}\" attr.type=\"{kind}\"/>\n"
        ));
    }
    out.push_str("  <graph id=\"G\" edgedefault=\"directed\">\n");

    for entity in &graph.entities {
        out.push_str(&format!("    <node id=\"{}\">\n", escape(&entity.name)));
        push_data(&mut out, "entityType", &entity.entity_type);
        push_data(&mut out, "observations", &entity.observations.join(LIST_SEPARATOR));
        push_data(&mut out, "createdAt", &entity.created_at.to_rfc3339());
        push_data(&mut out, "lastModified", &entity.last_modified.to_rfc3339());
        if let Some(tags) = &entity.tags {
            push_data(&mut out, "tags", &tags.join(LIST_SEPARATOR));
        }
        if let Some(importance) = entity.importance {
            push_data(&mut out, "importance", &importance.to_string());
        }
        out.push_str("    </node>\n");
    }

    for (n, relation) in graph.relations.iter().enumerate() {
        out.push_str(&format!(
            "    <edge id=\"e{n}\" source=\"{}\" target=\"{}\">\n",
            escape(&relation.from),
            escape(&relation.to)
        ));
        push_data(&mut out, "relationType", &relation.relation_type);
        push_data(&mut out, "edgeCreatedAt", &relation.created_at.to_rfc3339());
        push_data(&mut out, "edgeLastModified", &relation.last_modified.to_rfc3339());
        out.push_str("    </edge>\n");
    }

    out.push_str("  </graph>\n");
    out.push_str("</graphml>\n");
    out
}

fn push_data(out: &mut String, key: &str, value: &str) {
    out.push_str(&format!(
        "      <data key=\"{key}\">{}</data>\n",
        escape(value)
    ));
}

/// Escape the five XML special characters.
pub(crate) fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
