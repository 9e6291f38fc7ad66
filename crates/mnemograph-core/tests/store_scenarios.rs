//! # Store Scenario Tests
//!
//! End-to-end behaviour through `Session` over a real backing file.

use mnemograph_core::{
    DateRangeQuery, EndpointStamping, ExportFilter, GraphError, GraphStore, JsonlStore,
    ManualClock, NewEntity, NewRelation, ObservationAddition, ObservationDeletion, RelationKey,
    SearchQuery, Session, StoreLock, StoreOptions, Timestamp,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn start() -> Timestamp {
    Timestamp::parse("2024-01-01T00:00:00Z").expect("timestamp")
}

fn session_at(path: &Path) -> Session<JsonlStore> {
    Session::with_store(
        JsonlStore::new(path),
        Arc::new(ManualClock::starting_at(start())),
    )
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn ts(s: &str) -> Timestamp {
    Timestamp::parse(s).expect("timestamp")
}

// =============================================================================
// MUTATION SCENARIOS
// =============================================================================

mod mutations {
    use super::*;

    #[test]
    fn create_then_add_observations_filters_duplicates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = session_at(&dir.path().join("memory.jsonl"));

        let created = session
            .create_entities(vec![NewEntity::new("A", "x", strings(&["o1"]))])
            .expect("create");
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "A");
        assert_eq!(created[0].created_at, created[0].last_modified);

        let added = session
            .add_observations(vec![ObservationAddition {
                entity_name: "A".to_string(),
                contents: strings(&["o1", "o2"]),
            }])
            .expect("add");
        assert_eq!(added[0].added_observations, strings(&["o2"]));

        let graph = session.read_graph().expect("read");
        assert_eq!(graph.entities[0].observations, strings(&["o1", "o2"]));
        assert!(graph.entities[0].last_modified > created[0].last_modified);
    }

    #[test]
    fn delete_relation_stamps_both_endpoints() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = session_at(&dir.path().join("memory.jsonl"));

        session
            .create_entities(vec![
                NewEntity::new("A", "x", vec![]),
                NewEntity::new("B", "x", vec![]),
            ])
            .expect("create");
        session
            .create_relations(vec![NewRelation::new("A", "B", "knows")])
            .expect("relate");
        let before = session.read_graph().expect("read");

        session
            .delete_relations(&[RelationKey::new("A", "B", "knows")])
            .expect("delete");

        let after = session.read_graph().expect("read");
        assert!(after.relations.is_empty());
        for (old, new) in before.entities.iter().zip(&after.entities) {
            assert!(new.last_modified > old.last_modified, "{} not stamped", new.name);
        }
    }

    #[test]
    fn on_change_stamping_ignores_missing_relations() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = session_at(&dir.path().join("memory.jsonl"))
            .with_endpoint_stamping(EndpointStamping::OnChange);

        session
            .create_entities(vec![NewEntity::new("A", "x", vec![])])
            .expect("create");
        let before = session.read_graph().expect("read");

        session
            .delete_relations(&[RelationKey::new("A", "Z", "knows")])
            .expect("delete");

        let after = session.read_graph().expect("read");
        assert_eq!(after.entities[0].last_modified, before.entities[0].last_modified);
    }

    #[test]
    fn delete_entity_cascades_to_relations_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memory.jsonl");
        let session = session_at(&path);

        session
            .create_entities(vec![
                NewEntity::new("A", "x", vec![]),
                NewEntity::new("B", "x", vec![]),
            ])
            .expect("create");
        session
            .create_relations(vec![
                NewRelation::new("A", "B", "knows"),
                NewRelation::new("B", "A", "knows"),
            ])
            .expect("relate");

        session.delete_entities(&strings(&["A"])).expect("delete");

        let text = fs::read_to_string(&path).expect("read file");
        assert_eq!(text.lines().count(), 1);
        assert!(!text.contains(r#""type":"relation""#));
    }

    #[test]
    fn delete_observations_tolerates_unknowns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = session_at(&dir.path().join("memory.jsonl"));

        session
            .create_entities(vec![NewEntity::new("A", "x", strings(&["o1", "o2"]))])
            .expect("create");
        session
            .delete_observations(&[
                ObservationDeletion {
                    entity_name: "A".to_string(),
                    observations: strings(&["o1", "nope"]),
                },
                ObservationDeletion {
                    entity_name: "ghost".to_string(),
                    observations: strings(&["o2"]),
                },
            ])
            .expect("delete");

        let graph = session.read_graph().expect("read");
        assert_eq!(graph.entities[0].observations, strings(&["o2"]));
    }

    #[test]
    fn invalid_importance_leaves_file_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memory.jsonl");
        let session = session_at(&path);

        session
            .create_entities(vec![NewEntity::new("A", "x", vec![])])
            .expect("create");
        let before = fs::read_to_string(&path).expect("read");

        let result = session.create_entities(vec![
            NewEntity::new("B", "x", vec![]),
            NewEntity::new("C", "x", vec![]).with_importance(-0.5),
        ]);
        assert!(matches!(result, Err(GraphError::Validation(_))));

        let result = session.set_importance("A", 10.5);
        assert!(matches!(result, Err(GraphError::Validation(_))));

        assert_eq!(fs::read_to_string(&path).expect("read"), before);
    }

    #[test]
    fn lock_file_is_released_after_each_mutation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memory.jsonl");
        let session = session_at(&path);

        session
            .create_entities(vec![NewEntity::new("A", "x", vec![])])
            .expect("create");
        assert!(!session.store().lock_path().exists());

        let _ = session.add_tags("missing", &strings(&["t"]));
        assert!(!session.store().lock_path().exists());
    }

    #[test]
    fn held_lock_yields_lock_busy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memory.jsonl");
        let options = StoreOptions {
            lock_timeout: Duration::from_millis(60),
            ..StoreOptions::default()
        };
        let store = JsonlStore::with_options(&path, options);
        let holder = StoreLock::acquire(&store.lock_path(), Duration::ZERO).expect("hold lock");

        let session = Session::with_store(store, Arc::new(ManualClock::starting_at(start())));
        let result = session.create_entities(vec![NewEntity::new("A", "x", vec![])]);
        assert!(matches!(result, Err(GraphError::LockBusy(_))));

        drop(holder);
        assert!(session.create_entities(vec![NewEntity::new("A", "x", vec![])]).is_ok());
    }
}

// =============================================================================
// BACKING FILE
// =============================================================================

mod backing_file {
    use super::*;

    #[test]
    fn missing_timestamps_are_filled_on_read_without_rewriting() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memory.jsonl");
        let legacy = concat!(
            r#"{"type":"entity","name":"A","entityType":"x","observations":[]}"#,
            "\n",
            r#"{"type":"mystery","payload":1}"#,
            "\n\n",
            r#"{"type":"relation","from":"A","to":"B","relationType":"r","createdAt":"2023-06-01T00:00:00Z"}"#,
            "\n",
        );
        fs::write(&path, legacy).expect("write");

        let session = session_at(&path);
        let graph = session.read_graph().expect("read");

        assert_eq!(graph.entities.len(), 1);
        assert_eq!(graph.entities[0].created_at, start());
        assert_eq!(graph.entities[0].last_modified, start());
        assert_eq!(graph.relations.len(), 1);
        assert_eq!(
            graph.relations[0].last_modified,
            Timestamp::parse("2023-06-01T00:00:00Z").expect("timestamp")
        );

        assert_eq!(fs::read_to_string(&path).expect("read"), legacy);
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memory.jsonl");
        fs::write(
            &path,
            "{\"type\":\"entity\",\"name\":\"A\",\"entityType\":\"x\"}\n{not json\n",
        )
        .expect("write");

        let result = session_at(&path).read_graph();
        assert!(matches!(result, Err(GraphError::Decode { line: 2, .. })));
    }

    #[test]
    fn store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memory.jsonl");

        session_at(&path)
            .create_entities(vec![NewEntity::new("A", "x", vec![]).with_tags(strings(&["Work"]))])
            .expect("create");

        let reopened = JsonlStore::new(&path).load(start()).expect("load");
        assert_eq!(reopened.entities[0].tags, Some(strings(&["work"])));
    }
}

// =============================================================================
// QUERIES AND EXPORT
// =============================================================================

mod queries {
    use super::*;

    #[test]
    fn search_with_importance_excludes_unscored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = session_at(&dir.path().join("memory.jsonl"));

        session
            .create_entities(vec![
                NewEntity::new("proj-alpha", "project", vec![])
                    .with_tags(strings(&["work"]))
                    .with_importance(6.0),
                NewEntity::new("proj-beta", "project", vec![]).with_tags(strings(&["work"])),
            ])
            .expect("create");

        let query = SearchQuery::new("proj")
            .with_tags(strings(&["work"]))
            .with_min_importance(5.0);
        let graph = session.search_nodes(&query).expect("search");

        let names: Vec<&str> = graph.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["proj-alpha"]);
    }

    #[test]
    fn csv_export_quotes_commas() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = session_at(&dir.path().join("memory.jsonl"));

        session
            .create_entities(vec![NewEntity::new(
                "A",
                "x",
                strings(&[r#"likes "tea", mostly"#]),
            )])
            .expect("create");

        let csv = session
            .export_graph("csv", &ExportFilter::default())
            .expect("export");
        assert!(csv.contains(r#"A,x,"likes ""tea"", mostly","#));
    }

    #[test]
    fn unsupported_export_format() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = session_at(&dir.path().join("memory.jsonl"));

        let result = session.export_graph("pdf", &ExportFilter::default());
        assert!(matches!(result, Err(GraphError::UnsupportedFormat(_))));
    }

    #[test]
    fn open_nodes_on_unknown_names_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = session_at(&dir.path().join("memory.jsonl"));

        session
            .create_entities(vec![NewEntity::new("A", "x", vec![])])
            .expect("create");
        let graph = session.open_nodes(&strings(&["Z"])).expect("open");
        assert!(graph.is_empty());
    }

    fn dated_entity(name: &str, at: &str) -> NewEntity {
        NewEntity {
            created_at: Some(ts(at)),
            last_modified: Some(ts(at)),
            ..NewEntity::new(name, "event", vec![])
        }
    }

    fn dated_relation(from: &str, to: &str, at: &str) -> NewRelation {
        NewRelation {
            created_at: Some(ts(at)),
            last_modified: Some(ts(at)),
            ..NewRelation::new(from, to, "follows")
        }
    }

    #[test]
    fn date_range_search_through_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = session_at(&dir.path().join("memory.jsonl"));

        session
            .create_entities(vec![
                dated_entity("jan", "2024-01-15T00:00:00Z").with_tags(strings(&["work"])),
                dated_entity("feb", "2024-02-15T00:00:00Z").with_tags(strings(&["Work"])),
                dated_entity("feb-bare", "2024-02-20T00:00:00Z"),
                dated_entity("mar", "2024-03-15T00:00:00Z"),
            ])
            .expect("create");
        session
            .create_relations(vec![
                dated_relation("feb", "jan", "2024-02-16T00:00:00Z"),
                dated_relation("feb", "feb-bare", "2024-02-21T00:00:00Z"),
                dated_relation("feb-bare", "mar", "2024-03-20T00:00:00Z"),
            ])
            .expect("relate");

        let february = DateRangeQuery {
            start_date: Some(ts("2024-02-01T00:00:00Z")),
            end_date: Some(ts("2024-02-28T23:59:59Z")),
            ..DateRangeQuery::default()
        };
        let graph = session.search_by_date_range(&february).expect("search");
        let names: Vec<&str> = graph.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["feb", "feb-bare"]);
        assert_eq!(graph.relations.len(), 1);
        assert_eq!(graph.relations[0].to, "feb-bare");

        let tagged = DateRangeQuery {
            tags: Some(strings(&["work"])),
            ..february
        };
        let graph = session.search_by_date_range(&tagged).expect("search");
        let names: Vec<&str> = graph.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["feb"]);
        assert!(graph.relations.is_empty());
    }

    #[test]
    fn json_export_reloads_field_for_field() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = session_at(&dir.path().join("memory.jsonl"));

        session
            .create_entities(vec![
                NewEntity::new("Ada", "person", strings(&["wrote \"notes\", often", "é ü"]))
                    .with_tags(strings(&["Math", "history"]))
                    .with_importance(6.0),
                NewEntity::new("Engine", "machine", vec![]).with_importance(2.5),
                NewEntity::new("London", "place", strings(&["line\nbreak"])),
            ])
            .expect("create");
        session
            .create_relations(vec![
                NewRelation::new("Ada", "Engine", "described"),
                NewRelation::new("Ada", "London", "lived_in"),
                NewRelation::new("Engine", "London", "built_in"),
            ])
            .expect("relate");
        let original = session.read_graph().expect("read");

        let exported = session
            .export_graph("json", &ExportFilter::default())
            .expect("export");
        let value: serde_json::Value = serde_json::from_str(&exported).expect("parse export");

        let mut lines = String::new();
        for (section, tag) in [("entities", "entity"), ("relations", "relation")] {
            for object in value[section].as_array().expect("section") {
                let mut record = object.clone();
                record["type"] = serde_json::Value::from(tag);
                lines.push_str(&record.to_string());
                lines.push('\n');
            }
        }
        let copy = dir.path().join("copy.jsonl");
        fs::write(&copy, lines).expect("write copy");

        let reloaded = JsonlStore::new(&copy)
            .load(ts("2030-01-01T00:00:00Z"))
            .expect("reload");
        assert_eq!(reloaded, original);
        assert_eq!(reloaded.relations.len(), 3);
        assert!(exported.contains("\"importance\": 6\n") || exported.contains("\"importance\": 6,"));
    }
}
