use super::{NewWorkflow, WorkflowDocument, WorkflowStore, TRACING_TARGET};
use crate::error::{CommandResult, FlowCanvasError};
use crate::workflow::graph::WorkflowGraph;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const SCHEMA_VERSION: i64 = 1;

/// Workflow documents in a single SQLite table; nodes and edges are kept as
/// JSON text next to the scalar columns.
pub struct SqliteStore {
    conn: Connection,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.conn.path())
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    pub fn open(path: &Path) -> CommandResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> CommandResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> CommandResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT
            );
            CREATE TABLE IF NOT EXISTS workflows (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                nodes TEXT NOT NULL,
                edges TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_workflows_updated ON workflows(updated_at);
            ",
        )?;

        let version = conn
            .query_row(
                "SELECT CAST(value AS INTEGER) FROM meta WHERE key = 'schema_version'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        match version {
            None => {
                conn.execute(
                    "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)",
                    params![SCHEMA_VERSION.to_string()],
                )?;
            }
            Some(SCHEMA_VERSION) => {}
            Some(other) => {
                return Err(FlowCanvasError::Storage(format!(
                    "unsupported schema version {}",
                    other
                )));
            }
        }

        Ok(Self { conn })
    }
}

fn timestamp_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> CommandResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|error| FlowCanvasError::Load(format!("bad timestamp {}: {}", raw, error)))
}

struct StoredRow {
    id: String,
    name: String,
    description: String,
    nodes: String,
    edges: String,
    created_at: String,
    updated_at: String,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            nodes: row.get(3)?,
            edges: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_document(self) -> CommandResult<WorkflowDocument> {
        let nodes = serde_json::from_str(&self.nodes)
            .map_err(|error| FlowCanvasError::Load(format!("bad nodes for {}: {}", self.id, error)))?;
        let edges = serde_json::from_str(&self.edges)
            .map_err(|error| FlowCanvasError::Load(format!("bad edges for {}: {}", self.id, error)))?;

        Ok(WorkflowDocument {
            graph: WorkflowGraph::new(nodes, edges),
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            id: self.id,
            name: self.name,
            description: self.description,
        })
    }
}

impl SqliteStore {
    fn list_rows(&self) -> CommandResult<Vec<StoredRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, nodes, edges, created_at, updated_at
             FROM workflows ORDER BY updated_at DESC, rowid DESC",
        )?;
        let rows = stmt
            .query_map([], StoredRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl WorkflowStore for SqliteStore {
    fn save(&self, workflow: NewWorkflow) -> CommandResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp_text(Utc::now());
        let nodes = serde_json::to_string(workflow.graph.nodes())
            .map_err(|error| FlowCanvasError::Storage(error.to_string()))?;
        let edges = serde_json::to_string(workflow.graph.edges())
            .map_err(|error| FlowCanvasError::Storage(error.to_string()))?;

        self.conn.execute(
            "INSERT INTO workflows (id, name, description, nodes, edges, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![id, workflow.name, workflow.description, nodes, edges, now],
        )?;

        tracing::info!(target: TRACING_TARGET, id = %id, name = %workflow.name, "saved workflow");
        Ok(id)
    }

    fn list(&self) -> CommandResult<Vec<WorkflowDocument>> {
        let rows = self.list_rows().map_err(FlowCanvasError::while_loading)?;
        rows.into_iter().map(StoredRow::into_document).collect()
    }

    fn get(&self, id: &str) -> CommandResult<WorkflowDocument> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, description, nodes, edges, created_at, updated_at
                 FROM workflows WHERE id = ?1",
                params![id],
                StoredRow::from_row,
            )
            .optional()
            .map_err(|error| FlowCanvasError::from(error).while_loading())?;

        row.ok_or_else(|| FlowCanvasError::NotFound("Workflow not found".to_string()))?
            .into_document()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::insert::{insert_step, SessionCounter};
    use crate::workflow::node::StepKind;

    fn draft(name: &str) -> NewWorkflow {
        let mut graph = WorkflowGraph::new_linear();
        insert_step(&mut graph, "add-1", StepKind::ApiCall, &mut SessionCounter::new(), 86.0).unwrap();
        NewWorkflow {
            name: name.to_string(),
            description: format!("{} description", name),
            graph,
        }
    }

    #[test]
    fn test_save_and_get_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let saved = draft("Billing");
        let id = store.save(saved.clone()).unwrap();

        let document = store.get(&id).unwrap();
        assert_eq!(document.name, "Billing");
        assert_eq!(document.description, "Billing description");
        assert_eq!(document.graph, saved.graph);
        assert_eq!(document.created_at, document.updated_at);
    }

    #[test]
    fn test_list_is_newest_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store.save(draft("first")).unwrap();
        let second = store.save(draft("second")).unwrap();
        let third = store.save(draft("third")).unwrap();

        let ids = store.list().unwrap().into_iter().map(|doc| doc.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![third, second, first]);
    }

    #[test]
    fn test_get_missing_workflow() {
        let store = SqliteStore::open_in_memory().unwrap();
        let error = store.get("nope").unwrap_err();
        assert!(matches!(error, FlowCanvasError::NotFound(_)));
    }

    #[test]
    fn test_corrupt_row_reports_load_failure() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.save(draft("broken")).unwrap();
        store
            .conn
            .execute("UPDATE workflows SET nodes = 'not json' WHERE id = ?1", params![id])
            .unwrap();

        let error = store.get(&id).unwrap_err();
        assert!(matches!(error, FlowCanvasError::Load(_)));
        assert_eq!(store.list().unwrap_err().user_message(), "Failed to load workflow");
    }

    #[test]
    fn test_reopen_file_keeps_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("flows.sqlite");

        let id = {
            let store = SqliteStore::open(&path).unwrap();
            store.save(draft("persisted")).unwrap()
        };

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get(&id).unwrap().name, "persisted");
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
