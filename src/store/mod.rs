//! Persistence of saved workflows.
//!
//! Saves always write a full snapshot; there is no partial update, delete or
//! concurrency control.

pub mod memory;
pub mod sqlite;

use crate::error::{CommandResult, FlowCanvasError};
use crate::workflow::graph::WorkflowGraph;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const TRACING_TARGET: &str = "flowcanvas::store";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkflow {
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub graph: WorkflowGraph,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub graph: WorkflowGraph,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub trait WorkflowStore {
    /// Stores a snapshot stamped with the current time and returns its new id.
    fn save(&self, workflow: NewWorkflow) -> CommandResult<String>;

    /// All workflows, most recently updated first.
    fn list(&self) -> CommandResult<Vec<WorkflowDocument>>;

    fn get(&self, id: &str) -> CommandResult<WorkflowDocument> {
        self.list()?
            .into_iter()
            .find(|workflow| workflow.id == id)
            .ok_or_else(|| FlowCanvasError::NotFound("Workflow not found".to_string()))
    }
}
