use super::{NewWorkflow, WorkflowDocument, WorkflowStore, TRACING_TARGET};
use crate::error::{CommandResult, FlowCanvasError};
use chrono::Utc;
use std::sync::Mutex;

/// Process-local store, used for ephemeral sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<Vec<WorkflowDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with existing documents, timestamps untouched.
    pub fn with_documents(documents: Vec<WorkflowDocument>) -> Self {
        Self {
            documents: Mutex::new(documents),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.lock().map(|documents| documents.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WorkflowStore for MemoryStore {
    fn save(&self, workflow: NewWorkflow) -> CommandResult<String> {
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();
        let document = WorkflowDocument {
            id: id.clone(),
            name: workflow.name,
            description: workflow.description,
            graph: workflow.graph,
            created_at: now,
            updated_at: now,
        };

        self.documents
            .lock()
            .map_err(|_| FlowCanvasError::Storage("workflow store is poisoned".to_string()))?
            .push(document);

        tracing::debug!(target: TRACING_TARGET, id = %id, "saved workflow in memory");
        Ok(id)
    }

    fn list(&self) -> CommandResult<Vec<WorkflowDocument>> {
        let documents = self
            .documents
            .lock()
            .map_err(|_| FlowCanvasError::Load("workflow store is poisoned".to_string()))?;

        // Later saves win ties on identical timestamps.
        let mut ordered = documents.iter().cloned().enumerate().collect::<Vec<_>>();
        ordered.sort_by(|(left_index, left), (right_index, right)| {
            right
                .updated_at
                .cmp(&left.updated_at)
                .then(right_index.cmp(left_index))
        });

        Ok(ordered.into_iter().map(|(_, document)| document).collect())
    }
}
