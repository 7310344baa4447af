//! The builder page: one open workflow, the editor dialog that is showing,
//! and the run history of its steps.

use crate::automation::api_call::{ApiCallConfig, ApiCallExecutor};
use crate::automation::email::EmailConfig;
use crate::config::AppConfig;
use crate::error::{CommandResult, FlowCanvasError};
use crate::history::{ExecutionHistory, ExecutionRecord, HistoryClock};
use crate::store::{NewWorkflow, WorkflowStore};
use crate::workflow::graph::WorkflowGraph;
use crate::workflow::insert::{insert_step, IdSequence, Insertion, SessionCounter};
use crate::workflow::node::{NodeKind, StepKind};
use std::collections::HashMap;

pub const TRACING_TARGET: &str = "flowcanvas::editor";

/// Which dialog is open, and for which node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActiveEditor {
    #[default]
    None,
    NodeSelector { node_id: String },
    ApiCall { node_id: String },
    Email { node_id: String },
}

#[derive(Debug, Clone)]
pub struct EditorOptions {
    pub step_offset_x: f64,
    pub clock: HistoryClock,
}

impl EditorOptions {
    pub fn from_config(config: &AppConfig) -> CommandResult<Self> {
        Ok(Self {
            step_offset_x: config.step_offset_x,
            clock: HistoryClock::new(
                config.history_utc_offset_minutes,
                config.history_zone_label.clone(),
            )?,
        })
    }
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            step_offset_x: 86.0,
            clock: HistoryClock::default(),
        }
    }
}

pub struct EditorSession {
    workflow_id: Option<String>,
    name: String,
    description: String,
    graph: WorkflowGraph,
    ids: Box<dyn IdSequence + Send>,
    history: ExecutionHistory,
    active: ActiveEditor,
    api_configs: HashMap<String, ApiCallConfig>,
    email_configs: HashMap<String, EmailConfig>,
    step_offset_x: f64,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("workflow_id", &self.workflow_id)
            .field("graph", &self.graph)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    /// A blank workflow: Start, one placeholder, End.
    pub fn new(options: EditorOptions) -> Self {
        Self::from_graph(WorkflowGraph::new_linear(), options)
    }

    /// Continues editing `graph`, numbering new nodes past its existing ids.
    pub fn from_graph(graph: WorkflowGraph, options: EditorOptions) -> Self {
        let ids = SessionCounter::resume(&graph);
        Self {
            workflow_id: None,
            name: String::new(),
            description: String::new(),
            graph,
            ids: Box::new(ids),
            history: ExecutionHistory::new(options.clock),
            active: ActiveEditor::None,
            api_configs: HashMap::new(),
            email_configs: HashMap::new(),
            step_offset_x: options.step_offset_x,
        }
    }

    /// Loads a saved workflow for editing.
    pub fn open(store: &dyn WorkflowStore, id: &str, options: EditorOptions) -> CommandResult<Self> {
        let document = store.get(id).map_err(FlowCanvasError::while_loading)?;
        document.graph.validate_chain()?;

        let mut session = Self::from_graph(document.graph, options);
        session.workflow_id = Some(document.id);
        session.name = document.name;
        session.description = document.description;
        Ok(session)
    }

    pub fn with_ids(mut self, ids: Box<dyn IdSequence + Send>) -> Self {
        self.ids = ids;
        self
    }

    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    pub fn workflow_id(&self) -> Option<&str> {
        self.workflow_id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn active(&self) -> &ActiveEditor {
        &self.active
    }

    pub fn history(&self) -> &ExecutionHistory {
        &self.history
    }

    /// Opens the dialog that belongs to the clicked node.
    pub fn click_node(&mut self, node_id: &str) -> CommandResult<&ActiveEditor> {
        let node = self
            .graph
            .node(node_id)
            .ok_or_else(|| FlowCanvasError::NotFound(format!("node {}", node_id)))?;

        let node_id = node_id.to_string();
        match node.kind {
            NodeKind::Placeholder => self.active = ActiveEditor::NodeSelector { node_id },
            NodeKind::Step(StepKind::Email) => self.active = ActiveEditor::Email { node_id },
            NodeKind::Step(_) => self.active = ActiveEditor::ApiCall { node_id },
            NodeKind::Start | NodeKind::End => {}
        }
        Ok(&self.active)
    }

    pub fn close_editor(&mut self) {
        self.active = ActiveEditor::None;
    }

    /// Inserts a step at the placeholder whose selector is open.
    pub fn choose_step(&mut self, kind: StepKind) -> CommandResult<Insertion> {
        let ActiveEditor::NodeSelector { node_id } = &self.active else {
            return Err(FlowCanvasError::Validation(
                "No insertion point selected".to_string(),
            ));
        };
        let node_id = node_id.clone();

        match insert_step(&mut self.graph, &node_id, kind, self.ids.as_mut(), self.step_offset_x) {
            Ok(insertion) => {
                self.active = ActiveEditor::None;
                Ok(insertion)
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    node_id = %node_id,
                    error = %error,
                    "step insertion aborted"
                );
                Err(error)
            }
        }
    }

    pub fn api_config(&self, node_id: &str) -> Option<&ApiCallConfig> {
        self.api_configs.get(node_id)
    }

    pub fn email_config(&self, node_id: &str) -> Option<&EmailConfig> {
        self.email_configs.get(node_id)
    }

    pub fn set_email_config(&mut self, node_id: &str, config: EmailConfig) -> CommandResult<()> {
        self.require_step(node_id, |kind| kind == StepKind::Email)?;
        config.validate()?;
        self.email_configs.insert(node_id.to_string(), config);
        Ok(())
    }

    /// Runs an API-call step once from its dialog and records the outcome.
    ///
    /// Form errors leave the history and the node untouched.
    pub async fn execute_api_call(
        &mut self,
        executor: &ApiCallExecutor,
        node_id: &str,
        config: ApiCallConfig,
    ) -> CommandResult<ExecutionRecord> {
        self.require_step(node_id, |kind| kind != StepKind::Email)?;
        config.prepare()?;
        self.api_configs.insert(node_id.to_string(), config.clone());

        let outcome = executor.execute(&config).await?;
        let status = outcome.status;
        let record = self.history.record_execution(node_id, outcome).clone();
        self.graph.set_execution_status(node_id, status)?;

        tracing::info!(
            target: TRACING_TARGET,
            node_id = %node_id,
            status = %status,
            "recorded step execution"
        );
        Ok(record)
    }

    fn require_step(&self, node_id: &str, accepts: impl Fn(StepKind) -> bool) -> CommandResult<()> {
        let node = self
            .graph
            .node(node_id)
            .ok_or_else(|| FlowCanvasError::NotFound(format!("node {}", node_id)))?;
        match node.kind {
            NodeKind::Step(kind) if accepts(kind) => Ok(()),
            _ => Err(FlowCanvasError::Validation(format!(
                "node {} cannot be configured this way",
                node_id
            ))),
        }
    }

    /// Writes a full snapshot of the graph. An empty name is rejected before
    /// the store is touched.
    pub fn save(&mut self, store: &dyn WorkflowStore, name: &str, description: &str) -> CommandResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FlowCanvasError::Validation(
                "Please enter a workflow name".to_string(),
            ));
        }

        let id = store.save(NewWorkflow {
            name: name.to_string(),
            description: description.to_string(),
            graph: self.graph.clone(),
        })?;

        tracing::info!(target: TRACING_TARGET, id = %id, name = %name, "workflow saved");
        self.workflow_id = Some(id.clone());
        self.name = name.to_string();
        self.description = description.to_string();
        Ok(id)
    }
}
