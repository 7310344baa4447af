//! Splitting a placeholder into a step followed by a fresh placeholder.

use crate::error::{CommandResult, FlowCanvasError};
use crate::workflow::edge::WorkflowEdge;
use crate::workflow::graph::WorkflowGraph;
use crate::workflow::node::{NodeKind, Position, StepKind, WorkflowNode};
use regex::Regex;
use std::sync::OnceLock;

pub const TRACING_TARGET: &str = "flowcanvas::workflow::insert";

/// Source of node ids for newly inserted steps and placeholders.
pub trait IdSequence {
    /// Returns `(step_id, placeholder_id)`. Implementations must not hand out
    /// an id already present in `graph`, except `replacing`, which is about to
    /// be removed.
    fn next_ids(
        &mut self,
        kind: StepKind,
        graph: &WorkflowGraph,
        replacing: &str,
    ) -> CommandResult<(String, String)>;
}

/// Monotonic per-session counter producing `{kind}-{n}` and `add-{n+1}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCounter {
    next: u64,
}

impl SessionCounter {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Seeds the counter at the highest numeric id suffix in `graph`, so a
    /// workflow loaded from storage keeps numbering where it left off. The
    /// highest suffix normally belongs to the open placeholder.
    pub fn resume(graph: &WorkflowGraph) -> Self {
        let highest = graph
            .nodes()
            .iter()
            .filter_map(|node| numeric_suffix(&node.id))
            .max()
            .unwrap_or(1);
        Self { next: highest }
    }

    pub fn peek(&self) -> u64 {
        self.next
    }
}

impl Default for SessionCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSequence for SessionCounter {
    fn next_ids(
        &mut self,
        kind: StepKind,
        graph: &WorkflowGraph,
        replacing: &str,
    ) -> CommandResult<(String, String)> {
        let taken = |id: &str| id != replacing && graph.node(id).is_some();

        loop {
            let following = self.next.checked_add(1).ok_or_else(|| {
                FlowCanvasError::Structure(format!("node id counter exhausted at {}", self.next))
            })?;
            let step_id = format!("{}-{}", kind.as_str(), self.next);
            let placeholder_id = format!("add-{}", following);
            self.next = following;
            if !taken(&step_id) && !taken(&placeholder_id) {
                return Ok((step_id, placeholder_id));
            }
        }
    }
}

/// Random ids, independent of how many nodes were ever created.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdSequence for UuidIds {
    fn next_ids(
        &mut self,
        kind: StepKind,
        _graph: &WorkflowGraph,
        _replacing: &str,
    ) -> CommandResult<(String, String)> {
        Ok((
            format!("{}-{}", kind.as_str(), uuid::Uuid::new_v4()),
            format!("add-{}", uuid::Uuid::new_v4()),
        ))
    }
}

fn numeric_suffix(id: &str) -> Option<u64> {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    let pattern = SUFFIX.get_or_init(|| Regex::new(r"^[A-Za-z]+-(\d+)$").expect("valid suffix pattern"));
    pattern
        .captures(id)
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().parse::<u64>().ok())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub step_id: String,
    pub placeholder_id: String,
}

/// Replaces the placeholder `placeholder_id` with a `kind` step followed by a
/// new placeholder, spreading both evenly between the neighbouring nodes.
///
/// The graph is not touched when the placeholder or either neighbour cannot
/// be resolved.
pub fn insert_step(
    graph: &mut WorkflowGraph,
    placeholder_id: &str,
    kind: StepKind,
    ids: &mut dyn IdSequence,
    step_offset_x: f64,
) -> CommandResult<Insertion> {
    let placeholder = graph
        .node(placeholder_id)
        .ok_or_else(|| FlowCanvasError::Structure(format!("node {} does not exist", placeholder_id)))?;
    if placeholder.kind != NodeKind::Placeholder {
        return Err(FlowCanvasError::Structure(format!(
            "node {} is not an insertion point",
            placeholder_id
        )));
    }

    let incoming = graph.incoming(placeholder_id).cloned();
    let outgoing = graph.outgoing(placeholder_id).cloned();
    let (Some(incoming), Some(outgoing)) = (incoming, outgoing) else {
        return Err(FlowCanvasError::Structure(format!(
            "placeholder {} is not connected on both sides",
            placeholder_id
        )));
    };
    let (Some(above), Some(below)) = (graph.node(&incoming.source), graph.node(&outgoing.target)) else {
        return Err(FlowCanvasError::Structure(format!(
            "neighbours of placeholder {} cannot be resolved",
            placeholder_id
        )));
    };

    let total_space = below.position.y - above.position.y;
    let spacing = total_space / 3.0;
    let step_y = above.position.y + spacing;
    let placeholder_y = above.position.y + spacing * 2.0;
    let below_y = below.position.y;
    let origin_x = placeholder.position.x;

    let (step_id, new_placeholder_id) = ids.next_ids(kind, graph, placeholder_id)?;

    let step = WorkflowNode::step(&step_id, kind, Position::new(origin_x - step_offset_x, step_y));
    let new_placeholder = WorkflowNode::placeholder(&new_placeholder_id, Position::new(origin_x, placeholder_y));

    let mut nodes = graph
        .nodes()
        .iter()
        .filter(|node| node.id != placeholder_id)
        .cloned()
        .collect::<Vec<_>>();
    nodes.push(step);
    nodes.push(new_placeholder);
    for node in nodes.iter_mut().filter(|node| node.kind == NodeKind::End) {
        node.position.y = below_y;
    }

    let mut edges = graph
        .edges()
        .iter()
        .filter(|edge| edge.source != placeholder_id && edge.target != placeholder_id)
        .cloned()
        .collect::<Vec<_>>();
    edges.push(WorkflowEdge::between(&incoming.source, &step_id));
    edges.push(WorkflowEdge::between(&step_id, &new_placeholder_id));
    edges.push(WorkflowEdge::between(&new_placeholder_id, &outgoing.target));

    graph.replace(nodes, edges);

    tracing::debug!(
        target: TRACING_TARGET,
        replaced = placeholder_id,
        step_id = %step_id,
        placeholder_id = %new_placeholder_id,
        kind = %kind,
        "inserted step"
    );

    Ok(Insertion {
        step_id,
        placeholder_id: new_placeholder_id,
    })
}
