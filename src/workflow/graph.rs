use crate::error::{CommandResult, FlowCanvasError};
use crate::workflow::edge::WorkflowEdge;
use crate::workflow::node::{ExecutionStatus, NodeKind, Position, WorkflowNode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Node and edge arrays of the workflow being edited.
///
/// There is no partial patch API: callers read the arrays and hand back a
/// complete replacement. Only the insertion routine in
/// [`crate::workflow::insert`] reshapes the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    nodes: Vec<WorkflowNode>,
    edges: Vec<WorkflowEdge>,
}

impl WorkflowGraph {
    pub fn new(nodes: Vec<WorkflowNode>, edges: Vec<WorkflowEdge>) -> Self {
        Self { nodes, edges }
    }

    /// Start, one placeholder and End, stacked vertically.
    pub fn new_linear() -> Self {
        let nodes = vec![
            WorkflowNode::start(Position::new(350.0, 100.0)),
            WorkflowNode::placeholder("add-1", Position::new(368.0, 250.0)),
            WorkflowNode::end(Position::new(350.0, 400.0)),
        ];
        let edges = vec![
            WorkflowEdge::new("e1-2", "start", "add-1"),
            WorkflowEdge::new("e2-3", "add-1", "end"),
        ];
        Self { nodes, edges }
    }

    pub fn nodes(&self) -> &[WorkflowNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[WorkflowEdge] {
        &self.edges
    }

    pub fn replace(&mut self, nodes: Vec<WorkflowNode>, edges: Vec<WorkflowEdge>) {
        self.nodes = nodes;
        self.edges = edges;
    }

    pub fn into_parts(self) -> (Vec<WorkflowNode>, Vec<WorkflowEdge>) {
        (self.nodes, self.edges)
    }

    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn incoming(&self, id: &str) -> Option<&WorkflowEdge> {
        self.edges.iter().find(|edge| edge.target == id)
    }

    pub fn outgoing(&self, id: &str) -> Option<&WorkflowEdge> {
        self.edges.iter().find(|edge| edge.source == id)
    }

    pub fn start(&self) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|node| node.kind == NodeKind::Start)
    }

    pub fn step_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.kind.is_step()).count()
    }

    pub fn placeholder_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.kind == NodeKind::Placeholder)
            .count()
    }

    pub fn set_execution_status(&mut self, id: &str, status: ExecutionStatus) -> CommandResult<()> {
        let node = self
            .nodes
            .iter_mut()
            .find(|node| node.id == id)
            .ok_or_else(|| FlowCanvasError::NotFound(format!("node {}", id)))?;
        if !node.kind.is_step() {
            return Err(FlowCanvasError::Validation(format!(
                "node {} is not a step",
                id
            )));
        }
        node.execution_status = Some(status);
        Ok(())
    }

    /// Nodes in Start-to-End order. Stops early on a broken or cyclic chain.
    pub fn chain(&self) -> Vec<&WorkflowNode> {
        let mut ordered = Vec::with_capacity(self.nodes.len());
        let mut current = self.start();

        while let Some(node) = current {
            if ordered.len() > self.nodes.len() {
                break;
            }
            ordered.push(node);
            current = self
                .outgoing(&node.id)
                .and_then(|edge| self.node(&edge.target));
        }

        ordered
    }

    /// Checks that the graph is exactly one directed path from Start to End.
    pub fn validate_chain(&self) -> CommandResult<()> {
        let starts = self
            .nodes
            .iter()
            .filter(|node| node.kind == NodeKind::Start)
            .count();
        let ends = self
            .nodes
            .iter()
            .filter(|node| node.kind == NodeKind::End)
            .count();
        if starts != 1 || ends != 1 {
            return Err(structure(format!(
                "expected one start and one end node, found {} and {}",
                starts, ends
            )));
        }

        let mut node_ids = HashSet::new();
        for node in &self.nodes {
            if !node_ids.insert(node.id.as_str()) {
                return Err(structure(format!("duplicate node id: {}", node.id)));
            }
        }

        let mut edge_ids = HashSet::new();
        for edge in &self.edges {
            if !edge_ids.insert(edge.id.as_str()) {
                return Err(structure(format!("duplicate edge id: {}", edge.id)));
            }
            if !node_ids.contains(edge.source.as_str()) || !node_ids.contains(edge.target.as_str()) {
                return Err(structure(format!("dangling edge: {}", edge.id)));
            }
        }

        for node in &self.nodes {
            let out_degree = self.edges.iter().filter(|edge| edge.source == node.id).count();
            let in_degree = self.edges.iter().filter(|edge| edge.target == node.id).count();
            let (expected_in, expected_out) = match node.kind {
                NodeKind::Start => (0, 1),
                NodeKind::End => (1, 0),
                _ => (1, 1),
            };
            if in_degree != expected_in || out_degree != expected_out {
                return Err(structure(format!(
                    "node {} has in-degree {} and out-degree {}",
                    node.id, in_degree, out_degree
                )));
            }
        }

        let chain = self.chain();
        let reaches_end = chain
            .last()
            .is_some_and(|node| node.kind == NodeKind::End);
        if !reaches_end || chain.len() != self.nodes.len() {
            return Err(structure(
                "nodes do not form a single path from start to end".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for WorkflowGraph {
    fn default() -> Self {
        Self::new_linear()
    }
}

fn structure(message: String) -> FlowCanvasError {
    FlowCanvasError::Structure(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::node::StepKind;

    #[test]
    fn test_new_linear_graph_is_a_chain() {
        let graph = WorkflowGraph::new_linear();
        assert!(graph.validate_chain().is_ok());
        assert_eq!(graph.placeholder_count(), 1);
        assert_eq!(graph.step_count(), 0);

        let ids = graph.chain().iter().map(|node| node.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["start", "add-1", "end"]);
    }

    #[test]
    fn test_dangling_edge_is_rejected() {
        let mut graph = WorkflowGraph::new_linear();
        let (mut nodes, edges) = graph.clone().into_parts();
        nodes.retain(|node| node.id != "add-1");
        graph.replace(nodes, edges);

        let error = graph.validate_chain().unwrap_err();
        assert!(matches!(error, FlowCanvasError::Structure(_)));
    }

    #[test]
    fn test_branch_is_rejected() {
        let mut graph = WorkflowGraph::new_linear();
        let (nodes, mut edges) = graph.clone().into_parts();
        edges.push(WorkflowEdge::between("start", "end"));
        graph.replace(nodes, edges);

        assert!(graph.validate_chain().is_err());
    }

    #[test]
    fn test_cycle_is_rejected() {
        let nodes = vec![
            WorkflowNode::start(Position::new(0.0, 0.0)),
            WorkflowNode::placeholder("add-1", Position::new(0.0, 1.0)),
            WorkflowNode::placeholder("add-2", Position::new(0.0, 2.0)),
            WorkflowNode::end(Position::new(0.0, 3.0)),
        ];
        let edges = vec![
            WorkflowEdge::between("start", "end"),
            WorkflowEdge::between("add-1", "add-2"),
            WorkflowEdge::between("add-2", "add-1"),
        ];
        let graph = WorkflowGraph::new(nodes, edges);

        assert!(graph.validate_chain().is_err());
    }

    #[test]
    fn test_execution_status_only_on_steps() {
        let nodes = vec![
            WorkflowNode::start(Position::new(0.0, 0.0)),
            WorkflowNode::step("apiCall-1", StepKind::ApiCall, Position::new(0.0, 1.0)),
            WorkflowNode::end(Position::new(0.0, 2.0)),
        ];
        let edges = vec![
            WorkflowEdge::between("start", "apiCall-1"),
            WorkflowEdge::between("apiCall-1", "end"),
        ];
        let mut graph = WorkflowGraph::new(nodes, edges);

        graph
            .set_execution_status("apiCall-1", ExecutionStatus::Failed)
            .unwrap();
        assert_eq!(
            graph.node("apiCall-1").unwrap().execution_status,
            Some(ExecutionStatus::Failed)
        );
        assert!(graph.set_execution_status("start", ExecutionStatus::Passed).is_err());
        assert!(graph.set_execution_status("missing", ExecutionStatus::Passed).is_err());
    }
}
