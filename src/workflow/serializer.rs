use crate::error::{CommandResult, FlowCanvasError};
use crate::workflow::graph::WorkflowGraph;

pub fn to_json(graph: &WorkflowGraph) -> CommandResult<String> {
    serde_json::to_string_pretty(graph).map_err(|error| FlowCanvasError::Validation(error.to_string()))
}

/// Parses a graph and checks that it still forms a single chain.
pub fn from_json(raw: &str) -> CommandResult<WorkflowGraph> {
    let graph = serde_json::from_str::<WorkflowGraph>(raw)
        .map_err(|error| FlowCanvasError::Validation(error.to_string()))?;
    graph.validate_chain()?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::insert::{insert_step, SessionCounter};
    use crate::workflow::node::StepKind;

    #[test]
    fn test_edited_graph_survives_json() {
        let mut graph = WorkflowGraph::new_linear();
        let mut ids = SessionCounter::new();
        insert_step(&mut graph, "add-1", StepKind::Email, &mut ids, 86.0).unwrap();

        let raw = to_json(&graph).unwrap();
        assert!(!raw.contains("executionStatus"));
        assert_eq!(from_json(&raw).unwrap(), graph);
    }

    #[test]
    fn test_broken_chain_is_rejected_on_load() {
        let raw = r#"{ "nodes": [], "edges": [] }"#;
        assert!(matches!(from_json(raw), Err(FlowCanvasError::Structure(_))));
        assert!(matches!(from_json("not json"), Err(FlowCanvasError::Validation(_))));
    }
}
