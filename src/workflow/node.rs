use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FlowCanvasError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    ApiCall,
    Email,
    TextBox,
}

impl StepKind {
    /// Prefix used for generated step ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiCall => "apiCall",
            Self::Email => "email",
            Self::TextBox => "textBox",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ApiCall => "API Call",
            Self::Email => "Email",
            Self::TextBox => "Text Box",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepKind {
    type Err = FlowCanvasError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "apiCall" | "api-call" | "api" => Ok(Self::ApiCall),
            "email" => Ok(Self::Email),
            "textBox" | "text-box" | "text" => Ok(Self::TextBox),
            other => Err(FlowCanvasError::Validation(format!(
                "unknown step kind: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Start,
    End,
    Placeholder,
    Step(StepKind),
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::End => "End",
            Self::Placeholder => "+",
            Self::Step(step) => step.label(),
        }
    }

    pub fn is_step(&self) -> bool {
        matches!(self, Self::Step(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionStatus {
    Passed,
    Failed,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("passed"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    pub id: String,
    pub kind: NodeKind,
    pub position: Position,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_status: Option<ExecutionStatus>,
}

impl WorkflowNode {
    pub fn new(id: impl Into<String>, kind: NodeKind, position: Position) -> Self {
        Self {
            id: id.into(),
            kind,
            position,
            label: kind.label().to_string(),
            execution_status: None,
        }
    }

    pub fn start(position: Position) -> Self {
        Self::new("start", NodeKind::Start, position)
    }

    pub fn end(position: Position) -> Self {
        Self::new("end", NodeKind::End, position)
    }

    pub fn placeholder(id: impl Into<String>, position: Position) -> Self {
        Self::new(id, NodeKind::Placeholder, position)
    }

    pub fn step(id: impl Into<String>, step: StepKind, position: Position) -> Self {
        Self::new(id, NodeKind::Step(step), position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_kind_parses_wire_names() {
        assert_eq!("apiCall".parse::<StepKind>().unwrap(), StepKind::ApiCall);
        assert_eq!("email".parse::<StepKind>().unwrap(), StepKind::Email);
        assert_eq!("textBox".parse::<StepKind>().unwrap(), StepKind::TextBox);
        assert!("webhook".parse::<StepKind>().is_err());
    }

    #[test]
    fn test_labels_follow_kind() {
        let node = WorkflowNode::step("apiCall-1", StepKind::ApiCall, Position::default());
        assert_eq!(node.label, "API Call");
        assert_eq!(WorkflowNode::placeholder("add-1", Position::default()).label, "+");
    }

    #[test]
    fn test_node_kind_serialization() {
        let json = serde_json::to_value(NodeKind::Step(StepKind::Email)).unwrap();
        assert_eq!(json, serde_json::json!({ "step": "email" }));
        let json = serde_json::to_value(NodeKind::Placeholder).unwrap();
        assert_eq!(json, serde_json::json!("placeholder"));
    }
}
