use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl WorkflowEdge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
        }
    }

    /// Edge whose id is derived from its endpoints: `e-{source}-{target}`.
    pub fn between(source: &str, target: &str) -> Self {
        Self::new(format!("e-{}-{}", source, target), source, target)
    }
}
