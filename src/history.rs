//! In-memory log of ad-hoc step executions, kept per node for the lifetime
//! of one editing session.

use crate::automation::api_call::ApiCallConfig;
use crate::error::{CommandResult, FlowCanvasError};
use crate::workflow::node::ExecutionStatus;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    pub method: String,
    pub url: String,
    pub headers: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionOutcome {
    pub fn passed(config: &ApiCallConfig, response: Value) -> Self {
        Self {
            status: ExecutionStatus::Passed,
            method: config.method.clone(),
            url: config.url.clone(),
            headers: config.headers.clone(),
            body: config.body.clone(),
            response: Some(response),
            error: None,
        }
    }

    pub fn failed(config: &ApiCallConfig, error: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            method: config.method.clone(),
            url: config.url.clone(),
            headers: config.headers.clone(),
            body: config.body.clone(),
            response: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Local time as `DD/MM - HH:MM TZ`.
    pub timestamp: String,
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: ExecutionOutcome,
}

/// Renders instants the way the history list shows them.
#[derive(Debug, Clone)]
pub struct HistoryClock {
    offset: FixedOffset,
    label: String,
}

impl HistoryClock {
    pub fn new(utc_offset_minutes: i32, label: impl Into<String>) -> CommandResult<Self> {
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                FlowCanvasError::Validation(format!(
                    "utc offset out of range: {} minutes",
                    utc_offset_minutes
                ))
            })?;
        Ok(Self {
            offset,
            label: label.into(),
        })
    }

    pub fn offset(&self) -> &FixedOffset {
        &self.offset
    }

    pub fn format(&self, at: DateTime<Utc>) -> String {
        format!(
            "{} {}",
            at.with_timezone(&self.offset).format("%d/%m - %H:%M"),
            self.label
        )
    }
}

impl Default for HistoryClock {
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(330 * 60).unwrap_or_else(|| Utc.fix()),
            label: "IST".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionHistory {
    clock: HistoryClock,
    entries: HashMap<String, Vec<ExecutionRecord>>,
}

impl ExecutionHistory {
    pub fn new(clock: HistoryClock) -> Self {
        Self {
            clock,
            entries: HashMap::new(),
        }
    }

    pub fn record_execution(&mut self, node_id: &str, outcome: ExecutionOutcome) -> &ExecutionRecord {
        self.record_execution_at(node_id, outcome, Utc::now())
    }

    pub fn record_execution_at(
        &mut self,
        node_id: &str,
        outcome: ExecutionOutcome,
        at: DateTime<Utc>,
    ) -> &ExecutionRecord {
        let record = ExecutionRecord {
            timestamp: self.clock.format(at),
            recorded_at: at,
            outcome,
        };
        let list = self.entries.entry(node_id.to_string()).or_default();
        list.insert(0, record);
        &list[0]
    }

    /// Newest first.
    pub fn read_history(&self, node_id: &str) -> &[ExecutionRecord] {
        self.entries
            .get(node_id)
            .map(|records| records.as_slice())
            .unwrap_or(&[])
    }

    pub fn latest(&self, node_id: &str) -> Option<&ExecutionRecord> {
        self.read_history(node_id).first()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|records| records.is_empty())
    }
}
