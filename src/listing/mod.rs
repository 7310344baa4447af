//! State behind the workflow list page: search, paging, pins and the
//! list-level run configuration.

pub mod pagination;

use crate::automation::api_call::ApiCallConfig;
use crate::config::AppConfig;
use crate::error::{CommandResult, FlowCanvasError};
use crate::history::{ExecutionHistory, ExecutionOutcome, ExecutionRecord, HistoryClock};
use crate::store::{WorkflowDocument, WorkflowStore};
use crate::workflow::node::ExecutionStatus;
use chrono::{DateTime, FixedOffset, Utc};
use pagination::PageItem;
use std::collections::HashSet;

pub const TRACING_TARGET: &str = "flowcanvas::listing";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub page_size: usize,
    pub max_visible_pages: usize,
}

impl From<&AppConfig> for ListOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            page_size: config.page_size,
            max_visible_pages: config.max_visible_pages,
        }
    }
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page_size: 8,
            max_visible_pages: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListEntry {
    pub document: WorkflowDocument,
    pub pinned: bool,
    pub configuration: Option<ApiCallConfig>,
}

#[derive(Debug)]
pub struct WorkflowListView {
    options: ListOptions,
    entries: Vec<ListEntry>,
    history: ExecutionHistory,
    search: String,
    current_page: usize,
    expanded: Option<String>,
    pending_execution: Option<String>,
}

impl WorkflowListView {
    pub fn new(documents: Vec<WorkflowDocument>, options: ListOptions, clock: HistoryClock) -> Self {
        let entries = documents
            .into_iter()
            .map(|document| ListEntry {
                document,
                pinned: false,
                configuration: None,
            })
            .collect();

        Self {
            options,
            entries,
            history: ExecutionHistory::new(clock),
            search: String::new(),
            current_page: 1,
            expanded: None,
            pending_execution: None,
        }
    }

    /// Fetches every workflow from `store`, newest update first.
    pub fn load(store: &dyn WorkflowStore, options: ListOptions, clock: HistoryClock) -> CommandResult<Self> {
        let documents = store.list().map_err(FlowCanvasError::while_loading)?;
        tracing::debug!(target: TRACING_TARGET, count = documents.len(), "loaded workflow list");
        Ok(Self::new(documents, options, clock))
    }

    pub fn set_search(&mut self, query: &str) {
        self.search = query.trim().to_lowercase();
        self.current_page = 1;
    }

    /// Entries whose name or id contains the search text, case-insensitively.
    pub fn filtered(&self) -> Vec<&ListEntry> {
        self.entries
            .iter()
            .filter(|entry| {
                self.search.is_empty()
                    || entry.document.name.to_lowercase().contains(&self.search)
                    || entry.document.id.to_lowercase().contains(&self.search)
            })
            .collect()
    }

    pub fn total_pages(&self) -> usize {
        pagination::total_pages(self.filtered().len(), self.options.page_size)
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn go_to_page(&mut self, page: usize) -> CommandResult<()> {
        let total = self.total_pages().max(1);
        if page == 0 || page > total {
            return Err(FlowCanvasError::Validation(format!(
                "page {} is out of range 1..={}",
                page, total
            )));
        }
        self.current_page = page;
        Ok(())
    }

    pub fn page_items(&self) -> Vec<&ListEntry> {
        let filtered = self.filtered();
        pagination::page_slice(&filtered, self.current_page, self.options.page_size).to_vec()
    }

    pub fn page_numbers(&self) -> Vec<PageItem> {
        pagination::page_numbers(self.current_page, self.total_pages(), self.options.max_visible_pages)
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    fn entry_mut(&mut self, id: &str) -> CommandResult<&mut ListEntry> {
        self.entries
            .iter_mut()
            .find(|entry| entry.document.id == id)
            .ok_or_else(|| FlowCanvasError::NotFound("Workflow not found".to_string()))
    }

    pub fn toggle_pin(&mut self, id: &str) -> CommandResult<bool> {
        let entry = self.entry_mut(id)?;
        entry.pinned = !entry.pinned;
        Ok(entry.pinned)
    }

    pub fn toggle_expand(&mut self, id: &str) {
        if self.expanded.as_deref() == Some(id) {
            self.expanded = None;
        } else {
            self.expanded = Some(id.to_string());
        }
    }

    pub fn expanded(&self) -> Option<&str> {
        self.expanded.as_deref()
    }

    /// Stores the run configuration of a workflow and logs it as a passed run.
    pub fn save_configuration(&mut self, id: &str, config: ApiCallConfig) -> CommandResult<()> {
        let entry = self.entry_mut(id)?;
        entry.configuration = Some(config.clone());

        let outcome = ExecutionOutcome {
            status: ExecutionStatus::Passed,
            method: config.method,
            url: config.url,
            headers: config.headers,
            body: config.body,
            response: None,
            error: None,
        };
        self.history.record_execution(id, outcome);
        Ok(())
    }

    pub fn history(&self, id: &str) -> &[ExecutionRecord] {
        self.history.read_history(id)
    }

    /// Opens the run confirmation for a configured workflow.
    pub fn request_execution(&mut self, id: &str) -> CommandResult<()> {
        let configured = self.entry_mut(id)?.configuration.is_some();
        if !configured {
            return Err(FlowCanvasError::Validation(
                "Please configure the workflow before executing".to_string(),
            ));
        }
        self.pending_execution = Some(id.to_string());
        Ok(())
    }

    pub fn pending_execution(&self) -> Option<&str> {
        self.pending_execution.as_deref()
    }

    /// Confirms the pending run. There is no engine behind it; the
    /// confirmation is only closed and the confirmed id handed back.
    pub fn confirm_execution(&mut self) -> Option<String> {
        let confirmed = self.pending_execution.take();
        if let Some(id) = &confirmed {
            tracing::info!(target: TRACING_TARGET, id = %id, "workflow execution confirmed");
        }
        confirmed
    }

    pub fn cancel_execution(&mut self) {
        self.pending_execution = None;
    }

    pub fn pinned_ids(&self) -> HashSet<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.pinned)
            .map(|entry| entry.document.id.as_str())
            .collect()
    }
}

/// `Jan 5, 2024, 09:05 AM` in the given offset.
pub fn format_updated_at(at: DateTime<Utc>, offset: &FixedOffset) -> String {
    at.with_timezone(offset).format("%b %-d, %Y, %I:%M %p").to_string()
}
