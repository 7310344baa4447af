use crate::auth::{
    require_session, set_account_password, validate_reset_email, Authenticator, LocalAuthenticator, Session,
    SessionFile,
};
use crate::automation::api_call::{ApiCallConfig, ApiCallExecutor};
use crate::config::AppConfig;
use crate::editor::{EditorOptions, EditorSession};
use crate::error::{CommandResult, FlowCanvasError};
use crate::history::HistoryClock;
use crate::listing::pagination::PageItem;
use crate::listing::{format_updated_at, ListOptions, WorkflowListView};
use crate::store::{SqliteStore, WorkflowStore};
use crate::workflow::graph::WorkflowGraph;
use crate::workflow::insert::UuidIds;
use crate::workflow::node::{NodeKind, StepKind};
use crate::workflow::serializer;
use chrono::{Duration, Utc};
use std::path::{Path, PathBuf};

pub const TRACING_TARGET: &str = "flowcanvas::commands";

/// Everything a command needs: configuration, the document store and the
/// persisted sign-in.
pub struct AppContext {
    pub config: AppConfig,
    pub store: Box<dyn WorkflowStore>,
    pub sessions: SessionFile,
    /// File `config` was read from; account changes are written back here.
    pub config_path: Option<PathBuf>,
}

impl AppContext {
    pub fn new(config: AppConfig) -> CommandResult<Self> {
        let store = SqliteStore::open(&config.database_path)?;
        let sessions = SessionFile::new(&config.session_path);
        Ok(Self {
            config,
            store: Box::new(store),
            sessions,
            config_path: None,
        })
    }

    pub fn with_store(config: AppConfig, store: Box<dyn WorkflowStore>) -> Self {
        let sessions = SessionFile::new(&config.session_path);
        Self {
            config,
            store,
            sessions,
            config_path: None,
        }
    }

    pub fn with_config_path(mut self, path: &Path) -> Self {
        self.config_path = Some(path.to_path_buf());
        self
    }

    fn signed_in(&self) -> CommandResult<Session> {
        let session = self.sessions.load()?;
        let session = require_session(session.as_ref(), Utc::now())?;
        Ok(session.clone())
    }

    fn clock(&self) -> CommandResult<HistoryClock> {
        HistoryClock::new(
            self.config.history_utc_offset_minutes,
            self.config.history_zone_label.clone(),
        )
    }
}

fn read_draft(path: &Path) -> CommandResult<WorkflowGraph> {
    let raw = std::fs::read_to_string(path)
        .map_err(|error| FlowCanvasError::Io(format!("{}: {}", path.display(), error)))?;
    serializer::from_json(&raw)
}

fn write_draft(path: &Path, graph: &WorkflowGraph) -> CommandResult<()> {
    let payload = serializer::to_json(graph)?;
    std::fs::write(path, payload)
        .map_err(|error| FlowCanvasError::Io(format!("{}: {}", path.display(), error)))
}

pub fn login(ctx: &AppContext, email: &str, password: &str) -> CommandResult<String> {
    let authenticator = LocalAuthenticator::new(
        ctx.config.accounts.clone(),
        Duration::minutes(ctx.config.session_ttl_minutes),
    );
    let session = authenticator.sign_in(email, password)?;
    ctx.sessions.store(&session)?;
    Ok(format!(
        "signed in as {} until {}",
        session.email,
        session.expires_at.to_rfc3339()
    ))
}

pub fn logout(ctx: &AppContext) -> CommandResult<String> {
    ctx.sessions.clear()?;
    Ok("signed out".to_string())
}

/// Changes the password of the signed-in account.
pub fn set_password(ctx: &AppContext, password: &str, confirm: &str) -> CommandResult<String> {
    let session = ctx.signed_in()?;
    update_password(ctx, &session.email, password, confirm)?;
    Ok("Password updated".to_string())
}

/// Sets a new password for a configured account without signing in.
pub fn reset_password(ctx: &AppContext, email: &str, password: &str, confirm: &str) -> CommandResult<String> {
    validate_reset_email(email)?;
    update_password(ctx, email, password, confirm)?;
    Ok(format!("Password reset for {}", email.trim()))
}

fn update_password(ctx: &AppContext, email: &str, password: &str, confirm: &str) -> CommandResult<()> {
    let path = ctx.config_path.as_deref().ok_or_else(|| {
        FlowCanvasError::Validation("Password changes need a --config file".to_string())
    })?;

    let mut config = ctx.config.clone();
    set_account_password(&mut config.accounts, email, password, confirm)?;
    let payload = serde_json::to_string_pretty(&config)
        .map_err(|error| FlowCanvasError::Io(error.to_string()))?;
    std::fs::write(path, payload)
        .map_err(|error| FlowCanvasError::Io(format!("{}: {}", path.display(), error)))
}

pub fn new_draft(ctx: &AppContext, draft: &Path) -> CommandResult<String> {
    ctx.signed_in()?;
    write_draft(draft, &WorkflowGraph::new_linear())?;
    Ok(format!("created {}", draft.display()))
}

pub fn insert(ctx: &AppContext, draft: &Path, at: &str, kind: StepKind, uuid_ids: bool) -> CommandResult<String> {
    ctx.signed_in()?;
    let graph = read_draft(draft)?;
    let mut session = EditorSession::from_graph(graph, EditorOptions::from_config(&ctx.config)?);
    if uuid_ids {
        session = session.with_ids(Box::new(UuidIds));
    }

    session.click_node(at)?;
    let insertion = session.choose_step(kind)?;
    write_draft(draft, session.graph())?;

    Ok(format!(
        "inserted {} ({}), next insertion point is {}",
        insertion.step_id,
        kind.label(),
        insertion.placeholder_id
    ))
}

pub fn show(ctx: &AppContext, draft: &Path) -> CommandResult<String> {
    ctx.signed_in()?;
    let graph = read_draft(draft)?;
    Ok(render_chain(&graph))
}

fn render_chain(graph: &WorkflowGraph) -> String {
    graph
        .chain()
        .iter()
        .map(|node| {
            let marker = match node.kind {
                NodeKind::Start | NodeKind::End => "o",
                NodeKind::Placeholder => "+",
                NodeKind::Step(_) => "#",
            };
            let status = node
                .execution_status
                .map(|status| format!(" [{}]", status))
                .unwrap_or_default();
            format!(
                "{} {:<10} {:<24} y={:.1}{}",
                marker, node.label, node.id, node.position.y, status
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn save(ctx: &AppContext, draft: &Path, name: &str, description: &str) -> CommandResult<String> {
    ctx.signed_in()?;
    let graph = read_draft(draft)?;
    let mut session = EditorSession::from_graph(graph, EditorOptions::from_config(&ctx.config)?);
    let id = session.save(ctx.store.as_ref(), name, description)?;
    Ok(format!("Workflow saved successfully ({})", id))
}

pub fn open(ctx: &AppContext, id: &str, draft: &Path) -> CommandResult<String> {
    ctx.signed_in()?;
    let session = EditorSession::open(ctx.store.as_ref(), id, EditorOptions::from_config(&ctx.config)?)?;
    write_draft(draft, session.graph())?;
    Ok(format!(
        "opened {} ({}) into {}",
        session.name(),
        id,
        draft.display()
    ))
}

pub fn list(ctx: &AppContext, page: usize, search: Option<&str>) -> CommandResult<String> {
    ctx.signed_in()?;
    let clock = ctx.clock()?;
    let offset = *clock.offset();
    let mut view = WorkflowListView::load(ctx.store.as_ref(), ListOptions::from(&ctx.config), clock)?;
    if let Some(query) = search {
        view.set_search(query);
    }
    if view.total_pages() == 0 {
        return Ok("no workflows".to_string());
    }
    view.go_to_page(page)?;

    let mut lines = view
        .page_items()
        .iter()
        .map(|entry| {
            format!(
                "{:<36}  {:<24}  {}",
                entry.document.id,
                entry.document.name,
                format_updated_at(entry.document.updated_at, &offset)
            )
        })
        .collect::<Vec<_>>();

    let strip = view
        .page_numbers()
        .iter()
        .map(|item| match item {
            PageItem::Page(number) if *number == view.current_page() => format!("[{}]", number),
            PageItem::Page(number) => number.to_string(),
            PageItem::Ellipsis => "...".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(String::new());
    lines.push(strip);

    Ok(lines.join("\n"))
}

/// Runs the API call behind one step of a draft and marks the step with the
/// outcome.
pub async fn call(ctx: &AppContext, draft: &Path, node_id: &str, config: ApiCallConfig) -> CommandResult<String> {
    ctx.signed_in()?;
    let graph = read_draft(draft)?;
    let mut session = EditorSession::from_graph(graph, EditorOptions::from_config(&ctx.config)?);
    let executor = ApiCallExecutor::new(std::time::Duration::from_millis(ctx.config.http_timeout_ms))?;

    let record = session.execute_api_call(&executor, node_id, config).await?;
    write_draft(draft, session.graph())?;

    tracing::debug!(target: TRACING_TARGET, node_id = %node_id, "api call finished");
    serde_json::to_string_pretty(&record).map_err(|error| FlowCanvasError::Io(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password;
    use crate::config::Account;
    use crate::store::MemoryStore;

    fn context(dir: &Path) -> AppContext {
        let config = AppConfig {
            session_path: dir.join("session.json"),
            accounts: vec![Account {
                email: "admin@example.com".to_string(),
                password_sha256: hash_password("password"),
            }],
            ..AppConfig::default()
        };
        AppContext::with_store(config, Box::new(MemoryStore::new()))
    }

    #[test]
    fn test_commands_require_sign_in() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let draft = dir.path().join("draft.json");

        let error = new_draft(&ctx, &draft).unwrap_err();
        assert!(matches!(error, FlowCanvasError::Auth(_)));
        assert!(!draft.exists());

        assert!(login(&ctx, "admin@example.com", "wrong").is_err());
        login(&ctx, "admin@example.com", "password").unwrap();
        new_draft(&ctx, &draft).unwrap();
        assert!(draft.exists());

        logout(&ctx).unwrap();
        assert!(show(&ctx, &draft).is_err());
    }

    #[test]
    fn test_draft_edit_save_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let draft = dir.path().join("draft.json");
        login(&ctx, "admin@example.com", "password").unwrap();

        new_draft(&ctx, &draft).unwrap();
        insert(&ctx, &draft, "add-1", StepKind::ApiCall, false).unwrap();
        let message = insert(&ctx, &draft, "add-2", StepKind::Email, false).unwrap();
        assert!(message.contains("email-2"));

        let rendered = show(&ctx, &draft).unwrap();
        let labels = rendered
            .lines()
            .map(|line| line.split_whitespace().nth(1).unwrap_or_default().to_string())
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["Start", "API", "Email", "+", "End"]);

        assert!(save(&ctx, &draft, "", "").is_err());
        let saved = save(&ctx, &draft, "Signup", "welcome flow").unwrap();
        assert!(saved.starts_with("Workflow saved successfully"));

        let listing = list(&ctx, 1, Some("sign")).unwrap();
        assert!(listing.contains("Signup"));
        assert!(listing.ends_with("[1]"));
        assert_eq!(list(&ctx, 1, Some("nothing")).unwrap(), "no workflows");
    }

    #[test]
    fn test_open_writes_stored_graph() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let draft = dir.path().join("draft.json");
        login(&ctx, "admin@example.com", "password").unwrap();

        new_draft(&ctx, &draft).unwrap();
        insert(&ctx, &draft, "add-1", StepKind::TextBox, false).unwrap();
        save(&ctx, &draft, "Notes", "").unwrap();
        let id = ctx.store.list().unwrap()[0].id.clone();

        let reopened = dir.path().join("reopened.json");
        open(&ctx, &id, &reopened).unwrap();
        assert_eq!(read_draft(&reopened).unwrap(), read_draft(&draft).unwrap());
    }

    #[test]
    fn test_insert_with_uuid_ids() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let draft = dir.path().join("draft.json");
        login(&ctx, "admin@example.com", "password").unwrap();

        new_draft(&ctx, &draft).unwrap();
        insert(&ctx, &draft, "add-1", StepKind::ApiCall, true).unwrap();

        let graph = read_draft(&draft).unwrap();
        assert!(graph.node("apiCall-1").is_none());
        assert_eq!(graph.step_count(), 1);
        assert_eq!(graph.placeholder_count(), 1);
    }

    #[test]
    fn test_password_changes_are_written_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        let ctx = context(dir.path()).with_config_path(&config_path);
        login(&ctx, "admin@example.com", "password").unwrap();

        let error = set_password(&ctx, "secret1", "secret2").unwrap_err();
        assert_eq!(error.user_message(), "Passwords do not match");
        assert!(!config_path.exists());

        set_password(&ctx, "secret1", "secret1").unwrap();
        let saved = AppConfig::load(&config_path).unwrap();
        assert_eq!(saved.accounts[0].password_sha256, hash_password("secret1"));

        assert!(reset_password(&ctx, " ", "secret2", "secret2").is_err());
        reset_password(&ctx, "admin@example.com", "secret2", "secret2").unwrap();
        let saved = AppConfig::load(&config_path).unwrap();
        assert_eq!(saved.accounts[0].password_sha256, hash_password("secret2"));
    }

    #[test]
    fn test_password_change_needs_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let error = reset_password(&ctx, "admin@example.com", "secret1", "secret1").unwrap_err();
        assert!(matches!(error, FlowCanvasError::Validation(_)));
    }
}
