pub mod auth;
pub mod automation;
pub mod commands;
pub mod config;
pub mod editor;
pub mod error;
pub mod history;
pub mod listing;
pub mod store;
pub mod workflow;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::automation::api_call::ApiCallConfig;
use crate::commands::AppContext;
use crate::config::AppConfig;
use crate::workflow::node::StepKind;

#[derive(Debug, Parser)]
#[command(name = "flowcanvas")]
#[command(about = "Build linear API-call and email workflows")]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(long, global = true, env = "FLOWCANVAS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sign in with a configured account
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Change the password of the signed-in account
    SetPassword {
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },
    /// Set a new password for a configured account
    ResetPassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },
    /// Create a blank draft: Start, one insertion point, End
    New {
        draft: PathBuf,
    },
    /// Replace an insertion point with a step
    Insert {
        draft: PathBuf,
        /// Id of the "+" node
        #[arg(long)]
        at: String,
        /// apiCall, email or textBox
        #[arg(long)]
        kind: StepKind,
        /// Name new nodes with random ids instead of the running counter
        #[arg(long)]
        uuid_ids: bool,
    },
    /// Print a draft from Start to End
    Show {
        draft: PathBuf,
    },
    /// Store a draft as a workflow
    Save {
        draft: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Write a stored workflow into a draft file
    Open {
        id: String,
        draft: PathBuf,
    },
    /// List stored workflows, newest first
    List {
        #[arg(short, long, default_value = "1")]
        page: usize,
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Execute the API call of one step
    Call {
        draft: PathBuf,
        #[arg(long)]
        node: String,
        #[arg(long, default_value = "GET")]
        method: String,
        #[arg(long)]
        url: String,
        /// Headers as a JSON object
        #[arg(long, default_value = "")]
        headers: String,
        /// Body as JSON
        #[arg(long, default_value = "")]
        body: String,
    },
}

/// Initializes tracing with environment-based filtering.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::default(),
    };
    let mut ctx = AppContext::new(config).context("failed to open workflow store")?;
    if let Some(path) = &cli.config {
        ctx = ctx.with_config_path(path);
    }

    let output = match cli.command {
        Commands::Login { email, password } => commands::login(&ctx, &email, &password),
        Commands::Logout => commands::logout(&ctx),
        Commands::SetPassword { password, confirm } => commands::set_password(&ctx, &password, &confirm),
        Commands::ResetPassword {
            email,
            password,
            confirm,
        } => commands::reset_password(&ctx, &email, &password, &confirm),
        Commands::New { draft } => commands::new_draft(&ctx, &draft),
        Commands::Insert {
            draft,
            at,
            kind,
            uuid_ids,
        } => commands::insert(&ctx, &draft, &at, kind, uuid_ids),
        Commands::Show { draft } => commands::show(&ctx, &draft),
        Commands::Save {
            draft,
            name,
            description,
        } => commands::save(&ctx, &draft, &name, &description),
        Commands::Open { id, draft } => commands::open(&ctx, &id, &draft),
        Commands::List { page, search } => commands::list(&ctx, page, search.as_deref()),
        Commands::Call {
            draft,
            node,
            method,
            url,
            headers,
            body,
        } => {
            let config = ApiCallConfig::new(&method, &url, &headers, &body);
            commands::call(&ctx, &draft, &node, config).await
        }
    };

    match output {
        Ok(message) => {
            println!("{}", message);
            Ok(())
        }
        Err(error) => {
            tracing::debug!(error = %error, "command failed");
            Err(anyhow::anyhow!(error.user_message()))
        }
    }
}
