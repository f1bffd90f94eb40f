//! Operator CLI for the notification engine.
//!
//! # Responsibility
//! - Drive create/list/read/delete/clear against a configured store.
//! - Print toasts for notifications created in this invocation.
//! - Fail the invocation when any change could not be persisted.

use anyhow::{bail, Context, Result};
use campus_notify_core::presentation::time_ago;
use campus_notify_core::{
    init_logging, DispatchError, EngineConfig, LoggingPersistenceMonitor, NewNotification,
    NotificationEngine, NotificationType, PersistOp, PersistenceMonitor, Priority, RepoError,
    StorageConfig, Toast, ToastSink, Viewer,
};
use clap::{Args, Parser, Subcommand};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "campus-notify", version, about = "School portal notification store")]
struct Cli {
    /// TOML engine config. Defaults to a JSON store at `--store`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON snapshot file used when no config is given.
    #[arg(long, default_value = "notifications.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone)]
struct ViewerArgs {
    #[arg(long)]
    role: String,
    #[arg(long)]
    user: Option<String>,
}

impl ViewerArgs {
    fn viewer(&self) -> Viewer {
        Viewer::new(self.role.as_str(), self.user.clone())
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create a notification.
    Create {
        #[arg(long = "type")]
        kind: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        message: String,
        #[arg(long, default_value = "normal")]
        priority: String,
        /// Repeat for several roles; `all` targets everyone.
        #[arg(long = "role", required = true)]
        roles: Vec<String>,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },
    /// List notifications visible to a viewer, newest first.
    List {
        #[command(flatten)]
        viewer: ViewerArgs,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the unread count for a viewer.
    Unread {
        #[command(flatten)]
        viewer: ViewerArgs,
    },
    /// Mark one notification read.
    Read { id: Uuid },
    /// Mark everything visible to a viewer read.
    ReadAll {
        #[command(flatten)]
        viewer: ViewerArgs,
    },
    /// Delete one notification.
    Delete { id: Uuid },
    /// Delete everything visible to a viewer, or everything with `--global`.
    Clear {
        #[arg(long, conflicts_with_all = ["role", "user"])]
        global: bool,
        #[arg(long, required_unless_present = "global")]
        role: Option<String>,
        #[arg(long)]
        user: Option<String>,
    },
}

struct StderrToastSink;

impl ToastSink for StderrToastSink {
    fn show(&self, toast: Toast) -> Result<(), DispatchError> {
        eprintln!(
            "[{} | {} | {}s] {}: {}",
            toast.label,
            toast.priority.as_str(),
            toast.duration.as_secs(),
            toast.title,
            toast.message
        );
        Ok(())
    }
}

/// Keeps every persistence failure so the invocation can report them.
#[derive(Default)]
struct CollectingMonitor(Mutex<Vec<String>>);

impl CollectingMonitor {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }
}

impl PersistenceMonitor for CollectingMonitor {
    fn on_persistence_error(&self, op: PersistOp, medium: &str, error: &RepoError) {
        LoggingPersistenceMonitor.on_persistence_error(op, medium, error);
        self.0
            .lock()
            .push(format!("{} on {medium}: {error}", op.as_str()));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config `{}`", path.display()))?,
        None => EngineConfig {
            storage: StorageConfig::JsonFile {
                path: cli.store.clone(),
            },
            ..EngineConfig::default()
        },
    };
    if config.logging.dir.is_some() {
        init_logging(&config.logging).context("starting logging")?;
    }

    execute(&config, cli.command)
}

/// Runs one command and turns unsaved changes into a failing exit.
fn execute(config: &EngineConfig, command: Command) -> Result<()> {
    let monitor = Arc::new(CollectingMonitor::default());
    let engine = NotificationEngine::builder_from_config(config)
        .context("opening notification store")?
        .monitor(monitor.clone())
        .toast_sink(StderrToastSink)
        .open();

    run(&engine, command)?;

    let failures = monitor.take();
    if !failures.is_empty() {
        for failure in &failures {
            eprintln!("persistence failure: {failure}");
        }
        bail!(
            "{} persistence failure(s); the stored notifications do not reflect this command",
            failures.len()
        );
    }
    Ok(())
}

fn run(engine: &NotificationEngine, command: Command) -> Result<()> {
    match command {
        Command::Create {
            kind,
            title,
            message,
            priority,
            roles,
            user,
            url,
        } => {
            let Some(kind) = NotificationType::parse(&kind) else {
                bail!("unknown notification type `{kind}`");
            };
            let Some(priority) = Priority::parse(&priority) else {
                bail!("unknown priority `{priority}`; expected low|normal|high|urgent");
            };
            let mut input = NewNotification::new(kind, title, message)
                .priority(priority)
                .to_roles(roles);
            input.target_user_id = user;
            input.action_url = url;

            let created = engine.create(input)?;
            println!("{}", created.id);
        }
        Command::List { viewer, limit } => {
            let viewer = viewer.viewer();
            let items = match limit {
                Some(limit) => engine.recent_for(&viewer, limit),
                None => engine.visible_for(&viewer),
            };
            let now = chrono::Utc::now();
            for item in items {
                println!(
                    "{} {} {:<18} {:<8} {:>10}  {}",
                    item.id,
                    if item.read { " " } else { "*" },
                    item.kind.as_str(),
                    item.priority.as_str(),
                    time_ago(item.created_at, now),
                    item.title
                );
            }
        }
        Command::Unread { viewer } => {
            println!("{}", engine.unread_count_for(&viewer.viewer()));
        }
        Command::Read { id } => {
            if !engine.mark_read(id) {
                println!("no change");
            }
        }
        Command::ReadAll { viewer } => {
            println!("{}", engine.mark_all_read(&viewer.viewer()));
        }
        Command::Delete { id } => {
            if !engine.delete(id) {
                println!("no change");
            }
        }
        Command::Clear { global, role, user } => {
            let removed = match (global, role) {
                (true, _) => engine.clear_all(),
                (false, Some(role)) => engine.clear_all_for(&Viewer::new(role, user)),
                (false, None) => bail!("`--role` is required unless `--global` is set"),
            };
            println!("{removed}");
        }
    }
    Ok(())
}
