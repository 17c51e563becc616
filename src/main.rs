use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context as _, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use taskdesk::config::{Config, Theme};
use taskdesk::engine::TaskEngine;
use taskdesk::model::{Role, Task, TaskDraft, TaskStatus, User};
use taskdesk::notify::LogSink;
use taskdesk::store::{keys, JsonStore};
use taskdesk::upload;

#[derive(Parser)]
#[command(
    name = "taskdesk",
    about = "Local-first task tracker with an approval workflow",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Data directory for persisted state and config.toml
    #[arg(long, env = "TASKDESK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TASKDESK_LOG")]
    log: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in. The stock install ships two demo accounts.
    ///
    /// Examples:
    ///   taskdesk login smdileep@gmail.com admin123
    ///   taskdesk login user@gmail.com user123
    Login { username: String, password: String },
    /// Sign out of the current session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Create, inspect, and move tasks through their lifecycle.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Update the signed-in user's profile.
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        mobile: Option<String>,
        #[arg(long)]
        photo_url: Option<String>,
    },
    /// Show or set the UI theme.
    Theme {
        /// "light" or "dark"; omit to print the current theme
        mode: Option<Theme>,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Create a task. New tasks start pending with 0% progress.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// Deadline date, e.g. 2025-06-01
        #[arg(long)]
        deadline: NaiveDate,
        /// Photo source path; repeatable. Runs through the upload simulator.
        #[arg(long = "photo")]
        photos: Vec<String>,
    },
    /// List tasks. Admins see every task; users see their own.
    List {
        /// Filter by status (pending, in-progress, submitted, approved, rejected)
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Show one task in full.
    Show { id: String },
    /// Edit a task you own while it is still pending or in progress.
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Progress percentage, 0–100
        #[arg(long)]
        progress: Option<u8>,
        #[arg(long)]
        deadline: Option<NaiveDate>,
        /// Move between pending and in-progress
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Submit a task you own for admin review.
    Submit { id: String },
    /// Approve a submitted task (admin only).
    Approve {
        id: String,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Reject a submitted task with a reason (admin only).
    Reject {
        id: String,
        #[arg(long)]
        comment: String,
    },
    /// Take a rejected task you own back to pending for another pass.
    Reopen { id: String },
    /// Delete a task (admin only).
    Delete { id: String },
}

/// Fixed demo credential pairs matching the stock install's login screen.
/// Credential verification is deliberately outside the engine.
const DEMO_CREDENTIALS: &[(&str, &str, Role)] = &[
    ("smdileep@gmail.com", "admin123", Role::Admin),
    ("user@gmail.com", "user123", Role::User),
];

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::resolve(args.data_dir, args.log);
    setup_logging(&config.log, &config.log_format);

    let store = JsonStore::open(&config.data_dir)
        .with_context(|| format!("failed to open data dir {}", config.data_dir.display()))?;
    let mut engine = TaskEngine::open(store.clone(), Arc::new(LogSink));

    match args.command {
        Command::Login { username, password } => login(&mut engine, &username, &password)?,
        Command::Logout => {
            engine.logout()?;
            println!("Signed out");
        }
        Command::Whoami => match engine.current_user() {
            Some(user) => println!("{} ({:?}, id {})", user.name, user.role, user.id),
            None => println!("not signed in"),
        },
        Command::Task { action } => run_task_action(&mut engine, action).await?,
        Command::Profile {
            name,
            mobile,
            photo_url,
        } => {
            let mut me = require_login(&engine)?;
            if let Some(name) = name {
                me.name = name;
            }
            if let Some(mobile) = mobile {
                me.mobile = mobile;
            }
            if let Some(photo_url) = photo_url {
                me.photo_url = photo_url;
            }
            let actor_id = me.id.clone();
            let updated = engine.update_user(me, &actor_id)?;
            println!("Profile updated: {} ({})", updated.name, updated.mobile);
        }
        Command::Theme { mode } => match mode {
            None => println!("{}", store.load(keys::THEME, config.default_theme)),
            Some(next) => {
                store.save(keys::THEME, &next)?;
                println!("theme set to {next}");
            }
        },
    }

    Ok(())
}

async fn run_task_action(engine: &mut TaskEngine, action: TaskAction) -> Result<()> {
    let me = require_login(engine)?;

    match action {
        TaskAction::Create {
            title,
            description,
            deadline,
            photos,
        } => {
            let photos = if photos.is_empty() {
                Vec::new()
            } else {
                upload::start_upload(photos)
                    .await
                    .context("photo upload was canceled")?
            };
            let task = engine.create_task(
                TaskDraft {
                    title,
                    description,
                    deadline: Some(deadline),
                    photos,
                },
                &me.id,
            )?;
            println!("Created task {}", task.id);
            print_task_line(&task);
        }
        TaskAction::List { status } => {
            for task in engine.tasks() {
                if !me.is_admin() && task.created_by != me.id {
                    continue;
                }
                if status.is_some_and(|s| s != task.status) {
                    continue;
                }
                print_task_line(task);
            }
        }
        TaskAction::Show { id } => {
            let task = engine
                .task(&id)
                .ok_or_else(|| anyhow!("task not found: {id}"))?
                .clone();
            print_task_full(engine, &task);
        }
        TaskAction::Update {
            id,
            title,
            description,
            progress,
            deadline,
            status,
        } => {
            let mut task = engine
                .task(&id)
                .ok_or_else(|| anyhow!("task not found: {id}"))?
                .clone();
            if let Some(title) = title {
                task.title = title;
            }
            if let Some(description) = description {
                task.description = description;
            }
            if let Some(progress) = progress {
                task.progress = progress;
            }
            if let Some(deadline) = deadline {
                task.deadline = deadline;
            }
            if let Some(status) = status {
                task.status = status;
            }
            let updated = engine.update_task(task, &me.id)?;
            print_task_line(&updated);
        }
        TaskAction::Submit { id } => {
            let task = engine.submit_task(&id, &me.id)?;
            print_task_line(&task);
        }
        TaskAction::Approve { id, comment } => {
            let task = engine.approve_task(&id, comment, &me.id)?;
            print_task_line(&task);
        }
        TaskAction::Reject { id, comment } => {
            let task = engine.reject_task(&id, comment, &me.id)?;
            print_task_line(&task);
        }
        TaskAction::Reopen { id } => {
            let task = engine.reopen_task(&id, &me.id)?;
            print_task_line(&task);
        }
        TaskAction::Delete { id } => {
            engine.delete_task(&id, &me.id)?;
            println!("Deleted task {id}");
        }
    }

    Ok(())
}

fn login(engine: &mut TaskEngine, username: &str, password: &str) -> Result<()> {
    if username.is_empty() || password.is_empty() {
        bail!("enter both username and password");
    }
    let role = DEMO_CREDENTIALS
        .iter()
        .find(|(u, p, _)| *u == username && *p == password)
        .map(|(_, _, role)| *role)
        .ok_or_else(|| anyhow!("invalid username or password"))?;
    let user = engine
        .users()
        .iter()
        .find(|u| u.role == role)
        .cloned()
        .ok_or_else(|| anyhow!("no {role:?} account exists in this store"))?;
    engine.set_session(Some(user.clone()))?;
    println!("Signed in as {}", user.name);
    Ok(())
}

fn require_login(engine: &TaskEngine) -> Result<User> {
    engine
        .current_user()
        .cloned()
        .ok_or_else(|| anyhow!("not signed in — run `taskdesk login` first"))
}

fn print_task_line(task: &Task) {
    println!(
        "{}  [{}] {:>3}%  due {}  {}",
        task.id, task.status, task.progress, task.deadline, task.title
    );
}

fn print_task_full(engine: &TaskEngine, task: &Task) {
    print_task_line(task);
    println!("  owner: {}", owner_name(engine, &task.created_by));
    println!("  description: {}", task.description);
    if let Some(comment) = &task.admin_comment {
        println!("  admin comment: {comment}");
    }
    for photo in &task.photos {
        println!("  photo: {photo}");
    }
}

fn owner_name(engine: &TaskEngine, user_id: &str) -> String {
    engine
        .user(user_id)
        .map(|u| u.name.clone())
        .unwrap_or_else(|| user_id.to_string())
}

/// Initialize the tracing subscriber.
///
/// `log_format` may be `"pretty"` (default, human-readable compact format)
/// or `"json"` (structured JSON for log aggregators).
fn setup_logging(log_level: &str, log_format: &str) {
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(log_level)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(log_level)
            .compact()
            .init();
    }
}
