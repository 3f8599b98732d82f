//! Command-line interface for tasknest
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::credential;
use crate::error::Result;
use crate::events::EventDestination;
use crate::output::OutputOptions;
use crate::port::KeyValueStore;
use crate::session::SessionStore;
use crate::storage::{self, FileStore};
use crate::task::{self, SharedTaskStore, TaskStore, TASKS_KEY};

mod account;
mod tasks;

/// tasknest - personal task list with a single local account
#[derive(Parser, Debug)]
#[command(name = "tasknest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true, env = "TASKNEST_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write store events as JSON lines to a file, or `-` for stdout
    #[arg(long, global = true, value_name = "PATH")]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommands),

    /// Manage the local account
    #[command(subcommand)]
    Account(AccountCommands),
}

/// Task fields shared by `task add` and `task edit`
#[derive(Args, Debug, Default)]
pub struct TaskFields {
    /// Description title
    #[arg(long)]
    pub description: Option<String>,

    /// Expected duration, e.g. "2 hours"
    #[arg(long)]
    pub duration: Option<String>,

    /// Extra information the task needs (repeatable)
    #[arg(long = "extra", value_name = "ITEM")]
    pub extra: Vec<String>,

    /// Due date, e.g. 2024-07-14
    #[arg(long)]
    pub due: Option<String>,

    /// Priority: low, medium, high
    #[arg(long)]
    pub priority: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// Subtask (repeatable)
    #[arg(long = "subtask", value_name = "TEXT")]
    pub subtasks: Vec<String>,

    /// Mark the task as recurring
    #[arg(long)]
    pub recurring: bool,
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add a task
    Add {
        #[arg(long)]
        title: String,

        /// Task ID (defaults to the next free ID)
        #[arg(long)]
        id: Option<u64>,

        /// Owner (defaults to the signed-in user)
        #[arg(long)]
        user: Option<u64>,

        #[command(flatten)]
        fields: TaskFields,
    },

    /// List tasks
    List {
        /// Only tasks whose title or description title contains this text
        #[arg(long)]
        search: Option<String>,

        /// Sort key, e.g. dueDate, priority, title
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Only tasks of the signed-in user
        #[arg(long)]
        mine: bool,
    },

    /// Mark a task completed
    Complete { id: u64 },

    /// Delete a task
    Delete { id: u64 },

    /// Replace fields of a task
    Edit {
        id: u64,

        #[arg(long)]
        title: Option<String>,

        /// New owner
        #[arg(long)]
        user: Option<u64>,

        /// Mark the task open again
        #[arg(long)]
        reopen: bool,

        #[command(flatten)]
        fields: TaskFields,
    },
}

/// Account subcommands
#[derive(Subcommand, Debug)]
pub enum AccountCommands {
    /// Create the account and sign in
    Register { email: String, password: String },

    /// Sign in to the registered account
    SignIn { email: String, password: String },

    /// Sign out
    SignOut,

    /// Show the signed-in user
    Whoami,

    /// Show the stored credential history
    History,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let ctx = Context::load(self.data_dir, self.events.as_deref(), self.json, self.quiet)?;
        match self.command {
            Commands::Task(cmd) => tasks::run(ctx, cmd),
            Commands::Account(cmd) => account::run(ctx, cmd),
        }
    }
}

/// Stores opened for one invocation
pub(crate) struct Context {
    pub session: SessionStore<FileStore>,
    pub tasks: SharedTaskStore,
    pub output: OutputOptions,
}

impl Context {
    fn load(
        data_dir: Option<PathBuf>,
        events: Option<&str>,
        json: bool,
        quiet: bool,
    ) -> Result<Self> {
        let data_dir = storage::resolve_data_dir(data_dir.as_deref());
        let store = FileStore::open(&data_dir)?;
        let config = Config::load_from_dir(store.root());
        let hasher = credential::hasher_from_config(&config.credentials)?;

        let mut task_store = TaskStore::new().with_sort_spec(config.tasks.sort_spec()?);
        let count = task_store.load(&store)?;
        if count == 0 && config.tasks.seed_samples && store.get(TASKS_KEY)?.is_none() {
            tracing::debug!("seeding sample tasks");
            for sample in task::sample_tasks() {
                task_store.add(sample);
            }
            task_store.save(&store)?;
        }
        let tasks = task_store.into_shared();

        let mut session = SessionStore::new(tasks.clone(), store, hasher);
        session.fetch_user()?;

        let destination = EventDestination::parse(events);
        let events_to_stdout = matches!(destination, Some(EventDestination::Stdout));
        if let Some(destination) = destination {
            let sink = destination.open()?.shared();
            tasks.borrow_mut().subscribe(sink.listener());
            session.subscribe(sink.listener());
        }

        tracing::debug!(data_dir = %data_dir.display(), "context loaded");
        Ok(Self {
            session,
            tasks,
            output: OutputOptions {
                json: json && !events_to_stdout,
                quiet: quiet || events_to_stdout,
            },
        })
    }

    /// Persist the task collection
    pub fn save_tasks(&self) -> Result<()> {
        self.tasks.borrow().save(self.session.store())
    }
}
