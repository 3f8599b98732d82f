//! tasknest - task list and single-account session library
//!
//! This library provides the stores behind the `tasknest` CLI. They are
//! plain synchronous values that a UI constructs, injects and drives.
//!
//! # Core Concepts
//!
//! - **Task Store**: the ordered task collection with its search query and
//!   sort spec
//! - **Session Store**: the signed-in user, profile, credential history and
//!   last status message; reads tasks through a shared Task Store
//! - **Persistence Port**: a synchronous key-value store of JSON values
//!
//! # Module Organization
//!
//! - `task`: Task model and Task Store
//! - `session`: User, Profile and Session Store
//! - `port`: Persistence port trait, in-memory adapter, write batches
//! - `storage`: File-backed port adapter and data directory resolution
//! - `lock`: File locking and atomic writes
//! - `credential`: Credential hashing
//! - `events`: Change notification and JSONL event sink
//! - `config`: Configuration loading from `tasknest.toml`
//! - `error`: Error types and result aliases
//! - `output`: Human and JSON output for the CLI
//! - `cli`: Command-line interface using clap

pub mod cli;
pub mod config;
pub mod credential;
pub mod error;
pub mod events;
pub mod lock;
pub mod output;
pub mod port;
pub mod session;
pub mod storage;
pub mod task;

pub use error::{Error, Result};
