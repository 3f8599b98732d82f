//! Error types for tasknest
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, bad config)
//! - 3: Rejected by the account rules (duplicate account, bad credentials)
//! - 4: Operation failed (storage, hashing)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the tasknest CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const AUTH_REJECTED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tasknest operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Account rules (exit code 3)
    #[error("User already exists with this email: {0}")]
    DuplicateAccount(String),

    #[error("User not found or password incorrect")]
    InvalidCredentials,

    // Operation failures (exit code 4)
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig(_) | Error::InvalidArgument(_) => exit_codes::USER_ERROR,

            Error::DuplicateAccount(_) | Error::InvalidCredentials => exit_codes::AUTH_REJECTED,

            Error::Persistence(_)
            | Error::Credential(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Stable tag for this error, used by UI callers and JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidConfig(_) => "invalid_config",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::DuplicateAccount(_) => "duplicate_account",
            Error::InvalidCredentials => "invalid_credentials",
            Error::Credential(_) => "credential",
            Error::Persistence(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_) => "persistence",
        }
    }

    /// True for errors raised by the storage layer rather than by the stores themselves
    pub fn is_persistence(&self) -> bool {
        self.kind() == "persistence"
    }

    /// Structured details for JSON output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::DuplicateAccount(email) => Some(serde_json::json!({ "email": email })),
            Error::LockFailed(path) => Some(serde_json::json!({ "path": path })),
            Error::InvalidConfig(message)
            | Error::InvalidArgument(message)
            | Error::Persistence(message)
            | Error::Credential(message) => Some(serde_json::json!({ "message": message })),
            _ => None,
        }
    }
}

/// Result type alias for tasknest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub kind: &'static str,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            kind: err.kind(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
