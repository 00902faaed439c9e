use serde::Serialize;
use thiserror::Error;

/// Unified error type for the command-line entry points.
///
/// Subsystem errors convert into this so every command can return one type,
/// and it serializes for `--format json`.
#[derive(Error, Debug, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("GitHub error: {message}")]
    Github { message: String, operation: String },

    #[error("Download error: {message}")]
    Fetch { message: String },

    #[error("Model error: {message}")]
    Model { message: String },

    #[error("Front-end error: {message}")]
    Frontend { message: String },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },
}

impl AppError {
    /// Create a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a GitHub error with operation context
    pub fn github(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Github {
            message: message.into(),
            operation: operation.into(),
        }
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
        }
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::Model {
            message: message.into(),
        }
    }

    pub fn frontend(message: impl Into<String>) -> Self {
        Self::Frontend {
            message: message.into(),
        }
    }

    /// Create an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a Parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (user can retry or take action)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Network and subprocess failures may be transient
            Self::Github { .. } | Self::Fetch { .. } | Self::Model { .. } | Self::Io { .. } => {
                true
            }
            // Won't change without the user fixing setup or input
            Self::Config { .. } | Self::Frontend { .. } | Self::Parse { .. } => false,
        }
    }
}

impl From<crate::sources::GhError> for AppError {
    fn from(err: crate::sources::GhError) -> Self {
        use crate::sources::GhError;
        match err {
            GhError::Io(msg) => AppError::github(msg, "spawn"),
            GhError::Command(msg) => AppError::github(msg, "api"),
            GhError::Parse(msg) => AppError::parse(format!("gh response: {msg}")),
        }
    }
}

impl From<crate::sources::FetchError> for AppError {
    fn from(err: crate::sources::FetchError) -> Self {
        AppError::fetch(err.to_string())
    }
}

impl From<crate::mine::MineError> for AppError {
    fn from(err: crate::mine::MineError) -> Self {
        use crate::mine::MineError;
        match err {
            MineError::Listing { .. } => AppError::github(err.to_string(), "list pulls"),
            MineError::Io(e) => AppError::io(e.to_string()),
            MineError::Json(e) => AppError::parse(e.to_string()),
        }
    }
}

impl From<crate::dataset::DatasetError> for AppError {
    fn from(err: crate::dataset::DatasetError) -> Self {
        use crate::dataset::DatasetError;
        match err {
            DatasetError::Read { .. } | DatasetError::Write { .. } => AppError::io(err.to_string()),
            DatasetError::Json(e) => AppError::parse(e.to_string()),
        }
    }
}

impl From<crate::rules::RulesError> for AppError {
    fn from(err: crate::rules::RulesError) -> Self {
        use crate::rules::RulesError;
        match err {
            RulesError::Io(e) => AppError::io(format!("rule table: {e}")),
            RulesError::Json(e) => AppError::parse(format!("rule table: {e}")),
        }
    }
}

impl From<crate::recommend::ModelError> for AppError {
    fn from(err: crate::recommend::ModelError) -> Self {
        AppError::model(err.to_string())
    }
}

impl From<crate::ast::FrontendError> for AppError {
    fn from(err: crate::ast::FrontendError) -> Self {
        AppError::frontend(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::parse(err.to_string())
    }
}

impl From<AppError> for String {
    fn from(err: AppError) -> Self {
        err.to_string()
    }
}
