use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    Transport,
    SchemaMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("access token unavailable: {0}")]
    Auth(String),
    #[error("query execution failed: {0}")]
    Transport(String),
    #[error("query rejected by service: {0}")]
    Query(String),
    #[error("row {row} has {actual} cells but the report declares {expected} headers")]
    SchemaMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

impl ReportError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::Transport(_) | Self::Query(_) => ErrorKind::Transport,
            Self::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
        }
    }

    /// Transport-kind failures leave the last good page intact and may be re-issued.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}
