use std::time::Duration;

use thiserror::Error;

/// Errors raised while turning one backend's labels into routes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The directory could not be listed for a project; the project is skipped.
    #[error("failed to list backends in project '{project}': {reason}")]
    DirectoryQuery { project: String, reason: String },

    /// The backend opted in but declared no usable router labels.
    #[error("no router labels found for backend '{backend}'")]
    NoRoutesDefined { backend: String },

    /// The consumer did not take the previous snapshot in time.
    #[error("configuration handoff not consumed within {0:?}")]
    HandoffTimeout(Duration),

    /// The consumer side of the handoff was dropped.
    #[error("configuration consumer is closed")]
    ConsumerClosed,
}

/// Per-audience credential failures. These never abort a cycle; the
/// credential middleware for the backend is simply omitted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("failed to fetch identity token for '{audience}': {reason}")]
    CredentialFetch { audience: String, reason: String },

    #[error("identity token for '{audience}' is not a signed JWT")]
    InvalidCredentialFormat { audience: String },
}

/// Failures reported by a single token source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The mechanism does not exist in this environment (e.g. no metadata server).
    #[error("token source unavailable: {0}")]
    Unavailable(String),

    #[error("token request failed: {0}")]
    Request(String),
}

impl SourceError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_connect() {
            SourceError::Unavailable(err.to_string())
        } else {
            SourceError::Request(err.to_string())
        }
    }
}
