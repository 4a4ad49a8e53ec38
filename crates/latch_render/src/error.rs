//! Bootstrap errors
//!
//! Everything an environment can do wrong funnels into one [`BootstrapError`].
//! [`ProtocolMisuse`] is the odd one out: it means engine code broke the
//! publish/await contract and is raised as a panic, not published.

use crate::BackendKind;
use std::fmt;
use thiserror::Error;

/// Why a backend initializer failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InitError {
    message: String,
}

impl InitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap any displayable native error.
    pub fn from_error(err: impl fmt::Display) -> Self {
        Self::new(err.to_string())
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for InitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for InitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Cause recorded for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureCause {
    /// The platform does not offer this backend; it was never attempted.
    #[error("not supported in this environment")]
    Unavailable,

    /// The initializer ran and reported a failure.
    #[error(transparent)]
    InitFailed(#[from] InitError),
}

/// One entry in the attempt log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {cause}")]
pub struct CandidateFailure {
    pub kind: BackendKind,
    pub cause: FailureCause,
}

impl CandidateFailure {
    pub fn unavailable(kind: BackendKind) -> Self {
        Self {
            kind,
            cause: FailureCause::Unavailable,
        }
    }

    pub fn init_failed(kind: BackendKind, err: InitError) -> Self {
        Self {
            kind,
            cause: FailureCause::InitFailed(err),
        }
    }
}

/// Every candidate was tried and none produced a backend.
///
/// Failures are kept in attempt order. When an override forced a single
/// backend, `forced` names it and `failures` holds exactly that one entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {}", headline(.forced), join_failures(.failures))]
pub struct BootstrapError {
    pub forced: Option<BackendKind>,
    pub failures: Vec<CandidateFailure>,
}

impl BootstrapError {
    pub fn exhausted(failures: Vec<CandidateFailure>) -> Self {
        Self {
            forced: None,
            failures,
        }
    }

    pub fn forced(kind: BackendKind, failure: CandidateFailure) -> Self {
        Self {
            forced: Some(kind),
            failures: vec![failure],
        }
    }

    /// Kinds that were considered, in attempt order.
    pub fn attempted(&self) -> impl Iterator<Item = BackendKind> + '_ {
        self.failures.iter().map(|f| f.kind)
    }
}

fn headline(forced: &Option<BackendKind>) -> String {
    match forced {
        Some(kind) => format!("failed to initialize forced graphics backend {kind}"),
        None => "failed to choose a graphics backend".to_string(),
    }
}

fn join_failures(failures: &[CandidateFailure]) -> String {
    if failures.is_empty() {
        return "no candidates for this platform".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Broken publish/await contract. Always an engine bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolMisuse {
    #[error("readiness gate was published twice")]
    PublishedTwice,

    #[error("graphics backend awaited before bootstrap was started")]
    AwaitBeforeStart,
}
