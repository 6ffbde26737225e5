//! Error types for the verdict engine

use crate::event::EventKind;
use crate::result::UnitState;
use crate::value::RaisedError;
use thiserror::Error;

/// Boxed error returned by event handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Misuse of the assertion API by the test author.
///
/// Never captured into a condition; it escapes `evaluate()` and ends the unit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UsageError {
    #[error("{operand} must be a type, got {got}")]
    NotAType { operand: &'static str, got: String },

    #[error("condition was already evaluated")]
    AlreadyEvaluated,
}

impl From<UsageError> for RaisedError {
    fn from(error: UsageError) -> Self {
        RaisedError::type_error(error.to_string())
    }
}

/// A test file could not be made runnable.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct LoadError {
    message: String,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<RaisedError> for LoadError {
    fn from(error: RaisedError) -> Self {
        LoadError::new(error.to_string())
    }
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{kind:?} handler failed: {source}")]
    Handler {
        kind: EventKind,
        #[source]
        source: HandlerError,
    },

    #[error("invalid unit transition from {from:?} via {action}")]
    InvalidTransition {
        from: UnitState,
        action: &'static str,
    },

    #[error("worker for file #{0} stopped without reporting")]
    WorkerLost(usize),
}

pub type EngineResult<T> = Result<T, EngineError>;
