//! Test results and their classification

use crate::condition::Condition;
use crate::discovery::EntryId;
use crate::error::{EngineError, EngineResult};
use crate::modifier::{Conflict, Verdict};
use crate::types::TypeRef;
use crate::value::RaisedError;
use std::fmt;
use std::time::Duration;

/// Final classification of a unit. Exactly one per result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Passed,
    Failed,
    Skipped,
    Informal,
    Conflicted,
    /// Never produced by a correct engine.
    Unknown,
}

impl Classification {
    pub fn name(self) -> &'static str {
        match self {
            Classification::Passed => "passed",
            Classification::Failed => "failed",
            Classification::Skipped => "skipped",
            Classification::Informal => "informal",
            Classification::Conflicted => "conflicted",
            Classification::Unknown => "unknown",
        }
    }
}

/// Lifecycle of a single unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    NotRun,
    Running,
    Finished(Classification),
}

impl UnitState {
    /// NotRun -> Running
    pub fn start(&mut self) -> EngineResult<()> {
        match *self {
            UnitState::NotRun => {
                *self = UnitState::Running;
                Ok(())
            }
            from => Err(EngineError::InvalidTransition {
                from,
                action: "start",
            }),
        }
    }

    /// Running -> Finished
    pub fn finish(&mut self, classification: Classification) -> EngineResult<()> {
        match *self {
            UnitState::Running => {
                *self = UnitState::Finished(classification);
                Ok(())
            }
            from => Err(EngineError::InvalidTransition {
                from,
                action: "finish",
            }),
        }
    }

    /// NotRun -> Finished, for units decided before execution.
    pub fn settle(&mut self, classification: Classification) -> EngineResult<()> {
        match *self {
            UnitState::NotRun => {
                *self = UnitState::Finished(classification);
                Ok(())
            }
            from => Err(EngineError::InvalidTransition {
                from,
                action: "settle",
            }),
        }
    }

    /// The terminal classification, or `Unknown` if the unit never finished.
    pub fn classification(self) -> Classification {
        match self {
            UnitState::Finished(classification) => classification,
            UnitState::NotRun | UnitState::Running => Classification::Unknown,
        }
    }
}

/// Why a unit failed.
#[derive(Debug, Clone)]
pub enum Failure {
    Assertion(Condition),
    Raised(RaisedError),
    ExpectedRaise {
        expected: TypeRef,
        received: Option<RaisedError>,
    },
    /// A reverted body did not fail.
    Reverted,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Assertion(condition) => {
                write!(f, "Assertion failed: {}", condition)?;
                if let Some(error) = condition.captured_error() {
                    write!(f, "\nraised while evaluating: {}", error)?;
                }
                Ok(())
            }
            Failure::Raised(error) => write!(f, "Unexpected error: {}", error),
            Failure::ExpectedRaise {
                expected,
                received: Some(error),
            } => write!(f, "Expected {} to be raised, got {}", expected, error),
            Failure::ExpectedRaise {
                expected,
                received: None,
            } => write!(f, "Expected {} to be raised, nothing was raised", expected),
            Failure::Reverted => f.write_str("Reverted test passed"),
        }
    }
}

/// Classified outcome of one executed unit. Immutable once built.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub(crate) file: EntryId,
    pub(crate) path: String,
    pub(crate) case: String,
    pub(crate) classification: Classification,
    pub(crate) failure: Option<Failure>,
    pub(crate) conflict: Option<Conflict>,
    pub(crate) modifier_annotations: Vec<String>,
    pub(crate) notes: Vec<String>,
    pub(crate) sequence_index: usize,
    pub(crate) is_last_in_group: bool,
    pub(crate) duration: Duration,
}

impl TestResult {
    /// Entry of the file the unit belongs to.
    pub fn file(&self) -> EntryId {
        self.file
    }

    /// Slash separated path of the file.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn case(&self) -> &str {
        &self.case
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub fn conflict(&self) -> Option<&Conflict> {
        self.conflict.as_ref()
    }

    pub fn modifier_annotations(&self) -> &[String] {
        &self.modifier_annotations
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Position of the unit in discovery order across the run.
    pub fn sequence_index(&self) -> usize {
        self.sequence_index
    }

    /// Whether this is the last unit of its file.
    pub fn is_last_in_group(&self) -> bool {
        self.is_last_in_group
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_passed(&self) -> bool {
        self.classification == Classification::Passed
    }

    pub fn is_failed(&self) -> bool {
        self.classification == Classification::Failed
    }

    pub fn is_skipped(&self) -> bool {
        self.classification == Classification::Skipped
    }

    pub fn is_informal(&self) -> bool {
        self.classification == Classification::Informal
    }

    pub fn is_conflicted(&self) -> bool {
        self.classification == Classification::Conflicted
    }

    pub fn is_unknown(&self) -> bool {
        self.classification == Classification::Unknown
    }
}

/// Accumulates the parts of a [`TestResult`] while its unit runs.
#[derive(Debug)]
pub(crate) struct ResultBuilder {
    state: UnitState,
    file: EntryId,
    case: String,
    failure: Option<Failure>,
    conflict: Option<Conflict>,
    modifier_annotations: Vec<String>,
    notes: Vec<String>,
    is_last_in_group: bool,
    duration: Duration,
}

impl ResultBuilder {
    pub(crate) fn new(file: EntryId, case: &str, is_last_in_group: bool) -> Self {
        Self {
            state: UnitState::NotRun,
            file,
            case: case.to_string(),
            failure: None,
            conflict: None,
            modifier_annotations: Vec::new(),
            notes: Vec::new(),
            is_last_in_group,
            duration: Duration::ZERO,
        }
    }

    pub(crate) fn file(&self) -> EntryId {
        self.file
    }

    pub(crate) fn annotate(&mut self, annotations: Vec<String>) {
        self.modifier_annotations = annotations;
    }

    pub(crate) fn start(&mut self) -> EngineResult<()> {
        self.state.start()
    }

    pub(crate) fn skipped(&mut self) -> EngineResult<()> {
        self.state.settle(Classification::Skipped)
    }

    pub(crate) fn conflicted(&mut self, conflict: Conflict) -> EngineResult<()> {
        self.state.settle(Classification::Conflicted)?;
        self.conflict = Some(conflict);
        Ok(())
    }

    /// Finish a running unit from its reinterpreted verdict.
    pub(crate) fn judged(
        &mut self,
        verdict: Verdict,
        informal: bool,
        notes: Vec<String>,
        duration: Duration,
    ) -> EngineResult<()> {
        let classification = match verdict {
            Verdict::Pass if informal => Classification::Informal,
            Verdict::Pass => Classification::Passed,
            Verdict::Fail(failure) => {
                self.failure = Some(failure);
                Classification::Failed
            }
        };
        self.state.finish(classification)?;
        self.notes = notes;
        self.duration = duration;
        Ok(())
    }

    pub(crate) fn build(self, sequence_index: usize, path: String) -> TestResult {
        let classification = self.state.classification();
        if classification == Classification::Unknown {
            tracing::error!(case = %self.case, state = ?self.state, "unit left without classification");
        }
        TestResult {
            file: self.file,
            path,
            case: self.case,
            classification,
            failure: self.failure,
            conflict: self.conflict,
            modifier_annotations: self.modifier_annotations,
            notes: self.notes,
            sequence_index,
            is_last_in_group: self.is_last_in_group,
            duration: self.duration,
        }
    }
}
