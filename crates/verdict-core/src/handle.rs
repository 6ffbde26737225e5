//! Test handle - the assertion API handed to each test body

use crate::condition::{Condition, ConditionKind, ConditionState};
use crate::error::UsageError;
use crate::modifier::BodyOutcome;
use crate::types;
use crate::value::{RaisedError, Value};

/// Records the conditions evaluated by one test body.
///
/// Every assertion returns `Err` when it does not hold, so a body can stop
/// at the first failure with `?` or keep going and let the engine pick up
/// the recorded failure afterwards.
#[derive(Debug, Default)]
pub struct TestHandle {
    conditions: Vec<Condition>,
    usage_error: Option<UsageError>,
    notes: Vec<String>,
}

impl TestHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assert_true(&mut self, value: impl Into<Value>) -> Result<(), RaisedError> {
        self.check(ConditionKind::Truth {
            value: value.into(),
            expected: true,
        })
    }

    pub fn assert_false(&mut self, value: impl Into<Value>) -> Result<(), RaisedError> {
        self.check(ConditionKind::Truth {
            value: value.into(),
            expected: false,
        })
    }

    /// Both operands are the same object.
    pub fn assert_is(
        &mut self,
        left: impl Into<Value>,
        right: impl Into<Value>,
    ) -> Result<(), RaisedError> {
        self.check(ConditionKind::Identical(left.into(), right.into()))
    }

    pub fn assert_eq(
        &mut self,
        left: impl Into<Value>,
        right: impl Into<Value>,
    ) -> Result<(), RaisedError> {
        self.check(ConditionKind::Equal(left.into(), right.into()))
    }

    pub fn assert_ne(
        &mut self,
        left: impl Into<Value>,
        right: impl Into<Value>,
    ) -> Result<(), RaisedError> {
        self.check(ConditionKind::NotEqual(left.into(), right.into()))
    }

    /// `checked` is a type deriving from the type `reference`.
    ///
    /// Passing a non-type `reference` is a usage error and raises `type_error`.
    pub fn assert_subtype(
        &mut self,
        checked: impl Into<Value>,
        reference: impl Into<Value>,
    ) -> Result<(), RaisedError> {
        self.check(ConditionKind::Subtype {
            checked: checked.into(),
            reference: reference.into(),
        })
    }

    pub fn assert_instance(
        &mut self,
        value: impl Into<Value>,
        reference: impl Into<Value>,
    ) -> Result<(), RaisedError> {
        self.check(ConditionKind::Instance {
            value: value.into(),
            reference: reference.into(),
        })
    }

    /// Attach a diagnostic note to the unit's result.
    pub fn note(&mut self, text: impl Into<String>) {
        self.notes.push(text.into());
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn check(&mut self, kind: ConditionKind) -> Result<(), RaisedError> {
        let mut condition = Condition::new(kind);
        match condition.evaluate() {
            Ok(true) => {
                self.conditions.push(condition);
                Ok(())
            }
            Ok(false) => {
                let error = RaisedError::new(types::assertion_error(), condition.to_string());
                self.conditions.push(condition);
                Err(error)
            }
            Err(usage) => {
                self.usage_error.get_or_insert(usage.clone());
                Err(usage.into())
            }
        }
    }

    /// Settle what the body did.
    ///
    /// Usage errors win over everything, then the first failed condition,
    /// then whatever the body returned.
    pub(crate) fn finish(
        self,
        returned: Result<(), RaisedError>,
    ) -> (BodyOutcome, Vec<String>) {
        let outcome = if let Some(usage) = self.usage_error {
            BodyOutcome::Raised(usage.into())
        } else if let Some(failed) = self
            .conditions
            .into_iter()
            .find(|c| c.state() == ConditionState::Failed)
        {
            BodyOutcome::AssertionFailed(failed)
        } else {
            match returned {
                Ok(()) => BodyOutcome::Returned,
                Err(error) => BodyOutcome::Raised(error),
            }
        };
        (outcome, self.notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_assertion_returns_assertion_error() {
        let mut handle = TestHandle::new();
        let error = handle.assert_eq(1, 2).unwrap_err();
        assert!(error.is_kind(types::assertion_error()));
        assert_eq!(error.message(), "<Equal state=failed left=1 right=2>");
    }

    #[test]
    fn test_body_may_continue_after_failure() {
        let mut handle = TestHandle::new();
        let _ = handle.assert_true(false);
        handle.assert_eq(1, 1).unwrap();
        assert_eq!(handle.conditions().len(), 2);

        let (outcome, _) = handle.finish(Ok(()));
        assert!(matches!(outcome, BodyOutcome::AssertionFailed(_)));
    }

    #[test]
    fn test_usage_error_cannot_be_swallowed() {
        let mut handle = TestHandle::new();
        let _ = handle.assert_subtype(types::bool(), 1);
        let (outcome, _) = handle.finish(Ok(()));
        match outcome {
            BodyOutcome::Raised(error) => assert!(error.is_kind(types::type_error())),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_returned_error_is_raised() {
        let handle = TestHandle::new();
        let (outcome, _) = handle.finish(Err(RaisedError::value_error("boom")));
        assert!(matches!(outcome, BodyOutcome::Raised(_)));
    }

    #[test]
    fn test_notes_are_kept() {
        let mut handle = TestHandle::new();
        handle.note("first");
        handle.assert_instance(Value::Int(1), types::int()).unwrap();
        let (outcome, notes) = handle.finish(Ok(()));
        assert!(matches!(outcome, BodyOutcome::Returned));
        assert_eq!(notes, vec!["first".to_string()]);
    }
}
