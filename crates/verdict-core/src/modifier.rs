//! Modifiers - reinterpret a test body's raw outcome
//!
//! Modifiers are listed outermost-first, in the order they were declared on
//! the test case. Before execution the list is checked for contradictions;
//! after execution they are folded innermost-first over the body outcome.

use crate::condition::Condition;
use crate::result::Failure;
use crate::types::TypeRef;
use crate::value::RaisedError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    /// The body is expected to fail.
    Revert,
    /// The body is expected to raise an error of this kind or a subtype.
    Raising(TypeRef),
    Skip(Option<String>),
    SkipIf(bool),
    /// Diagnostic-only unit, excluded from pass/fail counts.
    Informal,
}

impl Modifier {
    pub fn raising(kind: &TypeRef) -> Self {
        Modifier::Raising(kind.clone())
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        Modifier::Skip(Some(reason.into()))
    }

    fn is_skip(&self) -> bool {
        matches!(self, Modifier::Skip(_) | Modifier::SkipIf(true))
    }

    fn is_expectation(&self) -> bool {
        matches!(self, Modifier::Revert | Modifier::Raising(_))
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Revert => f.write_str("revert"),
            Modifier::Raising(kind) => write!(f, "raising({})", kind),
            Modifier::Skip(None) => f.write_str("skip"),
            Modifier::Skip(Some(reason)) => write!(f, "skip({:?})", reason),
            Modifier::SkipIf(condition) => write!(f, "skip_if({})", condition),
            Modifier::Informal => f.write_str("informal"),
        }
    }
}

/// Contradictory modifier declarations on one test case.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Conflict {
    #[error("`{0}` is applied more than once")]
    Duplicate(&'static str),

    #[error("`raising({0})` is applied outside `revert`")]
    RaisingOutsideRevert(TypeRef),

    #[error("`informal` cannot be combined with `{0}`")]
    InformalExpectation(String),

    #[error("`raising({0})` expects a type that is not an error kind")]
    NotAnErrorKind(TypeRef),
}

/// What the body did, before any modifier looked at it.
#[derive(Debug, Clone)]
pub enum BodyOutcome {
    Returned,
    AssertionFailed(Condition),
    Raised(RaisedError),
}

/// Pass or fail, after reinterpretation.
#[derive(Debug, Clone)]
pub enum Verdict {
    Pass,
    Fail(Failure),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

impl From<BodyOutcome> for Verdict {
    fn from(outcome: BodyOutcome) -> Self {
        match outcome {
            BodyOutcome::Returned => Verdict::Pass,
            BodyOutcome::AssertionFailed(condition) => Verdict::Fail(Failure::Assertion(condition)),
            BodyOutcome::Raised(error) => Verdict::Fail(Failure::Raised(error)),
        }
    }
}

enum Stage {
    Body(BodyOutcome),
    Judged(Verdict),
}

impl Stage {
    fn into_verdict(self) -> Verdict {
        match self {
            Stage::Body(outcome) => outcome.into(),
            Stage::Judged(verdict) => verdict,
        }
    }
}

/// Ordered modifiers of one test case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModifierChain {
    modifiers: Vec<Modifier>,
}

impl ModifierChain {
    pub fn new(modifiers: Vec<Modifier>) -> Self {
        Self { modifiers }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Modifier> {
        self.modifiers.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    pub fn annotations(&self) -> Vec<String> {
        self.modifiers.iter().map(ToString::to_string).collect()
    }

    pub fn is_skipped(&self) -> bool {
        self.modifiers.iter().any(Modifier::is_skip)
    }

    pub fn is_informal(&self) -> bool {
        self.modifiers.contains(&Modifier::Informal)
    }

    /// First contradiction found, scanning outermost-first.
    pub fn check_conflicts(&self) -> Option<Conflict> {
        let mut reverted = false;
        let mut raising: Option<&TypeRef> = None;

        for modifier in &self.modifiers {
            match modifier {
                Modifier::Revert => {
                    if reverted {
                        return Some(Conflict::Duplicate("revert"));
                    }
                    reverted = true;
                }
                Modifier::Raising(kind) => {
                    if !kind.is_error_kind() {
                        return Some(Conflict::NotAnErrorKind(kind.clone()));
                    }
                    if raising.is_some() {
                        return Some(Conflict::Duplicate("raising"));
                    }
                    raising = Some(kind);
                }
                _ => {}
            }
        }

        // Raising must sit inside revert to see the raw body.
        if let Some(kind) = raising {
            let raising_index = self
                .modifiers
                .iter()
                .position(|m| matches!(m, Modifier::Raising(_)));
            let revert_index = self.modifiers.iter().position(|m| m == &Modifier::Revert);
            if let (Some(raising_index), Some(revert_index)) = (raising_index, revert_index) {
                if raising_index < revert_index {
                    return Some(Conflict::RaisingOutsideRevert(kind.clone()));
                }
            }
        }

        if self.is_informal() {
            if let Some(expectation) = self.modifiers.iter().find(|m| m.is_expectation()) {
                return Some(Conflict::InformalExpectation(expectation.to_string()));
            }
        }

        None
    }

    /// Fold the modifiers over `outcome`, innermost first.
    pub fn reinterpret(&self, outcome: BodyOutcome) -> Verdict {
        let mut stage = Stage::Body(outcome);

        for modifier in self.modifiers.iter().rev() {
            stage = match modifier {
                Modifier::Raising(expected) => Stage::Judged(expect_raise(expected, stage)),
                Modifier::Revert => Stage::Judged(match stage.into_verdict() {
                    Verdict::Pass => Verdict::Fail(Failure::Reverted),
                    Verdict::Fail(_) => Verdict::Pass,
                }),
                _ => stage,
            };
        }

        stage.into_verdict()
    }
}

fn expect_raise(expected: &TypeRef, stage: Stage) -> Verdict {
    match stage {
        Stage::Body(BodyOutcome::Raised(error)) if error.is_kind(expected) => Verdict::Pass,
        Stage::Body(BodyOutcome::Raised(error)) => Verdict::Fail(Failure::ExpectedRaise {
            expected: expected.clone(),
            received: Some(error),
        }),
        Stage::Body(BodyOutcome::Returned) => Verdict::Fail(Failure::ExpectedRaise {
            expected: expected.clone(),
            received: None,
        }),
        // Failed assertions are reported as they are.
        other => other.into_verdict(),
    }
}

impl From<Vec<Modifier>> for ModifierChain {
    fn from(modifiers: Vec<Modifier>) -> Self {
        Self::new(modifiers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionKind;
    use crate::types;
    use crate::value::Value;

    fn failed_assertion() -> BodyOutcome {
        let mut condition = Condition::new(ConditionKind::Equal(Value::Int(1), Value::Int(2)));
        condition.evaluate().unwrap();
        BodyOutcome::AssertionFailed(condition)
    }

    fn chain(modifiers: Vec<Modifier>) -> ModifierChain {
        ModifierChain::new(modifiers)
    }

    #[test]
    fn test_no_modifiers() {
        let plain = chain(vec![]);
        assert!(plain.reinterpret(BodyOutcome::Returned).is_pass());
        assert!(!plain.reinterpret(failed_assertion()).is_pass());
        assert!(!plain
            .reinterpret(BodyOutcome::Raised(RaisedError::value_error("x")))
            .is_pass());
    }

    #[test]
    fn test_revert_flips() {
        let revert = chain(vec![Modifier::Revert]);
        assert!(revert.reinterpret(failed_assertion()).is_pass());
        assert!(revert
            .reinterpret(BodyOutcome::Raised(RaisedError::value_error("x")))
            .is_pass());
        assert!(matches!(
            revert.reinterpret(BodyOutcome::Returned),
            Verdict::Fail(Failure::Reverted)
        ));
    }

    #[test]
    fn test_raising_matches_subtypes() {
        let raising = chain(vec![Modifier::raising(types::arithmetic_error())]);
        let raised = RaisedError::new(types::zero_division_error(), "division by zero");
        assert!(raising.reinterpret(BodyOutcome::Raised(raised)).is_pass());
    }

    #[test]
    fn test_raising_rejects_other_kinds_and_silence() {
        let raising = chain(vec![Modifier::raising(types::type_error())]);

        let verdict = raising.reinterpret(BodyOutcome::Raised(RaisedError::value_error("x")));
        assert!(matches!(
            verdict,
            Verdict::Fail(Failure::ExpectedRaise { received: Some(_), .. })
        ));

        let verdict = raising.reinterpret(BodyOutcome::Returned);
        assert!(matches!(
            verdict,
            Verdict::Fail(Failure::ExpectedRaise { received: None, .. })
        ));
    }

    #[test]
    fn test_raising_reports_assertion_failures_normally() {
        let raising = chain(vec![Modifier::raising(types::type_error())]);
        assert!(matches!(
            raising.reinterpret(failed_assertion()),
            Verdict::Fail(Failure::Assertion(_))
        ));
    }

    #[test]
    fn test_revert_around_raising() {
        let modifiers = chain(vec![Modifier::Revert, Modifier::raising(types::type_error())]);
        assert!(modifiers.check_conflicts().is_none());
        assert!(modifiers.reinterpret(BodyOutcome::Returned).is_pass());
        assert!(!modifiers
            .reinterpret(BodyOutcome::Raised(RaisedError::type_error("x")))
            .is_pass());
    }

    #[test]
    fn test_conflicts() {
        assert_eq!(
            chain(vec![Modifier::Revert, Modifier::Revert]).check_conflicts(),
            Some(Conflict::Duplicate("revert"))
        );
        assert_eq!(
            chain(vec![
                Modifier::raising(types::type_error()),
                Modifier::raising(types::value_error()),
            ])
            .check_conflicts(),
            Some(Conflict::Duplicate("raising"))
        );
        assert_eq!(
            chain(vec![Modifier::raising(types::type_error()), Modifier::Revert]).check_conflicts(),
            Some(Conflict::RaisingOutsideRevert(types::type_error().clone()))
        );
        assert_eq!(
            chain(vec![Modifier::raising(types::int())]).check_conflicts(),
            Some(Conflict::NotAnErrorKind(types::int().clone()))
        );
        assert_eq!(
            chain(vec![Modifier::Informal, Modifier::Revert]).check_conflicts(),
            Some(Conflict::InformalExpectation("revert".to_string()))
        );
        assert_eq!(chain(vec![Modifier::Skip(None), Modifier::Revert]).check_conflicts(), None);
    }

    #[test]
    fn test_skip_detection() {
        assert!(chain(vec![Modifier::skip("slow")]).is_skipped());
        assert!(chain(vec![Modifier::SkipIf(true)]).is_skipped());
        assert!(!chain(vec![Modifier::SkipIf(false)]).is_skipped());
    }

    #[test]
    fn test_annotations() {
        let modifiers = chain(vec![
            Modifier::Revert,
            Modifier::raising(types::type_error()),
            Modifier::SkipIf(false),
        ]);
        assert_eq!(
            modifiers.annotations(),
            vec!["revert", "raising(type_error)", "skip_if(false)"]
        );
    }
}
