//! Conditions - single evaluable predicates over operand values
//!
//! A condition starts in [`ConditionState::None`] and moves to a terminal
//! state exactly once, when [`Condition::evaluate`] runs its predicate.
//! Errors raised by the predicate are captured and classify the condition as
//! failed; misuse of the API ([`UsageError`]) is returned to the caller
//! instead.

use crate::error::UsageError;
use crate::value::{RaisedError, Value};
use std::fmt::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionState {
    None,
    Succeeded,
    Failed,
}

impl ConditionState {
    pub fn name(self) -> &'static str {
        match self {
            ConditionState::None => "none",
            ConditionState::Succeeded => "succeeded",
            ConditionState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        self != ConditionState::None
    }
}

/// Predicate and operands of a condition.
#[derive(Debug, Clone)]
pub enum ConditionKind {
    /// Both operands are the same object.
    Identical(Value, Value),
    /// The operand's truthiness equals `expected`.
    Truth { value: Value, expected: bool },
    Equal(Value, Value),
    NotEqual(Value, Value),
    /// `checked` is a type deriving from `reference`.
    Subtype { checked: Value, reference: Value },
    /// `value`'s type derives from `reference`.
    Instance { value: Value, reference: Value },
}

impl ConditionKind {
    fn name(&self) -> &'static str {
        match self {
            ConditionKind::Identical(..) => "Identical",
            ConditionKind::Truth { expected: true, .. } => "True",
            ConditionKind::Truth { expected: false, .. } => "False",
            ConditionKind::Equal(..) => "Equal",
            ConditionKind::NotEqual(..) => "NotEqual",
            ConditionKind::Subtype { .. } => "Subtype",
            ConditionKind::Instance { .. } => "Instance",
        }
    }

    fn invoke(&self) -> Result<Result<bool, RaisedError>, UsageError> {
        Ok(match self {
            ConditionKind::Identical(a, b) => Ok(a.is_identical(b)),
            ConditionKind::Truth { value, expected } => value.truthy().map(|t| t == *expected),
            ConditionKind::Equal(a, b) => a.try_eq(b),
            ConditionKind::NotEqual(a, b) => a.try_eq(b).map(|eq| !eq),
            ConditionKind::Subtype { checked, reference } => {
                let reference = require_type("reference", reference)?;
                Ok(checked
                    .as_type()
                    .map_or(false, |checked| checked.is_subtype_of(reference)))
            }
            ConditionKind::Instance { value, reference } => {
                let reference = require_type("reference", reference)?;
                Ok(value.type_of().is_subtype_of(reference))
            }
        })
    }
}

fn require_type<'a>(
    operand: &'static str,
    value: &'a Value,
) -> Result<&'a crate::types::TypeRef, UsageError> {
    value.as_type().ok_or_else(|| UsageError::NotAType {
        operand,
        got: value.to_string(),
    })
}

/// A single assertion made by a test body.
#[derive(Debug, Clone)]
pub struct Condition {
    kind: ConditionKind,
    state: ConditionState,
    captured_error: Option<RaisedError>,
}

impl Condition {
    pub fn new(kind: ConditionKind) -> Self {
        Self {
            kind,
            state: ConditionState::None,
            captured_error: None,
        }
    }

    pub fn kind(&self) -> &ConditionKind {
        &self.kind
    }

    pub fn state(&self) -> ConditionState {
        self.state
    }

    pub fn captured_error(&self) -> Option<&RaisedError> {
        self.captured_error.as_ref()
    }

    /// Run the predicate once and settle the state.
    ///
    /// Returns whether the condition was satisfied. A usage error leaves the
    /// state at `None`.
    pub fn evaluate(&mut self) -> Result<bool, UsageError> {
        if self.state.is_terminal() {
            return Err(UsageError::AlreadyEvaluated);
        }

        let satisfied = match self.kind.invoke()? {
            Ok(satisfied) => satisfied,
            Err(error) => {
                self.captured_error = Some(error);
                false
            }
        };

        self.state = if satisfied {
            ConditionState::Succeeded
        } else {
            ConditionState::Failed
        };
        Ok(satisfied)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut repr = String::new();
        {
            let mut builder = ReprBuilder::new(&mut repr, self.kind.name());
            builder.field("state", self.state.name());
            match &self.kind {
                ConditionKind::Identical(a, b)
                | ConditionKind::Equal(a, b)
                | ConditionKind::NotEqual(a, b) => {
                    builder.field("left", a);
                    builder.field("right", b);
                }
                ConditionKind::Truth { value, .. } => {
                    builder.field("value", value);
                }
                ConditionKind::Subtype { checked, reference } => {
                    builder.field("checked", checked);
                    builder.field("reference", reference);
                }
                ConditionKind::Instance { value, reference } => {
                    builder.field("value", value);
                    builder.field("reference", reference);
                }
            }
            if let Some(error) = &self.captured_error {
                builder.field("error", error);
            }
        }
        f.write_str(&repr)
    }
}

/// Builds `<Name key=value ...>` representations.
///
/// The closing `>` is written when the builder is dropped, so every exit
/// path yields a finished representation.
pub struct ReprBuilder<'a> {
    buffer: &'a mut String,
}

impl<'a> ReprBuilder<'a> {
    pub fn new(buffer: &'a mut String, name: &str) -> Self {
        buffer.push('<');
        buffer.push_str(name);
        Self { buffer }
    }

    pub fn field(&mut self, key: &str, value: impl fmt::Display) -> &mut Self {
        let _ = write!(self.buffer, " {}={}", key, value);
        self
    }
}

impl Drop for ReprBuilder<'_> {
    fn drop(&mut self) {
        self.buffer.push('>');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;
    use crate::value::Instance;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn subtype(checked: impl Into<Value>, reference: impl Into<Value>) -> Condition {
        Condition::new(ConditionKind::Subtype {
            checked: checked.into(),
            reference: reference.into(),
        })
    }

    #[rstest]
    #[case::bool_int(types::bool(), types::int(), true)]
    #[case::bool_str(types::bool(), types::str(), false)]
    #[case::int_bool(types::int(), types::bool(), false)]
    #[case::error_exception(types::zero_division_error(), types::exception(), true)]
    fn test_subtype_relation(
        #[case] checked: &'static types::TypeRef,
        #[case] reference: &'static types::TypeRef,
        #[case] expected: bool,
    ) {
        let mut condition = subtype(checked, reference);
        assert_eq!(condition.evaluate(), Ok(expected));
        assert!(condition.state().is_terminal());
    }

    #[test]
    fn test_subtype_with_non_type_reference_is_usage_error() {
        let mut condition = subtype(types::bool(), 1);
        let error = condition.evaluate().unwrap_err();
        assert!(matches!(error, UsageError::NotAType { .. }));
        assert_eq!(condition.state(), ConditionState::None);
        assert!(condition.captured_error().is_none());
    }

    #[test]
    fn test_subtype_with_non_type_checked_fails() {
        let mut condition = subtype(1, types::int());
        assert_eq!(condition.evaluate(), Ok(false));
        assert_eq!(condition.state(), ConditionState::Failed);
    }

    #[test]
    fn test_instance_condition() {
        let mut condition = Condition::new(ConditionKind::Instance {
            value: Value::Bool(true),
            reference: types::int().into(),
        });
        assert_eq!(condition.evaluate(), Ok(true));

        let mut misuse = Condition::new(ConditionKind::Instance {
            value: Value::Bool(true),
            reference: Value::from("int"),
        });
        assert!(misuse.evaluate().is_err());
    }

    #[test]
    fn test_identity_is_not_equality() {
        let mut condition = Condition::new(ConditionKind::Identical(
            Value::list([Value::Int(1)]),
            Value::list([Value::Int(1)]),
        ));
        assert_eq!(condition.evaluate(), Ok(false));

        let shared = Value::list([Value::Int(1)]);
        let mut condition = Condition::new(ConditionKind::Identical(shared.clone(), shared));
        assert_eq!(condition.evaluate(), Ok(true));
    }

    #[rstest]
    #[case(Value::Int(0), false, true)]
    #[case(Value::Int(7), false, false)]
    #[case(Value::from("x"), true, true)]
    #[case(Value::Null, true, false)]
    fn test_truth_polarity(#[case] value: Value, #[case] expected: bool, #[case] satisfied: bool) {
        let mut condition = Condition::new(ConditionKind::Truth { value, expected });
        assert_eq!(condition.evaluate(), Ok(satisfied));
    }

    #[derive(Debug)]
    struct Incomparable;

    impl Instance for Incomparable {
        fn class(&self) -> types::TypeRef {
            types::object().clone()
        }

        fn eq_value(&self, _other: &Value) -> Result<bool, RaisedError> {
            Err(RaisedError::type_error("cannot compare"))
        }
    }

    #[test]
    fn test_raising_predicate_is_captured() {
        let mut condition = Condition::new(ConditionKind::Equal(
            Value::object(Incomparable),
            Value::Int(1),
        ));
        assert_eq!(condition.evaluate(), Ok(false));
        assert_eq!(condition.state(), ConditionState::Failed);
        let captured = condition.captured_error().unwrap();
        assert!(captured.is_kind(types::type_error()));
    }

    #[test]
    fn test_state_transitions_once() {
        let mut condition = Condition::new(ConditionKind::Equal(Value::Int(1), Value::Int(1)));
        assert_eq!(condition.state(), ConditionState::None);
        assert_eq!(condition.evaluate(), Ok(true));
        assert_eq!(condition.evaluate(), Err(UsageError::AlreadyEvaluated));
        assert_eq!(condition.state(), ConditionState::Succeeded);
    }

    #[test]
    fn test_repr() {
        let mut condition = Condition::new(ConditionKind::Equal(Value::Int(1), Value::Int(2)));
        assert_eq!(condition.to_string(), "<Equal state=none left=1 right=2>");
        condition.evaluate().unwrap();
        assert_eq!(condition.to_string(), "<Equal state=failed left=1 right=2>");
    }

    #[test]
    fn test_repr_builder_closes_on_drop() {
        let mut buffer = String::new();
        {
            let mut builder = ReprBuilder::new(&mut buffer, "Thing");
            builder.field("a", 1);
        }
        assert_eq!(buffer, "<Thing a=1>");
    }
}
