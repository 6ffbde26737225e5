//! First-class type objects
//!
//! Types are runtime values so that subtype and instance conditions can take
//! them as operands. A type has a name and an ordered list of base types;
//! subtyping walks the bases transitively. Error kinds are ordinary types
//! descending from [`exception`].

use std::fmt;
use std::sync::{Arc, OnceLock};

#[derive(Debug)]
struct TypeDef {
    name: String,
    bases: Vec<TypeRef>,
}

/// Reference-counted handle to a type object. Equality is identity.
#[derive(Clone)]
pub struct TypeRef(Arc<TypeDef>);

impl TypeRef {
    /// Declare a new type deriving from `bases`.
    pub fn new(name: impl Into<String>, bases: Vec<TypeRef>) -> Self {
        TypeRef(Arc::new(TypeDef {
            name: name.into(),
            bases,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn bases(&self) -> &[TypeRef] {
        &self.0.bases
    }

    /// Whether `self` is `other` or derives from it, directly or transitively.
    pub fn is_subtype_of(&self, other: &TypeRef) -> bool {
        if self == other {
            return true;
        }
        self.0.bases.iter().any(|base| base.is_subtype_of(other))
    }

    /// Whether this type can be used as an error kind.
    pub fn is_error_kind(&self) -> bool {
        self.is_subtype_of(exception())
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TypeRef {}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.0.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

macro_rules! builtin_type {
    ($(#[$doc:meta])* $fn_name:ident, $name:literal, [$($base:ident),*]) => {
        $(#[$doc])*
        pub fn $fn_name() -> &'static TypeRef {
            static CELL: OnceLock<TypeRef> = OnceLock::new();
            CELL.get_or_init(|| TypeRef::new($name, vec![$($base().clone()),*]))
        }
    };
}

builtin_type!(
    /// Root of the type hierarchy.
    object, "object", []
);
builtin_type!(
    /// Type of `Value::Null`.
    none, "none", [object]
);
builtin_type!(int, "int", [object]);
builtin_type!(
    /// Booleans are integers, so `bool` is a subtype of `int`.
    bool, "bool", [int]
);
builtin_type!(float, "float", [object]);
builtin_type!(str, "str", [object]);
builtin_type!(list, "list", [object]);
builtin_type!(
    /// Type of type objects.
    type_, "type", [object]
);

builtin_type!(
    /// Root of all error kinds.
    exception, "exception", [object]
);
builtin_type!(type_error, "type_error", [exception]);
builtin_type!(value_error, "value_error", [exception]);
builtin_type!(assertion_error, "assertion_error", [exception]);
builtin_type!(runtime_error, "runtime_error", [exception]);
builtin_type!(arithmetic_error, "arithmetic_error", [exception]);
builtin_type!(
    zero_division_error,
    "zero_division_error",
    [arithmetic_error]
);
