//! Verdict core - test execution engine
//!
//! This library provides:
//! - Conditions (assertions) with a monotonic evaluation state
//! - Modifiers that reinterpret a unit's raw outcome (revert, raising, skip)
//! - Result classification and run-wide aggregation
//! - An ordered publish/subscribe layer for progress events
//!
//! # Example
//!
//! ```
//! use verdict_core::{types, DiscoveryTree, EventHandlerManager, TestCase, TestEngine};
//!
//! let mut tree = DiscoveryTree::new();
//! tree.file(
//!     None,
//!     "test_types",
//!     vec![
//!         TestCase::new("test_bool_is_int", |t| t.assert_subtype(types::bool(), types::int())),
//!         TestCase::new("test_bool_is_not_str", |t| t.assert_subtype(types::bool(), types::str()))
//!             .revert(),
//!     ],
//! );
//!
//! let mut manager = EventHandlerManager::new();
//! let context = TestEngine::new().run(&tree, &mut manager).unwrap();
//! assert_eq!(context.passed_test_count(), 2);
//! ```

/// Verdict version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod condition;
pub mod context;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod event;
pub mod handle;
pub mod modifier;
pub mod result;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use condition::{Condition, ConditionKind, ConditionState, ReprBuilder};
pub use context::{LoadFailure, TestingContext};
pub use discovery::{DiscoveryTree, Entry, EntryId, EntryKind, LoadedFile, TestCase, TestFile};
pub use engine::TestEngine;
pub use error::{EngineError, EngineResult, HandlerError, LoadError, UsageError};
pub use event::{Event, EventHandlerManager, EventKind, Handler};
pub use handle::TestHandle;
pub use modifier::{BodyOutcome, Conflict, Modifier, ModifierChain, Verdict};
pub use result::{Classification, Failure, TestResult, UnitState};
pub use types::TypeRef;
pub use value::{Instance, RaisedError, Value};
