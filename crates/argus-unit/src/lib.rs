//! Argus Unit - embeddable xUnit core for dynamic fixtures
//!
//! This library provides the complete test-harness core including:
//! - An assertion library with raise-or-record failure semantics
//! - Test-case lifecycle orchestration with setup/teardown hooks
//! - Composite suites flattened at construction time
//! - Result aggregation with per-test failure/error buckets
//! - A typed lifecycle event bus for external reporters
//!
//! Execution is single-threaded and fully sequential. A driver builds a
//! suite from fixture classes, runs it against a shared [`TestResult`]
//! with a per-run [`RunContext`], then inspects the result:
//!
//! ```
//! use argus_unit::{ClassDef, RunContext, TestResult, TestSuite, Value};
//!
//! let class = ClassDef::builder("SmokeTest")
//!     .method("test_math", |_, ctx, _| {
//!         ctx.assert_equal(&Value::from(4), &Value::from(4), "")?;
//!         Ok(Value::Null)
//!     })
//!     .build();
//!
//! let suite = TestSuite::from_class(&class);
//! let result = TestResult::shared();
//! let run = RunContext::new();
//! suite.run(&TestResult::as_subscriber(&result), &run);
//!
//! assert!(result.borrow().succeed());
//! assert_eq!(result.borrow().run_tests(), 1);
//! ```

/// Argus Unit version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Public API modules
pub mod case;
pub mod context;
pub mod dispatch;
pub mod event;
pub mod fault;
pub mod fixture;
pub mod result;
pub mod suite;
pub mod trace;
pub mod value;

// Re-export commonly used types
pub use case::TestCase;
pub use context::{Context, RunContext};
pub use event::{CaseId, Channel, Event, Report, SharedSubscriber, Subscriber};
pub use fault::{AssertionFailure, Condition, Eval, Fault, Outcome};
pub use fixture::{ClassBuilder, ClassDef, HookRegistry, Instance, Method, TypeExpect};
pub use result::{RunSummary, TestError, TestFailure, TestResult, TestResultItem};
pub use suite::{Entry, Source, TestSuite};
pub use trace::{Frame, Trace};
pub use value::{TypeTag, Value, ValueArray, ValueMap};
