//! Fault taxonomy for test execution
//!
//! Three disjoint categories, distinguished at the type level so callers
//! pattern-match instead of inspecting exception identity:
//! - `Fault::Failure` — a failed expectation inside an assertion call.
//! - `Fault::Usage` — a broken test (wrong argument to an assertion);
//!   never recorded as a failure, never suppressed by skip-failure mode.
//! - `Fault::Error` — any other runtime condition raised by fixture code.

use crate::trace::Frame;
use thiserror::Error;

/// Result of an assertion or lifecycle phase.
pub type Outcome = Result<(), Fault>;

/// Result of invoking a fixture method.
pub type Eval = Result<crate::value::Value, Fault>;

/// A failed expectation, with the call site it was raised from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AssertionFailure {
    pub message: String,
    pub frame: Frame,
}

impl AssertionFailure {
    #[track_caller]
    pub fn new(message: impl Into<String>) -> AssertionFailure {
        AssertionFailure {
            message: message.into(),
            frame: Frame::here(),
        }
    }
}

/// A kinded runtime condition raised by fixture code (or by the framework
/// on its behalf, e.g. an undefined-method call). The kind participates in
/// `assert_exception` matching by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct Condition {
    pub kind: String,
    pub message: String,
    pub frame: Option<Frame>,
}

impl Condition {
    #[track_caller]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Condition {
        Condition {
            kind: kind.into(),
            message: message.into(),
            frame: Some(Frame::here()),
        }
    }

    /// Raise this condition as a fault. Convenience for fixture bodies:
    /// `return Condition::new("IOError", "boom").raise();`
    pub fn raise<T>(self) -> Result<T, Fault> {
        Err(Fault::Error(self))
    }
}

/// A classified execution fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// Assertion failure — expected/actual mismatch.
    #[error("{0}")]
    Failure(#[from] AssertionFailure),
    /// Usage error — the test itself is broken.
    #[error("usage error: {message}")]
    Usage { message: String },
    /// Unexpected runtime condition.
    #[error("{0}")]
    Error(#[from] Condition),
}

impl Fault {
    pub fn usage(message: impl Into<String>) -> Fault {
        Fault::Usage {
            message: message.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Fault::Failure(_))
    }

    /// The call site carried by this fault, when one was captured.
    pub fn frame(&self) -> Option<Frame> {
        match self {
            Fault::Failure(f) => Some(f.frame.clone()),
            Fault::Error(c) => c.frame.clone(),
            Fault::Usage { .. } => None,
        }
    }

    /// Short category name used in rendered reports.
    pub fn category(&self) -> &'static str {
        match self {
            Fault::Failure(_) => "failure",
            Fault::Usage { .. } => "usage error",
            Fault::Error(_) => "error",
        }
    }
}
