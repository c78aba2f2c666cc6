//! Run context and assertion library
//!
//! `RunContext` carries the two pieces of state shared by every assertion
//! in a run: the monotonically increasing assertion counter and the
//! skip-failure flag. It is threaded explicitly rather than living in
//! process globals, so runs are embeddable and testable in isolation.
//!
//! `Context` is the per-test handle fixture bodies assert through. Every
//! assertion increments the counter exactly once, then either returns a
//! `Fault::Failure` (default mode, `?` unwinds the body) or — in
//! skip-failure mode — publishes the failure on the case's channel and
//! lets the body continue.
//!
//! # API
//!
//! ## Basic
//! - `assert(condition, message)` — strict-boolean check
//! - `assert_block(message, block)` — closure-predicate check
//! - `assert_fail(message)` — unconditional failure
//!
//! ## Equality & identity
//! - `assert_equal` / `assert_not_equal` — deep value equality
//! - `assert_equal_float` — epsilon comparison with derived display precision
//! - `assert_same` — same-object identity
//!
//! ## Types & capabilities
//! - `assert_nil` / `assert_not_nil`
//! - `assert_kind_of` / `assert_instance_of`
//! - `assert_respond_to` / `assert_send` / `assert_operator`
//!
//! ## Patterns & conditions
//! - `assert_match` / `assert_not_match`
//! - `assert_exception` / `assert_no_exception`

use crate::dispatch;
use crate::event::{CaseId, Channel, Event, Report};
use crate::fault::{AssertionFailure, Condition, Eval, Fault, Outcome};
use crate::fixture::TypeExpect;
use crate::value::Value;
use regex::Regex;
use std::cell::Cell;

/// Shared measurement and mode for one test run.
#[derive(Debug, Default)]
pub struct RunContext {
    assertions: Cell<u64>,
    skip_failures: Cell<bool>,
}

impl RunContext {
    pub fn new() -> RunContext {
        RunContext::default()
    }

    /// Total assertions executed so far in this run, regardless of outcome.
    pub fn assertion_count(&self) -> u64 {
        self.assertions.get()
    }

    /// When set, failed assertions are recorded but do not abort the body.
    pub fn set_skip_failures(&self, on: bool) {
        self.skip_failures.set(on);
    }

    pub fn skip_failures(&self) -> bool {
        self.skip_failures.get()
    }

    fn bump(&self) {
        self.assertions.set(self.assertions.get() + 1);
    }
}

/// Per-test assertion handle: the run context plus the owning case's
/// event channel, for publishing soft failures in skip mode.
pub struct Context<'a> {
    run: &'a RunContext,
    channel: &'a Channel,
    test: CaseId,
}

impl<'a> Context<'a> {
    pub fn new(run: &'a RunContext, channel: &'a Channel, test: CaseId) -> Context<'a> {
        Context { run, channel, test }
    }

    pub fn run(&self) -> &RunContext {
        self.run
    }

    pub fn test(&self) -> &CaseId {
        &self.test
    }

    /// Failure exit shared by every assertion: raise by default, publish
    /// and continue in skip-failure mode.
    #[track_caller]
    fn fail(&self, message: String) -> Outcome {
        let failure = AssertionFailure::new(message);
        if self.run.skip_failures() {
            let report = Report::new(self.test.clone(), Fault::Failure(failure));
            self.channel.notify(&Event::AddFailure(report));
            Ok(())
        } else {
            Err(Fault::Failure(failure))
        }
    }

    /// `assert(condition, message)` — condition must be a strict boolean;
    /// any other value is a usage error, raised regardless of mode.
    #[track_caller]
    pub fn assert(&self, condition: &Value, msg: &str) -> Outcome {
        self.run.bump();
        match condition {
            Value::Bool(true) => Ok(()),
            Value::Bool(false) => self.fail(build_message(msg, "<false> is not true.".into())),
            other => Err(Fault::usage(format!(
                "assert requires a boolean, got {}",
                other.type_name()
            ))),
        }
    }

    /// Closure-predicate assertion; fails when the block yields false.
    #[track_caller]
    pub fn assert_block(&self, msg: &str, block: impl FnOnce() -> bool) -> Outcome {
        self.run.bump();
        if block() {
            Ok(())
        } else {
            self.fail(build_message(msg, "assert_block failed.".into()))
        }
    }

    /// Unconditional failure.
    #[track_caller]
    pub fn assert_fail(&self, msg: &str) -> Outcome {
        self.run.bump();
        self.fail(build_message(msg, "assert_fail was called.".into()))
    }

    /// Fails when `expected != actual` under deep value equality.
    #[track_caller]
    pub fn assert_equal(&self, expected: &Value, actual: &Value, msg: &str) -> Outcome {
        self.run.bump();
        if expected == actual {
            Ok(())
        } else {
            self.fail(build_message(
                msg,
                format!("expected:<{}> but was:<{}>", expected, actual),
            ))
        }
    }

    /// Fails when the two values are deeply equal.
    #[track_caller]
    pub fn assert_not_equal(&self, expected: &Value, actual: &Value, msg: &str) -> Outcome {
        self.run.bump();
        if expected != actual {
            Ok(())
        } else {
            self.fail(build_message(
                msg,
                format!("expected <{}> and <{}> to differ", expected, actual),
            ))
        }
    }

    /// Epsilon comparison. Negative epsilon is a usage error. Displayed
    /// values use a decimal precision derived from epsilon's magnitude;
    /// epsilon of exactly zero displays full native precision.
    #[track_caller]
    pub fn assert_equal_float(
        &self,
        expected: f64,
        actual: f64,
        epsilon: f64,
        msg: &str,
    ) -> Outcome {
        self.run.bump();
        if epsilon < 0.0 {
            return Err(Fault::usage(format!(
                "assert_equal_float requires a non-negative epsilon, got {}",
                epsilon
            )));
        }
        if (expected - actual).abs() <= epsilon {
            Ok(())
        } else {
            let precision = float_precision(epsilon);
            self.fail(build_message(
                msg,
                format!(
                    "expected:<{}> but was:<{}>",
                    format_float(expected, precision),
                    format_float(actual, precision)
                ),
            ))
        }
    }

    /// Fails when the two values are not the same object.
    #[track_caller]
    pub fn assert_same(&self, expected: &Value, actual: &Value, msg: &str) -> Outcome {
        self.run.bump();
        if actual.is_identical(expected) {
            Ok(())
        } else {
            self.fail(build_message(
                msg,
                format!("<{}> was expected to be identical to <{}>", actual, expected),
            ))
        }
    }

    /// Fails when `obj1 op obj2` yields a falsey result. Unknown operators
    /// are a usage error; operand type mismatches propagate as conditions.
    #[track_caller]
    pub fn assert_operator(&self, obj1: &Value, op: &str, obj2: &Value, msg: &str) -> Outcome {
        self.run.bump();
        let outcome = dispatch::binary_op(obj1, op, obj2)?;
        if outcome.is_truthy() {
            Ok(())
        } else {
            self.fail(build_message(
                msg,
                format!("<{}> {} <{}> was expected to be true", obj1, op, obj2),
            ))
        }
    }

    /// Fails on a non-null value.
    #[track_caller]
    pub fn assert_nil(&self, obj: &Value, msg: &str) -> Outcome {
        self.run.bump();
        if obj.is_null() {
            Ok(())
        } else {
            self.fail(build_message(
                msg,
                format!("<{}> was expected to be null", obj),
            ))
        }
    }

    /// Fails on null.
    #[track_caller]
    pub fn assert_not_nil(&self, obj: &Value, msg: &str) -> Outcome {
        self.run.bump();
        if obj.is_null() {
            self.fail(build_message(msg, "<null> was not expected".into()))
        } else {
            Ok(())
        }
    }

    /// Fails when obj is not a kind of the expected type (ancestor-chain
    /// membership for instances, tag match for builtins).
    #[track_caller]
    pub fn assert_kind_of(
        &self,
        expected: impl Into<TypeExpect>,
        obj: &Value,
        msg: &str,
    ) -> Outcome {
        self.run.bump();
        let expected = expected.into();
        if expected.is_kind(obj) {
            Ok(())
        } else {
            self.fail(build_message(
                msg,
                format!("<{}> was expected to be kind of {}", obj, expected.name()),
            ))
        }
    }

    /// Fails when obj is not exactly an instance of the expected type.
    #[track_caller]
    pub fn assert_instance_of(
        &self,
        expected: impl Into<TypeExpect>,
        obj: &Value,
        msg: &str,
    ) -> Outcome {
        self.run.bump();
        let expected = expected.into();
        if expected.is_instance(obj) {
            Ok(())
        } else {
            self.fail(build_message(
                msg,
                format!(
                    "<{}> was expected to be an instance of {}",
                    obj,
                    expected.name()
                ),
            ))
        }
    }

    /// Fails when obj does not support the named capability.
    #[track_caller]
    pub fn assert_respond_to(&self, capability: &str, obj: &Value, msg: &str) -> Outcome {
        self.run.bump();
        if dispatch::responds_to(obj, capability) {
            Ok(())
        } else {
            self.fail(build_message(
                msg,
                format!("<{}> does not respond to `{}`", obj, capability),
            ))
        }
    }

    /// Fails when the pattern does not match; on success returns the
    /// match for further inspection (`None` only for a soft failure in
    /// skip mode).
    #[track_caller]
    pub fn assert_match<'t>(
        &self,
        text: &'t str,
        pattern: &Regex,
        msg: &str,
    ) -> Result<Option<regex::Match<'t>>, Fault> {
        self.run.bump();
        match pattern.find(text) {
            Some(found) => Ok(Some(found)),
            None => self
                .fail(build_message(
                    msg,
                    format!("<{}> was expected to match /{}/", text, pattern.as_str()),
                ))
                .map(|()| None),
        }
    }

    /// Fails when the pattern matches.
    #[track_caller]
    pub fn assert_not_match(&self, text: &str, pattern: &Regex, msg: &str) -> Outcome {
        self.run.bump();
        if pattern.is_match(text) {
            self.fail(build_message(
                msg,
                format!("<{}> was expected not to match /{}/", text, pattern.as_str()),
            ))
        } else {
            Ok(())
        }
    }

    /// Fails when sending the named capability with args yields a falsey
    /// result. Conditions raised by the capability itself propagate.
    #[track_caller]
    pub fn assert_send(&self, obj: &Value, capability: &str, args: &[Value], msg: &str) -> Outcome {
        self.run.bump();
        let outcome = dispatch::invoke(obj, capability, args, self)?;
        if outcome.is_truthy() {
            Ok(())
        } else {
            self.fail(build_message(
                msg,
                format!(
                    "sending `{}` to <{}> was expected to return a true value, got <{}>",
                    capability, obj, outcome
                ),
            ))
        }
    }

    /// Executes the block; passes only if it raises a condition of exactly
    /// the expected kind, returning that condition. No condition, or a
    /// condition of another kind, is a failure. Assertion failures and
    /// usage errors from the block propagate unchanged.
    #[track_caller]
    pub fn assert_exception(
        &self,
        expected_kind: &str,
        msg: &str,
        block: impl FnOnce() -> Eval,
    ) -> Result<Option<Condition>, Fault> {
        self.run.bump();
        match block() {
            Err(Fault::Error(condition)) if condition.kind == expected_kind => Ok(Some(condition)),
            Err(Fault::Error(condition)) => self
                .fail(build_message(
                    msg,
                    format!(
                        "expected exception <{}> but <{}> was raised",
                        expected_kind, condition.kind
                    ),
                ))
                .map(|()| None),
            Err(other) => Err(other),
            Ok(_) => self
                .fail(build_message(
                    msg,
                    format!("expected exception <{}> but nothing was raised", expected_kind),
                ))
                .map(|()| None),
        }
    }

    /// Executes the block; a condition whose kind is in the list (or any
    /// condition, when the list is empty) is a failure. Conditions of
    /// other kinds propagate unchanged.
    #[track_caller]
    pub fn assert_no_exception(
        &self,
        forbidden_kinds: &[&str],
        msg: &str,
        block: impl FnOnce() -> Eval,
    ) -> Outcome {
        self.run.bump();
        match block() {
            Ok(_) => Ok(()),
            Err(Fault::Error(condition)) => {
                if forbidden_kinds.is_empty() || forbidden_kinds.contains(&condition.kind.as_str())
                {
                    self.fail(build_message(
                        msg,
                        format!("exception raised: {}", condition),
                    ))
                } else {
                    Err(Fault::Error(condition))
                }
            }
            Err(other) => Err(other),
        }
    }
}

/// Prefix the template with the user message and a separator, only when
/// the user message is non-empty.
fn build_message(user: &str, template: String) -> String {
    if user.is_empty() {
        template
    } else {
        format!("{} {}", user, template)
    }
}

/// Decimal display precision derived from epsilon's magnitude: more
/// digits for smaller epsilon; None means full native precision.
fn float_precision(epsilon: f64) -> Option<usize> {
    if epsilon == 0.0 {
        None
    } else {
        Some((-epsilon.log10()).ceil().max(0.0) as usize)
    }
}

fn format_float(value: f64, precision: Option<usize>) -> String {
    match precision {
        Some(p) => format!("{:.*}", p, value),
        None => format!("{}", value),
    }
}
