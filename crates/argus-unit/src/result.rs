//! Result aggregation
//!
//! `TestResult` subscribes to test-case lifecycle events, buckets failures
//! and errors per test, tracks wall-clock time across the run, and
//! computes per-test assertion counts from the counter values carried in
//! start/end events. Every event it consumes is re-published on its own
//! channel, so external reporters can observe a whole run by subscribing
//! to the result alone.

use crate::event::{CaseId, Channel, Event, Report, SharedSubscriber, Subscriber};
use crate::fault::Fault;
use crate::trace::Trace;
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A recorded assertion failure, display-ready.
#[derive(Debug, Clone)]
pub struct TestFailure {
    pub test_name: String,
    pub class_name: String,
    pub message: String,
    pub trace: Trace,
}

impl TestFailure {
    fn from_report(report: &Report) -> TestFailure {
        TestFailure {
            test_name: report.test.to_string(),
            class_name: report.test.class_name.clone(),
            message: report.fault.to_string(),
            trace: display_trace(report),
        }
    }
}

impl fmt::Display for TestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failure: {}: {}\n{}", self.test_name, self.message, self.trace)
    }
}

/// A recorded error, display-ready. `kind` is the condition kind, or the
/// fault category for faults that carry none.
#[derive(Debug, Clone)]
pub struct TestError {
    pub test_name: String,
    pub class_name: String,
    pub kind: String,
    pub message: String,
    pub trace: Trace,
}

impl TestError {
    fn from_report(report: &Report) -> TestError {
        let kind = match &report.fault {
            Fault::Error(condition) => condition.kind.clone(),
            other => other.category().to_string(),
        };
        TestError {
            test_name: report.test.to_string(),
            class_name: report.test.class_name.clone(),
            kind,
            message: report.fault.to_string(),
            trace: display_trace(report),
        }
    }
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}: {}\n{}", self.test_name, self.message, self.trace)
    }
}

/// Framework frames dropped, innermost survivor annotated with the owning
/// class's short name.
fn display_trace(report: &Report) -> Trace {
    let mut trace = report.trace.filtered();
    trace.annotate_innermost(report.test.short_class_name());
    trace
}

/// Per-test bucket, one per execution, in completion order.
#[derive(Debug)]
pub struct TestResultItem {
    pub name: String,
    pub failures: Vec<TestFailure>,
    pub errors: Vec<TestError>,
    /// Assertions executed during this one test.
    pub assertions: u64,
    counter_at_start: u64,
}

impl TestResultItem {
    fn new(test: &CaseId, counter_at_start: u64) -> TestResultItem {
        TestResultItem {
            name: test.to_string(),
            failures: Vec::new(),
            errors: Vec::new(),
            assertions: 0,
            counter_at_start,
        }
    }

    pub fn passed(&self) -> bool {
        self.failures.is_empty() && self.errors.is_empty()
    }
}

/// Counts of a finished (or in-flight) run, serializable for external
/// tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub tests: usize,
    pub assertions: u64,
    pub failures: usize,
    pub errors: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tests, {} assertions, {} failures, {} errors",
            self.tests, self.assertions, self.failures, self.errors
        )
    }
}

/// Aggregator of per-test outcomes across a run.
#[derive(Default)]
pub struct TestResult {
    items: Vec<TestResultItem>,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
    channel: Channel,
}

impl TestResult {
    pub fn new() -> TestResult {
        TestResult::default()
    }

    /// Shared handle, as test cases expect their observers.
    pub fn shared() -> Rc<RefCell<TestResult>> {
        Rc::new(RefCell::new(TestResult::new()))
    }

    /// Coerce a shared result into the subscriber handle `run` takes.
    pub fn as_subscriber(this: &Rc<RefCell<TestResult>>) -> SharedSubscriber {
        this.clone()
    }

    /// Register a downstream observer; every consumed event is
    /// re-published to it.
    pub fn subscribe(&mut self, subscriber: &SharedSubscriber) {
        self.channel.subscribe(subscriber);
    }

    pub fn items(&self) -> &[TestResultItem] {
        &self.items
    }

    /// Number of test-case executions recorded.
    pub fn run_tests(&self) -> usize {
        self.items.len()
    }

    /// All failures, flattened in item order.
    pub fn failures(&self) -> Vec<&TestFailure> {
        self.items.iter().flat_map(|i| i.failures.iter()).collect()
    }

    /// All errors, flattened in item order.
    pub fn errors(&self) -> Vec<&TestError> {
        self.items.iter().flat_map(|i| i.errors.iter()).collect()
    }

    pub fn failure_count(&self) -> usize {
        self.items.iter().map(|i| i.failures.len()).sum()
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().map(|i| i.errors.len()).sum()
    }

    /// Assertions executed across all recorded tests.
    pub fn assertion_count(&self) -> u64 {
        self.items.iter().map(|i| i.assertions).sum()
    }

    /// True iff no failure and no error was recorded.
    pub fn succeed(&self) -> bool {
        self.items.iter().all(TestResultItem::passed)
    }

    /// Wall-clock span from the first test start to the last test end;
    /// zero when no test has completed.
    pub fn running_time(&self) -> Duration {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => end.duration_since(start),
            _ => Duration::ZERO,
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            tests: self.run_tests(),
            assertions: self.assertion_count(),
            failures: self.failure_count(),
            errors: self.error_count(),
        }
    }

    fn current_item_mut(&mut self, test: &CaseId) -> &mut TestResultItem {
        if self.items.is_empty() {
            // Notification without a preceding start_test; open a bucket
            // so the report is not lost.
            self.items.push(TestResultItem::new(test, 0));
        }
        let last = self.items.len() - 1;
        &mut self.items[last]
    }
}

impl Subscriber for TestResult {
    fn start_test(&mut self, test: &CaseId, assertions: u64) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        self.items.push(TestResultItem::new(test, assertions));
        self.channel.notify(&Event::StartTest {
            test: test.clone(),
            assertions,
        });
    }

    fn end_test(&mut self, test: &CaseId, assertions: u64) {
        if let Some(item) = self.items.last_mut() {
            item.assertions = assertions.saturating_sub(item.counter_at_start);
        }
        self.finished_at = Some(Instant::now());
        self.channel.notify(&Event::EndTest {
            test: test.clone(),
            assertions,
        });
    }

    fn add_failure(&mut self, report: &Report) {
        let failure = TestFailure::from_report(report);
        self.current_item_mut(&report.test).failures.push(failure);
        self.channel.notify(&Event::AddFailure(report.clone()));
    }

    fn add_error(&mut self, report: &Report) {
        let error = TestError::from_report(report);
        self.current_item_mut(&report.test).errors.push(error);
        self.channel.notify(&Event::AddError(report.clone()));
    }
}

impl fmt::Debug for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TestResult({})", self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::{AssertionFailure, Condition};
    use pretty_assertions::assert_eq;

    fn case_id(method: &str) -> CaseId {
        CaseId::new("ResultTest", method)
    }

    fn failure_report(method: &str, message: &str) -> Report {
        Report::new(
            case_id(method),
            Fault::Failure(AssertionFailure::new(message)),
        )
    }

    fn error_report(method: &str, kind: &str) -> Report {
        Report::new(case_id(method), Fault::Error(Condition::new(kind, "boom")))
    }

    #[test]
    fn test_fresh_result_succeeds_with_zero_time() {
        let result = TestResult::new();
        assert!(result.succeed());
        assert_eq!(result.run_tests(), 0);
        assert_eq!(result.running_time(), Duration::ZERO);
    }

    #[test]
    fn test_assertion_delta_per_item() {
        let mut result = TestResult::new();
        result.start_test(&case_id("test_a"), 10);
        result.end_test(&case_id("test_a"), 13);
        result.start_test(&case_id("test_b"), 13);
        result.end_test(&case_id("test_b"), 13);

        assert_eq!(result.items()[0].assertions, 3);
        assert_eq!(result.items()[1].assertions, 0);
        assert_eq!(result.assertion_count(), 3);
    }

    #[test]
    fn test_buckets_are_distinct() {
        let mut result = TestResult::new();
        result.start_test(&case_id("test_a"), 0);
        result.add_failure(&failure_report("test_a", "mismatch"));
        result.add_error(&error_report("test_a", "IOError"));
        result.end_test(&case_id("test_a"), 2);

        assert_eq!(result.failure_count(), 1);
        assert_eq!(result.error_count(), 1);
        assert!(!result.succeed());
        assert_eq!(result.errors()[0].kind, "IOError");
    }

    #[test]
    fn test_flattened_buckets_keep_item_order() {
        let mut result = TestResult::new();
        result.start_test(&case_id("test_a"), 0);
        result.add_failure(&failure_report("test_a", "first"));
        result.end_test(&case_id("test_a"), 1);
        result.start_test(&case_id("test_b"), 1);
        result.add_failure(&failure_report("test_b", "second"));
        result.end_test(&case_id("test_b"), 2);

        let messages: Vec<&str> = result
            .failures()
            .iter()
            .map(|f| f.message.as_str())
            .collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn test_failure_wrapping_annotates_short_class_name() {
        let report = Report::new(
            CaseId::new("db::ConnTest", "test_open"),
            Fault::Failure(AssertionFailure::new("mismatch")),
        );
        let failure = TestFailure::from_report(&report);
        let innermost = &failure.trace.frames()[0];
        let label = innermost.label.as_deref().unwrap_or("");
        assert!(label.contains("ConnTest"), "label: {}", label);
    }

    #[test]
    fn test_summary_rendering() {
        let mut result = TestResult::new();
        result.start_test(&case_id("test_a"), 0);
        result.add_failure(&failure_report("test_a", "mismatch"));
        result.end_test(&case_id("test_a"), 3);

        assert_eq!(
            result.summary().to_string(),
            "1 tests, 3 assertions, 1 failures, 0 errors"
        );
    }

    #[test]
    fn test_pass_through_republication() {
        #[derive(Default)]
        struct Downstream {
            events: Vec<&'static str>,
        }
        impl Subscriber for Downstream {
            fn start_test(&mut self, _: &CaseId, _: u64) {
                self.events.push("start");
            }
            fn end_test(&mut self, _: &CaseId, _: u64) {
                self.events.push("end");
            }
            fn add_failure(&mut self, _: &Report) {
                self.events.push("failure");
            }
            fn add_error(&mut self, _: &Report) {
                self.events.push("error");
            }
        }

        let downstream = Rc::new(RefCell::new(Downstream::default()));
        let handle: SharedSubscriber = downstream.clone();
        let mut result = TestResult::new();
        result.subscribe(&handle);

        result.start_test(&case_id("test_a"), 0);
        result.add_failure(&failure_report("test_a", "mismatch"));
        result.end_test(&case_id("test_a"), 1);

        assert_eq!(downstream.borrow().events, vec!["start", "failure", "end"]);
    }
}
