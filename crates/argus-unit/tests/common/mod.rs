//! Shared helpers for integration scenarios.

#![allow(dead_code)]

use argus_unit::{
    CaseId, ClassDef, Report, RunContext, SharedSubscriber, Subscriber, TestResult, TestSuite,
    Value,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Run a suite against a fresh result and run context.
pub fn run_suite(suite: &TestSuite) -> Rc<RefCell<TestResult>> {
    let run = RunContext::new();
    run_suite_with(suite, &run)
}

/// Run a suite against a fresh result, reusing the caller's run context.
pub fn run_suite_with(suite: &TestSuite, run: &RunContext) -> Rc<RefCell<TestResult>> {
    let result = TestResult::shared();
    suite.run(&TestResult::as_subscriber(&result), run);
    result
}

/// A fixture class whose listed test methods all pass.
pub fn passing_class(name: &str, tests: &[&str]) -> Rc<ClassDef> {
    let mut builder = ClassDef::builder(name);
    for test in tests {
        builder = builder.method(*test, |_, ctx, _| {
            ctx.assert_equal(&Value::from(1), &Value::from(1), "")?;
            Ok(Value::Null)
        });
    }
    builder.build()
}

/// Collects lifecycle events as compact strings.
#[derive(Default)]
pub struct EventLog {
    pub entries: Vec<String>,
}

impl EventLog {
    pub fn shared() -> Rc<RefCell<EventLog>> {
        Rc::new(RefCell::new(EventLog::default()))
    }

    pub fn as_subscriber(this: &Rc<RefCell<EventLog>>) -> SharedSubscriber {
        this.clone()
    }
}

impl Subscriber for EventLog {
    fn start_test(&mut self, test: &CaseId, _assertions: u64) {
        self.entries.push(format!("start:{}", test));
    }
    fn end_test(&mut self, test: &CaseId, _assertions: u64) {
        self.entries.push(format!("end:{}", test));
    }
    fn add_failure(&mut self, report: &Report) {
        self.entries.push(format!("failure:{}", report.fault));
    }
    fn add_error(&mut self, report: &Report) {
        self.entries.push(format!("error:{}", report.fault));
    }
}
