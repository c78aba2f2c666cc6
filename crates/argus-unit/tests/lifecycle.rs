//! End-to-end lifecycle scenarios: suites, hooks, buckets, and timing.

mod common;

use argus_unit::{ClassDef, Condition, Instance, RunContext, TestCase, TestSuite, Value};
use common::{passing_class, run_suite, run_suite_with, EventLog};
use pretty_assertions::assert_eq;
use std::time::Duration;

#[test]
fn test_empty_suite_round_trip() {
    let suite = TestSuite::new("empty");
    let result = run_suite(&suite);
    let result = result.borrow();

    assert!(result.succeed());
    assert_eq!(result.run_tests(), 0);
    assert_eq!(result.running_time(), Duration::ZERO);
}

#[test]
fn test_suite_counts_across_nesting() {
    let two = passing_class("TwoTest", &["test_a", "test_b"]);
    let three = passing_class("ThreeTest", &["test_a", "test_b", "test_c"]);

    let inner = TestSuite::from_class(&two);
    assert_eq!(inner.count_test_cases(), 2);

    let mut outer = TestSuite::new("all");
    outer.add(inner);
    outer.add(&three);
    assert_eq!(outer.count_test_cases(), 5);

    let result = run_suite(&outer);
    assert_eq!(result.borrow().run_tests(), 5);
    assert!(result.borrow().succeed());
}

#[test]
fn test_failures_and_errors_stay_distinguishable() {
    let class = ClassDef::builder("MixedTest")
        .method("test_fails", |_, ctx, _| {
            ctx.assert_equal(&Value::from(4), &Value::from(5), "")?;
            Ok(Value::Null)
        })
        .method("test_errors", |_, _, _| {
            Condition::new("IOError", "disk gone").raise()
        })
        .method("test_passes", |_, ctx, _| {
            ctx.assert_not_nil(&Value::from(1), "")?;
            Ok(Value::Null)
        })
        .build();

    let result = run_suite(&TestSuite::from_class(&class));
    let result = result.borrow();

    assert!(!result.succeed());
    assert_eq!(result.run_tests(), 3);
    assert_eq!(result.failure_count(), 1);
    assert_eq!(result.error_count(), 1);
    assert_eq!(result.errors()[0].kind, "IOError");
    assert_eq!(result.summary().to_string(), "3 tests, 2 assertions, 1 failures, 1 errors");
}

#[test]
fn test_per_test_assertion_counts() {
    let class = ClassDef::builder("CountTest")
        .method("test_three", |_, ctx, _| {
            ctx.assert_equal(&Value::from(1), &Value::from(1), "")?;
            ctx.assert_equal(&Value::from(2), &Value::from(2), "")?;
            ctx.assert_equal(&Value::from(3), &Value::from(3), "")?;
            Ok(Value::Null)
        })
        .method("test_zero", |_, _, _| Ok(Value::Null))
        .build();

    let result = run_suite(&TestSuite::from_class(&class));
    let result = result.borrow();

    // BTreeSet discovery order: test_three before test_zero.
    assert_eq!(result.items()[0].assertions, 3);
    assert_eq!(result.items()[1].assertions, 0);
}

#[test]
fn test_skip_failure_mode_accumulates_failures() {
    let class = ClassDef::builder("SkipTest")
        .method("test_soft", |_, ctx, _| {
            ctx.assert_equal(&Value::from(1), &Value::from(2), "")?;
            ctx.assert_equal(&Value::from(1), &Value::from(3), "")?;
            ctx.assert_equal(&Value::from(1), &Value::from(1), "")?;
            Ok(Value::Null)
        })
        .build();

    let run = RunContext::new();
    run.set_skip_failures(true);
    let result = run_suite_with(&TestSuite::from_class(&class), &run);
    let result = result.borrow();

    let item = &result.items()[0];
    assert_eq!(item.failures.len(), 2);
    assert_eq!(item.assertions, 3);
}

#[test]
fn test_default_mode_aborts_on_first_failure() {
    let class = ClassDef::builder("AbortTest")
        .method("test_hard", |_, ctx, _| {
            ctx.assert_equal(&Value::from(1), &Value::from(2), "")?;
            ctx.assert_equal(&Value::from(1), &Value::from(3), "")?;
            Ok(Value::Null)
        })
        .build();

    let result = run_suite(&TestSuite::from_class(&class));
    let result = result.borrow();

    let item = &result.items()[0];
    assert_eq!(item.failures.len(), 1);
    assert_eq!(item.assertions, 1);
}

#[test]
fn test_teardown_error_recorded_alongside_body_failure() {
    let class = ClassDef::builder("BothTest")
        .teardown(|_, _, _| Condition::new("CleanupError", "connection leak").raise())
        .method("test_bad", |_, ctx, _| {
            ctx.assert_fail("expectation broken")?;
            Ok(Value::Null)
        })
        .build();

    let result = run_suite(&TestSuite::from_class(&class));
    let result = result.borrow();

    let item = &result.items()[0];
    assert_eq!(item.failures.len(), 1);
    assert_eq!(item.errors.len(), 1);
    assert_eq!(item.errors[0].kind, "CleanupError");
}

#[test]
fn test_hooks_replace_defaults_per_method() {
    let class = ClassDef::builder("HookTest")
        .method("record", |this, _, _| {
            let prior = match this.get("calls") {
                Some(Value::Number(n)) => n,
                _ => 0.0,
            };
            this.set("calls", Value::Number(prior + 1.0));
            Ok(Value::Null)
        })
        .method("test_hooked", |_, _, _| Ok(Value::Null))
        .method("test_plain", |_, _, _| Ok(Value::Null))
        .setup_hook("record", &["test_hooked"])
        .build();

    // One shared instance so the hook counter is observable across cases.
    let instance = Instance::new(&class);
    let mut suite = TestSuite::new("hooks");
    suite.add(TestCase::new(&instance, "test_hooked"));
    suite.add(TestCase::new(&instance, "test_plain"));

    let result = run_suite(&suite);
    assert!(result.borrow().succeed());
    assert_eq!(instance.get("calls"), Some(Value::Number(1.0)));
}

#[test]
fn test_instance_hook_wins_over_class_hook() {
    let class = ClassDef::builder("TierTest")
        .method("class_hook", |this, _, _| {
            this.set("used", Value::string("class"));
            Ok(Value::Null)
        })
        .method("instance_hook", |this, _, _| {
            this.set("used", Value::string("instance"));
            Ok(Value::Null)
        })
        .method("test_pick", |_, _, _| Ok(Value::Null))
        .setup_hook("class_hook", &["test_pick"])
        .build();

    let instance = Instance::new(&class);
    instance.attach_setup("instance_hook", &["test_pick"]);

    let mut suite = TestSuite::new("tiers");
    suite.add(TestCase::new(&instance, "test_pick"));
    let result = run_suite(&suite);

    assert!(result.borrow().succeed());
    assert_eq!(instance.get("used"), Some(Value::string("instance")));
}

#[test]
fn test_inherited_tests_run_once_in_sorted_order() {
    let base = ClassDef::builder("BaseTest")
        .method("test_base", |_, _, _| Ok(Value::Null))
        .build();
    let derived = ClassDef::builder("DerivedTest")
        .parent(&base)
        .method("test_derived", |_, _, _| Ok(Value::Null))
        .build();

    let suite = TestSuite::from_class(&derived);
    assert_eq!(suite.count_test_cases(), 2);

    let result = run_suite(&suite);
    let result = result.borrow();
    let names: Vec<&str> = result.items().iter().map(|i| i.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["test_base(DerivedTest)", "test_derived(DerivedTest)"]
    );
}

#[test]
fn test_external_reporter_sees_pass_through_events() {
    let class = ClassDef::builder("ReportTest")
        .method("test_fails", |_, ctx, _| {
            ctx.assert_fail("watched")?;
            Ok(Value::Null)
        })
        .build();

    let log = EventLog::shared();
    let result = argus_unit::TestResult::shared();
    result
        .borrow_mut()
        .subscribe(&EventLog::as_subscriber(&log));

    let run = RunContext::new();
    TestSuite::from_class(&class).run(&argus_unit::TestResult::as_subscriber(&result), &run);

    assert_eq!(
        log.borrow().entries,
        vec![
            "start:test_fails(ReportTest)".to_string(),
            "failure:watched assert_fail was called.".to_string(),
            "end:test_fails(ReportTest)".to_string(),
        ]
    );
}

#[test]
fn test_running_time_covers_completed_tests() {
    let class = passing_class("TimedTest", &["test_a", "test_b"]);
    let result = run_suite(&TestSuite::from_class(&class));
    // Both tests completed; the span is well-defined even if tiny.
    assert!(result.borrow().running_time() >= Duration::ZERO);
    assert_eq!(result.borrow().run_tests(), 2);
}

#[test]
fn test_run_context_counter_spans_the_whole_run() {
    let class = passing_class("SpanTest", &["test_a", "test_b"]);
    let run = RunContext::new();
    run_suite_with(&TestSuite::from_class(&class), &run);
    assert_eq!(run.assertion_count(), 2);

    // A second suite against the same run context keeps counting.
    run_suite_with(&TestSuite::from_class(&class), &run);
    assert_eq!(run.assertion_count(), 4);
}
