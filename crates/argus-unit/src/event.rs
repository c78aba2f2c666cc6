//! Lifecycle event bus
//!
//! A minimal publish/subscribe channel. A publisher (test case or result)
//! owns a `Channel`; any number of `Subscriber`s register against it and
//! receive the four lifecycle callbacks in registration order, before the
//! triggering call returns. The channel holds weak handles only — it never
//! owns its subscribers. Subscriber callbacks are not isolated: a callback
//! that panics unwinds through `notify`.

use crate::fault::Fault;
use crate::trace::{Frame, Trace};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Identity of a test case as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseId {
    pub class_name: String,
    pub method_name: String,
    pub display_name: String,
}

impl CaseId {
    /// Display name defaults to the class name.
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> CaseId {
        let class_name = class_name.into();
        CaseId {
            display_name: class_name.clone(),
            class_name,
            method_name: method_name.into(),
        }
    }

    /// Class name without any module path prefix.
    pub fn short_class_name(&self) -> &str {
        match self.class_name.rsplit("::").next() {
            Some(short) => short,
            None => &self.class_name,
        }
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.method_name, self.display_name)
    }
}

/// Payload of a failure or error notification: the raw
/// (trace, condition, owning test) triple.
#[derive(Debug, Clone)]
pub struct Report {
    pub test: CaseId,
    pub trace: Trace,
    pub fault: Fault,
}

impl Report {
    /// Build a report from a classified fault: the fault's own call site
    /// (when captured) followed by a synthesized test-method frame.
    pub fn new(test: CaseId, fault: Fault) -> Report {
        let mut trace = Trace::default();
        if let Some(frame) = fault.frame() {
            trace.push(frame);
        }
        trace.push(Frame::synthetic(format!(
            "{}({})",
            test.method_name,
            test.short_class_name()
        )));
        Report { test, trace, fault }
    }
}

/// A lifecycle event with a fixed-shape payload per kind. Start/end carry
/// the run's assertion counter so aggregators can compute per-test deltas
/// without a back-reference to the run context.
#[derive(Debug, Clone)]
pub enum Event {
    StartTest { test: CaseId, assertions: u64 },
    EndTest { test: CaseId, assertions: u64 },
    AddFailure(Report),
    AddError(Report),
}

/// The capability set required of anything observing a test case.
pub trait Subscriber {
    fn start_test(&mut self, test: &CaseId, assertions: u64);
    fn end_test(&mut self, test: &CaseId, assertions: u64);
    fn add_failure(&mut self, report: &Report);
    fn add_error(&mut self, report: &Report);
}

/// Shared subscriber handle as registered with a channel.
pub type SharedSubscriber = Rc<RefCell<dyn Subscriber>>;

/// Per-publisher subscriber list. Registration order is delivery order.
#[derive(Default)]
pub struct Channel {
    subscribers: Vec<Weak<RefCell<dyn Subscriber>>>,
}

impl Channel {
    pub fn new() -> Channel {
        Channel::default()
    }

    /// Register a subscriber. Dead handles from dropped subscribers are
    /// pruned here rather than during delivery.
    pub fn subscribe(&mut self, subscriber: &SharedSubscriber) {
        self.subscribers.retain(|weak| weak.strong_count() > 0);
        self.subscribers.push(Rc::downgrade(subscriber));
    }

    pub fn unsubscribe(&mut self, subscriber: &SharedSubscriber) {
        let target = Rc::downgrade(subscriber);
        self.subscribers.retain(|weak| !weak.ptr_eq(&target));
    }

    /// Live subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Deliver one event to every live subscriber, in registration order.
    pub fn notify(&self, event: &Event) {
        for weak in &self.subscribers {
            let Some(subscriber) = weak.upgrade() else {
                continue;
            };
            let mut subscriber = subscriber.borrow_mut();
            match event {
                Event::StartTest { test, assertions } => subscriber.start_test(test, *assertions),
                Event::EndTest { test, assertions } => subscriber.end_test(test, *assertions),
                Event::AddFailure(report) => subscriber.add_failure(report),
                Event::AddError(report) => subscriber.add_error(report),
            }
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::AssertionFailure;

    #[derive(Default)]
    struct Recorder {
        tag: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Subscriber for Recorder {
        fn start_test(&mut self, test: &CaseId, _assertions: u64) {
            self.log.borrow_mut().push(format!("{}:start:{}", self.tag, test));
        }
        fn end_test(&mut self, test: &CaseId, _assertions: u64) {
            self.log.borrow_mut().push(format!("{}:end:{}", self.tag, test));
        }
        fn add_failure(&mut self, report: &Report) {
            self.log
                .borrow_mut()
                .push(format!("{}:failure:{}", self.tag, report.fault));
        }
        fn add_error(&mut self, report: &Report) {
            self.log
                .borrow_mut()
                .push(format!("{}:error:{}", self.tag, report.fault));
        }
    }

    fn recorder(tag: &'static str, log: &Rc<RefCell<Vec<String>>>) -> SharedSubscriber {
        Rc::new(RefCell::new(Recorder {
            tag,
            log: log.clone(),
        }))
    }

    fn start_event() -> Event {
        Event::StartTest {
            test: CaseId::new("StackTest", "test_push"),
            assertions: 0,
        }
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = recorder("a", &log);
        let second = recorder("b", &log);
        let mut channel = Channel::new();
        channel.subscribe(&first);
        channel.subscribe(&second);

        channel.notify(&start_event());

        assert_eq!(
            *log.borrow(),
            vec![
                "a:start:test_push(StackTest)".to_string(),
                "b:start:test_push(StackTest)".to_string(),
            ]
        );
    }

    #[test]
    fn test_dropped_subscriber_is_skipped() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let kept = recorder("kept", &log);
        let mut channel = Channel::new();
        {
            let dropped = recorder("dropped", &log);
            channel.subscribe(&dropped);
            channel.subscribe(&kept);
        }
        assert_eq!(channel.subscriber_count(), 1);

        channel.notify(&start_event());
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_unsubscribe_removes_only_that_handle() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = recorder("a", &log);
        let b = recorder("b", &log);
        let mut channel = Channel::new();
        channel.subscribe(&a);
        channel.subscribe(&b);
        channel.unsubscribe(&a);

        channel.notify(&start_event());
        assert_eq!(*log.borrow(), vec!["b:start:test_push(StackTest)".to_string()]);
    }

    #[test]
    fn test_report_appends_synthetic_test_frame() {
        let fault = Fault::from(AssertionFailure::new("mismatch"));
        let report = Report::new(CaseId::new("db::ConnTest", "test_open"), fault);
        let frames = report.trace.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].label.as_deref(), Some("test_open(ConnTest)"));
    }

    struct Panicker;
    impl Subscriber for Panicker {
        fn start_test(&mut self, _test: &CaseId, _assertions: u64) {
            panic!("subscriber exploded");
        }
        fn end_test(&mut self, _test: &CaseId, _assertions: u64) {}
        fn add_failure(&mut self, _report: &Report) {}
        fn add_error(&mut self, _report: &Report) {}
    }

    #[test]
    #[should_panic(expected = "subscriber exploded")]
    fn test_no_isolation_between_subscribers() {
        let panicker: SharedSubscriber = Rc::new(RefCell::new(Panicker));
        let mut channel = Channel::new();
        channel.subscribe(&panicker);
        channel.notify(&start_event());
    }
}
