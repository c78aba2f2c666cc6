//! A single runnable test: one test method bound to a fixture instance
//!
//! `run` drives the lifecycle: StartTest, then setup → setup hook → body,
//! then — regardless of how that went — teardown hook → teardown, then
//! classification and EndTest. Cleanup-phase faults are published directly
//! as errors on the event bus and never replace the body outcome, so a
//! test can record both a body failure and a teardown error.

use crate::context::{Context, RunContext};
use crate::event::{CaseId, Channel, Event, Report, SharedSubscriber};
use crate::fault::Outcome;
use crate::fixture::Instance;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

enum HookPhase {
    Setup,
    Teardown,
}

/// One test method bound to the instance under test. Immutable after
/// construction.
pub struct TestCase {
    instance: Rc<Instance>,
    method_name: String,
    display_name: String,
    channel: RefCell<Channel>,
}

impl TestCase {
    /// Display name defaults to the class name.
    pub fn new(instance: &Rc<Instance>, method_name: impl Into<String>) -> TestCase {
        TestCase {
            display_name: instance.class().name().to_string(),
            instance: instance.clone(),
            method_name: method_name.into(),
            channel: RefCell::new(Channel::new()),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> TestCase {
        self.display_name = display_name.into();
        self
    }

    pub fn instance(&self) -> &Rc<Instance> {
        &self.instance
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn id(&self) -> CaseId {
        CaseId {
            class_name: self.instance.class().name().to_string(),
            method_name: self.method_name.clone(),
            display_name: self.display_name.clone(),
        }
    }

    /// `test_method(DisplayName)`.
    pub fn name(&self) -> String {
        format!("{}({})", self.method_name, self.display_name)
    }

    pub fn count_test_cases(&self) -> usize {
        1
    }

    /// Register an additional observer (e.g. an external reporter) for
    /// this case's lifecycle events.
    pub fn subscribe(&self, subscriber: &SharedSubscriber) {
        self.channel.borrow_mut().subscribe(subscriber);
    }

    /// Run this case against a result, reporting lifecycle events through
    /// the case's channel. The result is subscribed for the duration of
    /// the run only.
    pub fn run(&self, result: &SharedSubscriber, run: &RunContext) {
        self.channel.borrow_mut().subscribe(result);
        let id = self.id();
        {
            let channel = self.channel.borrow();
            channel.notify(&Event::StartTest {
                test: id.clone(),
                assertions: run.assertion_count(),
            });

            let ctx = Context::new(run, &channel, id.clone());
            match self.run_bare(&ctx, &channel, &id) {
                Ok(()) => {}
                Err(fault) if fault.is_failure() => {
                    channel.notify(&Event::AddFailure(Report::new(id.clone(), fault)));
                }
                Err(fault) => {
                    channel.notify(&Event::AddError(Report::new(id.clone(), fault)));
                }
            }

            channel.notify(&Event::EndTest {
                test: id,
                assertions: run.assertion_count(),
            });
        }
        self.channel.borrow_mut().unsubscribe(result);
    }

    /// Setup, hooks, and body; the cleanup phase always runs, and its
    /// faults go out on the bus without touching the body outcome.
    fn run_bare(&self, ctx: &Context, channel: &Channel, id: &CaseId) -> Outcome {
        let body_outcome = self.run_body(ctx);
        if let Err(fault) = self.run_cleanup(ctx) {
            channel.notify(&Event::AddError(Report::new(id.clone(), fault)));
        }
        body_outcome
    }

    fn run_body(&self, ctx: &Context) -> Outcome {
        self.invoke_default(ctx, "setup")?;
        self.invoke_hook(ctx, HookPhase::Setup)?;
        self.instance
            .call(&self.method_name, ctx, &[])
            .map(|_| ())
    }

    fn run_cleanup(&self, ctx: &Context) -> Outcome {
        self.invoke_hook(ctx, HookPhase::Teardown)?;
        self.invoke_default(ctx, "teardown")
    }

    /// The default setup/teardown no-op, overridable by defining a method
    /// of the same name on the fixture class.
    fn invoke_default(&self, ctx: &Context, name: &str) -> Outcome {
        if self.instance.responds_to(name) {
            self.instance.call(name, ctx, &[])?;
        }
        Ok(())
    }

    /// Invoke the registered hook for this test method, if any. A missing
    /// registration is a no-op; a registration naming an undefined method
    /// raises through `Instance::call`.
    fn invoke_hook(&self, ctx: &Context, phase: HookPhase) -> Outcome {
        let hook = match phase {
            HookPhase::Setup => self.instance.setup_hook_for(&self.method_name),
            HookPhase::Teardown => self.instance.teardown_hook_for(&self.method_name),
        };
        if let Some(hook) = hook {
            self.instance.call(&hook, ctx, &[])?;
        }
        Ok(())
    }
}

/// Two cases are equal iff same class and same method name; the bound
/// instance is not compared.
impl PartialEq for TestCase {
    fn eq(&self, other: &Self) -> bool {
        self.instance.class().name() == other.instance.class().name()
            && self.method_name == other.method_name
    }
}

impl Eq for TestCase {}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("class", &self.instance.class().name())
            .field("method", &self.method_name)
            .finish()
    }
}
