//! Composite test suites
//!
//! A suite is an ordered sequence of entries, each a test case or a nested
//! suite. Construction flattens its sources: flat collections are spliced
//! in-place and classes are expanded through their suite-producing
//! contract, so the child list holds only runnable entries. Execution is
//! depth-first in stored order.

use crate::case::TestCase;
use crate::context::RunContext;
use crate::event::SharedSubscriber;
use crate::fixture::{ClassDef, Instance};
use std::fmt;
use std::rc::Rc;

/// One runnable child of a suite.
#[derive(Debug)]
pub enum Entry {
    Case(TestCase),
    Suite(TestSuite),
}

impl Entry {
    pub fn run(&self, result: &SharedSubscriber, run: &RunContext) {
        match self {
            Entry::Case(case) => case.run(result, run),
            Entry::Suite(suite) => suite.run(result, run),
        }
    }

    pub fn count_test_cases(&self) -> usize {
        match self {
            Entry::Case(_) => 1,
            Entry::Suite(suite) => suite.count_test_cases(),
        }
    }
}

impl From<TestCase> for Entry {
    fn from(case: TestCase) -> Self {
        Entry::Case(case)
    }
}

impl From<TestSuite> for Entry {
    fn from(suite: TestSuite) -> Self {
        Entry::Suite(suite)
    }
}

/// A test-bearing source accepted by suite construction.
pub enum Source {
    /// A fixture class, expanded via its suite-producing contract.
    Class(Rc<ClassDef>),
    /// An already-runnable entry, appended as-is.
    Entry(Entry),
    /// A flat collection of runnable entries, spliced in-place.
    List(Vec<Entry>),
}

impl From<Rc<ClassDef>> for Source {
    fn from(class: Rc<ClassDef>) -> Self {
        Source::Class(class)
    }
}

impl From<&Rc<ClassDef>> for Source {
    fn from(class: &Rc<ClassDef>) -> Self {
        Source::Class(class.clone())
    }
}

impl From<TestCase> for Source {
    fn from(case: TestCase) -> Self {
        Source::Entry(Entry::Case(case))
    }
}

impl From<TestSuite> for Source {
    fn from(suite: TestSuite) -> Self {
        Source::Entry(Entry::Suite(suite))
    }
}

impl From<Vec<Entry>> for Source {
    fn from(entries: Vec<Entry>) -> Self {
        Source::List(entries)
    }
}

/// Ordered, recursively-flattened composite of cases and suites.
#[derive(Default)]
pub struct TestSuite {
    name: String,
    entries: Vec<Entry>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>) -> TestSuite {
        TestSuite {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Flattening constructor over a list of test-bearing sources.
    pub fn from_sources(name: impl Into<String>, sources: Vec<Source>) -> TestSuite {
        let mut suite = TestSuite::new(name);
        for source in sources {
            suite.add(source);
        }
        suite
    }

    /// The suite-producing contract for a fixture class: one case per
    /// discovered test method (inherited included, sorted by name), each
    /// over a fresh instance.
    pub fn from_class(class: &Rc<ClassDef>) -> TestSuite {
        let mut suite = TestSuite::new(class.name());
        for method in class.test_method_names() {
            let instance = Instance::new(class);
            suite.entries.push(Entry::Case(TestCase::new(&instance, method)));
        }
        suite
    }

    /// Append one more source: entries are appended, collections spliced,
    /// classes expanded.
    pub fn add(&mut self, source: impl Into<Source>) {
        match source.into() {
            Source::Class(class) => self.entries.push(Entry::Suite(Self::from_class(&class))),
            Source::Entry(entry) => self.entries.push(entry),
            Source::List(entries) => self.entries.extend(entries),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total leaf-test count, recursing through nested suites.
    pub fn count_test_cases(&self) -> usize {
        self.entries.iter().map(Entry::count_test_cases).sum()
    }

    /// Run every child against the same result, depth-first in stored
    /// order.
    pub fn run(&self, result: &SharedSubscriber, run: &RunContext) {
        for entry in &self.entries {
            entry.run(result, run);
        }
    }
}

impl fmt::Debug for TestSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSuite")
            .field("name", &self.name)
            .field("entries", &self.entries.len())
            .finish()
    }
}
