//! Fixture classes and instances
//!
//! A fixture class is a named table of native methods over dynamic values,
//! with an optional parent class. Method resolution walks the ancestor
//! chain, so test methods and `setup`/`teardown` overrides are inherited.
//! Hook registries bind alternate setup/teardown methods to specific test
//! methods, resolved instance-tier first, then class-tier.

use crate::context::Context;
use crate::fault::{Condition, Eval, Fault};
use crate::value::{TypeTag, Value, ValueMap};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

/// A native method bound to a fixture class.
pub type Method = Rc<dyn Fn(&Instance, &Context, &[Value]) -> Eval>;

/// Mapping from test-method name to hook-method name for one scope.
/// Lookup misses are not an error; the caller treats them as a no-op.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    bindings: BTreeMap<String, String>,
}

impl HookRegistry {
    pub fn new() -> HookRegistry {
        HookRegistry::default()
    }

    /// Record `hook` as the alternate method for each named target.
    pub fn attach(&mut self, hook: &str, targets: &[&str]) {
        for target in targets {
            self.bindings.insert((*target).to_string(), hook.to_string());
        }
    }

    pub fn resolve(&self, test_method: &str) -> Option<&str> {
        self.bindings.get(test_method).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// A fixture class: name, optional parent, method table, and the
/// class-tier hook registries populated at build time.
pub struct ClassDef {
    name: String,
    parent: Option<Rc<ClassDef>>,
    methods: BTreeMap<String, Method>,
    setup_hooks: HookRegistry,
    teardown_hooks: HookRegistry,
}

impl ClassDef {
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            parent: None,
            methods: BTreeMap::new(),
            setup_hooks: HookRegistry::new(),
            teardown_hooks: HookRegistry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class name without any module path prefix.
    pub fn short_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    pub fn parent(&self) -> Option<&Rc<ClassDef>> {
        self.parent.as_ref()
    }

    /// Resolve a method through the ancestor chain, nearest class first.
    pub fn find_method(&self, name: &str) -> Option<Method> {
        match self.methods.get(name) {
            Some(m) => Some(m.clone()),
            None => self.parent.as_ref().and_then(|p| p.find_method(name)),
        }
    }

    pub fn defines_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
            || self
                .parent
                .as_ref()
                .is_some_and(|p| p.defines_method(name))
    }

    /// All test-bearing method names reachable on this class, including
    /// inherited ones, deduplicated and sorted for deterministic suites.
    pub fn test_method_names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        self.collect_test_methods(&mut names);
        names.into_iter().collect()
    }

    fn collect_test_methods(&self, into: &mut BTreeSet<String>) {
        if let Some(parent) = &self.parent {
            parent.collect_test_methods(into);
        }
        for name in self.methods.keys() {
            if is_test_method(name) {
                into.insert(name.clone());
            }
        }
    }

    /// Class-tier hook resolution, walking the ancestor chain.
    pub(crate) fn resolve_setup_hook(&self, test_method: &str) -> Option<&str> {
        self.setup_hooks
            .resolve(test_method)
            .or_else(|| self.parent.as_deref()?.resolve_setup_hook(test_method))
    }

    pub(crate) fn resolve_teardown_hook(&self, test_method: &str) -> Option<&str> {
        self.teardown_hooks
            .resolve(test_method)
            .or_else(|| self.parent.as_deref()?.resolve_teardown_hook(test_method))
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Test-method naming convention.
pub fn is_test_method(name: &str) -> bool {
    name.starts_with("test")
}

/// Declarative builder for fixture classes. Hook registration here is the
/// class-tier ("at class-definition time") half of the hook mechanism.
pub struct ClassBuilder {
    name: String,
    parent: Option<Rc<ClassDef>>,
    methods: BTreeMap<String, Method>,
    setup_hooks: HookRegistry,
    teardown_hooks: HookRegistry,
}

impl ClassBuilder {
    pub fn parent(mut self, parent: &Rc<ClassDef>) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        body: impl Fn(&Instance, &Context, &[Value]) -> Eval + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Rc::new(body));
        self
    }

    /// Shorthand for the default `setup` override.
    pub fn setup(self, body: impl Fn(&Instance, &Context, &[Value]) -> Eval + 'static) -> Self {
        self.method("setup", body)
    }

    /// Shorthand for the default `teardown` override.
    pub fn teardown(self, body: impl Fn(&Instance, &Context, &[Value]) -> Eval + 'static) -> Self {
        self.method("teardown", body)
    }

    /// Bind `hook` as the setup hook for each named test method.
    pub fn setup_hook(mut self, hook: &str, targets: &[&str]) -> Self {
        self.setup_hooks.attach(hook, targets);
        self
    }

    /// Bind `hook` as the teardown hook for each named test method.
    pub fn teardown_hook(mut self, hook: &str, targets: &[&str]) -> Self {
        self.teardown_hooks.attach(hook, targets);
        self
    }

    pub fn build(self) -> Rc<ClassDef> {
        Rc::new(ClassDef {
            name: self.name,
            parent: self.parent,
            methods: self.methods,
            setup_hooks: self.setup_hooks,
            teardown_hooks: self.teardown_hooks,
        })
    }
}

/// An object under test: a class reference plus mutable field state and
/// the instance-tier hook registries.
pub struct Instance {
    class: Rc<ClassDef>,
    fields: RefCell<ValueMap>,
    setup_hooks: RefCell<HookRegistry>,
    teardown_hooks: RefCell<HookRegistry>,
}

impl Instance {
    pub fn new(class: &Rc<ClassDef>) -> Rc<Instance> {
        Rc::new(Instance {
            class: class.clone(),
            fields: RefCell::new(ValueMap::new()),
            setup_hooks: RefCell::new(HookRegistry::new()),
            teardown_hooks: RefCell::new(HookRegistry::new()),
        })
    }

    pub fn class(&self) -> &Rc<ClassDef> {
        &self.class
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        self.fields.borrow().get(field).cloned()
    }

    pub fn set(&self, field: impl Into<String>, value: Value) {
        self.fields.borrow_mut().insert(field.into(), value);
    }

    pub fn responds_to(&self, name: &str) -> bool {
        self.class.defines_method(name)
    }

    /// Invoke a named method; an unresolvable name raises an
    /// `UndefinedMethod` condition.
    pub fn call(&self, name: &str, ctx: &Context, args: &[Value]) -> Eval {
        match self.class.find_method(name) {
            Some(method) => method(self, ctx, args),
            None => Condition::new(
                "UndefinedMethod",
                format!("undefined method `{}` for {}", name, self.class.name()),
            )
            .raise(),
        }
    }

    /// Instance-tier hook registration.
    pub fn attach_setup(&self, hook: &str, targets: &[&str]) {
        self.setup_hooks.borrow_mut().attach(hook, targets);
    }

    pub fn attach_teardown(&self, hook: &str, targets: &[&str]) {
        self.teardown_hooks.borrow_mut().attach(hook, targets);
    }

    /// Two-tier resolution: instance scope first, then the class chain.
    pub(crate) fn setup_hook_for(&self, test_method: &str) -> Option<String> {
        if let Some(hook) = self.setup_hooks.borrow().resolve(test_method) {
            return Some(hook.to_string());
        }
        self.class.resolve_setup_hook(test_method).map(String::from)
    }

    pub(crate) fn teardown_hook_for(&self, test_method: &str) -> Option<String> {
        if let Some(hook) = self.teardown_hooks.borrow().resolve(test_method) {
            return Some(hook.to_string());
        }
        self.class
            .resolve_teardown_hook(test_method)
            .map(String::from)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<{}>", self.class.name())
    }
}

/// Expected type for the kind-of / instance-of assertions: either a
/// builtin type tag or a fixture class.
#[derive(Debug, Clone)]
pub enum TypeExpect {
    Tag(TypeTag),
    Class(Rc<ClassDef>),
}

impl TypeExpect {
    pub fn name(&self) -> &str {
        match self {
            TypeExpect::Tag(tag) => tag.name(),
            TypeExpect::Class(class) => class.name(),
        }
    }

    /// Is-a: tag match for builtins, ancestor-chain membership for
    /// instances.
    pub fn is_kind(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeExpect::Class(expected), Value::Instance(inst)) => {
                let mut current = Some(inst.class().clone());
                while let Some(class) = current {
                    if Rc::ptr_eq(&class, expected) {
                        return true;
                    }
                    current = class.parent().cloned();
                }
                false
            }
            (TypeExpect::Class(_), _) => false,
            (TypeExpect::Tag(tag), value) => value.type_tag() == *tag,
        }
    }

    /// Is-exactly-a: exact class for instances, tag match for builtins.
    pub fn is_instance(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeExpect::Class(expected), Value::Instance(inst)) => {
                Rc::ptr_eq(inst.class(), expected)
            }
            (TypeExpect::Class(_), _) => false,
            (TypeExpect::Tag(tag), value) => value.type_tag() == *tag,
        }
    }
}

impl From<TypeTag> for TypeExpect {
    fn from(tag: TypeTag) -> Self {
        TypeExpect::Tag(tag)
    }
}

impl From<&Rc<ClassDef>> for TypeExpect {
    fn from(class: &Rc<ClassDef>) -> Self {
        TypeExpect::Class(class.clone())
    }
}
