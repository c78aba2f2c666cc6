//! Dynamic value representation for fixture state and assertion operands
//!
//! - Numbers, Bools, Null: immediate values (stack-allocated)
//! - Strings: heap-allocated, reference-counted (Arc<String>), immutable
//! - Arrays: copy-on-write (ValueArray wrapping Arc<Vec<Value>>), value semantics
//! - Instances: reference-counted fixture objects (see `fixture`)
//!
//! Equality (`==`) is deep value equality; instances compare by identity.
//! `is_identical` is the stricter same-object relation used by `assert_same`.

use crate::fixture::Instance;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Copy-on-write array. Cheap to clone (refcount bump).
/// Mutations on a shared array clone the inner Vec first (Arc::make_mut).
#[derive(Clone, Debug, Default)]
pub struct ValueArray(Arc<Vec<Value>>);

impl ValueArray {
    pub fn new() -> Self {
        ValueArray(Arc::new(Vec::new()))
    }

    pub fn from_vec(v: Vec<Value>) -> Self {
        ValueArray(Arc::new(v))
    }

    /// Read access — no clone needed.
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Mutating access — triggers CoW if Arc is shared.
    pub fn push(&mut self, value: Value) {
        Arc::make_mut(&mut self.0).push(value);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    /// Expose inner Arc for identity checks.
    pub fn arc(&self) -> &Arc<Vec<Value>> {
        &self.0
    }
}

impl PartialEq for ValueArray {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_slice() == other.0.as_slice()
    }
}

impl From<Vec<Value>> for ValueArray {
    fn from(v: Vec<Value>) -> Self {
        ValueArray::from_vec(v)
    }
}

impl FromIterator<Value> for ValueArray {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        ValueArray(Arc::new(iter.into_iter().collect()))
    }
}

/// String-keyed field map for fixture instances. Cheap to clone
/// (refcount bump); mutations clone the inner map if shared.
#[derive(Clone, Debug, Default)]
pub struct ValueMap(Arc<HashMap<String, Value>>);

impl ValueMap {
    pub fn new() -> Self {
        ValueMap(Arc::new(HashMap::new()))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: String, value: Value) {
        Arc::make_mut(&mut self.0).insert(key, value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        Arc::make_mut(&mut self.0).remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for ValueMap {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref() == other.0.as_ref()
    }
}

/// Runtime-stable type tag, used for builtin method dispatch and the
/// kind-of / instance-of assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Number,
    String,
    Bool,
    Null,
    Array,
    Instance,
}

impl TypeTag {
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Number => "number",
            TypeTag::String => "string",
            TypeTag::Bool => "bool",
            TypeTag::Null => "null",
            TypeTag::Array => "array",
            TypeTag::Instance => "instance",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dynamic value handled by the assertion library.
#[derive(Clone, Debug)]
pub enum Value {
    /// Numeric value (IEEE 754 double-precision)
    Number(f64),
    /// String value (reference-counted, immutable)
    String(Arc<String>),
    /// Boolean value
    Bool(bool),
    /// Null value
    Null,
    /// Array value (copy-on-write, value semantics)
    Array(ValueArray),
    /// Fixture instance (reference-counted, identity semantics)
    Instance(Rc<Instance>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(Arc::new(s.into()))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(ValueArray::from_vec(items))
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Number(_) => TypeTag::Number,
            Value::String(_) => TypeTag::String,
            Value::Bool(_) => TypeTag::Bool,
            Value::Null => TypeTag::Null,
            Value::Array(_) => TypeTag::Array,
            Value::Instance(_) => TypeTag::Instance,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_tag().name()
    }

    /// Null and false are falsey; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Same-object identity: pointer equality for heap-backed variants,
    /// value equality for immediates.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::String(a), Value::String(b)) => Arc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a.arc(), b.arc()),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                // Format number nicely (no trailing .0 for whole numbers)
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s.as_ref()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Array(arr) => {
                let elements: Vec<String> = arr.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", elements.join(", "))
            }
            Value::Instance(inst) => write!(f, "#<{}>", inst.class().name()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<Rc<Instance>> for Value {
    fn from(inst: Rc<Instance>) -> Self {
        Value::Instance(inst)
    }
}
